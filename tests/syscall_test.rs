// tests of the register-level syscall boundary
use oskit::dev::DiskImage;
use oskit::fs::{FileSystem,FileType};
use oskit::kernel::Kernel;
use oskit::machine::{ExceptionKind,PAGE_SIZE,RESULT_REG,ARG1_REG,PC_REG,NEXT_PC_REG};
use oskit::vm::addrspace::ExecHeader;

const SC_HALT: i32 = 0;
const SC_EXIT: i32 = 1;
const SC_EXEC: i32 = 2;
const SC_CREATE: i32 = 4;
const SC_REMOVE: i32 = 5;
const SC_OPEN: i32 = 6;
const SC_READ: i32 = 7;
const SC_WRITE: i32 = 8;
const SC_SEEK: i32 = 9;
const SC_CLOSE: i32 = 10;
const SC_YIELD: i32 = 12;
const SC_JOIN: i32 = 15;
const SC_ADD: i32 = 42;

/// Kernel with one running thread whose address space comes from /prog.
fn boot() -> (Kernel,i32) {
    let mut fs = FileSystem::format(DiskImage::new(256),None).expect("format failed");
    fs.create("/prog",FileType::File,None).expect("create failed");
    let hdr = ExecHeader::new(4*PAGE_SIZE,0,0);
    let mut dat = hdr.to_bytes();
    dat.resize(dat.len()+4*PAGE_SIZE,0);
    let mut f = fs.open("/prog").expect("open failed");
    fs.write_file_at(&mut f,&dat,0).expect("write failed");

    let mut k = Kernel::new(fs,8);
    let pid = k.threads.create_thread("main",0).expect("thread create failed");
    k.threads.set_current(pid);
    k.mem.create_addr_space(&k.fs,pid,"/prog").expect("space create failed");
    k.machine.write_register(PC_REG,0);
    k.machine.write_register(NEXT_PC_REG,4);
    (k,pid)
}

fn syscall(k: &mut Kernel,code: i32,args: &[i32]) -> i32 {
    k.machine.write_register(RESULT_REG,code);
    for (i,a) in args.iter().enumerate() {
        k.machine.write_register(ARG1_REG+i,*a);
    }
    k.exception_handler(ExceptionKind::Syscall);
    k.machine.read_register(RESULT_REG)
}

/// Plant a NUL terminated string in user memory and return its address.
fn user_string(k: &mut Kernel,addr: usize,s: &str) -> i32 {
    for (i,b) in s.as_bytes().iter().enumerate() {
        k.write_user_byte(addr+i,*b).expect("write failed");
    }
    k.write_user_byte(addr+s.len(),0).expect("write failed");
    addr as i32
}

#[test]
fn add_returns_sum_and_advances_pc() {
    let (mut k,_pid) = boot();
    let pc0 = k.machine.read_register(PC_REG);
    assert_eq!(syscall(&mut k,SC_ADD,&[5,7]),12);
    assert_eq!(k.machine.read_register(PC_REG),pc0+4);
}

#[test]
fn unknown_code_still_advances_pc() {
    let (mut k,_pid) = boot();
    let pc0 = k.machine.read_register(PC_REG);
    syscall(&mut k,99,&[]);
    assert_eq!(k.machine.read_register(PC_REG),pc0+4);
    assert!(!k.halted());
}

#[test]
fn halt_stops_the_machine() {
    let (mut k,_pid) = boot();
    syscall(&mut k,SC_HALT,&[]);
    assert!(k.halted());
}

#[test]
fn file_lifecycle_through_registers() {
    let (mut k,_pid) = boot();
    let name = user_string(&mut k,200,"/notes");
    // create then open
    assert_eq!(syscall(&mut k,SC_CREATE,&[name,0]),1);
    let fd = syscall(&mut k,SC_OPEN,&[name]);
    assert!(fd >= 2," got descriptor {}",fd);
    // write a payload out of user memory
    let buf = user_string(&mut k,300,"hello world\n");
    assert_eq!(syscall(&mut k,SC_WRITE,&[buf,12,fd]),12);
    // seek home and read it back into another user buffer
    assert_eq!(syscall(&mut k,SC_SEEK,&[0,fd]),0);
    assert_eq!(syscall(&mut k,SC_READ,&[500,12,fd]),12);
    let back = k.read_user_buffer(500,12).expect("read failed");
    assert_eq!(back,b"hello world\n".to_vec());
    assert_eq!(syscall(&mut k,SC_CLOSE,&[fd]),1);
    // closing twice fails
    assert_eq!(syscall(&mut k,SC_CLOSE,&[fd]),-1);
    // remove and verify it is gone
    assert_eq!(syscall(&mut k,SC_REMOVE,&[name]),1);
    assert_eq!(syscall(&mut k,SC_OPEN,&[name]),-1);
}

#[test]
fn create_duplicate_fails_through_registers() {
    let (mut k,_pid) = boot();
    let name = user_string(&mut k,200,"/dup");
    assert_eq!(syscall(&mut k,SC_CREATE,&[name,0]),1);
    assert_eq!(syscall(&mut k,SC_CREATE,&[name,0]),0);
}

#[test]
fn create_directory_type_through_registers() {
    let (mut k,_pid) = boot();
    let dname = user_string(&mut k,200,"/docs");
    assert_eq!(syscall(&mut k,SC_CREATE,&[dname,FileType::Directory as i32]),1);
    let fname = user_string(&mut k,250,"/docs/memo");
    assert_eq!(syscall(&mut k,SC_CREATE,&[fname,0]),1);
    assert!(k.fs.find("/docs/memo").is_ok());
}

#[test]
fn exec_spawns_a_child_with_its_own_space() {
    let (mut k,pid) = boot();
    let path = user_string(&mut k,200,"/prog");
    let child = syscall(&mut k,SC_EXEC,&[path]);
    assert!(child >= 0);
    assert_ne!(child,pid);
    assert!(k.threads.get(pid).expect("missing").has_child(child));
    assert!(k.mem.space(child).is_some());
    // exec of a missing program fails cleanly
    let bad = user_string(&mut k,250,"/absent");
    assert_eq!(syscall(&mut k,SC_EXEC,&[bad]),-1);
}

#[test]
fn join_polls_a_live_child() {
    let (mut k,_pid) = boot();
    let path = user_string(&mut k,200,"/prog");
    let child = syscall(&mut k,SC_EXEC,&[path]);
    assert!(child >= 0);
    let t0 = k.machine.total_ticks();
    // nothing here can run the child, so the join polls and comes back
    assert_eq!(syscall(&mut k,SC_JOIN,&[child]),0);
    assert!(k.machine.total_ticks() > t0);
    // a pid that is not a child fails immediately
    assert_eq!(syscall(&mut k,SC_JOIN,&[77]),-1);
}

#[test]
fn yield_moves_the_clock() {
    let (mut k,_pid) = boot();
    let t0 = k.machine.total_ticks();
    syscall(&mut k,SC_YIELD,&[]);
    assert!(k.machine.total_ticks() > t0);
}

#[test]
fn exit_tears_the_thread_down() {
    let (mut k,pid) = boot();
    k.translate(0).expect("translate failed");
    syscall(&mut k,SC_EXIT,&[0]);
    assert!(k.threads.get(pid).is_none());
    assert!(k.mem.space(pid).is_none());
    // the frames the thread held are free again
    assert_eq!(k.mem.frames.find_one_empty(),Some(0));
}
