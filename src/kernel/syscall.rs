//! ### Syscall dispatch
//!
//! The calling convention: the code arrives in r2, up to four arguments
//! in r4 through r7, and the result goes back in r2.  Every handled call
//! advances the program counter; an unknown code logs a diagnostic and
//! still advances, so a bad call cannot wedge the machine.

use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use log::{info,debug,error,warn};
use super::{Kernel,CONSOLE_INPUT,CONSOLE_OUTPUT};
use crate::machine::{RESULT_REG,ARG1_REG,ARG2_REG,ARG3_REG,PC_REG,NEXT_PC_REG};
use crate::fs::FileType;
use crate::fs::types::FILE_PATH_MAX_LEN;
use crate::threads::ThreadStatus;

/// How many times a join will poll before giving up.  The scheduler
/// lives outside this crate, so an unbounded poll could spin forever on
/// a child that nothing will ever run.
const JOIN_POLL_LIMIT: usize = 100;

#[derive(FromPrimitive,PartialEq,Clone,Copy,Debug)]
pub enum SyscallCode {
    Halt = 0,
    Exit = 1,
    Exec = 2,
    Join = 3,
    Create = 4,
    Remove = 5,
    Open = 6,
    Read = 7,
    Write = 8,
    Seek = 9,
    Close = 10,
    ThreadFork = 11,
    ThreadYield = 12,
    ThreadExit = 14,
    ThreadJoin = 15,
    Add = 42
}

pub fn dispatch(k: &mut Kernel) {
    let code = k.machine.read_register(RESULT_REG);
    match SyscallCode::from_i32(code) {
        Some(SyscallCode::Halt) => {
            info!("shutdown, initiated by user program");
            k.halt();
        },
        Some(SyscallCode::Add) => {
            let op1 = k.machine.read_register(ARG1_REG);
            let op2 = k.machine.read_register(ARG2_REG);
            debug!("add {} + {}",op1,op2);
            k.machine.write_register(RESULT_REG,op1.wrapping_add(op2));
            k.machine.pc_advance();
        },
        Some(c @ (SyscallCode::Create | SyscallCode::Remove | SyscallCode::Open |
                  SyscallCode::Read | SyscallCode::Write | SyscallCode::Seek |
                  SyscallCode::Close)) => file_system_handler(k,c),
        Some(c) => thread_handler(k,c),
        None => {
            error!("unexpected system call {}",code);
            k.machine.pc_advance();
        }
    }
}

fn file_system_handler(k: &mut Kernel,code: SyscallCode) {
    let result: i32 = match code {
        SyscallCode::Create => {
            let addr = k.machine.read_register(ARG1_REG) as usize;
            let typ = match FileType::from_i32(k.machine.read_register(ARG2_REG)) {
                Some(typ) => typ,
                None => FileType::File
            };
            match k.read_user_string(addr,FILE_PATH_MAX_LEN) {
                Ok(name) => match k.fs.create(&name,typ,None) {
                    Ok(()) => {
                        debug!("file {} created",name);
                        1
                    },
                    Err(e) => {
                        error!("file {} failed to create: {}",name,e);
                        0
                    }
                },
                Err(_) => 0
            }
        },
        SyscallCode::Remove => {
            let addr = k.machine.read_register(ARG1_REG) as usize;
            match k.read_user_string(addr,FILE_PATH_MAX_LEN) {
                Ok(name) => match k.fs.remove(&name) {
                    Ok(()) => 1,
                    Err(e) => {
                        error!("file {} failed to remove: {}",name,e);
                        0
                    }
                },
                Err(_) => 0
            }
        },
        SyscallCode::Open => {
            let addr = k.machine.read_register(ARG1_REG) as usize;
            match k.read_user_string(addr,FILE_PATH_MAX_LEN) {
                Ok(name) => match k.fs.open(&name) {
                    Ok(f) => match k.alloc_fd(f) {
                        Some(fd) => {
                            debug!("file {} opened on descriptor {}",name,fd);
                            fd
                        },
                        None => {
                            error!("open file table is full");
                            -1
                        }
                    },
                    Err(_) => -1
                },
                Err(_) => -1
            }
        },
        SyscallCode::Read => {
            let addr = k.machine.read_register(ARG1_REG) as usize;
            let n = k.machine.read_register(ARG2_REG) as usize;
            let fd = k.machine.read_register(ARG3_REG);
            if fd==CONSOLE_INPUT {
                // console input is not modeled
                0
            } else {
                let dat = match k.open_files.get_mut(fd as usize).and_then(|s| s.as_mut()) {
                    Some(f) => k.fs.read_file(f,n).ok(),
                    None => None
                };
                match dat {
                    Some(dat) => match k.write_user_buffer(addr,&dat) {
                        Ok(()) => dat.len() as i32,
                        Err(_) => -1
                    },
                    None => -1
                }
            }
        },
        SyscallCode::Write => {
            let addr = k.machine.read_register(ARG1_REG) as usize;
            let n = k.machine.read_register(ARG2_REG) as usize;
            let fd = k.machine.read_register(ARG3_REG);
            match k.read_user_buffer(addr,n) {
                Ok(dat) => {
                    if fd==CONSOLE_OUTPUT {
                        print!("{}",String::from_utf8_lossy(&dat));
                        dat.len() as i32
                    } else {
                        let written = match k.open_files.get_mut(fd as usize).and_then(|s| s.as_mut()) {
                            Some(f) => k.fs.write_file(f,&dat).ok(),
                            None => None
                        };
                        match written {
                            Some(n) => n as i32,
                            None => -1
                        }
                    }
                },
                Err(_) => -1
            }
        },
        SyscallCode::Seek => {
            let pos = k.machine.read_register(ARG1_REG) as usize;
            let fd = k.machine.read_register(ARG2_REG);
            match k.open_files.get_mut(fd as usize).and_then(|s| s.as_mut()) {
                Some(f) => match f.seek(pos) {
                    Ok(()) => 0,
                    Err(_) => -1
                },
                None => -1
            }
        },
        SyscallCode::Close => {
            let fd = k.machine.read_register(ARG1_REG);
            match k.close_fd(fd) {
                true => 1,
                false => -1
            }
        },
        _ => unreachable!()
    };
    k.machine.write_register(RESULT_REG,result);
    k.machine.pc_advance();
}

fn thread_handler(k: &mut Kernel,code: SyscallCode) {
    match code {
        SyscallCode::Exec => {
            let addr = k.machine.read_register(ARG1_REG) as usize;
            let path = match k.read_user_string(addr,FILE_PATH_MAX_LEN) {
                Ok(path) => path,
                Err(_) => {
                    k.machine.write_register(RESULT_REG,-1);
                    k.machine.pc_advance();
                    return;
                }
            };
            let result = match k.threads.create_thread(&path,0) {
                Some(pid) => match k.mem.create_addr_space(&k.fs,pid,&path) {
                    Ok(()) => {
                        k.threads.get_mut(pid).expect("missing new thread").status = ThreadStatus::Ready;
                        pid
                    },
                    Err(e) => {
                        error!("exec of {} failed: {}",path,e);
                        k.threads.delete_thread(pid);
                        -1
                    }
                },
                None => -1
            };
            k.machine.write_register(RESULT_REG,result);
            k.machine.pc_advance();
        },
        SyscallCode::ThreadFork => {
            let func = k.machine.read_register(ARG1_REG);
            let current = k.threads.current();
            let result = match k.threads.create_thread("forked",0) {
                Some(pid) => match k.mem.fork_addr_space(current,pid) {
                    Ok(()) => {
                        let mut regs = *k.machine.registers();
                        regs[PC_REG] = func;
                        regs[NEXT_PC_REG] = func + 4;
                        let child = k.threads.get_mut(pid).expect("missing new thread");
                        child.set_user_state(&regs);
                        child.status = ThreadStatus::Ready;
                        pid
                    },
                    Err(e) => {
                        error!("fork failed: {}",e);
                        k.threads.delete_thread(pid);
                        -1
                    }
                },
                None => -1
            };
            k.machine.write_register(RESULT_REG,result);
            k.machine.pc_advance();
        },
        SyscallCode::ThreadYield => {
            k.machine.pc_advance();
            k.yield_current();
        },
        SyscallCode::Join | SyscallCode::ThreadJoin => {
            let child = k.machine.read_register(ARG1_REG);
            let current = k.threads.current();
            let is_child = match k.threads.get(current) {
                Some(t) => t.has_child(child),
                None => false
            };
            if !is_child {
                error!("thread {} is not a child, join failed",child);
                k.machine.write_register(RESULT_REG,-1);
                k.machine.pc_advance();
                return;
            }
            let mut polls = 0;
            loop {
                let still_there = match k.threads.get(current) {
                    Some(t) => t.has_child(child),
                    None => false
                };
                if !still_there {
                    debug!("child {} finished, join succeeds",child);
                    break;
                }
                if !k.threads.any_other_runnable(current) || polls >= JOIN_POLL_LIMIT {
                    warn!("join gave up waiting on thread {}",child);
                    break;
                }
                k.yield_current();
                polls += 1;
            }
            k.machine.write_register(RESULT_REG,0);
            k.machine.pc_advance();
        },
        SyscallCode::Exit | SyscallCode::ThreadExit => {
            let status = k.machine.read_register(ARG1_REG);
            info!("thread {} exits with status {}",k.threads.current(),status);
            k.machine.pc_advance();
            k.finish_current();
        },
        _ => unreachable!()
    }
}
