//! # Kernel Module
//!
//! Ties the machine, the file system, the virtual memory core, and the
//! thread registry together, and owns the boundary where user-mode
//! register conventions turn into kernel services.  The simulator calls
//! `exception_handler` whenever user code traps; everything else in this
//! module exists to serve that entry point.

pub mod syscall;

use log::{info,debug,error};
use crate::machine::{Machine,ExceptionKind,PAGE_SIZE,BAD_VADDR_REG};
use crate::fs::{FileSystem,Error};
use crate::fs::file::OpenFile;
use crate::vm::MemoryManager;
use crate::vm::tlb::Tlb;
use crate::threads::{ThreadManager,ThreadStatus,THREAD_COUNT_MAX};

/// Size of the kernel's open-file table; descriptors 0 and 1 are the
/// console and are never handed out.
pub const MAX_OPEN_FILES: usize = 16;
pub const CONSOLE_INPUT: i32 = 0;
pub const CONSOLE_OUTPUT: i32 = 1;

pub struct Kernel {
    pub machine: Machine,
    pub fs: FileSystem,
    pub tlb: Tlb,
    pub mem: MemoryManager,
    pub threads: ThreadManager,
    open_files: Vec<Option<OpenFile>>,
    halted: bool
}

impl Kernel {
    /// Assemble a kernel over a mounted file system with `num_frames`
    /// physical frames.
    pub fn new(fs: FileSystem,num_frames: usize) -> Self {
        Self {
            machine: Machine::new(num_frames),
            fs,
            tlb: Tlb::new(),
            mem: MemoryManager::new(THREAD_COUNT_MAX,num_frames),
            threads: ThreadManager::new(),
            open_files: (0..MAX_OPEN_FILES).map(|_| None).collect(),
            halted: false
        }
    }
    pub fn halted(&self) -> bool {
        self.halted
    }
    pub fn halt(&mut self) {
        info!("machine halting");
        self.halted = true;
    }

    /// Entry point from the simulator.  Every kernel entry advances the
    /// simulated clock, which is also what ages the LRU policies.
    pub fn exception_handler(&mut self,which: ExceptionKind) {
        self.machine.tick(1);
        match which {
            ExceptionKind::Syscall => syscall::dispatch(self),
            ExceptionKind::PageFault => {
                let bad = self.machine.read_register(BAD_VADDR_REG) as usize;
                if let Err(e) = self.handle_page_fault(bad) {
                    error!("unserviceable page fault at {}: {}",bad,e);
                }
                // the faulting instruction restarts, so the PC stays put
            },
            _ => {
                error!("unexpected user mode exception {:?}",which);
                self.machine.pc_advance();
            }
        }
    }
    fn handle_page_fault(&mut self,vaddr: usize) -> Result<(),Error> {
        let tid = self.threads.current();
        let frame = self.mem.page_fault(&mut self.fs,&mut self.machine,&mut self.tlb,tid,vaddr/PAGE_SIZE)?;
        self.tlb.update(vaddr,frame,tid);
        Ok(())
    }
    /// Virtual to physical through the TLB, faulting the page in on a
    /// miss.
    pub fn translate(&mut self,vaddr: usize) -> Result<usize,Error> {
        let tid = self.threads.current();
        if let Some(pa) = self.tlb.translate(vaddr,tid) {
            return Ok(pa);
        }
        self.handle_page_fault(vaddr)?;
        match self.tlb.translate(vaddr,tid) {
            Some(pa) => Ok(pa),
            None => panic!("translation missing immediately after page-in")
        }
    }
    pub fn read_user_byte(&mut self,vaddr: usize) -> Result<u8,Error> {
        let pa = self.translate(vaddr)?;
        let tid = self.threads.current();
        if let Some(space) = self.mem.space_mut(tid) {
            space.page_table[vaddr/PAGE_SIZE].used = true;
        }
        Ok(self.machine.read_phys_byte(pa))
    }
    pub fn write_user_byte(&mut self,vaddr: usize,val: u8) -> Result<(),Error> {
        let pa = self.translate(vaddr)?;
        let tid = self.threads.current();
        if let Some(space) = self.mem.space_mut(tid) {
            space.page_table[vaddr/PAGE_SIZE].dirty = true;
        }
        self.machine.write_phys_byte(pa,val);
        Ok(())
    }
    /// Read a NUL-terminated string out of user memory, truncated to
    /// `max_len` bytes.
    pub fn read_user_string(&mut self,addr: usize,max_len: usize) -> Result<String,Error> {
        let mut bytes: Vec<u8> = Vec::new();
        let mut position = 0;
        loop {
            let b = self.read_user_byte(addr+position)?;
            if b==0 {
                break;
            }
            if position < max_len {
                bytes.push(b);
            }
            position += 1;
        }
        Ok(String::from_utf8_lossy(&bytes).to_string())
    }
    /// Copy `n` bytes of user memory into a kernel buffer.
    pub fn read_user_buffer(&mut self,addr: usize,n: usize) -> Result<Vec<u8>,Error> {
        let mut ans = Vec::new();
        for i in 0..n {
            ans.push(self.read_user_byte(addr+i)?);
        }
        Ok(ans)
    }
    /// Copy a kernel buffer into user memory.
    pub fn write_user_buffer(&mut self,addr: usize,dat: &[u8]) -> Result<(),Error> {
        for i in 0..dat.len() {
            self.write_user_byte(addr+i,dat[i])?;
        }
        Ok(())
    }

    /// Hand out the lowest free descriptor above the console pair.
    pub fn alloc_fd(&mut self,f: OpenFile) -> Option<i32> {
        for fd in 2..self.open_files.len() {
            if self.open_files[fd].is_none() {
                self.open_files[fd] = Some(f);
                return Some(fd as i32);
            }
        }
        None
    }
    pub fn close_fd(&mut self,fd: i32) -> bool {
        let fd = fd as usize;
        if fd >= 2 && fd < self.open_files.len() && self.open_files[fd].is_some() {
            self.open_files[fd] = None;
            return true;
        }
        false
    }

    /// Give up the processor.  With the scheduler outside this crate the
    /// only observable effect is the clock moving.
    pub fn yield_current(&mut self) {
        debug!("thread {} yields",self.threads.current());
        self.machine.tick(10);
    }
    /// Tear down the current thread: address space, registry entry, and
    /// the parent's child slot.
    pub fn finish_current(&mut self) {
        let tid = self.threads.current();
        if tid < 0 {
            return;
        }
        let parent = match self.threads.get(tid) {
            Some(t) => t.parent,
            None => -1
        };
        if parent >= 0 {
            if let Some(p) = self.threads.get_mut(parent) {
                p.remove_child(tid);
            }
        }
        if let Some(t) = self.threads.get_mut(tid) {
            t.status = ThreadStatus::Zombie;
        }
        self.mem.delete_addr_space(tid);
        self.threads.delete_thread(tid);
        info!("thread {} finished",tid);
    }
}
