//! # Thread Registry Module
//!
//! The bookkeeping half of the thread system: pid allocation, parent and
//! child links, status, and the saved user registers each thread carries
//! across a switch.  Scheduling itself lives outside this crate; the
//! kernel only needs a current-thread pointer and the entries below.

use bit_vec::BitVec;
use log::{info,warn};
use crate::machine::{Machine,NUM_TOTAL_REGS};

pub const THREAD_COUNT_MAX: usize = 128;
pub const MAX_CHILDREN: usize = 8;

#[derive(PartialEq,Clone,Copy,Debug)]
pub enum ThreadStatus {
    Created,
    Running,
    Ready,
    Blocked,
    Zombie
}

impl ThreadStatus {
    fn label(&self) -> &str {
        match self {
            Self::Created => "Created",
            Self::Running => "Running",
            Self::Ready => "Ready",
            Self::Blocked => "Blocked",
            Self::Zombie => "Zombie"
        }
    }
}

pub struct Thread {
    pid: i32,
    uid: i32,
    name: String,
    pub status: ThreadStatus,
    pub parent: i32,
    pub children: [i32;MAX_CHILDREN],
    user_registers: [i32;NUM_TOTAL_REGS]
}

impl Thread {
    fn new(name: &str,uid: i32,pid: i32) -> Self {
        Self {
            pid,
            uid,
            name: name.to_string(),
            status: ThreadStatus::Created,
            parent: -1,
            children: [-1;MAX_CHILDREN],
            user_registers: [0;NUM_TOTAL_REGS]
        }
    }
    pub fn pid(&self) -> i32 {
        self.pid
    }
    pub fn uid(&self) -> i32 {
        self.uid
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    /// Record this thread's user registers off the machine.
    pub fn save_user_state(&mut self,machine: &Machine) {
        self.user_registers = *machine.registers();
    }
    /// Put this thread's user registers back on the machine.
    pub fn restore_user_state(&self,machine: &mut Machine) {
        machine.load_registers(&self.user_registers);
    }
    /// Seed the saved registers directly, used when a thread is forked
    /// with an entry point rather than resumed.
    pub fn set_user_state(&mut self,regs: &[i32;NUM_TOTAL_REGS]) {
        self.user_registers = *regs;
    }
    /// Occupy the first free child slot; false if all slots are taken.
    pub fn add_child(&mut self,pid: i32) -> bool {
        for slot in self.children.iter_mut() {
            if *slot==-1 {
                *slot = pid;
                return true;
            }
        }
        false
    }
    /// Clear the slot holding `pid`; false if it is not a child.
    pub fn remove_child(&mut self,pid: i32) -> bool {
        for slot in self.children.iter_mut() {
            if *slot==pid {
                *slot = -1;
                return true;
            }
        }
        false
    }
    pub fn has_child(&self,pid: i32) -> bool {
        self.children.contains(&pid)
    }
}

/// Registry of live threads with pid allocation from a bitmap.
pub struct ThreadManager {
    pid_map: BitVec,
    threads: Vec<Option<Thread>>,
    current: i32
}

impl ThreadManager {
    pub fn new() -> Self {
        Self {
            pid_map: BitVec::from_elem(THREAD_COUNT_MAX,false),
            threads: (0..THREAD_COUNT_MAX).map(|_| None).collect(),
            current: -1
        }
    }
    fn generate_pid(&mut self) -> Option<i32> {
        for pid in 0..THREAD_COUNT_MAX {
            if self.pid_map.get(pid)==Some(false) {
                self.pid_map.set(pid,true);
                return Some(pid as i32);
            }
        }
        None
    }
    /// Register a new thread; when a current thread exists it becomes
    /// the parent.  Returns the new pid, or None when the registry is
    /// full or the parent has no free child slot.
    pub fn create_thread(&mut self,name: &str,uid: i32) -> Option<i32> {
        let pid = match self.generate_pid() {
            Some(pid) => pid,
            None => {
                warn!("thread registry is full");
                return None;
            }
        };
        let mut thread = Thread::new(name,uid,pid);
        if self.current >= 0 {
            thread.parent = self.current;
            if !self.get_mut(self.current).expect("current thread missing").add_child(pid) {
                self.pid_map.set(pid as usize,false);
                warn!("thread {} has no free child slot",self.current);
                return None;
            }
        }
        info!("thread {} created, pid {}",name,pid);
        self.threads[pid as usize] = Some(thread);
        Some(pid)
    }
    /// Drop a thread, release its pid, and clear its slot in the parent.
    pub fn delete_thread(&mut self,pid: i32) {
        if pid >= 0 && (pid as usize) < THREAD_COUNT_MAX {
            let parent = match &self.threads[pid as usize] {
                Some(t) => t.parent,
                None => -1
            };
            if parent >= 0 {
                if let Some(p) = self.get_mut(parent) {
                    p.remove_child(pid);
                }
            }
            self.pid_map.set(pid as usize,false);
            self.threads[pid as usize] = None;
            if self.current==pid {
                self.current = -1;
            }
        }
    }
    pub fn get(&self,pid: i32) -> Option<&Thread> {
        match self.threads.get(pid as usize) {
            Some(slot) => slot.as_ref(),
            None => None
        }
    }
    pub fn get_mut(&mut self,pid: i32) -> Option<&mut Thread> {
        match self.threads.get_mut(pid as usize) {
            Some(slot) => slot.as_mut(),
            None => None
        }
    }
    pub fn current(&self) -> i32 {
        self.current
    }
    pub fn set_current(&mut self,pid: i32) {
        self.current = pid;
    }
    pub fn thread_count(&self) -> usize {
        self.threads.iter().filter(|t| t.is_some()).count()
    }
    /// True if some thread other than `pid` could be scheduled.
    pub fn any_other_runnable(&self,pid: i32) -> bool {
        self.threads.iter().flatten().any(|t| {
            t.pid() != pid && (t.status==ThreadStatus::Ready || t.status==ThreadStatus::Created)
        })
    }
    /// Print a status table for every live thread.
    pub fn list_thread_status(&self) {
        println!(" ThreadID | ThreadName | UserID | Status ");
        println!(" -------- | ---------- | ------ | ------ ");
        for t in self.threads.iter().flatten() {
            println!(" {:8} | {:10} | {:6} | {} ",t.pid(),t.name(),t.uid(),t.status.label());
        }
    }
}
