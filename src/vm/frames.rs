//! ### Physical frame pool
//!
//! Allocation bitmap over the physical frames, per-frame owner records,
//! and a pluggable replacement policy.  The pool only names a victim;
//! the fault handler is responsible for unbinding it.

use bit_vec::BitVec;
use log::debug;

/// A replacement policy ranks frames by a weight; the victim is the
/// frame with the minimum weight, ties broken by the lowest index.
pub trait ReplacementPolicy {
    fn find_victim(&self) -> usize;
    fn update_weight(&mut self,index: usize,now: u64);
}

/// LRU by timestamp: the weight of a frame is the tick count of its last
/// binding or touch.
pub struct SwappingLru {
    last_used: Vec<i64>
}

impl SwappingLru {
    pub fn new(size: usize) -> Self {
        Self {
            last_used: vec![-1;size]
        }
    }
}

impl ReplacementPolicy for SwappingLru {
    fn find_victim(&self) -> usize {
        let mut min = 0;
        let mut target = 0;
        for i in 0..self.last_used.len() {
            if i==0 || self.last_used[i] < min {
                min = self.last_used[i];
                target = i;
            }
        }
        target
    }
    fn update_weight(&mut self,index: usize,now: u64) {
        self.last_used[index] = now as i64;
    }
}

/// Owner record for one allocated frame.
#[derive(Clone,Copy)]
struct FrameInfo {
    main_thread: i32,
    virtual_page: i32
}

pub struct FramePool {
    map: BitVec,
    frames: Vec<FrameInfo>,
    policy: Box<dyn ReplacementPolicy>
}

impl FramePool {
    pub fn new(num_frames: usize) -> Self {
        Self {
            map: BitVec::from_elem(num_frames,false),
            frames: vec![FrameInfo { main_thread: -1, virtual_page: -1 };num_frames],
            policy: Box::new(SwappingLru::new(num_frames))
        }
    }
    /// Lowest unallocated frame, marked used, or None if the pool is
    /// full.
    pub fn find_one_empty(&mut self) -> Option<usize> {
        for f in 0..self.map.len() {
            if self.map.get(f)==Some(false) {
                self.map.set(f,true);
                debug!("frame {} allocated",f);
                return Some(f);
            }
        }
        None
    }
    /// Ask the policy for a victim.  The frame is only named, not freed.
    pub fn swap_one(&self) -> usize {
        self.policy.find_victim()
    }
    pub fn clear(&mut self,f: usize) {
        if f < self.map.len() {
            self.map.set(f,false);
        }
    }
    pub fn is_allocated(&self,f: usize) -> bool {
        self.map.get(f)==Some(true)
    }
    pub fn main_thread(&self,f: usize) -> i32 {
        match self.is_allocated(f) {
            true => self.frames[f].main_thread,
            false => -1
        }
    }
    pub fn set_main_thread(&mut self,f: usize,thread_id: i32) {
        if self.is_allocated(f) {
            self.frames[f].main_thread = thread_id;
        }
    }
    pub fn virtual_page(&self,f: usize) -> i32 {
        match self.is_allocated(f) {
            true => self.frames[f].virtual_page,
            false => -1
        }
    }
    pub fn set_virtual_page(&mut self,f: usize,vpn: i32) {
        if self.is_allocated(f) {
            self.frames[f].virtual_page = vpn;
        }
    }
    /// Refresh the policy weight of an allocated frame.
    pub fn update_page_weight(&mut self,f: usize,now: u64) {
        if self.is_allocated(f) {
            self.policy.update_weight(f,now);
        }
    }
    pub fn num_frames(&self) -> usize {
        self.map.len()
    }
}
