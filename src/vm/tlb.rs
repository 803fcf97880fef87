//! ### Translation lookaside buffer
//!
//! Four sets of four ways; a virtual page maps to set `vpn & 3` with tag
//! `vpn >> 2`.  Entries are tagged by thread id, so a context switch
//! leaves the cache alone; only eviction by the fault handler removes a
//! translation.

use log::debug;
use crate::machine::PAGE_SIZE;

pub const TLB_SETS: usize = 4;
pub const TLB_WAYS: usize = 4;

#[derive(Clone,Copy)]
struct TlbEntry {
    tag: u32,
    ppn: i32,
    valid: bool,
    lru: u32,
    thread_id: i32
}

impl TlbEntry {
    fn empty() -> Self {
        Self { tag: 0, ppn: -1, valid: false, lru: 0, thread_id: -1 }
    }
}

pub struct Tlb {
    sets: [[TlbEntry;TLB_WAYS];TLB_SETS]
}

impl Tlb {
    pub fn new() -> Self {
        Self {
            sets: [[TlbEntry::empty();TLB_WAYS];TLB_SETS]
        }
    }
    /// Physical address for `vaddr` under `thread_id`, or None on a miss.
    /// A miss is the fault handler's signal, not a user-visible error.
    /// A hit resets that way's LRU counter.
    pub fn translate(&mut self,vaddr: usize,thread_id: i32) -> Option<usize> {
        let vpn = vaddr / PAGE_SIZE;
        let offset = vaddr % PAGE_SIZE;
        let set = vpn & 3;
        let tag = (vpn >> 2) as u32;
        for way in 0..TLB_WAYS {
            let e = &mut self.sets[set][way];
            if e.valid && e.tag==tag && e.thread_id==thread_id {
                e.lru = 0;
                return Some(e.ppn as usize * PAGE_SIZE + offset);
            }
        }
        None
    }
    /// Install a translation.  The victim way is the first invalid one,
    /// else the way with the largest LRU counter; every valid way ages
    /// during the scan.
    pub fn update(&mut self,vaddr: usize,ppn: usize,thread_id: i32) {
        let vpn = vaddr / PAGE_SIZE;
        let set = vpn & 3;
        let tag = (vpn >> 2) as u32;
        let mut index = 0;
        for way in 0..TLB_WAYS {
            if self.sets[set][way].valid {
                self.sets[set][way].lru += 1;
                if self.sets[set][way].lru > self.sets[set][index].lru {
                    index = way;
                }
            } else {
                index = way;
                break;
            }
        }
        match self.sets[set][index].valid {
            true => debug!("tlb replace set {} way {}",set,index),
            false => debug!("tlb fill set {} way {}",set,index)
        }
        self.sets[set][index] = TlbEntry {
            tag,
            ppn: ppn as i32,
            valid: true,
            lru: 0,
            thread_id
        };
    }
    /// Drop every way matching `(thread_id, vpn)` in the target set.
    pub fn invalidate(&mut self,thread_id: i32,vpn: usize) {
        let set = vpn & 3;
        let tag = (vpn >> 2) as u32;
        for way in 0..TLB_WAYS {
            let e = &mut self.sets[set][way];
            if e.valid && e.tag==tag && e.thread_id==thread_id {
                e.valid = false;
            }
        }
    }
    /// True if any way holds `(thread_id, vpn)`.
    pub fn probe(&self,thread_id: i32,vpn: usize) -> bool {
        let set = vpn & 3;
        let tag = (vpn >> 2) as u32;
        self.sets[set].iter().any(|e| e.valid && e.tag==tag && e.thread_id==thread_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hit_and_miss() {
        let mut tlb = Tlb::new();
        tlb.update(5*PAGE_SIZE,7,1);
        assert_eq!(tlb.translate(5*PAGE_SIZE+13,1),Some(7*PAGE_SIZE+13));
        assert_eq!(tlb.translate(6*PAGE_SIZE,1),None);
    }

    #[test]
    fn tagged_by_process() {
        let mut tlb = Tlb::new();
        tlb.update(5*PAGE_SIZE,7,1);
        // same page under another thread must miss
        assert_eq!(tlb.translate(5*PAGE_SIZE,2),None);
        assert_eq!(tlb.translate(5*PAGE_SIZE,1),Some(7*PAGE_SIZE));
    }

    #[test]
    fn invalidate_by_thread_and_page() {
        let mut tlb = Tlb::new();
        tlb.update(5*PAGE_SIZE,7,1);
        tlb.update(5*PAGE_SIZE,8,2);
        tlb.invalidate(1,5);
        assert!(!tlb.probe(1,5));
        assert!(tlb.probe(2,5));
        assert_eq!(tlb.translate(5*PAGE_SIZE,2),Some(8*PAGE_SIZE));
    }

    #[test]
    fn set_eviction_prefers_stale_way() {
        let mut tlb = Tlb::new();
        // pages 0,4,8,12 all land in set 0
        tlb.update(0,10,1);
        tlb.update(4*PAGE_SIZE,11,1);
        tlb.update(8*PAGE_SIZE,12,1);
        tlb.update(12*PAGE_SIZE,13,1);
        // touch the first so it is fresh again
        assert!(tlb.translate(0,1).is_some());
        // a fifth page in the set evicts one of the stale ways
        tlb.update(16*PAGE_SIZE,14,1);
        assert!(tlb.translate(0,1).is_some());
        assert!(tlb.translate(16*PAGE_SIZE,1).is_some());
    }
}
