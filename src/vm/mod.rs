//! # Virtual Memory Module
//!
//! Demand paging over the file system: each process owns an address
//! space backed by its executable image, all processes share the
//! physical frame pool, and the fault handler moves pages between the
//! two.  Dirty pages are written back into the image itself at the
//! owning page's offset, so the image doubles as the swap store.

pub mod frames;
pub mod addrspace;
pub mod tlb;

use log::{info,debug,error};
use crate::fs::{FileSystem,Error};
use crate::machine::{Machine,PAGE_SIZE};
use frames::FramePool;
use addrspace::{AddrSpace,EXEC_HEADER_SIZE};
use tlb::Tlb;

/// Owns every address space plus the frame pool, and services page
/// faults on behalf of the current thread.
pub struct MemoryManager {
    spaces: Vec<Option<AddrSpace>>,
    pub frames: FramePool
}

impl MemoryManager {
    pub fn new(max_threads: usize,num_frames: usize) -> Self {
        Self {
            spaces: (0..max_threads).map(|_| None).collect(),
            frames: FramePool::new(num_frames)
        }
    }
    /// Create the address space for a thread from an executable path.
    /// Creating a space a thread already has is a no-op.
    pub fn create_addr_space(&mut self,fs: &FileSystem,thread_id: i32,path: &str) -> Result<(),Error> {
        let slot = match self.spaces.get_mut(thread_id as usize) {
            Some(slot) => slot,
            None => return Err(Error::BadArgument)
        };
        if slot.is_some() {
            debug!("thread {} already has an address space",thread_id);
            return Ok(());
        }
        *slot = Some(AddrSpace::new(fs,thread_id,path)?);
        Ok(())
    }
    /// Tear down a thread's address space, returning its frames to the
    /// pool.
    pub fn delete_addr_space(&mut self,thread_id: i32) {
        let slot = match self.spaces.get_mut(thread_id as usize) {
            Some(slot) => slot,
            None => return
        };
        if let Some(space) = slot {
            for pte in &space.page_table {
                if pte.valid {
                    self.frames.clear(pte.physical_page as usize);
                }
            }
            info!("address space of thread {} deleted",thread_id);
            *slot = None;
        }
    }
    /// Give `child_id` its own page table over the parent's executable.
    /// The new table starts invalid; demand paging repopulates it.
    pub fn fork_addr_space(&mut self,parent_id: i32,child_id: i32) -> Result<(),Error> {
        let parent = match self.space(parent_id) {
            Some(space) => space,
            None => return Err(Error::BadArgument)
        };
        let child = AddrSpace::duplicate(parent,child_id);
        match self.spaces.get_mut(child_id as usize) {
            Some(slot) if slot.is_none() => {
                *slot = Some(child);
                Ok(())
            },
            _ => Err(Error::BadArgument)
        }
    }
    pub fn space(&self,thread_id: i32) -> Option<&AddrSpace> {
        match self.spaces.get(thread_id as usize) {
            Some(slot) => slot.as_ref(),
            None => None
        }
    }
    pub fn space_mut(&mut self,thread_id: i32) -> Option<&mut AddrSpace> {
        match self.spaces.get_mut(thread_id as usize) {
            Some(slot) => slot.as_mut(),
            None => None
        }
    }
    /// Bring virtual page `vpn` of `thread_id` into memory and return
    /// the frame it landed in.  If the pool is full a victim is chosen,
    /// written back when dirty, and unbound.  The victim's TLB entry
    /// always dies before its page table entry does.
    pub fn page_fault(&mut self,fs: &mut FileSystem,machine: &mut Machine,tlb: &mut Tlb,thread_id: i32,vpn: usize) -> Result<usize,Error> {
        let space = match self.space(thread_id) {
            Some(space) => space,
            None => {
                error!("page fault for thread {} with no address space",thread_id);
                return Err(Error::BadArgument);
            }
        };
        if vpn >= space.num_pages() {
            error!("page fault beyond the address space, vpn {}",vpn);
            return Err(Error::BadArgument);
        }
        if space.page_table[vpn].valid {
            return Ok(space.page_table[vpn].physical_page as usize);
        }
        let frame = match self.frames.find_one_empty() {
            Some(f) => f,
            None => {
                let f = self.frames.swap_one();
                let owner = self.frames.main_thread(f);
                let owner_vpn = self.frames.virtual_page(f) as usize;
                let victim = self.space_mut(owner)
                    .unwrap_or_else(|| panic!("frame {} owned by thread {} which has no address space",f,owner));
                assert!(victim.page_table[owner_vpn].valid,
                    "frame {} bound to an invalid page table entry",f);
                if victim.page_table[owner_vpn].dirty {
                    let dat = machine.read_frame(f);
                    fs.write_file_at(&mut victim.exe,&dat,owner_vpn*PAGE_SIZE+EXEC_HEADER_SIZE)?;
                    debug!("dirty page {} of thread {} written back",owner_vpn,owner);
                }
                tlb.invalidate(owner,owner_vpn);
                let victim = self.space_mut(owner).expect("unreachable");
                victim.page_table[owner_vpn].valid = false;
                victim.page_table[owner_vpn].physical_page = -1;
                debug!("evicted page {} of thread {} from frame {}",owner_vpn,owner,f);
                f
            }
        };
        self.frames.set_main_thread(frame,thread_id);
        self.frames.set_virtual_page(frame,vpn as i32);
        self.frames.update_page_weight(frame,machine.total_ticks());

        let space = self.space_mut(thread_id).expect("unreachable");
        space.page_table[vpn].valid = true;
        space.page_table[vpn].physical_page = frame as i32;
        space.page_table[vpn].used = false;
        space.page_table[vpn].dirty = false;

        let dat = fs.read_file_at(&space.exe,PAGE_SIZE,vpn*PAGE_SIZE+EXEC_HEADER_SIZE)?;
        machine.write_frame(frame,&dat);
        debug!("page {} of thread {} loaded into frame {}",vpn,thread_id,frame);
        Ok(frame)
    }
}
