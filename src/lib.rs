//! # `oskit` main library
//!
//! This library is an instructional operating-system core over a
//! simulated block device: a hierarchical file system, a demand-paged
//! virtual memory system with a process-tagged TLB, and the syscall
//! boundary that joins them to user programs.
//!
//! ## Architecture
//!
//! The pieces layer bottom up:
//! * `dev` is the block device, a fixed array of 128-byte sectors
//! * `fs` imposes the file system: free map, one-sector file headers,
//!   count-prefixed directories, and a facade that owns the image
//! * `machine` models registers, physical memory, and the clock
//! * `vm` owns per-process address spaces, the shared frame pool with
//!   an LRU policy, and the 4x4 set-associative TLB
//! * `threads` is the registry half of the thread system
//! * `kernel` ties everything together behind the exception handler
//!
//! The `FileSystem` takes ownership of a `DiskImage` and uses it as
//! storage; changes are not permanent until the image is saved back to
//! whatever file is hosting it.  The `Kernel` in turn takes ownership
//! of the file system.

pub mod dev;
pub mod fs;
pub mod machine;
pub mod vm;
pub mod threads;
pub mod kernel;
pub mod commands;

use std::io::Read;
use log::info;

type DYNERR = Box<dyn std::error::Error>;
type STDRESULT = Result<(),Box<dyn std::error::Error>>;

/// Load a disk image from a host file and mount the file system on it.
pub fn create_fs_from_file(img_path: &str) -> Result<fs::FileSystem,DYNERR> {
    let dat = std::fs::read(img_path)?;
    let img = dev::DiskImage::from_bytes(&dat)?;
    info!("mounting image {}",img_path);
    Ok(fs::FileSystem::mount(img)?)
}

/// Load a disk image from stdin and mount the file system on it.
pub fn create_fs_from_stdin() -> Result<fs::FileSystem,DYNERR> {
    let mut dat = Vec::new();
    std::io::stdin().read_to_end(&mut dat)?;
    let img = dev::DiskImage::from_bytes(&dat)?;
    Ok(fs::FileSystem::mount(img)?)
}

/// Save the image file (make changes permanent).
pub fn save_img(disk: &fs::FileSystem,img_path: &str) -> STDRESULT {
    std::fs::write(img_path,disk.to_bytes())?;
    Ok(())
}

/// Display binary to stdout in columns of hex and ascii.
pub fn display_block(start_addr: usize,block: &[u8]) {
    let mut slice_start = 0;
    loop {
        let row_label = start_addr + slice_start;
        let mut slice_end = slice_start + 16;
        if slice_end > block.len() {
            slice_end = block.len();
        }
        let slice = &block[slice_start..slice_end];
        let txt: Vec<u8> = slice.iter().map(|c| match *c {
            x if x<32 => '.' as u8,
            x if x<127 => x,
            _ => '.' as u8
        }).collect();
        print!("{:04X} : ",row_label);
        for byte in slice {
            print!("{} ",hex::encode_upper([*byte]));
        }
        for _blank in slice_end..slice_start+16 {
            print!("   ");
        }
        println!("|{}|",String::from_utf8_lossy(&txt));
        slice_start += 16;
        if slice_end==block.len() {
            break;
        }
    }
}
