//! ### Address spaces
//!
//! A per-process page table plus the open executable file that backs it.
//! Pages are demand-loaded from the executable image; nothing is brought
//! into memory when the space is created.

use binrw::{binrw,BinRead,BinWrite};
use std::io::Cursor;
use log::{info,error};
use crate::fs::{FileSystem,Error};
use crate::fs::file::OpenFile;
use crate::machine::PAGE_SIZE;

pub const EXEC_MAGIC: u32 = 0x00badfad;
/// Serialized length of `ExecHeader`; page offsets in the image start
/// here.
pub const EXEC_HEADER_SIZE: usize = 40;
pub const USER_STACK_SIZE: usize = 1024;

/// One segment of a flat executable image.
#[binrw]
#[brw(little)]
#[derive(Clone,Copy,Debug,PartialEq)]
pub struct Segment {
    pub virtual_addr: i32,
    pub in_file_addr: i32,
    pub size: i32
}

/// Header of a flat executable image: a magic word and three segment
/// descriptors.
#[binrw]
#[brw(little,magic = 0x00badfadu32)]
#[derive(Clone,Copy,Debug,PartialEq)]
pub struct ExecHeader {
    pub code: Segment,
    pub init_data: Segment,
    pub uninit_data: Segment
}

impl ExecHeader {
    pub fn new(code_size: usize,init_data_size: usize,uninit_data_size: usize) -> Self {
        Self {
            code: Segment { virtual_addr: 0, in_file_addr: EXEC_HEADER_SIZE as i32, size: code_size as i32 },
            init_data: Segment {
                virtual_addr: code_size as i32,
                in_file_addr: (EXEC_HEADER_SIZE+code_size) as i32,
                size: init_data_size as i32
            },
            uninit_data: Segment {
                virtual_addr: (code_size+init_data_size) as i32,
                in_file_addr: 0,
                size: uninit_data_size as i32
            }
        }
    }
    pub fn from_bytes(dat: &[u8]) -> Result<Self,Error> {
        match Self::read_le(&mut Cursor::new(dat)) {
            Ok(hdr) => Ok(hdr),
            Err(_) => {
                error!("executable image header is damaged");
                Err(Error::BadArgument)
            }
        }
    }
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut cur = Cursor::new(Vec::new());
        self.write_le(&mut cur).expect("header serialization cannot fail");
        cur.into_inner()
    }
    /// Bytes of address space the image needs, stack excluded.
    pub fn image_size(&self) -> usize {
        (self.code.size + self.init_data.size + self.uninit_data.size) as usize
    }
}

/// One page table entry.
#[derive(Clone,Copy,Debug)]
pub struct PageTableEntry {
    pub virtual_page: usize,
    pub physical_page: i32,
    pub valid: bool,
    pub used: bool,
    pub dirty: bool,
    pub read_only: bool
}

impl PageTableEntry {
    fn invalid(vpn: usize) -> Self {
        Self {
            virtual_page: vpn,
            physical_page: -1,
            valid: false,
            used: false,
            dirty: false,
            read_only: false
        }
    }
}

/// Page table plus the executable the pages come from.
pub struct AddrSpace {
    thread_id: i32,
    num_pages: usize,
    pub page_table: Vec<PageTableEntry>,
    pub exe: OpenFile
}

impl AddrSpace {
    /// Build the space for `thread_id` from the executable at `path`.
    /// Every entry starts invalid; the fault handler fills them.
    pub fn new(fs: &FileSystem,thread_id: i32,path: &str) -> Result<Self,Error> {
        let exe = fs.open(path)?;
        let hdr_bytes = fs.read_file_at(&exe,EXEC_HEADER_SIZE,0)?;
        if hdr_bytes.len() < EXEC_HEADER_SIZE {
            error!("{} is too short to be an executable image",path);
            return Err(Error::BadArgument);
        }
        let hdr = ExecHeader::from_bytes(&hdr_bytes)?;
        let size = hdr.image_size() + USER_STACK_SIZE;
        let num_pages = (size + PAGE_SIZE - 1) / PAGE_SIZE;
        info!("address space for thread {}: {} pages from {}",thread_id,num_pages,path);
        Ok(Self {
            thread_id,
            num_pages,
            page_table: (0..num_pages).map(PageTableEntry::invalid).collect(),
            exe
        })
    }
    /// A fresh space for `thread_id` over the same executable, with an
    /// all-invalid page table.
    pub fn duplicate(other: &AddrSpace,thread_id: i32) -> Self {
        Self {
            thread_id,
            num_pages: other.num_pages,
            page_table: (0..other.num_pages).map(PageTableEntry::invalid).collect(),
            exe: other.exe.clone()
        }
    }
    pub fn thread_id(&self) -> i32 {
        self.thread_id
    }
    pub fn num_pages(&self) -> usize {
        self.num_pages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exec_header_round_trip() {
        let hdr = ExecHeader::new(300,100,50);
        let dat = hdr.to_bytes();
        assert_eq!(dat.len(),EXEC_HEADER_SIZE);
        assert_eq!(&dat[0..4],&u32::to_le_bytes(EXEC_MAGIC));
        let copy = ExecHeader::from_bytes(&dat).expect("parse failed");
        assert_eq!(hdr,copy);
        assert_eq!(copy.image_size(),450);
    }

    #[test]
    fn bad_magic_refused() {
        let mut dat = ExecHeader::new(10,0,0).to_bytes();
        dat[0] ^= 0xff;
        assert!(ExecHeader::from_bytes(&dat).is_err());
    }
}
