//! ### File header
//!
//! The on-disk record naming the sectors that compose a file (the i-node
//! of this file system).  The record is arranged to be exactly one
//! sector.  Data sectors are addressed through a fixed table of direct
//! pointers plus a single indirect sector that is allocated the first
//! time the direct table overflows.

use binrw::{binrw,BinRead,BinWrite};
use std::io::Cursor;
use num_traits::FromPrimitive;
use log::{debug,error};
use crate::dev::{DiskImage,SECTOR_SIZE};
use super::freemap::SectorBitmap;
use super::types::*;

/// One-sector file header, little-endian throughout.  `direct` slots and
/// the `indirect` pointer hold `-1` when empty.
#[binrw]
#[brw(little)]
#[derive(Clone,Debug,PartialEq)]
pub struct FileHeader {
    file_type: u32,
    limit: u32,
    capacity: u32,
    num_sectors: u32,
    self_sector: i32,
    create_time: i64,
    name: [u8;FILE_NAME_MAX_LEN+1],
    pad: [u8;2],
    direct: [i32;NUM_DIRECT],
    indirect: i32
}

impl FileHeader {
    pub fn new(name: &str,typ: FileType,self_sector: usize,time: Option<chrono::NaiveDateTime>) -> Self {
        let stamp = match time {
            Some(t) => t.and_utc().timestamp(),
            None => chrono::Utc::now().timestamp()
        };
        Self {
            file_type: typ as u32,
            limit: 0,
            capacity: 0,
            num_sectors: 0,
            self_sector: self_sector as i32,
            create_time: stamp,
            name: pack_name(name),
            pad: [0;2],
            direct: [-1;NUM_DIRECT],
            indirect: -1
        }
    }
    pub fn file_type(&self) -> FileType {
        match FileType::from_u32(self.file_type) {
            Some(typ) => typ,
            None => FileType::Unknown
        }
    }
    pub fn limit(&self) -> usize {
        self.limit as usize
    }
    pub fn capacity(&self) -> usize {
        self.capacity as usize
    }
    pub fn num_sectors(&self) -> usize {
        self.num_sectors as usize
    }
    pub fn self_sector(&self) -> usize {
        self.self_sector as usize
    }
    pub fn name(&self) -> String {
        unpack_name(&self.name)
    }
    pub fn create_time(&self) -> i64 {
        self.create_time
    }
    /// Accepts any limit up to the allocated capacity.
    pub fn set_limit(&mut self,p: usize) -> Result<(),Error> {
        if p > self.capacity as usize {
            return Err(Error::BadArgument);
        }
        self.limit = p as u32;
        Ok(())
    }
    fn read_indirect(&self,dev: &DiskImage) -> Result<[i32;NUM_INDIRECT],Error> {
        let buf = dev.read_sector(self.indirect as usize)?;
        let mut table = [-1;NUM_INDIRECT];
        for i in 0..NUM_INDIRECT {
            table[i] = i32::from_le_bytes([buf[i*4],buf[i*4+1],buf[i*4+2],buf[i*4+3]]);
        }
        Ok(table)
    }
    fn write_indirect(&self,dev: &mut DiskImage,table: &[i32;NUM_INDIRECT]) -> Result<(),Error> {
        let mut buf = [0;SECTOR_SIZE];
        for i in 0..NUM_INDIRECT {
            buf[i*4..i*4+4].copy_from_slice(&i32::to_le_bytes(table[i]));
        }
        dev.write_sector(self.indirect as usize,&buf)?;
        Ok(())
    }
    /// Extend the file by `bytes`, claiming whole sectors from the free
    /// map.  Slack in the last allocated sector is consumed first, so
    /// `num_sectors` always equals the capacity rounded up to sectors.
    /// Direct slots fill first; the indirect sector is claimed on the
    /// first overflow.  Nothing is changed on failure.
    pub fn allocate(&mut self,dev: &mut DiskImage,map: &mut SectorBitmap,bytes: usize) -> Result<(),Error> {
        if bytes==0 {
            return Ok(());
        }
        let new_capacity = self.capacity as usize + bytes;
        if new_capacity > MAX_FILE_SIZE {
            error!("request for {} bytes would exceed the maximum file size",bytes);
            return Err(Error::TooLarge);
        }
        let old_sectors = self.num_sectors as usize;
        let new_sectors = (new_capacity + SECTOR_SIZE - 1) / SECTOR_SIZE;
        let n = new_sectors - old_sectors;
        if n==0 {
            self.capacity = new_capacity as u32;
            return Ok(());
        }
        let needs_indirect = self.indirect < 0 && new_sectors > NUM_DIRECT;
        if map.num_clear() < n + needs_indirect as usize {
            return Err(Error::NoSpace);
        }
        let mut table = match self.indirect {
            -1 => [-1;NUM_INDIRECT],
            _ => self.read_indirect(dev)?
        };
        let mut touched_indirect = false;
        for i in 0..n {
            let s = match map.find_and_set() {
                Some(s) => s as i32,
                None => return Err(Error::NoSpace)
            };
            let idx = old_sectors + i;
            if idx < NUM_DIRECT {
                self.direct[idx] = s;
            } else {
                if self.indirect < 0 {
                    self.indirect = match map.find_and_set() {
                        Some(s) => s as i32,
                        None => return Err(Error::NoSpace)
                    };
                }
                table[idx-NUM_DIRECT] = s;
                touched_indirect = true;
            }
        }
        if touched_indirect {
            self.write_indirect(dev,&table)?;
        }
        self.num_sectors = new_sectors as u32;
        self.capacity = new_capacity as u32;
        debug!("extended {} by {} sectors",self.name(),n);
        Ok(())
    }
    /// Return every referenced sector to the free map, including the
    /// indirect sector, and reset the length fields.
    pub fn deallocate(&mut self,dev: &DiskImage,map: &mut SectorBitmap) -> Result<(),Error> {
        let table = match self.indirect {
            -1 => [-1;NUM_INDIRECT],
            _ => self.read_indirect(dev)?
        };
        for i in 0..self.num_sectors as usize {
            let s = match i < NUM_DIRECT {
                true => self.direct[i],
                false => table[i-NUM_DIRECT]
            };
            map.clear(s as usize);
        }
        if self.indirect >= 0 {
            map.clear(self.indirect as usize);
        }
        self.limit = 0;
        self.capacity = 0;
        self.num_sectors = 0;
        self.direct = [-1;NUM_DIRECT];
        self.indirect = -1;
        Ok(())
    }
    /// Sector holding the byte at `offset`.
    pub fn byte_to_sector(&self,dev: &DiskImage,offset: usize) -> Result<usize,Error> {
        if offset >= self.capacity as usize {
            return Err(Error::BadArgument);
        }
        let i = offset / SECTOR_SIZE;
        if i < NUM_DIRECT {
            return Ok(self.direct[i] as usize);
        }
        let table = self.read_indirect(dev)?;
        Ok(table[i-NUM_DIRECT] as usize)
    }
    /// Bit-exact copy of the record from sector `s`.
    pub fn fetch_from(dev: &DiskImage,s: usize) -> Result<Self,Error> {
        let buf = dev.read_sector(s)?;
        let mut hdr = match Self::read_le(&mut Cursor::new(&buf[..])) {
            Ok(hdr) => hdr,
            Err(_) => return Err(Error::IOError)
        };
        hdr.self_sector = s as i32;
        Ok(hdr)
    }
    /// Bit-exact copy of the record to its own sector.
    pub fn write_back(&self,dev: &mut DiskImage) -> Result<(),Error> {
        let mut cur = Cursor::new(Vec::new());
        if self.write_le(&mut cur).is_err() {
            return Err(Error::IOError);
        }
        dev.write_sector(self.self_sector as usize,&cur.into_inner())?;
        Ok(())
    }
}
