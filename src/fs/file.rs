//! ### Open file handle
//!
//! An `OpenFile` carries the in-memory header of a file plus a seek
//! position.  All transfers are whole-sector against the device, with
//! read-modify-write on partial spans.  Writing past the allocated
//! capacity extends the file through the header; the caller is
//! responsible for persisting the touched header and free map (the
//! facade does this before reporting success).

use log::debug;
use crate::dev::{DiskImage,SECTOR_SIZE};
use super::freemap::SectorBitmap;
use super::header::FileHeader;
use super::types::Error;

#[derive(Clone)]
pub struct OpenFile {
    pub hdr: FileHeader,
    pos: usize
}

impl OpenFile {
    /// Open the file whose header lives at `sector`.
    pub fn open(dev: &DiskImage,sector: usize) -> Result<Self,Error> {
        Ok(Self {
            hdr: FileHeader::fetch_from(dev,sector)?,
            pos: 0
        })
    }
    pub fn from_header(hdr: FileHeader) -> Self {
        Self { hdr, pos: 0 }
    }
    /// User-visible byte length.
    pub fn length(&self) -> usize {
        self.hdr.limit()
    }
    pub fn tell(&self) -> usize {
        self.pos
    }
    pub fn seek(&mut self,pos: usize) -> Result<(),Error> {
        if pos > self.hdr.limit() {
            return Err(Error::BadArgument);
        }
        self.pos = pos;
        Ok(())
    }
    /// Read up to `num_bytes` starting at `offset`, clamped to the file
    /// length.  Reading at or past the end returns an empty buffer.
    pub fn read_at(&self,dev: &DiskImage,num_bytes: usize,offset: usize) -> Result<Vec<u8>,Error> {
        let limit = self.hdr.limit();
        if offset >= limit || num_bytes==0 {
            return Ok(Vec::new());
        }
        let n = usize::min(num_bytes,limit-offset);
        let first = offset / SECTOR_SIZE;
        let last = (offset+n-1) / SECTOR_SIZE;
        let mut span: Vec<u8> = Vec::new();
        for i in first..last+1 {
            let s = self.hdr.byte_to_sector(dev,i*SECTOR_SIZE)?;
            span.extend_from_slice(&dev.read_sector(s)?);
        }
        let skip = offset - first*SECTOR_SIZE;
        Ok(span[skip..skip+n].to_vec())
    }
    /// Write `dat` starting at `offset`, extending the file when the
    /// write runs past the allocated capacity.
    pub fn write_at(&mut self,dev: &mut DiskImage,map: &mut SectorBitmap,dat: &[u8],offset: usize) -> Result<usize,Error> {
        if dat.len()==0 {
            return Ok(0);
        }
        let end = offset + dat.len();
        if end > self.hdr.capacity() {
            let grow = end - self.hdr.capacity();
            self.hdr.allocate(dev,map,grow)?;
            debug!("write extended {} to {} bytes",self.hdr.name(),self.hdr.capacity());
        }
        let first = offset / SECTOR_SIZE;
        let last = (end-1) / SECTOR_SIZE;
        // assemble the whole span, patch it, then write it back
        let mut span: Vec<u8> = Vec::new();
        for i in first..last+1 {
            let s = self.hdr.byte_to_sector(dev,i*SECTOR_SIZE)?;
            span.extend_from_slice(&dev.read_sector(s)?);
        }
        let skip = offset - first*SECTOR_SIZE;
        span[skip..skip+dat.len()].copy_from_slice(dat);
        for i in first..last+1 {
            let s = self.hdr.byte_to_sector(dev,i*SECTOR_SIZE)?;
            let from = (i-first)*SECTOR_SIZE;
            dev.write_sector(s,&span[from..from+SECTOR_SIZE])?;
        }
        if end > self.hdr.limit() {
            self.hdr.set_limit(end)?;
        }
        Ok(dat.len())
    }
    /// Sequential read from the current position.
    pub fn read(&mut self,dev: &DiskImage,num_bytes: usize) -> Result<Vec<u8>,Error> {
        let ans = self.read_at(dev,num_bytes,self.pos)?;
        self.pos += ans.len();
        Ok(ans)
    }
    /// Sequential write at the current position.
    pub fn write(&mut self,dev: &mut DiskImage,map: &mut SectorBitmap,dat: &[u8]) -> Result<usize,Error> {
        let n = self.write_at(dev,map,dat,self.pos)?;
        self.pos += n;
        Ok(n)
    }
}
