//! # Block Device Module
//!
//! The simulated disk is a fixed array of fixed-size sectors addressed by
//! sector number.  The whole image lives in memory; `to_bytes` and
//! `from_bytes` move it to and from whatever file is hosting the image.
//! Sector reads and writes are atomic, there is no notion of a partial
//! transfer at this layer.

use log::error;

/// Fixed sector length in bytes.  The virtual memory core sets its page
/// size equal to this, so the two layers trade buffers freely.
pub const SECTOR_SIZE: usize = 128;

/// Default sector count for a freshly created image.  The count is fixed
/// when the image is created and never changes afterwards.
pub const DEFAULT_NUM_SECTORS: usize = 1024;

#[derive(thiserror::Error,Debug)]
pub enum Error {
    #[error("sector address out of range")]
    SectorOutOfRange,
    #[error("buffer does not fit the sector geometry")]
    ImageSize
}

/// In-memory disk image backing the file system and the pager.
pub struct DiskImage {
    sectors: Vec<[u8;SECTOR_SIZE]>
}

impl DiskImage {
    /// Create a zeroed image with `num_sectors` sectors.
    pub fn new(num_sectors: usize) -> Self {
        Self {
            sectors: vec![[0;SECTOR_SIZE];num_sectors]
        }
    }
    /// Interpret a flat byte buffer as an image.  The buffer must be a
    /// whole number of sectors.
    pub fn from_bytes(dat: &[u8]) -> Result<Self,Error> {
        if dat.len()==0 || dat.len()%SECTOR_SIZE!=0 {
            error!("image buffer is {} bytes, not a whole number of sectors",dat.len());
            return Err(Error::ImageSize);
        }
        let mut sectors = Vec::new();
        for chunk in dat.chunks_exact(SECTOR_SIZE) {
            let mut sec = [0;SECTOR_SIZE];
            sec.copy_from_slice(chunk);
            sectors.push(sec);
        }
        Ok(Self { sectors })
    }
    /// Flatten the image, typically to save it in a host file.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut ans = Vec::new();
        for sec in &self.sectors {
            ans.extend_from_slice(sec);
        }
        ans
    }
    pub fn num_sectors(&self) -> usize {
        self.sectors.len()
    }
    /// Copy out one whole sector.
    pub fn read_sector(&self,n: usize) -> Result<[u8;SECTOR_SIZE],Error> {
        match self.sectors.get(n) {
            Some(sec) => Ok(*sec),
            None => {
                error!("read of sector {} beyond device end",n);
                Err(Error::SectorOutOfRange)
            }
        }
    }
    /// Write a sector.  If `dat` is shorter than the sector the trailing
    /// bytes are unaffected; longer buffers are refused.
    pub fn write_sector(&mut self,n: usize,dat: &[u8]) -> Result<(),Error> {
        if dat.len() > SECTOR_SIZE {
            return Err(Error::ImageSize);
        }
        match self.sectors.get_mut(n) {
            Some(sec) => {
                sec[0..dat.len()].copy_from_slice(dat);
                Ok(())
            },
            None => {
                error!("write of sector {} beyond device end",n);
                Err(Error::SectorOutOfRange)
            }
        }
    }
}
