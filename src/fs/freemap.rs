//! ### Sector allocators
//!
//! Two shapes of the free-sector map.  `SectorBitmap` records presence
//! only and is persisted through the free-map file by the facade.
//! `SectorChainMap` keeps one integer per sector: `0` free, `-1` used
//! tail, any other value the successor sector in a file's chain.  The
//! chain map persists itself to a fixed region of the disk and therefore
//! needs no file header, which breaks the bootstrap cycle.

use bit_vec::BitVec;
use log::{debug,error};
use crate::dev::{DiskImage,SECTOR_SIZE};
use super::types::{Error,FREE_MAP_SECTOR,ROOT_DIR_SECTOR};

/// First sector of the region holding the chain map's own data.
pub const CHAIN_MAP_FIRST_SECTOR: usize = 3;

/// Presence-only allocation bitmap over the disk sectors.
pub struct SectorBitmap {
    map: BitVec,
}

impl SectorBitmap {
    /// Create a map with every sector free.
    pub fn new(num_sectors: usize) -> Self {
        Self {
            map: BitVec::from_elem(num_sectors,false)
        }
    }
    pub fn mark(&mut self,s: usize) -> Result<(),Error> {
        if s >= self.map.len() {
            error!("mark of sector {} out of range",s);
            return Err(Error::BadArgument);
        }
        self.map.set(s,true);
        Ok(())
    }
    pub fn clear(&mut self,s: usize) {
        if s < self.map.len() {
            self.map.set(s,false);
        }
    }
    pub fn test(&self,s: usize) -> bool {
        self.map.get(s)==Some(true)
    }
    /// Return the lowest free sector, marking it used, or None if the
    /// disk is full.
    pub fn find_and_set(&mut self) -> Option<usize> {
        for s in 0..self.map.len() {
            if !self.test(s) {
                self.map.set(s,true);
                return Some(s);
            }
        }
        None
    }
    pub fn num_clear(&self) -> usize {
        self.map.iter().filter(|b| !b).count()
    }
    pub fn num_sectors(&self) -> usize {
        self.map.len()
    }
    /// Serialized length in bytes, one bit per sector.
    pub fn disk_len(&self) -> usize {
        (self.map.len()+7)/8
    }
    pub fn to_bytes(&self) -> Vec<u8> {
        self.map.to_bytes()
    }
    pub fn from_bytes(dat: &[u8],num_sectors: usize) -> Self {
        let mut map = BitVec::from_bytes(dat);
        map.truncate(num_sectors);
        Self { map }
    }
}

/// Linked integer map: allocation state plus successor links, persisted
/// to the fixed region starting at `CHAIN_MAP_FIRST_SECTOR`.
pub struct SectorChainMap {
    map: Vec<i32>,
}

impl SectorChainMap {
    pub fn new(num_sectors: usize) -> Self {
        Self {
            map: vec![0;num_sectors]
        }
    }
    /// Sectors occupied by the map itself.
    pub fn own_sectors(num_sectors: usize) -> usize {
        (num_sectors * 4 + SECTOR_SIZE - 1) / SECTOR_SIZE
    }
    /// Record `s` as used with no successor.
    pub fn mark(&mut self,s: usize) -> Result<(),Error> {
        self.link(s,-1)
    }
    /// Record `s` as used and store its successor link.
    pub fn link(&mut self,s: usize,succ: i32) -> Result<(),Error> {
        if s >= self.map.len() {
            error!("mark of sector {} out of range",s);
            return Err(Error::BadArgument);
        }
        self.map[s] = succ;
        Ok(())
    }
    pub fn clear(&mut self,s: usize) {
        if s < self.map.len() {
            self.map[s] = 0;
        }
    }
    pub fn test(&self,s: usize) -> bool {
        s < self.map.len() && self.map[s] != 0
    }
    /// Stored successor for `s`; `-1` marks the tail of a chain.
    pub fn next(&self,s: usize) -> i32 {
        self.map[s]
    }
    pub fn find_and_set(&mut self) -> Option<usize> {
        for s in 0..self.map.len() {
            if self.map[s]==0 {
                self.map[s] = -1;
                return Some(s);
            }
        }
        None
    }
    pub fn num_clear(&self) -> usize {
        self.map.iter().filter(|v| **v==0).count()
    }
    /// Format path: reserve the bootstrap headers and the map's own
    /// sectors, linking the latter into a tail-terminated chain, then
    /// persist.  No file header is consulted at any point.
    pub fn format(&mut self,dev: &mut DiskImage) -> Result<(),Error> {
        self.mark(FREE_MAP_SECTOR)?;
        self.mark(ROOT_DIR_SECTOR)?;
        let n = Self::own_sectors(self.map.len());
        let mut t = CHAIN_MAP_FIRST_SECTOR;
        for _i in 0..n {
            self.link(t,(t+1) as i32)?;
            t += 1;
        }
        self.link(t-1,-1)?;
        self.write_back(dev)
    }
    /// Read the whole map from its fixed region.
    pub fn fetch_from(&mut self,dev: &DiskImage) -> Result<(),Error> {
        let n = Self::own_sectors(self.map.len());
        let mut buf: Vec<u8> = Vec::new();
        for i in 0..n {
            buf.extend_from_slice(&dev.read_sector(CHAIN_MAP_FIRST_SECTOR+i)?);
        }
        for s in 0..self.map.len() {
            self.map[s] = i32::from_le_bytes([buf[s*4],buf[s*4+1],buf[s*4+2],buf[s*4+3]]);
        }
        Ok(())
    }
    /// Write the whole map to its fixed region.
    pub fn write_back(&self,dev: &mut DiskImage) -> Result<(),Error> {
        debug!("writing chain map, {} sectors free",self.num_clear());
        let mut buf: Vec<u8> = Vec::new();
        for v in &self.map {
            buf.extend_from_slice(&i32::to_le_bytes(*v));
        }
        let n = Self::own_sectors(self.map.len());
        buf.resize(n*SECTOR_SIZE,0);
        for i in 0..n {
            dev.write_sector(CHAIN_MAP_FIRST_SECTOR+i,&buf[i*SECTOR_SIZE..(i+1)*SECTOR_SIZE])?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bitmap_find_and_set_ascends() {
        let mut map = SectorBitmap::new(8);
        map.mark(0).expect("mark failed");
        map.mark(2).expect("mark failed");
        assert_eq!(map.find_and_set(),Some(1));
        assert_eq!(map.find_and_set(),Some(3));
        assert_eq!(map.num_clear(),4);
        map.clear(2);
        assert_eq!(map.find_and_set(),Some(2));
    }

    #[test]
    fn bitmap_exhaustion() {
        let mut map = SectorBitmap::new(2);
        assert_eq!(map.find_and_set(),Some(0));
        assert_eq!(map.find_and_set(),Some(1));
        assert_eq!(map.find_and_set(),None);
    }

    #[test]
    fn bitmap_serialization() {
        let mut map = SectorBitmap::new(16);
        map.mark(3).expect("mark failed");
        map.mark(15).expect("mark failed");
        let copy = SectorBitmap::from_bytes(&map.to_bytes(),16);
        for s in 0..16 {
            assert_eq!(map.test(s),copy.test(s)," at sector {}",s);
        }
    }

    #[test]
    fn chain_walk() {
        let mut map = SectorChainMap::new(32);
        // build the chain 5 -> 9 -> 12
        map.link(5,9).expect("link failed");
        map.link(9,12).expect("link failed");
        map.mark(12).expect("mark failed");
        assert_eq!(map.next(5),9);
        assert_eq!(map.next(9),12);
        assert_eq!(map.next(12),-1);
        assert!(map.test(5) && map.test(12));
        assert!(!map.test(6));
    }

    #[test]
    fn chain_map_self_bootstrap() {
        let mut dev = DiskImage::new(128);
        let mut map = SectorChainMap::new(128);
        map.format(&mut dev).expect("format failed");
        // headers and the map's own sectors are reserved
        assert!(map.test(FREE_MAP_SECTOR));
        assert!(map.test(ROOT_DIR_SECTOR));
        let own = SectorChainMap::own_sectors(128);
        assert_eq!(own,4);
        for i in 0..own {
            assert!(map.test(CHAIN_MAP_FIRST_SECTOR+i));
        }
        // the map's own sectors form a tail-terminated chain
        let mut s = CHAIN_MAP_FIRST_SECTOR;
        for _i in 0..own-1 {
            s = map.next(s) as usize;
        }
        assert_eq!(map.next(s),-1);
        // a fresh map recovers the same state from the device alone
        let mut copy = SectorChainMap::new(128);
        copy.fetch_from(&dev).expect("fetch failed");
        for s in 0..128 {
            assert_eq!(map.next(s),copy.next(s)," at sector {}",s);
        }
        assert_eq!(copy.num_clear(),128-2-own);
    }
}
