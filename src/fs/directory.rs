//! ### Directory structures
//!
//! A directory is a table of fixed length entries mapping a component
//! name to the sector holding that file's header.  On disk the table is
//! prefixed by a 4-byte entry count, so the table can be grown.  An entry
//! with `in_use` cleared is reusable.

use binrw::{binrw,BinRead,BinWrite};
use std::io::Cursor;
use log::error;
use super::types::*;

/// On-disk entry: `(in_use, name, header sector)`, 15 bytes.
#[binrw]
#[brw(little)]
#[derive(Clone,Debug,PartialEq)]
pub struct DirectoryEntry {
    in_use: u8,
    name: [u8;FILE_NAME_MAX_LEN+1],
    sector: i32
}

impl DirectoryEntry {
    fn empty() -> Self {
        Self {
            in_use: 0,
            name: [0;FILE_NAME_MAX_LEN+1],
            sector: -1
        }
    }
}

/// In-memory directory image.  Operations work on the image; the facade
/// persists it through the backing file.
#[binrw]
#[brw(little)]
#[derive(Clone,Debug,PartialEq)]
pub struct Directory {
    #[br(temp)]
    #[bw(calc = table.len() as u32)]
    count: u32,
    #[br(count = count)]
    table: Vec<DirectoryEntry>
}

impl Directory {
    /// An empty directory with `size` reusable slots.
    pub fn new(size: usize) -> Self {
        Self {
            table: vec![DirectoryEntry::empty();size]
        }
    }
    pub fn from_bytes(dat: &[u8]) -> Result<Self,Error> {
        match Self::read_le(&mut Cursor::new(dat)) {
            Ok(dir) => Ok(dir),
            Err(_) => {
                error!("could not interpret directory image");
                Err(Error::IOError)
            }
        }
    }
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut cur = Cursor::new(Vec::new());
        self.write_le(&mut cur).expect("directory serialization cannot fail");
        cur.into_inner()
    }
    /// Length of the serialized image in bytes.
    pub fn disk_len(&self) -> usize {
        4 + self.table.len() * 15
    }
    /// First in-use entry whose name matches under the truncated byte
    /// compare.
    pub fn find_index(&self,name: &str) -> Option<usize> {
        for i in 0..self.table.len() {
            if self.table[i].in_use != 0 && name_matches(&self.table[i].name,name) {
                return Some(i);
            }
        }
        None
    }
    /// Header sector of the named entry.
    pub fn find(&self,name: &str) -> Option<usize> {
        self.find_index(name).map(|i| self.table[i].sector as usize)
    }
    /// Occupy the first free slot, growing the table by doubling when
    /// every slot is taken.  Existing entries keep their order and their
    /// `in_use` state across a growth.
    pub fn add(&mut self,name: &str,sector: usize) -> Result<(),Error> {
        if self.find_index(name).is_some() {
            return Err(Error::Exists);
        }
        let entry = DirectoryEntry {
            in_use: 1,
            name: pack_name(name),
            sector: sector as i32
        };
        for i in 0..self.table.len() {
            if self.table[i].in_use==0 {
                self.table[i] = entry;
                return Ok(());
            }
        }
        let old_size = self.table.len();
        if 4 + old_size * 2 * 15 > MAX_FILE_SIZE {
            error!("directory backing file cannot hold more entries");
            return Err(Error::DirFull);
        }
        self.table.resize(old_size*2,DirectoryEntry::empty());
        self.table[old_size] = entry;
        Ok(())
    }
    /// Clear `in_use` on the matching entry; false if nothing matched.
    pub fn remove(&mut self,name: &str) -> bool {
        match self.find_index(name) {
            Some(i) => {
                self.table[i].in_use = 0;
                true
            },
            None => false
        }
    }
    /// In-use entries as `(name, header sector)` pairs, in table order.
    pub fn entries(&self) -> Vec<(String,usize)> {
        let mut ans = Vec::new();
        for e in &self.table {
            if e.in_use != 0 {
                ans.push((unpack_name(&e.name),e.sector as usize));
            }
        }
        ans
    }
    pub fn num_slots(&self) -> usize {
        self.table.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialized_form() {
        let mut dir = Directory::new(3);
        dir.add("hello",7).expect("add failed");
        let dat = dir.to_bytes();
        assert_eq!(dat.len(),4+3*15);
        // count prefix, then the first entry
        assert_eq!(&dat[0..4],&[3,0,0,0]);
        assert_eq!(dat[4],1);
        assert_eq!(&dat[5..10],b"hello");
        assert_eq!(&dat[15..19],&[7,0,0,0]);
        let copy = Directory::from_bytes(&dat).expect("parse failed");
        assert_eq!(dir,copy);
    }

    #[test]
    fn duplicate_names_refused() {
        let mut dir = Directory::new(4);
        dir.add("a",2).expect("add failed");
        assert!(matches!(dir.add("a",3),Err(Error::Exists)));
        // the truncated compare treats long names as equal
        dir.add("abcdefghiXX",5).expect("add failed");
        assert!(matches!(dir.add("abcdefghiYY",6),Err(Error::Exists)));
    }

    #[test]
    fn slots_are_reused() {
        let mut dir = Directory::new(2);
        dir.add("a",2).expect("add failed");
        dir.add("b",3).expect("add failed");
        assert!(dir.remove("a"));
        assert!(!dir.remove("a"));
        dir.add("c",4).expect("add failed");
        assert_eq!(dir.num_slots(),2);
        assert_eq!(dir.find("c"),Some(4));
        assert_eq!(dir.find("a"),None);
    }

    #[test]
    fn growth_preserves_entries() {
        let mut dir = Directory::new(2);
        dir.add("a",2).expect("add failed");
        dir.add("b",3).expect("add failed");
        assert!(dir.remove("b"));
        dir.add("c",4).expect("add failed");
        // table is full again with a removed name gone for good
        dir.add("d",5).expect("add failed");
        assert_eq!(dir.num_slots(),4);
        assert_eq!(dir.find("a"),Some(2));
        assert_eq!(dir.find("b"),None);
        assert_eq!(dir.find("c"),Some(4));
        assert_eq!(dir.find("d"),Some(5));
    }
}
