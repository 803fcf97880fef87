//! # File System Module
//!
//! A hierarchical file system over the sector-addressed block device.
//! Every file has a one-sector header (see `header`), data sectors named
//! by that header, and an entry in some directory (see `directory`).
//! The free-sector map and the root directory are themselves ordinary
//! files whose headers sit at fixed sectors, so the system can find them
//! on mount; a third fixed header backs a byte pipe.
//!
//! The `FileSystem` value owns the disk image, the in-memory free map,
//! and the permanently open bootstrap files.  Mutating operations flush
//! the free map, the directory, and the touched header before they
//! report success.

pub mod types;
pub mod freemap;
pub mod header;
pub mod directory;
pub mod file;

use log::{info,debug,error};
use colored::*;
use crate::dev::{DiskImage,SECTOR_SIZE};
use freemap::SectorBitmap;
use header::FileHeader;
use directory::Directory;
use file::OpenFile;
pub use types::{Error,FileType};
use types::*;

/// The primary interface for disk operations.
pub struct FileSystem {
    dev: DiskImage,
    free_map: SectorBitmap,
    free_map_file: OpenFile,
    root_file: OpenFile
}

impl FileSystem {
    /// Format a blank device: bootstrap headers at sectors 0, 1 and 2,
    /// the free-map file data, an empty root image, and the pipe file.
    pub fn format(mut dev: DiskImage,time: Option<chrono::NaiveDateTime>) -> Result<Self,Error> {
        info!("formatting a {} sector device",dev.num_sectors());
        let num_sectors = dev.num_sectors();
        let mut free_map = SectorBitmap::new(num_sectors);
        free_map.mark(FREE_MAP_SECTOR)?;
        free_map.mark(ROOT_DIR_SECTOR)?;
        free_map.mark(PIPE_SECTOR)?;

        let mut map_hdr = FileHeader::new("freemap",FileType::File,FREE_MAP_SECTOR,time);
        let mut dir_hdr = FileHeader::new("root",FileType::Directory,ROOT_DIR_SECTOR,time);
        let mut pipe_hdr = FileHeader::new("pipe",FileType::Pipe,PIPE_SECTOR,time);

        let root_image = Directory::new(NUM_DIR_ENTRIES);
        let free_map_len = free_map.disk_len();
        map_hdr.allocate(&mut dev,&mut free_map,free_map_len)?;
        dir_hdr.allocate(&mut dev,&mut free_map,root_image.disk_len())?;
        pipe_hdr.allocate(&mut dev,&mut free_map,PIPE_FILE_SIZE)?;

        // headers must be on disk before the files are written through,
        // because the write path reads them back
        map_hdr.write_back(&mut dev)?;
        dir_hdr.write_back(&mut dev)?;
        pipe_hdr.write_back(&mut dev)?;

        let mut root_file = OpenFile::from_header(dir_hdr);
        root_file.write_at(&mut dev,&mut free_map,&root_image.to_bytes(),0)?;
        root_file.hdr.write_back(&mut dev)?;

        let mut free_map_file = OpenFile::from_header(map_hdr);
        let map_bytes = free_map.to_bytes();
        free_map_file.write_at(&mut dev,&mut free_map,&map_bytes,0)?;
        free_map_file.hdr.write_back(&mut dev)?;

        Ok(Self { dev, free_map, free_map_file, root_file })
    }
    /// Open the file system already on the device.
    pub fn mount(dev: DiskImage) -> Result<Self,Error> {
        let map_hdr = FileHeader::fetch_from(&dev,FREE_MAP_SECTOR)?;
        let dir_hdr = FileHeader::fetch_from(&dev,ROOT_DIR_SECTOR)?;
        if map_hdr.file_type() != FileType::File || dir_hdr.file_type() != FileType::Directory {
            error!("bootstrap headers are damaged or the device is not formatted");
            return Err(Error::IOError);
        }
        let free_map_file = OpenFile::from_header(map_hdr);
        let root_file = OpenFile::from_header(dir_hdr);
        let map_bytes = free_map_file.read_at(&dev,free_map_file.length(),0)?;
        let free_map = SectorBitmap::from_bytes(&map_bytes,dev.num_sectors());
        info!("mounted, {} sectors free",free_map.num_clear());
        Ok(Self { dev, free_map, free_map_file, root_file })
    }

    fn persist_free_map(&mut self) -> Result<(),Error> {
        let map_bytes = self.free_map.to_bytes();
        self.free_map_file.write_at(&mut self.dev,&mut self.free_map,&map_bytes,0)?;
        self.free_map_file.hdr.write_back(&mut self.dev)?;
        Ok(())
    }
    /// Read a directory image.  The root goes through the permanently
    /// open handle, anything else through a scratch handle.
    fn read_dir(&self,sector: usize) -> Result<Directory,Error> {
        let dat = match sector {
            ROOT_DIR_SECTOR => self.root_file.read_at(&self.dev,self.root_file.length(),0)?,
            _ => {
                let f = OpenFile::open(&self.dev,sector)?;
                f.read_at(&self.dev,f.length(),0)?
            }
        };
        Directory::from_bytes(&dat)
    }
    /// Persist a directory image and its header.
    fn write_dir(&mut self,sector: usize,dir: &Directory) -> Result<(),Error> {
        let dat = dir.to_bytes();
        match sector {
            ROOT_DIR_SECTOR => {
                self.root_file.write_at(&mut self.dev,&mut self.free_map,&dat,0)?;
                self.root_file.hdr.write_back(&mut self.dev)?;
            },
            _ => {
                let mut f = OpenFile::open(&self.dev,sector)?;
                f.write_at(&mut self.dev,&mut self.free_map,&dat,0)?;
                f.hdr.write_back(&mut self.dev)?;
            }
        }
        Ok(())
    }
    /// Walk a slash-separated path from the root.  Returns the header
    /// sector of the named file, or with `want_parent` the sector of the
    /// directory that would hold the final component plus that component
    /// (truncation to the name field width happens at the compare).
    /// Intermediate components must exist and be directories.
    fn walk(&self,path: &str,want_parent: bool) -> Result<(usize,String),Error> {
        let mut curr = ROOT_DIR_SECTOR;
        let mut rest = path;
        loop {
            rest = rest.trim_start_matches('/');
            if rest.is_empty() {
                // the path named the current directory itself
                return match want_parent {
                    true => Err(Error::BadArgument),
                    false => Ok((curr,String::new()))
                };
            }
            let (name,tail) = match rest.find('/') {
                Some(i) => (&rest[0..i],rest[i..].trim_start_matches('/')),
                None => (rest,"")
            };
            if tail.is_empty() {
                if want_parent {
                    return Ok((curr,name.to_string()));
                }
                let dir = self.read_dir(curr)?;
                return match dir.find(name) {
                    Some(s) => Ok((s,name.to_string())),
                    None => {
                        debug!("{} not found",name);
                        Err(Error::NotFound)
                    }
                };
            }
            let dir = self.read_dir(curr)?;
            let sector = match dir.find(name) {
                Some(s) => s,
                None => {
                    debug!("{} not found on the way down",name);
                    return Err(Error::NotFound);
                }
            };
            let hdr = FileHeader::fetch_from(&self.dev,sector)?;
            if hdr.file_type() != FileType::Directory {
                error!("{} is not a directory",name);
                return Err(Error::NotDirectory);
            }
            curr = sector;
            rest = tail;
        }
    }
    /// Header sector of the file or directory named by `path`.
    pub fn find(&self,path: &str) -> Result<usize,Error> {
        Ok(self.walk(path,false)?.0)
    }

    /// Create a file or directory.  All preconditions are checked before
    /// any state changes; the one mid-flight failure left (growing a full
    /// parent) is rolled back, so a failed create never leaves partial
    /// state on the disk.
    pub fn create(&mut self,path: &str,typ: FileType,time: Option<chrono::NaiveDateTime>) -> Result<(),Error> {
        info!("create {} type {}",path,typ);
        let (parent_sector,name) = self.walk(path,true)?;
        if name.is_empty() {
            return Err(Error::BadArgument);
        }
        let mut parent = self.read_dir(parent_sector)?;
        if parent.find(&name).is_some() {
            return Err(Error::Exists);
        }
        let hdr_sector = match self.free_map.find_and_set() {
            Some(s) => s,
            None => return Err(Error::NoSpace)
        };
        if let Err(e) = parent.add(&name,hdr_sector) {
            self.free_map.clear(hdr_sector);
            return Err(e);
        }
        let mut hdr = FileHeader::new(&name,typ,hdr_sector,time);
        if typ==FileType::Directory {
            let image = Directory::new(NUM_DIR_ENTRIES);
            if let Err(e) = hdr.allocate(&mut self.dev,&mut self.free_map,image.disk_len()) {
                self.free_map.clear(hdr_sector);
                return Err(e);
            }
            // the header must be valid on disk before the image is
            // written through it
            hdr.write_back(&mut self.dev)?;
            let mut f = OpenFile::from_header(hdr);
            f.write_at(&mut self.dev,&mut self.free_map,&image.to_bytes(),0)?;
            f.hdr.write_back(&mut self.dev)?;
        } else {
            hdr.write_back(&mut self.dev)?;
        }
        self.write_dir(parent_sector,&parent)?;
        self.persist_free_map()?;
        Ok(())
    }
    /// Open the file named by `path`.
    pub fn open(&self,path: &str) -> Result<OpenFile,Error> {
        let sector = self.find(path)?;
        OpenFile::open(&self.dev,sector)
    }
    /// Remove the file named by `path`: release its data sectors, clear
    /// its header sector, drop the directory entry, and flush.
    pub fn remove(&mut self,path: &str) -> Result<(),Error> {
        info!("remove {}",path);
        let (parent_sector,name) = self.walk(path,true)?;
        if name.is_empty() {
            return Err(Error::BadArgument);
        }
        let mut parent = self.read_dir(parent_sector)?;
        let sector = match parent.find(&name) {
            Some(s) => s,
            None => return Err(Error::NotFound)
        };
        let mut hdr = FileHeader::fetch_from(&self.dev,sector)?;
        if hdr.file_type()==FileType::Directory && self.read_dir(sector)?.entries().len() > 0 {
            error!("directory {} is not empty",name);
            return Err(Error::BadArgument);
        }
        hdr.deallocate(&self.dev,&mut self.free_map)?;
        self.free_map.clear(sector);
        parent.remove(&name);
        self.write_dir(parent_sector,&parent)?;
        self.persist_free_map()?;
        Ok(())
    }
    /// Names in the directory named by `path`, in table order.
    pub fn list(&self,path: &str) -> Result<Vec<String>,Error> {
        let sector = self.find(path)?;
        let hdr = FileHeader::fetch_from(&self.dev,sector)?;
        if hdr.file_type() != FileType::Directory {
            return Err(Error::NotDirectory);
        }
        Ok(self.read_dir(sector)?.entries().iter().map(|(n,_s)| n.clone()).collect())
    }
    /// List a directory to standard output, directories highlighted.
    pub fn catalog_to_stdout(&self,path: &str) -> Result<(),Error> {
        let sector = self.find(path)?;
        let dir = self.read_dir(sector)?;
        println!();
        for (name,s) in dir.entries() {
            let hdr = FileHeader::fetch_from(&self.dev,s)?;
            match hdr.file_type() {
                FileType::Directory => println!("{:<8} {:>6} {}",hdr.file_type().to_string(),hdr.limit(),name.bright_blue().bold()),
                _ => println!("{:<8} {:>6} {}",hdr.file_type().to_string(),hdr.limit(),name)
            }
        }
        println!();
        Ok(())
    }
    fn print_dir(&self,sector: usize,depth: usize) -> Result<(),Error> {
        let dir = self.read_dir(sector)?;
        for (name,s) in dir.entries() {
            let hdr = FileHeader::fetch_from(&self.dev,s)?;
            println!("{:indent$}{} sector {} type {} limit {} capacity {} sectors {}",
                "",name,s,hdr.file_type(),hdr.limit(),hdr.capacity(),hdr.num_sectors(),indent=depth*2);
            if hdr.file_type()==FileType::Directory {
                self.print_dir(s,depth+1)?;
            }
        }
        Ok(())
    }
    /// Debug dump: bootstrap headers, free count, and the whole tree.
    pub fn print(&self) -> Result<(),Error> {
        let map_hdr = FileHeader::fetch_from(&self.dev,FREE_MAP_SECTOR)?;
        let dir_hdr = FileHeader::fetch_from(&self.dev,ROOT_DIR_SECTOR)?;
        println!("free map file: limit {} capacity {} sectors {}",map_hdr.limit(),map_hdr.capacity(),map_hdr.num_sectors());
        println!("root dir file: limit {} capacity {} sectors {}",dir_hdr.limit(),dir_hdr.capacity(),dir_hdr.num_sectors());
        println!("free sectors: {} of {}",self.free_map.num_clear(),self.dev.num_sectors());
        self.print_dir(ROOT_DIR_SECTOR,0)
    }
    /// Machine readable statistics.
    pub fn stat(&self) -> Result<json::JsonValue,Error> {
        let root = self.read_dir(ROOT_DIR_SECTOR)?;
        Ok(json::object! {
            sector_size: SECTOR_SIZE,
            num_sectors: self.dev.num_sectors(),
            free_sectors: self.free_map.num_clear(),
            reserved_sectors: vec![FREE_MAP_SECTOR,ROOT_DIR_SECTOR,PIPE_SECTOR],
            root_files: root.entries().len()
        })
    }
    pub fn num_clear(&self) -> usize {
        self.free_map.num_clear()
    }

    /// Store `dat` in the pipe; the limit becomes exactly the length of
    /// the message.
    pub fn write_pipe(&mut self,dat: &[u8]) -> Result<usize,Error> {
        if dat.len() > PIPE_FILE_SIZE {
            return Err(Error::BadArgument);
        }
        let mut pipe = OpenFile::open(&self.dev,PIPE_SECTOR)?;
        let n = pipe.write_at(&mut self.dev,&mut self.free_map,dat,0)?;
        pipe.hdr.set_limit(dat.len())?;
        pipe.hdr.write_back(&mut self.dev)?;
        self.persist_free_map()?;
        Ok(n)
    }
    /// Read up to `num_bytes` from the pipe, bounded by the stored
    /// message length.  No blocking, no end-of-data marker.
    pub fn read_pipe(&self,num_bytes: usize) -> Result<Vec<u8>,Error> {
        let pipe = OpenFile::open(&self.dev,PIPE_SECTOR)?;
        pipe.read_at(&self.dev,num_bytes,0)
    }

    /// Read through an open handle.
    pub fn read_file_at(&self,f: &OpenFile,num_bytes: usize,offset: usize) -> Result<Vec<u8>,Error> {
        f.read_at(&self.dev,num_bytes,offset)
    }
    /// Write through an open handle; the touched header and the free map
    /// are flushed before success is reported.
    pub fn write_file_at(&mut self,f: &mut OpenFile,dat: &[u8],offset: usize) -> Result<usize,Error> {
        let n = f.write_at(&mut self.dev,&mut self.free_map,dat,offset)?;
        f.hdr.write_back(&mut self.dev)?;
        self.persist_free_map()?;
        Ok(n)
    }
    /// Sequential read at the handle's position.
    pub fn read_file(&self,f: &mut OpenFile,num_bytes: usize) -> Result<Vec<u8>,Error> {
        f.read(&self.dev,num_bytes)
    }
    /// Sequential write at the handle's position, flushing as in
    /// `write_file_at`.
    pub fn write_file(&mut self,f: &mut OpenFile,dat: &[u8]) -> Result<usize,Error> {
        let n = f.write(&mut self.dev,&mut self.free_map,dat)?;
        f.hdr.write_back(&mut self.dev)?;
        self.persist_free_map()?;
        Ok(n)
    }

    /// Raw sector fetch for inspection tools.
    pub fn read_sector(&self,n: usize) -> Result<Vec<u8>,Error> {
        Ok(self.dev.read_sector(n)?.to_vec())
    }
    /// Flatten the underlying image, typically to save it in a host file.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.dev.to_bytes()
    }
    pub fn num_sectors(&self) -> usize {
        self.dev.num_sectors()
    }
}
