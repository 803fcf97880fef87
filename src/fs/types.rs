use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use std::str::FromStr;
use std::fmt;
use regex::Regex;
use crate::dev::SECTOR_SIZE;

/// Sector holding the free-map file header, fixed so the file system can
/// find it on mount.
pub const FREE_MAP_SECTOR: usize = 0;
/// Sector holding the root-directory file header.
pub const ROOT_DIR_SECTOR: usize = 1;
/// Sector holding the pipe file header.
pub const PIPE_SECTOR: usize = 2;

pub const FILE_NAME_MAX_LEN: usize = 9;
pub const FILE_PATH_MAX_LEN: usize = 100;

/// Initial entry count of a freshly created directory.  The table grows
/// by doubling when it fills.
pub const NUM_DIR_ENTRIES: usize = 10;
/// Capacity of the pipe file created at format time.
pub const PIPE_FILE_SIZE: usize = 1024;

/// Direct sector pointers in a file header; chosen so the header record
/// is exactly one sector.
pub const NUM_DIRECT: usize = 21;
/// Sector pointers held by the indirect sector.
pub const NUM_INDIRECT: usize = SECTOR_SIZE / 4;
pub const MAX_FILE_SIZE: usize = (NUM_DIRECT + NUM_INDIRECT) * SECTOR_SIZE;

/// Enumerates file system errors.  The `Display` trait will print the
/// equivalent long message.
#[derive(thiserror::Error,Debug)]
pub enum Error {
    #[error("path or entry not found")]
    NotFound,
    #[error("name already exists")]
    Exists,
    #[error("no free sectors left")]
    NoSpace,
    #[error("directory table cannot grow")]
    DirFull,
    #[error("file would exceed the maximum size")]
    TooLarge,
    #[error("path component is not a directory")]
    NotDirectory,
    #[error("argument violates a precondition")]
    BadArgument,
    #[error("block device reported failure")]
    IOError
}

impl From<crate::dev::Error> for Error {
    fn from(_e: crate::dev::Error) -> Self {
        Error::IOError
    }
}

/// Enumerates the file types recorded in a header, available conversions:
/// * FileType to u32: `as u32`
/// * u32 to FileType: `FileType::from_u32` (use FromPrimitive trait)
/// * &str to FileType: `FileType::from_str`, str can be a number or mnemonic
#[derive(FromPrimitive,PartialEq,Clone,Copy,Debug)]
pub enum FileType {
    File = 0,
    Directory = 1,
    Pipe = 2,
    Unknown = 3
}

impl FromStr for FileType {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self,Self::Err> {
        // string can be the number itself
        if let Ok(num) = u32::from_str(s) {
            return match FileType::from_u32(num) {
                Some(typ) => Ok(typ),
                _ => Err(Error::BadArgument)
            };
        }
        // or a mnemonic
        match s {
            "file" => Ok(Self::File),
            "dir" => Ok(Self::Directory),
            "pipe" => Ok(Self::Pipe),
            _ => Err(Error::BadArgument)
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self,f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File => write!(f,"file"),
            Self::Directory => write!(f,"dir"),
            Self::Pipe => write!(f,"pipe"),
            Self::Unknown => write!(f,"unknown")
        }
    }
}

/// Test the string for validity as a component name.  This can be used to
/// check names before they are packed into the fixed-width field.
pub fn is_name_valid(s: &str) -> bool {
    let patt = Regex::new(r"^[A-Za-z0-9_][A-Za-z0-9_.-]*$").expect("unreachable");
    patt.is_match(s) && s.len() > 0
}

/// Pack a component name into the fixed field, truncating to
/// `FILE_NAME_MAX_LEN` and padding with NUL.
pub fn pack_name(s: &str) -> [u8;FILE_NAME_MAX_LEN+1] {
    let mut ans = [0;FILE_NAME_MAX_LEN+1];
    let src = s.as_bytes();
    let n = usize::min(src.len(),FILE_NAME_MAX_LEN);
    ans[0..n].copy_from_slice(&src[0..n]);
    ans
}

/// Recover a string from the fixed field, stopping at the first NUL.
pub fn unpack_name(fname: &[u8;FILE_NAME_MAX_LEN+1]) -> String {
    let end = fname.iter().position(|b| *b==0).unwrap_or(fname.len());
    String::from_utf8_lossy(&fname[0..end]).to_string()
}

/// Truncated byte-wise comparison used by directory lookups.
pub fn name_matches(fname: &[u8;FILE_NAME_MAX_LEN+1],s: &str) -> bool {
    *fname == pack_name(s)
}
