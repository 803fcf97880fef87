use clap;
use std::str::FromStr;
use log::info;
use crate::dev::{DiskImage,DEFAULT_NUM_SECTORS,SECTOR_SIZE};
use crate::fs::FileSystem;
use super::CommandError;
use crate::STDRESULT;

pub fn mkdsk(cmd: &clap::ArgMatches) -> STDRESULT {
    let img_path = cmd.get_one::<String>("dimg").expect("required argument");
    let sectors = match cmd.get_one::<String>("sectors") {
        Some(s) => match usize::from_str(s) {
            Ok(n) => n,
            Err(_) => {
                eprintln!("sector count could not be parsed");
                return Err(Box::new(CommandError::OutOfRange));
            }
        },
        None => DEFAULT_NUM_SECTORS
    };
    // enough room for the bootstrap layout plus some data sectors
    if sectors < 32 || sectors > 65536 {
        eprintln!("sector count must be from 32 to 65536");
        return Err(Box::new(CommandError::OutOfRange));
    }
    info!("formatting {} sectors of {} bytes",sectors,SECTOR_SIZE);
    let disk = FileSystem::format(DiskImage::new(sectors),None)?;
    crate::save_img(&disk,img_path)?;
    eprintln!("writing {} bytes",sectors*SECTOR_SIZE);
    Ok(())
}
