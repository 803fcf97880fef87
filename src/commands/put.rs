use clap;
use std::io::Read;
use log::error;
use super::CommandError;
use crate::fs::FileType;
use crate::fs::types::is_name_valid;
use crate::STDRESULT;

/// the last path component must pack into the fixed name field
fn check_final_component(path: &str) -> STDRESULT {
    let name = path.trim_end_matches('/').rsplit('/').next().unwrap_or("");
    if !is_name_valid(name) {
        error!("{} is not a valid name",name);
        return Err(Box::new(CommandError::InvalidCommand));
    }
    Ok(())
}

pub fn put(cmd: &clap::ArgMatches) -> STDRESULT {
    if atty::is(atty::Stream::Stdin) {
        error!("cannot use `put` with console input, please pipe something in");
        return Err(Box::new(CommandError::InvalidCommand));
    }
    let dest_path = cmd.get_one::<String>("file").expect("required argument");
    let img_path = cmd.get_one::<String>("dimg").expect("required argument");
    let mut file_data = Vec::new();
    std::io::stdin().read_to_end(&mut file_data).expect("failed to read input stream");
    if file_data.len()==0 {
        error!("put did not receive any data from previous node");
        return Err(Box::new(CommandError::InvalidCommand));
    }
    check_final_component(dest_path)?;
    let mut disk = crate::create_fs_from_file(img_path)?;
    // overwrite cleanly by recreating
    if disk.find(dest_path).is_ok() {
        disk.remove(dest_path)?;
    }
    disk.create(dest_path,FileType::File,None)?;
    let mut f = disk.open(dest_path)?;
    disk.write_file_at(&mut f,&file_data,0)?;
    crate::save_img(&disk,img_path)
}

pub fn mkdir(cmd: &clap::ArgMatches) -> STDRESULT {
    let path = cmd.get_one::<String>("file").expect("required argument");
    let img_path = cmd.get_one::<String>("dimg").expect("required argument");
    check_final_component(path)?;
    let mut disk = crate::create_fs_from_file(img_path)?;
    disk.create(path,FileType::Directory,None)?;
    crate::save_img(&disk,img_path)
}

pub fn delete(cmd: &clap::ArgMatches) -> STDRESULT {
    let path = cmd.get_one::<String>("file").expect("required argument");
    let img_path = cmd.get_one::<String>("dimg").expect("required argument");
    let mut disk = crate::create_fs_from_file(img_path)?;
    disk.remove(path)?;
    crate::save_img(&disk,img_path)
}
