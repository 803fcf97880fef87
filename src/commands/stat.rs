use clap;
use std::str::FromStr;
use crate::STDRESULT;

pub fn stat(cmd: &clap::ArgMatches) -> STDRESULT {
    let img_path = cmd.get_one::<String>("dimg").expect("required argument");
    let disk = crate::create_fs_from_file(img_path)?;
    let stats = disk.stat()?;
    match cmd.get_one::<String>("indent") {
        Some(s) => println!("{}",json::stringify_pretty(stats,u16::from_str(s).unwrap_or(2))),
        None => println!("{}",json::stringify(stats))
    }
    return Ok(());
}

pub fn catalog(cmd: &clap::ArgMatches) -> STDRESULT {
    let default_path = "/".to_string();
    let path_in_img = cmd.get_one::<String>("file").unwrap_or(&default_path);
    let img_path = cmd.get_one::<String>("dimg").expect("required argument");
    let disk = crate::create_fs_from_file(img_path)?;
    disk.catalog_to_stdout(path_in_img)?;
    return Ok(());
}

pub fn print(cmd: &clap::ArgMatches) -> STDRESULT {
    let img_path = cmd.get_one::<String>("dimg").expect("required argument");
    let disk = crate::create_fs_from_file(img_path)?;
    disk.print()?;
    return Ok(());
}
