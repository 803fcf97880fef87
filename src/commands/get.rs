use clap;
use std::io::Write;
use std::str::FromStr;
use log::error;
use super::CommandError;
use crate::STDRESULT;

pub fn get(cmd: &clap::ArgMatches) -> STDRESULT {
    let src_path = cmd.get_one::<String>("file").expect("required argument");
    let img_path = cmd.get_one::<String>("dimg").expect("required argument");
    let default_typ = "file".to_string();
    let typ = cmd.get_one::<String>("type").unwrap_or(&default_typ);
    let disk = crate::create_fs_from_file(img_path)?;

    let dat = match typ.as_str() {
        // the file argument is a sector number in this case
        "sec" => {
            let sector = match usize::from_str(src_path) {
                Ok(s) => s,
                Err(_) => {
                    error!("with `-t sec` the file argument must be a sector number");
                    return Err(Box::new(CommandError::InvalidCommand));
                }
            };
            disk.read_sector(sector)?
        },
        "file" => {
            let f = disk.open(src_path)?;
            disk.read_file_at(&f,f.length(),0)?
        },
        _ => return Err(Box::new(CommandError::UnknownItemType))
    };

    if atty::is(atty::Stream::Stdout) {
        // readable dump on a terminal, raw bytes when piped
        crate::display_block(0,&dat);
    } else {
        std::io::stdout().write_all(&dat).expect("could not write stdout");
    }
    Ok(())
}
