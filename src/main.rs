//! # Command Line Interface
//!
//! Dispatch commands to `commands` module.

use env_logger;
use oskit::commands;
use oskit::commands::CommandError;
mod cli;

fn main() -> Result<(),Box<dyn std::error::Error>>
{
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let main_cmd = cli::build_cli();
    let matches = main_cmd.get_matches();

    // Completions

    if let Some(cmd) = matches.subcommand_matches("completions") {
        return commands::completions::generate(cli::build_cli(),cmd);
    }

    // Create a disk image

    if let Some(cmd) = matches.subcommand_matches("mkdsk") {
        return commands::mkdsk::mkdsk(cmd);
    }

    // Catalog a disk image

    if let Some(cmd) = matches.subcommand_matches("catalog") {
        return commands::stat::catalog(cmd);
    }

    // Output the FS stats as a JSON string

    if let Some(cmd) = matches.subcommand_matches("stat") {
        return commands::stat::stat(cmd);
    }

    // Dump the whole tree

    if let Some(cmd) = matches.subcommand_matches("print") {
        return commands::stat::print(cmd);
    }

    // Create directory inside disk image

    if let Some(cmd) = matches.subcommand_matches("mkdir") {
        return commands::put::mkdir(cmd);
    }

    // Delete a file or directory

    if let Some(cmd) = matches.subcommand_matches("delete") {
        return commands::put::delete(cmd);
    }

    // Put file inside disk image

    if let Some(cmd) = matches.subcommand_matches("put") {
        return commands::put::put(cmd);
    }

    // Get file from inside a disk image

    if let Some(cmd) = matches.subcommand_matches("get") {
        return commands::get::get(cmd);
    }

    log::error!("No subcommand was found, try `oskit --help`");
    return Err(Box::new(CommandError::InvalidCommand));
}
