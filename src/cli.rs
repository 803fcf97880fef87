use clap::{arg, crate_version, Command, ValueHint};

pub fn build_cli() -> Command {
    let long_help = "oskit is always invoked with exactly one of several subcommands.
The subcommands are generally designed to function as nodes in a pipeline.
Set RUST_LOG environment variable to control logging level.
  levels: trace,debug,info,warn,error

Examples:
---------
create an image:       `oskit mkdsk -d myimg.osk`
make a directory:      `oskit mkdir -f /docs -d myimg.osk`
file into image:       `cat hello.txt | oskit put -f /docs/hello -d myimg.osk`
file out of image:     `oskit get -f /docs/hello -d myimg.osk > hello.txt`
list a directory:      `oskit catalog -f /docs -d myimg.osk`";

    let mut main_cmd = Command::new("oskit")
        .about("Builds and manipulates simulator disk images with an instructional file system.")
        .after_long_help(long_help)
        .version(crate_version!());
    main_cmd = main_cmd.subcommand(
        Command::new("mkdsk")
            .arg(
                arg!(-d --dimg <PATH> "disk image path to create")
                    .value_hint(ValueHint::FilePath)
                    .required(true),
            )
            .arg(arg!(-s --sectors <COUNT> "number of sectors on the device").required(false))
            .about("write a formatted disk image to the given path"),
    );
    main_cmd = main_cmd.subcommand(
        Command::new("catalog")
            .arg(arg!(-f --file <PATH> "path of directory inside disk image").required(false))
            .arg(
                arg!(-d --dimg <PATH> "path to disk image itself")
                    .value_hint(ValueHint::FilePath)
                    .required(true),
            )
            .visible_alias("ls")
            .visible_alias("dir")
            .about("list a directory inside a disk image"),
    );
    main_cmd = main_cmd.subcommand(
        Command::new("mkdir")
            .arg(arg!(-f --file <PATH> "path inside disk image of new directory").required(true))
            .arg(
                arg!(-d --dimg <PATH> "path to disk image itself")
                    .value_hint(ValueHint::FilePath)
                    .required(true),
            )
            .about("create a new directory inside a disk image"),
    );
    main_cmd = main_cmd.subcommand(
        Command::new("delete")
            .arg(arg!(-f --file <PATH> "path inside disk image to delete").required(true))
            .arg(
                arg!(-d --dimg <PATH> "path to disk image itself")
                    .value_hint(ValueHint::FilePath)
                    .required(true),
            )
            .visible_alias("del")
            .visible_alias("era")
            .about("delete a file or directory inside a disk image"),
    );
    main_cmd = main_cmd.subcommand(
        Command::new("put")
            .arg(arg!(-f --file <PATH> "path inside disk image to write").required(true))
            .arg(
                arg!(-d --dimg <PATH> "path to disk image itself")
                    .value_hint(ValueHint::FilePath)
                    .required(true),
            )
            .about("write stdin to a file inside a disk image"),
    );
    main_cmd = main_cmd.subcommand(
        Command::new("get")
            .arg(arg!(-f --file <PATH> "path inside disk image, or sector number with `-t sec`").required(true))
            .arg(arg!(-t --type <TYPE> "type of item").value_parser(["file","sec"]).required(false))
            .arg(
                arg!(-d --dimg <PATH> "path to disk image itself")
                    .value_hint(ValueHint::FilePath)
                    .required(true),
            )
            .about("read a file inside a disk image to stdout"),
    );
    main_cmd = main_cmd.subcommand(
        Command::new("stat")
            .arg(
                arg!(-d --dimg <PATH> "path to disk image itself")
                    .value_hint(ValueHint::FilePath)
                    .required(true),
            )
            .arg(arg!(--indent <SPACES> "JSON indentation").required(false))
            .about("write file system statistics as JSON to stdout"),
    );
    main_cmd = main_cmd.subcommand(
        Command::new("print")
            .arg(
                arg!(-d --dimg <PATH> "path to disk image itself")
                    .value_hint(ValueHint::FilePath)
                    .required(true),
            )
            .about("dump headers, free count, and the whole tree"),
    );
    main_cmd = main_cmd.subcommand(
        Command::new("completions")
            .arg(arg!(-s --shell <SHELL> "shell to generate completions for").required(true))
            .about("write completions script for the given shell to stdout"),
    );
    return main_cmd;
}
