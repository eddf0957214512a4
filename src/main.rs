#[macro_use]
extern crate clap;

use clap::{AppSettings, Arg, ArgMatches, SubCommand};
use log::LevelFilter;
use minivsfs::subcommand;
use minivsfs::AddOptions;
use std::io;
use std::path::Path;

fn image_arg<'a>(name: &'a str, help: &'a str) -> Arg<'a, 'a> {
    Arg::with_name(name)
        .long(name)
        .value_name("IMG")
        .help(help)
        .takes_value(true)
        .required(true)
}

fn run(matches: &ArgMatches) -> anyhow::Result<()> {
    match matches.subcommand() {
        ("mkfs", Some(m)) => {
            let image = Path::new(m.value_of("image").unwrap_or_default());
            let size_kib = value_t!(m, "size-kib", u64)?;
            let inodes = value_t!(m, "inodes", u64)?;
            subcommand::mkfs(image, size_kib, inodes)?;
            println!(
                "MiniVSFS image '{}' created: {} KiB, {} inodes",
                image.display(),
                size_kib,
                inodes
            );
        }
        ("add", Some(m)) => {
            let input = Path::new(m.value_of("input").unwrap_or_default());
            let output = Path::new(m.value_of("output").unwrap_or_default());
            let host_file = Path::new(m.value_of("file").unwrap_or_default());
            let opts = AddOptions {
                reject_duplicate_names: m.is_present("no-duplicates"),
            };
            let inode_num = subcommand::add(input, output, host_file, opts)?;
            println!(
                "File '{}' added as inode {} into '{}'.",
                host_file.display(),
                inode_num,
                output.display()
            );
        }
        ("ls", Some(m)) => {
            let image = Path::new(m.value_of("image").unwrap_or_default());
            subcommand::ls(image, &mut io::stdout().lock())?;
        }
        ("cat", Some(m)) => {
            let image = Path::new(m.value_of("image").unwrap_or_default());
            let name = m.value_of("name").unwrap_or_default();
            subcommand::cat(image, name, &mut io::stdout().lock())?;
        }
        ("check", Some(m)) => {
            let image = Path::new(m.value_of("image").unwrap_or_default());
            if !subcommand::check(image, &mut io::stdout().lock())? {
                anyhow::bail!("{}: inconsistencies found", image.display());
            }
        }
        _ => unreachable!("clap requires a subcommand"),
    }
    Ok(())
}

fn main() {
    let matches = app_from_crate!()
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .arg(
            Arg::with_name("verbose")
                .short("v")
                .long("verbose")
                .multiple(true)
                .global(true)
                .help("log more (-v info, -vv debug)"),
        )
        .subcommand(
            SubCommand::with_name("mkfs")
                .about("create an empty image")
                .arg(image_arg("image", "path of the image to create"))
                .arg(
                    Arg::with_name("size-kib")
                        .long("size-kib")
                        .value_name("KIB")
                        .help("image size in KiB (180..4096, multiple of 4)")
                        .required(true)
                        .validator(subcommand::validate_size_kib),
                )
                .arg(
                    Arg::with_name("inodes")
                        .long("inodes")
                        .value_name("N")
                        .help("number of inodes (128..512)")
                        .required(true)
                        .validator(subcommand::validate_inodes),
                ),
        )
        .subcommand(
            SubCommand::with_name("add")
                .about("add a host file to the root directory")
                .arg(image_arg("input", "image to read"))
                .arg(image_arg("output", "image to write, may equal --input"))
                .arg(
                    Arg::with_name("file")
                        .long("file")
                        .value_name("FILE")
                        .help("host file to add")
                        .required(true),
                )
                .arg(
                    Arg::with_name("no-duplicates")
                        .long("no-duplicates")
                        .help("fail if root already has an entry with the same name"),
                ),
        )
        .subcommand(
            SubCommand::with_name("ls")
                .about("list the root directory")
                .arg(image_arg("image", "image to read")),
        )
        .subcommand(
            SubCommand::with_name("cat")
                .about("print a file stored in the root directory")
                .arg(image_arg("image", "image to read"))
                .arg(
                    Arg::with_name("name")
                        .help("file name inside the image")
                        .required(true)
                        .index(1),
                ),
        )
        .subcommand(
            SubCommand::with_name("check")
                .about("verify checksums and bitmap consistency")
                .arg(image_arg("image", "image to read")),
        )
        .get_matches();

    let level = match matches.occurrences_of("verbose") {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_env("RUST_LOG")
        .format_timestamp(None)
        .format_target(false)
        .init();

    if let Err(e) = run(&matches) {
        eprintln!("{}: {:#}", crate_name!(), e);
        std::process::exit(1);
    }
}
