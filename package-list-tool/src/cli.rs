// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use {
    clap::{Arg, ArgMatches, Command},
    log::LevelFilter,
    package_list::{
        unpack::{unpack_and_patch, NativeArchiveUnpacker, PatchCommand},
        PackageListError, PackageListStore, PackageRecord,
    },
    std::path::Path,
    thiserror::Error,
};

const PACKAGE_LIST_ABOUT: &str = "\
Package Lists

A package list is a text file describing the source packages a build consumes.
Blank lines and lines starting with `#` are ignored. Every other line defines a
package with whitespace separated NAME=VALUE fields:

URL=<url>
   Download URL of the package archive. The archive must end in .zip, .tar.gz,
   .tar.bz2 or .tar.xz. The file name determines the package basename and
   version. e.g. `zlib-1.2.8.tar.gz` is package `zlib` version `1.2.8`.

GIT=<url>
   Git repository of the package. The repository name, minus any `.git` suffix,
   is the package basename. Cannot be combined with URL.

BRANCH=<name>
   Branch or commit to check out. Required with GIT. Acts as the version. The
   package archive is named `<basename>-<branch>.tar.xz`.

SHA1=<hex>
   Expected SHA-1 of the package archive.

SRCDIR=<dir>
   Directory the archive extracts into. Defaults to `<basename>-<version>`.

PATCHES=<name>
   Name of the patch tarball. Defaults to `<basename>-<version>-patches.tar.xz`.
";

const UNPACK_ABOUT: &str = "\
Unpack a package archive and apply its patches.

The archive is read from ARCHIVE_DIR and extracted into DEST_DIR, which is
created if necessary. The archive must produce the package's source directory.

If the package's patch tarball exists in ARCHIVE_DIR, it is extracted into
DEST_DIR and every *.patch file within it is applied to the source directory
in file name order. The first failing patch aborts the operation. Patches
already applied are not reverted.
";

const FIELDS: [&str; 9] = [
    "version",
    "full-name",
    "filename",
    "url",
    "git",
    "branch",
    "sha1",
    "patches",
    "srcdir",
];

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("argument parsing error: {0}")]
    Clap(#[from] clap::Error),

    #[error("{0}")]
    PackageList(#[from] PackageListError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unknown field: {0}")]
    UnknownField(String),

    #[error("invalid sub-command: {0}")]
    InvalidSubCommand(String),
}

pub type Result<T> = std::result::Result<T, ToolError>;

fn record_field(record: &PackageRecord, field: &str) -> Result<Option<String>> {
    Ok(match field {
        "version" => Some(record.version().to_string()),
        "full-name" => Some(record.full_name()),
        "filename" => Some(record.filename().to_string()),
        "url" => record.url().map(|s| s.to_string()),
        "git" => record.git_url().map(|s| s.to_string()),
        "branch" => record.git_branch().map(|s| s.to_string()),
        "sha1" => record.sha1().map(|s| s.to_string()),
        "patches" => record.patches().map(|s| s.to_string()),
        "srcdir" => Some(record.src_dir().to_string()),
        _ => return Err(ToolError::UnknownField(field.to_string())),
    })
}

fn load_store(args: &ArgMatches) -> Result<PackageListStore> {
    let path = args
        .value_of_os("package-list")
        .expect("package-list argument has default value");

    Ok(PackageListStore::parse(Path::new(path))?)
}

fn path_arg<'a>(args: &'a ArgMatches, name: &str) -> &'a Path {
    Path::new(
        args.value_of_os(name)
            .unwrap_or_else(|| panic!("{} argument is required", name)),
    )
}

fn command_list(args: &ArgMatches) -> Result<()> {
    let store = load_store(args)?;

    for basename in store.basenames() {
        println!("{}", basename);
    }

    Ok(())
}

fn command_show(args: &ArgMatches) -> Result<()> {
    let store = load_store(args)?;
    let basename = args
        .value_of("basename")
        .expect("basename argument is required");

    let record = store
        .get(basename)
        .ok_or_else(|| PackageListError::UnknownPackage(basename.to_string()))?;

    println!("basename: {}", record.basename());
    for field in FIELDS {
        if let Some(value) = record_field(record, field)? {
            println!("{}: {}", field, value);
        }
    }

    Ok(())
}

fn command_field(args: &ArgMatches) -> Result<()> {
    let store = load_store(args)?;
    let field = args.value_of("field").expect("field argument is required");
    let basename = args
        .value_of("basename")
        .expect("basename argument is required");

    // Unknown packages print nothing so callers can test for emptiness.
    if let Some(record) = store.get(basename) {
        if let Some(value) = record_field(record, field)? {
            println!("{}", value);
        }
    }

    Ok(())
}

fn command_unpack(args: &ArgMatches) -> Result<()> {
    let store = load_store(args)?;
    let basename = args
        .value_of("basename")
        .expect("basename argument is required");
    let archive_dir = path_arg(args, "archive_dir");
    let dest_dir = path_arg(args, "dest_dir");

    let patcher = PatchCommand::new(
        args.value_of_os("patch_program")
            .expect("patch_program argument has default value"),
    )
        .strip(args.value_of_t::<usize>("strip")?);

    let source_dir = unpack_and_patch(
        &store,
        basename,
        archive_dir,
        dest_dir,
        &NativeArchiveUnpacker,
        &patcher,
    )?;

    println!("{}", source_dir.display());

    Ok(())
}

fn command_verify(args: &ArgMatches) -> Result<()> {
    let store = load_store(args)?;
    let basename = args
        .value_of("basename")
        .expect("basename argument is required");
    let archive_dir = path_arg(args, "archive_dir");

    store.verify_archive(basename, archive_dir)?;

    println!("{}: OK", basename);

    Ok(())
}

pub fn run_cli() -> Result<()> {
    let app = Command::new("Package List Tool")
        .version("0.1")
        .about("Query package lists and unpack source packages")
        .long_about(PACKAGE_LIST_ABOUT)
        .arg_required_else_help(true);

    let app = app
        .arg(
            Arg::new("package-list")
                .long("package-list")
                .takes_value(true)
                .default_value("packages.txt")
                .global(true)
                .allow_invalid_utf8(true)
                .help("Path to the package list document"),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .global(true)
                .multiple_occurrences(true)
                .help("Increase logging verbosity. Can be specified multiple times."),
        );

    let app = app.subcommand(Command::new("list").about("Print the basenames of all packages"));

    let app = app.subcommand(
        Command::new("show")
            .about("Print all fields of a package")
            .arg(
                Arg::new("basename")
                    .required(true)
                    .help("Basename of the package"),
            ),
    );

    let app = app.subcommand(
        Command::new("field")
            .about("Print a single field of a package")
            .arg(
                Arg::new("field")
                    .required(true)
                    .possible_values(FIELDS)
                    .help("Name of the field to print"),
            )
            .arg(
                Arg::new("basename")
                    .required(true)
                    .help("Basename of the package"),
            ),
    );

    let app = app.subcommand(
        Command::new("unpack")
            .about("Unpack a package archive and apply its patches")
            .long_about(UNPACK_ABOUT)
            .arg(
                Arg::new("patch_program")
                    .long("patch-program")
                    .takes_value(true)
                    .default_value("patch")
                    .allow_invalid_utf8(true)
                    .help("patch executable to apply patches with"),
            )
            .arg(
                Arg::new("strip")
                    .long("strip")
                    .takes_value(true)
                    .default_value("1")
                    .help("Number of leading path components to strip from patch paths"),
            )
            .arg(
                Arg::new("basename")
                    .required(true)
                    .help("Basename of the package"),
            )
            .arg(
                Arg::new("archive_dir")
                    .required(true)
                    .allow_invalid_utf8(true)
                    .help("Directory holding package archives and patch tarballs"),
            )
            .arg(
                Arg::new("dest_dir")
                    .required(true)
                    .allow_invalid_utf8(true)
                    .help("Directory to unpack into"),
            ),
    );

    let app = app.subcommand(
        Command::new("verify")
            .about("Verify the SHA-1 of a package archive")
            .arg(
                Arg::new("basename")
                    .required(true)
                    .help("Basename of the package"),
            )
            .arg(
                Arg::new("archive_dir")
                    .required(true)
                    .allow_invalid_utf8(true)
                    .help("Directory holding package archives"),
            ),
    );

    let matches = app.get_matches();

    let log_level = match matches.occurrences_of("verbose") {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    let mut builder = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(log_level.as_str()),
    );

    // Disable log context except at higher log levels.
    if log_level <= LevelFilter::Info {
        builder
            .format_timestamp(None)
            .format_level(false)
            .format_target(false);
    }

    builder.init();

    match matches.subcommand() {
        Some(("list", args)) => command_list(args),
        Some(("show", args)) => command_show(args),
        Some(("field", args)) => command_field(args),
        Some(("unpack", args)) => command_unpack(args),
        Some(("verify", args)) => command_verify(args),
        Some((command, _)) => Err(ToolError::InvalidSubCommand(command.to_string())),
        None => Ok(()),
    }
}
