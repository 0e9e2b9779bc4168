use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use bencoding::metainfo::{build_from_paths, MetainfoError, DEFAULT_PIECE_LENGTH};

#[derive(Parser)]
#[command(name = "mktorrent", about = "Create a .torrent file from local files")]
struct Cli {
    /// Overwrite an existing torrent file.
    #[arg(short = 'f')]
    force: bool,

    /// Path of the output torrent file. Defaults to `<name>.torrent`.
    #[arg(short = 'o')]
    output: Option<PathBuf>,

    /// Mark the torrent private.
    #[arg(short = 'p')]
    private: bool,

    /// Comment text.
    #[arg(short = 'c', default_value = "")]
    comment: String,

    /// Recursively add files in directories.
    #[arg(short = 'r')]
    recursive: bool,

    /// Program identity written as `created by`.
    #[arg(long, default_value = concat!("bencoding-mktorrent/", env!("CARGO_PKG_VERSION")))]
    id: String,

    #[arg(long, default_value_t = DEFAULT_PIECE_LENGTH)]
    piece_length: i64,

    /// Tracker announce URL.
    announce: String,

    #[arg(required = true)]
    files: Vec<PathBuf>,
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run() {
        error!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), MetainfoError> {
    let cli = Cli::parse();

    let mut meta = build_from_paths(&cli.files, cli.recursive, cli.piece_length, &cli.announce)?;
    meta.creation_date = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .ok()
        .and_then(|d| i64::try_from(d.as_secs()).ok())
        .unwrap_or_default();
    meta.created_by = cli.id;
    meta.comment = cli.comment;
    meta.info.private = cli.private;

    let output = cli
        .output
        .unwrap_or_else(|| PathBuf::from(format!("{}.torrent", meta.info.name)));

    let mut options = OpenOptions::new();
    options.write(true);
    if cli.force {
        options.create(true).truncate(true);
    } else {
        options.create_new(true);
    }
    let file = options.open(&output)?;

    let mut out = BufWriter::new(file);
    meta.write_to(&mut out)?;
    out.flush()?;

    info!(
        path = %output.display(),
        info_hash = %meta.info_hash()?,
        "wrote torrent"
    );
    Ok(())
}
