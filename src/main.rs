//! CLI tool for embedding a file into a PDF document.
//!
//! The output document is created if missing and extended otherwise; files
//! embedded by earlier runs are kept.

use clap::error::ErrorKind;
use clap::Parser;
use embedfilepdf::{EmbedConfig, EmbedError, PdfEmbedder};
use std::path::PathBuf;
use std::process;

const EXIT_USAGE: i32 = 1;
const EXIT_MISSING_SOURCE: i32 = 2;
const EXIT_FAILURE: i32 = 3;

/// Embed a file as an attachment into a new or existing PDF
#[derive(Parser)]
#[command(name = "embedfilepdf")]
#[command(version, about, long_about = None)]
#[command(after_help = "EXAMPLES:
    embedfilepdf invoice.xml bundle.pdf
    embedfilepdf --name terms.txt ./docs/TERMS bundle.pdf")]
struct Cli {
    /// File to embed
    file: PathBuf,

    /// PDF to create or extend
    output: PathBuf,

    /// Attachment name (default: the file's basename)
    #[arg(long)]
    name: Option<String>,

    /// Deflate level, 0 (store) to 9 (best)
    #[arg(long, value_parser = clap::value_parser!(u32).range(0..=9))]
    level: Option<u32>,

    /// Refuse sources larger than this many bytes
    #[arg(long, value_name = "BYTES")]
    max_size: Option<usize>,

    /// Record the uncompressed size in the stream's /Params
    #[arg(long)]
    record_size: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            e.exit()
        }
        Err(e) => {
            let _ = e.print();
            process::exit(EXIT_USAGE);
        }
    };

    let log_level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp_secs()
        .init();

    let config = EmbedConfig {
        compression: cli
            .level
            .map(flate2::Compression::new)
            .unwrap_or_default(),
        max_source_size: cli.max_size,
        attachment_name: cli.name,
        record_size_param: cli.record_size,
    };

    match PdfEmbedder::with_config(config).embed_file(&cli.file, &cli.output) {
        Ok(outcome) => println!(
            "Embedded '{}' into {} ({} bytes).",
            outcome.filename,
            cli.output.display(),
            outcome.original_size
        ),
        Err(e @ EmbedError::MissingSourceFile(_)) => {
            eprintln!("{e}");
            process::exit(EXIT_MISSING_SOURCE);
        }
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(EXIT_FAILURE);
        }
    }
}
