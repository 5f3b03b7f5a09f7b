use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;
mod conversion;
mod engine;
mod engines;
mod error;
mod preprocessing;
mod raster;

#[derive(Parser, Debug)]
#[command(name = "wqh")]
#[command(about = "Convert photos of documents to text")]
#[command(version)]
pub struct Args {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Flags shared by every subcommand
///
/// Each can also be set through `WQH_<FLAG>` (e.g. `WQH_API_KEY`) when it is
/// not given on the command line.
#[derive(clap::Args, Debug, Default)]
pub struct GlobalArgs {
    /// Use the local Tesseract engine instead of Google Cloud Vision
    #[arg(long, global = true, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    pub tesseract: Option<bool>,

    /// Google Cloud Vision API key
    #[arg(long, global = true)]
    pub api_key: Option<String>,

    /// Cloud Vision annotate endpoint
    #[arg(long, global = true)]
    pub endpoint: Option<String>,

    /// Path to tessdata directory (downloaded to the cache dir if not set)
    #[arg(long, global = true)]
    pub tessdata: Option<PathBuf>,

    /// Tesseract language (e.g., "eng", "deu", "fra")
    #[arg(long, global = true)]
    pub language: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Convert picture to text and write it after an optional header
    #[command(alias = "run")]
    Create {
        /// Picture to read, `-` for stdin
        picture: String,

        /// Save created output to file
        #[arg(long)]
        save: Option<PathBuf>,

        /// Header file which will be prepended to text from picture
        #[arg(long)]
        header: Option<PathBuf>,

        /// Optimize picture before recognition
        #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
        optimize: Option<bool>,
    },

    /// Convert a picture to text and print text to stdout
    Convert {
        /// Picture to read, `-` for stdin
        picture: String,

        /// Optimize picture before recognition
        #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
        optimize: Option<bool>,
    },

    /// Optimize picture for further processing (writes PNG)
    #[command(alias = "opt")]
    Optimize {
        /// Picture to read, `-` for stdin
        picture: String,

        /// Save created output to file
        #[arg(long)]
        save: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let resolver = config::env_resolver();
    let log_level = config::log_level(&args.global, &resolver);

    // Logs go to stderr; stdout carries text or image output
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = config::Config::resolve(&args.global, &resolver)?;

    tracing::debug!(
        version = env!("CARGO_PKG_VERSION"),
        backend = config.backend.as_str(),
        "Starting wqh"
    );

    commands::run(args.command, &config, &resolver)
}
