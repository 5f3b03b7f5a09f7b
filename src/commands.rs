//! Subcommand handlers
//!
//! Opens inputs and outputs, builds the selected backend once and hands off
//! to the conversion pipeline or the preprocessor.

use crate::config::{Config, Resolver};
use crate::conversion::ConversionPipeline;
use crate::engine::ImageStream;
use crate::engines;
use crate::error::PipelineError;
use crate::preprocessing::Preprocessor;
use crate::Command;
use anyhow::Context;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Picture argument that means "read standard input"
const STDIN_SENTINEL: &str = "-";

pub fn run<F>(command: Command, config: &Config, resolver: &Resolver<F>) -> anyhow::Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    match command {
        Command::Create {
            picture,
            save,
            header,
            optimize,
        } => create(
            &picture,
            resolver.path("save", save),
            resolver.path("header", header),
            resolver.switch("optimize", optimize)?,
            config,
        ),
        Command::Convert { picture, optimize } => {
            convert(&picture, resolver.switch("optimize", optimize)?, config)
        }
        Command::Optimize { picture, save } => optimize(&picture, resolver.path("save", save)),
    }
}

/// Header + text to stdout or the save file
fn create(
    picture: &str,
    save: Option<PathBuf>,
    header: Option<PathBuf>,
    optimize: bool,
    config: &Config,
) -> anyhow::Result<()> {
    let mut output = open_output(save.as_deref())?;

    let mut pipeline = ConversionPipeline::new().with_preprocessing(optimize);
    if let Some(path) = &header {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read header file {}", path.display()))?;
        pipeline = pipeline.with_header(bytes);
    }

    // Header goes out before the backend or the input can fail
    pipeline
        .write_header(&mut output)
        .inspect_err(log_failure)
        .context("Failed to write header")?;

    let extractor = engines::select(config.backend, config)
        .inspect_err(|e| tracing::error!(code = e.code(), "Backend unavailable"))?;
    let image = open_input(picture)?;

    pipeline
        .write_text(image, extractor.as_ref(), &mut output)
        .inspect_err(log_failure)
        .with_context(|| format!("Failed to convert {}", picture))
}

/// Text plus a trailing newline to stdout
fn convert(picture: &str, optimize: bool, config: &Config) -> anyhow::Result<()> {
    let extractor = engines::select(config.backend, config)
        .inspect_err(|e| tracing::error!(code = e.code(), "Backend unavailable"))?;
    let image = open_input(picture)?;

    let text = ConversionPipeline::new()
        .with_preprocessing(optimize)
        .extract(image, extractor.as_ref())
        .inspect_err(log_failure)
        .with_context(|| format!("Failed to convert {}", picture))?;

    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{}", text).context("Failed to write text")?;
    stdout.flush().context("Failed to write text")?;
    Ok(())
}

/// Preprocessed PNG to stdout or the save file
fn optimize(picture: &str, save: Option<PathBuf>) -> anyhow::Result<()> {
    let image = open_input(picture)?;

    // Nothing is written (and no save file created) unless preprocessing succeeds
    let png = Preprocessor::new()
        .optimize(image)
        .inspect_err(|e| tracing::error!(code = e.code(), "Preprocessing failed"))
        .with_context(|| format!("Failed to optimize {}", picture))?;

    let mut output = open_output(save.as_deref())?;
    output.write_all(&png).context("Failed to write image")?;
    output.flush().context("Failed to write image")?;

    tracing::debug!(bytes = png.len(), "Optimized image written");
    Ok(())
}

fn log_failure(err: &PipelineError) {
    tracing::error!(code = err.code(), stage = %err.stage, "Conversion failed");
}

fn open_input(picture: &str) -> anyhow::Result<ImageStream<'static>> {
    if picture == STDIN_SENTINEL {
        tracing::debug!("Reading picture from stdin");
        return Ok(ImageStream::new(io::stdin()));
    }

    let file = File::open(picture).with_context(|| format!("Failed to open {}", picture))?;
    Ok(ImageStream::new(file))
}

fn open_output(save: Option<&Path>) -> anyhow::Result<Box<dyn Write>> {
    match save {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            Ok(Box::new(io::BufWriter::new(file)))
        }
        None => Ok(Box::new(io::stdout().lock())),
    }
}
