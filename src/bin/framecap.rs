//! framecap - inspect and annotate frame sequences from the command line.
//!
//! `probe` prints the metadata and label index of a source; `annotate`
//! streams a source through the masking and marker-drawing transforms and
//! writes the result to a directory of images or, with the source-ffmpeg
//! feature, a video file.

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use framecap::config::PipelineConfig;
use framecap::labels::LabelStore;
use framecap::sequence::{FrameSequence, PassOptions, StreamedSequence};
use framecap::sink::{FrameSink, ImageSequenceSink};
use framecap::{source, transforms};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Config file path; overrides the FRAMECAP_CONFIG environment variable.
    #[arg(long, env = "FRAMECAP_CONFIG")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print length, shape and label index of a source.
    Probe {
        /// Source path: a directory of images, a video file, or stub://N/HxWxC.
        source: String,
    },
    /// Mask, mark labeled positions, and write the sequence out.
    Annotate {
        /// Source path, as for probe.
        source: String,
        /// Tracker results file with positions to draw.
        #[arg(long)]
        labels: PathBuf,
        /// Output directory (images) or video file path.
        #[arg(long)]
        out: PathBuf,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let config = match args.config.as_deref() {
        Some(path) => PipelineConfig::load_from(path)?,
        None => PipelineConfig::load()?,
    };
    match args.command {
        Command::Probe { source } => probe(&source),
        Command::Annotate {
            source,
            labels,
            out,
        } => annotate(&config, &source, &labels, &out),
    }
}

fn probe(path: &str) -> Result<()> {
    let source = source::from_path(path)?;
    let sequence = StreamedSequence::load(source)
        .with_context(|| format!("failed to load '{path}'"))?;
    println!("source: {path}");
    println!("length: {}", sequence.length());
    println!("shape:  {}", sequence.shape());
    let index = sequence.index()?;
    match (index.first(), index.last()) {
        (Some(first), Some(last)) => println!("labels: {first}..={last}"),
        _ => println!("labels: (empty)"),
    }
    Ok(())
}

fn annotate(config: &PipelineConfig, path: &str, labels: &Path, out: &Path) -> Result<()> {
    let store = LabelStore::load(labels)
        .with_context(|| format!("failed to load labels from '{}'", labels.display()))?;
    log::info!("annotating '{path}' with {} positions", store.len());

    let source = source::from_path(path)?;
    let mut sequence = StreamedSequence::load(source)
        .with_context(|| format!("failed to load '{path}'"))?;

    if config.mask.apply {
        // soft mask only from the CLI; a hard crop would need the output
        // shape declared up front
        let mask =
            transforms::mask_outside_ellipse(config.mask.center, config.mask.radius, false);
        sequence.apply(PassOptions::new(), mask)?;
    }
    let marker = transforms::annotate(
        store,
        config.annotation.size,
        config.annotation.color.clone(),
    );
    sequence.apply(PassOptions::new(), marker)?;

    let mut sink = open_sink(out, config.output_fps)?;
    sequence.write_to(sink.as_mut())?;
    log::info!("wrote {} frames to '{}'", sequence.length(), out.display());
    Ok(())
}

fn open_sink(out: &Path, fps: u32) -> Result<Box<dyn FrameSink>> {
    if out.is_dir() {
        return Ok(Box::new(ImageSequenceSink::new(out)?));
    }
    #[cfg(feature = "source-ffmpeg")]
    {
        return Ok(Box::new(framecap::sink::FfmpegSink::new(out, fps)?));
    }
    #[cfg(not(feature = "source-ffmpeg"))]
    {
        let _ = fps;
        Err(anyhow!(
            "'{}' is not a directory; video output requires the source-ffmpeg feature",
            out.display()
        ))
    }
}
