//! framescan - classify the frames listed in a job descriptor
//!
//! Reads a job descriptor (frames, detector kind, threshold, threads, optional
//! progress path), classifies every frame and writes one result per frame,
//! ordered by frame index, to the output path.

use anyhow::{anyhow, Result};
use clap::Parser;
use std::io::IsTerminal;
use std::path::PathBuf;

use framescan::console::{Console, ConsoleMode};
use framescan::{BatchJob, DetectorRegistry, Orchestrator, ProgressReporter};

#[derive(Parser, Debug)]
#[command(author, version, about = "Classify decoded media frames")]
struct Args {
    /// Job descriptor (JSON, or TOML with a .toml extension).
    #[arg(short, long, value_name = "PATH")]
    input: PathBuf,
    /// Output path for the results array.
    #[arg(short, long, value_name = "PATH")]
    output: PathBuf,
    /// Detection threshold; overrides the descriptor and FRAMESCAN_THRESHOLD.
    #[arg(long)]
    threshold: Option<f32>,
    /// UI mode for stderr progress (auto|plain|pretty)
    #[arg(long, default_value = "auto", value_name = "MODE")]
    ui: String,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let console = Console::new(ConsoleMode::parse(&args.ui), std::io::stderr().is_terminal());

    log::info!("input: {}", args.input.display());
    log::info!("output: {}", args.output.display());

    if !args.input.is_file() {
        return Err(anyhow!(
            "job descriptor does not exist: {}",
            args.input.display()
        ));
    }

    let job = {
        let _stage = console.stage("Load job");
        BatchJob::load(&args.input, args.threshold)?
    };
    log::info!(
        "detector={} threshold={} threads={} frames={}",
        job.detector,
        job.threshold,
        job.threads,
        job.frames.len()
    );
    if job.frames.is_empty() {
        log::warn!("no frames to process");
    }

    let orchestrator = Orchestrator::new(DetectorRegistry::with_builtin());
    let total = job.frames.len();
    let outcome = match console.frame_bar(total) {
        Some(bar) => {
            let progress =
                ProgressReporter::for_path(job.progress_path.as_deref(), total).with_sink(bar);
            orchestrator.run_with_progress(&job, progress)?
        }
        None => {
            let _stage = console.stage("Classify frames");
            orchestrator.run(&job)?
        }
    };

    let size = {
        let _stage = console.stage("Write results");
        outcome.write_results(&args.output)?
    };
    log::info!(
        "results written to {} ({} bytes)",
        args.output.display(),
        size
    );
    Ok(())
}
