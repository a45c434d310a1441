use anyhow::Context;
use bistaticcore::detection::SetKind;
use clap::Parser;
use generator::profile::{build_scenario, GeneratorConfig};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use workflow::batch::{collect_inputs, run_batch};
use workflow::config::WorkflowConfig;
use workflow::runner::{render_error, render_outcome, Runner};

mod generator;
mod workflow;

#[derive(Parser)]
#[command(author, version, about = "Passive bistatic radar target-state solver")]
struct Args {
    /// Detection set JSON file
    input: Option<PathBuf>,
    /// Detection set variant: auto, pair or triple
    #[arg(long)]
    mode: Option<SetKind>,
    /// Load solver and workflow settings from YAML
    #[arg(long)]
    config: Option<PathBuf>,
    /// Solve every *.json file in a directory
    #[arg(long, conflicts_with = "input")]
    batch: Option<PathBuf>,
    /// Concurrent solves in batch mode
    #[arg(long)]
    workers: Option<usize>,
    /// Print the detection set forward-modelled from a YAML scenario
    #[arg(long, conflicts_with_all = ["input", "batch"])]
    synthesize: Option<PathBuf>,
    /// Single-line JSON output
    #[arg(long, default_value_t = false)]
    compact: bool,
}

fn emit<T: Serialize>(value: &T, compact: bool) -> anyhow::Result<()> {
    let text = if compact {
        serde_json::to_string(value)
    } else {
        serde_json::to_string_pretty(value)
    }
    .context("serializing output")?;
    println!("{}", text);
    Ok(())
}

fn run(args: Args) -> anyhow::Result<ExitCode> {
    let workflow_config = match &args.config {
        Some(path) => WorkflowConfig::load(path)?,
        None => WorkflowConfig::default(),
    }
    .with_overrides(args.mode, args.workers);

    if let Some(path) = &args.synthesize {
        let document = build_scenario(&GeneratorConfig::load(path)?)?;
        emit(&document, args.compact)?;
        return Ok(ExitCode::SUCCESS);
    }

    let runner = Runner::new(workflow_config.clone());

    if let Some(dir) = &args.batch {
        let files = collect_inputs(dir)?;
        log::info!("solving {} files with {} workers", files.len(), workflow_config.workers);
        let report = run_batch(&runner, files, workflow_config.workers)?;
        emit(&report.entries, args.compact)?;

        let metrics = runner.metrics();
        log::info!(
            "batch complete: {} inputs, solved={} no_solution={} failed={}",
            metrics.total(),
            metrics.solved,
            metrics.no_solution,
            metrics.failed
        );
        return Ok(if report.failures > 0 {
            ExitCode::FAILURE
        } else {
            ExitCode::SUCCESS
        });
    }

    let input = args
        .input
        .context("no input given; pass a detection JSON file or --batch DIR")?;
    let outcome = runner.solve_file(&input)?;
    emit(&render_outcome(&outcome)?, args.compact)?;
    Ok(ExitCode::SUCCESS)
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();
    let compact = args.compact;

    match run(args) {
        Ok(code) => code,
        Err(err) => {
            log::error!("{:#}", err);
            if let Err(emit_err) = emit(&render_error(&err), compact) {
                log::error!("{:#}", emit_err);
            }
            ExitCode::FAILURE
        }
    }
}
