use crate::workflow::runner::{render_error, render_outcome, Runner};
use anyhow::Context;
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::runtime::Builder as TokioBuilder;
use tokio::sync::Semaphore;

#[derive(Debug, Clone, Serialize)]
pub struct BatchEntry {
    pub file: String,
    pub result: Value,
}

#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub entries: Vec<BatchEntry>,
    /// Files that failed with an input, validation or I/O error.
    pub failures: usize,
}

/// `*.json` files directly inside `dir`, sorted by path.
pub fn collect_inputs<P: AsRef<Path>>(dir: P) -> anyhow::Result<Vec<PathBuf>> {
    let dir_ref = dir.as_ref();
    let mut files = Vec::new();
    for entry in fs::read_dir(dir_ref)
        .with_context(|| format!("reading batch directory {}", dir_ref.display()))?
    {
        let path = entry
            .with_context(|| format!("listing batch directory {}", dir_ref.display()))?
            .path();
        let is_json = path.extension().map_or(false, |ext| ext == "json");
        if is_json && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Solves every file on at most `workers` blocking threads; entries keep the
/// order of `files`.
pub fn run_batch(runner: &Runner, files: Vec<PathBuf>, workers: usize) -> anyhow::Result<BatchReport> {
    let workers = workers.max(1);
    let runtime = TokioBuilder::new_multi_thread()
        .worker_threads(workers)
        .enable_all()
        .build()
        .context("creating batch runtime")?;
    runtime.block_on(solve_all(runner.clone(), files, workers))
}

async fn solve_all(runner: Runner, files: Vec<PathBuf>, workers: usize) -> anyhow::Result<BatchReport> {
    let permits = Arc::new(Semaphore::new(workers));
    let mut handles = Vec::with_capacity(files.len());

    for path in files {
        let permit = permits
            .clone()
            .acquire_owned()
            .await
            .context("acquiring batch worker")?;
        let runner = runner.clone();
        handles.push(tokio::task::spawn_blocking(move || {
            let _permit = permit;
            let result = runner.solve_file(&path);
            (path, result)
        }));
    }

    let mut report = BatchReport::default();
    for handle in handles {
        let (path, result) = handle.await.context("joining batch worker")?;
        let rendered = match &result {
            Ok(outcome) => render_outcome(outcome)?,
            Err(err) => {
                log::warn!("{}: {:#}", path.display(), err);
                report.failures += 1;
                render_error(err)
            }
        };
        let file = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        report.entries.push(BatchEntry {
            file,
            result: rendered,
        });
    }

    Ok(report)
}
