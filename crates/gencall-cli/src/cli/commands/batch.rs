//! `gencall batch <file>` – every prompt line through one client, in order.
//!
//! Rate-limited prompts stay in the client's queue and are retried ahead of
//! the following prompts; their responses are printed as they complete.

use anyhow::{bail, Context, Result};
use gencall_core::config::GencallConfig;
use gencall_core::Client;
use std::fs;
use std::path::{Path, PathBuf};

use crate::cli::RequestArgs;

/// Outcome counts for one batch run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BatchReport {
    pub succeeded: usize,
    pub deferred_done: usize,
    /// Includes deferred requests dropped by a later drain.
    pub failed: usize,
    pub still_queued: usize,
}

/// Non-empty lines that do not start with '#', trimmed.
pub(crate) fn read_prompts(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect()
}

fn snippet(prompt: &str) -> String {
    const MAX: usize = 40;
    match prompt.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &prompt[..idx]),
        None => prompt.to_string(),
    }
}

fn print_completed(client: &Client, report: &mut BatchReport) {
    for done in client.take_completed() {
        report.deferred_done += 1;
        println!(
            "[deferred #{} \"{}\"] {}",
            done.seq,
            snippet(done.request.prompt()),
            done.response.text
        );
    }
}

pub(crate) fn run_prompts(client: &Client, prompts: &[String], args: &RequestArgs) -> BatchReport {
    let mut report = BatchReport::default();
    let mut deferred = 0usize;
    for (i, prompt) in prompts.iter().enumerate() {
        let line = i + 1;
        match client.call(args.request(client, prompt.as_str())) {
            Ok(response) => {
                report.succeeded += 1;
                println!("[{}] {}", line, response.text);
            }
            Err(err) if err.is_queued() => {
                deferred += 1;
                println!("[{}] deferred: {}", line, err);
            }
            Err(err) => {
                report.failed += 1;
                println!("[{}] failed: {}", line, err);
            }
        }
        print_completed(client, &mut report);
    }
    report.still_queued = client.queue_size();
    report.failed += deferred
        .saturating_sub(report.deferred_done)
        .saturating_sub(report.still_queued);
    report
}

fn run_file(cfg: &GencallConfig, path: &Path, args: &RequestArgs) -> Result<BatchReport> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("cannot read prompts from {}", path.display()))?;
    let prompts = read_prompts(&text);
    if prompts.is_empty() {
        bail!("no prompts in {}", path.display());
    }
    let client = Client::from_config(cfg)?;
    tracing::info!(count = prompts.len(), "batch started");
    Ok(run_prompts(&client, &prompts, args))
}

pub async fn run_batch(cfg: GencallConfig, path: PathBuf, args: RequestArgs) -> Result<()> {
    let report = tokio::task::spawn_blocking(move || run_file(&cfg, &path, &args))
        .await
        .context("batch task join")??;

    println!(
        "{} succeeded, {} completed after deferral, {} failed, {} still queued",
        report.succeeded, report.deferred_done, report.failed, report.still_queued
    );
    if report.still_queued > 0 {
        tracing::warn!(
            remaining = report.still_queued,
            "batch finished with deferred requests; they are dropped on exit"
        );
    }
    if report.failed > 0 || report.still_queued > 0 {
        bail!(
            "{} prompt(s) did not complete",
            report.failed + report.still_queued
        );
    }
    Ok(())
}
