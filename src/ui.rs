// UI layer: terminal output for a run. A progress bar while handles are
// uploaded, one coloured line per handle, a confirmation prompt before
// anything is registered, and the end-of-run summary.

use std::io::IsTerminal;

use anyhow::Result;
use crossterm::style::Stylize;
use dialoguer::Confirm;
use indicatif::{ProgressBar, ProgressStyle};

use crate::error::UploadError;
use crate::pipeline::Plan;
use crate::upload::{Step, UploadHandle, UploadObserver, UploadReport};

/// Draws a progress bar and reports each handle's outcome above it.
pub struct TerminalObserver {
    bar: ProgressBar,
}

impl TerminalObserver {
    pub fn new() -> Self {
        TerminalObserver {
            bar: ProgressBar::hidden(),
        }
    }
}

impl Default for TerminalObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl UploadObserver for TerminalObserver {
    fn started(&mut self, total: usize) {
        self.bar = ProgressBar::new(total as u64);
        let style = ProgressStyle::with_template("{spinner} [{bar:30}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ");
        self.bar.set_style(style);
    }

    fn step_done(&mut self, handle: &UploadHandle, step: Step, status: Option<u16>) {
        let status = status.map(|s| format!(" [{}]", s)).unwrap_or_default();
        self.bar
            .set_message(format!("{} {}{}", handle.file_name, step, status));
    }

    fn handle_done(&mut self, handle: &UploadHandle, failure: Option<(Step, &UploadError)>) {
        let line = match failure {
            None => format!(
                "{} {} -> {}",
                "ok".green(),
                handle.file_name,
                handle.slot_name
            ),
            Some((step, err)) => {
                let status = err
                    .status()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "-".into());
                format!(
                    "{} {} -> {} ({} failed, status {}): {}",
                    "failed".red(),
                    handle.file_name,
                    handle.slot_name,
                    step,
                    status,
                    err
                )
            }
        };
        self.bar.println(line);
        self.bar.inc(1);
    }

    fn finished(&mut self, _report: &UploadReport) {
        self.bar.finish_and_clear();
    }
}

/// Print the items that would be registered, as the JSON request body.
pub fn print_plan(plan: &Plan, dataset_slug: &str) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&plan.payload(dataset_slug))?);
    println!(
        "{} items, {} slot files (dry run, nothing sent)",
        plan.items.len(),
        plan.slot_count()
    );
    Ok(())
}

/// Ask before registering. Skipped (treated as yes) when stdin is not a
/// terminal or when `assume_yes` is set.
pub fn confirm_upload(plan: &Plan, dataset_slug: &str, assume_yes: bool) -> Result<bool> {
    if assume_yes || !std::io::stdin().is_terminal() {
        return Ok(true);
    }
    for folder in &plan.folders {
        println!(
            "  {} <- {} ({} files)",
            folder.slot_name.as_str().bold(),
            folder.path.display(),
            folder.len()
        );
    }
    let answer = Confirm::new()
        .with_prompt(format!(
            "Register {} items ({} files) in dataset {}?",
            plan.items.len(),
            plan.slot_count(),
            dataset_slug
        ))
        .default(true)
        .interact()?;
    Ok(answer)
}

/// End-of-run summary, including every failed handle.
pub fn print_summary(report: &UploadReport) {
    println!(
        "{} items registered, {} of {} files uploaded",
        report.items_registered,
        report.succeeded.len(),
        report.total()
    );
    if !report.blocked_items.is_empty() {
        println!("{}", format!("{} items blocked:", report.blocked_items.len()).yellow());
        for blocked in &report.blocked_items {
            println!("  {}", blocked);
        }
    }
    if !report.failed.is_empty() {
        println!("{}", format!("{} uploads failed:", report.failed.len()).red());
        for failure in &report.failed {
            println!(
                "  {} ({}, upload {}) at {}: {}",
                failure.handle.file_name,
                failure.handle.slot_name,
                failure.handle.upload_id,
                failure.step,
                failure.error
            );
        }
    }
}
