//! Validate Command

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use chatprobe_common::ProbeConfig;
use chatprobe_grader::{validate_workbook, Grader, HttpEmbedder, RowOutcome, ValidationReport};

use crate::output::{
    print_document, print_info, print_list, print_summary, truncate, verdict_cell, OutputFormat,
    TableDisplay,
};

#[derive(Args)]
pub struct ValidateArgs {
    /// Result workbook to grade
    pub file: Option<PathBuf>,

    /// Minimum similarity for a PASS (overrides the config)
    #[arg(short, long)]
    pub threshold: Option<f64>,
}

/// Row outcome display wrapper
#[derive(Serialize)]
pub struct RowDisplay<'a>(&'a RowOutcome);

impl TableDisplay for RowDisplay<'_> {
    fn headers() -> Vec<&'static str> {
        vec!["Row", "Expected", "Actual", "Score", "Verdict", "Note"]
    }

    fn row(&self) -> Vec<String> {
        let outcome = self.0;
        vec![
            outcome.row.to_string(),
            truncate(outcome.expected.as_deref().unwrap_or("-"), 40),
            truncate(outcome.actual.as_deref().unwrap_or("-"), 60),
            outcome
                .score
                .map(|s| format!("{:.3}", s))
                .unwrap_or_else(|| "-".to_string()),
            verdict_cell(outcome.verdict),
            outcome.note.clone().unwrap_or_default(),
        ]
    }
}

pub async fn execute(args: ValidateArgs, config: &ProbeConfig, format: OutputFormat) -> Result<()> {
    let Some(file) = args.file else {
        eprintln!("Usage: chatprobe validate <file>");
        std::process::exit(1);
    };

    let threshold = args.threshold.unwrap_or(config.grading.threshold);
    run_validation(config, &file, threshold, format).await?;
    Ok(())
}

/// Reject similarity thresholds outside `[0, 1]`
pub fn check_threshold(threshold: f64) -> Result<()> {
    anyhow::ensure!(
        (0.0..=1.0).contains(&threshold),
        "threshold must be within [0, 1], got {}",
        threshold
    );
    Ok(())
}

/// Grade `path` with the configured embedding endpoint and print the report
pub async fn run_validation(
    config: &ProbeConfig,
    path: &Path,
    threshold: f64,
    format: OutputFormat,
) -> Result<ValidationReport> {
    check_threshold(threshold)?;

    let embedder = HttpEmbedder::from_settings(&config.embedding)
        .context("Failed to set up the embedding client")?;
    let grader = Grader::new(embedder).with_threshold(threshold);

    let report = validate_workbook(path, &grader, threshold)
        .await
        .with_context(|| format!("Validation of {} failed", path.display()))?;

    print_report(&report, format);
    Ok(report)
}

fn print_report(report: &ValidationReport, format: OutputFormat) {
    if print_document(report, format) {
        return;
    }

    print_info(&format!(
        "Validated {} (threshold {:.2})",
        report.path.display(),
        report.threshold
    ));
    let rows: Vec<RowDisplay> = report.rows.iter().map(RowDisplay).collect();
    print_list(&rows, format);
    print_summary(&report.summary);
}
