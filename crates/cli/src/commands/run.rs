//! Run Command

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use chatprobe_capture::runner::TurnCapture;
use chatprobe_capture::{run_capture, CaptureReport, TargetProfile};
use chatprobe_common::ProbeConfig;

use crate::commands::validate::{check_threshold, run_validation};
use crate::output::{
    print_document, print_list, print_success, print_warning, truncate, OutputFormat, TableDisplay,
};

#[derive(Args)]
pub struct RunArgs {
    /// Target profile name (see `chatprobe targets`)
    pub target: String,

    /// Result workbook (defaults to the target's workbook)
    #[arg(short, long)]
    pub workbook: Option<PathBuf>,

    /// Minimum similarity for a PASS (overrides the config)
    #[arg(short, long)]
    pub threshold: Option<f64>,

    /// Only capture answers, do not grade them
    #[arg(long)]
    pub skip_validation: bool,

    /// Run the browser without a window
    #[arg(long)]
    pub headless: bool,
}

/// Captured turn display wrapper
#[derive(Serialize)]
pub struct TurnDisplay<'a>(&'a TurnCapture);

impl TableDisplay for TurnDisplay<'_> {
    fn headers() -> Vec<&'static str> {
        vec!["Row", "Question", "Answer", "Stable", "Duration"]
    }

    fn row(&self) -> Vec<String> {
        let turn = self.0;
        vec![
            turn.row.to_string(),
            truncate(&turn.question, 40),
            truncate(&turn.answer, 60),
            if turn.error.is_some() {
                "✗".to_string()
            } else if turn.stable {
                "✓".to_string()
            } else {
                "~".to_string()
            },
            format!("{}ms", turn.duration_ms),
        ]
    }
}

pub async fn execute(args: RunArgs, config: &ProbeConfig, format: OutputFormat) -> Result<()> {
    let profile = TargetProfile::find(&args.target, config.profiles_dir.as_deref())
        .with_context(|| format!("Failed to resolve target '{}'", args.target))?;
    let workbook = args.workbook.unwrap_or_else(|| profile.workbook.clone());

    // Checked before the capture pass
    let threshold = args.threshold.unwrap_or(config.grading.threshold);
    if !args.skip_validation {
        check_threshold(threshold)?;
    }

    let mut config = config.clone();
    if args.headless {
        config.webdriver.headless = true;
    }

    let report = run_capture(&config, &profile, &workbook)
        .await
        .with_context(|| format!("Capture run against {} failed", profile.name))?;
    print_capture(&report, format);

    if args.skip_validation {
        return Ok(());
    }

    run_validation(&config, &workbook, threshold, format).await?;
    Ok(())
}

fn print_capture(report: &CaptureReport, format: OutputFormat) {
    if print_document(report, format) {
        return;
    }

    let turns: Vec<TurnDisplay> = report.turns.iter().map(TurnDisplay).collect();
    print_list(&turns, format);

    let message = format!(
        "Captured {}/{} answers from {} in {:.1}s",
        report.captured,
        report.attempted,
        report.target,
        report.duration_ms as f64 / 1000.0
    );
    if report.failed > 0 || report.unstable > 0 {
        print_warning(&format!(
            "{} ({} failed, {} still streaming at timeout)",
            message, report.failed, report.unstable
        ));
    } else {
        print_success(&message);
    }
}
