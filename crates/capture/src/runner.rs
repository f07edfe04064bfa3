//! Capture runner that orchestrates the driver, the session and the
//! per-row capture loop over a result workbook

use std::path::Path;
use std::time::{Duration, Instant};

use chatprobe_common::{Column, ProbeConfig, ResultWorkbook, CAPTURE_ERROR_SENTINEL};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::driver::{ChromeDriver, DriverConfig};
use crate::engine::{CaptureEngine, CaptureTimings};
use crate::error::{CaptureError, CaptureResult};
use crate::profile::TargetProfile;
use crate::session::{bootstrap, ChatSurface};
use crate::surface::UiSurface;
use crate::webdriver::{BrowserOptions, WebDriverSession};

/// Outcome of capturing one row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnCapture {
    pub row: u32,
    pub question: String,
    pub answer: String,
    pub stable: bool,
    pub duration_ms: u64,
    pub error: Option<String>,
}

/// Result of a capture pass over a workbook
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureReport {
    pub target: String,
    pub started_at: DateTime<Utc>,
    pub attempted: usize,
    pub captured: usize,
    pub failed: usize,
    /// Captured, but cut off by the stabilization timeout
    pub unstable: usize,
    pub duration_ms: u64,
    pub turns: Vec<TurnCapture>,
}

/// Sends every question of a workbook through one surface
pub struct CaptureRunner<'a, S: UiSurface + ?Sized> {
    surface: &'a S,
    engine: CaptureEngine,
    profile: &'a TargetProfile,
    inter_turn_delay: Duration,
}

impl<'a, S: UiSurface + ?Sized> CaptureRunner<'a, S> {
    pub fn new(
        surface: &'a S,
        engine: CaptureEngine,
        profile: &'a TargetProfile,
        inter_turn_delay: Duration,
    ) -> Self {
        Self {
            surface,
            engine,
            profile,
            inter_turn_delay,
        }
    }

    /// Capture an answer for every row that has a question.
    ///
    /// A failed turn gets the sentinel answer and the pass moves on; only
    /// store errors abort. The workbook is mutated in memory, not saved.
    pub async fn capture_workbook(&self, workbook: &mut ResultWorkbook) -> CaptureResult<CaptureReport> {
        let start = Instant::now();
        let started_at = Utc::now();
        workbook.ensure_header(Column::Captured, &self.profile.response_header);

        let pending: Vec<(u32, String)> = workbook
            .rows()?
            .into_iter()
            .filter_map(|row| row.question.as_text().map(|q| (row.row, q)))
            .collect();

        info!("Capturing {} question(s) from {}", pending.len(), self.profile.name);

        let mut turns = Vec::with_capacity(pending.len());
        for (index, (row, question)) in pending.iter().enumerate() {
            if index > 0 && !self.inter_turn_delay.is_zero() {
                tokio::time::sleep(self.inter_turn_delay).await;
            }

            let turn = self.capture_turn(*row, question).await;
            workbook.write_captured(turn.row, &turn.answer)?;
            info!("Q: {}\nA: {}", turn.question, turn.answer);
            turns.push(turn);
        }

        let captured = turns.iter().filter(|t| t.error.is_none()).count();
        let report = CaptureReport {
            target: self.profile.name.clone(),
            started_at,
            attempted: turns.len(),
            captured,
            failed: turns.len() - captured,
            unstable: turns.iter().filter(|t| t.error.is_none() && !t.stable).count(),
            duration_ms: start.elapsed().as_millis() as u64,
            turns,
        };

        info!(
            "Capture finished: {} captured, {} failed, {} unstable ({} ms)",
            report.captured, report.failed, report.unstable, report.duration_ms
        );
        Ok(report)
    }

    async fn capture_turn(&self, row: u32, question: &str) -> TurnCapture {
        let start = Instant::now();
        let message = self.profile.prompt_for(question);

        let (answer, stable, error) = match self.engine.submit_and_capture(self.surface, &message).await {
            Ok(captured) => {
                if !captured.stable {
                    warn!("Row {}: answer still changing at timeout, keeping last reading", row);
                }
                (captured.text, captured.stable, None)
            }
            Err(e) => {
                error!("Row {}: error sending message or capturing response: {}", row, e);
                (CAPTURE_ERROR_SENTINEL.to_string(), false, Some(e.to_string()))
            }
        };

        TurnCapture {
            row,
            question: question.to_string(),
            answer,
            stable,
            duration_ms: start.elapsed().as_millis() as u64,
            error,
        }
    }
}

/// Capture every question of `workbook_path` against `profile`.
///
/// Opens the store first (a missing store aborts before any browser is
/// started), brings up the driver and session, bootstraps, captures, and
/// saves. The browser session and the driver are released on every path.
pub async fn run_capture(
    config: &ProbeConfig,
    profile: &TargetProfile,
    workbook_path: &Path,
) -> CaptureResult<CaptureReport> {
    let mut workbook = ResultWorkbook::open(workbook_path)?;

    // Spawned driver lives until the end of this function
    let (driver_url, _driver) = match &config.webdriver.url {
        Some(url) => {
            crate::driver::wait_for_ready(url, config.webdriver.startup_timeout()).await?;
            (url.clone(), None)
        }
        None => {
            let driver = ChromeDriver::spawn(DriverConfig::from(&config.webdriver)).await?;
            (driver.base_url().to_string(), Some(driver))
        }
    };

    let options = BrowserOptions {
        headless: config.webdriver.headless,
        incognito: config.webdriver.incognito,
        ..Default::default()
    };
    let session = WebDriverSession::start(&driver_url, &options)
        .await
        .map_err(|e| CaptureError::DriverStartup(e.to_string()))?;

    let element_wait = config.webdriver.element_wait();
    let outcome = async {
        bootstrap(&session, profile, element_wait).await?;

        let surface = ChatSurface::new(&session, profile, element_wait);
        let engine = CaptureEngine::new(CaptureTimings::from(&config.capture));
        let runner = CaptureRunner::new(&surface, engine, profile, config.capture.inter_turn_delay());
        let report = runner.capture_workbook(&mut workbook).await?;

        workbook.save()?;
        Ok::<_, CaptureError>(report)
    }
    .await;

    if let Err(e) = session.quit().await {
        warn!("Failed to close browser session: {}", e);
    }

    outcome
}
