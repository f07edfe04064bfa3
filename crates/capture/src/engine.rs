//! Response capture engine
//!
//! A chat UI gives no signal when an answer has finished streaming, so the
//! engine infers it in two bounded polling phases:
//!
//! 1. **Appearance**: wait until the number of answer blocks exceeds the
//!    count observed before submitting.
//! 2. **Stabilization**: read the newest block repeatedly until two
//!    consecutive readings have the same text length, or the timeout
//!    elapses, in which case the last reading is used.
//!
//! Length equality is a heuristic. A trailing edit that replaces text with
//! text of the same length between two readings goes unnoticed; comparing
//! lengths keeps each check O(1) on top of the read.
//!
//! Once a first reading exists, failed reads are retried until the
//! stabilization deadline. An answer whose final text is blank is reported
//! as [`CaptureError::NoAnswerText`].
//!
//! No element handle outlives a single read. The UI re-renders while it
//! streams, so every access starts with a fresh query.

use std::time::Duration;

use chatprobe_common::config::CaptureSettings;
use serde::{Deserialize, Serialize};
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::error::{CaptureError, CaptureResult};
use crate::surface::{progress_text, render_answer, SurfaceError, SurfaceResult, UiSurface};

/// How many times submission is retried when the input goes stale
const SUBMIT_ATTEMPTS: usize = 3;

/// Polling bounds for one capture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureTimings {
    /// Upper bound on waiting for a new answer block
    pub appearance_timeout: Duration,

    /// Upper bound on waiting for the answer text to stop changing
    pub stabilization_timeout: Duration,

    /// Sleep between checks for a new answer block
    pub poll_interval: Duration,

    /// Sleep between two stabilization readings
    pub settle_interval: Duration,
}

impl Default for CaptureTimings {
    fn default() -> Self {
        Self::from(&CaptureSettings::default())
    }
}

impl From<&CaptureSettings> for CaptureTimings {
    fn from(settings: &CaptureSettings) -> Self {
        Self {
            appearance_timeout: settings.appearance_timeout(),
            stabilization_timeout: settings.stabilization_timeout(),
            poll_interval: settings.poll_interval(),
            settle_interval: settings.settle_interval(),
        }
    }
}

/// A finished answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapturedAnswer {
    pub text: String,

    /// False when the stabilization timeout cut the stream off
    pub stable: bool,

    /// Successful stabilization readings
    pub readings: usize,

    /// Time from submission to extraction
    pub elapsed: Duration,
}

/// One reading of the newest answer block
struct Reading {
    progress_len: usize,
    rendered: String,
}

/// Per-turn polling state; dropped when the turn ends
struct CaptureSession {
    baseline_count: usize,
    submitted_at: Instant,
    last_len: Option<usize>,
    stabilized_text: String,
    readings: usize,
}

impl CaptureSession {
    fn new(baseline_count: usize) -> Self {
        Self {
            baseline_count,
            submitted_at: Instant::now(),
            last_len: None,
            stabilized_text: String::new(),
            readings: 0,
        }
    }

    fn elapsed(&self) -> Duration {
        self.submitted_at.elapsed()
    }

    /// Record a reading; returns true when its length repeats the previous one
    fn absorb(&mut self, reading: Reading) -> bool {
        self.readings += 1;
        let repeated = self.last_len == Some(reading.progress_len);
        self.last_len = Some(reading.progress_len);
        self.stabilized_text = reading.rendered;
        repeated
    }
}

/// Captures streamed answers from a [`UiSurface`]
#[derive(Debug, Clone, Default)]
pub struct CaptureEngine {
    timings: CaptureTimings,
}

impl CaptureEngine {
    pub fn new(timings: CaptureTimings) -> Self {
        Self { timings }
    }

    pub fn timings(&self) -> &CaptureTimings {
        &self.timings
    }

    /// Submit `message` and return the answer once it has stopped streaming.
    ///
    /// Returns within the appearance timeout plus the stabilization timeout
    /// (plus the latency of the surface calls themselves), whatever the UI
    /// does. A UI that never renders a new answer block yields
    /// [`CaptureError::AppearanceTimeout`].
    pub async fn submit_and_capture<S>(
        &self,
        surface: &S,
        message: &str,
    ) -> CaptureResult<CapturedAnswer>
    where
        S: UiSurface + ?Sized,
    {
        let baseline_count = surface.list_answer_blocks().await?.len();
        debug!(baseline_count, "Recorded answer block baseline");

        self.submit(surface, message).await?;
        let mut session = CaptureSession::new(baseline_count);

        self.wait_for_appearance(surface, &session).await?;
        let stable = self.wait_for_stabilization(surface, &mut session).await?;

        let text = match read_latest(surface).await {
            Ok(Some(reading)) => reading.rendered,
            Ok(None) | Err(SurfaceError::StaleHandle) => {
                debug!("Final extraction lost the answer block, using last reading");
                std::mem::take(&mut session.stabilized_text)
            }
            Err(e) if session.readings > 0 => {
                warn!("Final extraction failed ({}), using last reading", e);
                std::mem::take(&mut session.stabilized_text)
            }
            Err(e) => return Err(e.into()),
        };

        // A block that stays blank is no answer, however steady it looks
        if text.trim().is_empty() {
            return Err(CaptureError::NoAnswerText {
                waited: session.elapsed(),
            });
        }

        Ok(CapturedAnswer {
            text,
            stable,
            readings: session.readings,
            elapsed: session.elapsed(),
        })
    }

    /// Locate the input afresh and submit, retrying if it goes stale in between
    async fn submit<S>(&self, surface: &S, message: &str) -> SurfaceResult<()>
    where
        S: UiSurface + ?Sized,
    {
        let mut attempt = 1;
        loop {
            let input = surface.locate_input().await?;
            match surface.submit(input, message).await {
                Err(SurfaceError::StaleHandle) if attempt < SUBMIT_ATTEMPTS => {
                    debug!(attempt, "Input went stale before submission, re-locating");
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    async fn wait_for_appearance<S>(&self, surface: &S, session: &CaptureSession) -> CaptureResult<()>
    where
        S: UiSurface + ?Sized,
    {
        let deadline = session.submitted_at + self.timings.appearance_timeout;

        loop {
            match surface.list_answer_blocks().await {
                Ok(blocks) if blocks.len() > session.baseline_count => {
                    debug!(count = blocks.len(), "New answer block appeared");
                    return Ok(());
                }
                Ok(blocks) => {
                    debug!(count = blocks.len(), "Waiting for response to appear");
                }
                Err(SurfaceError::StaleHandle) => {
                    debug!("Stale handle while counting answer blocks");
                }
                Err(e) => return Err(e.into()),
            }

            let now = Instant::now();
            if now >= deadline {
                let waited = session.elapsed();
                warn!("No response appeared within {:?}", waited);
                return Err(CaptureError::AppearanceTimeout { waited });
            }
            sleep(self.timings.poll_interval.min(deadline - now)).await;
        }
    }

    /// Returns whether the text stabilized before the timeout
    async fn wait_for_stabilization<S>(
        &self,
        surface: &S,
        session: &mut CaptureSession,
    ) -> CaptureResult<bool>
    where
        S: UiSurface + ?Sized,
    {
        let deadline = Instant::now() + self.timings.stabilization_timeout;

        loop {
            match read_latest(surface).await {
                Ok(Some(reading)) => {
                    let len = reading.progress_len;
                    if session.absorb(reading) {
                        debug!(len, readings = session.readings, "Response stabilized");
                        return Ok(true);
                    }
                    debug!(len, "Response still streaming");
                }
                Ok(None) => debug!("Answer block vanished, re-querying"),
                Err(SurfaceError::StaleHandle) => debug!("Stale handle, re-querying"),
                Err(e) if session.readings > 0 => {
                    warn!("Reading answer failed ({}), re-querying", e);
                }
                Err(e) => return Err(e.into()),
            }

            let now = Instant::now();
            if now >= deadline {
                info!(
                    "Response did not stabilize within {:?}, using last reading",
                    self.timings.stabilization_timeout
                );
                return Ok(false);
            }
            sleep(self.timings.settle_interval.min(deadline - now)).await;
        }
    }
}

/// Re-acquire the newest answer block and read it once
async fn read_latest<S>(surface: &S) -> SurfaceResult<Option<Reading>>
where
    S: UiSurface + ?Sized,
{
    let Some(block) = surface.list_answer_blocks().await?.pop() else {
        return Ok(None);
    };
    let segments = surface.read_segments(block).await?;

    Ok(Some(Reading {
        progress_len: progress_text(&segments).chars().count(),
        rendered: render_answer(&segments),
    }))
}
