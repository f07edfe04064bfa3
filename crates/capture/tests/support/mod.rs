//! Scripted chat surface for capture tests.
//!
//! Content is a pure function of the (tokio) clock, so tests run on a paused
//! runtime and stay deterministic. Every handle carries the document
//! generation it was issued at; using it after the generation moved on
//! yields `SurfaceError::StaleHandle`, like a real browser would.

#![allow(dead_code)]

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chatprobe_capture::surface::{ElementHandle, Segment, SurfaceError, SurfaceResult, UiSurface};
use tokio::time::Instant;

/// How the fake UI answers a submitted message
#[derive(Debug, Clone)]
pub struct Reply {
    /// Delay between submission and the answer block appearing
    pub appear_after: Duration,
    /// Segments revealed one at a time
    pub chunks: Vec<Segment>,
    /// Interval between two revealed segments; zero reveals all at once
    pub chunk_every: Duration,
    /// Keep appending paragraphs forever once the chunks run out
    pub endless: bool,
    /// Messages containing this text never get an answer block
    pub ignore_containing: Option<String>,
    /// Bump the generation after every read, invalidating all handles
    pub invalidate_after_read: bool,
    /// The first N segment reads fail with a stale handle
    pub stale_reads: usize,
    /// The first N submissions fail with a stale handle
    pub stale_submits: usize,
    /// The N segment reads after the first successful one fail with a
    /// driver error
    pub failing_reads: usize,
}

impl Default for Reply {
    fn default() -> Self {
        Self {
            appear_after: Duration::from_secs(2),
            chunks: vec![Segment::paragraph("Paris")],
            chunk_every: Duration::from_secs(1),
            endless: false,
            ignore_containing: None,
            invalidate_after_read: false,
            stale_reads: 0,
            stale_submits: 0,
            failing_reads: 0,
        }
    }
}

struct State {
    /// Finished answer blocks from earlier turns
    history: Vec<Vec<Segment>>,
    submitted_at: Option<Instant>,
    answering: bool,
    bumps: u64,
    stale_reads: usize,
    stale_submits: usize,
    failing_reads: usize,
    submissions: Vec<String>,
    reads: usize,
}

pub struct FakeChat {
    reply: Reply,
    state: Mutex<State>,
}

impl FakeChat {
    pub fn new(reply: Reply) -> Self {
        Self::with_history(reply, 0)
    }

    /// Start with `answered` earlier answer blocks already on the page
    pub fn with_history(reply: Reply, answered: usize) -> Self {
        let state = State {
            history: vec![vec![Segment::paragraph("earlier answer")]; answered],
            submitted_at: None,
            answering: false,
            bumps: 0,
            stale_reads: reply.stale_reads,
            stale_submits: reply.stale_submits,
            failing_reads: reply.failing_reads,
            submissions: Vec::new(),
            reads: 0,
        };
        Self {
            reply,
            state: Mutex::new(state),
        }
    }

    pub fn submissions(&self) -> Vec<String> {
        self.state.lock().unwrap().submissions.clone()
    }

    pub fn reads(&self) -> usize {
        self.state.lock().unwrap().reads
    }

    /// Segments of the answer currently streaming, if it is visible yet
    fn current_answer(&self, state: &State) -> Option<Vec<Segment>> {
        if !state.answering {
            return None;
        }
        let elapsed = state.submitted_at?.elapsed();
        if elapsed < self.reply.appear_after {
            return None;
        }

        let since = elapsed - self.reply.appear_after;
        let steps = if self.reply.chunk_every.is_zero() {
            usize::MAX
        } else {
            (since.as_nanos() / self.reply.chunk_every.as_nanos()) as usize
        };

        let shown = steps.saturating_add(1).min(self.reply.chunks.len());
        let mut segments = self.reply.chunks[..shown].to_vec();
        if self.reply.endless {
            let extra = steps.saturating_sub(self.reply.chunks.len().saturating_sub(1));
            segments.extend((0..extra.min(10_000)).map(|i| Segment::paragraph(format!("more {i}"))));
        }
        Some(segments)
    }

    fn blocks(&self, state: &State) -> Vec<Vec<Segment>> {
        let mut blocks = state.history.clone();
        blocks.extend(self.current_answer(state));
        blocks
    }

    /// Changes whenever the rendered document changes
    fn generation(&self, state: &State) -> u64 {
        let content = self
            .current_answer(state)
            .map(|segments| segments.len() as u64 + 1)
            .unwrap_or(0);
        state.history.len() as u64 * 1_000_000 + content * 1_000 + state.bumps
    }

    fn check_fresh(&self, state: &State, handle: &ElementHandle) -> SurfaceResult<usize> {
        let (index, generation) = handle
            .id()
            .split_once('@')
            .ok_or_else(|| SurfaceError::Protocol(handle.id().to_string()))?;
        if generation.parse::<u64>().ok() != Some(self.generation(state)) {
            return Err(SurfaceError::StaleHandle);
        }
        Ok(index.trim_start_matches("block-").parse().unwrap_or(0))
    }
}

#[async_trait]
impl UiSurface for FakeChat {
    async fn locate_input(&self) -> SurfaceResult<ElementHandle> {
        let state = self.state.lock().unwrap();
        Ok(ElementHandle::new(format!("input@{}", self.generation(&state))))
    }

    async fn submit(&self, input: ElementHandle, text: &str) -> SurfaceResult<()> {
        let mut state = self.state.lock().unwrap();
        self.check_fresh(&state, &input)?;
        if state.stale_submits > 0 {
            state.stale_submits -= 1;
            state.bumps += 1;
            return Err(SurfaceError::StaleHandle);
        }

        // The previous answer is final once a new question goes out
        if let Some(previous) = self.current_answer(&state) {
            state.history.push(previous);
        }
        state.submissions.push(text.to_string());
        state.submitted_at = Some(Instant::now());
        state.answering = match &self.reply.ignore_containing {
            Some(needle) => !text.contains(needle.as_str()),
            None => true,
        };
        Ok(())
    }

    async fn list_answer_blocks(&self) -> SurfaceResult<Vec<ElementHandle>> {
        let state = self.state.lock().unwrap();
        let generation = self.generation(&state);
        Ok((0..self.blocks(&state).len())
            .map(|i| ElementHandle::new(format!("block-{i}@{generation}")))
            .collect())
    }

    async fn read_segments(&self, block: ElementHandle) -> SurfaceResult<Vec<Segment>> {
        let mut state = self.state.lock().unwrap();
        let index = self.check_fresh(&state, &block)?;
        if state.stale_reads > 0 {
            state.stale_reads -= 1;
            return Err(SurfaceError::StaleHandle);
        }
        if state.reads > 0 && state.failing_reads > 0 {
            state.failing_reads -= 1;
            return Err(SurfaceError::Driver {
                code: "unknown error".into(),
                message: "renderer busy".into(),
            });
        }

        let segments = self
            .blocks(&state)
            .get(index)
            .cloned()
            .ok_or(SurfaceError::StaleHandle)?;
        state.reads += 1;
        if self.reply.invalidate_after_read {
            state.bumps += 1;
        }
        Ok(segments)
    }
}
