//! The UI surface a chat answer is captured from
//!
//! A surface is a live, mutating document. Every handle it returns is only
//! valid until the next mutation, so handles are move-only: the operations
//! that use a handle consume it, and callers re-query instead of keeping
//! one across a poll.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SurfaceError {
    /// A handle was used after the document mutated underneath it
    #[error("Stale element handle")]
    StaleHandle,

    #[error("Element not found: {0}")]
    NotFound(String),

    #[error("WebDriver error [{code}]: {message}")]
    Driver { code: String, message: String },

    #[error("Unexpected WebDriver response: {0}")]
    Protocol(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type SurfaceResult<T> = Result<T, SurfaceError>;

/// Reference to one node of the surface, valid for a single use
#[derive(Debug, PartialEq, Eq)]
pub struct ElementHandle(String);

impl ElementHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn id(&self) -> &str {
        &self.0
    }
}

/// Kind of a leaf segment inside an answer block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentKind {
    Paragraph,
    LineBreak,
    TableCell,
    Other,
}

impl SegmentKind {
    /// Classify an element by its (case-insensitive) tag name
    pub fn from_tag(tag: &str) -> Self {
        match tag.to_ascii_lowercase().as_str() {
            "p" => SegmentKind::Paragraph,
            "br" => SegmentKind::LineBreak,
            "td" | "th" => SegmentKind::TableCell,
            _ => SegmentKind::Other,
        }
    }
}

/// One descendant of an answer block, in document order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub kind: SegmentKind,
    pub text: String,
}

impl Segment {
    pub fn new(kind: SegmentKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }

    pub fn paragraph(text: impl Into<String>) -> Self {
        Self::new(SegmentKind::Paragraph, text)
    }

    pub fn line_break() -> Self {
        Self::new(SegmentKind::LineBreak, "")
    }
}

/// Capability the capture engine needs from a chat UI
#[async_trait]
pub trait UiSurface: Send + Sync {
    /// Find the message input control
    async fn locate_input(&self) -> SurfaceResult<ElementHandle>;

    /// Type `text` into the input and send it
    async fn submit(&self, input: ElementHandle, text: &str) -> SurfaceResult<()>;

    /// All answer blocks currently rendered, in document order
    async fn list_answer_blocks(&self) -> SurfaceResult<Vec<ElementHandle>>;

    /// Descendant segments of an answer block, in document order
    async fn read_segments(&self, block: ElementHandle) -> SurfaceResult<Vec<Segment>>;
}

/// Text used to decide whether a streamed answer is still growing.
///
/// Paragraphs, line breaks and table cells are joined with newlines.
pub fn progress_text(segments: &[Segment]) -> String {
    segments
        .iter()
        .filter(|s| s.kind != SegmentKind::Other)
        .map(|s| s.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Final answer text: paragraph texts with an explicit newline token for
/// every line break, joined with newlines.
pub fn render_answer(segments: &[Segment]) -> String {
    segments
        .iter()
        .filter_map(|s| match s.kind {
            SegmentKind::Paragraph => Some(s.text.as_str()),
            SegmentKind::LineBreak => Some("\n"),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("\n")
}
