//! ChatProbe Response Capture
//!
//! This crate drives a live chat UI and captures each answer once it has
//! finished streaming:
//! - Talks to a browser through the W3C WebDriver protocol
//! - Spawns and health-checks chromedriver when no driver URL is given
//! - Bootstraps a session from a declarative YAML target profile
//! - Detects the end of a streamed answer by bounded polling
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Capture Runner (per workbook)              │
//! ├─────────────────────────────────────────────────────────────┤
//! │  run_capture(config, profile, workbook)                     │
//! │    ├── ChromeDriver::spawn() -> driver endpoint             │
//! │    ├── WebDriverSession::start() -> session                 │
//! │    ├── bootstrap(session, profile.setup)                    │
//! │    └── for each row: CaptureEngine::submit_and_capture      │
//! ├─────────────────────────────────────────────────────────────┤
//! │  CaptureEngine (against any UiSurface)                      │
//! │    ├── baseline: count answer blocks                        │
//! │    ├── re-locate input, submit                              │
//! │    ├── appearance phase: poll until count > baseline        │
//! │    ├── stabilization phase: poll until text length repeats  │
//! │    └── final extraction: paragraphs + line breaks           │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod driver;
pub mod engine;
pub mod error;
pub mod profile;
pub mod runner;
pub mod session;
pub mod surface;
pub mod webdriver;

pub use engine::{CaptureEngine, CaptureTimings, CapturedAnswer};
pub use error::{CaptureError, CaptureResult};
pub use profile::{Locator, SetupStep, TargetProfile};
pub use runner::{run_capture, CaptureReport, CaptureRunner};
pub use surface::{ElementHandle, Segment, SegmentKind, SurfaceError, SurfaceResult, UiSurface};
