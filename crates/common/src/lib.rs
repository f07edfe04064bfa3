//! ChatProbe Common Library
//!
//! Shared types, configuration, and the spreadsheet-backed result store
//! used by the capture and grading crates.

pub mod config;
pub mod error;
pub mod types;
pub mod workbook;

// Re-export commonly used types
pub use config::ProbeConfig;
pub use error::{Error, Result};
pub use types::*;
pub use workbook::{Column, ResultWorkbook, SheetRow};

/// ChatProbe version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Placeholder written in place of an answer when capture fails.
pub const CAPTURE_ERROR_SENTINEL: &str = "Error capturing response";

/// Default configuration file name, looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "chatprobe.toml";

/// Default configuration path
pub fn default_config_path() -> std::path::PathBuf {
    std::path::PathBuf::from(DEFAULT_CONFIG_FILE)
}
