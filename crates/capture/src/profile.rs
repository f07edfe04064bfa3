//! Declarative YAML target profiles
//!
//! A profile describes one chat product: where it lives, how to log in,
//! and where its input control and answer blocks are in the page.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{CaptureError, CaptureResult};

const BUILTIN_PROFILES: &[(&str, &str)] = &[
    ("huggingchat", include_str!("../profiles/huggingchat.yaml")),
    ("zenochat", include_str!("../profiles/zenochat.yaml")),
];

/// A chat product under test
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetProfile {
    /// Unique name, used on the command line
    pub name: String,

    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// Page the session starts on
    pub url: String,

    /// Default result workbook for this target
    pub workbook: PathBuf,

    /// Header written above the captured answers
    #[serde(default = "default_response_header")]
    pub response_header: String,

    /// Text prepended to every question
    #[serde(default)]
    pub prompt_prefix: String,

    /// Where the input and the answers are
    pub selectors: SurfaceSelectors,

    /// Clear the input before typing (off for contenteditable inputs)
    #[serde(default = "default_true")]
    pub clear_before_submit: bool,

    /// Steps run once after navigation, before the first question
    #[serde(default)]
    pub setup: Vec<SetupStep>,
}

fn default_response_header() -> String {
    "Response".to_string()
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurfaceSelectors {
    /// The message input control
    #[serde(with = "serde_yaml::with::singleton_map")]
    pub input: Locator,

    /// One match per rendered answer, in document order
    #[serde(with = "serde_yaml::with::singleton_map")]
    pub answer_block: Locator,
}

/// Element lookup strategy, written in profiles as a single-key map
/// (`css: textarea` or `xpath: "//textarea"`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Locator {
    Css(String),
    Xpath(String),
}

impl Locator {
    /// WebDriver `using` strategy and value
    pub fn strategy(&self) -> (&'static str, &str) {
        match self {
            Locator::Css(selector) => ("css selector", selector.as_str()),
            Locator::Xpath(path) => ("xpath", path.as_str()),
        }
    }
}

impl std::fmt::Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Locator::Css(selector) => write!(f, "css:{}", selector),
            Locator::Xpath(path) => write!(f, "xpath:{}", path),
        }
    }
}

/// A single session setup step
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum SetupStep {
    /// Navigate to an absolute URL
    Navigate { url: String },

    /// Click an element once it is present
    Click {
        #[serde(with = "serde_yaml::with::singleton_map")]
        target: Locator,
        #[serde(default)]
        timeout_ms: Option<u64>,
        /// Failure of an optional step is logged and ignored
        #[serde(default)]
        optional: bool,
    },

    /// Type a value into an input
    Fill {
        #[serde(with = "serde_yaml::with::singleton_map")]
        target: Locator,
        #[serde(default)]
        value: Option<String>,
        /// Environment variable holding the value
        #[serde(default)]
        value_env: Option<String>,
        #[serde(default)]
        timeout_ms: Option<u64>,
    },

    /// Wait for an element to be present
    Wait {
        #[serde(with = "serde_yaml::with::singleton_map")]
        target: Locator,
        #[serde(default = "default_wait_timeout")]
        timeout_ms: u64,
    },

    /// Wait for a fixed amount of time (use sparingly)
    Sleep { ms: u64 },
}

fn default_wait_timeout() -> u64 {
    10_000
}

impl SetupStep {
    /// Short label for logs and errors
    pub fn label(&self) -> String {
        match self {
            SetupStep::Navigate { url } => format!("navigate:{}", url),
            SetupStep::Click { target, .. } => format!("click:{}", target),
            SetupStep::Fill { target, .. } => format!("fill:{}", target),
            SetupStep::Wait { target, .. } => format!("wait:{}", target),
            SetupStep::Sleep { ms } => format!("sleep:{}ms", ms),
        }
    }

    pub fn is_optional(&self) -> bool {
        matches!(self, SetupStep::Click { optional: true, .. })
    }
}

impl TargetProfile {
    /// Parse a profile from YAML string
    pub fn from_yaml(yaml: &str) -> CaptureResult<Self> {
        let profile: Self = serde_yaml::from_str(yaml)?;
        profile.validate()?;
        Ok(profile)
    }

    /// Parse a profile from a YAML file
    pub fn from_file(path: &Path) -> CaptureResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content).map_err(|e| {
            CaptureError::ProfileParse(format!("{}: {}", path.display(), e))
        })
    }

    /// Load all profiles from a directory
    pub fn load_all(dir: &Path) -> CaptureResult<Vec<Self>> {
        let mut profiles = Vec::new();

        for entry in walkdir::WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.path()
                    .extension()
                    .map(|ext| ext == "yaml" || ext == "yml")
                    .unwrap_or(false)
            })
        {
            profiles.push(Self::from_file(entry.path())?);
        }

        Ok(profiles)
    }

    /// Profiles shipped with the binary
    pub fn builtin() -> CaptureResult<Vec<Self>> {
        BUILTIN_PROFILES
            .iter()
            .map(|(name, yaml)| {
                Self::from_yaml(yaml)
                    .map_err(|e| CaptureError::ProfileParse(format!("builtin {}: {}", name, e)))
            })
            .collect()
    }

    /// Built-in profiles plus those in `extra_dir`; later entries with the
    /// same name replace earlier ones.
    pub fn available(extra_dir: Option<&Path>) -> CaptureResult<Vec<Self>> {
        let mut profiles = Self::builtin()?;
        if let Some(dir) = extra_dir {
            for profile in Self::load_all(dir)? {
                profiles.retain(|p| p.name != profile.name);
                profiles.push(profile);
            }
        }
        Ok(profiles)
    }

    /// Resolve a profile by name
    pub fn find(name: &str, extra_dir: Option<&Path>) -> CaptureResult<Self> {
        Self::available(extra_dir)?
            .into_iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| CaptureError::UnknownTarget(name.to_string()))
    }

    /// The message actually typed for `question`
    pub fn prompt_for(&self, question: &str) -> String {
        format!("{}{}", self.prompt_prefix, question)
    }

    fn validate(&self) -> CaptureResult<()> {
        if self.name.trim().is_empty() {
            return Err(CaptureError::ProfileParse("profile name is empty".to_string()));
        }
        for step in &self.setup {
            if let SetupStep::Fill {
                value: None,
                value_env: None,
                ..
            } = step
            {
                return Err(CaptureError::ProfileParse(format!(
                    "{} needs `value` or `value_env`",
                    step.label()
                )));
            }
        }
        Ok(())
    }
}
