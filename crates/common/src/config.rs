//! Probe configuration

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

/// Top-level configuration, read from `chatprobe.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Extra directory of target profile YAML files
    pub profiles_dir: Option<PathBuf>,

    /// Response capture timing
    pub capture: CaptureSettings,

    /// Grading configuration
    pub grading: GradingSettings,

    /// Embedding endpoint configuration
    pub embedding: EmbeddingSettings,

    /// Browser automation configuration
    pub webdriver: WebDriverSettings,
}

/// Timing of the capture polling loops
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureSettings {
    /// How long to wait for a new answer block to appear
    pub appearance_timeout_secs: u64,

    /// How long to wait for the answer text to stop changing
    pub stabilization_timeout_secs: u64,

    /// Poll interval while waiting for the answer block
    pub poll_interval_ms: u64,

    /// Interval between two length readings during stabilization
    pub settle_interval_ms: u64,

    /// Pause between two questions, to avoid overloading the chat service
    pub inter_turn_delay_secs: u64,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            appearance_timeout_secs: 20,
            stabilization_timeout_secs: 15,
            poll_interval_ms: 1000,
            settle_interval_ms: 3000,
            inter_turn_delay_secs: 15,
        }
    }
}

impl CaptureSettings {
    pub fn appearance_timeout(&self) -> Duration {
        Duration::from_secs(self.appearance_timeout_secs)
    }

    pub fn stabilization_timeout(&self) -> Duration {
        Duration::from_secs(self.stabilization_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn settle_interval(&self) -> Duration {
        Duration::from_millis(self.settle_interval_ms)
    }

    pub fn inter_turn_delay(&self) -> Duration {
        Duration::from_secs(self.inter_turn_delay_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GradingSettings {
    /// Minimum similarity score for a PASS (inclusive)
    pub threshold: f64,
}

impl Default for GradingSettings {
    fn default() -> Self {
        Self { threshold: 0.60 }
    }
}

/// OpenAI-compatible embedding endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Base URL; `/embeddings` is appended
    pub endpoint: String,

    /// Embedding model name
    pub model: String,

    /// Name of the environment variable holding a bearer token, if any
    pub api_key_env: Option<String>,

    /// Request timeout
    pub timeout_secs: u64,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8080/v1".to_string(),
            model: "sentence-transformers/paraphrase-MiniLM-L6-v2".to_string(),
            api_key_env: None,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebDriverSettings {
    /// Address of an already-running WebDriver server
    pub url: Option<String>,

    /// chromedriver binary spawned when `url` is not set
    pub chromedriver_path: PathBuf,

    /// Run the browser without a window
    pub headless: bool,

    /// Start the browser in incognito mode
    pub incognito: bool,

    /// Timeout for the driver to report ready
    pub startup_timeout_secs: u64,

    /// How long element lookups wait for presence
    pub element_wait_secs: u64,
}

impl Default for WebDriverSettings {
    fn default() -> Self {
        Self {
            url: None,
            chromedriver_path: PathBuf::from("chromedriver"),
            headless: false,
            incognito: true,
            startup_timeout_secs: 30,
            element_wait_secs: 10,
        }
    }
}

impl WebDriverSettings {
    pub fn startup_timeout(&self) -> Duration {
        Duration::from_secs(self.startup_timeout_secs)
    }

    pub fn element_wait(&self) -> Duration {
        Duration::from_secs(self.element_wait_secs)
    }
}

impl ProbeConfig {
    /// Load configuration from file, falling back to defaults when absent
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Self::from_toml(&content)
        } else {
            tracing::debug!("No config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.grading.threshold) {
            return Err(Error::InvalidConfig(format!(
                "grading.threshold must be within [0, 1], got {}",
                self.grading.threshold
            )));
        }
        if self.capture.poll_interval_ms == 0 || self.capture.settle_interval_ms == 0 {
            return Err(Error::InvalidConfig(
                "capture poll intervals must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}
