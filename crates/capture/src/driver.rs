//! WebDriver server management - spawning and health checking chromedriver

use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

use chatprobe_common::config::WebDriverSettings;

use crate::error::{CaptureError, CaptureResult};

/// Handle to a running chromedriver process
pub struct ChromeDriver {
    child: Child,
    pub base_url: String,
    pub port: u16,
}

impl ChromeDriver {
    /// Spawn chromedriver on a free local port and wait until it is ready
    pub async fn spawn(config: DriverConfig) -> CaptureResult<Self> {
        let port = match config.port {
            Some(port) => port,
            None => find_free_port()?,
        };
        let base_url = format!("http://127.0.0.1:{}", port);

        info!("Spawning chromedriver on port {}", port);

        let child = Command::new(&config.binary_path)
            .arg(format!("--port={}", port))
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                CaptureError::DriverStartup(format!(
                    "Failed to spawn {}: {}",
                    config.binary_path.display(),
                    e
                ))
            })?;

        let handle = ChromeDriver {
            child,
            base_url: base_url.clone(),
            port,
        };

        handle.wait_for_ready(config.startup_timeout).await?;

        info!("chromedriver is ready at {}", base_url);
        Ok(handle)
    }

    /// Poll `/status` until the driver reports ready
    async fn wait_for_ready(&self, timeout_duration: Duration) -> CaptureResult<()> {
        wait_for_ready(&self.base_url, timeout_duration).await
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Stop the driver process
    pub fn stop(&mut self) -> CaptureResult<()> {
        info!("Stopping chromedriver (pid: {})", self.child.id());

        #[cfg(unix)]
        {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            let pid = Pid::from_raw(self.child.id() as i32);
            if kill(pid, Signal::SIGTERM).is_ok() {
                std::thread::sleep(Duration::from_millis(200));
            }
        }

        let _ = self.child.kill();
        let _ = self.child.wait();

        Ok(())
    }
}

impl Drop for ChromeDriver {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

/// Wait for a WebDriver server at `base_url` to report `ready: true`
pub async fn wait_for_ready(base_url: &str, timeout_duration: Duration) -> CaptureResult<()> {
    let status_url = format!("{}/status", base_url.trim_end_matches('/'));
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(2))
        .build()?;

    let start = std::time::Instant::now();
    let mut attempts = 0;

    while start.elapsed() < timeout_duration {
        attempts += 1;

        match client.get(&status_url).send().await {
            Ok(resp) if resp.status().is_success() => {
                let body: serde_json::Value = resp.json().await.unwrap_or_default();
                if body["value"]["ready"].as_bool().unwrap_or(true) {
                    return Ok(());
                }
                warn!("WebDriver not ready yet: {}", body["value"]["message"]);
            }
            Ok(resp) => {
                warn!("WebDriver status returned {}", resp.status());
            }
            Err(e) => {
                if attempts == 1 {
                    info!("Waiting for WebDriver to start...");
                }
                // Connection refused is expected while the driver is starting
                if !e.is_connect() {
                    warn!("WebDriver status error: {}", e);
                }
            }
        }

        sleep(Duration::from_millis(100)).await;
    }

    Err(CaptureError::DriverHealthCheck(attempts))
}

/// Configuration for spawning chromedriver
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Path to the chromedriver binary
    pub binary_path: PathBuf,

    /// Port to listen on (None = find free port)
    pub port: Option<u16>,

    /// Timeout for driver startup
    pub startup_timeout: Duration,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self::from(&WebDriverSettings::default())
    }
}

impl From<&WebDriverSettings> for DriverConfig {
    fn from(settings: &WebDriverSettings) -> Self {
        Self {
            binary_path: settings.chromedriver_path.clone(),
            port: None,
            startup_timeout: settings.startup_timeout(),
        }
    }
}

/// Find a free port to use
fn find_free_port() -> std::io::Result<u16> {
    use std::net::TcpListener;

    Ok(TcpListener::bind("127.0.0.1:0")?.local_addr()?.port())
}
