//! Session bootstrap and the WebDriver-backed chat surface

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::error::{CaptureError, CaptureResult};
use crate::profile::{Locator, SetupStep, TargetProfile};
use crate::surface::{ElementHandle, Segment, SurfaceResult, UiSurface};
use crate::webdriver::{WebDriverSession, ENTER_KEY};

/// A chat page reached through a WebDriver session
pub struct ChatSurface<'a> {
    session: &'a WebDriverSession,
    input: &'a Locator,
    answer_block: &'a Locator,
    element_wait: Duration,
    clear_before_submit: bool,
}

impl<'a> ChatSurface<'a> {
    pub fn new(session: &'a WebDriverSession, profile: &'a TargetProfile, element_wait: Duration) -> Self {
        Self {
            session,
            input: &profile.selectors.input,
            answer_block: &profile.selectors.answer_block,
            element_wait,
            clear_before_submit: profile.clear_before_submit,
        }
    }
}

#[async_trait]
impl<'a> UiSurface for ChatSurface<'a> {
    async fn locate_input(&self) -> SurfaceResult<ElementHandle> {
        self.session
            .wait_for_element(self.input, self.element_wait)
            .await
    }

    async fn submit(&self, input: ElementHandle, text: &str) -> SurfaceResult<()> {
        self.session.click(&input).await?;
        if self.clear_before_submit {
            self.session.clear(&input).await?;
        }
        let mut keys = String::with_capacity(text.len() + 1);
        keys.push_str(text);
        keys.push(ENTER_KEY);
        self.session.send_keys(&input, &keys).await
    }

    async fn list_answer_blocks(&self) -> SurfaceResult<Vec<ElementHandle>> {
        self.session.find_elements(self.answer_block).await
    }

    async fn read_segments(&self, block: ElementHandle) -> SurfaceResult<Vec<Segment>> {
        self.session.read_segments(&block).await
    }
}

/// Open the profile's start page and run its setup steps.
///
/// A failing required step is a setup failure: the caller must release the
/// session and abort the run.
pub async fn bootstrap(
    session: &WebDriverSession,
    profile: &TargetProfile,
    element_wait: Duration,
) -> CaptureResult<()> {
    info!("Opening {} at {}", profile.name, profile.url);
    session
        .navigate(&profile.url)
        .await
        .map_err(|e| setup_error(&format!("navigate:{}", profile.url), e))?;

    for step in &profile.setup {
        debug!("Setup step: {}", step.label());
        match run_step(session, step, element_wait).await {
            Ok(()) => {}
            Err(reason) if step.is_optional() => {
                warn!("Optional step {} skipped: {}", step.label(), reason);
            }
            Err(reason) => {
                return Err(CaptureError::Setup {
                    step: step.label(),
                    reason,
                })
            }
        }
    }

    info!("Session for {} is ready", profile.name);
    Ok(())
}

async fn run_step(
    session: &WebDriverSession,
    step: &SetupStep,
    element_wait: Duration,
) -> Result<(), String> {
    let wait_for = |timeout_ms: Option<u64>| {
        timeout_ms.map(Duration::from_millis).unwrap_or(element_wait)
    };

    match step {
        SetupStep::Navigate { url } => session.navigate(url).await.map_err(|e| e.to_string()),
        SetupStep::Click {
            target, timeout_ms, ..
        } => {
            let element = session
                .wait_for_element(target, wait_for(*timeout_ms))
                .await
                .map_err(|e| e.to_string())?;
            session.click(&element).await.map_err(|e| e.to_string())
        }
        SetupStep::Fill {
            target,
            value,
            value_env,
            timeout_ms,
        } => {
            let text = resolve_value(value.as_deref(), value_env.as_deref())?;
            let element = session
                .wait_for_element(target, wait_for(*timeout_ms))
                .await
                .map_err(|e| e.to_string())?;
            session
                .send_keys(&element, &text)
                .await
                .map_err(|e| e.to_string())
        }
        SetupStep::Wait { target, timeout_ms } => session
            .wait_for_element(target, Duration::from_millis(*timeout_ms))
            .await
            .map(|_| ())
            .map_err(|e| e.to_string()),
        SetupStep::Sleep { ms } => {
            tokio::time::sleep(Duration::from_millis(*ms)).await;
            Ok(())
        }
    }
}

/// Literal value, or the content of the named environment variable
fn resolve_value(value: Option<&str>, value_env: Option<&str>) -> Result<String, String> {
    match (value, value_env) {
        (Some(value), _) => Ok(value.to_string()),
        (None, Some(var)) => {
            std::env::var(var).map_err(|_| format!("environment variable {} is not set", var))
        }
        (None, None) => Err("no value configured".to_string()),
    }
}

fn setup_error(step: &str, error: impl std::fmt::Display) -> CaptureError {
    CaptureError::Setup {
        step: step.to_string(),
        reason: error.to_string(),
    }
}
