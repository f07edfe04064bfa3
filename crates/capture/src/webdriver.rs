//! W3C WebDriver client
//!
//! Speaks the WebDriver JSON wire protocol to chromedriver (or any
//! compatible server) over HTTP. Only the handful of commands the capture
//! flow needs are implemented.

use std::time::Duration;

use reqwest::Method;
use serde_json::{json, Value};
use tokio::time::{sleep, Instant};
use tracing::debug;

use crate::profile::Locator;
use crate::surface::{ElementHandle, Segment, SegmentKind, SurfaceError, SurfaceResult};

/// Key under which W3C drivers return element references
pub const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// WebDriver code point for the Enter key
pub const ENTER_KEY: char = '\u{E006}';

/// Interval between element lookups while waiting for presence
const ELEMENT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Returns `[tag, visible text]` for every descendant of `arguments[0]`
const READ_SEGMENTS_SCRIPT: &str = r#"
const root = arguments[0];
return Array.from(root.querySelectorAll('*')).map(function (el) {
  return [el.tagName.toLowerCase(), el.innerText || ''];
});
"#;

/// Browser launch options
#[derive(Debug, Clone)]
pub struct BrowserOptions {
    pub headless: bool,
    pub incognito: bool,
    /// Extra Chrome command-line arguments
    pub args: Vec<String>,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            headless: false,
            incognito: true,
            args: Vec::new(),
        }
    }
}

impl BrowserOptions {
    fn capabilities(&self) -> Value {
        let mut args = self.args.clone();
        if self.incognito {
            args.push("--incognito".to_string());
        }
        if self.headless {
            args.push("--headless=new".to_string());
        }

        json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "chrome",
                    "goog:chromeOptions": { "args": args }
                }
            }
        })
    }
}

/// An open browser session
pub struct WebDriverSession {
    client: reqwest::Client,
    base_url: String,
    session_id: String,
}

impl WebDriverSession {
    /// Create a new browser session on the driver at `base_url`
    pub async fn start(base_url: &str, options: &BrowserOptions) -> SurfaceResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;
        let base_url = base_url.trim_end_matches('/').to_string();

        let response = client
            .post(format!("{}/session", base_url))
            .json(&options.capabilities())
            .send()
            .await?;
        let value = unwrap_value(response).await?;

        let session_id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| SurfaceError::Protocol(format!("no sessionId in {}", value)))?
            .to_string();

        debug!("Started WebDriver session {}", session_id);
        Ok(Self {
            client,
            base_url,
            session_id,
        })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    async fn command(&self, method: Method, path: &str, body: Option<Value>) -> SurfaceResult<Value> {
        let url = format!("{}/session/{}{}", self.base_url, self.session_id, path);
        let mut request = self.client.request(method, &url);
        // POST commands must carry a JSON body, even an empty one
        if let Some(body) = body {
            request = request.json(&body);
        }
        let response = request.send().await?;
        unwrap_value(response).await
    }

    /// Navigate the current tab
    pub async fn navigate(&self, url: &str) -> SurfaceResult<()> {
        self.command(Method::POST, "/url", Some(json!({ "url": url })))
            .await
            .map(|_| ())
    }

    pub async fn find_element(&self, locator: &Locator) -> SurfaceResult<ElementHandle> {
        let (using, value) = locator.strategy();
        let found = self
            .command(
                Method::POST,
                "/element",
                Some(json!({ "using": using, "value": value })),
            )
            .await?;
        element_from_value(&found)
    }

    pub async fn find_elements(&self, locator: &Locator) -> SurfaceResult<Vec<ElementHandle>> {
        let (using, value) = locator.strategy();
        let found = self
            .command(
                Method::POST,
                "/elements",
                Some(json!({ "using": using, "value": value })),
            )
            .await?;

        found
            .as_array()
            .ok_or_else(|| SurfaceError::Protocol(format!("expected array, got {}", found)))?
            .iter()
            .map(element_from_value)
            .collect()
    }

    /// Poll for an element until it is present or `timeout` elapses
    pub async fn wait_for_element(
        &self,
        locator: &Locator,
        timeout: Duration,
    ) -> SurfaceResult<ElementHandle> {
        let deadline = Instant::now() + timeout;
        loop {
            match self.find_element(locator).await {
                Err(SurfaceError::NotFound(_)) | Err(SurfaceError::StaleHandle)
                    if Instant::now() < deadline =>
                {
                    sleep(ELEMENT_POLL_INTERVAL).await;
                }
                result => return result,
            }
        }
    }

    pub async fn click(&self, element: &ElementHandle) -> SurfaceResult<()> {
        self.command(
            Method::POST,
            &format!("/element/{}/click", element.id()),
            Some(json!({})),
        )
        .await
        .map(|_| ())
    }

    pub async fn clear(&self, element: &ElementHandle) -> SurfaceResult<()> {
        self.command(
            Method::POST,
            &format!("/element/{}/clear", element.id()),
            Some(json!({})),
        )
        .await
        .map(|_| ())
    }

    pub async fn send_keys(&self, element: &ElementHandle, text: &str) -> SurfaceResult<()> {
        self.command(
            Method::POST,
            &format!("/element/{}/value", element.id()),
            Some(json!({ "text": text })),
        )
        .await
        .map(|_| ())
    }

    /// Run a synchronous script in the page
    pub async fn execute(&self, script: &str, args: Vec<Value>) -> SurfaceResult<Value> {
        self.command(
            Method::POST,
            "/execute/sync",
            Some(json!({ "script": script, "args": args })),
        )
        .await
    }

    /// Read the descendants of `element` as segments, in one round trip
    pub async fn read_segments(&self, element: &ElementHandle) -> SurfaceResult<Vec<Segment>> {
        let value = self
            .execute(READ_SEGMENTS_SCRIPT, vec![element_reference(element)])
            .await?;
        segments_from_value(&value)
    }

    /// End the session and close the browser
    pub async fn quit(self) -> SurfaceResult<()> {
        let url = format!("{}/session/{}", self.base_url, self.session_id);
        let response = self.client.delete(&url).send().await?;
        unwrap_value(response).await?;
        debug!("Closed WebDriver session {}", self.session_id);
        Ok(())
    }
}

/// JSON form of an element reference, as passed to scripts
pub fn element_reference(element: &ElementHandle) -> Value {
    json!({ ELEMENT_KEY: element.id() })
}

fn element_from_value(value: &Value) -> SurfaceResult<ElementHandle> {
    value
        .get(ELEMENT_KEY)
        .and_then(Value::as_str)
        .map(ElementHandle::new)
        .ok_or_else(|| SurfaceError::Protocol(format!("not an element reference: {}", value)))
}

fn segments_from_value(value: &Value) -> SurfaceResult<Vec<Segment>> {
    let rows = value
        .as_array()
        .ok_or_else(|| SurfaceError::Protocol(format!("expected segment list, got {}", value)))?;

    rows.iter()
        .map(|row| match row.as_array().map(Vec::as_slice) {
            Some([tag, text]) => Ok(Segment::new(
                SegmentKind::from_tag(tag.as_str().unwrap_or_default()),
                text.as_str().unwrap_or_default(),
            )),
            _ => Err(SurfaceError::Protocol(format!("malformed segment: {}", row))),
        })
        .collect()
}

/// Extract `value` from a WebDriver response, mapping W3C errors
async fn unwrap_value(response: reqwest::Response) -> SurfaceResult<Value> {
    let status = response.status();
    let body: Value = response.json().await?;
    let value = body.get("value").cloned().unwrap_or(Value::Null);

    if status.is_success() {
        return Ok(value);
    }

    let code = value
        .get("error")
        .and_then(Value::as_str)
        .unwrap_or("unknown error")
        .to_string();
    let message = value
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    Err(match code.as_str() {
        "stale element reference" => SurfaceError::StaleHandle,
        "no such element" => SurfaceError::NotFound(message),
        _ => SurfaceError::Driver { code, message },
    })
}
