//! W3C WebDriver implementation of the session capabilities.
//!
//! Speaks the JSON wire protocol to a running driver (chromedriver by
//! default). Every acquisition launches a fresh browser with a random user
//! agent, a French locale and the usual automation markers switched off.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use ratewatch_core::AppConfig;
use reqwest::{Client, Method};
use serde_json::{json, Value};

use super::{
    BrowserSession, ElementHandle, PageSession, Readiness, SessionError, SessionFactory, Selector,
};

/// Key under which WebDriver serializes element references.
pub const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

const READY_STATE_POLL: Duration = Duration::from_millis(250);

/// Hides the most common automation fingerprints before any page script runs.
const MASKING_SCRIPT: &str = r"
Object.defineProperty(navigator, 'webdriver', { get: () => undefined });
Object.defineProperty(navigator, 'plugins', { get: () => [1, 2, 3, 4, 5] });
Object.defineProperty(navigator, 'languages', { get: () => ['fr-FR', 'fr', 'en-US', 'en'] });
window.chrome = window.chrome || { runtime: {} };
";

#[derive(Debug, Clone)]
pub struct WebDriverConfig {
    /// Driver base URL, e.g. `http://localhost:9515`.
    pub endpoint: String,
    pub headless: bool,
    pub user_agents: Vec<String>,
    pub locale: String,
    pub timezone: String,
    /// Per-request HTTP timeout towards the driver.
    pub request_timeout: Duration,
}

impl WebDriverConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            endpoint: config.webdriver_url.clone(),
            headless: config.headless,
            user_agents: config.user_agents.clone(),
            locale: config.browser_locale.clone(),
            timezone: config.browser_timezone.clone(),
            request_timeout: Duration::from_secs(config.navigation_timeout_secs + 30),
        }
    }

    /// Session capabilities for a Chromium-family driver.
    #[must_use]
    pub fn capabilities(&self, user_agent: &str) -> Value {
        let mut args = vec![
            "--disable-blink-features=AutomationControlled".to_owned(),
            "--disable-dev-shm-usage".to_owned(),
            "--no-sandbox".to_owned(),
            "--window-size=1920,1080".to_owned(),
            format!("--lang={}", self.locale),
            format!("--user-agent={user_agent}"),
        ];
        if self.headless {
            args.push("--headless=new".to_owned());
        }

        json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "chrome",
                    "pageLoadStrategy": "eager",
                    "goog:chromeOptions": {
                        "args": args,
                        "excludeSwitches": ["enable-automation"],
                        "prefs": { "intl.accept_languages": accept_languages(&self.locale) }
                    }
                }
            }
        })
    }
}

fn accept_languages(locale: &str) -> String {
    match locale.split_once('-') {
        Some((language, _)) => format!("{locale},{language}"),
        None => locale.to_owned(),
    }
}

/// Launches one browser per [`acquire`](SessionFactory::acquire).
pub struct WebDriverFactory {
    http: Client,
    config: WebDriverConfig,
}

impl WebDriverFactory {
    /// # Errors
    ///
    /// Returns [`SessionError::Http`] if the HTTP client cannot be built, or
    /// [`SessionError::Protocol`] if the user-agent pool is empty.
    pub fn new(config: WebDriverConfig) -> Result<Self, SessionError> {
        if config.user_agents.is_empty() {
            return Err(SessionError::Protocol("user agent pool is empty".to_owned()));
        }
        let http = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self { http, config })
    }

    fn pick_user_agent(&self) -> &str {
        let index = rand::rng().random_range(0..self.config.user_agents.len());
        &self.config.user_agents[index]
    }
}

#[async_trait]
impl SessionFactory for WebDriverFactory {
    type Session = WebDriverSession;

    async fn acquire(&self) -> Result<WebDriverSession, SessionError> {
        let user_agent = self.pick_user_agent().to_owned();
        let endpoint = self.config.endpoint.trim_end_matches('/');

        let response = self
            .http
            .post(format!("{endpoint}/session"))
            .json(&self.config.capabilities(&user_agent))
            .send()
            .await?;
        let value = unwrap_value(response).await?;
        let session_id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                SessionError::Protocol("new session response lacks sessionId".to_owned())
            })?
            .to_owned();

        let wire = Arc::new(Wire {
            http: self.http.clone(),
            base: format!("{endpoint}/session/{session_id}"),
            closed: AtomicBool::new(false),
        });
        tracing::debug!(session_id, user_agent, "webdriver session started");

        wire.harden(&self.config.timezone).await;

        let initial = match wire.current_window().await {
            Ok(handle) => handle,
            Err(e) => {
                wire.discard().await;
                return Err(e);
            }
        };

        Ok(WebDriverSession { wire, initial })
    }
}

/// Shared HTTP plumbing for one driver session.
struct Wire {
    http: Client,
    base: String,
    closed: AtomicBool,
}

impl Wire {
    async fn command(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, SessionError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(SessionError::Closed);
        }
        let url = if path.is_empty() {
            self.base.clone()
        } else {
            format!("{}/{path}", self.base)
        };
        let mut request = self.http.request(method.clone(), &url);
        if method == Method::POST {
            request = request.json(&body.unwrap_or_else(|| json!({})));
        }
        unwrap_value(request.send().await?).await
    }

    /// Best-effort fingerprint masking and timezone override through the
    /// Chromium DevTools passthrough. Non-Chromium drivers reject it.
    async fn harden(&self, timezone: &str) {
        let commands = [
            (
                "Page.addScriptToEvaluateOnNewDocument",
                json!({ "source": MASKING_SCRIPT }),
            ),
            (
                "Emulation.setTimezoneOverride",
                json!({ "timezoneId": timezone }),
            ),
        ];
        for (cmd, params) in commands {
            let body = json!({ "cmd": cmd, "params": params });
            if let Err(e) = self
                .command(Method::POST, "goog/cdp/execute", Some(body))
                .await
            {
                tracing::debug!(cmd, error = %e, "devtools command not applied");
            }
        }
    }

    async fn current_window(&self) -> Result<String, SessionError> {
        self.command(Method::GET, "window", None)
            .await?
            .as_str()
            .map(str::to_owned)
            .ok_or_else(|| SessionError::Protocol("window handle is not a string".to_owned()))
    }

    /// Ends a session that never reached the caller. Failures are logged only.
    async fn discard(&self) {
        if let Err(e) = self.command(Method::DELETE, "", None).await {
            tracing::warn!(base = %self.base, error = %e, "failed to end half-open session");
        }
        self.closed.store(true, Ordering::Release);
    }

    async fn switch_to(&self, handle: &str) -> Result<(), SessionError> {
        self.command(Method::POST, "window", Some(json!({ "handle": handle })))
            .await
            .map(|_| ())
    }
}

/// Reads `{"value": ...}`, turning driver error bodies into [`SessionError`].
async fn unwrap_value(response: reqwest::Response) -> Result<Value, SessionError> {
    let status = response.status();
    let body: Value = response
        .json()
        .await
        .map_err(|e| SessionError::Protocol(format!("non-JSON response ({status}): {e}")))?;
    let value = match body {
        Value::Object(mut map) => map.remove("value").unwrap_or(Value::Null),
        other => return Err(SessionError::Protocol(format!("unexpected body: {other}"))),
    };

    if let Some(error) = value.get("error").and_then(Value::as_str) {
        let message = value
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned();
        return Err(match error {
            "invalid session id" => SessionError::Closed,
            _ => SessionError::WebDriver {
                error: error.to_owned(),
                message,
            },
        });
    }
    if !status.is_success() {
        return Err(SessionError::Protocol(format!(
            "HTTP {status} without error body"
        )));
    }
    Ok(value)
}

fn element_ref(element: &ElementHandle) -> Value {
    let mut reference = serde_json::Map::new();
    reference.insert(ELEMENT_KEY.to_owned(), Value::String(element.id().to_owned()));
    Value::Object(reference)
}

fn to_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// A running browser and its initial window.
pub struct WebDriverSession {
    wire: Arc<Wire>,
    initial: String,
}

#[async_trait]
impl BrowserSession for WebDriverSession {
    type Page = WebDriverPage;

    async fn initial_page(&mut self) -> Result<WebDriverPage, SessionError> {
        Ok(WebDriverPage {
            wire: Arc::clone(&self.wire),
            window: self.initial.clone(),
        })
    }

    async fn new_page(&mut self) -> Result<WebDriverPage, SessionError> {
        let created = self
            .wire
            .command(Method::POST, "window/new", Some(json!({ "type": "tab" })))
            .await?;
        let handle = created
            .get("handle")
            .and_then(Value::as_str)
            .ok_or_else(|| SessionError::Protocol("new window lacks handle".to_owned()))?
            .to_owned();
        self.wire.switch_to(&handle).await?;
        Ok(WebDriverPage {
            wire: Arc::clone(&self.wire),
            window: handle,
        })
    }

    async fn close_page(&mut self, page: WebDriverPage) -> Result<(), SessionError> {
        if page.window == self.initial {
            return Ok(());
        }
        self.wire.switch_to(&page.window).await?;
        self.wire.command(Method::DELETE, "window", None).await?;
        self.wire.switch_to(&self.initial).await
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        let result = self.wire.command(Method::DELETE, "", None).await;
        self.wire.closed.store(true, Ordering::Release);
        result.map(|_| ())
    }
}

/// One browser tab. Commands assume it is the driver's current window.
pub struct WebDriverPage {
    wire: Arc<Wire>,
    window: String,
}

impl WebDriverPage {
    #[must_use]
    pub fn window_handle(&self) -> &str {
        &self.window
    }

    async fn wait_until_loaded(&self, timeout: Duration) -> Result<(), SessionError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let state = self
                .evaluate("return document.readyState;", Vec::new())
                .await?;
            if state.as_str() == Some("complete") {
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(SessionError::timeout("document load", timeout));
            }
            tokio::time::sleep(READY_STATE_POLL).await;
        }
    }
}

#[async_trait]
impl PageSession for WebDriverPage {
    async fn navigate(
        &self,
        url: &str,
        readiness: Readiness,
        timeout: Duration,
    ) -> Result<(), SessionError> {
        self.wire
            .command(
                Method::POST,
                "timeouts",
                Some(json!({ "pageLoad": to_millis(timeout) })),
            )
            .await?;

        let started = tokio::time::Instant::now();
        match self
            .wire
            .command(Method::POST, "url", Some(json!({ "url": url })))
            .await
        {
            Ok(_) => {}
            Err(SessionError::WebDriver { error, .. }) if error == "timeout" => {
                return Err(SessionError::timeout(format!("navigation to {url}"), timeout));
            }
            Err(e) => return Err(e),
        }

        if readiness == Readiness::Load {
            self.wait_until_loaded(timeout.saturating_sub(started.elapsed()))
                .await?;
        }
        Ok(())
    }

    async fn find_all(&self, selector: &Selector) -> Result<Vec<ElementHandle>, SessionError> {
        let found = self
            .wire
            .command(
                Method::POST,
                "elements",
                Some(json!({ "using": selector.strategy(), "value": selector.value() })),
            )
            .await?;
        let Value::Array(items) = found else {
            return Err(SessionError::Protocol("elements response is not an array".to_owned()));
        };
        items
            .iter()
            .map(|item| {
                item.get(ELEMENT_KEY)
                    .and_then(Value::as_str)
                    .map(ElementHandle::new)
                    .ok_or_else(|| {
                        SessionError::Protocol(format!("not an element reference: {item}"))
                    })
            })
            .collect()
    }

    async fn is_visible(&self, element: &ElementHandle) -> Result<bool, SessionError> {
        let path = format!("element/{}/displayed", element.id());
        let displayed = self.wire.command(Method::GET, &path, None).await?;
        displayed
            .as_bool()
            .ok_or_else(|| SessionError::Protocol("displayed is not a boolean".to_owned()))
    }

    async fn click(&self, element: &ElementHandle) -> Result<(), SessionError> {
        let path = format!("element/{}/click", element.id());
        self.wire.command(Method::POST, &path, None).await.map(|_| ())
    }

    async fn text(&self, element: &ElementHandle) -> Result<String, SessionError> {
        let path = format!("element/{}/text", element.id());
        let text = self.wire.command(Method::GET, &path, None).await?;
        Ok(text.as_str().unwrap_or_default().to_owned())
    }

    async fn attribute(
        &self,
        element: &ElementHandle,
        name: &str,
    ) -> Result<Option<String>, SessionError> {
        let path = format!("element/{}/attribute/{name}", element.id());
        let value = self.wire.command(Method::GET, &path, None).await?;
        Ok(value.as_str().map(str::to_owned))
    }

    async fn evaluate(&self, script: &str, args: Vec<Value>) -> Result<Value, SessionError> {
        self.wire
            .command(
                Method::POST,
                "execute/sync",
                Some(json!({ "script": script, "args": args })),
            )
            .await
    }

    async fn evaluate_on(
        &self,
        element: &ElementHandle,
        script: &str,
    ) -> Result<Value, SessionError> {
        self.evaluate(script, vec![element_ref(element)]).await
    }
}
