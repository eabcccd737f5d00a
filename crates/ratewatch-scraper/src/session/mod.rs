//! Browser session capabilities the extraction procedure drives.
//!
//! The procedure and orchestrator only see these traits. [`webdriver`]
//! implements them over the W3C WebDriver wire protocol; tests use scripted
//! in-memory fakes.

pub mod webdriver;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

pub use webdriver::{WebDriverConfig, WebDriverFactory, WebDriverPage, WebDriverSession};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("webdriver error {error}: {message}")]
    WebDriver { error: String, message: String },

    #[error("unexpected webdriver response: {0}")]
    Protocol(String),

    #[error("timed out after {timeout_ms} ms waiting for {what}")]
    Timeout { what: String, timeout_ms: u64 },

    #[error("browser session is closed")]
    Closed,
}

impl SessionError {
    pub(crate) fn timeout(what: impl Into<String>, timeout: Duration) -> Self {
        Self::Timeout {
            what: what.into(),
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Selector {
    Css(String),
    XPath(String),
}

impl Selector {
    #[must_use]
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    #[must_use]
    pub fn xpath(expression: impl Into<String>) -> Self {
        Self::XPath(expression.into())
    }

    /// WebDriver location strategy name.
    #[must_use]
    pub fn strategy(&self) -> &'static str {
        match self {
            Self::Css(_) => "css selector",
            Self::XPath(_) => "xpath",
        }
    }

    #[must_use]
    pub fn value(&self) -> &str {
        match self {
            Self::Css(s) | Self::XPath(s) => s,
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Css(s) => write!(f, "css={s}"),
            Self::XPath(s) => write!(f, "xpath={s}"),
        }
    }
}

/// Which element to take when a locator matches several.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Pick {
    #[default]
    First,
    Last,
}

/// A selector with an optional fallback, tried only when the primary matches
/// nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locator {
    pub primary: Selector,
    pub fallback: Option<Selector>,
    pub pick: Pick,
}

impl Locator {
    #[must_use]
    pub fn new(primary: Selector) -> Self {
        Self {
            primary,
            fallback: None,
            pick: Pick::First,
        }
    }

    #[must_use]
    pub fn or(mut self, fallback: Selector) -> Self {
        self.fallback = Some(fallback);
        self
    }

    #[must_use]
    pub fn last(mut self) -> Self {
        self.pick = Pick::Last;
        self
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.primary)?;
        if let Some(fallback) = &self.fallback {
            write!(f, " | {fallback}")?;
        }
        Ok(())
    }
}

/// Page readiness a navigation waits for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    DomContentLoaded,
    Load,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementState {
    Attached,
    Visible,
}

/// Opaque reference to an element on a page.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementHandle(String);

impl ElementHandle {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.0
    }
}

/// One browser tab.
///
/// Scripts passed to [`evaluate`](Self::evaluate) are function bodies that
/// read their inputs from `arguments` and `return` a JSON-serializable value.
/// [`evaluate_on`](Self::evaluate_on) passes the element as `arguments[0]`.
#[async_trait]
pub trait PageSession: Send + Sync {
    async fn navigate(
        &self,
        url: &str,
        readiness: Readiness,
        timeout: Duration,
    ) -> Result<(), SessionError>;

    async fn find_all(&self, selector: &Selector) -> Result<Vec<ElementHandle>, SessionError>;

    async fn is_visible(&self, element: &ElementHandle) -> Result<bool, SessionError>;

    async fn click(&self, element: &ElementHandle) -> Result<(), SessionError>;

    async fn text(&self, element: &ElementHandle) -> Result<String, SessionError>;

    async fn attribute(
        &self,
        element: &ElementHandle,
        name: &str,
    ) -> Result<Option<String>, SessionError>;

    async fn evaluate(&self, script: &str, args: Vec<Value>) -> Result<Value, SessionError>;

    async fn evaluate_on(
        &self,
        element: &ElementHandle,
        script: &str,
    ) -> Result<Value, SessionError>;

    async fn scroll_into_view(&self, element: &ElementHandle) -> Result<(), SessionError> {
        self.evaluate_on(
            element,
            "arguments[0].scrollIntoView({block: 'center', inline: 'nearest'});",
        )
        .await
        .map(|_| ())
    }
}

/// A running browser owning one or more tabs.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    type Page: PageSession;

    /// The tab the browser opened with.
    async fn initial_page(&mut self) -> Result<Self::Page, SessionError>;

    async fn new_page(&mut self) -> Result<Self::Page, SessionError>;

    async fn close_page(&mut self, page: Self::Page) -> Result<(), SessionError>;

    /// Ends the session. Further calls fail with [`SessionError::Closed`].
    async fn close(&mut self) -> Result<(), SessionError>;
}

/// Launches configured browser sessions.
#[async_trait]
pub trait SessionFactory: Send + Sync {
    type Session: BrowserSession;

    async fn acquire(&self) -> Result<Self::Session, SessionError>;
}

/// Resolves `locator` once: primary matches if any, otherwise fallback matches,
/// then the picked end of the list.
///
/// # Errors
///
/// Propagates page errors from element lookup.
pub async fn locate<P: PageSession + ?Sized>(
    page: &P,
    locator: &Locator,
) -> Result<Option<ElementHandle>, SessionError> {
    let mut matches = page.find_all(&locator.primary).await?;
    if matches.is_empty() {
        if let Some(fallback) = &locator.fallback {
            matches = page.find_all(fallback).await?;
        }
    }
    Ok(match locator.pick {
        Pick::First => matches.into_iter().next(),
        Pick::Last => matches.pop(),
    })
}

/// Polls until `locator` resolves to an element in `state` or `timeout` elapses.
///
/// Lookup errors while polling (stale elements, transient protocol errors)
/// count as "not yet".
///
/// # Errors
///
/// Returns [`SessionError::Timeout`] when the deadline passes, and
/// [`SessionError::Closed`] immediately if the session has gone away.
pub async fn wait_for<P: PageSession + ?Sized>(
    page: &P,
    locator: &Locator,
    state: ElementState,
    timeout: Duration,
    poll: Duration,
) -> Result<ElementHandle, SessionError> {
    let deadline = tokio::time::Instant::now() + timeout;

    loop {
        match check_state(page, locator, state).await {
            Ok(Some(element)) => return Ok(element),
            Ok(None) => {}
            Err(SessionError::Closed) => return Err(SessionError::Closed),
            Err(e) => tracing::trace!(locator = %locator, error = %e, "element state check failed"),
        }

        let now = tokio::time::Instant::now();
        if now >= deadline {
            return Err(SessionError::timeout(locator.to_string(), timeout));
        }
        tokio::time::sleep(poll.min(deadline - now)).await;
    }
}

async fn check_state<P: PageSession + ?Sized>(
    page: &P,
    locator: &Locator,
    state: ElementState,
) -> Result<Option<ElementHandle>, SessionError> {
    let Some(element) = locate(page, locator).await? else {
        return Ok(None);
    };
    match state {
        ElementState::Attached => Ok(Some(element)),
        ElementState::Visible => Ok(page.is_visible(&element).await?.then_some(element)),
    }
}
