//! Scripted in-memory browser used by the procedure and orchestrator tests.
//!
//! Each hotel URL maps to a [`PageScript`] describing how its listing page
//! behaves. Pages look the script up when they navigate.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::{json, Value};

use ratewatch_core::HotelTarget;
use ratewatch_scraper::calendar::grid::{CAPTURE_SCRIPT, CELL_FAMILIES};
use ratewatch_scraper::events::{RunEvent, RunObserver};
use ratewatch_scraper::procedure::{
    CALENDAR_INDICATOR_SELECTOR, DATE_CONTROL_FALLBACK, DATE_CONTROL_SELECTOR,
};
use ratewatch_scraper::session::{
    BrowserSession, ElementHandle, PageSession, Readiness, Selector, SessionError, SessionFactory,
};

#[derive(Debug, Clone)]
pub struct PageScript {
    pub fail_navigation: bool,
    pub control_visible: bool,
    /// Elements matched by the date control's primary selector, in page order.
    pub control_matches: Vec<&'static str>,
    /// Elements matched by the date control's text fallback.
    pub fallback_matches: Vec<&'static str>,
    /// Selector of a visible consent button, if the page shows one.
    pub consent: Option<&'static str>,
    /// Capture attempts that fail before captures start succeeding.
    pub failing_captures: usize,
    /// What the calendar capture script returns.
    pub capture: Value,
    /// Simulated load time.
    pub load_delay: Duration,
}

impl PageScript {
    pub fn priced(dates: &[NaiveDate], price: u32) -> Self {
        Self {
            fail_navigation: false,
            control_visible: true,
            control_matches: vec!["date"],
            fallback_matches: Vec::new(),
            consent: None,
            failing_captures: 0,
            capture: capture_for(dates, price),
            load_delay: Duration::ZERO,
        }
    }

    pub fn failing_navigation() -> Self {
        Self {
            fail_navigation: true,
            ..Self::priced(&[], 100)
        }
    }
}

/// Capture output with one priced cell per date, padded to a full grid.
pub fn capture_for(dates: &[NaiveDate], price: u32) -> Value {
    let mut cells: Vec<Value> = dates
        .iter()
        .map(|d| {
            json!({
                "date": d.format("%Y-%m-%d").to_string(),
                "priceText": format!("€\u{a0}{price}"),
                "text": format!("{}\n€\u{a0}{price}", d.format("%-d")),
                "disabled": false,
                "ariaDisabled": null,
                "className": "bui-calendar__date"
            })
        })
        .collect();
    while cells.len() < 5 {
        cells.push(json!({ "date": null, "text": "", "disabled": false }));
    }
    json!({
        CELL_FAMILIES[0]: cells,
        CELL_FAMILIES[1]: [],
        CELL_FAMILIES[2]: []
    })
}

pub fn hotel(id: &str, name: &str) -> HotelTarget {
    HotelTarget::new(id, name, format!("https://www.booking.com/hotel/fr/{id}.fr.html"))
}

#[derive(Default)]
pub struct Counters {
    pub acquired: AtomicUsize,
    pub closed: AtomicUsize,
    pub tabs_opened: AtomicUsize,
    pub tabs_closed: AtomicUsize,
    pub active: AtomicUsize,
    pub max_active: AtomicUsize,
}

pub struct FakeFactory {
    scripts: Arc<HashMap<String, PageScript>>,
    pub counters: Arc<Counters>,
    pub fail_acquire: bool,
}

impl FakeFactory {
    pub fn new(scripts: Vec<(&HotelTarget, PageScript)>) -> Self {
        let scripts = scripts
            .into_iter()
            .map(|(hotel, script)| (hotel.url.clone(), script))
            .collect();
        Self {
            scripts: Arc::new(scripts),
            counters: Arc::new(Counters::default()),
            fail_acquire: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail_acquire: true,
            ..Self::new(Vec::new())
        }
    }

    pub fn acquired(&self) -> usize {
        self.counters.acquired.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.counters.closed.load(Ordering::SeqCst)
    }

    pub fn max_active(&self) -> usize {
        self.counters.max_active.load(Ordering::SeqCst)
    }

    fn page(&self) -> FakePage {
        FakePage::with_scripts(Arc::clone(&self.scripts))
    }
}

#[async_trait]
impl SessionFactory for FakeFactory {
    type Session = FakeSession;

    async fn acquire(&self) -> Result<FakeSession, SessionError> {
        if self.fail_acquire {
            return Err(SessionError::WebDriver {
                error: "session not created".to_owned(),
                message: "chrome not reachable".to_owned(),
            });
        }
        let counters = &self.counters;
        counters.acquired.fetch_add(1, Ordering::SeqCst);
        let active = counters.active.fetch_add(1, Ordering::SeqCst) + 1;
        counters.max_active.fetch_max(active, Ordering::SeqCst);
        Ok(FakeSession {
            initial: Some(self.page()),
            template: self.page(),
            counters: Arc::clone(&self.counters),
        })
    }
}

pub struct FakeSession {
    initial: Option<FakePage>,
    template: FakePage,
    counters: Arc<Counters>,
}

#[async_trait]
impl BrowserSession for FakeSession {
    type Page = FakePage;

    async fn initial_page(&mut self) -> Result<FakePage, SessionError> {
        self.initial.take().ok_or(SessionError::Closed)
    }

    async fn new_page(&mut self) -> Result<FakePage, SessionError> {
        self.counters.tabs_opened.fetch_add(1, Ordering::SeqCst);
        Ok(FakePage::with_scripts(Arc::clone(&self.template.scripts)))
    }

    async fn close_page(&mut self, _page: FakePage) -> Result<(), SessionError> {
        self.counters.tabs_closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        self.counters.closed.fetch_add(1, Ordering::SeqCst);
        self.counters.active.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}

pub struct FakePage {
    scripts: Arc<HashMap<String, PageScript>>,
    current: Mutex<Option<PageScript>>,
    actions: Mutex<Vec<String>>,
}

impl FakePage {
    fn with_scripts(scripts: Arc<HashMap<String, PageScript>>) -> Self {
        Self {
            scripts,
            current: Mutex::new(None),
            actions: Mutex::new(Vec::new()),
        }
    }

    pub fn scripted(script: PageScript) -> Self {
        Self {
            scripts: Arc::new(HashMap::new()),
            current: Mutex::new(Some(script)),
            actions: Mutex::new(Vec::new()),
        }
    }

    /// Element interactions in order, as `click:<id>` or `evaluate_on:<id>`.
    pub fn actions(&self) -> Vec<String> {
        self.actions.lock().unwrap().clone()
    }

    fn act(&self, kind: &str, element: &ElementHandle) {
        self.actions
            .lock()
            .unwrap()
            .push(format!("{kind}:{}", element.id()));
    }

    fn script(&self) -> Option<PageScript> {
        self.current.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageSession for FakePage {
    async fn navigate(
        &self,
        url: &str,
        _readiness: Readiness,
        timeout: Duration,
    ) -> Result<(), SessionError> {
        let found = self
            .scripts
            .iter()
            .find(|(base, _)| url.starts_with(base.as_str()))
            .map(|(_, script)| script.clone())
            .or_else(|| self.script());
        let Some(script) = found else {
            return Err(SessionError::Protocol(format!("no script for {url}")));
        };
        if !script.load_delay.is_zero() {
            tokio::time::sleep(script.load_delay).await;
        }
        if script.fail_navigation {
            return Err(SessionError::Timeout {
                what: format!("navigation to {url}"),
                timeout_ms: u64::try_from(timeout.as_millis()).unwrap(),
            });
        }
        *self.current.lock().unwrap() = Some(script);
        Ok(())
    }

    async fn find_all(&self, selector: &Selector) -> Result<Vec<ElementHandle>, SessionError> {
        let Some(script) = self.script() else {
            return Ok(Vec::new());
        };
        let ids = match selector.value() {
            DATE_CONTROL_SELECTOR if script.control_visible => script.control_matches,
            DATE_CONTROL_FALLBACK if script.control_visible => script.fallback_matches,
            CALENDAR_INDICATOR_SELECTOR => vec!["calendar"],
            value if script.consent == Some(value) => vec!["consent"],
            _ => Vec::new(),
        };
        Ok(ids.into_iter().map(ElementHandle::new).collect())
    }

    async fn is_visible(&self, _element: &ElementHandle) -> Result<bool, SessionError> {
        Ok(true)
    }

    async fn click(&self, element: &ElementHandle) -> Result<(), SessionError> {
        self.act("click", element);
        Ok(())
    }

    async fn text(&self, _element: &ElementHandle) -> Result<String, SessionError> {
        Ok(String::new())
    }

    async fn attribute(
        &self,
        _element: &ElementHandle,
        _name: &str,
    ) -> Result<Option<String>, SessionError> {
        Ok(None)
    }

    async fn evaluate(&self, script: &str, _args: Vec<Value>) -> Result<Value, SessionError> {
        if script != CAPTURE_SCRIPT {
            return Ok(Value::Null);
        }
        let mut guard = self.current.lock().unwrap();
        let Some(page) = guard.as_mut() else {
            return Ok(json!({}));
        };
        if page.failing_captures > 0 {
            page.failing_captures -= 1;
            return Err(SessionError::Protocol("capture script threw".to_owned()));
        }
        Ok(page.capture.clone())
    }

    async fn evaluate_on(
        &self,
        element: &ElementHandle,
        _script: &str,
    ) -> Result<Value, SessionError> {
        self.act("evaluate_on", element);
        Ok(Value::Null)
    }
}

/// Keeps a readable trace of every event.
#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<String>>,
}

impl RecordingObserver {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.events()
            .iter()
            .filter(|e| e.starts_with(prefix))
            .count()
    }
}

impl RunObserver for RecordingObserver {
    fn on_event(&self, event: &RunEvent<'_>) {
        self.events.lock().unwrap().push(format!("{event:?}"));
    }
}
