//! Integration tests for the WebDriver session factory.
//!
//! A `wiremock` server plays the driver, so the tests check the wire mapping
//! (paths, request bodies, error bodies) without launching a browser.

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use ratewatch_scraper::session::webdriver::ELEMENT_KEY;
use ratewatch_scraper::session::{
    BrowserSession, PageSession, Readiness, Selector, SessionError, SessionFactory,
    WebDriverConfig, WebDriverFactory,
};

fn test_factory(server: &MockServer) -> WebDriverFactory {
    WebDriverFactory::new(WebDriverConfig {
        endpoint: server.uri(),
        headless: true,
        user_agents: vec!["ratewatch-test/0.1".to_owned()],
        locale: "fr-FR".to_owned(),
        timezone: "Europe/Paris".to_owned(),
        request_timeout: Duration::from_secs(5),
    })
    .expect("failed to build test WebDriverFactory")
}

fn ok(value: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "value": value }))
}

fn driver_error(status: u16, error: &str, message: &str) -> ResponseTemplate {
    ResponseTemplate::new(status)
        .set_body_json(json!({ "value": { "error": error, "message": message } }))
}

/// Mounts a successful `POST /session` (id `abc`, initial window `W1`).
async fn mount_new_session(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/session"))
        .respond_with(ok(json!({ "sessionId": "abc", "capabilities": {} })))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/session/abc/goog/cdp/execute"))
        .respond_with(ok(json!({})))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/session/abc/window"))
        .respond_with(ok(json!("W1")))
        .mount(server)
        .await;
}

#[tokio::test]
async fn acquire_sends_launch_capabilities() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/session"))
        .and(body_partial_json(json!({
            "capabilities": { "alwaysMatch": {
                "pageLoadStrategy": "eager",
                "goog:chromeOptions": { "excludeSwitches": ["enable-automation"] }
            }}
        })))
        .respond_with(ok(json!({ "sessionId": "abc", "capabilities": {} })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/session/abc/goog/cdp/execute"))
        .and(body_partial_json(json!({ "cmd": "Emulation.setTimezoneOverride" })))
        .respond_with(ok(json!({})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/session/abc/window"))
        .respond_with(ok(json!("W1")))
        .mount(&server)
        .await;

    let mut session = test_factory(&server).acquire().await.expect("acquire");
    let page = session.initial_page().await.expect("initial page");
    assert_eq!(page.window_handle(), "W1");
}

#[tokio::test]
async fn acquire_survives_rejected_devtools_commands() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/session"))
        .respond_with(ok(json!({ "sessionId": "abc" })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/session/abc/goog/cdp/execute"))
        .respond_with(driver_error(404, "unknown command", "not chromium"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/session/abc/window"))
        .respond_with(ok(json!("W1")))
        .mount(&server)
        .await;

    assert!(test_factory(&server).acquire().await.is_ok());
}

#[tokio::test]
async fn acquire_maps_session_not_created() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/session"))
        .respond_with(driver_error(500, "session not created", "chrome not reachable"))
        .mount(&server)
        .await;

    let result = test_factory(&server).acquire().await;
    assert!(
        matches!(
            result,
            Err(SessionError::WebDriver { ref error, .. }) if error == "session not created"
        ),
        "expected WebDriver error, got: {:?}",
        result.err()
    );
}

#[tokio::test]
async fn acquire_ends_session_when_window_lookup_fails() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/session"))
        .respond_with(ok(json!({ "sessionId": "abc" })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/session/abc/goog/cdp/execute"))
        .respond_with(ok(json!({})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/session/abc/window"))
        .respond_with(driver_error(500, "unknown error", "renderer crashed"))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/session/abc"))
        .respond_with(ok(json!(null)))
        .expect(1)
        .mount(&server)
        .await;

    let result = test_factory(&server).acquire().await;
    assert!(
        matches!(
            result,
            Err(SessionError::WebDriver { ref message, .. }) if message == "renderer crashed"
        ),
        "expected WebDriver error, got: {:?}",
        result.err()
    );
}

#[tokio::test]
async fn acquire_ends_session_when_window_handle_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/session"))
        .respond_with(ok(json!({ "sessionId": "abc" })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/session/abc/goog/cdp/execute"))
        .respond_with(ok(json!({})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/session/abc/window"))
        .respond_with(ok(json!(42)))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/session/abc"))
        .respond_with(ok(json!(null)))
        .expect(1)
        .mount(&server)
        .await;

    let result = test_factory(&server).acquire().await;
    assert!(matches!(result, Err(SessionError::Protocol(_))));
}

#[tokio::test]
async fn find_all_returns_element_handles() {
    let server = MockServer::start().await;
    mount_new_session(&server).await;
    Mock::given(method("POST"))
        .and(path("/session/abc/elements"))
        .and(body_partial_json(json!({ "using": "css selector", "value": "td" })))
        .respond_with(ok(json!([{ ELEMENT_KEY: "e1" }, { ELEMENT_KEY: "e2" }])))
        .mount(&server)
        .await;

    let mut session = test_factory(&server).acquire().await.expect("acquire");
    let page = session.initial_page().await.expect("initial page");
    let found = page.find_all(&Selector::css("td")).await.expect("find_all");
    let ids: Vec<&str> = found.iter().map(|e| e.id()).collect();
    assert_eq!(ids, vec!["e1", "e2"]);
}

#[tokio::test]
async fn xpath_selector_uses_xpath_strategy() {
    let server = MockServer::start().await;
    mount_new_session(&server).await;
    Mock::given(method("POST"))
        .and(path("/session/abc/elements"))
        .and(body_partial_json(json!({ "using": "xpath" })))
        .respond_with(ok(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let mut session = test_factory(&server).acquire().await.expect("acquire");
    let page = session.initial_page().await.expect("initial page");
    let found = page
        .find_all(&Selector::xpath("//button"))
        .await
        .expect("find_all");
    assert!(found.is_empty());
}

#[tokio::test]
async fn navigate_timeout_maps_to_timeout_error() {
    let server = MockServer::start().await;
    mount_new_session(&server).await;
    Mock::given(method("POST"))
        .and(path("/session/abc/timeouts"))
        .and(body_partial_json(json!({ "pageLoad": 25_000 })))
        .respond_with(ok(json!(null)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/session/abc/url"))
        .respond_with(driver_error(500, "timeout", "page load timed out"))
        .mount(&server)
        .await;

    let mut session = test_factory(&server).acquire().await.expect("acquire");
    let page = session.initial_page().await.expect("initial page");
    let result = page
        .navigate(
            "https://www.booking.com/hotel/fr/a.html",
            Readiness::DomContentLoaded,
            Duration::from_secs(25),
        )
        .await;
    assert!(
        matches!(result, Err(SessionError::Timeout { timeout_ms: 25_000, .. })),
        "expected Timeout, got: {result:?}"
    );
}

#[tokio::test]
async fn element_errors_map_to_webdriver_error() {
    let server = MockServer::start().await;
    mount_new_session(&server).await;
    Mock::given(method("GET"))
        .and(path("/session/abc/element/e1/displayed"))
        .respond_with(driver_error(404, "no such element", "gone"))
        .mount(&server)
        .await;

    let mut session = test_factory(&server).acquire().await.expect("acquire");
    let page = session.initial_page().await.expect("initial page");
    let handle = ratewatch_scraper::session::ElementHandle::new("e1");
    let result = page.is_visible(&handle).await;
    assert!(matches!(
        result,
        Err(SessionError::WebDriver { ref error, ref message }) if error == "no such element" && message == "gone"
    ));
}

#[tokio::test]
async fn evaluate_passes_script_and_args() {
    let server = MockServer::start().await;
    mount_new_session(&server).await;
    Mock::given(method("POST"))
        .and(path("/session/abc/execute/sync"))
        .and(body_partial_json(json!({ "script": "return arguments[0] + 1;", "args": [41] })))
        .respond_with(ok(json!(42)))
        .mount(&server)
        .await;

    let mut session = test_factory(&server).acquire().await.expect("acquire");
    let page = session.initial_page().await.expect("initial page");
    let value = page
        .evaluate("return arguments[0] + 1;", vec![json!(41)])
        .await
        .expect("evaluate");
    assert_eq!(value, json!(42));
}

#[tokio::test]
async fn new_tab_is_opened_and_closed() {
    let server = MockServer::start().await;
    mount_new_session(&server).await;
    Mock::given(method("POST"))
        .and(path("/session/abc/window/new"))
        .respond_with(ok(json!({ "handle": "W2", "type": "tab" })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/session/abc/window"))
        .respond_with(ok(json!(null)))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/session/abc/window"))
        .respond_with(ok(json!(["W1"])))
        .expect(1)
        .mount(&server)
        .await;

    let mut session = test_factory(&server).acquire().await.expect("acquire");
    let page = session.new_page().await.expect("new page");
    assert_eq!(page.window_handle(), "W2");
    session.close_page(page).await.expect("close page");
}

#[tokio::test]
async fn closed_session_rejects_further_commands() {
    let server = MockServer::start().await;
    mount_new_session(&server).await;
    Mock::given(method("DELETE"))
        .and(path("/session/abc"))
        .respond_with(ok(json!(null)))
        .expect(1)
        .mount(&server)
        .await;

    let mut session = test_factory(&server).acquire().await.expect("acquire");
    let page = session.initial_page().await.expect("initial page");
    session.close().await.expect("close");

    let result = page.find_all(&Selector::css("td")).await;
    assert!(matches!(result, Err(SessionError::Closed)));
}
