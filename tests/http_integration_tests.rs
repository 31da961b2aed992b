use std::collections::BTreeMap;
use std::rc::Rc;
use std::time::Duration;

use serde_json::json;
use surf::browser::{HttpClient, TokioTimers};
use surf::core::NavError;
use surf::core::config::{CliOverrides, RouteEntry, ScreenKind, SurfConfig, resolve};
use surf::demo::build_page;
use tokio::task::LocalSet;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_json, method, path},
};

// ============================================================================
// Helper Functions
// ============================================================================

fn fetch_route(pattern: &str, url: String) -> RouteEntry {
    RouteEntry {
        pattern: pattern.to_string(),
        screen: ScreenKind::Fetch,
        title: Some("Fetched".to_string()),
        cacheable: Some(true),
        content: BTreeMap::new(),
        delay_secs: None,
        url: Some(url),
    }
}

fn static_route(pattern: &str, text: &str) -> RouteEntry {
    RouteEntry {
        pattern: pattern.to_string(),
        screen: ScreenKind::Static,
        title: None,
        cacheable: Some(false),
        content: BTreeMap::from([("main".to_string(), text.to_string())]),
        delay_secs: None,
        url: None,
    }
}

fn config_with(routes: Vec<RouteEntry>) -> SurfConfig {
    SurfConfig {
        routes,
        ..Default::default()
    }
}

fn cli() -> CliOverrides {
    CliOverrides {
        base_path: Some("/".to_string()),
        log_level: None,
    }
}

// ============================================================================
// HttpClient Tests
// ============================================================================

#[tokio::test]
async fn test_get_json_resolves_with_body() {
    LocalSet::new()
        .run_until(async {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/album/1"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 1})))
                .mount(&server)
                .await;

            let client = HttpClient::new();
            let value = client
                .get_json(&format!("{}/album/1", server.uri()))
                .await
                .unwrap();
            assert_eq!(value, json!({"id": 1}));
        })
        .await;
}

#[tokio::test]
async fn test_get_json_non_200_is_request_error() {
    LocalSet::new()
        .run_until(async {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .respond_with(ResponseTemplate::new(404))
                .mount(&server)
                .await;

            let err = HttpClient::new()
                .get_json(&format!("{}/missing", server.uri()))
                .await
                .unwrap_err();
            assert!(matches!(err, NavError::Request { status: Some(404), .. }));
        })
        .await;
}

#[tokio::test]
async fn test_get_json_bad_body_is_request_error() {
    LocalSet::new()
        .run_until(async {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
                .mount(&server)
                .await;

            let err = HttpClient::new()
                .get_json(&server.uri())
                .await
                .unwrap_err();
            assert!(matches!(err, NavError::Request { status: Some(200), .. }));
        })
        .await;
}

#[tokio::test]
async fn test_post_json_sends_body() {
    LocalSet::new()
        .run_until(async {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/comments"))
                .and(body_json(json!({"text": "hi"})))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
                .expect(1)
                .mount(&server)
                .await;

            let value = HttpClient::new()
                .post_json(&format!("{}/comments", server.uri()), &json!({"text": "hi"}))
                .await
                .unwrap();
            assert_eq!(value["ok"], json!(true));
        })
        .await;
}

#[tokio::test]
async fn test_connection_failure_has_no_status() {
    LocalSet::new()
        .run_until(async {
            let err = HttpClient::new()
                .get_raw("http://127.0.0.1:1/")
                .await
                .unwrap_err();
            assert!(matches!(err, NavError::Request { status: None, .. }));
        })
        .await;
}

#[tokio::test]
async fn test_cancel_aborts_request() {
    LocalSet::new()
        .run_until(async {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .respond_with(
                    ResponseTemplate::new(200)
                        .set_body_string("late")
                        .set_delay(Duration::from_secs(30)),
                )
                .mount(&server)
                .await;

            let request = HttpClient::new().get_raw(&server.uri());
            tokio::time::sleep(Duration::from_millis(20)).await;
            assert!(request.is_pending());
            assert!(request.cancel());

            let result = request.clone().await;
            assert_eq!(result, Err(NavError::Cancelled));
            assert!(request.is_cancelled());
        })
        .await;
}

// ============================================================================
// Fetch Screen Tests
// ============================================================================

#[tokio::test]
async fn test_fetch_screen_flips_once_loaded() {
    LocalSet::new()
        .run_until(async {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/users/7"))
                .respond_with(ResponseTemplate::new(200).set_body_string("user seven"))
                .expect(1)
                .mount(&server)
                .await;

            let config = config_with(vec![
                static_route("^home$", "home"),
                fetch_route(r"^user/([0-9]+)$", format!("{}/users/{{1}}", server.uri())),
            ]);
            let resolved = resolve(&config, &cli()).unwrap();
            let page = build_page(&resolved, Rc::new(TokioTimers), HttpClient::new()).unwrap();

            let navigation = page.app.navigate("user/7", false);
            assert!(navigation.is_pending());
            let screen = navigation.clone().await.unwrap();

            assert!(page.app.active_screen().unwrap().same(&screen));
            let main = page.app.active_wrapper("main").unwrap();
            assert_eq!(main.text_content(), "user seven");
            assert_eq!(page.document.title(), "Fetched");

            // cached: navigating back does not fetch again
            page.app.navigate("home", false);
            assert_eq!(page.app.active_path().as_deref(), Some("home"));
            let again = page.app.navigate("user/7", false).await.unwrap();
            assert!(again.same(&screen));
        })
        .await;
}

#[tokio::test]
async fn test_failed_fetch_keeps_previous_screen() {
    LocalSet::new()
        .run_until(async {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .respond_with(ResponseTemplate::new(500))
                .mount(&server)
                .await;

            let config = config_with(vec![
                static_route("^home$", "home"),
                fetch_route("^broken$", format!("{}/broken", server.uri())),
            ]);
            let resolved = resolve(&config, &cli()).unwrap();
            let page = build_page(&resolved, Rc::new(TokioTimers), HttpClient::new()).unwrap();
            page.app.init(Some("home"));

            let err = page.app.navigate("broken", false).await.unwrap_err();
            assert!(matches!(err, NavError::Request { status: Some(500), .. }));
            assert_eq!(page.app.active_path().as_deref(), Some("home"));
            assert!(page.app.cached_screen("broken").is_none());
            assert_eq!(page.app.active_wrapper("main").unwrap().text_content(), "home");
        })
        .await;
}
