//! Endpoint probe against a real HTTP server

use axum::http::header::CONTENT_TYPE;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use probekit::logging::init_test_tracing;
use probekit::{check_endpoints, EndpointCase, HarnessConfig, Outcome, Runner, JSON_CONTENT_TYPE};
use reqwest::header::HeaderValue;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;

async fn info() -> impl IntoResponse {
    ([(CONTENT_TYPE, JSON_CONTENT_TYPE)], r#"{"version":"dev"}"#)
}

async fn echo(Json(body): Json<Value>) -> impl IntoResponse {
    ([(CONTENT_TYPE, JSON_CONTENT_TYPE)], body.to_string())
}

async fn metrics() -> impl IntoResponse {
    (
        [(CONTENT_TYPE, "text/plain; version=0.0.4")],
        "# HELP up Whether the service is up\r\n# TYPE up gauge\nup 1\n",
    )
}

async fn health() -> impl IntoResponse {
    ([(CONTENT_TYPE, "text/plain; charset=utf-8")], "ok\n")
}

async fn request_content_type(headers: HeaderMap) -> String {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

async fn spawn_server() -> SocketAddr {
    let app = Router::new()
        .route("/api/v0/info", get(info))
        .route("/api/v0/echo", post(echo))
        .route("/metrics", get(metrics))
        .route("/healthz", get(health))
        .route("/api/v0/content-type", post(request_content_type));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn runner() -> Runner {
    init_test_tracing();
    Runner::new(HarnessConfig::from_env().with_request_timeout(Duration::from_secs(5)))
}

fn lines(lines: &[&str]) -> Option<Vec<String>> {
    Some(lines.iter().map(|l| l.to_string()).collect())
}

#[tokio::test]
async fn test_passing_endpoints() {
    let addr = spawn_server().await;
    let mut runner = runner();
    check_endpoints(
        &mut runner,
        addr,
        &[
            EndpointCase {
                url: "/api/v0/info".to_string(),
                json_output: Some(json!({"version": "dev"})),
                ..Default::default()
            },
            EndpointCase {
                description: Some("echo inferred POST".to_string()),
                url: "/api/v0/echo".to_string(),
                json_input: Some(json!({"exporters": ["192.0.2.1"], "limit": 10})),
                json_output: Some(json!({"exporters": ["192.0.2.1"], "limit": 10})),
                ..Default::default()
            },
            EndpointCase {
                url: "/metrics".to_string(),
                content_type: "text/plain; version=0.0.4".to_string(),
                first_lines: lines(&["# HELP up Whether the service is up", "# TYPE up gauge"]),
                ..Default::default()
            },
        ],
    )
    .await;
    runner.print_summary();
    assert!(runner.all_passed());
    assert_eq!(runner.reports().len(), 3);
    assert_eq!(runner.reports()[0].name, "/api/v0/info");
    assert_eq!(runner.reports()[1].name, "echo inferred POST");
}

#[tokio::test]
async fn test_status_and_content_type_mismatches_are_recorded() {
    let addr = spawn_server().await;
    let mut runner = runner();
    check_endpoints(
        &mut runner,
        addr,
        &[EndpointCase {
            url: "/metrics".to_string(),
            status_code: Some(201),
            first_lines: lines(&["# HELP up Whether the service is up", "wrong"]),
            ..Default::default()
        }],
    )
    .await;
    let failures = runner.reports()[0].failures();
    assert_eq!(failures.len(), 3, "{:?}", failures);
    assert_eq!(failures[0], "GET /metrics: got status code 200, not 201");
    assert_eq!(
        failures[1],
        "GET /metrics Content-Type (-got, +want):\n-text/plain; version=0.0.4\n+"
    );
    assert!(failures[2].starts_with("GET /metrics (-got, +want):\n"), "{}", failures[2]);
    assert!(failures[2].contains("-  \"# TYPE up gauge\","), "{}", failures[2]);
}

#[tokio::test]
async fn test_short_body_is_compared_line_by_line() {
    let addr = spawn_server().await;
    let mut runner = runner();
    check_endpoints(
        &mut runner,
        addr,
        &[EndpointCase {
            url: "/healthz".to_string(),
            content_type: "text/plain; charset=utf-8".to_string(),
            first_lines: lines(&["ok", "ready", "live"]),
            ..Default::default()
        }],
    )
    .await;
    let failures = runner.reports()[0].failures();
    assert_eq!(failures.len(), 1, "{:?}", failures);
    assert!(failures[0].starts_with("GET /healthz (-got, +want):\n"), "{}", failures[0]);
    assert!(failures[0].contains("   \"ok\","), "{}", failures[0]);
    assert!(failures[0].contains("+  \"ready\","), "{}", failures[0]);
    assert!(failures[0].contains("+  \"live\","), "{}", failures[0]);
}

#[tokio::test]
async fn test_json_mismatch_is_fatal() {
    let addr = spawn_server().await;
    let mut runner = runner();
    check_endpoints(
        &mut runner,
        addr,
        &[EndpointCase {
            url: "/api/v0/info".to_string(),
            json_output: Some(json!({"version": "1.0"})),
            ..Default::default()
        }],
    )
    .await;
    let failures = runner.reports()[0].failures();
    assert_eq!(failures.len(), 1);
    assert!(failures[0].starts_with("GET /api/v0/info (-got, +want):\n"));
    assert!(failures[0].contains("-  \"version\": \"dev\","), "{}", failures[0]);
    assert!(failures[0].contains("+  \"version\": \"1.0\","), "{}", failures[0]);
}

#[tokio::test]
async fn test_both_expectations_is_a_caller_error() {
    let addr = spawn_server().await;
    let mut runner = runner();
    check_endpoints(
        &mut runner,
        addr,
        &[EndpointCase {
            url: "/api/v0/info".to_string(),
            first_lines: lines(&["{"]),
            json_output: Some(json!({"version": "dev"})),
            ..Default::default()
        }],
    )
    .await;
    assert_eq!(
        runner.reports()[0].outcome,
        Outcome::Failed(vec!["cannot have both first_lines and json_output".to_string()])
    );
}

#[tokio::test]
async fn test_explicit_headers_replace_json_content_type() {
    let addr = spawn_server().await;
    let mut headers = reqwest::header::HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/x-custom"));
    let mut runner = runner();
    check_endpoints(
        &mut runner,
        addr,
        &[EndpointCase {
            url: "/api/v0/content-type".to_string(),
            headers,
            json_input: Some(json!({})),
            content_type: "text/plain; charset=utf-8".to_string(),
            first_lines: lines(&["application/x-custom"]),
            ..Default::default()
        }],
    )
    .await;
    runner.print_summary();
    assert!(runner.all_passed());
}

#[tokio::test]
async fn test_transport_failure_does_not_stop_siblings() {
    let closed = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };
    let mut runner = runner();
    check_endpoints(
        &mut runner,
        closed,
        &[
            EndpointCase {
                url: "/first".to_string(),
                ..Default::default()
            },
            EndpointCase {
                url: "/second".to_string(),
                ..Default::default()
            },
        ],
    )
    .await;
    assert_eq!(runner.failures().len(), 2);
    for report in runner.reports() {
        let failures = report.failures();
        assert_eq!(failures.len(), 1);
        assert!(failures[0].starts_with(&format!("GET {}:\n", report.name)));
    }
}
