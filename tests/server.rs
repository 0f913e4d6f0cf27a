//! HTTP surface tests driving the router directly

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use execbox::config::loader::ServiceConfig;
use execbox::{Orchestrator, Server};
use serde_json::Value;
use std::path::Path;
use tower::ServiceExt;

fn server_for(root: &Path) -> Server {
    let mut config = ServiceConfig::default();
    config.workspace_root = root.to_path_buf();
    Server::new(Orchestrator::new(&config).unwrap())
}

fn post_run(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/run")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, bytes.to_vec())
}

async fn send_json(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let (status, bytes) = send(app, request).await;
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_malformed_body_is_invalid_request() {
    let root = tempfile::tempdir().unwrap();
    let server = server_for(root.path());

    let (status, body) = send_json(server.router(), post_run("{not json")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid request format");

    let (status, body) = send_json(server.router(), post_run(r#"{"code":"int main(){}"}"#)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid request format");
}

#[tokio::test]
async fn test_empty_code_is_invalid_request() {
    let root = tempfile::tempdir().unwrap();
    let server = server_for(root.path());

    let request = post_run(r#"{"code":"","language":"cpp","test_input":""}"#);
    let (status, body) = send_json(server.router(), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid request format");
}

#[tokio::test]
async fn test_unsupported_language_spawns_nothing() {
    let root = tempfile::tempdir().unwrap();
    let server = server_for(root.path());

    let request = post_run(r#"{"code":"print(1)","language":"python","test_input":""}"#);
    let (status, body) = send_json(server.router(), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Unsupported language");
    assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    assert_eq!(server.metrics().rejected_total.get(), 1);
}

#[tokio::test]
async fn test_health_reports_ok() {
    let root = tempfile::tempdir().unwrap();
    let server = server_for(root.path());

    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let (status, body) = send_json(server.router(), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert!(body["started_at"].is_string());
}

#[tokio::test]
async fn test_metrics_count_rejections() {
    let root = tempfile::tempdir().unwrap();
    let server = server_for(root.path());

    send(server.router(), post_run("[]")).await;

    let request = Request::builder().uri("/metrics").body(Body::empty()).unwrap();
    let (status, bytes) = send(server.router(), request).await;
    let text = String::from_utf8(bytes).unwrap();
    assert_eq!(status, StatusCode::OK);
    assert!(text.contains("execbox_rejected_total 1"), "{}", text);
    assert!(text.contains("execbox_active_executions 0"));
}

#[tokio::test]
async fn test_infrastructure_failure_is_500() {
    let root = tempfile::tempdir().unwrap();
    let mut config = ServiceConfig::default();
    config.workspace_root = root.path().to_path_buf();
    config.compiler.path = "/nonexistent/g++".to_string();
    let server = Server::new(Orchestrator::new(&config).unwrap());

    let request = post_run(r#"{"code":"int main(){}","language":"cpp","test_input":""}"#);
    let (status, body) = send_json(server.router(), request).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .starts_with("Execution failed: "));
    assert_eq!(server.metrics().infrastructure_errors_total.get(), 1);
}

#[tokio::test]
async fn test_successful_run_returns_result_fields() {
    let gpp = std::process::Command::new("g++").arg("--version").output();
    if !gpp.map(|o| o.status.success()).unwrap_or(false) {
        eprintln!("g++ not found, skipping");
        return;
    }
    let root = tempfile::tempdir().unwrap();
    let server = server_for(root.path());

    let body = serde_json::json!({
        "code": "#include<iostream>\nint main(){int x;std::cin>>x;std::cout<<x*2;}",
        "language": "cpp",
        "test_input": "21",
    });
    let (status, body) = send_json(server.router(), post_run(&body.to_string())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["output"], "42");
    assert_eq!(body["error"], "");
    assert!(body["memory_usage"].as_str().unwrap().ends_with(" KB"));
    assert!(body["cpu_usage"].as_str().unwrap().ends_with(" ms"));
    assert!(body.get("compile_error").is_none());
    assert!(body.get("runtime_error").is_none());
    assert_eq!(server.metrics().executions_ok.get(), 1);
}
