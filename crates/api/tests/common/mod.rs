#![allow(dead_code)]

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, Respond, ResponseTemplate};

use hospital_api::config::ServerConfig;
use hospital_api::router::build_app_router;
use hospital_api::state::AppState;
use hospital_directory::{DirectoryApi, DirectoryConfig};
use hospital_events::EventBus;

const BOUNDARY: &str = "hospital-test-boundary";

/// Build a test `ServerConfig` pointing at the given directory base URL.
///
/// Progress frames tick every 20ms so live-stream tests finish quickly.
pub fn test_config(directory_url: &str) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 5,
        directory: DirectoryConfig {
            base_url: directory_url.to_string(),
            connect_timeout: Duration::from_secs(2),
            request_timeout: Duration::from_secs(5),
        },
        max_csv_rows: 20,
        progress_interval_ms: 20,
    }
}

/// Build the full application router against a directory at `directory_url`.
///
/// Uses the same `build_app_router` as `main.rs`, so tests exercise the
/// production middleware stack.
pub fn build_test_app(directory_url: &str) -> (Router, AppState) {
    let config = test_config(directory_url);
    let directory =
        Arc::new(DirectoryApi::new(&config.directory).expect("directory client builds"));
    let state = AppState::new(config.clone(), directory, Arc::new(EventBus::default()));
    (build_app_router(state.clone(), &config), state)
}

// ---------------------------------------------------------------------------
// Mock directory
// ---------------------------------------------------------------------------

/// Responds to hospital creation by echoing the submitted name with a fresh id.
pub struct EchoHospital {
    next_id: AtomicI64,
}

impl EchoHospital {
    pub fn new() -> Self {
        Self {
            next_id: AtomicI64::new(1),
        }
    }
}

impl Respond for EchoHospital {
    fn respond(&self, request: &wiremock::Request) -> ResponseTemplate {
        let body: Value = serde_json::from_slice(&request.body).unwrap();
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        ResponseTemplate::new(201).set_body_json(json!({
            "id": id,
            "name": body["name"],
        }))
    }
}

/// Mount a directory that accepts every hospital and every activation.
pub async fn mount_healthy_directory(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/hospitals/"))
        .respond_with(EchoHospital::new())
        .mount(server)
        .await;
    mount_activation(server, 200).await;
}

/// Mount the batch activation endpoint answering with `status`.
pub async fn mount_activation(server: &MockServer, status: u16) {
    Mock::given(method("PATCH"))
        .and(path_regex(r"^/hospitals/batch/[0-9a-f-]+/activate$"))
        .respond_with(ResponseTemplate::new(status).set_body_json(json!({"ok": status < 400})))
        .mount(server)
        .await;
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Multipart body with a single `file` field.
pub fn multipart_body(filename: &str, contents: &str) -> String {
    format!(
        "--{BOUNDARY}\r\n\
         Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n\
         Content-Type: text/csv\r\n\r\n\
         {contents}\r\n\
         --{BOUNDARY}--\r\n"
    )
}

pub async fn post_multipart(app: &Router, uri: &str, body: String) -> Response {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap();
    app.clone().oneshot(request).await.unwrap()
}

pub async fn upload_csv(app: &Router, filename: &str, contents: &str) -> Response {
    post_multipart(app, "/api/v1/hospitals/bulk", multipart_body(filename, contents)).await
}

pub async fn get(app: &Router, uri: &str) -> Response {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    app.clone().oneshot(request).await.unwrap()
}

pub async fn post(app: &Router, uri: &str) -> Response {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.clone().oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Upload `contents` and return the new batch id.
pub async fn start_batch(app: &Router, contents: &str) -> String {
    let response = upload_csv(app, "hospitals.csv", contents).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    json["batch_id"].as_str().unwrap().to_string()
}

/// Poll the status endpoint until the batch is terminal and return the
/// final snapshot.
pub async fn wait_until_terminal(app: &Router, batch_id: &str) -> Value {
    let uri = format!("/api/v1/hospitals/bulk/{batch_id}/status");
    for _ in 0..250 {
        let json = body_json(get(app, &uri).await).await;
        if json["status"] == "completed" || json["status"] == "partial_failed" {
            return json;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("batch {batch_id} did not finish");
}
