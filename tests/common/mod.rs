#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};

pub const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0xFF, 0xD9];

/// Serves `router` on an ephemeral local port.
pub async fn spawn_server(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

/// An address nothing listens on.
pub async fn closed_address() -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// Fake Reolink camera accepting admin/secret.
///
/// `GetMdState` answers follow `motion_script` in order (1 = motion,
/// 0 = idle, -1 = HTTP 500) and repeat the last entry once exhausted.
#[derive(Clone)]
pub struct FakeCamera {
    pub motion_script: Arc<Vec<i64>>,
    pub motion_polls: Arc<AtomicUsize>,
    pub snapshots: Arc<AtomicUsize>,
}

impl FakeCamera {
    pub fn new(motion_script: Vec<i64>) -> Self {
        Self {
            motion_script: Arc::new(motion_script),
            motion_polls: Arc::new(AtomicUsize::new(0)),
            snapshots: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/cgi-bin/api.cgi", get(snap))
            .route("/api.cgi", get(md_state))
            .with_state(self.clone())
    }
}

fn logged_in(query: &HashMap<String, String>) -> bool {
    query.get("user").map(String::as_str) == Some("admin")
        && query.get("password").map(String::as_str) == Some("secret")
}

fn login_error(cmd: &str) -> Response {
    let body = format!(
        r#"[{{"cmd":"{}","code":1,"error":{{"detail":"please login first","rspCode":-6}}}}]"#,
        cmd
    );
    ([(header::CONTENT_TYPE, "application/json")], body).into_response()
}

async fn snap(State(camera): State<FakeCamera>, Query(query): Query<HashMap<String, String>>) -> Response {
    camera.snapshots.fetch_add(1, Ordering::SeqCst);

    if query.get("cmd").map(String::as_str) != Some("Snap") || !query.contains_key("rs") {
        return (StatusCode::BAD_REQUEST, "bad request").into_response();
    }
    if !logged_in(&query) {
        return login_error("Snap");
    }
    if query.get("channel").map(String::as_str) == Some("7") {
        return (StatusCode::OK, "<html>not an image</html>").into_response();
    }

    ([(header::CONTENT_TYPE, "image/jpeg")], JPEG).into_response()
}

async fn md_state(State(camera): State<FakeCamera>, Query(query): Query<HashMap<String, String>>) -> Response {
    if query.get("cmd").map(String::as_str) != Some("GetMdState") {
        return (StatusCode::BAD_REQUEST, "bad request").into_response();
    }
    if !logged_in(&query) {
        return login_error("GetMdState");
    }

    let poll = camera.motion_polls.fetch_add(1, Ordering::SeqCst);
    let state = camera
        .motion_script
        .get(poll)
        .or(camera.motion_script.last())
        .copied()
        .unwrap_or(0);

    if state < 0 {
        return (StatusCode::INTERNAL_SERVER_ERROR, "busy").into_response();
    }

    let body = format!(
        r#"[{{"cmd":"GetMdState","code":0,"value":{{"state":{}}}}}]"#,
        state
    );
    ([(header::CONTENT_TYPE, "application/json")], body).into_response()
}
