mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use reolink_bridge::camera::{CameraManager, ReolinkClientFactory};
use reolink_bridge::device::ReolinkProvider;
use reolink_bridge::server::{create_router, AppState};
use serde_json::{json, Value};
use tower::ServiceExt;

use common::{closed_address, spawn_server, FakeCamera, JPEG};

fn app() -> (Router, CameraManager) {
    let factory = Arc::new(ReolinkClientFactory::new(Duration::from_secs(5)).unwrap());
    let camera_manager = CameraManager::new(factory.clone());
    let provider = Arc::new(ReolinkProvider::new(Arc::new(camera_manager.clone()), factory));

    let router = create_router(AppState {
        camera_manager: camera_manager.clone(),
        provider,
    });
    (router, camera_manager)
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, body.to_vec())
}

fn post_camera(body: Value) -> Request<Body> {
    Request::post("/cameras")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_health() {
    let (router, _) = app();
    let (status, body) = send(&router, Request::get("/health").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"OK");
}

#[tokio::test]
async fn test_provision_snapshot_and_streams() {
    let camera = FakeCamera::new(vec![0]);
    let addr = spawn_server(camera.router()).await;
    let (router, manager) = app();

    let (status, body) = send(
        &router,
        post_camera(json!({
            "name": "Porch",
            "ip": addr.ip().to_string(),
            "http_port": addr.port().to_string(),
            "username": "admin",
            "password": "secret",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let created: Value = serde_json::from_slice(&body).unwrap();
    let native_id = created["native_id"].as_str().unwrap().to_string();
    assert!(manager.get_camera(&native_id).await.is_some());

    let (status, body) = send(
        &router,
        Request::get(format!("/cameras/{}/snapshot", native_id))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, JPEG);

    let (status, body) = send(
        &router,
        Request::get(format!("/cameras/{}/streams", native_id))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let streams: Vec<Value> = serde_json::from_slice(&body).unwrap();
    assert_eq!(streams.len(), 6);
    assert_eq!(streams[0]["container"], "rtmp-query");
    assert_eq!(streams[5]["codec_hint"], "h265");

    let (status, body) = send(&router, Request::get("/cameras").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    let cameras: Vec<Value> = serde_json::from_slice(&body).unwrap();
    assert_eq!(cameras[0]["name"], "Porch");
    assert_eq!(cameras[0]["management_url"], format!("http://{}", addr.ip()));

    manager.remove_camera(&native_id).await;
}

#[tokio::test]
async fn test_failed_validation_returns_camera_error() {
    let camera = FakeCamera::new(vec![0]);
    let addr = spawn_server(camera.router()).await;
    let (router, manager) = app();

    let (status, body) = send(
        &router,
        post_camera(json!({
            "ip": addr.ip().to_string(),
            "httpPort": addr.port().to_string(),
            "username": "admin",
            "password": "wrong",
        })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(String::from_utf8(body).unwrap(), "authentication rejected: please login first");
    assert!(manager.list_cameras().await.is_empty());
}

#[tokio::test]
async fn test_skip_validate_admits_unreachable_camera() {
    let addr = closed_address().await;
    let (router, manager) = app();

    let (status, _) = send(
        &router,
        post_camera(json!({
            "ip": addr.ip().to_string(),
            "http_port": addr.port().to_string(),
            "skip_validate": true,
        })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    let cameras = manager.list_cameras().await;
    assert_eq!(cameras.len(), 1);
    assert_eq!(cameras[0].info().name, "Reolink Camera");
    // Cameras admitted over HTTP get the same event logger as configured ones.
    assert_eq!(cameras[0].monitor().map(|m| m.subscriber_count()), Some(1));

    let native_id = cameras[0].native_id().to_string();
    let (status, _) = send(
        &router,
        Request::get(format!("/cameras/{}/snapshot", native_id))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);

    manager.remove_camera(&native_id).await;
}

#[tokio::test]
async fn test_put_setting_updates_streams() {
    let addr = closed_address().await;
    let (router, manager) = app();
    send(
        &router,
        post_camera(json!({ "ip": addr.ip().to_string(), "skip_validate": true })),
    )
    .await;
    let native_id = manager.list_cameras().await[0].native_id().to_string();

    let (status, _) = send(
        &router,
        Request::put(format!("/cameras/{}/settings/rtspChannel", native_id))
            .body(Body::from("3"))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(
        &router,
        Request::put(format!("/cameras/{}/settings/model", native_id))
            .body(Body::from("RLC-410"))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &router,
        Request::put(format!("/cameras/{}/settings/password", native_id))
            .body(Body::from(" pass "))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let camera = manager.get_camera(&native_id).await.unwrap();
    assert_eq!(camera.resolved_address().password, " pass ");
    assert_eq!(camera.channel(), 3);
    assert!(camera.stream_candidates()[3].url.ends_with("/h264Preview_04_main"));

    manager.remove_camera(&native_id).await;
}

#[tokio::test]
async fn test_unknown_camera_is_not_found() {
    let (router, _) = app();

    for path in ["/cameras/nope/snapshot", "/cameras/nope/streams", "/cameras/nope/motion"] {
        let (status, _) = send(&router, Request::get(path).body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{}", path);
    }
}
