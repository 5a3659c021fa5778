use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, put},
    Json, Router,
};
use serde::Serialize;

use crate::camera::CameraManager;
use crate::device::{CameraController, CameraSubmission, DeviceInfo, ReolinkProvider, SettingKey};
use crate::error::{CameraError, ProvisionError};

#[derive(Clone)]
pub struct AppState {
    pub camera_manager: CameraManager,
    pub provider: Arc<ReolinkProvider>,
}

#[derive(Debug, Serialize)]
struct CameraSummary {
    #[serde(flatten)]
    info: DeviceInfo,
    motion_detected: bool,
}

#[derive(Debug, Serialize)]
struct MotionResponse {
    motion_detected: bool,
}

#[derive(Debug, Serialize)]
struct CreatedResponse {
    native_id: String,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/cameras", get(list_cameras).post(create_camera))
        .route("/cameras/:camera_id/snapshot", get(take_snapshot))
        .route("/cameras/:camera_id/streams", get(list_streams))
        .route("/cameras/:camera_id/motion", get(motion_state))
        .route("/cameras/:camera_id/settings/:key", put(put_setting))
        // Health check
        .route("/health", get(health_check))
        .with_state(state)
}

async fn find_camera(state: &AppState, camera_id: &str) -> Result<Arc<CameraController>, Response> {
    match state.camera_manager.get_camera(camera_id).await {
        Some(camera) => Ok(camera),
        None => {
            tracing::error!("Camera not found: {}", camera_id);
            Err((StatusCode::NOT_FOUND, "Camera not found").into_response())
        }
    }
}

fn camera_error_response(e: &CameraError) -> Response {
    (StatusCode::BAD_GATEWAY, e.to_string()).into_response()
}

async fn list_cameras(State(state): State<AppState>) -> Response {
    let cameras: Vec<CameraSummary> = state
        .camera_manager
        .list_cameras()
        .await
        .into_iter()
        .map(|camera| CameraSummary {
            info: camera.info(),
            motion_detected: camera.motion_detected(),
        })
        .collect();

    Json(cameras).into_response()
}

async fn create_camera(
    State(state): State<AppState>,
    Json(submission): Json<CameraSubmission>,
) -> Response {
    tracing::info!("Provisioning request for camera at {}", submission.ip);

    match state.provider.create_device(submission).await {
        Ok(native_id) => {
            if let Some(camera) = state.camera_manager.get_camera(&native_id).await {
                camera.listen_and_log_events();
            }
            (StatusCode::CREATED, Json(CreatedResponse { native_id })).into_response()
        }
        Err(ProvisionError::Validation(e)) => {
            tracing::error!("Camera validation failed: {}", e);
            camera_error_response(&e)
        }
        Err(e) => {
            tracing::error!("Provisioning failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, format!("Error: {}", e)).into_response()
        }
    }
}

async fn take_snapshot(State(state): State<AppState>, Path(camera_id): Path<String>) -> Response {
    let camera = match find_camera(&state, &camera_id).await {
        Ok(camera) => camera,
        Err(response) => return response,
    };

    match camera.take_picture().await {
        Ok(picture) => ([(header::CONTENT_TYPE, picture.mime_type)], picture.data).into_response(),
        Err(e) => {
            tracing::error!("Snapshot failed for {}: {}", camera_id, e);
            camera_error_response(&e)
        }
    }
}

async fn list_streams(State(state): State<AppState>, Path(camera_id): Path<String>) -> Response {
    match find_camera(&state, &camera_id).await {
        Ok(camera) => Json(camera.stream_candidates()).into_response(),
        Err(response) => response,
    }
}

async fn motion_state(State(state): State<AppState>, Path(camera_id): Path<String>) -> Response {
    match find_camera(&state, &camera_id).await {
        Ok(camera) => Json(MotionResponse {
            motion_detected: camera.motion_detected(),
        })
        .into_response(),
        Err(response) => response,
    }
}

async fn put_setting(
    State(state): State<AppState>,
    Path((camera_id, key)): Path<(String, String)>,
    value: String,
) -> Response {
    let camera = match find_camera(&state, &camera_id).await {
        Ok(camera) => camera,
        Err(response) => return response,
    };

    let Some(key) = SettingKey::parse(&key) else {
        return (StatusCode::BAD_REQUEST, format!("Unknown setting: {}", key)).into_response();
    };

    tracing::info!("Setting {} on camera {}", key.as_str(), camera_id);
    camera.put_setting(key, key.normalize(&value));
    StatusCode::NO_CONTENT.into_response()
}

async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
