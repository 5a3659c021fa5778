use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::error::CameraError;

const JPEG_SOI: [u8; 2] = [0xFF, 0xD8];

// Reolink rspCodes meaning the credentials were not accepted.
const RSP_LOGIN_REQUIRED: i64 = -6;
const RSP_LOGIN_FAILED: i64 = -7;

/// Connection parameters of one client. Never mutated; settings changes
/// produce a new client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraAddress {
    /// `ip:httpPort`
    pub host: String,
    pub username: String,
    pub password: String,
    pub channel: u32,
}

impl CameraAddress {
    pub fn base_url(&self) -> String {
        format!("http://{}", self.host)
    }
}

/// Motion state as seen by a single poll.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MotionState {
    pub detected: bool,
    pub raw: Value,
    pub observed_at: DateTime<Utc>,
}

/// Requests a camera answers. Each call is a single attempt.
#[async_trait]
pub trait CameraApi: Send + Sync {
    async fn jpeg_snapshot(&self) -> Result<Bytes, CameraError>;

    async fn get_motion_state(&self) -> Result<MotionState, CameraError>;
}

/// Builds clients for a given address.
pub trait ClientFactory: Send + Sync {
    fn build(&self, address: &CameraAddress) -> Arc<dyn CameraApi>;
}

#[derive(Clone)]
pub struct ReolinkClient {
    address: CameraAddress,
    http_client: Client,
}

impl ReolinkClient {
    pub fn new(address: CameraAddress, http_client: Client) -> Self {
        Self {
            address,
            http_client,
        }
    }

    pub fn address(&self) -> &CameraAddress {
        &self.address
    }

    async fn get(&self, path: &str, cmd: &str, extra: &[(&str, String)]) -> Result<Bytes, CameraError> {
        let url = format!("{}{}", self.address.base_url(), path);

        let mut query = vec![
            ("cmd", cmd.to_string()),
            ("channel", self.address.channel.to_string()),
        ];
        query.extend(extra.iter().map(|(k, v)| (*k, v.clone())));
        query.push(("user", self.address.username.clone()));
        query.push(("password", self.address.password.clone()));

        tracing::debug!("Sending {} request to {}", cmd, url);

        let response = self.http_client.get(&url).query(&query).send().await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(CameraError::Auth(format!("camera returned {}", status)));
        }
        if !status.is_success() {
            tracing::warn!("Camera {} returned error status {} for {}", self.address.host, status, cmd);
            return Err(CameraError::Transport(format!("camera returned {}", status)));
        }

        let body = response.bytes().await?;
        tracing::trace!("Received {} bytes from camera for {}", body.len(), cmd);

        Ok(body)
    }
}

#[async_trait]
impl CameraApi for ReolinkClient {
    async fn jpeg_snapshot(&self) -> Result<Bytes, CameraError> {
        // `rs` only defeats caches along the way; the camera ignores its value.
        let rs = Uuid::new_v4().simple().to_string();
        let body = self.get("/cgi-bin/api.cgi", "Snap", &[("rs", rs)]).await?;

        if body.starts_with(&JPEG_SOI) {
            return Ok(body);
        }

        // Rejected requests come back as a JSON error document with status 200.
        match serde_json::from_slice::<Value>(&body) {
            Ok(value) => Err(command_error(first_entry(&value).unwrap_or(&value))),
            Err(_) => Err(CameraError::Protocol(
                "snapshot response is not a JPEG image".to_string(),
            )),
        }
    }

    async fn get_motion_state(&self) -> Result<MotionState, CameraError> {
        let body = self.get("/api.cgi", "GetMdState", &[]).await?;
        parse_motion_state(&body)
    }
}

/// Parses a `GetMdState` response:
/// `[{"cmd":"GetMdState","code":0,"value":{"state":1}}]`
pub fn parse_motion_state(body: &[u8]) -> Result<MotionState, CameraError> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| CameraError::Protocol(format!("invalid motion state response: {}", e)))?;

    let entry = first_entry(&value)
        .ok_or_else(|| CameraError::Protocol("empty motion state response".to_string()))?;

    if entry.get("code").and_then(Value::as_i64) != Some(0) {
        return Err(command_error(entry));
    }

    let state = entry
        .pointer("/value/state")
        .and_then(Value::as_i64)
        .ok_or_else(|| CameraError::Protocol("motion state missing from response".to_string()))?;

    Ok(MotionState {
        detected: state != 0,
        raw: entry.clone(),
        observed_at: Utc::now(),
    })
}

fn first_entry(value: &Value) -> Option<&Value> {
    value.as_array().and_then(|entries| entries.first())
}

fn command_error(entry: &Value) -> CameraError {
    let detail = entry
        .pointer("/error/detail")
        .and_then(Value::as_str)
        .unwrap_or("unexpected response")
        .to_string();

    match entry.pointer("/error/rspCode").and_then(Value::as_i64) {
        Some(RSP_LOGIN_REQUIRED) | Some(RSP_LOGIN_FAILED) => CameraError::Auth(detail),
        _ => CameraError::Protocol(detail),
    }
}

/// Production factory; all clients share one connection pool.
#[derive(Clone)]
pub struct ReolinkClientFactory {
    http_client: Client,
}

impl ReolinkClientFactory {
    pub fn new(timeout: Duration) -> Result<Self, CameraError> {
        let http_client = Client::builder().timeout(timeout).build()?;
        Ok(Self { http_client })
    }
}

impl ClientFactory for ReolinkClientFactory {
    fn build(&self, address: &CameraAddress) -> Arc<dyn CameraApi> {
        tracing::debug!("Building camera client for {} (channel {})", address.host, address.channel);
        Arc::new(ReolinkClient::new(address.clone(), self.http_client.clone()))
    }
}
