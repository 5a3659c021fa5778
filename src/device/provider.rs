use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::camera::{CameraAddress, ClientFactory};
use crate::device::controller::{CameraController, DEFAULT_DEVICE_NAME};
use crate::device::settings::{parse_channel, SettingKey, DEFAULT_HTTP_PORT};
use crate::error::ProvisionError;

/// Settings submitted for a camera that is not yet a device.
///
/// Ports and channel stay strings, like the settings they end up in.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CameraSubmission {
    #[serde(default)]
    pub name: Option<String>,
    pub ip: String,
    #[serde(default, alias = "httpPort")]
    pub http_port: Option<String>,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default, alias = "rtspChannel")]
    pub rtsp_channel: Option<String>,
    #[serde(default, alias = "skipValidate")]
    pub skip_validate: bool,
}

impl CameraSubmission {
    pub fn camera_address(&self) -> CameraAddress {
        let http_port = self
            .http_port
            .as_deref()
            .and_then(|p| p.trim().parse::<u16>().ok())
            .unwrap_or(DEFAULT_HTTP_PORT);

        CameraAddress {
            host: format!("{}:{}", self.ip, http_port),
            username: self.username.clone(),
            password: self.password.clone(),
            channel: parse_channel(self.rtsp_channel.as_deref()),
        }
    }
}

/// What the host needs to register a device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceManifest {
    pub native_id: String,
    pub name: String,
}

/// The host platform's side of device admission.
#[async_trait]
pub trait DeviceHost: Send + Sync {
    async fn create_device(&self, manifest: DeviceManifest) -> Result<Arc<CameraController>>;
}

/// Admits new cameras after checking they answer a snapshot request.
pub struct ReolinkProvider {
    host: Arc<dyn DeviceHost>,
    factory: Arc<dyn ClientFactory>,
}

impl ReolinkProvider {
    pub fn new(host: Arc<dyn DeviceHost>, factory: Arc<dyn ClientFactory>) -> Self {
        Self { host, factory }
    }

    /// Validates and registers a camera, returning its native id.
    pub async fn create_device(&self, submission: CameraSubmission) -> Result<String, ProvisionError> {
        let address = submission.camera_address();

        if submission.skip_validate {
            tracing::info!("Skipping validation for camera at {}", address.host);
        } else {
            tracing::info!("Validating camera at {}", address.host);
            let client = self.factory.build(&address);
            if let Err(e) = client.jpeg_snapshot().await {
                tracing::warn!("Camera at {} failed validation: {}", address.host, e);
                return Err(e.into());
            }
        }

        let manifest = DeviceManifest {
            native_id: Uuid::new_v4().simple().to_string(),
            name: submission
                .name
                .clone()
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_DEVICE_NAME.to_string()),
        };

        let device = self
            .host
            .create_device(manifest)
            .await
            .map_err(ProvisionError::Host)?;

        device.put_setting(SettingKey::Username, submission.username);
        device.put_setting(SettingKey::Password, submission.password);
        device.put_setting(SettingKey::Ip, submission.ip);
        if let Some(channel) = submission.rtsp_channel {
            device.put_setting(SettingKey::RtspChannel, channel);
        }
        if let Some(port) = submission.http_port {
            device.put_setting(SettingKey::HttpPort, port);
        }

        tracing::info!("Admitted camera {} ({})", device.info().name, device.native_id());
        Ok(device.native_id().to_string())
    }
}
