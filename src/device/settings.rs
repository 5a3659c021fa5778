use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::camera::CameraAddress;

pub const DEFAULT_HTTP_PORT: u16 = 80;
pub const DEFAULT_RTMP_PORT: u16 = 1935;
pub const DEFAULT_RTSP_PORT: u16 = 554;

/// Keys of the per-device settings surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingKey {
    Ip,
    HttpPort,
    RtmpPort,
    RtspPort,
    RtspChannel,
    Username,
    Password,
    SkipValidate,
}

impl SettingKey {
    pub const ALL: [SettingKey; 8] = [
        SettingKey::Ip,
        SettingKey::HttpPort,
        SettingKey::RtmpPort,
        SettingKey::RtspPort,
        SettingKey::RtspChannel,
        SettingKey::Username,
        SettingKey::Password,
        SettingKey::SkipValidate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SettingKey::Ip => "ip",
            SettingKey::HttpPort => "httpPort",
            SettingKey::RtmpPort => "rtmpPort",
            SettingKey::RtspPort => "rtspPort",
            SettingKey::RtspChannel => "rtspChannel",
            SettingKey::Username => "username",
            SettingKey::Password => "password",
            SettingKey::SkipValidate => "skipValidate",
        }
    }

    pub fn parse(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == key)
    }

    /// Trims surrounding whitespace, except from credentials which are taken
    /// verbatim.
    pub fn normalize<'a>(&self, value: &'a str) -> &'a str {
        match self {
            SettingKey::Username | SettingKey::Password => value,
            _ => value.trim(),
        }
    }
}

#[derive(Debug, Default)]
struct SettingsInner {
    values: HashMap<SettingKey, String>,
    generation: u64,
}

/// Key/value settings of one device.
///
/// Every write that changes a value bumps the generation, which is what the
/// controller's client cache compares against to decide on a rebuild.
#[derive(Debug, Clone, Default)]
pub struct DeviceSettings {
    inner: Arc<RwLock<SettingsInner>>,
}

impl DeviceSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: SettingKey) -> Option<String> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.values.get(&key).cloned()
    }

    /// Stores `value`; an empty value clears the key.
    pub fn put(&self, key: SettingKey, value: impl Into<String>) {
        let value = value.into();
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);

        let changed = if value.is_empty() {
            inner.values.remove(&key).is_some()
        } else {
            inner.values.insert(key, value.clone()).as_deref() != Some(value.as_str())
        };

        if changed {
            inner.generation += 1;
            tracing::debug!("Setting {} changed (generation {})", key.as_str(), inner.generation);
        }
    }

    pub fn generation(&self) -> u64 {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).generation
    }

    /// Reads all address-affecting settings under one lock, together with
    /// the generation they belong to.
    pub fn resolve(&self) -> (u64, ResolvedAddress) {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        let get = |key: SettingKey| inner.values.get(&key).map(String::as_str);

        let resolved = ResolvedAddress {
            ip: get(SettingKey::Ip).unwrap_or_default().to_string(),
            http_port: parse_port(get(SettingKey::HttpPort), DEFAULT_HTTP_PORT),
            rtmp_port: parse_port(get(SettingKey::RtmpPort), DEFAULT_RTMP_PORT),
            rtsp_port: parse_port(get(SettingKey::RtspPort), DEFAULT_RTSP_PORT),
            channel: parse_channel(get(SettingKey::RtspChannel)),
            username: get(SettingKey::Username).unwrap_or_default().to_string(),
            password: get(SettingKey::Password).unwrap_or_default().to_string(),
        };

        (inner.generation, resolved)
    }

    pub fn skip_validate(&self) -> bool {
        parse_bool(self.get(SettingKey::SkipValidate).as_deref())
    }

    pub fn to_map(&self) -> HashMap<String, String> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner
            .values
            .iter()
            .map(|(k, v)| (k.as_str().to_string(), v.clone()))
            .collect()
    }
}

/// Address-affecting settings with defaults applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAddress {
    pub ip: String,
    pub http_port: u16,
    pub rtmp_port: u16,
    pub rtsp_port: u16,
    pub channel: u32,
    pub username: String,
    pub password: String,
}

impl ResolvedAddress {
    pub fn http_address(&self) -> String {
        format!("{}:{}", self.ip, self.http_port)
    }

    pub fn rtmp_address(&self) -> String {
        format!("{}:{}", self.ip, self.rtmp_port)
    }

    pub fn rtsp_address(&self) -> String {
        format!("{}:{}", self.ip, self.rtsp_port)
    }

    pub fn management_url(&self) -> String {
        format!("http://{}", self.ip)
    }

    pub fn camera_address(&self) -> CameraAddress {
        CameraAddress {
            host: self.http_address(),
            username: self.username.clone(),
            password: self.password.clone(),
            channel: self.channel,
        }
    }
}

/// Channel index from the `rtspChannel` setting; 0 when absent or not a number.
pub fn parse_channel(value: Option<&str>) -> u32 {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(0)
}

fn parse_port(value: Option<&str>, default: u16) -> u16 {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

fn parse_bool(value: Option<&str>) -> bool {
    matches!(value.map(str::trim), Some("true") | Some("1") | Some("yes"))
}
