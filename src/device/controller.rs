use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use bytes::Bytes;
use serde::Serialize;

use crate::camera::motion::{ClientProvider, MotionMonitor, DEFAULT_POLL_INTERVAL};
use crate::camera::{CameraApi, ClientFactory};
use crate::device::settings::{DeviceSettings, ResolvedAddress, SettingKey};
use crate::device::streams::{derive_stream_candidates, StreamCandidate};
use crate::error::CameraError;

pub const MANUFACTURER: &str = "Reolink";
pub const DEFAULT_DEVICE_NAME: &str = "Reolink Camera";

/// Image handed to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaObject {
    pub mime_type: &'static str,
    pub data: Bytes,
}

impl MediaObject {
    pub fn jpeg(data: Bytes) -> Self {
        Self {
            mime_type: "image/jpeg",
            data,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    pub native_id: String,
    pub name: String,
    pub manufacturer: String,
    /// Always `None`: the bridge has no model lookup.
    pub model: Option<String>,
    pub management_url: Option<String>,
}

/// Client cache keyed by the settings generation it was built from.
pub struct ClientCache {
    settings: DeviceSettings,
    factory: Arc<dyn ClientFactory>,
    slot: RwLock<Option<(u64, Arc<dyn CameraApi>)>>,
}

impl ClientCache {
    pub fn new(settings: DeviceSettings, factory: Arc<dyn ClientFactory>) -> Self {
        Self {
            settings,
            factory,
            slot: RwLock::new(None),
        }
    }

    pub fn get(&self) -> Arc<dyn CameraApi> {
        let generation = self.settings.generation();
        {
            let slot = self.slot.read().unwrap_or_else(PoisonError::into_inner);
            if let Some((built_for, client)) = slot.as_ref() {
                if *built_for == generation {
                    return Arc::clone(client);
                }
            }
        }

        let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
        // Another caller may have rebuilt while we waited for the lock.
        let (generation, resolved) = self.settings.resolve();
        if let Some((built_for, client)) = slot.as_ref() {
            if *built_for == generation {
                return Arc::clone(client);
            }
        }

        let client = self.factory.build(&resolved.camera_address());
        *slot = Some((generation, Arc::clone(&client)));
        client
    }
}

impl ClientProvider for ClientCache {
    fn current_client(&self) -> Arc<dyn CameraApi> {
        self.get()
    }
}

/// Per-device façade over settings, client, stream URLs and motion events.
pub struct CameraController {
    native_id: String,
    settings: DeviceSettings,
    clients: Arc<ClientCache>,
    motion_detected: Arc<AtomicBool>,
    monitor: Mutex<Option<MotionMonitor>>,
    info: RwLock<DeviceInfo>,
    poll_interval: Duration,
}

impl CameraController {
    pub fn new(
        native_id: impl Into<String>,
        name: impl Into<String>,
        settings: DeviceSettings,
        factory: Arc<dyn ClientFactory>,
    ) -> Self {
        let native_id = native_id.into();
        let (_, resolved) = settings.resolve();

        let info = DeviceInfo {
            native_id: native_id.clone(),
            name: name.into(),
            manufacturer: MANUFACTURER.to_string(),
            model: None,
            management_url: management_url(&resolved),
        };

        Self {
            native_id,
            clients: Arc::new(ClientCache::new(settings.clone(), factory)),
            settings,
            motion_detected: Arc::new(AtomicBool::new(false)),
            monitor: Mutex::new(None),
            info: RwLock::new(info),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn native_id(&self) -> &str {
        &self.native_id
    }

    pub fn settings(&self) -> &DeviceSettings {
        &self.settings
    }

    pub fn info(&self) -> DeviceInfo {
        self.info.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn resolved_address(&self) -> ResolvedAddress {
        self.settings.resolve().1
    }

    pub fn channel(&self) -> u32 {
        self.resolved_address().channel
    }

    pub fn get_client(&self) -> Arc<dyn CameraApi> {
        self.clients.get()
    }

    /// Writes a setting. A changed value makes the next `get_client` build a
    /// fresh client.
    pub fn put_setting(&self, key: SettingKey, value: impl Into<String>) {
        self.settings.put(key, value);
        self.refresh_management_url();
    }

    fn refresh_management_url(&self) {
        let url = management_url(&self.resolved_address());
        let mut info = self.info.write().unwrap_or_else(PoisonError::into_inner);
        if info.management_url != url {
            tracing::debug!("Management URL of {} is now {:?}", self.native_id, url);
            info.management_url = url;
        }
    }

    pub async fn take_picture(&self) -> Result<MediaObject, CameraError> {
        let client = self.get_client();
        let data = client.jpeg_snapshot().await?;
        Ok(MediaObject::jpeg(data))
    }

    pub fn stream_candidates(&self) -> Vec<StreamCandidate> {
        derive_stream_candidates(&self.resolved_address())
    }

    /// Starts motion polling and returns a handle to it. A monitor started
    /// by an earlier call is destroyed first.
    pub fn listen_events(&self) -> MotionMonitor {
        let provider: Arc<dyn ClientProvider> = self.clients.clone();
        let monitor = MotionMonitor::with_poll_interval(
            provider,
            Arc::clone(&self.motion_detected),
            self.poll_interval,
        );

        let previous = self
            .monitor
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(monitor.clone());
        if let Some(previous) = previous {
            previous.destroy();
        }

        tracing::info!("Listening for motion events on {}", self.native_id);
        monitor.start();
        monitor
    }

    /// [`listen_events`](Self::listen_events) with a logger attached to the
    /// new monitor.
    pub fn listen_and_log_events(&self) -> MotionMonitor {
        let monitor = self.listen_events();
        let _logger = monitor.log_events(self.native_id.clone());
        monitor
    }

    /// The monitor started by the latest `listen_events`, unless destroyed.
    pub fn monitor(&self) -> Option<MotionMonitor> {
        self.monitor.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn motion_detected(&self) -> bool {
        self.motion_detected.load(Ordering::SeqCst)
    }

    /// Stops the motion monitor, if any.
    pub fn destroy(&self) {
        let monitor = self.monitor.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(monitor) = monitor {
            monitor.destroy();
        }
    }
}

fn management_url(resolved: &ResolvedAddress) -> Option<String> {
    if resolved.ip.is_empty() {
        None
    } else {
        Some(resolved.management_url())
    }
}
