use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::camera::motion::DEFAULT_POLL_INTERVAL;
use crate::camera::ClientFactory;
use crate::device::{CameraController, DeviceHost, DeviceManifest, DeviceSettings};

/// Registry of admitted cameras, keyed by native id.
pub struct CameraManager {
    cameras: Arc<RwLock<HashMap<String, Arc<CameraController>>>>,
    factory: Arc<dyn ClientFactory>,
    poll_interval: Duration,
}

impl CameraManager {
    pub fn new(factory: Arc<dyn ClientFactory>) -> Self {
        Self {
            cameras: Arc::new(RwLock::new(HashMap::new())),
            factory,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub async fn get_camera(&self, native_id: &str) -> Option<Arc<CameraController>> {
        let cameras = self.cameras.read().await;
        cameras.get(native_id).cloned()
    }

    pub async fn list_cameras(&self) -> Vec<Arc<CameraController>> {
        let cameras = self.cameras.read().await;
        let mut list: Vec<_> = cameras.values().cloned().collect();
        list.sort_by(|a, b| a.native_id().cmp(b.native_id()));
        list
    }

    pub async fn remove_camera(&self, native_id: &str) -> bool {
        let removed = self.cameras.write().await.remove(native_id);

        match removed {
            Some(camera) => {
                camera.destroy();
                tracing::info!("Removed camera: {}", native_id);
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl DeviceHost for CameraManager {
    async fn create_device(&self, manifest: DeviceManifest) -> Result<Arc<CameraController>> {
        let mut cameras = self.cameras.write().await;
        if cameras.contains_key(&manifest.native_id) {
            anyhow::bail!("device {} already exists", manifest.native_id);
        }

        let camera = Arc::new(
            CameraController::new(
                manifest.native_id.clone(),
                manifest.name,
                DeviceSettings::new(),
                Arc::clone(&self.factory),
            )
            .with_poll_interval(self.poll_interval),
        );
        cameras.insert(manifest.native_id.clone(), Arc::clone(&camera));

        tracing::info!("Added camera: {}", manifest.native_id);
        Ok(camera)
    }
}

impl Clone for CameraManager {
    fn clone(&self) -> Self {
        Self {
            cameras: Arc::clone(&self.cameras),
            factory: Arc::clone(&self.factory),
            poll_interval: self.poll_interval,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::ReolinkClientFactory;

    fn manager() -> CameraManager {
        CameraManager::new(Arc::new(ReolinkClientFactory::new(Duration::from_secs(1)).unwrap()))
    }

    fn manifest(native_id: &str) -> DeviceManifest {
        DeviceManifest {
            native_id: native_id.to_string(),
            name: "Yard".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_and_remove_device() {
        let manager = manager();
        let camera = manager.create_device(manifest("abc")).await.unwrap();

        assert_eq!(camera.native_id(), "abc");
        assert_eq!(camera.info().management_url, None);
        assert!(manager.get_camera("abc").await.is_some());

        assert!(manager.remove_camera("abc").await);
        assert!(!manager.remove_camera("abc").await);
        assert!(manager.get_camera("abc").await.is_none());
    }

    #[tokio::test]
    async fn test_duplicate_native_id_is_rejected() {
        let manager = manager();
        manager.create_device(manifest("abc")).await.unwrap();

        match manager.create_device(manifest("abc")).await {
            Ok(_) => panic!("duplicate device was created"),
            Err(err) => assert!(err.to_string().contains("already exists")),
        }
        assert_eq!(manager.list_cameras().await.len(), 1);
    }
}
