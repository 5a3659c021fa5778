pub mod controller;
pub mod provider;
pub mod settings;
pub mod streams;

pub use controller::{CameraController, DeviceInfo, MediaObject};
pub use provider::{CameraSubmission, DeviceHost, DeviceManifest, ReolinkProvider};
pub use settings::{DeviceSettings, ResolvedAddress, SettingKey};
pub use streams::{StreamCandidate, TransportContainer};
