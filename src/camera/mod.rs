pub mod manager;
pub mod client;
pub mod motion;

pub use manager::CameraManager;
pub use client::{CameraAddress, CameraApi, ClientFactory, MotionState, ReolinkClient, ReolinkClientFactory};
pub use motion::{ClientProvider, MonitorState, MotionEvent, MotionMonitor};
