//! Bridge between Reolink-compatible network cameras and a device host.
//!
//! Cameras are admitted through [`device::ReolinkProvider`], which checks
//! that a snapshot can be taken before registering the device. Each admitted
//! camera is driven by a [`device::CameraController`] that hands out stream
//! candidates, snapshots and a motion event stream.

pub mod camera;
pub mod config;
pub mod device;
pub mod error;
pub mod server;

pub use error::{CameraError, ProvisionError};
