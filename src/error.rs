use thiserror::Error;

/// Failure of a single request against a camera.
///
/// The variants are kept as strings so the error can be cloned into every
/// motion event subscriber.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CameraError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("authentication rejected: {0}")]
    Auth(String),
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl From<reqwest::Error> for CameraError {
    fn from(err: reqwest::Error) -> Self {
        CameraError::Transport(err.to_string())
    }
}

/// Failure to admit a new camera.
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// The validation snapshot failed; the camera error is passed through as is.
    #[error(transparent)]
    Validation(#[from] CameraError),
    #[error("host failed to create device: {0:#}")]
    Host(anyhow::Error),
}
