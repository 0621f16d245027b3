//! Error types.

use thiserror::Error;

use crate::service::RunningMode;

/// Errors produced while mapping landmarks into overlay geometry.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum OverlayError {
    /// A source or destination extent is zero, negative, or not finite.
    #[error("invalid dimensions {width}x{height}")]
    InvalidDimensions { width: f32, height: f32 },

    /// A topology entry references a landmark that the detector did not output.
    #[error("topology index {index} is out of range for {len} landmarks")]
    IndexOutOfRange { index: usize, len: usize },
}

/// Errors produced by [`LandmarkerService`] and [`ConfigStore`].
///
/// [`LandmarkerService`]: crate::service::LandmarkerService
/// [`ConfigStore`]: crate::config::ConfigStore
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("no model asset path configured")]
    MissingModelPath,

    #[error("operation requires running mode {expected:?}, but the service runs in {actual:?}")]
    WrongRunningMode {
        expected: RunningMode,
        actual: RunningMode,
    },

    #[error("invalid inference configuration: {0}")]
    InvalidConfig(String),

    #[error("landmarker backend failed")]
    Backend(#[source] anyhow::Error),
}
