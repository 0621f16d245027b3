//! Holistic landmark overlays.
//!
//! This crate turns the output of a holistic (pose, face and hand) landmark detector into
//! geometry that can be drawn on top of the image the detector ran on.
//!
//! # Coordinates
//!
//! Detectors report landmarks in normalized image coordinates: X points to the right, Y points
//! *down*, and both are in range `[0, 1]` across the image. Overlay geometry is in view pixel
//! coordinates with the same axis directions, origin at the top left corner of the view.
//!
//! The image is placed in the view according to a [`ContentFitPolicy`], and landmarks can be
//! rotated by 90° first to account for device orientation (see [`orientation`]).
//!
//! # Environment Variables
//!
//! [`InferenceConfig::from_env`] reads the following variables:
//!
//! * `LANDMARK_OVERLAY_DELEGATE`: Compute delegate for the landmarker, `CPU` (the default) or
//!   `GPU`.
//! * `LANDMARK_OVERLAY_MODEL_DIR`: Directory containing `holistic_landmarker.task`. If unset, no
//!   model path is configured and building a [`LandmarkerService`] fails.
//!
//! [`ContentFitPolicy`]: fit::ContentFitPolicy
//! [`InferenceConfig::from_env`]: config::InferenceConfig::from_env
//! [`LandmarkerService`]: service::LandmarkerService

use log::LevelFilter;

pub mod config;
pub mod error;
pub mod fit;
pub mod landmark;
pub mod orientation;
pub mod overlay;
pub mod pipeline;
pub mod resolution;
pub mod service;
pub mod timer;
pub mod topology;

pub use error::{OverlayError, ServiceError};

/// macro-use only, not part of public API.
#[doc(hidden)]
pub fn init_logger(calling_crate: &'static str) {
    let log_level = if cfg!(debug_assertions) {
        LevelFilter::Trace
    } else {
        LevelFilter::Debug
    };
    env_logger::Builder::new()
        .filter(Some(calling_crate), log_level)
        .filter(Some(env!("CARGO_CRATE_NAME")), log_level)
        .parse_default_env()
        .try_init()
        .ok();
}

/// Initializes logging to *stderr*.
///
/// If `cfg!(debug_assertions)` is enabled, the calling crate and this crate will log at *trace*
/// level. Otherwise, they will log at *debug* level. `RUST_LOG` overrides both.
///
/// If a global logger is already registered, this macro will do nothing.
#[macro_export]
macro_rules! init_logger {
    () => {
        $crate::init_logger(env!("CARGO_CRATE_NAME"))
    };
}
