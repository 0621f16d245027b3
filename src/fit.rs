//! Content-fit policies and the scale/offset computation behind them.
//!
//! A content-fit policy decides how a source image is scaled into a destination view of a
//! different shape. The result of [`compute_scale_and_offsets`] is a [`ScaleAndOffsets`] value
//! that maps source pixel coordinates to destination pixel coordinates.

use std::{fmt, str::FromStr};

use crate::resolution::Dimensions;

/// Rule for scaling a source image into a differently-proportioned destination view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ContentFitPolicy {
    /// Scale uniformly so that the whole source is visible. Adds letterboxing or pillarboxing.
    #[default]
    Fit,
    /// Scale uniformly so that the source covers the whole destination. Crops the source.
    Fill,
    /// Scale each axis independently so the source exactly covers the destination.
    Stretch,
}

impl ContentFitPolicy {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Fit => "fit",
            Self::Fill => "fill",
            Self::Stretch => "stretch",
        }
    }
}

impl fmt::Display for ContentFitPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when parsing an unknown [`ContentFitPolicy`] name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown content fit policy '{0}'")]
pub struct UnknownFitPolicy(String);

impl FromStr for ContentFitPolicy {
    type Err = UnknownFitPolicy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fit" | "aspect-fit" | "scale-aspect-fit" => Ok(Self::Fit),
            "fill" | "aspect-fill" | "scale-aspect-fill" => Ok(Self::Fill),
            "stretch" | "resize" | "scale-to-fill" => Ok(Self::Stretch),
            _ => Err(UnknownFitPolicy(s.to_string())),
        }
    }
}

/// How a camera preview layer resizes video into its bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoGravity {
    ResizeAspect,
    ResizeAspectFill,
    Resize,
}

impl From<VideoGravity> for ContentFitPolicy {
    fn from(gravity: VideoGravity) -> Self {
        match gravity {
            VideoGravity::ResizeAspect => Self::Fit,
            VideoGravity::ResizeAspectFill => Self::Fill,
            VideoGravity::Resize => Self::Stretch,
        }
    }
}

/// Scale applied to source pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scale {
    /// Both axes are scaled by the same factor ([`ContentFitPolicy::Fit`] and
    /// [`ContentFitPolicy::Fill`]).
    Uniform(f32),
    /// Each axis has its own factor ([`ContentFitPolicy::Stretch`]).
    Stretch { x: f32, y: f32 },
}

impl Scale {
    /// Returns the `(x, y)` scale factors.
    #[inline]
    pub fn factors(&self) -> (f32, f32) {
        match *self {
            Scale::Uniform(f) => (f, f),
            Scale::Stretch { x, y } => (x, y),
        }
    }

    /// Returns the uniform scale factor, or `None` for [`Scale::Stretch`].
    #[inline]
    pub fn uniform(&self) -> Option<f32> {
        match *self {
            Scale::Uniform(f) => Some(f),
            Scale::Stretch { .. } => None,
        }
    }
}

/// Scale factor(s) and centering offsets mapping a source image into a destination view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleAndOffsets {
    pub scale: Scale,
    /// Horizontal offset of the scaled source's left edge.
    ///
    /// Negative when [`ContentFitPolicy::Fill`] crops the source horizontally.
    pub x_offset: f32,
    /// Vertical offset of the scaled source's top edge.
    pub y_offset: f32,
}

impl ScaleAndOffsets {
    /// Maps a point in source pixel coordinates to destination pixel coordinates.
    #[inline]
    pub fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        let (sx, sy) = self.scale.factors();
        (x * sx + self.x_offset, y * sy + self.y_offset)
    }

    /// Returns the size of `source` after scaling, as `(width, height)`.
    #[inline]
    pub fn scaled_size(&self, source: Dimensions) -> (f32, f32) {
        let (sx, sy) = self.scale.factors();
        (source.width() * sx, source.height() * sy)
    }
}

/// Computes the scale factor(s) and centering offsets for drawing `source` into `dest`.
///
/// The scaled source is centered in `dest`. Offsets are zero for [`ContentFitPolicy::Stretch`].
pub fn compute_scale_and_offsets(
    source: Dimensions,
    dest: Dimensions,
    fit: ContentFitPolicy,
) -> ScaleAndOffsets {
    let width_scale = dest.width() / source.width();
    let height_scale = dest.height() / source.height();

    let result = match fit {
        ContentFitPolicy::Fit | ContentFitPolicy::Fill => {
            let factor = if fit == ContentFitPolicy::Fit {
                width_scale.min(height_scale)
            } else {
                width_scale.max(height_scale)
            };
            ScaleAndOffsets {
                scale: Scale::Uniform(factor),
                x_offset: (dest.width() - source.width() * factor) / 2.0,
                y_offset: (dest.height() - source.height() * factor) / 2.0,
            }
        }
        ContentFitPolicy::Stretch => ScaleAndOffsets {
            scale: Scale::Stretch {
                x: width_scale,
                y: height_scale,
            },
            x_offset: 0.0,
            y_offset: 0.0,
        },
    };
    log::trace!(
        "{fit} {source} ({}) into {dest} ({}) -> {result:?}",
        source.aspect_ratio(),
        dest.aspect_ratio()
    );
    result
}
