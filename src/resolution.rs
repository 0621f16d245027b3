//! Types for representing image and viewport dimensions.

use std::fmt;

use crate::error::OverlayError;

/// Size (`width x height`) of an image, video frame, or overlay view, in pixels.
///
/// Both extents are always finite and strictly positive, so scale factors derived from a pair of
/// [`Dimensions`] are always finite and nonzero.
#[derive(Clone, Copy, PartialEq)]
pub struct Dimensions {
    width: f32,
    height: f32,
}

impl Dimensions {
    /// Creates a new [`Dimensions`] of `width x height`.
    ///
    /// Returns [`OverlayError::InvalidDimensions`] if either extent is zero, negative, NaN or
    /// infinite.
    pub fn new(width: f32, height: f32) -> Result<Self, OverlayError> {
        let valid = |v: f32| v.is_finite() && v > 0.0;
        if !valid(width) || !valid(height) {
            return Err(OverlayError::InvalidDimensions { width, height });
        }
        Ok(Self { width, height })
    }

    /// Creates [`Dimensions`] from an integer pixel resolution.
    pub fn from_pixels(width: u32, height: u32) -> Result<Self, OverlayError> {
        Self::new(width as f32, height as f32)
    }

    #[inline]
    pub fn width(&self) -> f32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> f32 {
        self.height
    }

    /// Computes the [`AspectRatio`] of these [`Dimensions`].
    #[inline]
    pub fn aspect_ratio(&self) -> AspectRatio {
        AspectRatio(self.width / self.height)
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl fmt::Debug for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Ratio of a width to a height.
#[derive(PartialEq, PartialOrd, Clone, Copy)]
pub struct AspectRatio(f32);

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}:1", self.0)
    }
}

impl fmt::Debug for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
