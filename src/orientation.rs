//! Orientation handling for normalized landmark coordinates.
//!
//! Detectors report landmarks relative to the (possibly rotated) frame they were given. Before
//! scaling, coordinates are rotated by 90° steps so that they line up with the displayed image.

use crate::overlay::Point2D;

/// Rotation applied to normalized coordinates before they are scaled into view space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OrientationTransform {
    #[default]
    Identity,
    /// `(x, y) -> (y, 1 - x)`
    RotateLeft90,
    /// `(x, y) -> (1 - y, x)`
    RotateRight90,
}

impl OrientationTransform {
    /// Applies this rotation to a point in normalized `[0, 1]` coordinates.
    #[inline]
    pub fn apply(&self, p: Point2D) -> Point2D {
        match self {
            Self::Identity => p,
            Self::RotateLeft90 => Point2D::new(p.y, 1.0 - p.x),
            Self::RotateRight90 => Point2D::new(1.0 - p.y, p.x),
        }
    }

    /// Returns the rotation that undoes `self`.
    pub fn inverse(&self) -> Self {
        match self {
            Self::Identity => Self::Identity,
            Self::RotateLeft90 => Self::RotateRight90,
            Self::RotateRight90 => Self::RotateLeft90,
        }
    }

    /// Returns whether this rotation swaps the X and Y axes.
    pub fn swaps_axes(&self) -> bool {
        !matches!(self, Self::Identity)
    }
}

/// Applies `orientation` to a normalized point.
#[inline]
pub fn apply_orientation(point: Point2D, orientation: OrientationTransform) -> Point2D {
    orientation.apply(point)
}

/// Orientation metadata attached to a still image or camera frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ImageOrientation {
    #[default]
    Up,
    Down,
    Left,
    Right,
    UpMirrored,
    DownMirrored,
    LeftMirrored,
    RightMirrored,
}

/// Only the plain left/right rotations are corrected. Every other orientation is drawn
/// unrotated so the overlay keeps tracking instead of disappearing.
impl From<ImageOrientation> for OrientationTransform {
    fn from(orientation: ImageOrientation) -> Self {
        match orientation {
            ImageOrientation::Left => Self::RotateLeft90,
            ImageOrientation::Right => Self::RotateRight90,
            _ => Self::Identity,
        }
    }
}

/// Physical orientation of the device showing the overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DeviceOrientation {
    #[default]
    Unknown,
    Portrait,
    PortraitUpsideDown,
    LandscapeLeft,
    LandscapeRight,
    FaceUp,
    FaceDown,
}

impl DeviceOrientation {
    /// Returns whether a change to this orientation should re-layout the current overlay.
    ///
    /// Flat and upside-down orientations keep whatever was drawn last.
    pub fn triggers_redraw(&self) -> bool {
        matches!(
            self,
            Self::Portrait | Self::LandscapeLeft | Self::LandscapeRight
        )
    }
}

impl From<DeviceOrientation> for ImageOrientation {
    fn from(orientation: DeviceOrientation) -> Self {
        match orientation {
            DeviceOrientation::LandscapeLeft => Self::Left,
            DeviceOrientation::LandscapeRight => Self::Right,
            _ => Self::Up,
        }
    }
}

impl From<DeviceOrientation> for OrientationTransform {
    fn from(orientation: DeviceOrientation) -> Self {
        ImageOrientation::from(orientation).into()
    }
}
