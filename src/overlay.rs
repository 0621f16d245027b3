//! Mapping of normalized landmarks to view-space overlay geometry.
//!
//! Everything in here is pure: the same inputs always produce the same [`OverlayFrame`], and no
//! state is kept between frames.

use crate::{
    error::OverlayError,
    fit::{compute_scale_and_offsets, ContentFitPolicy, ScaleAndOffsets},
    landmark::{HolisticResult, Landmarks},
    orientation::OrientationTransform,
    resolution::Dimensions,
    topology::{self, Topology},
};

/// A 2D point, either in normalized `[0, 1]` image space or in view pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point2D {
    pub x: f32,
    pub y: f32,
}

impl Point2D {
    #[inline]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// A straight line between two points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub from: Point2D,
    pub to: Point2D,
}

/// Drawable geometry for one set of landmarks: a dot per landmark plus the skeleton lines.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverlayFrame {
    pub dots: Vec<Point2D>,
    pub lines: Vec<Segment>,
}

impl OverlayFrame {
    pub fn is_empty(&self) -> bool {
        self.dots.is_empty()
    }
}

/// Overlay geometry for one holistic detection result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HolisticOverlay {
    pub pose: OverlayFrame,
    pub face: Option<OverlayFrame>,
    pub left_hand: Option<OverlayFrame>,
    pub right_hand: Option<OverlayFrame>,
}

impl HolisticOverlay {
    /// Iterates over all present frames, pose first.
    pub fn frames(&self) -> impl Iterator<Item = &OverlayFrame> + '_ {
        std::iter::once(&self.pose)
            .chain(self.face.as_ref())
            .chain(self.left_hand.as_ref())
            .chain(self.right_hand.as_ref())
    }
}

/// Maps normalized points into destination pixel space.
///
/// Each point is rotated by `orientation`, then scaled and offset according to `fit`. The output
/// has the same length and order as the input.
pub fn map_points<I>(
    points: I,
    source: Dimensions,
    dest: Dimensions,
    fit: ContentFitPolicy,
    orientation: OrientationTransform,
) -> Vec<Point2D>
where
    I: IntoIterator<Item = Point2D>,
{
    let transform = compute_scale_and_offsets(source, dest, fit);
    map_with(points, source, &transform, orientation)
}

fn map_with<I>(
    points: I,
    source: Dimensions,
    transform: &ScaleAndOffsets,
    orientation: OrientationTransform,
) -> Vec<Point2D>
where
    I: IntoIterator<Item = Point2D>,
{
    points
        .into_iter()
        .map(|p| map_one(p, source, transform, orientation))
        .collect()
}

#[inline]
fn map_one(
    point: Point2D,
    source: Dimensions,
    transform: &ScaleAndOffsets,
    orientation: OrientationTransform,
) -> Point2D {
    let p = orientation.apply(point);
    let (x, y) = transform.apply(p.x * source.width(), p.y * source.height());
    Point2D::new(x, y)
}

/// Builds one line segment per `topology` entry, connecting the referenced `points`.
///
/// An empty `points` list means nothing was detected and yields no segments. Otherwise, every
/// index in `topology` must be in bounds, or [`OverlayError::IndexOutOfRange`] is returned.
pub fn build_segments(
    points: &[Point2D],
    topology: &[(usize, usize)],
) -> Result<Vec<Segment>, OverlayError> {
    if points.is_empty() {
        return Ok(Vec::new());
    }

    if let Some(index) = topology::max_index(topology) {
        if index >= points.len() {
            return Err(OverlayError::IndexOutOfRange {
                index,
                len: points.len(),
            });
        }
    }

    Ok(topology
        .iter()
        .map(|&(start, end)| Segment {
            from: points[start],
            to: points[end],
        })
        .collect())
}

/// Maps landmarks of images of one size into a view of another size.
///
/// This bundles the parameters of [`map_points`] so that a whole [`HolisticResult`] can be
/// converted with a single transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateMapper {
    source: Dimensions,
    dest: Dimensions,
    fit: ContentFitPolicy,
    orientation: OrientationTransform,
    transform: ScaleAndOffsets,
}

impl CoordinateMapper {
    pub fn new(
        source: Dimensions,
        dest: Dimensions,
        fit: ContentFitPolicy,
        orientation: OrientationTransform,
    ) -> Self {
        Self {
            source,
            dest,
            fit,
            orientation,
            transform: compute_scale_and_offsets(source, dest, fit),
        }
    }

    #[inline]
    pub fn source(&self) -> Dimensions {
        self.source
    }

    #[inline]
    pub fn dest(&self) -> Dimensions {
        self.dest
    }

    #[inline]
    pub fn fit(&self) -> ContentFitPolicy {
        self.fit
    }

    #[inline]
    pub fn orientation(&self) -> OrientationTransform {
        self.orientation
    }

    #[inline]
    pub fn scale_and_offsets(&self) -> ScaleAndOffsets {
        self.transform
    }

    /// Maps a single normalized point into view space.
    pub fn map_point(&self, point: Point2D) -> Point2D {
        map_one(point, self.source, &self.transform, self.orientation)
    }

    /// Maps normalized points into view space, preserving order.
    pub fn map_points<I: IntoIterator<Item = Point2D>>(&self, points: I) -> Vec<Point2D> {
        map_with(points, self.source, &self.transform, self.orientation)
    }

    /// Builds the dots and skeleton lines for one set of landmarks.
    pub fn build_frame(
        &self,
        landmarks: &Landmarks,
        topology: Topology,
    ) -> Result<OverlayFrame, OverlayError> {
        let dots = self.map_points(landmarks.points());
        let lines = build_segments(&dots, topology)?;
        Ok(OverlayFrame { dots, lines })
    }

    /// Builds the overlay for a holistic detection result.
    ///
    /// Returns `Ok(None)` if no pose was detected. Face and hands are only included when the
    /// detector found them.
    pub fn build_overlay(
        &self,
        result: &HolisticResult,
    ) -> Result<Option<HolisticOverlay>, OverlayError> {
        if !result.has_pose() {
            return Ok(None);
        }

        let optional = |landmarks: &Landmarks, topology: Topology| -> Result<_, OverlayError> {
            if landmarks.is_empty() {
                Ok(None)
            } else {
                self.build_frame(landmarks, topology).map(Some)
            }
        };

        let overlay = HolisticOverlay {
            pose: self.build_frame(&result.pose_landmarks, topology::pose::CONNECTIONS)?,
            face: optional(&result.face_landmarks, topology::face::OVAL)?,
            left_hand: optional(&result.left_hand_landmarks, topology::hand::CONNECTIONS)?,
            right_hand: optional(&result.right_hand_landmarks, topology::hand::CONNECTIONS)?,
        };
        log::trace!(
            "built overlay with {} dots in {}",
            overlay.frames().map(|f| f.dots.len()).sum::<usize>(),
            self.dest
        );
        Ok(Some(overlay))
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::landmark::Landmark;

    fn dims(w: f32, h: f32) -> Dimensions {
        Dimensions::new(w, h).unwrap()
    }

    fn random_landmarks(n: usize) -> Landmarks {
        (0..n)
            .map(|_| Landmark::new([fastrand::f32(), fastrand::f32(), 0.0]))
            .collect()
    }

    #[test]
    fn map_fit_with_pillarbox() {
        let mapped = map_points(
            [Point2D::new(0.0, 0.0), Point2D::new(1.0, 1.0), Point2D::new(0.5, 0.5)],
            dims(100.0, 200.0),
            dims(50.0, 50.0),
            ContentFitPolicy::Fit,
            OrientationTransform::Identity,
        );
        assert_eq!(
            mapped,
            [
                Point2D::new(12.5, 0.0),
                Point2D::new(37.5, 50.0),
                Point2D::new(25.0, 25.0)
            ]
        );
    }

    #[test]
    fn map_fill_crops() {
        let mapped = map_points(
            [Point2D::new(0.0, 0.0), Point2D::new(1.0, 1.0)],
            dims(100.0, 200.0),
            dims(50.0, 50.0),
            ContentFitPolicy::Fill,
            OrientationTransform::Identity,
        );
        assert_eq!(mapped, [Point2D::new(0.0, -25.0), Point2D::new(50.0, 75.0)]);
    }

    #[test]
    fn map_applies_orientation_before_scaling() {
        let mapped = map_points(
            [Point2D::new(0.2, 0.8)],
            dims(100.0, 100.0),
            dims(100.0, 100.0),
            ContentFitPolicy::Stretch,
            OrientationTransform::RotateLeft90,
        );
        assert_relative_eq!(mapped[0].x, 80.0, epsilon = 1e-4);
        assert_relative_eq!(mapped[0].y, 80.0, epsilon = 1e-4);
    }

    #[test]
    fn map_preserves_count_and_order() {
        let mapper = CoordinateMapper::new(
            dims(640.0, 480.0),
            dims(390.0, 844.0),
            ContentFitPolicy::Fill,
            OrientationTransform::RotateRight90,
        );
        let points: Vec<_> = random_landmarks(100).points().collect();
        let mapped = mapper.map_points(points.iter().copied());
        assert_eq!(mapped.len(), points.len());
        for (input, output) in points.iter().zip(&mapped) {
            assert_eq!(mapper.map_point(*input), *output);
        }
        assert!(mapper.map_points(Vec::new()).is_empty());
    }

    #[test]
    fn single_point_mapping_matches_batch() {
        let points: Vec<_> = random_landmarks(20).points().collect();
        for fit in [ContentFitPolicy::Fit, ContentFitPolicy::Fill, ContentFitPolicy::Stretch] {
            for orientation in [
                OrientationTransform::Identity,
                OrientationTransform::RotateLeft90,
                OrientationTransform::RotateRight90,
            ] {
                let (source, dest) = (dims(720.0, 1280.0), dims(400.0, 300.0));
                let mapper = CoordinateMapper::new(source, dest, fit, orientation);
                let batch = map_points(points.iter().copied(), source, dest, fit, orientation);
                let single: Vec<_> = points.iter().map(|&p| mapper.map_point(p)).collect();
                assert_eq!(batch, single, "{fit} {orientation:?}");
            }
        }
    }

    #[test]
    fn segments_follow_topology() {
        let points = [
            Point2D::new(0.0, 0.0),
            Point2D::new(1.0, 0.0),
            Point2D::new(1.0, 1.0),
        ];
        let segments = build_segments(&points, &[(0, 1), (1, 2), (2, 0)]).unwrap();
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[1].from, points[1]);
        assert_eq!(segments[1].to, points[2]);
        assert_eq!(segments[2].to, points[0]);
    }

    #[test]
    fn segments_empty_points() {
        assert_eq!(build_segments(&[], topology::pose::CONNECTIONS), Ok(Vec::new()));
    }

    #[test]
    fn segments_index_out_of_range() {
        let points = [Point2D::new(0.0, 0.0), Point2D::new(1.0, 0.0)];
        assert_eq!(
            build_segments(&points, &[(0, 1), (1, 2)]),
            Err(OverlayError::IndexOutOfRange { index: 2, len: 2 })
        );
        assert_eq!(build_segments(&points, &[]), Ok(Vec::new()));
    }

    #[test]
    fn overlay_requires_pose() {
        let mapper = CoordinateMapper::new(
            dims(100.0, 100.0),
            dims(100.0, 100.0),
            ContentFitPolicy::Fit,
            OrientationTransform::Identity,
        );
        let mut result = HolisticResult {
            left_hand_landmarks: random_landmarks(topology::hand::NUM_LANDMARKS),
            ..Default::default()
        };
        assert_eq!(mapper.build_overlay(&result), Ok(None));

        result.pose_landmarks = random_landmarks(topology::pose::NUM_LANDMARKS);
        let overlay = mapper.build_overlay(&result).unwrap().unwrap();
        assert_eq!(overlay.pose.dots.len(), 33);
        assert_eq!(overlay.pose.lines.len(), 35);
        assert_eq!(overlay.left_hand.as_ref().map(|f| f.lines.len()), Some(21));
        assert!(overlay.right_hand.is_none());
        assert!(overlay.face.is_none());
        assert_eq!(overlay.frames().count(), 2);
    }

    #[test]
    fn overlay_rejects_truncated_pose() {
        let mapper = CoordinateMapper::new(
            dims(100.0, 100.0),
            dims(100.0, 100.0),
            ContentFitPolicy::Fit,
            OrientationTransform::Identity,
        );
        let result = HolisticResult {
            pose_landmarks: random_landmarks(25),
            ..Default::default()
        };
        assert_eq!(
            mapper.build_overlay(&result),
            Err(OverlayError::IndexOutOfRange { index: 32, len: 25 })
        );
    }
}
