//! Landmark data as reported by a holistic landmark detector.

use crate::overlay::Point2D;

type Position = [f32; 3];

/// A landmark in normalized image space.
///
/// X and Y are in range `[0, 1]` relative to the image the detector was run on (values slightly
/// outside of that range occur when a landmark is predicted off-frame). Z is a relative depth
/// whose scale depends on the detector.
#[derive(Debug, PartialEq, PartialOrd, Clone, Copy)]
pub struct Landmark {
    pos: Position,
    visibility: Option<f32>,
    presence: Option<f32>,
}

impl Landmark {
    pub fn new(position: Position) -> Self {
        Self {
            pos: position,
            visibility: None,
            presence: None,
        }
    }

    pub fn with_visibility(self, visibility: f32) -> Self {
        Self {
            visibility: Some(visibility),
            ..self
        }
    }

    pub fn with_presence(self, presence: f32) -> Self {
        Self {
            presence: Some(presence),
            ..self
        }
    }

    #[inline]
    pub fn position(&self) -> Position {
        self.pos
    }

    #[inline]
    pub fn x(&self) -> f32 {
        self.pos[0]
    }

    #[inline]
    pub fn y(&self) -> f32 {
        self.pos[1]
    }

    #[inline]
    pub fn z(&self) -> f32 {
        self.pos[2]
    }

    /// Likelihood that the landmark is visible (not occluded), if the detector reports it.
    #[inline]
    pub fn visibility(&self) -> Option<f32> {
        self.visibility
    }

    /// Likelihood that the landmark is inside the frame, if the detector reports it.
    #[inline]
    pub fn presence(&self) -> Option<f32> {
        self.presence
    }

    /// Drops the depth coordinate.
    #[inline]
    pub fn point(&self) -> Point2D {
        Point2D::new(self.x(), self.y())
    }
}

/// An ordered list of landmarks.
///
/// The order matters: connectivity tables in [`crate::topology`] index into it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Landmarks {
    landmarks: Vec<Landmark>,
}

impl Landmarks {
    pub fn new(landmarks: Vec<Landmark>) -> Self {
        Self { landmarks }
    }

    /// Creates a list of landmarks from bare `[x, y, z]` positions.
    pub fn from_positions<I: IntoIterator<Item = Position>>(positions: I) -> Self {
        positions.into_iter().map(Landmark::new).collect()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.landmarks.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.landmarks.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Landmark> {
        self.landmarks.get(index).copied()
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = Landmark> + Clone + '_ {
        self.landmarks.iter().copied()
    }

    /// Returns the normalized X/Y position of every landmark, in order.
    pub fn points(&self) -> impl ExactSizeIterator<Item = Point2D> + '_ {
        self.landmarks.iter().map(Landmark::point)
    }

    pub fn as_slice(&self) -> &[Landmark] {
        &self.landmarks
    }
}

impl FromIterator<Landmark> for Landmarks {
    fn from_iter<T: IntoIterator<Item = Landmark>>(iter: T) -> Self {
        Self {
            landmarks: iter.into_iter().collect(),
        }
    }
}

/// A scored category, as used for face blendshapes.
#[derive(Debug, Clone, PartialEq)]
pub struct Category {
    pub index: usize,
    pub score: f32,
    pub name: Option<String>,
}

/// A list of classification results.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Classifications {
    pub categories: Vec<Category>,
}

/// Index of the `jawOpen` blendshape in the face blendshape list.
const JAW_OPEN_INDEX: usize = 25;

/// Output of one holistic landmarker invocation.
///
/// Any of the landmark lists may be empty when the corresponding body part was not found.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HolisticResult {
    pub pose_landmarks: Landmarks,
    /// Pose landmarks in metric world space, centered between the hips.
    pub pose_world_landmarks: Landmarks,
    pub face_landmarks: Landmarks,
    pub left_hand_landmarks: Landmarks,
    pub right_hand_landmarks: Landmarks,
    pub face_blendshapes: Option<Classifications>,
}

impl HolisticResult {
    /// Returns whether a pose was detected.
    ///
    /// Results without a pose do not produce an overlay.
    pub fn has_pose(&self) -> bool {
        !self.pose_landmarks.is_empty()
    }

    /// Returns the `jawOpen` blendshape score.
    ///
    /// Returns `None` if blendshapes were not requested or the list is too short.
    pub fn jaw_open_score(&self) -> Option<f32> {
        self.face_blendshapes
            .as_ref()?
            .categories
            .get(JAW_OPEN_INDEX)
            .map(|c| c.score)
    }

    /// Logs world landmarks and the jaw-open score at *debug* level.
    pub fn log_diagnostics(&self) {
        if self.pose_world_landmarks.is_empty() {
            log::debug!("world landmarks are empty");
        } else {
            for (i, lm) in self.pose_world_landmarks.iter().enumerate() {
                log::debug!(
                    "world landmark {i}: x={} y={} z={} visibility={:?}",
                    lm.x(),
                    lm.y(),
                    lm.z(),
                    lm.visibility()
                );
            }
        }

        match (&self.face_blendshapes, self.jaw_open_score()) {
            (_, Some(score)) => log::debug!("jaw open score: {score}"),
            (Some(_), None) => log::debug!("jaw open blendshape not available"),
            (None, None) => log::debug!("face blendshapes not available"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blendshapes(n: usize) -> Classifications {
        Classifications {
            categories: (0..n)
                .map(|index| Category {
                    index,
                    score: index as f32 / 100.0,
                    name: None,
                })
                .collect(),
        }
    }

    #[test]
    fn jaw_open_score() {
        let mut result = HolisticResult::default();
        assert_eq!(result.jaw_open_score(), None);

        result.face_blendshapes = Some(blendshapes(25));
        assert_eq!(result.jaw_open_score(), None);

        result.face_blendshapes = Some(blendshapes(52));
        assert_eq!(result.jaw_open_score(), Some(0.25));
    }

    #[test]
    fn landmark_accessors() {
        let lm = Landmark::new([0.1, 0.2, -0.3])
            .with_visibility(0.9)
            .with_presence(0.8);
        assert_eq!(lm.point(), Point2D::new(0.1, 0.2));
        assert_eq!(lm.z(), -0.3);
        assert_eq!(lm.visibility(), Some(0.9));
        assert_eq!(lm.presence(), Some(0.8));
        assert_eq!(Landmark::new([0.0; 3]).visibility(), None);
    }

    #[test]
    fn landmarks_preserve_order() {
        let lms = Landmarks::from_positions([[0.1, 0.1, 0.0], [0.5, 0.6, 0.0], [0.9, 0.2, 0.0]]);
        assert_eq!(lms.len(), 3);
        assert!(!lms.is_empty());
        assert_eq!(lms.get(1).map(|lm| lm.y()), Some(0.6));
        assert_eq!(lms.get(3), None);
        let xs: Vec<f32> = lms.points().map(|p| p.x).collect();
        assert_eq!(xs, [0.1, 0.5, 0.9]);
    }
}
