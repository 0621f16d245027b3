//! Skeleton connectivity tables.
//!
//! A [`Topology`] lists which landmark indices are joined by a line when drawing the overlay.
//! The tables match the landmark layout of the holistic landmarker's pose, hand and face
//! outputs.

/// Ordered `(start, end)` landmark index pairs.
pub type Topology = &'static [(usize, usize)];

/// Returns the largest index referenced by `topology`, or `None` if it is empty.
pub fn max_index(topology: &[(usize, usize)]) -> Option<usize> {
    topology.iter().map(|&(a, b)| a.max(b)).max()
}

pub mod pose {
    //! Body pose landmarks (33 points).

    /// Number of landmarks output per pose.
    pub const NUM_LANDMARKS: usize = 33;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum LandmarkIdx {
        Nose = 0,
        LeftEyeInner = 1,
        LeftEye = 2,
        LeftEyeOuter = 3,
        RightEyeInner = 4,
        RightEye = 5,
        RightEyeOuter = 6,
        LeftEar = 7,
        RightEar = 8,
        MouthLeft = 9,
        MouthRight = 10,
        LeftShoulder = 11,
        RightShoulder = 12,
        LeftElbow = 13,
        RightElbow = 14,
        LeftWrist = 15,
        RightWrist = 16,
        LeftPinky = 17,
        RightPinky = 18,
        LeftIndex = 19,
        RightIndex = 20,
        LeftThumb = 21,
        RightThumb = 22,
        LeftHip = 23,
        RightHip = 24,
        LeftKnee = 25,
        RightKnee = 26,
        LeftAnkle = 27,
        RightAnkle = 28,
        LeftHeel = 29,
        RightHeel = 30,
        LeftFootIndex = 31,
        RightFootIndex = 32,
    }

    /// Full-body skeleton, including face and fingers.
    pub const CONNECTIONS: super::Topology = {
        use LandmarkIdx::*;
        &[
            // Face:
            (Nose as usize, LeftEyeInner as usize),
            (LeftEyeInner as usize, LeftEye as usize),
            (LeftEye as usize, LeftEyeOuter as usize),
            (LeftEyeOuter as usize, LeftEar as usize),
            (Nose as usize, RightEyeInner as usize),
            (RightEyeInner as usize, RightEye as usize),
            (RightEye as usize, RightEyeOuter as usize),
            (RightEyeOuter as usize, RightEar as usize),
            (MouthLeft as usize, MouthRight as usize),
            // Torso and arms:
            (LeftShoulder as usize, RightShoulder as usize),
            (LeftShoulder as usize, LeftElbow as usize),
            (LeftElbow as usize, LeftWrist as usize),
            (LeftWrist as usize, LeftPinky as usize),
            (LeftWrist as usize, LeftIndex as usize),
            (LeftWrist as usize, LeftThumb as usize),
            (LeftPinky as usize, LeftIndex as usize),
            (RightShoulder as usize, RightElbow as usize),
            (RightElbow as usize, RightWrist as usize),
            (RightWrist as usize, RightPinky as usize),
            (RightWrist as usize, RightIndex as usize),
            (RightWrist as usize, RightThumb as usize),
            (RightPinky as usize, RightIndex as usize),
            (LeftShoulder as usize, LeftHip as usize),
            (RightShoulder as usize, RightHip as usize),
            (LeftHip as usize, RightHip as usize),
            // Legs:
            (LeftHip as usize, LeftKnee as usize),
            (RightHip as usize, RightKnee as usize),
            (LeftKnee as usize, LeftAnkle as usize),
            (RightKnee as usize, RightAnkle as usize),
            (LeftAnkle as usize, LeftHeel as usize),
            (RightAnkle as usize, RightHeel as usize),
            (LeftHeel as usize, LeftFootIndex as usize),
            (RightHeel as usize, RightFootIndex as usize),
            (LeftAnkle as usize, LeftFootIndex as usize),
            (RightAnkle as usize, RightFootIndex as usize),
        ]
    };
}

pub mod hand {
    //! Hand landmarks (21 points).

    pub const NUM_LANDMARKS: usize = 21;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum LandmarkIdx {
        Wrist = 0,
        ThumbCmc = 1,
        ThumbMcp = 2,
        ThumbIp = 3,
        ThumbTip = 4,
        IndexFingerMcp = 5,
        IndexFingerPip = 6,
        IndexFingerDip = 7,
        IndexFingerTip = 8,
        MiddleFingerMcp = 9,
        MiddleFingerPip = 10,
        MiddleFingerDip = 11,
        MiddleFingerTip = 12,
        RingFingerMcp = 13,
        RingFingerPip = 14,
        RingFingerDip = 15,
        RingFingerTip = 16,
        PinkyMcp = 17,
        PinkyPip = 18,
        PinkyDip = 19,
        PinkyTip = 20,
    }

    pub const CONNECTIONS: super::Topology = {
        use LandmarkIdx::*;
        &[
            // Surround the palm:
            (Wrist as usize, ThumbCmc as usize),
            (Wrist as usize, IndexFingerMcp as usize),
            (IndexFingerMcp as usize, MiddleFingerMcp as usize),
            (MiddleFingerMcp as usize, RingFingerMcp as usize),
            (RingFingerMcp as usize, PinkyMcp as usize),
            (Wrist as usize, PinkyMcp as usize),
            // Thumb:
            (ThumbCmc as usize, ThumbMcp as usize),
            (ThumbMcp as usize, ThumbIp as usize),
            (ThumbIp as usize, ThumbTip as usize),
            // Index:
            (IndexFingerMcp as usize, IndexFingerPip as usize),
            (IndexFingerPip as usize, IndexFingerDip as usize),
            (IndexFingerDip as usize, IndexFingerTip as usize),
            // Middle:
            (MiddleFingerMcp as usize, MiddleFingerPip as usize),
            (MiddleFingerPip as usize, MiddleFingerDip as usize),
            (MiddleFingerDip as usize, MiddleFingerTip as usize),
            // Ring:
            (RingFingerMcp as usize, RingFingerPip as usize),
            (RingFingerPip as usize, RingFingerDip as usize),
            (RingFingerDip as usize, RingFingerTip as usize),
            // Pinky:
            (PinkyMcp as usize, PinkyPip as usize),
            (PinkyPip as usize, PinkyDip as usize),
            (PinkyDip as usize, PinkyTip as usize),
        ]
    };
}

pub mod face {
    //! Face mesh landmarks (468 points, 478 with irises).

    pub const NUM_LANDMARKS: usize = 468;

    /// Outline of the face.
    pub const OVAL: super::Topology = &[
        (10, 338),
        (338, 297),
        (297, 332),
        (332, 284),
        (284, 251),
        (251, 389),
        (389, 356),
        (356, 454),
        (454, 323),
        (323, 361),
        (361, 288),
        (288, 397),
        (397, 365),
        (365, 379),
        (379, 378),
        (378, 400),
        (400, 377),
        (377, 152),
        (152, 148),
        (148, 176),
        (176, 149),
        (149, 150),
        (150, 136),
        (136, 172),
        (172, 58),
        (58, 132),
        (132, 93),
        (93, 234),
        (234, 127),
        (127, 162),
        (162, 21),
        (21, 54),
        (54, 103),
        (103, 67),
        (67, 109),
        (109, 10),
    ];
}
