use serde::{Deserialize, Serialize};

/// The 17 COCO / MoveNet body landmarks, in model output order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(usize)]
pub enum Landmark {
    Nose = 0,
    LeftEye = 1,
    RightEye = 2,
    LeftEar = 3,
    RightEar = 4,
    LeftShoulder = 5,
    RightShoulder = 6,
    LeftElbow = 7,
    RightElbow = 8,
    LeftWrist = 9,
    RightWrist = 10,
    LeftHip = 11,
    RightHip = 12,
    LeftKnee = 13,
    RightKnee = 14,
    LeftAnkle = 15,
    RightAnkle = 16,
}

impl Landmark {
    pub const COUNT: usize = 17;

    pub const ALL: [Landmark; Landmark::COUNT] = [
        Self::Nose,
        Self::LeftEye,
        Self::RightEye,
        Self::LeftEar,
        Self::RightEar,
        Self::LeftShoulder,
        Self::RightShoulder,
        Self::LeftElbow,
        Self::RightElbow,
        Self::LeftWrist,
        Self::RightWrist,
        Self::LeftHip,
        Self::RightHip,
        Self::LeftKnee,
        Self::RightKnee,
        Self::LeftAnkle,
        Self::RightAnkle,
    ];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn index(self) -> usize {
        self as usize
    }

    /// Short label drawn next to the joint, for the landmarks the overlay annotates
    pub fn label(self) -> Option<&'static str> {
        match self {
            Self::LeftShoulder => Some("L-Shoulder"),
            Self::RightShoulder => Some("R-Shoulder"),
            Self::LeftHip => Some("L-Hip"),
            Self::RightHip => Some("R-Hip"),
            Self::LeftKnee => Some("L-Knee"),
            Self::RightKnee => Some("R-Knee"),
            Self::LeftAnkle => Some("L-Ankle"),
            Self::RightAnkle => Some("R-Ankle"),
            _ => None,
        }
    }
}

/// One estimated landmark position in image pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keypoint {
    pub x: f32,
    pub y: f32,
    /// Detection confidence (0.0 to 1.0). MoveNet calls this `score`.
    #[serde(alias = "score")]
    pub confidence: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<Landmark>,
}

impl Keypoint {
    pub fn new(x: f32, y: f32, confidence: f32) -> Self {
        Self {
            x,
            y,
            confidence,
            name: None,
        }
    }

    pub fn named(landmark: Landmark, x: f32, y: f32, confidence: f32) -> Self {
        Self {
            x,
            y,
            confidence,
            name: Some(landmark),
        }
    }

    /// Confidence at or above the threshold
    pub fn is_valid(&self, threshold: f32) -> bool {
        self.confidence >= threshold
    }
}

/// All keypoints for one detected subject in one frame.
///
/// Keypoints are positional: index `i` is `Landmark::from_index(i)`. A pose
/// shorter than 17 entries simply has its trailing landmarks absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pose {
    keypoints: Vec<Keypoint>,
}

impl Pose {
    pub fn new(keypoints: Vec<Keypoint>) -> Self {
        Self { keypoints }
    }

    pub fn get(&self, landmark: Landmark) -> Option<&Keypoint> {
        self.keypoints.get(landmark.index())
    }

    pub fn keypoints(&self) -> &[Keypoint] {
        &self.keypoints
    }

    /// Iterate over keypoints that map onto the landmark schema
    pub fn landmarks(&self) -> impl Iterator<Item = (Landmark, &Keypoint)> {
        self.keypoints
            .iter()
            .enumerate()
            .filter_map(|(i, kp)| Landmark::from_index(i).map(|lm| (lm, kp)))
    }

    pub fn is_empty(&self) -> bool {
        self.keypoints.is_empty()
    }

    pub fn len(&self) -> usize {
        self.keypoints.len()
    }
}
