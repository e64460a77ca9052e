//! Form metrics derived from a single pose

use serde::{Deserialize, Serialize};

use super::geometry::{MIN_CONFIDENCE, angle_at};
use super::keypoint::{Landmark, Pose};

/// Named form metrics for one frame.
///
/// Angles are degrees. An unmeasurable angle is reported as `0.0`, so `0.0`
/// alone does not distinguish a fully folded joint from missing data.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormMetrics {
    pub left_knee_angle: f32,
    pub right_knee_angle: f32,
    pub back_angle: f32,
    /// Horizontal hip-to-hip distance in pixels
    pub hip_width: f32,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
}

impl FormMetrics {
    pub fn average_knee_angle(&self) -> f32 {
        (self.left_knee_angle + self.right_knee_angle) / 2.0
    }

    pub fn quality(&self) -> FormQuality {
        FormQuality::from_knee_angle(self.average_knee_angle())
    }
}

/// Squat depth classification from the average knee angle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormQuality {
    DeepSquat,
    PerfectDepth,
    GoDeeper,
    Good,
}

impl FormQuality {
    pub fn from_knee_angle(angle: f32) -> Self {
        if angle < 90.0 {
            Self::DeepSquat
        } else if angle < 110.0 {
            Self::PerfectDepth
        } else if angle < 140.0 {
            Self::GoDeeper
        } else {
            Self::Good
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::DeepSquat => "Deep squat!",
            Self::PerfectDepth => "Perfect depth",
            Self::GoDeeper => "Go deeper",
            Self::Good => "Good",
        }
    }
}

/// Whether hip width honours the keypoint confidence threshold.
///
/// Angles are always gated. Hip width historically was not, so `Ungated`
/// stays the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HipWidthPolicy {
    #[default]
    Ungated,
    ConfidenceGated,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsExtractor {
    hip_width: HipWidthPolicy,
}

impl MetricsExtractor {
    pub fn new(hip_width: HipWidthPolicy) -> Self {
        Self { hip_width }
    }

    /// Extract metrics stamped with the current wall-clock time
    pub fn extract(&self, pose: &Pose) -> FormMetrics {
        self.extract_at(pose, chrono::Utc::now().timestamp_millis())
    }

    pub fn extract_at(&self, pose: &Pose, timestamp: i64) -> FormMetrics {
        let joint = |a: Landmark, b: Landmark, c: Landmark| {
            angle_at(pose.get(a), pose.get(b), pose.get(c)).unwrap_or(0.0)
        };

        FormMetrics {
            left_knee_angle: joint(Landmark::LeftHip, Landmark::LeftKnee, Landmark::LeftAnkle),
            right_knee_angle: joint(Landmark::RightHip, Landmark::RightKnee, Landmark::RightAnkle),
            back_angle: joint(Landmark::LeftShoulder, Landmark::LeftHip, Landmark::LeftKnee),
            hip_width: self.hip_width(pose),
            timestamp,
        }
    }

    fn hip_width(&self, pose: &Pose) -> f32 {
        let (Some(left), Some(right)) = (pose.get(Landmark::LeftHip), pose.get(Landmark::RightHip))
        else {
            return 0.0;
        };
        if self.hip_width == HipWidthPolicy::ConfidenceGated
            && (!left.is_valid(MIN_CONFIDENCE) || !right.is_valid(MIN_CONFIDENCE))
        {
            return 0.0;
        }
        (left.x - right.x).abs()
    }
}
