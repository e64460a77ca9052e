//! Overlay composition: skeleton, joints and metric readout for one frame.
//!
//! Produces a display list only. Drawing it onto a canvas is the platform's
//! job, and nothing here mutates the pose or metrics it reads.

use serde::Serialize;

use crate::pose::{FormMetrics, FormQuality, Landmark, Pose};

/// Keypoints must exceed this confidence to be drawn
pub const DRAW_CONFIDENCE: f32 = 0.3;

pub const NO_SUBJECT_MESSAGE: &str = "Please step into view";

/// Bone connections drawn between landmarks (arms, torso, legs)
pub const SKELETON_CONNECTIONS: [(Landmark, Landmark); 12] = [
    // arms
    (Landmark::LeftShoulder, Landmark::LeftElbow),
    (Landmark::LeftElbow, Landmark::LeftWrist),
    (Landmark::RightShoulder, Landmark::RightElbow),
    (Landmark::RightElbow, Landmark::RightWrist),
    // torso
    (Landmark::LeftShoulder, Landmark::RightShoulder),
    (Landmark::LeftShoulder, Landmark::LeftHip),
    (Landmark::RightShoulder, Landmark::RightHip),
    (Landmark::LeftHip, Landmark::RightHip),
    // legs
    (Landmark::LeftHip, Landmark::LeftKnee),
    (Landmark::LeftKnee, Landmark::LeftAnkle),
    (Landmark::RightHip, Landmark::RightKnee),
    (Landmark::RightKnee, Landmark::RightAnkle),
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bone {
    pub from: (f32, f32),
    pub to: (f32, f32),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Joint {
    pub landmark: Landmark,
    pub at: (f32, f32),
    pub label: Option<&'static str>,
}

/// Rounded values for the on-screen metrics panel
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsReadout {
    pub left_knee: i32,
    pub right_knee: i32,
    pub back: i32,
    pub stance_width: i32,
    pub quality: FormQuality,
}

impl MetricsReadout {
    pub fn from_metrics(metrics: &FormMetrics) -> Self {
        Self {
            left_knee: metrics.left_knee_angle.round() as i32,
            right_knee: metrics.right_knee_angle.round() as i32,
            back: metrics.back_angle.round() as i32,
            stance_width: metrics.hip_width.round() as i32,
            quality: metrics.quality(),
        }
    }

    pub fn lines(&self) -> Vec<String> {
        vec![
            format!("Left Knee: {}°", self.left_knee),
            format!("Right Knee: {}°", self.right_knee),
            format!("Back Angle: {}°", self.back),
            format!("Stance Width: {}px", self.stance_width),
            format!("Form: {}", self.quality.label()),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Overlay {
    NoSubject {
        message: &'static str,
    },
    Skeleton {
        bones: Vec<Bone>,
        joints: Vec<Joint>,
        readout: Option<MetricsReadout>,
    },
}

impl Overlay {
    pub fn is_subject_visible(&self) -> bool {
        matches!(self, Overlay::Skeleton { .. })
    }
}

/// Build the overlay for one frame
pub fn compose(pose: Option<&Pose>, metrics: Option<&FormMetrics>) -> Overlay {
    let Some(pose) = pose.filter(|p| !p.is_empty()) else {
        return Overlay::NoSubject {
            message: NO_SUBJECT_MESSAGE,
        };
    };

    let visible = |lm: Landmark| pose.get(lm).filter(|kp| kp.confidence > DRAW_CONFIDENCE);

    let bones = SKELETON_CONNECTIONS
        .iter()
        .filter_map(|&(a, b)| {
            let (a, b) = (visible(a)?, visible(b)?);
            Some(Bone {
                from: (a.x, a.y),
                to: (b.x, b.y),
            })
        })
        .collect();

    let joints = pose
        .landmarks()
        .filter(|(_, kp)| kp.confidence > DRAW_CONFIDENCE)
        .map(|(lm, kp)| Joint {
            landmark: lm,
            at: (kp.x, kp.y),
            label: lm.label(),
        })
        .collect();

    Overlay::Skeleton {
        bones,
        joints,
        readout: metrics.map(MetricsReadout::from_metrics),
    }
}
