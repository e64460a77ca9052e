//! Pose data, joint geometry and form metrics

pub mod geometry;
pub mod keypoint;
pub mod metrics;

pub use geometry::{MIN_CONFIDENCE, angle_at};
pub use keypoint::{Keypoint, Landmark, Pose};
pub use metrics::{FormMetrics, FormQuality, HipWidthPolicy, MetricsExtractor};
