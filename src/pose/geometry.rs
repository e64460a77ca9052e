//! Joint angle calculation using the dot product
//!
//! cos(θ) = (v1 · v2) / (|v1| × |v2|), with v1 = a − b and v2 = c − b.

use super::keypoint::Keypoint;

/// Keypoints below this confidence are treated as unmeasurable
pub const MIN_CONFIDENCE: f32 = 0.3;

/// Angle in degrees at vertex `b`, or `None` when it cannot be measured.
///
/// Unmeasurable means an input is absent, any confidence is below
/// [`MIN_CONFIDENCE`], or either vector has zero length.
pub fn angle_at(a: Option<&Keypoint>, b: Option<&Keypoint>, c: Option<&Keypoint>) -> Option<f32> {
    let (a, b, c) = (a?, b?, c?);
    if !a.is_valid(MIN_CONFIDENCE) || !b.is_valid(MIN_CONFIDENCE) || !c.is_valid(MIN_CONFIDENCE) {
        return None;
    }

    let ab = (a.x - b.x, a.y - b.y);
    let cb = (c.x - b.x, c.y - b.y);

    let dot = ab.0 * cb.0 + ab.1 * cb.1;
    let mag = ab.0.hypot(ab.1) * cb.0.hypot(cb.1);
    if mag == 0.0 {
        return None;
    }

    // Rounding can push the ratio just past ±1
    let cos_angle = (dot / mag).clamp(-1.0, 1.0);
    Some(cos_angle.acos().to_degrees())
}
