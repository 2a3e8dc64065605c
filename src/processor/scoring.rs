//! Per-channel sub-scores
//!
//! Each function maps one aspect of a filtered [`SignalBundle`] to a 0-1 score
//! (higher = more consistent with attentive engagement) and appends any
//! diagnostic flags it raises. Missing or low-confidence evidence resolves to a
//! documented neutral value, never to an error.

use crate::processor::config::ProcessorThresholds;
use crate::types::{DiagnosticFlag, SignalBundle};

/// Score for a channel without enough evidence either way
pub const NEUTRAL_SCORE: f64 = 0.5;

/// Weight of the gaze stability bonus
const GAZE_STABILITY_BONUS: f64 = 0.2;
/// Weight of the head-pose stability bonus
const HEAD_STABILITY_BONUS: f64 = 0.15;
/// Weights of the environment components
const LIGHTING_WEIGHT: f64 = 0.4;
const SHADOW_WEIGHT: f64 = 0.4;
const PRESENCE_PENALTY_WEIGHT: f64 = 0.2;
const LIGHTING_STABILITY_BONUS: f64 = 0.1;

pub(crate) fn push_flag(flags: &mut Vec<DiagnosticFlag>, flag: DiagnosticFlag) {
    if !flags.contains(&flag) {
        flags.push(flag);
    }
}

/// Gaze score
///
/// Formula: `max(0, 1 − angle / angle_threshold) · confidence + stability · 0.2`,
/// clamped to 0-1. Zero without a face or below the confidence threshold.
pub fn compute_gaze_score(
    bundle: &SignalBundle,
    thresholds: &ProcessorThresholds,
    flags: &mut Vec<DiagnosticFlag>,
) -> f64 {
    if !bundle.face_detected {
        push_flag(flags, DiagnosticFlag::FaceNotDetected);
        return 0.0;
    }

    if bundle.stability.gaze < thresholds.unstable_gaze {
        push_flag(flags, DiagnosticFlag::UnstableGaze);
    }

    let gaze = &bundle.gaze;
    if gaze.confidence < thresholds.gaze_confidence {
        push_flag(flags, DiagnosticFlag::LowGazeConfidence);
        return 0.0;
    }

    let angle = gaze.angle_from_forward_deg();
    if angle > thresholds.gaze_angle_deg {
        push_flag(flags, DiagnosticFlag::GazeOffScreen);
    }

    let alignment = (1.0 - angle / thresholds.gaze_angle_deg).max(0.0);
    let score = (alignment * gaze.confidence + bundle.stability.gaze * GAZE_STABILITY_BONUS)
        .clamp(0.0, 1.0);

    if score < thresholds.low_gaze_score {
        push_flag(flags, DiagnosticFlag::LowGazeScore);
    }
    score
}

/// Head-pose score
///
/// Formula: `mean(1 − |yaw|/yaw_max, 1 − |pitch|/pitch_max) · confidence + stability · 0.15`,
/// each axis floored at 0, result clamped to 0-1. Neutral below the confidence
/// threshold. Bound violations are flagged regardless of confidence.
pub fn compute_head_pose_score(
    bundle: &SignalBundle,
    thresholds: &ProcessorThresholds,
    flags: &mut Vec<DiagnosticFlag>,
) -> f64 {
    let pose = &bundle.head_pose;

    if pose.yaw.abs() > thresholds.yaw_max_deg {
        push_flag(flags, DiagnosticFlag::HeadYawOutOfBounds);
    }
    if pose.pitch.abs() > thresholds.pitch_max_deg {
        push_flag(flags, DiagnosticFlag::HeadPitchOutOfBounds);
    }

    if pose.confidence < thresholds.head_pose_confidence {
        push_flag(flags, DiagnosticFlag::LowHeadPoseConfidence);
        return NEUTRAL_SCORE;
    }

    let yaw_score = (1.0 - pose.yaw.abs() / thresholds.yaw_max_deg).max(0.0);
    let pitch_score = (1.0 - pose.pitch.abs() / thresholds.pitch_max_deg).max(0.0);
    let axis_score = (yaw_score + pitch_score) / 2.0;

    (axis_score * pose.confidence + bundle.stability.head_pose * HEAD_STABILITY_BONUS)
        .clamp(0.0, 1.0)
}

/// Lighting adequacy: 1 inside the configured range, otherwise a linear penalty
/// by distance from the range centre
pub fn compute_lighting_score(lighting: f64, thresholds: &ProcessorThresholds) -> f64 {
    if lighting >= thresholds.lighting_min && lighting <= thresholds.lighting_max {
        return 1.0;
    }
    let center = (thresholds.lighting_min + thresholds.lighting_max) / 2.0;
    (1.0 - (lighting - center).abs() / center).clamp(0.0, 1.0)
}

/// Environment score
///
/// Formula:
/// ```text
/// Environment = 0.4 * lighting_score
///             + 0.4 * shadow_stability
///             − 0.2 * mean(secondary_face / threshold, device_object / threshold)
///             + 0.1 * lighting_stability
/// ```
/// Presence ratios are capped at 1; the result is clamped to 0-1.
pub fn compute_environment_score(
    bundle: &SignalBundle,
    thresholds: &ProcessorThresholds,
    flags: &mut Vec<DiagnosticFlag>,
) -> f64 {
    let env = &bundle.environment;

    let lighting_score = compute_lighting_score(env.lighting, thresholds);
    if lighting_score < 1.0 {
        push_flag(flags, DiagnosticFlag::PoorLighting);
    }

    if env.secondary_face >= thresholds.secondary_face {
        push_flag(flags, DiagnosticFlag::SecondaryFaceDetected);
    }
    if env.device_object >= thresholds.device_object {
        push_flag(flags, DiagnosticFlag::DeviceLikeObjectDetected);
    }

    let face_ratio = (env.secondary_face / thresholds.secondary_face).clamp(0.0, 1.0);
    let device_ratio = (env.device_object / thresholds.device_object).clamp(0.0, 1.0);
    let presence_penalty = (face_ratio + device_ratio) / 2.0 * PRESENCE_PENALTY_WEIGHT;

    (lighting_score * LIGHTING_WEIGHT
        + env.shadow_stability.clamp(0.0, 1.0) * SHADOW_WEIGHT
        - presence_penalty
        + bundle.stability.lighting * LIGHTING_STABILITY_BONUS)
        .clamp(0.0, 1.0)
}

/// Temporal-consistency score
///
/// Formula: `0.4 * positive_ratio + 0.3 * confidence_stability + 0.3 * motion_stability`
pub fn compute_temporal_score(
    positive_ratio: f64,
    confidence_stability: f64,
    motion_stability: f64,
) -> f64 {
    (positive_ratio * 0.4 + confidence_stability * 0.3 + motion_stability * 0.3).clamp(0.0, 1.0)
}

/// Input quality: mean of gaze and head-pose confidence, 0 without a face
pub fn compute_signal_quality(bundle: &SignalBundle) -> f64 {
    if !bundle.face_detected {
        return 0.0;
    }
    ((bundle.gaze.confidence + bundle.head_pose.confidence) / 2.0).clamp(0.0, 1.0)
}
