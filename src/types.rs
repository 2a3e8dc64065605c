//! Core data types
//!
//! Per-frame signals flow in as [`RawSignalFrame`]s, are filtered into
//! [`SignalBundle`]s, and are fused into one [`DecisionResult`] per frame.
//! Discrete violations travel separately as [`FlagEvent`]s.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Head orientation in degrees
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct HeadPose {
    /// Left/right rotation (degrees, 0 = facing the screen)
    pub yaw: f64,
    /// Up/down rotation (degrees, 0 = facing the screen)
    pub pitch: f64,
    /// Tilt (degrees)
    pub roll: f64,
    /// Estimator confidence (0-1)
    pub confidence: f64,
}

/// Gaze direction in camera space; +z points from the subject towards the screen
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GazeVector {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    /// Estimator confidence (0-1)
    pub confidence: f64,
}

impl GazeVector {
    pub fn magnitude(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// Angle between the gaze and the screen-forward axis, in degrees.
    ///
    /// A zero-magnitude vector carries no direction and reports 90°.
    pub fn angle_from_forward_deg(&self) -> f64 {
        let magnitude = self.magnitude();
        if magnitude <= f64::EPSILON || !magnitude.is_finite() {
            return 90.0;
        }
        (self.z / magnitude).clamp(-1.0, 1.0).acos().to_degrees()
    }
}

/// Scene measurements from the environment estimator, all in 0-1
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentReading {
    /// Overall illumination level
    pub lighting: f64,
    /// How steady shadows on the face are (1 = perfectly steady)
    pub shadow_stability: f64,
    /// Likelihood that a second face is present
    pub secondary_face: f64,
    /// Likelihood that a phone/tablet-like object is present
    pub device_object: f64,
}

impl Default for EnvironmentReading {
    fn default() -> Self {
        Self {
            lighting: 0.6,
            shadow_stability: 1.0,
            secondary_face: 0.0,
            device_object: 0.0,
        }
    }
}

/// Per-channel stability derived by the temporal filter (0-1, higher = steadier)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelStability {
    pub gaze: f64,
    pub head_pose: f64,
    pub lighting: f64,
}

impl Default for ChannelStability {
    fn default() -> Self {
        Self {
            gaze: 1.0,
            head_pose: 1.0,
            lighting: 1.0,
        }
    }
}

/// One unfiltered frame from the vision estimators
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawSignalFrame {
    pub timestamp: DateTime<Utc>,
    pub face_detected: bool,
    pub head_pose: HeadPose,
    pub gaze: GazeVector,
    #[serde(default)]
    pub environment: EnvironmentReading,
}

/// One filtered frame, ready for decision fusion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalBundle {
    pub timestamp: DateTime<Utc>,
    pub face_detected: bool,
    pub head_pose: HeadPose,
    pub gaze: GazeVector,
    pub environment: EnvironmentReading,
    #[serde(default)]
    pub stability: ChannelStability,
}

/// Diagnostic tags attached to a decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticFlag {
    FaceNotDetected,
    LowGazeConfidence,
    GazeOffScreen,
    LowGazeScore,
    UnstableGaze,
    LowHeadPoseConfidence,
    HeadYawOutOfBounds,
    HeadPitchOutOfBounds,
    PoorLighting,
    SecondaryFaceDetected,
    DeviceLikeObjectDetected,
    InsufficientHistory,
}

impl DiagnosticFlag {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticFlag::FaceNotDetected => "face_not_detected",
            DiagnosticFlag::LowGazeConfidence => "low_gaze_confidence",
            DiagnosticFlag::GazeOffScreen => "gaze_off_screen",
            DiagnosticFlag::LowGazeScore => "low_gaze_score",
            DiagnosticFlag::UnstableGaze => "unstable_gaze",
            DiagnosticFlag::LowHeadPoseConfidence => "low_head_pose_confidence",
            DiagnosticFlag::HeadYawOutOfBounds => "head_yaw_out_of_bounds",
            DiagnosticFlag::HeadPitchOutOfBounds => "head_pitch_out_of_bounds",
            DiagnosticFlag::PoorLighting => "poor_lighting",
            DiagnosticFlag::SecondaryFaceDetected => "secondary_face_detected",
            DiagnosticFlag::DeviceLikeObjectDetected => "device_like_object_detected",
            DiagnosticFlag::InsufficientHistory => "insufficient_history",
        }
    }
}

impl fmt::Display for DiagnosticFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Score, weight and weighted contribution of one channel
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelScore {
    pub score: f64,
    pub weight: f64,
    /// Always `score * weight`
    pub contribution: f64,
}

impl ChannelScore {
    pub fn new(score: f64, weight: f64) -> Self {
        Self {
            score,
            weight,
            contribution: score * weight,
        }
    }
}

/// Per-channel breakdown of a fused decision
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DecisionBreakdown {
    pub gaze: ChannelScore,
    pub head_pose: ChannelScore,
    pub environment: ChannelScore,
    pub temporal: ChannelScore,
}

impl DecisionBreakdown {
    /// Sum of all contributions
    pub fn weighted_score(&self) -> f64 {
        self.gaze.contribution
            + self.head_pose.contribution
            + self.environment.contribution
            + self.temporal.contribution
    }
}

/// Diagnostics about how a decision was produced
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DecisionMetadata {
    /// Wall time spent fusing the frame
    pub processing_time_ms: f64,
    /// Input quality (0-1)
    pub signal_quality: f64,
    /// Temporal-consistency sub-score (0-1)
    pub temporal_consistency: f64,
}

/// One frame's fused attention judgment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionResult {
    pub timestamp: DateTime<Utc>,
    pub is_attentive: bool,
    /// Overall confidence (0-1)
    pub confidence: f64,
    pub breakdown: DecisionBreakdown,
    pub flags: Vec<DiagnosticFlag>,
    pub metadata: DecisionMetadata,
}

impl DecisionResult {
    pub fn has_flag(&self, flag: DiagnosticFlag) -> bool {
        self.flags.contains(&flag)
    }
}

/// Named violation types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagType {
    EyesOff,
    HeadPose,
    TabBlur,
    SecondFace,
    DeviceObject,
    ShadowAnomaly,
    FaceMissing,
    DownGlance,
    IntegrityViolation,
    FullscreenExit,
}

impl FlagType {
    pub const ALL: [FlagType; 10] = [
        FlagType::EyesOff,
        FlagType::HeadPose,
        FlagType::TabBlur,
        FlagType::SecondFace,
        FlagType::DeviceObject,
        FlagType::ShadowAnomaly,
        FlagType::FaceMissing,
        FlagType::DownGlance,
        FlagType::IntegrityViolation,
        FlagType::FullscreenExit,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FlagType::EyesOff => "eyes_off",
            FlagType::HeadPose => "head_pose",
            FlagType::TabBlur => "tab_blur",
            FlagType::SecondFace => "second_face",
            FlagType::DeviceObject => "device_object",
            FlagType::ShadowAnomaly => "shadow_anomaly",
            FlagType::FaceMissing => "face_missing",
            FlagType::DownGlance => "down_glance",
            FlagType::IntegrityViolation => "integrity_violation",
            FlagType::FullscreenExit => "fullscreen_exit",
        }
    }

    /// Whether risk points scale with how long the condition persisted
    pub fn is_duration_sensitive(&self) -> bool {
        matches!(self, FlagType::EyesOff | FlagType::FaceMissing)
    }
}

impl fmt::Display for FlagType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Flag severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Soft,
    Hard,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Soft => "soft",
            Severity::Hard => "hard",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A discrete violation occurrence.
///
/// The same conceptual violation may arrive many times; consumers treat every
/// occurrence independently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlagEvent {
    #[serde(rename = "type")]
    pub flag_type: FlagType,
    pub severity: Severity,
    /// Upstream confidence in the violation (0-1)
    pub confidence: f64,
    /// How long the condition persisted, for duration-sensitive types
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    /// Scope (e.g. exam question) the violation belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question_id: Option<String>,
}

impl FlagEvent {
    /// Full-confidence flag with no duration or scope
    pub fn new(flag_type: FlagType, severity: Severity) -> Self {
        Self {
            flag_type,
            severity,
            confidence: 1.0,
            duration_ms: None,
            question_id: None,
        }
    }

    pub fn soft(flag_type: FlagType) -> Self {
        Self::new(flag_type, Severity::Soft)
    }

    pub fn hard(flag_type: FlagType) -> Self {
        Self::new(flag_type, Severity::Hard)
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    pub fn with_question(mut self, question_id: impl Into<String>) -> Self {
        self.question_id = Some(question_id.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_type_serialization() {
        let json = serde_json::to_string(&FlagType::IntegrityViolation).unwrap();
        assert_eq!(json, "\"integrity_violation\"");

        let parsed: FlagType = serde_json::from_str("\"second_face\"").unwrap();
        assert_eq!(parsed, FlagType::SecondFace);
    }

    #[test]
    fn test_flag_type_as_str_matches_serde() {
        for flag_type in FlagType::ALL {
            let json = serde_json::to_string(&flag_type).unwrap();
            assert_eq!(json, format!("\"{}\"", flag_type.as_str()));
        }
    }

    #[test]
    fn test_diagnostic_flag_as_str_matches_serde() {
        let json = serde_json::to_string(&DiagnosticFlag::DeviceLikeObjectDetected).unwrap();
        assert_eq!(json, "\"device_like_object_detected\"");
        assert_eq!(
            DiagnosticFlag::HeadYawOutOfBounds.to_string(),
            "head_yaw_out_of_bounds"
        );
    }

    #[test]
    fn test_flag_event_deserialization() {
        let json = r#"{
            "type": "eyes_off",
            "severity": "soft",
            "confidence": 0.8,
            "duration_ms": 2500,
            "question_id": "q-7"
        }"#;

        let flag: FlagEvent = serde_json::from_str(json).unwrap();
        assert_eq!(flag.flag_type, FlagType::EyesOff);
        assert_eq!(flag.severity, Severity::Soft);
        assert_eq!(flag.duration_ms, Some(2500));
        assert_eq!(flag.question_id.as_deref(), Some("q-7"));
    }

    #[test]
    fn test_flag_event_builders() {
        let flag = FlagEvent::hard(FlagType::TabBlur)
            .with_confidence(0.4)
            .with_question("q-1");
        assert_eq!(flag.severity, Severity::Hard);
        assert!((flag.confidence - 0.4).abs() < f64::EPSILON);
        assert_eq!(flag.question_id.as_deref(), Some("q-1"));
        assert!(flag.duration_ms.is_none());
    }

    #[test]
    fn test_duration_sensitive_types() {
        assert!(FlagType::EyesOff.is_duration_sensitive());
        assert!(FlagType::FaceMissing.is_duration_sensitive());
        assert!(!FlagType::SecondFace.is_duration_sensitive());
        assert!(!FlagType::DownGlance.is_duration_sensitive());
    }

    #[test]
    fn test_gaze_angle() {
        let forward = GazeVector {
            x: 0.0,
            y: 0.0,
            z: 1.0,
            confidence: 1.0,
        };
        assert!(forward.angle_from_forward_deg().abs() < 1e-9);

        let sideways = GazeVector {
            x: 1.0,
            y: 0.0,
            z: 0.0,
            confidence: 1.0,
        };
        assert!((sideways.angle_from_forward_deg() - 90.0).abs() < 1e-9);

        let diagonal = GazeVector {
            x: 1.0,
            y: 0.0,
            z: 1.0,
            confidence: 1.0,
        };
        assert!((diagonal.angle_from_forward_deg() - 45.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_gaze_vector_is_maximum_deviation() {
        let zero = GazeVector::default();
        assert!((zero.angle_from_forward_deg() - 90.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_channel_score_contribution() {
        let channel = ChannelScore::new(0.8, 0.25);
        assert!((channel.contribution - 0.2).abs() < 1e-12);
    }
}
