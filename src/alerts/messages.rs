//! Alert text per flag type and alert kind

use super::AlertKind;
use crate::types::FlagType;

/// Text shown for an alert raised by `flag_type`
pub fn alert_message(flag_type: FlagType, kind: AlertKind) -> &'static str {
    use AlertKind::{Hard, Soft};
    match (flag_type, kind) {
        (FlagType::EyesOff, Soft) => "Please keep your eyes on the screen.",
        (FlagType::EyesOff, Hard) => "Your eyes have been away from the screen repeatedly.",
        (FlagType::HeadPose, Soft) => "Please face the screen.",
        (FlagType::HeadPose, Hard) => "Your head has been turned away from the screen for too long.",
        (FlagType::TabBlur, Soft) => "Please stay on the exam window.",
        (FlagType::TabBlur, Hard) => "Leaving the exam window has been recorded.",
        (FlagType::SecondFace, Soft) => "Another person may be visible in the camera.",
        (FlagType::SecondFace, Hard) => "Another person has been detected in the camera.",
        (FlagType::DeviceObject, Soft) => "A device may be visible in the camera.",
        (FlagType::DeviceObject, Hard) => "A phone or other device has been detected.",
        (FlagType::ShadowAnomaly, Soft) => "Lighting on your face is changing unusually.",
        (FlagType::ShadowAnomaly, Hard) => "Unusual lighting changes have been recorded.",
        (FlagType::FaceMissing, Soft) => "Your face is not visible to the camera.",
        (FlagType::FaceMissing, Hard) => "Your face has been out of view for too long.",
        (FlagType::DownGlance, Soft) => "Please avoid looking down.",
        (FlagType::DownGlance, Hard) => "Repeated downward glances have been recorded.",
        (FlagType::IntegrityViolation, Soft) => "A possible integrity issue was detected.",
        (FlagType::IntegrityViolation, Hard) => "An integrity violation has been recorded.",
        (FlagType::FullscreenExit, Soft) => "Please return to fullscreen.",
        (FlagType::FullscreenExit, Hard) => "Leaving fullscreen has been recorded.",
    }
}
