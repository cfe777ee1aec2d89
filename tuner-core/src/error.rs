//! Errors raised while opening the microphone.
//!
//! The detection pipeline itself never fails; only capture can.

use thiserror::Error;

/// Why audio capture could not be started.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("Microphone access was denied")]
    PermissionDenied,

    #[error("No microphone available")]
    NoMicrophone,

    #[error("Audio capture is not supported: {0}")]
    NotSupported(String),

    #[error("Audio capture failed: {0}")]
    Unknown(String),
}

impl CaptureError {
    /// Short machine-friendly name, used in the status line and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            CaptureError::PermissionDenied => "permission-denied",
            CaptureError::NoMicrophone => "no-microphone",
            CaptureError::NotSupported(_) => "not-supported",
            CaptureError::Unknown(_) => "unknown",
        }
    }

    /// Classifies a backend-specific error message.
    fn from_backend(description: String) -> Self {
        let lower = description.to_lowercase();
        if lower.contains("permission") || lower.contains("denied") || lower.contains("not allowed") {
            CaptureError::PermissionDenied
        } else {
            CaptureError::Unknown(description)
        }
    }
}

impl From<cpal::DevicesError> for CaptureError {
    fn from(err: cpal::DevicesError) -> Self {
        match err {
            cpal::DevicesError::BackendSpecific { err } => Self::from_backend(err.description),
            #[allow(unreachable_patterns)]
            other => CaptureError::Unknown(other.to_string()),
        }
    }
}

impl From<cpal::SupportedStreamConfigsError> for CaptureError {
    fn from(err: cpal::SupportedStreamConfigsError) -> Self {
        match err {
            cpal::SupportedStreamConfigsError::DeviceNotAvailable => CaptureError::NoMicrophone,
            cpal::SupportedStreamConfigsError::InvalidArgument => {
                CaptureError::NotSupported("invalid stream configuration".to_string())
            }
            cpal::SupportedStreamConfigsError::BackendSpecific { err } => {
                Self::from_backend(err.description)
            }
            #[allow(unreachable_patterns)]
            other => CaptureError::Unknown(other.to_string()),
        }
    }
}

impl From<cpal::BuildStreamError> for CaptureError {
    fn from(err: cpal::BuildStreamError) -> Self {
        match err {
            cpal::BuildStreamError::DeviceNotAvailable => CaptureError::NoMicrophone,
            cpal::BuildStreamError::StreamConfigNotSupported
            | cpal::BuildStreamError::InvalidArgument => {
                CaptureError::NotSupported("stream configuration rejected".to_string())
            }
            cpal::BuildStreamError::BackendSpecific { err } => Self::from_backend(err.description),
            other => CaptureError::Unknown(other.to_string()),
        }
    }
}

impl From<cpal::PlayStreamError> for CaptureError {
    fn from(err: cpal::PlayStreamError) -> Self {
        match err {
            cpal::PlayStreamError::DeviceNotAvailable => CaptureError::NoMicrophone,
            cpal::PlayStreamError::BackendSpecific { err } => Self::from_backend(err.description),
            #[allow(unreachable_patterns)]
            other => CaptureError::Unknown(other.to_string()),
        }
    }
}
