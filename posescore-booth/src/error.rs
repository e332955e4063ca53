//! Error types for posescore-booth
//!
//! Capture-path errors stay inside the capture controller and submission
//! errors stay inside the aggregator. Both are surfaced to the user as
//! rendered text, never as the raw error.

use posescore_common::SlotKind;
use thiserror::Error;

/// Capture path errors
#[derive(Debug, Error)]
pub enum CaptureError {
    /// Camera permission denied or no device available
    #[error("Device access error: {0}")]
    DeviceAccess(String),

    /// Stream opened but no usable frame could be read
    #[error("Frame error: {0}")]
    Frame(String),

    /// Frame could not be encoded as PNG
    #[error("Encode error: {0}")]
    Encode(String),

    /// Image file was not a decodable image
    #[error("Decode error: {0}")]
    Decode(String),

    /// Image file could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// No display registered for a slot
    #[error("No display registered for slot '{0}'")]
    UnknownSlot(SlotKind),
}

impl CaptureError {
    /// Text shown to the user for this failure
    pub fn user_message(&self) -> String {
        match self {
            CaptureError::DeviceAccess(_) => {
                "Webcam access denied or unavailable. Make sure the booth has camera permission."
                    .to_string()
            }
            CaptureError::Io(_) | CaptureError::Decode(_) => {
                "Could not read that image file.".to_string()
            }
            CaptureError::Frame(_) | CaptureError::Encode(_) | CaptureError::UnknownSlot(_) => {
                "Capture failed. Please try again.".to_string()
            }
        }
    }
}

/// Scoring service errors
#[derive(Debug, Error)]
pub enum ScoringError {
    /// Transport-level failure (connect, reset, timeout)
    #[error("Network error: {0}")]
    Network(String),

    /// Service answered with a non-success status
    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    /// Response body was not the expected JSON
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Submission errors
#[derive(Debug, Error)]
pub enum SubmitError {
    /// Submit attempted without images or without a category
    #[error("Validation error: {0}")]
    Validation(String),

    /// Request failed at the transport, status or parse level
    #[error(transparent)]
    Scoring(#[from] ScoringError),
}
