//! Error types for the trail engine.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// No screen capture capability on this machine.
    #[error("screen recording is not supported here: {message}")]
    CaptureUnsupported { message: String },

    /// The capture request was denied, cancelled or failed.
    #[error("{0}")]
    CaptureRejected(String),

    /// A stream was granted but no encoder could be attached to it.
    #[error("failed to start encoder: {0}")]
    EncoderBind(String),

    #[error("unknown preset '{0}'")]
    UnknownPreset(String),

    /// The settings store refused a read or write.
    #[error("settings store error: {0}")]
    Settings(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    #[must_use]
    pub fn capture_unsupported(message: impl Into<String>) -> Self {
        Self::CaptureUnsupported {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn settings(message: impl Into<String>) -> Self {
        Self::Settings(message.into())
    }

    #[must_use]
    pub fn is_capture_unsupported(&self) -> bool {
        matches!(self, Self::CaptureUnsupported { .. })
    }

    /// Errors worth showing to the person at the keyboard rather than only logging.
    #[must_use]
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Self::CaptureUnsupported { .. } | Self::CaptureRejected(_) | Self::EncoderBind(_)
        )
    }
}
