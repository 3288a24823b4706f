//! Screen capture seam. Backends deliver every asynchronous outcome as a typed
//! [`CaptureEvent`] on a channel owned by the recording controller.

use std::fmt;

use crossbeam_channel::Sender;

use crate::Result;

/// Identifies one acquire -> record -> finalize -> release cycle.
pub type SessionId = u64;

/// Why a capture request did not produce a stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureRejection {
    /// The user or the OS refused permission.
    PermissionDenied(String),
    /// The user dismissed the source picker.
    Cancelled(String),
    /// Anything else the backend reported.
    Failed(String),
}

impl fmt::Display for CaptureRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PermissionDenied(msg) => write!(f, "capture permission denied: {msg}"),
            Self::Cancelled(msg) => write!(f, "capture cancelled: {msg}"),
            Self::Failed(msg) => write!(f, "capture failed: {msg}"),
        }
    }
}

/// A live capture handle. Owns one or more tracks that must be stopped to release the source.
pub trait CaptureStream: Send + fmt::Debug {
    fn live_tracks(&self) -> usize;
    fn stop_tracks(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncoderState {
    Inactive,
    Recording,
}

/// Encoder bound to a stream. Produces `DataAvailable` events while recording
/// and exactly one `Finalized` event once it has flushed.
pub trait CaptureEncoder: Send + fmt::Debug {
    fn state(&self) -> EncoderState;
    /// Ask the encoder to flush; completion arrives as `CaptureEvent::Finalized`.
    fn request_finalize(&mut self);
    /// Hard stop used on teardown; no completion is expected afterwards.
    fn stop(&mut self);
}

#[derive(Debug)]
pub enum CaptureEvent {
    StreamGranted {
        session: SessionId,
        stream: Box<dyn CaptureStream>,
    },
    StreamRejected {
        session: SessionId,
        reason: CaptureRejection,
    },
    DataAvailable {
        session: SessionId,
        chunk: Vec<u8>,
    },
    Finalized {
        session: SessionId,
    },
    Failed {
        session: SessionId,
        reason: String,
    },
}

impl CaptureEvent {
    pub fn session(&self) -> SessionId {
        match self {
            Self::StreamGranted { session, .. }
            | Self::StreamRejected { session, .. }
            | Self::DataAvailable { session, .. }
            | Self::Finalized { session }
            | Self::Failed { session, .. } => *session,
        }
    }
}

/// Source of screen capture sessions.
pub trait CaptureBackend: Send {
    /// Whether the capture capability exists at all on this machine.
    fn is_supported(&self) -> bool;

    /// Begin acquiring a stream. Must answer with exactly one `StreamGranted`
    /// or `StreamRejected` for `session`, possibly much later.
    fn request_stream(&mut self, session: SessionId, events: Sender<CaptureEvent>);

    /// Bind an encoder to a granted stream.
    fn bind_encoder(
        &mut self,
        session: SessionId,
        stream: &mut dyn CaptureStream,
        events: Sender<CaptureEvent>,
    ) -> Result<Box<dyn CaptureEncoder>>;

    fn mime_type(&self) -> &'static str {
        "video/webm;codecs=vp9"
    }

    fn file_extension(&self) -> &'static str {
        "webm"
    }
}
