//! Screen recording session state machine.
//!
//! ```text
//! idle -> requesting -> recording -> processing -> idle
//!            |              |
//!            +--> idle      +--> idle   (failure)
//! ```
//!
//! Every asynchronous outcome (consent, encoder data, finalization) arrives as a
//! typed [`CaptureEvent`] on the controller's own channel and is applied by
//! [`RecordingController::pump`], so the transition table can be driven
//! directly from tests.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use crossbeam_channel::{Receiver, Sender};
use serde::Serialize;
use tracing::{debug, info, warn};
use trailcast_platform::{
    CaptureBackend, CaptureEncoder, CaptureEvent, CaptureStream, EncoderState, SessionId,
};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordingState {
    Idle,
    Requesting,
    Recording,
    Processing,
}

/// The finished recording, ready to be written out.
#[derive(Debug, Clone)]
pub struct RecordingArtifact {
    pub file_name: String,
    pub mime_type: String,
    pub data: Vec<u8>,
    pub created_at: DateTime<Local>,
}

impl RecordingArtifact {
    fn new(data: Vec<u8>, mime_type: &str, extension: &str) -> Self {
        let created_at = Local::now();
        Self {
            file_name: format!(
                "trailcast-{}.{extension}",
                created_at.format("%Y%m%d-%H%M%S")
            ),
            mime_type: mime_type.to_string(),
            data,
            created_at,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Write the artifact into `dir` (created if missing) and return the full path.
    pub fn save_in(&self, dir: &Path) -> io::Result<PathBuf> {
        fs::create_dir_all(dir)?;
        let path = dir.join(&self.file_name);
        fs::write(&path, &self.data)?;
        Ok(path)
    }
}

pub struct RecordingController {
    backend: Box<dyn CaptureBackend>,
    state: RecordingState,
    session: SessionId,
    stream: Option<Box<dyn CaptureStream>>,
    encoder: Option<Box<dyn CaptureEncoder>>,
    chunks: Vec<Vec<u8>>,
    artifact: Option<RecordingArtifact>,
    error: Option<Error>,
    events_tx: Sender<CaptureEvent>,
    events_rx: Receiver<CaptureEvent>,
}

impl fmt::Debug for RecordingController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordingController")
            .field("state", &self.state)
            .field("session", &self.session)
            .field("stream", &self.stream)
            .field("chunks", &self.chunks.len())
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}

impl RecordingController {
    pub fn new(backend: Box<dyn CaptureBackend>) -> Self {
        let (events_tx, events_rx) = crossbeam_channel::unbounded();
        Self {
            backend,
            state: RecordingState::Idle,
            session: 0,
            stream: None,
            encoder: None,
            chunks: Vec::new(),
            artifact: None,
            error: None,
            events_tx,
            events_rx,
        }
    }

    pub fn state(&self) -> RecordingState {
        self.state
    }

    pub fn is_recording(&self) -> bool {
        self.state == RecordingState::Recording
    }

    /// Id of the current (or last) capture session.
    pub fn session(&self) -> SessionId {
        self.session
    }

    /// Why the last session could not start or did not finish, if it failed.
    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    /// The most recently produced recording.
    pub fn artifact(&self) -> Option<&RecordingArtifact> {
        self.artifact.as_ref()
    }

    /// Live tracks on the held capture stream; zero when nothing is held.
    pub fn live_tracks(&self) -> usize {
        self.stream.as_ref().map_or(0, |stream| stream.live_tracks())
    }

    pub fn buffered_chunks(&self) -> usize {
        self.chunks.len()
    }

    /// Begin a capture session. No-op unless idle.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CaptureUnsupported`] when the backend has no capture
    /// capability; the controller stays idle and the message is kept in [`Self::error`].
    pub fn start(&mut self) -> Result<()> {
        if self.state != RecordingState::Idle {
            debug!(state = ?self.state, "start ignored, session already active");
            return Ok(());
        }
        if !self.backend.is_supported() {
            const NO_BACKEND: &str = "no screen capture backend is available";
            self.fail(Error::capture_unsupported(NO_BACKEND));
            return Err(Error::capture_unsupported(NO_BACKEND));
        }
        self.session += 1;
        self.error = None;
        self.state = RecordingState::Requesting;
        info!(session = self.session, "requesting capture stream");
        self.backend
            .request_stream(self.session, self.events_tx.clone());
        Ok(())
    }

    /// Ask the encoder to finalize. No-op unless recording.
    pub fn stop(&mut self) {
        if self.state != RecordingState::Recording {
            debug!(state = ?self.state, "stop ignored, not recording");
            return;
        }
        self.state = RecordingState::Processing;
        info!(session = self.session, chunks = self.chunks.len(), "finalizing recording");
        if let Some(encoder) = self.encoder.as_mut() {
            encoder.request_finalize();
        }
    }

    /// Apply every completion that has arrived since the last call.
    /// Returns the artifact when one was produced by this pump.
    pub fn pump(&mut self) -> Option<&RecordingArtifact> {
        let mut produced = false;
        while let Ok(event) = self.events_rx.try_recv() {
            produced |= self.handle_event(event);
        }
        if produced {
            self.artifact.as_ref()
        } else {
            None
        }
    }

    /// Apply a single completion. Returns true when it produced an artifact.
    pub fn handle_event(&mut self, event: CaptureEvent) -> bool {
        if event.session() != self.session {
            discard_stale(event);
            return false;
        }
        match event {
            CaptureEvent::StreamGranted { stream, .. } => {
                self.on_stream_granted(stream);
                false
            }
            CaptureEvent::StreamRejected { reason, .. } => {
                if self.state == RecordingState::Requesting {
                    self.state = RecordingState::Idle;
                    self.fail(Error::CaptureRejected(reason.to_string()));
                }
                false
            }
            CaptureEvent::DataAvailable { chunk, .. } => {
                if self.accepts_data() && !chunk.is_empty() {
                    self.chunks.push(chunk);
                }
                false
            }
            CaptureEvent::Finalized { .. } => {
                if self.accepts_data() {
                    self.finalize();
                    true
                } else {
                    false
                }
            }
            CaptureEvent::Failed { reason, .. } => {
                if self.state != RecordingState::Idle {
                    self.release();
                    self.fail(Error::CaptureRejected(reason));
                }
                false
            }
        }
    }

    /// Force-terminate whatever is in flight and release every capture resource.
    /// Safe in any state and safe to call repeatedly.
    pub fn teardown(&mut self) {
        if self.state != RecordingState::Idle {
            info!(session = self.session, state = ?self.state, "tearing down recording session");
        }
        self.release();
        // pending completions of this session are now stale
        self.session += 1;
        while let Ok(event) = self.events_rx.try_recv() {
            discard_stale(event);
        }
    }

    fn accepts_data(&self) -> bool {
        matches!(
            self.state,
            RecordingState::Recording | RecordingState::Processing
        )
    }

    fn on_stream_granted(&mut self, mut stream: Box<dyn CaptureStream>) {
        if self.state != RecordingState::Requesting {
            debug!(session = self.session, "stream granted after request was abandoned");
            stream.stop_tracks();
            return;
        }
        match self
            .backend
            .bind_encoder(self.session, stream.as_mut(), self.events_tx.clone())
        {
            Ok(encoder) => {
                self.chunks.clear();
                self.encoder = Some(encoder);
                self.stream = Some(stream);
                self.state = RecordingState::Recording;
                info!(session = self.session, "recording started");
            }
            Err(source) => {
                stream.stop_tracks();
                self.state = RecordingState::Idle;
                self.fail(Error::EncoderBind(source.to_string()));
            }
        }
    }

    fn fail(&mut self, err: Error) {
        warn!(session = self.session, "recording failed: {err}");
        self.error = Some(err);
    }

    fn finalize(&mut self) {
        let data = std::mem::take(&mut self.chunks).concat();
        let artifact =
            RecordingArtifact::new(data, self.backend.mime_type(), self.backend.file_extension());
        info!(
            session = self.session,
            bytes = artifact.len(),
            file = %artifact.file_name,
            "recording finalized"
        );
        self.encoder = None;
        self.release_stream();
        self.artifact = Some(artifact);
        self.state = RecordingState::Idle;
    }

    fn release(&mut self) {
        if let Some(mut encoder) = self.encoder.take() {
            if encoder.state() != EncoderState::Inactive {
                encoder.stop();
            }
        }
        self.release_stream();
        self.chunks.clear();
        self.state = RecordingState::Idle;
    }

    fn release_stream(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.stop_tracks();
        }
    }
}

impl Drop for RecordingController {
    fn drop(&mut self) {
        self.teardown();
    }
}

fn discard_stale(event: CaptureEvent) {
    debug!(session = event.session(), "discarding stale capture event");
    if let CaptureEvent::StreamGranted { mut stream, .. } = event {
        stream.stop_tracks();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use trailcast_platform::CaptureRejection;

    #[derive(Debug)]
    struct FakeStream {
        tracks: Arc<AtomicUsize>,
    }

    impl CaptureStream for FakeStream {
        fn live_tracks(&self) -> usize {
            self.tracks.load(Ordering::SeqCst)
        }

        fn stop_tracks(&mut self) {
            self.tracks.store(0, Ordering::SeqCst);
        }
    }

    #[derive(Debug)]
    struct FakeEncoder {
        active: bool,
        finalize_requested: Arc<AtomicBool>,
        stopped: Arc<AtomicBool>,
    }

    impl CaptureEncoder for FakeEncoder {
        fn state(&self) -> EncoderState {
            if self.active {
                EncoderState::Recording
            } else {
                EncoderState::Inactive
            }
        }

        fn request_finalize(&mut self) {
            self.finalize_requested.store(true, Ordering::SeqCst);
        }

        fn stop(&mut self) {
            self.active = false;
            self.stopped.store(true, Ordering::SeqCst);
        }
    }

    #[derive(Default)]
    struct BackendLog {
        requests: Mutex<Vec<(SessionId, Sender<CaptureEvent>)>>,
        finalize_requested: Arc<AtomicBool>,
        encoder_stopped: Arc<AtomicBool>,
    }

    struct FakeBackend {
        supported: bool,
        bind_fails: bool,
        log: Arc<BackendLog>,
    }

    impl CaptureBackend for FakeBackend {
        fn is_supported(&self) -> bool {
            self.supported
        }

        fn request_stream(&mut self, session: SessionId, events: Sender<CaptureEvent>) {
            self.log.requests.lock().unwrap().push((session, events));
        }

        fn bind_encoder(
            &mut self,
            _session: SessionId,
            _stream: &mut dyn CaptureStream,
            _events: Sender<CaptureEvent>,
        ) -> trailcast_platform::Result<Box<dyn CaptureEncoder>> {
            if self.bind_fails {
                return Err("codec unavailable".into());
            }
            Ok(Box::new(FakeEncoder {
                active: true,
                finalize_requested: Arc::clone(&self.log.finalize_requested),
                stopped: Arc::clone(&self.log.encoder_stopped),
            }))
        }
    }

    fn controller(supported: bool, bind_fails: bool) -> (RecordingController, Arc<BackendLog>) {
        let log = Arc::new(BackendLog::default());
        let backend = FakeBackend {
            supported,
            bind_fails,
            log: Arc::clone(&log),
        };
        (RecordingController::new(Box::new(backend)), log)
    }

    fn grant(log: &BackendLog) -> Arc<AtomicUsize> {
        let tracks = Arc::new(AtomicUsize::new(2));
        let (session, events) = log.requests.lock().unwrap().last().cloned().unwrap();
        events
            .send(CaptureEvent::StreamGranted {
                session,
                stream: Box::new(FakeStream {
                    tracks: Arc::clone(&tracks),
                }),
            })
            .unwrap();
        tracks
    }

    fn send(log: &BackendLog, make: impl FnOnce(SessionId) -> CaptureEvent) {
        let (session, events) = log.requests.lock().unwrap().last().cloned().unwrap();
        events.send(make(session)).unwrap();
    }

    #[test]
    fn test_full_cycle_produces_artifact_and_releases_tracks() {
        let (mut rec, log) = controller(true, false);
        rec.start().unwrap();
        assert_eq!(rec.state(), RecordingState::Requesting);

        let tracks = grant(&log);
        assert!(rec.pump().is_none());
        assert_eq!(rec.state(), RecordingState::Recording);
        assert_eq!(rec.live_tracks(), 2);

        send(&log, |session| CaptureEvent::DataAvailable {
            session,
            chunk: b"abc".to_vec(),
        });
        send(&log, |session| CaptureEvent::DataAvailable {
            session,
            chunk: Vec::new(),
        });
        send(&log, |session| CaptureEvent::DataAvailable {
            session,
            chunk: b"def".to_vec(),
        });
        rec.pump();
        assert_eq!(rec.buffered_chunks(), 2);

        rec.stop();
        assert_eq!(rec.state(), RecordingState::Processing);
        assert!(log.finalize_requested.load(Ordering::SeqCst));

        send(&log, |session| CaptureEvent::Finalized { session });
        let artifact = rec.pump().expect("artifact produced");
        assert_eq!(artifact.data, b"abcdef");
        assert!(artifact.file_name.starts_with("trailcast-"));
        assert!(artifact.file_name.ends_with(".webm"));
        assert_eq!(artifact.mime_type, "video/webm;codecs=vp9");

        assert_eq!(rec.state(), RecordingState::Idle);
        assert_eq!(rec.buffered_chunks(), 0);
        assert_eq!(rec.live_tracks(), 0);
        assert_eq!(tracks.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_start_while_active_is_noop() {
        let (mut rec, log) = controller(true, false);
        rec.start().unwrap();
        rec.start().unwrap();
        assert_eq!(log.requests.lock().unwrap().len(), 1);
        assert_eq!(rec.state(), RecordingState::Requesting);

        grant(&log);
        rec.pump();
        let session = rec.session();
        rec.start().unwrap();
        assert_eq!(rec.state(), RecordingState::Recording);
        assert_eq!(rec.session(), session);
    }

    #[test]
    fn test_stop_outside_recording_is_noop() {
        let (mut rec, log) = controller(true, false);
        rec.stop();
        assert_eq!(rec.state(), RecordingState::Idle);
        rec.start().unwrap();
        rec.stop();
        assert_eq!(rec.state(), RecordingState::Requesting);
        assert!(!log.finalize_requested.load(Ordering::SeqCst));
    }

    #[test]
    fn test_unsupported_backend_fails_fast() {
        let (mut rec, _log) = controller(false, false);
        let err = rec.start().unwrap_err();
        assert!(err.is_capture_unsupported());
        assert_eq!(rec.state(), RecordingState::Idle);
        assert!(rec.error().is_some_and(Error::is_capture_unsupported));
    }

    #[test]
    fn test_rejection_returns_to_idle_with_message() {
        let (mut rec, log) = controller(true, false);
        rec.start().unwrap();
        send(&log, |session| CaptureEvent::StreamRejected {
            session,
            reason: CaptureRejection::Cancelled("picker dismissed".into()),
        });
        rec.pump();
        assert_eq!(rec.state(), RecordingState::Idle);
        let err = rec.error().unwrap();
        assert!(matches!(err, Error::CaptureRejected(_)));
        assert!(err.to_string().contains("picker dismissed"));
        assert_eq!(rec.live_tracks(), 0);

        // re-triable
        rec.start().unwrap();
        assert_eq!(rec.state(), RecordingState::Requesting);
        assert!(rec.error().is_none());
    }

    #[test]
    fn test_encoder_bind_failure_releases_stream() {
        let (mut rec, log) = controller(true, true);
        rec.start().unwrap();
        let tracks = grant(&log);
        rec.pump();
        assert_eq!(rec.state(), RecordingState::Idle);
        assert_eq!(tracks.load(Ordering::SeqCst), 0);
        let err = rec.error().unwrap();
        assert!(matches!(err, Error::EncoderBind(_)));
        assert!(err.to_string().contains("codec unavailable"));
    }

    #[test]
    fn test_failure_while_recording_discards_session() {
        let (mut rec, log) = controller(true, false);
        rec.start().unwrap();
        let tracks = grant(&log);
        send(&log, |session| CaptureEvent::DataAvailable {
            session,
            chunk: vec![1],
        });
        send(&log, |session| CaptureEvent::Failed {
            session,
            reason: "ffmpeg exited".into(),
        });
        assert!(rec.pump().is_none());
        assert_eq!(rec.state(), RecordingState::Idle);
        assert_eq!(rec.buffered_chunks(), 0);
        assert_eq!(tracks.load(Ordering::SeqCst), 0);
        assert!(log.encoder_stopped.load(Ordering::SeqCst));
        assert!(rec.artifact().is_none());
        let err = rec.error().unwrap();
        assert!(err.is_user_facing());
        assert_eq!(err.to_string(), "ffmpeg exited");
    }

    #[test]
    fn test_teardown_stops_encoder_and_tracks() {
        let (mut rec, log) = controller(true, false);
        rec.start().unwrap();
        let tracks = grant(&log);
        rec.pump();
        rec.teardown();
        assert_eq!(rec.state(), RecordingState::Idle);
        assert!(log.encoder_stopped.load(Ordering::SeqCst));
        assert_eq!(tracks.load(Ordering::SeqCst), 0);
        rec.teardown();
    }

    #[test]
    fn test_grant_after_teardown_is_released() {
        let (mut rec, log) = controller(true, false);
        rec.start().unwrap();
        rec.teardown();
        let tracks = grant(&log);
        rec.pump();
        assert_eq!(rec.state(), RecordingState::Idle);
        assert_eq!(tracks.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_drop_releases_tracks() {
        let (mut rec, log) = controller(true, false);
        rec.start().unwrap();
        let tracks = grant(&log);
        rec.pump();
        drop(rec);
        assert_eq!(tracks.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_repeated_cycles_leave_no_live_tracks() {
        let (mut rec, log) = controller(true, false);
        let mut all_tracks = Vec::new();
        for _ in 0..3 {
            rec.start().unwrap();
            all_tracks.push(grant(&log));
            rec.pump();
            rec.stop();
            send(&log, |session| CaptureEvent::Finalized { session });
            rec.pump();
        }
        assert!(all_tracks.iter().all(|t| t.load(Ordering::SeqCst) == 0));
        assert_eq!(log.requests.lock().unwrap().len(), 3);
    }

    #[test]
    fn test_save_artifact_writes_file() {
        let artifact = RecordingArtifact::new(vec![1, 2, 3], "video/webm", "webm");
        let dir = tempfile::tempdir().unwrap();
        let path = artifact.save_in(&dir.path().join("recordings")).unwrap();
        assert_eq!(path.file_name().unwrap().to_str(), Some(artifact.file_name.as_str()));
        assert_eq!(fs::read(&path).unwrap(), vec![1, 2, 3]);
    }
}
