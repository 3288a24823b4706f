//! In-memory collaborators for driving `TrailEngine` end to end.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crossbeam_channel::Sender;
use glam::Vec2;
use trailcast_core::MemoryStore;
use trailcast_platform::{
    CaptureBackend, CaptureEncoder, CaptureEvent, CaptureRejection, CaptureStream, Canvas,
    EncoderState, GradientStop, KeyValueStore, Rgb, SessionId,
};

#[derive(Debug)]
pub struct ScriptedStream {
    tracks: Arc<AtomicUsize>,
}

impl CaptureStream for ScriptedStream {
    fn live_tracks(&self) -> usize {
        self.tracks.load(Ordering::SeqCst)
    }

    fn stop_tracks(&mut self) {
        self.tracks.store(0, Ordering::SeqCst);
    }
}

#[derive(Debug)]
pub struct ScriptedEncoder {
    session: SessionId,
    events: Sender<CaptureEvent>,
    active: bool,
}

impl CaptureEncoder for ScriptedEncoder {
    fn state(&self) -> EncoderState {
        if self.active {
            EncoderState::Recording
        } else {
            EncoderState::Inactive
        }
    }

    /// Flushes immediately: one trailing chunk, then the finalized completion.
    fn request_finalize(&mut self) {
        self.active = false;
        let _ = self.events.send(CaptureEvent::DataAvailable {
            session: self.session,
            chunk: b"tail".to_vec(),
        });
        let _ = self.events.send(CaptureEvent::Finalized {
            session: self.session,
        });
    }

    fn stop(&mut self) {
        self.active = false;
    }
}

/// Capture backend whose consent prompt is answered by the test.
#[derive(Clone, Default)]
pub struct ScriptedCapture {
    pub unsupported: bool,
    pending: Arc<Mutex<Vec<(SessionId, Sender<CaptureEvent>)>>>,
    streams: Arc<Mutex<Vec<Arc<AtomicUsize>>>>,
}

impl ScriptedCapture {
    pub fn unsupported() -> Self {
        Self {
            unsupported: true,
            ..Self::default()
        }
    }

    fn take_pending(&self) -> (SessionId, Sender<CaptureEvent>) {
        self.pending
            .lock()
            .unwrap()
            .pop()
            .expect("no capture request pending")
    }

    pub fn grant(&self) {
        let (session, events) = self.take_pending();
        let tracks = Arc::new(AtomicUsize::new(2));
        self.streams.lock().unwrap().push(Arc::clone(&tracks));
        events
            .send(CaptureEvent::StreamGranted {
                session,
                stream: Box::new(ScriptedStream { tracks }),
            })
            .unwrap();
    }

    pub fn deny(&self, message: &str) {
        let (session, events) = self.take_pending();
        events
            .send(CaptureEvent::StreamRejected {
                session,
                reason: CaptureRejection::PermissionDenied(message.to_string()),
            })
            .unwrap();
    }

    pub fn requests_pending(&self) -> usize {
        self.pending.lock().unwrap().len()
    }

    /// Live tracks summed over every stream ever granted.
    pub fn live_tracks(&self) -> usize {
        self.streams
            .lock()
            .unwrap()
            .iter()
            .map(|t| t.load(Ordering::SeqCst))
            .sum()
    }
}

impl CaptureBackend for ScriptedCapture {
    fn is_supported(&self) -> bool {
        !self.unsupported
    }

    fn request_stream(&mut self, session: SessionId, events: Sender<CaptureEvent>) {
        self.pending.lock().unwrap().push((session, events));
    }

    fn bind_encoder(
        &mut self,
        session: SessionId,
        _stream: &mut dyn CaptureStream,
        events: Sender<CaptureEvent>,
    ) -> trailcast_platform::Result<Box<dyn CaptureEncoder>> {
        let _ = events.send(CaptureEvent::DataAvailable {
            session,
            chunk: b"head-".to_vec(),
        });
        Ok(Box::new(ScriptedEncoder {
            session,
            events,
            active: true,
        }))
    }
}

/// Canvas that only counts calls per primitive.
#[derive(Debug, Default)]
pub struct TallyCanvas {
    pub clears: usize,
    pub radials: usize,
    pub lines: usize,
    pub ellipses: usize,
    pub polygons: Vec<usize>,
}

impl Canvas for TallyCanvas {
    fn clear(&mut self) {
        self.clears += 1;
    }

    fn fill_radial_disc(&mut self, _center: Vec2, _radius: f32, _stops: &[GradientStop]) {
        self.radials += 1;
    }

    fn stroke_line(&mut self, _from: Vec2, _to: Vec2, _color: Rgb, _alpha: f32, _width: f32) {
        self.lines += 1;
    }

    fn fill_ellipse(&mut self, _c: Vec2, _r: Vec2, _rot: f32, _color: Rgb, _opacity: f32) {
        self.ellipses += 1;
    }

    fn fill_polygon(&mut self, points: &[Vec2], _color: Rgb, _alpha: f32) {
        self.polygons.push(points.len());
    }
}

/// Key-value store shared between engine instances, standing in for a file.
#[derive(Clone, Default)]
pub struct SharedStore(pub Arc<Mutex<MemoryStore>>);

impl KeyValueStore for SharedStore {
    fn get(&self, key: &str) -> trailcast_platform::Result<Option<String>> {
        self.0.lock().unwrap().get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> trailcast_platform::Result<()> {
        self.0.lock().unwrap().set(key, value)
    }
}
