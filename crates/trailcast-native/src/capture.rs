//! Screen capture through an external `ffmpeg` process writing WebM to stdout.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::Sender;
use once_cell::sync::OnceCell;
use tracing::{debug, info, warn};
use trailcast_platform::{
    CaptureBackend, CaptureEncoder, CaptureEvent, CaptureRejection, CaptureStream, EncoderState,
    SessionId,
};

use crate::error::Error;

/// How long a freshly spawned grabber must stay alive before the stream counts as granted.
pub const GRANT_GRACE: Duration = Duration::from_millis(750);

const READ_CHUNK: usize = 64 * 1024;
const STDERR_TAIL_LINES: usize = 3;

#[derive(Debug, Clone)]
pub struct FfmpegSettings {
    pub program: PathBuf,
    pub frame_rate: u32,
    /// X11 display or platform input name; the platform default when `None`.
    pub input: Option<String>,
    pub grace: Duration,
}

impl Default for FfmpegSettings {
    fn default() -> Self {
        Self {
            program: PathBuf::from("ffmpeg"),
            frame_rate: 30,
            input: None,
            grace: GRANT_GRACE,
        }
    }
}

impl FfmpegSettings {
    pub fn args(&self) -> Vec<String> {
        let rate = self.frame_rate.max(1).to_string();
        let (grabber, default_input) = platform_grabber();
        let input = self.input.clone().unwrap_or_else(|| default_input.to_string());
        let mut args: Vec<String> = ["-hide_banner", "-loglevel", "error", "-f", grabber]
            .iter()
            .map(|s| s.to_string())
            .collect();
        args.extend(["-framerate".to_string(), rate, "-i".to_string(), input]);
        args.extend(
            [
                "-c:v",
                "libvpx-vp9",
                "-deadline",
                "realtime",
                "-cpu-used",
                "8",
                "-b:v",
                "0",
                "-crf",
                "32",
                "-f",
                "webm",
                "pipe:1",
            ]
            .iter()
            .map(|s| s.to_string()),
        );
        args
    }
}

fn platform_grabber() -> (&'static str, &'static str) {
    if cfg!(target_os = "windows") {
        ("gdigrab", "desktop")
    } else if cfg!(target_os = "macos") {
        ("avfoundation", "1:none")
    } else {
        ("x11grab", ":0.0")
    }
}

fn hidden_command(program: &Path) -> Command {
    #[allow(unused_mut)]
    let mut cmd = Command::new(program);
    #[cfg(windows)]
    {
        use std::os::windows::process::CommandExt;
        const CREATE_NO_WINDOW: u32 = 0x0800_0000;
        cmd.creation_flags(CREATE_NO_WINDOW);
    }
    cmd
}

/// Pipes of a granted process, parked until the controller binds an encoder.
#[derive(Debug)]
struct Pipes {
    stdin: Option<ChildStdin>,
    stdout: ChildStdout,
}

type PendingPipes = Arc<Mutex<HashMap<SessionId, Pipes>>>;

fn lock(pending: &PendingPipes) -> MutexGuard<'_, HashMap<SessionId, Pipes>> {
    pending.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Debug)]
pub struct FfmpegCapture {
    settings: FfmpegSettings,
    pending: PendingPipes,
    supported: OnceCell<bool>,
}

impl FfmpegCapture {
    pub fn new(settings: FfmpegSettings) -> Self {
        Self {
            settings,
            pending: Arc::default(),
            supported: OnceCell::new(),
        }
    }
}

impl CaptureBackend for FfmpegCapture {
    fn is_supported(&self) -> bool {
        *self.supported.get_or_init(|| {
            let works = hidden_command(&self.settings.program)
                .arg("-version")
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
                .map(|status| status.success())
                .unwrap_or(false);
            if !works {
                warn!(
                    program = %self.settings.program.display(),
                    "ffmpeg not usable; recording disabled"
                );
            }
            works
        })
    }

    fn request_stream(&mut self, session: SessionId, events: Sender<CaptureEvent>) {
        let settings = self.settings.clone();
        let pending = Arc::clone(&self.pending);
        let spawned = thread::Builder::new()
            .name(format!("capture-request-{session}"))
            .spawn(move || acquire(settings, session, pending, events));
        if let Err(err) = spawned {
            warn!(session, "could not start capture request thread: {err}");
        }
    }

    fn bind_encoder(
        &mut self,
        session: SessionId,
        _stream: &mut dyn CaptureStream,
        events: Sender<CaptureEvent>,
    ) -> trailcast_platform::Result<Box<dyn CaptureEncoder>> {
        let Pipes { stdin, stdout } = lock(&self.pending)
            .remove(&session)
            .ok_or_else(|| format!("no capture output pending for session {session}"))?;
        thread::Builder::new()
            .name(format!("capture-reader-{session}"))
            .spawn(move || pump_output(session, stdout, events))?;
        Ok(Box::new(FfmpegEncoder {
            session,
            stdin,
            state: EncoderState::Recording,
        }))
    }
}

fn acquire(
    settings: FfmpegSettings,
    session: SessionId,
    pending: PendingPipes,
    events: Sender<CaptureEvent>,
) {
    let reply = match spawn_grabber(&settings, session, &pending) {
        Ok(child) => {
            info!(session, "screen capture granted");
            CaptureEvent::StreamGranted {
                session,
                stream: Box::new(FfmpegStream {
                    session,
                    child: Some(child),
                    pending,
                }),
            }
        }
        Err(reason) => {
            warn!(session, %reason, "screen capture rejected");
            CaptureEvent::StreamRejected { session, reason }
        }
    };
    // The controller may be gone already; an unreceived stream is dropped and killed.
    let _ = events.send(reply);
}

fn spawn_grabber(
    settings: &FfmpegSettings,
    session: SessionId,
    pending: &PendingPipes,
) -> Result<Child, CaptureRejection> {
    let mut child = hidden_command(&settings.program)
        .args(settings.args())
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| {
            CaptureRejection::Failed(
                Error::FfmpegSpawn {
                    program: settings.program.clone(),
                    source,
                }
                .to_string(),
            )
        })?;
    debug!(session, pid = child.id(), "capture process spawned");

    let deadline = Instant::now() + settings.grace;
    while Instant::now() < deadline {
        match child.try_wait() {
            Ok(Some(status)) => {
                let mut stderr = String::new();
                if let Some(mut pipe) = child.stderr.take() {
                    let _ = pipe.read_to_string(&mut stderr);
                }
                let tail = stderr_tail(&stderr);
                let message = if tail.is_empty() {
                    format!("capture process exited early ({status})")
                } else {
                    tail
                };
                return Err(classify(message));
            }
            Ok(None) => thread::sleep(Duration::from_millis(25)),
            Err(err) => {
                reap(&mut child);
                return Err(CaptureRejection::Failed(err.to_string()));
            }
        }
    }

    let Some(stdout) = child.stdout.take() else {
        reap(&mut child);
        return Err(CaptureRejection::Failed("capture process has no stdout".into()));
    };
    if let Some(stderr) = child.stderr.take() {
        let _ = thread::Builder::new()
            .name(format!("capture-log-{session}"))
            .spawn(move || drain_stderr(session, stderr));
    }
    lock(pending).insert(
        session,
        Pipes {
            stdin: child.stdin.take(),
            stdout,
        },
    );
    Ok(child)
}

fn drain_stderr(session: SessionId, mut stderr: impl Read) {
    let mut text = String::new();
    let _ = stderr.read_to_string(&mut text);
    for line in text.lines().filter(|line| !line.trim().is_empty()) {
        debug!(session, "ffmpeg: {line}");
    }
}

fn pump_output(session: SessionId, mut stdout: ChildStdout, events: Sender<CaptureEvent>) {
    let mut buf = vec![0u8; READ_CHUNK];
    loop {
        match stdout.read(&mut buf) {
            Ok(0) => {
                debug!(session, "capture output closed");
                let _ = events.send(CaptureEvent::Finalized { session });
                return;
            }
            Ok(n) => {
                let chunk = buf[..n].to_vec();
                if events
                    .send(CaptureEvent::DataAvailable { session, chunk })
                    .is_err()
                {
                    return;
                }
            }
            Err(err) if err.kind() == std::io::ErrorKind::Interrupted => {}
            Err(err) => {
                let _ = events.send(CaptureEvent::Failed {
                    session,
                    reason: format!("reading capture output: {err}"),
                });
                return;
            }
        }
    }
}

/// Last few non-empty stderr lines, joined.
fn stderr_tail(stderr: &str) -> String {
    let lines: Vec<&str> = stderr
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join(" | ")
}

fn classify(message: String) -> CaptureRejection {
    let lower = message.to_ascii_lowercase();
    if lower.contains("permission") || lower.contains("denied") || lower.contains("not authorized")
    {
        CaptureRejection::PermissionDenied(message)
    } else {
        CaptureRejection::Failed(message)
    }
}

fn reap(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

/// One track: the grabber process.
#[derive(Debug)]
pub struct FfmpegStream {
    session: SessionId,
    child: Option<Child>,
    pending: PendingPipes,
}

impl CaptureStream for FfmpegStream {
    fn live_tracks(&self) -> usize {
        usize::from(self.child.is_some())
    }

    fn stop_tracks(&mut self) {
        lock(&self.pending).remove(&self.session);
        if let Some(mut child) = self.child.take() {
            reap(&mut child);
            debug!(session = self.session, "capture process stopped");
        }
    }
}

impl Drop for FfmpegStream {
    fn drop(&mut self) {
        self.stop_tracks();
    }
}

#[derive(Debug)]
pub struct FfmpegEncoder {
    session: SessionId,
    stdin: Option<ChildStdin>,
    state: EncoderState,
}

impl CaptureEncoder for FfmpegEncoder {
    fn state(&self) -> EncoderState {
        self.state
    }

    fn request_finalize(&mut self) {
        self.state = EncoderState::Inactive;
        if let Some(mut stdin) = self.stdin.take() {
            if let Err(err) = stdin.write_all(b"q").and_then(|_| stdin.flush()) {
                warn!(session = self.session, "could not signal capture process: {err}");
            }
        }
    }

    fn stop(&mut self) {
        self.state = EncoderState::Inactive;
        self.stdin = None;
    }
}
