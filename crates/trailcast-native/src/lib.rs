//! Desktop implementations of the platform seams: raster surface, ffmpeg
//! screen capture, marker-file presence, JSON settings file and a loopback
//! control transport.

mod canvas;
mod capture;
mod control;
mod error;
mod presence;
mod store;

pub use canvas::PixmapCanvas;
pub use capture::{FfmpegCapture, FfmpegEncoder, FfmpegSettings, FfmpegStream, GRANT_GRACE};
pub use control::{parse_command, ControlListener};
pub use error::{Error, Result};
pub use presence::MarkerFilePresence;
pub use store::JsonFileStore;
