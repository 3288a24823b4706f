//! Platform abstraction traits so `trailcast-core` stays OS-agnostic.

use serde::{Deserialize, Serialize};

mod canvas;
mod capture;

pub use canvas::{Canvas, GradientStop, ParseColorError, Rgb};
pub use capture::{
    CaptureBackend, CaptureEncoder, CaptureEvent, CaptureRejection, CaptureStream, EncoderState,
    SessionId,
};

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Logical size of the drawing area plus the device pixel ratio of the display it sits on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
    pub device_pixel_ratio: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32, device_pixel_ratio: f32) -> Self {
        Self {
            width,
            height,
            device_pixel_ratio,
        }
    }

    /// Device pixel ratio, falling back to 1 when the reported value is unusable.
    pub fn scale_factor(&self) -> f32 {
        if self.device_pixel_ratio.is_finite() && self.device_pixel_ratio > 0.0 {
            self.device_pixel_ratio
        } else {
            1.0
        }
    }

    /// Size of the backing store in physical pixels, never smaller than 1x1.
    pub fn backing_size(&self) -> (u32, u32) {
        let dpr = self.scale_factor();
        let scale = |logical: f32| -> u32 {
            let physical = (logical.max(0.0) * dpr).round();
            if physical.is_finite() {
                (physical as u32).max(1)
            } else {
                1
            }
        };
        (scale(self.width), scale(self.height))
    }
}

/// Read-only boolean flag telling whether an embedding host is present.
pub trait PresenceSignal: Send {
    fn is_present(&self) -> bool;
}

/// Narrow key-value persistence surface used for trail settings.
pub trait KeyValueStore: Send {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
}
