//! egui overlay front end for the trail engine.

mod keys;
mod overlay;

pub use keys::{key_char, key_event};
pub use overlay::{run_overlay, status_line, OverlayOptions, TrailOverlayApp};
