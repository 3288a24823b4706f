//! Trailcast core engine: platform-agnostic logic for the pointer trail,
//! its presets, the recording session and the host control surface.

pub mod bridge;
pub mod config;
pub mod engine;
pub mod error;
pub mod pool;
pub mod preset;
pub mod recording;
pub mod render;
pub mod scheduler;
pub mod settings;
pub mod shortcuts;

pub use bridge::{ControlCommand, ControlRegistry, ControlSurface, HostBridge, Interval};
pub use config::{TrailConfig, TrailStyle};
pub use engine::TrailEngine;
pub use error::{Error, Result};
pub use pool::{ParticlePool, TrailPoint, MAX_POINTS};
pub use preset::{Preset, PRESETS};
pub use recording::{RecordingArtifact, RecordingController, RecordingState};
pub use scheduler::AnimationScheduler;
pub use settings::{MemoryStore, Settings, SettingsPersistence, SETTINGS_KEY};
pub use shortcuts::{KeyEvent, Modifiers, ShortcutAction};
