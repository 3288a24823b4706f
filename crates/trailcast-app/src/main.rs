//! `trailcast` - cursor trail overlay for screen recording and live streaming.

#![deny(unsafe_code)]

mod config;
mod logging;

use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info, warn};
use trailcast_core::{
    ControlRegistry, HostBridge, MemoryStore, RecordingController, SettingsPersistence, TrailEngine,
};
use trailcast_native::{
    ControlListener, FfmpegCapture, FfmpegSettings, JsonFileStore, MarkerFilePresence,
};
use trailcast_platform::KeyValueStore;
use trailcast_ui::{run_overlay, OverlayOptions};

use crate::config::Config;
use crate::logging::{init_logging, Verbosity};

#[derive(Debug, Parser)]
#[command(name = "trailcast", version, about = "Cursor trail overlay for recordings and streams")]
struct Cli {
    /// Path to the TOML config file.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// More output; repeat for trace level.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Errors only.
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

impl Cli {
    fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.quiet, self.verbose)
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbosity());

    let config = Config::load_from(cli.config.clone())?;
    info!(version = env!("CARGO_PKG_VERSION"), "trailcast starting");

    let engine = build_engine(&config);

    let registry = ControlRegistry::global().clone();
    let presence = MarkerFilePresence::new(config.host.presence_marker.clone());
    let mut bridge =
        HostBridge::with_interval(Box::new(presence), registry.clone(), config.poll_interval());
    bridge.register();

    // Held for the lifetime of the overlay; dropping it stops the listener thread.
    let _listener = match config.host.control_port {
        0 => None,
        port => match ControlListener::bind(port, registry) {
            Ok(listener) => Some(listener),
            Err(err) => {
                warn!("remote control disabled: {err}");
                None
            }
        },
    };

    let options = OverlayOptions {
        title: config.overlay.title.clone(),
        always_on_top: config.overlay.always_on_top,
        output_dir: config.output_dir(),
    };
    if let Err(err) = run_overlay(options, engine, bridge) {
        error!("overlay failed: {err}");
        return Err(err.to_string().into());
    }
    info!("trailcast stopped");
    Ok(())
}

fn build_engine(config: &Config) -> TrailEngine {
    let capture = FfmpegCapture::new(FfmpegSettings {
        program: config.recording.ffmpeg_path.clone(),
        frame_rate: config.recording.frame_rate,
        ..FfmpegSettings::default()
    });
    let recorder = RecordingController::new(Box::new(capture));

    let settings_path = config.settings_path();
    let store: Box<dyn KeyValueStore> = match JsonFileStore::open(&settings_path) {
        Ok(store) => Box::new(store),
        Err(err) => {
            warn!(
                path = %settings_path.display(),
                "settings will not be saved this session: {err}"
            );
            Box::new(MemoryStore::default())
        }
    };
    let mut engine = TrailEngine::with_persistence(SettingsPersistence::new(store), recorder);
    engine.start();
    engine
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_flags_map_to_verbosity() {
        let cli = Cli::parse_from(["trailcast", "-vv", "--config", "/tmp/t.toml"]);
        assert_eq!(cli.verbosity(), Verbosity::Trace);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/t.toml")));
        assert!(Cli::try_parse_from(["trailcast", "-q", "-v"]).is_err());
    }

    #[test]
    fn test_engine_restores_from_configured_store() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.settings.store_path = Some(dir.path().join("settings.json"));
        config.recording.ffmpeg_path = dir.path().join("no-ffmpeg");
        {
            let mut engine = build_engine(&config);
            engine.apply_preset("candy").unwrap();
        }
        let engine = build_engine(&config);
        assert_eq!(engine.active_preset_id(), Some("candy"));
        assert!(engine.scheduler().is_running());
    }
}
