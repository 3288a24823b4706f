//! The trail engine: owns the pool, the scheduler, the live configuration and
//! the recording controller, and applies every kind of user or host input to them.

use tracing::{debug, info, warn};
use trailcast_platform::{Canvas, Rgb};

use crate::bridge::ControlCommand;
use crate::config::{TrailConfig, TrailStyle};
use crate::error::{Error, Result};
use crate::pool::ParticlePool;
use crate::preset;
use crate::recording::{RecordingArtifact, RecordingController, RecordingState};
use crate::scheduler::AnimationScheduler;
use crate::settings::{Settings, SettingsPersistence};
use crate::shortcuts::{self, KeyEvent, ShortcutAction};

#[derive(Debug)]
pub struct TrailEngine {
    config: TrailConfig,
    active: bool,
    active_preset_id: Option<String>,
    pool: ParticlePool,
    scheduler: AnimationScheduler,
    recorder: RecordingController,
    persistence: Option<SettingsPersistence>,
}

impl TrailEngine {
    /// Engine with default settings and nothing persisted.
    pub fn new(recorder: RecordingController) -> Self {
        Self::from_settings(Settings::default(), recorder, None)
    }

    /// Engine restored from the settings store; later changes are written back to it.
    pub fn with_persistence(
        mut persistence: SettingsPersistence,
        recorder: RecordingController,
    ) -> Self {
        let settings = persistence.load();
        info!(
            style = %settings.trail_style,
            color = %settings.trail_color,
            size = settings.trail_size,
            fade = settings.fade_speed,
            "settings restored"
        );
        Self::from_settings(settings, recorder, Some(persistence))
    }

    fn from_settings(
        settings: Settings,
        recorder: RecordingController,
        persistence: Option<SettingsPersistence>,
    ) -> Self {
        Self {
            config: settings.trail_config(),
            active: settings.is_active,
            active_preset_id: settings.active_preset_id,
            pool: ParticlePool::new(),
            scheduler: AnimationScheduler::new(),
            recorder,
            persistence,
        }
    }

    /// Swap in a specific pool, e.g. a seeded one.
    #[must_use]
    pub fn with_pool(mut self, pool: ParticlePool) -> Self {
        self.pool = pool;
        self
    }

    pub fn start(&mut self) {
        self.scheduler.start();
    }

    pub fn config(&self) -> &TrailConfig {
        &self.config
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn active_preset_id(&self) -> Option<&str> {
        self.active_preset_id.as_deref()
    }

    pub fn pool(&self) -> &ParticlePool {
        &self.pool
    }

    pub fn scheduler(&self) -> &AnimationScheduler {
        &self.scheduler
    }

    pub fn recorder(&self) -> &RecordingController {
        &self.recorder
    }

    pub fn settings(&self) -> Settings {
        Settings::capture(self.active, &self.config, self.active_preset_id.as_deref())
    }

    /// Feed a pointer position in logical pixels. Ignored while inactive.
    pub fn pointer_moved(&mut self, x: f32, y: f32) {
        if self.active {
            self.pool.add(x, y);
        }
    }

    /// Run one animation step onto `canvas`. `None` when the loop is cancelled.
    pub fn frame(&mut self, canvas: &mut dyn Canvas) -> Option<usize> {
        self.scheduler.tick(&mut self.pool, &self.config, canvas)
    }

    pub fn toggle_active(&mut self) -> bool {
        self.active = !self.active;
        info!(active = self.active, "trail toggled");
        self.persist();
        self.active
    }

    /// Overwrite style, colour, size and fade rate from a preset in one go.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownPreset`] if `id` is not in the catalog.
    pub fn apply_preset(&mut self, id: &str) -> Result<()> {
        let preset = preset::find(id).ok_or_else(|| Error::UnknownPreset(id.to_string()))?;
        self.config = preset.config.clone();
        self.active_preset_id = Some(preset.id.to_string());
        info!(preset = preset.id, "preset applied");
        self.config_changed();
        Ok(())
    }

    pub fn set_style(&mut self, style: TrailStyle) {
        self.config.style = style;
        self.manual_change();
    }

    pub fn set_color(&mut self, color: Rgb) {
        self.config.color = color;
        self.manual_change();
    }

    pub fn set_size(&mut self, size: u32) {
        self.config.set_size(size);
        self.manual_change();
    }

    pub fn set_fade_rate(&mut self, fade_rate: u32) {
        self.config.set_fade_rate(fade_rate);
        self.manual_change();
    }

    pub fn adjust_size(&mut self, steps: i32) {
        self.config.adjust_size(steps);
        self.manual_change();
    }

    /// Bulk replace from an external caller; values are taken as given.
    pub fn replace_config(&mut self, config: TrailConfig) {
        self.config = config;
        self.config_changed();
    }

    /// Dispatch a key press. Returns true when the key was handled and its
    /// default behaviour should be suppressed.
    pub fn handle_key(&mut self, event: &KeyEvent) -> bool {
        match shortcuts::resolve(event) {
            Some(action) => {
                debug!(key = %event.key, ?action, "shortcut");
                self.apply_shortcut(action);
                true
            }
            None => false,
        }
    }

    pub fn apply_shortcut(&mut self, action: ShortcutAction) {
        match action {
            ShortcutAction::ToggleActive => {
                self.toggle_active();
            }
            ShortcutAction::ToggleRecording => self.toggle_recording(),
            ShortcutAction::ShrinkSize => self.adjust_size(-1),
            ShortcutAction::GrowSize => self.adjust_size(1),
            ShortcutAction::ApplyPreset(id) => {
                if let Err(err) = self.apply_preset(id) {
                    warn!("{err}");
                }
            }
        }
    }

    pub fn handle_control(&mut self, command: ControlCommand) {
        debug!(?command, "host control command");
        match command {
            ControlCommand::ToggleActive => {
                self.toggle_active();
            }
            ControlCommand::ApplyPreset(id) => {
                if let Err(err) = self.apply_preset(&id) {
                    warn!("host requested {err}");
                }
            }
            ControlCommand::StartRecording => self.start_recording_logged(),
            ControlCommand::StopRecording => self.stop_recording(),
        }
    }

    /// # Errors
    ///
    /// Returns [`Error::CaptureUnsupported`] when no capture capability exists.
    pub fn start_recording(&mut self) -> Result<()> {
        self.recorder.start()
    }

    pub fn stop_recording(&mut self) {
        self.recorder.stop();
    }

    pub fn toggle_recording(&mut self) {
        if self.recorder.state() == RecordingState::Recording {
            self.stop_recording();
        } else {
            self.start_recording_logged();
        }
    }

    /// Apply pending capture completions; returns a newly finished recording.
    pub fn pump_recording(&mut self) -> Option<&RecordingArtifact> {
        self.recorder.pump()
    }

    /// Stop the loop, force-end any recording and flush settings.
    pub fn shutdown(&mut self) {
        self.scheduler.cancel();
        self.recorder.teardown();
        self.persist();
    }

    fn start_recording_logged(&mut self) {
        match self.start_recording() {
            // Already logged and kept on the recorder for display.
            Err(err) if err.is_user_facing() => debug!("cannot start recording: {err}"),
            Err(err) => warn!("cannot start recording: {err}"),
            Ok(()) => {}
        }
    }

    fn manual_change(&mut self) {
        self.active_preset_id = None;
        self.config_changed();
    }

    fn config_changed(&mut self) {
        if self.scheduler.is_running() {
            self.scheduler.restart();
        }
        self.persist();
    }

    fn persist(&mut self) {
        let settings = self.settings();
        if let Some(persistence) = self.persistence.as_mut() {
            if let Err(err) = persistence.save(&settings) {
                warn!("failed to save settings: {err}");
            }
        }
    }
}

impl Drop for TrailEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}
