//! Persisted trail settings.
//!
//! The payload is read once at startup and rewritten on every configuration
//! change afterwards. Loading validates each field on its own: a missing or
//! wrong-typed field falls back to its default without affecting the others.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};
use trailcast_platform::{KeyValueStore, Rgb};

use crate::config::{TrailConfig, TrailStyle, FADE_MAX, FADE_MIN, SIZE_MAX, SIZE_MIN};
use crate::error::{Error, Result};
use crate::preset;

pub const SETTINGS_KEY: &str = "cursor-trail-settings-v1";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub is_active: bool,
    pub trail_style: TrailStyle,
    pub trail_color: Rgb,
    pub trail_size: u32,
    pub fade_speed: u32,
    pub active_preset_id: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self::capture(true, &TrailConfig::default(), None)
    }
}

impl Settings {
    pub fn capture(is_active: bool, config: &TrailConfig, active_preset_id: Option<&str>) -> Self {
        Self {
            is_active,
            trail_style: config.style.clone(),
            trail_color: config.color,
            trail_size: config.size,
            fade_speed: config.fade_rate,
            active_preset_id: active_preset_id.map(str::to_string),
        }
    }

    pub fn trail_config(&self) -> TrailConfig {
        TrailConfig {
            style: self.trail_style.clone(),
            color: self.trail_color,
            size: self.trail_size,
            fade_rate: self.fade_speed,
        }
    }

    /// Parse a stored payload, falling back per field. Never fails.
    pub fn from_json(raw: &str) -> Self {
        let mut settings = Self::default();
        let fields = match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(fields)) => fields,
            Ok(_) => {
                warn!("stored settings are not an object, using defaults");
                return settings;
            }
            Err(err) => {
                warn!("stored settings are not valid JSON ({err}), using defaults");
                return settings;
            }
        };

        if let Some(active) = field(&fields, "isActive", Value::as_bool) {
            settings.is_active = active;
        }
        if let Some(style) = field(&fields, "trailStyle", |v| {
            v.as_str()
                .and_then(|name| name.parse::<TrailStyle>().ok())
                .filter(TrailStyle::is_known)
        }) {
            settings.trail_style = style;
        }
        if let Some(color) = field(&fields, "trailColor", |v| v.as_str()?.parse::<Rgb>().ok()) {
            settings.trail_color = color;
        }
        if let Some(size) = field(&fields, "trailSize", |v| whole_number(v, SIZE_MIN, SIZE_MAX)) {
            settings.trail_size = size;
        }
        if let Some(fade) = field(&fields, "fadeSpeed", |v| whole_number(v, FADE_MIN, FADE_MAX)) {
            settings.fade_speed = fade;
        }
        if let Some(id) = field(&fields, "activePresetId", |v| match v {
            Value::Null => Some(None),
            Value::String(id) => preset::find(id).map(|p| Some(p.id.to_string())),
            _ => None,
        }) {
            settings.active_preset_id = id;
        }
        settings
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

fn field<T>(
    fields: &Map<String, Value>,
    name: &str,
    read: impl Fn(&Value) -> Option<T>,
) -> Option<T> {
    let value = fields.get(name)?;
    let parsed = read(value);
    if parsed.is_none() {
        debug!(field = name, %value, "ignoring malformed settings field");
    }
    parsed
}

fn whole_number(value: &Value, min: u32, max: u32) -> Option<u32> {
    let number = value.as_f64().filter(|n| n.is_finite())?;
    Some(number.round().clamp(f64::from(min), f64::from(max)) as u32)
}

/// Reads the payload once, then writes it back on every change.
pub struct SettingsPersistence {
    store: Box<dyn KeyValueStore>,
    loaded: bool,
}

impl std::fmt::Debug for SettingsPersistence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettingsPersistence")
            .field("loaded", &self.loaded)
            .finish_non_exhaustive()
    }
}

impl SettingsPersistence {
    pub fn new(store: Box<dyn KeyValueStore>) -> Self {
        Self {
            store,
            loaded: false,
        }
    }

    /// Read the stored payload. Missing, unreadable or malformed data yields defaults.
    pub fn load(&mut self) -> Settings {
        let settings = match self.store.get(SETTINGS_KEY) {
            Ok(Some(raw)) => Settings::from_json(&raw),
            Ok(None) => Settings::default(),
            Err(err) => {
                warn!("failed to read settings: {err}");
                Settings::default()
            }
        };
        self.loaded = true;
        settings
    }

    /// Write `settings`. Skipped until the initial load has completed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Settings`] when the store rejects the write.
    pub fn save(&mut self, settings: &Settings) -> Result<()> {
        if !self.loaded {
            debug!("settings not loaded yet, skipping save");
            return Ok(());
        }
        let payload = settings.to_json()?;
        self.store
            .set(SETTINGS_KEY, &payload)
            .map_err(|err| Error::settings(err.to_string()))
    }
}

/// Volatile store, used when no on-disk location is available.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> trailcast_platform::Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> trailcast_platform::Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
