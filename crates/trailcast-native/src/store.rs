//! Key-value store persisted as a flat JSON object on disk.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::{debug, warn};
use trailcast_platform::KeyValueStore;

use crate::error::{Error, Result};

#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl JsonFileStore {
    /// Open `path`, starting empty when the file does not exist yet.
    ///
    /// A file that is not a JSON object is moved aside to `*.bak` and the
    /// store starts empty. Entries whose value is not a string are dropped.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let entries = match fs::read_to_string(&path) {
            Ok(raw) if raw.trim().is_empty() => BTreeMap::new(),
            Ok(raw) => match serde_json::from_str::<Map<String, Value>>(&raw) {
                Ok(object) => string_entries(&path, object),
                Err(err) => {
                    set_aside(&path, &err);
                    BTreeMap::new()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => return Err(err.into()),
        };
        debug!(path = %path.display(), keys = entries.len(), "settings store opened");
        Ok(Self { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_string_pretty(&self.entries).map_err(|source| Error::Json {
            path: self.path.clone(),
            source,
        })?;
        // Write-then-rename so a crash never leaves a truncated file behind.
        let staging = self.path.with_extension("json.tmp");
        fs::write(&staging, raw)?;
        fs::rename(&staging, &self.path)?;
        Ok(())
    }
}

fn string_entries(path: &Path, object: Map<String, Value>) -> BTreeMap<String, String> {
    object
        .into_iter()
        .filter_map(|(key, value)| match value {
            Value::String(text) => Some((key, text)),
            other => {
                warn!(path = %path.display(), key, "dropping non-string entry {other}");
                None
            }
        })
        .collect()
}

fn set_aside(path: &Path, err: &serde_json::Error) {
    let backup = path.with_extension("json.bak");
    match fs::rename(path, &backup) {
        Ok(()) => warn!(
            path = %path.display(),
            backup = %backup.display(),
            "unreadable settings moved aside: {err}"
        ),
        Err(rename_err) => warn!(
            path = %path.display(),
            "unreadable settings ignored ({err}); could not move aside: {rename_err}"
        ),
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> trailcast_platform::Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> trailcast_platform::Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        self.flush()?;
        Ok(())
    }
}
