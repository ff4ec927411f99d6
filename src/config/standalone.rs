// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::path::{Path, PathBuf};

use config::{Config, File};
use serde::Deserialize;

use super::error::ConfigError;
use crate::keyfilter::ConflictPolicy;

const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_TRACK_COUNT: usize = 8;

/// The configuration for the standalone host.
#[derive(Deserialize, Clone)]
pub struct Standalone {
    /// The MIDI device to watch for notes.
    midi_device: String,

    /// The MIDI device that notes passing the key filter are sent to.
    thru_device: Option<String>,

    /// The preferences file holding the trigger notes. Relative paths are
    /// resolved against the directory of the configuration file.
    preferences: String,

    /// The default log level, used when RUST_LOG is not set.
    log_level: Option<String>,

    /// What happens to a stolen note when its previous owner moves away.
    conflict_policy: Option<ConflictPolicy>,

    /// If false, claimed notes still pass through. Useful for debugging.
    consume_events: Option<bool>,

    /// Logs every incoming MIDI message.
    debug_midi: Option<bool>,

    /// The number of tracks the cursor can move over.
    tracks: Option<usize>,

    /// The directory the configuration was loaded from.
    #[serde(skip)]
    base_path: PathBuf,
}

impl Standalone {
    /// Creates a new configuration.
    pub fn new(midi_device: &str, thru_device: Option<&str>, preferences: &str) -> Standalone {
        Standalone {
            midi_device: midi_device.to_string(),
            thru_device: thru_device.map(str::to_string),
            preferences: preferences.to_string(),
            log_level: None,
            conflict_policy: None,
            consume_events: None,
            debug_midi: None,
            tracks: None,
            base_path: PathBuf::new(),
        }
    }

    /// Parses the configuration from a YAML file.
    pub fn deserialize(path: &Path) -> Result<Standalone, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }

        let mut standalone = Config::builder()
            .add_source(File::from(path))
            .build()?
            .try_deserialize::<Standalone>()?;
        standalone.base_path = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        standalone.validate()?;
        Ok(standalone)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.midi_device.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "midi_device",
                reason: "must name a device".to_string(),
            });
        }
        if self.tracks == Some(0) {
            return Err(ConfigError::Invalid {
                field: "tracks",
                reason: "at least one track is required".to_string(),
            });
        }
        Ok(())
    }

    pub fn midi_device(&self) -> &str {
        &self.midi_device
    }

    pub fn thru_device(&self) -> Option<&str> {
        self.thru_device.as_deref()
    }

    /// The resolved path of the preferences file.
    pub fn preferences(&self) -> PathBuf {
        self.base_path.join(&self.preferences)
    }

    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }

    pub fn conflict_policy(&self) -> ConflictPolicy {
        self.conflict_policy.unwrap_or_default()
    }

    pub fn consume_events(&self) -> bool {
        self.consume_events.unwrap_or(true)
    }

    pub fn debug_midi(&self) -> bool {
        self.debug_midi.unwrap_or(false)
    }

    pub fn tracks(&self) -> usize {
        self.tracks.unwrap_or(DEFAULT_TRACK_COUNT)
    }
}
