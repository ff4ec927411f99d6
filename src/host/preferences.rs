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
use std::{
    collections::{BTreeMap, HashMap, HashSet},
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use tracing::{debug, info};

use super::NumberSetting;

/// Errors reading or writing the preferences file.
#[derive(Debug, thiserror::Error)]
pub enum PreferencesError {
    #[error("Preferences I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Preferences parse error: {0}")]
    Yaml(#[from] serde_yml::Error),

    #[error("Unknown setting: {0}")]
    UnknownSetting(String),
}

/// A change to an observed setting, to be delivered to the extension.
#[derive(Debug, Clone, PartialEq)]
pub struct SettingChange {
    pub id: String,
    pub value: f64,
}

/// Number settings persisted to a YAML file as a flat map of setting id to value.
pub struct Preferences {
    path: Option<PathBuf>,
    values: BTreeMap<String, f64>,
    settings: HashMap<String, NumberSetting>,
    observed: HashSet<String>,
}

impl Preferences {
    /// Creates preferences that are never written to disk.
    pub fn in_memory() -> Preferences {
        Preferences {
            path: None,
            values: BTreeMap::new(),
            settings: HashMap::new(),
            observed: HashSet::new(),
        }
    }

    /// Loads the preferences from the file. A missing file yields empty preferences
    /// that will be created on the first change.
    pub fn load(path: &Path) -> Result<Preferences, PreferencesError> {
        let values = match fs::read_to_string(path) {
            Ok(contents) if contents.trim().is_empty() => BTreeMap::new(),
            Ok(contents) => serde_yml::from_str(&contents)?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!(path = %path.display(), "No preferences file, using defaults.");
                BTreeMap::new()
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Preferences {
            path: Some(path.to_path_buf()),
            values,
            settings: HashMap::new(),
            observed: HashSet::new(),
        })
    }

    /// Registers the setting and returns its current raw value.
    pub fn number_setting(&mut self, id: &str, setting: &NumberSetting) -> f64 {
        self.settings.insert(id.to_string(), setting.clone());
        match self.values.get(id) {
            Some(value) => setting.clamp(*value),
            None => setting.default,
        }
    }

    /// Subscribes to changes of the setting.
    pub fn observe(&mut self, id: &str) {
        self.observed.insert(id.to_string());
    }

    /// The raw value of a registered setting.
    pub fn get(&self, id: &str) -> Option<f64> {
        let setting = self.settings.get(id)?;
        Some(
            self.values
                .get(id)
                .map_or(setting.default, |value| setting.clamp(*value)),
        )
    }

    /// Changes a registered setting and persists the preferences. Returns the
    /// change to deliver if the setting is observed and its value changed.
    pub fn set(&mut self, id: &str, raw: f64) -> Result<Option<SettingChange>, PreferencesError> {
        let setting = self
            .settings
            .get(id)
            .ok_or_else(|| PreferencesError::UnknownSetting(id.to_string()))?;
        let value = setting.clamp(raw);
        let previous = self.get(id);

        let mut values = self.values.clone();
        values.insert(id.to_string(), value);
        self.write(&values)?;
        self.values = values;

        if previous == Some(value) || !self.observed.contains(id) {
            debug!(id, value, "Setting unchanged or unobserved.");
            return Ok(None);
        }

        Ok(Some(SettingChange {
            id: id.to_string(),
            value,
        }))
    }

    /// Writes the preferences to disk, if they have a file.
    pub fn save(&self) -> Result<(), PreferencesError> {
        self.write(&self.values)
    }

    fn write(&self, values: &BTreeMap<String, f64>) -> Result<(), PreferencesError> {
        let path = match &self.path {
            Some(path) => path,
            None => return Ok(()),
        };

        let serialized = serde_yml::to_string(values)?;
        let mut file = fs::File::create(path)?;
        file.write_all(serialized.as_bytes())?;
        debug!(path = %path.display(), "Saved preferences.");
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use std::{error::Error, fs};

    use crate::{host::NumberSetting, triggers::TRIGGERS};

    use super::{Preferences, PreferencesError, SettingChange};

    #[test]
    fn missing_file_uses_defaults() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let mut preferences = Preferences::load(&dir.path().join("preferences.yaml"))?;

        let setting = NumberSetting::note(&TRIGGERS[0]);
        assert_eq!(-1.0, preferences.number_setting("gknt-play", &setting));
        Ok(())
    }

    #[test]
    fn load_and_save() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("preferences.yaml");
        fs::write(&path, "gknt-play: 60\ngknt-stop: 300\n")?;

        let mut preferences = Preferences::load(&path)?;
        assert_eq!(
            60.0,
            preferences.number_setting("gknt-play", &NumberSetting::note(&TRIGGERS[0]))
        );
        assert_eq!(
            127.0,
            preferences.number_setting("gknt-stop", &NumberSetting::note(&TRIGGERS[1]))
        );
        preferences.observe("gknt-play");

        assert_eq!(
            Some(SettingChange {
                id: "gknt-play".to_string(),
                value: 62.0,
            }),
            preferences.set("gknt-play", 62.0)?
        );
        // Same value again, nothing to deliver.
        assert_eq!(None, preferences.set("gknt-play", 62.0)?);
        // Not observed, persisted but not delivered.
        assert_eq!(None, preferences.set("gknt-stop", -1.0)?);

        let mut reloaded = Preferences::load(&path)?;
        assert_eq!(
            62.0,
            reloaded.number_setting("gknt-play", &NumberSetting::note(&TRIGGERS[0]))
        );
        assert_eq!(
            -1.0,
            reloaded.number_setting("gknt-stop", &NumberSetting::note(&TRIGGERS[1]))
        );
        Ok(())
    }

    #[test]
    fn set_clamps() -> Result<(), Box<dyn Error>> {
        let mut preferences = Preferences::in_memory();
        preferences.number_setting("gknt-record", &NumberSetting::note(&TRIGGERS[2]));
        preferences.observe("gknt-record");

        let change = preferences.set("gknt-record", 1000.0)?;
        assert_eq!(Some(127.0), change.map(|change| change.value));
        assert_eq!(Some(127.0), preferences.get("gknt-record"));
        Ok(())
    }

    #[test]
    fn float_values_load() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("preferences.yaml");
        fs::write(&path, "gknt-play: 36.0\ngknt-stop: 40.7\n")?;

        let mut preferences = Preferences::load(&path)?;
        assert_eq!(
            36.0,
            preferences.number_setting("gknt-play", &NumberSetting::note(&TRIGGERS[0]))
        );
        assert_eq!(
            41.0,
            preferences.number_setting("gknt-stop", &NumberSetting::note(&TRIGGERS[1]))
        );
        Ok(())
    }

    #[test]
    fn failed_save_keeps_previous_value() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let missing = dir.path().join("missing");
        let mut preferences = Preferences::load(&missing.join("preferences.yaml"))?;
        preferences.number_setting("gknt-play", &NumberSetting::note(&TRIGGERS[0]));
        preferences.observe("gknt-play");

        assert!(matches!(
            preferences.set("gknt-play", 60.0),
            Err(PreferencesError::Io(_))
        ));
        assert_eq!(Some(-1.0), preferences.get("gknt-play"));

        // Once the file can be written, the same change is still delivered.
        fs::create_dir(&missing)?;
        assert_eq!(
            Some(SettingChange {
                id: "gknt-play".to_string(),
                value: 60.0,
            }),
            preferences.set("gknt-play", 60.0)?
        );
        Ok(())
    }

    #[test]
    fn unknown_setting() {
        let mut preferences = Preferences::in_memory();
        assert!(matches!(
            preferences.set("gknt-rewind", 1.0),
            Err(PreferencesError::UnknownSetting(_))
        ));
    }

    #[test]
    fn malformed_file() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("preferences.yaml");
        fs::write(&path, "gknt-play: [1, 2\n")?;

        assert!(matches!(
            Preferences::load(&path),
            Err(PreferencesError::Yaml(_))
        ));
        Ok(())
    }
}
