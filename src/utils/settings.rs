use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::constants::{DEFAULT_OUTPUT_DIR, DEFAULT_PIECE_FILE};
use crate::error::ErrorClass;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("cannot access settings file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed settings file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl SettingsError {
    pub fn class(&self) -> ErrorClass {
        match self {
            SettingsError::Io { .. } => ErrorClass::ResourceUnavailable,
            SettingsError::Parse { .. } => ErrorClass::DataDefect,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct GeneratorSettings {
    #[serde(default)]
    pub datagen: DatagenSettings,
    #[serde(default)]
    pub world: WorldSettings,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct DatagenSettings {
    pub output_dir: PathBuf,
    /// 0 means one worker per CPU.
    pub worker_count: usize,
    pub enforce_unique_identifiers: bool,
}

impl Default for DatagenSettings {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            worker_count: 0,
            enforce_unique_identifiers: false,
        }
    }
}

impl DatagenSettings {
    pub fn workers(&self) -> usize {
        if self.worker_count == 0 {
            num_cpus::get()
        } else {
            self.worker_count
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct WorldSettings {
    pub seed: u32,
    /// Templates missing from memory are looked up here.
    pub templates_dir: Option<PathBuf>,
    pub chunk_radius: i32,
    pub piece_file: PathBuf,
}

impl Default for WorldSettings {
    fn default() -> Self {
        Self {
            seed: 12345,
            templates_dir: None,
            chunk_radius: 1,
            piece_file: PathBuf::from(DEFAULT_PIECE_FILE),
        }
    }
}

pub fn save_settings(path: &Path, settings: &GeneratorSettings) -> Result<(), SettingsError> {
    let io = |source| SettingsError::Io {
        path: path.to_path_buf(),
        source,
    };
    let text = serde_json::to_string_pretty(settings).map_err(|source| SettingsError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io)?;
    }
    fs::write(path, text).map_err(io)
}

/// A missing file yields the defaults.
pub fn load_settings(path: &Path) -> Result<GeneratorSettings, SettingsError> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::debug!("No settings at {}, using defaults", path.display());
            return Ok(GeneratorSettings::default());
        }
        Err(source) => {
            return Err(SettingsError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    serde_json::from_str(&text).map_err(|source| SettingsError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = load_settings(&dir.path().join("minegen.json")).unwrap();
        assert_eq!(settings, GeneratorSettings::default());
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("minegen.json");
        fs::write(&path, r#"{"world": {"seed": 7}}"#).unwrap();
        let settings = load_settings(&path).unwrap();
        assert_eq!(settings.world.seed, 7);
        assert_eq!(settings.world.chunk_radius, 1);
        assert_eq!(settings.datagen, DatagenSettings::default());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conf").join("minegen.json");
        let mut settings = GeneratorSettings::default();
        settings.datagen.worker_count = 3;
        settings.datagen.enforce_unique_identifiers = true;
        save_settings(&path, &settings).unwrap();
        assert_eq!(load_settings(&path).unwrap(), settings);
        assert_eq!(settings.datagen.workers(), 3);
    }

    #[test]
    fn malformed_file_is_data_defect() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("minegen.json");
        fs::write(&path, "{ not json").unwrap();
        assert_eq!(load_settings(&path).unwrap_err().class(), ErrorClass::DataDefect);
    }
}
