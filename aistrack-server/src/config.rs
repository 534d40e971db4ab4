//! Settings file loading.
//!
//! Settings path: `~/.config/aistrack/settings.json` (platform equivalent via
//! `directories`). A missing default file means defaults; a malformed one is
//! a startup error.

use aistrack_core::TrackerSettings;
use directories::ProjectDirs;
use log::{debug, info};
use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use thiserror::Error;

const SETTINGS_FILE: &str = "settings.json";
const MAX_TRAIL_LENGTH: usize = 10_000;
const MAX_SWEEP_INTERVAL_MS: u64 = 3_600_000;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read settings file '{0}'")]
    Io(PathBuf, #[source] io::Error),
    #[error("Cannot parse settings file '{0}'")]
    Json(PathBuf, #[source] serde_json::Error),
    #[error("Invalid setting: {0}")]
    Invalid(String),
}

pub fn get_project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("org", "aistrack", "aistrack")
}

/// Location of the settings file when none is given on the command line
pub fn default_settings_path() -> Option<PathBuf> {
    get_project_dirs().map(|dirs| dirs.config_dir().join(SETTINGS_FILE))
}

/// Load tracker settings.
///
/// An explicit `path` must exist. Without one the default location is tried
/// and defaults are used when nothing is there.
pub fn load_settings(path: Option<&Path>) -> Result<TrackerSettings, ConfigError> {
    let settings = match path {
        Some(path) => read_settings(path)?,
        None => match default_settings_path() {
            Some(path) if path.exists() => read_settings(&path)?,
            Some(path) => {
                debug!("No settings file at {}, using defaults", path.display());
                TrackerSettings::default()
            }
            None => {
                debug!("No configuration directory, using defaults");
                TrackerSettings::default()
            }
        },
    };
    validate(&settings)?;
    Ok(settings)
}

fn read_settings(path: &Path) -> Result<TrackerSettings, ConfigError> {
    let file = File::open(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
    let settings = serde_json::from_reader(BufReader::new(file))
        .map_err(|e| ConfigError::Json(path.to_path_buf(), e))?;
    info!("Loaded settings from {}", path.display());
    Ok(settings)
}

/// Reject settings the tracker cannot run with
pub fn validate(settings: &TrackerSettings) -> Result<(), ConfigError> {
    if settings.sweep_interval_ms == 0 {
        return Err(ConfigError::Invalid("sweepIntervalMs must be positive".into()));
    }
    if settings.sweep_interval_ms > MAX_SWEEP_INTERVAL_MS {
        return Err(ConfigError::Invalid(format!(
            "sweepIntervalMs must not exceed {}",
            MAX_SWEEP_INTERVAL_MS
        )));
    }
    if settings.trail_length > MAX_TRAIL_LENGTH {
        return Err(ConfigError::Invalid(format!(
            "trailLength must not exceed {}",
            MAX_TRAIL_LENGTH
        )));
    }
    if !(settings.plausibility_factor > 0.0) {
        return Err(ConfigError::Invalid(
            "plausibilityFactor must be positive".into(),
        ));
    }
    for (name, thresholds) in [("classA", &settings.class_a), ("classB", &settings.class_b)] {
        if thresholds.lost_after_secs > thresholds.remove_after_secs {
            return Err(ConfigError::Invalid(format!(
                "{}.lostAfterSecs exceeds removeAfterSecs",
                name
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_file(dir: &TempDir, contents: &str) -> PathBuf {
        let path = dir.path().join(SETTINGS_FILE);
        let mut file = File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_load_partial_settings() {
        let temp = TempDir::new().unwrap();
        let path = write_file(&temp, r#"{"trailLength": 60, "dedupIntervalMs": 250}"#);

        let settings = load_settings(Some(&path)).unwrap();
        assert_eq!(settings.trail_length, 60);
        assert_eq!(settings.dedup_interval_ms, 250);
        assert_eq!(settings.sweep_interval_ms, 1000);
        assert_eq!(settings.class_a.confirm_after_messages, 2);
    }

    #[test]
    fn test_missing_explicit_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nope.json");
        assert!(matches!(load_settings(Some(&path)), Err(ConfigError::Io(..))));
    }

    #[test]
    fn test_malformed_file() {
        let temp = TempDir::new().unwrap();
        let path = write_file(&temp, "{ trailLength: ");
        assert!(matches!(load_settings(Some(&path)), Err(ConfigError::Json(..))));
    }

    #[test]
    fn test_invalid_values() {
        let temp = TempDir::new().unwrap();
        let path = write_file(&temp, r#"{"sweepIntervalMs": 0}"#);
        assert!(matches!(load_settings(Some(&path)), Err(ConfigError::Invalid(_))));

        let path = write_file(
            &temp,
            r#"{"classB": {"confirmAfterMessages": 3, "confirmMaxAgeSecs": 90, "lostAfterSecs": 700, "removeAfterSecs": 600, "maxSpeedKn": 50}}"#,
        );
        assert!(matches!(load_settings(Some(&path)), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_upper_bounds() {
        let huge_trail = TrackerSettings {
            trail_length: usize::MAX / 2,
            ..Default::default()
        };
        assert!(matches!(validate(&huge_trail), Err(ConfigError::Invalid(_))));

        let huge_sweep = TrackerSettings {
            sweep_interval_ms: u64::MAX,
            ..Default::default()
        };
        assert!(matches!(validate(&huge_sweep), Err(ConfigError::Invalid(_))));

        let at_limits = TrackerSettings {
            trail_length: MAX_TRAIL_LENGTH,
            sweep_interval_ms: MAX_SWEEP_INTERVAL_MS,
            ..Default::default()
        };
        assert!(validate(&at_limits).is_ok());
    }
}
