// User settings
// Loaded from ~/.config/hubsync/settings.json

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{HubError, Result};

/// Per-user client settings. Every field has a default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Timeout applied to every outbound request
    pub timeout_secs: u64,

    /// Directory (relative to the sync base path) that receives bundles
    pub profiles_dir: String,

    /// Hub used by `login` when no host is given
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            profiles_dir: ".hub/profiles".to_string(),
            host: None,
        }
    }
}

impl Settings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Load settings from the default location; a missing file yields defaults.
    pub fn load() -> Result<Self> {
        match settings_path() {
            Some(path) => Self::load_from(path),
            None => Ok(Self::default()),
        }
    }

    pub fn load_from(path: PathBuf) -> Result<Self> {
        let contents = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(HubError::Io(format!("{}: {}", path.display(), e))),
        };
        serde_json::from_str(&contents)
            .map_err(|e| HubError::Parse(format!("{}: {}", path.display(), e)))
    }
}

pub fn settings_path() -> Option<PathBuf> {
    dirs::config_dir().map(|c| c.join("hubsync/settings.json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load_from(dir.path().join("settings.json")).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"timeout_secs": 5, "host": "https://hub.local"}"#).unwrap();

        let settings = Settings::load_from(path).unwrap();
        assert_eq!(settings.timeout_secs, 5);
        assert_eq!(settings.host.as_deref(), Some("https://hub.local"));
        assert_eq!(settings.profiles_dir, ".hub/profiles");
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{").unwrap();
        assert!(matches!(Settings::load_from(path), Err(HubError::Parse(_))));
    }
}
