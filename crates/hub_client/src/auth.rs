//! Credential storage.
//!
//! Reads/writes ~/.config/hubsync/auth.json (0600 on Unix, directory 0700).
//! One Hub session at a time: login and refresh overwrite the whole record.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{HubError, Result};

/// Authentication credentials stored locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    /// Hub base URL (e.g., "https://hub.example.com")
    #[serde(default)]
    pub host: String,
    /// Bearer token sent on every authenticated request
    #[serde(rename = "token")]
    pub access_token: String,
    /// Token exchanged at /auth/refresh for a new access token
    #[serde(rename = "refresh", default)]
    pub refresh_token: String,
    /// User name (for display)
    #[serde(default)]
    pub user: String,
    /// Expiry hint returned by the Hub (Unix seconds)
    #[serde(rename = "expiry", default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
}

/// Somewhere a single [`Credential`] can live.
pub trait CredentialStore {
    /// Load the stored credential. Absence is [`HubError::NotAuthenticated`].
    fn load(&self) -> Result<Credential>;

    /// Replace the stored credential.
    fn save(&self, creds: &Credential) -> Result<()>;

    /// Remove the stored credential. Succeeds if there is none.
    fn delete(&self) -> Result<()>;
}

/// Returns the path to the auth credentials file.
pub fn auth_file_path() -> Option<PathBuf> {
    dirs::config_dir().map(|c| c.join("hubsync/auth.json"))
}

/// JSON file backend.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    /// Store at the fixed per-user location.
    pub fn default_location() -> Result<Self> {
        let path = auth_file_path()
            .ok_or_else(|| HubError::Io("Could not determine config directory".into()))?;
        Ok(Self { path })
    }

    /// Store at an explicit path.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> Result<Credential> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(HubError::NotAuthenticated);
            }
            Err(e) => {
                return Err(HubError::Io(format!(
                    "Failed to read {}: {}",
                    self.path.display(),
                    e
                )));
            }
        };
        serde_json::from_str(&contents)
            .map_err(|e| HubError::Parse(format!("Invalid auth file {}: {}", self.path.display(), e)))
    }

    fn save(&self, creds: &Credential) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            create_private_dir(parent)
                .map_err(|e| HubError::Io(format!("Failed to create config directory: {}", e)))?;
        }

        let contents = serde_json::to_string_pretty(creds)
            .map_err(|e| HubError::Parse(format!("Failed to serialize credentials: {}", e)))?;

        write_private_file(&self.path, contents.as_bytes())
            .map_err(|e| HubError::Io(format!("Failed to write auth file: {}", e)))?;

        log::debug!("saved credential for {} to {}", creds.host, self.path.display());
        Ok(())
    }

    fn delete(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(HubError::Io(format!("Failed to delete auth file: {}", e))),
        }
    }
}

fn create_private_dir(dir: &Path) -> std::io::Result<()> {
    if dir.as_os_str().is_empty() || dir.is_dir() {
        return Ok(());
    }
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o700);
    }
    builder.create(dir)
}

fn write_private_file(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    file.write_all(contents)?;

    // An existing file keeps its old mode through open(); tighten it.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    }
    Ok(())
}
