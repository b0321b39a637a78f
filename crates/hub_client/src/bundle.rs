//! Profile bundles: list an application's profiles, download each bundle,
//! unpack it next to the archive, then remove the archive.
//!
//! Sequential and fail-fast: the first profile that fails stops the run.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::archive::extract_archive;
use crate::client::HubClient;
use crate::error::{HubError, Result};
use crate::resolve::{resolve_application, Application, ApplicationLookup};

/// Analysis profile owned by an application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileRef {
    pub id: u64,
    #[serde(default)]
    pub name: String,
}

/// Where one profile's bundle goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTarget {
    pub destination_directory: PathBuf,
    pub archive_path: PathBuf,
    pub extracted_directory: PathBuf,
}

impl DownloadTarget {
    /// `<base>/<profiles_dir>/profile-<id>.tar`, unpacked into `profile-<id>/`.
    pub fn for_profile(base: &Path, profiles_dir: &str, profile_id: u64) -> Self {
        let destination_directory = base.join(profiles_dir);
        let archive_path = destination_directory.join(format!("profile-{}.tar", profile_id));
        let extracted_directory = archive_path.with_extension("");
        Self { destination_directory, archive_path, extracted_directory }
    }
}

/// One successfully synced profile.
#[derive(Debug, Clone, Serialize)]
pub struct SyncedProfile {
    pub profile: ProfileRef,
    pub path: PathBuf,
    pub bytes: u64,
    pub entries: usize,
}

/// Outcome of [`sync_profiles`].
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub application: Application,
    pub profiles: Vec<SyncedProfile>,
}

/// List the analysis profiles of an application, in Hub order.
pub fn list_profiles(client: &HubClient, application_id: u64) -> Result<Vec<ProfileRef>> {
    let path = format!("/applications/{}/analysis/profiles", application_id);
    client.get_yaml(&path)
}

/// Download one profile's bundle and unpack it.
pub fn download_bundle(client: &HubClient, profile: &ProfileRef, target: &DownloadTarget) -> Result<SyncedProfile> {
    let path = format!("/analysis/profiles/{}/bundle", profile.id);
    let bytes = client.download(&path, &target.archive_path)?;
    log::debug!("saved {} bytes to {}", bytes, target.archive_path.display());

    let entries = extract_archive(&target.archive_path, &target.extracted_directory)?;

    if let Err(e) = fs::remove_file(&target.archive_path) {
        log::warn!("could not remove {}: {}", target.archive_path.display(), e);
    }

    Ok(SyncedProfile {
        profile: profile.clone(),
        path: target.extracted_directory.clone(),
        bytes,
        entries,
    })
}

/// Resolve the application, then download and unpack every profile bundle
/// under `base`.
pub fn sync_profiles(
    client: &HubClient,
    lookup: &ApplicationLookup,
    base: &Path,
    profiles_dir: &str,
) -> Result<SyncReport> {
    if !base.is_dir() {
        return Err(HubError::Validation(format!(
            "{} is not a directory",
            base.display()
        )));
    }

    let application = resolve_application(client, lookup)?;
    let profiles = list_profiles(client, application.id)?;
    log::debug!("application {} has {} profile(s)", application.id, profiles.len());

    let mut synced = Vec::with_capacity(profiles.len());
    for profile in &profiles {
        let target = DownloadTarget::for_profile(base, profiles_dir, profile.id);
        let done = download_bundle(client, profile, &target)?;
        log::info!("profile {} ({}) -> {}", profile.id, profile.name, done.path.display());
        synced.push(done);
    }

    Ok(SyncReport { application, profiles: synced })
}
