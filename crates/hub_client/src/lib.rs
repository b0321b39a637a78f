//! Hub API client: shared by the CLI and its tests.
//!
//! This crate owns the Hub wire contract: login and token refresh,
//! authenticated GETs with a single retry on 401, application lookup,
//! and profile bundle download + extraction.
//!
//! Blocking and sequential. No caching of Hub responses.

mod archive;
mod auth;
mod bundle;
mod client;
mod error;
mod resolve;
mod settings;
mod token;

pub use archive::{clean_path, extract_archive, extract_from_reader, is_gzip, GZIP_MAGIC};
pub use auth::{auth_file_path, Credential, CredentialStore, FileCredentialStore};
pub use bundle::{
    download_bundle, list_profiles, sync_profiles, DownloadTarget, ProfileRef, SyncReport,
    SyncedProfile,
};
pub use client::{Accept, HubClient, RetryPolicy};
pub use error::{ErrorKind, HubError, Result};
pub use resolve::{
    parse_url_with_branch, resolve_application, Application, ApplicationLookup, Repository,
};
pub use settings::{settings_path, Settings};
pub use token::{decode_claims, is_expired, login, refresh};
