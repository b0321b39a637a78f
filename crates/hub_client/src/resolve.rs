//! Application lookup.
//!
//! Turns a repository URL (optionally `:branch`) or a binary identifier into
//! exactly one Hub application. Zero or several matches are errors, and the
//! single match is checked field-by-field against what was asked for.

use serde::{Deserialize, Serialize};

use crate::client::HubClient;
use crate::error::{HubError, Result};

/// Application record as served by `/applications`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    /// Binary identifier (e.g. Maven coordinates)
    #[serde(rename = "binary", default, skip_serializing_if = "Option::is_none")]
    pub binary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<Repository>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
}

/// What to look an application up by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplicationLookup {
    Repository { url: String, branch: String },
    Binary(String),
}

impl ApplicationLookup {
    /// Build a lookup from the two mutually exclusive inputs.
    /// `url` may carry a `:branch` suffix.
    pub fn from_inputs(url: Option<&str>, binary: Option<&str>) -> Result<Self> {
        let url = url.map(str::trim).filter(|s| !s.is_empty());
        let binary = binary.map(str::trim).filter(|s| !s.is_empty());

        match (url, binary) {
            (Some(_), Some(_)) => Err(HubError::Validation(
                "specify either a repository URL or a binary identifier, not both".into(),
            )),
            (None, None) => Err(HubError::Validation(
                "a repository URL or a binary identifier is required".into(),
            )),
            (Some(u), None) => {
                let (url, branch) = parse_url_with_branch(u);
                Ok(ApplicationLookup::Repository { url, branch })
            }
            (None, Some(b)) => Ok(ApplicationLookup::Binary(b.to_string())),
        }
    }

    /// Human-readable key used in error messages.
    pub fn key(&self) -> String {
        match self {
            ApplicationLookup::Repository { url, branch } if branch.is_empty() => {
                format!("repository URL '{}'", url)
            }
            ApplicationLookup::Repository { url, branch } => {
                format!("repository URL '{}' (branch '{}')", url, branch)
            }
            ApplicationLookup::Binary(binary) => format!("binary '{}'", binary),
        }
    }
}

/// Split `scheme://host/path:branch` into URL and branch.
///
/// Only a colon after the scheme separator counts, and the last one wins.
/// No such colon means an empty branch.
pub fn parse_url_with_branch(input: &str) -> (String, String) {
    let after_scheme = input.find("://").map(|i| i + 3).unwrap_or(0);
    match input[after_scheme..].rfind(':') {
        Some(i) => {
            let split = after_scheme + i;
            (input[..split].to_string(), input[split + 1..].to_string())
        }
        None => (input.to_string(), String::new()),
    }
}

/// Resolve `lookup` to exactly one application.
pub fn resolve_application(client: &HubClient, lookup: &ApplicationLookup) -> Result<Application> {
    let matches: Vec<Application> = match lookup {
        ApplicationLookup::Repository { url, .. } => {
            log::debug!("looking up application by repository URL {}", url);
            let filter = format!("repository.url='{}'", url);
            client.get_json("/applications", &[("filter", filter)])?
        }
        ApplicationLookup::Binary(binary) => {
            // The Hub filter has no binary field; fetch everything and filter here.
            log::debug!("looking up application by binary {}", binary);
            let all: Vec<Application> = client.get_json("/applications", &[])?;
            all.into_iter()
                .filter(|app| app.binary.as_deref() == Some(binary.as_str()))
                .collect()
        }
    };

    let app = single_match(lookup, matches)?;
    verify_match(lookup, &app)?;
    log::debug!("resolved {} to application {}", lookup.key(), app.id);
    Ok(app)
}

fn single_match(lookup: &ApplicationLookup, mut matches: Vec<Application>) -> Result<Application> {
    match matches.len() {
        0 => Err(HubError::NotFound { key: lookup.key() }),
        1 => Ok(matches.remove(0)),
        count => Err(HubError::Ambiguous { key: lookup.key(), count }),
    }
}

/// Re-check the server's filtering against the requested values.
fn verify_match(lookup: &ApplicationLookup, app: &Application) -> Result<()> {
    match lookup {
        ApplicationLookup::Repository { url, branch } => {
            let repo = app.repository.as_ref();
            let actual_url = repo.map(|r| r.url.as_str()).unwrap_or_default();
            if actual_url != url {
                return Err(HubError::Mismatch {
                    field: "repository URL",
                    expected: url.clone(),
                    actual: actual_url.to_string(),
                });
            }

            let actual_branch = repo.and_then(|r| r.branch.as_deref()).unwrap_or_default();
            if !branch.is_empty() && !actual_branch.is_empty() && actual_branch != branch {
                return Err(HubError::Mismatch {
                    field: "repository branch",
                    expected: branch.clone(),
                    actual: actual_branch.to_string(),
                });
            }
        }
        ApplicationLookup::Binary(binary) => {
            let actual = app.binary.as_deref().unwrap_or_default();
            if actual != binary {
                return Err(HubError::Mismatch {
                    field: "binary",
                    expected: binary.clone(),
                    actual: actual.to_string(),
                });
            }
        }
    }
    Ok(())
}
