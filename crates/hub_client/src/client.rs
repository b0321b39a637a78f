//! Hub HTTP client.
//!
//! Blocking reqwest client (no Tokio runtime required).
//! Every GET goes through one dispatch loop that owns the auth decision
//! and the single retry on 401.

use std::io::{self, Read, Write};
use std::path::Path;

use reqwest::blocking::{Client, Response};
use reqwest::header::ACCEPT;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;

use crate::auth::{Credential, CredentialStore};
use crate::error::{HubError, Result};
use crate::settings::Settings;
use crate::token;

/// Media types the Hub serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accept {
    Json,
    Yaml,
    OctetStream,
}

impl Accept {
    pub fn as_str(self) -> &'static str {
        match self {
            Accept::Json => "application/json",
            Accept::Yaml => "application/x-yaml",
            Accept::OctetStream => "application/octet-stream",
        }
    }
}

/// How many sends and token refreshes one logical request may use.
///
/// Both refresh triggers (token already expired before sending, 401 after
/// sending) draw from the same `max_refreshes` budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub max_refreshes: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 2, max_refreshes: 1 }
    }
}

/// Per-request budget drawn from a [`RetryPolicy`].
#[derive(Debug)]
struct RetryBudget {
    refreshes_left: u32,
}

impl RetryBudget {
    fn take_refresh(&mut self) -> bool {
        if self.refreshes_left == 0 {
            return false;
        }
        self.refreshes_left -= 1;
        true
    }
}

enum AuthMode {
    /// Explicit host override: no credential is read or written.
    Anonymous { host: String },
    Stored(Box<dyn CredentialStore>),
}

/// Hub API client (blocking).
pub struct HubClient {
    http: Client,
    auth: AuthMode,
    policy: RetryPolicy,
}

impl std::fmt::Debug for HubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mode = match &self.auth {
            AuthMode::Anonymous { host } => format!("anonymous({})", host),
            AuthMode::Stored(_) => "stored".to_string(),
        };
        f.debug_struct("HubClient")
            .field("auth", &mode)
            .field("policy", &self.policy)
            .finish()
    }
}

impl HubClient {
    /// Client that authenticates with the credential in `store`.
    pub fn with_store(store: Box<dyn CredentialStore>, settings: &Settings) -> Result<Self> {
        Ok(Self {
            http: build_http(settings)?,
            auth: AuthMode::Stored(store),
            policy: RetryPolicy::default(),
        })
    }

    /// Client that talks to `host` without any credential.
    pub fn anonymous(host: &str, settings: &Settings) -> Result<Self> {
        Ok(Self {
            http: build_http(settings)?,
            auth: AuthMode::Anonymous { host: host.trim_end_matches('/').to_string() },
            policy: RetryPolicy::default(),
        })
    }

    /// Replace the default retry budget. At least one send is always made.
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = RetryPolicy {
            max_attempts: policy.max_attempts.max(1),
            ..policy
        };
        self
    }

    /// Underlying HTTP client (used for login).
    pub fn http(&self) -> &Client {
        &self.http
    }

    /// GET and decode a JSON body.
    pub fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let bytes = self.get_bytes(path, query, Accept::Json)?;
        serde_json::from_slice(&bytes).map_err(|e| HubError::Parse(format!("{}: {}", path, e)))
    }

    /// GET and decode a YAML body.
    pub fn get_yaml<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let bytes = self.get_bytes(path, &[], Accept::Yaml)?;
        serde_yaml::from_slice(&bytes).map_err(|e| HubError::Parse(format!("{}: {}", path, e)))
    }

    /// GET and buffer the whole body.
    pub fn get_bytes(&self, path: &str, query: &[(&str, String)], accept: Accept) -> Result<Vec<u8>> {
        let response = self.dispatch(path, query, accept)?;
        let bytes = response.bytes()?;
        Ok(bytes.to_vec())
    }

    /// GET an octet stream and copy it into `dest`. Returns bytes written.
    ///
    /// Only a 2xx answer is written; anything else is `Http`.
    pub fn download(&self, path: &str, dest: &Path) -> Result<u64> {
        let mut response = self.dispatch(path, &[], Accept::OctetStream)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text()?;
            return Err(HubError::Http { status: status.as_u16(), body });
        }

        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = std::fs::File::create(dest)?;
        let mut buf = vec![0u8; 64 * 1024];
        let mut written = 0u64;
        loop {
            let n = match response.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(HubError::Network(format!("reading {}: {}", path, e))),
            };
            file.write_all(&buf[..n])
                .map_err(|e| HubError::Io(format!("writing {}: {}", dest.display(), e)))?;
            written += n as u64;
        }
        file.flush()
            .map_err(|e| HubError::Io(format!("writing {}: {}", dest.display(), e)))?;
        Ok(written)
    }

    // ── Dispatch ────────────────────────────────────────────────────

    /// Send one logical GET. At most `max_attempts` sends; a 401 is retried
    /// only while the refresh budget lasts. Statuses >= 400 become errors.
    fn dispatch(&self, path: &str, query: &[(&str, String)], accept: Accept) -> Result<Response> {
        let mut budget = RetryBudget { refreshes_left: self.policy.max_refreshes };
        let mut attempt = 1;

        loop {
            let (host, bearer) = self.prepare_auth(attempt, &mut budget)?;
            let url = endpoint(&host, path);
            log::debug!("GET {} (attempt {}/{})", url, attempt, self.policy.max_attempts);

            let mut request = self.http.get(&url).header(ACCEPT, accept.as_str());
            if !query.is_empty() {
                request = request.query(query);
            }
            if let Some(token) = &bearer {
                request = request.bearer_auth(token);
            }
            let response = request.send()?;
            let status = response.status();

            if status == StatusCode::UNAUTHORIZED
                && attempt < self.policy.max_attempts
                && self.is_authenticated()
                && budget.take_refresh()
            {
                drop(response);
                log::debug!("{} returned 401; refreshing token and retrying", url);
                self.refresh_stored()?;
                attempt += 1;
                continue;
            }

            if status.as_u16() >= 400 {
                let body = response.text()?;
                return Err(HubError::Http { status: status.as_u16(), body });
            }
            return Ok(response);
        }
    }

    fn is_authenticated(&self) -> bool {
        matches!(self.auth, AuthMode::Stored(_))
    }

    /// Host and bearer token for the next send.
    fn prepare_auth(&self, attempt: u32, budget: &mut RetryBudget) -> Result<(String, Option<String>)> {
        let store = match &self.auth {
            AuthMode::Anonymous { host } => return Ok((host.clone(), None)),
            AuthMode::Stored(store) => store,
        };

        let creds = store.load()?;
        let expired = token::is_expired(&creds.access_token).unwrap_or_else(|e| {
            log::debug!("treating unreadable access token as expired: {}", e);
            true
        });
        if !expired {
            return Ok((creds.host, Some(creds.access_token)));
        }

        if attempt == 1 && budget.take_refresh() {
            log::debug!("access token expired; refreshing before send");
            match token::refresh(&self.http, &creds) {
                Ok(fresh) => {
                    store.save(&fresh)?;
                    return Ok((fresh.host, Some(fresh.access_token)));
                }
                Err(e) => {
                    log::warn!("token refresh failed, sending request without a token: {}", e);
                    return Ok((creds.host, None));
                }
            }
        }

        log::warn!("access token expired and no refresh left; sending request without a token");
        Ok((creds.host, None))
    }

    fn refresh_stored(&self) -> Result<Credential> {
        let AuthMode::Stored(store) = &self.auth else {
            return Err(HubError::NotAuthenticated);
        };
        let creds = store.load()?;
        let fresh = token::refresh(&self.http, &creds)?;
        store.save(&fresh)?;
        Ok(fresh)
    }
}

fn build_http(settings: &Settings) -> Result<Client> {
    Client::builder()
        .user_agent(format!("hubsync/{}", env!("CARGO_PKG_VERSION")))
        .timeout(settings.timeout())
        .build()
        .map_err(|e| HubError::Network(format!("Failed to create HTTP client: {}", e)))
}

/// Join a host and an absolute API path.
pub(crate) fn endpoint(host: &str, path: &str) -> String {
    let host = host.trim_end_matches('/');
    if path.starts_with('/') {
        format!("{}{}", host, path)
    } else {
        format!("{}/{}", host, path)
    }
}
