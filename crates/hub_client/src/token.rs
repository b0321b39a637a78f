//! Access token lifecycle: expiry check, login, refresh.
//!
//! Tokens are read, never verified. The Hub is the only authority on
//! whether a token is valid; the client just peeks at `exp` to avoid
//! sending one it already knows is stale.

use std::time::{SystemTime, UNIX_EPOCH};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde_json::{Map, Value};

use crate::auth::Credential;
use crate::client::endpoint;
use crate::error::{HubError, Result};

/// Decide whether an access token is stale.
///
/// `Ok(true)` / `Ok(false)` is a definite answer. An `Err` means the token
/// could not be read and must be treated as expired.
pub fn is_expired(token: &str) -> Result<bool> {
    if token.is_empty() {
        return Ok(true);
    }

    let claims = decode_claims(token)?;
    let exp = match claims.get("exp") {
        None => return Ok(false),
        Some(Value::Number(n)) => n
            .as_f64()
            .ok_or_else(|| HubError::Token("exp claim is not a number".into()))?,
        Some(other) => {
            return Err(HubError::Token(format!("exp claim is not numeric: {}", other)));
        }
    };

    Ok(now_unix() > exp)
}

/// Decode the claims segment of a three-part token without checking the signature.
pub fn decode_claims(token: &str) -> Result<Map<String, Value>> {
    let parts: Vec<&str> = token.split('.').collect();
    let [_, payload, _] = parts.as_slice() else {
        return Err(HubError::Token(format!(
            "expected 3 dot-separated segments, found {}",
            parts.len()
        )));
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| HubError::Token(format!("claims are not base64url: {}", e)))?;

    match serde_json::from_slice(&bytes) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(HubError::Token("claims are not a JSON object".into())),
        Err(e) => Err(HubError::Token(format!("claims are not JSON: {}", e))),
    }
}

/// Exchange user name and password for a credential (`POST /auth/login`).
pub fn login(
    http: &reqwest::blocking::Client,
    host: &str,
    user: &str,
    password: &str,
) -> Result<Credential> {
    let url = endpoint(host, "/auth/login");
    log::debug!("POST {}", url);

    let response = http
        .post(&url)
        .json(&serde_json::json!({ "user": user, "password": password }))
        .send()?;

    let mut creds = read_credential(response)?;
    creds.host = host.trim_end_matches('/').to_string();
    if creds.user.is_empty() {
        creds.user = user.to_string();
    }
    Ok(creds)
}

/// Obtain a fresh access token (`POST /auth/refresh`).
///
/// The caller persists the result.
pub fn refresh(http: &reqwest::blocking::Client, creds: &Credential) -> Result<Credential> {
    if creds.refresh_token.is_empty() {
        return Err(HubError::Token("no refresh token available".into()));
    }

    let url = endpoint(&creds.host, "/auth/refresh");
    log::debug!("POST {}", url);

    let response = http
        .post(&url)
        .json(&serde_json::json!({ "refresh": creds.refresh_token }))
        .send()?;

    let mut fresh = read_credential(response)?;
    if fresh.host.is_empty() {
        fresh.host = creds.host.clone();
    }
    if fresh.user.is_empty() {
        fresh.user = creds.user.clone();
    }
    Ok(fresh)
}

fn read_credential(response: reqwest::blocking::Response) -> Result<Credential> {
    let status = response.status();
    let body = response.text()?;
    if !status.is_success() {
        return Err(HubError::Http { status: status.as_u16(), body });
    }
    serde_json::from_str(&body).map_err(|e| HubError::Parse(format!("auth response: {}", e)))
}

fn now_unix() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or_default()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use httpmock::prelude::*;

    /// Build an unsigned three-part token carrying `claims`.
    pub(crate) fn make_token(claims: serde_json::Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
        format!("{}.{}.c2lnbmF0dXJl", header, payload)
    }

    fn unix_now() -> i64 {
        now_unix() as i64
    }

    #[test]
    fn test_empty_token_is_expired() {
        assert!(is_expired("").unwrap());
    }

    #[test]
    fn test_past_exp_is_expired() {
        let token = make_token(serde_json::json!({ "sub": "alice", "exp": unix_now() - 60 }));
        assert!(is_expired(&token).unwrap());
    }

    #[test]
    fn test_future_exp_is_not_expired() {
        let token = make_token(serde_json::json!({ "sub": "alice", "exp": unix_now() + 3600 }));
        assert!(!is_expired(&token).unwrap());
    }

    #[test]
    fn test_missing_exp_never_expires() {
        let token = make_token(serde_json::json!({ "sub": "alice" }));
        assert!(!is_expired(&token).unwrap());
    }

    #[test]
    fn test_unparseable_token_is_error() {
        assert!(matches!(is_expired("garbage"), Err(HubError::Token(_))));
        assert!(matches!(is_expired("a.!!!.c"), Err(HubError::Token(_))));
    }

    #[test]
    fn test_string_exp_is_format_error() {
        let token = make_token(serde_json::json!({ "exp": "tomorrow" }));
        let err = is_expired(&token).unwrap_err();
        assert!(err.to_string().contains("not numeric"));
    }

    #[test]
    fn test_null_exp_is_format_error() {
        let token = make_token(serde_json::json!({ "exp": null }));
        assert!(matches!(is_expired(&token), Err(HubError::Token(_))));
    }

    #[test]
    fn test_float_exp_accepted() {
        let token = make_token(serde_json::json!({ "exp": (unix_now() + 3600) as f64 + 0.5 }));
        assert!(!is_expired(&token).unwrap());
    }

    #[test]
    fn test_padded_payload_decodes() {
        let token = make_token(serde_json::json!({ "a": 1 }));
        let parts: Vec<&str> = token.split('.').collect();
        let padded = format!("{}.{}==.{}", parts[0], parts[1], parts[2]);
        assert_eq!(decode_claims(&padded).unwrap()["a"], 1);
    }

    #[test]
    fn test_refresh_requires_refresh_token() {
        let creds = Credential {
            host: "http://127.0.0.1:1".into(),
            access_token: "a".into(),
            refresh_token: String::new(),
            user: "alice".into(),
            expires_at: None,
        };
        let http = reqwest::blocking::Client::new();
        let err = refresh(&http, &creds).unwrap_err();
        assert_eq!(err.to_string(), "Token error: no refresh token available");
    }

    #[test]
    fn test_refresh_keeps_host_when_omitted() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/auth/refresh")
                .json_body(serde_json::json!({ "refresh": "ref-1" }));
            then.status(200).json_body(serde_json::json!({
                "token": "new-token",
                "refresh": "ref-2",
                "user": "alice",
                "expiry": 1_900_000_000
            }));
        });

        let creds = Credential {
            host: server.base_url(),
            access_token: "old".into(),
            refresh_token: "ref-1".into(),
            user: "alice".into(),
            expires_at: None,
        };
        let http = reqwest::blocking::Client::new();
        let fresh = refresh(&http, &creds).unwrap();

        mock.assert();
        assert_eq!(fresh.host, server.base_url());
        assert_eq!(fresh.access_token, "new-token");
        assert_eq!(fresh.refresh_token, "ref-2");
        assert_eq!(fresh.expires_at, Some(1_900_000_000));
    }

    #[test]
    fn test_refresh_keeps_user_when_omitted() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/auth/refresh");
            then.status(200).json_body(serde_json::json!({
                "token": "new-token",
                "refresh": "ref-2"
            }));
        });

        let creds = Credential {
            host: server.base_url(),
            access_token: "old".into(),
            refresh_token: "ref-1".into(),
            user: "alice".into(),
            expires_at: None,
        };
        let http = reqwest::blocking::Client::new();
        let fresh = refresh(&http, &creds).unwrap();
        assert_eq!(fresh.user, "alice");
        assert_eq!(fresh.access_token, "new-token");
    }

    #[test]
    fn test_refresh_rejected_carries_status_and_body() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/auth/refresh");
            then.status(403).body("refresh token revoked");
        });

        let creds = Credential {
            host: server.base_url(),
            access_token: "old".into(),
            refresh_token: "ref-1".into(),
            user: "alice".into(),
            expires_at: None,
        };
        let http = reqwest::blocking::Client::new();
        match refresh(&http, &creds).unwrap_err() {
            HubError::Http { status, body } => {
                assert_eq!(status, 403);
                assert_eq!(body, "refresh token revoked");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_login_sets_host() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/auth/login")
                .json_body(serde_json::json!({ "user": "alice", "password": "s3cret" }));
            then.status(201).json_body(serde_json::json!({
                "token": "tok",
                "refresh": "ref",
                "user": "alice"
            }));
        });

        let http = reqwest::blocking::Client::new();
        let host = format!("{}/", server.base_url());
        let creds = login(&http, &host, "alice", "s3cret").unwrap();

        mock.assert();
        assert_eq!(creds.host, server.base_url());
        assert_eq!(creds.access_token, "tok");
        assert_eq!(creds.refresh_token, "ref");
        assert!(creds.expires_at.is_none());
    }

    #[test]
    fn test_login_bad_password() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/auth/login");
            then.status(401).body("invalid credentials");
        });

        let http = reqwest::blocking::Client::new();
        let err = login(&http, &server.base_url(), "alice", "nope").unwrap_err();
        assert_eq!(err.status(), Some(401));
    }
}
