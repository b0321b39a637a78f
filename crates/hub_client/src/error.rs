//! Error type for hub operations.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, HubError>;

/// Error type for hub operations.
#[derive(Debug, Error)]
pub enum HubError {
    /// No stored credential (or it could not be used)
    #[error("Not authenticated; run `hubsync login` first")]
    NotAuthenticated,
    /// DNS, TLS, timeout or connection failure
    #[error("Network error: {0}")]
    Network(String),
    /// HTTP error with status code and raw body
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },
    /// No application matched the lookup key
    #[error("no application found for {key}")]
    NotFound { key: String },
    /// More than one application matched the lookup key
    #[error("{count} applications match {key}; exactly one is required")]
    Ambiguous { key: String, count: usize },
    /// The Hub returned a record that does not match what was asked for
    #[error("{field} mismatch: expected '{expected}', got '{actual}'")]
    Mismatch {
        field: &'static str,
        expected: String,
        actual: String,
    },
    /// Bad flag combination or unusable path
    #[error("{0}")]
    Validation(String),
    /// Archive entry would land outside the destination directory
    #[error("archive entry '{entry}' escapes the destination directory")]
    PathEscape { entry: String },
    /// Malformed or unreadable archive
    #[error("Extraction error: {0}")]
    Extraction(String),
    /// Token could not be decoded, or no refresh token is available
    #[error("Token error: {0}")]
    Token(String),
    /// JSON/YAML decoding error
    #[error("Parse error: {0}")]
    Parse(String),
    /// File I/O error
    #[error("I/O error: {0}")]
    Io(String),
}

/// Coarse classification of a [`HubError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Authentication,
    Transport,
    HttpStatus,
    Resolution,
    Validation,
    Extraction,
    Io,
}

impl HubError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            HubError::NotAuthenticated | HubError::Token(_) => ErrorKind::Authentication,
            HubError::Network(_) => ErrorKind::Transport,
            HubError::Http { .. } => ErrorKind::HttpStatus,
            HubError::NotFound { .. } | HubError::Ambiguous { .. } | HubError::Mismatch { .. } => {
                ErrorKind::Resolution
            }
            HubError::Validation(_) | HubError::Parse(_) => ErrorKind::Validation,
            HubError::PathEscape { .. } | HubError::Extraction(_) => ErrorKind::Extraction,
            HubError::Io(_) => ErrorKind::Io,
        }
    }

    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            HubError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<std::io::Error> for HubError {
    fn from(e: std::io::Error) -> Self {
        HubError::Io(e.to_string())
    }
}

impl From<reqwest::Error> for HubError {
    fn from(e: reqwest::Error) -> Self {
        HubError::Network(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        assert_eq!(HubError::NotAuthenticated.kind(), ErrorKind::Authentication);
        assert_eq!(
            HubError::Http { status: 500, body: String::new() }.kind(),
            ErrorKind::HttpStatus
        );
        assert_eq!(
            HubError::Ambiguous { key: "x".into(), count: 2 }.kind(),
            ErrorKind::Resolution
        );
        assert_eq!(
            HubError::PathEscape { entry: "../a".into() }.kind(),
            ErrorKind::Extraction
        );
    }

    #[test]
    fn test_http_display_carries_status_and_body() {
        let err = HubError::Http { status: 404, body: "no such thing".into() };
        assert_eq!(err.to_string(), "HTTP 404: no such thing");
        assert_eq!(err.status(), Some(404));
    }
}
