//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract and scripts rely on them.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain           | Description                              |
//! |---------|------------------|------------------------------------------|
//! | 0       | Universal        | Success                                  |
//! | 1       | Universal        | General error (unspecified)              |
//! | 2       | Universal        | CLI usage error (bad args, bad path)     |
//! | 40-49   | hub              | Hub auth/transport/lookup/bundle codes   |
//!
//! There is no partial-success code: a sync that extracted some profiles
//! and then failed exits with the code of the failure.
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into `hub_exit_code`

use hubsync_client::{ErrorKind, HubError};

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, conflicting options, unusable paths.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Hub (40-49)
// =============================================================================

/// Not authenticated (no saved credential, or the Hub rejected it).
pub const EXIT_HUB_NOT_AUTH: u8 = 40;

/// Application lookup failed: no match, several matches, or a field mismatch.
pub const EXIT_HUB_RESOLUTION: u8 = 41;

/// Network error (DNS, TLS, timeout, connection refused).
pub const EXIT_HUB_NETWORK: u8 = 42;

/// Hub answered with an error status.
pub const EXIT_HUB_HTTP: u8 = 43;

/// Bundle could not be extracted (malformed archive, path escape).
pub const EXIT_HUB_EXTRACT: u8 = 44;

// =============================================================================
// Hub Error Types
// =============================================================================

/// Map a HubError to its exit code.
pub fn hub_exit_code(err: &HubError) -> u8 {
    match err.kind() {
        ErrorKind::Authentication => EXIT_HUB_NOT_AUTH,
        ErrorKind::Transport => EXIT_HUB_NETWORK,
        ErrorKind::HttpStatus => match err.status() {
            Some(401) | Some(403) => EXIT_HUB_NOT_AUTH,
            _ => EXIT_HUB_HTTP,
        },
        ErrorKind::Resolution => EXIT_HUB_RESOLUTION,
        ErrorKind::Validation => match err {
            HubError::Parse(_) => EXIT_ERROR,
            _ => EXIT_USAGE,
        },
        ErrorKind::Extraction => EXIT_HUB_EXTRACT,
        ErrorKind::Io => EXIT_ERROR,
    }
}
