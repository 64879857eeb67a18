// crates/tenant-guard-handlers/src/error.rs
// ============================================================================
// Module: Pipeline Errors
// Description: Error taxonomy surfaced by pipeline stages and authorities.
// Purpose: Give callers a structured, fail-closed denial.
// Dependencies: thiserror, tenant-guard-token
// ============================================================================

//! ## Overview
//! [`GuardError`] is the only error a pipeline run returns. Remote clients
//! report [`AuthorityError`], which the stages fold into the matching
//! [`GuardError`] variant so callers never see transport detail as a
//! distinct outcome.

use tenant_guard_token::TokenError;
use thiserror::Error;

// ============================================================================
// SECTION: Pipeline Errors
// ============================================================================

/// Structured pipeline denial.
///
/// # Invariants
/// - Variants are stable for error classification.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GuardError {
    /// Token missing, unparsable, unverifiable, or unsupported; or the
    /// identity authority could not be reached.
    #[error("authentication failed: {0}")]
    Authentication(String),
    /// Permission pattern mismatch or authorization authority denial.
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    /// Required handler configuration is missing or invalid.
    #[error("handler configuration error: {0}")]
    Configuration(String),
}

impl GuardError {
    /// Returns a stable label for audit events.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Authentication(_) => "authentication_failure",
            Self::PermissionDenied(_) => "permission_denied",
            Self::Configuration(_) => "configuration_error",
        }
    }

    /// Returns the human-readable reason.
    #[must_use]
    pub fn reason(&self) -> &str {
        match self {
            Self::Authentication(reason)
            | Self::PermissionDenied(reason)
            | Self::Configuration(reason) => reason,
        }
    }
}

impl From<TokenError> for GuardError {
    fn from(error: TokenError) -> Self {
        match error {
            TokenError::Expired => Self::Authentication("token expired".to_string()),
            TokenError::Malformed(_) => Self::Authentication("failed to decode token".to_string()),
            TokenError::Invalid(reason) => Self::Authentication(format!("invalid token: {reason}")),
            TokenError::UnsupportedKey(reason) => {
                Self::Authentication(format!("unsupported tenant key: {reason}"))
            }
            TokenError::Encode(reason) => Self::Authentication(reason),
        }
    }
}

// ============================================================================
// SECTION: Authority Errors
// ============================================================================

/// Remote authority failures.
///
/// # Invariants
/// - Variants are stable for error classification.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthorityError {
    /// Transport failure or timeout.
    #[error("authority unavailable: {0}")]
    Unavailable(String),
    /// The authority answered with a non-success status.
    #[error("authority rejected request: {0}")]
    Rejected(String),
    /// The response body could not be interpreted.
    #[error("authority response invalid: {0}")]
    InvalidResponse(String),
}
