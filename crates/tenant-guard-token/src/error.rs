// crates/tenant-guard-token/src/error.rs
// ============================================================================
// Module: Token Errors
// Description: Error taxonomy for token encoding and verification.
// Purpose: Distinguish malformed, invalid, and expired tokens.
// Dependencies: thiserror
// ============================================================================

//! Token codec errors.

use thiserror::Error;

/// Token codec failures.
///
/// # Invariants
/// - Variants are stable for error classification.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// Signing failed (malformed key material or claims).
    #[error("token encode failed: {0}")]
    Encode(String),
    /// Signature or standard-claim verification failed.
    #[error("token invalid: {0}")]
    Invalid(String),
    /// Token expired.
    #[error("token expired")]
    Expired,
    /// Token could not be parsed at all.
    #[error("token malformed: {0}")]
    Malformed(String),
    /// Key type, curve, or size is not supported.
    #[error("unsupported key: {0}")]
    UnsupportedKey(String),
}
