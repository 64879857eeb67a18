// crates/tenant-guard-token/src/codec.rs
// ============================================================================
// Module: Token Codec
// Description: Encode, verify, and inspect compact signed identity tokens.
// Purpose: Wrap jsonwebtoken with the identity authority's claim rules.
// Dependencies: jsonwebtoken, base64, serde_json
// ============================================================================

//! ## Overview
//! [`encode`] signs claims with a private JWK; [`decode`] verifies the
//! signature and expiration with a public JWK. Registered-claim presence is
//! enforced by [`TokenClaims`] deserialization rather than by the library,
//! because system tokens carry no expiration.
//!
//! Audience checks are disabled by default; the authorization stage owns
//! audience semantics.
//! Security posture: [`peek_unverified`] and [`get_claim`] are untrusted reads.

// ============================================================================
// SECTION: Imports
// ============================================================================

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use jsonwebtoken::Algorithm;
use jsonwebtoken::Header;
use jsonwebtoken::Validation;
use jsonwebtoken::errors::ErrorKind;
use serde_json::Map;
use serde_json::Value;

use crate::claims::TokenClaims;
use crate::error::TokenError;
use crate::jwk::Jwk;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum accepted token length in bytes.
const MAX_TOKEN_BYTES: usize = 16 * 1024;

// ============================================================================
// SECTION: Options
// ============================================================================

/// Verification options for [`decode`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Verify the `aud` claim against [`DecodeOptions::audience`].
    pub verify_audience: bool,
    /// Accepted audiences when audience verification is enabled.
    pub audience: Vec<String>,
    /// Clock skew tolerance for expiration, in seconds.
    pub leeway_secs: u64,
}

// ============================================================================
// SECTION: Codec
// ============================================================================

/// Signs claims with a private JWK.
///
/// # Errors
///
/// Returns [`TokenError::Encode`] on missing or malformed private key
/// material and when the algorithm does not fit the key.
pub fn encode(
    claims: &TokenClaims,
    private_key: &Jwk,
    algorithm: Algorithm,
) -> Result<String, TokenError> {
    let key = private_key.encoding_key()?;
    let mut header = Header::new(algorithm);
    header.kid.clone_from(&private_key.kid);
    jsonwebtoken::encode(&header, claims, &key).map_err(|err| TokenError::Encode(err.to_string()))
}

/// Verifies a token and returns its claims.
///
/// # Errors
///
/// Returns [`TokenError::Expired`] for expired tokens and
/// [`TokenError::Invalid`] for every other verification failure.
pub fn decode(
    token: &str,
    public_key: &Jwk,
    algorithm: Algorithm,
    options: &DecodeOptions,
) -> Result<TokenClaims, TokenError> {
    if token.len() > MAX_TOKEN_BYTES {
        return Err(TokenError::Invalid("token exceeds size limit".to_string()));
    }
    let key = public_key.decoding_key()?;
    let mut validation = Validation::new(algorithm);
    validation.required_spec_claims.clear();
    validation.validate_exp = true;
    validation.leeway = options.leeway_secs;
    validation.validate_aud = options.verify_audience;
    if options.verify_audience {
        if options.audience.is_empty() {
            return Err(TokenError::Invalid(
                "audience verification requires an expected audience".to_string(),
            ));
        }
        validation.set_audience(&options.audience);
    }
    jsonwebtoken::decode::<TokenClaims>(token, &key, &validation)
        .map(|data| data.claims)
        .map_err(|err| match err.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Invalid(err.to_string()),
        })
}

/// Parses claims without verifying the signature.
///
/// Used only to learn which tenant key verifies the token. The result is
/// untrusted.
///
/// # Errors
///
/// Returns [`TokenError::Malformed`] when the token is not three base64url
/// segments with a JSON object payload.
pub fn peek_unverified(token: &str) -> Result<Map<String, Value>, TokenError> {
    if token.len() > MAX_TOKEN_BYTES {
        return Err(TokenError::Malformed("token exceeds size limit".to_string()));
    }
    let mut segments = token.split('.');
    let (Some(_header), Some(payload), Some(_signature), None) =
        (segments.next(), segments.next(), segments.next(), segments.next())
    else {
        return Err(TokenError::Malformed("expected three token segments".to_string()));
    };
    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|err| TokenError::Malformed(format!("claims segment: {err}")))?;
    match serde_json::from_slice::<Value>(&bytes) {
        Ok(Value::Object(claims)) => Ok(claims),
        Ok(_) => Err(TokenError::Malformed("claims segment is not an object".to_string())),
        Err(err) => Err(TokenError::Malformed(format!("claims segment: {err}"))),
    }
}

/// Reads one unverified claim, returning `default` on any failure.
///
/// Diagnostics only; never use the result for an authorization decision.
#[must_use]
pub fn get_claim(token: &str, key: &str, default: Value) -> Value {
    peek_unverified(token).ok().and_then(|mut claims| claims.remove(key)).unwrap_or(default)
}
