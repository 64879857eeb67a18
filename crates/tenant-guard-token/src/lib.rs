// crates/tenant-guard-token/src/lib.rs
// ============================================================================
// Module: Tenant Guard Token Codec
// Description: Signed identity token encoding, verification, and inspection.
// Purpose: Expose the JWK model and the compact signed-token codec.
// Dependencies: jsonwebtoken, ed25519-dalek, rsa, base64, serde
// ============================================================================

//! ## Overview
//! Identity tokens are compact signed tokens (`header.claims.signature`,
//! base64url segments) signed with an asymmetric key. The verifying side
//! fetches one public JWK per tenant; the private half is held only by the
//! issuing authority.
//!
//! [`peek_unverified`] and [`get_claim`] read claims without verifying the
//! signature. Their output is untrusted and only used to locate the tenant
//! key or for diagnostics; trust comes from [`decode`].

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod claims;
pub mod codec;
pub mod error;
pub mod jwk;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use claims::SUPPORTED_TOKEN_VERSIONS;
pub use claims::TokenClaims;
pub use codec::DecodeOptions;
pub use codec::decode;
pub use codec::encode;
pub use codec::get_claim;
pub use codec::peek_unverified;
pub use error::TokenError;
pub use jsonwebtoken::Algorithm;
pub use jwk::DEFAULT_RSA_KEY_BITS;
pub use jwk::ED25519_KEY_BITS;
pub use jwk::Jwk;
pub use jwk::KeyPair;
pub use jwk::KeyType;
pub use jwk::generate_key_pair;
