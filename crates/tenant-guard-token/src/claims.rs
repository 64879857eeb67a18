// crates/tenant-guard-token/src/claims.rs
// ============================================================================
// Module: Token Claims
// Description: Structured identity token payload.
// Purpose: Validate claim presence and types at the trust boundary.
// Dependencies: tenant-guard-core, serde
// ============================================================================

//! ## Overview
//! Registered claims used by the pipeline are typed fields; anything else
//! lands in [`TokenClaims::extensions`]. Deserialization fails when a
//! required claim is missing or carries an unknown classification, so a
//! verified [`TokenClaims`] never needs presence checks downstream.
//!
//! Claim names follow the identity authority's wire format:
//!
//! | claim | meaning |
//! |---|---|
//! | `iss` | issuer |
//! | `typ` | token type |
//! | `own` | owner type |
//! | `did` | tenant id |
//! | `wid` | workspace id |
//! | `aud` | audience (user id or app id) |
//! | `jti` | session key or client id |
//! | `rol` | role type |
//! | `ver` | protocol version |

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use tenant_guard_core::OwnerType;
use tenant_guard_core::TenantId;
use tenant_guard_core::TokenType;
use tenant_guard_core::WorkspaceId;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Protocol versions accepted for user and app tokens.
pub const SUPPORTED_TOKEN_VERSIONS: &[&str] = &["2.0"];

// ============================================================================
// SECTION: Claims
// ============================================================================

/// Decoded identity token payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Issuer.
    pub iss: String,
    /// Token type.
    pub typ: TokenType,
    /// Owner type.
    pub own: OwnerType,
    /// Tenant id.
    pub did: TenantId,
    /// Workspace id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wid: Option<WorkspaceId>,
    /// Audience (user id or app id).
    pub aud: String,
    /// Expiration (seconds since epoch).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
    /// Issued at (seconds since epoch).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    /// Token id (session key or client id).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
    /// Role type label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rol: Option<String>,
    /// Granted permission patterns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Vec<String>>,
    /// Accessible projects.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub projects: Option<Vec<String>>,
    /// Protocol version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ver: Option<String>,
    /// Custom claims not interpreted by the pipeline.
    #[serde(flatten)]
    pub extensions: Map<String, Value>,
}

impl TokenClaims {
    /// Builds claims with the required fields set and everything else empty.
    #[must_use]
    pub fn new(
        iss: impl Into<String>,
        typ: TokenType,
        own: OwnerType,
        did: TenantId,
        aud: impl Into<String>,
    ) -> Self {
        Self {
            iss: iss.into(),
            typ,
            own,
            did,
            wid: None,
            aud: aud.into(),
            exp: None,
            iat: None,
            jti: None,
            rol: None,
            permissions: None,
            projects: None,
            ver: None,
            extensions: Map::new(),
        }
    }

    /// Returns true for privileged system tokens.
    #[must_use]
    pub fn is_system_token(&self) -> bool {
        self.typ == TokenType::SystemToken
    }

    /// Returns true when `ver` is a supported protocol version.
    #[must_use]
    pub fn has_supported_version(&self) -> bool {
        self.ver.as_deref().is_some_and(|ver| SUPPORTED_TOKEN_VERSIONS.contains(&ver))
    }
}
