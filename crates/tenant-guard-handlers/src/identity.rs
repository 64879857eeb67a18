// crates/tenant-guard-handlers/src/identity.rs
// ============================================================================
// Module: Identity Authority
// Description: Remote lookups of tenant verification keys and app grants.
// Purpose: Fetch what authentication needs from the identity service.
// Dependencies: reqwest, serde, tenant-guard-token
// ============================================================================

//! ## Overview
//! [`IdentityAuthority`] abstracts the identity service. The HTTP
//! implementation calls `Tenant.get_public_key` and `App.check` with the
//! privileged system credential. Results are not cached here; see
//! [`crate::KeyResolver`].
//! Security posture: responses are untrusted; malformed keys fail closed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use reqwest::blocking::Client;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use tenant_guard_core::ClientId;
use tenant_guard_core::TenantId;
use tenant_guard_token::Jwk;
use tracing::debug;

use crate::error::AuthorityError;
use crate::http::bearer_headers;
use crate::http::build_client;
use crate::http::post_json;

// ============================================================================
// SECTION: Interface
// ============================================================================

/// Identity service interface.
pub trait IdentityAuthority: Send + Sync {
    /// Returns the verification key for a tenant.
    ///
    /// # Errors
    ///
    /// Returns [`AuthorityError`] when the lookup fails.
    fn get_public_key(&self, tenant_id: &TenantId) -> Result<Jwk, AuthorityError>;

    /// Returns the permission patterns granted to an app client.
    ///
    /// A response without permissions yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns [`AuthorityError`] when the lookup fails.
    fn check_app(
        &self,
        client_id: &ClientId,
        tenant_id: &TenantId,
    ) -> Result<Vec<String>, AuthorityError>;
}

// ============================================================================
// SECTION: Wire Types
// ============================================================================

/// `Tenant.get_public_key` request body.
#[derive(Serialize)]
struct PublicKeyRequest<'a> {
    /// Tenant id.
    tenant_id: &'a str,
}

/// `Tenant.get_public_key` response body.
#[derive(Deserialize)]
struct PublicKeyResponse {
    /// JWK as an object or as JSON text.
    public_key: Value,
}

/// `App.check` request body.
#[derive(Serialize)]
struct AppCheckRequest<'a> {
    /// App client id.
    client_id: &'a str,
    /// Tenant id.
    tenant_id: &'a str,
}

/// `App.check` response body.
#[derive(Deserialize)]
struct AppCheckResponse {
    /// Granted permission patterns.
    #[serde(default)]
    permissions: Option<Vec<String>>,
}

// ============================================================================
// SECTION: HTTP Implementation
// ============================================================================

/// Identity service reached over HTTP.
///
/// # Invariants
/// - Base URL is normalized without a trailing slash.
pub struct HttpIdentityAuthority {
    /// Identity service base URL (no trailing slash).
    base_url: String,
    /// Privileged system credential.
    system_token: String,
    /// HTTP client configured with timeouts.
    client: Client,
}

impl HttpIdentityAuthority {
    /// Builds a new identity authority client.
    ///
    /// # Errors
    ///
    /// Returns [`AuthorityError`] when the HTTP client cannot be built.
    pub fn new(
        mut base_url: String,
        system_token: String,
        connect_timeout: Duration,
        request_timeout: Duration,
    ) -> Result<Self, AuthorityError> {
        let client = build_client(connect_timeout, request_timeout)?;
        let trimmed_len = base_url.trim_end_matches('/').len();
        base_url.truncate(trimmed_len);
        Ok(Self {
            base_url,
            system_token,
            client,
        })
    }

    /// Returns the endpoint URL for an identity method.
    fn endpoint(&self, resource: &str, verb: &str) -> String {
        format!("{}/identity/v1/{resource}/{verb}", self.base_url)
    }
}

impl IdentityAuthority for HttpIdentityAuthority {
    fn get_public_key(&self, tenant_id: &TenantId) -> Result<Jwk, AuthorityError> {
        debug!(tenant_id = tenant_id.as_str(), "fetching tenant public key");
        let response: PublicKeyResponse = post_json(
            &self.client,
            &self.endpoint("Tenant", "get_public_key"),
            bearer_headers(&self.system_token)?,
            &PublicKeyRequest {
                tenant_id: tenant_id.as_str(),
            },
        )?;
        parse_public_key(response.public_key)
    }

    fn check_app(
        &self,
        client_id: &ClientId,
        tenant_id: &TenantId,
    ) -> Result<Vec<String>, AuthorityError> {
        debug!(client_id = client_id.as_str(), "checking app permissions");
        let response: AppCheckResponse = post_json(
            &self.client,
            &self.endpoint("App", "check"),
            bearer_headers(&self.system_token)?,
            &AppCheckRequest {
                client_id: client_id.as_str(),
                tenant_id: tenant_id.as_str(),
            },
        )?;
        Ok(response.permissions.unwrap_or_default())
    }
}

/// Interprets a `public_key` field holding a JWK object or its JSON text.
fn parse_public_key(value: Value) -> Result<Jwk, AuthorityError> {
    let jwk = match value {
        Value::String(text) => Jwk::from_json_str(&text)
            .map_err(|err| AuthorityError::InvalidResponse(err.to_string()))?,
        Value::Object(_) => serde_json::from_value(value)
            .map_err(|err| AuthorityError::InvalidResponse(format!("invalid jwk: {err}")))?,
        _ => {
            return Err(AuthorityError::InvalidResponse(
                "public_key must be a jwk object or string".to_string(),
            ));
        }
    };
    if jwk.is_private() {
        return Err(AuthorityError::InvalidResponse(
            "public_key carries private key material".to_string(),
        ));
    }
    Ok(jwk)
}
