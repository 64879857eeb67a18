// crates/tenant-guard-handlers/src/authz_authority.rs
// ============================================================================
// Module: Authorization Authority
// Description: Remote role and project-scope resolution.
// Purpose: Ask the authorization service what the caller may reach.
// Dependencies: reqwest, serde, url, tenant-guard-config
// ============================================================================

//! ## Overview
//! [`AuthorizationAuthority`] abstracts the remote `Authorization.verify`
//! call. The request carries the call identity, the scope, identifiers read
//! from request parameters, and the require-flags. The caller's own
//! connection metadata (bearer token and transaction id) is forwarded so the
//! authority evaluates the caller, not this service.
//! Security posture: the endpoint is trusted configuration; responses are not.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::HeaderMap;
use reqwest::header::HeaderValue;
use serde::Deserialize;
use serde::Serialize;
use tenant_guard_config::AuthorizationConfig;
use tenant_guard_core::ConnectionMeta;
use url::Url;

use crate::error::AuthorityError;
use crate::error::GuardError;
use crate::http::TRANSACTION_ID_HEADER;
use crate::http::bearer_headers;
use crate::http::build_client;
use crate::http::post_json;

// ============================================================================
// SECTION: Wire Types
// ============================================================================

/// Scope verification request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyRequest {
    /// Called service.
    pub service: String,
    /// Called resource.
    pub resource: String,
    /// Called verb.
    pub verb: String,
    /// Evaluation scope.
    pub scope: String,
    /// Domain id from request parameters.
    pub domain_id: Option<String>,
    /// Project id from request parameters.
    pub project_id: Option<String>,
    /// Project group id from request parameters.
    pub project_group_id: Option<String>,
    /// User id from request parameters.
    pub user_id: Option<String>,
    /// Require a project id.
    pub require_project_id: bool,
    /// Require a project group id.
    pub require_project_group_id: bool,
    /// Require a user id.
    pub require_user_id: bool,
    /// Require a domain id.
    pub require_domain_id: bool,
}

/// Scope verification result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyResponse {
    /// Role type assigned to the caller.
    pub role_type: String,
    /// Accessible projects.
    #[serde(default)]
    pub projects: Vec<String>,
    /// Accessible project groups.
    #[serde(default)]
    pub project_groups: Vec<String>,
}

// ============================================================================
// SECTION: Interface
// ============================================================================

/// Authorization service interface.
pub trait AuthorizationAuthority: Send + Sync {
    /// Resolves the caller's role and accessible scope.
    ///
    /// # Errors
    ///
    /// Returns [`AuthorityError`] on denial, transport failure, or an
    /// unreadable response.
    fn verify(
        &self,
        request: &VerifyRequest,
        connection: &ConnectionMeta,
    ) -> Result<VerifyResponse, AuthorityError>;
}

// ============================================================================
// SECTION: HTTP Implementation
// ============================================================================

/// Authorization service reached over HTTP.
pub struct HttpAuthorizationAuthority {
    /// Verify endpoint.
    uri: Url,
    /// HTTP client configured with timeouts.
    client: Client,
}

impl HttpAuthorizationAuthority {
    /// Builds a client for the verify endpoint at `uri`.
    ///
    /// # Errors
    ///
    /// Returns [`GuardError::Configuration`] when `uri` is not an http(s) URL
    /// or the HTTP client cannot be built.
    pub fn new(
        uri: &str,
        connect_timeout: Duration,
        request_timeout: Duration,
    ) -> Result<Self, GuardError> {
        let uri = Url::parse(uri.trim()).map_err(|err| {
            GuardError::Configuration(format!("authorization uri is invalid: {err}"))
        })?;
        if !matches!(uri.scheme(), "http" | "https") || uri.host_str().is_none() {
            return Err(GuardError::Configuration(
                "authorization uri must be an http(s) url with a host".to_string(),
            ));
        }
        let client = build_client(connect_timeout, request_timeout)
            .map_err(|err| GuardError::Configuration(err.to_string()))?;
        Ok(Self {
            uri,
            client,
        })
    }

    /// Builds a client from the `[authorization]` config section.
    ///
    /// # Errors
    ///
    /// Returns [`GuardError::Configuration`] when `uri` is missing or invalid.
    pub fn from_config(config: &AuthorizationConfig) -> Result<Self, GuardError> {
        let Some(uri) = &config.uri else {
            return Err(GuardError::Configuration("authorization uri is undefined".to_string()));
        };
        Self::new(uri, config.timeouts.connect_timeout(), config.timeouts.request_timeout())
    }

    /// Builds headers forwarding the caller's connection metadata.
    fn forwarded_headers(connection: &ConnectionMeta) -> Result<HeaderMap, AuthorityError> {
        let mut headers = match &connection.token {
            Some(token) => bearer_headers(token)?,
            None => HeaderMap::new(),
        };
        let transaction_id = HeaderValue::from_str(connection.transaction_id.as_str())
            .map_err(|_| AuthorityError::Unavailable("invalid transaction id".to_string()))?;
        headers.insert(TRANSACTION_ID_HEADER, transaction_id);
        Ok(headers)
    }
}

impl AuthorizationAuthority for HttpAuthorizationAuthority {
    fn verify(
        &self,
        request: &VerifyRequest,
        connection: &ConnectionMeta,
    ) -> Result<VerifyResponse, AuthorityError> {
        let headers = Self::forwarded_headers(connection)?;
        post_json(&self.client, self.uri.as_str(), headers, request)
    }
}
