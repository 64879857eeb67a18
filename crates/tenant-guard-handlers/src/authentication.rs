// crates/tenant-guard-handlers/src/authentication.rs
// ============================================================================
// Module: Authentication Stage
// Description: Bearer token verification and caller classification.
// Purpose: Establish who is calling before anything is authorized.
// Dependencies: tenant-guard-core, tenant-guard-token, tracing
// ============================================================================

//! ## Overview
//! Authentication walks a fixed sequence of states:
//!
//! `TokenExtracted -> TenantResolved -> Verified -> Classified -> MetaApplied`
//!
//! The tenant id is first read from unverified claims only to pick the
//! verification key; every field written to metadata comes from the verified
//! claims or, for system tokens, from gateway-provided metadata. Any failure
//! aborts with [`GuardError::Authentication`] and nothing is written.
//! Security posture: tokens are untrusted until `decode` succeeds.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use serde_json::Value;
use tenant_guard_core::AuthorizationMeta;
use tenant_guard_core::ClientId;
use tenant_guard_core::OwnerType;
use tenant_guard_core::Params;
use tenant_guard_core::RoleType;
use tenant_guard_core::TenantId;
use tenant_guard_core::Transaction;
use tenant_guard_core::WorkspaceId;
use tenant_guard_core::meta;
use tenant_guard_token::DecodeOptions;
use tenant_guard_token::TokenClaims;
use tenant_guard_token::decode;
use tenant_guard_token::peek_unverified;
use tracing::debug;

use crate::error::GuardError;
use crate::pipeline::Verifier;
use crate::resolver::KeyResolver;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Number of token characters allowed in diagnostics.
const TOKEN_LOG_PREFIX_CHARS: usize = 10;

// ============================================================================
// SECTION: States
// ============================================================================

/// Authentication progress states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthenticationState {
    /// Bearer token read from metadata.
    TokenExtracted,
    /// Tenant id read from unverified claims.
    TenantResolved,
    /// Signature and expiry verified.
    Verified,
    /// Token classified as system or versioned user/app token.
    Classified,
    /// Authorization metadata written.
    MetaApplied,
}

impl AuthenticationState {
    /// Returns a stable label for diagnostics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TokenExtracted => "token_extracted",
            Self::TenantResolved => "tenant_resolved",
            Self::Verified => "verified",
            Self::Classified => "classified",
            Self::MetaApplied => "meta_applied",
        }
    }
}

// ============================================================================
// SECTION: Handler
// ============================================================================

/// Authentication stage.
pub struct AuthenticationHandler {
    /// Tenant key and app permission lookups.
    resolver: Arc<KeyResolver>,
    /// Token verification options.
    options: DecodeOptions,
}

impl AuthenticationHandler {
    /// Creates the stage with default verification options.
    #[must_use]
    pub fn new(resolver: Arc<KeyResolver>) -> Self {
        Self {
            resolver,
            options: DecodeOptions::default(),
        }
    }

    /// Replaces the token verification options.
    #[must_use]
    pub fn with_decode_options(mut self, options: DecodeOptions) -> Self {
        self.options = options;
        self
    }

    /// Runs authentication and returns the metadata record written.
    ///
    /// # Errors
    ///
    /// Returns [`GuardError::Authentication`] on any failed transition.
    pub fn authenticate(
        &self,
        transaction: &mut Transaction,
    ) -> Result<AuthorizationMeta, GuardError> {
        let token = extract_token(transaction)?;
        reached(transaction, AuthenticationState::TokenExtracted);

        let tenant_id = resolve_tenant(&token)?;
        reached(transaction, AuthenticationState::TenantResolved);

        let claims = self.verify_token(&token, &tenant_id)?;
        reached(transaction, AuthenticationState::Verified);

        let record = self.classify(claims, transaction)?;
        reached(transaction, AuthenticationState::Classified);

        record.apply(transaction);
        reached(transaction, AuthenticationState::MetaApplied);
        Ok(record)
    }

    /// Verifies the token with the tenant's key.
    fn verify_token(&self, token: &str, tenant_id: &TenantId) -> Result<TokenClaims, GuardError> {
        let key = self.resolver.get_public_key(tenant_id)?;
        let algorithm = key.algorithm()?;
        decode(token, &key, algorithm, &self.options).map_err(|err| {
            debug!(token_prefix = %token_prefix(token), "token verification failed");
            GuardError::from(err)
        })
    }

    /// Builds the metadata record for verified claims.
    fn classify(
        &self,
        claims: TokenClaims,
        transaction: &Transaction,
    ) -> Result<AuthorizationMeta, GuardError> {
        if claims.is_system_token() {
            return Ok(AuthorizationMeta {
                token_type: Some(claims.typ),
                role_type: Some(RoleType::SystemToken.as_str().to_string()),
                owner_type: Some(claims.own),
                tenant_id: transaction.meta_str(meta::X_TENANT_ID).map(TenantId::new),
                audience: Some(claims.aud),
                workspace_id: transaction.meta_str(meta::X_WORKSPACE_ID).map(WorkspaceId::new),
                permissions: None,
                projects: None,
            });
        }

        if !claims.has_supported_version() {
            return Err(GuardError::Authentication("invalid token version".to_string()));
        }

        let permissions = if claims.own == OwnerType::App {
            let client_id = claims
                .jti
                .as_deref()
                .filter(|jti| !jti.is_empty())
                .map(ClientId::new)
                .ok_or_else(|| {
                    GuardError::Authentication("app token carries no client id".to_string())
                })?;
            Some(self.resolver.check_app_permissions(&client_id, &claims.did)?)
        } else {
            claims.permissions
        };

        Ok(AuthorizationMeta {
            token_type: Some(claims.typ),
            role_type: claims.rol,
            owner_type: Some(claims.own),
            tenant_id: Some(claims.did),
            audience: Some(claims.aud),
            workspace_id: claims.wid,
            permissions,
            projects: claims.projects,
        })
    }
}

impl Verifier for AuthenticationHandler {
    fn verify(&self, transaction: &mut Transaction, _params: &Params) -> Result<(), GuardError> {
        self.authenticate(transaction).map(|_| ())
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Reads the bearer token; absent, non-string, and empty values fail.
fn extract_token(transaction: &Transaction) -> Result<String, GuardError> {
    match transaction.get_meta(meta::TOKEN) {
        Some(Value::String(token)) if !token.is_empty() => Ok(token.clone()),
        _ => Err(GuardError::Authentication("empty token provided".to_string())),
    }
}

/// Reads the tenant id from unverified claims.
fn resolve_tenant(token: &str) -> Result<TenantId, GuardError> {
    let claims = peek_unverified(token).map_err(|_| {
        debug!(token_prefix = %token_prefix(token), "failed to decode token");
        GuardError::Authentication("failed to decode token".to_string())
    })?;
    match claims.get("did") {
        Some(Value::String(did)) if !did.trim().is_empty() => Ok(TenantId::new(did.clone())),
        _ => Err(GuardError::Authentication("empty tenant_id provided".to_string())),
    }
}

/// Returns the leading characters of a token for diagnostics.
fn token_prefix(token: &str) -> String {
    token.chars().take(TOKEN_LOG_PREFIX_CHARS).collect()
}

/// Emits a state transition diagnostic.
fn reached(transaction: &Transaction, state: AuthenticationState) {
    debug!(
        transaction_id = transaction.id().as_str(),
        state = state.as_str(),
        "authentication state reached"
    );
}
