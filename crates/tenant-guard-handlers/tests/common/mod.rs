// crates/tenant-guard-handlers/tests/common/mod.rs
// ============================================================================
// Module: Common Test Utilities
// Description: Shared fixtures for tenant-guard-handlers tests.
// Purpose: Provide signed tokens and counting mock authorities.
// Dependencies: tenant-guard-core, tenant-guard-token, tenant-guard-handlers
// ============================================================================

//! ## Overview
//! Provides shared Ed25519 and RSA key pairs, token builders, mock identity and
//! authorization authorities that count their calls, and a collecting audit
//! sink.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::OnceLock;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde_json::Value;
use tenant_guard_config::CacheConfig;
use tenant_guard_core::ClientId;
use tenant_guard_core::ConnectionMeta;
use tenant_guard_core::OwnerType;
use tenant_guard_core::Params;
use tenant_guard_core::TenantId;
use tenant_guard_core::TokenType;
use tenant_guard_core::WorkspaceId;
use tenant_guard_handlers::AuthorityError;
use tenant_guard_handlers::AuthorizationAuthority;
use tenant_guard_handlers::GuardAuditEvent;
use tenant_guard_handlers::GuardAuditSink;
use tenant_guard_handlers::IdentityAuthority;
use tenant_guard_handlers::KeyResolver;
use tenant_guard_handlers::VerifyRequest;
use tenant_guard_handlers::VerifyResponse;
use tenant_guard_token::Algorithm;
use tenant_guard_token::DEFAULT_RSA_KEY_BITS;
use tenant_guard_token::ED25519_KEY_BITS;
use tenant_guard_token::Jwk;
use tenant_guard_token::KeyPair;
use tenant_guard_token::KeyType;
use tenant_guard_token::TokenClaims;
use tenant_guard_token::encode;
use tenant_guard_token::generate_key_pair;

// ============================================================================
// SECTION: Keys and Tokens
// ============================================================================

/// Tenant used by most fixtures.
pub const TENANT: &str = "tenant-1";

/// Returns a key pair shared across tests.
pub fn shared_pair() -> &'static KeyPair {
    /// Key pair shared across tests.
    static PAIR: OnceLock<KeyPair> = OnceLock::new();
    PAIR.get_or_init(|| generate_key_pair(KeyType::Okp, ED25519_KEY_BITS).unwrap())
}

/// Returns an RSA key pair shared across tests.
pub fn rsa_pair() -> &'static KeyPair {
    /// RSA pair shared across tests.
    static PAIR: OnceLock<KeyPair> = OnceLock::new();
    PAIR.get_or_init(|| generate_key_pair(KeyType::Rsa, DEFAULT_RSA_KEY_BITS).unwrap())
}

/// Returns the current Unix time in seconds.
pub fn now_secs() -> i64 {
    i64::try_from(SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs()).unwrap()
}

/// Builds unexpired version 2.0 user access-token claims.
pub fn user_claims() -> TokenClaims {
    let mut claims = TokenClaims::new(
        "identity",
        TokenType::AccessToken,
        OwnerType::User,
        TenantId::new(TENANT),
        "user-1",
    );
    claims.wid = Some(WorkspaceId::new("ws-1"));
    claims.exp = Some(now_secs() + 3600);
    claims.rol = Some("WORKSPACE_MEMBER".to_string());
    claims.projects = Some(vec!["project-1".to_string(), "project-2".to_string()]);
    claims.ver = Some("2.0".to_string());
    claims
}

/// Builds app client-secret claims for `client_id`.
pub fn app_claims(client_id: &str) -> TokenClaims {
    let mut claims = TokenClaims::new(
        "identity",
        TokenType::ClientSecret,
        OwnerType::App,
        TenantId::new(TENANT),
        "app-1",
    );
    claims.jti = Some(client_id.to_string());
    claims.rol = Some("TENANT_ADMIN".to_string());
    claims.ver = Some("2.0".to_string());
    claims
}

/// Builds system-token claims for `tenant`.
pub fn system_claims(tenant: &str) -> TokenClaims {
    TokenClaims::new(
        "identity",
        TokenType::SystemToken,
        OwnerType::System,
        TenantId::new(tenant),
        "root",
    )
}

/// Signs claims with the shared private key.
pub fn sign(claims: &TokenClaims) -> String {
    encode(claims, &shared_pair().private, Algorithm::EdDSA).unwrap()
}

/// Builds request parameters from a JSON object literal.
pub fn params(value: Value) -> Params {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}

// ============================================================================
// SECTION: Identity Authority
// ============================================================================

/// Identity authority double that counts calls.
pub struct MockIdentity {
    /// Key returned by `get_public_key`.
    pub key: Jwk,
    /// Permissions returned by `check_app`.
    pub permissions: Vec<String>,
    /// Whether every call fails.
    pub fail: bool,
    /// Artificial latency per call.
    pub delay: Duration,
    /// Number of `get_public_key` calls.
    pub key_calls: AtomicUsize,
    /// Number of `check_app` calls.
    pub app_calls: AtomicUsize,
}

impl MockIdentity {
    /// Serves the shared public key.
    pub fn new() -> Self {
        Self {
            key: shared_pair().public.clone(),
            permissions: Vec::new(),
            fail: false,
            delay: Duration::ZERO,
            key_calls: AtomicUsize::new(0),
            app_calls: AtomicUsize::new(0),
        }
    }

    /// Returns the number of key fetches.
    pub fn key_calls(&self) -> usize {
        self.key_calls.load(Ordering::SeqCst)
    }

    /// Returns the number of app checks.
    pub fn app_calls(&self) -> usize {
        self.app_calls.load(Ordering::SeqCst)
    }
}

impl IdentityAuthority for MockIdentity {
    fn get_public_key(&self, _tenant_id: &TenantId) -> Result<Jwk, AuthorityError> {
        self.key_calls.fetch_add(1, Ordering::SeqCst);
        thread::sleep(self.delay);
        if self.fail {
            return Err(AuthorityError::Unavailable("identity down".to_string()));
        }
        Ok(self.key.clone())
    }

    fn check_app(
        &self,
        _client_id: &ClientId,
        _tenant_id: &TenantId,
    ) -> Result<Vec<String>, AuthorityError> {
        self.app_calls.fetch_add(1, Ordering::SeqCst);
        thread::sleep(self.delay);
        if self.fail {
            return Err(AuthorityError::Unavailable("identity down".to_string()));
        }
        Ok(self.permissions.clone())
    }
}

/// Wraps an identity double in a resolver with default cache settings.
pub fn resolver(identity: &Arc<MockIdentity>) -> Arc<KeyResolver> {
    let identity: Arc<dyn IdentityAuthority> = Arc::clone(identity) as Arc<dyn IdentityAuthority>;
    Arc::new(KeyResolver::new(identity, &CacheConfig::default()))
}

// ============================================================================
// SECTION: Authorization Authority
// ============================================================================

/// Authorization authority double that records requests.
pub struct MockAuthorization {
    /// Response returned on success; `None` fails every call.
    pub response: Option<VerifyResponse>,
    /// Requests received, with forwarded connection metadata.
    pub requests: Mutex<Vec<(VerifyRequest, ConnectionMeta)>>,
}

impl MockAuthorization {
    /// Answers every call with `role_type` and the given projects.
    pub fn granting(role_type: &str, projects: &[&str]) -> Self {
        Self {
            response: Some(VerifyResponse {
                role_type: role_type.to_string(),
                projects: projects.iter().map(|project| (*project).to_string()).collect(),
                project_groups: vec!["pg-1".to_string()],
            }),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Fails every call.
    pub fn failing() -> Self {
        Self {
            response: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Returns the number of calls received.
    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Returns the most recent request.
    pub fn last_request(&self) -> (VerifyRequest, ConnectionMeta) {
        self.requests.lock().unwrap().last().cloned().unwrap()
    }
}

impl AuthorizationAuthority for MockAuthorization {
    fn verify(
        &self,
        request: &VerifyRequest,
        connection: &ConnectionMeta,
    ) -> Result<VerifyResponse, AuthorityError> {
        self.requests.lock().unwrap().push((request.clone(), connection.clone()));
        self.response.clone().ok_or_else(|| AuthorityError::Rejected("status 403".to_string()))
    }
}

// ============================================================================
// SECTION: Audit
// ============================================================================

/// Audit sink that keeps every event.
#[derive(Default)]
pub struct CollectingAuditSink {
    /// Recorded events.
    pub events: Mutex<Vec<GuardAuditEvent>>,
}

impl CollectingAuditSink {
    /// Returns a copy of the recorded events.
    pub fn events(&self) -> Vec<GuardAuditEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl GuardAuditSink for CollectingAuditSink {
    fn record(&self, event: &GuardAuditEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}
