// crates/tenant-guard-handlers/tests/authentication.rs
// ============================================================================
// Module: Authentication Stage Tests
// Description: Token verification and caller classification tests.
// Purpose: Ensure authentication fails closed and writes exact metadata.
// Dependencies: tenant-guard-handlers, tenant-guard-token, serde_json
// ============================================================================

//! ## Overview
//! Drives [`AuthenticationHandler`] with tokens signed by the shared test key
//! and a counting identity double.
//!
//! Security posture: tokens are attacker-controlled input.

#![allow(dead_code, reason = "Common module may have unused helpers.")]
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

mod common;

use std::sync::Arc;

use serde_json::json;
use tenant_guard_core::OwnerType;
use tenant_guard_core::TenantId;
use tenant_guard_core::TokenType;
use tenant_guard_core::Transaction;
use tenant_guard_core::meta;
use tenant_guard_handlers::AuthenticationHandler;
use tenant_guard_handlers::GuardError;
use tenant_guard_handlers::Verifier;
use tenant_guard_token::Algorithm;
use tenant_guard_token::ED25519_KEY_BITS;
use tenant_guard_token::KeyType;
use tenant_guard_token::encode;
use tenant_guard_token::generate_key_pair;

use crate::common::MockIdentity;
use crate::common::app_claims;
use crate::common::now_secs;
use crate::common::params;
use crate::common::resolver;
use crate::common::rsa_pair;
use crate::common::sign;
use crate::common::system_claims;
use crate::common::user_claims;

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Creates a transaction carrying `token`.
fn transaction_with(token: &str) -> Transaction {
    Transaction::new("inventory", "Server", "list").with_meta(meta::TOKEN, token)
}

/// Creates a handler over a fresh identity double.
fn handler_with(identity: &Arc<MockIdentity>) -> AuthenticationHandler {
    AuthenticationHandler::new(resolver(identity))
}

/// Asserts an authentication failure with the exact reason.
fn assert_auth_error(result: Result<impl std::fmt::Debug, GuardError>, reason: &str) {
    match result {
        Err(GuardError::Authentication(actual)) => assert_eq!(actual, reason),
        other => panic!("expected authentication failure {reason}, got {other:?}"),
    }
}

// ============================================================================
// SECTION: Token Extraction
// ============================================================================

/// A transaction without a token is rejected and left untouched.
#[test]
fn missing_token_is_rejected() {
    let identity = Arc::new(MockIdentity::new());
    let mut txn = Transaction::new("inventory", "Server", "list");
    assert_auth_error(handler_with(&identity).authenticate(&mut txn), "empty token provided");
    assert!(txn.get_meta(meta::ROLE_TYPE).is_none());
    assert_eq!(identity.key_calls(), 0);
}

/// Empty and non-string tokens count as missing.
#[test]
fn empty_or_non_string_token_is_rejected() {
    let identity = Arc::new(MockIdentity::new());
    let handler = handler_with(&identity);
    assert_auth_error(handler.authenticate(&mut transaction_with("")), "empty token provided");
    let mut txn = Transaction::new("inventory", "Server", "list").with_meta(meta::TOKEN, 42);
    assert_auth_error(handler.authenticate(&mut txn), "empty token provided");
}

/// Tokens that are not JWTs fail before any key lookup.
#[test]
fn garbage_token_fails_to_decode() {
    let identity = Arc::new(MockIdentity::new());
    let result = handler_with(&identity).authenticate(&mut transaction_with("not-a-token"));
    assert_auth_error(result, "failed to decode token");
    assert_eq!(identity.key_calls(), 0);
}

/// A blank tenant claim is rejected before any key lookup.
#[test]
fn blank_tenant_is_rejected() {
    let identity = Arc::new(MockIdentity::new());
    let mut claims = user_claims();
    claims.did = TenantId::new("  ");
    let result = handler_with(&identity).authenticate(&mut transaction_with(&sign(&claims)));
    assert_auth_error(result, "empty tenant_id provided");
    assert_eq!(identity.key_calls(), 0);
}

// ============================================================================
// SECTION: Verification
// ============================================================================

/// A valid user token writes the full caller identity.
#[test]
fn user_token_writes_authorization_meta() {
    let identity = Arc::new(MockIdentity::new());
    let mut txn = transaction_with(&sign(&user_claims()));
    let record = handler_with(&identity).authenticate(&mut txn).unwrap();

    assert_eq!(record.owner_type, Some(OwnerType::User));
    assert_eq!(record.token_type, Some(TokenType::AccessToken));
    assert_eq!(txn.meta_str(meta::TENANT_ID), Some("tenant-1"));
    assert_eq!(txn.meta_str(meta::WORKSPACE_ID), Some("ws-1"));
    assert_eq!(txn.meta_str(meta::ROLE_TYPE), Some("WORKSPACE_MEMBER"));
    assert_eq!(txn.meta_str(meta::OWNER_TYPE), Some("USER"));
    assert_eq!(txn.meta_str(meta::TOKEN_TYPE), Some("ACCESS_TOKEN"));
    assert_eq!(txn.meta_str(meta::AUDIENCE), Some("user-1"));
    assert_eq!(txn.meta_str(meta::USER_ID), Some("user-1"));
    assert!(txn.get_meta(meta::APP_ID).is_none());
    assert_eq!(txn.get_meta(meta::PROJECTS), Some(&json!(["project-1", "project-2"])));
    assert_eq!(txn.get_meta(meta::PERMISSIONS), Some(&json!(null)));
}

/// Unsupported or missing versions are rejected for non-system tokens.
#[test]
fn unsupported_version_is_rejected() {
    let identity = Arc::new(MockIdentity::new());
    let handler = handler_with(&identity);
    for version in [Some("1.0"), None] {
        let mut claims = user_claims();
        claims.ver = version.map(str::to_string);
        let mut txn = transaction_with(&sign(&claims));
        assert_auth_error(handler.authenticate(&mut txn), "invalid token version");
        assert!(txn.get_meta(meta::TENANT_ID).is_none());
    }
}

/// Expired tokens are rejected.
#[test]
fn expired_token_is_rejected() {
    let identity = Arc::new(MockIdentity::new());
    let mut claims = user_claims();
    claims.exp = Some(now_secs() - 600);
    let result = handler_with(&identity).authenticate(&mut transaction_with(&sign(&claims)));
    assert_auth_error(result, "token expired");
}

/// Tenants publishing RSA keys verify RS256 tokens.
#[test]
fn rsa_tenant_key_verifies_rs256_token() {
    let mut identity = MockIdentity::new();
    identity.key = rsa_pair().public.clone();
    let identity = Arc::new(identity);
    let token = encode(&user_claims(), &rsa_pair().private, Algorithm::RS256).unwrap();
    let mut txn = transaction_with(&token);
    handler_with(&identity).authenticate(&mut txn).unwrap();
    assert_eq!(txn.meta_str(meta::TENANT_ID), Some("tenant-1"));
    assert_eq!(txn.meta_str(meta::ROLE_TYPE), Some("WORKSPACE_MEMBER"));

    let foreign = sign(&user_claims());
    let result = handler_with(&identity).authenticate(&mut transaction_with(&foreign));
    assert!(matches!(result, Err(GuardError::Authentication(_))));
}

/// Tokens signed by a different key fail verification.
#[test]
fn foreign_signature_is_rejected() {
    let identity = Arc::new(MockIdentity::new());
    let other = generate_key_pair(KeyType::Okp, ED25519_KEY_BITS).unwrap();
    let token = encode(&user_claims(), &other.private, Algorithm::EdDSA).unwrap();
    let result = handler_with(&identity).authenticate(&mut transaction_with(&token));
    assert!(matches!(
        result,
        Err(GuardError::Authentication(ref reason)) if reason.starts_with("invalid token")
    ));
}

/// Identity authority failures surface as authentication failures.
#[test]
fn identity_outage_fails_authentication() {
    let mut identity = MockIdentity::new();
    identity.fail = true;
    let identity = Arc::new(identity);
    let result = handler_with(&identity).authenticate(&mut transaction_with(&sign(&user_claims())));
    assert!(matches!(
        result,
        Err(GuardError::Authentication(ref reason)) if reason.starts_with("identity lookup failed")
    ));
}

/// The tenant key is fetched once across calls.
#[test]
fn tenant_key_is_cached_across_calls() {
    let identity = Arc::new(MockIdentity::new());
    let handler = handler_with(&identity);
    let token = sign(&user_claims());
    for _ in 0 .. 3 {
        handler.authenticate(&mut transaction_with(&token)).unwrap();
    }
    assert_eq!(identity.key_calls(), 1);
}

// ============================================================================
// SECTION: Classification
// ============================================================================

/// System tokens take tenant and workspace from gateway metadata.
#[test]
fn system_token_uses_gateway_tenant() {
    let identity = Arc::new(MockIdentity::new());
    let mut txn = transaction_with(&sign(&system_claims("root-tenant")))
        .with_meta(meta::X_TENANT_ID, "tenant-9")
        .with_meta(meta::X_WORKSPACE_ID, "ws-9");
    handler_with(&identity).authenticate(&mut txn).unwrap();

    assert_eq!(txn.meta_str(meta::ROLE_TYPE), Some("SYSTEM_TOKEN"));
    assert_eq!(txn.meta_str(meta::TENANT_ID), Some("tenant-9"));
    assert_eq!(txn.meta_str(meta::WORKSPACE_ID), Some("ws-9"));
    assert_eq!(txn.meta_str(meta::OWNER_TYPE), Some("SYSTEM"));
    assert!(txn.get_meta(meta::USER_ID).is_none());
    assert!(txn.get_meta(meta::APP_ID).is_none());
}

/// System tokens without gateway metadata carry no tenant.
#[test]
fn system_token_without_gateway_meta_has_null_scope() {
    let identity = Arc::new(MockIdentity::new());
    let mut txn = transaction_with(&sign(&system_claims("root-tenant")));
    handler_with(&identity).authenticate(&mut txn).unwrap();
    assert_eq!(txn.get_meta(meta::TENANT_ID), Some(&json!(null)));
    assert_eq!(txn.get_meta(meta::WORKSPACE_ID), Some(&json!(null)));
}

/// App tokens load permissions from the identity authority.
#[test]
fn app_token_fetches_permissions() {
    let mut identity = MockIdentity::new();
    identity.permissions = vec!["inventory.*".to_string()];
    let identity = Arc::new(identity);
    let handler = handler_with(&identity);
    let token = sign(&app_claims("client-7"));

    for _ in 0 .. 2 {
        let mut txn = transaction_with(&token);
        handler.authenticate(&mut txn).unwrap();
        assert_eq!(txn.get_meta(meta::PERMISSIONS), Some(&json!(["inventory.*"])));
        assert_eq!(txn.meta_str(meta::APP_ID), Some("app-1"));
        assert!(txn.get_meta(meta::USER_ID).is_none());
    }
    assert_eq!(identity.app_calls(), 1);
}

/// App tokens without a client id are rejected.
#[test]
fn app_token_without_client_id_is_rejected() {
    let identity = Arc::new(MockIdentity::new());
    let mut claims = app_claims("client-7");
    claims.jti = None;
    let result = handler_with(&identity).authenticate(&mut transaction_with(&sign(&claims)));
    assert_auth_error(result, "app token carries no client id");
    assert_eq!(identity.app_calls(), 0);
}

/// The verifier interface ignores request parameters.
#[test]
fn verifier_interface_authenticates() {
    let identity = Arc::new(MockIdentity::new());
    let mut txn = transaction_with(&sign(&user_claims()));
    handler_with(&identity).verify(&mut txn, &params(json!({"tenant_id": "spoofed"}))).unwrap();
    assert_eq!(txn.meta_str(meta::TENANT_ID), Some("tenant-1"));
}
