// crates/tenant-guard-handlers/tests/mutation.rs
// ============================================================================
// Module: Mutation Stage Tests
// Description: Role-driven parameter injection tests.
// Purpose: Ensure scope fields cannot be overridden by callers.
// Dependencies: tenant-guard-handlers, proptest, serde_json
// ============================================================================

//! ## Overview
//! Covers each row of the role table, the `set_user_id` override, and a
//! property check that injected keys always win over caller values.

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

use proptest::prelude::*;
use serde_json::Value;
use serde_json::json;
use tenant_guard_core::Transaction;
use tenant_guard_core::meta;
use tenant_guard_handlers::MutationHandler;
use tenant_guard_handlers::Mutator;

use crate::common::params;

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Creates a transaction with resolved scope for `role`.
fn scoped(role: &str) -> Transaction {
    Transaction::new("inventory", "Server", "list")
        .with_meta(meta::ROLE_TYPE, role)
        .with_meta(meta::TENANT_ID, "T")
        .with_meta(meta::WORKSPACE_ID, "W")
        .with_meta(meta::PROJECTS, json!(["P1", "P2"]))
        .with_meta(meta::USER_ID, "U")
}

/// Mutates caller parameters under `txn`.
fn mutate(txn: &Transaction, caller: Value) -> Value {
    Value::Object(MutationHandler::new().mutate(txn, params(caller)))
}

// ============================================================================
// SECTION: Role Table
// ============================================================================

/// Workspace members get tenant, workspace, and project scope.
#[test]
fn workspace_member_overwrites_scope_fields() {
    let out = mutate(
        &scoped("WORKSPACE_MEMBER"),
        json!({
            "tenant_id": "other",
            "workspace_id": "other",
            "user_projects": ["P9"],
            "name": "web",
        }),
    );
    assert_eq!(
        out,
        json!({
            "tenant_id": "T",
            "workspace_id": "W",
            "user_projects": ["P1", "P2"],
            "name": "web",
        })
    );
}

/// Workspace owners get tenant and workspace scope.
#[test]
fn workspace_owner_injects_tenant_and_workspace() {
    let out = mutate(&scoped("WORKSPACE_OWNER"), json!({}));
    assert_eq!(out, json!({"tenant_id": "T", "workspace_id": "W"}));
}

/// Tenant admins and users get tenant scope only.
#[test]
fn tenant_admin_and_user_inject_tenant() {
    for role in ["TENANT_ADMIN", "USER"] {
        let out = mutate(&scoped(role), json!({"workspace_id": "kept"}));
        assert_eq!(out, json!({"tenant_id": "T", "workspace_id": "kept"}), "{role}");
    }
}

/// Domain and unknown roles inject nothing.
#[test]
fn domain_and_unknown_roles_inject_nothing() {
    for role in ["DOMAIN", "SOMETHING_ELSE"] {
        let out = mutate(&scoped(role), json!({"tenant_id": "caller"}));
        assert_eq!(out, json!({"tenant_id": "caller"}), "{role}");
    }
    let bare = Transaction::new("inventory", "Server", "list");
    assert_eq!(mutate(&bare, json!({"a": 1})), json!({"a": 1}));
}

/// System tokens inject only the scope fields that are set.
#[test]
fn system_token_injects_only_present_fields() {
    let txn = Transaction::new("inventory", "Server", "list")
        .with_meta(meta::ROLE_TYPE, "SYSTEM_TOKEN")
        .with_meta(meta::TENANT_ID, "T")
        .with_meta(meta::WORKSPACE_ID, Value::Null);
    let out = mutate(&txn, json!({"workspace_id": "caller"}));
    assert_eq!(out, json!({"tenant_id": "T", "workspace_id": "caller"}));
}

/// Non-system roles inject null when a scope field is missing.
#[test]
fn missing_scope_is_injected_as_null() {
    let txn = Transaction::new("inventory", "Server", "list")
        .with_meta(meta::ROLE_TYPE, "WORKSPACE_OWNER")
        .with_meta(meta::TENANT_ID, "T");
    let out = mutate(&txn, json!({"workspace_id": "caller"}));
    assert_eq!(out, json!({"tenant_id": "T", "workspace_id": null}));
}

// ============================================================================
// SECTION: User Id
// ============================================================================

/// `set_user_id` injects the caller's user id for any role.
#[test]
fn set_user_id_injects_user() {
    for role in ["DOMAIN", "TENANT_ADMIN"] {
        let txn = scoped(role).with_meta(meta::SET_USER_ID, true);
        let out = mutate(&txn, json!({"user_id": "spoofed"}));
        assert_eq!(out["user_id"], json!("U"), "{role}");
    }
}

/// A falsy `set_user_id` leaves `user_id` alone.
#[test]
fn falsy_set_user_id_is_ignored() {
    let txn = scoped("DOMAIN").with_meta(meta::SET_USER_ID, false);
    assert_eq!(mutate(&txn, json!({"user_id": "caller"})), json!({"user_id": "caller"}));
}

// ============================================================================
// SECTION: Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Caller values never survive for injected keys; other keys are kept.
    #[test]
    fn injected_keys_always_win(
        caller_tenant in "[a-z0-9]{0,16}",
        caller_workspace in "[a-z0-9]{0,16}",
        extra in "[a-z]{1,8}",
    ) {
        let out = mutate(
            &scoped("WORKSPACE_MEMBER"),
            json!({
                "tenant_id": caller_tenant,
                "workspace_id": caller_workspace,
                "extra": extra.clone(),
            }),
        );
        prop_assert_eq!(&out["tenant_id"], &json!("T"));
        prop_assert_eq!(&out["workspace_id"], &json!("W"));
        prop_assert_eq!(&out["user_projects"], &json!(["P1", "P2"]));
        prop_assert_eq!(&out["extra"], &json!(extra));
    }
}
