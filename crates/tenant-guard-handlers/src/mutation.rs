// crates/tenant-guard-handlers/src/mutation.rs
// ============================================================================
// Module: Mutation Stage
// Description: Scope-limiting request parameter injection.
// Purpose: Pin outgoing parameters to the caller's resolved scope.
// Dependencies: tenant-guard-core
// ============================================================================

//! ## Overview
//! Mutation is a pure function of transaction metadata and request
//! parameters. The role type selects which scope fields are copied from
//! `authorization.*` metadata into the parameters:
//!
//! | role type          | injected                                    |
//! |--------------------|---------------------------------------------|
//! | `SYSTEM_TOKEN`     | `tenant_id`, `workspace_id` (only when set) |
//! | `TENANT_ADMIN`     | `tenant_id`                                 |
//! | `WORKSPACE_OWNER`  | `tenant_id`, `workspace_id`                 |
//! | `WORKSPACE_MEMBER` | `tenant_id`, `workspace_id`, `user_projects`|
//! | `USER`             | `tenant_id`                                 |
//! | other              | nothing                                     |
//!
//! When `authorization.set_user_id` is truthy, `user_id` is injected for
//! every role. Injected values always overwrite caller-supplied ones.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Value;
use tenant_guard_core::Params;
use tenant_guard_core::RoleType;
use tenant_guard_core::Transaction;
use tenant_guard_core::is_truthy;
use tenant_guard_core::meta;

use crate::pipeline::Mutator;

// ============================================================================
// SECTION: Parameter Names
// ============================================================================

/// Injected tenant scope parameter.
pub const TENANT_ID_PARAM: &str = "tenant_id";
/// Injected workspace scope parameter.
pub const WORKSPACE_ID_PARAM: &str = "workspace_id";
/// Injected project scope parameter.
pub const USER_PROJECTS_PARAM: &str = "user_projects";
/// Injected user parameter.
pub const USER_ID_PARAM: &str = "user_id";

// ============================================================================
// SECTION: Handler
// ============================================================================

/// Mutation stage.
#[derive(Debug, Clone, Copy, Default)]
pub struct MutationHandler;

impl MutationHandler {
    /// Creates the stage.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Mutator for MutationHandler {
    fn mutate(&self, transaction: &Transaction, mut params: Params) -> Params {
        let role = transaction.meta_str(meta::ROLE_TYPE).and_then(RoleType::parse);
        match role {
            Some(RoleType::SystemToken) => {
                inject_if_set(transaction, &mut params, meta::TENANT_ID, TENANT_ID_PARAM);
                inject_if_set(transaction, &mut params, meta::WORKSPACE_ID, WORKSPACE_ID_PARAM);
            }
            Some(RoleType::TenantAdmin | RoleType::User) => {
                inject(transaction, &mut params, meta::TENANT_ID, TENANT_ID_PARAM);
            }
            Some(RoleType::WorkspaceOwner) => {
                inject(transaction, &mut params, meta::TENANT_ID, TENANT_ID_PARAM);
                inject(transaction, &mut params, meta::WORKSPACE_ID, WORKSPACE_ID_PARAM);
            }
            Some(RoleType::WorkspaceMember) => {
                inject(transaction, &mut params, meta::TENANT_ID, TENANT_ID_PARAM);
                inject(transaction, &mut params, meta::WORKSPACE_ID, WORKSPACE_ID_PARAM);
                inject(transaction, &mut params, meta::PROJECTS, USER_PROJECTS_PARAM);
            }
            Some(RoleType::Domain) | None => {}
        }

        if transaction.meta_flag(meta::SET_USER_ID) {
            inject(transaction, &mut params, meta::USER_ID, USER_ID_PARAM);
        }
        params
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Copies a metadata value into `params`, null when absent.
fn inject(transaction: &Transaction, params: &mut Params, meta_key: &str, param: &str) {
    let value = transaction.get_meta_or(meta_key, Value::Null);
    params.insert(param.to_string(), value);
}

/// Copies a metadata value into `params` only when it is truthy.
fn inject_if_set(transaction: &Transaction, params: &mut Params, meta_key: &str, param: &str) {
    if let Some(value) = transaction.get_meta(meta_key).filter(|value| is_truthy(value)) {
        params.insert(param.to_string(), value.clone());
    }
}
