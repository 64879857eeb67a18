// crates/tenant-guard-handlers/src/authorization.rs
// ============================================================================
// Module: Authorization Stage
// Description: Permission pattern checks and remote scope resolution.
// Purpose: Decide whether the authenticated caller may make this call.
// Dependencies: glob, tenant-guard-core, tracing
// ============================================================================

//! ## Overview
//! Authorization runs two steps:
//!
//! 1. **Permission check.** When `authorization.permissions` is a list, the
//!    request API (`service.resource.verb`) must match one of its patterns.
//! 2. **Scope resolution.** Domain owners get role `DOMAIN` without a remote
//!    call. Everyone else is resolved by the [`AuthorizationAuthority`], and
//!    the returned role, projects, and project groups are written back.
//!
//! ## Pattern semantics
//! Patterns use shell-glob rules over the whole API string: `*` matches any
//! run of characters including `.` (so `**` is the same as `*`), `?` matches
//! one character, and `[...]` matches a set. Matching is case-sensitive. A
//! pattern that does not parse matches nothing.
//!
//! Every failure is [`GuardError::PermissionDenied`]; callers cannot tell a
//! transport error from an explicit denial.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use glob::Pattern;
use serde_json::Value;
use tenant_guard_core::Params;
use tenant_guard_core::RoleType;
use tenant_guard_core::Transaction;
use tenant_guard_core::UserType;
use tenant_guard_core::meta;
use tenant_guard_core::meta::string_list_value;
use tracing::warn;

use crate::authz_authority::AuthorizationAuthority;
use crate::authz_authority::VerifyRequest;
use crate::error::GuardError;
use crate::pipeline::Verifier;

// ============================================================================
// SECTION: Pattern Matching
// ============================================================================

/// Returns true when `api` matches the permission `pattern`.
///
/// Runs of `*` collapse to a single `*`, so `identity.**` behaves like
/// `identity.*` and matches across dots.
#[must_use]
pub fn permission_matches(api: &str, pattern: &str) -> bool {
    Pattern::new(&collapse_wildcards(pattern)).is_ok_and(|compiled| compiled.matches(api))
}

/// Replaces each run of `*` with a single `*`.
fn collapse_wildcards(pattern: &str) -> String {
    let mut collapsed = String::with_capacity(pattern.len());
    for ch in pattern.chars() {
        if ch == '*' && collapsed.ends_with('*') {
            continue;
        }
        collapsed.push(ch);
    }
    collapsed
}

// ============================================================================
// SECTION: Handler
// ============================================================================

/// Authorization stage.
pub struct AuthorizationHandler {
    /// Remote scope resolution.
    authority: Arc<dyn AuthorizationAuthority>,
}

impl AuthorizationHandler {
    /// Creates the stage over an authorization authority.
    #[must_use]
    pub fn new(authority: Arc<dyn AuthorizationAuthority>) -> Self {
        Self {
            authority,
        }
    }

    /// Checks granted permission patterns against the request API.
    ///
    /// Passes when no permission list is present. An empty list grants
    /// nothing.
    ///
    /// # Errors
    ///
    /// Returns [`GuardError::PermissionDenied`] when no pattern matches.
    pub fn check_permissions(&self, transaction: &Transaction) -> Result<(), GuardError> {
        let Some(Value::Array(permissions)) = transaction.get_meta(meta::PERMISSIONS) else {
            return Ok(());
        };
        let api = transaction.api_name();
        let granted = permissions
            .iter()
            .filter_map(Value::as_str)
            .any(|pattern| permission_matches(&api, pattern));
        if granted {
            Ok(())
        } else {
            Err(GuardError::PermissionDenied(format!("{api} is not granted")))
        }
    }

    /// Resolves role and scope, writing the result into metadata.
    fn resolve_scope(
        &self,
        transaction: &mut Transaction,
        params: &Params,
    ) -> Result<(), GuardError> {
        let user_type = transaction.meta_str(meta::USER_TYPE).and_then(UserType::parse);
        if user_type == Some(UserType::DomainOwner) {
            transaction.set_meta(meta::ROLE_TYPE, RoleType::Domain.as_str());
            return Ok(());
        }

        let request = build_verify_request(transaction, params)?;
        let response =
            self.authority.verify(&request, &transaction.connection_meta()).map_err(|err| {
                warn!(
                    transaction_id = transaction.id().as_str(),
                    error = %err,
                    "authorization verify request failed"
                );
                GuardError::PermissionDenied("authorization verify request failed".to_string())
            })?;

        transaction.set_meta(meta::ROLE_TYPE, response.role_type);
        transaction.set_meta(meta::PROJECTS, string_list_value(Some(response.projects.as_slice())));
        transaction.set_meta(
            meta::PROJECT_GROUPS,
            string_list_value(Some(response.project_groups.as_slice())),
        );
        Ok(())
    }
}

impl Verifier for AuthorizationHandler {
    fn verify(&self, transaction: &mut Transaction, params: &Params) -> Result<(), GuardError> {
        self.check_permissions(transaction)?;
        self.resolve_scope(transaction, params)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Builds the remote verify request from metadata and parameters.
fn build_verify_request(
    transaction: &Transaction,
    params: &Params,
) -> Result<VerifyRequest, GuardError> {
    let scope = meta_setting(transaction, meta::SCOPE, meta::DEFAULT_SCOPE)?;
    let project_id_key =
        meta_setting(transaction, meta::PROJECT_ID_KEY, meta::DEFAULT_PROJECT_ID_PARAM)?;
    let project_group_id_key = meta_setting(
        transaction,
        meta::PROJECT_GROUP_ID_KEY,
        meta::DEFAULT_PROJECT_GROUP_ID_PARAM,
    )?;
    let user_id_key = meta_setting(transaction, meta::USER_ID_KEY, meta::DEFAULT_USER_ID_PARAM)?;

    Ok(VerifyRequest {
        service: transaction.service().to_string(),
        resource: transaction.resource().to_string(),
        verb: transaction.verb().to_string(),
        scope: scope.to_string(),
        domain_id: param_str(params, "domain_id")?,
        project_id: param_str(params, project_id_key)?,
        project_group_id: param_str(params, project_group_id_key)?,
        user_id: param_str(params, user_id_key)?,
        require_project_id: transaction.meta_flag(meta::REQUIRE_PROJECT_ID),
        require_project_group_id: transaction.meta_flag(meta::REQUIRE_PROJECT_GROUP_ID),
        require_user_id: transaction.meta_flag(meta::REQUIRE_USER_ID),
        require_domain_id: transaction.meta_flag(meta::REQUIRE_DOMAIN_ID),
    })
}

/// Reads a string metadata setting, falling back to `default` when absent or null.
fn meta_setting<'a>(
    transaction: &'a Transaction,
    key: &str,
    default: &'a str,
) -> Result<&'a str, GuardError> {
    match transaction.get_meta(key) {
        None | Some(Value::Null) => Ok(default),
        Some(Value::String(value)) => Ok(value.as_str()),
        Some(_) => Err(GuardError::PermissionDenied(format!("{key} must be a string"))),
    }
}

/// Reads an optional string parameter; other JSON types are rejected.
fn param_str(params: &Params, key: &str) -> Result<Option<String>, GuardError> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(value)) => Ok(Some(value.clone())),
        Some(_) => {
            Err(GuardError::PermissionDenied(format!("request parameter {key} must be a string")))
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
