// crates/tenant-guard-core/src/authorization.rs
// ============================================================================
// Module: Authorization Metadata
// Description: Structured record of the caller identity produced by authentication.
// Purpose: Write the `authorization.*` metadata keys from one typed record.
// Dependencies: serde_json
// ============================================================================

//! ## Overview
//! Authentication builds an [`AuthorizationMeta`] from verified claims (or
//! from gateway metadata for system tokens) and applies it to the
//! transaction in one step. Absent fields are written as JSON null so later
//! stages observe "unset" rather than stale values.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Value;

use crate::identifiers::TenantId;
use crate::identifiers::WorkspaceId;
use crate::meta;
use crate::meta::string_list_value;
use crate::roles::OwnerType;
use crate::roles::TokenType;
use crate::transaction::Transaction;

// ============================================================================
// SECTION: Authorization Metadata
// ============================================================================

/// Caller identity written into transaction metadata.
///
/// # Invariants
/// - `user_id` and `app_id` are mutually exclusive; the owner type selects one.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AuthorizationMeta {
    /// Token type.
    pub token_type: Option<TokenType>,
    /// Role type label carried downstream.
    pub role_type: Option<String>,
    /// Owner type.
    pub owner_type: Option<OwnerType>,
    /// Tenant id.
    pub tenant_id: Option<TenantId>,
    /// Audience (user id or app id).
    pub audience: Option<String>,
    /// Workspace id.
    pub workspace_id: Option<WorkspaceId>,
    /// Granted permission patterns.
    pub permissions: Option<Vec<String>>,
    /// Accessible projects.
    pub projects: Option<Vec<String>>,
}

impl AuthorizationMeta {
    /// Writes the record into the transaction metadata.
    pub fn apply(&self, transaction: &mut Transaction) {
        transaction.set_meta(meta::TOKEN_TYPE, opt_str(self.token_type.map(TokenType::as_str)));
        transaction.set_meta(meta::ROLE_TYPE, opt_str(self.role_type.as_deref()));
        transaction.set_meta(meta::OWNER_TYPE, opt_str(self.owner_type.map(OwnerType::as_str)));
        transaction
            .set_meta(meta::TENANT_ID, opt_str(self.tenant_id.as_ref().map(TenantId::as_str)));
        transaction.set_meta(meta::AUDIENCE, opt_str(self.audience.as_deref()));
        transaction.set_meta(
            meta::WORKSPACE_ID,
            opt_str(self.workspace_id.as_ref().map(WorkspaceId::as_str)),
        );
        transaction.set_meta(meta::PERMISSIONS, string_list_value(self.permissions.as_deref()));
        transaction.set_meta(meta::PROJECTS, string_list_value(self.projects.as_deref()));

        match self.owner_type {
            Some(OwnerType::User) => {
                transaction.set_meta(meta::USER_ID, opt_str(self.audience.as_deref()));
            }
            Some(OwnerType::App) => {
                transaction.set_meta(meta::APP_ID, opt_str(self.audience.as_deref()));
            }
            Some(OwnerType::System) | None => {}
        }
    }
}

/// Converts an optional string into a JSON value.
fn opt_str(value: Option<&str>) -> Value {
    value.map_or(Value::Null, |text| Value::String(text.to_string()))
}
