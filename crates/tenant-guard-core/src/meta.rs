// crates/tenant-guard-core/src/meta.rs
// ============================================================================
// Module: Transaction Metadata Keys
// Description: Stable metadata keys and value helpers for the pipeline.
// Purpose: Keep every inbound/outbound meta key in one place.
// Dependencies: serde_json
// ============================================================================

//! ## Overview
//! Transaction metadata is an ordered map from string keys to JSON values.
//! Keys consumed from upstream collaborators and keys produced by the
//! pipeline are declared here; stages never spell them inline.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Map;
use serde_json::Value;

/// Outgoing request parameters (JSON object).
pub type Params = Map<String, Value>;

// ============================================================================
// SECTION: Inbound Keys
// ============================================================================

/// Bearer token string.
pub const TOKEN: &str = "token";
/// Tenant id pre-set by the gateway for system tokens.
pub const X_TENANT_ID: &str = "x_tenant_id";
/// Workspace id pre-set by the gateway for system tokens.
pub const X_WORKSPACE_ID: &str = "x_workspace_id";
/// Caller user type (e.g. `DOMAIN_OWNER`).
pub const USER_TYPE: &str = "authorization.user_type";
/// Authorization scope (defaults to [`DEFAULT_SCOPE`]).
pub const SCOPE: &str = "authorization.scope";
/// Name of the request parameter carrying the project id.
pub const PROJECT_ID_KEY: &str = "authorization.project_id";
/// Name of the request parameter carrying the project group id.
pub const PROJECT_GROUP_ID_KEY: &str = "authorization.project_group_id";
/// Name of the request parameter carrying the user id.
///
/// Distinct from [`USER_ID`], which authentication fills with the caller.
pub const USER_ID_KEY: &str = "authorization.user_id_key";
/// Require a project id during remote verification.
pub const REQUIRE_PROJECT_ID: &str = "authorization.require_project_id";
/// Require a project group id during remote verification.
pub const REQUIRE_PROJECT_GROUP_ID: &str = "authorization.require_project_group_id";
/// Require a user id during remote verification.
pub const REQUIRE_USER_ID: &str = "authorization.require_user_id";
/// Require a domain id during remote verification.
pub const REQUIRE_DOMAIN_ID: &str = "authorization.require_domain_id";
/// Always inject `user_id` during mutation.
pub const SET_USER_ID: &str = "authorization.set_user_id";

// ============================================================================
// SECTION: Produced Keys
// ============================================================================

/// Token type label.
pub const TOKEN_TYPE: &str = "authorization.token_type";
/// Role type label.
pub const ROLE_TYPE: &str = "authorization.role_type";
/// Owner type label.
pub const OWNER_TYPE: &str = "authorization.owner_type";
/// Tenant id.
pub const TENANT_ID: &str = "authorization.tenant_id";
/// Token audience (user id or app id).
pub const AUDIENCE: &str = "authorization.audience";
/// Workspace id.
pub const WORKSPACE_ID: &str = "authorization.workspace_id";
/// Granted permission patterns.
pub const PERMISSIONS: &str = "authorization.permissions";
/// Accessible projects.
pub const PROJECTS: &str = "authorization.projects";
/// Accessible project groups.
pub const PROJECT_GROUPS: &str = "authorization.project_groups";
/// User id for user-owned tokens.
pub const USER_ID: &str = "authorization.user_id";
/// App id for app-owned tokens.
pub const APP_ID: &str = "authorization.app_id";

// ============================================================================
// SECTION: Defaults
// ============================================================================

/// Scope used when none is configured.
pub const DEFAULT_SCOPE: &str = "DOMAIN";
/// Default request parameter carrying the project id.
pub const DEFAULT_PROJECT_ID_PARAM: &str = "project_id";
/// Default request parameter carrying the project group id.
pub const DEFAULT_PROJECT_GROUP_ID_PARAM: &str = "project_group_id";
/// Default request parameter carrying the user id.
pub const DEFAULT_USER_ID_PARAM: &str = "user_id";

// ============================================================================
// SECTION: Value Helpers
// ============================================================================

/// Returns true when a metadata value counts as set.
///
/// Null, `false`, zero, and empty strings/arrays/objects are falsy.
#[must_use]
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Converts an optional string list into a JSON value (null when absent).
#[must_use]
pub fn string_list_value(items: Option<&[String]>) -> Value {
    items.map_or(Value::Null, |items| {
        Value::Array(items.iter().cloned().map(Value::String).collect())
    })
}
