// crates/tenant-guard-core/src/roles.rs
// ============================================================================
// Module: Tenant Guard Classifications
// Description: Token, owner, user, and role classifications.
// Purpose: Replace stringly-typed claim values with closed enums.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Token claims and transaction metadata carry upper-case string labels
//! (`ACCESS_TOKEN`, `APP`, `WORKSPACE_MEMBER`, ...). This module maps those
//! labels to closed enums. Labels are stable wire values and must not change.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Token Type
// ============================================================================

/// Token type claim (`typ`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TokenType {
    /// Interactive access token.
    AccessToken,
    /// Refresh token.
    RefreshToken,
    /// App client secret token.
    ClientSecret,
    /// Privileged token issued to internal services.
    SystemToken,
}

impl TokenType {
    /// Returns the stable wire label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AccessToken => "ACCESS_TOKEN",
            Self::RefreshToken => "REFRESH_TOKEN",
            Self::ClientSecret => "CLIENT_SECRET",
            Self::SystemToken => "SYSTEM_TOKEN",
        }
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Owner Type
// ============================================================================

/// Token holder classification (`own`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OwnerType {
    /// Human user.
    User,
    /// Machine app client.
    App,
    /// Internal system service.
    System,
}

impl OwnerType {
    /// Returns the stable wire label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "USER",
            Self::App => "APP",
            Self::System => "SYSTEM",
        }
    }
}

impl fmt::Display for OwnerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: User Type
// ============================================================================

/// Caller classification supplied by upstream collaborators.
///
/// Only domain owners are distinguished; every other value routes through
/// remote scope resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserType {
    /// Domain owner, bypasses project and workspace scoping.
    DomainOwner,
}

impl UserType {
    /// Parses a user type label.
    #[must_use]
    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "DOMAIN_OWNER" => Some(Self::DomainOwner),
            _ => None,
        }
    }

    /// Returns the stable wire label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DomainOwner => "DOMAIN_OWNER",
        }
    }
}

// ============================================================================
// SECTION: Role Type
// ============================================================================

/// Scope level assigned to the caller.
///
/// # Invariants
/// - A transaction holds at most one role type at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoleType {
    /// Caller authenticated with a system token.
    SystemToken,
    /// Tenant-wide administrator.
    TenantAdmin,
    /// Workspace owner.
    WorkspaceOwner,
    /// Workspace member limited to assigned projects.
    WorkspaceMember,
    /// Plain tenant user.
    User,
    /// Domain owner (no scope injection).
    Domain,
}

impl RoleType {
    /// Parses a role type label; unknown labels yield `None`.
    #[must_use]
    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "SYSTEM_TOKEN" => Some(Self::SystemToken),
            "TENANT_ADMIN" => Some(Self::TenantAdmin),
            "WORKSPACE_OWNER" => Some(Self::WorkspaceOwner),
            "WORKSPACE_MEMBER" => Some(Self::WorkspaceMember),
            "USER" => Some(Self::User),
            "DOMAIN" => Some(Self::Domain),
            _ => None,
        }
    }

    /// Returns the stable wire label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SystemToken => "SYSTEM_TOKEN",
            Self::TenantAdmin => "TENANT_ADMIN",
            Self::WorkspaceOwner => "WORKSPACE_OWNER",
            Self::WorkspaceMember => "WORKSPACE_MEMBER",
            Self::User => "USER",
            Self::Domain => "DOMAIN",
        }
    }
}

impl fmt::Display for RoleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
