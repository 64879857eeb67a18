// crates/tenant-guard-core/src/lib.rs
// ============================================================================
// Module: Tenant Guard Core Library
// Description: Public API surface for the Tenant Guard core types.
// Purpose: Expose identifiers, ownership enums, and the per-call transaction.
// Dependencies: crate::{identifiers, meta, roles, transaction, authorization}
// ============================================================================

//! ## Overview
//! Tenant Guard core defines the data model shared by every stage of the
//! request security pipeline: tenant-scoped identifiers, token/owner/role
//! classifications, the per-call [`Transaction`] metadata store, and the
//! structured [`AuthorizationMeta`] record written by authentication.
//! It carries no I/O and no cryptography.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod authorization;
pub mod identifiers;
pub mod meta;
pub mod roles;
pub mod transaction;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use authorization::AuthorizationMeta;
pub use identifiers::ClientId;
pub use identifiers::TenantId;
pub use identifiers::WorkspaceId;
pub use meta::Params;
pub use meta::is_truthy;
pub use roles::OwnerType;
pub use roles::RoleType;
pub use roles::TokenType;
pub use roles::UserType;
pub use transaction::ConnectionMeta;
pub use transaction::Transaction;
pub use transaction::TransactionId;
