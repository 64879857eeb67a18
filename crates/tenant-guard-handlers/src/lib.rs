// crates/tenant-guard-handlers/src/lib.rs
// ============================================================================
// Module: Tenant Guard Handlers Library
// Description: Request-scoped security pipeline stages.
// Purpose: Authenticate, authorize, and scope every inbound call.
// Dependencies: tenant-guard-core, tenant-guard-token, tenant-guard-config
// ============================================================================

//! ## Overview
//! The pipeline runs three stages over a [`tenant_guard_core::Transaction`]:
//!
//! 1. [`AuthenticationHandler`] verifies the bearer token and writes the
//!    caller identity into `authorization.*` metadata.
//! 2. [`AuthorizationHandler`] checks granted permission patterns and
//!    resolves the caller's role and project scope.
//! 3. [`MutationHandler`] injects scope-limiting fields into outgoing
//!    request parameters.
//!
//! Remote lookups go through the [`IdentityAuthority`] and
//! [`AuthorizationAuthority`] traits; [`KeyResolver`] caches identity lookups
//! process-wide.
//!
//! Security posture: every stage fails closed; tokens, parameters, and remote
//! responses are untrusted.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod authentication;
pub mod authorization;
pub mod authz_authority;
pub mod cache;
pub mod error;
mod http;
pub mod identity;
pub mod mutation;
pub mod pipeline;
pub mod resolver;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::FileAuditSink;
pub use audit::GuardAuditEvent;
pub use audit::GuardAuditEventParams;
pub use audit::GuardAuditSink;
pub use audit::GuardDecision;
pub use audit::NoopAuditSink;
pub use audit::StderrAuditSink;
pub use audit::token_fingerprint;
pub use authentication::AuthenticationHandler;
pub use authentication::AuthenticationState;
pub use authorization::AuthorizationHandler;
pub use authorization::permission_matches;
pub use authz_authority::AuthorizationAuthority;
pub use authz_authority::HttpAuthorizationAuthority;
pub use authz_authority::VerifyRequest;
pub use authz_authority::VerifyResponse;
pub use cache::KeyedCache;
pub use cache::LocalCache;
pub use cache::SingleFlight;
pub use cache::client_cache_key;
pub use cache::public_key_cache_key;
pub use error::AuthorityError;
pub use error::GuardError;
pub use identity::HttpIdentityAuthority;
pub use identity::IdentityAuthority;
pub use mutation::MutationHandler;
pub use pipeline::Handler;
pub use pipeline::Mutator;
pub use pipeline::Pipeline;
pub use pipeline::Verifier;
pub use resolver::KeyResolver;
