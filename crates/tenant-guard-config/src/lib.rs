// crates/tenant-guard-config/src/lib.rs
// ============================================================================
// Module: Tenant Guard Config Library
// Description: Canonical config model and validation.
// Purpose: Single source of truth for tenant-guard.toml semantics.
// Dependencies: serde, toml, url
// ============================================================================

//! ## Overview
//! `tenant-guard-config` defines the configuration consumed when assembling
//! the security pipeline: remote authority endpoints, the privileged system
//! credential, cache lifetimes, and the audit sink. Validation is strict and
//! fails closed.
//!
//! Security posture: config inputs are untrusted.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
