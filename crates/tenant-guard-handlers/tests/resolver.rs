// crates/tenant-guard-handlers/tests/resolver.rs
// ============================================================================
// Module: Key Resolver Tests
// Description: Cache-first identity lookup tests.
// Purpose: Ensure lookups are idempotent, coalesced, and never cache errors.
// Dependencies: tenant-guard-handlers, tenant-guard-config
// ============================================================================

//! ## Overview
//! Exercises [`KeyResolver`] against counting identity doubles, including
//! concurrent misses for one tenant.

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
use std::sync::Barrier;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;

use tenant_guard_config::CacheConfig;
use tenant_guard_core::ClientId;
use tenant_guard_core::TenantId;
use tenant_guard_handlers::AuthorityError;
use tenant_guard_handlers::GuardError;
use tenant_guard_handlers::IdentityAuthority;
use tenant_guard_handlers::KeyResolver;
use tenant_guard_token::Jwk;

use crate::common::MockIdentity;
use crate::common::resolver;
use crate::common::shared_pair;

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Identity double whose availability can be toggled.
struct FlakyIdentity {
    /// Whether calls currently fail.
    down: AtomicBool,
    /// Number of key fetches.
    calls: AtomicUsize,
}

impl IdentityAuthority for FlakyIdentity {
    fn get_public_key(&self, _tenant_id: &TenantId) -> Result<Jwk, AuthorityError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.down.load(Ordering::SeqCst) {
            return Err(AuthorityError::Unavailable("connection refused".to_string()));
        }
        Ok(shared_pair().public.clone())
    }

    fn check_app(
        &self,
        _client_id: &ClientId,
        _tenant_id: &TenantId,
    ) -> Result<Vec<String>, AuthorityError> {
        Err(AuthorityError::Rejected("status 404".to_string()))
    }
}

// ============================================================================
// SECTION: Public Keys
// ============================================================================

/// Repeated lookups for one tenant hit the remote once.
#[test]
fn public_key_lookup_is_idempotent() {
    let identity = Arc::new(MockIdentity::new());
    let resolver = resolver(&identity);
    let tenant = TenantId::new("tenant-1");
    let first = resolver.get_public_key(&tenant).unwrap();
    let second = resolver.get_public_key(&tenant).unwrap();
    assert_eq!(first, second);
    assert_eq!(first, shared_pair().public);
    assert_eq!(identity.key_calls(), 1);
}

/// Distinct tenants are cached independently.
#[test]
fn tenants_are_cached_separately() {
    let identity = Arc::new(MockIdentity::new());
    let resolver = resolver(&identity);
    resolver.get_public_key(&TenantId::new("tenant-1")).unwrap();
    resolver.get_public_key(&TenantId::new("tenant-2")).unwrap();
    resolver.get_public_key(&TenantId::new("tenant-1")).unwrap();
    assert_eq!(identity.key_calls(), 2);
}

/// Invalidation forces the next lookup to refetch.
#[test]
fn invalidation_forces_refetch() {
    let identity = Arc::new(MockIdentity::new());
    let resolver = resolver(&identity);
    let tenant = TenantId::new("tenant-1");
    resolver.get_public_key(&tenant).unwrap();
    resolver.invalidate_public_key(&tenant);
    resolver.get_public_key(&tenant).unwrap();
    assert_eq!(identity.key_calls(), 2);
}

/// Failed lookups are not cached.
#[test]
fn failures_are_not_cached() {
    let identity = Arc::new(FlakyIdentity {
        down: AtomicBool::new(true),
        calls: AtomicUsize::new(0),
    });
    let resolver = KeyResolver::new(
        Arc::clone(&identity) as Arc<dyn IdentityAuthority>,
        &CacheConfig::default(),
    );
    let tenant = TenantId::new("tenant-1");

    let err = resolver.get_public_key(&tenant).unwrap_err();
    assert!(matches!(
        err,
        GuardError::Authentication(ref reason) if reason.contains("connection refused")
    ));

    identity.down.store(false, Ordering::SeqCst);
    resolver.get_public_key(&tenant).unwrap();
    resolver.get_public_key(&tenant).unwrap();
    assert_eq!(identity.calls.load(Ordering::SeqCst), 2);
}

/// Concurrent misses for one tenant issue a single remote fetch.
#[test]
fn concurrent_misses_fetch_once() {
    let mut identity = MockIdentity::new();
    identity.delay = Duration::from_millis(50);
    let identity = Arc::new(identity);
    let resolver = resolver(&identity);
    let barrier = Arc::new(Barrier::new(8));
    let tenant = TenantId::new("tenant-1");

    let handles: Vec<_> = (0 .. 8)
        .map(|_| {
            let resolver = Arc::clone(&resolver);
            let barrier = Arc::clone(&barrier);
            let tenant = tenant.clone();
            thread::spawn(move || {
                barrier.wait();
                resolver.get_public_key(&tenant)
            })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap().unwrap(), shared_pair().public);
    }
    assert_eq!(identity.key_calls(), 1);
}

/// A zero lifetime disables reuse.
#[test]
fn zero_ttl_refetches() {
    let identity = Arc::new(MockIdentity::new());
    let cache = CacheConfig {
        public_key_ttl_secs: 0,
        ..CacheConfig::default()
    };
    let resolver = KeyResolver::new(Arc::clone(&identity) as Arc<dyn IdentityAuthority>, &cache);
    let tenant = TenantId::new("tenant-1");
    resolver.get_public_key(&tenant).unwrap();
    resolver.get_public_key(&tenant).unwrap();
    assert_eq!(identity.key_calls(), 2);
}

// ============================================================================
// SECTION: App Permissions
// ============================================================================

/// App permission lists are cached per tenant and client.
#[test]
fn app_permissions_are_cached_per_client() {
    let mut identity = MockIdentity::new();
    identity.permissions = vec!["inventory.*".to_string()];
    let identity = Arc::new(identity);
    let resolver = resolver(&identity);
    let tenant = TenantId::new("tenant-1");

    let granted = resolver.check_app_permissions(&ClientId::new("client-1"), &tenant).unwrap();
    assert_eq!(granted, vec!["inventory.*".to_string()]);
    resolver.check_app_permissions(&ClientId::new("client-1"), &tenant).unwrap();
    resolver.check_app_permissions(&ClientId::new("client-2"), &tenant).unwrap();
    assert_eq!(identity.app_calls(), 2);
}

/// App check rejections surface as authentication failures.
#[test]
fn app_check_rejection_fails_authentication() {
    let identity = Arc::new(FlakyIdentity {
        down: AtomicBool::new(false),
        calls: AtomicUsize::new(0),
    });
    let resolver =
        KeyResolver::new(identity as Arc<dyn IdentityAuthority>, &CacheConfig::default());
    let result =
        resolver.check_app_permissions(&ClientId::new("client-1"), &TenantId::new("tenant-1"));
    assert!(matches!(result, Err(GuardError::Authentication(_))));
}
