// crates/tenant-guard-handlers/src/resolver.rs
// ============================================================================
// Module: Key/Permission Resolver
// Description: Cache-first lookups of tenant keys and app permissions.
// Purpose: Keep identity authority traffic off the per-call hot path.
// Dependencies: tenant-guard-config, tenant-guard-token, tracing
// ============================================================================

//! ## Overview
//! [`KeyResolver`] fronts an [`IdentityAuthority`] with two process-wide
//! caches. A miss is filled under a per-key [`SingleFlight`] slot and the
//! cache is re-checked inside the slot, so concurrent misses for one key
//! issue a single remote fetch.
//!
//! Failures are never cached and always surface as
//! [`GuardError::Authentication`]. A rotated tenant key stays stale until
//! its entry expires.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use tenant_guard_config::CacheConfig;
use tenant_guard_core::ClientId;
use tenant_guard_core::TenantId;
use tenant_guard_token::Jwk;
use tracing::debug;

use crate::cache::KeyedCache;
use crate::cache::LocalCache;
use crate::cache::SingleFlight;
use crate::cache::client_cache_key;
use crate::cache::public_key_cache_key;
use crate::error::AuthorityError;
use crate::error::GuardError;
use crate::identity::IdentityAuthority;

// ============================================================================
// SECTION: Resolver
// ============================================================================

/// Cache-first identity lookups shared across calls.
pub struct KeyResolver {
    /// Remote identity service.
    identity: Arc<dyn IdentityAuthority>,
    /// Tenant verification keys.
    public_keys: Arc<dyn KeyedCache<Jwk>>,
    /// App permission lists.
    permissions: Arc<dyn KeyedCache<Vec<String>>>,
    /// Lifetime of cached keys.
    public_key_ttl: Duration,
    /// Lifetime of cached permission lists.
    permission_ttl: Duration,
    /// Per-key fill coordination.
    flights: SingleFlight,
}

impl KeyResolver {
    /// Builds a resolver with process-local caches sized by `cache`.
    #[must_use]
    pub fn new(identity: Arc<dyn IdentityAuthority>, cache: &CacheConfig) -> Self {
        Self::with_caches(
            identity,
            Arc::new(LocalCache::new(cache.max_entries)),
            Arc::new(LocalCache::new(cache.max_entries)),
            cache,
        )
    }

    /// Builds a resolver over caller-supplied caches.
    #[must_use]
    pub fn with_caches(
        identity: Arc<dyn IdentityAuthority>,
        public_keys: Arc<dyn KeyedCache<Jwk>>,
        permissions: Arc<dyn KeyedCache<Vec<String>>>,
        cache: &CacheConfig,
    ) -> Self {
        Self {
            identity,
            public_keys,
            permissions,
            public_key_ttl: cache.public_key_ttl(),
            permission_ttl: cache.permission_ttl(),
            flights: SingleFlight::new(),
        }
    }

    /// Returns the verification key for `tenant_id`.
    ///
    /// # Errors
    ///
    /// Returns [`GuardError::Authentication`] when the identity authority
    /// lookup fails.
    pub fn get_public_key(&self, tenant_id: &TenantId) -> Result<Jwk, GuardError> {
        let key = public_key_cache_key(tenant_id);
        self.cached(self.public_keys.as_ref(), &key, self.public_key_ttl, || {
            self.identity.get_public_key(tenant_id)
        })
    }

    /// Returns the permission patterns granted to an app client.
    ///
    /// # Errors
    ///
    /// Returns [`GuardError::Authentication`] when the identity authority
    /// lookup fails.
    pub fn check_app_permissions(
        &self,
        client_id: &ClientId,
        tenant_id: &TenantId,
    ) -> Result<Vec<String>, GuardError> {
        let key = client_cache_key(tenant_id, client_id);
        self.cached(self.permissions.as_ref(), &key, self.permission_ttl, || {
            self.identity.check_app(client_id, tenant_id)
        })
    }

    /// Drops the cached key for `tenant_id`.
    pub fn invalidate_public_key(&self, tenant_id: &TenantId) {
        self.public_keys.invalidate(&public_key_cache_key(tenant_id));
    }

    /// Cache-first fetch with single-flight fill.
    fn cached<V: Clone>(
        &self,
        cache: &dyn KeyedCache<V>,
        key: &str,
        ttl: Duration,
        fetch: impl FnOnce() -> Result<V, AuthorityError>,
    ) -> Result<V, GuardError> {
        if let Some(value) = cache.get(key) {
            return Ok(value);
        }
        self.flights.run(key, || {
            if let Some(value) = cache.get(key) {
                return Ok(value);
            }
            debug!(cache_key = key, "identity cache miss");
            let value = fetch().map_err(|err| {
                GuardError::Authentication(format!("identity lookup failed: {err}"))
            })?;
            cache.put(key, value.clone(), ttl);
            Ok(value)
        })
    }
}
