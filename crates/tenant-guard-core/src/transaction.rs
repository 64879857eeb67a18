// crates/tenant-guard-core/src/transaction.rs
// ============================================================================
// Module: Transaction Context
// Description: Per-call identity and metadata store for the security pipeline.
// Purpose: Carry call identity and authorization metadata between stages.
// Dependencies: rand, serde_json
// ============================================================================

//! ## Overview
//! A [`Transaction`] is created at call entry, populated by the authentication
//! and authorization stages, read by the mutation stage and business logic,
//! and dropped when the call completes. It is passed explicitly by reference
//! through every stage; there is no ambient accessor.
//!
//! The transaction exclusively owns its metadata map. One instance never
//! crosses call boundaries, so no internal locking is used.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use rand::RngCore;
use rand::rngs::OsRng;
use serde::Serialize;
use serde_json::Value;

use crate::meta;
use crate::meta::is_truthy;

// ============================================================================
// SECTION: Transaction Identifier
// ============================================================================

/// Process-unique transaction identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct TransactionId(String);

impl TransactionId {
    /// Wraps an existing identifier (e.g. propagated from a gateway).
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Issues a fresh identifier from the process-wide generator.
    #[must_use]
    pub fn generate() -> Self {
        Self(generator().issue())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Boot-scoped transaction id generator.
///
/// # Invariants
/// - Issued identifiers are unique within the process lifetime.
#[derive(Debug)]
struct TransactionIdGenerator {
    /// Boot-scoped random identifier for entropy.
    boot_id: u64,
    /// Monotonic counter for IDs issued in this process.
    counter: AtomicU64,
}

impl TransactionIdGenerator {
    /// Creates a generator seeded from the OS RNG.
    fn new() -> Self {
        let mut bytes = [0u8; 8];
        OsRng.fill_bytes(&mut bytes);
        Self {
            boot_id: u64::from_be_bytes(bytes),
            counter: AtomicU64::new(1),
        }
    }

    /// Issues the next identifier.
    fn issue(&self) -> String {
        let seq = self.counter.fetch_add(1, Ordering::Relaxed);
        format!("tnx-{:016x}-{:016x}", self.boot_id, seq)
    }
}

/// Returns the process-wide generator.
fn generator() -> &'static TransactionIdGenerator {
    /// Lazily initialized generator.
    static GENERATOR: OnceLock<TransactionIdGenerator> = OnceLock::new();
    GENERATOR.get_or_init(TransactionIdGenerator::new)
}

// ============================================================================
// SECTION: Transaction
// ============================================================================

/// Per-call identity plus mutable metadata.
///
/// # Invariants
/// - `service`, `resource`, and `verb` never change after construction.
/// - Metadata is only overwritten, never cleared, during a call.
#[derive(Debug, Clone)]
pub struct Transaction {
    /// Transaction identifier.
    id: TransactionId,
    /// Called service name.
    service: String,
    /// Called resource name.
    resource: String,
    /// Called verb.
    verb: String,
    /// Metadata owned by this transaction.
    meta: BTreeMap<String, Value>,
}

impl Transaction {
    /// Creates a transaction for the given call identity.
    #[must_use]
    pub fn new(
        service: impl Into<String>,
        resource: impl Into<String>,
        verb: impl Into<String>,
    ) -> Self {
        Self {
            id: TransactionId::generate(),
            service: service.into(),
            resource: resource.into(),
            verb: verb.into(),
            meta: BTreeMap::new(),
        }
    }

    /// Returns a copy with the transaction identifier replaced.
    #[must_use]
    pub fn with_id(mut self, id: TransactionId) -> Self {
        self.id = id;
        self
    }

    /// Returns a copy with one metadata entry set.
    #[must_use]
    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set_meta(key, value);
        self
    }

    /// Returns the transaction identifier.
    #[must_use]
    pub const fn id(&self) -> &TransactionId {
        &self.id
    }

    /// Returns the called service.
    #[must_use]
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Returns the called resource.
    #[must_use]
    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// Returns the called verb.
    #[must_use]
    pub fn verb(&self) -> &str {
        &self.verb
    }

    /// Returns the request API identifier `{service}.{resource}.{verb}`.
    #[must_use]
    pub fn api_name(&self) -> String {
        format!("{}.{}.{}", self.service, self.resource, self.verb)
    }

    /// Returns a metadata value, if set.
    #[must_use]
    pub fn get_meta(&self, key: &str) -> Option<&Value> {
        self.meta.get(key)
    }

    /// Returns a metadata value or the supplied default. Never fails.
    #[must_use]
    pub fn get_meta_or(&self, key: &str, default: Value) -> Value {
        self.meta.get(key).cloned().unwrap_or(default)
    }

    /// Returns a metadata value when it is a string.
    #[must_use]
    pub fn meta_str(&self, key: &str) -> Option<&str> {
        self.meta.get(key).and_then(Value::as_str)
    }

    /// Returns true when a metadata value is set and truthy.
    #[must_use]
    pub fn meta_flag(&self, key: &str) -> bool {
        self.meta.get(key).is_some_and(is_truthy)
    }

    /// Sets a metadata value, overwriting silently.
    pub fn set_meta(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.meta.insert(key.into(), value.into());
    }

    /// Returns the full metadata map.
    #[must_use]
    pub const fn meta(&self) -> &BTreeMap<String, Value> {
        &self.meta
    }

    /// Returns the metadata forwarded to downstream authorities.
    #[must_use]
    pub fn connection_meta(&self) -> ConnectionMeta {
        ConnectionMeta {
            token: self.meta_str(meta::TOKEN).map(str::to_string),
            transaction_id: self.id.clone(),
        }
    }
}

// ============================================================================
// SECTION: Connection Metadata
// ============================================================================

/// Call metadata propagated to downstream RPCs.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionMeta {
    /// Caller bearer token, when present.
    pub token: Option<String>,
    /// Originating transaction identifier.
    pub transaction_id: TransactionId,
}

impl fmt::Debug for ConnectionMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionMeta")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("transaction_id", &self.transaction_id)
            .finish()
    }
}
