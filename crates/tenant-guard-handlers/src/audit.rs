// crates/tenant-guard-handlers/src/audit.rs
// ============================================================================
// Module: Decision Audit
// Description: Structured audit events for pipeline decisions.
// Purpose: Emit redacted allow/deny records without hard dependencies.
// Dependencies: serde, serde_json, sha2
// ============================================================================

//! ## Overview
//! Each verifying stage records one [`GuardAuditEvent`] per run. Sinks write
//! JSON lines; deployments route them wherever they keep security logs.
//! Security posture: events carry a SHA-256 fingerprint of the bearer token,
//! never the token itself.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;
use sha2::Digest;
use sha2::Sha256;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Stage decision outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardDecision {
    /// Stage passed.
    Allow,
    /// Stage rejected the call.
    Deny,
}

/// Pipeline decision audit payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GuardAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Transaction identifier.
    pub transaction_id: String,
    /// Stage label.
    pub stage: &'static str,
    /// Stage outcome.
    pub decision: GuardDecision,
    /// Request API (`service.resource.verb`).
    pub api: String,
    /// Normalized error kind label.
    pub error_kind: Option<&'static str>,
    /// Denial reason.
    pub reason: Option<String>,
    /// Tenant identifier when known.
    pub tenant_id: Option<String>,
    /// Audience when known.
    pub audience: Option<String>,
    /// Role type when known.
    pub role_type: Option<String>,
    /// SHA-256 fingerprint of the bearer token.
    pub token_fingerprint: Option<String>,
}

/// Inputs required to construct a [`GuardAuditEvent`].
pub struct GuardAuditEventParams {
    /// Transaction identifier.
    pub transaction_id: String,
    /// Stage label.
    pub stage: &'static str,
    /// Stage outcome.
    pub decision: GuardDecision,
    /// Request API (`service.resource.verb`).
    pub api: String,
    /// Normalized error kind label.
    pub error_kind: Option<&'static str>,
    /// Denial reason.
    pub reason: Option<String>,
    /// Tenant identifier when known.
    pub tenant_id: Option<String>,
    /// Audience when known.
    pub audience: Option<String>,
    /// Role type when known.
    pub role_type: Option<String>,
    /// SHA-256 fingerprint of the bearer token.
    pub token_fingerprint: Option<String>,
}

impl GuardAuditEvent {
    /// Creates a new audit event with a consistent timestamp.
    #[must_use]
    pub fn new(params: GuardAuditEventParams) -> Self {
        let timestamp_ms =
            SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
        Self {
            event: "guard_decision",
            timestamp_ms,
            transaction_id: params.transaction_id,
            stage: params.stage,
            decision: params.decision,
            api: params.api,
            error_kind: params.error_kind,
            reason: params.reason,
            tenant_id: params.tenant_id,
            audience: params.audience,
            role_type: params.role_type,
            token_fingerprint: params.token_fingerprint,
        }
    }
}

/// Returns the lowercase hex SHA-256 digest of a bearer token.
#[must_use]
pub fn token_fingerprint(token: &str) -> String {
    hex_encode(&Sha256::digest(token.as_bytes()))
}

/// Encodes bytes as lowercase hex.
fn hex_encode(bytes: &[u8]) -> String {
    /// Hex alphabet.
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push(char::from(HEX[usize::from(byte >> 4)]));
        out.push(char::from(HEX[usize::from(byte & 0x0f)]));
    }
    out
}

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Audit sink for pipeline decisions.
pub trait GuardAuditSink: Send + Sync {
    /// Record an audit event.
    fn record(&self, event: &GuardAuditEvent);
}

/// Audit sink that logs JSON lines to stderr.
pub struct StderrAuditSink;

impl GuardAuditSink for StderrAuditSink {
    fn record(&self, event: &GuardAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// Audit sink that logs JSON lines to a file.
pub struct FileAuditSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileAuditSink {
    /// Opens the audit log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl GuardAuditSink for FileAuditSink {
    fn record(&self, event: &GuardAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

/// No-op audit sink.
pub struct NoopAuditSink;

impl GuardAuditSink for NoopAuditSink {
    fn record(&self, _event: &GuardAuditEvent) {}
}
