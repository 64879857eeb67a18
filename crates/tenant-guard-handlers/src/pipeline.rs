// crates/tenant-guard-handlers/src/pipeline.rs
// ============================================================================
// Module: Guard Pipeline
// Description: Ordered composition of the security stages.
// Purpose: Run authentication, authorization, and mutation per call.
// Dependencies: tenant-guard-config, tenant-guard-core, tracing
// ============================================================================

//! ## Overview
//! A [`Pipeline`] holds an ordered list of [`Handler`] variants. Verifying
//! stages run against the transaction and may reject the call; the mutation
//! stage rewrites request parameters. The first failure aborts the run and
//! nothing after it executes.
//!
//! Each verifying stage records exactly one allow or deny
//! [`GuardAuditEvent`]. The transaction is passed explicitly to every stage.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::sync::Arc;

use tenant_guard_config::AuditConfig;
use tenant_guard_config::AuditSinkKind;
use tenant_guard_config::TenantGuardConfig;
use tenant_guard_core::Params;
use tenant_guard_core::Transaction;
use tenant_guard_core::meta;
use tracing::debug;

use crate::audit::FileAuditSink;
use crate::audit::GuardAuditEvent;
use crate::audit::GuardAuditEventParams;
use crate::audit::GuardAuditSink;
use crate::audit::GuardDecision;
use crate::audit::NoopAuditSink;
use crate::audit::StderrAuditSink;
use crate::audit::token_fingerprint;
use crate::authentication::AuthenticationHandler;
use crate::authorization::AuthorizationHandler;
use crate::authz_authority::AuthorizationAuthority;
use crate::authz_authority::HttpAuthorizationAuthority;
use crate::error::GuardError;
use crate::identity::HttpIdentityAuthority;
use crate::mutation::MutationHandler;
use crate::resolver::KeyResolver;

// ============================================================================
// SECTION: Stage Interfaces
// ============================================================================

/// Stage that accepts or rejects a call.
pub trait Verifier: Send + Sync {
    /// Checks the call, possibly writing metadata into the transaction.
    ///
    /// # Errors
    ///
    /// Returns [`GuardError`] when the call must be rejected.
    fn verify(&self, transaction: &mut Transaction, params: &Params) -> Result<(), GuardError>;
}

/// Stage that rewrites request parameters.
pub trait Mutator: Send + Sync {
    /// Returns the parameters the call proceeds with.
    fn mutate(&self, transaction: &Transaction, params: Params) -> Params;
}

// ============================================================================
// SECTION: Handlers
// ============================================================================

/// Pipeline stage variants.
pub enum Handler {
    /// Token verification.
    Authentication(AuthenticationHandler),
    /// Permission and scope checks.
    Authorization(AuthorizationHandler),
    /// Scope parameter injection.
    Mutation(MutationHandler),
}

impl Handler {
    /// Returns the stage label used in audit events.
    #[must_use]
    pub const fn stage(&self) -> &'static str {
        match self {
            Self::Authentication(_) => "authentication",
            Self::Authorization(_) => "authorization",
            Self::Mutation(_) => "mutation",
        }
    }

    /// Returns the verifying capability, if the stage has one.
    fn as_verifier(&self) -> Option<&dyn Verifier> {
        match self {
            Self::Authentication(handler) => Some(handler),
            Self::Authorization(handler) => Some(handler),
            Self::Mutation(_) => None,
        }
    }
}

// ============================================================================
// SECTION: Pipeline
// ============================================================================

/// Ordered security pipeline.
pub struct Pipeline {
    /// Stages in execution order.
    handlers: Vec<Handler>,
    /// Decision audit sink.
    audit: Arc<dyn GuardAuditSink>,
}

impl Pipeline {
    /// Creates a pipeline over explicit stages.
    #[must_use]
    pub fn new(handlers: Vec<Handler>, audit: Arc<dyn GuardAuditSink>) -> Self {
        Self {
            handlers,
            audit,
        }
    }

    /// Creates the standard authentication, authorization, mutation pipeline.
    #[must_use]
    pub fn standard(
        resolver: Arc<KeyResolver>,
        authority: Arc<dyn AuthorizationAuthority>,
        audit: Arc<dyn GuardAuditSink>,
    ) -> Self {
        Self::new(
            vec![
                Handler::Authentication(AuthenticationHandler::new(resolver)),
                Handler::Authorization(AuthorizationHandler::new(authority)),
                Handler::Mutation(MutationHandler::new()),
            ],
            audit,
        )
    }

    /// Builds the standard pipeline with HTTP authorities from config.
    ///
    /// # Errors
    ///
    /// Returns [`GuardError::Configuration`] when the system credential,
    /// identity base URL, authorization URI, or audit sink is unusable.
    pub fn from_config(config: &TenantGuardConfig) -> Result<Self, GuardError> {
        let system_token = config
            .global
            .resolve_system_token()
            .map_err(|err| GuardError::Configuration(err.to_string()))?;
        let Some(base_url) = &config.identity.base_url else {
            return Err(GuardError::Configuration("identity base_url is undefined".to_string()));
        };
        let identity = HttpIdentityAuthority::new(
            base_url.clone(),
            system_token,
            config.identity.timeouts.connect_timeout(),
            config.identity.timeouts.request_timeout(),
        )
        .map_err(|err| GuardError::Configuration(err.to_string()))?;
        let resolver = Arc::new(KeyResolver::new(Arc::new(identity), &config.cache));
        let authority = HttpAuthorizationAuthority::from_config(&config.authorization)?;
        let audit = audit_sink(&config.audit)?;
        Ok(Self::standard(resolver, Arc::new(authority), audit))
    }

    /// Returns the stages in execution order.
    #[must_use]
    pub fn handlers(&self) -> &[Handler] {
        &self.handlers
    }

    /// Runs every stage and returns the parameters the call proceeds with.
    ///
    /// # Errors
    ///
    /// Returns the first stage's [`GuardError`]; later stages do not run.
    pub fn run(&self, transaction: &mut Transaction, params: Params) -> Result<Params, GuardError> {
        let mut params = params;
        for handler in &self.handlers {
            if let Handler::Mutation(mutator) = handler {
                params = mutator.mutate(transaction, params);
            } else if let Some(verifier) = handler.as_verifier() {
                let outcome = verifier.verify(transaction, &params);
                self.record(transaction, handler.stage(), outcome.as_ref().err());
                outcome?;
            }
            debug!(
                transaction_id = transaction.id().as_str(),
                stage = handler.stage(),
                "pipeline stage passed"
            );
        }
        Ok(params)
    }

    /// Records one stage decision.
    fn record(&self, transaction: &Transaction, stage: &'static str, error: Option<&GuardError>) {
        let owned = |key: &str| transaction.meta_str(key).map(str::to_string);
        let event = GuardAuditEvent::new(GuardAuditEventParams {
            transaction_id: transaction.id().as_str().to_string(),
            stage,
            decision: if error.is_some() { GuardDecision::Deny } else { GuardDecision::Allow },
            api: transaction.api_name(),
            error_kind: error.map(GuardError::kind),
            reason: error.map(|err| err.reason().to_string()),
            tenant_id: owned(meta::TENANT_ID),
            audience: owned(meta::AUDIENCE),
            role_type: owned(meta::ROLE_TYPE),
            token_fingerprint: transaction
                .meta_str(meta::TOKEN)
                .filter(|token| !token.is_empty())
                .map(token_fingerprint),
        });
        self.audit.record(&event);
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Builds the configured audit sink.
fn audit_sink(config: &AuditConfig) -> Result<Arc<dyn GuardAuditSink>, GuardError> {
    match config.sink {
        AuditSinkKind::Stderr => Ok(Arc::new(StderrAuditSink)),
        AuditSinkKind::None => Ok(Arc::new(NoopAuditSink)),
        AuditSinkKind::File => {
            let Some(path) = &config.path else {
                return Err(GuardError::Configuration("audit.path is required".to_string()));
            };
            let sink = FileAuditSink::new(Path::new(path)).map_err(|err| {
                GuardError::Configuration(format!("audit log unavailable: {err}"))
            })?;
            Ok(Arc::new(sink))
        }
    }
}
