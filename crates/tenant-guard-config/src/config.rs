// crates/tenant-guard-config/src/config.rs
// ============================================================================
// Module: Tenant Guard Configuration
// Description: Configuration loading and validation for the security pipeline.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: serde, toml, url
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Missing or invalid configuration fails closed.
//!
//! Remote endpoints are optional at load time so that offline tooling can
//! validate a partial file; the pipeline builder rejects a configuration that
//! lacks the endpoints it needs.
//! Security posture: config inputs are untrusted; the system credential is
//! never included in `Debug` output.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fmt;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use url::Url;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "tenant-guard.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "TENANT_GUARD_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum length of the system credential.
pub(crate) const MAX_SYSTEM_TOKEN_LENGTH: usize = 16 * 1024;
/// Default remote connect timeout in milliseconds.
pub(crate) const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 500;
/// Default remote request timeout in milliseconds.
pub(crate) const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 2_000;
/// Minimum remote connect timeout in milliseconds.
pub(crate) const MIN_CONNECT_TIMEOUT_MS: u64 = 100;
/// Maximum remote connect timeout in milliseconds.
pub(crate) const MAX_CONNECT_TIMEOUT_MS: u64 = 10_000;
/// Minimum remote request timeout in milliseconds.
pub(crate) const MIN_REQUEST_TIMEOUT_MS: u64 = 500;
/// Maximum remote request timeout in milliseconds.
pub(crate) const MAX_REQUEST_TIMEOUT_MS: u64 = 30_000;
/// Default public key cache lifetime in seconds.
pub(crate) const DEFAULT_PUBLIC_KEY_TTL_SECS: u64 = 300;
/// Default app permission cache lifetime in seconds.
pub(crate) const DEFAULT_PERMISSION_TTL_SECS: u64 = 300;
/// Maximum cache lifetime in seconds.
pub(crate) const MAX_CACHE_TTL_SECS: u64 = 86_400;
/// Default maximum entries per cache.
pub(crate) const DEFAULT_CACHE_MAX_ENTRIES: usize = 10_000;
/// Maximum entries per cache.
pub(crate) const MAX_CACHE_MAX_ENTRIES: usize = 1_000_000;

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Tenant Guard configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TenantGuardConfig {
    /// Global settings (system credential).
    #[serde(default)]
    pub global: GlobalConfig,
    /// Identity authority client settings.
    #[serde(default)]
    pub identity: IdentityConfig,
    /// Authorization authority client settings.
    #[serde(default)]
    pub authorization: AuthorizationConfig,
    /// Resolver cache settings.
    #[serde(default)]
    pub cache: CacheConfig,
    /// Decision audit settings.
    #[serde(default)]
    pub audit: AuditConfig,
}

impl TenantGuardConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::from_toml_str(content)
    }

    /// Parses and validates configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.global.validate()?;
        self.identity.validate()?;
        self.authorization.validate()?;
        self.cache.validate()?;
        self.audit.validate()?;
        Ok(())
    }
}

/// Global settings.
#[derive(Clone, Default, Deserialize)]
pub struct GlobalConfig {
    /// Privileged system credential used for identity authority lookups.
    #[serde(default)]
    pub system_token: Option<String>,
    /// Name of an environment variable holding the system credential.
    #[serde(default)]
    pub system_token_env: Option<String>,
}

impl fmt::Debug for GlobalConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GlobalConfig")
            .field("system_token", &self.system_token.as_ref().map(|_| "<redacted>"))
            .field("system_token_env", &self.system_token_env)
            .finish()
    }
}

impl GlobalConfig {
    /// Validates global settings.
    fn validate(&self) -> Result<(), ConfigError> {
        match (&self.system_token, &self.system_token_env) {
            (Some(_), Some(_)) => Err(ConfigError::Invalid(
                "global.system_token and global.system_token_env are mutually exclusive"
                    .to_string(),
            )),
            (Some(token), None) => validate_system_token("global.system_token", token),
            (None, Some(name)) => {
                if name.trim().is_empty() {
                    return Err(ConfigError::Invalid(
                        "global.system_token_env must be non-empty".to_string(),
                    ));
                }
                Ok(())
            }
            (None, None) => Ok(()),
        }
    }

    /// Resolves the system credential from the inline value or environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when no credential is configured or
    /// the referenced environment variable is unset or empty.
    pub fn resolve_system_token(&self) -> Result<String, ConfigError> {
        if let Some(token) = &self.system_token {
            validate_system_token("global.system_token", token)?;
            return Ok(token.trim().to_string());
        }
        let Some(name) = &self.system_token_env else {
            return Err(ConfigError::Invalid(
                "global.system_token or global.system_token_env is required".to_string(),
            ));
        };
        let token = env::var(name).map_err(|_| {
            ConfigError::Invalid(format!("environment variable {name} is not set"))
        })?;
        validate_system_token(name, &token)?;
        Ok(token.trim().to_string())
    }
}

/// Remote endpoint timeouts shared by authority clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct RemoteTimeouts {
    /// Connect timeout in milliseconds.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Request timeout in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for RemoteTimeouts {
    fn default() -> Self {
        Self {
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
        }
    }
}

impl RemoteTimeouts {
    /// Validates both timeouts against fixed bounds.
    fn validate(&self, section: &str) -> Result<(), ConfigError> {
        validate_timeout_range(
            &format!("{section}.connect_timeout_ms"),
            self.connect_timeout_ms,
            MIN_CONNECT_TIMEOUT_MS,
            MAX_CONNECT_TIMEOUT_MS,
        )?;
        validate_timeout_range(
            &format!("{section}.request_timeout_ms"),
            self.request_timeout_ms,
            MIN_REQUEST_TIMEOUT_MS,
            MAX_REQUEST_TIMEOUT_MS,
        )
    }

    /// Returns the connect timeout.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Returns the request timeout.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Identity authority client settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IdentityConfig {
    /// Base URL of the identity authority.
    #[serde(default)]
    pub base_url: Option<String>,
    /// Remote timeouts.
    #[serde(flatten)]
    pub timeouts: RemoteTimeouts,
    /// Allow cleartext http:// endpoints (explicit opt-in).
    #[serde(default)]
    pub allow_http: bool,
}

impl IdentityConfig {
    /// Validates identity settings.
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(base_url) = &self.base_url {
            validate_endpoint("identity.base_url", base_url, self.allow_http)?;
        }
        self.timeouts.validate("identity")
    }
}

/// Authorization authority client settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthorizationConfig {
    /// Verify endpoint of the authorization authority.
    #[serde(default)]
    pub uri: Option<String>,
    /// Remote timeouts.
    #[serde(flatten)]
    pub timeouts: RemoteTimeouts,
    /// Allow cleartext http:// endpoints (explicit opt-in).
    #[serde(default)]
    pub allow_http: bool,
}

impl AuthorizationConfig {
    /// Validates authorization settings.
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(uri) = &self.uri {
            validate_endpoint("authorization.uri", uri, self.allow_http)?;
        }
        self.timeouts.validate("authorization")
    }
}

/// Resolver cache settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct CacheConfig {
    /// Lifetime of cached tenant public keys, in seconds.
    #[serde(default = "default_public_key_ttl_secs")]
    pub public_key_ttl_secs: u64,
    /// Lifetime of cached app permission lists, in seconds.
    #[serde(default = "default_permission_ttl_secs")]
    pub permission_ttl_secs: u64,
    /// Maximum entries held per cache.
    #[serde(default = "default_cache_max_entries")]
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            public_key_ttl_secs: DEFAULT_PUBLIC_KEY_TTL_SECS,
            permission_ttl_secs: DEFAULT_PERMISSION_TTL_SECS,
            max_entries: DEFAULT_CACHE_MAX_ENTRIES,
        }
    }
}

impl CacheConfig {
    /// Validates cache bounds.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_ttl("cache.public_key_ttl_secs", self.public_key_ttl_secs)?;
        validate_ttl("cache.permission_ttl_secs", self.permission_ttl_secs)?;
        if self.max_entries == 0 || self.max_entries > MAX_CACHE_MAX_ENTRIES {
            return Err(ConfigError::Invalid(format!(
                "cache.max_entries must be between 1 and {MAX_CACHE_MAX_ENTRIES}"
            )));
        }
        Ok(())
    }

    /// Returns the public key lifetime.
    #[must_use]
    pub const fn public_key_ttl(&self) -> Duration {
        Duration::from_secs(self.public_key_ttl_secs)
    }

    /// Returns the permission list lifetime.
    #[must_use]
    pub const fn permission_ttl(&self) -> Duration {
        Duration::from_secs(self.permission_ttl_secs)
    }
}

/// Audit sink selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditSinkKind {
    /// JSON lines on stderr.
    #[default]
    Stderr,
    /// Append-only JSON lines file.
    File,
    /// Discard audit events.
    None,
}

/// Decision audit settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuditConfig {
    /// Sink selection.
    #[serde(default)]
    pub sink: AuditSinkKind,
    /// Output path for file sinks.
    #[serde(default)]
    pub path: Option<String>,
}

impl AuditConfig {
    /// Validates audit settings.
    fn validate(&self) -> Result<(), ConfigError> {
        match (self.sink, &self.path) {
            (AuditSinkKind::File, Some(path)) => validate_path_string("audit.path", path),
            (AuditSinkKind::File, None) => {
                Err(ConfigError::Invalid("audit.sink=file requires audit.path".to_string()))
            }
            (AuditSinkKind::Stderr | AuditSinkKind::None, Some(_)) => Err(ConfigError::Invalid(
                "audit.path only allowed when audit.sink=file".to_string(),
            )),
            (AuditSinkKind::Stderr | AuditSinkKind::None, None) => Ok(()),
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from explicit input, environment, or default.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates config path length limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path-valued config field.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        if component.as_os_str().to_string_lossy().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Validates a remote endpoint URL and its scheme policy.
fn validate_endpoint(field: &str, value: &str, allow_http: bool) -> Result<(), ConfigError> {
    let url = Url::parse(value.trim())
        .map_err(|err| ConfigError::Invalid(format!("{field} is not a valid url: {err}")))?;
    match url.scheme() {
        "https" => {}
        "http" if allow_http => {}
        "http" => {
            return Err(ConfigError::Invalid(format!("{field} uses http:// without allow_http")));
        }
        other => {
            return Err(ConfigError::Invalid(format!("{field} has unsupported scheme {other}")));
        }
    }
    if url.host_str().is_none() {
        return Err(ConfigError::Invalid(format!("{field} must include a host")));
    }
    Ok(())
}

/// Validates a timeout value against bounds.
fn validate_timeout_range(
    field: &str,
    value_ms: u64,
    min_ms: u64,
    max_ms: u64,
) -> Result<(), ConfigError> {
    if value_ms < min_ms || value_ms > max_ms {
        return Err(ConfigError::Invalid(format!(
            "{field} must be between {min_ms} and {max_ms} milliseconds",
        )));
    }
    Ok(())
}

/// Validates a cache lifetime.
fn validate_ttl(field: &str, value_secs: u64) -> Result<(), ConfigError> {
    if value_secs == 0 || value_secs > MAX_CACHE_TTL_SECS {
        return Err(ConfigError::Invalid(format!(
            "{field} must be between 1 and {MAX_CACHE_TTL_SECS} seconds"
        )));
    }
    Ok(())
}

/// Validates the system credential shape.
fn validate_system_token(field: &str, token: &str) -> Result<(), ConfigError> {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_SYSTEM_TOKEN_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    Ok(())
}

/// Default connect timeout in milliseconds.
const fn default_connect_timeout_ms() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_MS
}

/// Default request timeout in milliseconds.
const fn default_request_timeout_ms() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_MS
}

/// Default public key lifetime in seconds.
const fn default_public_key_ttl_secs() -> u64 {
    DEFAULT_PUBLIC_KEY_TTL_SECS
}

/// Default permission lifetime in seconds.
const fn default_permission_ttl_secs() -> u64 {
    DEFAULT_PERMISSION_TTL_SECS
}

/// Default cache entry bound.
const fn default_cache_max_entries() -> usize {
    DEFAULT_CACHE_MAX_ENTRIES
}

// ============================================================================
// SECTION: Tests
// ============================================================================
