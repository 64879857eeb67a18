// crates/tenant-guard-cli/src/main.rs
// ============================================================================
// Module: Tenant Guard CLI Entry Point
// Description: Operator commands for keys, tokens, and configuration.
// Purpose: Provide offline tooling around the token codec and config loader.
// Dependencies: clap, serde_json, tenant-guard-config, tenant-guard-token, thiserror.
// ============================================================================

//! ## Overview
//! The Tenant Guard CLI generates RSA or Ed25519 JWK pairs, signs and verifies
//! tokens, inspects unverified claims, and validates configuration files.
//! `inspect` output is diagnostic only and never implies the token is valid.
//! Security posture: inputs are untrusted; file reads are size-limited and
//! private keys are only written to explicit output paths.

// ============================================================================
// SECTION: Modules
// ============================================================================

#[cfg(test)]
mod main_tests;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::fs::File;
use std::io::Read;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::ArgAction;
use clap::Args;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use serde_json::Value;
use serde_json::json;
use tenant_guard_config::TenantGuardConfig;
use tenant_guard_token::DEFAULT_RSA_KEY_BITS;
use tenant_guard_token::DecodeOptions;
use tenant_guard_token::ED25519_KEY_BITS;
use tenant_guard_token::Jwk;
use tenant_guard_token::KeyType;
use tenant_guard_token::TokenClaims;
use tenant_guard_token::decode;
use tenant_guard_token::encode;
use tenant_guard_token::generate_key_pair;
use tenant_guard_token::get_claim;
use tenant_guard_token::peek_unverified;
use thiserror::Error;
use tracing::debug;
use tracing_subscriber::EnvFilter;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum size of key and claims files.
const MAX_INPUT_FILE_BYTES: usize = 64 * 1024;
/// File name of the generated private key.
const PRIVATE_KEY_FILE: &str = "private.jwk.json";
/// File name of the generated public key.
const PUBLIC_KEY_FILE: &str = "public.jwk.json";

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "tenant-guard", version, disable_help_subcommand = true)]
struct Cli {
    /// Emit debug diagnostics on stderr (overridden by `RUST_LOG`).
    #[arg(long, action = ArgAction::SetTrue, global = true)]
    verbose: bool,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate an RSA (default) or Ed25519 JWK pair.
    Keygen(KeygenCommand),
    /// Sign claims with a private JWK.
    Sign(SignCommand),
    /// Print unverified token claims (diagnostic only).
    Inspect(InspectCommand),
    /// Verify a token with a public JWK and print its claims.
    Verify(VerifyCommand),
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Arguments for key generation.
#[derive(Args, Debug)]
struct KeygenCommand {
    /// Key type to generate.
    #[arg(long, value_enum, default_value_t = KeyTypeArg::Rsa)]
    key_type: KeyTypeArg,
    /// RSA modulus size in bits (ignored for Ed25519).
    #[arg(long, default_value_t = DEFAULT_RSA_KEY_BITS)]
    bits: usize,
    /// Directory receiving `private.jwk.json` and `public.jwk.json`.
    #[arg(long, value_name = "DIR")]
    out_dir: Option<PathBuf>,
}

/// Key types accepted by `keygen`.
#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
enum KeyTypeArg {
    /// RSA signing key (`RS256`).
    Rsa,
    /// Ed25519 signing key (`EdDSA`).
    Okp,
}

/// Arguments for token signing.
#[derive(Args, Debug)]
struct SignCommand {
    /// Path to the private JWK.
    #[arg(long, value_name = "PATH")]
    key: PathBuf,
    /// Path to the JSON claims document.
    #[arg(long, value_name = "PATH")]
    claims: PathBuf,
}

/// Arguments for unverified inspection.
#[derive(Args, Debug)]
struct InspectCommand {
    /// Token to inspect.
    token: String,
    /// Print only this claim (null when absent).
    #[arg(long, value_name = "NAME")]
    claim: Option<String>,
}

/// Arguments for token verification.
#[derive(Args, Debug)]
struct VerifyCommand {
    /// Token to verify.
    token: String,
    /// Path to the public JWK.
    #[arg(long, value_name = "PATH")]
    key: PathBuf,
    /// Require this audience.
    #[arg(long, value_name = "AUD")]
    audience: Option<String>,
}

/// Configuration subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Load and validate a configuration file.
    Validate(ConfigValidateCommand),
}

/// Arguments for config validation.
#[derive(Args, Debug)]
struct ConfigValidateCommand {
    /// Config file path (defaults to `TENANT_GUARD_CONFIG` or tenant-guard.toml).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    match cli.command {
        Commands::Keygen(command) => command_keygen(&command),
        Commands::Sign(command) => command_sign(&command),
        Commands::Inspect(command) => command_inspect(&command),
        Commands::Verify(command) => command_verify(&command),
        Commands::Config {
            command,
        } => match command {
            ConfigCommand::Validate(command) => command_config_validate(&command),
        },
    }
}

/// Installs the stderr diagnostics subscriber.
fn init_logging(verbose: bool) {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

// ============================================================================
// SECTION: Commands
// ============================================================================

/// Executes the `keygen` command.
fn command_keygen(command: &KeygenCommand) -> CliResult<ExitCode> {
    let pair = match command.key_type {
        KeyTypeArg::Rsa => generate_key_pair(KeyType::Rsa, command.bits),
        KeyTypeArg::Okp => generate_key_pair(KeyType::Okp, ED25519_KEY_BITS),
    }
    .map_err(|err| CliError::new(format!("key generation failed: {err}")))?;
    let private = jwk_value(&pair.private)?;
    let public = jwk_value(&pair.public)?;
    let Some(out_dir) = &command.out_dir else {
        write_json(&json!({"private": private, "public": public}))?;
        return Ok(ExitCode::SUCCESS);
    };
    fs::create_dir_all(out_dir).map_err(|err| {
        CliError::new(format!("failed to create {}: {err}", out_dir.display()))
    })?;
    let private_path = out_dir.join(PRIVATE_KEY_FILE);
    let public_path = out_dir.join(PUBLIC_KEY_FILE);
    write_json_file(&private_path, &private)?;
    write_json_file(&public_path, &public)?;
    debug!(kid = pair.public.kid.as_deref().unwrap_or_default(), "generated key pair");
    write_stdout_line(&format!(
        "wrote {} and {}",
        private_path.display(),
        public_path.display()
    ))?;
    Ok(ExitCode::SUCCESS)
}

/// Executes the `sign` command.
fn command_sign(command: &SignCommand) -> CliResult<ExitCode> {
    let key = load_jwk(&command.key)?;
    let claims_bytes = read_input(&command.claims)?;
    let claims: TokenClaims = serde_json::from_slice(&claims_bytes)
        .map_err(|err| CliError::new(format!("invalid claims document: {err}")))?;
    let algorithm =
        key.algorithm().map_err(|err| CliError::new(format!("unusable signing key: {err}")))?;
    let token = encode(&claims, &key, algorithm)
        .map_err(|err| CliError::new(format!("signing failed: {err}")))?;
    write_stdout_line(&token)?;
    Ok(ExitCode::SUCCESS)
}

/// Executes the `inspect` command.
fn command_inspect(command: &InspectCommand) -> CliResult<ExitCode> {
    if let Some(name) = &command.claim {
        write_json(&get_claim(&command.token, name, Value::Null))?;
        return Ok(ExitCode::SUCCESS);
    }
    let claims = peek_unverified(&command.token)
        .map_err(|err| CliError::new(format!("cannot read token: {err}")))?;
    write_json(&Value::Object(claims))?;
    Ok(ExitCode::SUCCESS)
}

/// Executes the `verify` command.
fn command_verify(command: &VerifyCommand) -> CliResult<ExitCode> {
    let key = load_jwk(&command.key)?;
    if key.is_private() {
        return Err(CliError::new("verify expects a public key".to_string()));
    }
    let algorithm = key
        .algorithm()
        .map_err(|err| CliError::new(format!("unusable verification key: {err}")))?;
    let options = command.audience.as_ref().map_or_else(DecodeOptions::default, |audience| {
        DecodeOptions {
            verify_audience: true,
            audience: vec![audience.clone()],
            ..DecodeOptions::default()
        }
    });
    let claims = decode(&command.token, &key, algorithm, &options)
        .map_err(|err| CliError::new(format!("verification failed: {err}")))?;
    let value = serde_json::to_value(&claims)
        .map_err(|err| CliError::new(format!("failed to render claims: {err}")))?;
    write_json(&value)?;
    Ok(ExitCode::SUCCESS)
}

/// Executes the config validation command.
fn command_config_validate(command: &ConfigValidateCommand) -> CliResult<ExitCode> {
    let _config = TenantGuardConfig::load(command.config.as_deref())
        .map_err(|err| CliError::new(format!("failed to load config: {err}")))?;
    write_stdout_line("config ok")?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Input Helpers
// ============================================================================

/// Errors raised by bounded file reads.
#[derive(Debug)]
enum ReadLimitError {
    /// File I/O failure.
    Io(std::io::Error),
    /// File size exceeds the configured limit.
    TooLarge {
        /// Actual size in bytes.
        size: u64,
        /// Allowed limit in bytes.
        limit: usize,
    },
}

/// Reads a file from disk while enforcing a hard size limit.
fn read_bytes_with_limit(path: &Path, max_bytes: usize) -> Result<Vec<u8>, ReadLimitError> {
    let file = File::open(path).map_err(ReadLimitError::Io)?;
    let size = file.metadata().map_err(ReadLimitError::Io)?.len();
    let limit = u64::try_from(max_bytes).map_err(|_| ReadLimitError::TooLarge {
        size,
        limit: max_bytes,
    })?;
    if size > limit {
        return Err(ReadLimitError::TooLarge {
            size,
            limit: max_bytes,
        });
    }
    let mut bytes = Vec::new();
    file.take(limit.saturating_add(1)).read_to_end(&mut bytes).map_err(ReadLimitError::Io)?;
    if bytes.len() > max_bytes {
        return Err(ReadLimitError::TooLarge {
            size: u64::try_from(bytes.len()).unwrap_or(u64::MAX),
            limit: max_bytes,
        });
    }
    Ok(bytes)
}

/// Reads a CLI input file.
fn read_input(path: &Path) -> CliResult<Vec<u8>> {
    read_bytes_with_limit(path, MAX_INPUT_FILE_BYTES).map_err(|err| match err {
        ReadLimitError::Io(err) => {
            CliError::new(format!("failed to read {}: {err}", path.display()))
        }
        ReadLimitError::TooLarge {
            size,
            limit,
        } => CliError::new(format!(
            "{} is {size} bytes, above the {limit} byte limit",
            path.display()
        )),
    })
}

/// Loads a JWK from a file.
fn load_jwk(path: &Path) -> CliResult<Jwk> {
    let bytes = read_input(path)?;
    let text = std::str::from_utf8(&bytes)
        .map_err(|_| CliError::new(format!("{} is not utf-8", path.display())))?;
    Jwk::from_json_str(text).map_err(|err| CliError::new(format!("{}: {err}", path.display())))
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Renders a JWK as JSON.
fn jwk_value(key: &Jwk) -> CliResult<Value> {
    serde_json::to_value(key).map_err(|err| CliError::new(format!("failed to render key: {err}")))
}

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> CliResult<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
        .map_err(|err| CliError::new(format!("failed to write stdout: {err}")))
}

/// Writes pretty JSON to stdout.
fn write_json(value: &Value) -> CliResult<()> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|err| CliError::new(format!("failed to render json: {err}")))?;
    write_stdout_line(&rendered)
}

/// Writes pretty JSON to a file.
fn write_json_file(path: &Path, value: &Value) -> CliResult<()> {
    let mut rendered = serde_json::to_vec_pretty(value)
        .map_err(|err| CliError::new(format!("failed to render json: {err}")))?;
    rendered.push(b'\n');
    fs::write(path, rendered)
        .map_err(|err| CliError::new(format!("failed to write {}: {err}", path.display())))
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
