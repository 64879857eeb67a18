// crates/tenant-guard-cli/src/main_tests.rs
// ============================================================================
// Module: CLI Unit Tests
// Description: Argument parsing and bounded input tests.
// Purpose: Ensure the command surface and file limits stay stable.
// Dependencies: clap, tempfile
// ============================================================================

//! ## Overview
//! Exercises clap definitions and input helpers without spawning the binary.

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

use clap::CommandFactory;
use clap::Parser;

use super::Cli;
use super::Commands;
use super::ConfigCommand;
use super::KeyTypeArg;
use super::ReadLimitError;
use super::read_bytes_with_limit;
use super::read_input;

/// The clap definition is internally consistent.
#[test]
fn cli_definition_is_valid() {
    Cli::command().debug_assert();
}

/// Verify arguments parse with an optional audience.
#[test]
fn verify_parses_audience() {
    let cli = Cli::try_parse_from([
        "tenant-guard",
        "verify",
        "tok",
        "--key",
        "public.jwk.json",
        "--audience",
        "user-1",
    ])
    .unwrap();
    match cli.command {
        Commands::Verify(command) => {
            assert_eq!(command.token, "tok");
            assert_eq!(command.audience.as_deref(), Some("user-1"));
        }
        other => panic!("unexpected command {other:?}"),
    }
    assert!(!cli.verbose);
}

/// The verbose flag is accepted after the subcommand.
#[test]
fn verbose_flag_is_global() {
    let cli = Cli::try_parse_from(["tenant-guard", "config", "validate", "--verbose"]).unwrap();
    assert!(cli.verbose);
    assert!(matches!(
        cli.command,
        Commands::Config {
            command: ConfigCommand::Validate(_)
        }
    ));
}

/// Keygen defaults to 2048-bit RSA.
#[test]
fn keygen_defaults_to_rsa() {
    let cli = Cli::try_parse_from(["tenant-guard", "keygen"]).unwrap();
    match cli.command {
        Commands::Keygen(command) => {
            assert_eq!(command.key_type, KeyTypeArg::Rsa);
            assert_eq!(command.bits, 2048);
        }
        other => panic!("unexpected command {other:?}"),
    }
    assert!(Cli::try_parse_from(["tenant-guard", "keygen", "--key-type", "ec"]).is_err());
}

/// Sign requires both a key and claims.
#[test]
fn sign_requires_key_and_claims() {
    assert!(Cli::try_parse_from(["tenant-guard", "sign", "--key", "k.json"]).is_err());
}

/// Files within the limit are read whole.
#[test]
fn bounded_read_accepts_small_files() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("small.json");
    std::fs::write(&path, b"{}").unwrap();
    assert_eq!(read_bytes_with_limit(&path, 16).unwrap(), b"{}".to_vec());
}

/// Files above the limit are refused.
#[test]
fn bounded_read_rejects_large_files() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("large.json");
    std::fs::write(&path, vec![b'a'; 32]).unwrap();
    match read_bytes_with_limit(&path, 16) {
        Err(ReadLimitError::TooLarge {
            size,
            limit,
        }) => {
            assert_eq!(size, 32);
            assert_eq!(limit, 16);
        }
        other => panic!("expected size rejection, got {other:?}"),
    }
}

/// Missing files name the path in the error.
#[test]
fn missing_input_names_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.json");
    let err = read_input(&path).unwrap_err();
    assert!(err.to_string().contains("absent.json"));
}
