// crates/tenant-guard-token/src/jwk.rs
// ============================================================================
// Module: JSON Web Keys
// Description: Asymmetric key material in JWK form.
// Purpose: Convert tenant JWKs into signing/verification keys.
// Dependencies: jsonwebtoken, ed25519-dalek, rsa, base64, rand, serde
// ============================================================================

//! ## Overview
//! Tenant verification keys arrive from the identity authority as JWKs.
//! Verification supports RSA (`n`, `e`) and Ed25519 OKP (`x`) keys. Signing
//! supports RSA private keys (`d`, `p`, `q`) and Ed25519 private keys (`d`).
//! RSA is the default key type; its tokens use `RS256`.
//! Security posture: private components are redacted from `Debug` output.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use ed25519_dalek::SigningKey;
use ed25519_dalek::pkcs8::EncodePrivateKey;
use jsonwebtoken::Algorithm;
use jsonwebtoken::DecodingKey;
use jsonwebtoken::EncodingKey;
use rand::RngCore;
use rand::rngs::OsRng;
use rsa::BigUint;
use rsa::RsaPrivateKey;
use rsa::pkcs1::EncodeRsaPrivateKey;
use rsa::traits::PrivateKeyParts;
use rsa::traits::PublicKeyParts;
use serde::Deserialize;
use serde::Serialize;

use crate::error::TokenError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Key size, in bits, accepted for Ed25519 generation.
pub const ED25519_KEY_BITS: usize = 256;
/// Default RSA modulus size in bits.
pub const DEFAULT_RSA_KEY_BITS: usize = 2048;
/// Smallest RSA modulus accepted for generation.
const MIN_RSA_KEY_BITS: usize = 2048;
/// Largest RSA modulus accepted for generation.
const MAX_RSA_KEY_BITS: usize = 4096;
/// Curve name for Ed25519 OKP keys.
const CURVE_ED25519: &str = "Ed25519";
/// Raw Ed25519 key length in bytes.
const ED25519_KEY_BYTES: usize = 32;

// ============================================================================
// SECTION: Key Types
// ============================================================================

/// JWK key type (`kty`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyType {
    /// RSA key.
    #[serde(rename = "RSA")]
    Rsa,
    /// Octet key pair (Ed25519).
    #[serde(rename = "OKP")]
    Okp,
}

impl KeyType {
    /// Returns the stable JWK label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Rsa => "RSA",
            Self::Okp => "OKP",
        }
    }
}

impl FromStr for KeyType {
    type Err = TokenError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "RSA" | "rsa" => Ok(Self::Rsa),
            "OKP" | "okp" => Ok(Self::Okp),
            other => Err(TokenError::UnsupportedKey(format!("unknown key type {other}"))),
        }
    }
}

/// JSON Web Key.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwk {
    /// Key type.
    pub kty: KeyType,
    /// Curve name (OKP keys).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crv: Option<String>,
    /// Public key (OKP keys, base64url).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<String>,
    /// Private key (base64url); never present on verification keys.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub d: Option<String>,
    /// First RSA prime factor (base64url, private).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p: Option<String>,
    /// Second RSA prime factor (base64url, private).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub q: Option<String>,
    /// RSA modulus (base64url).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n: Option<String>,
    /// RSA public exponent (base64url).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub e: Option<String>,
    /// Intended algorithm.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,
    /// Key id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
    /// Intended use (`sig`).
    #[serde(default, rename = "use", skip_serializing_if = "Option::is_none")]
    pub key_use: Option<String>,
}

impl fmt::Debug for Jwk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Jwk")
            .field("kty", &self.kty)
            .field("crv", &self.crv)
            .field("x", &self.x)
            .field("d", &self.d.as_ref().map(|_| "<redacted>"))
            .field("p", &self.p.as_ref().map(|_| "<redacted>"))
            .field("q", &self.q.as_ref().map(|_| "<redacted>"))
            .field("n", &self.n)
            .field("e", &self.e)
            .field("alg", &self.alg)
            .field("kid", &self.kid)
            .finish()
    }
}

impl Jwk {
    /// Parses a JWK from its JSON text form.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::UnsupportedKey`] when the JSON is not a supported JWK.
    pub fn from_json_str(text: &str) -> Result<Self, TokenError> {
        serde_json::from_str(text)
            .map_err(|err| TokenError::UnsupportedKey(format!("invalid jwk: {err}")))
    }

    /// Returns the public half (private components removed).
    #[must_use]
    pub fn to_public(&self) -> Self {
        Self {
            d: None,
            p: None,
            q: None,
            ..self.clone()
        }
    }

    /// Returns true when private key material is present.
    #[must_use]
    pub const fn is_private(&self) -> bool {
        self.d.is_some()
    }

    /// Returns the algorithm implied by the key.
    ///
    /// The JWK `alg` wins when present; otherwise RSA keys default to `RS256`
    /// and OKP keys to `EdDSA`.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::UnsupportedKey`] when `alg` is not recognized.
    pub fn algorithm(&self) -> Result<Algorithm, TokenError> {
        if let Some(alg) = &self.alg {
            return Algorithm::from_str(alg)
                .map_err(|_| TokenError::UnsupportedKey(format!("unknown algorithm {alg}")));
        }
        Ok(match self.kty {
            KeyType::Rsa => Algorithm::RS256,
            KeyType::Okp => Algorithm::EdDSA,
        })
    }

    /// Builds a verification key.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::UnsupportedKey`] when required components are missing.
    pub fn decoding_key(&self) -> Result<DecodingKey, TokenError> {
        match self.kty {
            KeyType::Rsa => {
                let n = required(self.n.as_deref(), "n")?;
                let e = required(self.e.as_deref(), "e")?;
                DecodingKey::from_rsa_components(n, e)
                    .map_err(|err| TokenError::UnsupportedKey(err.to_string()))
            }
            KeyType::Okp => {
                self.ensure_ed25519()?;
                let x = required(self.x.as_deref(), "x")?;
                DecodingKey::from_ed_components(x)
                    .map_err(|err| TokenError::UnsupportedKey(err.to_string()))
            }
        }
    }

    /// Builds a signing key.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Encode`] when a private component is missing or
    /// malformed.
    pub fn encoding_key(&self) -> Result<EncodingKey, TokenError> {
        match self.kty {
            KeyType::Rsa => {
                let key = RsaPrivateKey::from_components(
                    rsa_uint(self.n.as_deref(), "n")?,
                    rsa_uint(self.e.as_deref(), "e")?,
                    rsa_uint(self.d.as_deref(), "d")?,
                    vec![
                        rsa_uint(self.p.as_deref(), "p")?,
                        rsa_uint(self.q.as_deref(), "q")?,
                    ],
                )
                .map_err(|err| TokenError::Encode(format!("invalid rsa key: {err}")))?;
                key.validate()
                    .map_err(|err| TokenError::Encode(format!("invalid rsa key: {err}")))?;
                let der = key
                    .to_pkcs1_der()
                    .map_err(|err| TokenError::Encode(format!("encode rsa key: {err}")))?;
                Ok(EncodingKey::from_rsa_der(der.as_bytes()))
            }
            KeyType::Okp => {
                self.ensure_ed25519()?;
                let raw = private_bytes(self.d.as_deref(), "d")?;
                let seed: [u8; ED25519_KEY_BYTES] = raw.as_slice().try_into().map_err(|_| {
                    TokenError::Encode("private component must be 32 bytes".to_string())
                })?;
                let der = SigningKey::from_bytes(&seed)
                    .to_pkcs8_der()
                    .map_err(|err| TokenError::Encode(format!("encode Ed25519 key: {err}")))?;
                Ok(EncodingKey::from_ed_der(der.as_bytes()))
            }
        }
    }

    /// Rejects OKP keys on curves other than Ed25519.
    fn ensure_ed25519(&self) -> Result<(), TokenError> {
        match self.crv.as_deref() {
            Some(CURVE_ED25519) | None => Ok(()),
            Some(other) => Err(TokenError::UnsupportedKey(format!("unsupported curve {other}"))),
        }
    }
}

/// Private and public halves of a generated key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPair {
    /// Signing key (issuer only).
    pub private: Jwk,
    /// Verification key.
    pub public: Jwk,
}

// ============================================================================
// SECTION: Key Generation
// ============================================================================

/// Generates a new key pair.
///
/// RSA accepts 2048 to 4096 bit moduli in steps of 1024
/// ([`DEFAULT_RSA_KEY_BITS`] is the usual choice); Ed25519 is always 256 bits.
///
/// # Errors
///
/// Returns [`TokenError::UnsupportedKey`] for a size the key type cannot use
/// and [`TokenError::Encode`] when generation fails.
pub fn generate_key_pair(key_type: KeyType, size: usize) -> Result<KeyPair, TokenError> {
    match key_type {
        KeyType::Rsa => generate_rsa_pair(size),
        KeyType::Okp => {
            if size != ED25519_KEY_BITS {
                return Err(TokenError::UnsupportedKey(format!(
                    "Ed25519 keys are {ED25519_KEY_BITS} bits, got {size}"
                )));
            }
            let mut seed = [0u8; ED25519_KEY_BYTES];
            OsRng.fill_bytes(&mut seed);
            let signing_key = SigningKey::from_bytes(&seed);
            let public = Jwk {
                kty: KeyType::Okp,
                crv: Some(CURVE_ED25519.to_string()),
                x: Some(URL_SAFE_NO_PAD.encode(signing_key.verifying_key().as_bytes())),
                d: None,
                p: None,
                q: None,
                n: None,
                e: None,
                alg: Some("EdDSA".to_string()),
                kid: Some(random_kid()),
                key_use: Some("sig".to_string()),
            };
            let private = Jwk {
                d: Some(URL_SAFE_NO_PAD.encode(signing_key.to_bytes())),
                ..public.clone()
            };
            Ok(KeyPair {
                private,
                public,
            })
        }
    }
}

/// Generates an RSA pair with `size` bit modulus.
fn generate_rsa_pair(size: usize) -> Result<KeyPair, TokenError> {
    if !(MIN_RSA_KEY_BITS ..= MAX_RSA_KEY_BITS).contains(&size) || size % 1024 != 0 {
        return Err(TokenError::UnsupportedKey(format!(
            "rsa keys are {MIN_RSA_KEY_BITS} to {MAX_RSA_KEY_BITS} bits in steps of 1024, got \
             {size}"
        )));
    }
    let key = RsaPrivateKey::new(&mut OsRng, size)
        .map_err(|err| TokenError::Encode(format!("rsa key generation failed: {err}")))?;
    let public = Jwk {
        kty: KeyType::Rsa,
        crv: None,
        x: None,
        d: None,
        p: None,
        q: None,
        n: Some(encode_uint(key.n())),
        e: Some(encode_uint(key.e())),
        alg: Some("RS256".to_string()),
        kid: Some(random_kid()),
        key_use: Some("sig".to_string()),
    };
    let (Some(p), Some(q)) = (key.primes().first(), key.primes().get(1)) else {
        return Err(TokenError::Encode("generated rsa key lacks prime factors".to_string()));
    };
    let private = Jwk {
        d: Some(encode_uint(key.d())),
        p: Some(encode_uint(p)),
        q: Some(encode_uint(q)),
        ..public.clone()
    };
    Ok(KeyPair {
        private,
        public,
    })
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns a random base64url key id.
fn random_kid() -> String {
    let mut kid = [0u8; 8];
    OsRng.fill_bytes(&mut kid);
    URL_SAFE_NO_PAD.encode(kid)
}

/// Encodes a big integer as unpadded base64url, big-endian.
fn encode_uint(value: &BigUint) -> String {
    URL_SAFE_NO_PAD.encode(value.to_bytes_be())
}

/// Decodes one RSA signing component as a big-endian integer.
fn rsa_uint(value: Option<&str>, name: &str) -> Result<BigUint, TokenError> {
    private_bytes(value, name).map(|bytes| BigUint::from_bytes_be(&bytes))
}

/// Decodes a base64url private component.
fn private_bytes(value: Option<&str>, name: &str) -> Result<Vec<u8>, TokenError> {
    let value =
        value.ok_or_else(|| TokenError::Encode(format!("missing private component {name}")))?;
    URL_SAFE_NO_PAD
        .decode(value.trim_end_matches('='))
        .map_err(|err| TokenError::Encode(format!("invalid private component {name}: {err}")))
}

/// Returns a required JWK component or an unsupported-key error.
fn required<'a>(value: Option<&'a str>, name: &str) -> Result<&'a str, TokenError> {
    value.ok_or_else(|| TokenError::UnsupportedKey(format!("missing jwk component {name}")))
}
