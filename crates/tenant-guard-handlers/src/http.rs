// crates/tenant-guard-handlers/src/http.rs
// ============================================================================
// Module: Authority HTTP Transport
// Description: Blocking JSON-over-HTTP helpers shared by authority clients.
// Purpose: Enforce timeouts, body limits, and status classification once.
// Dependencies: reqwest, serde_json
// ============================================================================

//! ## Overview
//! Both remote authorities speak JSON over HTTP POST. This module builds the
//! blocking client with timeouts, sends one request, and classifies the
//! outcome into [`AuthorityError`] variants. Redirects are not followed.
//! Security posture: response bodies are untrusted and size-limited.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Read;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::blocking::Response;
use reqwest::header::AUTHORIZATION;
use reqwest::header::CONTENT_TYPE;
use reqwest::header::HeaderMap;
use reqwest::header::HeaderValue;
use reqwest::redirect::Policy;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::AuthorityError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum accepted response body size in bytes.
pub(crate) const MAX_RESPONSE_BYTES: usize = 1024 * 1024;
/// Header carrying the originating transaction id.
pub(crate) const TRANSACTION_ID_HEADER: &str = "x-transaction-id";

// ============================================================================
// SECTION: Client
// ============================================================================

/// Builds a blocking client with connect and request timeouts.
pub(crate) fn build_client(
    connect_timeout: Duration,
    request_timeout: Duration,
) -> Result<Client, AuthorityError> {
    Client::builder()
        .connect_timeout(connect_timeout)
        .timeout(request_timeout)
        .redirect(Policy::none())
        .build()
        .map_err(|err| AuthorityError::Unavailable(err.to_string()))
}

/// Builds request headers carrying a bearer credential.
pub(crate) fn bearer_headers(token: &str) -> Result<HeaderMap, AuthorityError> {
    let value = HeaderValue::from_str(&format!("Bearer {token}"))
        .map_err(|_| AuthorityError::Unavailable("credential is not a valid header".to_string()))?;
    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, value);
    Ok(headers)
}

/// Sends a JSON POST and decodes a JSON response.
pub(crate) fn post_json<B, R>(
    client: &Client,
    url: &str,
    mut headers: HeaderMap,
    body: &B,
) -> Result<R, AuthorityError>
where
    B: Serialize,
    R: DeserializeOwned,
{
    let payload = serde_json::to_vec(body)
        .map_err(|err| AuthorityError::InvalidResponse(format!("encode request: {err}")))?;
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    let mut response = client
        .post(url)
        .headers(headers)
        .body(payload)
        .send()
        .map_err(|err| AuthorityError::Unavailable(err.to_string()))?;
    let status = response.status();
    if !status.is_success() {
        return Err(AuthorityError::Rejected(format!("status {}", status.as_u16())));
    }
    let bytes = read_response_limited(&mut response, MAX_RESPONSE_BYTES)?;
    serde_json::from_slice(&bytes).map_err(|err| AuthorityError::InvalidResponse(err.to_string()))
}

/// Reads the response body while enforcing a byte limit.
fn read_response_limited(
    response: &mut Response,
    max_bytes: usize,
) -> Result<Vec<u8>, AuthorityError> {
    let max_bytes_u64 = u64::try_from(max_bytes)
        .map_err(|_| AuthorityError::InvalidResponse("size limit exceeds u64".to_string()))?;
    if let Some(expected) = response.content_length()
        && expected > max_bytes_u64
    {
        return Err(AuthorityError::InvalidResponse("response exceeds size limit".to_string()));
    }
    let mut buf = Vec::new();
    response
        .take(max_bytes_u64.saturating_add(1))
        .read_to_end(&mut buf)
        .map_err(|err| AuthorityError::Unavailable(format!("read response: {err}")))?;
    if buf.len() > max_bytes {
        return Err(AuthorityError::InvalidResponse("response exceeds size limit".to_string()));
    }
    Ok(buf)
}
