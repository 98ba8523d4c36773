//! Short-code to numeric-id transcoding
//!
//! The video platform identifies a video both by a public short code
//! (`BV17x411w7KC`) and an internal numeric id (`170001`). The crawl worker
//! stores results under the numeric id, so a short code submitted by a caller
//! must be transcoded before result files can be searched.
//!
//! Two paths exist:
//! - an **authoritative lookup** against the platform's own metadata API, and
//! - a **local transform** that decodes the short code arithmetically.
//!
//! The local transform is a best-effort decode of the public encoding and is
//! not guaranteed to match the platform's mapping for all ids. [`IdResolver`]
//! therefore always prefers the authoritative lookup and only falls back to
//! the local transform when the lookup is disabled or fails.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::error::ResolveError;

/// Substitution alphabet used by the short-code encoding
const ALPHABET: &str = "fZodR9XQDSUm21yCkr6zBqiveYah8bt4xsWpHnJE7jL5VG3guMTKNPAwcF";

/// The six character positions that carry the payload, in weight order
const PAYLOAD_POSITIONS: [usize; 6] = [11, 10, 3, 8, 4, 6];

/// Required short-code length, prefix included
const SHORT_CODE_LEN: usize = 12;

/// Additive constant removed from the weighted sum
const OFFSET: i64 = 8_728_348_608;

/// Final XOR mask applied after the offset
const XOR_MASK: i64 = 177_451_812;

/// Decode a short code to its numeric id using the local transform.
///
/// The six designated positions are looked up in the substitution alphabet and
/// combined as a base-58 weighted sum, then adjusted by the fixed offset and
/// XOR mask. Malformed input (missing `BV` prefix, wrong length, character
/// outside the alphabet) yields a typed error, never a panic.
pub fn decode_short_code(code: &str) -> Result<i64, ResolveError> {
    if !code.starts_with("BV") {
        return Err(ResolveError::NotShortCode(code.to_string()));
    }
    let chars: Vec<char> = code.chars().collect();
    if chars.len() != SHORT_CODE_LEN {
        return Err(ResolveError::BadLength {
            code: code.to_string(),
            len: chars.len(),
            expected: SHORT_CODE_LEN,
        });
    }

    let mut sum: i64 = 0;
    let mut weight: i64 = 1;
    for &pos in &PAYLOAD_POSITIONS {
        let ch = chars[pos];
        let digit = ALPHABET.find(ch).ok_or(ResolveError::BadAlphabet {
            code: code.to_string(),
            ch,
        })? as i64;
        sum += digit * weight;
        weight *= 58;
    }

    Ok((sum - OFFSET) ^ XOR_MASK)
}

/// Authoritative short-code lookup seam.
///
/// Implementations ask the platform itself for the numeric id. A `None`
/// return means the lookup could not produce an answer (disabled, network
/// failure, unknown code) and the caller should fall back to the local
/// transform.
#[async_trait]
pub trait AuthoritativeLookup: Send + Sync {
    /// Resolve a short code to its numeric id, or `None` when unavailable
    async fn numeric_id(&self, short_code: &str) -> Option<i64>;

    /// Implementation name for logging
    fn name(&self) -> &str;
}

/// Lookup backed by the platform's public metadata API
pub struct HttpLookup {
    client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

impl HttpLookup {
    /// Create a lookup against the given endpoint
    pub fn new(client: reqwest::Client, endpoint: String, timeout: Duration) -> Self {
        Self {
            client,
            endpoint,
            timeout,
        }
    }
}

#[async_trait]
impl AuthoritativeLookup for HttpLookup {
    async fn numeric_id(&self, short_code: &str) -> Option<i64> {
        // The platform rejects requests without a browser-ish UA and referer.
        let result = self
            .client
            .get(&self.endpoint)
            .query(&[("bvid", short_code)])
            .header(
                "User-Agent",
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
            )
            .header("Referer", "https://www.bilibili.com/")
            .timeout(self.timeout)
            .send()
            .await;

        let response = match result {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(short_code, error = %e, "authoritative lookup request failed");
                return None;
            }
        };

        if !response.status().is_success() {
            tracing::warn!(
                short_code,
                status = response.status().as_u16(),
                "authoritative lookup returned non-success status"
            );
            return None;
        }

        let body: serde_json::Value = match response.json().await {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(short_code, error = %e, "authoritative lookup returned invalid JSON");
                return None;
            }
        };

        body.get("data")
            .and_then(|d| d.get("aid"))
            .and_then(|aid| aid.as_i64())
    }

    fn name(&self) -> &str {
        "http"
    }
}

/// Lookup that always declines, forcing the local transform
///
/// Used when no lookup endpoint is configured and in tests.
pub struct NoLookup;

#[async_trait]
impl AuthoritativeLookup for NoLookup {
    async fn numeric_id(&self, _short_code: &str) -> Option<i64> {
        None
    }

    fn name(&self) -> &str {
        "none"
    }
}

/// Canonical short-code resolver: authoritative lookup first, local transform
/// as fallback.
///
/// This is the single resolution entry point; call sites must not reimplement
/// the ordering.
pub struct IdResolver {
    lookup: Arc<dyn AuthoritativeLookup>,
}

impl IdResolver {
    /// Create a resolver over the given lookup implementation
    pub fn new(lookup: Arc<dyn AuthoritativeLookup>) -> Self {
        Self { lookup }
    }

    /// Build the resolver from configuration, with an HTTP lookup when an
    /// endpoint is configured and the local-only fallback otherwise
    pub fn from_config(client: reqwest::Client, config: &crate::config::ResolverConfig) -> Self {
        let lookup: Arc<dyn AuthoritativeLookup> = match &config.lookup_url {
            Some(url) => Arc::new(HttpLookup::new(client, url.clone(), config.lookup_timeout)),
            None => Arc::new(NoLookup),
        };
        Self::new(lookup)
    }

    /// Resolve a short code to the numeric id used as the worker's storage key.
    ///
    /// Tries the authoritative lookup, falling back to [`decode_short_code`]
    /// when the lookup declines. A malformed short code fails with a typed
    /// error from the local transform.
    pub async fn resolve(&self, short_code: &str) -> Result<i64, ResolveError> {
        if let Some(id) = self.lookup.numeric_id(short_code).await {
            tracing::debug!(short_code, id, source = self.lookup.name(), "resolved short code");
            return Ok(id);
        }
        let id = decode_short_code(short_code)?;
        tracing::debug!(short_code, id, source = "local", "resolved short code");
        Ok(id)
    }
}
