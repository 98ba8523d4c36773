//! Target-reference parsing
//!
//! Callers submit a target as pasted text: a full post/video URL, a mobile
//! share link, or a bare identifier. This module extracts the identifiers the
//! crawl worker needs and validates required parameters up front, so malformed
//! input fails with [`Error::Validation`](crate::Error::Validation) before any
//! remote state is touched.

use regex::Regex;
use std::sync::OnceLock;
use std::time::Duration;

use crate::error::{Error, Result};

/// Parsed post target (image/text platform)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PostTarget {
    /// Post natural key
    pub note_id: String,
    /// Access token the worker needs to fetch the post
    pub xsec_token: String,
    /// Canonical post URL handed to the worker
    pub url: String,
}

/// Parsed video target
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VideoTarget {
    /// Public short code (alternate key); transcoded before result lookup
    ShortCode(String),
    /// Internal numeric id (natural key)
    Numeric(i64),
}

impl VideoTarget {
    /// The identifier string passed to the worker's start payload
    pub fn as_worker_id(&self) -> String {
        match self {
            VideoTarget::ShortCode(code) => code.clone(),
            VideoTarget::Numeric(id) => format!("av{}", id),
        }
    }

    /// The short code, when this target carries one
    pub fn short_code(&self) -> Option<&str> {
        match self {
            VideoTarget::ShortCode(code) => Some(code),
            VideoTarget::Numeric(_) => None,
        }
    }
}

fn post_id_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"xiaohongshu\.com/(?:explore|discovery/item)/([a-f0-9]+)")
            .unwrap_or_else(|e| unreachable!("static regex: {e}"))
    })
}

fn url_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"https?://[^\s]+").unwrap_or_else(|e| unreachable!("static regex: {e}"))
    })
}

fn short_code_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"BV[a-zA-Z0-9]{10}").unwrap_or_else(|e| unreachable!("static regex: {e}"))
    })
}

fn numeric_id_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\bav(\d+)").unwrap_or_else(|e| unreachable!("static regex: {e}"))
    })
}

/// Parse a post target from pasted text.
///
/// The text must contain a post URL with a note id; the `xsec_token` query
/// parameter is required because the worker cannot fetch the post without it.
/// Share short-links should be expanded first (see [`expand_share_link`]).
pub fn parse_post_target(text: &str) -> Result<PostTarget> {
    let note_id = post_id_re()
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| Error::Validation("not a recognizable post link".into()))?;

    let xsec_token = extract_xsec_token(text).ok_or_else(|| {
        Error::Validation(
            "missing xsec_token parameter; copy the full link from the browser address bar".into(),
        )
    })?;

    // Canonical URL: only the pieces the worker needs, stray query params dropped
    let url = format!(
        "https://www.xiaohongshu.com/explore/{}?xsec_token={}&xsec_source=pc_search",
        note_id, xsec_token
    );

    Ok(PostTarget {
        note_id,
        xsec_token,
        url,
    })
}

/// Pull the `xsec_token` query parameter out of the first URL in the text
fn extract_xsec_token(text: &str) -> Option<String> {
    let candidate = url_re().find(text)?;
    let parsed = url::Url::parse(candidate.as_str()).ok()?;
    parsed
        .query_pairs()
        .find(|(key, _)| key == "xsec_token")
        .map(|(_, value)| value.into_owned())
        .filter(|token| !token.is_empty())
}

/// Parse a video target from pasted text: a `BV` short code or an `av` id
pub fn parse_video_target(text: &str) -> Result<VideoTarget> {
    if let Some(m) = short_code_re().find(text) {
        return Ok(VideoTarget::ShortCode(m.as_str().to_string()));
    }
    if let Some(c) = numeric_id_re().captures(text) {
        let digits = c
            .get(1)
            .map(|m| m.as_str())
            .ok_or_else(|| Error::Validation("not a recognizable video link".into()))?;
        let id: i64 = digits
            .parse()
            .map_err(|_| Error::Validation(format!("numeric id out of range: av{}", digits)))?;
        return Ok(VideoTarget::Numeric(id));
    }
    Err(Error::Validation("not a recognizable video link".into()))
}

/// True when the text needs share-link expansion before parsing.
///
/// Mobile share links (`xhslink.com`) and post links without an `xsec_token`
/// redirect to the canonical URL carrying the token.
pub fn needs_share_link_expansion(text: &str) -> bool {
    text.contains("xhslink.com") || (text.contains("xiaohongshu.com") && !text.contains("xsec_token"))
}

/// Expand a share short-link by following redirects and return the final URL.
///
/// Best-effort: any failure returns the input unchanged so parsing can still
/// report a precise validation error.
pub async fn expand_share_link(client: &reqwest::Client, text: &str) -> String {
    let Some(m) = url_re().find(text) else {
        return text.to_string();
    };
    let fetch_url = m.as_str();

    let result = client
        .get(fetch_url)
        .header(
            "User-Agent",
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
             (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
        )
        .timeout(Duration::from_secs(10))
        .send()
        .await;

    match result {
        Ok(response) => {
            let resolved = response.url().to_string();
            tracing::debug!(from = fetch_url, to = %resolved, "expanded share link");
            resolved
        }
        Err(e) => {
            tracing::warn!(url = fetch_url, error = %e, "share link expansion failed");
            text.to_string()
        }
    }
}
