//! Match records produced by the page scanner, plus helpers for logging
//! them without leaking the matched personal data.

use hmac::digest::Key;
use hmac::{Hmac, Mac};
use lazy_static::lazy_static;
use log::debug;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

lazy_static! {
    /// Whether matched literals may appear verbatim in debug logs.
    static ref PII_DEBUG_ALLOWED: bool = {
        std::env::var("BLACKOUT_ALLOW_DEBUG_PII")
            .map(|s| s.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    };
}

/// A literal substring found by one detector on one page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Match {
    pub detector: String,
    pub label: String,
    pub literal: String,
    pub page_index: usize,
    /// Byte offsets of the literal in the page text.
    pub start: usize,
    pub end: usize,
}

/// Replaces a sensitive value with a fixed-size placeholder.
pub fn redact_sensitive(s: &str) -> String {
    const MAX_LEN: usize = 8;
    let len = s.chars().count();
    if len <= MAX_LEN {
        "[REDACTED]".to_string()
    } else {
        format!("[REDACTED: {} chars]", len)
    }
}

/// Returns either the content or its placeholder, depending on
/// `BLACKOUT_ALLOW_DEBUG_PII`.
pub fn loggable(sensitive_content: &str) -> String {
    if *PII_DEBUG_ALLOWED {
        sensitive_content.to_string()
    } else {
        redact_sensitive(sensitive_content)
    }
}

pub fn log_match_debug(module_path: &str, m: &Match) {
    debug!(
        "{} Page {} detector '{}' matched '{}' at {}..{}",
        module_path,
        m.page_index,
        m.detector,
        loggable(&m.literal),
        m.start,
        m.end
    );
}

pub fn log_unresolved_literal_debug(module_path: &str, page_index: usize, literal: &str) {
    debug!(
        "{} Page {}: literal '{}' has no rendered position; left as is",
        module_path,
        page_index,
        loggable(literal)
    );
}

/// Keyed fingerprints of matched literals.
///
/// Each hasher draws its own random key, so fingerprints only correlate
/// within one run and cannot be recomputed from a guessed literal.
#[derive(Clone)]
pub struct SampleHasher {
    mac: HmacSha256,
}

impl SampleHasher {
    pub fn new() -> Self {
        let mut key = Key::<HmacSha256>::default();
        rand::rng().fill_bytes(&mut key);
        Self {
            mac: <HmacSha256 as Mac>::new(&key),
        }
    }

    /// HMAC-SHA256 of the literal normalised for case and whitespace, bound
    /// to the detector name.
    pub fn hash(&self, detector: &str, snippet: &str) -> String {
        let normalized = snippet
            .trim()
            .to_lowercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");

        let mut mac = self.mac.clone();
        mac.update(detector.as_bytes());
        mac.update(b":");
        mac.update(normalized.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    pub fn hash_match(&self, m: &Match) -> String {
        self.hash(&m.detector, &m.literal)
    }
}

impl Default for SampleHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SampleHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SampleHasher").finish_non_exhaustive()
    }
}
