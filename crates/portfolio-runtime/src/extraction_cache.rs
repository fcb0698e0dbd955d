//! Content-addressed cache for extracted document text.
//!
//! Uploaded documents are keyed by the SHA-256 of their bytes, so the same
//! file uploaded twice (under any name) is only extracted once per process.
//! Extraction itself is delegated to a [`TextExtractor`]; storage to a
//! [`CacheStore`], with a [`DashMap`]-backed [`MemoryStore`] by default.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;

use dashmap::DashMap;
use portfolio_core::error::{PortfolioError, Result};
use regex::Regex;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

// ── Traits ────────────────────────────────────────────────────────────────────

/// Turns raw document bytes into text.
pub trait TextExtractor: Send + Sync {
    fn extract(&self, bytes: &[u8]) -> Result<String>;
}

/// Backing storage for [`ExtractionCache`].
pub trait CacheStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn insert(&self, key: String, text: String);
    fn len(&self) -> usize;
    fn clear(&self);

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ── MemoryStore ───────────────────────────────────────────────────────────────

/// Process-lifetime store safe for concurrent readers and writers.
#[derive(Default)]
pub struct MemoryStore {
    entries: DashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).map(|r| r.value().clone())
    }

    fn insert(&self, key: String, text: String) {
        self.entries.insert(key, text);
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn clear(&self) {
        self.entries.clear();
    }
}

// ── PlainTextExtractor ────────────────────────────────────────────────────────

/// Treats the bytes as UTF-8 text, replacing invalid sequences.
pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<String> {
        if bytes.contains(&0) {
            return Err(PortfolioError::Extraction(
                "binary content is not plain text".to_string(),
            ));
        }
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }
}

// ── ExtractionCache ───────────────────────────────────────────────────────────

/// Result of [`ExtractionCache::get_or_extract`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedText {
    /// Hex SHA-256 of the input bytes.
    pub hash: String,
    /// Whitespace-normalized text, empty when extraction failed.
    pub text: String,
    /// `true` when served from the store without extracting.
    pub cached: bool,
}

/// Memoizes extraction results by content hash.
///
/// # Example
/// ```
/// use portfolio_runtime::extraction_cache::{ExtractionCache, PlainTextExtractor};
///
/// let cache = ExtractionCache::new();
/// let first = cache.get_or_extract(b"hello   world", &PlainTextExtractor);
/// let again = cache.get_or_extract(b"hello   world", &PlainTextExtractor);
/// assert_eq!(first.text, "hello world");
/// assert!(again.cached);
/// ```
pub struct ExtractionCache<S: CacheStore = MemoryStore> {
    store: S,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ExtractionCache<MemoryStore> {
    pub fn new() -> Self {
        Self::with_store(MemoryStore::new())
    }
}

impl Default for ExtractionCache<MemoryStore> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: CacheStore> ExtractionCache<S> {
    pub fn with_store(store: S) -> Self {
        Self {
            store,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Return the text for `bytes`, extracting only on a cache miss.
    ///
    /// A failed extraction is logged and yields empty text. Failures are not
    /// stored, so the next call retries.
    pub fn get_or_extract(&self, bytes: &[u8], extractor: &dyn TextExtractor) -> ExtractedText {
        let hash = content_hash(bytes);

        if let Some(text) = self.store.get(&hash) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!(hash = %hash, "extraction cache hit");
            return ExtractedText {
                hash,
                text,
                cached: true,
            };
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        match extractor.extract(bytes) {
            Ok(raw) => {
                let text = normalize_whitespace(&raw);
                self.store.insert(hash.clone(), text.clone());
                debug!(hash = %hash, chars = text.chars().count(), "extracted text cached");
                ExtractedText {
                    hash,
                    text,
                    cached: false,
                }
            }
            Err(e) => {
                warn!(hash = %hash, error = %e, "text extraction failed");
                ExtractedText {
                    hash,
                    text: String::new(),
                    cached: false,
                }
            }
        }
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Drop every cached entry and reset the counters.
    pub fn clear(&self) {
        self.store.clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Hex-encoded SHA-256 of `bytes`.
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Collapse every whitespace run to a single space and trim the ends.
pub fn normalize_whitespace(text: &str) -> String {
    static WHITESPACE: OnceLock<Regex> = OnceLock::new();
    let re = WHITESPACE.get_or_init(|| Regex::new(r"\s+").expect("regex is valid"));
    re.replace_all(text, " ").trim().to_string()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
