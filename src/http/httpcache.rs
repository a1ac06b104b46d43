//! HTTP Cache implementation.
//!
//! Chromium mapping: net/http/http_cache.h (simplified in-memory version)
//!
//! A validator cache: entries are never considered fresh on their own. Every
//! request for a cached URL is sent to the server with `If-None-Match` /
//! `If-Modified-Since`, and a `304 Not Modified` answer is served from the
//! stored body.
//!
//! - Keyed by the exact request URL string (no normalization)
//! - No size bound, TTL or eviction
//! - Thread-safe concurrent access

use bytes::Bytes;
use dashmap::DashMap;
use http::header::{HeaderName, ETAG, LAST_MODIFIED};
use http::HeaderMap;

/// Cached response entry.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    /// Decoded response body
    pub body: Bytes,
    /// ETag for conditional requests
    pub etag: Option<String>,
    /// Last-Modified for conditional requests
    pub last_modified: Option<String>,
    /// Response headers (lower-cased names, last value wins)
    pub headers: HeaderMap,
}

impl CacheEntry {
    /// Build an entry from a response, pulling the validators out of its
    /// headers.
    pub fn from_response(headers: &HeaderMap, body: Bytes) -> Self {
        Self {
            body,
            etag: header_string(headers, &ETAG),
            last_modified: header_string(headers, &LAST_MODIFIED),
            headers: headers.clone(),
        }
    }

    /// Conditional request headers for this entry's validators, in the
    /// order they go on the wire.
    pub fn conditional_headers(&self) -> Vec<(&'static str, &str)> {
        let mut out = Vec::with_capacity(2);
        if let Some(etag) = &self.etag {
            out.push(("If-None-Match", etag.as_str()));
        }
        if let Some(last_modified) = &self.last_modified {
            out.push(("If-Modified-Since", last_modified.as_str()));
        }
        out
    }

    pub fn has_validators(&self) -> bool {
        self.etag.is_some() || self.last_modified.is_some()
    }
}

fn header_string(headers: &HeaderMap, name: &HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// In-memory HTTP cache.
///
/// Thread-safe implementation using DashMap for concurrent access.
#[derive(Debug, Default)]
pub struct HttpCache {
    entries: DashMap<String, CacheEntry>,
}

impl HttpCache {
    pub fn new() -> Self {
        Self { entries: DashMap::new() }
    }

    /// Look up the entry for `url` (a snapshot; later `put`s don't affect it).
    pub fn get(&self, url: &str) -> Option<CacheEntry> {
        self.entries.get(url).map(|e| e.value().clone())
    }

    /// Store an entry, replacing any previous one for `url` wholesale.
    pub fn put(&self, url: &str, entry: CacheEntry) {
        tracing::debug!(
            url = %url,
            bytes = entry.body.len(),
            etag = ?entry.etag,
            last_modified = ?entry.last_modified,
            "cache store"
        );
        self.entries.insert(url.to_string(), entry);
    }

    pub fn contains(&self, url: &str) -> bool {
        self.entries.contains_key(url)
    }

    /// Get the number of cached entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
