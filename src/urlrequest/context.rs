//! URL Request Context - Central configuration for network requests.
//!
//! Based on Chromium's net::URLRequestContext. The context owns the
//! process-wide socket pool and response cache and hands them to every
//! transaction and redirect job built from it.

use crate::base::neterror::NetError;
use crate::http::httpcache::HttpCache;
use crate::http::transaction::HttpNetworkTransaction;
use crate::socket::pool::ClientSocketPool;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Configuration options for URLRequestContext.
///
/// Durations are (de)serialized as integer milliseconds:
///
/// ```json
/// { "connect_timeout_ms": 5000, "io_timeout_ms": 10000, "max_redirects": 3 }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct URLRequestContextConfig {
    /// Bound on DNS + TCP + TLS for a new connection.
    #[serde(rename = "connect_timeout_ms", with = "duration_ms")]
    pub connect_timeout: Duration,

    /// Deadline for one exchange, from writing the head to the last body byte.
    #[serde(rename = "io_timeout_ms", with = "duration_ms")]
    pub io_timeout: Duration,

    /// Idle sockets older than this are closed instead of reused.
    #[serde(rename = "idle_socket_timeout_ms", with = "duration_ms")]
    pub idle_socket_timeout: Duration,

    /// Maximum idle sockets kept per origin.
    pub max_idle_per_origin: usize,

    /// Maximum size of a response head (status line + headers).
    pub max_header_bytes: usize,

    /// Default redirect limit for the client façade.
    pub max_redirects: usize,

    /// Interval of the background idle-socket sweep (None = no sweep).
    #[serde(rename = "idle_sweep_interval_ms", with = "option_duration_ms")]
    pub idle_sweep_interval: Option<Duration>,
}

impl Default for URLRequestContextConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            io_timeout: Duration::from_secs(15),
            idle_socket_timeout: Duration::from_secs(30),
            max_idle_per_origin: 6,
            max_header_bytes: 64 * 1024,
            max_redirects: 5,
            idle_sweep_interval: None,
        }
    }
}

impl URLRequestContextConfig {
    /// Parse a JSON document; missing keys keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, NetError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| NetError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, NetError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| NetError::InvalidConfig(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<(), NetError> {
        if self.connect_timeout.is_zero() {
            return Err(NetError::InvalidConfig("connect_timeout must be non-zero".into()));
        }
        if self.io_timeout.is_zero() {
            return Err(NetError::InvalidConfig("io_timeout must be non-zero".into()));
        }
        if self.max_header_bytes < 64 {
            return Err(NetError::InvalidConfig("max_header_bytes must be at least 64".into()));
        }
        if matches!(self.idle_sweep_interval, Some(d) if d.is_zero()) {
            return Err(NetError::InvalidConfig("idle_sweep_interval must be non-zero".into()));
        }
        Ok(())
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

mod option_duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match d {
            Some(d) => s.serialize_some(&(d.as_millis() as u64)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Option::<u64>::deserialize(d).map(|ms| ms.map(Duration::from_millis))
    }
}

/// Shared state for network requests.
///
/// Construct once and share via `Arc`; every clone of the `Arc` sees the
/// same pool and cache.
#[derive(Debug)]
pub struct URLRequestContext {
    /// Socket pool for connection reuse.
    socket_pool: Arc<ClientSocketPool>,

    /// Validator-based response cache.
    cache: Arc<HttpCache>,

    /// Configuration options.
    config: URLRequestContextConfig,
}

impl URLRequestContext {
    /// Create a new URLRequestContext with default configuration.
    pub fn new() -> Self {
        Self::with_config(URLRequestContextConfig::default())
    }

    /// Create a new URLRequestContext with custom configuration.
    pub fn with_config(config: URLRequestContextConfig) -> Self {
        let pool = ClientSocketPool::from_config(&config);
        Self::with_parts(config, pool, HttpCache::new())
    }

    /// Assemble a context from an explicit pool and cache. The pool keeps
    /// its own settings.
    pub fn with_parts(
        config: URLRequestContextConfig,
        pool: ClientSocketPool,
        cache: HttpCache,
    ) -> Self {
        Self { socket_pool: Arc::new(pool), cache: Arc::new(cache), config }
    }

    /// Build an engine bound to this context's pool and cache.
    pub fn transaction(&self) -> HttpNetworkTransaction {
        HttpNetworkTransaction::new(
            Arc::clone(&self.socket_pool),
            Arc::clone(&self.cache),
            self.config.io_timeout,
            self.config.max_header_bytes,
        )
    }

    /// Start the idle-socket sweep if configured. Must be called from
    /// within a tokio runtime.
    pub fn start_idle_sweep(&self) -> Option<JoinHandle<()>> {
        let interval = self.config.idle_sweep_interval?;
        Some(self.socket_pool.start_cleanup_task(interval))
    }

    /// Get the socket pool.
    pub fn socket_pool(&self) -> &Arc<ClientSocketPool> {
        &self.socket_pool
    }

    /// Get the response cache.
    pub fn cache(&self) -> &Arc<HttpCache> {
        &self.cache
    }

    pub fn config(&self) -> &URLRequestContextConfig {
        &self.config
    }
}

impl Default for URLRequestContext {
    fn default() -> Self {
        Self::new()
    }
}
