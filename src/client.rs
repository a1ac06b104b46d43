//! HTTP Client with builder pattern.
//!
//! Wraps a shared [`URLRequestContext`] (socket pool, cache, timeouts) and
//! runs every fetch through the redirect job.
//!
//! # Example
//!
//! ```rust,ignore
//! use rawhttp::Client;
//! use std::time::Duration;
//!
//! let client = Client::builder()
//!     .io_timeout(Duration::from_secs(5))
//!     .max_redirects(3)
//!     .build()?;
//!
//! let body = client.get("https://example.com")
//!     .header("User-Agent", "rawhttp/0.1")
//!     .send()
//!     .await?;
//! ```

use crate::base::neterror::NetError;
use crate::http::orderedheaders::OrderedHeaderMap;
use crate::http::HttpCache;
use crate::socket::pool::ClientSocketPool;
use crate::socket::tls::TlsConfig;
use crate::urlrequest::context::{URLRequestContext, URLRequestContextConfig};
use crate::urlrequest::job::fetch_with_redirects;
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;

/// HTTP Client for making requests.
///
/// Cloning is cheap; clones share the pool and cache.
/// Use [`Client::builder()`] to configure and create a client.
#[derive(Clone, Debug)]
pub struct Client {
    context: Arc<URLRequestContext>,
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

impl Client {
    /// Create a new client with default settings.
    pub fn new() -> Self {
        Self::with_context(Arc::new(URLRequestContext::new()))
    }

    /// Create a new client builder.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    /// Share an existing context.
    pub fn with_context(context: Arc<URLRequestContext>) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &Arc<URLRequestContext> {
        &self.context
    }

    /// Fetch `url`, following at most `max_redirects` redirects.
    pub async fn fetch_with_redirects(
        &self,
        url: &str,
        max_redirects: usize,
        headers: &OrderedHeaderMap,
    ) -> Result<Bytes, NetError> {
        fetch_with_redirects(&self.context, url, max_redirects, headers).await
    }

    /// Start building a GET request.
    pub fn get<U: AsRef<str>>(&self, url: U) -> RequestBuilder {
        RequestBuilder {
            client: self.clone(),
            url: url.as_ref().to_string(),
            headers: OrderedHeaderMap::new(),
            max_redirects: self.context.config().max_redirects,
            error: None,
        }
    }
}

/// Builder for creating a [`Client`].
#[derive(Debug, Default)]
pub struct ClientBuilder {
    config: URLRequestContextConfig,
    tls_config: Option<TlsConfig>,
}

impl ClientBuilder {
    /// Start from a complete configuration (e.g. loaded from JSON).
    pub fn config(mut self, config: URLRequestContextConfig) -> Self {
        self.config = config;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Set the per-exchange read/write deadline.
    pub fn io_timeout(mut self, timeout: Duration) -> Self {
        self.config.io_timeout = timeout;
        self
    }

    pub fn idle_socket_timeout(mut self, timeout: Duration) -> Self {
        self.config.idle_socket_timeout = timeout;
        self
    }

    pub fn max_idle_per_origin(mut self, max: usize) -> Self {
        self.config.max_idle_per_origin = max;
        self
    }

    pub fn max_header_bytes(mut self, max: usize) -> Self {
        self.config.max_header_bytes = max;
        self
    }

    /// Default redirect limit for [`Client::get`].
    pub fn max_redirects(mut self, max: usize) -> Self {
        self.config.max_redirects = max;
        self
    }

    /// Prune idle sockets in the background at this interval.
    pub fn idle_sweep_interval(mut self, interval: Duration) -> Self {
        self.config.idle_sweep_interval = Some(interval);
        self
    }

    /// Set TLS options for `https` connections.
    pub fn tls_config(mut self, tls_config: TlsConfig) -> Self {
        self.tls_config = Some(tls_config);
        self
    }

    /// Build the client.
    ///
    /// The idle sweep, when configured, only starts if a tokio runtime is
    /// running.
    pub fn build(self) -> Result<Client, NetError> {
        self.config.validate()?;

        let mut pool = ClientSocketPool::from_config(&self.config);
        if let Some(tls_config) = self.tls_config {
            pool = pool.with_tls_config(tls_config);
        }
        let context = URLRequestContext::with_parts(self.config, pool, HttpCache::new());

        if tokio::runtime::Handle::try_current().is_ok() {
            // The task exits on its own once the pool is dropped.
            let _ = context.start_idle_sweep();
        } else if context.config().idle_sweep_interval.is_some() {
            tracing::warn!("no tokio runtime, idle socket sweep not started");
        }

        Ok(Client::with_context(Arc::new(context)))
    }
}

/// Builder for a single GET request.
#[derive(Debug)]
pub struct RequestBuilder {
    client: Client,
    url: String,
    headers: OrderedHeaderMap,
    max_redirects: usize,
    error: Option<NetError>,
}

impl RequestBuilder {
    /// Add a header. Headers go out in the order they are added.
    ///
    /// An invalid name or value is reported by [`send`](Self::send).
    pub fn header(mut self, name: &str, value: &str) -> Self {
        if self.error.is_none() {
            if let Err(e) = self.headers.insert(name, value) {
                self.error = Some(e);
            }
        }
        self
    }

    /// Override the client's redirect limit for this request.
    pub fn max_redirects(mut self, max: usize) -> Self {
        self.max_redirects = max;
        self
    }

    /// Send the request and return the final body.
    pub async fn send(self) -> Result<Bytes, NetError> {
        if let Some(e) = self.error {
            return Err(e);
        }
        self.client.fetch_with_redirects(&self.url, self.max_redirects, &self.headers).await
    }
}
