//! Error context helpers.
//!
//! Converts IO errors and elapsed deadlines into `NetError` variants that
//! say which phase of the exchange failed.

use crate::base::neterror::NetError;
use std::future::Future;
use std::io;
use std::time::Duration;
use tokio::time::Instant;

/// Extension trait for adding context to IO Results.
pub trait IoResultExt<T> {
    /// Add connection context to an IO error.
    ///
    /// # Example
    /// ```ignore
    /// use rawhttp::base::context::IoResultExt;
    ///
    /// let stream = TcpStream::connect(addr).await
    ///     .connection_context("example.com", 443)?;
    /// // Error: "Connection to example.com:443 failed: connection refused"
    /// ```
    fn connection_context(self, host: &str, port: u16) -> Result<T, NetError>;

    /// Add DNS resolution context to an IO error.
    fn dns_context(self, domain: &str) -> Result<T, NetError>;

    /// Classify an IO error raised on an established connection.
    fn exchange_context(self) -> Result<T, NetError>;
}

impl<T> IoResultExt<T> for Result<T, io::Error> {
    fn connection_context(self, host: &str, port: u16) -> Result<T, NetError> {
        self.map_err(|e| NetError::connection_failed_to(host, port, e))
    }

    fn dns_context(self, domain: &str) -> Result<T, NetError> {
        self.map_err(|e| NetError::dns_failed(domain, e))
    }

    fn exchange_context(self) -> Result<T, NetError> {
        self.map_err(|e| NetError::from_io(&e))
    }
}

/// Run `fut` under a deadline, mapping expiry to `on_elapsed`.
pub async fn with_deadline<T, F>(limit: Duration, on_elapsed: NetError, fut: F) -> Result<T, NetError>
where
    F: Future<Output = Result<T, NetError>>,
{
    with_deadline_at(Instant::now() + limit, on_elapsed, fut).await
}

/// Like [`with_deadline`], against a fixed instant shared by several phases.
pub async fn with_deadline_at<T, F>(
    deadline: Instant,
    on_elapsed: NetError,
    fut: F,
) -> Result<T, NetError>
where
    F: Future<Output = Result<T, NetError>>,
{
    match tokio::time::timeout_at(deadline, fut).await {
        Ok(result) => result,
        Err(_) => Err(on_elapsed),
    }
}
