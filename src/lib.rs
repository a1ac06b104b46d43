//! # rawhttp
//!
//! A minimal HTTP/1.1 GET client written directly against TCP and TLS
//! sockets, modelled on Chromium's `net/` stack.
//!
//! `rawhttp` follows redirects, revalidates cached responses with
//! `If-None-Match` / `If-Modified-Since`, and keeps keep-alive connections
//! in a per-origin pool.
//!
//! ## Features
//!
//! - **Connection Pooling**: LIFO reuse per origin, idle timeout and liveness probe
//! - **Validator Cache**: every cached URL is revalidated, 304 serves the stored body
//! - **Redirects**: RFC 3986 resolution of `Location`, bounded hop count
//! - **TLS**: BoringSSL with SNI and ALPN `http/1.1`
//! - **gzip**: transparent `Content-Encoding: gzip` decoding
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use rawhttp::Client;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), rawhttp::NetError> {
//!     let client = Client::new();
//!     let body = client.get("https://example.com").send().await?;
//!     println!("{} bytes", body.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`base`] - Error taxonomy, IO error context and load states
//! - [`http`] - The HTTP/1.1 exchange, headers, body decoding and cache
//! - [`socket`] - Connection pooling, dialing and TLS
//! - [`urlrequest`] - Context, redirect job and URL resolution

pub mod base;
pub mod client;
pub mod http;
pub mod socket;
pub mod urlrequest;

pub use crate::base::neterror::NetError;
pub use crate::client::{Client, ClientBuilder, RequestBuilder};
pub use crate::http::{HttpResponse, OrderedHeaderMap};
pub use crate::urlrequest::{fetch_with_redirects, URLRequestContext, URLRequestContextConfig};
