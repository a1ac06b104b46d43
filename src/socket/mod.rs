//! Socket and connection management.
//!
//! Mirrors Chromium's `net/socket/`:
//! - [`pool`]: idle keep-alive sockets per origin, LIFO reuse
//! - [`connectjob`]: DNS → TCP → TLS connection flow
//! - [`client`]: plaintext/TLS stream type with a liveness probe
//! - [`tls`]: TLS configuration with BoringSSL

pub mod client;
pub mod connectjob;
pub mod pool;
pub mod tls;
