//! HTTP/1.1 exchange: request head rendering, response parsing, body
//! decoding and the validator cache.

pub mod httpcache;
pub mod orderedheaders;
pub mod response;
pub mod responsebody;
pub mod transaction;

// Re-exports for convenience
pub use httpcache::{CacheEntry, HttpCache};
pub use orderedheaders::OrderedHeaderMap;
pub use response::HttpResponse;
pub use transaction::HttpNetworkTransaction;
