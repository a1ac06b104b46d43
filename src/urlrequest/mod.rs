//! Request orchestration: shared context, redirect job and URL resolution.

pub mod context;
pub mod job;
pub mod resolver;

pub use context::{URLRequestContext, URLRequestContextConfig};
pub use job::{fetch_with_redirects, JobState, URLRequestHttpJob};
