//! Base types and error handling.
//!
//! Provides foundational types mirroring Chromium's `net/base/`:
//! - [`NetError`](neterror::NetError): Network error codes
//! - [`LoadState`](loadstate::LoadState): Exchange loading states
//! - [`context`]: IO error and deadline context helpers

pub mod context;
pub mod loadstate;
pub mod neterror;
