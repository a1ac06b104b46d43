//! Redirect target resolution (RFC 3986 §5 reference resolution).

use crate::base::neterror::NetError;
use url::Url;

/// Resolve `target` (a `Location` value) against the URL that produced it.
///
/// Absolute targets replace `base`; relative and scheme-relative ones
/// inherit scheme and authority from it.
pub fn resolve(base: &str, target: &str) -> Result<Url, NetError> {
    let base_url =
        Url::parse(base).map_err(|e| NetError::MalformedUrl(format!("{}: {}", base, e)))?;
    if base_url.cannot_be_a_base() {
        return Err(NetError::MalformedUrl(format!("{}: cannot be a base", base)));
    }
    base_url
        .join(target.trim())
        .map_err(|e| NetError::MalformedUrl(format!("{}: {}", target, e)))
}
