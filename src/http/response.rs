//! HTTP response descriptor produced by one engine exchange.

use bytes::Bytes;
use http::{HeaderMap, StatusCode, Version};

/// A fully read response: head plus decoded body.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    status: StatusCode,
    version: Version,
    headers: HeaderMap,
    body: Bytes,
    redirect_target: Option<String>,
    from_cache: bool,
}

impl HttpResponse {
    pub(crate) fn new(
        status: StatusCode,
        version: Version,
        headers: HeaderMap,
        body: Bytes,
        from_cache: bool,
    ) -> Self {
        let redirect_target = headers
            .get(http::header::LOCATION)
            .map(|v| String::from_utf8_lossy(v.as_bytes()).trim().to_string())
            .filter(|s| !s.is_empty());
        Self { status, version, headers, body, redirect_target, from_cache }
    }

    /// Get the status code.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Get the HTTP version.
    pub fn version(&self) -> Version {
        self.version
    }

    /// Get a reference to the headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Decoded body. For a 304 this is the cached body.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// The non-empty `Location` header value, unresolved.
    pub fn redirect_target(&self) -> Option<&str> {
        self.redirect_target.as_deref()
    }

    /// True when the body came from the cache after a 304.
    pub fn is_from_cache(&self) -> bool {
        self.from_cache
    }

    pub fn is_redirect(&self) -> bool {
        self.status.is_redirection() && self.status != StatusCode::NOT_MODIFIED
    }

    /// Consume the response, keeping only the body.
    pub fn into_body(self) -> Bytes {
        self.body
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    #[test]
    fn test_redirect_target_requires_value() {
        let mut headers = HeaderMap::new();
        headers.insert("location", HeaderValue::from_static("  "));
        let resp =
            HttpResponse::new(StatusCode::FOUND, Version::HTTP_11, headers, Bytes::new(), false);
        assert!(resp.is_redirect());
        assert_eq!(resp.redirect_target(), None);

        let mut headers = HeaderMap::new();
        headers.insert("location", HeaderValue::from_static("/next"));
        let resp = HttpResponse::new(
            StatusCode::MOVED_PERMANENTLY,
            Version::HTTP_11,
            headers,
            Bytes::new(),
            false,
        );
        assert_eq!(resp.redirect_target(), Some("/next"));
    }

    #[test]
    fn test_not_modified_is_not_redirect() {
        let resp = HttpResponse::new(
            StatusCode::NOT_MODIFIED,
            Version::HTTP_11,
            HeaderMap::new(),
            Bytes::from_static(b"cached"),
            true,
        );
        assert!(!resp.is_redirect());
        assert!(resp.is_from_cache());
        assert_eq!(resp.into_body(), Bytes::from_static(b"cached"));
    }
}
