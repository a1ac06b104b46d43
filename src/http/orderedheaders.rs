use crate::base::neterror::NetError;
use http::header::{HeaderName, HeaderValue};
use http::HeaderMap;
use std::str::FromStr;

/// A header map that strictly preserves insertion order.
///
/// Names are matched case-insensitively but keep the caller's spelling, so
/// the request head goes out exactly as written (`X-Custom-Header`, not
/// `x-custom-header`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderedHeaderMap {
    headers: Vec<(String, HeaderValue)>,
}

impl OrderedHeaderMap {
    pub fn new() -> Self {
        Self { headers: Vec::new() }
    }

    /// Insert or replace a header.
    ///
    /// Chromium behavior: update in place if the name already exists
    /// (case-insensitive), else append.
    pub fn insert(&mut self, name: &str, value: &str) -> Result<(), NetError> {
        HeaderName::from_str(name).map_err(|_| NetError::InvalidHeader)?;
        let value_header = HeaderValue::from_str(value).map_err(|_| NetError::InvalidHeader)?;

        if let Some((_, v)) = self.headers.iter_mut().find(|(n, _)| n.eq_ignore_ascii_case(name)) {
            *v = value_header;
        } else {
            self.headers.push((name.to_string(), value_header));
        }
        Ok(())
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, name: &str, value: &str) -> Result<Self, NetError> {
        self.insert(name, value)?;
        Ok(self)
    }

    pub fn remove(&mut self, name: &str) {
        self.headers.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
    }

    pub fn get(&self, name: &str) -> Option<&HeaderValue> {
        self.headers.iter().find(|(n, _)| n.eq_ignore_ascii_case(name)).map(|(_, v)| v)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &HeaderValue)> {
        self.headers.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Append `Name: value\r\n` lines to a request head, in insertion order.
    /// Headers for which `skip` returns true are left out.
    pub fn write_to(&self, out: &mut Vec<u8>, mut skip: impl FnMut(&str) -> bool) {
        for (name, value) in &self.headers {
            if skip(name) {
                continue;
            }
            out.extend_from_slice(name.as_bytes());
            out.extend_from_slice(b": ");
            out.extend_from_slice(value.as_bytes());
            out.extend_from_slice(b"\r\n");
        }
    }

    /// Consumes the map and returns a standard http::HeaderMap.
    pub fn to_header_map(self) -> HeaderMap {
        let mut map = HeaderMap::with_capacity(self.headers.len());
        for (name, value) in self.headers {
            if let Ok(name) = HeaderName::from_str(&name) {
                map.insert(name, value);
            }
        }
        map
    }
}

impl From<&HeaderMap> for OrderedHeaderMap {
    /// Last value wins for repeated names.
    fn from(map: &HeaderMap) -> Self {
        let mut out = OrderedHeaderMap::new();
        for (name, value) in map {
            if let Some((_, v)) = out.headers.iter_mut().find(|(n, _)| n == name.as_str()) {
                *v = value.clone();
            } else {
                out.headers.push((name.as_str().to_string(), value.clone()));
            }
        }
        out
    }
}
