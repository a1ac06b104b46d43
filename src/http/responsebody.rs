//! Response body reading.
//! Mirrors Chromium's HttpStream::ReadResponseBody for the HTTP/1.1 framings
//! this client supports: no body, `Content-Length`, and close-delimited.

use crate::base::context::IoResultExt;
use crate::base::neterror::NetError;
use bytes::Bytes;
use flate2::bufread::MultiGzDecoder;
use http::header::{CONTENT_ENCODING, CONTENT_LENGTH, TRANSFER_ENCODING};
use http::{HeaderMap, StatusCode};
use std::io::Read;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Cap on the up-front allocation for a `Content-Length` body.
const MAX_PREALLOC: u64 = 1 << 20;

/// How the end of a response body is found on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyFraming {
    /// No body follows the head (1xx, 204, 304).
    Empty,
    /// Exactly this many bytes follow.
    Length(u64),
    /// The body runs until the server closes the connection.
    CloseDelimited,
}

impl BodyFraming {
    pub fn for_response(status: StatusCode, headers: &HeaderMap) -> Result<Self, NetError> {
        if status.is_informational()
            || status == StatusCode::NO_CONTENT
            || status == StatusCode::NOT_MODIFIED
        {
            return Ok(BodyFraming::Empty);
        }

        if let Some(te) = headers.get(TRANSFER_ENCODING) {
            let te = String::from_utf8_lossy(te.as_bytes()).trim().to_string();
            if !te.is_empty() && !te.eq_ignore_ascii_case("identity") {
                return Err(NetError::UnsupportedTransferEncoding(te));
            }
        }

        match headers.get(CONTENT_LENGTH) {
            Some(value) => value
                .to_str()
                .ok()
                .and_then(|s| s.trim().parse::<u64>().ok())
                .map(BodyFraming::Length)
                .ok_or(NetError::InvalidResponse),
            None => Ok(BodyFraming::CloseDelimited),
        }
    }

    /// Whether the connection has a known response boundary after the body.
    pub fn leaves_clean_boundary(&self) -> bool {
        !matches!(self, BodyFraming::CloseDelimited)
    }
}

/// Read the raw (still encoded) body according to `framing`.
pub async fn read_body<R>(reader: &mut R, framing: BodyFraming) -> Result<Bytes, NetError>
where
    R: AsyncRead + Unpin,
{
    match framing {
        BodyFraming::Empty => Ok(Bytes::new()),
        BodyFraming::Length(len) => {
            let mut buf = Vec::with_capacity(len.min(MAX_PREALLOC) as usize);
            (&mut *reader).take(len).read_to_end(&mut buf).await.exchange_context()?;
            if (buf.len() as u64) < len {
                tracing::debug!(expected = len, got = buf.len(), "body shorter than Content-Length");
                return Err(NetError::ContentLengthMismatch);
            }
            Ok(Bytes::from(buf))
        }
        BodyFraming::CloseDelimited => {
            let mut buf = Vec::new();
            reader.read_to_end(&mut buf).await.exchange_context()?;
            Ok(Bytes::from(buf))
        }
    }
}

/// True if the response body is gzip-encoded.
pub fn is_gzip(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_ENCODING)
        .map(|v| String::from_utf8_lossy(v.as_bytes()).to_ascii_lowercase().contains("gzip"))
        .unwrap_or(false)
}

/// Decompress a complete gzip body made of one or more members. Any
/// corruption, including truncation or bytes after the last member, fails
/// the whole body.
pub fn decode_gzip(raw: &[u8]) -> Result<Bytes, NetError> {
    if raw.is_empty() {
        return Ok(Bytes::new());
    }
    let mut out = Vec::with_capacity(raw.len() * 2);
    let mut decoder = MultiGzDecoder::new(raw);
    decoder.read_to_end(&mut out).map_err(|e| {
        tracing::debug!(error = %e, "gzip decoding failed");
        NetError::ContentDecodingFailed
    })?;
    let unread = decoder.into_inner().len();
    if unread > 0 {
        tracing::debug!(unread, "bytes left after gzip stream");
        return Err(NetError::ContentDecodingFailed);
    }
    Ok(Bytes::from(out))
}

/// Apply the response's content coding to a raw body.
pub fn decode_body(headers: &HeaderMap, raw: Bytes) -> Result<Bytes, NetError> {
    if is_gzip(headers) {
        decode_gzip(&raw)
    } else {
        Ok(raw)
    }
}
