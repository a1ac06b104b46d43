use thiserror::Error;

/// Network error codes.
///
/// Variants with a Chromium counterpart keep the numeric code from
/// `net_error_list.h`; variants specific to this crate use codes from -10000
/// downward so they never collide with the Chromium ranges.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum NetError {
    // Connection Errors
    #[error("Connection closed (TCP FIN)")]
    ConnectionClosed,
    #[error("Connection reset (TCP RST)")]
    ConnectionReset,
    #[error("Connection failed")]
    ConnectionFailed,
    #[error("Connection to {host}:{port} failed: {reason}")]
    ConnectionFailedTo { host: String, port: u16, reason: String },
    #[error("Name not resolved: {domain}: {reason}")]
    NameNotResolvedFor { domain: String, reason: String },
    #[error("SSL protocol error")]
    SslProtocolError,
    #[error("Connection timed out")]
    ConnectionTimedOut,

    // HTTP Errors
    #[error("Invalid URL")]
    InvalidUrl,
    #[error("Unknown URL scheme")]
    UnknownUrlScheme,
    #[error("Too many redirects")]
    TooManyRedirects,
    #[error("Invalid response")]
    InvalidResponse,
    #[error("Empty response")]
    EmptyResponse,
    #[error("Response headers too big")]
    ResponseHeadersTooBig,
    #[error("Content decoding failed")]
    ContentDecodingFailed,
    #[error("Content-Length mismatch")]
    ContentLengthMismatch,
    #[error("Response headers truncated")]
    ResponseHeadersTruncated,

    // Raw-client errors
    #[error("Read timed out")]
    ReadTimeout,
    #[error("Write timed out")]
    WriteTimeout,
    #[error("Malformed status line: {0:?}")]
    MalformedStatusLine(String),
    #[error("Redirect response without a Location header")]
    MissingLocationHeader,
    #[error("Malformed URL: {0}")]
    MalformedUrl(String),
    #[error("304 Not Modified received without a cached entry for {0}")]
    CacheInconsistency(String),
    #[error("Unsupported Transfer-Encoding: {0}")]
    UnsupportedTransferEncoding(String),
    #[error("Invalid header")]
    InvalidHeader,
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unknown error: {0}")]
    Unknown(i32),
}

impl NetError {
    /// Connection failure with host/port context.
    pub fn connection_failed_to(host: &str, port: u16, err: std::io::Error) -> Self {
        NetError::ConnectionFailedTo { host: host.to_string(), port, reason: err.to_string() }
    }

    /// DNS failure with domain context.
    pub fn dns_failed(domain: &str, err: std::io::Error) -> Self {
        NetError::NameNotResolvedFor { domain: domain.to_string(), reason: err.to_string() }
    }

    /// Map an I/O error raised mid-exchange.
    pub fn from_io(err: &std::io::Error) -> Self {
        use std::io::ErrorKind;
        match err.kind() {
            ErrorKind::ConnectionReset | ErrorKind::BrokenPipe => NetError::ConnectionReset,
            ErrorKind::UnexpectedEof | ErrorKind::ConnectionAborted => NetError::ConnectionClosed,
            ErrorKind::TimedOut => NetError::ReadTimeout,
            _ => NetError::ConnectionFailed,
        }
    }

    /// Errors raised while dialing a new connection.
    pub fn is_connect_error(&self) -> bool {
        matches!(
            self,
            NetError::ConnectionFailed
                | NetError::ConnectionFailedTo { .. }
                | NetError::NameNotResolvedFor { .. }
                | NetError::SslProtocolError
                | NetError::ConnectionTimedOut
        )
    }

    /// Failures that mean a reused keep-alive socket was already dead when
    /// we picked it up. Only these qualify for a retry on a fresh socket.
    pub fn is_stale_socket_error(&self) -> bool {
        matches!(
            self,
            NetError::ConnectionClosed | NetError::ConnectionReset | NetError::EmptyResponse
        )
    }

    pub fn as_i32(&self) -> i32 {
        match self {
            NetError::ConnectionClosed => -100,
            NetError::ConnectionReset => -101,
            NetError::ConnectionFailed => -104,
            NetError::ConnectionFailedTo { .. } => -104,
            NetError::NameNotResolvedFor { .. } => -105,
            NetError::SslProtocolError => -107,
            NetError::ConnectionTimedOut => -118,

            NetError::InvalidUrl => -300,
            NetError::UnknownUrlScheme => -302,
            NetError::TooManyRedirects => -310,
            NetError::InvalidResponse => -320,
            NetError::EmptyResponse => -324,
            NetError::ResponseHeadersTooBig => -325,
            NetError::ContentDecodingFailed => -330,
            NetError::ContentLengthMismatch => -354,
            NetError::ResponseHeadersTruncated => -357,

            NetError::ReadTimeout => -10000,
            NetError::WriteTimeout => -10001,
            NetError::MalformedStatusLine(_) => -10002,
            NetError::MissingLocationHeader => -10003,
            NetError::MalformedUrl(_) => -10004,
            NetError::CacheInconsistency(_) => -10005,
            NetError::UnsupportedTransferEncoding(_) => -10006,
            NetError::InvalidHeader => -10007,
            NetError::InvalidConfig(_) => -10008,
            NetError::Unknown(code) => *code,
        }
    }
}

impl From<i32> for NetError {
    /// Codes of context-carrying variants map to their payload-free
    /// counterparts (e.g. -104 to `ConnectionFailed`).
    fn from(code: i32) -> Self {
        match code {
            -100 => NetError::ConnectionClosed,
            -101 => NetError::ConnectionReset,
            -104 => NetError::ConnectionFailed,
            -107 => NetError::SslProtocolError,
            -118 => NetError::ConnectionTimedOut,

            -300 => NetError::InvalidUrl,
            -302 => NetError::UnknownUrlScheme,
            -310 => NetError::TooManyRedirects,
            -320 => NetError::InvalidResponse,
            -324 => NetError::EmptyResponse,
            -325 => NetError::ResponseHeadersTooBig,
            -330 => NetError::ContentDecodingFailed,
            -354 => NetError::ContentLengthMismatch,
            -357 => NetError::ResponseHeadersTruncated,

            -10000 => NetError::ReadTimeout,
            -10001 => NetError::WriteTimeout,
            -10003 => NetError::MissingLocationHeader,
            -10007 => NetError::InvalidHeader,
            _ => NetError::Unknown(code),
        }
    }
}
