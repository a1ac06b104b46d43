use crate::base::context::{with_deadline_at, IoResultExt};
use crate::base::loadstate::LoadState;
use crate::base::neterror::NetError;
use crate::http::httpcache::{CacheEntry, HttpCache};
use crate::http::orderedheaders::OrderedHeaderMap;
use crate::http::response::HttpResponse;
use crate::http::responsebody::{decode_body, read_body, BodyFraming};
use crate::socket::pool::{ClientSocketPool, Origin, PooledSocket};
use http::header::{HeaderName, HeaderValue, CONNECTION};
use http::{HeaderMap, StatusCode, Version};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::time::Instant;
use url::Url;

/// Request headers the engine always writes itself. Caller headers with
/// these names are dropped.
const BUILTIN_HEADERS: &[&str] =
    &["host", "connection", "accept-encoding", "if-none-match", "if-modified-since"];

/// Internal state machine states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    CreateStream,
    SendRequest,
    ReadHeaders,
    ReadBody,
    Done,
}

impl State {
    /// Map internal state to public LoadState.
    fn to_load_state(self) -> LoadState {
        match self {
            State::Idle => LoadState::Idle,
            State::CreateStream => LoadState::Connecting,
            State::SendRequest => LoadState::SendingRequest,
            State::ReadHeaders => LoadState::WaitingForResponse,
            State::ReadBody => LoadState::ReadingResponse,
            State::Done => LoadState::Idle,
        }
    }
}

/// Status line and header block of one response.
#[derive(Debug)]
struct ResponseHead {
    version: Version,
    status: StatusCode,
    headers: HeaderMap,
}

/// One HTTP/1.1 GET exchange over a pooled socket.
///
/// Mirrors Chromium's HttpNetworkTransaction: checks out a socket, writes the
/// request head, reads the response, revalidates against the cache and hands
/// the socket back to the pool when the response boundary is clean.
pub struct HttpNetworkTransaction {
    pool: Arc<ClientSocketPool>,
    cache: Arc<HttpCache>,
    io_timeout: Duration,
    max_header_bytes: usize,
    state: State,
    response_started: bool,
}

impl HttpNetworkTransaction {
    pub fn new(
        pool: Arc<ClientSocketPool>,
        cache: Arc<HttpCache>,
        io_timeout: Duration,
        max_header_bytes: usize,
    ) -> Self {
        Self {
            pool,
            cache,
            io_timeout,
            max_header_bytes,
            state: State::Idle,
            response_started: false,
        }
    }

    /// Get the current load state (for progress reporting).
    pub fn load_state(&self) -> LoadState {
        self.state.to_load_state()
    }

    /// Fetch `url` with one GET request.
    ///
    /// A reused socket that fails before any response byte arrives is
    /// replaced by a freshly dialed one and the request is sent once more.
    pub async fn execute(
        &mut self,
        url: &str,
        headers: &OrderedHeaderMap,
    ) -> Result<HttpResponse, NetError> {
        let result = self.do_execute(url, headers).await;
        self.state = State::Done;
        result
    }

    async fn do_execute(
        &mut self,
        url: &str,
        headers: &OrderedHeaderMap,
    ) -> Result<HttpResponse, NetError> {
        let parsed = Url::parse(url).map_err(|e| {
            tracing::debug!(url = %url, error = %e, "unparseable request url");
            NetError::InvalidUrl
        })?;
        let origin = Origin::from_url(&parsed)?;

        // Validators and the 304 body must come from the same entry.
        let snapshot = self.cache.get(url);
        let head = build_request_head(&parsed, &origin, snapshot.as_ref(), headers);

        self.state = State::CreateStream;
        let socket = self.pool.acquire(&origin).await?;
        let reused = socket.is_reused();

        match self.send_on(socket, url, &head, snapshot.as_ref()).await {
            Err(e) if reused && !self.response_started && e.is_stale_socket_error() => {
                tracing::warn!(
                    origin = %origin,
                    error = %e,
                    "reused socket failed before response, retrying on a new connection"
                );
                self.state = State::CreateStream;
                let socket = self.pool.connect(&origin).await?;
                self.send_on(socket, url, &head, snapshot.as_ref()).await
            }
            other => other,
        }
    }

    /// Run the exchange on `socket`, then release or discard it.
    async fn send_on(
        &mut self,
        mut socket: PooledSocket,
        url: &str,
        head: &[u8],
        snapshot: Option<&CacheEntry>,
    ) -> Result<HttpResponse, NetError> {
        self.response_started = false;
        match self.exchange(&mut socket, url, head, snapshot).await {
            Ok((response, reusable)) => {
                if reusable {
                    self.pool.release(socket);
                } else {
                    self.pool.discard(socket);
                }
                Ok(response)
            }
            Err(e) => {
                tracing::debug!(url = %url, error = %e, "exchange failed");
                self.pool.discard(socket);
                Err(e)
            }
        }
    }

    /// Returns the response and whether the socket may go back to the pool.
    ///
    /// The write, the head read and the body read share one deadline of
    /// `io_timeout` from the start of the exchange.
    async fn exchange(
        &mut self,
        socket: &mut PooledSocket,
        url: &str,
        head: &[u8],
        snapshot: Option<&CacheEntry>,
    ) -> Result<(HttpResponse, bool), NetError> {
        let deadline = Instant::now() + self.io_timeout;
        let max_header_bytes = self.max_header_bytes;

        self.state = State::SendRequest;
        let stream = socket.socket_mut();
        with_deadline_at(deadline, NetError::WriteTimeout, async {
            stream.write_all(head).await.exchange_context()?;
            stream.flush().await.exchange_context()
        })
        .await?;

        self.state = State::ReadHeaders;
        let mut reader = BufReader::new(stream);
        let started = &mut self.response_started;
        let response_head = with_deadline_at(deadline, NetError::ReadTimeout, async {
            loop {
                let head = read_head(&mut reader, max_header_bytes, started).await?;
                if !head.status.is_informational() {
                    return Ok::<_, NetError>(head);
                }
                tracing::debug!(status = head.status.as_u16(), "skipping interim response");
            }
        })
        .await?;
        let ResponseHead { version, status, headers } = response_head;

        if status == StatusCode::NOT_MODIFIED {
            let entry = snapshot.ok_or_else(|| NetError::CacheInconsistency(url.to_string()))?;
            tracing::debug!(url = %url, bytes = entry.body.len(), "revalidated from cache");
            let reusable = keep_alive(version, &headers) && reader.buffer().is_empty();
            let response = HttpResponse::new(status, version, headers, entry.body.clone(), true);
            return Ok((response, reusable));
        }

        self.state = State::ReadBody;
        let framing = BodyFraming::for_response(status, &headers)?;
        let raw =
            with_deadline_at(deadline, NetError::ReadTimeout, read_body(&mut reader, framing))
                .await?;
        let body = decode_body(&headers, raw)?;

        self.cache.put(url, CacheEntry::from_response(&headers, body.clone()));

        let reusable = keep_alive(version, &headers)
            && framing.leaves_clean_boundary()
            && reader.buffer().is_empty();
        tracing::debug!(
            url = %url,
            status = status.as_u16(),
            bytes = body.len(),
            reusable,
            "response complete"
        );
        Ok((HttpResponse::new(status, version, headers, body, false), reusable))
    }
}

/// Render the request head: request line, built-in headers, validators from
/// the cache snapshot, then the caller's headers.
fn build_request_head(
    url: &Url,
    origin: &Origin,
    snapshot: Option<&CacheEntry>,
    headers: &OrderedHeaderMap,
) -> Vec<u8> {
    let mut target = url.path().to_string();
    if let Some(query) = url.query() {
        target.push('?');
        target.push_str(query);
    }

    let mut out = Vec::with_capacity(256);
    out.extend_from_slice(format!("GET {} HTTP/1.1\r\n", target).as_bytes());
    out.extend_from_slice(format!("Host: {}\r\n", origin.authority()).as_bytes());
    out.extend_from_slice(b"Connection: keep-alive\r\n");
    out.extend_from_slice(b"Accept-Encoding: gzip\r\n");

    if let Some(entry) = snapshot {
        for (name, value) in entry.conditional_headers() {
            out.extend_from_slice(format!("{}: {}\r\n", name, value).as_bytes());
        }
    }

    headers.write_to(&mut out, |name| {
        let builtin = BUILTIN_HEADERS.iter().any(|b| b.eq_ignore_ascii_case(name));
        if builtin {
            tracing::debug!(header = %name, "caller header overridden by built-in");
        }
        builtin
    });
    out.extend_from_slice(b"\r\n");
    out
}

/// Read one response head (status line through the empty line).
///
/// `started` flips to true as soon as any byte of the response arrives.
async fn read_head<R>(
    reader: &mut R,
    max_header_bytes: usize,
    started: &mut bool,
) -> Result<ResponseHead, NetError>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf: Vec<u8> = Vec::with_capacity(1024);
    let mut status_line_end = 0;

    loop {
        let start = buf.len();
        let remaining = max_header_bytes.saturating_sub(start) as u64;
        if remaining == 0 {
            return Err(NetError::ResponseHeadersTooBig);
        }
        let n = (&mut *reader).take(remaining).read_until(b'\n', &mut buf).await.exchange_context()?;
        if n > 0 {
            *started = true;
        }
        if !buf.ends_with(b"\n") || n == 0 {
            return Err(if buf.len() >= max_header_bytes {
                NetError::ResponseHeadersTooBig
            } else if buf.is_empty() {
                NetError::EmptyResponse
            } else {
                NetError::ResponseHeadersTruncated
            });
        }

        if start == 0 {
            status_line_end = buf.len();
            continue;
        }
        let line = &buf[start..];
        if line == b"\r\n" || line == b"\n" {
            break;
        }
    }

    let (version, status) = parse_status_line(&buf[..status_line_end])?;
    let headers = parse_header_block(&buf[status_line_end..])?;
    Ok(ResponseHead { version, status, headers })
}

/// Parse `HTTP/1.x SP 3DIGIT [SP reason]`.
fn parse_status_line(line: &[u8]) -> Result<(Version, StatusCode), NetError> {
    let text = String::from_utf8_lossy(line);
    let text = text.trim_end_matches(['\r', '\n']);
    let malformed = || NetError::MalformedStatusLine(text.to_string());

    let (proto, rest) = text.split_once(' ').ok_or_else(malformed)?;
    let minor = proto.strip_prefix("HTTP/1.").ok_or_else(malformed)?;
    let version = match minor {
        "0" => Version::HTTP_10,
        m if !m.is_empty() && m.bytes().all(|b| b.is_ascii_digit()) => Version::HTTP_11,
        _ => return Err(malformed()),
    };

    let code = rest.split_once(' ').map_or(rest, |(code, _reason)| code);
    if code.len() != 3 || !code.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed());
    }
    let status = StatusCode::from_bytes(code.as_bytes()).map_err(|_| malformed())?;
    Ok((version, status))
}

/// Parse the header lines (including the terminating empty line) with
/// httparse. Names are lower-cased and the last value for a name wins.
fn parse_header_block(block: &[u8]) -> Result<HeaderMap, NetError> {
    let line_count = block.iter().filter(|&&b| b == b'\n').count();
    let mut slots = vec![httparse::EMPTY_HEADER; line_count.max(1)];

    let parsed = match httparse::parse_headers(block, &mut slots) {
        Ok(httparse::Status::Complete((_, parsed))) => parsed,
        Ok(httparse::Status::Partial) => return Err(NetError::ResponseHeadersTruncated),
        Err(e) => {
            tracing::debug!(error = %e, "invalid response header block");
            return Err(NetError::InvalidResponse);
        }
    };

    let mut headers = HeaderMap::with_capacity(parsed.len());
    for header in parsed.iter() {
        let name =
            HeaderName::from_bytes(header.name.as_bytes()).map_err(|_| NetError::InvalidResponse)?;
        let value = HeaderValue::from_bytes(header.value).map_err(|_| NetError::InvalidResponse)?;
        headers.insert(name, value);
    }
    Ok(headers)
}

/// Whether the server allows another request on this connection.
fn keep_alive(version: Version, headers: &HeaderMap) -> bool {
    let connection = headers
        .get(CONNECTION)
        .map(|v| String::from_utf8_lossy(v.as_bytes()).to_ascii_lowercase())
        .unwrap_or_default();
    if connection.contains("close") {
        return false;
    }
    version != Version::HTTP_10 || connection.contains("keep-alive")
}
