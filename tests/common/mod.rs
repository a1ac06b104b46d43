//! In-process HTTP/1.1 server for integration tests.
//!
//! Each accepted connection serves requests in a keep-alive loop until the
//! reply asks for a close or the client goes away.
#![allow(dead_code)]

use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::Write;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// One request as seen by the server.
#[derive(Debug, Clone)]
pub struct Request {
    /// Position in the server-wide request log.
    pub index: usize,
    /// Raw request head including the final empty line.
    pub head: String,
    pub path: String,
}

impl Request {
    fn parse(index: usize, head: String) -> Self {
        let path = head.split(' ').nth(1).unwrap_or_default().to_string();
        Self { index, head, path }
    }

    /// Value of the first header named `name` (case-insensitive).
    pub fn header(&self, name: &str) -> Option<String> {
        self.head.lines().skip(1).find_map(|line| {
            let (n, v) = line.split_once(':')?;
            n.trim().eq_ignore_ascii_case(name).then(|| v.trim().to_string())
        })
    }
}

/// What the server writes back for one request.
#[derive(Debug, Clone)]
pub struct Reply {
    pub bytes: Vec<u8>,
    pub close: bool,
    pub delay: Option<Duration>,
}

impl Reply {
    pub fn raw(bytes: impl Into<Vec<u8>>) -> Self {
        Self { bytes: bytes.into(), close: false, delay: None }
    }

    /// A response with a `Content-Length` computed from `body`.
    pub fn response(status: &str, headers: &[(&str, &str)], body: &[u8]) -> Self {
        let mut out = format!("HTTP/1.1 {}\r\n", status);
        for (name, value) in headers {
            out.push_str(&format!("{}: {}\r\n", name, value));
        }
        out.push_str(&format!("Content-Length: {}\r\n\r\n", body.len()));
        let mut bytes = out.into_bytes();
        bytes.extend_from_slice(body);
        Self::raw(bytes)
    }

    pub fn ok(body: &str) -> Self {
        Self::response("200 OK", &[], body.as_bytes())
    }

    pub fn redirect(status: &str, location: &str) -> Self {
        Self::response(status, &[("Location", location)], b"")
    }

    pub fn not_modified() -> Self {
        Self::raw("HTTP/1.1 304 Not Modified\r\n\r\n")
    }

    /// Close the connection without answering.
    pub fn hangup() -> Self {
        Self { bytes: Vec::new(), close: true, delay: None }
    }

    /// Close the connection after writing the reply.
    pub fn close(mut self) -> Self {
        self.close = true;
        self
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

type Handler = dyn Fn(&Request) -> Reply + Send + Sync + 'static;

pub struct MockServer {
    addr: SocketAddr,
    accepts: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<Request>>>,
}

impl MockServer {
    pub async fn start<F>(handler: F) -> Self
    where
        F: Fn(&Request) -> Reply + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handler: Arc<Handler> = Arc::new(handler);
        let accepts = Arc::new(AtomicUsize::new(0));
        let requests = Arc::new(Mutex::new(Vec::new()));

        let (accept_counter, log) = (accepts.clone(), requests.clone());
        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                accept_counter.fetch_add(1, Ordering::SeqCst);
                tokio::spawn(serve_connection(socket, handler.clone(), log.clone()));
            }
        });

        Self { addr, accepts, requests }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Connections accepted so far.
    pub fn accept_count(&self) -> usize {
        self.accepts.load(Ordering::SeqCst)
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }
}

async fn serve_connection(
    mut socket: TcpStream,
    handler: Arc<Handler>,
    requests: Arc<Mutex<Vec<Request>>>,
) {
    let mut buf = Vec::new();
    while let Some(head) = read_request_head(&mut socket, &mut buf).await {
        let request = {
            let mut log = requests.lock().unwrap();
            let request = Request::parse(log.len(), head);
            log.push(request.clone());
            request
        };

        let reply = handler(&request);
        if let Some(delay) = reply.delay {
            tokio::time::sleep(delay).await;
        }
        if socket.write_all(&reply.bytes).await.is_err() {
            return;
        }
        if reply.close {
            let _ = socket.shutdown().await;
            return;
        }
    }
}

async fn read_request_head(socket: &mut TcpStream, buf: &mut Vec<u8>) -> Option<String> {
    loop {
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            let head: Vec<u8> = buf.drain(..pos + 4).collect();
            return Some(String::from_utf8_lossy(&head).into_owned());
        }
        let mut chunk = [0u8; 4096];
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => return None,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }
}

pub fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// A port with nothing listening on it.
pub async fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}
