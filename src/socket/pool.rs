use crate::base::neterror::NetError;
use crate::socket::client::{SocketType, StreamSocket};
use crate::socket::connectjob::ConnectJob;
use crate::socket::tls::TlsConfig;
use crate::urlrequest::context::URLRequestContextConfig;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use url::Url;

/// Identifies a connection group (scheme, host, port).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Origin {
    scheme: String,
    host: String,
    port: u16,
}

impl Origin {
    pub fn new(scheme: &str, host: &str, port: u16) -> Self {
        Origin { scheme: scheme.to_ascii_lowercase(), host: host.to_ascii_lowercase(), port }
    }

    /// Derive the origin of an http(s) URL, filling in the scheme's default
    /// port.
    pub fn from_url(url: &Url) -> Result<Self, NetError> {
        match url.scheme() {
            "http" | "https" => {}
            _ => return Err(NetError::UnknownUrlScheme),
        }
        let host = url.host_str().filter(|h| !h.is_empty()).ok_or(NetError::InvalidUrl)?;
        let port = url.port_or_known_default().ok_or(NetError::InvalidUrl)?;
        Ok(Origin::new(url.scheme(), host, port))
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Host as it appears in a URL (IPv6 literals keep their brackets).
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Host without IPv6 brackets, for DNS and TLS.
    pub fn bare_host(&self) -> &str {
        self.host.trim_start_matches('[').trim_end_matches(']')
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn is_secure(&self) -> bool {
        self.scheme == "https"
    }

    pub fn is_default_port(&self) -> bool {
        matches!((self.scheme.as_str(), self.port), ("http", 80) | ("https", 443))
    }

    /// Value for the `Host` request header.
    pub fn authority(&self) -> String {
        if self.is_default_port() {
            self.host.clone()
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}:{}", self.scheme, self.host, self.port)
    }
}

/// A transport connection checked out of (or headed back into) the pool.
#[derive(Debug)]
pub struct PooledSocket {
    origin: Origin,
    socket: SocketType,
    reused: bool,
    created_at: Instant,
}

impl PooledSocket {
    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    /// True if this socket carried at least one earlier exchange.
    pub fn is_reused(&self) -> bool {
        self.reused
    }

    pub fn socket(&self) -> &SocketType {
        &self.socket
    }

    pub fn socket_mut(&mut self) -> &mut SocketType {
        &mut self.socket
    }

    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }
}

/// Idle socket with metadata for timeout tracking.
struct IdleSocket {
    socket: PooledSocket,
    /// When this socket was returned to the pool
    idle_since: Instant,
}

impl IdleSocket {
    fn is_expired(&self, now: Instant, timeout: Duration) -> bool {
        now.saturating_duration_since(self.idle_since) >= timeout
    }
}

/// Keeps idle keep-alive sockets per origin and dials new ones on a miss.
///
/// The idle map sits behind a single mutex that is only held to push or pop
/// a list entry; dialing, probing and closing all happen outside it.
pub struct ClientSocketPool {
    idle: Mutex<HashMap<Origin, Vec<IdleSocket>>>,
    tls_config: TlsConfig,
    connect_timeout: Duration,
    idle_socket_timeout: Duration,
    max_idle_per_origin: usize,

    // Stats
    dials: AtomicUsize,
    reuses: AtomicUsize,
    discards: AtomicUsize,
}

impl fmt::Debug for ClientSocketPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientSocketPool")
            .field("connect_timeout", &self.connect_timeout)
            .field("idle_socket_timeout", &self.idle_socket_timeout)
            .field("max_idle_per_origin", &self.max_idle_per_origin)
            .field("idle", &self.idle_socket_count())
            .field("dials", &self.dial_count())
            .finish()
    }
}

impl Default for ClientSocketPool {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientSocketPool {
    pub fn new() -> Self {
        Self::from_config(&URLRequestContextConfig::default())
    }

    pub fn from_config(config: &URLRequestContextConfig) -> Self {
        Self {
            idle: Mutex::new(HashMap::new()),
            tls_config: TlsConfig::default(),
            connect_timeout: config.connect_timeout,
            idle_socket_timeout: config.idle_socket_timeout,
            max_idle_per_origin: config.max_idle_per_origin,
            dials: AtomicUsize::new(0),
            reuses: AtomicUsize::new(0),
            discards: AtomicUsize::new(0),
        }
    }

    /// Replace the TLS configuration used for new `https` dials.
    pub fn with_tls_config(mut self, tls_config: TlsConfig) -> Self {
        self.tls_config = tls_config;
        self
    }

    fn lock_idle(&self) -> MutexGuard<'_, HashMap<Origin, Vec<IdleSocket>>> {
        self.idle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Check out a socket for `origin`: the most recently released usable
    /// idle socket, or a freshly dialed one.
    pub async fn acquire(&self, origin: &Origin) -> Result<PooledSocket, NetError> {
        if let Some(socket) = self.take_idle(origin) {
            self.reuses.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(origin = %origin, age = ?socket.age(), "reusing idle socket");
            return Ok(socket);
        }
        self.connect(origin).await
    }

    /// Dial a new socket, bypassing the idle list.
    pub async fn connect(&self, origin: &Origin) -> Result<PooledSocket, NetError> {
        self.dials.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(origin = %origin, "dialing new connection");
        let socket = ConnectJob::connect(origin, &self.tls_config, self.connect_timeout).await?;
        Ok(PooledSocket { origin: origin.clone(), socket, reused: false, created_at: Instant::now() })
    }

    fn pop_idle(&self, origin: &Origin) -> Option<IdleSocket> {
        let mut idle = self.lock_idle();
        let list = idle.get_mut(origin)?;
        let entry = list.pop();
        if list.is_empty() {
            idle.remove(origin);
        }
        entry
    }

    fn take_idle(&self, origin: &Origin) -> Option<PooledSocket> {
        while let Some(entry) = self.pop_idle(origin) {
            if entry.is_expired(Instant::now(), self.idle_socket_timeout) {
                tracing::debug!(origin = %origin, "idle socket expired");
                self.discard(entry.socket);
                continue;
            }
            if !entry.socket.socket.is_connected_and_idle() {
                tracing::debug!(origin = %origin, "idle socket closed by peer");
                self.discard(entry.socket);
                continue;
            }
            let mut socket = entry.socket;
            socket.reused = true;
            return Some(socket);
        }
        None
    }

    /// Return a socket with a clean response boundary to its origin's idle
    /// list. When the list is full the oldest idle socket is closed.
    pub fn release(&self, socket: PooledSocket) {
        if self.max_idle_per_origin == 0 {
            self.discard(socket);
            return;
        }

        let origin = socket.origin.clone();
        let evicted = {
            let mut idle = self.lock_idle();
            let list = idle.entry(origin.clone()).or_default();
            let evicted = if list.len() >= self.max_idle_per_origin {
                Some(list.remove(0).socket)
            } else {
                None
            };
            list.push(IdleSocket { socket, idle_since: Instant::now() });
            evicted
        };

        tracing::debug!(origin = %origin, "socket released to pool");
        if let Some(socket) = evicted {
            self.discard(socket);
        }
    }

    /// Close a socket without returning it to the pool.
    pub fn discard(&self, socket: PooledSocket) {
        self.discards.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(origin = %socket.origin, reused = socket.reused, "discarding socket");
        drop(socket);
    }

    /// Number of new connections dialed (pool misses).
    pub fn dial_count(&self) -> usize {
        self.dials.load(Ordering::Relaxed)
    }

    /// Number of checkouts served from the idle list.
    pub fn reuse_count(&self) -> usize {
        self.reuses.load(Ordering::Relaxed)
    }

    pub fn discard_count(&self) -> usize {
        self.discards.load(Ordering::Relaxed)
    }

    /// Get total idle socket count across all origins.
    pub fn idle_socket_count(&self) -> usize {
        self.lock_idle().values().map(Vec::len).sum()
    }

    pub fn idle_count_for(&self, origin: &Origin) -> usize {
        self.lock_idle().get(origin).map_or(0, Vec::len)
    }

    /// Close idle sockets that have expired or that the peer has closed.
    pub fn cleanup_idle_sockets(&self) {
        let now = Instant::now();
        let mut candidates = Vec::new();
        {
            let mut idle = self.lock_idle();
            for list in idle.values_mut() {
                candidates.append(list);
            }
            idle.clear();
        }

        let mut keep = Vec::new();
        for entry in candidates {
            if entry.is_expired(now, self.idle_socket_timeout)
                || !entry.socket.socket.is_connected_and_idle()
            {
                self.discard(entry.socket);
            } else {
                keep.push(entry);
            }
        }

        let mut idle = self.lock_idle();
        for entry in keep {
            idle.entry(entry.socket.origin.clone()).or_default().push(entry);
        }
        for list in idle.values_mut() {
            list.sort_by_key(|e| e.idle_since);
        }
    }

    /// Start a background task that periodically prunes idle sockets.
    /// The task stops once the pool is dropped.
    pub fn start_cleanup_task(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let pool: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                match pool.upgrade() {
                    Some(pool) => pool.cleanup_idle_sockets(),
                    None => break,
                }
            }
        })
    }
}
