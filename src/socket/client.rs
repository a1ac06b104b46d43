use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;

/// Represents a connected socket (TCP or SSL).
/// Mimics net::StreamSocket.
pub trait StreamSocket: AsyncRead + AsyncWrite + Unpin + Send + Sync + fmt::Debug {
    /// Returns true if the socket is still connected.
    /// Note: This does a non-blocking check, not a full liveness probe.
    fn is_connected(&self) -> bool;

    /// Returns true if the socket is connected and has no pending data.
    /// Matches Chromium's IsConnectedAndIdle().
    fn is_connected_and_idle(&self) -> bool;
}

#[derive(Debug)]
pub enum SocketType {
    Tcp(TcpStream),
    Ssl(tokio_boring::SslStream<TcpStream>),
}

/// Outcome of a non-consuming peek on an idle socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Probe {
    /// Nothing to read, peer still there.
    Quiet,
    /// Bytes are waiting (for an idle HTTP/1.1 socket this is a protocol
    /// violation or a TLS close_notify).
    Pending,
    /// FIN or socket error.
    Closed,
}

impl SocketType {
    pub fn is_tls(&self) -> bool {
        matches!(self, SocketType::Ssl(_))
    }

    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.tcp().local_addr()
    }

    fn tcp(&self) -> &TcpStream {
        match self {
            SocketType::Tcp(s) => s,
            SocketType::Ssl(s) => s.get_ref(),
        }
    }

    /// Peek at the underlying TCP stream without consuming anything, so a
    /// socket that passes the probe can still carry a TLS record intact.
    fn probe(stream: &TcpStream) -> Probe {
        // peer_addr() returns Err if socket is disconnected
        if stream.peer_addr().is_err() {
            return Probe::Closed;
        }

        let mut cx = Context::from_waker(futures::task::noop_waker_ref());
        let mut storage = [0u8; 1];
        let mut buf = ReadBuf::new(&mut storage);
        match stream.poll_peek(&mut cx, &mut buf) {
            Poll::Ready(Ok(0)) => Probe::Closed, // EOF - connection closed
            Poll::Ready(Ok(_)) => Probe::Pending,
            Poll::Ready(Err(_)) => Probe::Closed,
            Poll::Pending => Probe::Quiet, // No data, but connected
        }
    }
}

impl AsyncRead for SocketType {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            SocketType::Tcp(s) => Pin::new(s).poll_read(cx, buf),
            SocketType::Ssl(s) => Pin::new(s).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for SocketType {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        match self.get_mut() {
            SocketType::Tcp(s) => Pin::new(s).poll_write(cx, buf),
            SocketType::Ssl(s) => Pin::new(s).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            SocketType::Tcp(s) => Pin::new(s).poll_flush(cx),
            SocketType::Ssl(s) => Pin::new(s).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            SocketType::Tcp(s) => Pin::new(s).poll_shutdown(cx),
            SocketType::Ssl(s) => Pin::new(s).poll_shutdown(cx),
        }
    }
}

impl StreamSocket for SocketType {
    fn is_connected(&self) -> bool {
        Self::probe(self.tcp()) != Probe::Closed
    }

    fn is_connected_and_idle(&self) -> bool {
        Self::probe(self.tcp()) == Probe::Quiet
    }
}
