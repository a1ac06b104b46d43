use crate::base::context::{with_deadline, IoResultExt};
use crate::base::neterror::NetError;
use crate::socket::client::SocketType;
use crate::socket::pool::Origin;
use crate::socket::tls::TlsConfig;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpStream;

/// Manages the connection process: DNS -> TCP -> SSL.
/// Roughly equivalent to net::ConnectJob.
pub struct ConnectJob;

impl ConnectJob {
    /// Dial `origin`, bounding the whole DNS + TCP + TLS sequence by
    /// `connect_timeout`.
    pub async fn connect(
        origin: &Origin,
        tls_config: &TlsConfig,
        connect_timeout: Duration,
    ) -> Result<SocketType, NetError> {
        with_deadline(
            connect_timeout,
            NetError::ConnectionTimedOut,
            Self::connect_inner(origin, tls_config),
        )
        .await
        .inspect_err(|e| {
            tracing::debug!(origin = %origin, error = %e, "connect failed");
        })
    }

    async fn connect_inner(origin: &Origin, tls_config: &TlsConfig) -> Result<SocketType, NetError> {
        let host = origin.bare_host();
        let port = origin.port();

        // 1. DNS Resolution
        let addrs: Vec<SocketAddr> =
            tokio::net::lookup_host((host, port)).await.dns_context(host)?.collect();
        if addrs.is_empty() {
            return Err(NetError::NameNotResolvedFor {
                domain: host.to_string(),
                reason: "no addresses".to_string(),
            });
        }
        tracing::debug!(host = %host, count = addrs.len(), "resolved origin");

        // 2. TCP Connect
        let stream = connect_first(&addrs).await.connection_context(host, port)?;
        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!(host = %host, error = %e, "failed to set TCP_NODELAY");
        }

        // 3. SSL Handshake (if https)
        if !origin.is_secure() {
            return Ok(SocketType::Tcp(stream));
        }

        let connector = tls_config.connector()?;
        let mut config = connector.configure().map_err(|_| NetError::SslProtocolError)?;
        config.set_use_server_name_indication(TlsConfig::should_set_sni(host));

        let tls_stream = tokio_boring::connect(config, host, stream).await.map_err(|e| {
            tracing::debug!(host = %host, error = ?e, "SSL handshake failed");
            NetError::SslProtocolError
        })?;

        Ok(SocketType::Ssl(tls_stream))
    }
}

/// Try each address in turn. The first that answers wins, otherwise the last
/// error is returned.
async fn connect_first(addrs: &[SocketAddr]) -> io::Result<TcpStream> {
    let mut last_err = io::Error::new(io::ErrorKind::AddrNotAvailable, "no addresses");
    for addr in addrs {
        match TcpStream::connect(addr).await {
            Ok(stream) => return Ok(stream),
            Err(e) => {
                tracing::debug!(addr = %addr, error = %e, "tcp connect failed");
                last_err = e;
            }
        }
    }
    Err(last_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_refused_dial_names_host_and_port() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let origin = Origin::new("http", "127.0.0.1", port);
        let err = ConnectJob::connect(&origin, &TlsConfig::default(), Duration::from_secs(5))
            .await
            .unwrap_err();
        match err {
            NetError::ConnectionFailedTo { host, port: p, .. } => {
                assert_eq!(host, "127.0.0.1");
                assert_eq!(p, port);
            }
            other => panic!("Expected ConnectionFailedTo, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_plain_origin_dials_tcp() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let origin = Origin::new("http", "127.0.0.1", port);
        let socket = ConnectJob::connect(&origin, &TlsConfig::default(), Duration::from_secs(5))
            .await
            .unwrap();
        assert!(matches!(socket, SocketType::Tcp(_)));
    }
}
