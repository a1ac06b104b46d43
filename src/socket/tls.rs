use crate::base::neterror::NetError;
use boring::ssl::{SslConnector, SslConnectorBuilder, SslMethod, SslVerifyMode, SslVersion};

/// TLS client configuration for origin connections.
///
/// Only HTTP/1.1 is spoken on the wire, so ALPN never offers `h2`.
#[derive(Debug, Clone)]
pub struct TlsConfig {
    pub min_version: Option<SslVersion>,
    pub max_version: Option<SslVersion>,
    pub alpn_protos: Vec<String>,
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self {
            min_version: Some(SslVersion::TLS1_2),
            max_version: Some(SslVersion::TLS1_3),
            alpn_protos: vec!["http/1.1".to_string()],
        }
    }
}

impl TlsConfig {
    /// Apply this configuration to an SSL connector builder.
    pub fn apply_to_builder(&self, builder: &mut SslConnectorBuilder) -> Result<(), NetError> {
        if let Some(min) = self.min_version {
            builder.set_min_proto_version(Some(min)).map_err(|_| NetError::SslProtocolError)?;
        }
        if let Some(max) = self.max_version {
            builder.set_max_proto_version(Some(max)).map_err(|_| NetError::SslProtocolError)?;
        }

        let alpn_wire = self.alpn_wire()?;
        if !alpn_wire.is_empty() {
            builder.set_alpn_protos(&alpn_wire).map_err(|_| NetError::SslProtocolError)?;
        }

        // Certificate verification (use system verifier)
        builder.set_verify(SslVerifyMode::PEER);

        Ok(())
    }

    /// Build a connector with this configuration applied.
    pub fn connector(&self) -> Result<SslConnector, NetError> {
        let mut builder =
            SslConnector::builder(SslMethod::tls()).map_err(|_| NetError::SslProtocolError)?;
        self.apply_to_builder(&mut builder)?;
        Ok(builder.build())
    }

    /// ALPN protocol list in wire format (length-prefixed).
    pub fn alpn_wire(&self) -> Result<Vec<u8>, NetError> {
        let mut alpn_wire = Vec::new();
        for proto in &self.alpn_protos {
            if proto.is_empty() || proto.len() > 255 {
                return Err(NetError::SslProtocolError);
            }
            alpn_wire.push(proto.len() as u8);
            alpn_wire.extend_from_slice(proto.as_bytes());
        }
        Ok(alpn_wire)
    }

    /// Check if SNI (Server Name Indication) should be set for this host.
    /// Per RFC 6066, SNI MUST NOT be set for raw IP addresses.
    pub fn should_set_sni(host: &str) -> bool {
        let bare = host.trim_start_matches('[').trim_end_matches(']');
        bare.parse::<std::net::IpAddr>().is_err()
    }
}
