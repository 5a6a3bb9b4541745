use std::net::SocketAddr;

use sip_core::types::uri::SipUri;
use tokio::sync::mpsc;

use crate::error::{Error, Result};
use crate::transport::udp::UdpTransport;
use crate::transport::{Transport, TransportEvent, TransportKind};

#[cfg(feature = "tls")]
use crate::transport::tls::TlsTransport;
use crate::transport::tcp::TcpTransport;
#[cfg(feature = "tls")]
use std::sync::Arc;
#[cfg(feature = "tls")]
use tokio_rustls::rustls::ClientConfig;

/// Resolves a SIP URI's `transport=` parameter (defaulting per §4.4 to
/// UDP for `sip:`, TLS for `sips:`) to the [`TransportKind`] that should
/// be used to reach it, and opens the concrete transport on demand.
///
/// The manager owns the pool; this just knows how to manufacture one
/// more entry for it.
pub struct TransportFactory {
    #[cfg(feature = "tls")]
    tls_client_config: Option<Arc<ClientConfig>>,
}

impl TransportFactory {
    pub fn new() -> Self {
        TransportFactory {
            #[cfg(feature = "tls")]
            tls_client_config: None,
        }
    }

    #[cfg(feature = "tls")]
    pub fn with_tls_client_config(mut self, config: Arc<ClientConfig>) -> Self {
        self.tls_client_config = Some(config);
        self
    }

    /// The transport kind a URI resolves to absent an explicit
    /// `transport=` parameter: `sips:` implies TLS, otherwise UDP is the
    /// default per RFC 3261 §18.1.
    pub fn resolve_kind(uri: &SipUri) -> TransportKind {
        match uri.transport_param.as_deref() {
            Some(t) if t.eq_ignore_ascii_case("tcp") => TransportKind::Tcp,
            Some(t) if t.eq_ignore_ascii_case("tls") => TransportKind::Tls,
            Some(t) if t.eq_ignore_ascii_case("udp") => TransportKind::Udp,
            _ if uri.secure => TransportKind::Tls,
            _ => TransportKind::Udp,
        }
    }

    /// Opens a fresh outbound transport of `kind` to `addr`. UDP binds
    /// an ephemeral local socket since it has no connection to dial; TCP
    /// and TLS actually connect.
    pub async fn connect(&self, kind: TransportKind, addr: SocketAddr, server_name: Option<&str>) -> Result<(Box<dyn Transport>, mpsc::Receiver<TransportEvent>)> {
        match kind {
            TransportKind::Udp => {
                let bind_addr: SocketAddr = if addr.is_ipv4() { "0.0.0.0:0".parse().unwrap() } else { "[::]:0".parse().unwrap() };
                let (transport, rx) = UdpTransport::bind(bind_addr, None).await?;
                Ok((Box::new(transport), rx))
            }
            TransportKind::Tcp => {
                let (transport, rx) = TcpTransport::connect(addr, None).await?;
                Ok((Box::new(transport), rx))
            }
            #[cfg(feature = "tls")]
            TransportKind::Tls => {
                let config = self
                    .tls_client_config
                    .clone()
                    .ok_or_else(|| Error::Unsupported("no TLS client config configured".into()))?;
                let owned_name = addr.ip().to_string();
                let name = server_name.unwrap_or(&owned_name);
                let (transport, rx) = TlsTransport::connect(addr, name, config, None).await?;
                Ok((Box::new(transport), rx))
            }
            #[cfg(not(feature = "tls"))]
            TransportKind::Tls => Err(Error::Unsupported("tls feature not enabled".into())),
        }
    }
}

impl Default for TransportFactory {
    fn default() -> Self {
        Self::new()
    }
}
