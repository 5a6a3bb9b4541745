use std::fmt;
use std::str::FromStr;

use crate::error::Error;
use crate::types::param::ParamList;

/// The transport named in a Via's `sent-protocol` (RFC 3261 §20.42). Kept
/// separate from [`crate::types::uri::Scheme`]: a Via's protocol is
/// `SIP/2.0/<transport>`, not a URI scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ViaTransport {
    Udp,
    Tcp,
    Tls,
    Sctp,
    Ws,
    Wss,
}

impl ViaTransport {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViaTransport::Udp => "UDP",
            ViaTransport::Tcp => "TCP",
            ViaTransport::Tls => "TLS",
            ViaTransport::Sctp => "SCTP",
            ViaTransport::Ws => "WS",
            ViaTransport::Wss => "WSS",
        }
    }

    /// Whether this transport is connection-oriented, i.e. shares the
    /// teacher's "stream-like" framing path rather than datagram framing.
    pub fn is_reliable(&self) -> bool {
        !matches!(self, ViaTransport::Udp)
    }
}

impl fmt::Display for ViaTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ViaTransport {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_uppercase().as_str() {
            "UDP" => ViaTransport::Udp,
            "TCP" => ViaTransport::Tcp,
            "TLS" => ViaTransport::Tls,
            "SCTP" => ViaTransport::Sctp,
            "WS" => ViaTransport::Ws,
            "WSS" => ViaTransport::Wss,
            other => return Err(Error::syntax(crate::error::SyntaxKind::Header, format!("unknown Via transport {other}"))),
        })
    }
}

/// A single Via header field value (RFC 3261 §20.42): one hop of the
/// request's path, used in reverse to route responses back.
///
/// `branch` is required by this core even though the grammar allows its
/// absence, because every transaction match (§17) keys off it; a Via
/// parsed without one is rejected as `MissingRequired` rather than
/// silently accepted.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Via {
    pub transport: ViaTransport,
    pub host: String,
    /// 0 means "not present on the wire"; callers fall back to the
    /// transport's default port.
    pub port: u16,
    pub params: ParamList,
}

impl Via {
    pub fn new(transport: ViaTransport, host: impl Into<String>, branch: impl Into<String>) -> Self {
        let mut params = ParamList::new();
        params.set("branch", branch);
        Via { transport, host: host.into(), port: 0, params }
    }

    pub fn branch(&self) -> Option<&str> {
        self.params.get("branch")
    }

    /// True when the branch starts with the magic cookie that marks an
    /// RFC 3261-compliant branch ID, as opposed to an RFC 2543 legacy one.
    pub fn has_rfc3261_branch(&self) -> bool {
        self.branch().map(|b| b.starts_with("z9hG4bK")).unwrap_or(false)
    }

    pub fn received(&self) -> Option<&str> {
        self.params.get("received")
    }

    pub fn set_received(&mut self, addr: impl Into<String>) {
        self.params.set("received", addr);
    }

    pub fn rport(&self) -> Option<u16> {
        self.params.get("rport").and_then(|v| v.parse().ok())
    }

    pub fn set_rport(&mut self, port: u16) {
        self.params.set("rport", port.to_string());
    }

    pub fn has_rport_flag(&self) -> bool {
        self.params.has("rport")
    }
}

impl fmt::Display for Via {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SIP/2.0/{} {}", self.transport, self.host)?;
        if self.port != 0 {
            write!(f, ":{}", self.port)?;
        }
        write!(f, "{}", self.params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rfc3261_branch_is_detected() {
        let via = Via::new(ViaTransport::Udp, "192.0.2.1", "z9hG4bK776asdhds");
        assert!(via.has_rfc3261_branch());
    }

    #[test]
    fn legacy_branch_is_not_rfc3261() {
        let via = Via::new(ViaTransport::Udp, "192.0.2.1", "a1b2c3");
        assert!(!via.has_rfc3261_branch());
    }
}
