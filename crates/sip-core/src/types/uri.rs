use std::fmt;

/// The URI schemes this core natively understands. Anything else still
/// round-trips (scheme name is kept verbatim) but is treated as opaque.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Scheme {
    Sip,
    Sips,
    Tel,
    Other(String),
}

impl Scheme {
    pub fn as_str(&self) -> &str {
        match self {
            Scheme::Sip => "sip",
            Scheme::Sips => "sips",
            Scheme::Tel => "tel",
            Scheme::Other(s) => s.as_str(),
        }
    }

    /// Port 0 on a `SipUri` means "default for scheme": 5060 for `sip`,
    /// 5061 for `sips`.
    pub fn default_port(&self) -> u16 {
        match self {
            Scheme::Sip => 5060,
            Scheme::Sips => 5061,
            _ => 0,
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A `sip:`/`sips:` URI.
///
/// Five parameters get first-class fields because dialog and transaction
/// code reads them constantly (`transport` for transport selection,
/// `lr`/`maddr` for route-set handling, `ttl` for multicast, `method` for
/// the rarely-used `method=` URI parameter). Everything else the wire
/// carries — unrecognized `;name=value` pairs and the `?`-prefixed header
/// parameters — is kept as an opaque tail so re-printing never drops data
/// the parser didn't have a typed slot for.
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub struct SipUri {
    pub secure: bool,
    pub user: Option<String>,
    pub password: Option<String>,
    pub host: String,
    /// 0 means "use the scheme default".
    pub port: u16,
    pub user_param: Option<String>,
    pub method_param: Option<String>,
    pub transport_param: Option<String>,
    pub ttl_param: Option<u8>,
    pub maddr_param: Option<String>,
    pub lr_param: bool,
    /// Unrecognized `;name=value` params, each already including its
    /// leading `;`, concatenated in wire order.
    pub other_params: String,
    /// The `?`-prefixed header params tail, verbatim including the `?`.
    pub header_params: String,
}

impl SipUri {
    pub fn new(host: impl Into<String>) -> Self {
        SipUri { host: host.into(), ..Default::default() }
    }

    pub fn scheme(&self) -> Scheme {
        if self.secure { Scheme::Sips } else { Scheme::Sip }
    }

    /// The port to actually dial: the explicit port, or the scheme default
    /// when `port == 0`.
    pub fn effective_port(&self) -> u16 {
        if self.port != 0 { self.port } else { self.scheme().default_port() }
    }
}

impl fmt::Display for SipUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.scheme())?;
        if let Some(user) = &self.user {
            write!(f, "{}", user)?;
            if let Some(pw) = &self.password {
                write!(f, ":{}", pw)?;
            }
            write!(f, "@")?;
        }
        write!(f, "{}", self.host)?;
        if self.port != 0 {
            write!(f, ":{}", self.port)?;
        }
        if let Some(v) = &self.user_param {
            write!(f, ";user={}", v)?;
        }
        if let Some(v) = &self.method_param {
            write!(f, ";method={}", v)?;
        }
        if let Some(v) = &self.transport_param {
            write!(f, ";transport={}", v)?;
        }
        if let Some(v) = &self.ttl_param {
            write!(f, ";ttl={}", v)?;
        }
        if let Some(v) = &self.maddr_param {
            write!(f, ";maddr={}", v)?;
        }
        if self.lr_param {
            write!(f, ";lr")?;
        }
        f.write_str(&self.other_params)?;
        f.write_str(&self.header_params)?;
        Ok(())
    }
}

/// A `tel:` URI. The core treats the subscriber number and its parameters
/// as opaque — no SIP logic dereferences them.
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub struct TelUri {
    pub number: String,
    /// Parameters verbatim, each including its leading `;`.
    pub params: String,
}

impl fmt::Display for TelUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tel:{}{}", self.number, self.params)
    }
}

/// A tagged URI: `sip`/`sips`, `tel`, or a `name-addr` wrapping one of the
/// above with an optional display name.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Uri {
    Sip(SipUri),
    Tel(TelUri),
    NameAddr(NameAddr),
}

/// `[ display-name ] "<" addr-spec ">"` or a bare `addr-spec` (RFC 3261
/// §20, the `name-addr` / `addr-spec` production shared by From/To/Contact/
/// Route/Record-Route).
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct NameAddr {
    pub display_name: Option<String>,
    /// True if the addr-spec was wrapped in `<...>` on the wire. A bare
    /// addr-spec without angle brackets cannot carry header params, so
    /// this is also a correctness signal, not just cosmetic.
    pub angle_brackets: bool,
    pub uri: Box<Uri>,
}

impl NameAddr {
    pub fn new(uri: Uri) -> Self {
        NameAddr { display_name: None, angle_brackets: true, uri: Box::new(uri) }
    }
}

impl fmt::Display for NameAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = &self.display_name {
            if name.chars().all(|c| c.is_alphanumeric() || c == ' ' || c == '-' || c == '.') {
                write!(f, "{} ", name)?;
            } else {
                write!(f, "\"{}\" ", name.replace('\\', "\\\\").replace('"', "\\\""))?;
            }
        }
        if self.angle_brackets || self.display_name.is_some() {
            write!(f, "<{}>", self.uri)
        } else {
            write!(f, "{}", self.uri)
        }
    }
}

impl fmt::Display for Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Uri::Sip(u) => write!(f, "{}", u),
            Uri::Tel(u) => write!(f, "{}", u),
            Uri::NameAddr(n) => write!(f, "{}", n),
        }
    }
}

impl Uri {
    pub fn sip(host: impl Into<String>) -> Self {
        Uri::Sip(SipUri::new(host))
    }

    /// The innermost `sip`/`sips`/`tel` URI, unwrapping any `NameAddr`
    /// layer. Dialog/transaction code almost always wants this rather
    /// than the display-name wrapper.
    pub fn inner(&self) -> &Uri {
        match self {
            Uri::NameAddr(n) => n.uri.inner(),
            other => other,
        }
    }

    pub fn as_sip(&self) -> Option<&SipUri> {
        match self.inner() {
            Uri::Sip(u) => Some(u),
            _ => None,
        }
    }

    pub fn as_sip_mut(&mut self) -> Option<&mut SipUri> {
        match self {
            Uri::Sip(u) => Some(u),
            Uri::NameAddr(n) => n.uri.as_sip_mut(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sip_uri_round_trip_via_display() {
        let mut u = SipUri::new("example.com");
        u.user = Some("alice".to_string());
        u.transport_param = Some("tcp".to_string());
        assert_eq!(u.to_string(), "sip:alice@example.com;transport=tcp");
    }

    #[test]
    fn default_port_is_scheme_dependent() {
        let u = SipUri::new("example.com");
        assert_eq!(u.effective_port(), 5060);
        let mut s = u.clone();
        s.secure = true;
        assert_eq!(s.effective_port(), 5061);
    }
}
