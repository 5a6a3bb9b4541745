use std::fmt;

use crate::types::param::{Param, ParamList};

/// A `WWW-Authenticate`/`Proxy-Authenticate` challenge (RFC 3261 §22.1,
/// RFC 2617 §3.2.1). `scheme` is almost always `"Digest"`; unrecognized
/// schemes still round-trip since the params are kept as a plain list.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Challenge {
    pub scheme: String,
    pub params: ParamList,
}

impl Challenge {
    pub fn realm(&self) -> Option<&str> {
        self.params.get("realm")
    }

    pub fn nonce(&self) -> Option<&str> {
        self.params.get("nonce")
    }

    pub fn opaque(&self) -> Option<&str> {
        self.params.get("opaque")
    }

    pub fn algorithm(&self) -> Option<&str> {
        self.params.get("algorithm")
    }

    pub fn qop(&self) -> Option<&str> {
        self.params.get("qop")
    }
}

impl fmt::Display for Challenge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ", self.scheme)?;
        for (i, p) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{p}")?;
        }
        Ok(())
    }
}

/// `Authorization`/`Proxy-Authorization` credentials (RFC 3261 §22.2,
/// RFC 2617 §3.2.2), built in response to a [`Challenge`].
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Credentials {
    pub scheme: String,
    pub params: ParamList,
}

impl Credentials {
    /// Assembles a `Digest` credentials set. `qop_nc_cnonce` is `None`
    /// for the RFC 2069 two-argument digest (no `qop` on the challenge).
    pub fn digest(
        username: &str,
        realm: &str,
        nonce: &str,
        uri: &str,
        response: &str,
        algorithm: Option<&str>,
        opaque: Option<&str>,
        qop_nc_cnonce: Option<(&str, u32, &str)>,
    ) -> Self {
        let mut params = ParamList::new();
        params.push(Param::with_quoted_value("username", username));
        params.push(Param::with_quoted_value("realm", realm));
        params.push(Param::with_quoted_value("nonce", nonce));
        params.push(Param::with_quoted_value("uri", uri));
        params.push(Param::with_quoted_value("response", response));
        if let Some(algorithm) = algorithm {
            params.push(Param::with_value("algorithm", algorithm));
        }
        if let Some((qop, nc, cnonce)) = qop_nc_cnonce {
            params.push(Param::with_value("qop", qop));
            params.push(Param::with_value("nc", format!("{nc:08x}")));
            params.push(Param::with_quoted_value("cnonce", cnonce));
        }
        if let Some(opaque) = opaque {
            params.push(Param::with_quoted_value("opaque", opaque));
        }
        Credentials { scheme: "Digest".to_string(), params }
    }

    pub fn username(&self) -> Option<&str> {
        self.params.get("username")
    }

    pub fn realm(&self) -> Option<&str> {
        self.params.get("realm")
    }
}

impl fmt::Display for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ", self.scheme)?;
        for (i, p) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{p}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn challenge_exposes_its_digest_fields() {
        let mut params = ParamList::new();
        params.push(Param::with_quoted_value("realm", "atlanta.com"));
        params.push(Param::with_quoted_value("nonce", "84a4cc6f3082121f32b42a2187831a9e"));
        params.push(Param::with_value("algorithm", "MD5"));
        let challenge = Challenge { scheme: "Digest".to_string(), params };
        assert_eq!(challenge.realm(), Some("atlanta.com"));
        assert_eq!(challenge.nonce(), Some("84a4cc6f3082121f32b42a2187831a9e"));
        assert_eq!(challenge.algorithm(), Some("MD5"));
        assert_eq!(challenge.qop(), None);
    }

    #[test]
    fn digest_credentials_print_as_a_single_digest_line() {
        let creds = Credentials::digest(
            "alice",
            "atlanta.com",
            "84a4cc6f3082121f32b42a2187831a9e",
            "sip:bob@biloxi.com",
            "6629fae49393a05397450978507c4ef1",
            Some("MD5"),
            None,
            None,
        );
        let printed = creds.to_string();
        assert!(printed.starts_with("Digest "));
        assert!(printed.contains(r#"username="alice""#));
        assert!(printed.contains(r#"response="6629fae49393a05397450978507c4ef1""#));
    }
}
