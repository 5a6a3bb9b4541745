//! The dialog's credential list and per-realm auth-session cache (RFC
//! 3261 §3: "auth-session list, cred list"), and the digest computation
//! that turns a 401/407 challenge plus a matching credential into an
//! `Authorization`/`Proxy-Authorization` header (RFC 3261 §22.4).
use sip_core::types::auth::{Challenge, Credentials};
use sip_core::types::{Method, Uri};

/// A credential the application registered for a dialog. `realm: None`
/// matches any challenge that has no more specific entry, so a UAC that
/// only ever talks to one realm doesn't need to predict its name.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct DialogCredential {
    pub realm: Option<String>,
    pub username: String,
    pub password: String,
}

impl DialogCredential {
    pub fn new(realm: impl Into<String>, username: impl Into<String>, password: impl Into<String>) -> Self {
        DialogCredential { realm: Some(realm.into()), username: username.into(), password: password.into() }
    }

    pub fn for_any_realm(username: impl Into<String>, password: impl Into<String>) -> Self {
        DialogCredential { realm: None, username: username.into(), password: password.into() }
    }
}

/// What the dialog remembers about a realm after it has challenged once:
/// the nonce currently in play and the request count against it, so a
/// `qop=auth` retry's `nc` keeps advancing instead of restarting at 1
/// every time (RFC 3261 §22.3).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct AuthSession {
    pub realm: String,
    pub nonce: String,
    pub opaque: Option<String>,
    pub algorithm: Option<String>,
    pub qop: Option<String>,
    pub nonce_count: u32,
}

/// Builds the `Authorization`/`Proxy-Authorization` credentials for
/// `challenge` against `method`/`digest_uri`, consulting `credentials`
/// for a matching realm and updating `sessions`' tracked nonce. Returns
/// `None` if nothing in the credential list matches the challenge's
/// realm (the caller should then surface the 401/407 to the
/// application rather than retry blindly).
pub fn authorize(challenge: &Challenge, credentials: &[DialogCredential], sessions: &mut Vec<AuthSession>, method: &Method, digest_uri: &Uri) -> Option<Credentials> {
    let realm = challenge.realm()?;
    let credential = credentials
        .iter()
        .find(|c| c.realm.as_deref() == Some(realm))
        .or_else(|| credentials.iter().find(|c| c.realm.is_none()))?;

    let nonce = challenge.nonce()?.to_string();
    let session = match sessions.iter_mut().find(|s| s.realm == realm) {
        Some(session) => {
            if session.nonce != nonce {
                session.nonce = nonce;
                session.nonce_count = 0;
            }
            session.nonce_count += 1;
            session
        }
        None => {
            sessions.push(AuthSession {
                realm: realm.to_string(),
                nonce,
                opaque: challenge.opaque().map(str::to_string),
                algorithm: challenge.algorithm().map(str::to_string),
                qop: challenge.qop().map(str::to_string),
                nonce_count: 1,
            });
            sessions.last_mut().expect("just pushed")
        }
    };

    let uri_str = digest_uri.to_string();
    let ha1 = sip_core::digest::ha1(&credential.username, realm, &credential.password);
    let ha2 = sip_core::digest::ha2(method.as_str(), &uri_str);
    let cnonce = uuid::Uuid::new_v4().simple().to_string();
    let qop_nc_cnonce = session.qop.as_deref().map(|qop| (qop, session.nonce_count, cnonce.as_str()));
    let response = sip_core::digest::response(&ha1, &session.nonce, qop_nc_cnonce, &ha2);

    Some(Credentials::digest(&credential.username, realm, &session.nonce, &uri_str, &response, session.algorithm.as_deref(), session.opaque.as_deref(), qop_nc_cnonce))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sip_core::types::param::{Param, ParamList};

    fn challenge(realm: &str, nonce: &str, qop: Option<&str>) -> Challenge {
        let mut params = ParamList::new();
        params.push(Param::with_quoted_value("realm", realm));
        params.push(Param::with_quoted_value("nonce", nonce));
        if let Some(qop) = qop {
            params.push(Param::with_value("qop", qop));
        }
        Challenge { scheme: "Digest".to_string(), params }
    }

    #[test]
    fn no_matching_credential_yields_none() {
        let mut sessions = Vec::new();
        let result = authorize(&challenge("atlanta.com", "n1", None), &[], &mut sessions, &Method::Invite, &Uri::sip("bob@biloxi.com"));
        assert!(result.is_none());
    }

    #[test]
    fn matching_realm_produces_verifiable_credentials() {
        let creds = vec![DialogCredential::new("atlanta.com", "alice", "hunter2")];
        let mut sessions = Vec::new();
        let auth = authorize(&challenge("atlanta.com", "n1", None), &creds, &mut sessions, &Method::Invite, &Uri::sip("bob@biloxi.com")).unwrap();
        assert_eq!(auth.username(), Some("alice"));
        assert_eq!(auth.realm(), Some("atlanta.com"));
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].nonce_count, 1);
    }

    #[test]
    fn repeated_challenge_on_the_same_nonce_advances_nonce_count_with_qop() {
        let creds = vec![DialogCredential::new("atlanta.com", "alice", "hunter2")];
        let mut sessions = Vec::new();
        let challenge = challenge("atlanta.com", "n1", Some("auth"));
        authorize(&challenge, &creds, &mut sessions, &Method::Invite, &Uri::sip("bob@biloxi.com")).unwrap();
        authorize(&challenge, &creds, &mut sessions, &Method::Invite, &Uri::sip("bob@biloxi.com")).unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].nonce_count, 2);
    }

    #[test]
    fn wildcard_credential_matches_any_realm() {
        let creds = vec![DialogCredential::for_any_realm("alice", "hunter2")];
        let mut sessions = Vec::new();
        let auth = authorize(&challenge("wherever.com", "n1", None), &creds, &mut sessions, &Method::Invite, &Uri::sip("bob@biloxi.com"));
        assert!(auth.is_some());
    }
}
