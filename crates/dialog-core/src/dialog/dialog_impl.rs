//! The dialog itself: identity, tag/CSeq bookkeeping, and the state
//! transitions RFC 3261 §12 drives off INVITE responses and BYE.
use std::net::SocketAddr;
use std::time::SystemTime;

use tracing::debug;

use sip_core::types::headers::typed_header::TypedHeader;
use sip_core::types::route::RouteEntry;
use sip_core::types::{HeaderName, Method, Request, Response, StatusCode, Uri};

use crate::error::{DialogError, DialogResult};

use super::auth::{AuthSession, DialogCredential};
use super::id::DialogId;
use super::state::DialogState;

/// A SIP dialog (RFC 3261 §12): a peer-to-peer relationship between two
/// UAs that persists across a series of requests, identified by the
/// `(Call-ID, local tag, remote tag)` triple.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Dialog {
    pub id: DialogId,
    pub state: DialogState,
    pub call_id: String,
    pub local_uri: Uri,
    pub remote_uri: Uri,
    pub local_tag: Option<String>,
    pub remote_tag: Option<String>,
    pub local_cseq: u32,
    pub remote_cseq: u32,
    /// Where in-dialog requests go (the peer's most recent Contact),
    /// distinct from `remote_uri` which never changes after creation.
    pub remote_target: Uri,
    pub route_set: Vec<RouteEntry>,
    /// Whether the local UA sent the dialog-creating INVITE (true) or
    /// received it (false); determines which tag is local vs remote.
    pub is_initiator: bool,
    pub last_known_remote_addr: Option<SocketAddr>,
    pub last_successful_transaction_time: Option<SystemTime>,
    pub recovery_attempts: u32,
    pub recovery_reason: Option<String>,
    pub recovered_at: Option<SystemTime>,
    pub recovery_start_time: Option<SystemTime>,
    /// Credentials the application registered for this dialog, consulted
    /// by realm on a 401/407 (§3's "cred list").
    pub credentials: Vec<DialogCredential>,
    /// Per-realm nonce/nonce-count state built up as challenges are
    /// answered (§3's "auth-session list").
    pub auth_sessions: Vec<AuthSession>,
    /// Set once an outbound INVITE's 2xx ACK has been sent, so a
    /// retransmitted 2xx triggers a resend rather than a fresh ACK.
    pub pending_ack: Option<Request>,
}

impl Dialog {
    pub fn new(call_id: String, local_uri: Uri, remote_uri: Uri, local_tag: Option<String>, remote_tag: Option<String>, is_initiator: bool) -> Self {
        Dialog {
            id: DialogId::new(),
            state: DialogState::Initial,
            call_id,
            local_uri,
            remote_uri: remote_uri.clone(),
            local_tag,
            remote_tag,
            local_cseq: 0,
            remote_cseq: 0,
            remote_target: remote_uri,
            route_set: Vec::new(),
            is_initiator,
            last_known_remote_addr: None,
            last_successful_transaction_time: None,
            recovery_attempts: 0,
            recovery_reason: None,
            recovered_at: None,
            recovery_start_time: None,
            credentials: Vec::new(),
            auth_sessions: Vec::new(),
            pending_ack: None,
        }
    }

    pub fn new_early(call_id: String, local_uri: Uri, remote_uri: Uri, local_tag: Option<String>, remote_tag: Option<String>, is_initiator: bool) -> Self {
        let mut dialog = Self::new(call_id, local_uri, remote_uri, local_tag, remote_tag, is_initiator);
        dialog.state = DialogState::Early;
        dialog
    }

    /// The dialog table's key, once both tags are known (RFC 3261 §12.2:
    /// a dialog can't be matched against until then).
    pub fn dialog_id_tuple(&self) -> Option<(String, String, String)> {
        match (&self.local_tag, &self.remote_tag) {
            (Some(local), Some(remote)) => Some((self.call_id.clone(), local.clone(), remote.clone())),
            _ => None,
        }
    }

    /// Validates and records an in-dialog request's CSeq (RFC 3261
    /// §12.2.2): it must be strictly greater than the last one seen,
    /// except for the very first in-dialog request.
    pub fn update_remote_sequence(&mut self, request: &Request) -> DialogResult<()> {
        let cseq = request.cseq().ok_or_else(|| DialogError::protocol_error("request missing CSeq header"))?;
        if self.remote_cseq != 0 && cseq.seq <= self.remote_cseq {
            return Err(DialogError::protocol_error(format!("out-of-order CSeq: got {}, expected > {}", cseq.seq, self.remote_cseq)));
        }
        self.remote_cseq = cseq.seq;
        Ok(())
    }

    /// Builds the dialog-creating 2xx response's counterpart dialog: the
    /// UAC side (from an INVITE and the 2xx it got back) or the UAS side
    /// (mirrored when a UAS itself builds its own `Dialog` after sending
    /// the 2xx — the same extraction logic applies either way, `is_initiator`
    /// just swaps which tag/URI is "local").
    pub fn from_2xx_response(request: &Request, response: &Response, is_initiator: bool) -> Option<Self> {
        if !response.status.is_success() || request.method != Method::Invite {
            return None;
        }
        Self::from_dialog_creating_response(request, response, is_initiator, DialogState::Confirmed)
    }

    /// Builds an early dialog from a 1xx response carrying a To-tag
    /// (RFC 3261 §12.1.1); a bare 100 Trying never carries one and so
    /// never reaches here through a caller checking that first.
    pub fn from_provisional_response(request: &Request, response: &Response, is_initiator: bool) -> Option<Self> {
        if !response.status.is_provisional() || response.status == StatusCode::TRYING || request.method != Method::Invite {
            return None;
        }
        if response.to_header()?.tag().is_none() {
            return None;
        }
        Self::from_dialog_creating_response(request, response, is_initiator, DialogState::Early)
    }

    fn from_dialog_creating_response(request: &Request, response: &Response, is_initiator: bool, state: DialogState) -> Option<Self> {
        let call_id = response.call_id().or_else(|| request.call_id())?.to_string();
        let cseq_number = request.cseq()?.seq;
        let to = response.to_header()?;
        let from = response.from_header()?;

        let (local_tag, remote_tag, local_uri, remote_uri) = if is_initiator {
            (from.tag().map(str::to_string), to.tag().map(str::to_string), from.uri.clone(), to.uri.clone())
        } else {
            (to.tag().map(str::to_string), from.tag().map(str::to_string), to.uri.clone(), from.uri.clone())
        };

        let remote_target = extract_contact_uri(response)?;
        let route_set = extract_route_set(response, is_initiator);

        Some(Dialog {
            id: DialogId::new(),
            state,
            call_id,
            local_uri,
            remote_uri,
            local_tag,
            remote_tag,
            local_cseq: if is_initiator { cseq_number } else { 0 },
            remote_cseq: if is_initiator { 0 } else { cseq_number },
            remote_target,
            route_set,
            is_initiator,
            last_known_remote_addr: None,
            last_successful_transaction_time: None,
            recovery_attempts: 0,
            recovery_reason: None,
            recovered_at: None,
            recovery_start_time: None,
            credentials: Vec::new(),
            auth_sessions: Vec::new(),
            pending_ack: None,
        })
    }

    /// Promotes an early dialog to confirmed on a 2xx (RFC 3261 §13.2.2.4),
    /// picking up whatever the final response changed versus the
    /// provisional one (To-tag, if it wasn't already set; Contact).
    pub fn update_from_2xx(&mut self, response: &Response) -> bool {
        if self.state != DialogState::Early {
            return false;
        }
        self.state = DialogState::Confirmed;
        if self.remote_tag.is_none() {
            if let Some(tag) = response.to_header().and_then(|t| t.tag()) {
                self.remote_tag = Some(tag.to_string());
            }
        }
        if let Some(uri) = extract_contact_uri(response) {
            self.remote_target = uri;
        }
        true
    }

    /// Registers a credential for this dialog to answer future 401/407s
    /// with (§3's "cred list").
    pub fn add_credential(&mut self, credential: DialogCredential) {
        self.credentials.push(credential);
    }

    /// Builds the `Authorization`/`Proxy-Authorization` header to retry
    /// `method` against `digest_uri` with, from whichever challenge
    /// `response` carries (RFC 3261 §22.4). `None` if the response isn't
    /// a 401/407, or no credential in the list matches its realm.
    pub fn authorize_challenge(&mut self, response: &Response, method: &Method, digest_uri: &Uri) -> Option<TypedHeader> {
        if let Some(challenge) = response.www_authenticate() {
            if let Some(creds) = super::auth::authorize(challenge, &self.credentials, &mut self.auth_sessions, method, digest_uri) {
                return Some(TypedHeader::Authorization(creds));
            }
        }
        if let Some(challenge) = response.proxy_authenticate() {
            if let Some(creds) = super::auth::authorize(challenge, &self.credentials, &mut self.auth_sessions, method, digest_uri) {
                return Some(TypedHeader::ProxyAuthorization(creds));
            }
        }
        None
    }

    pub fn terminate(&mut self) {
        self.state = DialogState::Terminated;
    }

    pub fn is_terminated(&self) -> bool {
        self.state.is_terminated()
    }

    pub fn update_remote_address(&mut self, remote_addr: SocketAddr) {
        self.last_known_remote_addr = Some(remote_addr);
        self.last_successful_transaction_time = Some(SystemTime::now());
    }

    pub fn set_remote_tag(&mut self, tag: String) {
        debug!(dialog_id = %self.id, %tag, "setting remote tag");
        self.remote_tag = Some(tag);
    }

    pub fn enter_recovery_mode(&mut self, reason: impl Into<String>) {
        if self.state != DialogState::Terminated {
            self.recovery_attempts += 1;
            self.state = DialogState::Recovering;
            self.recovery_reason = Some(reason.into());
            self.recovery_start_time = Some(SystemTime::now());
        }
    }

    pub fn is_recovering(&self) -> bool {
        self.state == DialogState::Recovering
    }

    pub fn complete_recovery(&mut self) -> bool {
        if self.state != DialogState::Recovering {
            return false;
        }
        self.state = DialogState::Confirmed;
        self.recovery_reason = None;
        self.recovered_at = Some(SystemTime::now());
        self.recovery_start_time = None;
        true
    }

    pub fn increment_local_cseq(&mut self) -> u32 {
        self.local_cseq += 1;
        self.local_cseq
    }

    /// Builds the next in-dialog request (RFC 3261 §12.2.1.1): Request-URI
    /// from the remote target, From/To from the dialog's local/remote
    /// tags, the dialog's route-set, and an incremented CSeq (ACK reuses
    /// the INVITE's CSeq number instead, per §13.2.2.4, so the caller
    /// supplies it for that one case rather than this method guessing).
    pub fn build_request(&mut self, method: Method) -> Request {
        use sip_core::builder::RequestBuilder;
        use sip_core::types::route::Route;

        let cseq = if method == Method::Ack { self.local_cseq } else { self.increment_local_cseq() };

        let mut to = sip_core::types::to::To::new(self.remote_uri.clone());
        if let Some(remote_tag) = &self.remote_tag {
            to.set_tag(remote_tag.clone());
        }

        let mut builder = RequestBuilder::new(method, self.remote_target.clone())
            .from(self.local_uri.clone(), self.local_tag.clone().unwrap_or_default())
            .header(TypedHeader::To(to))
            .call_id(self.call_id.clone())
            .cseq(cseq);

        if !self.route_set.is_empty() {
            builder = builder.header(TypedHeader::Route(Route(self.route_set.clone())));
        }

        builder.build()
    }
}

fn extract_contact_uri(response: &Response) -> Option<Uri> {
    match response.header(&HeaderName::Contact)? {
        TypedHeader::Contact(sip_core::types::contact::Contact::Bindings(bindings)) => bindings.first().map(|b| b.uri.clone()),
        _ => None,
    }
}

/// Extracts the dialog's initial route-set from Record-Route (RFC 3261
/// §12.1.1/§12.1.2): reversed for the UAC (who sees the proxies closest
/// to the UAS first), kept in order for the UAS.
fn extract_route_set(response: &Response, is_initiator: bool) -> Vec<RouteEntry> {
    let routes: Vec<RouteEntry> = response
        .headers
        .iter()
        .filter_map(|h| match h {
            TypedHeader::RecordRoute(rr) => Some(rr.0.clone()),
            _ => None,
        })
        .flatten()
        .collect();

    if is_initiator {
        routes.into_iter().rev().collect()
    } else {
        routes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uri(user: &str) -> Uri {
        Uri::sip(format!("{user}@example.com"))
    }

    #[test]
    fn new_dialog_starts_initial() {
        let dialog = Dialog::new("call1".to_string(), uri("alice"), uri("bob"), Some("tag1".to_string()), Some("tag2".to_string()), true);
        assert_eq!(dialog.state, DialogState::Initial);
        assert!(dialog.is_initiator);
    }

    #[test]
    fn dialog_id_tuple_requires_both_tags() {
        let mut dialog = Dialog::new("call1".to_string(), uri("alice"), uri("bob"), Some("tag1".to_string()), None, true);
        assert!(dialog.dialog_id_tuple().is_none());
        dialog.set_remote_tag("tag2".to_string());
        assert_eq!(dialog.dialog_id_tuple(), Some(("call1".to_string(), "tag1".to_string(), "tag2".to_string())));
    }

    #[test]
    fn terminate_sets_terminated_state() {
        let mut dialog = Dialog::new("call1".to_string(), uri("alice"), uri("bob"), Some("tag1".to_string()), Some("tag2".to_string()), true);
        assert!(!dialog.is_terminated());
        dialog.terminate();
        assert!(dialog.is_terminated());
    }

    #[test]
    fn update_remote_sequence_rejects_non_increasing_cseq() {
        use sip_core::builder::RequestBuilder;

        let mut dialog = Dialog::new("call1".to_string(), uri("alice"), uri("bob"), Some("tag1".to_string()), Some("tag2".to_string()), true);
        let first = RequestBuilder::new(Method::Bye, uri("bob")).from(uri("alice"), "tag1").to(uri("bob")).call_id("call1").cseq(5).build();
        assert!(dialog.update_remote_sequence(&first).is_ok());
        assert_eq!(dialog.remote_cseq, 5);

        let replay = RequestBuilder::new(Method::Bye, uri("bob")).from(uri("alice"), "tag1").to(uri("bob")).call_id("call1").cseq(5).build();
        assert!(dialog.update_remote_sequence(&replay).is_err());
    }
}
