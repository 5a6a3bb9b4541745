//! The dialog table: matches messages to dialogs by the RFC 3261 §12.2
//! `(Call-ID, local tag, remote tag)` triple, drives dialog creation off
//! transaction-layer events, and sends in-dialog requests built from a
//! dialog's own state.
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use sip_core::types::contact::{Contact, ContactBinding};
use sip_core::types::content_length::ContentLength;
use sip_core::types::retry_after::RetryAfter;
use sip_core::types::uri::Uri;
use sip_core::types::via::{Via, ViaTransport};
use sip_core::types::{HeaderName, Method, Request, Response, StatusCode, TypedHeader};
use sip_transport::TransportKind;
use transaction_core::transaction::timers::T1;
use transaction_core::{TransactionEvent, TransactionKey, TransactionManager};

use crate::dialog::{Dialog, DialogId, DialogState};
use crate::error::{DialogError, DialogResult};
use crate::events::DialogEvent;

/// `(Call-ID, local tag, remote tag)`, RFC 3261 §12.2's dialog identity.
type DialogKey = (String, String, String);

/// An outbound INVITE the manager is waiting to hear back about, so it
/// can turn the eventual response into a [`Dialog`], retransmit its 2xx
/// ACK, or send a CANCEL for it.
struct PendingInvite {
    dialog_id: DialogId,
    request: Request,
    destination: SocketAddr,
    transport_kind: TransportKind,
}

pub struct DialogManager {
    transactions: Arc<TransactionManager>,
    local_uri: Uri,
    local_via_host: String,
    dialogs: DashMap<DialogId, Dialog>,
    lookup: DashMap<DialogKey, DialogId>,
    pending_invites: DashMap<TransactionKey, PendingInvite>,
    /// In-dialog INVITEs (re-INVITEs) currently awaiting a final
    /// response, so a second one racing the first can be refused
    /// outright instead of the two glaring against each other (RFC 3261
    /// §14.2).
    reinvites_in_progress: DashMap<DialogId, ()>,
    events_tx: mpsc::Sender<DialogEvent>,
}

impl DialogManager {
    /// `local_uri` is this UA's own AOR, used as the `From`/`To` identity
    /// when building new dialog-creating requests. `local_via_host` is
    /// the host:port this UA's transport listens on, stamped into every
    /// in-dialog request's top Via.
    pub fn new(transactions: Arc<TransactionManager>, local_uri: Uri, local_via_host: impl Into<String>, event_capacity: usize) -> (Arc<Self>, mpsc::Receiver<DialogEvent>) {
        let (events_tx, events_rx) = mpsc::channel(event_capacity);
        let manager = Arc::new(DialogManager {
            transactions,
            local_uri,
            local_via_host: local_via_host.into(),
            dialogs: DashMap::new(),
            lookup: DashMap::new(),
            pending_invites: DashMap::new(),
            reinvites_in_progress: DashMap::new(),
            events_tx,
        });
        (manager, events_rx)
    }

    /// Drives the manager off the transaction layer's event stream until
    /// it closes. Intended to be `tokio::spawn`ed alongside
    /// [`TransactionManager::run`].
    pub async fn run(self: Arc<Self>, mut transaction_events: mpsc::Receiver<TransactionEvent>) {
        while let Some(event) = transaction_events.recv().await {
            self.handle_transaction_event(event).await;
        }
        debug!("dialog manager's transaction event source closed");
    }

    async fn handle_transaction_event(self: &Arc<Self>, event: TransactionEvent) {
        match event {
            TransactionEvent::NewRequest { transaction_id, request, source } => self.handle_incoming_request(transaction_id, request, source).await,
            TransactionEvent::ProvisionalResponse { transaction_id, response } => self.handle_invite_response(&transaction_id, &response, false).await,
            TransactionEvent::SuccessResponse { transaction_id, response } => self.handle_invite_response(&transaction_id, &response, true).await,
            TransactionEvent::FailureResponse { transaction_id, response } => self.handle_invite_failure(&transaction_id, &response).await,
            TransactionEvent::TransactionTerminated { transaction_id } => {
                self.pending_invites.remove(&transaction_id);
            }
            TransactionEvent::TransportError { transaction_id } => {
                if let Some((_, pending)) = self.pending_invites.remove(&transaction_id) {
                    self.fail_dialog(pending.dialog_id, "transport error").await;
                }
            }
            TransactionEvent::StateChanged { .. } | TransactionEvent::Error { .. } => {}
        }
    }

    async fn handle_incoming_request(self: &Arc<Self>, transaction_id: TransactionKey, request: Request, source: SocketAddr) {
        let dialog_id = self.match_request_to_dialog(&request);
        if let Some(id) = dialog_id {
            if request.method == Method::Invite && self.reinvites_in_progress.contains_key(&id) {
                self.reject_concurrent_invite(&request, source).await;
                return;
            }
            if let Err(e) = self.apply_in_dialog_request(id, &request) {
                warn!(%e, dialog_id = %id, "in-dialog request rejected");
                return;
            }
            if request.method == Method::Invite {
                self.reinvites_in_progress.insert(id, ());
            }
            if request.method == Method::Bye {
                self.terminate_dialog(id, "BYE received").await;
            }
        }
        let _ = self.events_tx.send(DialogEvent::IncomingRequest { transaction_id, dialog_id, request, source }).await;
    }

    /// Refuses a second in-dialog INVITE that arrived while an earlier
    /// one on the same dialog is still pending (RFC 3261 §14.2): answered
    /// directly over the transport, since no server transaction exists
    /// yet for a request the manager has decided not to hand to the TU.
    async fn reject_concurrent_invite(self: &Arc<Self>, request: &Request, source: SocketAddr) {
        let Some(via) = request.top_via() else { return };
        let transport_kind = transport_kind_for(via.transport);

        let mut response = Response::new(StatusCode::SERVER_INTERNAL_ERROR);
        if let Some(to) = request.to_header() {
            response.add_header(TypedHeader::To(to.clone()));
        }
        if let Some(from) = request.from_header() {
            response.add_header(TypedHeader::From(from.clone()));
        }
        if let Some(call_id) = request.call_id() {
            response.add_header(TypedHeader::CallId(call_id.to_string().into()));
        }
        if let Some(cseq) = request.cseq() {
            response.add_header(TypedHeader::CSeq(cseq.clone()));
        }
        for via in request.headers_named(&HeaderName::Via) {
            response.add_header(via.clone());
        }
        response.add_header(TypedHeader::RetryAfter(RetryAfter::new(fastrand::u32(0..=10))));
        response.add_header(TypedHeader::ContentLength(ContentLength(0)));

        if let Err(e) = self.transactions.send_direct(transport_kind, source, response).await {
            warn!(%e, "failed to send concurrent-INVITE rejection");
        }
    }

    fn match_request_to_dialog(&self, request: &Request) -> Option<DialogId> {
        let call_id = request.call_id()?.to_string();
        let to_tag = request.to_header()?.tag()?.to_string();
        let from_tag = request.from_header()?.tag()?.to_string();
        // We're the UAS here: the request's To-tag is ours (local), its
        // From-tag is the peer's (remote).
        self.lookup.get(&(call_id, to_tag, from_tag)).map(|e| *e.value())
    }

    fn apply_in_dialog_request(&self, dialog_id: DialogId, request: &Request) -> DialogResult<()> {
        let mut dialog = self.dialogs.get_mut(&dialog_id).ok_or(DialogError::DialogNotFound(dialog_id))?;
        dialog.update_remote_sequence(request)
    }

    async fn handle_invite_response(self: &Arc<Self>, transaction_id: &TransactionKey, response: &Response, is_final: bool) {
        let Some(pending) = self
            .pending_invites
            .get(transaction_id)
            .map(|e| (e.value().dialog_id, e.value().request.clone(), e.value().destination, e.value().transport_kind))
        else {
            return;
        };
        let (dialog_id, request, destination, transport_kind) = pending;

        let mut just_confirmed = false;
        if let Some(mut dialog) = self.dialogs.get_mut(&dialog_id) {
            if dialog.state == DialogState::Confirmed || dialog.state == DialogState::Terminated {
                return;
            }
            let old_state = dialog.state;
            if dialog.state == DialogState::Early {
                if is_final {
                    just_confirmed = dialog.update_from_2xx(response);
                }
            } else if let Some(mut fresh) = Dialog::from_provisional_response(&request, response, true).filter(|_| !is_final) {
                fresh.id = dialog_id;
                fresh.credentials = std::mem::take(&mut dialog.credentials);
                fresh.auth_sessions = std::mem::take(&mut dialog.auth_sessions);
                *dialog = fresh;
            } else if is_final {
                if let Some(mut fresh) = Dialog::from_2xx_response(&request, response, true) {
                    fresh.id = dialog_id;
                    fresh.credentials = std::mem::take(&mut dialog.credentials);
                    fresh.auth_sessions = std::mem::take(&mut dialog.auth_sessions);
                    *dialog = fresh;
                    just_confirmed = true;
                }
            }
            let new_state = dialog.state;
            drop(dialog);
            self.index_dialog(dialog_id);
            if new_state != old_state {
                let _ = self.events_tx.send(DialogEvent::StateChanged { dialog_id, old_state, new_state }).await;
            }
        }

        if just_confirmed {
            self.send_2xx_ack(dialog_id, &request, response, destination, transport_kind).await;
        }

        if is_final {
            self.pending_invites.remove(transaction_id);
        }
    }

    /// Builds the ACK for a 2xx to an outbound INVITE and sends it
    /// straight over the transport (RFC 3261 §13.2.2.4: this ACK is not a
    /// transaction, so the client INVITE transaction having already
    /// terminated on the 2xx means nothing else will catch a 2xx
    /// retransmit and resend it for us).
    async fn send_2xx_ack(self: &Arc<Self>, dialog_id: DialogId, invite: &Request, response: &Response, destination: SocketAddr, transport_kind: TransportKind) {
        let Some(dialog) = self.dialogs.get(&dialog_id) else { return };
        let ack = sip_core::builder::ack_for_2xx(invite, response, dialog.remote_target.clone(), &dialog.route_set);
        drop(dialog);

        if let Some(mut dialog) = self.dialogs.get_mut(&dialog_id) {
            dialog.pending_ack = Some(ack.clone());
        }

        if let Err(e) = self.transactions.send_direct(transport_kind, destination, ack.clone()).await {
            warn!(%e, %dialog_id, "failed to send 2xx ACK");
            return;
        }

        let manager = self.clone();
        tokio::spawn(async move {
            manager.retransmit_2xx_ack(dialog_id, ack, destination, transport_kind).await;
        });
    }

    /// Resends the stored 2xx ACK on a doubling schedule until 64*T1 has
    /// elapsed, the same bound Timer B uses for giving up on an INVITE
    /// (§17.1.1.2) — nothing in this engine signals a 2xx retransmit any
    /// other way, so this just keeps resending blind.
    async fn retransmit_2xx_ack(self: &Arc<Self>, dialog_id: DialogId, ack: Request, destination: SocketAddr, transport_kind: TransportKind) {
        let mut interval = T1;
        let mut elapsed = Duration::ZERO;
        while elapsed < T1 * 64 {
            tokio::time::sleep(interval).await;
            elapsed += interval;
            interval *= 2;

            let still_current = match self.dialogs.get(&dialog_id) {
                Some(dialog) if dialog.is_terminated() => false,
                Some(dialog) => dialog.pending_ack.as_ref() == Some(&ack),
                None => false,
            };
            if !still_current {
                return;
            }
            if let Err(e) = self.transactions.send_direct(transport_kind, destination, ack.clone()).await {
                warn!(%e, %dialog_id, "failed to retransmit 2xx ACK");
                return;
            }
        }
    }

    /// On a 401/407 to an outbound INVITE, retries it with credentials
    /// instead of failing the dialog outright, provided the dialog has a
    /// credential registered for the challenge's realm (RFC 3261 §22.1).
    async fn handle_invite_failure(self: &Arc<Self>, transaction_id: &TransactionKey, response: &Response) {
        let Some((_, pending)) = self.pending_invites.remove(transaction_id) else { return };

        if matches!(response.status, StatusCode::UNAUTHORIZED | StatusCode::PROXY_AUTHENTICATION_REQUIRED) {
            if let Some(retry) = self.retry_invite_with_credentials(pending.dialog_id, &pending.request, response, pending.destination, pending.transport_kind).await {
                self.pending_invites.insert(retry, PendingInvite { dialog_id: pending.dialog_id, request: pending.request, destination: pending.destination, transport_kind: pending.transport_kind });
                return;
            }
        }

        self.fail_dialog(pending.dialog_id, format!("INVITE failed: {}", response.status)).await;
    }

    /// Builds and sends a re-challenged copy of `request` carrying an
    /// `Authorization`/`Proxy-Authorization` header, if the dialog has a
    /// credential that matches the challenge. Returns the new
    /// transaction's key on success.
    async fn retry_invite_with_credentials(self: &Arc<Self>, dialog_id: DialogId, request: &Request, response: &Response, destination: SocketAddr, transport_kind: TransportKind) -> Option<TransactionKey> {
        let mut dialog = self.dialogs.get_mut(&dialog_id)?;
        let auth_header = dialog.authorize_challenge(response, &request.method, &request.uri)?;
        let cseq = dialog.increment_local_cseq();
        drop(dialog);

        let mut retry = request.clone();
        retry.remove_headers(&HeaderName::Via);
        retry.remove_headers(&HeaderName::CSeq);
        retry.remove_headers(&HeaderName::Authorization);
        retry.remove_headers(&HeaderName::ProxyAuthorization);
        retry.add_header(TypedHeader::Via(Via::new(via_transport_for(transport_kind), self.local_via_host.clone(), sip_core::types::branch::generate_branch())));
        retry.add_header(TypedHeader::CSeq(sip_core::types::cseq::CSeq::new(cseq, Method::Invite)));
        retry.add_header(auth_header);

        match self.transactions.create_client_transaction(retry, destination, transport_kind).await {
            Ok(transaction_id) => Some(transaction_id),
            Err(e) => {
                warn!(%e, %dialog_id, "failed to send authenticated INVITE retry");
                None
            }
        }
    }

    fn index_dialog(&self, dialog_id: DialogId) {
        if let Some(dialog) = self.dialogs.get(&dialog_id) {
            if let Some(key) = dialog.dialog_id_tuple() {
                self.lookup.insert(key, dialog_id);
            }
        }
    }

    async fn fail_dialog(self: &Arc<Self>, dialog_id: DialogId, reason: impl Into<String>) {
        self.terminate_dialog(dialog_id, reason).await;
    }

    async fn terminate_dialog(self: &Arc<Self>, dialog_id: DialogId, reason: impl Into<String>) {
        let reason = reason.into();
        if let Some(mut dialog) = self.dialogs.get_mut(&dialog_id) {
            if dialog.is_terminated() {
                return;
            }
            dialog.terminate();
            if let Some(key) = dialog.dialog_id_tuple() {
                self.lookup.remove(&key);
            }
        } else {
            return;
        }
        let _ = self.events_tx.send(DialogEvent::Terminated { dialog_id, reason }).await;
    }

    /// Starts a dialog-creating INVITE (RFC 3261 §13.2.1): builds the
    /// request, starts a client transaction for it, and registers a
    /// placeholder dialog that `handle_invite_response` fills in once a
    /// response with a To-tag arrives.
    pub async fn send_invite(self: &Arc<Self>, remote_uri: Uri, destination: SocketAddr, transport_kind: TransportKind) -> DialogResult<(DialogId, TransactionKey)> {
        let call_id = generate_call_id();
        let local_tag = generate_tag();

        let request = sip_core::builder::RequestBuilder::new(Method::Invite, remote_uri.clone())
            .via(via_transport_for(transport_kind), self.local_via_host.clone())
            .from(self.local_uri.clone(), local_tag.clone())
            .to(remote_uri.clone())
            .call_id(call_id.clone())
            .cseq(1)
            .contact(self.local_uri.clone())
            .build();

        let dialog_id = DialogId::new();
        let mut dialog = Dialog::new(call_id, self.local_uri.clone(), remote_uri, Some(local_tag), None, true);
        dialog.id = dialog_id;
        dialog.local_cseq = 1;
        self.dialogs.insert(dialog_id, dialog);

        let transaction_id = self.transactions.create_client_transaction(request.clone(), destination, transport_kind).await?;
        self.pending_invites.insert(transaction_id.clone(), PendingInvite { dialog_id, request, destination, transport_kind });

        let _ = self.events_tx.send(DialogEvent::Created { dialog_id }).await;
        Ok((dialog_id, transaction_id))
    }

    /// Cancels an outbound INVITE that hasn't reached a final response
    /// yet (RFC 3261 §9, scenario 5). Before any provisional response,
    /// the far end has no transaction state to cancel either, so the
    /// INVITE is abandoned locally with a synthesized 487 and nothing
    /// goes on the wire; once a provisional has been seen, CANCEL is
    /// sent as its own non-INVITE transaction sharing the INVITE's
    /// branch.
    pub async fn cancel_invite(self: &Arc<Self>, transaction_id: &TransactionKey) -> DialogResult<()> {
        let pending = self.pending_invites.get(transaction_id).map(|e| (e.value().dialog_id, e.value().request.clone(), e.value().destination, e.value().transport_kind));
        let Some((dialog_id, request, destination, transport_kind)) = pending else {
            return Err(DialogError::protocol_error("no pending INVITE for that transaction"));
        };

        let state = self.dialogs.get(&dialog_id).map(|d| d.state);
        match state {
            Some(DialogState::Initial) => {
                self.transactions.terminate(transaction_id).await?;
                let local_response = synthesize_487(&request);
                self.handle_invite_failure(transaction_id, &local_response).await;
                Ok(())
            }
            Some(_) => {
                let cancel = sip_core::builder::cancel_for(&request);
                self.transactions.create_client_transaction(cancel, destination, transport_kind).await?;
                Ok(())
            }
            None => Err(DialogError::DialogNotFound(dialog_id)),
        }
    }

    /// Sends a BYE for an established dialog (RFC 3261 §15.1) and
    /// transitions it to `Terminated` once the request is handed off —
    /// the transaction layer's own retransmission handles delivery from
    /// here, and a non-2xx response to a BYE doesn't resurrect a dialog.
    pub async fn send_bye(self: &Arc<Self>, dialog_id: DialogId, transport_kind: TransportKind) -> DialogResult<TransactionKey> {
        let (request, destination) = {
            let mut dialog = self.dialogs.get_mut(&dialog_id).ok_or(DialogError::DialogNotFound(dialog_id))?;
            if dialog.is_terminated() {
                return Err(DialogError::protocol_error("dialog already terminated"));
            }
            let destination = dialog.last_known_remote_addr.ok_or_else(|| DialogError::protocol_error("no known remote address for dialog"))?;
            let mut request = dialog.build_request(Method::Bye);
            request.add_header(TypedHeader::Via(Via::new(via_transport_for(transport_kind), self.local_via_host.clone(), sip_core::types::branch::generate_branch())));
            (request, destination)
        };

        let transaction_id = self.transactions.create_client_transaction(request, destination, transport_kind).await?;
        self.terminate_dialog(dialog_id, "BYE sent").await;
        Ok(transaction_id)
    }

    /// Sends a response through an INVITE server transaction and, on a
    /// 2xx, materializes the confirmed dialog it creates (RFC 3261
    /// §12.1.1).
    pub async fn respond_to_invite(self: &Arc<Self>, transaction_id: TransactionKey, request: &Request, source: SocketAddr, status: StatusCode) -> DialogResult<Option<DialogId>> {
        let local_tag = generate_tag();
        let mut response = Response::new(status);
        if let Some(to) = request.to_header() {
            let mut to = to.clone();
            if status.is_success() || status.is_provisional() && status != StatusCode::TRYING {
                to.set_tag(local_tag.clone());
            }
            response.add_header(TypedHeader::To(to));
        }
        if let Some(from) = request.from_header() {
            response.add_header(TypedHeader::From(from.clone()));
        }
        if let Some(call_id) = request.call_id() {
            response.add_header(TypedHeader::CallId(call_id.to_string().into()));
        }
        if let Some(cseq) = request.cseq() {
            response.add_header(TypedHeader::CSeq(cseq.clone()));
        }
        for via in request.headers_named(&HeaderName::Via) {
            response.add_header(via.clone());
        }
        response.add_header(TypedHeader::Contact(Contact::Bindings(vec![ContactBinding::new(self.local_uri.clone())])));

        self.transactions.send_response(&transaction_id, response.clone()).await?;

        if status.is_final() {
            if let Some(id) = self.match_request_to_dialog(request) {
                self.reinvites_in_progress.remove(&id);
            }
        }

        if status.is_success() {
            if let Some(dialog) = Dialog::from_2xx_response(request, &response, false) {
                let dialog_id = dialog.id;
                let mut dialog = dialog;
                dialog.update_remote_address(source);
                self.dialogs.insert(dialog_id, dialog);
                self.index_dialog(dialog_id);
                let _ = self.events_tx.send(DialogEvent::Created { dialog_id }).await;
                return Ok(Some(dialog_id));
            }
        }
        Ok(None)
    }

    pub fn dialog(&self, dialog_id: DialogId) -> Option<Dialog> {
        self.dialogs.get(&dialog_id).map(|d| d.clone())
    }

    pub fn dialog_count(&self) -> usize {
        self.dialogs.len()
    }
}

fn via_transport_for(kind: TransportKind) -> ViaTransport {
    match kind {
        TransportKind::Udp => ViaTransport::Udp,
        TransportKind::Tcp => ViaTransport::Tcp,
        TransportKind::Tls => ViaTransport::Tls,
    }
}

fn transport_kind_for(transport: ViaTransport) -> TransportKind {
    match transport {
        ViaTransport::Udp => TransportKind::Udp,
        ViaTransport::Tcp | ViaTransport::Ws | ViaTransport::Sctp => TransportKind::Tcp,
        ViaTransport::Tls | ViaTransport::Wss => TransportKind::Tls,
    }
}

/// A locally-generated 487 Request Terminated for an INVITE cancelled
/// before any provisional response arrived (RFC 3261 §9, scenario 5):
/// no real transaction ever saw this response, so it only needs enough
/// headers for `handle_invite_failure` to read back off it.
fn synthesize_487(invite: &Request) -> Response {
    let mut response = Response::new(StatusCode::REQUEST_TERMINATED);
    if let Some(to) = invite.to_header() {
        response.add_header(TypedHeader::To(to.clone()));
    }
    if let Some(from) = invite.from_header() {
        response.add_header(TypedHeader::From(from.clone()));
    }
    if let Some(call_id) = invite.call_id() {
        response.add_header(TypedHeader::CallId(call_id.into()));
    }
    if let Some(cseq) = invite.cseq() {
        response.add_header(TypedHeader::CSeq(cseq.clone()));
    }
    response
}

fn generate_call_id() -> String {
    sip_core::types::call_id::CallId::generate("dialog-core").to_string()
}

fn generate_tag() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..10].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use sip_transport::factory::TransportFactory;

    fn test_manager() -> Arc<DialogManager> {
        let (transport, _transport_events) = sip_transport::manager::TransportManager::new(TransportFactory::new(), 16);
        let (transactions, _tx_events) = TransactionManager::new(transport, 16);
        let (manager, _events) = DialogManager::new(transactions, Uri::sip("alice@example.com"), "127.0.0.1:5060", 16);
        manager
    }

    #[test]
    fn via_transport_maps_every_kind() {
        assert_eq!(via_transport_for(TransportKind::Udp), ViaTransport::Udp);
        assert_eq!(via_transport_for(TransportKind::Tcp), ViaTransport::Tcp);
        assert_eq!(via_transport_for(TransportKind::Tls), ViaTransport::Tls);
    }

    #[test]
    fn transport_kind_maps_every_via_transport() {
        assert_eq!(transport_kind_for(ViaTransport::Udp), TransportKind::Udp);
        assert_eq!(transport_kind_for(ViaTransport::Tcp), TransportKind::Tcp);
        assert_eq!(transport_kind_for(ViaTransport::Tls), TransportKind::Tls);
        assert_eq!(transport_kind_for(ViaTransport::Wss), TransportKind::Tls);
    }

    #[test]
    fn generated_call_ids_and_tags_are_unique() {
        assert_ne!(generate_call_id(), generate_call_id());
        assert_ne!(generate_tag(), generate_tag());
    }

    #[tokio::test]
    async fn new_manager_starts_with_no_dialogs() {
        let manager = test_manager();
        assert_eq!(manager.dialog_count(), 0);
    }

    #[tokio::test]
    async fn cancel_before_any_provisional_terminates_the_dialog_locally() {
        let (transport, _transport_events) = sip_transport::manager::TransportManager::new(TransportFactory::new(), 16);
        let (transactions, _tx_events) = TransactionManager::new(transport, 16);
        let (manager, mut events) = DialogManager::new(transactions, Uri::sip("alice@example.com"), "127.0.0.1:0", 16);

        let destination: SocketAddr = "127.0.0.1:59999".parse().unwrap();
        let (dialog_id, transaction_id) = manager.send_invite(Uri::sip("bob@example.com"), destination, TransportKind::Udp).await.unwrap();
        assert!(matches!(events.recv().await, Some(DialogEvent::Created { dialog_id: id }) if id == dialog_id));
        assert_eq!(manager.dialog(dialog_id).unwrap().state, DialogState::Initial);

        manager.cancel_invite(&transaction_id).await.unwrap();

        assert!(matches!(events.recv().await, Some(DialogEvent::Terminated { dialog_id: id, .. }) if id == dialog_id));
        assert!(manager.dialog(dialog_id).unwrap().is_terminated());
    }
}
