//! The TURN client allocation state machine (RFC 5766 §6-7, with the
//! ALTERNATE-SERVER redirect of §6.3.1): `Null -> Resolving -> Resolved
//! -> Allocating -> Ready -> Deallocating -> Destroying`. This module is
//! transport-free and synchronous, mirroring how this engine's SIP
//! transaction FSMs separate "what to send next" from the socket that
//! actually sends it: the driving loop lives in [`crate::socket`].
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use crate::allocation::AllocationTables;
use crate::error::{Error, Result};
use crate::integrity;
use crate::stun::{Attribute, AttributeType, Message, Method, StunClass};

/// RFC 5389 §7.2.1 retransmission schedule: initial RTO, doubling on
/// each of 7 retransmits, then one final wait of `16 * RTO` before
/// giving up.
pub const RTO_INITIAL: Duration = Duration::from_millis(500);
pub const MAX_RETRANSMITS: u32 = 7;

pub fn next_rto(previous: Duration) -> Duration {
    previous * 2
}

pub fn final_wait(rto: Duration) -> Duration {
    rto * 16
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Null,
    Resolving,
    Resolved,
    Allocating,
    Ready,
    Deallocating,
    Destroying,
}

#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub realm: String,
    pub nonce: String,
    pub password: String,
}

impl Credentials {
    /// RFC 5389 §15.4 long-term credential key, derived fresh each call
    /// so a realm learned after construction is picked up automatically.
    fn key(&self) -> Vec<u8> {
        integrity::long_term_key(&self.username, &self.realm, &self.password)
    }

    fn apply_auth_attributes(&self, msg: &mut Message) {
        msg.add_attribute(Attribute::username(&self.username));
        msg.add_attribute(Attribute::realm(&self.realm));
        msg.add_attribute(Attribute::nonce(&self.nonce));
        integrity::attach_message_integrity(msg, &self.key());
    }
}

/// Work the driving loop must perform in response to a state-machine
/// transition: send bytes, arm a timer, or tell the TU something
/// happened.
#[derive(Debug, Clone)]
pub enum Action {
    SendTo { server: SocketAddr, message: Box<Message> },
    ArmRetransmit { name: &'static str, after: Duration },
    ArmRefresh { after: Duration },
    CancelRetransmit { name: &'static str },
    Emit(SessionEvent),
}

#[derive(Debug, Clone)]
pub enum SessionEvent {
    AllocationReady { relayed_address: SocketAddr, lifetime: Duration },
    AllocationFailed { reason: String },
    PermissionReady { peer: SocketAddr },
    ChannelBound { channel: u16, peer: SocketAddr },
    DataFromPeer { peer: SocketAddr, data: Vec<u8> },
    PeerConnectionOpened { connection_id: u32, relay: SocketAddr },
    PeerConnectionFailed { relay: SocketAddr, reason: String },
    Terminated,
}

/// A TURN client allocation's live state: which server it is talking
/// to, its relay address once allocated, and the permission/channel
/// tables for relayed data.
pub struct TurnSession {
    pub state: SessionState,
    server: SocketAddr,
    alternate_server: Option<SocketAddr>,
    redirected_once: bool,
    credentials: Option<Credentials>,
    relayed_address: Option<SocketAddr>,
    lifetime: Duration,
    pub tables: AllocationTables,
    pending_transaction_id: Option<[u8; 12]>,
    pending_peer: Option<SocketAddr>,
    pending_channel: Option<u16>,
    retransmit_count: u32,
    current_rto: Duration,
}

impl TurnSession {
    pub fn new(server: SocketAddr) -> Self {
        TurnSession {
            state: SessionState::Null,
            server,
            alternate_server: None,
            redirected_once: false,
            credentials: None,
            relayed_address: None,
            lifetime: Duration::from_secs(600),
            tables: AllocationTables::new(),
            pending_transaction_id: None,
            pending_peer: None,
            pending_channel: None,
            retransmit_count: 0,
            current_rto: RTO_INITIAL,
        }
    }

    pub fn relayed_address(&self) -> Option<SocketAddr> {
        self.relayed_address
    }

    pub fn server(&self) -> SocketAddr {
        self.server
    }

    /// Starts allocation: caller is expected to have already resolved
    /// `server`'s address (the `Resolving`/`Resolved` pair exists so a
    /// future DNS-backed socket layer has somewhere to sit; this engine
    /// is given a pre-resolved `SocketAddr` up front).
    pub fn start(&mut self) -> Vec<Action> {
        self.state = SessionState::Resolved;
        self.begin_allocate(None)
    }

    fn begin_allocate(&mut self, auth: Option<&Credentials>) -> Vec<Action> {
        self.state = SessionState::Allocating;
        let mut msg = Message::request(Method::Allocate);
        msg.add_attribute(Attribute::requested_transport_udp());
        msg.add_attribute(Attribute::lifetime(self.lifetime.as_secs() as u32));
        if let Some(creds) = auth {
            creds.apply_auth_attributes(&mut msg);
        }
        self.pending_transaction_id = Some(msg.transaction_id);
        self.retransmit_count = 0;
        self.current_rto = RTO_INITIAL;
        vec![Action::SendTo { server: self.server, message: Box::new(msg) }, Action::ArmRetransmit { name: "allocate", after: self.current_rto }]
    }

    /// Processes an Allocate response. `now` anchors any table entries
    /// the 2xx response seeds (none yet; permissions are created on
    /// first CreatePermission).
    pub fn on_allocate_response(&mut self, msg: Message, _now: Instant) -> Result<Vec<Action>> {
        if self.state != SessionState::Allocating {
            return Ok(vec![]);
        }
        if Some(msg.transaction_id) != self.pending_transaction_id {
            return Ok(vec![]);
        }

        if msg.is_error() {
            let code = msg.get_attribute(AttributeType::ErrorCode).map(|a| a.as_error_code()).transpose()?.unwrap_or(0);
            match code {
                401 | 438 => {
                    let realm = msg.get_attribute(AttributeType::Realm).and_then(|a| a.as_str().ok()).unwrap_or_default().to_string();
                    let nonce = msg.get_attribute(AttributeType::Nonce).and_then(|a| a.as_str().ok()).unwrap_or_default().to_string();
                    let creds = self.credentials.get_or_insert_with(|| Credentials { username: String::new(), realm: String::new(), nonce: String::new(), password: String::new() });
                    creds.realm = realm;
                    creds.nonce = nonce;
                    let creds = creds.clone();
                    return Ok(self.begin_allocate(Some(&creds)));
                }
                300..=399 => {
                    if self.redirected_once {
                        self.state = SessionState::Destroying;
                        return Ok(vec![
                            Action::CancelRetransmit { name: "allocate" },
                            Action::Emit(SessionEvent::AllocationFailed { reason: "server redirected more than once".to_string() }),
                        ]);
                    }
                    let alt = msg
                        .get_attribute(AttributeType::Other(0x8023))
                        .and_then(|a| a.as_xor_address(&msg.transaction_id).ok());
                    let Some(alt) = alt.or(self.alternate_server) else {
                        self.state = SessionState::Destroying;
                        return Ok(vec![Action::Emit(SessionEvent::AllocationFailed { reason: "redirect without ALTERNATE-SERVER".to_string() })]);
                    };
                    self.redirected_once = true;
                    self.server = alt;
                    self.state = SessionState::Resolving;
                    let mut actions = vec![Action::CancelRetransmit { name: "allocate" }];
                    actions.extend(self.begin_allocate(self.credentials.clone().as_ref()));
                    return Ok(actions);
                }
                _ => {
                    self.state = SessionState::Destroying;
                    return Ok(vec![
                        Action::CancelRetransmit { name: "allocate" },
                        Action::Emit(SessionEvent::AllocationFailed { reason: format!("Allocate failed with {code}") }),
                    ]);
                }
            }
        }

        let relayed = msg
            .get_attribute(AttributeType::XorRelayedAddress)
            .ok_or_else(|| Error::Protocol("Allocate success missing XOR-RELAYED-ADDRESS".to_string()))?
            .as_xor_address(&msg.transaction_id)?;
        let lifetime_secs = msg.get_attribute(AttributeType::Lifetime).map(|a| a.as_u32()).transpose()?.unwrap_or(self.lifetime.as_secs() as u32);
        self.lifetime = Duration::from_secs(lifetime_secs as u64);
        self.relayed_address = Some(relayed);
        self.state = SessionState::Ready;

        Ok(vec![
            Action::CancelRetransmit { name: "allocate" },
            Action::ArmRefresh { after: self.lifetime / 2 },
            Action::Emit(SessionEvent::AllocationReady { relayed_address: relayed, lifetime: self.lifetime }),
        ])
    }

    /// Timer firing for the named retransmit slot. Returns `Err` once
    /// the RFC 5389 retry budget is exhausted.
    pub fn on_retransmit_timer(&mut self, name: &'static str, pending: &Message) -> Result<Vec<Action>> {
        if self.retransmit_count >= MAX_RETRANSMITS {
            self.state = SessionState::Destroying;
            return Err(Error::Timeout);
        }
        self.retransmit_count += 1;
        self.current_rto = next_rto(self.current_rto);
        let after = if self.retransmit_count == MAX_RETRANSMITS { final_wait(self.current_rto) } else { self.current_rto };
        Ok(vec![
            Action::SendTo { server: self.server, message: Box::new(pending.clone()) },
            Action::ArmRetransmit { name, after },
        ])
    }

    /// Builds a Refresh request for the periodic keep-alive fired at
    /// `lifetime / 2` (or a Refresh with lifetime 0 to deallocate).
    pub fn build_refresh(&mut self, deallocate: bool) -> Vec<Action> {
        self.state = if deallocate { SessionState::Deallocating } else { SessionState::Allocating };
        let mut msg = Message::request(Method::Refresh);
        let lifetime = if deallocate { 0 } else { self.lifetime.as_secs() as u32 };
        msg.add_attribute(Attribute::lifetime(lifetime));
        if let Some(creds) = &self.credentials {
            creds.apply_auth_attributes(&mut msg);
        }
        self.pending_transaction_id = Some(msg.transaction_id);
        self.retransmit_count = 0;
        self.current_rto = RTO_INITIAL;
        vec![Action::SendTo { server: self.server, message: Box::new(msg) }, Action::ArmRetransmit { name: "refresh", after: self.current_rto }]
    }

    pub fn on_refresh_response(&mut self, msg: Message) -> Result<Vec<Action>> {
        if Some(msg.transaction_id) != self.pending_transaction_id {
            return Ok(vec![]);
        }
        if msg.is_error() {
            self.state = SessionState::Destroying;
            return Ok(vec![Action::CancelRetransmit { name: "refresh" }, Action::Emit(SessionEvent::Terminated)]);
        }
        let lifetime_secs = msg.get_attribute(AttributeType::Lifetime).map(|a| a.as_u32()).transpose()?.unwrap_or(0);
        let mut actions = vec![Action::CancelRetransmit { name: "refresh" }];
        if lifetime_secs == 0 {
            self.state = SessionState::Destroying;
            actions.push(Action::Emit(SessionEvent::Terminated));
        } else {
            self.lifetime = Duration::from_secs(lifetime_secs as u64);
            self.state = SessionState::Ready;
            actions.push(Action::ArmRefresh { after: self.lifetime / 2 });
        }
        Ok(actions)
    }

    pub fn build_create_permission(&mut self, peer: SocketAddr) -> Vec<Action> {
        let mut msg = Message::request(Method::CreatePermission);
        msg.add_attribute(Attribute::xor_peer_address(peer, &msg.transaction_id.clone()));
        if let Some(creds) = &self.credentials {
            creds.apply_auth_attributes(&mut msg);
        }
        self.pending_transaction_id = Some(msg.transaction_id);
        self.pending_peer = Some(peer);
        vec![Action::SendTo { server: self.server, message: Box::new(msg) }]
    }

    /// Reads the peer off the request this response answers (tracked in
    /// `pending_peer` since CreatePermission), rather than requiring the
    /// caller to thread it back through the transport layer.
    pub fn on_create_permission_response(&mut self, msg: Message, now: Instant) -> Result<Vec<Action>> {
        if Some(msg.transaction_id) != self.pending_transaction_id {
            return Ok(vec![]);
        }
        let Some(peer) = self.pending_peer.take() else { return Ok(vec![]) };
        if msg.is_error() {
            return Ok(vec![]);
        }
        self.tables.install_permission(peer.ip(), now);
        Ok(vec![Action::Emit(SessionEvent::PermissionReady { peer })])
    }

    pub fn build_channel_bind(&mut self, peer: SocketAddr, now: Instant) -> Result<(u16, Vec<Action>)> {
        let channel = self.tables.allocate_channel_number(peer, now)?;
        let mut msg = Message::request(Method::ChannelBind);
        msg.add_attribute(Attribute::channel_number(channel));
        msg.add_attribute(Attribute::xor_peer_address(peer, &msg.transaction_id.clone()));
        if let Some(creds) = &self.credentials {
            creds.apply_auth_attributes(&mut msg);
        }
        self.pending_transaction_id = Some(msg.transaction_id);
        self.pending_peer = Some(peer);
        self.pending_channel = Some(channel);
        Ok((channel, vec![Action::SendTo { server: self.server, message: Box::new(msg) }]))
    }

    pub fn on_channel_bind_response(&mut self, msg: Message) -> Vec<Action> {
        if Some(msg.transaction_id) != self.pending_transaction_id {
            return vec![];
        }
        let (Some(peer), Some(channel)) = (self.pending_peer.take(), self.pending_channel.take()) else { return vec![] };
        if msg.is_error() {
            return vec![];
        }
        vec![Action::Emit(SessionEvent::ChannelBound { channel, peer })]
    }

    pub fn on_data_indication(&self, msg: &Message) -> Result<Option<(SocketAddr, Vec<u8>)>> {
        let Some(peer_attr) = msg.get_attribute(AttributeType::XorPeerAddress) else { return Ok(None) };
        let peer = peer_attr.as_xor_address(&msg.transaction_id)?;
        let data = msg.get_attribute(AttributeType::Data).map(|a| a.value.to_vec()).unwrap_or_default();
        Ok(Some((peer, data)))
    }

    pub fn set_credentials(&mut self, username: String, password: String) {
        let creds = self.credentials.get_or_insert_with(|| Credentials { username: String::new(), realm: String::new(), nonce: String::new(), password: String::new() });
        creds.username = username;
        creds.password = password;
    }

    pub fn set_alternate_server_hint(&mut self, addr: SocketAddr) {
        self.alternate_server = Some(addr);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stun::StunMessageType;

    fn success_allocate_response(transaction_id: [u8; 12], relayed: SocketAddr) -> Message {
        let mut msg = Message::with_transaction_id(StunMessageType::new(StunClass::SuccessResponse, Method::Allocate), transaction_id);
        msg.add_attribute(Attribute::new(AttributeType::XorRelayedAddress, Attribute::xor_mapped_address(relayed, &transaction_id).value));
        msg.add_attribute(Attribute::lifetime(600));
        msg
    }

    #[test]
    fn start_sends_allocate_and_arms_retransmit() {
        let mut session = TurnSession::new("198.51.100.1:3478".parse().unwrap());
        let actions = session.start();
        assert_eq!(session.state, SessionState::Allocating);
        assert!(matches!(actions[0], Action::SendTo { .. }));
        assert!(matches!(actions[1], Action::ArmRetransmit { name: "allocate", .. }));
    }

    #[test]
    fn allocate_success_transitions_to_ready_and_emits_relayed_address() {
        let mut session = TurnSession::new("198.51.100.1:3478".parse().unwrap());
        session.start();
        let txn = session.pending_transaction_id.unwrap();
        let relayed: SocketAddr = "198.51.100.1:50000".parse().unwrap();
        let response = success_allocate_response(txn, relayed);
        let actions = session.on_allocate_response(response, Instant::now()).unwrap();
        assert_eq!(session.state, SessionState::Ready);
        assert_eq!(session.relayed_address(), Some(relayed));
        assert!(actions.iter().any(|a| matches!(a, Action::Emit(SessionEvent::AllocationReady { .. }))));
    }

    #[test]
    fn retransmit_budget_is_exhausted_after_seven_attempts() {
        let mut session = TurnSession::new("198.51.100.1:3478".parse().unwrap());
        session.start();
        let pending = Message::request(Method::Allocate);
        for _ in 0..MAX_RETRANSMITS {
            session.on_retransmit_timer("allocate", &pending).unwrap();
        }
        assert!(session.on_retransmit_timer("allocate", &pending).is_err());
    }

    #[test]
    fn second_redirect_fails_the_allocation_instead_of_looping() {
        let mut session = TurnSession::new("198.51.100.1:3478".parse().unwrap());
        session.start();
        session.redirected_once = true;
        let txn = session.pending_transaction_id.unwrap();
        let mut redirect = Message::with_transaction_id(StunMessageType::new(StunClass::ErrorResponse, Method::Allocate), txn);
        redirect.add_attribute(Attribute::new(AttributeType::ErrorCode, bytes::Bytes::from_static(&[0, 0, 0x03, 0])));
        let actions = session.on_allocate_response(redirect, Instant::now()).unwrap();
        assert_eq!(session.state, SessionState::Destroying);
        assert!(actions.iter().any(|a| matches!(a, Action::Emit(SessionEvent::AllocationFailed { .. }))));
    }

    #[test]
    fn refresh_with_zero_lifetime_response_terminates_session() {
        let mut session = TurnSession::new("198.51.100.1:3478".parse().unwrap());
        session.state = SessionState::Ready;
        session.build_refresh(true);
        let txn = session.pending_transaction_id.unwrap();
        let mut response = Message::with_transaction_id(StunMessageType::new(StunClass::SuccessResponse, Method::Refresh), txn);
        response.add_attribute(Attribute::lifetime(0));
        let actions = session.on_refresh_response(response).unwrap();
        assert_eq!(session.state, SessionState::Destroying);
        assert!(actions.iter().any(|a| matches!(a, Action::Emit(SessionEvent::Terminated))));
    }

    #[test]
    fn create_permission_round_trip_installs_permission_and_emits_ready() {
        let mut session = TurnSession::new("198.51.100.1:3478".parse().unwrap());
        let peer: SocketAddr = "203.0.113.9:4000".parse().unwrap();
        session.build_create_permission(peer);
        let txn = session.pending_transaction_id.unwrap();
        let response = Message::with_transaction_id(StunMessageType::new(StunClass::SuccessResponse, Method::CreatePermission), txn);
        let now = Instant::now();
        let actions = session.on_create_permission_response(response, now).unwrap();
        assert!(session.tables.has_permission(peer.ip(), now));
        assert!(actions.iter().any(|a| matches!(a, Action::Emit(SessionEvent::PermissionReady { .. }))));
    }

    #[test]
    fn channel_bind_round_trip_emits_channel_bound() {
        let mut session = TurnSession::new("198.51.100.1:3478".parse().unwrap());
        let peer: SocketAddr = "203.0.113.9:4000".parse().unwrap();
        let now = Instant::now();
        let (channel, _actions) = session.build_channel_bind(peer, now).unwrap();
        let txn = session.pending_transaction_id.unwrap();
        let response = Message::with_transaction_id(StunMessageType::new(StunClass::SuccessResponse, Method::ChannelBind), txn);
        let actions = session.on_channel_bind_response(response);
        assert!(actions.iter().any(|a| matches!(a, Action::Emit(SessionEvent::ChannelBound { channel: c, .. }) if *c == channel)));
    }

    #[test]
    fn stale_response_for_a_different_transaction_is_ignored() {
        let mut session = TurnSession::new("198.51.100.1:3478".parse().unwrap());
        let peer: SocketAddr = "203.0.113.9:4000".parse().unwrap();
        session.build_create_permission(peer);
        let stale_response = Message::with_transaction_id(StunMessageType::new(StunClass::SuccessResponse, Method::CreatePermission), [0xAA; 12]);
        let actions = session.on_create_permission_response(stale_response, Instant::now()).unwrap();
        assert!(actions.is_empty());
        assert!(!session.tables.has_permission(peer.ip(), Instant::now()));
    }

    #[test]
    fn challenge_response_retries_with_a_verifiable_message_integrity_attribute() {
        let mut session = TurnSession::new("198.51.100.1:3478".parse().unwrap());
        session.set_credentials("alice".to_string(), "hunter2".to_string());
        session.start();
        let first_txn = session.pending_transaction_id.unwrap();
        let mut challenge = Message::with_transaction_id(StunMessageType::new(StunClass::ErrorResponse, Method::Allocate), first_txn);
        challenge.add_attribute(Attribute::new(AttributeType::ErrorCode, bytes::Bytes::from_static(&[0, 0, 4, 1])));
        challenge.add_attribute(Attribute::realm("example.com"));
        challenge.add_attribute(Attribute::nonce("abcd1234"));
        let actions = session.on_allocate_response(challenge, Instant::now()).unwrap();

        let Some(Action::SendTo { message, .. }) = actions.into_iter().find(|a| matches!(a, Action::SendTo { .. })) else {
            panic!("expected a retried Allocate request");
        };
        assert_eq!(message.get_attribute(AttributeType::Username).unwrap().as_str().unwrap(), "alice");
        assert_eq!(message.get_attribute(AttributeType::Realm).unwrap().as_str().unwrap(), "example.com");
        assert!(message.get_attribute(AttributeType::MessageIntegrity).is_some());

        let key = crate::integrity::long_term_key("alice", "example.com", "hunter2");
        assert!(crate::integrity::verify_message_integrity(&message, &key));
        assert!(!crate::integrity::verify_message_integrity(&message, &crate::integrity::long_term_key("alice", "example.com", "wrong")));
    }
}
