//! RFC 5389 STUN message layout, extended with the RFC 5766 TURN and
//! RFC 6062 TURN-TCP methods and attributes this engine's allocation FSM
//! needs. Grounded on the sibling ICE stack's STUN codec (same bit
//! layout, same magic cookie), generalized from its binding-only subset
//! to the full TURN method/attribute set.
use std::net::{IpAddr, SocketAddr};

use byteorder::{BigEndian, ByteOrder};
use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{Error, Result};

pub const STUN_HEADER_SIZE: usize = 20;
pub const MAGIC_COOKIE: u32 = 0x2112_A442;

/// A STUN message's class (RFC 5389 §6, the two bits spread across the
/// message type's bit 4 and bit 8).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StunClass {
    Request,
    Indication,
    SuccessResponse,
    ErrorResponse,
}

impl StunClass {
    fn bits(self) -> u16 {
        match self {
            StunClass::Request => 0b00,
            StunClass::Indication => 0b01,
            StunClass::SuccessResponse => 0b10,
            StunClass::ErrorResponse => 0b11,
        }
    }

    fn from_bits(bits: u16) -> Self {
        match bits {
            0b00 => StunClass::Request,
            0b01 => StunClass::Indication,
            0b10 => StunClass::SuccessResponse,
            _ => StunClass::ErrorResponse,
        }
    }
}

/// The STUN/TURN method a message carries, independent of its class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Binding,
    Allocate,
    Refresh,
    Send,
    Data,
    CreatePermission,
    ChannelBind,
    Connect,
    ConnectionBind,
    ConnectionAttempt,
    Other(u16),
}

impl Method {
    fn as_u16(self) -> u16 {
        match self {
            Method::Binding => 0x001,
            Method::Allocate => 0x003,
            Method::Refresh => 0x004,
            Method::Send => 0x006,
            Method::Data => 0x007,
            Method::CreatePermission => 0x008,
            Method::ChannelBind => 0x009,
            Method::Connect => 0x00A,
            Method::ConnectionBind => 0x00B,
            Method::ConnectionAttempt => 0x00C,
            Method::Other(v) => v,
        }
    }

    fn from_u16(value: u16) -> Self {
        match value {
            0x001 => Method::Binding,
            0x003 => Method::Allocate,
            0x004 => Method::Refresh,
            0x006 => Method::Send,
            0x007 => Method::Data,
            0x008 => Method::CreatePermission,
            0x009 => Method::ChannelBind,
            0x00A => Method::Connect,
            0x00B => Method::ConnectionBind,
            0x00C => Method::ConnectionAttempt,
            other => Method::Other(other),
        }
    }
}

/// `(class, method)`, STUN's full message type (RFC 5389 §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StunMessageType {
    pub class: StunClass,
    pub method: Method,
}

impl StunMessageType {
    pub fn new(class: StunClass, method: Method) -> Self {
        StunMessageType { class, method }
    }

    /// Packs `(class, method)` into the wire's 14-bit message-type field
    /// the way RFC 5389 figure 3 interleaves them: `M11..M0` with `C1`
    /// inserted after bit 7 and `C0` after bit 3.
    fn to_u16(self) -> u16 {
        let class_bits = self.class.bits();
        let method = self.method.as_u16() & 0x0FFF;
        let c0 = (class_bits & 0x01) << 4;
        let c1 = (class_bits & 0x02) << 7;
        let m0 = method & 0x0F;
        let m1 = (method & 0x0F0) >> 4;
        let m2 = (method & 0xF00) >> 8;
        (m2 << 12) | c1 | (m1 << 4) | c0 | m0
    }

    fn from_u16(value: u16) -> Self {
        let c0 = (value & 0x0010) >> 4;
        let c1 = (value & 0x0100) >> 7;
        let class_bits = c1 | c0;
        let m0 = value & 0x000F;
        let m1 = (value & 0x00E0) >> 4;
        let m2 = (value & 0x3E00) >> 8;
        let method = (m2 << 8) | (m1 << 4) | m0;
        StunMessageType { class: StunClass::from_bits(class_bits), method: Method::from_u16(method) }
    }
}

/// Attribute types this engine reads or writes. RFC 5389's base set plus
/// RFC 5766 (TURN) and RFC 6062 (TURN over TCP).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeType {
    MappedAddress,
    Username,
    MessageIntegrity,
    ErrorCode,
    UnknownAttributes,
    ChannelNumber,
    Lifetime,
    XorPeerAddress,
    Data,
    Realm,
    Nonce,
    XorRelayedAddress,
    EvenPort,
    RequestedTransport,
    DontFragment,
    XorMappedAddress,
    ReservationToken,
    ConnectionId,
    Software,
    Fingerprint,
    Other(u16),
}

impl From<u16> for AttributeType {
    fn from(value: u16) -> Self {
        match value {
            0x0001 => AttributeType::MappedAddress,
            0x0006 => AttributeType::Username,
            0x0008 => AttributeType::MessageIntegrity,
            0x0009 => AttributeType::ErrorCode,
            0x000A => AttributeType::UnknownAttributes,
            0x000C => AttributeType::ChannelNumber,
            0x000D => AttributeType::Lifetime,
            0x0012 => AttributeType::XorPeerAddress,
            0x0013 => AttributeType::Data,
            0x0014 => AttributeType::Realm,
            0x0015 => AttributeType::Nonce,
            0x0016 => AttributeType::XorRelayedAddress,
            0x0018 => AttributeType::EvenPort,
            0x0019 => AttributeType::RequestedTransport,
            0x001A => AttributeType::DontFragment,
            0x0020 => AttributeType::XorMappedAddress,
            0x0022 => AttributeType::ReservationToken,
            0x002A => AttributeType::ConnectionId,
            0x8022 => AttributeType::Software,
            0x8028 => AttributeType::Fingerprint,
            other => AttributeType::Other(other),
        }
    }
}

impl From<AttributeType> for u16 {
    fn from(t: AttributeType) -> Self {
        match t {
            AttributeType::MappedAddress => 0x0001,
            AttributeType::Username => 0x0006,
            AttributeType::MessageIntegrity => 0x0008,
            AttributeType::ErrorCode => 0x0009,
            AttributeType::UnknownAttributes => 0x000A,
            AttributeType::ChannelNumber => 0x000C,
            AttributeType::Lifetime => 0x000D,
            AttributeType::XorPeerAddress => 0x0012,
            AttributeType::Data => 0x0013,
            AttributeType::Realm => 0x0014,
            AttributeType::Nonce => 0x0015,
            AttributeType::XorRelayedAddress => 0x0016,
            AttributeType::EvenPort => 0x0018,
            AttributeType::RequestedTransport => 0x0019,
            AttributeType::DontFragment => 0x001A,
            AttributeType::XorMappedAddress => 0x0020,
            AttributeType::ReservationToken => 0x0022,
            AttributeType::ConnectionId => 0x002A,
            AttributeType::Software => 0x8022,
            AttributeType::Fingerprint => 0x8028,
            AttributeType::Other(v) => v,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub attr_type: AttributeType,
    pub value: Bytes,
}

impl Attribute {
    pub fn new(attr_type: AttributeType, value: impl Into<Bytes>) -> Self {
        Attribute { attr_type, value: value.into() }
    }

    pub fn username(name: &str) -> Self {
        Self::new(AttributeType::Username, Bytes::copy_from_slice(name.as_bytes()))
    }

    pub fn realm(realm: &str) -> Self {
        Self::new(AttributeType::Realm, Bytes::copy_from_slice(realm.as_bytes()))
    }

    pub fn nonce(nonce: &str) -> Self {
        Self::new(AttributeType::Nonce, Bytes::copy_from_slice(nonce.as_bytes()))
    }

    pub fn lifetime(seconds: u32) -> Self {
        let mut buf = BytesMut::with_capacity(4);
        buf.put_u32(seconds);
        Self::new(AttributeType::Lifetime, buf.freeze())
    }

    pub fn requested_transport_udp() -> Self {
        // RFC 5766 §14.7: protocol number in the high octet, 17 = UDP.
        Self::new(AttributeType::RequestedTransport, Bytes::from_static(&[17, 0, 0, 0]))
    }

    pub fn channel_number(number: u16) -> Self {
        let mut buf = BytesMut::with_capacity(4);
        buf.put_u16(number);
        buf.put_u16(0);
        Self::new(AttributeType::ChannelNumber, buf.freeze())
    }

    pub fn data(payload: &[u8]) -> Self {
        Self::new(AttributeType::Data, Bytes::copy_from_slice(payload))
    }

    pub fn xor_peer_address(addr: SocketAddr, transaction_id: &[u8; 12]) -> Self {
        Self::new(AttributeType::XorPeerAddress, encode_xor_address(addr, transaction_id))
    }

    pub fn xor_mapped_address(addr: SocketAddr, transaction_id: &[u8; 12]) -> Self {
        Self::new(AttributeType::XorMappedAddress, encode_xor_address(addr, transaction_id))
    }

    /// Reads any of the XOR-encoded address attributes (MAPPED,
    /// XOR-PEER-ADDRESS, XOR-RELAYED-ADDRESS all share this encoding).
    pub fn as_xor_address(&self, transaction_id: &[u8; 12]) -> Result<SocketAddr> {
        decode_xor_address(&self.value, transaction_id)
    }

    pub fn as_u32(&self) -> Result<u32> {
        if self.value.len() < 4 {
            return Err(Error::Syntax("attribute too short for u32".to_string()));
        }
        Ok(BigEndian::read_u32(&self.value))
    }

    pub fn as_str(&self) -> Result<&str> {
        std::str::from_utf8(&self.value).map_err(|e| Error::Syntax(e.to_string()))
    }

    pub fn as_channel_number(&self) -> Result<u16> {
        if self.value.len() < 2 {
            return Err(Error::Syntax("CHANNEL-NUMBER attribute too short".to_string()));
        }
        Ok(BigEndian::read_u16(&self.value))
    }

    /// ERROR-CODE's class/number encode as `0 0 0 class:3 number:8`
    /// (RFC 5389 §15.6); returns the 3-digit status (e.g. 438).
    pub fn as_error_code(&self) -> Result<u16> {
        if self.value.len() < 4 {
            return Err(Error::Syntax("ERROR-CODE attribute too short".to_string()));
        }
        let class = (self.value[2] & 0x07) as u16;
        let number = self.value[3] as u16;
        Ok(class * 100 + number)
    }
}

fn encode_xor_address(addr: SocketAddr, transaction_id: &[u8; 12]) -> Bytes {
    let mut value = BytesMut::with_capacity(8);
    value.put_u8(0);
    let family = match addr.ip() {
        IpAddr::V4(_) => 1,
        IpAddr::V6(_) => 2,
    };
    value.put_u8(family);
    let xor_port = addr.port() ^ (MAGIC_COOKIE >> 16) as u16;
    value.put_u16(xor_port);
    match addr.ip() {
        IpAddr::V4(ip) => {
            let xor_ip = u32::from_be_bytes(ip.octets()) ^ MAGIC_COOKIE;
            value.put_u32(xor_ip);
        }
        IpAddr::V6(ip) => {
            let octets = ip.octets();
            let mut xor_ip = [0u8; 16];
            for i in 0..4 {
                xor_ip[i] = octets[i] ^ ((MAGIC_COOKIE >> (24 - i * 8)) & 0xff) as u8;
            }
            for i in 0..12 {
                xor_ip[i + 4] = octets[i + 4] ^ transaction_id[i];
            }
            value.put_slice(&xor_ip);
        }
    }
    value.freeze()
}

fn decode_xor_address(value: &Bytes, transaction_id: &[u8; 12]) -> Result<SocketAddr> {
    if value.len() < 4 {
        return Err(Error::Syntax("XOR address attribute too short".to_string()));
    }
    let family = value[1];
    let xor_port = BigEndian::read_u16(&value[2..4]);
    let port = xor_port ^ (MAGIC_COOKIE >> 16) as u16;
    let ip = match family {
        1 => {
            if value.len() < 8 {
                return Err(Error::Syntax("XOR-IPv4 address attribute too short".to_string()));
            }
            let xor_ip = BigEndian::read_u32(&value[4..8]);
            IpAddr::from((xor_ip ^ MAGIC_COOKIE).to_be_bytes())
        }
        2 => {
            if value.len() < 20 {
                return Err(Error::Syntax("XOR-IPv6 address attribute too short".to_string()));
            }
            let mut octets = [0u8; 16];
            for i in 0..4 {
                octets[i] = value[4 + i] ^ ((MAGIC_COOKIE >> (24 - i * 8)) & 0xff) as u8;
            }
            for i in 0..12 {
                octets[i + 4] = value[8 + i] ^ transaction_id[i];
            }
            IpAddr::from(octets)
        }
        other => return Err(Error::Syntax(format!("unsupported XOR address family {other}"))),
    };
    Ok(SocketAddr::new(ip, port))
}

/// A full STUN message: header plus a list of TLV attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub msg_type: StunMessageType,
    pub transaction_id: [u8; 12],
    pub attributes: Vec<Attribute>,
}

impl Message {
    pub fn new(msg_type: StunMessageType) -> Self {
        let mut transaction_id = [0u8; 12];
        for b in transaction_id.iter_mut() {
            *b = fastrand::u8(..);
        }
        Message { msg_type, transaction_id, attributes: Vec::new() }
    }

    pub fn request(method: Method) -> Self {
        Self::new(StunMessageType::new(StunClass::Request, method))
    }

    pub fn with_transaction_id(msg_type: StunMessageType, transaction_id: [u8; 12]) -> Self {
        Message { msg_type, transaction_id, attributes: Vec::new() }
    }

    pub fn add_attribute(&mut self, attr: Attribute) -> &mut Self {
        self.attributes.push(attr);
        self
    }

    pub fn get_attribute(&self, attr_type: AttributeType) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.attr_type == attr_type)
    }

    pub fn is_success(&self) -> bool {
        self.msg_type.class == StunClass::SuccessResponse
    }

    pub fn is_error(&self) -> bool {
        self.msg_type.class == StunClass::ErrorResponse
    }

    pub fn encode(&self) -> Bytes {
        let attr_size: usize = self.attributes.iter().map(|a| padded_len(a.value.len()) + 4).sum();
        let mut buf = BytesMut::with_capacity(STUN_HEADER_SIZE + attr_size);
        buf.put_u16(self.msg_type.to_u16());
        buf.put_u16(attr_size as u16);
        buf.put_u32(MAGIC_COOKIE);
        buf.put_slice(&self.transaction_id);
        for attr in &self.attributes {
            let attr_type: u16 = attr.attr_type.into();
            buf.put_u16(attr_type);
            buf.put_u16(attr.value.len() as u16);
            buf.put_slice(&attr.value);
            for _ in 0..(padded_len(attr.value.len()) - attr.value.len()) {
                buf.put_u8(0);
            }
        }
        buf.freeze()
    }

    pub fn decode(mut bytes: Bytes) -> Result<Self> {
        if bytes.len() < STUN_HEADER_SIZE {
            return Err(Error::Syntax("STUN message shorter than the 20-byte header".to_string()));
        }
        let msg_type = StunMessageType::from_u16(bytes.get_u16());
        let length = bytes.get_u16() as usize;
        let cookie = bytes.get_u32();
        if cookie != MAGIC_COOKIE {
            return Err(Error::Syntax("STUN magic cookie mismatch".to_string()));
        }
        let mut transaction_id = [0u8; 12];
        bytes.copy_to_slice(&mut transaction_id);

        if bytes.remaining() < length {
            return Err(Error::Syntax("STUN message shorter than its declared length".to_string()));
        }
        let mut body = bytes.slice(0..length);
        let mut attributes = Vec::new();
        while body.remaining() >= 4 {
            let attr_type = AttributeType::from(body.get_u16());
            let attr_len = body.get_u16() as usize;
            let padded = padded_len(attr_len);
            if body.remaining() < padded {
                return Err(Error::Syntax("STUN attribute runs past the message body".to_string()));
            }
            let value = body.slice(0..attr_len);
            body.advance(padded);
            attributes.push(Attribute { attr_type, value });
        }

        Ok(Message { msg_type, transaction_id, attributes })
    }
}

fn padded_len(len: usize) -> usize {
    len + (4 - (len % 4)) % 4
}

/// Whether the first two bits of a byte read off the wire mark it as a
/// STUN message (`00`) or a ChannelData frame (RFC 5764 §5.1.2 assigns
/// ChannelData's channel numbers starting at `0x4000`, so the top two
/// bits are always `01`).
pub fn looks_like_stun(first_byte: u8) -> bool {
    first_byte >> 6 == 0b00
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_type_round_trips_every_method_and_class() {
        for method in [Method::Allocate, Method::Refresh, Method::CreatePermission, Method::ChannelBind, Method::Send, Method::Data, Method::Connect, Method::ConnectionBind, Method::ConnectionAttempt] {
            for class in [StunClass::Request, StunClass::Indication, StunClass::SuccessResponse, StunClass::ErrorResponse] {
                let t = StunMessageType::new(class, method);
                let decoded = StunMessageType::from_u16(t.to_u16());
                assert_eq!(decoded.class, class);
                assert_eq!(decoded.method, method);
            }
        }
    }

    #[test]
    fn xor_address_round_trips_ipv4() {
        let addr: SocketAddr = "203.0.113.5:50000".parse().unwrap();
        let txn = [7u8; 12];
        let attr = Attribute::xor_peer_address(addr, &txn);
        assert_eq!(attr.as_xor_address(&txn).unwrap(), addr);
    }

    #[test]
    fn encode_decode_round_trips_an_allocate_request() {
        let mut msg = Message::request(Method::Allocate);
        msg.add_attribute(Attribute::requested_transport_udp());
        msg.add_attribute(Attribute::lifetime(600));
        let bytes = msg.encode();
        let decoded = Message::decode(bytes).unwrap();
        assert_eq!(decoded.msg_type, msg.msg_type);
        assert_eq!(decoded.transaction_id, msg.transaction_id);
        assert_eq!(decoded.get_attribute(AttributeType::Lifetime).unwrap().as_u32().unwrap(), 600);
    }

    #[test]
    fn decode_rejects_wrong_magic_cookie() {
        let mut msg = Message::request(Method::Allocate);
        msg.add_attribute(Attribute::lifetime(600));
        let mut bytes = msg.encode().to_vec();
        bytes[4] = 0;
        assert!(Message::decode(Bytes::from(bytes)).is_err());
    }

    #[test]
    fn looks_like_stun_distinguishes_from_channel_data() {
        assert!(looks_like_stun(0x00));
        assert!(!looks_like_stun(0x40));
    }
}
