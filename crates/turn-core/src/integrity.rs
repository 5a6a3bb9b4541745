//! RFC 5389 §10/§15.4 long-term credential mechanism: the
//! username:realm:password key derivation and the MESSAGE-INTEGRITY
//! HMAC that every request sends once a server has challenged the
//! client with a realm and nonce (the 401/438 path in
//! [`crate::session`]).
use bytes::Bytes;
use hmac::{Hmac, Mac};
use md5::{Digest, Md5};
use sha1::Sha1;

use crate::stun::{Attribute, AttributeType, Message};

type HmacSha1 = Hmac<Sha1>;

/// `key = MD5(username ":" realm ":" password)`, the long-term
/// credential key RFC 5389 §15.4 defines for computing
/// MESSAGE-INTEGRITY.
pub fn long_term_key(username: &str, realm: &str, password: &str) -> Vec<u8> {
    let mut hasher = Md5::new();
    hasher.update(format!("{username}:{realm}:{password}").as_bytes());
    hasher.finalize().to_vec()
}

/// Appends a MESSAGE-INTEGRITY attribute to `msg`, computed over the
/// message as it would be encoded with that attribute already present
/// (RFC 5389 §15.4: the STUN header's length field covers the
/// attribute being computed, but the HMAC itself excludes the
/// attribute's own 20-byte value). Must be the last attribute added
/// before encoding.
pub fn attach_message_integrity(msg: &mut Message, key: &[u8]) {
    msg.add_attribute(Attribute::new(AttributeType::MessageIntegrity, Bytes::from_static(&[0u8; 20])));
    let encoded = msg.encode();
    let mac_start = encoded.len() - 20;
    let mut mac = HmacSha1::new_from_slice(key).expect("HMAC accepts a key of any length");
    mac.update(&encoded[..mac_start]);
    let digest = mac.finalize().into_bytes();
    let last = msg.attributes.last_mut().expect("just pushed a MESSAGE-INTEGRITY attribute");
    last.value = Bytes::copy_from_slice(&digest);
}

/// Verifies a received message's MESSAGE-INTEGRITY attribute against
/// `key`, re-deriving the HMAC input the same way
/// [`attach_message_integrity`] built it: the message as encoded,
/// truncated to drop everything from the MESSAGE-INTEGRITY attribute's
/// value onward.
pub fn verify_message_integrity(msg: &Message, key: &[u8]) -> bool {
    let Some(received) = msg.get_attribute(AttributeType::MessageIntegrity) else { return false };
    if received.value.len() != 20 {
        return false;
    }
    let encoded = msg.encode();
    let Some(attr_offset) = find_message_integrity_offset(&encoded) else { return false };
    let mut mac = HmacSha1::new_from_slice(key).expect("HMAC accepts a key of any length");
    mac.update(&encoded[..attr_offset]);
    let expected = mac.finalize().into_bytes();
    expected.as_slice() == &received.value[..]
}

/// Walks the encoded attribute TLV stream to find the byte offset
/// where the MESSAGE-INTEGRITY attribute's 20-byte value begins (i.e.
/// everything before it, including its own 4-byte type+length header,
/// which the HMAC covers).
fn find_message_integrity_offset(encoded: &[u8]) -> Option<usize> {
    const HEADER_SIZE: usize = 20;
    let mut offset = HEADER_SIZE;
    while offset + 4 <= encoded.len() {
        let attr_type = u16::from_be_bytes([encoded[offset], encoded[offset + 1]]);
        let attr_len = u16::from_be_bytes([encoded[offset + 2], encoded[offset + 3]]) as usize;
        let value_start = offset + 4;
        if attr_type == u16::from(AttributeType::MessageIntegrity) {
            return Some(value_start);
        }
        let padded = attr_len + (4 - (attr_len % 4)) % 4;
        offset = value_start + padded;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stun::Method;

    #[test]
    fn long_term_key_is_deterministic_and_sensitive_to_every_field() {
        let a = long_term_key("alice", "example.com", "hunter2");
        let b = long_term_key("alice", "example.com", "hunter2");
        let c = long_term_key("alice", "example.org", "hunter2");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn attached_message_integrity_verifies_with_the_same_key_and_fails_with_a_different_one() {
        let key = long_term_key("alice", "example.com", "hunter2");
        let mut msg = Message::request(Method::Allocate);
        msg.add_attribute(Attribute::username("alice"));
        msg.add_attribute(Attribute::realm("example.com"));
        attach_message_integrity(&mut msg, &key);

        assert!(verify_message_integrity(&msg, &key));

        let wrong_key = long_term_key("alice", "example.com", "wrong-password");
        assert!(!verify_message_integrity(&msg, &wrong_key));
    }

    #[test]
    fn verify_fails_without_a_message_integrity_attribute() {
        let key = long_term_key("alice", "example.com", "hunter2");
        let msg = Message::request(Method::Allocate);
        assert!(!verify_message_integrity(&msg, &key));
    }
}
