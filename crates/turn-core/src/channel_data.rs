//! RFC 5766 §11.4 ChannelData framing: a 4-byte header (channel number,
//! payload length) followed by the payload, padded to a 4-byte boundary
//! on stream transports (TCP/TLS). UDP carries the frame unpadded.
use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{Error, Result};

pub const HEADER_SIZE: usize = 4;
pub const CHANNEL_NUMBER_MIN: u16 = 0x4000;
pub const CHANNEL_NUMBER_MAX: u16 = 0x7FFE;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelData {
    pub channel: u16,
    pub data: Bytes,
}

impl ChannelData {
    pub fn new(channel: u16, data: impl Into<Bytes>) -> Self {
        ChannelData { channel, data: data.into() }
    }

    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(HEADER_SIZE + padded_len(self.data.len()));
        buf.put_u16(self.channel);
        buf.put_u16(self.data.len() as u16);
        buf.put_slice(&self.data);
        for _ in 0..(padded_len(self.data.len()) - self.data.len()) {
            buf.put_u8(0);
        }
        buf.freeze()
    }

    /// Decodes a single frame from a UDP datagram, where the datagram
    /// boundary is the frame boundary and no padding is present.
    pub fn decode_datagram(mut bytes: Bytes) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(Error::Syntax("ChannelData frame shorter than its 4-byte header".to_string()));
        }
        let channel = bytes.get_u16();
        let length = bytes.get_u16() as usize;
        if bytes.remaining() < length {
            return Err(Error::Syntax("ChannelData frame shorter than its declared length".to_string()));
        }
        Ok(ChannelData { channel, data: bytes.slice(0..length) })
    }

    /// Decodes one frame off a stream buffer, returning the frame and
    /// the number of bytes consumed (header + padded payload), or
    /// `None` if the buffer doesn't yet hold a complete frame.
    pub fn decode_stream(bytes: &[u8]) -> Result<Option<(Self, usize)>> {
        if bytes.len() < HEADER_SIZE {
            return Ok(None);
        }
        let channel = u16::from_be_bytes([bytes[0], bytes[1]]);
        let length = u16::from_be_bytes([bytes[2], bytes[3]]) as usize;
        let padded = padded_len(length);
        let total = HEADER_SIZE + padded;
        if bytes.len() < total {
            return Ok(None);
        }
        let data = Bytes::copy_from_slice(&bytes[HEADER_SIZE..HEADER_SIZE + length]);
        Ok(Some((ChannelData { channel, data }, total)))
    }
}

pub fn is_channel_number(n: u16) -> bool {
    (CHANNEL_NUMBER_MIN..=CHANNEL_NUMBER_MAX).contains(&n)
}

fn padded_len(len: usize) -> usize {
    len + (4 - (len % 4)) % 4
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn datagram_round_trip() {
        let frame = ChannelData::new(0x4001, Bytes::from_static(b"hello"));
        let encoded = frame.encode();
        let decoded = ChannelData::decode_datagram(encoded).unwrap();
        assert_eq!(decoded.channel, 0x4001);
        assert_eq!(&decoded.data[..], b"hello");
    }

    #[test]
    fn stream_decode_reports_padded_consumed_length() {
        let frame = ChannelData::new(0x4001, Bytes::from_static(b"hi"));
        let encoded = frame.encode();
        assert_eq!(encoded.len(), HEADER_SIZE + 4); // "hi" padded to 4 bytes
        let (decoded, consumed) = ChannelData::decode_stream(&encoded).unwrap().unwrap();
        assert_eq!(consumed, encoded.len());
        assert_eq!(&decoded.data[..], b"hi");
    }

    #[test]
    fn stream_decode_waits_for_more_bytes() {
        let frame = ChannelData::new(0x4001, Bytes::from_static(b"hello world"));
        let encoded = frame.encode();
        let partial = &encoded[..encoded.len() - 1];
        assert!(ChannelData::decode_stream(partial).unwrap().is_none());
    }

    #[test]
    fn channel_number_range_matches_rfc_5766() {
        assert!(is_channel_number(0x4000));
        assert!(is_channel_number(0x7FFE));
        assert!(!is_channel_number(0x3FFF));
        assert!(!is_channel_number(0x7FFF));
    }
}
