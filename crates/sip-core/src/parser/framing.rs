use crate::error::{Error, SyntaxKind};

/// How a transport delivers message boundaries: a datagram transport
/// hands the framer one whole message per read (UDP), a stream
/// transport (TCP/TLS) hands it an arbitrary byte run that the framer
/// must split on `Content-Length`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramingMode {
    Datagram,
    Stream,
}

/// Determines how many bytes of `buf` make up one complete message.
///
/// - `Datagram`: the whole buffer is one message; always returns
///   `buf.len()` (a transport layer is responsible for handing the
///   framer exactly one packet at a time).
/// - `Stream`: scans for the header/body boundary, reads the header
///   block's `Content-Length`, and returns the total length once enough
///   bytes have arrived. Returns [`Error::NeedMoreData`] if the buffer
///   doesn't yet contain a full header block, or if it does but not
///   enough body bytes have arrived yet.
pub fn message_length(buf: &[u8], mode: FramingMode) -> Result<usize, Error> {
    match mode {
        FramingMode::Datagram => Ok(buf.len()),
        FramingMode::Stream => stream_message_length(buf),
    }
}

fn stream_message_length(buf: &[u8]) -> Result<usize, Error> {
    let boundary = find_subslice(buf, b"\r\n\r\n")
        .map(|idx| (idx, 4))
        .or_else(|| find_subslice(buf, b"\n\n").map(|idx| (idx, 2)));

    let Some((header_end, sep_len)) = boundary else {
        return Err(Error::NeedMoreData);
    };

    let header_block = std::str::from_utf8(&buf[..header_end])
        .map_err(|e| Error::syntax(SyntaxKind::Framing, e.to_string()))?;

    let content_length = find_content_length(header_block)
        .ok_or_else(|| Error::syntax(SyntaxKind::MissingRequired, "stream message missing Content-Length"))?;

    let total = header_end + sep_len + content_length as usize;
    if buf.len() < total {
        Err(Error::NeedMoreData)
    } else {
        Ok(total)
    }
}

fn find_content_length(header_block: &str) -> Option<u32> {
    for raw_line in header_block.split('\n') {
        let line = raw_line.strip_suffix('\r').unwrap_or(raw_line);
        if let Some(colon) = line.find(':') {
            let name = line[..colon].trim();
            if name.eq_ignore_ascii_case("content-length") || name.eq_ignore_ascii_case("l") {
                return line[colon + 1..].trim().parse().ok();
            }
        }
    }
    None
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn datagram_mode_takes_whole_buffer() {
        let buf = b"whatever is in here";
        assert_eq!(message_length(buf, FramingMode::Datagram).unwrap(), buf.len());
    }

    #[test]
    fn stream_mode_needs_more_data_without_full_headers() {
        let buf = b"SIP/2.0 200 OK\r\nContent-Length: 5";
        assert!(matches!(message_length(buf, FramingMode::Stream), Err(Error::NeedMoreData)));
    }

    #[test]
    fn stream_mode_reports_complete_length_once_body_arrives() {
        let buf = b"SIP/2.0 200 OK\r\nContent-Length: 5\r\n\r\nhello";
        assert_eq!(message_length(buf, FramingMode::Stream).unwrap(), buf.len());
    }

    #[test]
    fn stream_mode_waits_for_rest_of_body() {
        let buf = b"SIP/2.0 200 OK\r\nContent-Length: 10\r\n\r\nhel";
        assert!(matches!(message_length(buf, FramingMode::Stream), Err(Error::NeedMoreData)));
    }
}
