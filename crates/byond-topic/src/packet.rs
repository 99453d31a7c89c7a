//! Topic packet framing.
//!
//! Request: `00 83 <len:u16be> 00 00 00 00 00 ?<query> 00`, where `len`
//! counts everything after the length field.
//!
//! Response: `00 83 <len:u16be> <type> <body>`, where `type` is one of
//! null (`0x00`), little-endian f32 (`0x2a`) or NUL-terminated text (`0x06`).

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{TopicError, TopicResult};

/// Leading bytes of every topic packet.
pub const MAGIC: [u8; 2] = [0x00, 0x83];

/// Size of the fixed header (magic + length).
pub const HEADER_LEN: usize = 4;

const PADDING: usize = 5;

const TYPE_NULL: u8 = 0x00;
const TYPE_FLOAT: u8 = 0x2a;
const TYPE_TEXT: u8 = 0x06;

/// A decoded topic response.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Null,
    Float(f32),
    Text(Vec<u8>),
}

impl Response {
    /// Short name of the response kind, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Response::Null => "null",
            Response::Float(_) => "float",
            Response::Text(_) => "text",
        }
    }

    /// Flatten the response into raw bytes.
    ///
    /// Floats are rendered as decimal text, null becomes an empty body.
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Response::Null => Vec::new(),
            Response::Float(f) => f.to_string().into_bytes(),
            Response::Text(text) => text,
        }
    }
}

/// Frame a query into a topic request packet.
///
/// A leading `?` is added when the query does not already start with one.
pub fn encode_query(query: &[u8]) -> TopicResult<Bytes> {
    let needs_prefix = !query.starts_with(b"?");
    let framed_len = PADDING + usize::from(needs_prefix) + query.len() + 1;
    let len = u16::try_from(framed_len).map_err(|_| TopicError::QueryTooLong(query.len()))?;

    let mut buf = BytesMut::with_capacity(HEADER_LEN + framed_len);
    buf.put_slice(&MAGIC);
    buf.put_u16(len);
    buf.put_bytes(0, PADDING);
    if needs_prefix {
        buf.put_u8(b'?');
    }
    buf.put_slice(query);
    buf.put_u8(0);
    Ok(buf.freeze())
}

/// Validate a response header and return the body length it announces.
pub fn decode_header(header: &[u8; HEADER_LEN]) -> TopicResult<usize> {
    if header[..2] != MAGIC {
        return Err(TopicError::Malformed(format!(
            "unexpected header bytes {:02x} {:02x}",
            header[0], header[1]
        )));
    }
    let mut len = &header[2..];
    Ok(len.get_u16() as usize)
}

/// Decode a response body (type byte + payload).
pub fn decode_body(body: &[u8]) -> TopicResult<Response> {
    let (&kind, rest) = body
        .split_first()
        .ok_or_else(|| TopicError::Malformed("empty response body".to_string()))?;

    match kind {
        TYPE_NULL => Ok(Response::Null),
        TYPE_FLOAT => {
            if rest.len() < 4 {
                return Err(TopicError::Malformed(format!(
                    "float response carries {} bytes",
                    rest.len()
                )));
            }
            let mut payload = rest;
            Ok(Response::Float(payload.get_f32_le()))
        }
        TYPE_TEXT => {
            let end = rest.iter().position(|&b| b == 0).unwrap_or(rest.len());
            Ok(Response::Text(rest[..end].to_vec()))
        }
        other => Err(TopicError::Malformed(format!(
            "unknown response type 0x{other:02x}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_adds_question_mark() {
        let packet = encode_query(b"prometheus_metrics").unwrap();

        let mut expected = vec![0x00, 0x83, 0x00, 0x19, 0, 0, 0, 0, 0, b'?'];
        expected.extend_from_slice(b"prometheus_metrics");
        expected.push(0);
        assert_eq!(&packet[..], &expected[..]);
    }

    #[test]
    fn encode_keeps_existing_prefix() {
        let packet = encode_query(b"?ping").unwrap();
        assert_eq!(packet.len(), HEADER_LEN + 5 + 5 + 1);
        assert_eq!(&packet[9..14], b"?ping");
        assert_eq!(packet[3] as usize, packet.len() - HEADER_LEN);
    }

    #[test]
    fn encode_rejects_oversized_query() {
        let query = vec![b'a'; u16::MAX as usize];
        let err = encode_query(&query).unwrap_err();
        assert!(matches!(err, TopicError::QueryTooLong(n) if n == u16::MAX as usize));
    }

    #[test]
    fn header_length_is_big_endian() {
        assert_eq!(decode_header(&[0x00, 0x83, 0x01, 0x02]).unwrap(), 0x0102);
    }

    #[test]
    fn header_with_bad_magic_is_rejected() {
        let err = decode_header(&[0x12, 0x34, 0x00, 0x01]).unwrap_err();
        assert!(matches!(err, TopicError::Malformed(_)));
    }

    #[test]
    fn text_body_strips_terminator() {
        let response = decode_body(b"\x06[1,2]\x00").unwrap();
        assert_eq!(response, Response::Text(b"[1,2]".to_vec()));
        assert_eq!(response.into_bytes(), b"[1,2]");
    }

    #[test]
    fn float_body_renders_as_decimal() {
        let mut body = vec![TYPE_FLOAT];
        body.extend_from_slice(&1.5f32.to_le_bytes());
        let response = decode_body(&body).unwrap();
        assert_eq!(response, Response::Float(1.5));
        assert_eq!(response.into_bytes(), b"1.5");
    }

    #[test]
    fn truncated_float_is_malformed() {
        assert!(matches!(
            decode_body(&[TYPE_FLOAT, 0x00]),
            Err(TopicError::Malformed(_))
        ));
    }

    #[test]
    fn null_body_is_empty() {
        let response = decode_body(&[TYPE_NULL]).unwrap();
        assert_eq!(response.kind(), "null");
        assert!(response.into_bytes().is_empty());
    }

    #[test]
    fn unknown_type_is_malformed() {
        assert!(matches!(decode_body(&[0x7f]), Err(TopicError::Malformed(_))));
        assert!(matches!(decode_body(&[]), Err(TopicError::Malformed(_))));
    }
}
