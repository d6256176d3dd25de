use tracing::debug;

use crate::body::{analyse_body, extract_area};
use crate::dates::normalize_packet_date;
use crate::error::FormatError;
use crate::models::PktMessage;

/// Type 2 / 2+ packet header length.
pub const PKT_HEADER_LEN: usize = 58;

/// Routing/cost block following each message marker: ten little-endian u16s.
pub const MSG_FIELDS_LEN: usize = 20;

/// Routing fields of a packed message header. Read to walk the stream, not stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoutingFields {
    pub orig_node: u16,
    pub dest_node: u16,
    pub orig_net: u16,
    pub dest_net: u16,
    pub orig_zone: u16,
    pub dest_zone: u16,
    pub orig_point: u16,
    pub dest_point: u16,
    pub attr: u16,
    pub cost: u16,
}

struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(data: &'a [u8], pos: usize) -> Self {
        Self { data, pos }
    }

    fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    fn take(&mut self, len: usize, field: &'static str) -> Result<&'a [u8], FormatError> {
        if self.remaining() < len {
            return Err(FormatError::Truncated {
                field,
                offset: self.pos,
            });
        }
        let bytes = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    fn u16_le(&mut self, field: &'static str) -> Result<u16, FormatError> {
        let bytes = self.take(2, field)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    /// Bytes up to the next NUL; the cursor ends past the terminator.
    fn cstr(&mut self, field: &'static str) -> Result<&'a [u8], FormatError> {
        let rest = &self.data[self.pos.min(self.data.len())..];
        let Some(end) = rest.iter().position(|b| *b == 0) else {
            return Err(FormatError::Truncated {
                field,
                offset: self.pos,
            });
        };
        self.pos += end + 1;
        Ok(&rest[..end])
    }
}

/// ISO-8859-1: every byte is the code point of the same value.
pub fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

fn read_routing(cursor: &mut Cursor<'_>) -> Result<RoutingFields, FormatError> {
    let block = cursor.take(MSG_FIELDS_LEN, "message header")?;
    let word = |i: usize| u16::from_le_bytes([block[i * 2], block[i * 2 + 1]]);
    Ok(RoutingFields {
        orig_node: word(0),
        dest_node: word(1),
        orig_net: word(2),
        dest_net: word(3),
        orig_zone: word(4),
        dest_zone: word(5),
        orig_point: word(6),
        dest_point: word(7),
        attr: word(8),
        cost: word(9),
    })
}

/// Decodes every message of one packet file held fully in memory.
///
/// A marker of zero ends the packet. So does running out of data exactly where
/// a marker would start: a packet cut at a message boundary cannot be told apart
/// from a complete one, and both decode successfully.
pub fn decode_packet(source: &str, data: &[u8]) -> Result<Vec<PktMessage>, FormatError> {
    if data.len() < PKT_HEADER_LEN {
        return Err(FormatError::TooSmall {
            len: data.len(),
            header: PKT_HEADER_LEN,
        });
    }

    let mut cursor = Cursor::new(data, PKT_HEADER_LEN);
    let mut messages = Vec::new();
    let mut msg_index: u32 = 0;

    while cursor.remaining() >= 2 {
        let marker = cursor.u16_le("message type")?;
        if marker == 0 {
            break;
        }

        let routing = read_routing(&mut cursor)?;
        let date_bytes = cursor.cstr("date")?;
        let _to_name = cursor.cstr("to name")?;
        let from_bytes = cursor.cstr("from name")?;
        let subject_bytes = cursor.cstr("subject")?;
        let body_bytes = cursor.cstr("message body")?;

        let body = decode_latin1(body_bytes);
        let stats = analyse_body(&body);
        let date = normalize_packet_date(&decode_latin1(date_bytes));

        debug!(
            source,
            msg_index,
            orig_net = routing.orig_net,
            orig_node = routing.orig_node,
            body_bytes = body_bytes.len(),
            "decoded packet message"
        );

        messages.push(PktMessage {
            pkt_file: source.to_string(),
            msg_index,
            date_iso: date.iso,
            date_raw: date.raw.trim().to_string(),
            echo: extract_area(&body),
            size_bytes: body_bytes.len() as u64,
            msg_lines: stats.msg_lines,
            pct_quoted: stats.pct_quoted,
            from_name: decode_latin1(from_bytes).trim().to_string(),
            subject: decode_latin1(subject_bytes).trim().to_string(),
        });
        msg_index += 1;
    }

    Ok(messages)
}
