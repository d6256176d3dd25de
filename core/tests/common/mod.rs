#![allow(dead_code)]

use pkt_index_core::models::PktMessage;

pub const HEADER_LEN: usize = 58;

pub struct TestMessage {
    pub date: String,
    pub from: String,
    pub subject: String,
    pub body: String,
}

impl TestMessage {
    pub fn new(date: &str, from: &str, subject: &str, body: &str) -> Self {
        Self {
            date: date.to_string(),
            from: from.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        }
    }

    pub fn in_area(area: &str, body: &str) -> Self {
        Self::new(
            "12 Dec 25  10:00:00",
            "Sysop",
            "Hello",
            &format!("\u{1}AREA:{area}\r{body}"),
        )
    }
}

pub fn push_message(buf: &mut Vec<u8>, msg: &TestMessage) {
    buf.extend_from_slice(&2u16.to_le_bytes());
    buf.extend_from_slice(&[0u8; 20]);
    for text in [
        msg.date.as_str(),
        "All",
        msg.from.as_str(),
        msg.subject.as_str(),
        msg.body.as_str(),
    ] {
        buf.extend_from_slice(text.as_bytes());
        buf.push(0);
    }
}

pub fn packet(messages: &[TestMessage]) -> Vec<u8> {
    let mut buf = vec![0u8; HEADER_LEN];
    for msg in messages {
        push_message(&mut buf, msg);
    }
    buf.extend_from_slice(&0u16.to_le_bytes());
    buf
}

pub fn stored(pkt_file: &str, msg_index: u32, date_iso: &str, echo: Option<&str>) -> PktMessage {
    PktMessage {
        pkt_file: pkt_file.to_string(),
        msg_index,
        date_iso: Some(date_iso.to_string()),
        date_raw: String::new(),
        echo: echo.map(str::to_string),
        size_bytes: 100,
        msg_lines: 5,
        pct_quoted: Some(20.0),
        from_name: "Sysop".to_string(),
        subject: "Hello".to_string(),
    }
}
