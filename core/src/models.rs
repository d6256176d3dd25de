use serde::{Deserialize, Serialize};

/// One decoded packet message, ready for insertion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PktMessage {
    pub pkt_file: String,
    pub msg_index: u32,
    pub date_iso: Option<String>,
    pub date_raw: String,
    pub echo: Option<String>,
    pub size_bytes: u64,
    pub msg_lines: u32,
    pub pct_quoted: Option<f64>,
    pub from_name: String,
    pub subject: String,
}

/// A row read back from `pkt_messages`. Every column but the rowid is `None`
/// both when NULL and when the store predates it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredMessage {
    pub id: i64,
    pub pkt_file: Option<String>,
    pub msg_index: Option<i64>,
    pub date_iso: Option<String>,
    pub date_raw: Option<String>,
    pub echo: Option<String>,
    pub size_bytes: Option<i64>,
    pub msg_lines: Option<i64>,
    pub pct_quoted: Option<f64>,
    pub from_name: Option<String>,
    pub subject: Option<String>,
    pub imported_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DateRange {
    pub min: Option<String>,
    pub max: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreOverview {
    pub total: i64,
    pub date_iso: Option<DateRange>,
    pub imported_at: Option<DateRange>,
    pub sample: Vec<StoredMessage>,
}

/// Outcome of importing one packet file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileImport {
    pub path: String,
    pub decoded: usize,
    pub inserted: usize,
}

impl FileImport {
    /// A source file may be removed only when every decoded message was newly
    /// stored by this run.
    pub fn deletion_allowed(&self) -> bool {
        self.inserted == self.decoded
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportSummary {
    pub files: usize,
    pub failed: usize,
    pub messages: usize,
    pub inserted: usize,
}
