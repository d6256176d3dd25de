use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("packet format error: {0}")]
    Format(#[from] FormatError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// Structural failures while walking a packet buffer.
///
/// Text content can never fail to decode, so these are the only ways a packet
/// is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("packet is {len} bytes, shorter than the {header}-byte header")]
    TooSmall { len: usize, header: usize },
    #[error("truncated {field} at offset {offset}")]
    Truncated { field: &'static str, offset: usize },
}
