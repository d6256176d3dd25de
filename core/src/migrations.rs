pub const SCHEMA_VERSION: &str = "2";

pub const MESSAGES_TABLE: &str = "pkt_messages";

pub const META_TABLE: &str = "meta";

pub const BASE_SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS pkt_messages (
      id INTEGER PRIMARY KEY AUTOINCREMENT,
      pkt_file TEXT NOT NULL,
      msg_index INTEGER NOT NULL,
      date_iso TEXT,
      date_raw TEXT,
      echo TEXT,
      size_bytes INTEGER NOT NULL,
      msg_lines INTEGER,
      pct_quoted REAL,
      from_name TEXT,
      subject TEXT,
      imported_at TEXT NOT NULL DEFAULT (datetime('now'))
    );

    CREATE UNIQUE INDEX IF NOT EXISTS idx_pkt_unique
      ON pkt_messages(pkt_file, msg_index);
    CREATE INDEX IF NOT EXISTS idx_pkt_date ON pkt_messages(date_iso);
    CREATE INDEX IF NOT EXISTS idx_pkt_echo ON pkt_messages(echo);

    CREATE TABLE IF NOT EXISTS meta (
      key TEXT PRIMARY KEY,
      value TEXT
    );
    "#;

/// Body statistics columns added in schema version 2. Stores written before
/// then have `pkt_messages` without them.
pub const STAT_COLUMNS: &[(&str, &str)] = &[("msg_lines", "INTEGER"), ("pct_quoted", "REAL")];

/// Columns every version of `pkt_messages` is expected to carry.
pub const BASE_COLUMNS: &[&str] = &[
    "pkt_file",
    "msg_index",
    "date_iso",
    "date_raw",
    "echo",
    "size_bytes",
    "from_name",
    "subject",
    "imported_at",
];
