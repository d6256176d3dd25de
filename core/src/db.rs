use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use serde::Serialize;
use tracing::info;

use crate::error::CoreError;
use crate::migrations::{BASE_SCHEMA, MESSAGES_TABLE, META_TABLE, SCHEMA_VERSION, STAT_COLUMNS};

/// What an opened store can answer, probed once at open time.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StoreCapabilities {
    pub has_messages: bool,
    pub has_meta: bool,
    pub schema_version: Option<String>,
    pub columns: Vec<String>,
    pub msg_lines: bool,
    pub pct_quoted: bool,
    pub date_iso: bool,
    pub date_raw: bool,
    pub imported_at: bool,
    pub size_bytes: bool,
}

impl StoreCapabilities {
    pub fn probe(conn: &Connection) -> Result<Self, CoreError> {
        let has_messages = table_exists(conn, MESSAGES_TABLE)?;
        let has_meta = table_exists(conn, META_TABLE)?;
        let columns = if has_messages {
            table_columns(conn, MESSAGES_TABLE)?
        } else {
            Vec::new()
        };
        let schema_version = if has_meta {
            read_schema_version(conn)?
        } else {
            None
        };
        let has = |name: &str| columns.iter().any(|c| c == name);
        Ok(Self {
            has_messages,
            has_meta,
            schema_version,
            msg_lines: has("msg_lines"),
            pct_quoted: has("pct_quoted"),
            date_iso: has("date_iso"),
            date_raw: has("date_raw"),
            imported_at: has("imported_at"),
            size_bytes: has("size_bytes"),
            columns,
        })
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    /// Expected columns the store lacks, sorted.
    pub fn missing_columns(&self, expected: &[&str]) -> Vec<String> {
        let mut missing: Vec<String> = expected
            .iter()
            .filter(|c| !self.has_column(c))
            .map(|c| c.to_string())
            .collect();
        missing.sort();
        missing
    }

    /// SQL expression dating a row: first non-empty of `date_iso`,
    /// `imported_at`, `date_raw`, restricted to the columns present.
    pub fn date_expression(&self) -> Option<String> {
        let parts: Vec<String> = [
            (self.date_iso, "date_iso"),
            (self.imported_at, "imported_at"),
            (self.date_raw, "date_raw"),
        ]
        .iter()
        .filter(|(present, _)| *present)
        .map(|(_, col)| format!("NULLIF(TRIM({col}),'')"))
        .collect();
        if parts.is_empty() {
            None
        } else {
            Some(format!("COALESCE({})", parts.join(", ")))
        }
    }

    /// Column name if present, otherwise a literal NULL for SELECT lists.
    pub fn column_or_null<'a>(&self, name: &'a str) -> &'a str {
        if self.has_column(name) {
            name
        } else {
            "NULL"
        }
    }
}

/// Open handle on a packet message store. The connection closes on drop.
pub struct PktStore {
    pub path: PathBuf,
    pub conn: Connection,
    pub caps: StoreCapabilities,
}

/// Opens (creating if needed) a store for writing and brings its schema up to date.
pub fn open_store(path: impl AsRef<Path>) -> Result<PktStore, CoreError> {
    let path = path.as_ref().to_path_buf();
    let mut conn = Connection::open(&path)?;
    conn.busy_timeout(Duration::from_secs(5))?;
    conn.execute_batch(
        "PRAGMA journal_mode = WAL; \
         PRAGMA synchronous = NORMAL; \
         PRAGMA temp_store = MEMORY;",
    )?;
    apply_migrations(&mut conn)?;
    let caps = StoreCapabilities::probe(&conn)?;
    Ok(PktStore { path, conn, caps })
}

/// Opens an existing store without touching its schema. Older layouts are
/// described by the capabilities instead of being upgraded.
pub fn open_store_read_only(path: impl AsRef<Path>) -> Result<PktStore, CoreError> {
    let path = path.as_ref().to_path_buf();
    if !path.exists() {
        return Err(CoreError::InvalidArgument(format!(
            "store not found: {}",
            path.display()
        )));
    }
    let conn = Connection::open_with_flags(
        &path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?;
    conn.busy_timeout(Duration::from_secs(5))?;
    let caps = StoreCapabilities::probe(&conn)?;
    Ok(PktStore { path, conn, caps })
}

/// Wraps an already open connection, e.g. an in-memory store in tests.
pub fn store_from_connection(mut conn: Connection, migrate: bool) -> Result<PktStore, CoreError> {
    if migrate {
        apply_migrations(&mut conn)?;
    }
    let caps = StoreCapabilities::probe(&conn)?;
    Ok(PktStore {
        path: PathBuf::from(":memory:"),
        conn,
        caps,
    })
}

/// Creates missing tables, adds the statistics columns to stores that predate
/// them, and stamps the schema version. Existing rows are left as they are;
/// running it again on a current store changes nothing.
pub fn apply_migrations(conn: &mut Connection) -> Result<(), CoreError> {
    let tx = conn.transaction()?;
    tx.execute_batch(BASE_SCHEMA)?;

    let previous = read_schema_version(&tx)?;
    let existing = table_columns(&tx, MESSAGES_TABLE)?;
    for (column, sql_type) in STAT_COLUMNS {
        if existing.iter().any(|c| c == column) {
            continue;
        }
        tx.execute_batch(&format!(
            "ALTER TABLE {MESSAGES_TABLE} ADD COLUMN {column} {sql_type};"
        ))?;
        info!(column, "added statistics column to legacy store");
    }

    tx.execute(
        "INSERT INTO meta (key, value) VALUES ('schema_version', ?1) \
         ON CONFLICT(key) DO UPDATE SET value = excluded.value;",
        params![SCHEMA_VERSION],
    )?;
    tx.commit()?;

    if previous.as_deref() != Some(SCHEMA_VERSION) {
        info!(
            from = previous.as_deref().unwrap_or("none"),
            to = SCHEMA_VERSION,
            "store schema version updated"
        );
    }
    Ok(())
}

pub fn read_schema_version(conn: &Connection) -> Result<Option<String>, CoreError> {
    let value: Option<Option<String>> = conn
        .query_row(
            "SELECT value FROM meta WHERE key = 'schema_version';",
            [],
            |row| row.get(0),
        )
        .optional()?;
    Ok(value.flatten())
}

pub fn table_exists(conn: &Connection, name: &str) -> Result<bool, CoreError> {
    let exists: Option<String> = conn
        .query_row(
            "SELECT name FROM sqlite_master WHERE type='table' AND name = ?1;",
            params![name],
            |row| row.get(0),
        )
        .optional()?;
    Ok(exists.is_some())
}

pub fn table_columns(conn: &Connection, table: &str) -> Result<Vec<String>, CoreError> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({});", table))?;
    let mut rows = stmt.query([])?;
    let mut columns = Vec::new();
    while let Some(row) = rows.next()? {
        columns.push(row.get(1)?);
    }
    Ok(columns)
}
