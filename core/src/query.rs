use rusqlite::params;

use crate::db::PktStore;
use crate::error::CoreError;
use crate::migrations::MESSAGES_TABLE;
use crate::models::{DateRange, StoreOverview, StoredMessage};

fn require_messages(store: &PktStore) -> Result<(), CoreError> {
    if store.caps.has_messages {
        Ok(())
    } else {
        Err(CoreError::InvalidArgument(format!(
            "no table '{}' in {}",
            MESSAGES_TABLE,
            store.path.display()
        )))
    }
}

pub fn count_messages(store: &PktStore) -> Result<i64, CoreError> {
    require_messages(store)?;
    Ok(store
        .conn
        .query_row("SELECT COUNT(*) FROM pkt_messages;", [], |row| row.get(0))?)
}

/// MIN/MAX of a text column over non-NULL values, or `None` if the column is absent.
pub fn column_range(store: &PktStore, column: &str) -> Result<Option<DateRange>, CoreError> {
    require_messages(store)?;
    if !store.caps.has_column(column) {
        return Ok(None);
    }
    let range = store.conn.query_row(
        &format!(
            "SELECT MIN({column}), MAX({column}) FROM pkt_messages WHERE {column} IS NOT NULL;"
        ),
        [],
        |row| {
            Ok(DateRange {
                min: row.get(0)?,
                max: row.get(1)?,
            })
        },
    )?;
    Ok(Some(range))
}

/// Rows in insertion order. Columns missing from older stores read as `None`.
pub fn list_messages(store: &PktStore, limit: i64, offset: i64) -> Result<Vec<StoredMessage>, CoreError> {
    require_messages(store)?;
    let caps = &store.caps;
    let sql = format!(
        "SELECT rowid, {pkt_file}, {msg_index}, {date_iso}, {date_raw}, {echo}, {size_bytes}, \
                {msg_lines}, {pct_quoted}, {from_name}, {subject}, {imported_at} \
         FROM pkt_messages \
         ORDER BY rowid ASC \
         LIMIT ?1 OFFSET ?2;",
        pkt_file = caps.column_or_null("pkt_file"),
        msg_index = caps.column_or_null("msg_index"),
        date_iso = caps.column_or_null("date_iso"),
        date_raw = caps.column_or_null("date_raw"),
        echo = caps.column_or_null("echo"),
        size_bytes = caps.column_or_null("size_bytes"),
        msg_lines = caps.column_or_null("msg_lines"),
        pct_quoted = caps.column_or_null("pct_quoted"),
        from_name = caps.column_or_null("from_name"),
        subject = caps.column_or_null("subject"),
        imported_at = caps.column_or_null("imported_at"),
    );
    let mut stmt = store.conn.prepare(&sql)?;
    let rows = stmt.query_map(params![limit, offset], |row| {
        Ok(StoredMessage {
            id: row.get(0)?,
            pkt_file: row.get(1)?,
            msg_index: row.get(2)?,
            date_iso: row.get(3)?,
            date_raw: row.get(4)?,
            echo: row.get(5)?,
            size_bytes: row.get(6)?,
            msg_lines: row.get(7)?,
            pct_quoted: row.get(8)?,
            from_name: row.get(9)?,
            subject: row.get(10)?,
            imported_at: row.get(11)?,
        })
    })?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

pub fn inspect_store(store: &PktStore, limit: i64) -> Result<StoreOverview, CoreError> {
    let total = count_messages(store)?;
    if total == 0 {
        return Ok(StoreOverview {
            total,
            date_iso: None,
            imported_at: None,
            sample: Vec::new(),
        });
    }
    Ok(StoreOverview {
        total,
        date_iso: column_range(store, "date_iso")?,
        imported_at: column_range(store, "imported_at")?,
        sample: list_messages(store, limit, 0)?,
    })
}
