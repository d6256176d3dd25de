mod common;

use common::{packet, stored, TestMessage};
use pkt_index_core::db::store_from_connection;
use pkt_index_core::importer::{import_bytes, store_messages};
use pkt_index_core::migrations::BASE_COLUMNS;
use pkt_index_core::query::{count_messages, inspect_store, list_messages};
use pkt_index_core::{open_store, open_store_read_only};
use rusqlite::Connection;
use tempfile::tempdir;

#[test]
fn inspect_reports_ranges_and_sample_in_insert_order() {
    let mut store = open_store(":memory:").expect("store");
    store_messages(
        &mut store,
        &[
            stored("b.pkt", 0, "2025-12-14 08:00:00", Some("B")),
            stored("a.pkt", 0, "2025-12-12 10:00:00", Some("A")),
            stored("a.pkt", 1, "2025-12-16 23:00:00", None),
        ],
    )
    .expect("insert");

    let overview = inspect_store(&store, 2).expect("inspect");
    assert_eq!(overview.total, 3);
    let dates = overview.date_iso.expect("date range");
    assert_eq!(dates.min.as_deref(), Some("2025-12-12 10:00:00"));
    assert_eq!(dates.max.as_deref(), Some("2025-12-16 23:00:00"));
    assert!(overview.imported_at.expect("imported range").min.is_some());

    assert_eq!(overview.sample.len(), 2);
    assert_eq!(overview.sample[0].pkt_file.as_deref(), Some("b.pkt"));
    assert_eq!(overview.sample[1].pkt_file.as_deref(), Some("a.pkt"));
    assert_eq!(overview.sample[0].msg_lines, Some(5));
    assert_eq!(overview.sample[0].pct_quoted, Some(20.0));
}

#[test]
fn empty_store_has_no_ranges() {
    let store = open_store(":memory:").expect("store");
    let overview = inspect_store(&store, 20).expect("inspect");
    assert_eq!(overview.total, 0);
    assert!(overview.date_iso.is_none());
    assert!(overview.sample.is_empty());
    assert!(store.caps.missing_columns(BASE_COLUMNS).is_empty());
}

#[test]
fn store_without_message_table_is_reported() {
    let store = store_from_connection(Connection::open_in_memory().expect("db"), false)
        .expect("wrap");
    assert!(!store.caps.has_messages);
    assert!(count_messages(&store).is_err());
    assert!(list_messages(&store, 5, 0).is_err());
}

#[test]
fn read_only_store_sees_imported_rows() {
    let tmp = tempdir().expect("temp");
    let path = tmp.path().join("pkt_index.db");
    {
        let mut store = open_store(&path).expect("store");
        let data = packet(&[
            TestMessage::in_area("ONE", "a\r"),
            TestMessage::in_area("TWO", "b\r"),
        ]);
        import_bytes(&mut store, "x.pkt", &data).expect("import");
    }
    let store = open_store_read_only(&path).expect("read only");
    let rows = list_messages(&store, 10, 0).expect("rows");
    let areas: Vec<_> = rows.iter().map(|r| r.echo.clone().unwrap_or_default()).collect();
    assert_eq!(areas, vec!["ONE", "TWO"]);
    assert_eq!(rows[1].msg_index, Some(1));
}

#[test]
fn legacy_table_without_message_index_is_inspected() {
    let tmp = tempdir().expect("temp");
    let path = tmp.path().join("legacy.db");
    {
        let conn = Connection::open(&path).expect("db");
        conn.execute_batch(
            "CREATE TABLE pkt_messages (id INTEGER PRIMARY KEY, pkt_file TEXT, date_iso TEXT, echo TEXT);
             INSERT INTO pkt_messages (pkt_file, date_iso, echo)
             VALUES ('old.pkt', '2024-03-01 12:00:00', 'OLD.AREA');",
        )
        .expect("legacy schema");
    }

    let store = open_store_read_only(&path).expect("read only");
    let missing = store.caps.missing_columns(BASE_COLUMNS);
    assert!(missing.iter().any(|c| c == "msg_index"));

    let overview = inspect_store(&store, 5).expect("inspect");
    assert_eq!(overview.total, 1);
    assert!(overview.imported_at.is_none());
    let row = &overview.sample[0];
    assert_eq!(row.pkt_file.as_deref(), Some("old.pkt"));
    assert_eq!(row.msg_index, None);
    assert_eq!(row.echo.as_deref(), Some("OLD.AREA"));
    assert_eq!(row.from_name, None);
}
