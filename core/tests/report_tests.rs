mod common;

use std::fs;

use common::stored;
use pkt_index_core::importer::store_messages;
use pkt_index_core::models::PktMessage;
use pkt_index_core::report::{
    area_summary, load_area_list, resolve_range, store_date_bounds, top_report, AreaFilters,
    Bucket, Period, RangeSelection, DEFAULT_TOP_LIMIT,
};
use pkt_index_core::{open_store, PktStore};
use tempfile::tempdir;

fn seeded_store() -> PktStore {
    let mut store = open_store(":memory:").expect("store");
    store_messages(
        &mut store,
        &[
            stored("a.pkt", 0, "2025-12-12 10:00:00", Some("IRL.CHAT")),
            stored("a.pkt", 1, "2025-12-12 18:00:00", Some("IRL.CHAT")),
            stored("a.pkt", 2, "2025-12-14 09:00:00", Some("FIDO.TEST")),
            stored("b.pkt", 0, "2025-12-15 09:00:00", None),
            stored("b.pkt", 1, "2025-12-17 07:30:00", Some("IRL.CHAT")),
        ],
    )
    .expect("seed");
    store
}

fn full_range(store: &PktStore) -> pkt_index_core::report::ReportRange {
    let bounds = store_date_bounds(store).expect("bounds");
    resolve_range(
        &RangeSelection::Explicit { from: None, to: None },
        bounds.as_ref(),
    )
    .expect("range")
}

#[test]
fn daily_summary_counts_each_row_once() {
    let store = seeded_store();
    let range = full_range(&store);
    let report = area_summary(&store, &range, Period::Auto, &AreaFilters::default()).expect("report");

    assert_eq!(report.buckets.len(), 6);
    assert!(matches!(report.buckets[0], Bucket::Day(_)));
    let names: Vec<_> = report.rows.iter().map(|r| r.area.as_str()).collect();
    assert_eq!(names, vec!["FIDO.TEST", "IRL.CHAT", "UNKNOWN"]);

    let chat = &report.rows[1];
    assert_eq!(chat.counts, vec![2, 0, 0, 0, 0, 1]);
    assert_eq!(chat.total, 3);
    assert_eq!(report.grand_total, 5);
    assert_eq!(report.totals, vec![2, 0, 1, 1, 0, 1]);
    assert_eq!(report.totals.iter().sum::<u64>(), report.grand_total);
    assert_eq!(report.bad_dates, 0);
}

#[test]
fn monthly_summary_uses_seasonal_columns() {
    let store = seeded_store();
    let range = full_range(&store);
    let report = area_summary(&store, &range, Period::Month, &AreaFilters::default()).expect("report");
    assert_eq!(report.buckets.len(), 7);
    assert_eq!(report.buckets[3], Bucket::Month(12));
    let chat = report.rows.iter().find(|r| r.area == "IRL.CHAT").expect("chat");
    assert_eq!(chat.counts, vec![0, 0, 0, 3, 0, 0, 0]);
}

#[test]
fn filters_add_restrict_and_exclude_areas() {
    let store = seeded_store();
    let range = full_range(&store);

    let filters = AreaFilters {
        known: vec!["QUIET.AREA".to_string()],
        ..Default::default()
    };
    let report = area_summary(&store, &range, Period::Day, &filters).expect("report");
    let quiet = report.rows.iter().find(|r| r.area == "QUIET.AREA").expect("quiet row");
    assert_eq!(quiet.total, 0);
    assert_eq!(report.rows.len(), 4);

    let filters = AreaFilters {
        only: vec!["IRL.CHAT".to_string(), "NEW.AREA".to_string()],
        exclude: vec!["NEW.AREA".to_string()],
        ..Default::default()
    };
    let report = area_summary(&store, &range, Period::Day, &filters).expect("report");
    let names: Vec<_> = report.rows.iter().map(|r| r.area.as_str()).collect();
    assert_eq!(names, vec!["IRL.CHAT"]);
    assert_eq!(report.grand_total, 3);
}

#[test]
fn narrowed_range_drops_out_of_range_rows() {
    let store = seeded_store();
    let bounds = store_date_bounds(&store).expect("bounds");
    let range = resolve_range(
        &RangeSelection::Explicit {
            from: Some("2025-12-13".to_string()),
            to: Some("2025-12-15".to_string()),
        },
        bounds.as_ref(),
    )
    .expect("range");
    let report = area_summary(&store, &range, Period::Auto, &AreaFilters::default()).expect("report");
    assert_eq!(report.buckets.len(), 3);
    assert_eq!(report.grand_total, 2);
}

#[test]
fn unparseable_dates_are_counted_not_fatal() {
    let mut store = open_store(":memory:").expect("store");
    store_messages(
        &mut store,
        &[
            stored("c.pkt", 0, "2025-06-31 10:00:00", Some("ODD")),
            stored("c.pkt", 1, "2025-12-12 10:00:00", Some("OK")),
        ],
    )
    .expect("seed");

    let bounds = store_date_bounds(&store).expect("bounds");
    let range = resolve_range(
        &RangeSelection::Explicit {
            from: Some("2025-01-01".to_string()),
            to: Some("2025-12-31".to_string()),
        },
        bounds.as_ref(),
    )
    .expect("range");
    let report = area_summary(&store, &range, Period::Month, &AreaFilters::default()).expect("report");
    assert_eq!(report.grand_total, 1);
    assert_eq!(report.bad_dates, 1);
    let names: Vec<_> = report.rows.iter().map(|r| r.area.as_str()).collect();
    assert_eq!(names, vec!["OK"]);
}

fn poster(pkt: &str, idx: u32, from: &str, subject: &str, size: u64) -> PktMessage {
    let mut msg = stored(pkt, idx, "2025-12-12 10:00:00", Some("IRL.CHAT"));
    msg.from_name = from.to_string();
    msg.subject = subject.to_string();
    msg.size_bytes = size;
    msg
}

#[test]
fn top_report_ranks_posters_subjects_and_sizes() {
    let mut store = open_store(":memory:").expect("store");
    store_messages(
        &mut store,
        &[
            poster("t.pkt", 0, "Alice", "Weather", 300),
            poster("t.pkt", 1, "Bob", "Re: Weather", 5000),
            poster("t.pkt", 2, "Alice", "RE[2]: weather", 100),
            poster("t.pkt", 3, "", "", 0),
            poster("t.pkt", 4, "Carol", "Boats", 200),
        ],
    )
    .expect("seed");
    let range = full_range(&store);
    let report = top_report(&store, &range, "IRL.CHAT", DEFAULT_TOP_LIMIT).expect("top");

    assert_eq!(report.total, 5);
    assert_eq!(report.posters[0], ("Alice".to_string(), 2));
    assert_eq!(report.posters[1], ("Bob".to_string(), 1));
    assert!(report.posters.iter().any(|(p, _)| p == "(unknown)"));

    assert_eq!(report.subjects[0], ("Weather".to_string(), 2));
    assert!(report.subjects.iter().any(|(s, n)| s == "weather" && *n == 1));
    assert!(report.subjects.iter().any(|(s, _)| s == "(no subject)"));

    let by_size = report.by_size.expect("size column present");
    assert_eq!(by_size[0].poster, "Bob");
    assert_eq!(by_size[0].total, 5000);
    assert_eq!(by_size[1].poster, "Alice");
    assert_eq!(by_size[1].total, 400);
    assert_eq!(by_size[1].max, 300);

    assert_eq!(report.largest.len(), 4);
    assert_eq!(report.largest[0].size, 5000);
    assert_eq!(report.largest[0].subject, "Weather");
    assert_eq!(report.largest[0].lines, 5);
}

#[test]
fn top_report_for_unknown_area_is_empty() {
    let store = seeded_store();
    let range = full_range(&store);
    let report = top_report(&store, &range, "NOPE", 10).expect("top");
    assert_eq!(report.total, 0);
    assert!(report.posters.is_empty());
}

#[test]
fn area_lists_load_from_text_and_json() {
    let tmp = tempdir().expect("temp");
    let txt = tmp.path().join("areas.txt");
    fs::write(&txt, "# local areas\nIRL.CHAT\n\n  FIDO.TEST  \n").expect("txt");
    assert_eq!(load_area_list(&txt).expect("txt"), vec!["IRL.CHAT", "FIDO.TEST"]);

    let list = tmp.path().join("list.json");
    fs::write(&list, r#"["A", " B ", 3, ""]"#).expect("json");
    assert_eq!(load_area_list(&list).expect("json"), vec!["A", "B"]);

    let obj = tmp.path().join("areas.lst");
    fs::write(&obj, r#"{"areas": ["C"]}"#).expect("obj");
    assert_eq!(load_area_list(&obj).expect("obj"), vec!["C"]);

    let bad = tmp.path().join("bad.json");
    fs::write(&bad, r#"{"names": []}"#).expect("bad");
    assert!(load_area_list(&bad).is_err());
}
