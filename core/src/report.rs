use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use chrono::{Datelike, Days, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;
use rusqlite::params;
use serde::Serialize;
use tracing::{debug, warn};

use crate::dates::{format_canonical, parse_stored_date};
use crate::db::PktStore;
use crate::error::CoreError;

pub const UNKNOWN_AREA: &str = "UNKNOWN";

/// Seasonal month columns, newest first. January to March sit after December.
pub const MONTH_BUCKETS: [u32; 7] = [15, 14, 13, 12, 11, 10, 9];

/// Ranges spanning at most this many days default to per-day columns.
const AUTO_DAY_SPAN: i64 = 31;

pub const DEFAULT_TOP_LIMIT: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangePreset {
    /// Seven days ending at the newest stored date.
    Week,
    /// The calendar month before the newest stored date.
    Month,
    /// The newest stored date's month so far.
    CurrentMonth,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RangeSelection {
    Preset(RangePreset),
    LastDays(u32),
    Explicit {
        from: Option<String>,
        to: Option<String>,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportRange {
    /// Lower bound as compared against the date expression.
    pub from: String,
    pub to: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Period {
    #[default]
    Auto,
    Month,
    Day,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Bucket {
    Month(u32),
    Day(NaiveDate),
}

impl Bucket {
    /// Column heading: the month bucket number or the day of month.
    pub fn label(&self) -> String {
        match self {
            Bucket::Month(m) => m.to_string(),
            Bucket::Day(d) => d.format("%d").to_string(),
        }
    }
}

pub fn month_bucket(dt: &NaiveDateTime) -> u32 {
    match dt.month() {
        m @ 1..=3 => m + 12,
        m => m,
    }
}

/// Area × bucket message counts over a fixed set of buckets.
#[derive(Debug, Clone)]
pub struct AreaMatrix {
    buckets: Vec<Bucket>,
    rows: HashMap<String, usize>,
    names: Vec<String>,
    counts: Vec<Vec<u32>>,
}

impl AreaMatrix {
    pub fn new(buckets: Vec<Bucket>) -> Self {
        Self {
            buckets,
            rows: HashMap::new(),
            names: Vec::new(),
            counts: Vec::new(),
        }
    }

    pub fn buckets(&self) -> &[Bucket] {
        &self.buckets
    }

    fn bucket_index(&self, bucket: &Bucket) -> Option<usize> {
        match (bucket, self.buckets.first()) {
            (Bucket::Day(day), Some(Bucket::Day(first))) => {
                let offset = usize::try_from((*day - *first).num_days()).ok()?;
                (offset < self.buckets.len()).then_some(offset)
            }
            _ => self.buckets.iter().position(|b| b == bucket),
        }
    }

    /// Row for `area`, adding a zero row the first time it is seen.
    pub fn ensure_area(&mut self, area: &str) -> usize {
        if let Some(&row) = self.rows.get(area) {
            return row;
        }
        let row = self.names.len();
        self.rows.insert(area.to_string(), row);
        self.names.push(area.to_string());
        self.counts.push(vec![0; self.buckets.len()]);
        row
    }

    /// Counts one message. The area gets a row even when the bucket falls
    /// outside the column set.
    pub fn record(&mut self, area: &str, bucket: Bucket) -> bool {
        let row = self.ensure_area(area);
        match self.bucket_index(&bucket) {
            Some(col) => {
                self.counts[row][col] += 1;
                true
            }
            None => false,
        }
    }

    pub fn counts(&self, area: &str) -> Option<&[u32]> {
        self.rows.get(area).map(|&row| self.counts[row].as_slice())
    }

    pub fn areas(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

#[derive(Debug, Clone, Default)]
pub struct AreaFilters {
    /// Always listed, with zero counts if quiet.
    pub known: Vec<String>,
    /// When non-empty, the only areas reported (listed even if quiet).
    pub only: Vec<String>,
    pub exclude: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AreaRow {
    pub area: String,
    pub counts: Vec<u32>,
    pub total: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AreaReport {
    pub schema_version: Option<String>,
    pub range: ReportRange,
    pub buckets: Vec<Bucket>,
    pub rows: Vec<AreaRow>,
    pub totals: Vec<u64>,
    pub grand_total: u64,
    /// Rows in range whose date could not be parsed.
    pub bad_dates: u64,
}

fn date_expression(store: &PktStore) -> Result<String, CoreError> {
    store.caps.date_expression().ok_or_else(|| {
        CoreError::InvalidArgument(
            "pkt_messages has no usable date columns (need date_iso/imported_at/date_raw)".to_string(),
        )
    })
}

/// Oldest and newest row dates as stored, or `None` for an empty store.
pub fn store_date_bounds(store: &PktStore) -> Result<Option<(String, String)>, CoreError> {
    let expr = date_expression(store)?;
    let (min, max): (Option<String>, Option<String>) = store.conn.query_row(
        &format!("SELECT MIN({expr}), MAX({expr}) FROM pkt_messages;"),
        [],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;
    match (min, max) {
        (Some(min), Some(max)) => Ok(Some((min, max))),
        _ => Ok(None),
    }
}

fn parse_bound(value: &str) -> Result<NaiveDateTime, CoreError> {
    parse_stored_date(value)
        .ok_or_else(|| CoreError::InvalidArgument(format!("unrecognized date format: {value:?}")))
}

fn start_of_day(dt: NaiveDateTime) -> NaiveDateTime {
    dt.date().and_time(NaiveTime::MIN)
}

/// Parses a user-supplied bound. A bare date used as the upper bound covers the whole day.
fn user_bound(value: &str, upper: bool) -> Result<(String, NaiveDateTime), CoreError> {
    let mut dt = parse_bound(value)?;
    if upper && !value.contains(':') {
        dt = dt.date().and_hms_opt(23, 59, 59).unwrap_or(dt);
    }
    Ok((format_canonical(&dt), dt))
}

fn explicit_range(
    from: Option<&str>,
    to: Option<&str>,
    bounds: Option<&(String, String)>,
) -> Result<ReportRange, CoreError> {
    let (from, start) = match (from, bounds) {
        (Some(from), _) => user_bound(from, false)?,
        (None, Some((min, _))) => (min.clone(), parse_bound(min)?),
        (None, None) => {
            return Err(CoreError::InvalidArgument(
                "store is empty; a start date is required".to_string(),
            ))
        }
    };
    let (to, end) = match (to, bounds) {
        (Some(to), _) => user_bound(to, true)?,
        (None, Some((_, max))) => (max.clone(), parse_bound(max)?),
        (None, None) => {
            return Err(CoreError::InvalidArgument(
                "store is empty; an end date is required".to_string(),
            ))
        }
    };
    Ok(ReportRange { from, to, start, end })
}

fn newest_stored(bounds: Option<&(String, String)>) -> Result<NaiveDateTime, CoreError> {
    match bounds {
        Some((_, max)) => parse_bound(max),
        None => Err(CoreError::InvalidArgument(
            "store is empty; relative date ranges need stored messages".to_string(),
        )),
    }
}

fn out_of_range(option: &str) -> CoreError {
    CoreError::InvalidArgument(format!("{option} out of range"))
}

fn days_before(newest: NaiveDateTime, days: u64, option: &str) -> Result<NaiveDateTime, CoreError> {
    newest
        .checked_sub_days(Days::new(days))
        .map(start_of_day)
        .ok_or_else(|| out_of_range(option))
}

fn preset_window(
    preset: RangePreset,
    newest: NaiveDateTime,
) -> Result<(NaiveDateTime, NaiveDateTime), CoreError> {
    match preset {
        RangePreset::Week => Ok((days_before(newest, 6, "--date")?, newest)),
        RangePreset::CurrentMonth => Ok((start_of_day(newest.with_day(1).unwrap_or(newest)), newest)),
        RangePreset::Month => {
            let this_month = NaiveDate::from_ymd_opt(newest.year(), newest.month(), 1)
                .ok_or_else(|| out_of_range("--date"))?;
            let prev_month = this_month
                .pred_opt()
                .and_then(|last| last.with_day(1))
                .ok_or_else(|| out_of_range("--date"))?;
            let end = this_month
                .and_time(NaiveTime::MIN)
                .checked_sub_signed(Duration::seconds(1))
                .ok_or_else(|| out_of_range("--date"))?;
            Ok((prev_month.and_time(NaiveTime::MIN), end))
        }
    }
}

/// Works out the report window. `bounds` are the store's oldest and newest
/// dates; presets and `LastDays` count back from the newest one.
pub fn resolve_range(
    selection: &RangeSelection,
    bounds: Option<&(String, String)>,
) -> Result<ReportRange, CoreError> {
    let (start, end) = match selection {
        RangeSelection::Explicit { from, to } => {
            return explicit_range(from.as_deref(), to.as_deref(), bounds)
        }
        RangeSelection::Preset(preset) => preset_window(*preset, newest_stored(bounds)?)?,
        RangeSelection::LastDays(days) => {
            let newest = newest_stored(bounds)?;
            let back = u64::from(days.saturating_sub(1));
            (days_before(newest, back, "--days")?, newest)
        }
    };
    Ok(ReportRange {
        from: format_canonical(&start),
        to: format_canonical(&end),
        start,
        end,
    })
}

pub fn resolve_period(period: Period, range: &ReportRange) -> Period {
    match period {
        Period::Auto => {
            let span = (range.end.date() - range.start.date()).num_days();
            if span <= AUTO_DAY_SPAN {
                Period::Day
            } else {
                Period::Month
            }
        }
        other => other,
    }
}

pub fn build_buckets(period: Period, range: &ReportRange) -> Vec<Bucket> {
    match resolve_period(period, range) {
        Period::Day => {
            let mut days = Vec::new();
            let mut day = range.start.date();
            while day <= range.end.date() {
                days.push(Bucket::Day(day));
                match day.succ_opt() {
                    Some(next) => day = next,
                    None => break,
                }
            }
            days
        }
        _ => MONTH_BUCKETS.iter().map(|m| Bucket::Month(*m)).collect(),
    }
}

fn bucket_for(period_is_day: bool, dt: &NaiveDateTime) -> Bucket {
    if period_is_day {
        Bucket::Day(dt.date())
    } else {
        Bucket::Month(month_bucket(dt))
    }
}

/// Per-area message counts over the range, one column per bucket.
pub fn area_summary(
    store: &PktStore,
    range: &ReportRange,
    period: Period,
    filters: &AreaFilters,
) -> Result<AreaReport, CoreError> {
    let expr = date_expression(store)?;
    let buckets = build_buckets(period, range);
    let by_day = matches!(buckets.first(), Some(Bucket::Day(_)));
    let mut matrix = AreaMatrix::new(buckets);
    let mut bad_dates = 0u64;

    let mut stmt = store.conn.prepare(&format!(
        "SELECT {echo}, {expr} FROM pkt_messages WHERE {expr} >= ?1 AND {expr} <= ?2;",
        echo = store.caps.column_or_null("echo"),
    ))?;
    let mut rows = stmt.query(params![range.from, range.to])?;
    while let Some(row) = rows.next()? {
        let echo: Option<String> = row.get(0)?;
        let any_date: Option<String> = row.get(1)?;
        let area = echo
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .unwrap_or(UNKNOWN_AREA);
        let Some(dt) = any_date.as_deref().and_then(parse_stored_date) else {
            bad_dates += 1;
            continue;
        };
        matrix.record(area, bucket_for(by_day, &dt));
    }
    if bad_dates > 0 {
        warn!(bad_dates, "skipped rows with unparseable dates");
    }

    for area in filters.known.iter().chain(filters.only.iter()) {
        matrix.ensure_area(area);
    }

    let mut names: Vec<&str> = matrix
        .areas()
        .filter(|area| filters.only.is_empty() || filters.only.iter().any(|o| o == area))
        .filter(|area| !filters.exclude.iter().any(|e| e == area))
        .collect();
    names.sort_unstable();

    let width = matrix.buckets().len();
    let mut totals = vec![0u64; width];
    let mut out_rows = Vec::with_capacity(names.len());
    for area in names {
        let counts = matrix.counts(area).map(<[u32]>::to_vec).unwrap_or_else(|| vec![0; width]);
        for (total, count) in totals.iter_mut().zip(&counts) {
            *total += u64::from(*count);
        }
        out_rows.push(AreaRow {
            area: area.to_string(),
            total: counts.iter().map(|c| u64::from(*c)).sum(),
            counts,
        });
    }
    let grand_total: u64 = totals.iter().sum();
    debug!(areas = out_rows.len(), grand_total, "area summary built");

    Ok(AreaReport {
        schema_version: store.caps.schema_version.clone(),
        range: range.clone(),
        buckets: matrix.buckets().to_vec(),
        rows: out_rows,
        totals,
        grand_total,
        bad_dates,
    })
}

/// Counter keeping first-seen order for ties.
#[derive(Debug, Default)]
struct Tally {
    index: HashMap<String, usize>,
    entries: Vec<(String, u64)>,
}

impl Tally {
    fn slot(&mut self, key: &str) -> &mut u64 {
        let idx = match self.index.get(key) {
            Some(&idx) => idx,
            None => {
                self.entries.push((key.to_string(), 0));
                self.index.insert(key.to_string(), self.entries.len() - 1);
                self.entries.len() - 1
            }
        };
        &mut self.entries[idx].1
    }

    fn add(&mut self, key: &str, n: u64) {
        *self.slot(key) += n;
    }

    fn raise_to(&mut self, key: &str, n: u64) {
        let slot = self.slot(key);
        *slot = (*slot).max(n);
    }

    fn get(&self, key: &str) -> u64 {
        self.index.get(key).map(|&i| self.entries[i].1).unwrap_or(0)
    }

    fn most_common(&self, limit: usize) -> Vec<(String, u64)> {
        let mut items = self.entries.clone();
        items.sort_by(|a, b| b.1.cmp(&a.1));
        items.truncate(limit);
        items
    }
}

fn subject_prefix() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^(re(\[\d+\])?:\s*)+").expect("static regex"))
}

/// Folds `Re:`, `RE[2]:` and similar reply prefixes so replies count with their thread.
pub fn normalize_subject(subject: Option<&str>) -> String {
    let trimmed = subject.unwrap_or("").trim();
    let stripped = subject_prefix().replace(trimmed, "");
    let stripped = stripped.trim();
    if stripped.is_empty() {
        "(no subject)".to_string()
    } else {
        stripped.to_string()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PosterBytes {
    pub poster: String,
    pub total: u64,
    pub max: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct LargeMessage {
    pub size: u64,
    pub lines: u64,
    pub poster: String,
    pub subject: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TopReport {
    pub area: String,
    pub schema_version: Option<String>,
    pub range: ReportRange,
    pub total: usize,
    pub posters: Vec<(String, u64)>,
    pub subjects: Vec<(String, u64)>,
    /// `None` when the store has no size column.
    pub by_size: Option<Vec<PosterBytes>>,
    pub largest: Vec<LargeMessage>,
}

/// Busiest posters and threads of one area within the range.
pub fn top_report(
    store: &PktStore,
    range: &ReportRange,
    area: &str,
    limit: usize,
) -> Result<TopReport, CoreError> {
    let expr = date_expression(store)?;
    let caps = &store.caps;
    let missing = caps.missing_columns(&["from_name", "subject", "echo"]);
    if !missing.is_empty() {
        return Err(CoreError::InvalidArgument(format!(
            "pkt_messages is missing required columns: {}",
            missing.join(", ")
        )));
    }

    let mut stmt = store.conn.prepare(&format!(
        "SELECT from_name, subject, {size}, {lines} FROM pkt_messages \
         WHERE echo = ?1 AND {expr} >= ?2 AND {expr} <= ?3;",
        size = caps.column_or_null("size_bytes"),
        lines = caps.column_or_null("msg_lines"),
    ))?;
    let mut rows = stmt.query(params![area, range.from, range.to])?;

    let mut total = 0usize;
    let mut posters = Tally::default();
    let mut subjects = Tally::default();
    let mut bytes_total = Tally::default();
    let mut bytes_max = Tally::default();
    let mut largest = Vec::new();

    while let Some(row) = rows.next()? {
        let poster: Option<String> = row.get(0)?;
        let subject: Option<String> = row.get(1)?;
        let size: Option<i64> = row.get(2)?;
        let lines: Option<i64> = row.get(3)?;
        total += 1;

        let poster = poster
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .unwrap_or("(unknown)")
            .to_string();
        let root = normalize_subject(subject.as_deref());
        posters.add(&poster, 1);
        subjects.add(&root, 1);

        if caps.size_bytes {
            let size = size.unwrap_or(0).max(0) as u64;
            bytes_total.add(&poster, size);
            bytes_max.raise_to(&poster, size);
            if size > 0 {
                largest.push(LargeMessage {
                    size,
                    lines: lines.unwrap_or(0).max(0) as u64,
                    poster,
                    subject: root,
                });
            }
        }
    }

    largest.sort_by(|a, b| b.size.cmp(&a.size));
    largest.truncate(limit);

    let by_size = caps.size_bytes.then(|| {
        bytes_total
            .most_common(limit)
            .into_iter()
            .map(|(poster, total)| PosterBytes {
                max: bytes_max.get(&poster),
                poster,
                total,
            })
            .collect()
    });

    Ok(TopReport {
        area: area.to_string(),
        schema_version: caps.schema_version.clone(),
        range: range.clone(),
        total,
        posters: posters.most_common(limit),
        subjects: subjects.most_common(limit),
        by_size,
        largest,
    })
}

/// Reads an area list: JSON (`[...]` or `{"areas": [...]}`), or plain text with
/// one area per line where blank lines and `#` comments are skipped.
pub fn load_area_list(path: &Path) -> Result<Vec<String>, CoreError> {
    let data = fs::read_to_string(path)?;
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("json"))
        .unwrap_or(false)
        || data.trim_start().starts_with(['[', '{']);

    if !is_json {
        return Ok(data
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
            .map(str::to_string)
            .collect());
    }

    let value: serde_json::Value = serde_json::from_str(&data)?;
    let items = match &value {
        serde_json::Value::Array(items) => items,
        serde_json::Value::Object(map) => match map.get("areas") {
            Some(serde_json::Value::Array(items)) => items,
            _ => {
                return Err(CoreError::InvalidArgument(
                    "area JSON must be a list or an object with an 'areas' list".to_string(),
                ))
            }
        },
        _ => {
            return Err(CoreError::InvalidArgument(
                "area JSON must be a list or an object with an 'areas' list".to_string(),
            ))
        }
    };
    Ok(items
        .iter()
        .filter_map(|v| v.as_str())
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(str::to_string)
        .collect())
}
