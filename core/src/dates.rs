use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Layouts seen in packet message headers, tried in order.
const PACKET_DATE_LAYOUTS: &[&str] = &[
    "%d %b %y  %H:%M:%S",
    "%d %b %y %H:%M:%S",
    "%d %b %Y  %H:%M:%S",
    "%d %b %Y %H:%M:%S",
];

/// Layouts accepted when reading dates back out of a store or from report flags.
const STORED_DATETIME_LAYOUTS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%d %b %y %H:%M:%S",
    "%d-%b-%Y %H:%M",
];

const STORED_DATE_LAYOUTS: &[&str] = &["%Y-%m-%d", "%d-%b-%y"];

pub const CANONICAL_LAYOUT: &str = "%Y-%m-%d %H:%M:%S";

/// Two-digit years from here on belong to the 1900s (69 is 1969, 68 is 2068).
const TWO_DIGIT_PIVOT: i32 = 2069;

/// chrono puts `%y` 69 in 2069; move such years back a century.
fn pivot_two_digit_year<T: Datelike>(value: T, layout: &str) -> Option<T> {
    if layout.contains("%y") && value.year() >= TWO_DIGIT_PIVOT {
        value.with_year(value.year() - 100)
    } else {
        Some(value)
    }
}

fn parse_datetime(value: &str, layout: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, layout)
        .ok()
        .and_then(|dt| pivot_two_digit_year(dt, layout))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PacketTimestamp {
    pub iso: Option<String>,
    pub raw: String,
}

/// Normalizes a packet header date. A string matching none of the known
/// layouts yields `iso: None`; `raw` is always the input, untouched.
pub fn normalize_packet_date(raw: &str) -> PacketTimestamp {
    let trimmed = raw.trim();
    let iso = if trimmed.is_empty() {
        None
    } else {
        PACKET_DATE_LAYOUTS
            .iter()
            .find_map(|layout| parse_datetime(trimmed, layout))
            .map(|dt| dt.format(CANONICAL_LAYOUT).to_string())
    };
    PacketTimestamp {
        iso,
        raw: raw.to_string(),
    }
}

/// Parses any of the date shapes a store may hold (`date_iso`, `imported_at`,
/// legacy `date_raw`) or a user may type. Date-only shapes land on midnight.
pub fn parse_stored_date(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    STORED_DATETIME_LAYOUTS
        .iter()
        .find_map(|layout| parse_datetime(value, layout))
        .or_else(|| {
            STORED_DATE_LAYOUTS
                .iter()
                .find_map(|layout| {
                    NaiveDate::parse_from_str(value, layout)
                        .ok()
                        .and_then(|date| pivot_two_digit_year(date, layout))
                })
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

pub fn format_canonical(dt: &NaiveDateTime) -> String {
    dt.format(CANONICAL_LAYOUT).to_string()
}

/// Short `DD-Mon-YY` form used in report headings.
pub fn format_heading(dt: &NaiveDateTime) -> String {
    dt.format("%d-%b-%y").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_digit_year_with_double_space() {
        let ts = normalize_packet_date("05 Jan 25  13:45:10");
        assert_eq!(ts.iso.as_deref(), Some("2025-01-05 13:45:10"));
        assert_eq!(ts.raw, "05 Jan 25  13:45:10");
    }

    #[test]
    fn four_digit_year_with_single_space() {
        let ts = normalize_packet_date("17 Dec 2025 08:00:59");
        assert_eq!(ts.iso.as_deref(), Some("2025-12-17 08:00:59"));
    }

    #[test]
    fn surrounding_whitespace_is_ignored_but_raw_is_kept() {
        let ts = normalize_packet_date("  01 Feb 99 23:59:59 ");
        assert_eq!(ts.iso.as_deref(), Some("1999-02-01 23:59:59"));
        assert_eq!(ts.raw, "  01 Feb 99 23:59:59 ");
    }

    #[test]
    fn sixty_nine_is_the_first_twentieth_century_year() {
        let ts = normalize_packet_date("01 Jan 69  00:00:00");
        assert_eq!(ts.iso.as_deref(), Some("1969-01-01 00:00:00"));
        let ts = normalize_packet_date("31 Dec 68 23:59:59");
        assert_eq!(ts.iso.as_deref(), Some("2068-12-31 23:59:59"));
        let ts = normalize_packet_date("01 Jan 70  00:00:00");
        assert_eq!(ts.iso.as_deref(), Some("1970-01-01 00:00:00"));
        let ts = normalize_packet_date("01 Jan 2069 00:00:00");
        assert_eq!(ts.iso.as_deref(), Some("2069-01-01 00:00:00"));

        let expected = NaiveDate::from_ymd_opt(1969, 7, 20).unwrap();
        assert_eq!(parse_stored_date("20-Jul-69"), expected.and_hms_opt(0, 0, 0));
        assert_eq!(
            parse_stored_date("20 Jul 69 20:17:40"),
            expected.and_hms_opt(20, 17, 40)
        );
    }

    #[test]
    fn unknown_layout_yields_no_iso() {
        for raw in ["", "   ", "Mon 05 Jan 25 13:45", "32 Jan 25  10:00:00", "garbage"] {
            let ts = normalize_packet_date(raw);
            assert_eq!(ts.iso, None, "{raw:?}");
            assert_eq!(ts.raw, raw);
        }
    }

    #[test]
    fn stored_dates_accept_all_shapes() {
        let expected = NaiveDate::from_ymd_opt(2025, 12, 12)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(parse_stored_date("2025-12-12"), Some(expected));
        assert_eq!(parse_stored_date("2025-12-12 00:00:00"), Some(expected));
        assert_eq!(parse_stored_date("2025-12-12T00:00:00"), Some(expected));
        assert_eq!(parse_stored_date("12-Dec-25"), Some(expected));
        assert_eq!(parse_stored_date("12-Dec-2025 00:00"), Some(expected));
        assert_eq!(parse_stored_date("not a date"), None);
    }

    #[test]
    fn heading_format() {
        let dt = parse_stored_date("2025-03-09 10:11:12").unwrap();
        assert_eq!(format_heading(&dt), "09-Mar-25");
        assert_eq!(format_canonical(&dt), "2025-03-09 10:11:12");
    }
}
