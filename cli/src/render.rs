use std::fmt::Write;

use pkt_index_core::dates::format_heading;
use pkt_index_core::migrations::BASE_COLUMNS;
use pkt_index_core::models::{PktMessage, StoreOverview, StoredMessage};
use pkt_index_core::report::{AreaReport, ReportRange, TopReport};
use pkt_index_core::StoreCapabilities;

const ELLIPSIS: char = '…';

/// Cuts `text` to at most `width` characters, marking the cut with an ellipsis.
pub fn shorten(text: &str, width: usize) -> String {
    let text = text.trim();
    if text.chars().count() <= width {
        return text.to_string();
    }
    if width == 0 {
        return String::new();
    }
    let mut out: String = text.chars().take(width - 1).collect();
    out.push(ELLIPSIS);
    out
}

pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * 1024;
    const GB: u64 = 1024 * 1024 * 1024;
    if bytes >= GB {
        format!("{:.1}G", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1}M", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1}K", bytes as f64 / KB as f64)
    } else {
        format!("{bytes}B")
    }
}

fn schema_label(version: Option<&str>) -> &str {
    version.unwrap_or("unknown")
}

fn range_line(range: &ReportRange) -> String {
    format!(
        "Statistics from {} to {}",
        format_heading(&range.start),
        format_heading(&range.end)
    )
}

pub fn area_table(report: &AreaReport, area_width: usize) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "EchoMail area report");
    let _ = writeln!(out, "(DB schema v{})", schema_label(report.schema_version.as_deref()));
    let _ = writeln!(out);
    let _ = writeln!(out, "{}", range_line(&report.range));
    let _ = writeln!(out);

    let col_header = report
        .buckets
        .iter()
        .map(|b| format!("{:>4}", b.label()))
        .collect::<Vec<_>>()
        .join(" ");
    let rule_width = area_width + col_header.chars().count() + 8;
    let _ = writeln!(out, "{:<area_width$}{col_header}   Total", "Area");
    let _ = writeln!(out, "{}", "=".repeat(rule_width));

    for row in &report.rows {
        let values = row
            .counts
            .iter()
            .map(|c| format!("{c:>4}"))
            .collect::<Vec<_>>()
            .join(" ");
        let name = shorten(&row.area, area_width.saturating_sub(1));
        let _ = writeln!(out, "{name:<area_width$}{values} : {:>5}", row.total);
    }

    let totals = report
        .totals
        .iter()
        .map(|c| format!("{c:>4}"))
        .collect::<Vec<_>>()
        .join(" ");
    let _ = writeln!(out, "{}", "=".repeat(rule_width));
    let _ = writeln!(out, "{:<area_width$}{totals} : {:>5}", "TOTALS", report.grand_total);

    if report.bad_dates > 0 {
        let _ = writeln!(out);
        let _ = writeln!(out, "(NOTE: skipped {} rows with unparseable dates)", report.bad_dates);
    }
    out
}

fn ranked_counts(out: &mut String, title: &str, label: &str, items: &[(String, u64)]) {
    let _ = writeln!(out);
    let _ = writeln!(out, "{title}");
    let _ = writeln!(out, "{}", "=".repeat(title.chars().count()));
    if items.is_empty() {
        let _ = writeln!(out, "(no data)");
        return;
    }

    let rank_width = items.len().to_string().len();
    let max_count = items.iter().map(|(_, n)| *n).max().unwrap_or(0);
    let count_width = "Msgs".len().max(max_count.to_string().len());
    let longest = items.iter().map(|(l, _)| l.chars().count()).max().unwrap_or(0);
    let label_width = label.len().max(longest.min(60));

    let header = format!("{:>rank_width$}  {label:<label_width$}  {:>count_width$}", "#", "Msgs");
    let _ = writeln!(out, "{header}");
    let _ = writeln!(out, "{}", "-".repeat(header.chars().count()));
    for (idx, (name, count)) in items.iter().enumerate() {
        let name = shorten(name, label_width);
        let _ = writeln!(
            out,
            "{:>rank_width$}  {name:<label_width$}  {count:>count_width$}",
            idx + 1
        );
    }
}

pub fn top_tables(report: &TopReport) -> String {
    let mut out = String::new();
    if report.total == 0 {
        let _ = writeln!(
            out,
            "No messages found in echo {:?} for selected date range.",
            report.area
        );
        return out;
    }

    let _ = writeln!(out, "EchoMail top stats for area {}", report.area);
    let _ = writeln!(out, "(DB schema v{})", schema_label(report.schema_version.as_deref()));
    let _ = writeln!(out, "{}", range_line(&report.range));
    let _ = writeln!(out, "Total messages in range: {}", report.total);

    ranked_counts(&mut out, "Top posters", "Poster", &report.posters);
    ranked_counts(&mut out, "Top subjects", "Subject", &report.subjects);

    let Some(by_size) = &report.by_size else {
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "(NOTE: no size_bytes column found in pkt_messages; size-based tables are unavailable.)"
        );
        return out;
    };

    let title = "Top posters by total message size";
    let _ = writeln!(out);
    let _ = writeln!(out, "{title}");
    let _ = writeln!(out, "{}", "=".repeat(title.len()));
    if by_size.is_empty() {
        let _ = writeln!(out, "(no data)");
    } else {
        let rank_width = by_size.len().to_string().len();
        let longest = by_size.iter().map(|p| p.poster.chars().count()).max().unwrap_or(0);
        let label_width = "Poster".len().max(longest.min(40));
        let total_width = by_size
            .iter()
            .map(|p| format_bytes(p.total).len())
            .max()
            .unwrap_or(0)
            .max("Total".len());
        let max_width = by_size
            .iter()
            .map(|p| format_bytes(p.max).len())
            .max()
            .unwrap_or(0)
            .max("Max".len());

        let header = format!(
            "{:>rank_width$}  {:<label_width$}  {:>total_width$}  {:>max_width$}",
            "#", "Poster", "Total", "Max"
        );
        let _ = writeln!(out, "{header}");
        let _ = writeln!(out, "{}", "-".repeat(header.chars().count()));
        for (idx, entry) in by_size.iter().enumerate() {
            let _ = writeln!(
                out,
                "{:>rank_width$}  {:<label_width$}  {:>total_width$}  {:>max_width$}",
                idx + 1,
                shorten(&entry.poster, label_width),
                format_bytes(entry.total),
                format_bytes(entry.max)
            );
        }
    }

    if !report.largest.is_empty() {
        let title = "Largest individual messages";
        let _ = writeln!(out);
        let _ = writeln!(out, "{title}");
        let _ = writeln!(out, "{}", "=".repeat(title.len()));
        let _ = writeln!(out, "{:>2}  {:>8}  {:>5}  {:<20}  Subject", "#", "Size", "Lines", "Poster");
        let _ = writeln!(out, "{}", "-".repeat(68));
        for (idx, msg) in report.largest.iter().enumerate() {
            let _ = writeln!(
                out,
                "{:>2}  {:>8}  {:>5}  {:<20}  {}",
                idx + 1,
                format_bytes(msg.size),
                msg.lines,
                shorten(&msg.poster, 20),
                shorten(&msg.subject, 60)
            );
        }
    }
    out
}

fn or_dash<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

fn sample_line(row: &StoredMessage, caps: &StoreCapabilities) -> String {
    let echo = row.echo.as_deref().filter(|e| !e.is_empty()).unwrap_or("UNKNOWN");
    let mut parts = vec![
        format!("[{}]", row.id),
        format!("Area={:<30}", shorten(echo, 30)),
        format!("date_iso={}", or_dash(row.date_iso.as_deref())),
        format!("size={}", or_dash(row.size_bytes)),
    ];
    if caps.msg_lines {
        parts.push(format!("lines={}", or_dash(row.msg_lines)));
    }
    if caps.pct_quoted {
        parts.push(match row.pct_quoted {
            Some(pct) => format!("quoted={pct:.1}%"),
            None => "quoted=-".to_string(),
        });
    }
    parts.push(format!("from={:?}", shorten(row.from_name.as_deref().unwrap_or(""), 25)));
    parts.push(format!("subj={:?}", shorten(row.subject.as_deref().unwrap_or(""), 40)));
    parts.push(format!("imported_at={}", or_dash(row.imported_at.as_deref())));
    format!("  {}", parts.join("  "))
}

pub fn inspection(db: &str, caps: &StoreCapabilities, overview: Option<&StoreOverview>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Inspecting: {db}");
    let _ = writeln!(out);
    let Some(overview) = overview.filter(|_| caps.has_messages) else {
        let _ = writeln!(out, "No table 'pkt_messages' found in this database.");
        return out;
    };

    let _ = writeln!(out, "meta.schema_version: {}", schema_label(caps.schema_version.as_deref()));
    if !caps.has_meta {
        let _ = writeln!(out, "(NOTE: meta table is missing; this store predates schema versioning.)");
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "Columns in pkt_messages:");
    let _ = writeln!(out, "  {}", caps.columns.join(", "));

    let missing = caps.missing_columns(BASE_COLUMNS);
    if !missing.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "WARNING: Missing expected base columns:");
        for column in &missing {
            let _ = writeln!(out, "  - {column}");
        }
    }

    let yes_no = |flag: bool| if flag { "YES" } else { "NO" };
    let _ = writeln!(out);
    let _ = writeln!(out, "Extended body stats:");
    let _ = writeln!(out, "  msg_lines column present : {}", yes_no(caps.msg_lines));
    let _ = writeln!(out, "  pct_quoted column present: {}", yes_no(caps.pct_quoted));

    let _ = writeln!(out);
    let _ = writeln!(out, "Total messages in pkt_messages: {}", overview.total);
    if let Some(range) = &overview.date_iso {
        let _ = writeln!(
            out,
            "date_iso range           : {}  ->  {}",
            or_dash(range.min.as_deref()),
            or_dash(range.max.as_deref())
        );
    }
    if let Some(range) = &overview.imported_at {
        let _ = writeln!(
            out,
            "imported_at range        : {}  ->  {}",
            or_dash(range.min.as_deref()),
            or_dash(range.max.as_deref())
        );
    }

    if !overview.sample.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Sample of first {} messages:", overview.sample.len());
        let _ = writeln!(out);
        for row in &overview.sample {
            let _ = writeln!(out, "{}", sample_line(row, caps));
        }
    }
    out
}

/// One line per decoded message for dry runs.
pub fn decoded_message(msg: &PktMessage) -> String {
    format!(
        "{} #{}: date_iso={:?} date_raw={:?} echo={:?} size={} lines={} quoted={} from={:?} subj={:?}",
        msg.pkt_file,
        msg.msg_index,
        msg.date_iso,
        msg.date_raw,
        msg.echo,
        msg.size_bytes,
        msg.msg_lines,
        msg.pct_quoted
            .map(|p| format!("{p:.1}"))
            .unwrap_or_else(|| "-".to_string()),
        msg.from_name,
        msg.subject
    )
}
