/// Leading byte of transport metadata lines ("kludge" lines).
pub const CONTROL_CHAR: char = '\u{1}';

/// Lines scanned for the area tag.
pub const AREA_SCAN_LINES: usize = 30;

const AREA_PREFIX: &str = "AREA:";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyStats {
    pub msg_lines: u32,
    pub pct_quoted: Option<f64>,
}

fn is_line_break(c: char) -> bool {
    matches!(
        c,
        '\n' | '\r' | '\u{0b}' | '\u{0c}' | '\u{1c}' | '\u{1d}' | '\u{1e}' | '\u{85}'
    )
}

/// Splits body text into lines. CRLF counts as one break; a trailing break does
/// not produce an empty final line.
pub fn body_lines(text: &str) -> Vec<&str> {
    let mut lines = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();
    while let Some((idx, c)) = chars.next() {
        if !is_line_break(c) {
            continue;
        }
        lines.push(&text[start..idx]);
        let mut next = idx + c.len_utf8();
        if c == '\r' {
            if let Some(&(lf_idx, '\n')) = chars.peek() {
                chars.next();
                next = lf_idx + 1;
            }
        }
        start = next;
    }
    if start < text.len() {
        lines.push(&text[start..]);
    }
    lines
}

pub fn is_control_line(line: &str) -> bool {
    line.starts_with(CONTROL_CHAR)
}

fn is_quoted(line: &str) -> bool {
    line.trim_start().starts_with('>')
}

pub fn analyse_body(text: &str) -> BodyStats {
    let mut total = 0u32;
    let mut quoted = 0u32;
    for line in body_lines(text).into_iter().filter(|l| !is_control_line(l)) {
        total += 1;
        if is_quoted(line) {
            quoted += 1;
        }
    }
    let pct_quoted = if total == 0 {
        None
    } else {
        Some(f64::from(quoted) * 100.0 / f64::from(total))
    };
    BodyStats {
        msg_lines: total,
        pct_quoted,
    }
}

/// Returns the echo area named by the first `AREA:` line near the top of the body.
pub fn extract_area(text: &str) -> Option<String> {
    body_lines(text)
        .into_iter()
        .take(AREA_SCAN_LINES)
        .filter(|line| !line.is_empty())
        .find_map(|line| {
            let line = line.strip_prefix(CONTROL_CHAR).unwrap_or(line);
            let head = line.get(..AREA_PREFIX.len())?;
            if !head.eq_ignore_ascii_case(AREA_PREFIX) {
                return None;
            }
            let area = line[AREA_PREFIX.len()..].trim();
            (!area.is_empty()).then(|| area.to_string())
        })
}
