//! Date patterns shared by the preprocessing stages, and reconstruction of date
//! ranges that text extraction split across several lines.

use std::sync::LazyLock;

use regex::Regex;

pub const MONTH_PATTERN: &str = r"(?:jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|jun(?:e)?|jul(?:y)?|aug(?:ust)?|sep(?:t(?:ember)?)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?)\.?";

pub const PRESENT_PATTERN: &str = r"(?:present|current|now)";

/// Start tokens: `Month YYYY`, `MM/YYYY`, or a bare plausible year.
fn date_token_pattern() -> String {
    format!(r"(?:{MONTH_PATTERN}\s+\d{{4}}|(?:0?[1-9]|1[0-2])/\d{{4}}|(?:19|20)\d{{2}})")
}

/// A full range anywhere inside a line, e.g. `July 2011 to November 2012` or `2019 - Present`.
pub static DATE_RANGE: LazyLock<Regex> = LazyLock::new(|| {
    let token = date_token_pattern();
    Regex::new(&format!(
        r"(?i)\b{token}\s*(?:-|–|—|\bto\b)\s*(?:{token}|{PRESENT_PATTERN})\b"
    ))
    .expect("valid date range regex")
});

static DATE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)^{}$", date_token_pattern())).expect("valid date line regex")
});

static PRESENT_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)^{PRESENT_PATTERN}$")).expect("valid present regex")
});

/// Lines scanned after a start token for the `to` connector.
const TO_WINDOW: usize = 10;
/// Lines scanned after the connector for the end token.
const END_WINDOW: usize = 5;

/// True when the whole (trimmed) line is a single date token.
pub fn is_date_token(line: &str) -> bool {
    DATE_LINE.is_match(line.trim())
}

pub fn is_present_token(line: &str) -> bool {
    PRESENT_LINE.is_match(line.trim())
}

/// True when the line is or contains something date-like.
pub fn is_date_line(line: &str) -> bool {
    is_date_token(line) || DATE_RANGE.is_match(line)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    SeekStart,
    SeekTo { start: usize },
    SeekEnd { start: usize, to: usize },
}

struct Fragment<'a> {
    start: &'a str,
    end: &'a str,
    next: usize,
}

fn next_non_blank(lines: &[&str], from: usize, window: usize) -> Option<usize> {
    let stop = from.saturating_add(window).min(lines.len());
    (from..stop).find(|&i| !lines[i].trim().is_empty())
}

/// Runs the start → `to` → end machine from `at`. Any unexpected non-blank line aborts.
fn scan_fragment<'a>(lines: &[&'a str], at: usize) -> Option<Fragment<'a>> {
    let mut state = ScanState::SeekStart;
    loop {
        state = match state {
            ScanState::SeekStart => {
                if !is_date_token(lines[at]) {
                    return None;
                }
                ScanState::SeekTo { start: at }
            }
            ScanState::SeekTo { start } => {
                let to = next_non_blank(lines, start + 1, TO_WINDOW)?;
                if !lines[to].trim().eq_ignore_ascii_case("to") {
                    return None;
                }
                ScanState::SeekEnd { start, to }
            }
            ScanState::SeekEnd { start, to } => {
                let end = next_non_blank(lines, to + 1, END_WINDOW)?;
                let token = lines[end].trim();
                if !(is_date_token(token) || is_present_token(token)) {
                    return None;
                }
                return Some(Fragment {
                    start: lines[start].trim(),
                    end: token,
                    next: end + 1,
                });
            }
        };
    }
}

/// Collapses `start / (blank) / to / (blank) / end` line sequences into a single
/// `"<start> to <end>"` line. Every other line is emitted unchanged, in order.
pub fn reconstruct_fragmented_dates(lines: &[&str]) -> Vec<String> {
    let mut out = Vec::with_capacity(lines.len());
    let mut cursor = 0;
    while cursor < lines.len() {
        match scan_fragment(lines, cursor) {
            Some(fragment) => {
                out.push(format!("{} to {}", fragment.start, fragment.end));
                cursor = fragment.next;
            }
            None => {
                out.push(lines[cursor].to_string());
                cursor += 1;
            }
        }
    }
    out
}

/// Line-oriented wrapper over [`reconstruct_fragmented_dates`].
pub fn reconstruct_text(text: &str) -> String {
    let lines: Vec<&str> = text.split('\n').collect();
    reconstruct_fragmented_dates(&lines).join("\n")
}
