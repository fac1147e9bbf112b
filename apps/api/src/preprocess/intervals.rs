//! Date interval parsing and merging for total professional experience.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::Serialize;
use tracing::debug;

use super::dates::{MONTH_PATTERN, PRESENT_PATTERN};
use super::experience::ExperienceEntry;

const DAYS_PER_YEAR: f64 = 365.25;

static SEPARATOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s+to\s+|\s*[-–—]\s*").expect("valid range separator regex")
});

static LOOSE_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)\b(?:{MONTH_PATTERN}\s+\d{{4}}|(?:0?[1-9]|1[0-2])/\d{{4}}|(?:19|20)\d{{2}}|{PRESENT_PATTERN})\b"
    ))
    .expect("valid loose date regex")
});

static PRESENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)^{PRESENT_PATTERN}$")).expect("valid present regex")
});

static YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b((?:19|20)\d{2})\b").expect("valid year regex"));

static MONTH_SLASH_YEAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(0?[1-9]|1[0-2])/((?:19|20)\d{2})$").expect("valid month/year regex")
});

/// Month names as accepted by chrono's `%B`, tried after prepending a day.
const CHRONO_FORMATS: &[&str] = &["%d %B %Y", "%d %b %Y"];

const MONTH_PREFIXES: &[(&str, u32)] = &[
    ("jan", 1),
    ("feb", 2),
    ("mar", 3),
    ("apr", 4),
    ("may", 5),
    ("jun", 6),
    ("jul", 7),
    ("aug", 8),
    ("sep", 9),
    ("oct", 10),
    ("nov", 11),
    ("dec", 12),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct DateInterval {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateInterval {
    /// `None` when `end` precedes `start`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days()
    }
}

/// Resolves one date token to the first day of its month (or year).
/// Present/Current/Now resolve to `today`.
pub fn parse_date_token(token: &str, today: NaiveDate) -> Option<NaiveDate> {
    let cleaned = token.trim().trim_matches(|c: char| c == '.' || c == ',').replace('.', "");
    if cleaned.is_empty() {
        return None;
    }
    if PRESENT.is_match(&cleaned) {
        return Some(today);
    }

    let prefixed = format!("01 {cleaned}");
    if let Some(date) = CHRONO_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(&prefixed, fmt).ok())
    {
        return Some(date);
    }

    if let Some(caps) = MONTH_SLASH_YEAR.captures(&cleaned) {
        let month: u32 = caps[1].parse().ok()?;
        let year: i32 = caps[2].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, 1);
    }

    let year: i32 = YEAR.captures(&cleaned)?[1].parse().ok()?;
    let lowered = cleaned.to_ascii_lowercase();
    let month = MONTH_PREFIXES
        .iter()
        .find(|(prefix, _)| lowered.starts_with(prefix))
        .map(|(_, m)| *m)
        .unwrap_or(1);
    NaiveDate::from_ymd_opt(year, month, 1)
}

/// Parses a raw range such as `July 2011 to November 2012`, `10/2012 - Present`
/// or `2015 – 2018`. Fails when either side is unparseable or the end precedes the start.
pub fn parse_range(raw: &str, today: NaiveDate) -> Option<DateInterval> {
    let unified = SEPARATOR.replace_all(raw.trim(), "|");
    let parts: Vec<&str> = unified
        .split('|')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();

    let (start_raw, end_raw) = if parts.len() == 2 {
        (parts[0].to_string(), parts[1].to_string())
    } else {
        let mut tokens = LOOSE_TOKEN.find_iter(raw).map(|m| m.as_str().to_string());
        match (tokens.next(), tokens.next()) {
            (Some(a), Some(b)) => (a, b),
            _ => {
                debug!(raw, "unparseable date range");
                return None;
            }
        }
    };

    let start = parse_date_token(&start_raw, today)?;
    let end = parse_date_token(&end_raw, today)?;
    DateInterval::new(start, end)
}

/// Sorts by start and fuses overlapping or touching intervals.
pub fn merge_intervals(mut intervals: Vec<DateInterval>) -> Vec<DateInterval> {
    intervals.sort();
    let mut merged: Vec<DateInterval> = Vec::with_capacity(intervals.len());
    for interval in intervals {
        match merged.last_mut() {
            Some(current) if interval.start <= current.end => {
                current.end = current.end.max(interval.end);
            }
            _ => merged.push(interval),
        }
    }
    merged
}

/// Union length of the intervals in years, rounded to one decimal.
pub fn total_years_from_intervals(intervals: Vec<DateInterval>) -> f64 {
    let days: i64 = merge_intervals(intervals).iter().map(DateInterval::days).sum();
    (days as f64 / DAYS_PER_YEAR * 10.0).round() / 10.0
}

/// Total years covered by the entries' date ranges. Unparseable ranges are skipped.
pub fn total_years(entries: &[ExperienceEntry], today: NaiveDate) -> f64 {
    let intervals: Vec<DateInterval> = entries
        .iter()
        .filter_map(|e| parse_range(&e.raw_date_range, today))
        .collect();
    total_years_from_intervals(intervals)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn today() -> NaiveDate {
        d(2024, 6, 15)
    }

    fn entry(dates: &str) -> ExperienceEntry {
        ExperienceEntry {
            title: "Dev".into(),
            company: "Acme".into(),
            raw_date_range: dates.into(),
            description: String::new(),
        }
    }

    #[test]
    fn test_parse_month_name_tokens() {
        assert_eq!(parse_date_token("July 2011", today()), Some(d(2011, 7, 1)));
        assert_eq!(parse_date_token("Nov 2012", today()), Some(d(2012, 11, 1)));
        assert_eq!(parse_date_token("Sept. 2018", today()), Some(d(2018, 9, 1)));
    }

    #[test]
    fn test_parse_numeric_and_year_tokens() {
        assert_eq!(parse_date_token("03/2019", today()), Some(d(2019, 3, 1)));
        assert_eq!(parse_date_token("2015", today()), Some(d(2015, 1, 1)));
        assert_eq!(parse_date_token("Present", today()), Some(today()));
        assert_eq!(parse_date_token("soon", today()), None);
    }

    #[test]
    fn test_parse_range_variants() {
        assert_eq!(
            parse_range("July 2011 to November 2012", today()),
            DateInterval::new(d(2011, 7, 1), d(2012, 11, 1))
        );
        assert_eq!(
            parse_range("10/2012 - Current", today()),
            DateInterval::new(d(2012, 10, 1), today())
        );
        assert_eq!(
            parse_range("2015 – 2018", today()),
            DateInterval::new(d(2015, 1, 1), d(2018, 1, 1))
        );
    }

    #[test]
    fn test_parse_range_rejects_inverted() {
        assert_eq!(parse_range("2018 - 2015", today()), None);
    }

    #[test]
    fn test_parse_range_rejects_garbage() {
        assert_eq!(parse_range("sometime - later", today()), None);
        assert_eq!(parse_range("", today()), None);
    }

    #[test]
    fn test_overlapping_intervals_merge() {
        let entries = [entry("January 2010 to January 2012"), entry("June 2011 - January 2013")];
        assert_eq!(total_years(&entries, today()), 3.0);
    }

    #[test]
    fn test_disjoint_intervals_sum() {
        let entries = [entry("2010 - 2011"), entry("2012 - 2013")];
        assert_eq!(total_years(&entries, today()), 2.0);
    }

    #[test]
    fn test_contained_interval_adds_nothing() {
        let entries = [entry("2010 - 2015"), entry("2011 - 2012")];
        assert_eq!(total_years(&entries, today()), 5.0);
    }

    #[test]
    fn test_unparseable_entries_skipped() {
        let entries = [entry("2010 - 2012"), entry("whenever")];
        assert_eq!(total_years(&entries, today()), 2.0);
        assert_eq!(total_years(&[], today()), 0.0);
    }

    #[test]
    fn test_merge_keeps_sorted_disjoint_output() {
        let merged = merge_intervals(vec![
            DateInterval::new(d(2015, 1, 1), d(2016, 1, 1)).unwrap(),
            DateInterval::new(d(2010, 1, 1), d(2011, 1, 1)).unwrap(),
            DateInterval::new(d(2010, 6, 1), d(2012, 1, 1)).unwrap(),
        ]);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].start, d(2010, 1, 1));
        assert_eq!(merged[0].end, d(2012, 1, 1));
    }
}
