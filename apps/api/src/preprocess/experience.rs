//! Experience block extraction.
//!
//! Each line containing a date range anchors one block. The title is resolved from
//! text before the range or the nearest line above, the company from text after
//! the range or the nearest line below, and the description from the lines that
//! follow until the next boundary.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::dates::{is_date_line, DATE_RANGE};
use super::dedup::similarity_ratio;

pub const TITLE_SENTINEL: &str = "Professional Experience";
pub const COMPANY_SENTINEL: &str = "Company Name";

pub const DEFAULT_EXPERIENCE_SIMILARITY: f64 = 0.90;

const TITLE_LOOKBACK: usize = 4;
const COMPANY_LOOKAHEAD: usize = 5;
const DESCRIPTION_SCAN_LINES: usize = 10;
const DESCRIPTION_KEEP_LINES: usize = 5;
const DESCRIPTION_MAX_CHARS: usize = 600;

const GENERIC_TITLE_WORDS: &[&str] = &["experience", "work", "history", "company", "name"];

const SECTION_HEADERS: &[&str] = &[
    "experience",
    "work experience",
    "work history",
    "professional experience",
    "employment",
    "employment history",
    "education",
    "education and training",
    "skills",
    "skill",
    "technical skills",
    "core qualifications",
    "qualifications",
    "highlights",
    "certifications",
    "certification",
    "certificates",
    "licenses and certifications",
    "summary",
    "professional summary",
    "executive summary",
    "objective",
    "career objective",
    "interests",
    "awards",
    "honors",
    "accomplishments",
    "projects",
    "languages",
    "additional information",
    "affiliations",
    "references",
    "contact",
    "profile",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperienceEntry {
    pub title: String,
    pub company: String,
    #[serde(rename = "dates")]
    pub raw_date_range: String,
    pub description: String,
}

/// True for a line that is only a known section heading, with or without a trailing colon.
pub fn is_section_header(line: &str) -> bool {
    let normalized = line
        .trim()
        .trim_end_matches(':')
        .trim()
        .to_ascii_lowercase();
    SECTION_HEADERS.contains(&normalized.as_str())
}

fn clean_fragment(s: &str) -> &str {
    s.trim_matches(|c: char| {
        c.is_whitespace() || matches!(c, '|' | ',' | '-' | ':' | '@' | '(' | ')')
    })
}

fn is_generic_title(s: &str) -> bool {
    let words: Vec<String> = s
        .split(|c: char| !c.is_ascii_alphabetic())
        .filter(|w| !w.is_empty())
        .map(str::to_ascii_lowercase)
        .collect();
    words.is_empty() || words.iter().all(|w| GENERIC_TITLE_WORDS.contains(&w.as_str()))
}

#[derive(Debug)]
enum BlockState {
    SeekTitle,
    SeekCompany { title: String },
    SeekDescription { title: String, company: String, from: usize },
}

/// The date-range line that opened a block, split around the range.
struct Anchor<'a> {
    index: usize,
    before: &'a str,
    range: &'a str,
    after: &'a str,
}

struct BlockOutcome {
    entry: Option<ExperienceEntry>,
    next: usize,
}

struct BlockScanner<'a> {
    lines: &'a [&'a str],
}

impl<'a> BlockScanner<'a> {
    fn anchor_at(&self, index: usize) -> Option<Anchor<'a>> {
        let line = self.lines[index].trim();
        let m = DATE_RANGE.find(line)?;
        Some(Anchor {
            index,
            before: clean_fragment(&line[..m.start()]),
            range: m.as_str().trim(),
            after: clean_fragment(&line[m.end()..]),
        })
    }

    fn resolve_title(&self, anchor: &Anchor<'_>) -> String {
        if !anchor.before.is_empty() && !is_generic_title(anchor.before) {
            return anchor.before.to_string();
        }
        let low = anchor.index.saturating_sub(TITLE_LOOKBACK);
        (low..anchor.index)
            .rev()
            .map(|i| self.lines[i].trim())
            .find(|l| !l.is_empty() && !is_date_line(l) && !is_section_header(l))
            .map(String::from)
            .unwrap_or_else(|| TITLE_SENTINEL.to_string())
    }

    /// Returns the company and the line index where the description starts.
    /// A section header or another date line ends the lookahead, since either
    /// one starts a new block.
    fn resolve_company(&self, anchor: &Anchor<'_>) -> (String, usize) {
        let next = anchor.index + 1;
        if !anchor.after.is_empty() {
            return (anchor.after.to_string(), next);
        }
        let stop = (next + COMPANY_LOOKAHEAD).min(self.lines.len());
        let found = (next..stop).find(|&i| !self.lines[i].trim().is_empty());
        match found {
            Some(i) if !is_date_line(self.lines[i]) && !is_section_header(self.lines[i]) => {
                (self.lines[i].trim().to_string(), i + 1)
            }
            _ => (COMPANY_SENTINEL.to_string(), next),
        }
    }

    /// Collects description lines from `from`; returns the text and the first unconsumed index.
    fn collect_description(&self, from: usize) -> (String, usize) {
        let mut collected: Vec<&str> = Vec::new();
        let mut cursor = from;
        while cursor < self.lines.len() && collected.len() < DESCRIPTION_SCAN_LINES {
            let line = self.lines[cursor].trim();
            if line.is_empty() {
                cursor += 1;
                continue;
            }
            if is_date_line(line) || is_section_header(line) {
                break;
            }
            collected.push(line);
            cursor += 1;
        }
        let joined = collected
            .iter()
            .take(DESCRIPTION_KEEP_LINES)
            .copied()
            .collect::<Vec<_>>()
            .join(" ");
        (joined.chars().take(DESCRIPTION_MAX_CHARS).collect(), cursor)
    }

    fn scan_block(&self, at: usize) -> Option<BlockOutcome> {
        let anchor = self.anchor_at(at)?;
        let mut state = BlockState::SeekTitle;
        loop {
            state = match state {
                BlockState::SeekTitle => BlockState::SeekCompany {
                    title: self.resolve_title(&anchor),
                },
                BlockState::SeekCompany { title } => {
                    let (company, from) = self.resolve_company(&anchor);
                    BlockState::SeekDescription { title, company, from }
                }
                BlockState::SeekDescription { title, company, from } => {
                    let (description, next) = self.collect_description(from);
                    let entry = (!title.eq_ignore_ascii_case(COMPANY_SENTINEL)).then(|| {
                        ExperienceEntry {
                            title,
                            company,
                            raw_date_range: anchor.range.to_string(),
                            description,
                        }
                    });
                    return Some(BlockOutcome { entry, next });
                }
            };
        }
    }
}

/// Extracts experience blocks in document order.
pub fn extract_experiences(text: &str) -> Vec<ExperienceEntry> {
    let lines: Vec<&str> = text.split('\n').collect();
    let scanner = BlockScanner { lines: &lines };
    let mut entries = Vec::new();
    let mut cursor = 0;
    while cursor < lines.len() {
        match scanner.scan_block(cursor) {
            Some(outcome) => {
                entries.extend(outcome.entry);
                cursor = outcome.next.max(cursor + 1);
            }
            None => cursor += 1,
        }
    }
    entries
}

fn entry_key(entry: &ExperienceEntry) -> String {
    format!(
        "{}|{}|{}",
        entry.title.trim().to_lowercase(),
        entry.company.trim().to_lowercase(),
        entry.raw_date_range.trim().to_lowercase()
    )
}

/// Drops entries repeating an earlier key, or sharing title and company with an
/// earlier entry whose description is at least `threshold` similar.
pub fn dedupe_experiences(entries: Vec<ExperienceEntry>, threshold: f64) -> Vec<ExperienceEntry> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut unique: Vec<ExperienceEntry> = Vec::new();

    for entry in entries {
        let key = entry_key(&entry);
        if seen.contains(&key) {
            continue;
        }
        let near = unique.iter().any(|kept| {
            kept.title.eq_ignore_ascii_case(&entry.title)
                && kept.company.eq_ignore_ascii_case(&entry.company)
                && similarity_ratio(&kept.description, &entry.description) >= threshold
        });
        if near {
            continue;
        }
        seen.insert(key);
        unique.push(entry);
    }

    unique
}
