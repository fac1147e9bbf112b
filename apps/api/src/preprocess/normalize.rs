//! Text normalization: canonical whitespace, bullet glyphs and ASCII-only output,
//! plus the canonical signature used for exact-duplicate detection.

use std::sync::LazyLock;

use regex::Regex;

static BULLETS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[•·●■▪◦▶►✓✔→]").expect("valid bullet regex"));

static DASHES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[–—]").expect("valid dash regex"));

static TABS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\t+").expect("valid tab regex"));

static SPACES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[ \u{00A0}\u{2000}-\u{200A}\u{202F}\u{3000}]+").expect("valid space regex")
});

static BLANK_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid blank-run regex"));

static NON_ASCII: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\x00-\x7F]+").expect("valid non-ascii regex"));

static PUNCTUATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s]").expect("valid punctuation regex"));

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

static WORD_TOKENS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[a-z0-9]+\b").expect("valid token regex"));

/// Suffix rules for the light stemmer, checked in order. The first matching rule wins.
const SUFFIX_RULES: &[(&str, &str)] = &[
    ("sses", "ss"),
    ("ies", "y"),
    ("ss", "ss"),
    ("ingly", ""),
    ("edly", ""),
    ("ing", ""),
    ("ed", ""),
    ("ly", ""),
    ("s", ""),
];

/// Shortest stem a suffix rule may leave behind.
const MIN_STEM_LEN: usize = 3;

/// Canonicalizes raw résumé text.
///
/// CRLF/CR become LF, bullet glyphs become `-`, en/em dashes become `-`, tabs and
/// exotic spaces collapse to one space, 3+ newlines collapse to 2, and any
/// remaining non-ASCII run is replaced by a space. Never fails.
pub fn normalize_text(raw: &str) -> String {
    let s = raw.replace("\r\n", "\n").replace('\r', "\n");
    let s = BULLETS.replace_all(&s, "-");
    let s = DASHES.replace_all(&s, "-");
    let s = TABS.replace_all(&s, " ");
    let s = SPACES.replace_all(&s, " ");
    let s = BLANK_RUNS.replace_all(&s, "\n\n");
    let s = NON_ASCII.replace_all(&s, " ");
    s.trim().to_string()
}

/// Canonical signature of a text span.
///
/// With stemming: lowercase alphanumeric tokens, alphabetic tokens shorter than
/// three characters dropped, the rest stemmed. Without: case-folded, punctuation
/// replaced by spaces, whitespace collapsed.
pub fn signature(text: &str, stemming: bool) -> String {
    let folded = text.to_lowercase();
    if stemming {
        return WORD_TOKENS
            .find_iter(&folded)
            .map(|m| m.as_str())
            .filter(|t| t.chars().all(|c| c.is_ascii_digit()) || t.len() > 2)
            .map(stem)
            .collect::<Vec<_>>()
            .join(" ");
    }
    let stripped = PUNCTUATION.replace_all(&folded, " ");
    WHITESPACE.replace_all(&stripped, " ").trim().to_string()
}

/// Strips one common English suffix from an alphabetic token. Numeric tokens pass through.
pub fn stem(token: &str) -> String {
    if !token.chars().all(|c| c.is_ascii_alphabetic()) {
        return token.to_string();
    }
    for (suffix, replacement) in SUFFIX_RULES {
        if let Some(base) = token.strip_suffix(suffix) {
            if base.len() + replacement.len() < MIN_STEM_LEN {
                return token.to_string();
            }
            return format!("{base}{replacement}");
        }
    }
    token.to_string()
}

/// Drops a non-blank line whose signature equals the previous non-blank line's.
/// Blank lines are kept so paragraph boundaries survive.
pub fn dedupe_consecutive_lines(text: &str, stemming: bool) -> String {
    let mut out: Vec<&str> = Vec::new();
    let mut last_sig: Option<String> = None;

    for line in text.split('\n') {
        let current = line.trim();
        if current.is_empty() {
            out.push(line);
            continue;
        }
        let sig = signature(current, stemming);
        if !sig.is_empty() && last_sig.as_deref() == Some(sig.as_str()) {
            continue;
        }
        out.push(line);
        last_sig = Some(sig);
    }

    out.join("\n")
}

/// Splits normalized text on blank lines into trimmed, non-empty paragraphs.
pub fn segment_paragraphs(text: &str) -> Vec<String> {
    text.split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(String::from)
        .collect()
}
