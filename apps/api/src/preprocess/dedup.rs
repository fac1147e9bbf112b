//! Paragraph deduplication.
//!
//! Exact duplicates are caught by canonical signature. Near duplicates are caught
//! either by a MinHash LSH index over lowercase whitespace tokens, or by a pairwise
//! character-ratio comparison against every kept paragraph.

use std::collections::{HashMap, HashSet};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use similar::TextDiff;
use xxhash_rust::xxh64::xxh64;

use super::normalize::signature;

pub const DEFAULT_NUM_PERM: usize = 128;
pub const DEFAULT_MIN_SIMILARITY: f64 = 0.96;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DedupBackend {
    MinHash,
    Pairwise,
}

impl DedupBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            DedupBackend::MinHash => "minhash",
            DedupBackend::Pairwise => "pairwise",
        }
    }
}

impl FromStr for DedupBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "minhash" | "lsh" => Ok(DedupBackend::MinHash),
            "pairwise" | "ratio" => Ok(DedupBackend::Pairwise),
            other => Err(format!("unknown dedup backend '{other}'")),
        }
    }
}

/// Result of one deduplication pass. `kept` preserves input order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParagraphDedup {
    pub kept: Vec<String>,
    pub removed_exact: Vec<String>,
    pub removed_near: Vec<String>,
}

impl ParagraphDedup {
    pub fn total(&self) -> usize {
        self.kept.len() + self.removed_exact.len() + self.removed_near.len()
    }

    pub fn removed(&self) -> usize {
        self.removed_exact.len() + self.removed_near.len()
    }

    /// Fraction of input paragraphs dropped, 0 for empty input.
    pub fn dup_rate(&self) -> f64 {
        match self.total() {
            0 => 0.0,
            total => self.removed() as f64 / total as f64,
        }
    }
}

/// Character-level similarity `2·M / T` where M is the matched character count
/// of an optimal diff and T the combined length. Two empty strings score 1.
pub fn similarity_ratio(a: &str, b: &str) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    f64::from(TextDiff::from_chars(a, b).ratio())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MinHash {
    values: Vec<u64>,
}

impl MinHash {
    /// Sketch of the token set; permutation `i` hashes each token with seed `i`.
    pub fn from_tokens<'a>(tokens: impl IntoIterator<Item = &'a str>, num_perm: usize) -> Self {
        let mut values = vec![u64::MAX; num_perm];
        let unique: HashSet<&str> = tokens.into_iter().collect();
        for token in unique {
            for (seed, slot) in values.iter_mut().enumerate() {
                let h = xxh64(token.as_bytes(), seed as u64);
                if h < *slot {
                    *slot = h;
                }
            }
        }
        Self { values }
    }

    /// Estimated Jaccard similarity: fraction of agreeing permutation minima.
    pub fn jaccard(&self, other: &MinHash) -> f64 {
        if self.values.is_empty() || self.values.len() != other.values.len() {
            return 0.0;
        }
        let agree = self
            .values
            .iter()
            .zip(&other.values)
            .filter(|(a, b)| a == b)
            .count();
        agree as f64 / self.values.len() as f64
    }
}

/// Banded LSH index built incrementally from kept paragraphs.
struct LshIndex {
    rows: usize,
    buckets: Vec<HashMap<u64, Vec<usize>>>,
    sketches: Vec<MinHash>,
    threshold: f64,
}

impl LshIndex {
    fn new(num_perm: usize, threshold: f64) -> Self {
        let (bands, rows) = band_layout(num_perm, threshold);
        Self {
            rows,
            buckets: (0..bands).map(|_| HashMap::new()).collect(),
            sketches: Vec::new(),
            threshold,
        }
    }

    fn band_keys<'a>(&'a self, sketch: &'a MinHash) -> impl Iterator<Item = u64> + 'a {
        sketch.values.chunks(self.rows).take(self.buckets.len()).map(|band| {
            let bytes: Vec<u8> = band.iter().flat_map(|v| v.to_le_bytes()).collect();
            xxh64(&bytes, 0)
        })
    }

    /// True when a previously inserted sketch shares a band and clears the threshold.
    fn has_near_duplicate(&self, sketch: &MinHash) -> bool {
        let mut seen = HashSet::new();
        for (band, key) in self.band_keys(sketch).enumerate() {
            let Some(ids) = self.buckets[band].get(&key) else {
                continue;
            };
            for &id in ids {
                if seen.insert(id) && self.sketches[id].jaccard(sketch) >= self.threshold {
                    return true;
                }
            }
        }
        false
    }

    fn insert(&mut self, sketch: MinHash) {
        let id = self.sketches.len();
        let keys: Vec<u64> = self.band_keys(&sketch).collect();
        for (band, key) in keys.into_iter().enumerate() {
            self.buckets[band].entry(key).or_default().push(id);
        }
        self.sketches.push(sketch);
    }
}

/// Picks (bands, rows) with `bands · rows = num_perm` whose S-curve midpoint
/// `(1/b)^(1/r)` lies closest to the threshold.
fn band_layout(num_perm: usize, threshold: f64) -> (usize, usize) {
    let num_perm = num_perm.max(1);
    (1..=num_perm)
        .filter(|b| num_perm % b == 0)
        .map(|b| (b, num_perm / b))
        .min_by(|(b1, r1), (b2, r2)| {
            let d1 = ((1.0 / *b1 as f64).powf(1.0 / *r1 as f64) - threshold).abs();
            let d2 = ((1.0 / *b2 as f64).powf(1.0 / *r2 as f64) - threshold).abs();
            d1.total_cmp(&d2)
        })
        .unwrap_or((1, num_perm))
}

#[derive(Debug, Clone)]
pub struct ParagraphDeduplicator {
    pub threshold: f64,
    pub num_perm: usize,
    pub backend: DedupBackend,
    pub stemming: bool,
}

impl Default for ParagraphDeduplicator {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_MIN_SIMILARITY,
            num_perm: DEFAULT_NUM_PERM,
            backend: DedupBackend::MinHash,
            stemming: true,
        }
    }
}

impl ParagraphDeduplicator {
    /// Stemmed signature, or the plain one when stemming leaves no tokens
    /// (paragraphs made only of short words such as "Go" or "UX").
    fn signature(&self, paragraph: &str) -> String {
        let sig = signature(paragraph, self.stemming);
        if sig.is_empty() && self.stemming {
            return signature(paragraph, false);
        }
        sig
    }

    pub fn dedupe(&self, paragraphs: &[String]) -> ParagraphDedup {
        let mut out = ParagraphDedup::default();
        let mut seen_signatures: HashSet<String> = HashSet::new();
        let mut kept_signatures: Vec<String> = Vec::new();
        let mut index = LshIndex::new(self.num_perm, self.threshold);

        for paragraph in paragraphs {
            let sig = self.signature(paragraph);
            if !sig.is_empty() && seen_signatures.contains(&sig) {
                out.removed_exact.push(paragraph.clone());
                continue;
            }

            let near = match self.backend {
                DedupBackend::MinHash => {
                    let lowered = paragraph.to_lowercase();
                    let sketch = MinHash::from_tokens(lowered.split_whitespace(), self.num_perm);
                    let near = index.has_near_duplicate(&sketch);
                    if !near {
                        index.insert(sketch);
                    }
                    near
                }
                DedupBackend::Pairwise => {
                    !sig.is_empty()
                        && kept_signatures
                            .iter()
                            .any(|kept| similarity_ratio(&sig, kept) >= self.threshold)
                }
            };

            if near {
                out.removed_near.push(paragraph.clone());
                continue;
            }

            seen_signatures.insert(sig.clone());
            kept_signatures.push(sig);
            out.kept.push(paragraph.clone());
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairwise(threshold: f64) -> ParagraphDeduplicator {
        ParagraphDeduplicator {
            threshold,
            backend: DedupBackend::Pairwise,
            stemming: false,
            ..Default::default()
        }
    }

    fn paras(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_empty_input() {
        let out = ParagraphDeduplicator::default().dedupe(&[]);
        assert!(out.kept.is_empty());
        assert_eq!(out.dup_rate(), 0.0);
    }

    #[test]
    fn test_identical_paragraphs_removed_as_exact() {
        let input = paras(&["Built data pipelines in Rust.", "Built data pipelines in Rust."]);
        let out = ParagraphDeduplicator::default().dedupe(&input);
        assert_eq!(out.kept, paras(&["Built data pipelines in Rust."]));
        assert_eq!(out.removed_exact.len(), 1);
        assert!(out.removed_near.is_empty());
        assert!((out.dup_rate() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_case_and_punctuation_variants_are_exact_duplicates() {
        let input = paras(&["Led the TEAM!", "led the team"]);
        let out = pairwise(0.96).dedupe(&input);
        assert_eq!(out.kept.len(), 1);
        assert_eq!(out.removed_exact.len(), 1);
    }

    #[test]
    fn test_pairwise_near_duplicate_at_threshold() {
        let a = "a".repeat(100);
        let b = format!("{}bbb", "a".repeat(97));
        let input = vec![a.clone(), b.clone()];

        let out = pairwise(0.96).dedupe(&input);
        assert_eq!(out.kept, vec![a.clone()]);
        assert_eq!(out.removed_near, vec![b.clone()]);

        let out = pairwise(0.99).dedupe(&input);
        assert_eq!(out.kept, vec![a, b]);
        assert!(out.removed_near.is_empty());
    }

    #[test]
    fn test_minhash_drops_reordered_paragraph() {
        let input = paras(&[
            "designed rust services for payments and billing",
            "billing and payments services rust for designed",
        ]);
        let out = ParagraphDeduplicator::default().dedupe(&input);
        assert_eq!(out.kept.len(), 1);
        assert_eq!(out.removed_near.len(), 1);
    }

    #[test]
    fn test_minhash_keeps_unrelated_paragraphs() {
        let input = paras(&[
            "designed rust services for payments and billing",
            "taught mathematics to high school students",
            "managed warehouse inventory and shipping schedules",
        ]);
        let out = ParagraphDeduplicator::default().dedupe(&input);
        assert_eq!(out.kept, input);
    }

    #[test]
    fn test_short_word_paragraphs_are_not_exact_duplicates() {
        let input = paras(&["Go", "C#", "UX"]);
        let out = ParagraphDeduplicator::default().dedupe(&input);
        assert_eq!(out.kept, input);
        assert!(out.removed_exact.is_empty());

        let out = ParagraphDeduplicator {
            backend: DedupBackend::Pairwise,
            ..Default::default()
        }
        .dedupe(&input);
        assert_eq!(out.kept, input);
    }

    #[test]
    fn test_symbol_only_paragraphs_are_kept() {
        let input = paras(&["---", "***"]);
        let out = pairwise(0.96).dedupe(&input);
        assert_eq!(out.kept, input);
    }

    fn tokens(prefix: &str, range: std::ops::Range<usize>) -> Vec<String> {
        range.map(|i| format!("{prefix}{i}")).collect()
    }

    #[test]
    fn test_minhash_drops_pair_above_threshold() {
        let base = tokens("tok", 0..400);
        let mut extended = base.clone();
        extended.push("extra".into());
        let input = vec![base.join(" "), extended.join(" ")];

        let out = ParagraphDeduplicator::default().dedupe(&input);
        assert_eq!(out.kept, vec![input[0].clone()]);
        assert_eq!(out.removed_near, vec![input[1].clone()]);
        assert!(out.removed_exact.is_empty());
    }

    #[test]
    fn test_minhash_keeps_pair_below_threshold() {
        let base = tokens("tok", 0..400);
        let mut shifted = tokens("tok", 0..320);
        shifted.extend(tokens("other", 0..80));
        let input = vec![base.join(" "), shifted.join(" ")];

        let out = ParagraphDeduplicator::default().dedupe(&input);
        assert_eq!(out.kept, input);
        assert!(out.removed_near.is_empty());
    }

    #[test]
    fn test_kept_preserves_input_order() {
        let input = paras(&["third", "first", "third", "second"]);
        let out = pairwise(0.96).dedupe(&input);
        assert_eq!(out.kept, paras(&["third", "first", "second"]));
    }

    #[test]
    fn test_minhash_jaccard_of_identical_sets_is_one() {
        let a = MinHash::from_tokens(["x", "y", "z"], 64);
        let b = MinHash::from_tokens(["z", "y", "x", "x"], 64);
        assert_eq!(a.jaccard(&b), 1.0);
    }

    #[test]
    fn test_band_layout_for_default_threshold() {
        assert_eq!(band_layout(128, 0.96), (4, 32));
    }

    #[test]
    fn test_backend_from_str() {
        assert_eq!("MinHash".parse::<DedupBackend>(), Ok(DedupBackend::MinHash));
        assert_eq!("pairwise".parse::<DedupBackend>(), Ok(DedupBackend::Pairwise));
        assert!("bogus".parse::<DedupBackend>().is_err());
    }

    #[test]
    fn test_similarity_ratio_bounds() {
        assert_eq!(similarity_ratio("", ""), 1.0);
        assert_eq!(similarity_ratio("abc", "abc"), 1.0);
        assert_eq!(similarity_ratio("abc", "xyz"), 0.0);
    }
}
