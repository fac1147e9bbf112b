//! Preprocessing pipeline: raw résumé text → clean text, skills, experience
//! blocks and total years of experience.

pub mod dates;
pub mod dedup;
pub mod experience;
pub mod intervals;
pub mod normalize;
pub mod skills;

use chrono::NaiveDate;
use serde::Serialize;
use xxhash_rust::xxh64::xxh64;

use dedup::{DedupBackend, ParagraphDeduplicator, DEFAULT_MIN_SIMILARITY, DEFAULT_NUM_PERM};
use experience::{ExperienceEntry, DEFAULT_EXPERIENCE_SIMILARITY};

#[derive(Debug, Clone)]
pub struct PreprocessConfig {
    pub min_similarity: f64,
    pub num_perm: usize,
    pub backend: DedupBackend,
    pub stemming: bool,
    pub experience_similarity: f64,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            min_similarity: DEFAULT_MIN_SIMILARITY,
            num_perm: DEFAULT_NUM_PERM,
            backend: DedupBackend::MinHash,
            stemming: true,
            experience_similarity: DEFAULT_EXPERIENCE_SIMILARITY,
        }
    }
}

impl PreprocessConfig {
    fn deduplicator(&self) -> ParagraphDeduplicator {
        ParagraphDeduplicator {
            threshold: self.min_similarity,
            num_perm: self.num_perm,
            backend: self.backend,
            stemming: self.stemming,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PreprocessStats {
    pub paragraphs_in: usize,
    pub paragraphs_kept: usize,
    pub removed_exact: usize,
    pub removed_near: usize,
    pub paragraph_dup_rate: f64,
    pub experiences_found: usize,
    pub experiences_kept: usize,
    pub backend: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreprocessedResume {
    pub clean_text: String,
    pub skills: Vec<String>,
    pub experiences: Vec<ExperienceEntry>,
    pub years_experience: f64,
    pub stats: PreprocessStats,
}

/// Stable identity for a résumé: xxh64 (seed 0) of the normalized text, as hex.
pub fn document_id(raw: &str) -> String {
    format!("{:016x}", xxh64(normalize::normalize_text(raw).as_bytes(), 0))
}

/// Runs the whole preprocessing chain. Total: never fails, blank input yields
/// an empty result.
///
/// Fragmented dates are rebuilt before any line or paragraph dedup so repeated
/// `to` lines from different ranges are not collapsed first.
pub fn preprocess_text(
    raw: &str,
    config: &PreprocessConfig,
    today: NaiveDate,
) -> PreprocessedResume {
    let normalized = normalize::normalize_text(raw);
    let rebuilt = dates::reconstruct_text(&normalized);
    let lines_deduped = normalize::dedupe_consecutive_lines(&rebuilt, config.stemming);
    let paragraphs = normalize::segment_paragraphs(&lines_deduped);

    let dedup = config.deduplicator().dedupe(&paragraphs);
    let clean_text = dedup.kept.join("\n\n");

    let skills = skills::extract_section_skills(&clean_text, config.stemming);

    let found = experience::extract_experiences(&clean_text);
    let experiences_found = found.len();
    let experiences = experience::dedupe_experiences(found, config.experience_similarity);
    let years_experience = intervals::total_years(&experiences, today);

    let stats = PreprocessStats {
        paragraphs_in: dedup.total(),
        paragraphs_kept: dedup.kept.len(),
        removed_exact: dedup.removed_exact.len(),
        removed_near: dedup.removed_near.len(),
        paragraph_dup_rate: dedup.dup_rate(),
        experiences_found,
        experiences_kept: experiences.len(),
        backend: config.backend.as_str(),
    };

    PreprocessedResume {
        clean_text,
        skills,
        experiences,
        years_experience,
        stats,
    }
}
