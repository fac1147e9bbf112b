//! Feature extraction: turns clean résumé text plus caller-supplied signals into
//! a [`FeatureRecord`]. Every extractor is total and defaults to zero/false.

use std::collections::{BTreeSet, HashSet};
use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::preprocess::experience::ExperienceEntry;
use crate::preprocess::intervals::total_years;
use crate::preprocess::normalize::signature;
use crate::preprocess::skills::{canonical_skill, match_vocabulary, skill_hits};

pub const MAX_FALLBACK_YEARS: f64 = 15.0;
pub const EXPERIENCED_MIN_YEARS: f64 = 2.0;

const MAX_METRICS_HITS: u32 = 15;
const MAX_CERT_MENTIONS: u32 = 5;
const MIN_TRIGRAM_TOKENS: usize = 10;
const PHONE_MIN_DIGITS: usize = 10;
const PHONE_MAX_DIGITS: usize = 15;

const PROJECT_KEYWORDS: &[&str] = &[
    "github.com",
    "gitlab.com",
    "bitbucket.org",
    "kaggle.com",
    "portfolio",
    "projeto",
    "side project",
    "open source",
];

const CERT_MENTION_KEYWORDS: &[&str] = &[
    "certification",
    "certificate",
    "certified",
    "aws",
    "azure",
    "google cloud",
];

static CERT_TABLE: LazyLock<Vec<(Regex, f64)>> = LazyLock::new(|| {
    [
        (r"(?i)aws certified cloud practitioner|\baws ccp\b", 0.3),
        (r"(?i)aws certified solutions architect|\baws saa\b", 0.5),
        (r"(?i)\baz-900\b", 0.3),
        (r"(?i)\bdp-203\b", 0.5),
        (r"(?i)\bsecurity\+", 0.4),
        (r"(?i)\bpmp\b", 0.5),
        (r"(?i)\bccna\b", 0.4),
        (r"(?i)\bcissp\b", 0.5),
        (r"(?i)certified scrum master|\bcsm\b", 0.3),
        (r"(?i)\bcpa\b", 0.5),
    ]
    .into_iter()
    .filter_map(|(pattern, points)| Regex::new(pattern).ok().map(|re| (re, points)))
    .collect()
});

static METRIC_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"\b\d+(?:\.\d+)?\s*%",
        r"(?i)(?:\$|r\$|usd\s?)\s?\d[\d,.]*\s*(?:k|m|mm|million|billion)?\b",
        r"(?i)\b\d{2,}\+?\s*(?:ms|rps|req/s|users|customers|clients|employees|people|accounts|stores|projects)\b",
        r"(?i)\b(?:increased|reduced|improved|optimized|grew|saved|cut|boosted|decreased|generated|aumentou|reduziu)\b[^.\n]{0,40}?\d+",
    ]
    .into_iter()
    .filter_map(|p| Regex::new(p).ok())
    .collect()
});

static SECTION_PATTERNS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    [
        ("contact", r"(?i)\b(?:contact|contato|personal information)\b"),
        ("summary", r"(?i)\b(?:summary|objective|profile|about me|resumo|objetivo)\b"),
        ("experience", r"(?i)\b(?:experience|work history|employment|experi[eê]ncia)\b"),
        ("education", r"(?i)\b(?:education|academic|forma[cç][aã]o)\b"),
        ("skills", r"(?i)\b(?:skills|qualifications|highlights|competencies|habilidades)\b"),
        ("projects", r"(?i)\b(?:projects|projetos|portfolio)\b"),
        ("certifications", r"(?i)\b(?:certifications?|certificates?|licenses|certifica[cç][oõ]es)\b"),
        ("languages", r"(?i)\b(?:languages|idiomas)\b"),
    ]
    .into_iter()
    .filter_map(|(name, p)| Regex::new(p).ok().map(|re| (name, re)))
    .collect()
});

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9-]+(?:\.[A-Za-z0-9-]+)+").expect("valid email regex")
});

static PHONE_CANDIDATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\+?\(?\d[\d \t().-]{7,}\d").expect("valid phone regex"));

static PHONE_STRICT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\(?\d{2,3}\)?[ .-]?\d{3,5}[ .-]?\d{4}\b").expect("valid strict phone regex")
});

static LINKEDIN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)linkedin\.com/").expect("valid linkedin regex"));

static YEARS_STATED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d{1,2}(?:\.\d+)?)\+?\s*(?:years?|yrs?|anos)\b").expect("valid years regex")
});

static YEAR_SPAN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b((?:19|20)\d{2})\s*-\s*((?:19|20)\d{2}|present|current|now|atual)\b")
        .expect("valid year span regex")
});

static JUNIOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:intern|internship|trainee|junior|jr\.?|estagi\w*|entry[- ]level)\b")
        .expect("valid junior regex")
});

static MID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:pleno|mid[- ]level)\b").expect("valid mid regex"));

static SENIOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:senior|sr\.?|lead|principal|staff engineer)\b").expect("valid senior regex")
});

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeniorityMarkers {
    pub junior: bool,
    pub mid: bool,
    pub senior: bool,
}

impl SeniorityMarkers {
    pub fn from_text(text: &str) -> Self {
        Self {
            junior: JUNIOR.is_match(text),
            mid: MID.is_match(text),
            senior: SENIOR.is_match(text),
        }
    }

    /// Junior vocabulary followed by mid or senior vocabulary.
    pub fn career_progression(&self) -> bool {
        self.junior && (self.mid || self.senior)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureRecord {
    pub skills: Vec<String>,
    pub years_total: f64,
    pub project_hits: u32,
    pub cert_points: f64,
    pub cert_mentions: u32,
    pub metrics_hits: u32,
    pub tokens: usize,
    pub sections_present: u32,
    pub dup_rate: f64,
    pub has_email: bool,
    pub has_phone: bool,
    pub has_linkedin: bool,
    pub semantic_similarity: Option<f64>,
    pub skill_depth_hits: u32,
    pub skill_qualifier_hits: u32,
    pub seniority: SeniorityMarkers,
    pub career_progression: bool,
    pub experience_count: usize,
    pub remote_alignment: Option<f64>,
    pub compensation_score: Option<f64>,
}

/// The 11-element vector consumed by the cluster scorer, in wire order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClusterFeatures(pub [f64; 11]);

impl FeatureRecord {
    pub fn is_experienced(&self) -> bool {
        self.years_total >= EXPERIENCED_MIN_YEARS
    }

    /// Coarse 0–1 profile completeness used inside the cluster vector.
    pub fn completeness(&self) -> f64 {
        let mut score = 0.0;
        if self.years_total > 0.0 {
            score += 0.2;
        }
        if !self.skills.is_empty() {
            score += 0.3;
        }
        if self.experience_count > 0 {
            score += 0.2;
        }
        if self.has_email || self.has_phone {
            score += 0.2;
        }
        if self.tokens > 300 {
            score += 0.1;
        }
        f64::min(score, 1.0)
    }

    pub fn cluster_features(&self) -> ClusterFeatures {
        let flag = |b: bool| if b { 1.0 } else { 0.0 };
        ClusterFeatures([
            self.skills.len() as f64,
            self.years_total,
            f64::from(self.project_hits),
            f64::from(self.cert_mentions),
            f64::from(self.metrics_hits.min(MAX_METRICS_HITS)),
            self.tokens as f64,
            flag(self.has_email),
            flag(self.has_phone),
            flag(self.has_linkedin),
            self.completeness(),
            flag(self.is_experienced()),
        ])
    }
}

pub fn count_project_hits(text: &str) -> u32 {
    let lowered = text.to_lowercase();
    PROJECT_KEYWORDS
        .iter()
        .filter(|k| lowered.contains(*k))
        .count() as u32
}

/// Sum of known-certification points, capped at 1.
pub fn cert_points(text: &str) -> f64 {
    let points: f64 = CERT_TABLE
        .iter()
        .filter(|(re, _)| re.is_match(text))
        .map(|(_, p)| p)
        .sum();
    points.min(1.0)
}

pub fn count_cert_mentions(text: &str) -> u32 {
    let lowered = text.to_lowercase();
    let hits = CERT_MENTION_KEYWORDS
        .iter()
        .filter(|k| lowered.contains(*k))
        .count() as u32;
    hits.min(MAX_CERT_MENTIONS)
}

pub fn count_metrics_hits(text: &str) -> u32 {
    let hits: usize = METRIC_PATTERNS.iter().map(|re| re.find_iter(text).count()).sum();
    (hits as u32).min(MAX_METRICS_HITS)
}

pub fn count_sections(text: &str, has_contact_details: bool) -> u32 {
    SECTION_PATTERNS
        .iter()
        .filter(|(name, re)| (*name == "contact" && has_contact_details) || re.is_match(text))
        .count() as u32
}

/// Fraction of repeated word trigrams; 0 below ten tokens.
pub fn trigram_dup_rate(text: &str) -> f64 {
    let tokens: Vec<String> = text.split_whitespace().map(str::to_lowercase).collect();
    if tokens.len() < MIN_TRIGRAM_TOKENS {
        return 0.0;
    }
    let trigrams: Vec<&[String]> = tokens.windows(3).collect();
    let unique: HashSet<&[String]> = trigrams.iter().copied().collect();
    1.0 - unique.len() as f64 / trigrams.len() as f64
}

pub fn has_email(text: &str) -> bool {
    EMAIL.is_match(text)
}

/// Phone numbers with 10 to 15 digits, tolerant of spaces and punctuation inside.
pub fn has_phone(text: &str) -> bool {
    let digits_in_range = |s: &str| {
        let n = s.chars().filter(char::is_ascii_digit).count();
        (PHONE_MIN_DIGITS..=PHONE_MAX_DIGITS).contains(&n)
    };
    PHONE_CANDIDATE.find_iter(text).any(|m| digits_in_range(m.as_str()))
        || PHONE_STRICT.find_iter(text).any(|m| digits_in_range(m.as_str()))
}

/// "X years" mentions and year spans in free text, whichever is larger, capped at 15.
pub fn years_from_text(text: &str, today: NaiveDate) -> f64 {
    let stated = YEARS_STATED
        .captures_iter(text)
        .filter_map(|c| c[1].parse::<f64>().ok())
        .fold(0.0, f64::max);

    let current_year = today.year();
    let spans = YEAR_SPAN
        .captures_iter(text)
        .filter_map(|c| {
            let start: i32 = c[1].parse().ok()?;
            let end: i32 = c[2].parse().unwrap_or(current_year);
            (end >= start).then(|| f64::from(end - start))
        })
        .fold(0.0, f64::max);

    stated.max(spans).min(MAX_FALLBACK_YEARS)
}

fn clamp_unit(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite()).map(|v| v.clamp(0.0, 1.0))
}

/// Single construction path for [`FeatureRecord`]. Caller-supplied values are
/// sanitized (non-finite dropped, ranges clamped) in [`FeatureBuilder::build`].
#[derive(Debug, Clone, Default)]
pub struct FeatureBuilder<'a> {
    text: &'a str,
    explicit_skills: &'a [String],
    section_skills: &'a [String],
    experiences: &'a [ExperienceEntry],
    precomputed_years: Option<f64>,
    semantic_similarity: Option<f64>,
    remote_alignment: Option<f64>,
    compensation_score: Option<f64>,
}

impl<'a> FeatureBuilder<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            text,
            ..Default::default()
        }
    }

    pub fn explicit_skills(mut self, skills: &'a [String]) -> Self {
        self.explicit_skills = skills;
        self
    }

    pub fn section_skills(mut self, skills: &'a [String]) -> Self {
        self.section_skills = skills;
        self
    }

    pub fn experiences(mut self, experiences: &'a [ExperienceEntry]) -> Self {
        self.experiences = experiences;
        self
    }

    pub fn precomputed_years(mut self, years: Option<f64>) -> Self {
        self.precomputed_years = years;
        self
    }

    pub fn semantic_similarity(mut self, similarity: Option<f64>) -> Self {
        self.semantic_similarity = similarity;
        self
    }

    pub fn remote_alignment(mut self, alignment: Option<f64>) -> Self {
        self.remote_alignment = alignment;
        self
    }

    pub fn compensation_score(mut self, score: Option<f64>) -> Self {
        self.compensation_score = score;
        self
    }

    fn resolve_years(&self, today: NaiveDate) -> f64 {
        if let Some(years) = self.precomputed_years.filter(|y| y.is_finite() && *y >= 0.0) {
            return years;
        }
        let from_intervals = total_years(self.experiences, today);
        if from_intervals > 0.0 {
            return from_intervals;
        }
        years_from_text(self.text, today)
    }

    pub fn build(self, today: NaiveDate) -> FeatureRecord {
        let text = self.text;

        let mut skills: BTreeSet<String> = self
            .explicit_skills
            .iter()
            .map(|s| canonical_skill(s))
            .filter(|s| !s.is_empty())
            .collect();
        skills.extend(match_vocabulary(text));
        // Section items are signatures; skip those already covered by a vocabulary skill.
        let known: HashSet<String> = skills
            .iter()
            .flat_map(|s| [signature(s, true), signature(s, false)])
            .collect();
        skills.extend(
            self.section_skills
                .iter()
                .filter(|s| !known.contains(s.as_str()))
                .cloned(),
        );
        let skills: Vec<String> = skills.into_iter().collect();

        let (skill_depth_hits, skill_qualifier_hits) = skill_hits(text, &skills);
        let has_email = has_email(text);
        let has_phone = has_phone(text);
        let seniority = SeniorityMarkers::from_text(text);

        FeatureRecord {
            years_total: self.resolve_years(today),
            project_hits: count_project_hits(text),
            cert_points: cert_points(text),
            cert_mentions: count_cert_mentions(text),
            metrics_hits: count_metrics_hits(text),
            tokens: text.split_whitespace().count(),
            sections_present: count_sections(text, has_email || has_phone),
            dup_rate: trigram_dup_rate(text).clamp(0.0, 1.0),
            has_email,
            has_phone,
            has_linkedin: LINKEDIN.is_match(text),
            semantic_similarity: clamp_unit(self.semantic_similarity),
            skill_depth_hits,
            skill_qualifier_hits,
            seniority,
            career_progression: seniority.career_progression(),
            experience_count: self.experiences.len(),
            remote_alignment: clamp_unit(self.remote_alignment),
            compensation_score: clamp_unit(self.compensation_score),
            skills,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    const SAMPLE: &str = "Maria Silva\nmaria.silva@mail.com | +55 11 91234-5678 | linkedin.com/in/maria\n\nSummary\nSenior data engineer.\n\nExperience\nData Engineer 2018 - Present Acme\nReduced costs by 30% and served 2000 users.\n\nEducation\nBSc Computer Science\n\nSkills\nPython - 6 years, SQL, Docker\n\nCertifications\nAWS Certified Solutions Architect, AZ-900\n\nProjects\ngithub.com/maria";

    #[test]
    fn test_empty_text_yields_zero_record() {
        let record = FeatureBuilder::new("").build(today());
        assert!(record.skills.is_empty());
        assert_eq!(record.years_total, 0.0);
        assert_eq!(record.tokens, 0);
        assert_eq!(record.sections_present, 0);
        assert!(!record.has_email && !record.has_phone);
        assert_eq!(record.semantic_similarity, None);
    }

    #[test]
    fn test_sample_record() {
        let record = FeatureBuilder::new(SAMPLE).build(today());
        assert!(record.has_email);
        assert!(record.has_phone);
        assert!(record.has_linkedin);
        assert!(record.skills.contains(&"python".to_string()));
        assert!(record.skills.contains(&"docker".to_string()));
        assert!((record.cert_points - 0.8).abs() < 1e-9);
        assert_eq!(record.project_hits, 1);
        assert!(record.metrics_hits >= 3);
        assert_eq!(record.sections_present, 7);
        assert_eq!(record.skill_depth_hits, 1);
        assert!(record.seniority.senior);
        assert_eq!(record.years_total, 6.0);
    }

    #[test]
    fn test_precomputed_years_wins() {
        let record = FeatureBuilder::new(SAMPLE)
            .precomputed_years(Some(3.5))
            .build(today());
        assert_eq!(record.years_total, 3.5);
    }

    #[test]
    fn test_interval_years_before_text_fallback() {
        let entries = vec![ExperienceEntry {
            title: "Dev".into(),
            company: "Acme".into(),
            raw_date_range: "2020 - 2022".into(),
            description: String::new(),
        }];
        let record = FeatureBuilder::new("I have 9 years of experience")
            .experiences(&entries)
            .build(today());
        assert_eq!(record.years_total, 2.0);
        assert_eq!(record.experience_count, 1);
    }

    #[test]
    fn test_caller_values_are_clamped() {
        let record = FeatureBuilder::new("text")
            .semantic_similarity(Some(1.7))
            .remote_alignment(Some(f64::NAN))
            .compensation_score(Some(-2.0))
            .build(today());
        assert_eq!(record.semantic_similarity, Some(1.0));
        assert_eq!(record.remote_alignment, None);
        assert_eq!(record.compensation_score, Some(0.0));
    }

    #[test]
    fn test_explicit_skills_are_canonicalized() {
        let explicit = vec!["ReactJS".to_string(), "  ".to_string()];
        let record = FeatureBuilder::new("").explicit_skills(&explicit).build(today());
        assert_eq!(record.skills, vec!["react"]);
    }

    #[test]
    fn test_section_skills_covered_by_vocabulary_are_not_repeated() {
        let section = vec!["kubernete".to_string(), "forklift".to_string()];
        let record = FeatureBuilder::new("Kubernetes operator")
            .section_skills(&section)
            .build(today());
        assert_eq!(record.skills, vec!["forklift", "kubernetes"]);
    }

    #[test]
    fn test_years_from_text() {
        assert_eq!(years_from_text("over 7+ years in retail", today()), 7.0);
        assert_eq!(years_from_text("Clerk 2019 - present", today()), 5.0);
        assert_eq!(years_from_text("40 years of wisdom", today()), 15.0);
        assert_eq!(years_from_text("nothing here", today()), 0.0);
    }

    #[test]
    fn test_phone_detection() {
        assert!(has_phone("call (555) 123-4567"));
        assert!(has_phone("tel 555 123 45 67"));
        assert!(!has_phone("2010 - 2012"));
        assert!(!has_phone("room 12345"));
    }

    #[test]
    fn test_trigram_dup_rate() {
        assert_eq!(trigram_dup_rate("too short to count"), 0.0);
        let repeated = "a b c a b c a b c a b c";
        assert!(trigram_dup_rate(repeated) > 0.5);
        let unique = "one two three four five six seven eight nine ten";
        assert_eq!(trigram_dup_rate(unique), 0.0);
    }

    #[test]
    fn test_cert_points_capped() {
        let text = "AWS Certified Solutions Architect, DP-203, PMP, CISSP";
        assert_eq!(cert_points(text), 1.0);
    }

    #[test]
    fn test_cluster_features_layout() {
        let record = FeatureBuilder::new(SAMPLE).build(today());
        let ClusterFeatures(v) = record.cluster_features();
        assert_eq!(v[0], record.skills.len() as f64);
        assert_eq!(v[1], 6.0);
        assert_eq!(v[6], 1.0);
        assert_eq!(v[10], 1.0);
        assert!(v[9] > 0.0 && v[9] <= 1.0);
    }

    #[test]
    fn test_career_progression() {
        let markers = SeniorityMarkers::from_text("Intern at X, later Senior engineer");
        assert!(markers.career_progression());
        assert!(!SeniorityMarkers::from_text("Junior analyst").career_progression());
    }
}
