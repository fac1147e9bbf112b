//! Scoring entry points.
//!
//! [`score_resume`] is the synchronous core: a pure function of its input,
//! signals and `today`. [`ScoringContext`] wraps it with the collaborator calls
//! and is built once at startup.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use xxhash_rust::xxh64::xxh64;

use crate::collaborators::{CollaboratorError, Collaborators};
use crate::preprocess::{document_id, preprocess_text, PreprocessConfig, PreprocessedResume};

use super::engine::{evaluate, ScoreResult};
use super::features::{FeatureBuilder, FeatureRecord, EXPERIENCED_MIN_YEARS};
use super::hybrid::{blend, HybridResult, MlResult};
use super::rubric::{AgentProfile, RubricTable};
use super::subscores::compute_subscores;

/// Caller input for one evaluation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EvaluationInput {
    pub resume_text: String,
    #[serde(default)]
    pub job_description: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    /// Flag used for the hybrid label cutoff. Defaults to false.
    #[serde(default)]
    pub has_experience: Option<bool>,
    #[serde(default)]
    pub years_experience: Option<f64>,
    #[serde(default)]
    pub remote_alignment: Option<f64>,
    #[serde(default)]
    pub compensation_score: Option<f64>,
    #[serde(default)]
    pub document_id: Option<String>,
}

impl EvaluationInput {
    pub fn new(resume_text: impl Into<String>) -> Self {
        Self {
            resume_text: resume_text.into(),
            ..Default::default()
        }
    }

    pub fn document_id(&self) -> String {
        self.document_id
            .clone()
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| document_id(&self.resume_text))
    }

    /// xxh64 hex digest of every caller-supplied input besides the résumé text.
    /// Two requests with the same document id and input key score identically.
    pub fn input_key(&self) -> String {
        let job = self
            .job_description
            .as_deref()
            .map(str::trim)
            .filter(|j| !j.is_empty());
        let mut skills: Vec<String> = self
            .skills
            .iter()
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();
        skills.sort();
        skills.dedup();

        let canonical = format!(
            "{:?}|{:?}|{:?}|{:?}|{:?}|{:?}",
            job,
            skills,
            self.has_experience.unwrap_or(false),
            self.years_experience,
            self.remote_alignment,
            self.compensation_score,
        );
        format!("{:016x}", xxh64(canonical.as_bytes(), 0))
    }
}

/// Values gathered from collaborators before the core runs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExternalSignals {
    pub semantic_similarity: Option<f64>,
    pub classified_experienced: Option<bool>,
}

/// Everything the core produces for one résumé.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RubricEvaluation {
    pub document_id: String,
    pub preprocessed: PreprocessedResume,
    pub features: FeatureRecord,
    pub agent: AgentProfile,
    pub result: ScoreResult,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evaluation {
    pub rubric: RubricEvaluation,
    pub hybrid: HybridResult,
    pub semantic_match: f64,
}

/// Classifier answer when present, else `yearsTotal ≥ 2.0`.
pub fn select_agent(classified: Option<bool>, years_total: f64) -> AgentProfile {
    AgentProfile::from_has_experience(classified.unwrap_or(years_total >= EXPERIENCED_MIN_YEARS))
}

fn build_features(
    input: &EvaluationInput,
    preprocessed: &PreprocessedResume,
    semantic_similarity: Option<f64>,
    today: NaiveDate,
) -> FeatureRecord {
    let precomputed = input.years_experience.or_else(|| {
        (preprocessed.years_experience > 0.0).then_some(preprocessed.years_experience)
    });
    FeatureBuilder::new(&preprocessed.clean_text)
        .explicit_skills(&input.skills)
        .section_skills(&preprocessed.skills)
        .experiences(&preprocessed.experiences)
        .precomputed_years(precomputed)
        .semantic_similarity(semantic_similarity)
        .remote_alignment(input.remote_alignment)
        .compensation_score(input.compensation_score)
        .build(today)
}

/// Preprocess → features → agent → subscores → rubric result.
pub fn score_resume(
    rubric: &RubricTable,
    config: &PreprocessConfig,
    input: &EvaluationInput,
    signals: &ExternalSignals,
    today: NaiveDate,
) -> RubricEvaluation {
    let preprocessed = preprocess_text(&input.resume_text, config, today);
    let features = build_features(input, &preprocessed, signals.semantic_similarity, today);
    let agent = select_agent(signals.classified_experienced, features.years_total);
    let subscores = compute_subscores(&features, agent, rubric);
    let result = evaluate(rubric, agent, subscores);

    RubricEvaluation {
        document_id: input.document_id(),
        preprocessed,
        features,
        agent,
        result,
    }
}

/// Shared, read-only scoring context.
pub struct ScoringContext {
    pub rubric: RubricTable,
    pub preprocess: PreprocessConfig,
    pub collaborators: Collaborators,
}

fn log_unavailable(collaborator: &str, err: &CollaboratorError) {
    match err {
        CollaboratorError::Disabled(_) => debug!(collaborator, "collaborator disabled"),
        CollaboratorError::Parse(e) => {
            debug!(collaborator, error = %e, "collaborator response unparseable")
        }
        other => warn!(collaborator, error = %other, "collaborator unavailable, using fallback"),
    }
}

impl ScoringContext {
    pub fn new(
        rubric: RubricTable,
        preprocess: PreprocessConfig,
        collaborators: Collaborators,
    ) -> Self {
        Self {
            rubric,
            preprocess,
            collaborators,
        }
    }

    async fn gather_signals(&self, input: &EvaluationInput) -> ExternalSignals {
        let semantic_similarity = match input.job_description.as_deref().map(str::trim) {
            Some(job) if !job.is_empty() => {
                match self.collaborators.similarity.similarity(&input.resume_text, job).await {
                    Ok(sim) => Some(sim),
                    Err(e) => {
                        log_unavailable("similarity", &e);
                        Some(0.0)
                    }
                }
            }
            _ => None,
        };

        let classified = self.collaborators.classifier.classify(&input.resume_text).await;
        let classified_experienced = match classified {
            Ok(flag) => Some(flag),
            Err(e) => {
                log_unavailable("classifier", &e);
                None
            }
        };

        ExternalSignals {
            semantic_similarity,
            classified_experienced,
        }
    }

    async fn ml_result(&self, rubric: &RubricEvaluation) -> Option<MlResult> {
        match self.collaborators.cluster.score(&rubric.features.cluster_features()).await {
            Ok(ml) => Some(ml),
            Err(e) => {
                log_unavailable("cluster", &e);
                None
            }
        }
    }

    /// Full evaluation: collaborator signals, the core, then the hybrid blend.
    pub async fn evaluate(&self, input: &EvaluationInput, today: NaiveDate) -> Evaluation {
        let signals = self.gather_signals(input).await;
        let rubric = score_resume(&self.rubric, &self.preprocess, input, &signals, today);
        let ml = self.ml_result(&rubric).await;
        let hybrid = blend(
            rubric.result.clone(),
            ml.as_ref(),
            input.has_experience.unwrap_or(false),
            &self.rubric,
        );
        Evaluation {
            semantic_match: rubric.features.semantic_similarity.unwrap_or(0.0),
            rubric,
            hybrid,
        }
    }

    /// Preprocessing and features only; no collaborator is consulted.
    pub fn extract(&self, input: &EvaluationInput, today: NaiveDate) -> RubricEvaluation {
        score_resume(&self.rubric, &self.preprocess, input, &ExternalSignals::default(), today)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;

    use super::*;
    use crate::collaborators::{ClusterScorer, ExperienceClassifier, SimilarityProvider};
    use crate::scoring::features::ClusterFeatures;
    use crate::scoring::hybrid::BlendMethod;

    pub const RESUME: &str = "Ana Souza\nana.souza@mail.com | (11) 91234-5678\n\nSummary\nBackend developer focused on payments.\n\nExperience\nSoftware Engineer\nJanuary 2015 to December 2019\nAcme Corp\nReduced checkout latency by 35% for 2000 users\n\nSenior Software Engineer 2020 - Present Globex\nLed migration to Rust services\n\nEducation\nBSc Computer Science\n\nSkills\nRust, Python - 5 years, SQL, Docker, Kubernetes\n\nProjects\ngithub.com/ana";

    pub struct FixedSimilarity(pub f64);

    #[async_trait]
    impl SimilarityProvider for FixedSimilarity {
        async fn similarity(&self, _resume: &str, _job: &str) -> Result<f64, CollaboratorError> {
            Ok(self.0)
        }

        fn name(&self) -> &'static str {
            "fixed"
        }
    }

    pub struct FixedCluster(pub MlResult);

    #[async_trait]
    impl ClusterScorer for FixedCluster {
        async fn score(&self, _features: &ClusterFeatures) -> Result<MlResult, CollaboratorError> {
            Ok(self.0.clone())
        }

        fn name(&self) -> &'static str {
            "fixed"
        }
    }

    pub struct FixedClassifier(pub bool);

    #[async_trait]
    impl ExperienceClassifier for FixedClassifier {
        async fn classify(&self, _text: &str) -> Result<bool, CollaboratorError> {
            Ok(self.0)
        }

        fn name(&self) -> &'static str {
            "fixed"
        }
    }

    pub fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    pub fn fake_collaborators() -> Collaborators {
        Collaborators {
            similarity: Arc::new(FixedSimilarity(0.8)),
            cluster: Arc::new(FixedCluster(MlResult {
                score: 70.0,
                cluster_id: 1,
                cluster_quality: 0.5,
                is_outlier: false,
                label: None,
            })),
            classifier: Arc::new(FixedClassifier(true)),
        }
    }

    fn context(collaborators: Collaborators) -> ScoringContext {
        ScoringContext::new(RubricTable::v1(), PreprocessConfig::default(), collaborators)
    }

    #[test]
    fn test_select_agent() {
        assert_eq!(select_agent(None, 2.0), AgentProfile::Experienced);
        assert_eq!(select_agent(None, 1.9), AgentProfile::NoExperience);
        assert_eq!(select_agent(Some(false), 9.0), AgentProfile::NoExperience);
    }

    #[test]
    fn test_score_resume_is_deterministic() {
        let input = EvaluationInput::new(RESUME);
        let signals = ExternalSignals::default();
        let (rubric, config) = (RubricTable::v1(), PreprocessConfig::default());
        let a = score_resume(&rubric, &config, &input, &signals, today());
        let b = score_resume(&rubric, &config, &input, &signals, today());
        assert_eq!(a, b);
    }

    #[test]
    fn test_score_resume_sample() {
        let input = EvaluationInput::new(RESUME);
        let out = score_resume(
            &RubricTable::v1(),
            &PreprocessConfig::default(),
            &input,
            &ExternalSignals::default(),
            today(),
        );
        assert_eq!(out.preprocessed.experiences.len(), 2);
        assert_eq!(out.features.years_total, 9.4);
        assert_eq!(out.agent, AgentProfile::Experienced);
        assert!(out.features.has_email && out.features.has_phone);
        assert!(out.result.final_score > 50.0);
        assert_eq!(out.document_id.len(), 16);
    }

    #[test]
    fn test_empty_resume_scores_low_without_failing() {
        let out = score_resume(
            &RubricTable::v1(),
            &PreprocessConfig::default(),
            &EvaluationInput::new(""),
            &ExternalSignals::default(),
            today(),
        );
        assert_eq!(out.agent, AgentProfile::NoExperience);
        assert!(out.result.final_score < 10.0);
    }

    #[test]
    fn test_caller_years_override_intervals() {
        let mut input = EvaluationInput::new(RESUME);
        input.years_experience = Some(1.0);
        let out = score_resume(
            &RubricTable::v1(),
            &PreprocessConfig::default(),
            &input,
            &ExternalSignals::default(),
            today(),
        );
        assert_eq!(out.features.years_total, 1.0);
        assert_eq!(out.agent, AgentProfile::NoExperience);
    }

    #[tokio::test]
    async fn test_evaluate_with_collaborators_blends() {
        let ctx = context(fake_collaborators());
        let mut input = EvaluationInput::new(RESUME);
        input.job_description = Some("Rust backend engineer".into());
        let out = ctx.evaluate(&input, today()).await;
        assert_eq!(out.semantic_match, 0.8);
        assert_eq!(out.hybrid.method, BlendMethod::Hybrid);
        assert_eq!(out.hybrid.ml_score, Some(70.0));
        assert_eq!(out.rubric.agent, AgentProfile::Experienced);
    }

    #[tokio::test]
    async fn test_evaluate_without_collaborators_falls_back() {
        let ctx = context(Collaborators::disabled());
        let mut input = EvaluationInput::new(RESUME);
        input.job_description = Some("Rust backend engineer".into());
        let out = ctx.evaluate(&input, today()).await;
        assert_eq!(out.semantic_match, 0.0);
        assert_eq!(out.hybrid.method, BlendMethod::RuleBased);
        assert_eq!(out.hybrid.score, out.rubric.result.final_score);
        assert_eq!(out.rubric.agent, AgentProfile::Experienced);
    }

    #[test]
    fn test_input_key_tracks_caller_inputs() {
        let bare = EvaluationInput::new(RESUME);
        let mut with_job = EvaluationInput::new(RESUME);
        with_job.job_description = Some("Rust backend engineer".into());
        let mut other_job = with_job.clone();
        other_job.job_description = Some("Data analyst".into());
        let mut flagged = EvaluationInput::new(RESUME);
        flagged.has_experience = Some(true);
        let mut years = EvaluationInput::new(RESUME);
        years.years_experience = Some(3.0);

        let keys = [
            bare.input_key(),
            with_job.input_key(),
            other_job.input_key(),
            flagged.input_key(),
            years.input_key(),
        ];
        for (i, a) in keys.iter().enumerate() {
            for b in &keys[i + 1..] {
                assert_ne!(a, b);
            }
        }
        assert_eq!(bare.document_id(), with_job.document_id());
    }

    #[test]
    fn test_input_key_ignores_cosmetic_differences() {
        let mut a = EvaluationInput::new(RESUME);
        a.skills = vec!["Rust".into(), "SQL".into()];
        a.job_description = Some("  ".into());
        a.has_experience = Some(false);
        let mut b = EvaluationInput::new("different text");
        b.skills = vec!["sql".into(), " rust ".into(), "rust".into()];

        assert_eq!(a.input_key(), b.input_key());
        assert_eq!(a.input_key().len(), 16);
    }

    #[test]
    fn test_document_id_prefers_caller_value() {
        let mut input = EvaluationInput::new("text");
        assert_eq!(input.document_id(), document_id("text"));
        input.document_id = Some("abc".into());
        assert_eq!(input.document_id(), "abc");
    }
}
