//! External collaborators of the scoring core: embedding similarity, cluster
//! scoring and experience classification.
//!
//! Each collaborator is an async trait carried as `Arc<dyn _>` inside the
//! scoring context. A `Disabled*` implementation stands in when no service URL
//! is configured; callers treat any error as "unavailable" and fall back.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::scoring::features::ClusterFeatures;
use crate::scoring::hybrid::MlResult;

pub mod http;

#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("{0} is not configured")]
    Disabled(&'static str),
}

#[async_trait]
pub trait SimilarityProvider: Send + Sync {
    /// Similarity in [0,1] between a résumé and a job description.
    async fn similarity(&self, resume: &str, job: &str) -> Result<f64, CollaboratorError>;

    fn name(&self) -> &'static str;
}

#[async_trait]
pub trait ClusterScorer: Send + Sync {
    async fn score(&self, features: &ClusterFeatures) -> Result<MlResult, CollaboratorError>;

    fn name(&self) -> &'static str;
}

#[async_trait]
pub trait ExperienceClassifier: Send + Sync {
    /// True when the résumé reads as an experienced professional.
    async fn classify(&self, text: &str) -> Result<bool, CollaboratorError>;

    fn name(&self) -> &'static str;
}

pub struct DisabledSimilarity;

#[async_trait]
impl SimilarityProvider for DisabledSimilarity {
    async fn similarity(&self, _resume: &str, _job: &str) -> Result<f64, CollaboratorError> {
        Err(CollaboratorError::Disabled("similarity provider"))
    }

    fn name(&self) -> &'static str {
        "disabled"
    }
}

pub struct DisabledClusterScorer;

#[async_trait]
impl ClusterScorer for DisabledClusterScorer {
    async fn score(&self, _features: &ClusterFeatures) -> Result<MlResult, CollaboratorError> {
        Err(CollaboratorError::Disabled("cluster scorer"))
    }

    fn name(&self) -> &'static str {
        "disabled"
    }
}

pub struct DisabledClassifier;

#[async_trait]
impl ExperienceClassifier for DisabledClassifier {
    async fn classify(&self, _text: &str) -> Result<bool, CollaboratorError> {
        Err(CollaboratorError::Disabled("experience classifier"))
    }

    fn name(&self) -> &'static str {
        "disabled"
    }
}

/// The three collaborator handles, as wired at startup.
#[derive(Clone)]
pub struct Collaborators {
    pub similarity: Arc<dyn SimilarityProvider>,
    pub cluster: Arc<dyn ClusterScorer>,
    pub classifier: Arc<dyn ExperienceClassifier>,
}

impl Collaborators {
    pub fn disabled() -> Self {
        Self {
            similarity: Arc::new(DisabledSimilarity),
            cluster: Arc::new(DisabledClusterScorer),
            classifier: Arc::new(DisabledClassifier),
        }
    }
}
