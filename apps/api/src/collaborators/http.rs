//! HTTP-backed collaborators. One JSON POST per call, no retries.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::debug;

use super::{ClusterScorer, CollaboratorError, ExperienceClassifier, SimilarityProvider};
use crate::scoring::features::ClusterFeatures;
use crate::scoring::hybrid::MlResult;

#[derive(Debug, Deserialize)]
struct ServiceError {
    error: String,
}

/// Shared JSON client for all collaborator services.
#[derive(Clone)]
pub struct ServiceClient {
    client: Client,
}

impl ServiceClient {
    pub fn new(timeout: Duration) -> Result<Self, CollaboratorError> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
        })
    }

    async fn post_json<B, T>(&self, url: &str, body: &B) -> Result<T, CollaboratorError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let response = self.client.post(url).json(body).send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ServiceError>(&text)
                .map(|e| e.error)
                .unwrap_or(text);
            return Err(CollaboratorError::Api {
                status: status.as_u16(),
                message,
            });
        }

        debug!(url, status = status.as_u16(), "collaborator call succeeded");
        Ok(serde_json::from_str(&text)?)
    }
}

#[derive(Serialize)]
struct SimilarityRequest<'a> {
    resume_text: &'a str,
    job_text: &'a str,
}

#[derive(Deserialize)]
struct SimilarityResponse {
    similarity: f64,
}

pub struct HttpSimilarity {
    client: ServiceClient,
    url: String,
}

impl HttpSimilarity {
    pub fn new(client: ServiceClient, url: String) -> Self {
        Self { client, url }
    }
}

#[async_trait]
impl SimilarityProvider for HttpSimilarity {
    async fn similarity(&self, resume: &str, job: &str) -> Result<f64, CollaboratorError> {
        if job.trim().is_empty() {
            return Ok(0.0);
        }
        let body = SimilarityRequest {
            resume_text: resume,
            job_text: job,
        };
        let response: SimilarityResponse = self.client.post_json(&self.url, &body).await?;
        Ok(response.similarity)
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

#[derive(Serialize)]
struct ClusterRequest<'a> {
    features: &'a [f64; 11],
}

pub struct HttpClusterScorer {
    client: ServiceClient,
    url: String,
}

impl HttpClusterScorer {
    pub fn new(client: ServiceClient, url: String) -> Self {
        Self { client, url }
    }
}

#[async_trait]
impl ClusterScorer for HttpClusterScorer {
    async fn score(&self, features: &ClusterFeatures) -> Result<MlResult, CollaboratorError> {
        let body = ClusterRequest {
            features: &features.0,
        };
        self.client.post_json(&self.url, &body).await
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

#[derive(Serialize)]
struct ClassifyRequest<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct ClassifyResponse {
    is_experienced: bool,
}

pub struct HttpClassifier {
    client: ServiceClient,
    url: String,
}

impl HttpClassifier {
    pub fn new(client: ServiceClient, url: String) -> Self {
        Self { client, url }
    }
}

#[async_trait]
impl ExperienceClassifier for HttpClassifier {
    async fn classify(&self, text: &str) -> Result<bool, CollaboratorError> {
        let request = ClassifyRequest { text };
        let response: ClassifyResponse = self.client.post_json(&self.url, &request).await?;
        Ok(response.is_experienced)
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
