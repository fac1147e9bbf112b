use std::str::FromStr;

use anyhow::{anyhow, Context, Result};

use crate::preprocess::dedup::{DedupBackend, DEFAULT_MIN_SIMILARITY};
use crate::scoring::rubric::DEFAULT_RUBRIC_VERSION;

const DEFAULT_MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

/// Application configuration loaded from environment variables.
/// Only malformed values fail startup; every variable has a default.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    pub database_url: Option<String>,
    pub rubric_version: String,
    pub min_similarity: f64,
    pub dedup_backend: DedupBackend,
    pub stemming: bool,
    pub embedding_service_url: Option<String>,
    pub cluster_service_url: Option<String>,
    pub classifier_service_url: Option<String>,
    pub collaborator_timeout_secs: u64,
    pub max_upload_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            rust_log: "info".to_string(),
            database_url: None,
            rubric_version: DEFAULT_RUBRIC_VERSION.to_string(),
            min_similarity: DEFAULT_MIN_SIMILARITY,
            dedup_backend: DedupBackend::MinHash,
            stemming: true,
            embedding_service_url: None,
            cluster_service_url: None,
            classifier_service_url: None,
            collaborator_timeout_secs: 30,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let defaults = Config::default();
        let min_similarity: f64 = parse_env("PREPROC_MIN_SIM", defaults.min_similarity)?;
        if !(0.0..=1.0).contains(&min_similarity) {
            return Err(anyhow!("PREPROC_MIN_SIM must be within [0, 1], got {min_similarity}"));
        }

        Ok(Config {
            port: parse_env("PORT", defaults.port).context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or(defaults.rust_log),
            database_url: optional_env("DATABASE_URL"),
            rubric_version: std::env::var("RUBRIC_VERSION").unwrap_or(defaults.rubric_version),
            min_similarity,
            dedup_backend: optional_env("DEDUP_BACKEND")
                .map(|v| v.parse::<DedupBackend>().map_err(|e| anyhow!(e)))
                .transpose()
                .context("DEDUP_BACKEND must be 'minhash' or 'pairwise'")?
                .unwrap_or(defaults.dedup_backend),
            stemming: parse_env("STEMMING", defaults.stemming)?,
            embedding_service_url: optional_env("EMBEDDING_SERVICE_URL"),
            cluster_service_url: optional_env("CLUSTER_SERVICE_URL"),
            classifier_service_url: optional_env("CLASSIFIER_SERVICE_URL"),
            collaborator_timeout_secs: parse_env(
                "COLLABORATOR_TIMEOUT_SECS",
                defaults.collaborator_timeout_secs,
            )?,
            max_upload_bytes: parse_env("MAX_UPLOAD_BYTES", defaults.max_upload_bytes)?,
        })
    }
}

/// Set and non-blank, else `None`.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_env(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has invalid value '{raw}'")),
        None => Ok(default),
    }
}
