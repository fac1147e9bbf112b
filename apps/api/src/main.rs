mod collaborators;
mod config;
mod db;
mod errors;
mod models;
mod preprocess;
mod routes;
mod scoring;
mod state;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::collaborators::http::{HttpClassifier, HttpClusterScorer, HttpSimilarity, ServiceClient};
use crate::collaborators::Collaborators;
use crate::config::Config;
use crate::db::create_pool;
use crate::preprocess::dedup::DedupBackend;
use crate::preprocess::PreprocessConfig;
use crate::routes::build_router;
use crate::scoring::rubric::RubricTable;
use crate::scoring::service::ScoringContext;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting ResumAI API v{}", env!("CARGO_PKG_VERSION"));

    // Fail fast on an unknown or invalid rubric version
    let rubric = RubricTable::by_version(&config.rubric_version)
        .with_context(|| format!("invalid RUBRIC_VERSION '{}'", config.rubric_version))?;
    info!("Rubric table loaded: {}", rubric.version);

    let preprocess = PreprocessConfig {
        min_similarity: config.min_similarity,
        backend: config.dedup_backend,
        stemming: config.stemming,
        ..PreprocessConfig::default()
    };
    if preprocess.backend == DedupBackend::Pairwise {
        warn!("MinHash sketching disabled, paragraph dedup falls back to pairwise similarity");
    }
    if !preprocess.stemming {
        warn!("Stemming disabled, signatures use case-folded text only");
    }

    let collaborators = build_collaborators(&config)?;

    // PostgreSQL is optional; without it evaluations are not cached
    let db = match &config.database_url {
        Some(url) => Some(create_pool(url).await?),
        None => {
            info!("DATABASE_URL not set, evaluation cache disabled");
            None
        }
    };

    let state = AppState {
        db,
        config: config.clone(),
        scoring: Arc::new(ScoringContext::new(rubric, preprocess, collaborators)),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// HTTP collaborators for every configured URL, disabled stand-ins for the rest.
fn build_collaborators(config: &Config) -> Result<Collaborators> {
    let client = ServiceClient::new(Duration::from_secs(config.collaborator_timeout_secs))
        .context("failed to build collaborator HTTP client")?;
    let mut collaborators = Collaborators::disabled();

    if let Some(url) = &config.embedding_service_url {
        collaborators.similarity = Arc::new(HttpSimilarity::new(client.clone(), url.clone()));
        info!("Similarity service: {url}");
    }
    if let Some(url) = &config.cluster_service_url {
        collaborators.cluster = Arc::new(HttpClusterScorer::new(client.clone(), url.clone()));
        info!("Cluster scorer: {url}");
    }
    if let Some(url) = &config.classifier_service_url {
        collaborators.classifier = Arc::new(HttpClassifier::new(client, url.clone()));
        info!("Experience classifier: {url}");
    }

    Ok(collaborators)
}
