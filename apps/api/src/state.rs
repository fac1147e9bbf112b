use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;
use crate::scoring::service::ScoringContext;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Evaluation cache. `None` when `DATABASE_URL` is unset.
    pub db: Option<PgPool>,
    pub config: Config,
    /// Rubric table, preprocessing config and collaborator handles, built once at startup.
    pub scoring: Arc<ScoringContext>,
}

#[cfg(test)]
impl AppState {
    /// In-memory state: default config, no database, the v1 rubric.
    pub fn for_tests(collaborators: crate::collaborators::Collaborators) -> Self {
        use crate::preprocess::PreprocessConfig;
        use crate::scoring::rubric::RubricTable;

        Self {
            db: None,
            config: Config::default(),
            scoring: Arc::new(ScoringContext::new(
                RubricTable::v1(),
                PreprocessConfig::default(),
                collaborators,
            )),
        }
    }
}
