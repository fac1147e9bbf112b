use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EvaluationRow {
    pub id: Uuid,
    pub document_id: String,
    /// Digest of the caller inputs the score depends on besides the text.
    pub input_key: String,
    pub agent: String,
    pub rubric_version: String,
    pub score: f64,
    pub label: String,
    pub subscores: Value,
    pub explanation: Value,
    pub hybrid: Value,
    pub created_at: DateTime<Utc>,
}
