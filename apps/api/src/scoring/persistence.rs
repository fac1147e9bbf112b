//! Evaluation cache keyed on (document id, input key, agent, rubric version).

use sqlx::PgPool;
use tracing::info;

use crate::errors::AppError;
use crate::models::evaluation::EvaluationRow;

use super::service::Evaluation;

/// Most recent stored evaluation of a document for the same caller inputs
/// under a rubric version.
pub async fn find_cached(
    pool: &PgPool,
    document_id: &str,
    input_key: &str,
    rubric_version: &str,
) -> Result<Option<EvaluationRow>, sqlx::Error> {
    sqlx::query_as::<_, EvaluationRow>(
        r#"
        SELECT * FROM evaluations
        WHERE document_id = $1 AND input_key = $2 AND rubric_version = $3
        ORDER BY created_at DESC
        LIMIT 1
        "#,
    )
    .bind(document_id)
    .bind(input_key)
    .bind(rubric_version)
    .fetch_optional(pool)
    .await
}

pub async fn list_for_document(
    pool: &PgPool,
    document_id: &str,
) -> Result<Vec<EvaluationRow>, sqlx::Error> {
    sqlx::query_as::<_, EvaluationRow>(
        "SELECT * FROM evaluations WHERE document_id = $1 ORDER BY created_at DESC",
    )
    .bind(document_id)
    .fetch_all(pool)
    .await
}

fn to_jsonb<T: serde::Serialize>(value: &T) -> Result<serde_json::Value, AppError> {
    serde_json::to_value(value).map_err(|e| AppError::Internal(e.into()))
}

/// Stores an evaluation. An existing row for the same key is kept unless
/// `force` is set, in which case it is overwritten.
pub async fn store_evaluation(
    pool: &PgPool,
    evaluation: &Evaluation,
    input_key: &str,
    force: bool,
) -> Result<EvaluationRow, AppError> {
    let rubric = &evaluation.rubric;
    let subscores = to_jsonb(&rubric.result.by_block)?;
    let explanation = to_jsonb(&rubric.result.explanation)?;
    let hybrid = to_jsonb(&evaluation.hybrid)?;

    let conflict = if force {
        "DO UPDATE SET score = EXCLUDED.score, label = EXCLUDED.label, \
         subscores = EXCLUDED.subscores, explanation = EXCLUDED.explanation, \
         hybrid = EXCLUDED.hybrid, created_at = now()"
    } else {
        "DO NOTHING"
    };
    let sql = format!(
        r#"
        INSERT INTO evaluations
            (document_id, input_key, agent, rubric_version, score, label,
             subscores, explanation, hybrid)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        ON CONFLICT (document_id, input_key, agent, rubric_version) {conflict}
        RETURNING *
        "#
    );

    let inserted = sqlx::query_as::<_, EvaluationRow>(&sql)
        .bind(&rubric.document_id)
        .bind(input_key)
        .bind(rubric.agent.as_str())
        .bind(&rubric.result.rubric_version)
        .bind(evaluation.hybrid.score)
        .bind(evaluation.hybrid.label.as_str())
        .bind(&subscores)
        .bind(&explanation)
        .bind(&hybrid)
        .fetch_optional(pool)
        .await?;

    if let Some(row) = inserted {
        info!(document_id = %row.document_id, agent = %row.agent, force, "evaluation stored");
        return Ok(row);
    }

    let existing = sqlx::query_as::<_, EvaluationRow>(
        r#"
        SELECT * FROM evaluations
        WHERE document_id = $1 AND input_key = $2 AND agent = $3 AND rubric_version = $4
        "#,
    )
    .bind(&rubric.document_id)
    .bind(input_key)
    .bind(rubric.agent.as_str())
    .bind(&rubric.result.rubric_version)
    .fetch_one(pool)
    .await?;
    Ok(existing)
}
