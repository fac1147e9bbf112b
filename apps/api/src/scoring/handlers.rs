use axum::{
    extract::{Multipart, Path, State},
    Json,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::task::JoinSet;
use tracing::{debug, info};

use crate::errors::AppError;
use crate::models::evaluation::EvaluationRow;
use crate::preprocess::experience::ExperienceEntry;
use crate::preprocess::PreprocessStats;
use crate::state::AppState;

use super::persistence::{find_cached, list_for_document, store_evaluation};
use super::service::{Evaluation, EvaluationInput, RubricEvaluation};

const MIN_RESUME_CHARS: usize = 100;
const MAX_RANK_LIMIT: usize = 100;

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

fn to_json<T: Serialize>(value: &T) -> Result<Value, AppError> {
    serde_json::to_value(value).map_err(|e| AppError::Internal(e.into()))
}

fn require_resume_text(text: &str) -> Result<(), AppError> {
    if text.trim().chars().count() < MIN_RESUME_CHARS {
        return Err(AppError::Validation(format!(
            "resume_text must contain at least {MIN_RESUME_CHARS} characters"
        )));
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
pub struct EvaluateRequest {
    #[serde(flatten)]
    pub input: EvaluationInput,
    /// Recompute and overwrite a stored evaluation.
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Serialize)]
pub struct EvaluateResponse {
    pub document_id: String,
    pub score: f64,
    pub label: String,
    pub semantic_match: f64,
    pub subscores: Value,
    pub method: String,
    pub is_experienced: bool,
    pub explanation: Value,
    pub components: Value,
    pub rubric_version: String,
    pub cached: bool,
}

/// Blend components pulled out of a serialized hybrid result.
fn components(hybrid: &Value) -> Value {
    json!({
        "ml_score": hybrid["ml_score"],
        "ml_weight": hybrid["ml_weight"],
        "rb_score": hybrid["rb_score"],
        "rb_weight": hybrid["rb_weight"],
        "cluster": hybrid["cluster"],
        "summary": hybrid["summary"],
    })
}

impl EvaluateResponse {
    fn from_evaluation(evaluation: &Evaluation) -> Result<Self, AppError> {
        let rubric = &evaluation.rubric;
        let hybrid = to_json(&evaluation.hybrid)?;
        Ok(Self {
            document_id: rubric.document_id.clone(),
            score: evaluation.hybrid.score,
            label: evaluation.hybrid.label.as_str().to_string(),
            semantic_match: evaluation.semantic_match,
            subscores: to_json(&rubric.result.by_block)?,
            method: evaluation.hybrid.method.as_str().to_string(),
            is_experienced: rubric.agent.is_experienced(),
            explanation: to_json(&rubric.result.explanation)?,
            components: components(&hybrid),
            rubric_version: rubric.result.rubric_version.clone(),
            cached: false,
        })
    }

    fn from_row(row: EvaluationRow) -> Self {
        Self {
            semantic_match: row.subscores["semantic"].as_f64().unwrap_or(0.0),
            method: row.hybrid["method"].as_str().unwrap_or_default().to_string(),
            is_experienced: row.agent == "experienced",
            components: components(&row.hybrid),
            document_id: row.document_id,
            score: row.score,
            label: row.label,
            subscores: row.subscores,
            explanation: row.explanation,
            rubric_version: row.rubric_version,
            cached: true,
        }
    }
}

/// Response plus the fresh evaluation behind it; `None` when served from the cache.
struct Scored {
    response: EvaluateResponse,
    evaluation: Option<RubricEvaluation>,
}

/// Serves a cached evaluation when one exists for the same text and caller
/// inputs, otherwise evaluates and stores.
async fn evaluate_and_store(
    state: &AppState,
    mut input: EvaluationInput,
    force: bool,
) -> Result<Scored, AppError> {
    let document_id = input.document_id();
    let input_key = input.input_key();
    input.document_id = Some(document_id.clone());

    if let (Some(pool), false) = (&state.db, force) {
        let version = &state.scoring.rubric.version;
        if let Some(row) = find_cached(pool, &document_id, &input_key, version).await? {
            debug!(%document_id, %input_key, "serving cached evaluation");
            return Ok(Scored {
                response: EvaluateResponse::from_row(row),
                evaluation: None,
            });
        }
    }

    let evaluation = state.scoring.evaluate(&input, today()).await;
    info!(
        %document_id,
        agent = %evaluation.rubric.agent,
        score = evaluation.hybrid.score,
        "resume evaluated"
    );

    if let Some(pool) = &state.db {
        store_evaluation(pool, &evaluation, &input_key, force).await?;
    }

    Ok(Scored {
        response: EvaluateResponse::from_evaluation(&evaluation)?,
        evaluation: Some(evaluation.rubric),
    })
}

/// POST /api/v1/evaluate
pub async fn handle_evaluate(
    State(state): State<AppState>,
    Json(req): Json<EvaluateRequest>,
) -> Result<Json<EvaluateResponse>, AppError> {
    require_resume_text(&req.input.resume_text)?;
    let scored = evaluate_and_store(&state, req.input, req.force).await?;
    Ok(Json(scored.response))
}

#[derive(Debug, Serialize)]
pub struct FeatureSummary {
    pub document_id: String,
    pub skills: Vec<String>,
    pub years_experience: f64,
    pub tokens: usize,
    pub has_email: bool,
    pub has_phone: bool,
    pub has_linkedin: bool,
    pub project_hits: u32,
    pub cert_points: f64,
    pub metrics_hits: u32,
    pub sections_present: u32,
    pub dup_rate: f64,
    pub is_experienced: bool,
    pub experiences: Vec<ExperienceEntry>,
    pub stats: PreprocessStats,
}

impl From<RubricEvaluation> for FeatureSummary {
    fn from(evaluation: RubricEvaluation) -> Self {
        let features = evaluation.features;
        Self {
            document_id: evaluation.document_id,
            is_experienced: features.is_experienced(),
            skills: features.skills,
            years_experience: features.years_total,
            tokens: features.tokens,
            has_email: features.has_email,
            has_phone: features.has_phone,
            has_linkedin: features.has_linkedin,
            project_hits: features.project_hits,
            cert_points: features.cert_points,
            metrics_hits: features.metrics_hits,
            sections_present: features.sections_present,
            dup_rate: features.dup_rate,
            experiences: evaluation.preprocessed.experiences,
            stats: evaluation.preprocessed.stats,
        }
    }
}

/// POST /api/v1/extract
pub async fn handle_extract(
    State(state): State<AppState>,
    Json(input): Json<EvaluationInput>,
) -> Result<Json<FeatureSummary>, AppError> {
    if input.resume_text.trim().is_empty() {
        return Err(AppError::Validation("resume_text must not be empty".into()));
    }
    let extracted = state.scoring.extract(&input, today());
    Ok(Json(extracted.into()))
}

fn default_rank_limit() -> usize {
    10
}

#[derive(Debug, Deserialize)]
pub struct RankCandidate {
    pub id: String,
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct RankRequest {
    pub job_description: String,
    pub resumes: Vec<RankCandidate>,
    #[serde(default = "default_rank_limit")]
    pub limit: usize,
}

#[derive(Debug, Serialize)]
pub struct RankedCandidate {
    pub rank: usize,
    pub id: String,
    pub score: f64,
    pub label: String,
    pub semantic_match: f64,
    pub method: String,
    pub is_experienced: bool,
    pub summary: String,
}

#[derive(Debug, Serialize)]
pub struct RankResponse {
    pub total: usize,
    pub results: Vec<RankedCandidate>,
}

/// POST /api/v1/rank
pub async fn handle_rank(
    State(state): State<AppState>,
    Json(req): Json<RankRequest>,
) -> Result<Json<RankResponse>, AppError> {
    if !(1..=MAX_RANK_LIMIT).contains(&req.limit) {
        return Err(AppError::Validation(format!(
            "limit must be between 1 and {MAX_RANK_LIMIT}"
        )));
    }
    if req.resumes.is_empty() {
        return Err(AppError::Validation("resumes must not be empty".into()));
    }
    if let Some(blank) = req.resumes.iter().find(|r| r.text.trim().is_empty()) {
        return Err(AppError::Validation(format!("resume {} has no text", blank.id)));
    }

    let today = today();
    let mut tasks = JoinSet::new();
    for candidate in req.resumes {
        let scoring = state.scoring.clone();
        let mut input = EvaluationInput::new(candidate.text);
        input.job_description = Some(req.job_description.clone());
        tasks.spawn(async move {
            let evaluation = scoring.evaluate(&input, today).await;
            (candidate.id, evaluation)
        });
    }

    let mut scored = Vec::with_capacity(tasks.len());
    while let Some(joined) = tasks.join_next().await {
        let (id, evaluation) = joined.map_err(|e| AppError::Internal(e.into()))?;
        scored.push((id, evaluation));
    }
    scored.sort_by(|(a_id, a), (b_id, b)| {
        b.hybrid
            .score
            .total_cmp(&a.hybrid.score)
            .then_with(|| a_id.cmp(b_id))
    });

    let total = scored.len();
    let results = scored
        .into_iter()
        .take(req.limit)
        .enumerate()
        .map(|(i, (id, evaluation))| RankedCandidate {
            rank: i + 1,
            id,
            score: evaluation.hybrid.score,
            label: evaluation.hybrid.label.as_str().to_string(),
            semantic_match: evaluation.semantic_match,
            method: evaluation.hybrid.method.as_str().to_string(),
            is_experienced: evaluation.rubric.agent.is_experienced(),
            summary: evaluation.hybrid.summary,
        })
        .collect();

    Ok(Json(RankResponse { total, results }))
}

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub file_name: String,
    pub features: FeatureSummary,
    pub result: EvaluateResponse,
}

async fn extract_upload_text(file_name: &str, bytes: Vec<u8>) -> Result<String, AppError> {
    let lower = file_name.to_lowercase();
    if lower.ends_with(".pdf") {
        let text = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
            .await
            .map_err(|e| AppError::Internal(e.into()))?;
        text.map_err(|e| AppError::UnprocessableEntity(format!("could not read PDF: {e:?}")))
    } else if lower.ends_with(".txt") {
        String::from_utf8(bytes)
            .map_err(|_| AppError::UnprocessableEntity("text file is not valid UTF-8".into()))
    } else {
        Err(AppError::Validation(
            "unsupported file type, expected .pdf or .txt".into(),
        ))
    }
}

/// POST /api/v1/analyze
pub async fn handle_analyze(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<AnalyzeResponse>, AppError> {
    let mut upload: Option<(String, Vec<u8>)> = None;
    let mut job_description: Option<String> = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await?;
                upload = Some((file_name, bytes.to_vec()));
            }
            "job_description" => job_description = Some(field.text().await?),
            _ => {}
        }
    }

    let (file_name, bytes) =
        upload.ok_or_else(|| AppError::Validation("multipart field 'file' is required".into()))?;
    let text = extract_upload_text(&file_name, bytes).await?;
    if text.trim().is_empty() {
        return Err(AppError::UnprocessableEntity(format!(
            "no text could be extracted from {file_name}"
        )));
    }

    let mut input = EvaluationInput::new(text);
    input.job_description = job_description;
    let scored = evaluate_and_store(&state, input.clone(), false).await?;
    let features = match scored.evaluation {
        Some(evaluation) => evaluation.into(),
        None => state.scoring.extract(&input, today()).into(),
    };

    Ok(Json(AnalyzeResponse {
        file_name,
        features,
        result: scored.response,
    }))
}

/// GET /api/v1/evaluations/:document_id
pub async fn handle_get_evaluations(
    State(state): State<AppState>,
    Path(document_id): Path<String>,
) -> Result<Json<Vec<EvaluationRow>>, AppError> {
    let pool = state
        .db
        .as_ref()
        .ok_or_else(|| AppError::NotFound("evaluation storage is not configured".into()))?;
    let rows = list_for_document(pool, &document_id).await?;
    if rows.is_empty() {
        return Err(AppError::NotFound(format!(
            "no evaluations stored for {document_id}"
        )));
    }
    Ok(Json(rows))
}
