//! Blends the rule-based score with the cluster scorer's ML score.

use serde::{Deserialize, Serialize};

use super::engine::{label, round1, Label, ScoreResult};
use super::rubric::{AgentProfile, RubricTable};

const DEFAULT_ML_WEIGHT: f64 = 0.5;
const DEFAULT_RB_WEIGHT: f64 = 0.5;
const OUTLIER_ML_WEIGHT: f64 = 0.7;
const OUTLIER_RB_WEIGHT: f64 = 0.3;
const COMPLETE_ML_WEIGHT: f64 = 0.4;
const COMPLETE_RB_WEIGHT: f64 = 0.6;
const COMPLETE_MIN_POSITIVE: usize = 6;
const DIVERGENCE_POINTS: f64 = 15.0;
const HIGHLIGHT_COUNT: usize = 3;

/// Output of the cluster scorer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MlResult {
    pub score: f64,
    pub cluster_id: i64,
    pub cluster_quality: f64,
    pub is_outlier: bool,
    #[serde(default)]
    pub label: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BlendWeights {
    pub ml: f64,
    pub rb: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BlendMethod {
    Hybrid,
    RuleBased,
}

impl BlendMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlendMethod::Hybrid => "hybrid",
            BlendMethod::RuleBased => "rule_based",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterMetadata {
    pub cluster_id: i64,
    pub cluster_quality: f64,
    pub is_outlier: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HybridResult {
    pub score: f64,
    pub label: Label,
    pub method: BlendMethod,
    pub ml_score: Option<f64>,
    pub ml_weight: f64,
    pub rb_score: f64,
    pub rb_weight: f64,
    pub cluster: Option<ClusterMetadata>,
    pub rubric: ScoreResult,
    pub summary: String,
}

/// Weight resolution. The completeness rule runs after the outlier rule and
/// overrides it when both hold. No ML result means 100% rule-based.
pub fn resolve_weights(ml: Option<&MlResult>, positive_subscores: usize) -> BlendWeights {
    let Some(ml) = ml else {
        return BlendWeights { ml: 0.0, rb: 1.0 };
    };
    let (mut ml_weight, mut rb_weight) = (DEFAULT_ML_WEIGHT, DEFAULT_RB_WEIGHT);
    if ml.is_outlier {
        ml_weight = OUTLIER_ML_WEIGHT;
        rb_weight = OUTLIER_RB_WEIGHT;
    }
    if positive_subscores >= COMPLETE_MIN_POSITIVE {
        ml_weight = COMPLETE_ML_WEIGHT;
        rb_weight = COMPLETE_RB_WEIGHT;
    }
    let total = ml_weight + rb_weight;
    BlendWeights {
        ml: ml_weight / total,
        rb: rb_weight / total,
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn summarize(rubric: &ScoreResult, ml: Option<&MlResult>, weights: BlendWeights) -> String {
    let mut parts = vec![format!(
        "Hybrid score computed with {:.0}% ML + {:.0}% rule-based",
        weights.ml * 100.0,
        weights.rb * 100.0
    )];

    if let Some(ml) = ml {
        if ml.is_outlier {
            parts.push(format!("Exceptional profile detected (cluster {})", ml.cluster_id));
        } else {
            parts.push(format!(
                "Belongs to cluster {} (quality: {:.2})",
                ml.cluster_id, ml.cluster_quality
            ));
        }
    }

    let mut ranked: Vec<_> = rubric.by_block.iter().filter(|(_, v)| *v > 0.0).collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    let highlights: Vec<String> = ranked
        .iter()
        .take(HIGHLIGHT_COUNT)
        .map(|(d, v)| format!("{d}: {v:.1}"))
        .collect();
    if !highlights.is_empty() {
        parts.push(format!("Highlights: {}", highlights.join(", ")));
    }

    if let Some(ml) = ml {
        let diff = ml.score - rubric.final_score;
        if diff.abs() > DIVERGENCE_POINTS {
            if diff > 0.0 {
                parts.push(format!("ML found positive patterns (+{diff:.0} points vs rules)"));
            } else {
                parts.push(format!("Rules found gaps ({diff:.0} points vs ML)"));
            }
        }
    }

    format!("{}.", parts.join(". "))
}

/// Blends a rubric result with an optional ML result. The label cutoff is keyed
/// on `has_experience` as supplied by the caller, not on the rubric's agent.
pub fn blend(
    rubric: ScoreResult,
    ml: Option<&MlResult>,
    has_experience: bool,
    table: &RubricTable,
) -> HybridResult {
    let weights = resolve_weights(ml, rubric.by_block.positive_count());
    let rb_score = rubric.final_score;
    let blended = match ml {
        Some(ml) => weights.ml * ml.score + weights.rb * rb_score,
        None => rb_score,
    };
    let blended = blended.clamp(0.0, 100.0);
    let cutoff = table.cutoff(AgentProfile::from_has_experience(has_experience));

    HybridResult {
        score: round1(blended),
        label: label(blended, cutoff),
        method: if ml.is_some() {
            BlendMethod::Hybrid
        } else {
            BlendMethod::RuleBased
        },
        ml_score: ml.map(|m| round1(m.score)),
        ml_weight: round2(weights.ml),
        rb_score: round1(rb_score),
        rb_weight: round2(weights.rb),
        cluster: ml.map(|m| ClusterMetadata {
            cluster_id: m.cluster_id,
            cluster_quality: (m.cluster_quality * 1000.0).round() / 1000.0,
            is_outlier: m.is_outlier,
        }),
        summary: summarize(&rubric, ml, weights),
        rubric,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::engine::Explanation;
    use crate::scoring::subscores::Subscores;

    fn rubric_result(score: f64, positives: usize) -> ScoreResult {
        let mut by_block = Subscores::default();
        let slots = [
            &mut by_block.skills,
            &mut by_block.experience,
            &mut by_block.projects,
            &mut by_block.certs,
            &mut by_block.impact,
            &mut by_block.semantic,
            &mut by_block.doc_quality,
            &mut by_block.contact,
            &mut by_block.context,
        ];
        for slot in slots.into_iter().take(positives) {
            *slot = 0.5;
        }
        ScoreResult {
            final_score: score,
            label: Label::Bom,
            by_block,
            explanation: Explanation::default(),
            agent: AgentProfile::Experienced,
            rubric_version: "rubric-v1.0.0".into(),
        }
    }

    fn ml(score: f64, is_outlier: bool) -> MlResult {
        MlResult {
            score,
            cluster_id: 2,
            cluster_quality: 0.8,
            is_outlier,
            label: None,
        }
    }

    #[test]
    fn test_outlier_with_five_positives() {
        let out = blend(rubric_result(60.0, 5), Some(&ml(90.0, true)), true, &RubricTable::v1());
        assert_eq!(out.ml_weight, 0.7);
        assert_eq!(out.rb_weight, 0.3);
        assert_eq!(out.score, 81.0);
        assert_eq!(out.method, BlendMethod::Hybrid);
    }

    #[test]
    fn test_completeness_rule_overrides_outlier() {
        let weights = resolve_weights(Some(&ml(90.0, true)), 6);
        assert!((weights.ml - 0.4).abs() < 1e-9);
        assert!((weights.rb - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_default_split() {
        let out = blend(rubric_result(60.0, 2), Some(&ml(80.0, false)), false, &RubricTable::v1());
        assert_eq!(out.score, 70.0);
        assert_eq!(out.ml_weight, 0.5);
    }

    #[test]
    fn test_missing_ml_is_fully_rule_based() {
        let out = blend(rubric_result(45.0, 3), None, false, &RubricTable::v1());
        assert_eq!(out.score, 45.0);
        assert_eq!(out.rb_weight, 1.0);
        assert_eq!(out.ml_weight, 0.0);
        assert_eq!(out.method, BlendMethod::RuleBased);
        assert!(out.cluster.is_none());
    }

    #[test]
    fn test_label_uses_caller_flag() {
        let result = rubric_result(45.0, 3);
        assert_eq!(blend(result.clone(), None, false, &RubricTable::v1()).label, Label::Bom);
        assert_eq!(blend(result, None, true, &RubricTable::v1()).label, Label::Ruim);
    }

    #[test]
    fn test_label_compares_unrounded_blend() {
        let near_cutoff = ml(39.96, false);
        let out = blend(rubric_result(39.96, 2), Some(&near_cutoff), false, &RubricTable::v1());
        assert_eq!(out.score, 40.0);
        assert_eq!(out.label, Label::Ruim);
    }

    #[test]
    fn test_summary_mentions_divergence() {
        let out = blend(rubric_result(40.0, 2), Some(&ml(80.0, false)), false, &RubricTable::v1());
        assert!(out.summary.starts_with("Hybrid score computed with 50% ML + 50% rule-based"));
        assert!(out.summary.contains("Belongs to cluster 2 (quality: 0.80)"));
        assert!(out.summary.contains("Highlights: skills: 0.5, experience: 0.5"));
        assert!(out.summary.contains("ML found positive patterns (+40 points vs rules)"));
        assert!(out.summary.ends_with('.'));
    }
}
