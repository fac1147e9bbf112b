//! Rubric combination: weighted score, two-tier label and top/bottom explanation.

use serde::{Deserialize, Serialize};

use super::rubric::{AgentProfile, Dimension, RubricTable, WeightProfile};
use super::subscores::Subscores;

const EXPLAIN_COUNT: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Label {
    Bom,
    Ruim,
}

impl Label {
    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Bom => "Bom",
            Label::Ruim => "Ruim",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Explanation {
    pub top_up: Vec<Dimension>,
    pub top_down: Vec<Dimension>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub final_score: f64,
    pub label: Label,
    pub by_block: Subscores,
    pub explanation: Explanation,
    pub agent: AgentProfile,
    pub rubric_version: String,
}

pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// `round(100 · Σ weight·subscore, 1)`, clamped to [0,100].
pub fn combine(weights: &WeightProfile, subscores: &Subscores) -> f64 {
    let raw: f64 = subscores
        .iter()
        .map(|(dimension, value)| weights.weight(dimension) * value)
        .sum();
    round1((100.0 * raw).clamp(0.0, 100.0))
}

pub fn label(score: f64, cutoff: f64) -> Label {
    if score >= cutoff {
        Label::Bom
    } else {
        Label::Ruim
    }
}

/// The three largest and three smallest weighted contributions. Ties keep
/// canonical dimension order.
pub fn explain(weights: &WeightProfile, subscores: &Subscores) -> Explanation {
    let contributions: Vec<(Dimension, f64)> = subscores
        .iter()
        .map(|(dimension, value)| (dimension, weights.weight(dimension) * value))
        .collect();

    let mut descending = contributions.clone();
    descending.sort_by(|a, b| b.1.total_cmp(&a.1));
    let mut ascending = contributions;
    ascending.sort_by(|a, b| a.1.total_cmp(&b.1));

    Explanation {
        top_up: descending.iter().take(EXPLAIN_COUNT).map(|(d, _)| *d).collect(),
        top_down: ascending.iter().take(EXPLAIN_COUNT).map(|(d, _)| *d).collect(),
    }
}

/// Scores subscores under a profile of the given rubric.
pub fn evaluate(rubric: &RubricTable, profile: AgentProfile, subscores: Subscores) -> ScoreResult {
    let weights = rubric.weights(profile);
    let final_score = combine(weights, &subscores);
    ScoreResult {
        final_score,
        label: label(final_score, rubric.cutoff(profile)),
        explanation: explain(weights, &subscores),
        by_block: subscores,
        agent: profile,
        rubric_version: rubric.version.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn full() -> Subscores {
        Subscores {
            skills: 1.0,
            experience: 1.0,
            projects: 1.0,
            certs: 1.0,
            impact: 1.0,
            semantic: 1.0,
            doc_quality: 1.0,
            contact: 1.0,
            context: 1.0,
        }
    }

    #[test]
    fn test_cutoff_labeling_no_experience() {
        let rubric = RubricTable::v1();
        let cutoff = rubric.cutoff(AgentProfile::NoExperience);
        assert_eq!(cutoff, 40.0);
        assert_eq!(label(39.9, cutoff), Label::Ruim);
        assert_eq!(label(40.0, cutoff), Label::Bom);
    }

    #[test]
    fn test_combine_extremes() {
        let rubric = RubricTable::v1();
        let weights = rubric.weights(AgentProfile::Experienced);
        assert_eq!(combine(weights, &Subscores::default()), 0.0);
        assert_eq!(combine(weights, &full()), 100.0);
    }

    #[test]
    fn test_combine_rounds_to_one_decimal() {
        let rubric = RubricTable::v1();
        let subscores = Subscores {
            skills: 0.333,
            ..Default::default()
        };
        // 0.25 * 0.333 * 100 = 8.325
        assert_eq!(combine(rubric.weights(AgentProfile::Experienced), &subscores), 8.3);
    }

    #[test]
    fn test_explain_orders_contributions() {
        let rubric = RubricTable::v1();
        let subscores = Subscores {
            skills: 1.0,
            experience: 0.8,
            doc_quality: 0.9,
            impact: 0.1,
            contact: 1.0,
            ..Default::default()
        };
        let explanation = explain(rubric.weights(AgentProfile::Experienced), &subscores);
        assert_eq!(
            explanation.top_up,
            vec![Dimension::Skills, Dimension::Experience, Dimension::DocQuality]
        );
        assert_eq!(
            explanation.top_down,
            vec![Dimension::Projects, Dimension::Certs, Dimension::Semantic]
        );
    }

    #[test]
    fn test_evaluate_serializes_flat_record() {
        let result = evaluate(&RubricTable::v1(), AgentProfile::NoExperience, full());
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["final_score"], 100.0);
        assert_eq!(json["label"], "Bom");
        assert_eq!(json["by_block"]["doc_quality"], 1.0);
        assert_eq!(json["explanation"]["top_up"][0], "skills");
        assert_eq!(json["agent"], "noexp");
        assert_eq!(json["rubric_version"], "rubric-v1.0.0");
    }

    proptest! {
        #[test]
        fn final_score_in_range(
            values in prop::collection::vec(0.0f64..=1.0, 9),
            experienced in any::<bool>(),
        ) {
            let subscores = Subscores {
                skills: values[0],
                experience: values[1],
                projects: values[2],
                certs: values[3],
                impact: values[4],
                semantic: values[5],
                doc_quality: values[6],
                contact: values[7],
                context: values[8],
            };
            let profile = AgentProfile::from_has_experience(experienced);
            let result = evaluate(&RubricTable::v1(), profile, subscores);
            prop_assert!((0.0..=100.0).contains(&result.final_score));
            prop_assert!(result.explanation.top_up.len() <= 3);
            prop_assert!(result.explanation.top_down.len() <= 3);
        }
    }
}
