//! Per-dimension subscores. Every mapping clamps to [0,1] and is monotone in its
//! primary driver.

use serde::{Deserialize, Serialize};

use super::features::{FeatureRecord, SeniorityMarkers};
use super::rubric::{AgentProfile, Dimension, ExperienceCurve, RubricTable};

const IDEAL_SKILL_COUNT: f64 = 12.0;
const SKILL_BONUS_PER_HIT: f64 = 0.02;
const MAX_SKILL_BONUS: f64 = 0.15;

const PROJECT_STEPS: &[f64] = &[0.0, 0.4, 0.7, 1.0];
const IMPACT_STEPS: &[f64] = &[0.0, 0.35, 0.55, 0.75, 0.9, 1.0];

/// (upper bound on cert points, subscore); points at or above the last bound score 1.
const CERT_STEPS: &[(f64, f64)] = &[(0.3, 0.3), (0.5, 0.5), (0.8, 0.75), (1.0, 0.9)];

const EMAIL_WEIGHT: f64 = 0.6;
const PHONE_WEIGHT: f64 = 0.4;

const REMOTE_WEIGHT: f64 = 0.7;
const COMPENSATION_WEIGHT: f64 = 0.3;

const SECTION_IDEAL: f64 = 6.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Subscores {
    pub skills: f64,
    pub experience: f64,
    pub projects: f64,
    pub certs: f64,
    pub impact: f64,
    pub semantic: f64,
    pub doc_quality: f64,
    pub contact: f64,
    pub context: f64,
}

impl Subscores {
    pub fn get(&self, dimension: Dimension) -> f64 {
        match dimension {
            Dimension::Skills => self.skills,
            Dimension::Experience => self.experience,
            Dimension::Projects => self.projects,
            Dimension::Certs => self.certs,
            Dimension::Impact => self.impact,
            Dimension::Semantic => self.semantic,
            Dimension::DocQuality => self.doc_quality,
            Dimension::Contact => self.contact,
            Dimension::Context => self.context,
        }
    }

    /// `(dimension, value)` pairs in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (Dimension, f64)> + '_ {
        Dimension::ALL.into_iter().map(move |d| (d, self.get(d)))
    }

    pub fn positive_count(&self) -> usize {
        self.iter().filter(|(_, v)| *v > 0.0).count()
    }
}

fn clamp01(v: f64) -> f64 {
    if v.is_nan() {
        0.0
    } else {
        v.clamp(0.0, 1.0)
    }
}

fn step(steps: &[f64], hits: u32) -> f64 {
    let idx = (hits as usize).min(steps.len() - 1);
    steps[idx]
}

pub fn seniority_align(markers: SeniorityMarkers, profile: AgentProfile) -> f64 {
    let advanced = markers.mid || markers.senior;
    match profile {
        AgentProfile::NoExperience => {
            if markers.junior && !advanced {
                1.0
            } else {
                0.6
            }
        }
        AgentProfile::Experienced => {
            if advanced {
                1.0
            } else if markers.junior {
                0.6
            } else {
                0.7
            }
        }
    }
}

pub fn score_skills(count: usize, depth_hits: u32, qualifier_hits: u32) -> f64 {
    let base = (count as f64 / IDEAL_SKILL_COUNT).min(1.0);
    let bonus = (f64::from(depth_hits + qualifier_hits) * SKILL_BONUS_PER_HIT).min(MAX_SKILL_BONUS);
    clamp01(base + bonus)
}

fn interpolate(breakpoints: &[(f64, f64)], x: f64) -> f64 {
    let Some(&(first_x, first_y)) = breakpoints.first() else {
        return 0.0;
    };
    if x <= first_x {
        return first_y;
    }
    for pair in breakpoints.windows(2) {
        let (x0, y0) = pair[0];
        let (x1, y1) = pair[1];
        if x <= x1 {
            if x1 <= x0 {
                return y1;
            }
            return y0 + (y1 - y0) * (x - x0) / (x1 - x0);
        }
    }
    breakpoints.last().map(|&(_, y)| y).unwrap_or(first_y)
}

pub fn score_experience(years: f64, align: f64, curve: &ExperienceCurve) -> f64 {
    let years = if years.is_finite() { years.max(0.0) } else { 0.0 };
    let align = clamp01(align);
    match curve {
        ExperienceCurve::Piecewise {
            breakpoints,
            curve_weight,
        } => clamp01(curve_weight * interpolate(breakpoints, years) + (1.0 - curve_weight) * align),
        ExperienceCurve::Linear {
            saturation,
            curve_weight,
        } => {
            let ratio = if *saturation > 0.0 {
                (years / saturation).min(1.0)
            } else {
                1.0
            };
            clamp01(curve_weight * ratio + (1.0 - curve_weight) * align)
        }
    }
}

pub fn score_projects(hits: u32) -> f64 {
    step(PROJECT_STEPS, hits)
}

pub fn score_certs(points: f64) -> f64 {
    if !(points > 0.0) {
        return 0.0;
    }
    CERT_STEPS
        .iter()
        .find(|(bound, _)| points < *bound)
        .map(|(_, score)| *score)
        .unwrap_or(1.0)
}

pub fn score_impact(hits: u32) -> f64 {
    step(IMPACT_STEPS, hits)
}

pub fn score_semantic(similarity: Option<f64>) -> f64 {
    similarity.map(clamp01).unwrap_or(0.0)
}

/// Length curve: ramps up to 150 tokens, reaches full credit at 400, holds to
/// 1200, then declines to 0.5 at 2500 and stays there.
fn length_curve(tokens: usize) -> f64 {
    let t = tokens as f64;
    if t < 150.0 {
        0.5 * t / 150.0
    } else if t < 400.0 {
        0.5 + 0.5 * (t - 150.0) / 250.0
    } else if t <= 1200.0 {
        1.0
    } else if t < 2500.0 {
        1.0 - 0.5 * (t - 1200.0) / 1300.0
    } else {
        0.5
    }
}

pub fn score_doc_quality(tokens: usize, sections_present: u32, dup_rate: f64) -> f64 {
    if tokens == 0 {
        return 0.0;
    }
    let sections = (f64::from(sections_present) / SECTION_IDEAL).min(1.0);
    let clarity = 1.0 - clamp01(dup_rate);
    clamp01(0.5 * length_curve(tokens) + 0.4 * sections + 0.1 * clarity)
}

pub fn score_contact(has_email: bool, has_phone: bool) -> f64 {
    let mut score = 0.0;
    if has_email {
        score += EMAIL_WEIGHT;
    }
    if has_phone {
        score += PHONE_WEIGHT;
    }
    clamp01(score)
}

pub fn score_context(remote_alignment: Option<f64>, compensation_score: Option<f64>) -> f64 {
    let Some(remote) = remote_alignment else {
        return 0.0;
    };
    match compensation_score {
        Some(comp) => {
            clamp01(REMOTE_WEIGHT * clamp01(remote) + COMPENSATION_WEIGHT * clamp01(comp))
        }
        None => clamp01(remote),
    }
}

/// All nine subscores for a feature record under the given profile.
pub fn compute_subscores(
    features: &FeatureRecord,
    profile: AgentProfile,
    rubric: &RubricTable,
) -> Subscores {
    let align = seniority_align(features.seniority, profile);
    Subscores {
        skills: score_skills(
            features.skills.len(),
            features.skill_depth_hits,
            features.skill_qualifier_hits,
        ),
        experience: score_experience(features.years_total, align, &rubric.experience_curve),
        projects: score_projects(features.project_hits),
        certs: score_certs(features.cert_points),
        impact: score_impact(features.metrics_hits),
        semantic: score_semantic(features.semantic_similarity),
        doc_quality: score_doc_quality(
            features.tokens,
            features.sections_present,
            features.dup_rate,
        ),
        contact: score_contact(features.has_email, features.has_phone),
        context: score_context(features.remote_alignment, features.compensation_score),
    }
}
