//! Version-tagged rubric tables: weight profiles, cutoffs and the experience curve.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const RUBRIC_V1: &str = "rubric-v1.0.0";
pub const RUBRIC_V0_1: &str = "rubric-v0.1.0";
pub const DEFAULT_RUBRIC_VERSION: &str = RUBRIC_V1;

const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Error, PartialEq)]
pub enum RubricError {
    #[error("unknown rubric version '{0}'")]
    UnknownVersion(String),

    #[error("{profile} weights sum to {sum}, expected 1.0")]
    WeightSum { profile: AgentProfile, sum: f64 },

    #[error("{profile} weight for {dimension} is invalid: {weight}")]
    InvalidWeight {
        profile: AgentProfile,
        dimension: Dimension,
        weight: f64,
    },

    #[error("{profile} cutoff {cutoff} is outside [0, 100]")]
    Cutoff { profile: AgentProfile, cutoff: f64 },
}

/// Rubric dimensions in canonical order. Ties in explanations keep this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Skills,
    Experience,
    Projects,
    Certs,
    Impact,
    Semantic,
    DocQuality,
    Contact,
    Context,
}

impl Dimension {
    pub const ALL: [Dimension; 9] = [
        Dimension::Skills,
        Dimension::Experience,
        Dimension::Projects,
        Dimension::Certs,
        Dimension::Impact,
        Dimension::Semantic,
        Dimension::DocQuality,
        Dimension::Contact,
        Dimension::Context,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Dimension::Skills => "skills",
            Dimension::Experience => "experience",
            Dimension::Projects => "projects",
            Dimension::Certs => "certs",
            Dimension::Impact => "impact",
            Dimension::Semantic => "semantic",
            Dimension::DocQuality => "doc_quality",
            Dimension::Contact => "contact",
            Dimension::Context => "context",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgentProfile {
    #[serde(rename = "experienced")]
    Experienced,
    #[serde(rename = "noexp")]
    NoExperience,
}

impl AgentProfile {
    pub fn from_has_experience(has_experience: bool) -> Self {
        if has_experience {
            AgentProfile::Experienced
        } else {
            AgentProfile::NoExperience
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentProfile::Experienced => "experienced",
            AgentProfile::NoExperience => "noexp",
        }
    }

    pub fn is_experienced(&self) -> bool {
        matches!(self, AgentProfile::Experienced)
    }
}

impl fmt::Display for AgentProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentProfile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "experienced" => Ok(AgentProfile::Experienced),
            "noexp" => Ok(AgentProfile::NoExperience),
            other => Err(format!("unknown agent profile '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeightProfile {
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

impl WeightProfile {
    pub fn weight(&self, dimension: Dimension) -> f64 {
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

    pub fn sum(&self) -> f64 {
        Dimension::ALL.iter().map(|d| self.weight(*d)).sum()
    }

    fn validate(&self, profile: AgentProfile) -> Result<(), RubricError> {
        for dimension in Dimension::ALL {
            let weight = self.weight(dimension);
            if !weight.is_finite() || weight < 0.0 {
                return Err(RubricError::InvalidWeight {
                    profile,
                    dimension,
                    weight,
                });
            }
        }
        let sum = self.sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(RubricError::WeightSum { profile, sum });
        }
        Ok(())
    }
}

/// Years → [0,1] mapping used by the experience subscore.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExperienceCurve {
    /// Linear interpolation between `(years, value)` breakpoints, flat outside them.
    /// Blended as `curve_weight · curve + (1 − curve_weight) · seniority`.
    Piecewise {
        breakpoints: Vec<(f64, f64)>,
        curve_weight: f64,
    },
    /// `curve_weight · min(years / saturation, 1) + (1 − curve_weight) · seniority`.
    Linear { saturation: f64, curve_weight: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RubricTable {
    pub version: String,
    pub experienced: WeightProfile,
    pub no_experience: WeightProfile,
    pub experienced_cutoff: f64,
    pub no_experience_cutoff: f64,
    pub experience_curve: ExperienceCurve,
}

fn experienced_weights() -> WeightProfile {
    WeightProfile {
        skills: 0.25,
        experience: 0.25,
        projects: 0.05,
        certs: 0.05,
        impact: 0.12,
        semantic: 0.0,
        doc_quality: 0.20,
        contact: 0.08,
        context: 0.0,
    }
}

fn no_experience_weights() -> WeightProfile {
    WeightProfile {
        skills: 0.22,
        experience: 0.08,
        projects: 0.20,
        certs: 0.15,
        impact: 0.05,
        semantic: 0.0,
        doc_quality: 0.20,
        contact: 0.10,
        context: 0.0,
    }
}

impl RubricTable {
    /// Canonical table.
    pub fn v1() -> Self {
        Self {
            version: RUBRIC_V1.to_string(),
            experienced: experienced_weights(),
            no_experience: no_experience_weights(),
            experienced_cutoff: 50.0,
            no_experience_cutoff: 40.0,
            experience_curve: ExperienceCurve::Piecewise {
                breakpoints: vec![
                    (0.0, 0.10),
                    (1.0, 0.35),
                    (2.0, 0.55),
                    (3.0, 0.70),
                    (5.0, 0.90),
                    (8.0, 0.97),
                    (10.0, 1.0),
                ],
                curve_weight: 0.8,
            },
        }
    }

    /// Historical table with the linear experience mapping.
    pub fn v0_1() -> Self {
        Self {
            version: RUBRIC_V0_1.to_string(),
            experience_curve: ExperienceCurve::Linear {
                saturation: 10.0,
                curve_weight: 0.6,
            },
            ..Self::v1()
        }
    }

    /// Looks up a table by version tag and validates it.
    pub fn by_version(version: &str) -> Result<Self, RubricError> {
        let table = match version.trim() {
            RUBRIC_V1 => Self::v1(),
            RUBRIC_V0_1 => Self::v0_1(),
            other => return Err(RubricError::UnknownVersion(other.to_string())),
        };
        table.validate()?;
        Ok(table)
    }

    pub fn validate(&self) -> Result<(), RubricError> {
        self.experienced.validate(AgentProfile::Experienced)?;
        self.no_experience.validate(AgentProfile::NoExperience)?;
        for (profile, cutoff) in [
            (AgentProfile::Experienced, self.experienced_cutoff),
            (AgentProfile::NoExperience, self.no_experience_cutoff),
        ] {
            if !(0.0..=100.0).contains(&cutoff) {
                return Err(RubricError::Cutoff { profile, cutoff });
            }
        }
        Ok(())
    }

    pub fn weights(&self, profile: AgentProfile) -> &WeightProfile {
        match profile {
            AgentProfile::Experienced => &self.experienced,
            AgentProfile::NoExperience => &self.no_experience,
        }
    }

    pub fn cutoff(&self, profile: AgentProfile) -> f64 {
        match profile {
            AgentProfile::Experienced => self.experienced_cutoff,
            AgentProfile::NoExperience => self.no_experience_cutoff,
        }
    }
}

impl Default for RubricTable {
    fn default() -> Self {
        Self::v1()
    }
}
