//! Résumé scoring: features, subscores, rubric combination and hybrid blending.

pub mod engine;
pub mod features;
pub mod handlers;
pub mod hybrid;
pub mod persistence;
pub mod rubric;
pub mod service;
pub mod subscores;
