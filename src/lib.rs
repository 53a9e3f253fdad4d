//! Matrimony Match - match scoring and interest workflow service
//!
//! Scores compatibility between structured profiles, persists the resulting
//! matches and runs the interest lifecycle (send, respond, withdraw, expire)
//! with per-plan daily quotas.

pub mod config;
pub mod core;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use crate::core::{calculate_compatibility, InterestWorkflow, MatchService, Matcher};
pub use error::{AppError, AppResult, StoreError};
pub use models::{Interest, Match, MatchFactors, Profile, ScoringWeights};
