use chrono::NaiveDate;

use crate::core::{
    filters::{build_criteria, matches_criteria},
    scoring::calculate_compatibility,
};
use crate::error::{AppError, AppResult};
use crate::models::{Profile, ScoredCandidate, ScoringWeights};
use crate::services::ports::ProfileDirectory;

/// Result of the matching process
#[derive(Debug)]
pub struct MatchResult {
    pub matches: Vec<ScoredCandidate>,
    pub total_candidates: usize,
}

impl MatchResult {
    /// Rounded mean score, 0 when there are no matches
    pub fn average_score(&self) -> u8 {
        if self.matches.is_empty() {
            return 0;
        }
        let sum: u32 = self.matches.iter().map(|m| u32::from(m.match_score)).sum();
        (f64::from(sum) / self.matches.len() as f64).round() as u8
    }
}

/// Candidate selector - builds criteria, pulls candidates and ranks them
///
/// # Pipeline Stages
/// 1. Eligibility criteria from the requester's profile and preferences
/// 2. Directory query (most recently active first)
/// 3. In-process criteria re-check
/// 4. Scoring and ranking
#[derive(Debug, Clone)]
pub struct Matcher {
    weights: ScoringWeights,
}

impl Matcher {
    pub fn new(weights: ScoringWeights) -> Self {
        Self { weights }
    }

    pub fn with_default_weights() -> Self {
        Self {
            weights: ScoringWeights::default(),
        }
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    /// Score and rank already-fetched candidates for a requester
    ///
    /// Candidates failing the requester's criteria are dropped. Results are
    /// ordered by score descending, ties broken by candidate user id.
    pub fn rank(
        &self,
        requester: &Profile,
        candidates: Vec<Profile>,
        today: NaiveDate,
        limit: usize,
    ) -> MatchResult {
        let total_candidates = candidates.len();
        let criteria = build_criteria(requester, today);

        let mut scored: Vec<ScoredCandidate> = candidates
            .into_iter()
            .filter(|profile| matches_criteria(profile, &criteria))
            .map(|profile| {
                let compatibility =
                    calculate_compatibility(requester, &profile, today, &self.weights);
                ScoredCandidate {
                    profile,
                    match_score: compatibility.match_score,
                    match_factors: compatibility.factors,
                }
            })
            .collect();

        scored.sort_by(|a, b| {
            b.match_score
                .cmp(&a.match_score)
                .then_with(|| a.profile.user_id.cmp(&b.profile.user_id))
        });
        scored.truncate(limit);

        MatchResult {
            matches: scored,
            total_candidates,
        }
    }

    /// Find ranked candidates for a user
    ///
    /// Fails with `NotFound` when the requester has no profile. Performs no
    /// persistence.
    pub async fn find_matches(
        &self,
        directory: &dyn ProfileDirectory,
        user_id: &str,
        limit: usize,
        today: NaiveDate,
    ) -> AppResult<MatchResult> {
        let requester = directory
            .find_by_user_id(user_id)
            .await?
            .ok_or_else(|| {
                AppError::not_found("profile_missing", format!("No profile found for user {}", user_id))
            })?;

        self.select_for(directory, &requester, limit, today).await
    }

    /// Query and rank candidates for an already-loaded requester profile
    pub async fn select_for(
        &self,
        directory: &dyn ProfileDirectory,
        requester: &Profile,
        limit: usize,
        today: NaiveDate,
    ) -> AppResult<MatchResult> {
        let criteria = build_criteria(requester, today);
        let candidates = directory.query(&criteria, limit, 0).await?;

        tracing::debug!(
            "Fetched {} candidates for {} (gender={}, locations={})",
            candidates.len(),
            requester.user_id,
            criteria.gender.as_str(),
            criteria.locations.len()
        );

        Ok(self.rank(requester, candidates, today, limit))
    }
}

impl Default for Matcher {
    fn default() -> Self {
        Self::with_default_weights()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::calendar::years_before;
    use crate::models::{Gender, PartnerPreferences};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    fn create_candidate(user_id: &str, age: u32, gender: Gender, location: &str) -> Profile {
        Profile {
            id: format!("profile-{}", user_id),
            user_id: user_id.to_string(),
            gender,
            date_of_birth: Some(years_before(today(), age)),
            marital_status: None,
            mother_tongue: Some("Hindi".to_string()),
            height_cm: None,
            education: Some("Graduate".to_string()),
            occupation: Some("Salaried (Private)".to_string()),
            job_location: Some(location.to_string()),
            partner: PartnerPreferences::default(),
            is_verified: true,
            is_complete: true,
            last_active: None,
        }
    }

    fn create_requester() -> Profile {
        let mut requester = create_candidate("requester", 28, Gender::Male, "Pune");
        requester.partner.age_from = Some(24);
        requester.partner.age_to = Some(32);
        requester
    }

    #[test]
    fn test_rank_filters_and_orders() {
        let matcher = Matcher::with_default_weights();
        let candidates = vec![
            create_candidate("far", 31, Gender::Female, "Delhi"),
            create_candidate("close", 28, Gender::Female, "Pune"),
            create_candidate("male", 28, Gender::Male, "Pune"),
            create_candidate("old", 45, Gender::Female, "Pune"),
        ];

        let result = matcher.rank(&create_requester(), candidates, today(), 10);

        assert_eq!(result.total_candidates, 4);
        assert_eq!(result.matches.len(), 2);
        assert_eq!(result.matches[0].profile.user_id, "close");
        assert!(result.matches[0].match_score > result.matches[1].match_score);
    }

    #[test]
    fn test_ties_broken_by_user_id() {
        let matcher = Matcher::with_default_weights();
        let candidates = vec![
            create_candidate("b", 28, Gender::Female, "Pune"),
            create_candidate("a", 28, Gender::Female, "Pune"),
            create_candidate("c", 28, Gender::Female, "Pune"),
        ];

        let result = matcher.rank(&create_requester(), candidates, today(), 10);
        let ids: Vec<_> = result.matches.iter().map(|m| m.profile.user_id.as_str()).collect();

        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_respects_limit() {
        let matcher = Matcher::with_default_weights();
        let candidates: Vec<Profile> = (0..20)
            .map(|i| create_candidate(&format!("user-{:02}", i), 24 + (i % 8), Gender::Female, "Pune"))
            .collect();

        let result = matcher.rank(&create_requester(), candidates, today(), 5);

        assert_eq!(result.matches.len(), 5);
    }

    #[tokio::test]
    async fn test_find_matches_via_directory() {
        let store = crate::services::MemoryStore::new();
        store.insert_profile(create_requester()).await;
        store
            .insert_profile(create_candidate("match", 27, Gender::Female, "Pune"))
            .await;
        store
            .insert_profile(create_candidate("rival", 27, Gender::Male, "Pune"))
            .await;
        let matcher = Matcher::with_default_weights();

        let result = matcher
            .find_matches(&store, "requester", 10, today())
            .await
            .unwrap();
        assert_eq!(result.matches.len(), 1);
        assert_eq!(result.matches[0].profile.user_id, "match");

        let missing = matcher.find_matches(&store, "ghost", 10, today()).await;
        assert!(matches!(missing, Err(AppError::NotFound { .. })));
    }

    #[test]
    fn test_average_score() {
        let matcher = Matcher::with_default_weights();
        let empty = matcher.rank(&create_requester(), vec![], today(), 10);
        assert_eq!(empty.average_score(), 0);

        let result = matcher.rank(
            &create_requester(),
            vec![create_candidate("a", 28, Gender::Female, "Pune")],
            today(),
            10,
        );
        assert_eq!(result.average_score(), result.matches[0].match_score);
    }
}
