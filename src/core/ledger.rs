use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::core::matcher::Matcher;
use crate::error::{AppError, AppResult};
use crate::models::{
    GenerateMatchesResponse, Match, MatchStatus, PageRequest, Paginated, Profile,
};
use crate::services::ports::{MatchLedger, ProfileDirectory};

/// Limits applied to match listing and generation
#[derive(Debug, Clone, Copy)]
pub struct MatchOptions {
    pub default_limit: usize,
    pub max_limit: usize,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            default_limit: 50,
            max_limit: 100,
        }
    }
}

/// Match ledger operations on top of the candidate selector
pub struct MatchService {
    matcher: Matcher,
    profiles: Arc<dyn ProfileDirectory>,
    ledger: Arc<dyn MatchLedger>,
    options: MatchOptions,
}

impl MatchService {
    pub fn new(
        matcher: Matcher,
        profiles: Arc<dyn ProfileDirectory>,
        ledger: Arc<dyn MatchLedger>,
        options: MatchOptions,
    ) -> Self {
        Self {
            matcher,
            profiles,
            ledger,
            options,
        }
    }

    pub fn ledger(&self) -> &Arc<dyn MatchLedger> {
        &self.ledger
    }

    /// List a user's active matches, highest score first
    ///
    /// A user without any active match gets a first batch generated and
    /// persisted before the query is repeated.
    pub async fn list_matches(
        &self,
        user_id: &str,
        min_score: u8,
        page: PageRequest,
    ) -> AppResult<Paginated<Match>> {
        let (items, total) = self.ledger.list_for_user(user_id, min_score, &page).await?;
        if total > 0 || self.ledger.count_active_for_user(user_id).await? > 0 {
            return Ok(Paginated::new(items, total, &page));
        }

        tracing::info!("No matches stored for {}, generating a first batch", user_id);

        match self.generate_matches(user_id, None, false).await {
            Ok(summary) => {
                tracing::debug!("Generated {} matches for {}", summary.generated, user_id);
            }
            Err(AppError::NotFound { .. }) => {
                tracing::debug!("User {} has no profile yet, returning no matches", user_id);
                return Ok(Paginated::new(Vec::new(), 0, &page));
            }
            Err(e) => return Err(e),
        }

        let (items, total) = self.ledger.list_for_user(user_id, min_score, &page).await?;
        Ok(Paginated::new(items, total, &page))
    }

    /// Select, score and persist matches for a user
    ///
    /// With `refresh_existing` all of the user's stored matches are deleted
    /// first. Pairs that already exist are skipped, never failing the batch.
    pub async fn generate_matches(
        &self,
        user_id: &str,
        limit: Option<usize>,
        refresh_existing: bool,
    ) -> AppResult<GenerateMatchesResponse> {
        let limit = limit
            .unwrap_or(self.options.default_limit)
            .clamp(1, self.options.max_limit);
        let now = Utc::now();

        let requester = self.requester_profile(user_id).await?;
        let result = self
            .matcher
            .select_for(self.profiles.as_ref(), &requester, limit, now.date_naive())
            .await?;

        if refresh_existing {
            let removed = self.ledger.delete_for_user(user_id).await?;
            tracing::info!("Removed {} existing matches for {}", removed, user_id);
        }

        let rows: Vec<Match> = result
            .matches
            .iter()
            .map(|candidate| {
                Match::between(
                    &requester,
                    &candidate.profile,
                    candidate.match_score,
                    candidate.match_factors,
                    now,
                )
            })
            .collect();

        let generated = self.ledger.insert_many(&rows).await?;

        tracing::info!(
            "Generated {} matches for {} ({} scored, {} skipped as existing)",
            generated,
            user_id,
            rows.len(),
            (rows.len() as u64).saturating_sub(generated)
        );

        Ok(GenerateMatchesResponse {
            generated,
            candidates: result.matches.len(),
            average_score: result.average_score(),
        })
    }

    /// Read a match the user is party to, recording the view
    ///
    /// The view counter is bumped atomically by the ledger. Matches the user
    /// is not party to are reported as missing.
    pub async fn match_detail(&self, match_id: Uuid, user_id: &str) -> AppResult<Match> {
        self.ledger
            .record_view(match_id, user_id, Utc::now())
            .await?
            .ok_or_else(|| match_not_found(match_id))
    }

    /// Change a match's status, optionally replacing its notes
    pub async fn update_match(
        &self,
        match_id: Uuid,
        user_id: &str,
        status: &str,
        notes: Option<&str>,
    ) -> AppResult<Match> {
        let status: MatchStatus = status.parse().map_err(AppError::InvalidRequest)?;

        let updated = self
            .ledger
            .update_status(match_id, user_id, status, notes, Utc::now())
            .await?
            .ok_or_else(|| match_not_found(match_id))?;

        tracing::info!("Match {} set to {:?} by {}", match_id, status, user_id);
        Ok(updated)
    }

    async fn requester_profile(&self, user_id: &str) -> AppResult<Profile> {
        self.profiles
            .find_by_user_id(user_id)
            .await?
            .ok_or_else(|| {
                AppError::not_found("profile_missing", format!("No profile found for user {}", user_id))
            })
    }
}

fn match_not_found(match_id: Uuid) -> AppError {
    AppError::not_found("match_not_found", format!("Match {} not found", match_id))
}
