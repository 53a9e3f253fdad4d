//! Boundaries between the matching core and its collaborators.
//!
//! The profile and user directories are external services; the match ledger
//! and interest store are owned by this service. Every state transition is a
//! single call here so adapters can make it one atomic storage statement.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{
    CandidateCriteria, Interest, InterestFilter, InterestStats, InterestStatus, Match,
    MatchStatus, PageRequest, Profile, UserAccount,
};

/// Days of send history kept for quota counting; a local-day window never
/// reaches further back
pub const SEND_LOG_RETENTION_DAYS: i64 = 2;

/// Read-only access to structured profiles
#[async_trait]
pub trait ProfileDirectory: Send + Sync {
    async fn find_by_user_id(&self, user_id: &str) -> Result<Option<Profile>, StoreError>;

    /// Profiles matching `criteria`, most recently active first
    async fn query(
        &self,
        criteria: &CandidateCriteria,
        limit: usize,
        skip: usize,
    ) -> Result<Vec<Profile>, StoreError>;
}

/// Read-only access to user records (subscription tier lookup)
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_by_id(&self, user_id: &str) -> Result<Option<UserAccount>, StoreError>;
}

/// Persisted scored pairings
#[async_trait]
pub trait MatchLedger: Send + Sync {
    /// Active matches involving the user with `match_score >= min_score`,
    /// highest score first, plus the total count before pagination
    async fn list_for_user(
        &self,
        user_id: &str,
        min_score: u8,
        page: &PageRequest,
    ) -> Result<(Vec<Match>, u64), StoreError>;

    /// Active matches involving the user regardless of score
    async fn count_active_for_user(&self, user_id: &str) -> Result<u64, StoreError>;

    /// Insert matches, skipping any whose pair already exists; returns the
    /// number of rows inserted
    async fn insert_many(&self, matches: &[Match]) -> Result<u64, StoreError>;

    async fn delete_for_user(&self, user_id: &str) -> Result<u64, StoreError>;

    /// Atomically bump `interaction_count` and `last_interaction` if the user
    /// is a party to the match
    async fn record_view(
        &self,
        match_id: Uuid,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Match>, StoreError>;

    async fn update_status(
        &self,
        match_id: Uuid,
        user_id: &str,
        status: MatchStatus,
        notes: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Option<Match>, StoreError>;

    async fn health_check(&self) -> Result<bool, StoreError> {
        Ok(true)
    }
}

/// Persisted interests
#[async_trait]
pub trait InterestStore: Send + Sync {
    async fn find_between(
        &self,
        sender_id: &str,
        receiver_id: &str,
    ) -> Result<Option<Interest>, StoreError>;

    /// Sends accepted from the sender at or after `since`, counting every
    /// re-send of a reused row
    async fn count_sent_since(
        &self,
        sender_id: &str,
        since: DateTime<Utc>,
    ) -> Result<u64, StoreError>;

    /// Create the interest, or reset the existing row for the same ordered
    /// pair when that row is declined, withdrawn or expired. Fails with
    /// `StoreError::Conflict` while an active row exists.
    async fn create_or_reset(
        &self,
        interest: &Interest,
        now: DateTime<Utc>,
    ) -> Result<Interest, StoreError>;

    /// Move a pending, unexpired interest addressed to `receiver_id` into
    /// `status`
    async fn respond(
        &self,
        interest_id: Uuid,
        receiver_id: &str,
        status: InterestStatus,
        response_message: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Option<Interest>, StoreError>;

    /// Withdraw a pending, unexpired interest sent by `sender_id`
    async fn withdraw(
        &self,
        interest_id: Uuid,
        sender_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Interest>, StoreError>;

    /// Mark read; `read_at` is only set the first time
    async fn mark_read(
        &self,
        interest_id: Uuid,
        receiver_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Interest>, StoreError>;

    /// Newest first, expired interests excluded
    async fn list(
        &self,
        filter: &InterestFilter,
        page: &PageRequest,
        now: DateTime<Utc>,
    ) -> Result<(Vec<Interest>, u64), StoreError>;

    async fn stats(&self, user_id: &str, now: DateTime<Utc>) -> Result<InterestStats, StoreError>;

    /// Hard-delete expired interests and send history older than
    /// `SEND_LOG_RETENTION_DAYS`; returns how many interests were removed
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError>;
}
