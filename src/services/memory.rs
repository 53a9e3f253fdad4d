use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::cmp::Reverse;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::core::filters::matches_criteria;
use crate::error::StoreError;
use crate::models::{
    CandidateCriteria, Interest, InterestFilter, InterestStats, InterestStatus, Match,
    MatchStatus, PageRequest, Profile, UserAccount,
};
use crate::services::ports::{
    InterestStore, MatchLedger, ProfileDirectory, UserDirectory, SEND_LOG_RETENTION_DAYS,
};

/// In-process implementation of every port
///
/// Used by the test suites and for running the service without external
/// backends. Each mutation happens under a single write lock, which gives the
/// same atomicity the SQL adapter gets from single statements.
#[derive(Default)]
pub struct MemoryStore {
    profiles: RwLock<HashMap<String, Profile>>,
    users: RwLock<HashMap<String, UserAccount>>,
    matches: RwLock<HashMap<Uuid, Match>>,
    interests: RwLock<HashMap<Uuid, Interest>>,
    sends: RwLock<Vec<SendRecord>>,
}

/// One accepted send, kept after the interest row is reset or purged
struct SendRecord {
    sender_id: String,
    sent_at: DateTime<Utc>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a profile, keyed by its owning user
    pub async fn insert_profile(&self, profile: Profile) {
        self.profiles
            .write()
            .await
            .insert(profile.user_id.clone(), profile);
    }

    pub async fn insert_user(&self, user: UserAccount) {
        self.users.write().await.insert(user.id.clone(), user);
    }

    /// Add or replace an interest row as-is
    pub async fn insert_interest(&self, interest: Interest) {
        self.interests.write().await.insert(interest.id, interest);
    }

    pub async fn interest(&self, interest_id: Uuid) -> Option<Interest> {
        self.interests.read().await.get(&interest_id).cloned()
    }

    pub async fn match_count(&self) -> usize {
        self.matches.read().await.len()
    }
}

fn page_of<T>(mut rows: Vec<T>, page: &PageRequest) -> (Vec<T>, u64) {
    let total = rows.len() as u64;
    let start = usize::try_from(page.offset()).unwrap_or(usize::MAX).min(rows.len());
    let end = start.saturating_add(page.limit as usize).min(rows.len());
    (rows.drain(start..end).collect(), total)
}

#[async_trait]
impl ProfileDirectory for MemoryStore {
    async fn find_by_user_id(&self, user_id: &str) -> Result<Option<Profile>, StoreError> {
        Ok(self.profiles.read().await.get(user_id).cloned())
    }

    async fn query(
        &self,
        criteria: &CandidateCriteria,
        limit: usize,
        skip: usize,
    ) -> Result<Vec<Profile>, StoreError> {
        let profiles = self.profiles.read().await;

        let mut candidates: Vec<Profile> = profiles
            .values()
            .filter(|p| matches_criteria(p, criteria))
            .cloned()
            .collect();

        candidates.sort_by(|a, b| {
            Reverse(a.last_active)
                .cmp(&Reverse(b.last_active))
                .then_with(|| a.user_id.cmp(&b.user_id))
        });

        Ok(candidates.into_iter().skip(skip).take(limit).collect())
    }
}

#[async_trait]
impl UserDirectory for MemoryStore {
    async fn find_by_id(&self, user_id: &str) -> Result<Option<UserAccount>, StoreError> {
        Ok(self.users.read().await.get(user_id).cloned())
    }
}

#[async_trait]
impl MatchLedger for MemoryStore {
    async fn list_for_user(
        &self,
        user_id: &str,
        min_score: u8,
        page: &PageRequest,
    ) -> Result<(Vec<Match>, u64), StoreError> {
        let matches = self.matches.read().await;

        let mut rows: Vec<Match> = matches
            .values()
            .filter(|m| {
                m.involves(user_id) && m.status == MatchStatus::Active && m.match_score >= min_score
            })
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.match_score.cmp(&a.match_score).then_with(|| a.id.cmp(&b.id)));

        Ok(page_of(rows, page))
    }

    async fn count_active_for_user(&self, user_id: &str) -> Result<u64, StoreError> {
        let matches = self.matches.read().await;
        Ok(matches
            .values()
            .filter(|m| m.involves(user_id) && m.status == MatchStatus::Active)
            .count() as u64)
    }

    async fn insert_many(&self, rows: &[Match]) -> Result<u64, StoreError> {
        let mut matches = self.matches.write().await;
        let mut inserted = 0;

        for row in rows {
            let exists = matches
                .values()
                .any(|m| m.user1_id == row.user1_id && m.user2_id == row.user2_id);
            if !exists {
                matches.insert(row.id, row.clone());
                inserted += 1;
            }
        }

        Ok(inserted)
    }

    async fn delete_for_user(&self, user_id: &str) -> Result<u64, StoreError> {
        let mut matches = self.matches.write().await;
        let before = matches.len();
        matches.retain(|_, m| !m.involves(user_id));
        Ok((before - matches.len()) as u64)
    }

    async fn record_view(
        &self,
        match_id: Uuid,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Match>, StoreError> {
        let mut matches = self.matches.write().await;

        Ok(matches
            .get_mut(&match_id)
            .filter(|m| m.involves(user_id))
            .map(|m| {
                m.interaction_count += 1;
                m.last_interaction = Some(now);
                m.updated_at = now;
                m.clone()
            }))
    }

    async fn update_status(
        &self,
        match_id: Uuid,
        user_id: &str,
        status: MatchStatus,
        notes: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Option<Match>, StoreError> {
        let mut matches = self.matches.write().await;

        Ok(matches
            .get_mut(&match_id)
            .filter(|m| m.involves(user_id))
            .map(|m| {
                m.status = status;
                if let Some(notes) = notes {
                    m.notes = Some(notes.to_string());
                }
                m.updated_at = now;
                m.clone()
            }))
    }
}

#[async_trait]
impl InterestStore for MemoryStore {
    async fn find_between(
        &self,
        sender_id: &str,
        receiver_id: &str,
    ) -> Result<Option<Interest>, StoreError> {
        let interests = self.interests.read().await;
        Ok(interests
            .values()
            .find(|i| i.sender_id == sender_id && i.receiver_id == receiver_id)
            .cloned())
    }

    async fn count_sent_since(
        &self,
        sender_id: &str,
        since: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        let sends = self.sends.read().await;
        Ok(sends
            .iter()
            .filter(|s| s.sender_id == sender_id && s.sent_at >= since)
            .count() as u64)
    }

    async fn create_or_reset(
        &self,
        attempt: &Interest,
        now: DateTime<Utc>,
    ) -> Result<Interest, StoreError> {
        let mut interests = self.interests.write().await;

        let existing = interests
            .values_mut()
            .find(|i| i.sender_id == attempt.sender_id && i.receiver_id == attempt.receiver_id);

        let stored = match existing {
            Some(row) if row.is_active(now) => {
                return Err(StoreError::Conflict(format!(
                    "active interest {} -> {}",
                    attempt.sender_id, attempt.receiver_id
                )))
            }
            Some(row) => {
                row.reset_from(attempt);
                row.clone()
            }
            None => {
                interests.insert(attempt.id, attempt.clone());
                attempt.clone()
            }
        };

        self.sends.write().await.push(SendRecord {
            sender_id: stored.sender_id.clone(),
            sent_at: stored.sent_at,
        });

        Ok(stored)
    }

    async fn respond(
        &self,
        interest_id: Uuid,
        receiver_id: &str,
        status: InterestStatus,
        response_message: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Option<Interest>, StoreError> {
        let mut interests = self.interests.write().await;

        Ok(interests
            .get_mut(&interest_id)
            .filter(|i| {
                i.receiver_id == receiver_id && i.status == InterestStatus::Sent && !i.is_expired(now)
            })
            .map(|i| {
                i.status = status;
                i.response_message = response_message.map(str::to_string);
                i.responded_at = Some(now);
                i.updated_at = now;
                i.clone()
            }))
    }

    async fn withdraw(
        &self,
        interest_id: Uuid,
        sender_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Interest>, StoreError> {
        let mut interests = self.interests.write().await;

        Ok(interests
            .get_mut(&interest_id)
            .filter(|i| {
                i.sender_id == sender_id && i.status == InterestStatus::Sent && !i.is_expired(now)
            })
            .map(|i| {
                i.status = InterestStatus::Withdrawn;
                i.updated_at = now;
                i.clone()
            }))
    }

    async fn mark_read(
        &self,
        interest_id: Uuid,
        receiver_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Interest>, StoreError> {
        let mut interests = self.interests.write().await;

        Ok(interests
            .get_mut(&interest_id)
            .filter(|i| i.receiver_id == receiver_id)
            .map(|i| {
                if !i.is_read {
                    i.is_read = true;
                    i.read_at = Some(now);
                    i.updated_at = now;
                }
                i.clone()
            }))
    }

    async fn list(
        &self,
        filter: &InterestFilter,
        page: &PageRequest,
        now: DateTime<Utc>,
    ) -> Result<(Vec<Interest>, u64), StoreError> {
        let interests = self.interests.read().await;

        let mut rows: Vec<Interest> = interests
            .values()
            .filter(|i| filter.accepts(i, now))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.sent_at.cmp(&a.sent_at).then_with(|| a.id.cmp(&b.id)));

        Ok(page_of(rows, page))
    }

    async fn stats(&self, user_id: &str, now: DateTime<Utc>) -> Result<InterestStats, StoreError> {
        let interests = self.interests.read().await;
        let mut stats = InterestStats::default();

        for interest in interests.values() {
            if interest.sender_id == user_id {
                stats.sent.record(interest, now);
            } else if interest.receiver_id == user_id {
                stats.received.record(interest, now);
            }
        }

        Ok(stats)
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut interests = self.interests.write().await;
        let before = interests.len();
        interests.retain(|_, i| !i.is_expired(now));
        let purged = (before - interests.len()) as u64;
        drop(interests);

        let horizon = now - Duration::days(SEND_LOG_RETENTION_DAYS);
        self.sends.write().await.retain(|s| s.sent_at >= horizon);

        Ok(purged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Gender, InterestDirection, InterestPriority, MatchFactors, PartnerPreferences};

    fn profile(user_id: &str, gender: Gender, last_active_hours: Option<i64>) -> Profile {
        Profile {
            id: format!("profile-{}", user_id),
            user_id: user_id.to_string(),
            gender,
            date_of_birth: None,
            marital_status: None,
            mother_tongue: None,
            height_cm: None,
            education: None,
            occupation: None,
            job_location: None,
            partner: PartnerPreferences::default(),
            is_verified: true,
            is_complete: true,
            last_active: last_active_hours.map(|h| Utc::now() - Duration::hours(h)),
        }
    }

    fn interest(sender: &str, receiver: &str, sent_at: DateTime<Utc>) -> Interest {
        Interest {
            id: Uuid::new_v4(),
            sender_id: sender.to_string(),
            receiver_id: receiver.to_string(),
            sender_profile_id: format!("profile-{}", sender),
            receiver_profile_id: format!("profile-{}", receiver),
            status: InterestStatus::Sent,
            message: None,
            response_message: None,
            sent_at,
            responded_at: None,
            expires_at: Interest::expiry_for(sent_at, 30),
            is_read: false,
            read_at: None,
            priority: InterestPriority::Normal,
            created_at: sent_at,
            updated_at: sent_at,
        }
    }

    #[tokio::test]
    async fn test_query_orders_by_recent_activity() {
        let store = MemoryStore::new();
        store.insert_profile(profile("stale", Gender::Female, Some(48))).await;
        store.insert_profile(profile("fresh", Gender::Female, Some(1))).await;
        store.insert_profile(profile("never", Gender::Female, None)).await;
        store.insert_profile(profile("male", Gender::Male, Some(1))).await;

        let criteria = CandidateCriteria {
            gender: Gender::Female,
            exclude_user_id: "requester".to_string(),
            require_complete: true,
            require_verified: true,
            min_birth_date: None,
            max_birth_date: None,
            locations: vec![],
        };

        let found = store.query(&criteria, 10, 0).await.unwrap();
        let ids: Vec<_> = found.iter().map(|p| p.user_id.as_str()).collect();
        assert_eq!(ids, vec!["fresh", "stale", "never"]);

        let second = store.query(&criteria, 1, 1).await.unwrap();
        assert_eq!(second[0].user_id, "stale");
    }

    #[tokio::test]
    async fn test_insert_many_skips_existing_pairs() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let a = profile("a", Gender::Male, None);
        let b = profile("b", Gender::Female, None);

        let first = Match::between(&a, &b, 80, MatchFactors::default(), now);
        let again = Match::between(&b, &a, 85, MatchFactors::default(), now);

        assert_eq!(store.insert_many(&[first]).await.unwrap(), 1);
        assert_eq!(store.insert_many(&[again]).await.unwrap(), 0);
        assert_eq!(store.match_count().await, 1);
    }

    #[tokio::test]
    async fn test_create_or_reset_conflicts_while_active() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let first = interest("a", "b", now);

        store.create_or_reset(&first, now).await.unwrap();
        let err = store.create_or_reset(&interest("a", "b", now), now).await;
        assert!(matches!(err, Err(StoreError::Conflict(_))));

        store.withdraw(first.id, "a", now).await.unwrap();
        let reset = store
            .create_or_reset(&interest("a", "b", now), now)
            .await
            .unwrap();
        assert_eq!(reset.id, first.id);
        assert_eq!(reset.status, InterestStatus::Sent);
    }

    #[tokio::test]
    async fn test_resets_count_against_the_send_log() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let since = now - Duration::hours(1);

        let first = store.create_or_reset(&interest("a", "b", now), now).await.unwrap();
        store.withdraw(first.id, "a", now).await.unwrap();
        store.create_or_reset(&interest("a", "b", now), now).await.unwrap();
        let _ = store.create_or_reset(&interest("a", "b", now), now).await;

        assert_eq!(store.count_sent_since("a", since).await.unwrap(), 2);
        assert_eq!(store.count_sent_since("b", since).await.unwrap(), 0);

        store.purge_expired(now + Duration::days(3)).await.unwrap();
        assert_eq!(store.count_sent_since("a", since).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_mark_read_keeps_first_timestamp() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let row = interest("a", "b", now);
        store.insert_interest(row.clone()).await;

        let first = store.mark_read(row.id, "b", now).await.unwrap().unwrap();
        let later = now + Duration::minutes(5);
        let second = store.mark_read(row.id, "b", later).await.unwrap().unwrap();

        assert_eq!(first.read_at, Some(now));
        assert_eq!(second.read_at, Some(now));
        assert!(store.mark_read(row.id, "a", later).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_and_purge_skip_expired() {
        let store = MemoryStore::new();
        let now = Utc::now();
        store.insert_interest(interest("a", "b", now)).await;
        store
            .insert_interest(interest("a", "c", now - Duration::days(31)))
            .await;

        let filter = InterestFilter {
            user_id: "a".to_string(),
            direction: InterestDirection::Sent,
            status: None,
        };
        let (rows, total) = store
            .list(&filter, &PageRequest::new(1, 20, 100), now)
            .await
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(rows[0].receiver_id, "b");

        let stats = store.stats("a", now).await.unwrap();
        assert_eq!(stats.sent.sent, 1);
        assert_eq!(stats.sent.expired, 1);

        assert_eq!(store.purge_expired(now).await.unwrap(), 1);
        assert_eq!(store.stats("a", now).await.unwrap().sent.total, 1);
    }
}
