use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::core::calendar::day_start;
use crate::error::{AppError, AppResult, StoreError};
use crate::models::{
    Interest, InterestDirection, InterestFilter, InterestPriority, InterestStats, InterestStatus,
    PageRequest, Paginated, SendInterestResponse, SubscriptionTier,
};
use crate::services::ports::{InterestStore, ProfileDirectory, UserDirectory};

/// Interests a sender may create per local calendar day, by tier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyLimits {
    pub basic: u32,
    pub premium: u32,
    pub elite: u32,
}

impl DailyLimits {
    pub fn for_tier(&self, tier: SubscriptionTier) -> u32 {
        match tier {
            SubscriptionTier::Basic => self.basic,
            SubscriptionTier::Premium => self.premium,
            SubscriptionTier::Elite => self.elite,
        }
    }
}

impl Default for DailyLimits {
    fn default() -> Self {
        Self {
            basic: 10,
            premium: 50,
            elite: 100,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct InterestPolicy {
    pub expiry_days: i64,
    pub message_max_chars: usize,
    pub daily_limits: DailyLimits,
}

impl Default for InterestPolicy {
    fn default() -> Self {
        Self {
            expiry_days: 30,
            message_max_chars: 500,
            daily_limits: DailyLimits::default(),
        }
    }
}

/// Interest state machine: `sent -> accepted | declined | withdrawn`
///
/// Terminal states have no outgoing transition. A `sent` interest past its
/// expiry is inactive: it cannot be answered or withdrawn, is left out of
/// listings and pending counts, and may be replaced by a fresh send.
pub struct InterestWorkflow {
    profiles: Arc<dyn ProfileDirectory>,
    users: Arc<dyn UserDirectory>,
    store: Arc<dyn InterestStore>,
    policy: InterestPolicy,
}

impl InterestWorkflow {
    pub fn new(
        profiles: Arc<dyn ProfileDirectory>,
        users: Arc<dyn UserDirectory>,
        store: Arc<dyn InterestStore>,
        policy: InterestPolicy,
    ) -> Self {
        Self {
            profiles,
            users,
            store,
            policy,
        }
    }

    pub async fn send(
        &self,
        sender_id: &str,
        receiver_id: &str,
        message: Option<&str>,
    ) -> AppResult<SendInterestResponse> {
        self.send_at(sender_id, receiver_id, message, Utc::now()).await
    }

    /// Express interest from `sender_id` in `receiver_id`
    ///
    /// The daily quota is count-then-insert and therefore best effort under
    /// concurrent sends; the pair uniqueness is enforced by the store.
    pub async fn send_at(
        &self,
        sender_id: &str,
        receiver_id: &str,
        message: Option<&str>,
        now: DateTime<Utc>,
    ) -> AppResult<SendInterestResponse> {
        if sender_id == receiver_id {
            return Err(AppError::invalid("You cannot send an interest to yourself"));
        }
        let message = self.normalize_message(message, "Message")?;

        let receiver = self
            .profiles
            .find_by_user_id(receiver_id)
            .await?
            .ok_or_else(|| {
                AppError::not_found("profile_missing", format!("No profile found for user {}", receiver_id))
            })?;

        let sender = match self.profiles.find_by_user_id(sender_id).await? {
            Some(profile) if profile.is_complete => profile,
            _ => {
                return Err(AppError::invalid(
                    "Please complete your profile first before sending interests",
                ))
            }
        };

        if let Some(existing) = self.store.find_between(sender_id, receiver_id).await? {
            if existing.is_active(now) {
                return Err(already_sent());
            }
        }

        let tier = self.sender_tier(sender_id, now).await?;
        let limit = self.policy.daily_limits.for_tier(tier);
        let used = self.store.count_sent_since(sender_id, day_start(now)).await?;
        if used >= u64::from(limit) {
            tracing::info!(
                "Interest quota reached for {} ({}/{} on {} plan)",
                sender_id,
                used,
                limit,
                tier
            );
            return Err(AppError::RateLimited { tier, limit, used });
        }

        let attempt = Interest {
            id: Uuid::new_v4(),
            sender_id: sender_id.to_string(),
            receiver_id: receiver_id.to_string(),
            sender_profile_id: sender.id,
            receiver_profile_id: receiver.id,
            status: InterestStatus::Sent,
            message,
            response_message: None,
            sent_at: now,
            responded_at: None,
            expires_at: Interest::expiry_for(now, self.policy.expiry_days),
            is_read: false,
            read_at: None,
            priority: InterestPriority::for_tier(tier),
            created_at: now,
            updated_at: now,
        };

        let interest = self
            .store
            .create_or_reset(&attempt, now)
            .await
            .map_err(|e| match e {
                StoreError::Conflict(_) => already_sent(),
                other => other.into(),
            })?;

        let mutual_interest = self
            .store
            .find_between(receiver_id, sender_id)
            .await?
            .is_some_and(|reverse| reverse.is_active(now));

        tracing::info!(
            "Interest {} sent {} -> {} (priority={:?}, mutual={})",
            interest.id,
            sender_id,
            receiver_id,
            interest.priority,
            mutual_interest
        );

        Ok(SendInterestResponse {
            interest,
            mutual_interest,
        })
    }

    pub async fn respond(
        &self,
        interest_id: Uuid,
        receiver_id: &str,
        status: &str,
        response_message: Option<&str>,
    ) -> AppResult<Interest> {
        self.respond_at(interest_id, receiver_id, status, response_message, Utc::now())
            .await
    }

    /// Accept or decline a pending interest addressed to `receiver_id`
    pub async fn respond_at(
        &self,
        interest_id: Uuid,
        receiver_id: &str,
        status: &str,
        response_message: Option<&str>,
        now: DateTime<Utc>,
    ) -> AppResult<Interest> {
        let status = match status.parse::<InterestStatus>() {
            Ok(status @ (InterestStatus::Accepted | InterestStatus::Declined)) => status,
            _ => {
                return Err(AppError::invalid(
                    "Response status must be either accepted or declined",
                ))
            }
        };
        let response_message = self.normalize_message(response_message, "Response message")?;

        let interest = self
            .store
            .respond(interest_id, receiver_id, status, response_message.as_deref(), now)
            .await?
            .ok_or_else(|| {
                AppError::not_found(
                    "interest_not_found",
                    "Interest not found or already responded to",
                )
            })?;

        tracing::info!("Interest {} {:?} by {}", interest_id, status, receiver_id);
        Ok(interest)
    }

    pub async fn withdraw(&self, interest_id: Uuid, sender_id: &str) -> AppResult<Interest> {
        self.withdraw_at(interest_id, sender_id, Utc::now()).await
    }

    /// Withdraw a pending interest; only its sender may do so
    pub async fn withdraw_at(
        &self,
        interest_id: Uuid,
        sender_id: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Interest> {
        let interest = self
            .store
            .withdraw(interest_id, sender_id, now)
            .await?
            .ok_or_else(|| {
                AppError::not_found("interest_not_found", "Interest not found or cannot be withdrawn")
            })?;

        tracing::info!("Interest {} withdrawn by {}", interest_id, sender_id);
        Ok(interest)
    }

    pub async fn mark_read(&self, interest_id: Uuid, receiver_id: &str) -> AppResult<Interest> {
        self.mark_read_at(interest_id, receiver_id, Utc::now()).await
    }

    pub async fn mark_read_at(
        &self,
        interest_id: Uuid,
        receiver_id: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Interest> {
        self.store
            .mark_read(interest_id, receiver_id, now)
            .await?
            .ok_or_else(|| AppError::not_found("interest_not_found", "Interest not found"))
    }

    pub async fn list_received(
        &self,
        user_id: &str,
        status: Option<&str>,
        page: PageRequest,
    ) -> AppResult<Paginated<Interest>> {
        self.list(user_id, InterestDirection::Received, status, page).await
    }

    pub async fn list_sent(
        &self,
        user_id: &str,
        status: Option<&str>,
        page: PageRequest,
    ) -> AppResult<Paginated<Interest>> {
        self.list(user_id, InterestDirection::Sent, status, page).await
    }

    async fn list(
        &self,
        user_id: &str,
        direction: InterestDirection,
        status: Option<&str>,
        page: PageRequest,
    ) -> AppResult<Paginated<Interest>> {
        let status = status
            .filter(|s| !s.trim().is_empty())
            .map(str::parse::<InterestStatus>)
            .transpose()
            .map_err(AppError::InvalidRequest)?;

        let filter = InterestFilter {
            user_id: user_id.to_string(),
            direction,
            status,
        };
        let (items, total) = self.store.list(&filter, &page, Utc::now()).await?;
        Ok(Paginated::new(items, total, &page))
    }

    pub async fn stats(&self, user_id: &str) -> AppResult<InterestStats> {
        Ok(self.store.stats(user_id, Utc::now()).await?)
    }

    /// Remove expired interests; used by the background cleanup task
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let removed = self.store.purge_expired(now).await?;
        if removed > 0 {
            tracing::info!("Purged {} expired interests", removed);
        }
        Ok(removed)
    }

    async fn sender_tier(&self, sender_id: &str, now: DateTime<Utc>) -> AppResult<SubscriptionTier> {
        match self.users.find_by_id(sender_id).await? {
            Some(account) => Ok(account.tier_at(now)),
            None => {
                tracing::warn!("No user record for {}, applying basic plan limits", sender_id);
                Ok(SubscriptionTier::Basic)
            }
        }
    }

    fn normalize_message(&self, message: Option<&str>, field: &str) -> AppResult<Option<String>> {
        let Some(message) = message.map(str::trim).filter(|m| !m.is_empty()) else {
            return Ok(None);
        };
        if message.chars().count() > self.policy.message_max_chars {
            return Err(AppError::invalid(format!(
                "{} must be at most {} characters",
                field, self.policy.message_max_chars
            )));
        }
        Ok(Some(message.to_string()))
    }
}

fn already_sent() -> AppError {
    AppError::Conflict("Interest already sent or accepted".to_string())
}
