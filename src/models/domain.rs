use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Declared gender on a profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    /// Counterpart gender used by the candidate selector
    pub fn opposite(self) -> Self {
        match self {
            Gender::Male => Gender::Female,
            Gender::Female => Gender::Male,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
        }
    }
}

/// What a profile owner is looking for in a partner
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartnerPreferences {
    #[serde(rename = "partnerAgeFrom", default)]
    pub age_from: Option<u32>,
    #[serde(rename = "partnerAgeTo", default)]
    pub age_to: Option<u32>,
    #[serde(default)]
    pub preferred_locations: Vec<String>,
    #[serde(rename = "partnerMinIncome", default)]
    pub min_income: Option<u64>,
}

/// Structured profile as held by the profile directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(alias = "$id")]
    pub id: String,
    pub user_id: String,
    pub gender: Gender,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    pub marital_status: Option<String>,
    #[serde(default)]
    pub mother_tongue: Option<String>,
    #[serde(default)]
    pub height_cm: Option<u16>,
    #[serde(default)]
    pub education: Option<String>,
    #[serde(default)]
    pub occupation: Option<String>,
    #[serde(default)]
    pub job_location: Option<String>,
    #[serde(flatten)]
    pub partner: PartnerPreferences,
    #[serde(default)]
    pub is_verified: bool,
    #[serde(default)]
    pub is_complete: bool,
    #[serde(default)]
    pub last_active: Option<DateTime<Utc>>,
}

/// Subscription plan gating quotas and interest priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionTier {
    Basic,
    Premium,
    Elite,
}

impl fmt::Display for SubscriptionTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SubscriptionTier::Basic => "basic",
            SubscriptionTier::Premium => "premium",
            SubscriptionTier::Elite => "elite",
        };
        f.write_str(name)
    }
}

/// User record as held by the user directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAccount {
    #[serde(alias = "$id")]
    pub id: String,
    #[serde(default)]
    pub subscription_plan: Option<SubscriptionTier>,
    #[serde(default)]
    pub subscription_expires_at: Option<DateTime<Utc>>,
}

impl UserAccount {
    /// Tier in effect at `now`; lapsed or missing subscriptions are basic
    pub fn tier_at(&self, now: DateTime<Utc>) -> SubscriptionTier {
        match (self.subscription_plan, self.subscription_expires_at) {
            (Some(_), Some(expires_at)) if expires_at <= now => SubscriptionTier::Basic,
            (Some(plan), _) => plan,
            (None, _) => SubscriptionTier::Basic,
        }
    }
}

/// Per-factor compatibility breakdown, each in 0..=100
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchFactors {
    pub age_compatibility: u8,
    pub education_compatibility: u8,
    pub occupation_compatibility: u8,
    pub location_compatibility: u8,
    pub family_compatibility: u8,
    pub lifestyle_compatibility: u8,
}

/// A candidate profile together with its score against the requester
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredCandidate {
    pub profile: Profile,
    pub match_score: u8,
    pub match_factors: MatchFactors,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "match_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    Active,
    Contacted,
    Blocked,
    Hidden,
}

impl FromStr for MatchStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().as_str() {
            "active" => Ok(MatchStatus::Active),
            "contacted" => Ok(MatchStatus::Contacted),
            "blocked" => Ok(MatchStatus::Blocked),
            "hidden" => Ok(MatchStatus::Hidden),
            other => Err(format!(
                "Invalid match status '{}': must be one of active, contacted, blocked, hidden",
                other
            )),
        }
    }
}

/// Persisted scored pairing between two users
///
/// The pair is stored in canonical order (`user1_id < user2_id`) so that the
/// unique index on `(user1_id, user2_id)` covers the unordered pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    pub id: Uuid,
    pub user1_id: String,
    pub user2_id: String,
    pub profile1_id: String,
    pub profile2_id: String,
    pub match_score: u8,
    pub match_factors: MatchFactors,
    pub status: MatchStatus,
    pub last_interaction: Option<DateTime<Utc>>,
    pub interaction_count: u32,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Match {
    /// Build a new active match between two profiles in canonical order
    pub fn between(
        a: &Profile,
        b: &Profile,
        match_score: u8,
        match_factors: MatchFactors,
        now: DateTime<Utc>,
    ) -> Self {
        let (first, second) = if a.user_id <= b.user_id { (a, b) } else { (b, a) };

        Self {
            id: Uuid::new_v4(),
            user1_id: first.user_id.clone(),
            user2_id: second.user_id.clone(),
            profile1_id: first.id.clone(),
            profile2_id: second.id.clone(),
            match_score,
            match_factors,
            status: MatchStatus::Active,
            last_interaction: None,
            interaction_count: 0,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn involves(&self, user_id: &str) -> bool {
        self.user1_id == user_id || self.user2_id == user_id
    }

    /// The other party of the match, if `user_id` is one of the two
    pub fn counterpart_of(&self, user_id: &str) -> Option<&str> {
        if self.user1_id == user_id {
            Some(&self.user2_id)
        } else if self.user2_id == user_id {
            Some(&self.user1_id)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "interest_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum InterestStatus {
    Sent,
    Accepted,
    Declined,
    Withdrawn,
}

impl InterestStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            InterestStatus::Sent => "sent",
            InterestStatus::Accepted => "accepted",
            InterestStatus::Declined => "declined",
            InterestStatus::Withdrawn => "withdrawn",
        }
    }
}

impl FromStr for InterestStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().as_str() {
            "sent" => Ok(InterestStatus::Sent),
            "accepted" => Ok(InterestStatus::Accepted),
            "declined" => Ok(InterestStatus::Declined),
            "withdrawn" => Ok(InterestStatus::Withdrawn),
            other => Err(format!(
                "Invalid interest status '{}': must be one of sent, accepted, declined, withdrawn",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "interest_priority", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum InterestPriority {
    Normal,
    High,
    Premium,
}

impl InterestPriority {
    pub fn for_tier(tier: SubscriptionTier) -> Self {
        match tier {
            SubscriptionTier::Elite => InterestPriority::Premium,
            SubscriptionTier::Basic | SubscriptionTier::Premium => InterestPriority::Normal,
        }
    }
}

/// One user's expressed interest in another
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Interest {
    pub id: Uuid,
    pub sender_id: String,
    pub receiver_id: String,
    pub sender_profile_id: String,
    pub receiver_profile_id: String,
    pub status: InterestStatus,
    pub message: Option<String>,
    pub response_message: Option<String>,
    pub sent_at: DateTime<Utc>,
    pub responded_at: Option<DateTime<Utc>>,
    pub expires_at: DateTime<Utc>,
    pub is_read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub priority: InterestPriority,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Interest {
    /// A still-pending interest whose expiry has passed
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.status == InterestStatus::Sent && self.expires_at < now
    }

    /// Pending-and-unexpired or accepted; active interests block a re-send
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        match self.status {
            InterestStatus::Sent => !self.is_expired(now),
            InterestStatus::Accepted => true,
            InterestStatus::Declined | InterestStatus::Withdrawn => false,
        }
    }

    /// Reset a reusable row to a fresh `sent` attempt
    pub fn reset_from(&mut self, attempt: &Interest) {
        self.status = InterestStatus::Sent;
        self.message = attempt.message.clone();
        self.response_message = None;
        self.sent_at = attempt.sent_at;
        self.responded_at = None;
        self.expires_at = attempt.expires_at;
        self.is_read = false;
        self.read_at = None;
        self.priority = attempt.priority;
        self.sender_profile_id = attempt.sender_profile_id.clone();
        self.receiver_profile_id = attempt.receiver_profile_id.clone();
        self.updated_at = attempt.updated_at;
    }

    pub fn expiry_for(sent_at: DateTime<Utc>, expiry_days: i64) -> DateTime<Utc> {
        sent_at + Duration::days(expiry_days)
    }
}

/// Which side of an interest a listing is for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterestDirection {
    Sent,
    Received,
}

/// Listing filter for interests
#[derive(Debug, Clone)]
pub struct InterestFilter {
    pub user_id: String,
    pub direction: InterestDirection,
    pub status: Option<InterestStatus>,
}

impl InterestFilter {
    /// Listings exclude expired rows
    pub fn accepts(&self, interest: &Interest, now: DateTime<Utc>) -> bool {
        let party = match self.direction {
            InterestDirection::Sent => &interest.sender_id,
            InterestDirection::Received => &interest.receiver_id,
        };

        party == &self.user_id
            && !interest.is_expired(now)
            && self.status.map_or(true, |status| interest.status == status)
    }
}

/// Counts per status for one side of a user's interests
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub sent: u64,
    pub accepted: u64,
    pub declined: u64,
    pub withdrawn: u64,
    pub expired: u64,
    pub total: u64,
}

impl StatusCounts {
    pub fn record(&mut self, interest: &Interest, now: DateTime<Utc>) {
        let bucket = if interest.is_expired(now) {
            "expired"
        } else {
            interest.status.as_str()
        };
        self.add_bucket(bucket, 1);
    }

    /// Add `count` interests to a named bucket (a status name or `expired`)
    pub fn add_bucket(&mut self, bucket: &str, count: u64) {
        let slot = match bucket {
            "sent" => &mut self.sent,
            "accepted" => &mut self.accepted,
            "declined" => &mut self.declined,
            "withdrawn" => &mut self.withdrawn,
            "expired" => &mut self.expired,
            other => {
                tracing::warn!("Ignoring unknown interest bucket '{}'", other);
                return;
            }
        };
        *slot += count;
        self.total += count;
    }
}

/// Dashboard counters for a user's interests
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterestStats {
    pub sent: StatusCounts,
    pub received: StatusCounts,
}

/// Eligibility criteria pushed down into the profile directory
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateCriteria {
    pub gender: Gender,
    pub exclude_user_id: String,
    pub require_complete: bool,
    pub require_verified: bool,
    pub min_birth_date: Option<NaiveDate>,
    pub max_birth_date: Option<NaiveDate>,
    pub locations: Vec<String>,
}

/// Scoring weights
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringWeights {
    pub age: f64,
    pub education: f64,
    pub occupation: f64,
    pub location: f64,
    pub family: f64,
    pub lifestyle: f64,
}

impl ScoringWeights {
    pub fn total(&self) -> f64 {
        self.age + self.education + self.occupation + self.location + self.family + self.lifestyle
    }
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            age: 0.20,
            education: 0.15,
            occupation: 0.15,
            location: 0.10,
            family: 0.20,
            lifestyle: 0.20,
        }
    }
}

/// One-based page request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl PageRequest {
    pub fn new(page: u32, limit: u32, max_limit: u32) -> Self {
        Self {
            page: page.max(1),
            limit: limit.clamp(1, max_limit.max(1)),
        }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
    }
}
