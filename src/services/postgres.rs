use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{
    Interest, InterestDirection, InterestFilter, InterestStats, InterestStatus, Match,
    MatchFactors, MatchStatus, PageRequest,
};
use crate::services::ports::{InterestStore, MatchLedger, SEND_LOG_RETENTION_DAYS};

/// Errors that can occur when interacting with PostgreSQL
#[derive(Debug, Error)]
pub enum PostgresError {
    #[error("SQLx error: {0}")]
    SqlxError(sqlx::Error),

    #[error("Migration error: {0}")]
    MigrateError(#[from] sqlx::migrate::MigrateError),

    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

impl From<sqlx::Error> for PostgresError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            if db.is_unique_violation() {
                return PostgresError::UniqueViolation(
                    db.constraint().unwrap_or("unique constraint").to_string(),
                );
            }
        }
        PostgresError::SqlxError(err)
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        PostgresError::from(err).into()
    }
}

const MATCH_COLUMNS: &str = "id, user1_id, user2_id, profile1_id, profile2_id, match_score, \
    match_factors, status, last_interaction, interaction_count, notes, created_at, updated_at";

const INTEREST_COLUMNS: &str = "id, sender_id, receiver_id, sender_profile_id, \
    receiver_profile_id, status, message, response_message, sent_at, responded_at, expires_at, \
    is_read, read_at, priority, created_at, updated_at";

/// PostgreSQL client holding the match ledger and the interests
pub struct PostgresClient {
    pool: PgPool,
}

impl PostgresClient {
    /// Create a new PostgreSQL client from a connection string
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
        acquire_timeout: Duration,
        idle_timeout: Duration,
    ) -> Result<Self, PostgresError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(acquire_timeout)
            .idle_timeout(idle_timeout)
            .test_before_acquire(true)
            .connect(database_url)
            .await?;

        // Run migrations on startup
        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    /// Create a new PostgreSQL client from settings
    pub async fn from_settings(
        url: &str,
        max_connections: Option<u32>,
        min_connections: Option<u32>,
        acquire_timeout_secs: Option<u64>,
        idle_timeout_secs: Option<u64>,
    ) -> Result<Self, PostgresError> {
        tracing::info!("Connecting to PostgreSQL");

        Self::new(
            url,
            max_connections.unwrap_or(10),
            min_connections.unwrap_or(1),
            Duration::from_secs(acquire_timeout_secs.unwrap_or(5)),
            Duration::from_secs(idle_timeout_secs.unwrap_or(600)),
        )
        .await
    }
}

fn match_from_row(row: &PgRow) -> Result<Match, PostgresError> {
    let score: i16 = row.try_get("match_score")?;
    let count: i32 = row.try_get("interaction_count")?;
    let Json(match_factors): Json<MatchFactors> = row.try_get("match_factors")?;

    Ok(Match {
        id: row.try_get("id")?,
        user1_id: row.try_get("user1_id")?,
        user2_id: row.try_get("user2_id")?,
        profile1_id: row.try_get("profile1_id")?,
        profile2_id: row.try_get("profile2_id")?,
        match_score: u8::try_from(score)
            .map_err(|_| PostgresError::InvalidData(format!("match_score {}", score)))?,
        match_factors,
        status: row.try_get("status")?,
        last_interaction: row.try_get("last_interaction")?,
        interaction_count: u32::try_from(count)
            .map_err(|_| PostgresError::InvalidData(format!("interaction_count {}", count)))?,
        notes: row.try_get("notes")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn interest_from_row(row: &PgRow) -> Result<Interest, PostgresError> {
    Ok(Interest {
        id: row.try_get("id")?,
        sender_id: row.try_get("sender_id")?,
        receiver_id: row.try_get("receiver_id")?,
        sender_profile_id: row.try_get("sender_profile_id")?,
        receiver_profile_id: row.try_get("receiver_profile_id")?,
        status: row.try_get("status")?,
        message: row.try_get("message")?,
        response_message: row.try_get("response_message")?,
        sent_at: row.try_get("sent_at")?,
        responded_at: row.try_get("responded_at")?,
        expires_at: row.try_get("expires_at")?,
        is_read: row.try_get("is_read")?,
        read_at: row.try_get("read_at")?,
        priority: row.try_get("priority")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn count_from(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

#[async_trait]
impl MatchLedger for PostgresClient {
    async fn list_for_user(
        &self,
        user_id: &str,
        min_score: u8,
        page: &PageRequest,
    ) -> Result<(Vec<Match>, u64), StoreError> {
        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM matches
            WHERE (user1_id = $1 OR user2_id = $1)
              AND status = $2
              AND match_score >= $3
            "#,
        )
        .bind(user_id)
        .bind(MatchStatus::Active)
        .bind(i16::from(min_score))
        .fetch_one(&self.pool)
        .await?;

        let query = format!(
            r#"
            SELECT {MATCH_COLUMNS}
            FROM matches
            WHERE (user1_id = $1 OR user2_id = $1)
              AND status = $2
              AND match_score >= $3
            ORDER BY match_score DESC, id
            LIMIT $4 OFFSET $5
            "#
        );

        let rows = sqlx::query(&query)
            .bind(user_id)
            .bind(MatchStatus::Active)
            .bind(i16::from(min_score))
            .bind(i64::from(page.limit))
            .bind(page.offset() as i64)
            .fetch_all(&self.pool)
            .await?;

        let matches = rows
            .iter()
            .map(match_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        Ok((matches, count_from(total)))
    }

    async fn count_active_for_user(&self, user_id: &str) -> Result<u64, StoreError> {
        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM matches
            WHERE (user1_id = $1 OR user2_id = $1) AND status = $2
            "#,
        )
        .bind(user_id)
        .bind(MatchStatus::Active)
        .fetch_one(&self.pool)
        .await?;

        Ok(count_from(total))
    }

    /// Uses INSERT ... ON CONFLICT DO NOTHING per row so an existing pair is
    /// skipped without aborting the rest of the batch.
    async fn insert_many(&self, matches: &[Match]) -> Result<u64, StoreError> {
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0;

        for m in matches {
            let result = sqlx::query(
                r#"
                INSERT INTO matches (
                    id, user1_id, user2_id, profile1_id, profile2_id, match_score,
                    match_factors, status, interaction_count, created_at, updated_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 0, $9, $10)
                ON CONFLICT (user1_id, user2_id) DO NOTHING
                "#,
            )
            .bind(m.id)
            .bind(&m.user1_id)
            .bind(&m.user2_id)
            .bind(&m.profile1_id)
            .bind(&m.profile2_id)
            .bind(i16::from(m.match_score))
            .bind(Json(m.match_factors))
            .bind(m.status)
            .bind(m.created_at)
            .bind(m.updated_at)
            .execute(&mut *tx)
            .await?;

            inserted += result.rows_affected();
        }

        tx.commit().await?;

        tracing::debug!("Inserted {} of {} matches", inserted, matches.len());
        Ok(inserted)
    }

    async fn delete_for_user(&self, user_id: &str) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM matches WHERE user1_id = $1 OR user2_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn record_view(
        &self,
        match_id: Uuid,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Match>, StoreError> {
        let query = format!(
            r#"
            UPDATE matches
            SET interaction_count = interaction_count + 1,
                last_interaction = $3,
                updated_at = $3
            WHERE id = $1 AND (user1_id = $2 OR user2_id = $2)
            RETURNING {MATCH_COLUMNS}
            "#
        );

        let row = sqlx::query(&query)
            .bind(match_id)
            .bind(user_id)
            .bind(now)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(match_from_row).transpose()?)
    }

    async fn update_status(
        &self,
        match_id: Uuid,
        user_id: &str,
        status: MatchStatus,
        notes: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Option<Match>, StoreError> {
        let query = format!(
            r#"
            UPDATE matches
            SET status = $3,
                notes = COALESCE($4, notes),
                updated_at = $5
            WHERE id = $1 AND (user1_id = $2 OR user2_id = $2)
            RETURNING {MATCH_COLUMNS}
            "#
        );

        let row = sqlx::query(&query)
            .bind(match_id)
            .bind(user_id)
            .bind(status)
            .bind(notes)
            .bind(now)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(match_from_row).transpose()?)
    }

    /// Health check for the database connection
    async fn health_check(&self) -> Result<bool, StoreError> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| true)
            .map_err(Into::into)
    }
}

#[async_trait]
impl InterestStore for PostgresClient {
    async fn find_between(
        &self,
        sender_id: &str,
        receiver_id: &str,
    ) -> Result<Option<Interest>, StoreError> {
        let query = format!(
            "SELECT {INTEREST_COLUMNS} FROM interests WHERE sender_id = $1 AND receiver_id = $2"
        );

        let row = sqlx::query(&query)
            .bind(sender_id)
            .bind(receiver_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(interest_from_row).transpose()?)
    }

    async fn count_sent_since(
        &self,
        sender_id: &str,
        since: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM interest_sends WHERE sender_id = $1 AND sent_at >= $2",
        )
        .bind(sender_id)
        .bind(since)
        .fetch_one(&self.pool)
        .await?;

        Ok(count_from(total))
    }

    /// Single statement: the update branch only fires for declined, withdrawn
    /// or expired rows, so an active row yields no RETURNING row and no send
    /// is logged.
    async fn create_or_reset(
        &self,
        interest: &Interest,
        now: DateTime<Utc>,
    ) -> Result<Interest, StoreError> {
        let query = format!(
            r#"
            WITH stored AS (
                INSERT INTO interests (
                    id, sender_id, receiver_id, sender_profile_id, receiver_profile_id, status,
                    message, sent_at, expires_at, is_read, priority, created_at, updated_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, FALSE, $10, $11, $11)
                ON CONFLICT (sender_id, receiver_id) DO UPDATE SET
                    status = EXCLUDED.status,
                    message = EXCLUDED.message,
                    response_message = NULL,
                    sent_at = EXCLUDED.sent_at,
                    responded_at = NULL,
                    expires_at = EXCLUDED.expires_at,
                    is_read = FALSE,
                    read_at = NULL,
                    priority = EXCLUDED.priority,
                    sender_profile_id = EXCLUDED.sender_profile_id,
                    receiver_profile_id = EXCLUDED.receiver_profile_id,
                    updated_at = EXCLUDED.updated_at
                WHERE interests.status IN ('declined', 'withdrawn')
                   OR (interests.status = 'sent' AND interests.expires_at < $12)
                RETURNING {INTEREST_COLUMNS}
            ),
            logged AS (
                INSERT INTO interest_sends (sender_id, interest_id, sent_at)
                SELECT sender_id, id, sent_at FROM stored
            )
            SELECT {INTEREST_COLUMNS} FROM stored
            "#
        );

        let row = sqlx::query(&query)
            .bind(interest.id)
            .bind(&interest.sender_id)
            .bind(&interest.receiver_id)
            .bind(&interest.sender_profile_id)
            .bind(&interest.receiver_profile_id)
            .bind(InterestStatus::Sent)
            .bind(&interest.message)
            .bind(interest.sent_at)
            .bind(interest.expires_at)
            .bind(interest.priority)
            .bind(interest.created_at)
            .bind(now)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(interest_from_row(&row)?),
            None => Err(StoreError::Conflict(format!(
                "active interest {} -> {}",
                interest.sender_id, interest.receiver_id
            ))),
        }
    }

    async fn respond(
        &self,
        interest_id: Uuid,
        receiver_id: &str,
        status: InterestStatus,
        response_message: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Option<Interest>, StoreError> {
        let query = format!(
            r#"
            UPDATE interests
            SET status = $3,
                response_message = $4,
                responded_at = $5,
                updated_at = $5
            WHERE id = $1 AND receiver_id = $2 AND status = 'sent' AND expires_at >= $5
            RETURNING {INTEREST_COLUMNS}
            "#
        );

        let row = sqlx::query(&query)
            .bind(interest_id)
            .bind(receiver_id)
            .bind(status)
            .bind(response_message)
            .bind(now)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(interest_from_row).transpose()?)
    }

    async fn withdraw(
        &self,
        interest_id: Uuid,
        sender_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Interest>, StoreError> {
        let query = format!(
            r#"
            UPDATE interests
            SET status = 'withdrawn', updated_at = $3
            WHERE id = $1 AND sender_id = $2 AND status = 'sent' AND expires_at >= $3
            RETURNING {INTEREST_COLUMNS}
            "#
        );

        let row = sqlx::query(&query)
            .bind(interest_id)
            .bind(sender_id)
            .bind(now)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(interest_from_row).transpose()?)
    }

    async fn mark_read(
        &self,
        interest_id: Uuid,
        receiver_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Interest>, StoreError> {
        let query = format!(
            r#"
            UPDATE interests
            SET is_read = TRUE,
                read_at = COALESCE(read_at, $3),
                updated_at = CASE WHEN is_read THEN updated_at ELSE $3 END
            WHERE id = $1 AND receiver_id = $2
            RETURNING {INTEREST_COLUMNS}
            "#
        );

        let row = sqlx::query(&query)
            .bind(interest_id)
            .bind(receiver_id)
            .bind(now)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(interest_from_row).transpose()?)
    }

    async fn list(
        &self,
        filter: &InterestFilter,
        page: &PageRequest,
        now: DateTime<Utc>,
    ) -> Result<(Vec<Interest>, u64), StoreError> {
        let party_column = match filter.direction {
            InterestDirection::Sent => "sender_id",
            InterestDirection::Received => "receiver_id",
        };
        let condition = format!(
            "{party_column} = $1 \
             AND ($2::interest_status IS NULL OR status = $2) \
             AND NOT (status = 'sent' AND expires_at < $3)"
        );

        let total: i64 =
            sqlx::query_scalar(&format!("SELECT COUNT(*) FROM interests WHERE {condition}"))
                .bind(&filter.user_id)
                .bind(filter.status)
                .bind(now)
                .fetch_one(&self.pool)
                .await?;

        let query = format!(
            r#"
            SELECT {INTEREST_COLUMNS}
            FROM interests
            WHERE {condition}
            ORDER BY sent_at DESC, id
            LIMIT $4 OFFSET $5
            "#
        );

        let rows = sqlx::query(&query)
            .bind(&filter.user_id)
            .bind(filter.status)
            .bind(now)
            .bind(i64::from(page.limit))
            .bind(page.offset() as i64)
            .fetch_all(&self.pool)
            .await?;

        let interests = rows
            .iter()
            .map(interest_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        Ok((interests, count_from(total)))
    }

    async fn stats(&self, user_id: &str, now: DateTime<Utc>) -> Result<InterestStats, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT
                sender_id = $1 AS outgoing,
                CASE WHEN status = 'sent' AND expires_at < $2 THEN 'expired'
                     ELSE status::text END AS bucket,
                COUNT(*) AS total
            FROM interests
            WHERE sender_id = $1 OR receiver_id = $1
            GROUP BY 1, 2
            "#,
        )
        .bind(user_id)
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        let mut stats = InterestStats::default();
        for row in &rows {
            let outgoing: bool = row.try_get("outgoing").map_err(PostgresError::from)?;
            let bucket: String = row.try_get("bucket").map_err(PostgresError::from)?;
            let total: i64 = row.try_get("total").map_err(PostgresError::from)?;

            let counts = if outgoing { &mut stats.sent } else { &mut stats.received };
            counts.add_bucket(&bucket, count_from(total));
        }

        Ok(stats)
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let result =
            sqlx::query("DELETE FROM interests WHERE status = 'sent' AND expires_at < $1")
                .bind(now)
                .execute(&self.pool)
                .await?;

        sqlx::query("DELETE FROM interest_sends WHERE sent_at < $1")
            .bind(now - chrono::Duration::days(SEND_LOG_RETENTION_DAYS))
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
