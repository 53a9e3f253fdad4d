use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

use crate::error::StoreError;
use crate::models::{CandidateCriteria, Profile, UserAccount};
use crate::services::ports::{ProfileDirectory, UserDirectory};

/// Errors that can occur when interacting with Appwrite
#[derive(Debug, Error)]
pub enum AppwriteError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error: {0}")]
    ApiError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: invalid API key or token")]
    Unauthorized,

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

/// Appwrite API client
///
/// Reads the two directories this service depends on:
/// - Profiles, queried for candidates and looked up by owning user
/// - Users, looked up by document id for their subscription plan
pub struct AppwriteClient {
    base_url: String,
    api_key: String,
    project_id: String,
    database_id: String,
    client: Client,
    collections: AppwriteCollections,
}

/// Collection IDs in Appwrite
#[derive(Debug, Clone)]
pub struct AppwriteCollections {
    pub profiles: String,
    pub users: String,
}

impl AppwriteClient {
    /// Create a new Appwrite client
    pub fn new(
        base_url: String,
        api_key: String,
        project_id: String,
        database_id: String,
        collections: AppwriteCollections,
    ) -> Result<Self, AppwriteError> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;

        Ok(Self {
            base_url,
            api_key,
            project_id,
            database_id,
            client,
            collections,
        })
    }

    fn documents_url(&self, collection: &str) -> String {
        format!(
            "{}/databases/{}/collections/{}/documents",
            self.base_url.trim_end_matches('/'),
            self.database_id,
            collection
        )
    }

    /// List documents of a collection matching Appwrite query strings
    async fn list_documents<T: DeserializeOwned>(
        &self,
        collection: &str,
        queries: &[String],
    ) -> Result<Vec<T>, AppwriteError> {
        let query_string = queries
            .iter()
            .map(|q| format!("queries[]={}", urlencoding::encode(q)))
            .collect::<Vec<_>>()
            .join("&");
        let url = format!("{}?{}", self.documents_url(collection), query_string);

        tracing::debug!("Listing {} with {} queries", collection, queries.len());

        let response = self
            .client
            .get(&url)
            .header("X-Appwrite-Key", &self.api_key)
            .header("X-Appwrite-Project", &self.project_id)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(AppwriteError::Unauthorized);
        }
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read body".to_string());
            tracing::error!("Failed to list {}: {} - {}", collection, status, body);
            return Err(AppwriteError::ApiError(format!(
                "Failed to list {}: {}",
                collection, status
            )));
        }

        let json: Value = response.json().await?;

        let total = json.get("total").and_then(|t| t.as_u64()).unwrap_or(0);

        let documents = json
            .get("documents")
            .and_then(|d| d.as_array())
            .ok_or_else(|| AppwriteError::InvalidResponse("Missing documents array".into()))?;

        let parsed: Vec<T> = documents
            .iter()
            .filter_map(|doc| {
                let data = doc.get("data").unwrap_or(doc);
                match serde_json::from_value(data.clone()) {
                    Ok(item) => Some(item),
                    Err(e) => {
                        tracing::warn!("Skipping malformed document in {}: {}", collection, e);
                        None
                    }
                }
            })
            .collect();

        tracing::debug!("Parsed {} documents from {} (total: {})", parsed.len(), collection, total);

        Ok(parsed)
    }

    /// Fetch one document by id; a 404 is reported as `None`
    async fn get_document<T: DeserializeOwned>(
        &self,
        collection: &str,
        document_id: &str,
    ) -> Result<Option<T>, AppwriteError> {
        let url = format!(
            "{}/{}",
            self.documents_url(collection),
            urlencoding::encode(document_id)
        );

        let response = self
            .client
            .get(&url)
            .header("X-Appwrite-Key", &self.api_key)
            .header("X-Appwrite-Project", &self.project_id)
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => return Ok(None),
            StatusCode::UNAUTHORIZED => return Err(AppwriteError::Unauthorized),
            status if !status.is_success() => {
                return Err(AppwriteError::ApiError(format!(
                    "Failed to fetch {} document: {}",
                    collection, status
                )))
            }
            _ => {}
        }

        let json: Value = response.json().await?;
        let data = json.get("data").unwrap_or(&json);

        serde_json::from_value(data.clone())
            .map(Some)
            .map_err(|e| AppwriteError::InvalidResponse(format!("Failed to parse document: {}", e)))
    }
}

fn quoted(value: &str) -> String {
    Value::String(value.to_string()).to_string()
}

/// Appwrite query strings for a candidate search
///
/// Candidates come back most recently active first.
pub fn candidate_queries(criteria: &CandidateCriteria, limit: usize, skip: usize) -> Vec<String> {
    let mut queries = vec![
        format!("equal(\"gender\", [{}])", quoted(criteria.gender.as_str())),
        format!("notEqual(\"userId\", {})", quoted(&criteria.exclude_user_id)),
    ];

    if criteria.require_complete {
        queries.push("equal(\"isComplete\", true)".to_string());
    }
    if criteria.require_verified {
        queries.push("equal(\"isVerified\", true)".to_string());
    }

    // Birth-date window, inclusive on both ends
    if let Some(min) = criteria.min_birth_date {
        queries.push(format!(
            "greaterThanEqual(\"dateOfBirth\", {})",
            quoted(&min.format("%Y-%m-%d").to_string())
        ));
    }
    if let Some(max) = criteria.max_birth_date {
        queries.push(format!(
            "lessThanEqual(\"dateOfBirth\", {})",
            quoted(&max.format("%Y-%m-%d").to_string())
        ));
    }

    if !criteria.locations.is_empty() {
        let locations = criteria
            .locations
            .iter()
            .map(|l| quoted(l))
            .collect::<Vec<_>>()
            .join(", ");
        queries.push(format!("equal(\"jobLocation\", [{}])", locations));
    }

    queries.push("orderDesc(\"lastActive\")".to_string());
    queries.push(format!("limit({})", limit));
    queries.push(format!("offset({})", skip));

    queries
}

#[async_trait]
impl ProfileDirectory for AppwriteClient {
    async fn find_by_user_id(&self, user_id: &str) -> Result<Option<Profile>, StoreError> {
        tracing::debug!("Fetching profile for user: {}", user_id);

        let queries = vec![
            format!("equal(\"userId\", [{}])", quoted(user_id)),
            "limit(1)".to_string(),
        ];
        let mut profiles: Vec<Profile> =
            self.list_documents(&self.collections.profiles, &queries).await?;

        Ok(profiles.pop())
    }

    async fn query(
        &self,
        criteria: &CandidateCriteria,
        limit: usize,
        skip: usize,
    ) -> Result<Vec<Profile>, StoreError> {
        let queries = candidate_queries(criteria, limit, skip);
        let profiles: Vec<Profile> = self
            .list_documents(&self.collections.profiles, &queries)
            .await?;

        // The directory may ignore unknown attributes; never return the requester
        Ok(profiles
            .into_iter()
            .filter(|p| p.user_id != criteria.exclude_user_id)
            .collect())
    }
}

#[async_trait]
impl UserDirectory for AppwriteClient {
    async fn find_by_id(&self, user_id: &str) -> Result<Option<UserAccount>, StoreError> {
        Ok(self.get_document(&self.collections.users, user_id).await?)
    }
}
