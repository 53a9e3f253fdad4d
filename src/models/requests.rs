use serde::{Deserialize, Serialize};
use validator::Validate;

/// Query for listing a user's matches
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ListMatchesQuery {
    #[serde(default = "default_page")]
    #[validate(range(min = 1))]
    pub page: u32,
    #[serde(default = "default_page_size")]
    #[validate(range(min = 1, max = 100))]
    pub limit: u32,
    #[serde(default, alias = "min_score", rename = "minScore")]
    #[validate(range(max = 100))]
    pub min_score: u8,
}

/// Request to (re)generate matches
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct GenerateMatchesRequest {
    #[serde(default)]
    #[validate(range(min = 1, max = 100))]
    pub limit: Option<u32>,
    #[serde(default, alias = "refresh_existing", rename = "refreshExisting")]
    pub refresh_existing: bool,
}

/// Request to change a match's status and notes
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpdateMatchRequest {
    #[validate(length(min = 1))]
    pub status: String,
    #[serde(default)]
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

/// Request to express interest in another user
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SendInterestRequest {
    #[validate(length(min = 1))]
    #[serde(alias = "receiver_id", rename = "receiverId")]
    pub receiver_id: String,
    #[serde(default)]
    #[validate(length(max = 500))]
    pub message: Option<String>,
}

/// Query for listing sent or received interests
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ListInterestsQuery {
    #[serde(default = "default_page")]
    #[validate(range(min = 1))]
    pub page: u32,
    #[serde(default = "default_page_size")]
    #[validate(range(min = 1, max = 100))]
    pub limit: u32,
    #[serde(default)]
    pub status: Option<String>,
}

/// Receiver's response to an interest
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RespondInterestRequest {
    #[validate(length(min = 1))]
    pub status: String,
    #[serde(default, alias = "response_message", rename = "responseMessage")]
    #[validate(length(max = 500))]
    pub response_message: Option<String>,
}

fn default_page() -> u32 {
    1
}

fn default_page_size() -> u32 {
    20
}
