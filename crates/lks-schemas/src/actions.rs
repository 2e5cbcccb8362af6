use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::extensions::WheelSegmentModel;
use crate::lock::Lock;
use crate::logs::LogEntry;

// ---------------------------------------------------------------------------
// Paged reads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyholderSearchRequest {
    pub page: u32,
    pub limit: u32,
    pub status: String,
}

impl KeyholderSearchRequest {
    pub fn locked(page: u32, limit: u32) -> Self {
        Self {
            page,
            limit,
            status: "locked".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyholderLocksPage {
    pub locks: Vec<Lock>,
    /// Total number of pages for the search, not the number returned here.
    pub pages: u32,
    #[serde(default)]
    pub total: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryPageRequest {
    pub limit: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_id: Option<String>,
}

/// Newest-first slice of a lock's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryPage {
    pub results: Vec<LogEntry>,
    pub has_more: bool,
    #[serde(default)]
    pub count: u32,
}

// ---------------------------------------------------------------------------
// Extension action results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiceRollResult {
    pub admin_dice: i32,
    pub player_dice: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpinWheelResult {
    pub segment: WheelSegmentModel,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuessTimerResult {
    pub can_be_unlocked: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareLinkResult {
    pub link: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PilloryVoteInfo {
    pub vote_ends_at: DateTime<Utc>,
    #[serde(default)]
    pub nb_votes: i32,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub total_duration_added: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemporaryCombination {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub image_full_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationPictureEntry {
    pub verification_code: String,
    pub submitted_at: DateTime<Utc>,
    #[serde(default)]
    pub image_key: Option<String>,
}
