use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::extensions::ExtensionParty;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockStatus {
    Locked,
    Unlocked,
    Deserted,
}

impl LockStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LockStatus::Locked => "locked",
            LockStatus::Unlocked => "unlocked",
            LockStatus::Deserted => "deserted",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockRole {
    Wearer,
    Keyholder,
}

/// Filter accepted by the "my locks" listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockListFilter {
    Active,
    Archived,
    All,
}

impl LockListFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            LockListFilter::Active => "active",
            LockListFilter::Archived => "archived",
            LockListFilter::All => "all",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockUser {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub is_suspended_or_disabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedLockRef {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// Remote lock state as returned by the listing and search endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lock {
    #[serde(rename = "_id")]
    pub id: String,
    pub status: LockStatus,
    pub role: LockRole,
    #[serde(default)]
    pub title: String,
    pub start_date: DateTime<Utc>,
    /// Absent while the timer is hidden from the caller.
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub max_limit_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_frozen: bool,
    #[serde(default)]
    pub frozen_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub display_remaining_time: bool,
    #[serde(default)]
    pub hide_time_logs: bool,
    #[serde(default)]
    pub trusted: bool,
    #[serde(default)]
    pub archived_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub keyholder_archived_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub unlocked_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub shared_lock: Option<SharedLockRef>,
    pub user: LockUser,
    #[serde(default)]
    pub keyholder: Option<LockUser>,
    #[serde(default)]
    pub extensions: Vec<ExtensionParty>,
}

impl Lock {
    pub fn is_locked(&self) -> bool {
        self.status == LockStatus::Locked
    }

    pub fn is_keyholder(&self) -> bool {
        self.role == LockRole::Keyholder
    }

    /// Shared-group id, only meaningful for keyholder-role locks.
    pub fn shared_lock_id(&self) -> Option<&str> {
        self.shared_lock.as_ref().map(|s| s.id.as_str())
    }

    pub fn extension(&self, slug: &str) -> Option<&ExtensionParty> {
        self.extensions.iter().find(|e| e.slug == slug)
    }
}
