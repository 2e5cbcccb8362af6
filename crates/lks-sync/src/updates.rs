//! Update-type taxonomy and typed update payloads.
//!
//! Each [`UpdateType`] has a fixed policy: which statuses are permanent
//! rejections, whether it runs for ignored locks, which extension it needs,
//! and how a new write merges with a pending record. [`UpdateIntent`] is the
//! in-memory form a commit emits; the queue turns it into a stored record.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use lks_db::UpdateType;
use lks_schemas::{EditExtensionsRequest, ExtensionSlug, TaskAction};

const NEVER_PERMANENT: &[u16] = &[];
const PERMANENT_CLIENT: &[u16] = &[400, 401, 404];
const PERMANENT_BAD_REQUEST: &[u16] = &[400];

/// How a new write of a type merges with a pending record of the same type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coalesce {
    /// Keep the pending record, drop the new write.
    InsertIfAbsent,
    /// Overwrite the pending record's payload.
    Upsert,
    /// Add the signed durations; a zero sum removes the record.
    SumTime,
    /// Sum durations under a 24 h cap, else start a new record.
    Pillory,
    /// Delete every other pending update for the lock first.
    Supersede,
    /// Drop pending updates that depend on extensions no longer present.
    PruneDependants,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdatePolicy {
    pub permanent_statuses: &'static [u16],
    pub bypasses_ignored: bool,
    pub required_extension: Option<ExtensionSlug>,
    pub coalesce: Coalesce,
}

impl UpdatePolicy {
    pub fn is_permanent(&self, status: u16) -> bool {
        self.permanent_statuses.contains(&status)
    }
}

pub fn policy(update_type: UpdateType) -> UpdatePolicy {
    use Coalesce::*;
    let (permanent_statuses, bypasses_ignored, required_extension, coalesce) = match update_type {
        UpdateType::Archive => (NEVER_PERMANENT, true, None, InsertIfAbsent),
        UpdateType::Unlock => (NEVER_PERMANENT, true, None, Supersede),
        UpdateType::UpdateFreeze => (PERMANENT_CLIENT, false, None, Upsert),
        UpdateType::TrustKeyholder => (PERMANENT_CLIENT, false, None, InsertIfAbsent),
        UpdateType::UpdateMaxTimeLimit => (PERMANENT_CLIENT, false, None, Upsert),
        UpdateType::AddRemoveTime => (PERMANENT_CLIENT, false, None, SumTime),
        UpdateType::UpdateSettings => (PERMANENT_CLIENT, false, None, Upsert),
        UpdateType::UpdateExtensions => (PERMANENT_CLIENT, false, None, PruneDependants),
        UpdateType::UpdateTasks => (PERMANENT_BAD_REQUEST, false, Some(ExtensionSlug::Tasks), Upsert),
        UpdateType::ResolveTask => (PERMANENT_BAD_REQUEST, false, Some(ExtensionSlug::Tasks), Upsert),
        UpdateType::AssignTask => (PERMANENT_BAD_REQUEST, false, Some(ExtensionSlug::Tasks), Upsert),
        UpdateType::Pillory => (PERMANENT_BAD_REQUEST, false, Some(ExtensionSlug::Pillory), Pillory),
        UpdateType::SetTemporaryCombination => (
            PERMANENT_BAD_REQUEST,
            false,
            Some(ExtensionSlug::HygieneOpening),
            Upsert,
        ),
        UpdateType::TemporarilyUnlock => (
            PERMANENT_BAD_REQUEST,
            false,
            Some(ExtensionSlug::HygieneOpening),
            InsertIfAbsent,
        ),
        UpdateType::UploadVerificationPicture => (
            PERMANENT_CLIENT,
            false,
            Some(ExtensionSlug::VerificationPicture),
            Upsert,
        ),
        UpdateType::CreateVerificationRequest => (
            PERMANENT_BAD_REQUEST,
            false,
            Some(ExtensionSlug::VerificationPicture),
            InsertIfAbsent,
        ),
    };
    UpdatePolicy {
        permanent_statuses,
        bypasses_ignored,
        required_extension,
        coalesce,
    }
}

/// Pending update types that become meaningless once `slug` is disabled.
pub fn dependants_of(slug: ExtensionSlug) -> &'static [UpdateType] {
    match slug {
        ExtensionSlug::Tasks => &[
            UpdateType::UpdateTasks,
            UpdateType::ResolveTask,
            UpdateType::AssignTask,
        ],
        ExtensionSlug::Pillory => &[UpdateType::Pillory],
        ExtensionSlug::HygieneOpening => &[
            UpdateType::TemporarilyUnlock,
            UpdateType::SetTemporaryCombination,
        ],
        ExtensionSlug::VerificationPicture => &[
            UpdateType::UploadVerificationPicture,
            UpdateType::CreateVerificationRequest,
        ],
        _ => &[],
    }
}

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreezePayload {
    pub is_frozen: bool,
}

/// `None` removes the limit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaxTimeLimitPayload {
    pub new_max_limit_date: Option<DateTime<Utc>>,
}

/// Signed whole seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimePayload {
    pub duration: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsPayload {
    pub display_remaining_time: bool,
    pub hide_time_logs: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TasksPayload {
    pub tasks: Vec<TaskAction>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolveTaskPayload {
    pub is_completed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AssignTaskPayload {
    Random,
    /// Community vote lasting `duration` seconds.
    Vote { duration: i64 },
    Task { task: String, points: i32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PilloryPayload {
    pub reason: String,
    /// Seconds.
    pub duration: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombinationPayload {
    pub combination_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PicturePayload {
    pub data: Vec<u8>,
    pub content_type: Option<String>,
}

// ---------------------------------------------------------------------------
// Intents
// ---------------------------------------------------------------------------

/// One update a commit wants recorded.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateIntent {
    Archive,
    Unlock,
    Freeze(FreezePayload),
    TrustKeyholder,
    MaxTimeLimit(MaxTimeLimitPayload),
    AddRemoveTime(TimePayload),
    Settings(SettingsPayload),
    Extensions(EditExtensionsRequest),
    Tasks(TasksPayload),
    ResolveTask(ResolveTaskPayload),
    AssignTask(AssignTaskPayload),
    Pillory(PilloryPayload),
    SetTemporaryCombination(CombinationPayload),
    TemporarilyUnlock,
    UploadVerificationPicture(PicturePayload),
    CreateVerificationRequest,
}

impl UpdateIntent {
    pub fn update_type(&self) -> UpdateType {
        match self {
            UpdateIntent::Archive => UpdateType::Archive,
            UpdateIntent::Unlock => UpdateType::Unlock,
            UpdateIntent::Freeze(_) => UpdateType::UpdateFreeze,
            UpdateIntent::TrustKeyholder => UpdateType::TrustKeyholder,
            UpdateIntent::MaxTimeLimit(_) => UpdateType::UpdateMaxTimeLimit,
            UpdateIntent::AddRemoveTime(_) => UpdateType::AddRemoveTime,
            UpdateIntent::Settings(_) => UpdateType::UpdateSettings,
            UpdateIntent::Extensions(_) => UpdateType::UpdateExtensions,
            UpdateIntent::Tasks(_) => UpdateType::UpdateTasks,
            UpdateIntent::ResolveTask(_) => UpdateType::ResolveTask,
            UpdateIntent::AssignTask(_) => UpdateType::AssignTask,
            UpdateIntent::Pillory(_) => UpdateType::Pillory,
            UpdateIntent::SetTemporaryCombination(_) => UpdateType::SetTemporaryCombination,
            UpdateIntent::TemporarilyUnlock => UpdateType::TemporarilyUnlock,
            UpdateIntent::UploadVerificationPicture(_) => UpdateType::UploadVerificationPicture,
            UpdateIntent::CreateVerificationRequest => UpdateType::CreateVerificationRequest,
        }
    }

    /// Stored JSON body; `None` for payload-less types.
    pub fn payload(&self) -> Result<Option<Value>> {
        let v = match self {
            UpdateIntent::Archive
            | UpdateIntent::Unlock
            | UpdateIntent::TrustKeyholder
            | UpdateIntent::TemporarilyUnlock
            | UpdateIntent::CreateVerificationRequest => return Ok(None),
            UpdateIntent::Freeze(p) => serde_json::to_value(p)?,
            UpdateIntent::MaxTimeLimit(p) => serde_json::to_value(p)?,
            UpdateIntent::AddRemoveTime(p) => serde_json::to_value(p)?,
            UpdateIntent::Settings(p) => serde_json::to_value(p)?,
            UpdateIntent::Extensions(p) => serde_json::to_value(p)?,
            UpdateIntent::Tasks(p) => serde_json::to_value(p)?,
            UpdateIntent::ResolveTask(p) => serde_json::to_value(p)?,
            UpdateIntent::AssignTask(p) => serde_json::to_value(p)?,
            UpdateIntent::Pillory(p) => serde_json::to_value(p)?,
            UpdateIntent::SetTemporaryCombination(p) => serde_json::to_value(p)?,
            UpdateIntent::UploadVerificationPicture(p) => serde_json::to_value(p)?,
        };
        Ok(Some(v))
    }
}
