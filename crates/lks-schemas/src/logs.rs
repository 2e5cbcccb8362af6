//! Lock history log records and the typed payload bodies carried by the
//! log types that have one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::extensions::{ExtensionMode, TaskAction, WheelSegmentModel};
use crate::lock::LockRole;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogUser {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub username: String,
}

/// One remote history record. The discriminant is kept as a raw string so
/// unknown types survive storage and are ignored at replay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "lock")]
    pub lock_id: String,
    #[serde(rename = "type")]
    pub log_type: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub role: Option<LockRole>,
    #[serde(default)]
    pub extension: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub user: Option<LogUser>,
    #[serde(default)]
    pub payload: Value,
}

impl LogEntry {
    pub fn kind(&self) -> Option<LogType> {
        LogType::parse(&self.log_type)
    }

    pub fn payload_as<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.payload.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogType {
    Locked,
    Unlocked,
    Deserted,
    KeyholderTrusted,
    SessionOfferAccepted,
    MaxLimitDateRemoved,
    MaxLimitDateIncreased,
    LockFrozen,
    LockUnfrozen,
    TimerHidden,
    TimerRevealed,
    TimeLogsHidden,
    TimeLogsRevealed,
    ExtensionUpdated,
    ExtensionEnabled,
    ExtensionDisabled,
    TimeChanged,
    LinkTimeChanged,
    DiceRolled,
    TaskAssigned,
    TaskCompleted,
    TaskFailed,
    TasksVoteEnded,
    TemporaryOpeningOpened,
    TemporaryOpeningLocked,
    TemporaryOpeningLockedLate,
    VerificationPictureSubmitted,
    PilloryStarted,
    PilloryEnded,
    WheelOfFortuneTurned,
    TimerGuessed,
}

impl LogType {
    pub const ALL: [LogType; 31] = [
        LogType::Locked,
        LogType::Unlocked,
        LogType::Deserted,
        LogType::KeyholderTrusted,
        LogType::SessionOfferAccepted,
        LogType::MaxLimitDateRemoved,
        LogType::MaxLimitDateIncreased,
        LogType::LockFrozen,
        LogType::LockUnfrozen,
        LogType::TimerHidden,
        LogType::TimerRevealed,
        LogType::TimeLogsHidden,
        LogType::TimeLogsRevealed,
        LogType::ExtensionUpdated,
        LogType::ExtensionEnabled,
        LogType::ExtensionDisabled,
        LogType::TimeChanged,
        LogType::LinkTimeChanged,
        LogType::DiceRolled,
        LogType::TaskAssigned,
        LogType::TaskCompleted,
        LogType::TaskFailed,
        LogType::TasksVoteEnded,
        LogType::TemporaryOpeningOpened,
        LogType::TemporaryOpeningLocked,
        LogType::TemporaryOpeningLockedLate,
        LogType::VerificationPictureSubmitted,
        LogType::PilloryStarted,
        LogType::PilloryEnded,
        LogType::WheelOfFortuneTurned,
        LogType::TimerGuessed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LogType::Locked => "locked",
            LogType::Unlocked => "unlocked",
            LogType::Deserted => "deserted",
            LogType::KeyholderTrusted => "keyholder_trusted",
            LogType::SessionOfferAccepted => "session_offer_accepted",
            LogType::MaxLimitDateRemoved => "max_limit_date_removed",
            LogType::MaxLimitDateIncreased => "max_limit_date_increased",
            LogType::LockFrozen => "lock_frozen",
            LogType::LockUnfrozen => "lock_unfrozen",
            LogType::TimerHidden => "timer_hidden",
            LogType::TimerRevealed => "timer_revealed",
            LogType::TimeLogsHidden => "time_logs_hidden",
            LogType::TimeLogsRevealed => "time_logs_revealed",
            LogType::ExtensionUpdated => "extension_updated",
            LogType::ExtensionEnabled => "extension_enabled",
            LogType::ExtensionDisabled => "extension_disabled",
            LogType::TimeChanged => "time_changed",
            LogType::LinkTimeChanged => "link_time_changed",
            LogType::DiceRolled => "dice_rolled",
            LogType::TaskAssigned => "tasks_task_assigned",
            LogType::TaskCompleted => "tasks_task_completed",
            LogType::TaskFailed => "tasks_task_failed",
            LogType::TasksVoteEnded => "tasks_vote_ended",
            LogType::TemporaryOpeningOpened => "temporary_opening_opened",
            LogType::TemporaryOpeningLocked => "temporary_opening_locked",
            LogType::TemporaryOpeningLockedLate => "temporary_opening_locked_late",
            LogType::VerificationPictureSubmitted => "verification_picture_submitted",
            LogType::PilloryStarted => "pillory_in",
            LogType::PilloryEnded => "pillory_out",
            LogType::WheelOfFortuneTurned => "wheel_of_fortune_turned",
            LogType::TimerGuessed => "timer_guessed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == s)
    }
}

// ---------------------------------------------------------------------------
// Payload bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaxLimitDateIncreasedPayload {
    #[serde(default)]
    pub previous_max_limit_date: Option<DateTime<Utc>>,
    pub new_max_limit_date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionChangeRef {
    pub slug: String,
    #[serde(default)]
    pub mode: Option<ExtensionMode>,
    #[serde(default)]
    pub regularity: Option<i64>,
    #[serde(default)]
    pub config: Value,
}

/// Body of extension_updated / extension_enabled / extension_disabled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionChangePayload {
    pub extension: ExtensionChangeRef,
}

/// Signed seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeChangedPayload {
    pub duration: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiceRolledPayload {
    pub admin_dice: i32,
    pub player_dice: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPayload {
    pub task: TaskAction,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TasksVoteEndedPayload {
    #[serde(default)]
    pub task: Option<TaskAction>,
    #[serde(default)]
    pub nb_votes: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationPicturePayload {
    pub verification_code: String,
    #[serde(default)]
    pub image_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PilloryStartedPayload {
    pub duration: i64,
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PilloryEndedPayload {
    #[serde(default)]
    pub time_added: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WheelOfFortuneTurnedPayload {
    pub segment: WheelSegmentModel,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_log_type_round_trips_through_its_discriminant() {
        for t in LogType::ALL {
            assert_eq!(LogType::parse(t.as_str()), Some(t));
        }
        assert_eq!(LogType::parse("combination_changed"), None);
    }
}
