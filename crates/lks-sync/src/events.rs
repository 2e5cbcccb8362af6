//! Typed lock events decoded from stored history.
//!
//! A [`LogEntry`] keeps its discriminant as a raw string. [`LockEvent::decode`]
//! turns it into one variant per known log type, with the payload parsed. An
//! unknown discriminant or a payload that fails to parse yields `None` and the
//! entry is skipped by replay (it is still marked processed).

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use lks_schemas::{
    DiceRolledPayload, ExtensionChangePayload, LockRole, LogEntry, LogType, LogUser,
    MaxLimitDateIncreasedPayload, PilloryEndedPayload, PilloryStartedPayload, TaskPayload,
    TasksVoteEndedPayload, TimeChangedPayload, VerificationPicturePayload,
    WheelOfFortuneTurnedPayload,
};

use crate::extensions::WheelSegment;

/// Fields common to every log, handed to each callback next to the payload.
#[derive(Debug, Clone, PartialEq)]
pub struct LogMeta {
    pub id: String,
    pub lock_id: String,
    pub log_type: LogType,
    pub created_at: DateTime<Utc>,
    pub role: Option<LockRole>,
    pub extension: Option<String>,
    pub title: String,
    pub description: String,
    pub user: Option<LogUser>,
}

impl LogMeta {
    fn new(log: &LogEntry, log_type: LogType) -> Self {
        Self {
            id: log.id.clone(),
            lock_id: log.lock_id.clone(),
            log_type,
            created_at: log.created_at,
            role: log.role,
            extension: log.extension.clone(),
            title: log.title.clone(),
            description: log.description.clone(),
            user: log.user.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LockEvent {
    Locked,
    Unlocked,
    Deserted,
    KeyholderTrusted,
    SessionOfferAccepted,
    MaxLimitDateRemoved,
    MaxLimitDateIncreased(MaxLimitDateIncreasedPayload),
    LockFrozen,
    LockUnfrozen,
    TimerHidden,
    TimerRevealed,
    TimeLogsHidden,
    TimeLogsRevealed,
    ExtensionUpdated(ExtensionChangePayload),
    ExtensionEnabled(ExtensionChangePayload),
    ExtensionDisabled(ExtensionChangePayload),
    TimeChanged(TimeChangedPayload),
    LinkTimeChanged(TimeChangedPayload),
    DiceRolled(DiceRolledPayload),
    TaskAssigned(TaskPayload),
    TaskCompleted(TaskPayload),
    TaskFailed(TaskPayload),
    TasksVoteEnded(TasksVoteEndedPayload),
    TemporaryOpeningOpened,
    TemporaryOpeningLocked,
    TemporaryOpeningLockedLate,
    VerificationPictureSubmitted(VerificationPicturePayload),
    PilloryStarted(PilloryStartedPayload),
    PilloryEnded(PilloryEndedPayload),
    WheelOfFortuneTurned(WheelSegment),
    TimerGuessed,
}

impl LockEvent {
    pub fn decode(log: &LogEntry) -> Option<(LogMeta, LockEvent)> {
        let Some(kind) = log.kind() else {
            debug!(log_id = %log.id, log_type = %log.log_type, "history/unknown-type");
            return None;
        };
        let event = match kind {
            LogType::Locked => LockEvent::Locked,
            LogType::Unlocked => LockEvent::Unlocked,
            LogType::Deserted => LockEvent::Deserted,
            LogType::KeyholderTrusted => LockEvent::KeyholderTrusted,
            LogType::SessionOfferAccepted => LockEvent::SessionOfferAccepted,
            LogType::MaxLimitDateRemoved => LockEvent::MaxLimitDateRemoved,
            LogType::MaxLimitDateIncreased => LockEvent::MaxLimitDateIncreased(payload(log)?),
            LogType::LockFrozen => LockEvent::LockFrozen,
            LogType::LockUnfrozen => LockEvent::LockUnfrozen,
            LogType::TimerHidden => LockEvent::TimerHidden,
            LogType::TimerRevealed => LockEvent::TimerRevealed,
            LogType::TimeLogsHidden => LockEvent::TimeLogsHidden,
            LogType::TimeLogsRevealed => LockEvent::TimeLogsRevealed,
            LogType::ExtensionUpdated => LockEvent::ExtensionUpdated(payload(log)?),
            LogType::ExtensionEnabled => LockEvent::ExtensionEnabled(payload(log)?),
            LogType::ExtensionDisabled => LockEvent::ExtensionDisabled(payload(log)?),
            LogType::TimeChanged => LockEvent::TimeChanged(payload(log)?),
            LogType::LinkTimeChanged => LockEvent::LinkTimeChanged(payload(log)?),
            LogType::DiceRolled => LockEvent::DiceRolled(payload(log)?),
            LogType::TaskAssigned => LockEvent::TaskAssigned(payload(log)?),
            LogType::TaskCompleted => LockEvent::TaskCompleted(payload(log)?),
            LogType::TaskFailed => LockEvent::TaskFailed(payload(log)?),
            LogType::TasksVoteEnded => LockEvent::TasksVoteEnded(payload(log)?),
            LogType::TemporaryOpeningOpened => LockEvent::TemporaryOpeningOpened,
            LogType::TemporaryOpeningLocked => LockEvent::TemporaryOpeningLocked,
            LogType::TemporaryOpeningLockedLate => LockEvent::TemporaryOpeningLockedLate,
            LogType::VerificationPictureSubmitted => {
                LockEvent::VerificationPictureSubmitted(payload(log)?)
            }
            LogType::PilloryStarted => LockEvent::PilloryStarted(payload(log)?),
            LogType::PilloryEnded => LockEvent::PilloryEnded(payload(log)?),
            LogType::WheelOfFortuneTurned => {
                let turned: WheelOfFortuneTurnedPayload = payload(log)?;
                match WheelSegment::from_model(&turned.segment) {
                    Some(segment) => LockEvent::WheelOfFortuneTurned(segment),
                    None => {
                        debug!(log_id = %log.id, "history/unknown-segment");
                        return None;
                    }
                }
            }
            LogType::TimerGuessed => LockEvent::TimerGuessed,
        };
        Some((LogMeta::new(log, kind), event))
    }
}

fn payload<T: DeserializeOwned>(log: &LogEntry) -> Option<T> {
    match log.payload_as() {
        Ok(v) => Some(v),
        Err(err) => {
            warn!(
                log_id = %log.id,
                lock_id = %log.lock_id,
                log_type = %log.log_type,
                error = %err,
                "history/bad-payload"
            );
            None
        }
    }
}
