//! Handler callback surface and event dispatch.
//!
//! A handler reacts to lifecycle brackets and to one callback per event
//! type. Every method has a no-op default, so an implementation only writes
//! the callbacks it cares about. Callbacks receive the lock's working copy
//! and may mutate it; the engine commits the copy once the lock's batch is
//! drained. Returning `Err` aborts the replay pass.

use anyhow::Result;

use lks_db::CredentialId;
use lks_schemas::{
    DiceRolledPayload, ExtensionChangePayload, Lock, MaxLimitDateIncreasedPayload,
    PilloryEndedPayload, PilloryStartedPayload, TaskPayload, TasksVoteEndedPayload,
    TimeChangedPayload, VerificationPicturePayload,
};

use crate::events::{LockEvent, LogMeta};
use crate::extensions::WheelSegment;
use crate::instance::LockInstance;

/// Identity of a registered handler.
///
/// The same logical handler registered for several locks shares one key, so
/// it gets one enter/exit bracket per pass.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerKey {
    pub name: String,
    pub credential_id: CredentialId,
}

impl HandlerKey {
    pub fn new(name: impl Into<String>, credential_id: CredentialId) -> Self {
        Self {
            name: name.into(),
            credential_id,
        }
    }
}

impl std::fmt::Display for HandlerKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.name, self.credential_id)
    }
}

/// What a handler sees on enter/exit: its key and the locks it governs.
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerScope {
    pub key: HandlerKey,
    pub locks: Vec<Lock>,
}

#[async_trait::async_trait]
pub trait LockHandler: Send + Sync {
    /// Stable name; part of the handler's identity.
    fn name(&self) -> &str;

    // -- Lifecycle ----------------------------------------------------------

    async fn on_handler_enter(&self, _scope: &HandlerScope) -> Result<()> {
        Ok(())
    }

    async fn on_handler_exit(&self, _scope: &HandlerScope) -> Result<()> {
        Ok(())
    }

    async fn on_processing_started(&self, _instance: &mut LockInstance) -> Result<()> {
        Ok(())
    }

    async fn on_processing_completed(&self, _instance: &mut LockInstance) -> Result<()> {
        Ok(())
    }

    /// Periodic hook outside replay, with every lock the handler governs.
    async fn on_handler_update(&self, _instances: &mut [LockInstance]) -> Result<()> {
        Ok(())
    }

    // -- Lock events --------------------------------------------------------

    /// Runs for every event ahead of its typed callback.
    async fn on_event(
        &self,
        _instance: &mut LockInstance,
        _meta: &LogMeta,
        _event: &LockEvent,
    ) -> Result<()> {
        Ok(())
    }

    async fn on_locked(&self, _instance: &mut LockInstance, _meta: &LogMeta) -> Result<()> {
        Ok(())
    }

    async fn on_unlocked(&self, _instance: &mut LockInstance, _meta: &LogMeta) -> Result<()> {
        Ok(())
    }

    async fn on_deserted(&self, _instance: &mut LockInstance, _meta: &LogMeta) -> Result<()> {
        Ok(())
    }

    async fn on_keyholder_trusted(
        &self,
        _instance: &mut LockInstance,
        _meta: &LogMeta,
    ) -> Result<()> {
        Ok(())
    }

    async fn on_session_offer_accepted(
        &self,
        _instance: &mut LockInstance,
        _meta: &LogMeta,
    ) -> Result<()> {
        Ok(())
    }

    async fn on_max_limit_date_removed(
        &self,
        _instance: &mut LockInstance,
        _meta: &LogMeta,
    ) -> Result<()> {
        Ok(())
    }

    async fn on_max_limit_date_increased(
        &self,
        _instance: &mut LockInstance,
        _meta: &LogMeta,
        _payload: &MaxLimitDateIncreasedPayload,
    ) -> Result<()> {
        Ok(())
    }

    async fn on_lock_frozen(&self, _instance: &mut LockInstance, _meta: &LogMeta) -> Result<()> {
        Ok(())
    }

    async fn on_lock_unfrozen(&self, _instance: &mut LockInstance, _meta: &LogMeta) -> Result<()> {
        Ok(())
    }

    async fn on_timer_hidden(&self, _instance: &mut LockInstance, _meta: &LogMeta) -> Result<()> {
        Ok(())
    }

    async fn on_timer_revealed(&self, _instance: &mut LockInstance, _meta: &LogMeta) -> Result<()> {
        Ok(())
    }

    async fn on_time_logs_hidden(
        &self,
        _instance: &mut LockInstance,
        _meta: &LogMeta,
    ) -> Result<()> {
        Ok(())
    }

    async fn on_time_logs_revealed(
        &self,
        _instance: &mut LockInstance,
        _meta: &LogMeta,
    ) -> Result<()> {
        Ok(())
    }

    // -- Extension events ---------------------------------------------------

    async fn on_extension_updated(
        &self,
        _instance: &mut LockInstance,
        _meta: &LogMeta,
        _payload: &ExtensionChangePayload,
    ) -> Result<()> {
        Ok(())
    }

    async fn on_extension_enabled(
        &self,
        _instance: &mut LockInstance,
        _meta: &LogMeta,
        _payload: &ExtensionChangePayload,
    ) -> Result<()> {
        Ok(())
    }

    async fn on_extension_disabled(
        &self,
        _instance: &mut LockInstance,
        _meta: &LogMeta,
        _payload: &ExtensionChangePayload,
    ) -> Result<()> {
        Ok(())
    }

    async fn on_time_changed(
        &self,
        _instance: &mut LockInstance,
        _meta: &LogMeta,
        _payload: &TimeChangedPayload,
    ) -> Result<()> {
        Ok(())
    }

    async fn on_link_time_changed(
        &self,
        _instance: &mut LockInstance,
        _meta: &LogMeta,
        _payload: &TimeChangedPayload,
    ) -> Result<()> {
        Ok(())
    }

    async fn on_dice_rolled(
        &self,
        _instance: &mut LockInstance,
        _meta: &LogMeta,
        _payload: &DiceRolledPayload,
    ) -> Result<()> {
        Ok(())
    }

    async fn on_task_assigned(
        &self,
        _instance: &mut LockInstance,
        _meta: &LogMeta,
        _payload: &TaskPayload,
    ) -> Result<()> {
        Ok(())
    }

    async fn on_task_completed(
        &self,
        _instance: &mut LockInstance,
        _meta: &LogMeta,
        _payload: &TaskPayload,
    ) -> Result<()> {
        Ok(())
    }

    async fn on_task_failed(
        &self,
        _instance: &mut LockInstance,
        _meta: &LogMeta,
        _payload: &TaskPayload,
    ) -> Result<()> {
        Ok(())
    }

    async fn on_tasks_vote_ended(
        &self,
        _instance: &mut LockInstance,
        _meta: &LogMeta,
        _payload: &TasksVoteEndedPayload,
    ) -> Result<()> {
        Ok(())
    }

    async fn on_temporary_opening_opened(
        &self,
        _instance: &mut LockInstance,
        _meta: &LogMeta,
    ) -> Result<()> {
        Ok(())
    }

    async fn on_temporary_opening_locked(
        &self,
        _instance: &mut LockInstance,
        _meta: &LogMeta,
    ) -> Result<()> {
        Ok(())
    }

    async fn on_temporary_opening_locked_late(
        &self,
        _instance: &mut LockInstance,
        _meta: &LogMeta,
    ) -> Result<()> {
        Ok(())
    }

    async fn on_verification_picture_submitted(
        &self,
        _instance: &mut LockInstance,
        _meta: &LogMeta,
        _payload: &VerificationPicturePayload,
    ) -> Result<()> {
        Ok(())
    }

    async fn on_pillory_started(
        &self,
        _instance: &mut LockInstance,
        _meta: &LogMeta,
        _payload: &PilloryStartedPayload,
    ) -> Result<()> {
        Ok(())
    }

    async fn on_pillory_ended(
        &self,
        _instance: &mut LockInstance,
        _meta: &LogMeta,
        _payload: &PilloryEndedPayload,
    ) -> Result<()> {
        Ok(())
    }

    async fn on_wheel_of_fortune_turned(
        &self,
        _instance: &mut LockInstance,
        _meta: &LogMeta,
        _segment: &WheelSegment,
    ) -> Result<()> {
        Ok(())
    }

    async fn on_timer_guessed(&self, _instance: &mut LockInstance, _meta: &LogMeta) -> Result<()> {
        Ok(())
    }
}

/// Route one event to `on_event`, then to its typed callback.
pub async fn dispatch(
    handler: &dyn LockHandler,
    instance: &mut LockInstance,
    meta: &LogMeta,
    event: &LockEvent,
) -> Result<()> {
    handler.on_event(instance, meta, event).await?;
    let i = instance;
    match event {
        LockEvent::Locked => handler.on_locked(i, meta).await,
        LockEvent::Unlocked => handler.on_unlocked(i, meta).await,
        LockEvent::Deserted => handler.on_deserted(i, meta).await,
        LockEvent::KeyholderTrusted => handler.on_keyholder_trusted(i, meta).await,
        LockEvent::SessionOfferAccepted => handler.on_session_offer_accepted(i, meta).await,
        LockEvent::MaxLimitDateRemoved => handler.on_max_limit_date_removed(i, meta).await,
        LockEvent::MaxLimitDateIncreased(p) => {
            handler.on_max_limit_date_increased(i, meta, p).await
        }
        LockEvent::LockFrozen => handler.on_lock_frozen(i, meta).await,
        LockEvent::LockUnfrozen => handler.on_lock_unfrozen(i, meta).await,
        LockEvent::TimerHidden => handler.on_timer_hidden(i, meta).await,
        LockEvent::TimerRevealed => handler.on_timer_revealed(i, meta).await,
        LockEvent::TimeLogsHidden => handler.on_time_logs_hidden(i, meta).await,
        LockEvent::TimeLogsRevealed => handler.on_time_logs_revealed(i, meta).await,
        LockEvent::ExtensionUpdated(p) => handler.on_extension_updated(i, meta, p).await,
        LockEvent::ExtensionEnabled(p) => handler.on_extension_enabled(i, meta, p).await,
        LockEvent::ExtensionDisabled(p) => handler.on_extension_disabled(i, meta, p).await,
        LockEvent::TimeChanged(p) => handler.on_time_changed(i, meta, p).await,
        LockEvent::LinkTimeChanged(p) => handler.on_link_time_changed(i, meta, p).await,
        LockEvent::DiceRolled(p) => handler.on_dice_rolled(i, meta, p).await,
        LockEvent::TaskAssigned(p) => handler.on_task_assigned(i, meta, p).await,
        LockEvent::TaskCompleted(p) => handler.on_task_completed(i, meta, p).await,
        LockEvent::TaskFailed(p) => handler.on_task_failed(i, meta, p).await,
        LockEvent::TasksVoteEnded(p) => handler.on_tasks_vote_ended(i, meta, p).await,
        LockEvent::TemporaryOpeningOpened => handler.on_temporary_opening_opened(i, meta).await,
        LockEvent::TemporaryOpeningLocked => handler.on_temporary_opening_locked(i, meta).await,
        LockEvent::TemporaryOpeningLockedLate => {
            handler.on_temporary_opening_locked_late(i, meta).await
        }
        LockEvent::VerificationPictureSubmitted(p) => {
            handler.on_verification_picture_submitted(i, meta, p).await
        }
        LockEvent::PilloryStarted(p) => handler.on_pillory_started(i, meta, p).await,
        LockEvent::PilloryEnded(p) => handler.on_pillory_ended(i, meta, p).await,
        LockEvent::WheelOfFortuneTurned(s) => handler.on_wheel_of_fortune_turned(i, meta, s).await,
        LockEvent::TimerGuessed => handler.on_timer_guessed(i, meta).await,
    }
}
