//! Coalescing writer for pending update records.
//!
//! Every commit goes through [`UpdateQueue::apply`], which merges the intent
//! with whatever is already pending for `(lock, credential, type)` according
//! to the type's [`Coalesce`] rule. The queue never talks to the remote.

use anyhow::{Context, Result};
use tracing::debug;

use lks_db::{CredentialId, LockUpdate, Repository};
use lks_schemas::ExtensionSlug;

use crate::updates::{dependants_of, policy, Coalesce, PilloryPayload, TimePayload, UpdateIntent};

/// Upper bound for one pillory record, in seconds.
pub const PILLORY_WINDOW_SECS: i64 = 24 * 3600;

/// What `apply` did with an intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueOutcome {
    Inserted,
    Merged,
    /// A pending record already covers the intent.
    Duplicate,
    /// The merge cancelled the pending record out.
    Deleted,
    /// Nothing to record (e.g. a zero time delta with nothing pending).
    Noop,
}

pub struct UpdateQueue<'a> {
    repo: &'a dyn Repository,
}

impl<'a> UpdateQueue<'a> {
    pub fn new(repo: &'a dyn Repository) -> Self {
        Self { repo }
    }

    pub async fn apply(
        &self,
        lock_id: &str,
        cred: &CredentialId,
        intent: UpdateIntent,
    ) -> Result<QueueOutcome> {
        let update_type = intent.update_type();
        let existing = self
            .repo
            .update(lock_id, cred, update_type)
            .await
            .with_context(|| format!("load pending {update_type} failed"))?;

        let outcome = match policy(update_type).coalesce {
            Coalesce::Supersede => {
                if existing.is_some() {
                    QueueOutcome::Duplicate
                } else {
                    self.repo.delete_all_updates(lock_id, cred).await?;
                    self.insert(lock_id, cred, &intent).await?
                }
            }
            Coalesce::InsertIfAbsent => {
                if existing.is_some() {
                    QueueOutcome::Duplicate
                } else {
                    self.insert(lock_id, cred, &intent).await?
                }
            }
            Coalesce::Upsert => self.upsert(lock_id, cred, existing, &intent).await?,
            Coalesce::SumTime => match &intent {
                UpdateIntent::AddRemoveTime(TimePayload { duration }) => {
                    self.sum_time(lock_id, cred, existing, *duration).await?
                }
                other => self.upsert(lock_id, cred, existing, other).await?,
            },
            Coalesce::Pillory => match &intent {
                UpdateIntent::Pillory(new) => {
                    self.merge_pillory(lock_id, cred, existing, new).await?
                }
                other => self.upsert(lock_id, cred, existing, other).await?,
            },
            Coalesce::PruneDependants => {
                if let UpdateIntent::Extensions(req) = &intent {
                    for slug in [
                        ExtensionSlug::Tasks,
                        ExtensionSlug::Pillory,
                        ExtensionSlug::HygieneOpening,
                        ExtensionSlug::VerificationPicture,
                    ] {
                        if req.contains(slug) {
                            continue;
                        }
                        for t in dependants_of(slug) {
                            self.repo.delete_updates_of_type(lock_id, cred, *t).await?;
                        }
                    }
                    if !req.contains(ExtensionSlug::ShareLink) {
                        self.repo.delete_share_link(lock_id).await?;
                    }
                }
                self.upsert(lock_id, cred, existing, &intent).await?
            }
        };

        debug!(
            lock_id,
            credential_id = %cred,
            update_type = %update_type,
            outcome = ?outcome,
            "queue/apply"
        );
        Ok(outcome)
    }

    async fn insert(
        &self,
        lock_id: &str,
        cred: &CredentialId,
        intent: &UpdateIntent,
    ) -> Result<QueueOutcome> {
        let record = LockUpdate::new(lock_id, cred.clone(), intent.update_type(), intent.payload()?);
        self.repo.insert_update(&record).await?;
        Ok(QueueOutcome::Inserted)
    }

    async fn upsert(
        &self,
        lock_id: &str,
        cred: &CredentialId,
        existing: Option<LockUpdate>,
        intent: &UpdateIntent,
    ) -> Result<QueueOutcome> {
        match existing {
            Some(mut record) => {
                record.payload = intent.payload()?;
                self.repo.upsert_update(&record).await?;
                Ok(QueueOutcome::Merged)
            }
            None => self.insert(lock_id, cred, intent).await,
        }
    }

    async fn sum_time(
        &self,
        lock_id: &str,
        cred: &CredentialId,
        existing: Option<LockUpdate>,
        delta: i64,
    ) -> Result<QueueOutcome> {
        let Some(mut record) = existing else {
            if delta == 0 {
                return Ok(QueueOutcome::Noop);
            }
            let intent = UpdateIntent::AddRemoveTime(TimePayload { duration: delta });
            return self.insert(lock_id, cred, &intent).await;
        };

        let pending: TimePayload = record.payload_as()?;
        let sum = pending.duration + delta;
        if sum == 0 {
            self.repo.delete_update(record.id).await?;
            return Ok(QueueOutcome::Deleted);
        }
        record.payload = Some(serde_json::to_value(TimePayload { duration: sum })?);
        self.repo.upsert_update(&record).await?;
        Ok(QueueOutcome::Merged)
    }

    async fn merge_pillory(
        &self,
        lock_id: &str,
        cred: &CredentialId,
        existing: Option<LockUpdate>,
        new: &PilloryPayload,
    ) -> Result<QueueOutcome> {
        let intent = UpdateIntent::Pillory(new.clone());
        let Some(mut record) = existing else {
            return self.insert(lock_id, cred, &intent).await;
        };

        let pending: PilloryPayload = record.payload_as()?;
        let total = pending.duration + new.duration;
        if total > PILLORY_WINDOW_SECS {
            // the pending record is left as-is and a new window starts
            return self.insert(lock_id, cred, &intent).await;
        }
        record.payload = Some(serde_json::to_value(PilloryPayload {
            reason: new.reason.clone(),
            duration: total,
        })?);
        self.repo.upsert_update(&record).await?;
        Ok(QueueOutcome::Merged)
    }
}
