//! Scenario: the share-link cache does not hold back an applied edit.
//!
//! # Invariants under test
//! - An extension edit without the share-link extension clears the cached
//!   link once the remote accepts it.
//! - When clearing the cache fails, the accepted edit still counts as
//!   applied and its record is deleted; it is never sent twice.

use std::sync::Arc;

use anyhow::{anyhow, Result};
use uuid::Uuid;

use lks_db::{
    CredentialId, HistoryEntry, LockUpdate, MemoryRepository, Repository, Snapshot, UpdateType,
};
use lks_rpc::Credential;
use lks_rpc_paper::PaperLockApi;
use lks_schemas::EditExtensionsRequest;
use lks_sync::Processor;
use lks_testkit::{Harness, LockBuilder};

/// Memory repository whose share-link deletes always fail.
struct StuckShareLinks {
    inner: MemoryRepository,
}

#[async_trait::async_trait]
impl Repository for StuckShareLinks {
    async fn snapshot(&self, lock_id: &str, cred: &CredentialId) -> Result<Option<Snapshot>> {
        self.inner.snapshot(lock_id, cred).await
    }

    async fn active_snapshots(
        &self,
        cred: &CredentialId,
        shared_lock_ids: Option<&[String]>,
    ) -> Result<Vec<Snapshot>> {
        self.inner.active_snapshots(cred, shared_lock_ids).await
    }

    async fn upsert_snapshot(&self, snapshot: &Snapshot) -> Result<()> {
        self.inner.upsert_snapshot(snapshot).await
    }

    async fn mark_snapshot_inactive(&self, lock_id: &str, cred: &CredentialId) -> Result<()> {
        self.inner.mark_snapshot_inactive(lock_id, cred).await
    }

    async fn most_recent_history_id(
        &self,
        lock_id: &str,
        cred: &CredentialId,
    ) -> Result<Option<String>> {
        self.inner.most_recent_history_id(lock_id, cred).await
    }

    async fn unprocessed_history(&self, cred: &CredentialId) -> Result<Vec<HistoryEntry>> {
        self.inner.unprocessed_history(cred).await
    }

    async fn has_unprocessed_history(&self, lock_id: &str, cred: &CredentialId) -> Result<bool> {
        self.inner.has_unprocessed_history(lock_id, cred).await
    }

    async fn insert_history(&self, entries: &[HistoryEntry]) -> Result<usize> {
        self.inner.insert_history(entries).await
    }

    async fn mark_history_processed(&self, id: &str, cred: &CredentialId) -> Result<()> {
        self.inner.mark_history_processed(id, cred).await
    }

    async fn update(
        &self,
        lock_id: &str,
        cred: &CredentialId,
        update_type: UpdateType,
    ) -> Result<Option<LockUpdate>> {
        self.inner.update(lock_id, cred, update_type).await
    }

    async fn pending_updates(&self, cred: &CredentialId) -> Result<Vec<LockUpdate>> {
        self.inner.pending_updates(cred).await
    }

    async fn insert_update(&self, update: &LockUpdate) -> Result<()> {
        self.inner.insert_update(update).await
    }

    async fn upsert_update(&self, update: &LockUpdate) -> Result<()> {
        self.inner.upsert_update(update).await
    }

    async fn delete_update(&self, id: Uuid) -> Result<()> {
        self.inner.delete_update(id).await
    }

    async fn delete_updates_of_type(
        &self,
        lock_id: &str,
        cred: &CredentialId,
        update_type: UpdateType,
    ) -> Result<()> {
        self.inner.delete_updates_of_type(lock_id, cred, update_type).await
    }

    async fn delete_all_updates(&self, lock_id: &str, cred: &CredentialId) -> Result<()> {
        self.inner.delete_all_updates(lock_id, cred).await
    }

    async fn share_link(&self, lock_id: &str) -> Result<Option<String>> {
        self.inner.share_link(lock_id).await
    }

    async fn upsert_share_link(&self, lock_id: &str, link: &str) -> Result<()> {
        self.inner.upsert_share_link(lock_id, link).await
    }

    async fn delete_share_link(&self, lock_id: &str) -> Result<()> {
        Err(anyhow!("share-link table unavailable for {lock_id}"))
    }
}

fn edit_without_share_link(lock_id: &str, cid: CredentialId) -> Result<LockUpdate> {
    let payload = serde_json::to_value(EditExtensionsRequest { extensions: vec![] })?;
    Ok(LockUpdate::new(lock_id, cid, UpdateType::UpdateExtensions, Some(payload)))
}

#[tokio::test]
async fn applied_edit_clears_cached_link() -> anyhow::Result<()> {
    let h = Harness::new();
    h.api.insert_keyholder_lock(LockBuilder::keyholder("l1").build())?;
    h.refresh().await?;
    h.repo.upsert_share_link("l1", "https://share.test/l1").await?;

    h.repo.insert_update(&edit_without_share_link("l1", h.cid())?).await?;
    let report = h.processor.process_lock_updates(&h.cred).await?;

    assert_eq!(report.applied, 1);
    assert!(h.repo.share_link("l1").await?.is_none());
    Ok(())
}

#[tokio::test]
async fn cache_failure_still_deletes_the_record() -> anyhow::Result<()> {
    let api = Arc::new(PaperLockApi::new());
    let repo = Arc::new(StuckShareLinks {
        inner: MemoryRepository::new(),
    });
    let processor = Processor::new(api.clone(), repo.clone());
    let cred = Credential::new("paper-secret");
    let cid = processor.credential_id(&cred);

    api.insert_keyholder_lock(LockBuilder::keyholder("l1").build())?;
    processor.bulk_update_keyholder_snapshots(&cred, None).await?;
    repo.insert_update(&edit_without_share_link("l1", cid.clone())?).await?;

    let report = processor.process_lock_updates(&cred).await?;
    assert_eq!(report.applied, 1);
    assert_eq!(report.failed, 0);
    assert!(repo.pending_updates(&cid).await?.is_empty());

    // a second flush has nothing left to send
    let report = processor.process_lock_updates(&cred).await?;
    assert_eq!(report.applied, 0);
    assert_eq!(api.calls_for("update_extensions")?.len(), 1);
    Ok(())
}
