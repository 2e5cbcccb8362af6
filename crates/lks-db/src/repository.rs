use anyhow::Result;
use uuid::Uuid;

use crate::rows::{CredentialId, HistoryEntry, LockUpdate, Snapshot, UpdateType};

/// Durable storage for snapshots, history and pending updates.
///
/// Every record is partitioned by [`CredentialId`]. Implementations must make
/// each upsert atomic per key; the engine never wraps calls in a transaction.
#[async_trait::async_trait]
pub trait Repository: Send + Sync {
    // -- Snapshots ----------------------------------------------------------

    async fn snapshot(&self, lock_id: &str, cred: &CredentialId) -> Result<Option<Snapshot>>;

    /// Active snapshots for a credential. With `shared_lock_ids`, only locks
    /// whose shared-group id is in the list are returned.
    async fn active_snapshots(
        &self,
        cred: &CredentialId,
        shared_lock_ids: Option<&[String]>,
    ) -> Result<Vec<Snapshot>>;

    async fn upsert_snapshot(&self, snapshot: &Snapshot) -> Result<()>;

    async fn mark_snapshot_inactive(&self, lock_id: &str, cred: &CredentialId) -> Result<()>;

    // -- History ------------------------------------------------------------

    /// Id of the newest stored entry for the lock, by creation time.
    async fn most_recent_history_id(
        &self,
        lock_id: &str,
        cred: &CredentialId,
    ) -> Result<Option<String>>;

    /// Unprocessed entries for a credential, oldest first.
    async fn unprocessed_history(&self, cred: &CredentialId) -> Result<Vec<HistoryEntry>>;

    async fn has_unprocessed_history(&self, lock_id: &str, cred: &CredentialId) -> Result<bool>;

    /// Inserts entries, ignoring ids already stored for the credential.
    /// Returns the number of new rows.
    async fn insert_history(&self, entries: &[HistoryEntry]) -> Result<usize>;

    async fn mark_history_processed(&self, id: &str, cred: &CredentialId) -> Result<()>;

    // -- Updates ------------------------------------------------------------

    /// Most recently created pending update of the given type.
    async fn update(
        &self,
        lock_id: &str,
        cred: &CredentialId,
        update_type: UpdateType,
    ) -> Result<Option<LockUpdate>>;

    /// Pending updates for a credential, oldest first.
    async fn pending_updates(&self, cred: &CredentialId) -> Result<Vec<LockUpdate>>;

    async fn insert_update(&self, update: &LockUpdate) -> Result<()>;

    /// Insert or overwrite by update id.
    async fn upsert_update(&self, update: &LockUpdate) -> Result<()>;

    async fn delete_update(&self, id: Uuid) -> Result<()>;

    async fn delete_updates_of_type(
        &self,
        lock_id: &str,
        cred: &CredentialId,
        update_type: UpdateType,
    ) -> Result<()>;

    async fn delete_all_updates(&self, lock_id: &str, cred: &CredentialId) -> Result<()>;

    // -- Share-link cache ---------------------------------------------------

    async fn share_link(&self, lock_id: &str) -> Result<Option<String>>;

    async fn upsert_share_link(&self, lock_id: &str, link: &str) -> Result<()>;

    async fn delete_share_link(&self, lock_id: &str) -> Result<()>;
}
