//! Paper remote + in-memory repository + processor, wired together.

use std::sync::Arc;

use anyhow::Result;

use lks_db::{CredentialId, LockUpdate, MemoryRepository, Repository, UpdateType};
use lks_rpc::Credential;
use lks_rpc_paper::PaperLockApi;
use lks_sync::{Processor, ProcessorOptions};

pub struct Harness {
    pub api: Arc<PaperLockApi>,
    pub repo: Arc<MemoryRepository>,
    pub processor: Processor,
    pub cred: Credential,
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

impl Harness {
    pub fn new() -> Self {
        Self::with_options(ProcessorOptions::default())
    }

    pub fn with_options(options: ProcessorOptions) -> Self {
        let api = Arc::new(PaperLockApi::new());
        let repo = Arc::new(MemoryRepository::new());
        let processor = Processor::with_options(api.clone(), repo.clone(), options);
        Self {
            api,
            repo,
            processor,
            cred: Credential::new("paper-secret"),
        }
    }

    pub fn cid(&self) -> CredentialId {
        self.processor.credential_id(&self.cred)
    }

    /// Pending update records for the harness credential, oldest first.
    pub async fn pending(&self) -> Result<Vec<LockUpdate>> {
        let mut updates = self.repo.pending_updates(&self.cid()).await?;
        updates.sort_by_key(|u| u.created_at);
        Ok(updates)
    }

    pub async fn pending_of(
        &self,
        lock_id: &str,
        update_type: UpdateType,
    ) -> Result<Vec<LockUpdate>> {
        Ok(self
            .pending()
            .await?
            .into_iter()
            .filter(|u| u.lock_id == lock_id && u.update_type == update_type)
            .collect())
    }

    /// Refresh both snapshot families without a token.
    pub async fn refresh(&self) -> Result<()> {
        self.processor
            .bulk_update_lock_snapshots(&self.cred, None)
            .await?;
        self.processor
            .bulk_update_keyholder_snapshots(&self.cred, None)
            .await?;
        Ok(())
    }
}
