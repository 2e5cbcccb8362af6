//! One full reconciliation pass for a credential.

use anyhow::Result;
use tracing::info;
use uuid::Uuid;

use lks_rpc::Credential;

use crate::processor::Processor;
use crate::report::PassReport;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassOptions {
    /// Mark snapshots the refresh did not see as inactive.
    pub sweep_stale_snapshots: bool,
    /// Restrict the history pull to these shared groups.
    pub shared_lock_ids: Option<Vec<String>>,
}

impl Default for PassOptions {
    fn default() -> Self {
        Self {
            sweep_stale_snapshots: true,
            shared_lock_ids: None,
        }
    }
}

impl Processor {
    /// Refresh, sweep, pull, replay, flush. Each phase completes before the
    /// next starts; the first error aborts the pass.
    pub async fn run_pass(&self, cred: &Credential, opts: &PassOptions) -> Result<PassReport> {
        let token = Uuid::new_v4();
        let mut report = PassReport {
            update_token: token,
            ..PassReport::default()
        };

        let mine = self.bulk_update_lock_snapshots(cred, Some(token)).await?;
        report.add_refresh(mine);
        let held = self.bulk_update_keyholder_snapshots(cred, Some(token)).await?;
        report.add_refresh(held);

        if opts.sweep_stale_snapshots {
            report.deactivated = self
                .deactivate_snapshots_without_update_token(cred, token)
                .await?;
        }

        report.history = self
            .bulk_update_lock_history(cred, opts.shared_lock_ids.as_deref())
            .await?;
        report.replay = self.process_lock_history(cred).await?;
        report.flush = self.process_lock_updates(cred).await?;

        info!(
            credential_id = %self.credential_id(cred),
            update_token = %token,
            upserted = report.snapshots.upserted,
            deactivated = report.deactivated,
            inserted = report.history.inserted,
            dispatched = report.replay.dispatched,
            applied = report.flush.applied,
            "pass/done"
        );
        Ok(report)
    }
}
