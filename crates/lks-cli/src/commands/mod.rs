//! Command handler modules for the `lks` binary.
//!
//! Shared wiring (config to engine) lives here; command-specific logic lives
//! in the submodules.

pub mod sync;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use lks_config::SyncSettings;
use lks_db::{MemoryRepository, PgRepository, Repository};
use lks_rpc::{HttpLockApi, LockApi, RetryPolicy};
use lks_sync::{PassOptions, ProcessorOptions};

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

pub fn retry_policy(settings: &SyncSettings) -> RetryPolicy {
    RetryPolicy {
        max_retries: settings.api.max_retries,
        timeout: Duration::from_secs(settings.api.timeout_secs),
        max_rate_limit_wait: Duration::from_secs(settings.api.max_rate_limit_wait_secs),
        ..RetryPolicy::default()
    }
}

pub fn build_api(settings: &SyncSettings) -> Result<Arc<dyn LockApi>> {
    let api =
        HttpLockApi::new_with_base_url(settings.api.base_url.clone(), retry_policy(settings))?;
    Ok(Arc::new(api))
}

/// Postgres unless `memory` is set. The pool comes from `LKS_DATABASE_URL`.
pub async fn build_repository(memory: bool) -> Result<Arc<dyn Repository>> {
    if memory {
        return Ok(Arc::new(MemoryRepository::new()));
    }
    let pool = lks_db::connect_from_env().await?;
    lks_db::migrate(&pool).await?;
    Ok(Arc::new(PgRepository::new(pool)))
}

pub fn processor_options(settings: &SyncSettings) -> ProcessorOptions {
    ProcessorOptions {
        keyholder_page_size: settings.sync.keyholder_page_size,
        history_page_size: settings.sync.history_page_size,
    }
}

pub fn pass_options(settings: &SyncSettings) -> PassOptions {
    PassOptions {
        sweep_stale_snapshots: settings.sync.sweep_stale_snapshots,
        ..PassOptions::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_policy_follows_api_section() {
        let mut settings = SyncSettings::default();
        settings.api.max_retries = 1;
        settings.api.timeout_secs = 9;

        let p = retry_policy(&settings);
        assert_eq!(p.max_retries, 1);
        assert_eq!(p.timeout, Duration::from_secs(9));
        assert_eq!(p.base_delay, RetryPolicy::default().base_delay);
    }

    #[test]
    fn options_follow_sync_section() {
        let mut settings = SyncSettings::default();
        settings.sync.history_page_size = 7;
        settings.sync.sweep_stale_snapshots = false;

        assert_eq!(processor_options(&settings).history_page_size, 7);
        assert!(!pass_options(&settings).sweep_stale_snapshots);
    }
}
