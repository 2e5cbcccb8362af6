//! `lks sync`: run reconciliation passes for every configured credential.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{debug, error, info};

use lks_rpc::Credential;
use lks_sync::{LockEvent, LockHandler, LockInstance, LogMeta, PassOptions, Processor};

pub struct SyncArgs {
    pub config_paths: Vec<String>,
    pub memory: bool,
    pub once: bool,
    pub log_events: bool,
}

/// Logs each replayed event and otherwise leaves the lock alone.
struct TracingHandler;

#[async_trait]
impl LockHandler for TracingHandler {
    fn name(&self) -> &str {
        "tracing"
    }

    async fn on_event(
        &self,
        instance: &mut LockInstance,
        meta: &LogMeta,
        event: &LockEvent,
    ) -> Result<()> {
        info!(
            lock_id = instance.lock_id(),
            log_id = %meta.id,
            log_type = meta.log_type.as_str(),
            created_at = %meta.created_at,
            event = ?event,
            "events/replayed"
        );
        Ok(())
    }
}

pub async fn run(args: SyncArgs) -> Result<()> {
    let path_refs: Vec<&str> = args.config_paths.iter().map(|s| s.as_str()).collect();
    let loaded = lks_config::load_layered_yaml(&path_refs)?;
    let settings = loaded.settings()?;

    let resolved = lks_config::resolve_credentials(&settings)?;
    if resolved.is_empty() {
        anyhow::bail!("no credentials configured; add at least one entry under `credentials`");
    }
    let creds: Vec<(String, Credential)> = resolved
        .into_iter()
        .map(|c| (c.name, Credential::new(c.secret)))
        .collect();

    let api = super::build_api(&settings)?;
    let repo = super::build_repository(args.memory).await?;
    let processor = Processor::with_options(api, repo, super::processor_options(&settings));
    let pass_opts = super::pass_options(&settings);
    let handler: Arc<dyn LockHandler> = Arc::new(TracingHandler);

    info!(
        config_hash = %loaded.config_hash,
        credentials = creds.len(),
        memory = args.memory,
        "sync/start"
    );

    loop {
        let mut failures = 0usize;
        for (name, cred) in &creds {
            let outcome = pass_once(
                &processor,
                cred,
                &pass_opts,
                args.log_events.then_some(&handler),
            )
            .await
            .with_context(|| format!("sync pass failed for credential {name}"));
            if let Err(err) = outcome {
                failures += 1;
                error!(credential = %name, error = ?err, "sync/pass-failed");
            }
        }

        if args.once {
            if failures > 0 {
                anyhow::bail!("{failures} credential pass(es) failed");
            }
            return Ok(());
        }
        tokio::time::sleep(Duration::from_secs(settings.sync.poll_interval_secs)).await;
    }
}

async fn pass_once(
    processor: &Processor,
    cred: &Credential,
    opts: &PassOptions,
    handler: Option<&Arc<dyn LockHandler>>,
) -> Result<()> {
    if let Some(handler) = handler {
        // Locks seen for the first time this pass are picked up on the next one.
        let registered = register_tracing(processor, cred, handler).await?;
        debug!(registered, "sync/handlers-registered");
    }

    let report = processor.run_pass(cred, opts).await?;
    println!("{}", serde_json::to_string(&report)?);
    Ok(())
}

/// Register `handler` for every active lock under the key the registry
/// resolves it by: the shared-group id for grouped keyholder locks, the lock
/// id otherwise. Returns the number of registrations.
async fn register_tracing(
    processor: &Processor,
    cred: &Credential,
    handler: &Arc<dyn LockHandler>,
) -> Result<usize> {
    let mut registered = 0usize;
    for instance in processor.all_instances(cred).await? {
        let lock = instance.lock();
        match lock.shared_lock_id() {
            Some(shared_id) if lock.is_keyholder() => {
                processor.register_shared_lock_handler(shared_id, cred, Arc::clone(handler))?
            }
            _ => processor.register_lock_handler(instance.lock_id(), cred, Arc::clone(handler))?,
        }
        registered += 1;
    }
    Ok(registered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lks_schemas::LogType;
    use lks_testkit::{log, Harness, LockBuilder, RecordingHandler};

    #[tokio::test]
    async fn shared_and_exclusive_locks_both_replay() -> anyhow::Result<()> {
        let h = Harness::new();
        h.api.insert_keyholder_lock(LockBuilder::keyholder("k1").shared("s1").build())?;
        h.api.insert_lock(LockBuilder::wearer("w1").build())?;
        h.refresh().await?;

        let rec = Arc::new(RecordingHandler::new("rec"));
        let handler: Arc<dyn LockHandler> = rec.clone();
        assert_eq!(register_tracing(&h.processor, &h.cred, &handler).await?, 2);

        h.api.push_history(log("a", "k1", LogType::LockFrozen, 1))?;
        h.api.push_history(log("b", "w1", LogType::LockFrozen, 2))?;
        h.processor.bulk_update_lock_history(&h.cred, None).await?;
        let report = h.processor.process_lock_history(&h.cred).await?;

        assert_eq!(report.dispatched, 2);
        assert_eq!(report.skipped_unhandled, 0);
        let mut events = rec.events();
        events.sort();
        assert_eq!(events, vec!["k1:a", "w1:b"]);
        Ok(())
    }
}
