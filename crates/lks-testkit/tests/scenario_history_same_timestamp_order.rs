//! Scenario: entries sharing a timestamp replay in remote order.
//!
//! # Invariants under test
//! - Two entries with equal `created_at` are dispatched in the order the
//!   remote recorded them, not the newest-first order history pages use.
//! - The order holds when the tied entries span several history pages and
//!   when a later pull appends entries tied with already stored ones.

use std::sync::Arc;

use lks_schemas::LogType;
use lks_sync::ProcessorOptions;
use lks_testkit::{log, Harness, LockBuilder, RecordingHandler};

async fn pull_and_replay(h: &Harness) -> anyhow::Result<()> {
    h.processor.bulk_update_lock_history(&h.cred, None).await?;
    h.processor.process_lock_history(&h.cred).await?;
    Ok(())
}

#[tokio::test]
async fn tied_entries_replay_oldest_first() -> anyhow::Result<()> {
    let h = Harness::new();
    h.api.insert_keyholder_lock(LockBuilder::keyholder("l1").build())?;
    h.api.push_history(log("first", "l1", LogType::LockFrozen, 1))?;
    h.api.push_history(log("second", "l1", LogType::LockUnfrozen, 1))?;

    let rec = Arc::new(RecordingHandler::new("rec"));
    h.processor.register_lock_handler("l1", &h.cred, rec.clone())?;
    h.refresh().await?;
    pull_and_replay(&h).await?;

    assert_eq!(rec.events(), vec!["l1:first", "l1:second"]);
    Ok(())
}

#[tokio::test]
async fn tied_entries_across_pages_and_pulls() -> anyhow::Result<()> {
    let h = Harness::with_options(ProcessorOptions {
        history_page_size: 2,
        ..ProcessorOptions::default()
    });
    h.api.insert_keyholder_lock(LockBuilder::keyholder("l1").build())?;
    for id in ["a", "b", "c"] {
        h.api.push_history(log(id, "l1", LogType::TimerHidden, 5))?;
    }

    let rec = Arc::new(RecordingHandler::new("rec"));
    h.processor.register_lock_handler("l1", &h.cred, rec.clone())?;
    h.refresh().await?;
    pull_and_replay(&h).await?;
    assert_eq!(rec.events(), vec!["l1:a", "l1:b", "l1:c"]);

    rec.clear();
    h.api.push_history(log("d", "l1", LogType::TimerRevealed, 5))?;
    h.api.push_history(log("e", "l1", LogType::TimerHidden, 5))?;
    pull_and_replay(&h).await?;
    assert_eq!(rec.events(), vec!["l1:d", "l1:e"]);
    Ok(())
}
