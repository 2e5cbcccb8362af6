//! Scenario: history replay delivers each entry exactly once.
//!
//! # Invariants under test
//! - Entries are dispatched in `created_at` order across locks, inside one
//!   enter/exit bracket per handler and one start/complete per lock.
//! - Locks complete in the order they started.
//! - Unknown log types are not dispatched but are still marked processed.
//! - A processed entry is never dispatched again, however many passes run.
//! - Entries of a lock without a handler stay unprocessed.

use std::sync::Arc;

use lks_db::Repository;
use lks_schemas::LogType;
use lks_testkit::{log, Harness, LockBuilder, RecordingHandler};

#[tokio::test]
async fn brackets_and_order_across_locks() -> anyhow::Result<()> {
    let h = Harness::new();
    h.api.insert_keyholder_lock(LockBuilder::keyholder("l1").build())?;
    h.api.insert_keyholder_lock(LockBuilder::keyholder("l2").build())?;
    h.api.push_history(log("a1", "l1", LogType::LockFrozen, 2))?;
    h.api.push_history(log("a2", "l1", LogType::LockUnfrozen, 4))?;
    h.api.push_history(log("b1", "l2", LogType::TimerHidden, 1))?;
    h.api.push_history(log("b2", "l2", LogType::TimerRevealed, 3))?;

    let rec = Arc::new(RecordingHandler::new("rec"));
    h.processor.register_lock_handler("l1", &h.cred, rec.clone())?;
    h.processor.register_lock_handler("l2", &h.cred, rec.clone())?;

    h.refresh().await?;
    let pulled = h.processor.bulk_update_lock_history(&h.cred, None).await?;
    assert_eq!(pulled.locks_pulled, 2);
    assert_eq!(pulled.inserted, 4);

    let report = h.processor.process_lock_history(&h.cred).await?;
    assert_eq!(report.dispatched, 4);
    assert_eq!(report.instances_committed, 2);

    assert_eq!(
        rec.calls(),
        vec![
            "enter:2",
            "start:l2",
            "event:l2:b1:timer_hidden",
            "start:l1",
            "event:l1:a1:lock_frozen",
            "event:l2:b2:timer_revealed",
            "event:l1:a2:lock_unfrozen",
            "complete:l2",
            "complete:l1",
            "exit:2",
        ]
    );
    Ok(())
}

#[tokio::test]
async fn processed_entries_are_not_replayed() -> anyhow::Result<()> {
    let h = Harness::new();
    h.api.insert_keyholder_lock(LockBuilder::keyholder("l1").build())?;
    h.api.push_history(log("h1", "l1", LogType::LockFrozen, 1))?;
    let mut unknown = log("h2", "l1", LogType::Locked, 2);
    unknown.log_type = "combination_changed".to_string();
    h.api.push_history(unknown)?;

    let rec = Arc::new(RecordingHandler::new("rec"));
    h.processor.register_lock_handler("l1", &h.cred, rec.clone())?;

    h.refresh().await?;
    h.processor.bulk_update_lock_history(&h.cred, None).await?;
    let first = h.processor.process_lock_history(&h.cred).await?;
    assert_eq!(first.dispatched, 1);
    assert_eq!(first.ignored_types, 1);
    assert_eq!(rec.events(), vec!["l1:h1"]);
    assert!(!h.repo.has_unprocessed_history("l1", &h.cid()).await?);

    // a new entry arrives; only it is delivered
    h.api.push_history(log("h3", "l1", LogType::LockUnfrozen, 3))?;
    rec.clear();
    for _ in 0..2 {
        h.refresh().await?;
        h.processor.bulk_update_lock_history(&h.cred, None).await?;
        h.processor.process_lock_history(&h.cred).await?;
    }
    assert_eq!(rec.events(), vec!["l1:h3"]);
    Ok(())
}

#[tokio::test]
async fn unhandled_lock_history_stays_unprocessed() -> anyhow::Result<()> {
    let h = Harness::new();
    h.api.insert_keyholder_lock(LockBuilder::keyholder("l3").build())?;
    h.api.push_history(log("c1", "l3", LogType::LockFrozen, 1))?;

    h.refresh().await?;
    assert!(h.processor.update_lock_history("l3", &h.cred).await?);

    let report = h.processor.process_lock_history(&h.cred).await?;
    assert_eq!(report.dispatched, 0);
    assert_eq!(report.skipped_unhandled, 1);
    assert!(h.repo.has_unprocessed_history("l3", &h.cid()).await?);
    Ok(())
}
