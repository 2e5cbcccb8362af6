//! Scenario: history pull stops at the newest known record.
//!
//! # Invariants under test
//! - The first pull pages backwards through the whole log.
//! - A later pull inserts every newer record and never the known one; it
//!   stops paging as soon as the known record shows up.
//! - A failed page inserts nothing and reports `false`.
//! - A lock that is no longer Locked and has nothing left to replay is
//!   deactivated by the pull.

use std::sync::Arc;

use lks_db::Repository;
use lks_schemas::{LockStatus, LogType};
use lks_sync::ProcessorOptions;
use lks_testkit::{log, Harness, LockBuilder, RecordingHandler};

fn small_pages() -> Harness {
    Harness::with_options(ProcessorOptions {
        keyholder_page_size: 50,
        history_page_size: 2,
    })
}

#[tokio::test]
async fn known_record_is_the_boundary() -> anyhow::Result<()> {
    let h = small_pages();
    h.api.insert_keyholder_lock(LockBuilder::keyholder("l1").build())?;
    for i in 1..=5 {
        h.api.push_history(log(&format!("h{i}"), "l1", LogType::LockFrozen, i))?;
    }
    h.refresh().await?;

    assert!(h.processor.update_lock_history("l1", &h.cred).await?);
    assert_eq!(h.repo.all_history()?.len(), 5);
    assert_eq!(h.api.calls_for("lock_history")?.len(), 3);

    h.api.clear_calls()?;
    h.api.push_history(log("h6", "l1", LogType::LockUnfrozen, 6))?;
    h.api.push_history(log("h7", "l1", LogType::LockFrozen, 7))?;
    h.api.push_history(log("h8", "l1", LogType::LockUnfrozen, 8))?;

    let report = h.processor.bulk_update_lock_history(&h.cred, None).await?;
    // no handler: nothing pulled in bulk
    assert_eq!(report.locks_pulled, 0);

    h.processor
        .register_lock_handler("l1", &h.cred, Arc::new(RecordingHandler::new("rec")))?;
    let report = h.processor.bulk_update_lock_history(&h.cred, None).await?;
    assert_eq!(report.locks_pulled, 1);
    assert_eq!(report.inserted, 3);

    // pages [h8 h7] [h6 h5]; h5 is known, so paging stops there
    assert_eq!(h.api.calls_for("lock_history")?.len(), 2);
    let ids: Vec<String> = h.repo.all_history()?.into_iter().map(|e| e.id).collect();
    assert_eq!(ids, vec!["h1", "h2", "h3", "h4", "h5", "h6", "h7", "h8"]);
    Ok(())
}

#[tokio::test]
async fn failed_page_inserts_nothing() -> anyhow::Result<()> {
    let h = small_pages();
    h.api.insert_keyholder_lock(LockBuilder::keyholder("l1").build())?;
    for i in 1..=3 {
        h.api.push_history(log(&format!("h{i}"), "l1", LogType::LockFrozen, i))?;
    }
    h.refresh().await?;

    h.api.fail_with_status("lock_history", "l1", 500)?;
    assert!(!h.processor.update_lock_history("l1", &h.cred).await?);
    assert!(h.repo.all_history()?.is_empty());

    h.api.clear_faults()?;
    assert!(h.processor.update_lock_history("l1", &h.cred).await?);
    assert_eq!(h.repo.all_history()?.len(), 3);
    Ok(())
}

#[tokio::test]
async fn unlocked_lock_without_pending_history_is_deactivated() -> anyhow::Result<()> {
    let h = small_pages();
    h.api.insert_lock(LockBuilder::wearer("l1").status(LockStatus::Unlocked).build())?;
    h.refresh().await?;
    let cid = h.cid();
    assert!(h.repo.snapshot("l1", &cid).await?.map(|s| s.is_active).unwrap_or(false));

    assert!(h.processor.update_lock_history("l1", &h.cred).await?);
    assert!(!h.repo.snapshot("l1", &cid).await?.map(|s| s.is_active).unwrap_or(true));
    Ok(())
}

#[tokio::test]
async fn unlocked_lock_with_pending_history_stays_active() -> anyhow::Result<()> {
    let h = small_pages();
    h.api.insert_lock(LockBuilder::wearer("l1").unlocked().build())?;
    h.api.push_history(log("h1", "l1", LogType::Unlocked, 1))?;
    h.refresh().await?;
    let cid = h.cid();

    assert!(h.processor.update_lock_history("l1", &h.cred).await?);
    assert!(h.repo.snapshot("l1", &cid).await?.map(|s| s.is_active).unwrap_or(false));
    Ok(())
}
