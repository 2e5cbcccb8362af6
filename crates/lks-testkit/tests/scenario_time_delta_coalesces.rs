//! Scenario: time deltas coalesce into one pending record.
//!
//! # Invariants under test
//! - Successive commits sum into a single AddRemoveTime record whose
//!   duration is the algebraic sum since the last flush.
//! - A sum of zero seconds deletes the pending record instead of keeping it.
//! - Sub-second remainders are truncated before they reach the queue.

use std::sync::Arc;

use chrono::Duration;

use lks_db::UpdateType;
use lks_sync::updates::TimePayload;
use lks_testkit::{Harness, LockBuilder, RecordingHandler};

async fn commit_with(
    h: &Harness,
    f: impl Fn(&mut lks_sync::LockInstance) + Send + Sync + 'static,
) -> anyhow::Result<()> {
    let handler = Arc::new(RecordingHandler::new("timer").reacting_on_update(f));
    h.processor
        .register_lock_handler("l1", &h.cred, handler)?;
    h.processor.update_lock_handlers(&h.cred).await?;
    Ok(())
}

#[tokio::test]
async fn deltas_sum_and_zero_deletes() -> anyhow::Result<()> {
    let h = Harness::new();
    h.api.insert_keyholder_lock(LockBuilder::keyholder("l1").build())?;
    h.refresh().await?;

    commit_with(&h, |i| i.add_time(Duration::seconds(300))).await?;
    commit_with(&h, |i| {
        i.add_time(Duration::seconds(120));
        i.remove_time(Duration::seconds(20));
    })
    .await?;

    let pending = h.pending_of("l1", UpdateType::AddRemoveTime).await?;
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].payload_as::<TimePayload>()?.duration, 400);

    commit_with(&h, |i| i.remove_time(Duration::seconds(400))).await?;
    assert!(h.pending_of("l1", UpdateType::AddRemoveTime).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn plus_then_minus_same_amount_leaves_nothing() -> anyhow::Result<()> {
    let h = Harness::new();
    h.api.insert_keyholder_lock(LockBuilder::keyholder("l1").build())?;
    h.refresh().await?;

    commit_with(&h, |i| i.add_time(Duration::seconds(300))).await?;
    assert_eq!(h.pending_of("l1", UpdateType::AddRemoveTime).await?.len(), 1);

    commit_with(&h, |i| i.remove_time(Duration::seconds(300))).await?;
    assert!(h.pending().await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn sub_second_delta_emits_nothing() -> anyhow::Result<()> {
    let h = Harness::new();
    h.api.insert_keyholder_lock(LockBuilder::keyholder("l1").build())?;
    h.refresh().await?;

    commit_with(&h, |i| i.add_time(Duration::milliseconds(900))).await?;
    assert!(h.pending().await?.is_empty());
    Ok(())
}
