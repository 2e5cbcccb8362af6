//! Scenario: pillory requests coalesce under a 24 h window.
//!
//! # Invariants under test
//! - With nothing pending, a pillory request inserts a record.
//! - A second request whose sum stays within 24 h merges into the pending
//!   record: durations add and the newest reason wins.
//! - A request that would push the sum past 24 h starts a separate record.
//! - `send_to_pillory` clamps its duration to 15 min ..= 24 h.

use chrono::Duration;

use lks_db::UpdateType;
use lks_sync::updates::PilloryPayload;
use lks_sync::{LockInstance, QueueOutcome, UpdateIntent, UpdateQueue};
use lks_testkit::{Harness, LockBuilder};

fn pillory(secs: i64, reason: &str) -> UpdateIntent {
    UpdateIntent::Pillory(PilloryPayload {
        reason: reason.to_string(),
        duration: secs,
    })
}

#[tokio::test]
async fn merges_within_window_then_splits() -> anyhow::Result<()> {
    let h = Harness::new();
    let cid = h.cid();
    let queue = UpdateQueue::new(h.repo.as_ref());

    let a = queue.apply("l1", &cid, pillory(45 * 60, "late")).await?;
    let b = queue.apply("l1", &cid, pillory(20 * 3600, "very late")).await?;
    assert_eq!(a, QueueOutcome::Inserted);
    assert_eq!(b, QueueOutcome::Merged);

    let pending = h.pending_of("l1", UpdateType::Pillory).await?;
    assert_eq!(pending.len(), 1);
    let merged: PilloryPayload = pending[0].payload_as()?;
    assert_eq!(merged.duration, 20 * 3600 + 45 * 60);
    assert_eq!(merged.reason, "very late");

    let c = queue.apply("l1", &cid, pillory(4 * 3600, "again")).await?;
    assert_eq!(c, QueueOutcome::Inserted);

    let pending = h.pending_of("l1", UpdateType::Pillory).await?;
    assert_eq!(pending.len(), 2);
    let durations: Vec<i64> = pending
        .iter()
        .map(|u| u.payload_as::<PilloryPayload>().map(|p| p.duration))
        .collect::<anyhow::Result<_>>()?;
    assert!(durations.contains(&(20 * 3600 + 45 * 60)));
    assert!(durations.contains(&(4 * 3600)));
    Ok(())
}

#[tokio::test]
async fn send_to_pillory_clamps_duration() -> anyhow::Result<()> {
    let h = Harness::new();
    let mut instance = LockInstance::new(LockBuilder::keyholder("l1").build(), h.cid());

    instance.send_to_pillory(Duration::minutes(1), "short");
    instance.send_to_pillory(Duration::days(3), "long");

    let intents = instance.commit_updates();
    assert_eq!(
        intents,
        vec![pillory(15 * 60, "short"), pillory(24 * 3600, "long")]
    );
    Ok(())
}
