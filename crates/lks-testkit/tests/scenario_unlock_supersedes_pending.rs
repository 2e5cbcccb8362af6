//! Scenario: Unlock supersedes every other pending update.
//!
//! # Invariants under test
//! - Queuing Unlock deletes every other pending record for the same lock and
//!   credential, including an extension edit queued earlier.
//! - Records of other locks are untouched.
//! - A second Unlock while one is pending is a duplicate.
//! - A wearer's `unlock()` is a silent no-op and emits nothing.

use lks_db::UpdateType;
use lks_schemas::{EditExtensionsRequest, ExtensionSlug};
use lks_sync::updates::{FreezePayload, TimePayload};
use lks_sync::{LockInstance, QueueOutcome, UpdateIntent, UpdateQueue};
use lks_testkit::{Harness, LockBuilder};

#[tokio::test]
async fn unlock_deletes_other_pending_updates() -> anyhow::Result<()> {
    let h = Harness::new();
    let cid = h.cid();
    let queue = UpdateQueue::new(h.repo.as_ref());

    queue
        .apply(
            "l1",
            &cid,
            UpdateIntent::Extensions(EditExtensionsRequest { extensions: vec![] }),
        )
        .await?;
    queue
        .apply("l1", &cid, UpdateIntent::Freeze(FreezePayload { is_frozen: true }))
        .await?;
    queue
        .apply("l2", &cid, UpdateIntent::AddRemoveTime(TimePayload { duration: 60 }))
        .await?;
    assert_eq!(h.pending().await?.len(), 3);

    let first = queue.apply("l1", &cid, UpdateIntent::Unlock).await?;
    assert_eq!(first, QueueOutcome::Inserted);
    let second = queue.apply("l1", &cid, UpdateIntent::Unlock).await?;
    assert_eq!(second, QueueOutcome::Duplicate);

    let pending = h.pending().await?;
    let l1: Vec<_> = pending.iter().filter(|u| u.lock_id == "l1").collect();
    assert_eq!(l1.len(), 1);
    assert_eq!(l1[0].update_type, UpdateType::Unlock);
    assert_eq!(h.pending_of("l2", UpdateType::AddRemoveTime).await?.len(), 1);
    Ok(())
}

#[tokio::test]
async fn keyholder_unlock_commit_supersedes_its_own_extension_edit() -> anyhow::Result<()> {
    let h = Harness::new();
    let cid = h.cid();
    let lock = LockBuilder::keyholder("l1")
        .trusted()
        .with_extension(ExtensionSlug::Dice)
        .build();

    let mut instance = LockInstance::new(lock.clone(), cid.clone());
    instance.extensions.dice.set_multiplier(chrono::Duration::hours(2));
    let queue = UpdateQueue::new(h.repo.as_ref());
    for intent in instance.commit_updates() {
        queue.apply("l1", &cid, intent).await?;
    }
    assert_eq!(h.pending_of("l1", UpdateType::UpdateExtensions).await?.len(), 1);

    let mut instance = LockInstance::new(lock, cid.clone());
    instance.unlock();
    let intents = instance.commit_updates();
    assert_eq!(intents, vec![UpdateIntent::Unlock]);
    for intent in intents {
        queue.apply("l1", &cid, intent).await?;
    }

    let pending = h.pending().await?;
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].update_type, UpdateType::Unlock);
    Ok(())
}

#[tokio::test]
async fn wearer_unlock_is_a_no_op() -> anyhow::Result<()> {
    let h = Harness::new();
    let mut instance = LockInstance::new(LockBuilder::wearer("l1").build(), h.cid());
    instance.unlock();
    assert!(instance.is_locked());
    assert!(instance.commit_updates().is_empty());
    Ok(())
}
