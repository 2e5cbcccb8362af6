//! Scenario: immediate extension calls from a working copy.
//!
//! # Invariants under test
//! - A call against an extension the lock does not carry returns `None`
//!   without touching the remote.
//! - The share link is served from the repository cache once fetched.
//! - An extension edit that drops Share-Link clears the cached link.

use std::sync::Arc;

use lks_db::Repository;
use lks_schemas::{EditExtensionsRequest, ExtensionSlug};
use lks_sync::{UpdateIntent, UpdateQueue};
use lks_testkit::{Harness, LockBuilder, RecordingHandler};

#[tokio::test]
async fn missing_extension_yields_none() -> anyhow::Result<()> {
    let h = Harness::new();
    h.api.insert_keyholder_lock(LockBuilder::keyholder("l1").build())?;
    h.processor
        .register_lock_handler("l1", &h.cred, Arc::new(RecordingHandler::new("rec")))?;
    h.refresh().await?;

    let instances = h.processor.all_instances(&h.cred).await?;
    assert_eq!(instances.len(), 1);
    assert!(instances[0].roll_dice().await?.is_none());
    assert!(instances[0].share_link().await?.is_none());
    assert!(h.api.calls_for("roll_dice")?.is_empty());
    Ok(())
}

#[tokio::test]
async fn dice_roll_reaches_the_remote() -> anyhow::Result<()> {
    let h = Harness::new();
    h.api.insert_keyholder_lock(
        LockBuilder::keyholder("l1")
            .with_extension(ExtensionSlug::Dice)
            .build(),
    )?;
    h.refresh().await?;

    let instances = h.processor.all_instances(&h.cred).await?;
    let roll = instances[0].roll_dice().await?;
    let value = roll.and_then(|r| r.into_value());
    assert_eq!(value.map(|v| (v.admin_dice, v.player_dice)), Some((3, 4)));
    Ok(())
}

#[tokio::test]
async fn share_link_is_cached_then_cleared() -> anyhow::Result<()> {
    let h = Harness::new();
    h.api.insert_keyholder_lock(
        LockBuilder::keyholder("l1")
            .with_extension(ExtensionSlug::ShareLink)
            .build(),
    )?;
    h.refresh().await?;

    let instances = h.processor.all_instances(&h.cred).await?;
    let first = instances[0].share_link().await?.and_then(|r| r.into_value());
    let second = instances[0].share_link().await?.and_then(|r| r.into_value());
    assert_eq!(first.as_deref(), Some("https://paper.invalid/links/l1"));
    assert_eq!(first, second);
    assert_eq!(h.api.calls_for("share_link")?.len(), 1);
    assert!(h.repo.share_link("l1").await?.is_some());

    UpdateQueue::new(h.repo.as_ref())
        .apply(
            "l1",
            &h.cid(),
            UpdateIntent::Extensions(EditExtensionsRequest { extensions: vec![] }),
        )
        .await?;
    assert!(h.repo.share_link("l1").await?.is_none());
    Ok(())
}
