//! Scenario: snapshot refresh paging and stale sweep.
//!
//! # Invariants under test
//! - The keyholder refresh reads exactly `ceil(total / page_size)` pages and
//!   makes no further call.
//! - A failed page ends the refresh without error.
//! - An inactive snapshot is never resurrected by a later refresh.
//! - The sweep deactivates every active snapshot the stamped refresh missed.

use lks_db::Repository;
use lks_sync::ProcessorOptions;
use lks_testkit::{Harness, LockBuilder};
use uuid::Uuid;

fn paged(page_size: u32) -> Harness {
    Harness::with_options(ProcessorOptions {
        keyholder_page_size: page_size,
        history_page_size: 100,
    })
}

#[tokio::test]
async fn reads_exactly_the_reported_page_count() -> anyhow::Result<()> {
    let h = paged(2);
    for i in 0..5 {
        h.api.insert_keyholder_lock(LockBuilder::keyholder(&format!("l{i}")).build())?;
    }

    let report = h
        .processor
        .bulk_update_keyholder_snapshots(&h.cred, None)
        .await?;
    assert_eq!(report.pages, 3);
    assert_eq!(report.upserted, 5);

    let pages: Vec<u64> = h
        .api
        .calls_for("search_keyholder_locks")?
        .iter()
        .filter_map(|c| c.detail["page"].as_u64())
        .collect();
    assert_eq!(pages, vec![0, 1, 2]);
    Ok(())
}

#[tokio::test]
async fn failed_page_stops_the_refresh() -> anyhow::Result<()> {
    let h = paged(2);
    for i in 0..5 {
        h.api.insert_keyholder_lock(LockBuilder::keyholder(&format!("l{i}")).build())?;
    }
    h.api.fail_with_status("search_keyholder_locks", "", 503)?;

    let report = h
        .processor
        .bulk_update_keyholder_snapshots(&h.cred, None)
        .await?;
    assert_eq!(report.pages, 0);
    assert_eq!(report.upserted, 0);
    assert_eq!(h.api.calls_for("search_keyholder_locks")?.len(), 1);
    Ok(())
}

#[tokio::test]
async fn inactive_snapshots_are_not_resurrected() -> anyhow::Result<()> {
    let h = paged(50);
    h.api.insert_lock(LockBuilder::wearer("w1").build())?;
    h.refresh().await?;
    let cid = h.cid();
    h.repo.mark_snapshot_inactive("w1", &cid).await?;

    let report = h.processor.bulk_update_lock_snapshots(&h.cred, None).await?;
    assert_eq!(report.skipped_inactive, 1);
    assert_eq!(report.upserted, 0);
    assert!(!h.repo.snapshot("w1", &cid).await?.map(|s| s.is_active).unwrap_or(true));
    Ok(())
}

#[tokio::test]
async fn sweep_deactivates_snapshots_the_refresh_missed() -> anyhow::Result<()> {
    let h = paged(50);
    h.api.insert_lock(LockBuilder::wearer("w1").build())?;
    h.api.insert_keyholder_lock(LockBuilder::keyholder("k1").build())?;
    h.refresh().await?;

    h.api.remove_lock("k1")?;
    let token = Uuid::new_v4();
    h.processor
        .bulk_update_lock_snapshots(&h.cred, Some(token))
        .await?;
    h.processor
        .bulk_update_keyholder_snapshots(&h.cred, Some(token))
        .await?;
    let swept = h
        .processor
        .deactivate_snapshots_without_update_token(&h.cred, token)
        .await?;
    assert_eq!(swept, 1);

    let cid = h.cid();
    let active: Vec<String> = h
        .repo
        .active_snapshots(&cid, None)
        .await?
        .into_iter()
        .map(|s| s.lock_id)
        .collect();
    assert_eq!(active, vec!["w1"]);
    Ok(())
}
