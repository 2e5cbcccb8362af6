//! Scenario: a failing handler aborts replay without rewinding it.
//!
//! # Invariants under test
//! - A callback error propagates out of `process_lock_history`.
//! - Entries dispatched before the failure stay processed.
//! - The failing entry and everything after it stay unprocessed, and a later
//!   pass with a healthy handler delivers exactly those.
//! - Nothing is committed for an aborted pass.

use std::sync::Arc;

use chrono::Duration;

use lks_schemas::LogType;
use lks_testkit::{log, Harness, LockBuilder, RecordingHandler};

#[tokio::test]
async fn failure_keeps_earlier_entries_processed() -> anyhow::Result<()> {
    let h = Harness::new();
    h.api.insert_keyholder_lock(LockBuilder::keyholder("l1").build())?;
    for (i, id) in ["h1", "h2", "h3"].iter().enumerate() {
        h.api.push_history(log(id, "l1", LogType::LockFrozen, i as i64 + 1))?;
    }

    let failing = Arc::new(
        RecordingHandler::new("rec")
            .failing_on("h2")
            .reacting_to_events(|i| i.add_time(Duration::minutes(5))),
    );
    h.processor.register_lock_handler("l1", &h.cred, failing.clone())?;

    h.refresh().await?;
    h.processor.bulk_update_lock_history(&h.cred, None).await?;

    let err = h.processor.process_lock_history(&h.cred).await;
    assert!(err.is_err());
    assert_eq!(failing.events(), vec!["l1:h1"]);
    assert!(h.pending().await?.is_empty());

    let history = h.repo.all_history()?;
    let processed: Vec<(&str, bool)> = history
        .iter()
        .map(|e| (e.id.as_str(), e.processed))
        .collect();
    assert_eq!(processed, vec![("h1", true), ("h2", false), ("h3", false)]);

    let healthy = Arc::new(RecordingHandler::new("rec"));
    h.processor.register_lock_handler("l1", &h.cred, healthy.clone())?;
    let report = h.processor.process_lock_history(&h.cred).await?;
    assert_eq!(report.dispatched, 2);
    assert_eq!(healthy.events(), vec!["l1:h2", "l1:h3"]);
    Ok(())
}
