//! Counters returned by each engine phase.

use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RefreshReport {
    /// Successful remote pages read.
    pub pages: u32,
    pub upserted: usize,
    pub skipped_inactive: usize,
}

impl RefreshReport {
    fn absorb(&mut self, other: RefreshReport) {
        self.pages += other.pages;
        self.upserted += other.upserted;
        self.skipped_inactive += other.skipped_inactive;
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HistoryReport {
    pub locks_pulled: usize,
    pub inserted: usize,
    /// Locks whose pull stopped on a failed page.
    pub failed: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReplayReport {
    pub dispatched: usize,
    /// Entries with an unknown type or undecodable payload.
    pub ignored_types: usize,
    /// Entries left unprocessed: no active snapshot or no handler.
    pub skipped_unhandled: usize,
    pub instances_committed: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FlushReport {
    /// Remote answered with a success status.
    pub applied: usize,
    /// Remote answered with a failure status; the record is gone.
    pub rejected: usize,
    /// Not attempted and dropped (orphaned, not locked, ignored, already archived).
    pub skipped: usize,
    /// Kept pending: the required extension is missing.
    pub deferred: usize,
    /// Kept pending: transport error.
    pub failed: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PassReport {
    pub update_token: Uuid,
    pub snapshots: RefreshReport,
    pub deactivated: usize,
    pub history: HistoryReport,
    pub replay: ReplayReport,
    pub flush: FlushReport,
}

impl PassReport {
    pub(crate) fn add_refresh(&mut self, r: RefreshReport) {
        self.snapshots.absorb(r);
    }
}
