//! Fixtures and fakes shared by the scenario tests under `tests/`.
//!
//! Everything here is deterministic: the clock is [`t0`] unless a test moves
//! it, the remote is a `PaperLockApi`, and storage is a `MemoryRepository`.

mod fixtures;
mod harness;
mod recording;

pub use fixtures::{extension_id, log, log_with, minutes, t0, LockBuilder};
pub use harness::Harness;
pub use recording::{RecordingHandler, Reaction};
