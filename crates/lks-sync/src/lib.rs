//! lks-sync
//!
//! Reconciliation engine between the remote lock API and local handlers.
//!
//! - [`Processor`] pulls snapshots and history, replays unprocessed history
//!   through registered [`LockHandler`]s, and flushes queued updates.
//! - [`LockInstance`] is the mutable working copy a handler edits. Its
//!   [`commit_updates`](LockInstance::commit_updates) diffs the copy against
//!   the last-known remote lock and yields [`UpdateIntent`]s.
//! - [`UpdateQueue`] coalesces intents into at most one pending record per
//!   lock, credential and update type (pillory excepted).
//!
//! Nothing here talks to the network or a database directly: the engine goes
//! through `lks_rpc::LockApi` and `lks_db::Repository`.

mod events;
pub mod extensions;
mod handler;
mod instance;
mod pass;
mod processor;
mod queue;
mod registry;
mod report;
mod token;
pub mod updates;

pub use events::{LockEvent, LogMeta};
pub use handler::{dispatch, HandlerKey, HandlerScope, LockHandler};
pub use instance::{LockInstance, RemoteHandle};
pub use pass::PassOptions;
pub use processor::{Processor, ProcessorOptions};
pub use queue::{QueueOutcome, UpdateQueue};
pub use registry::{key_of, HandlerRegistry};
pub use report::{FlushReport, HistoryReport, PassReport, RefreshReport, ReplayReport};
pub use token::{credential_id, CredentialIds};
pub use updates::UpdateIntent;
