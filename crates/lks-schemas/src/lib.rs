//! Wire model for the remote lock API.
//!
//! Plain serde types only. No IO, no behaviour beyond small lookups.

pub mod actions;
pub mod extensions;
pub mod lock;
pub mod logs;

pub use actions::*;
pub use extensions::*;
pub use lock::*;
pub use logs::*;
