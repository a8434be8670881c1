//! Configuration types passed explicitly into catalog sessions, the sync
//! orchestrator and the changelog builder.
//!
//! - `ConnectionConfig`: catalog connection settings
//! - `SyncConfig`: snapshot root, schema allow-list and commit settings
//! - `ChangelogConfig`: history window for changelog rendering
//!
//! # Security
//! These configuration structs intentionally do NOT store passwords or
//! credentials. Credentials are handled by the security module.

mod connection;
mod sync;

pub use connection::{ConnectionConfig, MAX_CALL_TIMEOUT};
pub use sync::{ChangelogConfig, DEFAULT_LOOKBACK, MAX_CONCURRENCY, SyncConfig};
