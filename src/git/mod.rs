//! Git capability module.
//!
//! Provides:
//! - repository provisioning (verify-or-clone with rollback)
//! - the file synchronizer (fetch/merge/push, per-file reconciliation)
//! - transport callbacks (SSH key, agent, credential helper)
//! - `.orgzlyignore` handling for listings

pub mod error;
pub mod ignore;
pub mod provision;
pub mod sync;
pub mod transport;

pub use error::SyncError;
pub use ignore::{IGNORE_FILE, IgnoreSet};
pub use provision::{ensure_repository_exists, is_repository};
pub use sync::FileSynchronizer;
pub use transport::{ProgressSink, TransportConfig};
