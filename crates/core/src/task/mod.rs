//! Purchase tasks: the state register driven by the automation worker.

mod sqlite_store;
mod store;
mod types;

pub use sqlite_store::SqliteTaskStore;
pub use store::*;
pub use types::*;
