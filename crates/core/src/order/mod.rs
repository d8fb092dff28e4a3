//! Orders received from the storefront and their decomposition into tasks.

mod sqlite_store;
mod store;
mod types;

pub use sqlite_store::SqliteOrderStore;
pub use store::*;
pub use types::*;
