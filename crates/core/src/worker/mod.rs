//! Purchase worker liveness.

mod monitor;
mod store;
mod types;

pub use monitor::LivenessMonitor;
pub use store::*;
pub use types::*;
