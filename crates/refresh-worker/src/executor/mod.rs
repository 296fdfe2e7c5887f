//! Refresh execution module.

mod refresher;

pub use refresher::RefreshExecutor;
