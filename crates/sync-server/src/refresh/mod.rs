//! Refresh execution on the server's runtime.

pub mod runner;

pub use runner::RefreshRunner;
