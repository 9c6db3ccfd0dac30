pub mod config;
pub mod error;
pub mod jobs;
pub mod models;
pub mod services;

#[cfg(test)]
pub(crate) mod testing;

pub use config::Config;
pub use error::{Result, SyncError};
pub use jobs::RoundRobinScheduler;
pub use services::{PaginationDriver, PassOutcome, SyncSettings};
