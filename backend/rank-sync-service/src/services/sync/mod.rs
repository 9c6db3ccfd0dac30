// ============================================
// Leaderboard Reconciliation
// ============================================
//
// Keeps the Redis score cache and the highest-rank table in step with the
// upstream leaderboard. See `driver` for the pass algorithm.

pub mod cache_sync;
pub mod driver;
pub mod pruner;

pub use cache_sync::ScoreCacheSync;
pub use driver::{PaginationDriver, PassOutcome, PassSummary, SyncSettings};
pub use pruner::StaleEntryPruner;
