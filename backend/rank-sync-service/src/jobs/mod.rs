// ============================================
// Background Jobs Module
// ============================================
//
// Contains the periodic leaderboard sync runner. Runs either continuously
// on a fixed cadence or as a one-shot pass over every discipline
// (SYNC_RUN_ONCE=true, suitable for a Kubernetes CronJob).

pub mod scheduler;

pub use scheduler::RoundRobinScheduler;
