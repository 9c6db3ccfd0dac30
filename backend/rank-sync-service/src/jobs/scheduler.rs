// ============================================
// Round-Robin Sync Scheduler
// ============================================
//
// Every `interval` the scheduler starts a pass for the next discipline in
// rotation. A tick that finds the previous pass still running is skipped,
// so at most one pass touches the stores at any time.
//
// Usage:
//   rank-sync-service                      (continuous, 30s cadence)
//   SYNC_RUN_ONCE=true rank-sync-service   (one pass per discipline, then exit)

use crate::config::SyncConfig;
use crate::models::{Discipline, RankingType};
use crate::services::sync::{PaginationDriver, PassOutcome};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

pub struct RoundRobinScheduler {
    driver: Arc<PaginationDriver>,
    disciplines: Vec<Discipline>,
    ranking_type: RankingType,
    interval: Duration,
    next_index: usize,
    in_flight: Option<JoinHandle<PassOutcome>>,
}

impl RoundRobinScheduler {
    pub fn new(
        driver: Arc<PaginationDriver>,
        disciplines: Vec<Discipline>,
        ranking_type: RankingType,
        interval: Duration,
    ) -> Self {
        Self {
            driver,
            disciplines,
            ranking_type,
            interval,
            next_index: 0,
            in_flight: None,
        }
    }

    pub fn from_config(driver: Arc<PaginationDriver>, config: &SyncConfig) -> Self {
        Self::new(
            driver,
            config.disciplines.clone(),
            config.ranking_type,
            config.cycle_interval(),
        )
    }

    /// Whether a pass started by `tick` is still running
    pub fn is_busy(&self) -> bool {
        self.in_flight
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    /// Start the next discipline's pass unless one is still running.
    ///
    /// Returns the discipline that was started.
    pub async fn tick(&mut self) -> Option<Discipline> {
        self.collect_finished().await;
        if self.is_busy() {
            info!("Previous rankings pass still running, skipping this cycle");
            return None;
        }
        if self.disciplines.is_empty() {
            warn!("No disciplines configured, nothing to sync");
            return None;
        }

        let discipline = self.disciplines[self.next_index % self.disciplines.len()];
        self.next_index = (self.next_index + 1) % self.disciplines.len();

        let driver = self.driver.clone();
        let ranking_type = self.ranking_type;
        info!(discipline = %discipline, "Starting scheduled fetch");
        self.in_flight = Some(tokio::spawn(async move {
            driver.run(discipline, ranking_type).await
        }));

        Some(discipline)
    }

    /// Tick on the configured cadence until `shutdown` resolves, then wait
    /// for the in-flight pass.
    pub async fn run<S>(mut self, shutdown: S)
    where
        S: Future<Output = ()>,
    {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        info!(
            interval_secs = self.interval.as_secs(),
            disciplines = ?self.disciplines,
            "Rankings scheduler started"
        );

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested, stopping scheduler");
                    break;
                }
                _ = ticker.tick() => {
                    self.tick().await;
                }
            }
        }

        if let Some(handle) = self.in_flight.take() {
            info!("Waiting for in-flight rankings pass");
            log_outcome(handle.await);
        }
    }

    /// Reap a pass that has already finished and log how it ended
    async fn collect_finished(&mut self) -> Option<PassOutcome> {
        if !self.in_flight.as_ref().is_some_and(JoinHandle::is_finished) {
            return None;
        }
        let handle = self.in_flight.take()?;
        log_outcome(handle.await)
    }

    /// Run one pass per configured discipline, back to back
    pub async fn run_once(&self) -> Vec<PassOutcome> {
        let mut outcomes = Vec::with_capacity(self.disciplines.len());
        for discipline in &self.disciplines {
            outcomes.push(self.driver.run(*discipline, self.ranking_type).await);
        }
        outcomes
    }
}

fn log_outcome(joined: Result<PassOutcome, JoinError>) -> Option<PassOutcome> {
    match joined {
        Ok(outcome) => {
            let summary = outcome.summary();
            if outcome.is_completed() {
                info!(
                    discipline = %summary.discipline,
                    entries = summary.entries,
                    pages = summary.pages,
                    pruned = summary.pruned,
                    "Rankings pass completed"
                );
            } else {
                warn!(
                    discipline = %summary.discipline,
                    entries = summary.entries,
                    pages = summary.pages,
                    "Rankings pass abandoned"
                );
            }
            Some(outcome)
        }
        Err(err) => {
            error!(error = %err, "Rankings pass task failed");
            None
        }
    }
}
