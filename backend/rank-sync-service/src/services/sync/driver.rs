// ============================================
// Pagination Driver
// ============================================
//
// One pass over a discipline's leaderboard:
// 1. Follow the upstream cursor page by page (50ms apart)
// 2. Per record: cache upsert -> live rank lookup -> highest-rank check
// 3. Stop at the entry cap or the last page
// 4. Prune cache members not seen during the pass
//
// A failed page is retried from the same cursor with linear backoff, and a
// failed prune is retried the same way. Once retries run out the pass is
// abandoned and earlier pages stay applied.

use super::{ScoreCacheSync, StaleEntryPruner};
use crate::config::SyncConfig;
use crate::error::{Result, SyncError};
use crate::models::{Discipline, RankingType};
use crate::services::highest_rank::{HighestRankStore, HighestRankTracker};
use crate::services::score_cache::{ScoreCache, UsernameIndex};
use crate::services::upstream::RankingSource;
use resilience::{RetryConfig, RetryCounters, RetryDecision};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

type RetryKey = (Discipline, RankingType);

#[derive(Debug, Clone)]
pub struct SyncSettings {
    /// Entries evaluated per pass
    pub max_entries: usize,
    /// Pause between consecutive page requests
    pub page_delay: Duration,
    pub retry: RetryConfig,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            max_entries: 1000,
            page_delay: Duration::from_millis(50),
            retry: RetryConfig::default(),
        }
    }
}

impl From<&SyncConfig> for SyncSettings {
    fn from(config: &SyncConfig) -> Self {
        Self {
            max_entries: config.max_entries,
            page_delay: config.page_delay(),
            retry: RetryConfig {
                max_retries: config.max_retries,
                backoff_step: config.backoff_step(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassSummary {
    pub discipline: Discipline,
    pub ranking_type: RankingType,
    /// Records applied, bounded by `max_entries`
    pub entries: usize,
    pub pages: usize,
    pub pruned: usize,
    /// Upstream had more entries than the cap allowed
    pub truncated: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassOutcome {
    Completed(PassSummary),
    /// Retries exhausted; pages applied before the failure are kept
    Abandoned(PassSummary),
}

impl PassOutcome {
    pub fn summary(&self) -> &PassSummary {
        match self {
            PassOutcome::Completed(summary) | PassOutcome::Abandoned(summary) => summary,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, PassOutcome::Completed(_))
    }
}

/// Per-pass scratch state, dropped when the pass ends
#[derive(Default)]
struct PassState {
    seen: HashSet<i64>,
    entries: usize,
    pages: usize,
    truncated: bool,
}

impl PassState {
    fn summary(&self, discipline: Discipline, ranking_type: RankingType, pruned: usize) -> PassSummary {
        PassSummary {
            discipline,
            ranking_type,
            entries: self.entries,
            pages: self.pages,
            pruned,
            truncated: self.truncated,
        }
    }
}

pub struct PaginationDriver {
    source: Arc<dyn RankingSource>,
    cache: Arc<dyn ScoreCache>,
    cache_sync: ScoreCacheSync,
    tracker: HighestRankTracker,
    pruner: StaleEntryPruner,
    retries: RetryCounters<RetryKey>,
    settings: SyncSettings,
}

impl PaginationDriver {
    pub fn new(
        source: Arc<dyn RankingSource>,
        cache: Arc<dyn ScoreCache>,
        usernames: Arc<dyn UsernameIndex>,
        history: Arc<dyn HighestRankStore>,
        settings: SyncSettings,
    ) -> Self {
        Self {
            source,
            cache_sync: ScoreCacheSync::new(cache.clone(), usernames),
            pruner: StaleEntryPruner::new(cache.clone()),
            tracker: HighestRankTracker::new(history),
            cache,
            retries: RetryCounters::new(settings.retry.clone()),
            settings,
        }
    }

    /// Current retry counter for a discipline/ranking pair
    pub fn retry_attempts(&self, discipline: Discipline, ranking_type: RankingType) -> u32 {
        self.retries.attempts(&(discipline, ranking_type))
    }

    /// Run one full pass for `discipline`
    pub async fn run(&self, discipline: Discipline, ranking_type: RankingType) -> PassOutcome {
        let key = (discipline, ranking_type);
        let mut pass = PassState::default();
        let mut cursor: Option<String> = None;

        info!(discipline = %discipline, ranking_type = %ranking_type, "Starting rankings pass");

        loop {
            match self
                .sync_page(discipline, ranking_type, cursor.as_deref(), &mut pass)
                .await
            {
                Ok(next_cursor) => {
                    self.retries.reset(&key);
                    pass.pages += 1;

                    match next_cursor {
                        Some(next) if pass.entries < self.settings.max_entries => {
                            sleep(self.settings.page_delay).await;
                            cursor = Some(next);
                        }
                        _ => break,
                    }
                }
                Err(err) => match self.retries.record_failure(&key) {
                    RetryDecision::Retry { attempt, delay } => {
                        warn!(
                            discipline = %discipline,
                            ranking_type = %ranking_type,
                            cursor = cursor.as_deref().unwrap_or("<first>"),
                            entries = pass.entries,
                            attempt,
                            delay_secs = delay.as_secs(),
                            transient = err.is_transient(),
                            error = %err,
                            "Page sync failed, retrying"
                        );
                        sleep(delay).await;
                    }
                    RetryDecision::Exhausted { attempts } => {
                        error!(
                            discipline = %discipline,
                            ranking_type = %ranking_type,
                            cursor = cursor.as_deref().unwrap_or("<first>"),
                            entries = pass.entries,
                            attempts,
                            error = %err,
                            "Max retries reached, giving up on pass"
                        );
                        return PassOutcome::Abandoned(pass.summary(discipline, ranking_type, 0));
                    }
                },
            }
        }

        let pruned = loop {
            match self.pruner.prune(discipline, &pass.seen).await {
                Ok(pruned) => {
                    self.retries.reset(&key);
                    break pruned;
                }
                Err(err) => match self.retries.record_failure(&key) {
                    RetryDecision::Retry { attempt, delay } => {
                        warn!(
                            discipline = %discipline,
                            ranking_type = %ranking_type,
                            attempt,
                            delay_secs = delay.as_secs(),
                            transient = err.is_transient(),
                            error = %err,
                            "Pruning stale cache entries failed, retrying"
                        );
                        sleep(delay).await;
                    }
                    RetryDecision::Exhausted { attempts } => {
                        error!(
                            discipline = %discipline,
                            ranking_type = %ranking_type,
                            attempts,
                            error = %err,
                            "Max retries reached while pruning, giving up on pass"
                        );
                        return PassOutcome::Abandoned(pass.summary(discipline, ranking_type, 0));
                    }
                },
            }
        };

        let summary = pass.summary(discipline, ranking_type, pruned);
        info!(
            discipline = %discipline,
            ranking_type = %ranking_type,
            entries = summary.entries,
            pages = summary.pages,
            pruned = summary.pruned,
            truncated = summary.truncated,
            "Finished rankings pass"
        );
        PassOutcome::Completed(summary)
    }

    /// Fetch and apply one page; returns the next cursor.
    ///
    /// `pass.entries` only advances once the whole page has been applied, so
    /// a retried page starts counting from the same position.
    async fn sync_page(
        &self,
        discipline: Discipline,
        ranking_type: RankingType,
        cursor: Option<&str>,
        pass: &mut PassState,
    ) -> Result<Option<String>> {
        let page = self
            .source
            .fetch_page(discipline, ranking_type, cursor)
            .await?;

        debug!(
            discipline = %discipline,
            cursor = cursor.unwrap_or("<first>"),
            records = page.records.len(),
            entries = pass.entries,
            "Applying rankings page"
        );

        let mut entries = pass.entries;
        for record in &page.records {
            if entries >= self.settings.max_entries {
                pass.truncated = true;
                break;
            }
            entries += 1;
            pass.seen.insert(record.user_id);

            self.cache_sync.apply(discipline, record).await?;
            let rank = self.current_rank(discipline, record.user_id).await?;
            self.tracker
                .record_if_better(record.user_id, discipline, rank)
                .await?;
        }
        pass.entries = entries;

        if pass.entries >= self.settings.max_entries && page.next_cursor.is_some() {
            pass.truncated = true;
        }

        Ok(page.next_cursor)
    }

    /// 1-based rank of `user_id` within the cached leaderboard
    async fn current_rank(&self, discipline: Discipline, user_id: i64) -> Result<u32> {
        let position = self
            .cache
            .rank_of(discipline, user_id)
            .await?
            .ok_or(SyncError::MissingRank {
                discipline,
                user_id,
            })?;
        Ok(u32::try_from(position + 1).unwrap_or(u32::MAX))
    }
}
