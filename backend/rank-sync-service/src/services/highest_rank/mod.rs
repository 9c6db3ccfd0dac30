// ============================================
// Highest Rank Tracking
// ============================================
//
// Durable best-ever rank per (user_id, mode). Rank 1 is best; a stored
// rank is only ever replaced by a strictly lower one.

use crate::error::{Result, SyncError};
use crate::models::Discipline;
use async_trait::async_trait;
use sqlx::MySqlPool;
use std::sync::Arc;
use tracing::debug;

#[async_trait]
pub trait HighestRankStore: Send + Sync {
    async fn get(&self, user_id: i64, discipline: Discipline) -> Result<Option<u32>>;

    /// Write `rank` unless the stored value is already lower or equal
    async fn upsert_if_better(&self, user_id: i64, discipline: Discipline, rank: u32)
        -> Result<()>;
}

/// MySQL-backed store over `osu_score_rank_highest`
#[derive(Clone)]
pub struct MySqlHighestRankStore {
    pool: MySqlPool,
}

impl MySqlHighestRankStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl HighestRankStore for MySqlHighestRankStore {
    async fn get(&self, user_id: i64, discipline: Discipline) -> Result<Option<u32>> {
        // CAST keeps decoding uniform across signed and unsigned `rank` columns
        let rank = sqlx::query_scalar::<_, i64>(
            "SELECT CAST(`rank` AS SIGNED) FROM osu_score_rank_highest \
             WHERE user_id = ? AND mode = ?",
        )
        .bind(user_id)
        .bind(discipline.mode_id())
        .fetch_optional(&self.pool)
        .await?;
        rank.map(stored_rank).transpose()
    }

    async fn upsert_if_better(
        &self,
        user_id: i64,
        discipline: Discipline,
        rank: u32,
    ) -> Result<()> {
        // LEAST keeps the row monotonic even if two writers race
        sqlx::query(
            "INSERT INTO osu_score_rank_highest (user_id, mode, `rank`) VALUES (?, ?, ?) \
             ON DUPLICATE KEY UPDATE `rank` = LEAST(`rank`, VALUES(`rank`))",
        )
        .bind(user_id)
        .bind(discipline.mode_id())
        .bind(rank)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

/// Narrow a stored rank column value to a 1-based rank
fn stored_rank(raw: i64) -> Result<u32> {
    u32::try_from(raw).map_err(|err| SyncError::Database(sqlx::Error::Decode(Box::new(err))))
}

/// Records a user's rank when it beats their historical best
#[derive(Clone)]
pub struct HighestRankTracker {
    store: Arc<dyn HighestRankStore>,
}

impl HighestRankTracker {
    pub fn new(store: Arc<dyn HighestRankStore>) -> Self {
        Self { store }
    }

    /// Returns `true` when a write was issued.
    ///
    /// Equal ranks are not rewritten, so re-observing an unchanged
    /// leaderboard costs one read per user and no writes.
    pub async fn record_if_better(
        &self,
        user_id: i64,
        discipline: Discipline,
        current_rank: u32,
    ) -> Result<bool> {
        let previous = self.store.get(user_id, discipline).await?;

        match previous {
            Some(best) if current_rank >= best => Ok(false),
            _ => {
                self.store
                    .upsert_if_better(user_id, discipline, current_rank)
                    .await?;
                debug!(
                    user_id,
                    discipline = %discipline,
                    rank = current_rank,
                    previous = ?previous,
                    "Recorded new highest rank"
                );
                Ok(true)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::InMemoryHighestRankStore;

    #[tokio::test]
    async fn test_first_observation_creates_record() {
        let store = Arc::new(InMemoryHighestRankStore::default());
        let tracker = HighestRankTracker::new(store.clone());

        assert!(tracker.record_if_better(7, Discipline::Osu, 42).await.unwrap());
        assert_eq!(store.best(7, Discipline::Osu), Some(42));
        assert_eq!(store.write_count(), 1);
    }

    #[tokio::test]
    async fn test_only_strict_improvements_write() {
        let store = Arc::new(InMemoryHighestRankStore::default());
        let tracker = HighestRankTracker::new(store.clone());

        tracker.record_if_better(7, Discipline::Osu, 10).await.unwrap();
        assert!(!tracker.record_if_better(7, Discipline::Osu, 10).await.unwrap());
        assert!(!tracker.record_if_better(7, Discipline::Osu, 25).await.unwrap());
        assert!(tracker.record_if_better(7, Discipline::Osu, 3).await.unwrap());

        assert_eq!(store.best(7, Discipline::Osu), Some(3));
        assert_eq!(store.write_count(), 2);
    }

    #[test]
    fn test_stored_rank_accepts_signed_column_values() {
        assert_eq!(stored_rank(1).unwrap(), 1);
        assert_eq!(stored_rank(i64::from(u32::MAX)).unwrap(), u32::MAX);
        assert!(matches!(stored_rank(-3), Err(SyncError::Database(_))));
        assert!(stored_rank(i64::from(u32::MAX) + 1).is_err());
    }

    #[tokio::test]
    async fn test_disciplines_tracked_separately() {
        let store = Arc::new(InMemoryHighestRankStore::default());
        let tracker = HighestRankTracker::new(store.clone());

        tracker.record_if_better(7, Discipline::Osu, 10).await.unwrap();
        tracker.record_if_better(7, Discipline::Mania, 500).await.unwrap();

        assert_eq!(store.best(7, Discipline::Osu), Some(10));
        assert_eq!(store.best(7, Discipline::Mania), Some(500));
    }
}
