use crate::error::Result;
use crate::models::{Discipline, RankingRecord};
use crate::services::score_cache::{ScoreCache, UsernameIndex};
use std::sync::Arc;

/// Applies one upstream record to the score cache and username index
#[derive(Clone)]
pub struct ScoreCacheSync {
    cache: Arc<dyn ScoreCache>,
    usernames: Arc<dyn UsernameIndex>,
}

impl ScoreCacheSync {
    pub fn new(cache: Arc<dyn ScoreCache>, usernames: Arc<dyn UsernameIndex>) -> Self {
        Self { cache, usernames }
    }

    pub async fn apply(&self, discipline: Discipline, record: &RankingRecord) -> Result<()> {
        self.cache
            .upsert(discipline, record.user_id, record.ranked_score)
            .await?;
        self.usernames
            .set_mapping(record.user_id, &record.username)
            .await
    }
}
