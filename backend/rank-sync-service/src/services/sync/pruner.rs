use crate::error::Result;
use crate::models::Discipline;
use crate::services::score_cache::ScoreCache;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};

/// Evicts cache entries for users absent from the latest pass.
///
/// Only the score cache is touched; highest-rank history is permanent.
#[derive(Clone)]
pub struct StaleEntryPruner {
    cache: Arc<dyn ScoreCache>,
}

impl StaleEntryPruner {
    pub fn new(cache: Arc<dyn ScoreCache>) -> Self {
        Self { cache }
    }

    /// Returns the number of removed members.
    ///
    /// Members that do not parse as a user id can never be seen, so they
    /// are always removed.
    pub async fn prune(&self, discipline: Discipline, seen: &HashSet<i64>) -> Result<usize> {
        let cached = self.cache.list_members(discipline).await?;
        let mut removed = 0;

        for member in cached {
            let user_id = member.parse::<i64>().ok();
            if user_id.is_some_and(|id| seen.contains(&id)) {
                continue;
            }

            self.cache.remove(discipline, &member).await?;
            removed += 1;
            match user_id {
                Some(user_id) => {
                    info!(discipline = %discipline, user_id, "Removed user from score cache")
                }
                None => warn!(
                    discipline = %discipline,
                    member = %member,
                    "Removed non-numeric member from score cache"
                ),
            }
        }

        Ok(removed)
    }
}
