//! In-memory doubles for the store and upstream traits.

use crate::error::{Result, SyncError};
use crate::models::{Discipline, RankingPage, RankingRecord, RankingType};
use crate::services::highest_rank::HighestRankStore;
use crate::services::score_cache::{ScoreCache, UsernameIndex};
use crate::services::upstream::RankingSource;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

pub fn record(user_id: i64, username: &str, ranked_score: i64) -> RankingRecord {
    RankingRecord {
        user_id,
        username: username.to_string(),
        ranked_score,
    }
}

// --------------------------------------------
// Score cache
// --------------------------------------------

#[derive(Default)]
struct CacheState {
    scores: HashMap<Discipline, HashMap<i64, i64>>,
    /// Members that are not user ids, left behind by older writers
    foreign: HashMap<Discipline, HashMap<String, i64>>,
    user_to_name: HashMap<i64, String>,
    name_to_user: HashMap<String, i64>,
    upserts: usize,
    failing_upserts: usize,
    failing_lists: usize,
}

/// Sorted-set semantics matching Redis ZREVRANK: score descending, ties by
/// member string descending.
#[derive(Default)]
pub struct InMemoryScoreCache {
    state: Mutex<CacheState>,
}

impl InMemoryScoreCache {
    pub fn seed(&self, discipline: Discipline, entries: &[(i64, i64)]) {
        let mut state = self.state.lock().unwrap();
        let set = state.scores.entry(discipline).or_default();
        for (user_id, score) in entries {
            set.insert(*user_id, *score);
        }
    }

    /// Store a member that is not a user id
    pub fn seed_raw(&self, discipline: Discipline, member: &str, score: i64) {
        let mut state = self.state.lock().unwrap();
        state
            .foreign
            .entry(discipline)
            .or_default()
            .insert(member.to_string(), score);
    }

    /// Non-numeric members, sorted
    pub fn raw_members(&self, discipline: Discipline) -> Vec<String> {
        let state = self.state.lock().unwrap();
        let mut members: Vec<String> = state
            .foreign
            .get(&discipline)
            .map(|set| set.keys().cloned().collect())
            .unwrap_or_default();
        members.sort_unstable();
        members
    }

    /// Numeric members sorted by user id
    pub fn members(&self, discipline: Discipline) -> Vec<i64> {
        let state = self.state.lock().unwrap();
        let mut ids: Vec<i64> = state
            .scores
            .get(&discipline)
            .map(|set| set.keys().copied().collect())
            .unwrap_or_default();
        ids.sort_unstable();
        ids
    }

    pub fn score(&self, discipline: Discipline, user_id: i64) -> Option<i64> {
        let state = self.state.lock().unwrap();
        state.scores.get(&discipline)?.get(&user_id).copied()
    }

    pub fn username(&self, user_id: i64) -> Option<String> {
        self.state.lock().unwrap().user_to_name.get(&user_id).cloned()
    }

    pub fn user_id_for(&self, username: &str) -> Option<i64> {
        self.state.lock().unwrap().name_to_user.get(username).copied()
    }

    pub fn upsert_count(&self) -> usize {
        self.state.lock().unwrap().upserts
    }

    /// Make the next `times` upserts fail with a Redis IO error
    pub fn fail_next_upserts(&self, times: usize) {
        self.state.lock().unwrap().failing_upserts = times;
    }

    /// Make the next `times` member listings fail with a Redis IO error
    pub fn fail_next_lists(&self, times: usize) {
        self.state.lock().unwrap().failing_lists = times;
    }
}

fn io_error() -> SyncError {
    SyncError::Cache(redis::RedisError::from((
        redis::ErrorKind::IoError,
        "connection reset",
    )))
}

#[async_trait]
impl ScoreCache for InMemoryScoreCache {
    async fn upsert(&self, discipline: Discipline, user_id: i64, score: i64) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.failing_upserts > 0 {
            state.failing_upserts -= 1;
            return Err(io_error());
        }
        state.upserts += 1;
        state
            .scores
            .entry(discipline)
            .or_default()
            .insert(user_id, score);
        Ok(())
    }

    async fn rank_of(&self, discipline: Discipline, user_id: i64) -> Result<Option<u64>> {
        let state = self.state.lock().unwrap();
        let Some(set) = state.scores.get(&discipline) else {
            return Ok(None);
        };
        let Some(&own) = set.get(&user_id) else {
            return Ok(None);
        };
        let own_member = user_id.to_string();
        let foreign = state.foreign.get(&discipline);
        let ahead = set
            .iter()
            .map(|(id, score)| (id.to_string(), *score))
            .chain(
                foreign
                    .into_iter()
                    .flatten()
                    .map(|(member, score)| (member.clone(), *score)),
            )
            .filter(|(member, score)| *score > own || (*score == own && *member > own_member))
            .count();
        Ok(Some(ahead as u64))
    }

    async fn list_members(&self, discipline: Discipline) -> Result<Vec<String>> {
        {
            let mut state = self.state.lock().unwrap();
            if state.failing_lists > 0 {
                state.failing_lists -= 1;
                return Err(io_error());
            }
        }
        let mut members: Vec<String> = self
            .members(discipline)
            .into_iter()
            .map(|id| id.to_string())
            .collect();
        members.extend(self.raw_members(discipline));
        Ok(members)
    }

    async fn remove(&self, discipline: Discipline, member: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        match member.parse::<i64>() {
            Ok(user_id) => {
                if let Some(set) = state.scores.get_mut(&discipline) {
                    set.remove(&user_id);
                }
            }
            Err(_) => {
                if let Some(set) = state.foreign.get_mut(&discipline) {
                    set.remove(member);
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl UsernameIndex for InMemoryScoreCache {
    async fn set_mapping(&self, user_id: i64, username: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.user_to_name.insert(user_id, username.to_string());
        state.name_to_user.insert(username.to_string(), user_id);
        Ok(())
    }
}

// --------------------------------------------
// Highest rank store
// --------------------------------------------

#[derive(Default)]
pub struct InMemoryHighestRankStore {
    rows: Mutex<HashMap<(i64, Discipline), u32>>,
    /// Every value written, in order
    writes: Mutex<Vec<(i64, Discipline, u32)>>,
}

impl InMemoryHighestRankStore {
    pub fn seed(&self, user_id: i64, discipline: Discipline, rank: u32) {
        self.rows.lock().unwrap().insert((user_id, discipline), rank);
    }

    pub fn best(&self, user_id: i64, discipline: Discipline) -> Option<u32> {
        self.rows.lock().unwrap().get(&(user_id, discipline)).copied()
    }

    pub fn write_count(&self) -> usize {
        self.writes.lock().unwrap().len()
    }

    pub fn writes(&self) -> Vec<(i64, Discipline, u32)> {
        self.writes.lock().unwrap().clone()
    }
}

#[async_trait]
impl HighestRankStore for InMemoryHighestRankStore {
    async fn get(&self, user_id: i64, discipline: Discipline) -> Result<Option<u32>> {
        Ok(self.best(user_id, discipline))
    }

    async fn upsert_if_better(
        &self,
        user_id: i64,
        discipline: Discipline,
        rank: u32,
    ) -> Result<()> {
        self.writes.lock().unwrap().push((user_id, discipline, rank));
        let mut rows = self.rows.lock().unwrap();
        let best = rows.entry((user_id, discipline)).or_insert(rank);
        *best = (*best).min(rank);
        Ok(())
    }
}

// --------------------------------------------
// Upstream
// --------------------------------------------

/// Serves canned pages keyed by cursor, with injectable failures
#[derive(Default)]
pub struct ScriptedRankingSource {
    pages: HashMap<Option<String>, RankingPage>,
    failures: Mutex<HashMap<Option<String>, usize>>,
    calls: Mutex<Vec<(Discipline, Option<String>)>>,
    latency: Option<Duration>,
}

impl ScriptedRankingSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(
        mut self,
        cursor: Option<&str>,
        records: Vec<RankingRecord>,
        next_cursor: Option<&str>,
    ) -> Self {
        self.pages.insert(
            cursor.map(str::to_string),
            RankingPage {
                records,
                next_cursor: next_cursor.map(str::to_string),
            },
        );
        self
    }

    /// Fail the next `times` requests for `cursor`
    pub fn fail(self, cursor: Option<&str>, times: usize) -> Self {
        self.failures
            .lock()
            .unwrap()
            .insert(cursor.map(str::to_string), times);
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn calls(&self) -> Vec<(Discipline, Option<String>)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn cursors_requested(&self) -> Vec<Option<String>> {
        self.calls().into_iter().map(|(_, cursor)| cursor).collect()
    }
}

#[async_trait]
impl RankingSource for ScriptedRankingSource {
    async fn fetch_page(
        &self,
        discipline: Discipline,
        _ranking_type: RankingType,
        cursor: Option<&str>,
    ) -> Result<RankingPage> {
        let key = cursor.map(str::to_string);
        self.calls.lock().unwrap().push((discipline, key.clone()));

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        {
            let mut failures = self.failures.lock().unwrap();
            if let Some(remaining) = failures.get_mut(&key) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(SyncError::UpstreamStatus {
                        status: 503,
                        body: "service unavailable".to_string(),
                    });
                }
            }
        }

        self.pages
            .get(&key)
            .cloned()
            .ok_or_else(|| SyncError::UpstreamStatus {
                status: 404,
                body: format!("no page for cursor {:?}", key),
            })
    }
}
