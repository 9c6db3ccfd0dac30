// ============================================
// Score Cache (Redis)
// ============================================
//
// Redis keys:
// - score_{mode}          sorted set, member = user_id, score = ranked_score
// - user_id_to_username   hash, user_id -> username
// - username_to_user_id   hash, username -> user_id

use crate::error::Result;
use crate::models::Discipline;
use async_trait::async_trait;
use redis::AsyncCommands;
use redis_utils::SharedConnectionManager;

pub const USER_ID_TO_USERNAME_KEY: &str = "user_id_to_username";
pub const USERNAME_TO_USER_ID_KEY: &str = "username_to_user_id";

/// Per-discipline sorted score lookup
#[async_trait]
pub trait ScoreCache: Send + Sync {
    async fn upsert(&self, discipline: Discipline, user_id: i64, score: i64) -> Result<()>;

    /// 0-based position from the highest score, `None` if absent
    async fn rank_of(&self, discipline: Discipline, user_id: i64) -> Result<Option<u64>>;

    /// Raw sorted-set members. Legacy entries are not always numeric ids.
    async fn list_members(&self, discipline: Discipline) -> Result<Vec<String>>;

    async fn remove(&self, discipline: Discipline, member: &str) -> Result<()>;
}

/// Bidirectional user_id <-> username mapping
#[async_trait]
pub trait UsernameIndex: Send + Sync {
    async fn set_mapping(&self, user_id: i64, username: &str) -> Result<()>;
}

pub fn score_key(discipline: Discipline) -> String {
    format!("score_{}", discipline.as_str())
}

#[derive(Clone)]
pub struct RedisScoreCache {
    redis: SharedConnectionManager,
}

impl RedisScoreCache {
    pub fn new(redis: SharedConnectionManager) -> Self {
        Self { redis }
    }
}

#[async_trait]
impl ScoreCache for RedisScoreCache {
    async fn upsert(&self, discipline: Discipline, user_id: i64, score: i64) -> Result<()> {
        let mut conn = self.redis.lock().await;
        let _: () = conn.zadd(score_key(discipline), user_id, score).await?;
        Ok(())
    }

    async fn rank_of(&self, discipline: Discipline, user_id: i64) -> Result<Option<u64>> {
        let mut conn = self.redis.lock().await;
        let rank: Option<u64> = conn.zrevrank(score_key(discipline), user_id).await?;
        Ok(rank)
    }

    async fn list_members(&self, discipline: Discipline) -> Result<Vec<String>> {
        let mut conn = self.redis.lock().await;
        let members: Vec<String> = conn.zrange(score_key(discipline), 0, -1).await?;
        Ok(members)
    }

    async fn remove(&self, discipline: Discipline, member: &str) -> Result<()> {
        let mut conn = self.redis.lock().await;
        let _: () = conn.zrem(score_key(discipline), member).await?;
        Ok(())
    }
}

#[async_trait]
impl UsernameIndex for RedisScoreCache {
    async fn set_mapping(&self, user_id: i64, username: &str) -> Result<()> {
        let mut conn = self.redis.lock().await;
        let _: () = redis::pipe()
            .hset(USER_ID_TO_USERNAME_KEY, user_id, username)
            .ignore()
            .hset(USERNAME_TO_USER_ID_KEY, username, user_id)
            .ignore()
            .query_async(&mut *conn)
            .await?;
        Ok(())
    }
}
