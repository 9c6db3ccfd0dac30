use crate::models::Discipline;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Upstream returned {status}: {body}")]
    UpstreamStatus { status: u16, body: String },

    #[error("Malformed upstream response: {0}")]
    MalformedResponse(#[from] serde_json::Error),

    #[error("Authorization failed: {0}")]
    Auth(String),

    #[error("Redis error: {0}")]
    Cache(#[from] redis::RedisError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("User {user_id} missing from {discipline} cache after upsert")]
    MissingRank { discipline: Discipline, user_id: i64 },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl SyncError {
    /// Whether the failure is expected to clear up on its own.
    ///
    /// The page retry envelope currently retries every variant; this only
    /// feeds the logs.
    pub fn is_transient(&self) -> bool {
        match self {
            SyncError::Http(_) | SyncError::Cache(_) | SyncError::Database(_) => true,
            SyncError::UpstreamStatus { status, .. } => *status == 429 || *status >= 500,
            SyncError::MalformedResponse(_)
            | SyncError::Auth(_)
            | SyncError::MissingRank { .. }
            | SyncError::Config(_) => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
