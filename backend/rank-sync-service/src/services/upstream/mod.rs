// ============================================
// Upstream Ranking Source
// ============================================
//
// Cursor-paginated leaderboard feed:
//   GET {api_base}/rankings/{mode}/{type}[?cursor_string=...]
//
// Every failure (transport, non-2xx, unexpected payload) surfaces as a
// SyncError so the pagination driver can retry the page uniformly.

use crate::error::{Result, SyncError};
use crate::models::{Discipline, RankingPage, RankingRecord, RankingType};
use crate::services::credentials::CredentialProvider;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Longest upstream error body kept in errors and logs
const MAX_ERROR_BODY_CHARS: usize = 512;

#[async_trait]
pub trait RankingSource: Send + Sync {
    /// Fetch one page; `cursor = None` requests the first page
    async fn fetch_page(
        &self,
        discipline: Discipline,
        ranking_type: RankingType,
        cursor: Option<&str>,
    ) -> Result<RankingPage>;
}

#[derive(Debug, Deserialize)]
struct RankingsResponse {
    ranking: Vec<UserStatistics>,
    #[serde(default)]
    cursor_string: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UserStatistics {
    ranked_score: i64,
    user: UserCompact,
}

#[derive(Debug, Deserialize)]
struct UserCompact {
    id: i64,
    username: String,
}

impl From<UserStatistics> for RankingRecord {
    fn from(stats: UserStatistics) -> Self {
        RankingRecord {
            user_id: stats.user.id,
            username: stats.user.username,
            ranked_score: stats.ranked_score,
        }
    }
}

/// osu! API v2 rankings client
pub struct OsuRankingClient {
    http: reqwest::Client,
    api_base_url: String,
    credentials: Arc<dyn CredentialProvider>,
}

impl OsuRankingClient {
    pub fn new(
        http: reqwest::Client,
        api_base_url: &str,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Self {
        Self {
            http,
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            credentials,
        }
    }

    /// Shared HTTP client with a per-request timeout
    pub fn build_http_client(timeout: Duration) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("rank-sync-service/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(SyncError::from)
    }

    fn rankings_url(&self, discipline: Discipline, ranking_type: RankingType) -> String {
        format!(
            "{}/rankings/{}/{}",
            self.api_base_url,
            discipline.as_str(),
            ranking_type.as_str()
        )
    }
}

#[async_trait]
impl RankingSource for OsuRankingClient {
    async fn fetch_page(
        &self,
        discipline: Discipline,
        ranking_type: RankingType,
        cursor: Option<&str>,
    ) -> Result<RankingPage> {
        let auth = self.credentials.auth_header().await?;

        let mut request = self
            .http
            .get(self.rankings_url(discipline, ranking_type))
            .header(reqwest::header::AUTHORIZATION, auth)
            .header(reqwest::header::ACCEPT, "application/json");
        if let Some(cursor) = cursor {
            request = request.query(&[("cursor_string", cursor)]);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(SyncError::UpstreamStatus {
                status: status.as_u16(),
                body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
            });
        }

        let parsed: RankingsResponse = serde_json::from_str(&body)?;

        debug!(
            discipline = %discipline,
            ranking_type = %ranking_type,
            cursor = cursor.unwrap_or("<first>"),
            records = parsed.ranking.len(),
            has_next = parsed.cursor_string.is_some(),
            "Fetched rankings page"
        );

        Ok(RankingPage {
            records: parsed.ranking.into_iter().map(RankingRecord::from).collect(),
            next_cursor: parsed.cursor_string,
        })
    }
}
