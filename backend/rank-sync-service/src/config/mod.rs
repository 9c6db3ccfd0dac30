use crate::error::{Result, SyncError};
use crate::models::{Discipline, RankingType};
use std::env;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub service: ServiceConfig,
    pub redis: RedisConfig,
    pub database: DatabaseConfig,
    pub osu: OsuApiConfig,
    pub sync: SyncConfig,
}

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub service_name: String,
    /// Emit JSON log lines instead of human-readable ones
    pub json_logs: bool,
}

#[derive(Debug, Clone)]
pub struct RedisConfig {
    pub url: String,
}

#[derive(Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
    pub run_migrations: bool,
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("url", &"[REDACTED]")
            .field("max_connections", &self.max_connections)
            .field("min_connections", &self.min_connections)
            .field("acquire_timeout_secs", &self.acquire_timeout_secs)
            .field("run_migrations", &self.run_migrations)
            .finish()
    }
}

#[derive(Clone)]
pub struct OsuApiConfig {
    pub client_id: String,
    pub client_secret: String,
    pub api_base_url: String,
    pub oauth_base_url: String,
    pub request_timeout_secs: u64,
}

impl std::fmt::Debug for OsuApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OsuApiConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("api_base_url", &self.api_base_url)
            .field("oauth_base_url", &self.oauth_base_url)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Round-robin order of disciplines
    pub disciplines: Vec<Discipline>,
    pub ranking_type: RankingType,
    /// Entries evaluated per pass
    pub max_entries: usize,
    pub page_delay_ms: u64,
    pub max_retries: u32,
    pub backoff_step_secs: u64,
    pub cycle_interval_secs: u64,
    /// Sync every discipline once and exit
    pub run_once: bool,
}

impl SyncConfig {
    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }

    pub fn backoff_step(&self) -> Duration {
        Duration::from_secs(self.backoff_step_secs)
    }

    pub fn cycle_interval(&self) -> Duration {
        Duration::from_secs(self.cycle_interval_secs)
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            disciplines: Discipline::ALL.to_vec(),
            ranking_type: RankingType::Score,
            max_entries: 1000,
            page_delay_ms: 50,
            max_retries: 4,
            backoff_step_secs: 10,
            cycle_interval_secs: 30,
            run_once: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build config from any key lookup (environment, test map).
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let sync_defaults = SyncConfig::default();

        let disciplines = match lookup("SYNC_DISCIPLINES") {
            Some(raw) => parse_disciplines(&raw)?,
            None => sync_defaults.disciplines,
        };

        let config = Config {
            service: ServiceConfig {
                service_name: lookup("SERVICE_NAME")
                    .unwrap_or_else(|| "rank-sync-service".to_string()),
                json_logs: lookup("LOG_FORMAT")
                    .map(|v| v.eq_ignore_ascii_case("json"))
                    .unwrap_or(false),
            },
            redis: RedisConfig {
                url: lookup("REDIS_URL").unwrap_or_else(|| "redis://127.0.0.1:6379".to_string()),
            },
            database: DatabaseConfig {
                url: required(&lookup, "DATABASE_URL")?,
                max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", 5)?,
                min_connections: parse_or(&lookup, "DB_MIN_CONNECTIONS", 1)?,
                acquire_timeout_secs: parse_or(&lookup, "DB_ACQUIRE_TIMEOUT_SECS", 10)?,
                run_migrations: parse_or(&lookup, "RUN_MIGRATIONS", false)?,
            },
            osu: OsuApiConfig {
                client_id: required(&lookup, "OSU_CLIENT_ID")?,
                client_secret: required(&lookup, "OSU_CLIENT_SECRET")?,
                api_base_url: lookup("OSU_API_BASE_URL")
                    .unwrap_or_else(|| "https://osu.ppy.sh/api/v2".to_string()),
                oauth_base_url: lookup("OSU_OAUTH_BASE_URL")
                    .unwrap_or_else(|| "https://osu.ppy.sh".to_string()),
                request_timeout_secs: parse_or(&lookup, "OSU_REQUEST_TIMEOUT_SECS", 30)?,
            },
            sync: SyncConfig {
                disciplines,
                ranking_type: parse_or(&lookup, "SYNC_RANKING_TYPE", sync_defaults.ranking_type)?,
                max_entries: parse_or(&lookup, "SYNC_MAX_ENTRIES", sync_defaults.max_entries)?,
                page_delay_ms: parse_or(&lookup, "SYNC_PAGE_DELAY_MS", sync_defaults.page_delay_ms)?,
                max_retries: parse_or(&lookup, "SYNC_MAX_RETRIES", sync_defaults.max_retries)?,
                backoff_step_secs: parse_or(
                    &lookup,
                    "SYNC_BACKOFF_STEP_SECS",
                    sync_defaults.backoff_step_secs,
                )?,
                cycle_interval_secs: parse_or(
                    &lookup,
                    "SYNC_CYCLE_INTERVAL_SECS",
                    sync_defaults.cycle_interval_secs,
                )?,
                run_once: parse_or(&lookup, "SYNC_RUN_ONCE", sync_defaults.run_once)?,
            },
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.sync.max_entries == 0 {
            return Err(SyncError::Config("SYNC_MAX_ENTRIES must be positive".into()));
        }
        if self.sync.cycle_interval_secs == 0 {
            return Err(SyncError::Config(
                "SYNC_CYCLE_INTERVAL_SECS must be positive".into(),
            ));
        }
        Ok(())
    }
}

fn required<F>(lookup: &F, key: &str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| SyncError::Config(format!("{key} must be set")))
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| SyncError::Config(format!("{key} is invalid: {e}"))),
        None => Ok(default),
    }
}

fn parse_disciplines(raw: &str) -> Result<Vec<Discipline>> {
    let disciplines = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<Discipline>().map_err(SyncError::Config))
        .collect::<Result<Vec<_>>>()?;

    if disciplines.is_empty() {
        return Err(SyncError::Config(
            "SYNC_DISCIPLINES must name at least one discipline".into(),
        ));
    }
    Ok(disciplines)
}
