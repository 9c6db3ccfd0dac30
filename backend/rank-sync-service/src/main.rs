use anyhow::Context;
use db_pool::{create_pool, DbConfig};
use rank_sync_service::services::{
    ClientCredentialsProvider, MySqlHighestRankStore, OsuRankingClient, RedisScoreCache,
};
use rank_sync_service::{Config, PaginationDriver, RoundRobinScheduler, SyncSettings};
use redis_utils::RedisPool;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("Failed to load config")?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if config.service.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_current_span(true))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer())
            .init();
    }

    info!(
        "Starting {} for disciplines {:?}",
        config.service.service_name, config.sync.disciplines
    );

    // Durable highest-rank store
    let db_config = DbConfig {
        max_connections: config.database.max_connections,
        min_connections: config.database.min_connections,
        acquire_timeout_secs: config.database.acquire_timeout_secs,
        ..DbConfig::new(&config.service.service_name, &config.database.url)
    };
    db_config.log_config();
    let pool = create_pool(db_config)
        .await
        .context("Failed to create database pool")?;

    if config.database.run_migrations {
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("Failed to run database migrations")?;
        info!("Database migrations completed successfully");
    }

    // Score cache
    let redis = RedisPool::connect(&config.redis.url).await?;
    if let Err(err) = redis.ping().await {
        warn!(
            addr = redis.addr_label(),
            error = %err,
            "Redis PING failed at startup, continuing with reconnecting manager"
        );
    }
    let cache = Arc::new(RedisScoreCache::new(redis.manager()));

    // Upstream
    let http = OsuRankingClient::build_http_client(Duration::from_secs(
        config.osu.request_timeout_secs,
    ))?;
    let credentials = Arc::new(ClientCredentialsProvider::new(
        http.clone(),
        &config.osu.oauth_base_url,
        config.osu.client_id.clone(),
        config.osu.client_secret.clone(),
    ));
    let source = Arc::new(OsuRankingClient::new(
        http,
        &config.osu.api_base_url,
        credentials,
    ));

    let driver = Arc::new(PaginationDriver::new(
        source,
        cache.clone(),
        cache,
        Arc::new(MySqlHighestRankStore::new(pool)),
        SyncSettings::from(&config.sync),
    ));
    let scheduler = RoundRobinScheduler::from_config(driver, &config.sync);

    if config.sync.run_once {
        let outcomes = scheduler.run_once().await;
        let completed = outcomes.iter().filter(|o| o.is_completed()).count();
        info!(
            completed,
            abandoned = outcomes.len() - completed,
            "One-shot rankings sync finished"
        );
        return Ok(());
    }

    scheduler
        .run(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!(error = %err, "Failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
        })
        .await;

    info!("Rankings sync stopped");
    Ok(())
}
