use anyhow::{Context, Result};
use redis::aio::ConnectionManager;
use redis::{Client, ConnectionAddr, ConnectionInfo, IntoConnectionInfo};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

/// Shared Redis connection manager guarded by a Tokio mutex.
pub type SharedConnectionManager = Arc<Mutex<ConnectionManager>>;

/// Redis connection pool backed by a single auto-reconnecting manager.
pub struct RedisPool {
    manager: SharedConnectionManager,
    addr_label: String,
}

impl RedisPool {
    pub async fn connect(redis_url: &str) -> Result<Self> {
        let info: ConnectionInfo = redis_url
            .into_connection_info()
            .context("failed to parse REDIS_URL connection string")?;
        let addr_label = describe_addr(&info.addr);

        let client = Client::open(info).context("failed to construct Redis client")?;
        let connection_manager = ConnectionManager::new(client)
            .await
            .context("failed to initialize Redis connection manager")?;

        info!("Redis connection manager ready at {}", addr_label);

        Ok(Self {
            manager: Arc::new(Mutex::new(connection_manager)),
            addr_label,
        })
    }

    pub fn manager(&self) -> SharedConnectionManager {
        self.manager.clone()
    }

    pub fn addr_label(&self) -> &str {
        &self.addr_label
    }

    /// Round-trip a PING through the shared manager.
    pub async fn ping(&self) -> Result<()> {
        let mut conn = self.manager.lock().await;
        let reply: String = redis::cmd("PING")
            .query_async(&mut *conn)
            .await
            .context("Redis PING failed")?;
        if reply != "PONG" {
            anyhow::bail!("unexpected PING reply from Redis: {}", reply);
        }
        Ok(())
    }
}

/// Human-readable address for logs; never includes credentials.
pub fn describe_addr(addr: &ConnectionAddr) -> String {
    match addr {
        ConnectionAddr::Tcp(host, port) => format!("{}:{}", host, port),
        ConnectionAddr::TcpTls { host, port, .. } => format!("{}:{} (tls)", host, port),
        other => format!("{:?}", other),
    }
}
