use super::StateStore;
use crate::config::StoreConfig;
use crate::error::Error;
use anyhow::Result;
use async_trait::async_trait;
use deadpool_redis::redis::AsyncCommands;
use deadpool_redis::{Config, Connection, Pool, Runtime};
use log::info;
use std::time::Duration;

/// Redis-backed state store
pub struct RedisStore {
    pool: Pool,
}

impl RedisStore {
    /// Create the connection pool and verify the server answers
    pub async fn connect(config: &StoreConfig) -> Result<Self> {
        let pool = Config::from_url(config.redis_url())
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| Error::Store(format!("Failed to create Redis pool: {}", e)))?;

        let store = Self { pool };
        let mut conn = store.connection().await?;
        deadpool_redis::redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .map_err(|e| Error::Store(format!("Redis did not answer PING: {}", e)))?;

        info!("Connected to Redis at {}", config.redis_addr);
        Ok(store)
    }

    async fn connection(&self) -> Result<Connection> {
        self.pool
            .get()
            .await
            .map_err(|e| Error::Store(format!("Failed to get Redis connection: {}", e)).into())
    }
}

#[async_trait]
impl StateStore for RedisStore {
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()> {
        let mut conn = self.connection().await?;
        let result = match ttl {
            // sub-second TTLs still need at least one second in Redis
            Some(ttl) => conn.set_ex::<_, _, ()>(key, value, ttl.as_secs().max(1)).await,
            None => conn.set::<_, _, ()>(key, value).await,
        };
        result.map_err(|e| Error::Store(format!("Failed to set {}: {}", key, e)))?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.connection().await?;
        let value = conn
            .get::<_, Option<String>>(key)
            .await
            .map_err(|e| Error::Store(format!("Failed to get {}: {}", key, e)))?;
        Ok(value)
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let mut conn = self.connection().await?;
        let exists = conn
            .exists::<_, bool>(key)
            .await
            .map_err(|e| Error::Store(format!("Failed to check {}: {}", key, e)))?;
        Ok(exists)
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.connection().await?;
        conn.del::<_, ()>(key)
            .await
            .map_err(|e| Error::Store(format!("Failed to delete {}: {}", key, e)))?;
        Ok(())
    }
}
