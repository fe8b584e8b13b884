use anyhow::{Error, Result, anyhow};
use redis::{AsyncCommands, Client, aio::MultiplexedConnection};
use tracing::{debug, info};

use crate::{
    clients::storage::SessionStorage, config::Config, models::retry::RetryConfig,
    utils::retry_with_backoff,
};

/// Session storage in Redis. Every key is namespaced by session id and expires
/// with the session TTL.
pub struct RedisStorage {
    connection: MultiplexedConnection,
    namespace: String,
    session_ttl_seconds: u64,
    retry_config: RetryConfig,
}

impl RedisStorage {
    pub async fn connect(config: &Config) -> Result<Self, Error> {
        let redis_url = config
            .redis_url
            .as_deref()
            .ok_or_else(|| anyhow!("REDIS_URL is not set"))?;

        info!("Connecting to Redis session storage");

        let client =
            Client::open(redis_url).map_err(|_| anyhow!("Failed to create redis client"))?;

        let connection = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|_| anyhow!("Failed to connect to redis client"))?;

        info!(session_id = %config.session_id, "Redis connection established");

        Ok(Self {
            connection,
            namespace: format!("session:{}", config.session_id),
            session_ttl_seconds: config.session_ttl_seconds,
            retry_config: config.retry_config(),
        })
    }

    fn key(&self, key: &str) -> String {
        format!("{}:{}", self.namespace, key)
    }
}

impl SessionStorage for RedisStorage {
    async fn get(&mut self, key: &str) -> Result<Option<String>, Error> {
        let key = self.key(key);

        let value: Option<String> = self
            .connection
            .get(&key)
            .await
            .map_err(|e| anyhow!("Failed to read session key '{}': {}", key, e))?;

        Ok(value)
    }

    async fn set(&mut self, key: &str, value: String) -> Result<(), Error> {
        let key = self.key(key);
        let ttl = self.session_ttl_seconds;

        retry_with_backoff(&self.retry_config, || {
            let key = key.clone();
            let value = value.clone();
            let mut conn = self.connection.clone();

            async move {
                conn.set_ex::<_, _, ()>(&key, value, ttl)
                    .await
                    .map_err(|e| e.to_string())
            }
        })
        .await
        .map_err(|e| anyhow!("Failed to write session key '{}': {}", key, e))?;

        debug!(key = %key, ttl_seconds = ttl, "Session key written");

        Ok(())
    }

    async fn health_check(&mut self) -> Result<(), Error> {
        self.connection
            .ping::<String>()
            .await
            .map_err(|e| anyhow!("Redis ping failed: {}", e))?;

        Ok(())
    }
}
