use std::sync::Arc;

use anyhow::{Error, Result};
use notification_feed::{
    api::run_api_server,
    center::NotificationCenter,
    clients::{
        redis::RedisStorage,
        storage::{MemoryStorage, SessionStorage},
        toast::{Toaster, TracingToaster},
    },
    config::Config,
    models::notification::SubscriberId,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::load()?;

    let subscriber = config
        .subscriber_id
        .as_deref()
        .map(SubscriberId::parse)
        .transpose()?;

    let toaster: Arc<dyn Toaster> = Arc::new(TracingToaster);

    if config.redis_url.is_some() {
        let storage = RedisStorage::connect(&config).await?;
        serve(config, storage, toaster, subscriber).await
    } else {
        info!("REDIS_URL not set, keeping session state in memory");
        serve(config, MemoryStorage::new(), toaster, subscriber).await
    }
}

async fn serve<S: SessionStorage>(
    config: Config,
    storage: S,
    toaster: Arc<dyn Toaster>,
    subscriber: Option<SubscriberId>,
) -> Result<(), Error> {
    let center = NotificationCenter::mount(&config, storage, toaster, subscriber).await?;

    run_api_server(&config, Arc::new(center)).await
}
