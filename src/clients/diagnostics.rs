use reqwest::Client;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::{config::Config, models::notification::SubscriberId};

/// Asks the backend to push a synthetic notification to a subscriber.
pub struct DiagnosticClient {
    http_client: Client,
    config: Config,
}

impl DiagnosticClient {
    pub fn new(config: &Config) -> Self {
        Self {
            http_client: Client::new(),
            config: config.clone(),
        }
    }

    /// Fire-and-forget: the outcome is only logged. The returned handle may be
    /// dropped.
    pub fn trigger(&self, subscriber: &SubscriberId) -> JoinHandle<()> {
        let url = self.config.test_url(subscriber.as_str());
        let http_client = self.http_client.clone();
        let subscriber = subscriber.clone();

        tokio::spawn(async move {
            let url = match url {
                Ok(url) => url,
                Err(e) => {
                    warn!(subscriber = %subscriber, error = %e, "Cannot request test notification");
                    return;
                }
            };

            debug!(subscriber = %subscriber, url = %url, "Requesting test notification");

            match http_client.get(url).send().await {
                Ok(response) if response.status().is_success() => {
                    info!(subscriber = %subscriber, "Test notification requested");
                }
                Ok(response) => {
                    warn!(
                        subscriber = %subscriber,
                        status = %response.status(),
                        "Test notification request rejected"
                    );
                }
                Err(e) => {
                    warn!(subscriber = %subscriber, error = %e, "Test notification request failed");
                }
            }
        })
    }
}
