use std::{sync::Arc, time::Duration};

use anyhow::{Error, Result, anyhow};
use futures_util::StreamExt;
use reqwest::{Client, Url, header::ACCEPT};
use tokio::{
    sync::{oneshot, watch},
    task::JoinHandle,
};
use tracing::{debug, info, warn};

use crate::{
    clients::{storage::SessionStorage, toast::Toaster},
    config::Config,
    models::{event::SseDecoder, notification::SubscriberId},
    store::SharedStore,
    utils::process_frame,
};

struct Channel {
    subscriber: SubscriberId,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
    done: watch::Receiver<bool>,
}

impl Channel {
    fn stop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }

    fn is_open(&self) -> bool {
        !*self.done.borrow() && self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    async fn join(&mut self) {
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(subscriber = %self.subscriber, error = %e, "Notification channel task failed");
            }
        }
    }
}

/// Owns at most one server push channel, scoped to a single subscriber.
///
/// A channel that fails or is closed by the server stays closed; reopening it
/// is up to whoever owns the transport.
pub struct EventTransport<S: SessionStorage> {
    http_client: Client,
    config: Config,
    store: SharedStore<S>,
    toaster: Arc<dyn Toaster>,
    channel: Option<Channel>,
}

impl<S: SessionStorage> EventTransport<S> {
    pub fn new(
        config: &Config,
        store: SharedStore<S>,
        toaster: Arc<dyn Toaster>,
    ) -> Result<Self, Error> {
        let http_client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .build()
            .map_err(|_| anyhow!("Failed to create HTTP client"))?;

        Ok(Self {
            http_client,
            config: config.clone(),
            store,
            toaster,
            channel: None,
        })
    }

    pub async fn connect(&mut self, subscriber: SubscriberId) {
        if let Some(channel) = &self.channel {
            if channel.subscriber == subscriber && channel.is_open() {
                debug!(subscriber = %subscriber, "Notification channel already open");
                return;
            }
        }

        self.disconnect().await;

        let url = match self.config.stream_url(subscriber.as_str()) {
            Ok(url) => url,
            Err(e) => {
                warn!(subscriber = %subscriber, error = %e, "Cannot open notification channel");
                return;
            }
        };
        let (shutdown, shutdown_rx) = oneshot::channel();
        let (done_tx, done) = watch::channel(false);

        info!(subscriber = %subscriber, url = %url, "Opening notification channel");

        let channel = run_channel(
            self.http_client.clone(),
            url,
            subscriber.clone(),
            Arc::clone(&self.store),
            Arc::clone(&self.toaster),
            shutdown_rx,
        );
        let task = tokio::spawn(async move {
            channel.await;
            let _ = done_tx.send(true);
        });

        self.channel = Some(Channel {
            subscriber,
            shutdown: Some(shutdown),
            task: Some(task),
            done,
        });
    }

    /// Closes the current channel, letting a frame that is already being
    /// processed finish first. No-op when nothing is open.
    pub async fn disconnect(&mut self) {
        let Some(mut channel) = self.channel.take() else {
            return;
        };

        channel.stop();
        channel.join().await;

        debug!(subscriber = %channel.subscriber, "Notification channel disconnected");
    }

    pub fn is_open(&self) -> bool {
        self.channel.as_ref().is_some_and(Channel::is_open)
    }

    pub fn subscriber(&self) -> Option<&SubscriberId> {
        self.channel.as_ref().map(|channel| &channel.subscriber)
    }

    /// Resolves once the current channel has closed, whether on its own or
    /// through `disconnect`. The returned future does not borrow the
    /// transport, so callers can release any lock around it before waiting.
    pub fn closed(&self) -> impl Future<Output = ()> + Send + 'static {
        let done = self.channel.as_ref().map(|channel| channel.done.clone());

        async move {
            if let Some(mut done) = done {
                // An error means the task went away without reporting, which
                // is closed as well.
                let _ = done.wait_for(|closed| *closed).await;
            }
        }
    }
}

async fn run_channel<S: SessionStorage>(
    http_client: Client,
    url: Url,
    subscriber: SubscriberId,
    store: SharedStore<S>,
    toaster: Arc<dyn Toaster>,
    mut shutdown: oneshot::Receiver<()>,
) {
    let request = http_client
        .get(url)
        .header(ACCEPT, "text/event-stream")
        .send();

    let response = tokio::select! {
        biased;
        _ = &mut shutdown => return,
        response = request => response,
    };

    let response = match response {
        Ok(response) => response,
        Err(e) => {
            warn!(subscriber = %subscriber, error = %e, "Notification channel failed to open");
            return;
        }
    };

    if !response.status().is_success() {
        warn!(
            subscriber = %subscriber,
            status = %response.status(),
            "Notification channel rejected by server"
        );
        return;
    }

    info!(subscriber = %subscriber, "Notification channel open");

    let mut stream = response.bytes_stream();
    let mut decoder = SseDecoder::new();

    loop {
        let chunk = tokio::select! {
            biased;
            _ = &mut shutdown => {
                debug!(subscriber = %subscriber, "Notification channel shutting down");
                break;
            }
            chunk = stream.next() => chunk,
        };

        match chunk {
            Some(Ok(bytes)) => {
                for frame in decoder.feed(&bytes) {
                    process_frame(&frame, &store, toaster.as_ref()).await;
                }
            }
            Some(Err(e)) => {
                warn!(subscriber = %subscriber, error = %e, "Notification channel interrupted");
                break;
            }
            None => {
                info!(subscriber = %subscriber, "Notification channel closed by server");
                break;
            }
        }
    }
}

impl<S: SessionStorage> Drop for EventTransport<S> {
    fn drop(&mut self) {
        if let Some(mut channel) = self.channel.take() {
            channel.stop();
        }
    }
}
