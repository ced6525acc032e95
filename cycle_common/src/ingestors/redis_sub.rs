//! # Subscribe-Channel Ingestor
//!
//! Connects to the Redis Pub/Sub channel the sensor controller publishes to
//! and hands every payload to the ingestion pipeline, one message at a time.
//! That single-message delivery is what serializes the whole pipeline.
//!
//! The connection lifecycle is an explicit state machine
//! (`Disconnected → Connecting → Connected → Disconnected`) with exponential
//! backoff between attempts. The backoff resets once a subscription is
//! established, and every wait point also listens for the process shutdown
//! signal so the ingestor never outlives the server.

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::sync::broadcast;
use tokio::time::sleep;

use crate::core::pipeline::IngestPipeline;

/// Default backoff parameters for the reconnect loop.
pub const RECONNECT_BASE_DELAY: Duration = Duration::from_secs(1);
pub const RECONNECT_MULTIPLIER: u32 = 2;
pub const RECONNECT_MAX_DELAY: Duration = Duration::from_secs(60);

/// Connection lifecycle of the subscribe channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Disconnected,
    Connecting,
    Connected,
}

/// Configuration for the subscribe-channel connection.
#[derive(Debug, Clone)]
pub struct RedisSubConfig {
    /// Redis URL (e.g. `redis://127.0.0.1/`).
    pub url: String,
    /// Pub/Sub channel the controller publishes cycle events to.
    pub channel: String,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RedisSubConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1/".to_string(),
            channel: "factory/cycle".to_string(),
            base_delay: RECONNECT_BASE_DELAY,
            max_delay: RECONNECT_MAX_DELAY,
        }
    }
}

pub struct RedisSubIngestor {
    config: RedisSubConfig,
    pipeline: Arc<IngestPipeline>,
}

impl RedisSubIngestor {
    pub fn new(config: RedisSubConfig, pipeline: Arc<IngestPipeline>) -> Self {
        Self { config, pipeline }
    }

    /// Primary execution loop with reconnection. Runs until `shutdown`
    /// fires.
    pub async fn run(&self, mut shutdown: broadcast::Receiver<()>) {
        let mut link = LinkState::Disconnected;
        let mut delay = self.config.base_delay;

        loop {
            self.advance(&mut link, LinkState::Connecting);
            log::info!(
                "Connecting to subscribe channel '{}' at {}",
                self.config.channel,
                self.config.url
            );

            match self.subscribe().await {
                Ok(mut pubsub) => {
                    self.advance(&mut link, LinkState::Connected);
                    // A successful subscription resets the backoff.
                    delay = self.config.base_delay;

                    let mut stream = pubsub.on_message();
                    loop {
                        tokio::select! {
                            _ = shutdown.recv() => {
                                log::info!("Subscribe-channel ingestor shutting down.");
                                return;
                            }
                            msg = stream.next() => match msg {
                                Some(msg) => {
                                    self.pipeline.ingest(msg.get_payload_bytes()).await;
                                }
                                None => {
                                    log::warn!("Subscribe channel closed by server.");
                                    break;
                                }
                            }
                        }
                    }
                }
                Err(e) => {
                    log::error!("Failed to subscribe to '{}': {}", self.config.channel, e);
                }
            }

            self.advance(&mut link, LinkState::Disconnected);
            log::info!("Retrying subscribe channel in {:?}", delay);
            tokio::select! {
                _ = shutdown.recv() => {
                    log::info!("Subscribe-channel ingestor shutting down.");
                    return;
                }
                _ = sleep(delay) => {}
            }
            delay = (delay * RECONNECT_MULTIPLIER).min(self.config.max_delay);
        }
    }

    async fn subscribe(&self) -> redis::RedisResult<redis::aio::PubSub> {
        let client = redis::Client::open(self.config.url.as_str())?;
        let mut pubsub = client.get_async_pubsub().await?;
        pubsub.subscribe(&self.config.channel).await?;
        log::info!("Subscribed to channel '{}'", self.config.channel);
        Ok(pubsub)
    }

    fn advance(&self, link: &mut LinkState, next: LinkState) {
        if *link != next {
            log::debug!(
                "Subscribe channel '{}': {:?} -> {:?}",
                self.config.channel,
                *link,
                next
            );
            *link = next;
        }
    }
}
