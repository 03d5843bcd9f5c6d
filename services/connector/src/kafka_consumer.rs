//! Kafka input loop feeding the connector.
//!
//! Messages are processed strictly one at a time, in arrival order. The
//! connector contains all per-message failures, so offsets are committed
//! after every message and nothing is retried.

use crate::config::KafkaConfig;
use crate::connector::Connector;
use futures::StreamExt;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::message::Message;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

/// Errors setting up or driving the input stream
#[derive(Debug, Error)]
pub enum ConsumerError {
    #[error("failed to create consumer: {0}")]
    Creation(String),

    #[error("failed to subscribe to topic: {0}")]
    Subscription(String),
}

/// Kafka-backed input stream for inbound analytics messages
pub struct KafkaInput {
    consumer: StreamConsumer,
    topic: String,
    shutdown_tx: broadcast::Sender<()>,
}

impl KafkaInput {
    /// Create the consumer from configuration
    pub fn new(config: &KafkaConfig) -> Result<Self, ConsumerError> {
        let mut client_config = ClientConfig::new();

        client_config
            .set("bootstrap.servers", &config.bootstrap_servers)
            .set("group.id", &config.consumer_group)
            .set("auto.offset.reset", &config.auto_offset_reset)
            .set("enable.auto.commit", "false")
            .set("session.timeout.ms", config.session_timeout_ms.to_string())
            .set(
                "max.poll.interval.ms",
                config.max_poll_interval_ms.to_string(),
            );

        // Configure SSL if enabled
        if config.ssl_enabled {
            client_config.set("security.protocol", "SASL_SSL");
            if let Some(ref ca_location) = config.ssl_ca_location {
                client_config.set("ssl.ca.location", ca_location);
            }
        }

        // Configure SASL if credentials provided
        if let (Some(ref username), Some(ref password)) =
            (&config.sasl_username, &config.sasl_password)
        {
            client_config
                .set("sasl.mechanisms", "PLAIN")
                .set("sasl.username", username)
                .set("sasl.password", password);
        }

        let consumer: StreamConsumer = client_config
            .create()
            .map_err(|e| ConsumerError::Creation(e.to_string()))?;

        let (shutdown_tx, _) = broadcast::channel(1);

        Ok(Self {
            consumer,
            topic: config.input_topic.clone(),
            shutdown_tx,
        })
    }

    /// Signal the run loop to stop after the in-flight message completes
    pub fn shutdown(&self) {
        info!("Signaling consumer shutdown");
        let _ = self.shutdown_tx.send(());
    }

    /// Consume messages and hand each payload to the connector
    pub async fn run(&self, connector: Arc<Connector>) -> Result<(), ConsumerError> {
        self.consumer
            .subscribe(&[self.topic.as_str()])
            .map_err(|e| ConsumerError::Subscription(e.to_string()))?;

        info!(topic = %self.topic, "Subscribed to input stream");

        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let stream = self.consumer.stream();
        tokio::pin!(stream);

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!("Received shutdown signal");
                    break;
                }
                message_result = stream.next() => {
                    match message_result {
                        Some(Ok(message)) => {
                            metrics::counter!("connector.frames.consumed").increment(1);

                            match message.payload() {
                                Some(payload) => {
                                    debug!(
                                        stream_key = message.topic(),
                                        partition = message.partition(),
                                        offset = message.offset(),
                                        "Received analytics message"
                                    );
                                    connector.process(payload).await;
                                }
                                None => {
                                    warn!(
                                        partition = message.partition(),
                                        offset = message.offset(),
                                        "Skipping message without payload"
                                    );
                                }
                            }

                            // Failed messages are contained by the connector and
                            // never retried, so the offset always moves on.
                            if let Err(e) = self.consumer.commit_message(&message, CommitMode::Async) {
                                warn!(error = %e, "Failed to commit offset");
                            }
                        }
                        Some(Err(e)) => {
                            error!(error = %e, "Kafka consumer error");
                            metrics::counter!("connector.kafka.errors").increment(1);
                        }
                        None => {
                            debug!("Input stream ended");
                            break;
                        }
                    }
                }
            }
        }

        Ok(())
    }
}
