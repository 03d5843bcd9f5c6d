//! Per-message orchestrator.
//!
//! One inbound payload flows through unpack → annotate → upload → decision
//! send. Every failure is contained here: a bad message is logged and
//! skipped, it never stops the stage or leaks into the next message.

use crate::annotator::{Annotator, CodecError};
use crate::config::LocalOutputConfig;
use crate::decision::ANNOTATED_FILE_NAME;
use crate::http_output::{HttpOutput, SinkError};
use crate::sae::SaeMessage;
use crate::storage::{content_type_for, ObjectStore, StorageError};
use chrono::Utc;
use prost::Message;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, error, instrument};
use uuid::Uuid;

/// Failure of a single pipeline stage for a single message
#[derive(Debug, Error)]
pub enum StageError {
    #[error("failed to deserialize inbound message: {0}")]
    Deserialization(#[from] prost::DecodeError),

    #[error("inbound message is missing required field {0}")]
    MissingField(&'static str),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Sink(#[from] SinkError),

    #[error("failed to write local artifact: {0}")]
    LocalOutput(#[from] std::io::Error),
}

/// Generate the identifier correlating one message's artifact and decision:
/// `{UTC YYYYMMDD_HHMMSS}_{6 lowercase hex chars}`.
pub fn generate_message_id() -> String {
    let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
    let uuid = Uuid::new_v4().simple().to_string();
    format!("{}_{}", timestamp, &uuid[..6])
}

/// The connector stage: processes one inbound message at a time
pub struct Connector {
    annotator: Annotator,
    store: Option<Arc<dyn ObjectStore>>,
    sink: Option<HttpOutput>,
    local_output: Option<LocalOutputConfig>,
}

impl Connector {
    pub fn new(
        annotator: Annotator,
        store: Option<Arc<dyn ObjectStore>>,
        sink: Option<HttpOutput>,
        local_output: Option<LocalOutputConfig>,
    ) -> Self {
        Self {
            annotator,
            store,
            sink,
            local_output,
        }
    }

    /// Process one inbound payload. Never fails: all stage errors are
    /// contained, logged and counted here.
    #[instrument(skip(self, payload), fields(payload_bytes = payload.len()))]
    pub async fn process(&self, payload: &[u8]) {
        let started = Instant::now();

        match self.handle_message(payload).await {
            Ok(message_id) => {
                metrics::counter!("connector.messages.processed").increment(1);
                debug!(message_id = %message_id, "Message processed");
            }
            Err(e) => {
                metrics::counter!("connector.messages.failed").increment(1);
                error!(error = %e, "Message processing aborted");
            }
        }

        metrics::histogram!("connector.process.duration_seconds")
            .record(started.elapsed().as_secs_f64());
    }

    /// Run the pipeline stages for one message.
    ///
    /// Unpack and annotate failures abort the message. Local-output, upload
    /// and decision-send failures are contained in place so the remaining
    /// steps still run.
    async fn handle_message(&self, payload: &[u8]) -> Result<String, StageError> {
        let msg = SaeMessage::decode(payload)?;
        let frame = msg.frame.as_ref().ok_or(StageError::MissingField("frame"))?;

        let message_id = generate_message_id();

        let artifact = self.annotator.render(frame, &msg.detections)?;
        metrics::counter!("connector.detections.annotated").increment(msg.detections.len() as u64);

        if let Some(ref local) = self.local_output {
            if let Err(e) = write_local(local, &message_id, &artifact).await {
                error!(message_id = %message_id, error = %e, "Failed to write local artifact");
            }
        }

        if let Some(ref store) = self.store {
            let key = format!("{message_id}/{ANNOTATED_FILE_NAME}");
            match store
                .put(&key, &artifact, content_type_for(ANNOTATED_FILE_NAME))
                .await
            {
                Ok(()) => {
                    metrics::counter!("connector.uploads.completed").increment(1);
                    debug!(message_id = %message_id, key = %key, "Artifact uploaded");
                }
                Err(e) => {
                    metrics::counter!("connector.uploads.failed").increment(1);
                    error!(message_id = %message_id, error = %e, "Artifact upload failed");
                }
            }
        }

        if let Some(ref sink) = self.sink {
            let send_started = Instant::now();
            if let Err(e) = sink.send_decision(frame, &message_id).await {
                error!(message_id = %message_id, error = %e, "Decision send failed");
            }
            metrics::histogram!("connector.decision.send_duration_seconds")
                .record(send_started.elapsed().as_secs_f64());
        }

        Ok(message_id)
    }
}

/// Write the artifact under `{path}/{message_id}/annotated.jpg`
async fn write_local(
    local: &LocalOutputConfig,
    message_id: &str,
    artifact: &[u8],
) -> std::io::Result<()> {
    let dir = local.path.join(message_id);
    tokio::fs::create_dir_all(&dir).await?;
    tokio::fs::write(dir.join(ANNOTATED_FILE_NAME), artifact).await
}
