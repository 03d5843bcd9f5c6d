//! Annotation Connector
//!
//! A single stage in a video-analytics pipeline: it consumes serialized
//! analytics messages (a video frame plus its detections), renders an
//! annotated JPEG, uploads it to object storage and forwards a decision
//! record with a link to the artifact to a downstream HTTP endpoint.
//!
//! Each message is processed in one synchronous pass, in full isolation
//! from its neighbours:
//!
//! ```text
//! Kafka Topic               Connector                     Outputs
//! ┌──────────────┐     ┌──────────────────┐       ┌─────────────────────┐
//! │ sae.messages │────▶│ unpack proto     │       │ S3/MinIO            │
//! └──────────────┘     │ generate id      │──────▶│  {id}/annotated.jpg │
//!                      │ annotate frame   │       └─────────────────────┘
//!                      │ encode JPEG      │       ┌─────────────────────┐
//!                      │ build decision   │──────▶│ Decision endpoint   │
//!                      └──────────────────┘       │  (bearer auth POST) │
//!                                                 └─────────────────────┘
//! ```
//!
//! Failures in any stage abort only the affected message; the stage keeps
//! consuming.

pub mod annotator;
pub mod config;
pub mod connector;
pub mod decision;
pub mod http_output;
pub mod kafka_consumer;
pub mod sae;
pub mod storage;

pub use annotator::{Annotator, CodecError};
pub use config::{AnnotationStyle, Config};
pub use connector::{generate_message_id, Connector, StageError};
pub use decision::{build_decision, DecisionPayload, ANNOTATED_FILE_NAME};
pub use http_output::{HttpOutput, SinkError};
pub use kafka_consumer::{ConsumerError, KafkaInput};
pub use sae::SaeMessage;
pub use storage::{ObjectStore, S3ObjectStore, StorageError};
