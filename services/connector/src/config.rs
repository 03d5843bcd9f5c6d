use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration for the connector
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Service configuration
    pub service: ServiceConfig,
    /// Kafka input configuration
    pub kafka: KafkaConfig,
    /// Annotation rendering configuration
    #[serde(default)]
    pub annotation: AnnotationConfig,
    /// HTTP decision output (upload + decision POST); disabled when absent
    pub http_output: Option<HttpOutputConfig>,
    /// Local artifact output; disabled when absent
    pub local_output: Option<LocalOutputConfig>,
}

/// Service-level configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// Service name for logging/metrics
    #[serde(default = "default_service_name")]
    pub name: String,
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Metrics port
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,
}

/// Kafka consumer configuration
#[derive(Debug, Clone, Deserialize)]
pub struct KafkaConfig {
    /// Kafka bootstrap servers
    pub bootstrap_servers: String,
    /// Consumer group ID
    #[serde(default = "default_consumer_group")]
    pub consumer_group: String,
    /// Topic carrying inbound analytics messages
    #[serde(default = "default_input_topic")]
    pub input_topic: String,
    /// Enable SSL
    #[serde(default)]
    pub ssl_enabled: bool,
    /// SSL CA certificate path
    pub ssl_ca_location: Option<String>,
    /// SASL username
    pub sasl_username: Option<String>,
    /// SASL password
    pub sasl_password: Option<String>,
    /// Auto offset reset policy
    #[serde(default = "default_auto_offset_reset")]
    pub auto_offset_reset: String,
    /// Session timeout in milliseconds
    #[serde(default = "default_session_timeout_ms")]
    pub session_timeout_ms: u32,
    /// Max poll interval in milliseconds
    #[serde(default = "default_max_poll_interval_ms")]
    pub max_poll_interval_ms: u32,
}

/// Which detections get drawn, and how
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationStyle {
    /// Rectangles with labels for every detection in the message
    #[default]
    Boxes,
    /// Filled circles at box centers, only for detections whose timestamp
    /// matches the frame's
    CenterPoints,
}

/// Annotation rendering configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AnnotationConfig {
    /// Detection-selection and drawing policy
    #[serde(default)]
    pub style: AnnotationStyle,
    /// Label font; falls back to a list of well-known system fonts
    pub font_path: Option<PathBuf>,
}

/// Decision sink authentication (password grant)
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Token endpoint URL
    pub token_endpoint_url: String,
    pub client_id: String,
    pub username: String,
    pub password: String,
}

/// HTTP decision output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HttpOutputConfig {
    /// Decision endpoint URL
    pub target_endpoint: String,
    /// Request timeout in seconds
    #[serde(default = "default_sink_timeout_secs")]
    pub timeout_secs: u64,
    /// Module name reported in outbound decisions
    pub module_name: String,
    /// Bearer token acquisition; unauthenticated when absent
    pub auth: Option<AuthConfig>,
    /// Object storage for annotated artifacts
    pub s3: S3Config,
}

/// S3 storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct S3Config {
    /// Bucket for annotated artifacts
    pub bucket: String,
    /// AWS region
    #[serde(default = "default_region")]
    pub region: String,
    /// Custom endpoint URL (for MinIO, LocalStack, etc.)
    pub endpoint_url: Option<String>,
    /// Force path-style access (required for MinIO)
    #[serde(default)]
    pub force_path_style: bool,
    /// Static access key; falls back to the ambient credential chain
    pub access_key_id: Option<String>,
    /// Static secret key
    pub secret_access_key: Option<String>,
}

/// Local artifact output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LocalOutputConfig {
    /// Directory receiving `{message_id}/annotated.jpg`
    pub path: PathBuf,
}

// Default value functions
fn default_service_name() -> String {
    "aic-connector".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_metrics_port() -> u16 {
    8000
}

fn default_consumer_group() -> String {
    "aic-connector".to_string()
}

fn default_input_topic() -> String {
    "sae.messages".to_string()
}

fn default_auto_offset_reset() -> String {
    "earliest".to_string()
}

fn default_session_timeout_ms() -> u32 {
    30000
}

fn default_max_poll_interval_ms() -> u32 {
    300000
}

fn default_sink_timeout_secs() -> u64 {
    5
}

fn default_region() -> String {
    "us-east-1".to_string()
}

impl Config {
    /// Load configuration from environment and config files
    pub fn load() -> anyhow::Result<Self> {
        let config = config::Config::builder()
            // Start with default values
            .set_default("service.name", "aic-connector")?
            .set_default("service.log_level", "info")?
            .set_default("service.metrics_port", 8000)?
            // Add config file if present
            .add_source(config::File::with_name("config/connector").required(false))
            .add_source(config::File::with_name("/etc/connector/connector").required(false))
            // Override with environment variables
            // CONNECTOR__KAFKA__BOOTSTRAP_SERVERS -> kafka.bootstrap_servers
            .add_source(
                config::Environment::with_prefix("CONNECTOR")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize().map_err(Into::into)
    }

    /// Get decision sink timeout as Duration
    pub fn sink_timeout(&self) -> Option<Duration> {
        self.http_output
            .as_ref()
            .map(|h| Duration::from_secs(h.timeout_secs))
    }
}

impl HttpOutputConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
            metrics_port: default_metrics_port(),
        }
    }
}
