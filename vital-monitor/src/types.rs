use std::time::Duration;

// Use the interfaces crate for the shared data model
pub use interfaces::defs::{
    PredictionRequest, PredictionResult, ResultValue, ValidationError, VitalRecord, WindowMeta,
    WindowPayload,
};
pub use interfaces::defs::{DEFAULT_BPM, HEART_RATE_FIELD, MAX_WINDOW_ROWS, MIN_WINDOW_ROWS};

pub const API_BASE_ENV: &str = "VITALS_API_BASE";
pub const TIMEOUT_ENV: &str = "VITALS_TIMEOUT_SECS";
pub const DEFAULT_API_BASE: &str = "http://127.0.0.1:5000";

pub const SINGLE_ENDPOINT: &str = "predict";
pub const WINDOW_ENDPOINT: &str = "predict_window";

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub user_agent: String,
    /// Per-request timeout. `None` leaves the transport default in place.
    pub timeout_seconds: Option<u64>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE.to_string(),
            user_agent: "Vital-Monitor/0.1".to_string(),
            timeout_seconds: None,
        }
    }
}

impl ClientConfig {
    /// Reads `VITALS_API_BASE` and `VITALS_TIMEOUT_SECS`, falling back to defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(base) = std::env::var(API_BASE_ENV) {
            if !base.trim().is_empty() {
                config.base_url = base.trim().to_string();
            }
        }
        config.timeout_seconds = std::env::var(TIMEOUT_ENV)
            .ok()
            .and_then(|s| s.trim().parse().ok());
        config
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_seconds.map(Duration::from_secs)
    }
}

/// Which endpoint of the prediction service a request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Single,
    Window,
}

impl Endpoint {
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::Single => SINGLE_ENDPOINT,
            Endpoint::Window => WINDOW_ENDPOINT,
        }
    }
}

/// A body ready to hand to a transport.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Json(serde_json::Value),
    Multipart(Vec<FormPart>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FormPart {
    pub name: String,
    pub content: PartContent,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PartContent {
    Text(String),
    File {
        filename: String,
        content_type: String,
        bytes: Vec<u8>,
    },
}

impl FormPart {
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: PartContent::Text(value.into()),
        }
    }

    pub fn file(name: impl Into<String>, filename: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content: PartContent::File {
                filename: filename.into(),
                content_type: content_type.into(),
                bytes,
            },
        }
    }
}

/// Status and body exactly as the transport received them.
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("service unreachable: {0}")]
    Connection(String),

    #[error("HTTP {status}{}", status_detail(.message))]
    Status { status: u16, message: Option<String> },

    #[error("prediction rejected by service: {0}")]
    Rejected(String),
}

fn status_detail(message: &Option<String>) -> String {
    message.as_deref().map(|m| format!(": {}", m)).unwrap_or_default()
}

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("response is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("expected a JSON object, found {found}")]
    NotAnObject { found: &'static str },
}

#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Monitor has been torn down")]
    TornDown,
}

/// Coarse failure class shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Transport,
    Decode,
    Internal,
}

impl MonitorError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MonitorError::Validation(_) => ErrorKind::Validation,
            MonitorError::Transport(_) => ErrorKind::Transport,
            MonitorError::Decode(_) => ErrorKind::Decode,
            MonitorError::InvalidUrl(_)
            | MonitorError::Io(_)
            | MonitorError::Serialization(_)
            | MonitorError::TornDown => {
                ErrorKind::Internal
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, MonitorError>;
