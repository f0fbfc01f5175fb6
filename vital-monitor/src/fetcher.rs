use crate::traits::PredictionTransport;
use crate::types::{ClientConfig, FormPart, PartContent, RawResponse, RequestBody, Result, TransportError};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;
use url::Url;

/// Transport backed by a pooled `reqwest` client.
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let mut builder = Client::builder().user_agent(&config.user_agent);
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(TransportError::from)?;

        Ok(Self { client })
    }

    fn build_form(parts: Vec<FormPart>) -> std::result::Result<Form, TransportError> {
        let mut form = Form::new();
        for part in parts {
            form = match part.content {
                PartContent::Text(text) => form.text(part.name, text),
                PartContent::File { filename, content_type, bytes } => {
                    let file = Part::bytes(bytes).file_name(filename).mime_str(&content_type)?;
                    form.part(part.name, file)
                }
            };
        }
        Ok(form)
    }
}

fn classify(error: reqwest::Error) -> TransportError {
    if error.is_connect() || error.is_timeout() {
        TransportError::Connection(error.to_string())
    } else {
        TransportError::Http(error)
    }
}

#[async_trait]
impl PredictionTransport for HttpTransport {
    fn transport_name(&self) -> String {
        "reqwest".to_string()
    }

    async fn send(&self, url: &Url, body: RequestBody) -> std::result::Result<RawResponse, TransportError> {
        let request = self.client.post(url.clone());
        let request = match body {
            RequestBody::Json(value) => request.json(&value),
            RequestBody::Multipart(parts) => request.multipart(Self::build_form(parts)?),
        };

        let response = request.send().await.map_err(classify)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(classify)?;

        debug!("POST {} -> {} ({} bytes)", url, status, body.len());
        Ok(RawResponse { status, body })
    }
}

/// A request as seen by `MockTransport`.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub url: Url,
    pub body: RequestBody,
}

#[derive(Debug, Clone)]
enum MockReply {
    Respond(RawResponse),
    Unreachable,
}

/// Mock transport for development and testing.
///
/// Replies are served first-in first-out; every request is recorded whether or
/// not a reply was queued for it. An empty queue behaves like a dead service.
pub struct MockTransport {
    replies: Mutex<VecDeque<(Duration, MockReply)>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub async fn push_json(&self, status: u16, body: serde_json::Value) {
        self.push_delayed_json(Duration::ZERO, status, body).await;
    }

    /// Queues a JSON reply that is only delivered after `delay`.
    pub async fn push_delayed_json(&self, delay: Duration, status: u16, body: serde_json::Value) {
        let reply = MockReply::Respond(RawResponse { status, body: body.to_string() });
        self.replies.lock().await.push_back((delay, reply));
    }

    pub async fn push_text(&self, status: u16, body: impl Into<String>) {
        let reply = MockReply::Respond(RawResponse { status, body: body.into() });
        self.replies.lock().await.push_back((Duration::ZERO, reply));
    }

    pub async fn push_unreachable(&self) {
        self.replies.lock().await.push_back((Duration::ZERO, MockReply::Unreachable));
    }

    pub async fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().await.clone()
    }

    pub async fn request_count(&self) -> usize {
        self.requests.lock().await.len()
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PredictionTransport for MockTransport {
    fn transport_name(&self) -> String {
        "mock".to_string()
    }

    async fn send(&self, url: &Url, body: RequestBody) -> std::result::Result<RawResponse, TransportError> {
        self.requests.lock().await.push(RecordedRequest { url: url.clone(), body });

        let next = self.replies.lock().await.pop_front();
        let (delay, reply) = next.unwrap_or((Duration::ZERO, MockReply::Unreachable));
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        match reply {
            MockReply::Respond(response) => Ok(response),
            MockReply::Unreachable => Err(TransportError::Connection(format!("connection refused: {}", url))),
        }
    }
}
