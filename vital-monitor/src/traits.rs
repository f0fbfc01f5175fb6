use crate::types::{RawResponse, RequestBody, TransportError};
use async_trait::async_trait;
use url::Url;

/// Trait for delivering an encoded prediction request to the service
#[async_trait]
pub trait PredictionTransport: Send + Sync {
    /// Human-readable name for logs
    fn transport_name(&self) -> String;

    /// POST `body` to `url` and hand back whatever came back.
    /// Non-2xx statuses are not errors at this layer.
    async fn send(&self, url: &Url, body: RequestBody) -> Result<RawResponse, TransportError>;
}
