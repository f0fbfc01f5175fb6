use crate::collector::validate_window;
use crate::fetcher::HttpTransport;
use crate::parser::parse_response;
use crate::traits::PredictionTransport;
use crate::types::{
    ClientConfig, Endpoint, FormPart, MonitorError, PredictionRequest, PredictionResult, RequestBody, Result,
    VitalRecord, WindowPayload,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use url::Url;

/// Multipart field carrying an uploaded CSV window.
pub const FILE_FIELD: &str = "file";
/// Multipart field carrying a window as JSON array text.
pub const ROWS_FIELD: &str = "rows";

/// Stateless client for the prediction service.
///
/// One attempt per call: failures go straight back to the caller.
pub struct PredictionClient {
    base_url: Url,
    transport: Arc<dyn PredictionTransport>,
}

impl PredictionClient {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let transport = Arc::new(HttpTransport::new(config)?);
        Self::with_transport(config, transport)
    }

    pub fn with_transport(config: &ClientConfig, transport: Arc<dyn PredictionTransport>) -> Result<Self> {
        let mut base_url = Url::parse(config.base_url.trim())?;
        // Without a trailing slash `join` would replace the last path segment.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        info!("Prediction client using {} via {}", base_url, transport.transport_name());
        Ok(Self { base_url, transport })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn endpoint_url(&self, endpoint: Endpoint) -> Result<Url> {
        Ok(self.base_url.join(endpoint.path())?)
    }

    pub async fn predict(&self, request: &PredictionRequest) -> Result<PredictionResult> {
        match request {
            PredictionRequest::Single(record) => self.predict_single(record).await,
            PredictionRequest::Window(payload) => self.predict_window(payload).await,
        }
    }

    pub async fn predict_single(&self, record: &VitalRecord) -> Result<PredictionResult> {
        let body = RequestBody::Json(serde_json::Value::Object(record.as_json().clone()));
        debug!("Single prediction with {} fields", record.len());
        self.dispatch(Endpoint::Single, body).await
    }

    /// Validates the window before anything touches the network.
    pub async fn predict_window(&self, payload: &WindowPayload) -> Result<PredictionResult> {
        let records = validate_window(payload)?;
        let part = match payload {
            WindowPayload::Csv { filename, bytes } => {
                FormPart::file(FILE_FIELD, filename.clone(), "text/csv", bytes.clone())
            }
            WindowPayload::Records(_) | WindowPayload::JsonText(_) => {
                let rows = serde_json::to_string(&records)?;
                FormPart::text(ROWS_FIELD, rows)
            }
        };

        debug!("Window prediction with {} rows", records.len());
        self.dispatch(Endpoint::Window, RequestBody::Multipart(vec![part])).await
    }

    async fn dispatch(&self, endpoint: Endpoint, body: RequestBody) -> Result<PredictionResult> {
        let url = self.endpoint_url(endpoint)?;
        let start_time = Instant::now();

        let raw = match self.transport.send(&url, body).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Request to {} failed: {}", url, e);
                return Err(e.into());
            }
        };

        match parse_response(&raw) {
            Ok(result) => {
                info!(
                    "Prediction from {} in {}ms ({} fields)",
                    url,
                    start_time.elapsed().as_millis(),
                    result.len()
                );
                Ok(result)
            }
            Err(e @ MonitorError::Decode(_)) => {
                error!("Undecodable response from {} (HTTP {}): {}", url, raw.status, e);
                Err(e)
            }
            Err(e) => {
                warn!("Prediction from {} failed: {}", url, e);
                Err(e)
            }
        }
    }
}
