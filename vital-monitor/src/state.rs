use crate::types::{ErrorKind, MonitorError, PredictionResult};
use chrono::{DateTime, Utc};

/// What the user sees when the last action failed.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorIndicator {
    pub kind: ErrorKind,
    pub message: String,
    pub at: DateTime<Utc>,
}

impl ErrorIndicator {
    pub fn from_error(error: &MonitorError) -> Self {
        Self {
            kind: error.kind(),
            message: error.to_string(),
            at: Utc::now(),
        }
    }
}

/// Single-owner holder of the latest prediction and the latest failure.
///
/// A failure never clears the result: the last good prediction stays on
/// screen until a newer one replaces it.
#[derive(Debug, Default)]
pub struct ResultCell {
    result: Option<PredictionResult>,
    error: Option<ErrorIndicator>,
    updates: u64,
}

impl ResultCell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn result(&self) -> Option<&PredictionResult> {
        self.result.as_ref()
    }

    pub fn error(&self) -> Option<&ErrorIndicator> {
        self.error.as_ref()
    }

    /// Number of successful results written so far.
    pub fn updates(&self) -> u64 {
        self.updates
    }

    pub fn set_result(&mut self, result: PredictionResult) -> &PredictionResult {
        self.error = None;
        self.updates += 1;
        self.result.insert(result)
    }

    pub fn set_error(&mut self, error: &MonitorError) {
        self.error = Some(ErrorIndicator::from_error(error));
    }

    pub fn clear(&mut self) {
        self.result = None;
        self.error = None;
    }
}
