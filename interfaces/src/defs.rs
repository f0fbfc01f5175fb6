use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::fmt;

/// Smallest window the prediction service accepts.
pub const MIN_WINDOW_ROWS: usize = 7;
/// Largest window the prediction service accepts.
pub const MAX_WINDOW_ROWS: usize = 10;

/// Pulse rate used by the waveform when a result carries none.
pub const DEFAULT_BPM: f64 = 72.0;
pub const HEART_RATE_FIELD: &str = "Heart Rate";

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("field '{field}' is not numeric: {value}")]
    NonNumeric { field: String, value: String },

    #[error("window must hold {min} to {max} records, got {count}")]
    WindowSize { count: usize, min: usize, max: usize },

    #[error("unsupported upload '{filename}': only .csv files are accepted")]
    UnsupportedFile { filename: String },

    #[error("upload is {size} bytes, limit is {limit} bytes")]
    PayloadTooLarge { size: usize, limit: usize },

    #[error("malformed window input: {0}")]
    Malformed(String),
}

/// Rejects window sizes outside `MIN_WINDOW_ROWS..=MAX_WINDOW_ROWS`.
pub fn check_window_size(count: usize) -> Result<(), ValidationError> {
    if (MIN_WINDOW_ROWS..=MAX_WINDOW_ROWS).contains(&count) {
        Ok(())
    } else {
        Err(ValidationError::WindowSize {
            count,
            min: MIN_WINDOW_ROWS,
            max: MAX_WINDOW_ROWS,
        })
    }
}

/// One snapshot of measured and derived vital signs.
///
/// The field set is open: any name maps to a number, and fields keep the
/// order they were inserted in so that forms and grids render predictably.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct VitalRecord {
    fields: Map<String, Value>,
}

impl VitalRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, K>(pairs: I) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = (K, f64)>,
        K: Into<String>,
    {
        let mut record = Self::new();
        for (name, value) in pairs {
            record.insert(name, value)?;
        }
        Ok(record)
    }

    /// Sets a field, replacing any previous value in place.
    pub fn insert(&mut self, name: impl Into<String>, value: f64) -> Result<(), ValidationError> {
        let name = name.into();
        let number = Number::from_f64(value).ok_or_else(|| ValidationError::NonNumeric {
            field: name.clone(),
            value: value.to_string(),
        })?;
        self.fields.insert(name, Value::Number(number));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.fields.get(name).and_then(Value::as_f64)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.fields
            .iter()
            .filter_map(|(name, value)| value.as_f64().map(|v| (name.as_str(), v)))
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.fields.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn as_json(&self) -> &Map<String, Value> {
        &self.fields
    }
}

impl TryFrom<Map<String, Value>> for VitalRecord {
    type Error = ValidationError;

    fn try_from(map: Map<String, Value>) -> Result<Self, Self::Error> {
        let mut record = VitalRecord::new();
        for (name, value) in map {
            // Text inputs arrive as strings; accept them when they parse.
            let number = match &value {
                Value::Number(n) => n.as_f64(),
                Value::String(s) => s.trim().parse::<f64>().ok(),
                _ => None,
            };
            match number {
                Some(n) if n.is_finite() => record.insert(name, n)?,
                _ => {
                    return Err(ValidationError::NonNumeric {
                        field: name,
                        value: value.to_string(),
                    })
                }
            }
        }
        Ok(record)
    }
}

impl From<VitalRecord> for Map<String, Value> {
    fn from(record: VitalRecord) -> Self {
        record.fields
    }
}

/// Outbound payload for the prediction service.
#[derive(Debug, Clone, PartialEq)]
pub enum PredictionRequest {
    /// One record, sent as a JSON body to the single-prediction endpoint.
    Single(VitalRecord),
    /// 7 to 10 recent records, sent as multipart form data.
    Window(WindowPayload),
}

impl PredictionRequest {
    pub fn kind(&self) -> &'static str {
        match self {
            PredictionRequest::Single(_) => "single",
            PredictionRequest::Window(_) => "window",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WindowPayload {
    /// Records already collected in memory; sent as a JSON array text field.
    Records(Vec<VitalRecord>),
    /// Raw JSON typed or pasted by the user: an array, or `{"rows": [...]}`.
    JsonText(String),
    /// An uploaded CSV file, one record per row after the header.
    Csv { filename: String, bytes: Vec<u8> },
}

/// Extra information the service attaches to window predictions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WindowMeta {
    pub rows_used: usize,
    #[serde(default)]
    pub representative_features: Map<String, Value>,
}

/// A displayable value from a prediction result.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResultValue {
    Number(f64),
    Text(String),
}

impl ResultValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ResultValue::Number(n) => Some(*n),
            ResultValue::Text(s) => s.trim().parse().ok(),
        }
    }
}

impl From<&Value> for ResultValue {
    fn from(value: &Value) -> Self {
        match value {
            Value::Number(n) => match n.as_f64() {
                Some(f) => ResultValue::Number(f),
                None => ResultValue::Text(n.to_string()),
            },
            Value::String(s) => ResultValue::Text(s.clone()),
            other => ResultValue::Text(other.to_string()),
        }
    }
}

impl fmt::Display for ResultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResultValue::Number(n) => write!(f, "{}", n),
            ResultValue::Text(s) => f.write_str(s),
        }
    }
}

/// Service response: an open, ordered set of predicted values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    fields: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    meta: Option<WindowMeta>,
    received_at: DateTime<Utc>,
}

impl PredictionResult {
    pub fn from_fields(fields: Map<String, Value>) -> Self {
        Self {
            fields,
            meta: None,
            received_at: Utc::now(),
        }
    }

    pub fn with_meta(mut self, meta: WindowMeta) -> Self {
        self.meta = Some(meta);
        self
    }

    pub fn get(&self, name: &str) -> Option<ResultValue> {
        self.fields.get(name).map(ResultValue::from)
    }

    /// Fields in the order the service sent them.
    pub fn iter(&self) -> impl Iterator<Item = (&str, ResultValue)> + '_ {
        self.fields
            .iter()
            .map(|(name, value)| (name.as_str(), ResultValue::from(value)))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Pulse rate driving the waveform; `DEFAULT_BPM` when absent or unusable.
    pub fn heart_rate(&self) -> f64 {
        self.get(HEART_RATE_FIELD)
            .and_then(|v| v.as_f64())
            .filter(|bpm| bpm.is_finite() && *bpm > 0.0)
            .unwrap_or(DEFAULT_BPM)
    }

    pub fn meta(&self) -> Option<&WindowMeta> {
        self.meta.as_ref()
    }

    pub fn received_at(&self) -> DateTime<Utc> {
        self.received_at
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }
}
