use crate::types::{PredictionRequest, Result as MonitorResult, ValidationError, VitalRecord, WindowPayload};
use interfaces::defs::check_window_size;
use serde_json::Value;
use std::path::Path;
use tracing::debug;

/// Upload limit enforced by the prediction service.
pub const MAX_UPLOAD_BYTES: usize = 2 * 1024 * 1024;

/// Values the patient form starts with.
pub const DEFAULT_FORM: [(&str, f64); 6] = [
    ("Age", 45.0),
    ("Gender", 0.0),
    ("BMI", 24.5),
    ("Derived_HRV", 5.1),
    ("Derived_Pulse_Pressure", 40.0),
    ("Derived_MAP", 90.0),
];

/// Holds the single-record form as the user typed it.
///
/// Values stay as text until `collect`, so a half-typed number is only an
/// error once the user actually asks for a prediction.
#[derive(Debug, Clone)]
pub struct FormCollector {
    fields: Vec<(String, String)>,
}

impl FormCollector {
    pub fn new() -> Self {
        Self {
            fields: DEFAULT_FORM
                .iter()
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .collect(),
        }
    }

    pub fn empty() -> Self {
        Self { fields: Vec::new() }
    }

    /// Updates a field, appending it when the form does not have it yet.
    pub fn set(&mut self, name: impl Into<String>, text: impl Into<String>) {
        let name = name.into();
        let text = text.into();
        match self.fields.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, value)) => *value = text,
            None => self.fields.push((name, text)),
        }
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.fields.iter().map(|(name, text)| (name.as_str(), text.as_str()))
    }

    pub fn collect(&self) -> Result<VitalRecord, ValidationError> {
        let mut record = VitalRecord::new();
        for (name, text) in &self.fields {
            record.insert(name.clone(), parse_field(name, text)?)?;
        }
        Ok(record)
    }

    pub fn single_request(&self) -> Result<PredictionRequest, ValidationError> {
        Ok(PredictionRequest::Single(self.collect()?))
    }
}

impl Default for FormCollector {
    fn default() -> Self {
        Self::new()
    }
}

pub fn parse_field(name: &str, text: &str) -> Result<f64, ValidationError> {
    text.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| ValidationError::NonNumeric {
            field: name.to_string(),
            value: text.to_string(),
        })
}

/// Splits a `NAME=VALUE` assignment.
pub fn parse_assignment(text: &str) -> Result<(String, String), ValidationError> {
    match text.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(ValidationError::Malformed(format!(
            "expected NAME=VALUE, got '{}'",
            text
        ))),
    }
}

/// Wraps a window payload into a request once it passes validation.
pub fn window_request(payload: WindowPayload) -> Result<PredictionRequest, ValidationError> {
    validate_window(&payload)?;
    Ok(PredictionRequest::Window(payload))
}

/// Loads a CSV window from disk, keeping the file name for the upload.
pub async fn read_csv_window(path: &Path) -> MonitorResult<WindowPayload> {
    let bytes = tokio::fs::read(path).await?;
    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    debug!("read {} bytes of CSV from {}", bytes.len(), path.display());
    Ok(WindowPayload::Csv { filename, bytes })
}

pub async fn read_json_window(path: &Path) -> MonitorResult<WindowPayload> {
    let text = tokio::fs::read_to_string(path).await?;
    Ok(WindowPayload::JsonText(text))
}

/// Parses a window payload into records and enforces the 7 to 10 row rule.
pub fn validate_window(payload: &WindowPayload) -> Result<Vec<VitalRecord>, ValidationError> {
    let records = match payload {
        WindowPayload::Records(records) => records.clone(),
        WindowPayload::JsonText(text) => parse_json_rows(text)?,
        WindowPayload::Csv { filename, bytes } => parse_csv_rows(filename, bytes)?,
    };
    check_window_size(records.len())?;

    debug!("window payload validated with {} rows", records.len());
    Ok(records)
}

fn parse_json_rows(text: &str) -> Result<Vec<VitalRecord>, ValidationError> {
    let value: Value = serde_json::from_str(text)
        .map_err(|e| ValidationError::Malformed(format!("invalid JSON: {}", e)))?;

    let rows = match value {
        Value::Array(rows) => rows,
        Value::Object(mut object) => match object.remove("rows") {
            Some(Value::Array(rows)) => rows,
            _ => {
                return Err(ValidationError::Malformed(
                    "expected a JSON array or an object with a 'rows' array".to_string(),
                ))
            }
        },
        _ => {
            return Err(ValidationError::Malformed(
                "expected a JSON array or an object with a 'rows' array".to_string(),
            ))
        }
    };

    rows.into_iter()
        .enumerate()
        .map(|(index, row)| match row {
            Value::Object(map) => VitalRecord::try_from(map),
            _ => Err(ValidationError::Malformed(format!(
                "row {} is not an object",
                index + 1
            ))),
        })
        .collect()
}

fn parse_csv_rows(filename: &str, bytes: &[u8]) -> Result<Vec<VitalRecord>, ValidationError> {
    if !filename.to_ascii_lowercase().ends_with(".csv") {
        return Err(ValidationError::UnsupportedFile {
            filename: filename.to_string(),
        });
    }
    if bytes.len() > MAX_UPLOAD_BYTES {
        return Err(ValidationError::PayloadTooLarge {
            size: bytes.len(),
            limit: MAX_UPLOAD_BYTES,
        });
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(bytes);

    let headers = reader
        .headers()
        .map_err(|e| ValidationError::Malformed(format!("unreadable CSV header: {}", e)))?
        .clone();
    if headers.is_empty() {
        return Err(ValidationError::Malformed("CSV has no header row".to_string()));
    }

    let mut records = Vec::new();
    for (index, row) in reader.records().enumerate() {
        let row = row.map_err(|e| ValidationError::Malformed(format!("CSV row {}: {}", index + 1, e)))?;
        let mut record = VitalRecord::new();
        for (name, cell) in headers.iter().zip(row.iter()) {
            // Blank cells are missing readings, not zeros.
            if cell.is_empty() {
                continue;
            }
            record.insert(name, parse_field(name, cell)?)?;
        }
        records.push(record);
    }
    Ok(records)
}
