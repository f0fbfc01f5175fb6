use rand::Rng;
use serde_json::{Map, Value, json};

use crate::defs::{HEART_RATE_FIELD, PredictionResult};

/// Vitals reported alongside the synthesized pulse when the service is not used.
const PLACEHOLDER_VITALS: [(&str, f64); 5] = [
    ("Respiratory Rate", 17.0),
    ("Body Temperature", 36.9),
    ("Oxygen Saturation", 98.0),
    ("Systolic Blood Pressure", 116.0),
    ("Diastolic Blood Pressure", 74.0),
];

/// Lowest and highest pulse the placeholder can report.
pub const PLACEHOLDER_BPM_RANGE: (u32, u32) = (65, 94);

/// Local stand-in for the prediction service, used by the offline demo path.
///
/// It never looks at the patient's inputs: the result is a plausible resting
/// profile with a randomized pulse so the waveform has something to show.
pub struct BaselineEstimator;

impl BaselineEstimator {
    pub fn placeholder<R: Rng + ?Sized>(rng: &mut R) -> PredictionResult {
        let (low, high) = PLACEHOLDER_BPM_RANGE;
        let bpm = rng.gen_range(low..=high);

        let mut fields = Map::new();
        fields.insert(HEART_RATE_FIELD.to_owned(), json!(bpm));
        for (name, value) in PLACEHOLDER_VITALS {
            fields.insert(name.to_owned(), Value::from(value));
        }
        PredictionResult::from_fields(fields)
    }
}
