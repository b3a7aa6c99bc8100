//! Turns a raw prediction body into a [`DiagnosisResult`].
//!
//! Numeric fields are lenient: anything that does not read as a number becomes
//! `0.0`, and every value is clamped to `[0, 1]`. A partially malformed body
//! still yields a displayable result.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use shared::{
    domain::DiagnosisResult,
    protocol::{FIELD_CLASS_PROBABILITIES, FIELD_CONFIDENCE, FIELD_PREDICTION},
};

/// Returns the `prediction` label when the body carries a usable one
/// (a non-empty string). Callers treat `None` as a malformed response.
pub fn usable_prediction(body: &Value) -> Option<&str> {
    body.get(FIELD_PREDICTION)
        .and_then(Value::as_str)
        .filter(|label| !label.is_empty())
}

/// Normalizes a body already known to carry `prediction`.
pub fn normalize(prediction: impl Into<String>, body: &Map<String, Value>) -> DiagnosisResult {
    let confidence = body.get(FIELD_CONFIDENCE).map_or(0.0, probability);

    let class_probabilities: BTreeMap<String, f64> = match body.get(FIELD_CLASS_PROBABILITIES) {
        Some(Value::Object(entries)) => entries
            .iter()
            .map(|(label, value)| (label.clone(), probability(value)))
            .collect(),
        _ => BTreeMap::new(),
    };

    let passthrough = body
        .iter()
        .filter(|(key, _)| {
            !matches!(
                key.as_str(),
                FIELD_PREDICTION | FIELD_CONFIDENCE | FIELD_CLASS_PROBABILITIES
            )
        })
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    DiagnosisResult {
        prediction: prediction.into(),
        confidence,
        class_probabilities,
        passthrough,
    }
}

/// Reads a JSON value as a probability in `[0, 1]`.
pub fn probability(value: &Value) -> f64 {
    clamp_unit(as_number(value))
}

fn as_number(value: &Value) -> f64 {
    match value {
        // Read from the literal so magnitudes past f64 become +/-inf instead of failing.
        Value::Number(number) => number.to_string().parse::<f64>().unwrap_or(0.0),
        Value::String(text) => text.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    }
}

pub fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
