use std::{collections::BTreeMap, fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Largest upload the prediction service accepts (5 MiB).
pub const MAX_UPLOAD_BYTES: u64 = 5 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaType {
    #[serde(rename = "image/jpeg")]
    Jpeg,
    #[serde(rename = "image/jpg")]
    Jpg,
    #[serde(rename = "image/png")]
    Png,
}

impl MediaType {
    pub const ALL: [MediaType; 3] = [MediaType::Jpeg, MediaType::Jpg, MediaType::Png];

    pub fn as_str(self) -> &'static str {
        match self {
            MediaType::Jpeg => "image/jpeg",
            MediaType::Jpg => "image/jpg",
            MediaType::Png => "image/png",
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported media type '{0}'")]
pub struct UnsupportedMediaType(pub String);

impl FromStr for MediaType {
    type Err = UnsupportedMediaType;

    /// Accepts `type/subtype` case-insensitively and ignores parameters such as `; charset=...`.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let essence = raw
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        MediaType::ALL
            .into_iter()
            .find(|media_type| media_type.as_str() == essence)
            .ok_or_else(|| UnsupportedMediaType(raw.to_string()))
    }
}

/// Normalized outcome of one successful classification request.
///
/// `confidence` and every value of `class_probabilities` lie in `[0, 1]`.
/// Fields of the raw response that the client does not interpret are kept in
/// `passthrough` and serialized back at the top level.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagnosisResult {
    pub prediction: String,
    pub confidence: f64,
    pub class_probabilities: BTreeMap<String, f64>,
    #[serde(flatten)]
    pub passthrough: Map<String, Value>,
}

impl DiagnosisResult {
    /// Class probabilities ordered for display, most likely first.
    pub fn ranked_probabilities(&self) -> Vec<(&str, f64)> {
        let mut ranked: Vec<(&str, f64)> = self
            .class_probabilities
            .iter()
            .map(|(label, probability)| (label.as_str(), *probability))
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranked
    }
}
