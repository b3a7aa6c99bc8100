//! Static advice keyed by diagnosis label.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AdvisoryTag {
    EarlyBlight,
    LateBlight,
    Healthy,
    #[default]
    Unclassified,
}

impl AdvisoryTag {
    /// Display class for the result panel; empty for unclassified labels.
    pub fn as_str(self) -> &'static str {
        match self {
            AdvisoryTag::EarlyBlight => "early-blight",
            AdvisoryTag::LateBlight => "late-blight",
            AdvisoryTag::Healthy => "healthy",
            AdvisoryTag::Unclassified => "",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdvisoryEntry {
    pub advice: &'static str,
    pub tag: AdvisoryTag,
}

pub const FALLBACK_ADVISORY: AdvisoryEntry = AdvisoryEntry {
    advice: "Consult an agricultural expert.",
    tag: AdvisoryTag::Unclassified,
};

const ADVISORIES: [(&str, AdvisoryEntry); 3] = [
    (
        "Early Blight",
        AdvisoryEntry {
            advice: "Apply copper-based fungicides weekly. Remove infected leaves promptly.",
            tag: AdvisoryTag::EarlyBlight,
        },
    ),
    (
        "Late Blight",
        AdvisoryEntry {
            advice: "URGENT: Remove and destroy infected plants. Use fungicides with mancozeb.",
            tag: AdvisoryTag::LateBlight,
        },
    ),
    (
        "Healthy",
        AdvisoryEntry {
            advice: "Your potato plant is healthy! Maintain proper watering and fertilization.",
            tag: AdvisoryTag::Healthy,
        },
    ),
];

pub fn advisory_for(label: &str) -> AdvisoryEntry {
    ADVISORIES
        .iter()
        .find(|(known, _)| *known == label)
        .map(|(_, entry)| *entry)
        .unwrap_or(FALLBACK_ADVISORY)
}

pub fn known_labels() -> impl Iterator<Item = &'static str> {
    ADVISORIES.iter().map(|(label, _)| *label)
}
