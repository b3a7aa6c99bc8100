//! File intake: the single-image selection rules the picker enforces.

use std::{fmt, path::Path};

use shared::domain::{MediaType, MAX_UPLOAD_BYTES};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum IntakeError {
    #[error("unsupported media type '{media_type}' for '{name}' (expected image/jpeg, image/jpg or image/png)")]
    UnsupportedMediaType { name: String, media_type: String },
    #[error("'{name}' is {size_bytes} bytes, larger than the {max_bytes} byte limit")]
    TooLarge {
        name: String,
        size_bytes: u64,
        max_bytes: u64,
    },
    #[error("only one file can be analyzed at a time")]
    TooManyFiles,
    #[error("failed to read '{path}': {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
}

impl IntakeError {
    pub fn reason(&self) -> RejectionReason {
        match self {
            IntakeError::UnsupportedMediaType { .. } => RejectionReason::UnsupportedMediaType,
            IntakeError::TooLarge { .. } => RejectionReason::TooLarge,
            IntakeError::TooManyFiles => RejectionReason::TooManyFiles,
            IntakeError::Read { .. } => RejectionReason::Unreadable,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionReason {
    UnsupportedMediaType,
    TooLarge,
    TooManyFiles,
    Unreadable,
}

impl RejectionReason {
    pub fn as_str(self) -> &'static str {
        match self {
            RejectionReason::UnsupportedMediaType => "unsupported-media-type",
            RejectionReason::TooLarge => "too-large",
            RejectionReason::TooManyFiles => "too-many-files",
            RejectionReason::Unreadable => "unreadable",
        }
    }
}

/// An image that passed intake. Only constructible through validation, so a
/// held `SelectedFile` always has a supported media type and fits the size limit.
#[derive(Clone, PartialEq, Eq)]
pub struct SelectedFile {
    name: String,
    media_type: MediaType,
    bytes: Vec<u8>,
}

impl fmt::Debug for SelectedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectedFile")
            .field("name", &self.name)
            .field("media_type", &self.media_type)
            .field("size_bytes", &self.size_bytes())
            .finish()
    }
}

impl SelectedFile {
    pub fn new(
        name: impl Into<String>,
        media_type: &str,
        bytes: Vec<u8>,
    ) -> Result<Self, IntakeError> {
        let name = name.into();
        let Ok(parsed) = media_type.parse::<MediaType>() else {
            return Err(IntakeError::UnsupportedMediaType {
                name,
                media_type: media_type.to_string(),
            });
        };
        let size_bytes = bytes.len() as u64;
        if size_bytes > MAX_UPLOAD_BYTES {
            return Err(IntakeError::TooLarge {
                name,
                size_bytes,
                max_bytes: MAX_UPLOAD_BYTES,
            });
        }
        Ok(Self {
            name,
            media_type: parsed,
            bytes,
        })
    }

    /// Reads an image from disk, inferring the media type from its extension.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, IntakeError> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let media_type = mime_guess::from_path(path)
            .first_raw()
            .unwrap_or("application/octet-stream");

        // Reject on metadata first so an oversized file is never read into memory.
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|source| IntakeError::Read {
                path: path.display().to_string(),
                source,
            })?;
        if media_type.parse::<MediaType>().is_err() {
            return Err(IntakeError::UnsupportedMediaType {
                name,
                media_type: media_type.to_string(),
            });
        }
        if metadata.len() > MAX_UPLOAD_BYTES {
            return Err(IntakeError::TooLarge {
                name,
                size_bytes: metadata.len(),
                max_bytes: MAX_UPLOAD_BYTES,
            });
        }

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| IntakeError::Read {
                path: path.display().to_string(),
                source,
            })?;
        debug!(file_name = %name, media_type, size_bytes = bytes.len(), "intake: read file");
        Self::new(name, media_type, bytes)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn media_type(&self) -> MediaType {
        self.media_type
    }

    pub fn size_bytes(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// A file offered by the picker before any checks.
#[derive(Debug, Clone)]
pub struct CandidateFile {
    pub name: String,
    pub media_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub name: String,
    pub reason: RejectionReason,
}

#[derive(Debug, Default)]
pub struct IntakeDecision {
    pub accepted: Option<SelectedFile>,
    pub rejected: Vec<Rejection>,
}

/// Applies the picker rules to a drop: each candidate is checked for type and
/// size, and the drop is accepted only when exactly one candidate survives.
pub fn accept_candidates(candidates: Vec<CandidateFile>) -> IntakeDecision {
    let mut decision = IntakeDecision::default();
    let mut survivors = Vec::new();

    for candidate in candidates {
        match SelectedFile::new(candidate.name.clone(), &candidate.media_type, candidate.bytes) {
            Ok(file) => survivors.push(file),
            Err(error) => decision.rejected.push(Rejection {
                name: candidate.name,
                reason: error.reason(),
            }),
        }
    }

    if survivors.len() > 1 {
        decision
            .rejected
            .extend(survivors.into_iter().map(|file| Rejection {
                name: file.name,
                reason: RejectionReason::TooManyFiles,
            }));
    } else {
        decision.accepted = survivors.pop();
    }

    decision
}
