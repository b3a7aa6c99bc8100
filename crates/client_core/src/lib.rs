use std::{sync::Arc, time::Duration};

use serde_json::Value;
use shared::{
    domain::DiagnosisResult,
    error::{ErrorDescriptor, ErrorKind},
    protocol::ServiceErrorBody,
};
use tracing::{info, warn};

pub mod advisory;
pub mod intake;
pub mod normalizer;
pub mod transport;

pub use advisory::{advisory_for, AdvisoryEntry, AdvisoryTag};
pub use intake::{accept_candidates, CandidateFile, IntakeDecision, IntakeError, SelectedFile};
pub use transport::{HttpPredictionService, PredictionService, ServiceReply, TransportError};

/// Upper bound on one prediction request, connection included.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisOutcome {
    Diagnosis(DiagnosisResult),
    Failed(ErrorDescriptor),
}

/// Lifecycle of one analysis workflow.
///
/// `Resolved` keeps the file (when one was held) so the user can re-run the
/// analysis without selecting it again.
#[derive(Debug, Clone, Default)]
pub enum AnalysisState {
    #[default]
    Idle,
    FileSelected {
        file: SelectedFile,
    },
    Analyzing {
        file: SelectedFile,
    },
    Resolved {
        file: Option<SelectedFile>,
        outcome: AnalysisOutcome,
    },
}

impl AnalysisState {
    pub fn phase(&self) -> &'static str {
        match self {
            AnalysisState::Idle => "idle",
            AnalysisState::FileSelected { .. } => "file_selected",
            AnalysisState::Analyzing { .. } => "analyzing",
            AnalysisState::Resolved { .. } => "resolved",
        }
    }

    pub fn file(&self) -> Option<&SelectedFile> {
        match self {
            AnalysisState::Idle => None,
            AnalysisState::FileSelected { file } | AnalysisState::Analyzing { file } => Some(file),
            AnalysisState::Resolved { file, .. } => file.as_ref(),
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, AnalysisState::Analyzing { .. })
    }

    pub fn diagnosis(&self) -> Option<&DiagnosisResult> {
        match self {
            AnalysisState::Resolved {
                outcome: AnalysisOutcome::Diagnosis(result),
                ..
            } => Some(result),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&ErrorDescriptor> {
        match self {
            AnalysisState::Resolved {
                outcome: AnalysisOutcome::Failed(error),
                ..
            } => Some(error),
            _ => None,
        }
    }
}

pub enum AnalysisStart {
    /// The controller entered `Analyzing`; run the request and hand the
    /// completion back through [`AnalysisController::finish`].
    Dispatched(PendingAnalysis),
    /// No file was held. The controller resolved with this descriptor.
    Rejected(ErrorDescriptor),
    /// A request is already in flight; nothing changed.
    AlreadyInFlight,
}

/// One outbound prediction request, detached from the controller so it can be
/// awaited inline or spawned by an event-driven front end.
pub struct PendingAnalysis {
    generation: u64,
    file: SelectedFile,
    service: Arc<dyn PredictionService>,
}

impl PendingAnalysis {
    pub fn file(&self) -> &SelectedFile {
        &self.file
    }

    pub async fn execute(self) -> AnalysisCompletion {
        let request = self.service.predict(&self.file);
        let outcome = match tokio::time::timeout(REQUEST_TIMEOUT, request).await {
            Ok(Ok(reply)) => interpret_reply(reply),
            Ok(Err(error)) => {
                warn!(file_name = self.file.name(), %error, "analysis: transport failure");
                AnalysisOutcome::Failed(descriptor_for_transport(&error))
            }
            Err(_) => {
                warn!(
                    file_name = self.file.name(),
                    timeout_ms = REQUEST_TIMEOUT.as_millis() as u64,
                    "analysis: request timed out"
                );
                AnalysisOutcome::Failed(ErrorDescriptor::unreachable())
            }
        };

        AnalysisCompletion {
            generation: self.generation,
            outcome,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AnalysisCompletion {
    generation: u64,
    pub outcome: AnalysisOutcome,
}

fn descriptor_for_transport(error: &TransportError) -> ErrorDescriptor {
    match error {
        TransportError::UnexpectedStatus(status) => ErrorDescriptor::unknown().with_status(*status),
        error if error.reached_service() => ErrorDescriptor::unknown(),
        _ => ErrorDescriptor::unreachable(),
    }
}

/// Maps a received response onto a diagnosis or a classified failure.
pub fn interpret_reply(reply: ServiceReply) -> AnalysisOutcome {
    if !reply.is_success() {
        let detail = serde_json::from_slice::<ServiceErrorBody>(&reply.body)
            .ok()
            .and_then(|body| body.detail_message());
        let descriptor = match detail {
            Some(detail) => ErrorDescriptor::new(ErrorKind::ServerMessage, detail),
            None => ErrorDescriptor::unknown(),
        };
        warn!(
            status = reply.status,
            kind = descriptor.kind.as_str(),
            "analysis: service returned an error"
        );
        return AnalysisOutcome::Failed(descriptor.with_status(reply.status));
    }

    let body: Value = match serde_json::from_slice(&reply.body) {
        Ok(body) => body,
        Err(error) => {
            warn!(status = reply.status, %error, "analysis: response is not JSON");
            return AnalysisOutcome::Failed(
                ErrorDescriptor::malformed_response().with_status(reply.status),
            );
        }
    };

    match (normalizer::usable_prediction(&body), body.as_object()) {
        (Some(prediction), Some(fields)) => {
            AnalysisOutcome::Diagnosis(normalizer::normalize(prediction, fields))
        }
        _ => {
            warn!(status = reply.status, "analysis: response has no usable prediction");
            AnalysisOutcome::Failed(ErrorDescriptor::malformed_response().with_status(reply.status))
        }
    }
}

/// Owns the analysis workflow state. A front end reads it through
/// [`AnalysisController::state`] and drives it with the transition methods.
pub struct AnalysisController {
    service: Arc<dyn PredictionService>,
    state: AnalysisState,
    generation: u64,
}

impl AnalysisController {
    pub fn new(service: Arc<dyn PredictionService>) -> Self {
        Self {
            service,
            state: AnalysisState::Idle,
            generation: 0,
        }
    }

    pub fn state(&self) -> &AnalysisState {
        &self.state
    }

    pub fn select_file(&mut self, file: SelectedFile) {
        info!(
            file_name = file.name(),
            media_type = %file.media_type(),
            size_bytes = file.size_bytes(),
            from = self.state.phase(),
            "analysis: file selected"
        );
        self.generation += 1;
        self.state = AnalysisState::FileSelected { file };
    }

    /// Returns to `Idle`. An in-flight request keeps running at the transport
    /// level, but its completion is discarded by [`AnalysisController::finish`].
    pub fn reset(&mut self) {
        info!(from = self.state.phase(), "analysis: reset");
        self.generation += 1;
        self.state = AnalysisState::Idle;
    }

    pub fn begin_analysis(&mut self) -> AnalysisStart {
        match std::mem::take(&mut self.state) {
            AnalysisState::Analyzing { file } => {
                info!(file_name = file.name(), "analysis: already in flight, ignoring");
                self.state = AnalysisState::Analyzing { file };
                AnalysisStart::AlreadyInFlight
            }
            AnalysisState::FileSelected { file }
            | AnalysisState::Resolved {
                file: Some(file), ..
            } => {
                self.generation += 1;
                info!(
                    file_name = file.name(),
                    generation = self.generation,
                    "analysis: request dispatched"
                );
                self.state = AnalysisState::Analyzing { file: file.clone() };
                AnalysisStart::Dispatched(PendingAnalysis {
                    generation: self.generation,
                    file,
                    service: Arc::clone(&self.service),
                })
            }
            AnalysisState::Idle | AnalysisState::Resolved { file: None, .. } => {
                let error = ErrorDescriptor::no_file_selected();
                warn!("analysis: requested without a selected file");
                self.state = AnalysisState::Resolved {
                    file: None,
                    outcome: AnalysisOutcome::Failed(error.clone()),
                };
                AnalysisStart::Rejected(error)
            }
        }
    }

    /// Applies a completion. Returns `false` when it belongs to a request that
    /// was superseded by `reset`, `select_file` or a newer analysis.
    pub fn finish(&mut self, completion: AnalysisCompletion) -> bool {
        if completion.generation != self.generation || !self.state.is_loading() {
            info!(
                completion_generation = completion.generation,
                current_generation = self.generation,
                "analysis: discarding stale completion"
            );
            return false;
        }

        let AnalysisState::Analyzing { file } = std::mem::take(&mut self.state) else {
            return false;
        };
        match &completion.outcome {
            AnalysisOutcome::Diagnosis(result) => info!(
                file_name = file.name(),
                prediction = %result.prediction,
                confidence = result.confidence,
                "analysis: diagnosis ready"
            ),
            AnalysisOutcome::Failed(error) => info!(
                file_name = file.name(),
                kind = error.kind.as_str(),
                "analysis: failed"
            ),
        }
        self.state = AnalysisState::Resolved {
            file: Some(file),
            outcome: completion.outcome,
        };
        true
    }

    /// Runs one full analysis cycle inline: dispatch, await, resolve.
    pub async fn analyze(&mut self) -> &AnalysisState {
        if let AnalysisStart::Dispatched(pending) = self.begin_analysis() {
            let completion = pending.execute().await;
            self.finish(completion);
        }
        &self.state
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
