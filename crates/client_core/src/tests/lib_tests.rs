use super::*;
use async_trait::async_trait;
use serde_json::json;
use std::collections::VecDeque;
use tokio::sync::Mutex;

enum Scripted {
    Reply { status: u16, body: Value },
    RawReply { status: u16, body: &'static [u8] },
    Fail(TransportError),
    Hang,
}

struct ScriptedPredictionService {
    script: Mutex<VecDeque<Scripted>>,
    received: Arc<Mutex<Vec<(String, u64)>>>,
}

impl ScriptedPredictionService {
    fn new(script: Vec<Scripted>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            received: Arc::new(Mutex::new(Vec::new())),
        })
    }

    async fn calls(&self) -> usize {
        self.received.lock().await.len()
    }
}

#[async_trait]
impl PredictionService for ScriptedPredictionService {
    async fn predict(&self, file: &SelectedFile) -> Result<ServiceReply, TransportError> {
        self.received
            .lock()
            .await
            .push((file.name().to_string(), file.size_bytes()));
        let next = self.script.lock().await.pop_front();
        match next {
            Some(Scripted::Reply { status, body }) => Ok(ServiceReply {
                status,
                body: serde_json::to_vec(&body).expect("encode body"),
            }),
            Some(Scripted::RawReply { status, body }) => Ok(ServiceReply {
                status,
                body: body.to_vec(),
            }),
            Some(Scripted::Fail(error)) => Err(error),
            Some(Scripted::Hang) | None => {
                std::future::pending::<()>().await;
                unreachable!("pending never resolves")
            }
        }
    }
}

fn leaf_jpeg(size: usize) -> SelectedFile {
    SelectedFile::new("leaf.jpg", "image/jpeg", vec![0xFF; size]).expect("valid jpeg")
}

fn late_blight_body() -> Value {
    json!({
        "prediction": "Late Blight",
        "confidence": 0.93,
        "class_probabilities": {
            "Late Blight": 0.93,
            "Early Blight": 0.05,
            "Healthy": 0.02
        }
    })
}

#[tokio::test]
async fn selected_jpeg_resolves_to_normalized_diagnosis() {
    let service = ScriptedPredictionService::new(vec![Scripted::Reply {
        status: 200,
        body: late_blight_body(),
    }]);
    let mut controller = AnalysisController::new(service.clone());

    controller.select_file(leaf_jpeg(2_000_000));
    assert_eq!(controller.state().phase(), "file_selected");

    let state = controller.analyze().await;
    let result = state.diagnosis().expect("diagnosis");
    assert_eq!(result.prediction, "Late Blight");
    assert_eq!(result.confidence, 0.93);
    assert_eq!(result.class_probabilities.len(), 3);
    let total: f64 = result.class_probabilities.values().sum();
    assert!((total - 1.0).abs() < 1e-9, "total {total}");
    assert!(state.error().is_none());
    assert_eq!(state.file().expect("file kept").name(), "leaf.jpg");

    assert_eq!(
        *service.received.lock().await,
        vec![("leaf.jpg".to_string(), 2_000_000)]
    );
}

#[tokio::test]
async fn analyze_without_file_resolves_with_validation_and_sends_nothing() {
    let service = ScriptedPredictionService::new(Vec::new());
    let mut controller = AnalysisController::new(service.clone());

    let state = controller.analyze().await;
    assert_eq!(state.phase(), "resolved");
    let error = state.error().expect("validation error");
    assert_eq!(error.kind, ErrorKind::Validation);
    assert_eq!(error.message, "Please select an image first");
    assert!(state.file().is_none());
    assert_eq!(service.calls().await, 0);

    // Still no file: a second attempt is rejected the same way.
    assert!(matches!(
        controller.begin_analysis(),
        AnalysisStart::Rejected(_)
    ));
    assert_eq!(service.calls().await, 0);
}

#[tokio::test(start_paused = true)]
async fn timeout_resolves_as_unreachable() {
    let service = ScriptedPredictionService::new(vec![Scripted::Hang]);
    let mut controller = AnalysisController::new(service.clone());
    controller.select_file(leaf_jpeg(1024));

    let started = tokio::time::Instant::now();
    let state = controller.analyze().await;
    let error = state.error().expect("error");
    assert_eq!(error.kind, ErrorKind::Unreachable);
    assert!(error.message.starts_with("Server is not responding"));
    assert!(started.elapsed() >= REQUEST_TIMEOUT);
    assert_eq!(service.calls().await, 1);
}

#[tokio::test]
async fn connection_failure_resolves_as_unreachable() {
    let service = ScriptedPredictionService::new(vec![Scripted::Fail(TransportError::Connect(
        "connection refused".into(),
    ))]);
    let mut controller = AnalysisController::new(service);
    controller.select_file(leaf_jpeg(1024));

    let error = controller.analyze().await.error().cloned().expect("error");
    assert_eq!(error, ErrorDescriptor::unreachable());
}

#[tokio::test]
async fn structured_error_detail_becomes_server_message() {
    let service = ScriptedPredictionService::new(vec![Scripted::Reply {
        status: 422,
        body: json!({ "detail": "file too large" }),
    }]);
    let mut controller = AnalysisController::new(service);
    controller.select_file(leaf_jpeg(1024));

    let error = controller.analyze().await.error().cloned().expect("error");
    assert_eq!(error.kind, ErrorKind::ServerMessage);
    assert_eq!(error.message, "file too large");
    assert_eq!(error.status, Some(422));
}

#[tokio::test]
async fn error_status_without_detail_is_unknown() {
    let service = ScriptedPredictionService::new(vec![Scripted::RawReply {
        status: 502,
        body: b"<html>Bad Gateway</html>",
    }]);
    let mut controller = AnalysisController::new(service);
    controller.select_file(leaf_jpeg(1024));

    let error = controller.analyze().await.error().cloned().expect("error");
    assert_eq!(error.kind, ErrorKind::Unknown);
    assert_eq!(error.message, "Analysis failed. Please try again.");
    assert_eq!(error.status, Some(502));
}

#[tokio::test]
async fn missing_prediction_is_malformed_response() {
    let service = ScriptedPredictionService::new(vec![
        Scripted::Reply {
            status: 200,
            body: json!({ "confidence": 0.4, "class_probabilities": {} }),
        },
        Scripted::RawReply {
            status: 200,
            body: b"not json",
        },
    ]);
    let mut controller = AnalysisController::new(service);
    controller.select_file(leaf_jpeg(1024));

    let first = controller.analyze().await.error().cloned().expect("error");
    assert_eq!(first.kind, ErrorKind::MalformedResponse);

    let second = controller.analyze().await.error().cloned().expect("error");
    assert_eq!(second.kind, ErrorKind::MalformedResponse);
    assert_eq!(second.message, "Analysis failed. Please try again.");
}

#[tokio::test]
async fn lenient_numbers_do_not_fail_the_analysis() {
    let service = ScriptedPredictionService::new(vec![Scripted::Reply {
        status: 200,
        body: json!({
            "prediction": "Some New Disease",
            "confidence": "N/A",
            "class_probabilities": { "Some New Disease": 7 }
        }),
    }]);
    let mut controller = AnalysisController::new(service);
    controller.select_file(leaf_jpeg(1024));

    let state = controller.analyze().await;
    let result = state.diagnosis().expect("diagnosis");
    assert_eq!(result.confidence, 0.0);
    assert_eq!(result.class_probabilities["Some New Disease"], 1.0);
    assert_eq!(advisory_for(&result.prediction), advisory::FALLBACK_ADVISORY);
}

#[tokio::test]
async fn overflowing_numbers_still_yield_a_diagnosis() {
    let service = ScriptedPredictionService::new(vec![Scripted::RawReply {
        status: 200,
        body: br#"{"prediction":"Healthy","confidence":1e400,"class_probabilities":{"Healthy":1e400,"Late Blight":-1e400}}"#,
    }]);
    let mut controller = AnalysisController::new(service);
    controller.select_file(leaf_jpeg(1024));

    let state = controller.analyze().await;
    assert!(state.error().is_none(), "unexpected error {:?}", state.error());
    let result = state.diagnosis().expect("diagnosis");
    assert_eq!(result.confidence, 1.0);
    assert_eq!(result.class_probabilities["Healthy"], 1.0);
    assert_eq!(result.class_probabilities["Late Blight"], 0.0);
}

#[tokio::test]
async fn analyze_while_in_flight_is_a_no_op() {
    let service = ScriptedPredictionService::new(vec![Scripted::Reply {
        status: 200,
        body: late_blight_body(),
    }]);
    let mut controller = AnalysisController::new(service.clone());
    controller.select_file(leaf_jpeg(1024));

    let AnalysisStart::Dispatched(pending) = controller.begin_analysis() else {
        panic!("expected dispatch");
    };
    assert!(controller.state().is_loading());
    assert!(matches!(
        controller.begin_analysis(),
        AnalysisStart::AlreadyInFlight
    ));
    assert!(controller.state().is_loading());

    let completion = pending.execute().await;
    assert!(controller.finish(completion));
    assert!(controller.state().diagnosis().is_some());
    assert_eq!(service.calls().await, 1);
}

#[tokio::test]
async fn completion_after_reset_is_discarded() {
    let service = ScriptedPredictionService::new(vec![Scripted::Reply {
        status: 200,
        body: late_blight_body(),
    }]);
    let mut controller = AnalysisController::new(service);
    controller.select_file(leaf_jpeg(1024));

    let AnalysisStart::Dispatched(pending) = controller.begin_analysis() else {
        panic!("expected dispatch");
    };
    controller.reset();

    let completion = pending.execute().await;
    assert!(!controller.finish(completion));
    assert_eq!(controller.state().phase(), "idle");
    assert!(controller.state().diagnosis().is_none());
}

#[tokio::test]
async fn completion_after_reselect_does_not_resolve_new_file() {
    let service = ScriptedPredictionService::new(vec![Scripted::Reply {
        status: 200,
        body: late_blight_body(),
    }]);
    let mut controller = AnalysisController::new(service);
    controller.select_file(leaf_jpeg(1024));

    let AnalysisStart::Dispatched(pending) = controller.begin_analysis() else {
        panic!("expected dispatch");
    };
    let replacement =
        SelectedFile::new("other.png", "image/png", vec![1; 16]).expect("valid png");
    controller.select_file(replacement);

    assert!(!controller.finish(pending.execute().await));
    assert_eq!(controller.state().phase(), "file_selected");
    assert_eq!(controller.state().file().expect("file").name(), "other.png");
}

#[tokio::test]
async fn retry_after_failure_clears_previous_error() {
    let service = ScriptedPredictionService::new(vec![
        Scripted::Fail(TransportError::Timeout),
        Scripted::Reply {
            status: 200,
            body: late_blight_body(),
        },
    ]);
    let mut controller = AnalysisController::new(service.clone());
    controller.select_file(leaf_jpeg(1024));

    assert!(controller.analyze().await.error().is_some());
    let state = controller.analyze().await;
    assert!(state.error().is_none());
    assert_eq!(
        state.diagnosis().expect("diagnosis").prediction,
        "Late Blight"
    );
    assert_eq!(service.calls().await, 2);
}

#[tokio::test]
async fn select_and_reset_clear_prior_outcome() {
    let service = ScriptedPredictionService::new(vec![Scripted::Reply {
        status: 200,
        body: late_blight_body(),
    }]);
    let mut controller = AnalysisController::new(service);
    controller.select_file(leaf_jpeg(1024));
    controller.analyze().await;
    assert!(controller.state().diagnosis().is_some());

    controller.select_file(leaf_jpeg(2048));
    assert!(controller.state().diagnosis().is_none());
    assert_eq!(controller.state().file().expect("file").size_bytes(), 2048);

    controller.reset();
    assert!(controller.state().file().is_none());
    assert!(!controller.state().is_loading());
}

#[test]
fn body_read_failure_after_response_is_unknown() {
    let error = descriptor_for_transport(&TransportError::Body("truncated".into()));
    assert_eq!(error.kind, ErrorKind::Unknown);

    let refused = descriptor_for_transport(&TransportError::Request("dns".into()));
    assert_eq!(refused.kind, ErrorKind::Unreachable);
}
