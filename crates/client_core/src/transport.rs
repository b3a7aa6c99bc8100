//! Prediction service seam and its HTTP implementation.

use async_trait::async_trait;
use reqwest::{multipart, Client};
use shared::protocol::{PingResponse, PING_PATH, PREDICT_PATH, UPLOAD_FIELD};
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use crate::intake::SelectedFile;

/// Any HTTP response the service sent back, successful or not.
#[derive(Debug, Clone)]
pub struct ServiceReply {
    pub status: u16,
    pub body: Vec<u8>,
}

impl ServiceReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("prediction service did not respond in time")]
    Timeout,
    #[error("failed to connect to prediction service: {0}")]
    Connect(String),
    #[error("request to prediction service failed: {0}")]
    Request(String),
    #[error("prediction service answered with status {0}")]
    UnexpectedStatus(u16),
    #[error("failed to read prediction service response: {0}")]
    Body(String),
}

impl TransportError {
    /// Whether the service produced a response before the failure.
    pub fn reached_service(&self) -> bool {
        matches!(
            self,
            TransportError::UnexpectedStatus(_) | TransportError::Body(_)
        )
    }
}

/// Classifies errors raised before a response arrived. Body errors here come
/// from streaming the upload, so they never count as reaching the service;
/// response-body failures are mapped to [`TransportError::Body`] at the read site.
impl From<reqwest::Error> for TransportError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            TransportError::Timeout
        } else if error.is_connect() {
            TransportError::Connect(error.to_string())
        } else if let Some(status) = error.status() {
            TransportError::UnexpectedStatus(status.as_u16())
        } else {
            TransportError::Request(error.to_string())
        }
    }
}

#[async_trait]
pub trait PredictionService: Send + Sync {
    async fn predict(&self, file: &SelectedFile) -> Result<ServiceReply, TransportError>;
}

pub struct HttpPredictionService {
    http: Client,
    base_url: Url,
}

impl HttpPredictionService {
    pub fn new(base_url: &str) -> Result<Self, url::ParseError> {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(http: Client, base_url: &str) -> Result<Self, url::ParseError> {
        let mut base_url = Url::parse(base_url)?;
        // Url::join drops the last path segment unless the base ends with '/'.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, TransportError> {
        self.base_url
            .join(path)
            .map_err(|e| TransportError::Request(format!("invalid endpoint '{path}': {e}")))
    }

    /// Liveness check against the service's `/ping` endpoint.
    pub async fn ping(&self) -> Result<PingResponse, TransportError> {
        let url = self.endpoint(PING_PATH)?;
        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::UnexpectedStatus(status.as_u16()));
        }
        let body: PingResponse = response
            .json()
            .await
            .map_err(|e| TransportError::Body(e.to_string()))?;
        info!(status = %body.status, "prediction service ping ok");
        Ok(body)
    }
}

#[async_trait]
impl PredictionService for HttpPredictionService {
    async fn predict(&self, file: &SelectedFile) -> Result<ServiceReply, TransportError> {
        let url = self.endpoint(PREDICT_PATH)?;
        let part = multipart::Part::bytes(file.bytes().to_vec())
            .file_name(file.name().to_string())
            .mime_str(file.media_type().as_str())?;
        let form = multipart::Form::new().part(UPLOAD_FIELD, part);

        debug!(
            url = %url,
            file_name = file.name(),
            size_bytes = file.size_bytes(),
            "posting image for prediction"
        );
        let response = self.http.post(url).multipart(form).send().await?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::Body(e.to_string()))?;
        debug!(status, body_len = body.len(), "prediction service replied");

        Ok(ServiceReply {
            status,
            body: body.to_vec(),
        })
    }
}

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod tests;
