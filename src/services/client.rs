//! Transport for the imputation service.
//!
//! [`ImputationApi`] is the seam the workflow talks through; [`HttpImputationClient`]
//! is the reqwest implementation. Response decoding lives in
//! [`parse_upload_response`] so it can be exercised without a network.

use crate::models::file::mime_type_for_name;
use crate::models::{
    ProcessingResult, RequestParameters, SelectedFile, Stats, XLS_MIME_TYPE, XLSX_MIME_TYPE,
};
use crate::services::endpoint::ServiceEndpoint;
use crate::services::payload::DownloadError;
use crate::services::status::ProbeError;
use reqwest::StatusCode;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// Message shown when the service rejects a request without saying why.
pub const DEFAULT_REJECTION_MESSAGE: &str = "Failed to process file";

/// Message shown when the service answers `success: false` without an error.
pub const DEFAULT_FAILURE_MESSAGE: &str = "Processing failed";

/// Errors that end a submission. All of them return the workflow to
/// `FileSelected`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmissionError {
    #[error("Could not reach the imputation service: {0}")]
    NetworkFailure(String),

    #[error("{0}")]
    ServerRejected(String),

    #[error("The service returned an unexpected response: {0}")]
    MalformedResponse(String),

    #[error("Could not read {name}: {reason}")]
    FileUnreadable { name: String, reason: String },
}

/// Everything needed to send one submission.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadRequest {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
    pub params: RequestParameters,
}

impl UploadRequest {
    /// Read the selected file and pair it with the parameters.
    pub async fn build(file: &SelectedFile, params: RequestParameters) -> Result<Self, SubmissionError> {
        let bytes = file
            .source()
            .read()
            .await
            .map_err(|e| SubmissionError::FileUnreadable {
                name: file.name().to_string(),
                reason: e.to_string(),
            })?;

        // Forward a spreadsheet type even when the picker reported something else
        let mime_type = match file.mime_type() {
            m if m == XLSX_MIME_TYPE || m == XLS_MIME_TYPE => m.to_string(),
            _ => mime_type_for_name(file.name()).to_string(),
        };

        Ok(Self {
            file_name: file.name().to_string(),
            mime_type,
            bytes,
            params,
        })
    }
}

/// A successful submission.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadOutcome {
    pub result: ProcessingResult,
    pub stats: Stats,
}

/// Operations the workflow needs from the service.
pub trait ImputationApi {
    /// `POST /upload`
    fn upload(
        &self,
        request: UploadRequest,
    ) -> impl Future<Output = Result<UploadOutcome, SubmissionError>> + Send;

    /// `GET /download/{file_id}`
    fn retrieve(&self, file_id: &str) -> impl Future<Output = Result<Vec<u8>, DownloadError>> + Send;

    /// `GET /health`
    fn health(&self) -> impl Future<Output = Result<(), ProbeError>> + Send;
}

/// Raw JSON body of `/upload`. Every field is optional on the wire.
#[derive(Debug, Deserialize)]
struct UploadResponseBody {
    #[serde(default)]
    success: bool,
    error: Option<String>,
    stats: Option<Stats>,
    file_data: Option<String>,
    filename: Option<String>,
    file_id: Option<String>,
}

/// Turn an `/upload` response into an outcome.
///
/// Non-2xx statuses and `success: false` become `ServerRejected` carrying the
/// server's `error` text when present. A 2xx body that is not the expected
/// JSON, lacks `stats`, or carries neither an inline payload nor a file id is
/// `MalformedResponse`.
pub fn parse_upload_response(status: u16, body: &[u8]) -> Result<UploadOutcome, SubmissionError> {
    let parsed = serde_json::from_slice::<UploadResponseBody>(body);

    if !(200..300).contains(&status) {
        let message = parsed
            .ok()
            .and_then(|b| b.error)
            .filter(|e| !e.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_REJECTION_MESSAGE.to_string());
        tracing::debug!("Upload rejected with HTTP {}: {}", status, message);
        return Err(SubmissionError::ServerRejected(message));
    }

    let body = parsed.map_err(|e| SubmissionError::MalformedResponse(e.to_string()))?;

    if !body.success {
        return Err(SubmissionError::ServerRejected(
            body.error
                .filter(|e| !e.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_FAILURE_MESSAGE.to_string()),
        ));
    }

    let stats = body
        .stats
        .ok_or_else(|| SubmissionError::MalformedResponse("missing stats".to_string()))?;

    // Empty strings count as absent
    let file_data = body.file_data.filter(|d| !d.is_empty());
    let file_id = body.file_id.filter(|id| !id.is_empty());

    let result = match (file_data, body.filename, file_id) {
        (Some(encoded_bytes), Some(filename), _) => ProcessingResult::InlinePayload {
            encoded_bytes,
            filename,
        },
        (Some(_), None, _) => {
            return Err(SubmissionError::MalformedResponse(
                "file_data without filename".to_string(),
            ));
        }
        (None, _, Some(file_id)) => ProcessingResult::ReferencePayload { file_id },
        (None, _, None) => {
            return Err(SubmissionError::MalformedResponse(
                "neither file_data nor file_id present".to_string(),
            ));
        }
    };

    Ok(UploadOutcome { result, stats })
}

/// reqwest-backed [`ImputationApi`].
///
/// Timeouts are the transport's; the workflow itself never times out.
#[derive(Clone, Debug)]
pub struct HttpImputationClient {
    endpoint: ServiceEndpoint,
    client: reqwest::Client,
}

impl HttpImputationClient {
    pub fn new(
        endpoint: ServiceEndpoint,
        request_timeout: Duration,
        connect_timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .connect_timeout(connect_timeout)
            .build()?;

        Ok(Self { endpoint, client })
    }

    pub fn endpoint(&self) -> &ServiceEndpoint {
        &self.endpoint
    }

    fn build_form(request: UploadRequest) -> Result<Form, SubmissionError> {
        let UploadRequest {
            file_name,
            mime_type,
            bytes,
            params,
        } = request;

        tracing::debug!(
            "Multipart body: file={} ({} bytes, {:?}), method={}, iterations={}",
            file_name,
            bytes.len(),
            mime_type,
            params.method(),
            params.iterations()
        );

        let mut part = Part::bytes(bytes).file_name(file_name);
        if !mime_type.is_empty() {
            part = part
                .mime_str(&mime_type)
                .map_err(|e| SubmissionError::NetworkFailure(format!("invalid MIME type: {}", e)))?;
        }

        Ok(Form::new()
            .part("file", part)
            .text("method", params.method().as_str())
            .text("iterations", params.iterations().to_string()))
    }
}

impl ImputationApi for HttpImputationClient {
    async fn upload(&self, request: UploadRequest) -> Result<UploadOutcome, SubmissionError> {
        let url = self.endpoint.upload_url();
        tracing::info!("Submitting {} to {}", request.file_name, url);

        let response = self
            .client
            .post(url)
            .multipart(Self::build_form(request)?)
            .send()
            .await
            .map_err(|e| SubmissionError::NetworkFailure(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| SubmissionError::NetworkFailure(e.to_string()))?;

        parse_upload_response(status, &body)
    }

    async fn retrieve(&self, file_id: &str) -> Result<Vec<u8>, DownloadError> {
        let url = self
            .endpoint
            .download_url(file_id)
            .map_err(|e| DownloadError::RetrievalError(e.to_string()))?;
        tracing::info!("Retrieving result {} from {}", file_id, url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| DownloadError::RetrievalError(e.to_string()))?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(DownloadError::NotFound(file_id.to_string())),
            status if !status.is_success() => Err(DownloadError::RetrievalError(format!(
                "HTTP {}",
                status.as_u16()
            ))),
            _ => {
                let bytes = response
                    .bytes()
                    .await
                    .map_err(|e| DownloadError::RetrievalError(e.to_string()))?;
                Ok(bytes.to_vec())
            }
        }
    }

    async fn health(&self) -> Result<(), ProbeError> {
        let response = self
            .client
            .get(self.endpoint.health_url())
            .send()
            .await
            .map_err(|e| ProbeError::Unreachable(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(ProbeError::BadStatus(response.status().as_u16()))
        }
    }
}
