//! Turning a [`ProcessingResult`] into a file the user can save.
//!
//! Inline payloads are decoded from base64; reference payloads are fetched from
//! the service. Nothing is cached, so every download repeats the work.

use crate::models::{ProcessingResult, XLSX_MIME_TYPE};
use crate::services::client::ImputationApi;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;

/// Prefix for the names of files fetched by reference.
pub const IMPUTED_PREFIX: &str = "imputed_";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DownloadError {
    #[error("Processed file is not valid base64: {0}")]
    DecodeError(String),

    #[error("Processed file {0} was not found on the service")]
    NotFound(String),

    #[error("Failed to download file: {0}")]
    RetrievalError(String),

    #[error("No file to download")]
    NoResultAvailable,

    #[error("Could not save {path}: {reason}")]
    SaveFailed { path: String, reason: String },
}

/// Bytes ready to be written to disk, with the name to save them under.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DownloadableArtifact {
    pub bytes: Vec<u8>,
    pub suggested_filename: String,
}

impl DownloadableArtifact {
    /// Always the xlsx type, whichever payload variant produced the bytes.
    pub fn mime_type(&self) -> &'static str {
        XLSX_MIME_TYPE
    }

    /// Write the artifact into `dir`, creating it if needed.
    ///
    /// Only the last component of the suggested name is used, so a
    /// server-chosen name cannot escape `dir`.
    pub async fn save_to(&self, dir: &Utf8Path) -> Result<Utf8PathBuf, DownloadError> {
        let file_name = Utf8Path::new(&self.suggested_filename)
            .file_name()
            .filter(|name| !name.is_empty())
            .unwrap_or("imputed.xlsx");
        let path = dir.join(file_name);

        let save_failed = |e: std::io::Error| DownloadError::SaveFailed {
            path: path.to_string(),
            reason: e.to_string(),
        };

        tokio::fs::create_dir_all(dir).await.map_err(save_failed)?;
        tokio::fs::write(&path, &self.bytes).await.map_err(save_failed)?;

        tracing::info!("Saved {} bytes to {}", self.bytes.len(), path);
        Ok(path)
    }
}

/// Produce the artifact for a result.
///
/// `original_filename` is the name of the file the user submitted; it names
/// reference downloads as `imputed_<original_filename>`.
pub async fn materialize<A: ImputationApi>(
    result: &ProcessingResult,
    original_filename: &str,
    api: &A,
) -> Result<DownloadableArtifact, DownloadError> {
    match result {
        ProcessingResult::InlinePayload {
            encoded_bytes,
            filename,
        } => {
            let bytes = STANDARD
                .decode(encoded_bytes.trim())
                .map_err(|e| DownloadError::DecodeError(e.to_string()))?;
            tracing::debug!("Decoded inline payload: {} bytes", bytes.len());

            Ok(DownloadableArtifact {
                bytes,
                suggested_filename: filename.clone(),
            })
        }
        ProcessingResult::ReferencePayload { file_id } => {
            let bytes = api.retrieve(file_id).await?;
            tracing::debug!("Retrieved {}: {} bytes", file_id, bytes.len());

            Ok(DownloadableArtifact {
                bytes,
                suggested_filename: format!("{}{}", IMPUTED_PREFIX, original_filename),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::client::{SubmissionError, UploadOutcome, UploadRequest};
    use crate::services::status::ProbeError;

    /// Serves a single stored file and refuses uploads.
    struct StoredFile {
        file_id: &'static str,
        bytes: &'static [u8],
    }

    impl ImputationApi for StoredFile {
        async fn upload(&self, _request: UploadRequest) -> Result<UploadOutcome, SubmissionError> {
            Err(SubmissionError::NetworkFailure("uploads not served".into()))
        }

        async fn retrieve(&self, file_id: &str) -> Result<Vec<u8>, DownloadError> {
            if file_id == self.file_id {
                Ok(self.bytes.to_vec())
            } else {
                Err(DownloadError::NotFound(file_id.to_string()))
            }
        }

        async fn health(&self) -> Result<(), ProbeError> {
            Ok(())
        }
    }

    const STORE: StoredFile = StoredFile {
        file_id: "abc123",
        bytes: b"PK\x03\x04workbook",
    };

    #[tokio::test]
    async fn test_inline_payload_decodes() {
        let result = ProcessingResult::InlinePayload {
            encoded_bytes: "SGVsbG8=".into(),
            filename: "out.xlsx".into(),
        };

        let artifact = materialize(&result, "data.xlsx", &STORE).await.unwrap();
        assert_eq!(artifact.bytes, b"Hello");
        assert_eq!(artifact.suggested_filename, "out.xlsx");
        assert_eq!(artifact.mime_type(), XLSX_MIME_TYPE);
    }

    #[tokio::test]
    async fn test_inline_payload_invalid_base64() {
        let result = ProcessingResult::InlinePayload {
            encoded_bytes: "not*base64!".into(),
            filename: "out.xlsx".into(),
        };

        assert!(matches!(
            materialize(&result, "data.xlsx", &STORE).await,
            Err(DownloadError::DecodeError(_))
        ));
    }

    #[tokio::test]
    async fn test_reference_payload_fetches_and_renames() {
        let result = ProcessingResult::ReferencePayload {
            file_id: "abc123".into(),
        };

        let artifact = materialize(&result, "data.xlsx", &STORE).await.unwrap();
        assert_eq!(artifact.suggested_filename, "imputed_data.xlsx");
        assert_eq!(artifact.bytes, b"PK\x03\x04workbook");
        assert_eq!(artifact.mime_type(), XLSX_MIME_TYPE);
    }

    #[tokio::test]
    async fn test_reference_payload_missing() {
        let result = ProcessingResult::ReferencePayload {
            file_id: "gone".into(),
        };

        assert_eq!(
            materialize(&result, "data.xlsx", &STORE).await,
            Err(DownloadError::NotFound("gone".into()))
        );
    }

    #[tokio::test]
    async fn test_save_to_strips_directories() {
        let dir = tempfile::TempDir::new().unwrap();
        let dir_path = Utf8PathBuf::try_from(dir.path().join("out")).unwrap();

        let artifact = DownloadableArtifact {
            bytes: b"Hello".to_vec(),
            suggested_filename: "../../etc/imputed.xlsx".into(),
        };

        let saved = artifact.save_to(&dir_path).await.unwrap();
        assert_eq!(saved, dir_path.join("imputed.xlsx"));
        assert_eq!(std::fs::read(&saved).unwrap(), b"Hello");
    }
}
