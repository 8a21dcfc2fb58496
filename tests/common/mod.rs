#![allow(dead_code)]

use camino::Utf8PathBuf;
use imputeflow::services::{
    DownloadError, ImputationApi, ProbeError, SubmissionError, UploadOutcome, UploadRequest,
    parse_upload_response,
};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

pub const INLINE_BODY: &str = r#"{
    "success": true,
    "file_data": "SGVsbG8=",
    "filename": "out.xlsx",
    "stats": {"missing_filled": 12, "total_rows": 40, "total_cols": 5}
}"#;

pub const REFERENCE_BODY: &str = r#"{
    "success": true,
    "file_id": "abc123",
    "stats": {"missing_filled": 3, "total_rows": 10, "total_cols": 2}
}"#;

/// How the fake answers an upload.
#[derive(Clone, Debug)]
pub enum UploadReply {
    /// Status and raw body, decoded the same way the HTTP client decodes them
    Http(u16, String),
    Unreachable(String),
}

/// In-memory stand-in for the imputation service.
pub struct FakeService {
    reply: Mutex<UploadReply>,
    stored: HashMap<String, Vec<u8>>,
    uploads: AtomicUsize,
    retrievals: AtomicUsize,
    last_request: Mutex<Option<UploadRequest>>,
}

impl FakeService {
    pub fn new(reply: UploadReply) -> Self {
        Self {
            reply: Mutex::new(reply),
            stored: HashMap::new(),
            uploads: AtomicUsize::new(0),
            retrievals: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        }
    }

    pub fn responding(status: u16, body: &str) -> Self {
        Self::new(UploadReply::Http(status, body.to_string()))
    }

    pub fn with_stored(mut self, file_id: &str, bytes: &[u8]) -> Self {
        self.stored.insert(file_id.to_string(), bytes.to_vec());
        self
    }

    pub fn set_reply(&self, reply: UploadReply) {
        *self.reply.lock().unwrap() = reply;
    }

    pub fn uploads(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }

    pub fn retrievals(&self) -> usize {
        self.retrievals.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<UploadRequest> {
        self.last_request.lock().unwrap().clone()
    }
}

impl ImputationApi for FakeService {
    async fn upload(&self, request: UploadRequest) -> Result<UploadOutcome, SubmissionError> {
        self.uploads.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(request);

        let reply = self.reply.lock().unwrap().clone();
        match reply {
            UploadReply::Http(status, body) => parse_upload_response(status, body.as_bytes()),
            UploadReply::Unreachable(reason) => Err(SubmissionError::NetworkFailure(reason)),
        }
    }

    async fn retrieve(&self, file_id: &str) -> Result<Vec<u8>, DownloadError> {
        self.retrievals.fetch_add(1, Ordering::SeqCst);
        self.stored
            .get(file_id)
            .cloned()
            .ok_or_else(|| DownloadError::NotFound(file_id.to_string()))
    }

    async fn health(&self) -> Result<(), ProbeError> {
        Ok(())
    }
}

pub fn setup_temp_dir() -> (TempDir, Utf8PathBuf) {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let path = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).expect("temp dir is UTF-8");
    (temp_dir, path)
}

/// Write a small fake workbook and return its path.
pub fn write_workbook(dir: &Utf8PathBuf, name: &str, bytes: &[u8]) -> Utf8PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, bytes).expect("Failed to write workbook");
    path
}
