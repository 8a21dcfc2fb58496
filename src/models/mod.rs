//! Data models for imputeflow.
//!
//! - [`SelectedFile`] / [`FileCandidate`]: a picked file before and after validation
//! - [`RequestParameters`]: method and iteration count sent with a submission
//! - [`ProcessingResult`]: inline or reference payload of a successful submission
//! - [`Stats`]: per-request statistics reported by the service
//! - [`ClientConfig`]: settings loaded from `client.yaml`

pub mod config;
pub mod file;
pub mod result;

pub use config::{
    ClientConfig, DEFAULT_SERVICE_URL, DefaultParameters, LoggingSettings, ServiceSettings,
};
pub use file::{
    FileCandidate, FileSource, ImputationMethod, ParameterError, RequestParameters, SelectedFile,
    XLS_MIME_TYPE, XLSX_MIME_TYPE, mime_type_for_name,
};
pub use result::{ProcessingResult, Stats};
