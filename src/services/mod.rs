//! Services module - everything that talks to files or the imputation service.
//!
//! These have no knowledge of the workflow states or of how anything is displayed.
//!
//! # Components
//!
//! - [`FileValidator`]: type and size gate in front of file selection
//! - [`ServiceEndpoint`]: the service base address and the URLs derived from it
//! - [`ImputationApi`] / [`HttpImputationClient`]: upload, retrieve and health calls
//! - [`materialize`]: decode or fetch a result into a [`DownloadableArtifact`]
//! - [`probe`]: best-effort reachability check run at startup

pub mod client;
pub mod endpoint;
pub mod payload;
pub mod status;
pub mod validation;

pub use client::{
    HttpImputationClient, ImputationApi, SubmissionError, UploadOutcome, UploadRequest,
    parse_upload_response,
};
pub use endpoint::{EndpointError, ServiceEndpoint};
pub use payload::{DownloadError, DownloadableArtifact, materialize};
pub use status::{ProbeError, ServiceStatus, probe, spawn_probe};
pub use validation::{FileValidator, MAX_FILE_SIZE_BYTES, ValidationError};
