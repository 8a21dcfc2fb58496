// imputeflow - client for a remote spreadsheet imputation service
//
// This is the library crate containing the upload/process/download workflow,
// the HTTP transport and the view mapping.
// The binary crate (main.rs) provides the interactive console entry point.

pub mod config;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod services;
pub mod state;
pub mod ui;

// Re-export commonly used types for convenience
pub use config::ConfigManager;
pub use metrics::SessionMetrics;
pub use models::{ClientConfig, FileCandidate, ProcessingResult, RequestParameters, SelectedFile, Stats};
pub use services::{HttpImputationClient, ImputationApi, ServiceEndpoint};
pub use state::{ProcessingWorkflow, WorkflowError, WorkflowEvent, WorkflowState};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
