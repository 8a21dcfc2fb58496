//! Startup reachability check.
//!
//! The probe only logs. Its result never feeds back into the workflow.

use crate::services::client::ImputationApi;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProbeError {
    #[error("Cannot connect to server: {0}")]
    Unreachable(String),

    #[error("Server not responding (HTTP {0})")]
    BadStatus(u16),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ServiceStatus {
    Reachable,
    Unreachable { reason: String },
}

impl ServiceStatus {
    pub fn is_reachable(&self) -> bool {
        matches!(self, ServiceStatus::Reachable)
    }
}

/// Run the health check once and log the outcome.
pub async fn probe<A: ImputationApi>(api: &A) -> ServiceStatus {
    match api.health().await {
        Ok(()) => {
            tracing::info!("Imputation service is reachable");
            ServiceStatus::Reachable
        }
        Err(e) => {
            tracing::warn!("{}. Make sure the imputation server is running.", e);
            ServiceStatus::Unreachable {
                reason: e.to_string(),
            }
        }
    }
}

/// Fire the probe in the background. The returned handle may be dropped.
pub fn spawn_probe<A>(api: A) -> tokio::task::JoinHandle<ServiceStatus>
where
    A: ImputationApi + Send + Sync + 'static,
{
    tokio::spawn(async move { probe(&api).await })
}
