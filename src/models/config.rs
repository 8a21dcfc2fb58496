use crate::models::file::{DEFAULT_ITERATIONS, ImputationMethod, ParameterError, RequestParameters};
use serde::{Deserialize, Serialize};

/// Address used when neither the config file nor the environment names one.
pub const DEFAULT_SERVICE_URL: &str = "http://localhost:5000";

/// Client configuration from `client.yaml`
///
/// Every field has a default, so a missing or partial file is fine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub service: ServiceSettings,
    pub defaults: DefaultParameters,
    pub download_dir: String,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    pub base_url: String,
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_SERVICE_URL.to_string(),
            request_timeout_secs: 120,
            connect_timeout_secs: 10,
        }
    }
}

/// Request parameters pre-filled into a new session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultParameters {
    pub method: ImputationMethod,
    pub iterations: u32,
}

impl Default for DefaultParameters {
    fn default() -> Self {
        Self {
            method: ImputationMethod::default(),
            iterations: DEFAULT_ITERATIONS,
        }
    }
}

impl DefaultParameters {
    pub fn to_request_parameters(&self) -> Result<RequestParameters, ParameterError> {
        RequestParameters::new(self.method, self.iterations)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub log_dir: String,
    pub debug: bool,
    pub console: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            log_dir: "logs".to_string(),
            debug: false,
            console: true,
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            service: ServiceSettings::default(),
            defaults: DefaultParameters::default(),
            download_dir: "downloads".to_string(),
            logging: LoggingSettings::default(),
        }
    }
}
