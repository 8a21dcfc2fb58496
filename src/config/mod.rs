use crate::models::ClientConfig;
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;

/// Environment variable that overrides `service.base_url`.
pub const SERVICE_URL_ENV: &str = "IMPUTEFLOW_SERVICE_URL";

/// Name of the client configuration file inside the config directory.
pub const CONFIG_FILE_NAME: &str = "client.yaml";

/// Configuration manager for loading and saving the client YAML file.
///
/// Resolution order for every field: environment override (service address
/// only), then `client.yaml`, then the built-in default.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_dir: Utf8PathBuf,
    config_path: Utf8PathBuf,
}

impl ConfigManager {
    /// Create a new ConfigManager with the specified configuration directory.
    ///
    /// # Arguments
    /// * `config_dir` - Directory containing `client.yaml` (e.g., "imputeflow")
    pub fn new<P: AsRef<Utf8Path>>(config_dir: P) -> Result<Self> {
        let config_dir = config_dir.as_ref().to_path_buf();

        // Create config directory if it doesn't exist
        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)
                .with_context(|| format!("Failed to create config directory: {}", config_dir))?;
        }

        Ok(Self {
            config_path: config_dir.join(CONFIG_FILE_NAME),
            config_dir,
        })
    }

    /// Load the client configuration, honouring [`SERVICE_URL_ENV`].
    ///
    /// # Returns
    /// The loaded ClientConfig, or defaults if the file doesn't exist
    pub fn load_config(&self) -> Result<ClientConfig> {
        let service_url = std::env::var(SERVICE_URL_ENV)
            .ok()
            .filter(|url| !url.trim().is_empty());
        self.load_config_with_override(service_url)
    }

    /// Load the client configuration with an explicit service address override.
    pub fn load_config_with_override(&self, service_url: Option<String>) -> Result<ClientConfig> {
        if !self.config_path.exists() {
            tracing::warn!("Config file not found at {}, using defaults", self.config_path);
        }

        if let Some(url) = &service_url {
            tracing::info!("Service address overridden by {}: {}", SERVICE_URL_ENV, url);
        }

        let settings = config::Config::builder()
            .add_source(
                config::File::new(self.config_path.as_str(), config::FileFormat::Yaml).required(false),
            )
            .set_override_option("service.base_url", service_url)
            .context("Failed to apply service address override")?
            .build()
            .with_context(|| format!("Failed to read client config: {}", self.config_path))?;

        let config: ClientConfig = settings
            .try_deserialize()
            .with_context(|| format!("Failed to parse client config: {}", self.config_path))?;

        tracing::info!(
            "Loaded client config: service={}, method={}, iterations={}",
            config.service.base_url,
            config.defaults.method,
            config.defaults.iterations
        );
        Ok(config)
    }

    /// Save the client configuration file.
    ///
    /// # Arguments
    /// * `config` - The ClientConfig to save
    pub fn save_config(&self, config: &ClientConfig) -> Result<()> {
        let yaml_string =
            serde_yaml_ng::to_string(config).context("Failed to serialize client config to YAML")?;

        fs::write(&self.config_path, yaml_string)
            .with_context(|| format!("Failed to write client config: {}", self.config_path))?;

        tracing::info!("Saved client config to {}", self.config_path);
        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir(&self) -> &Utf8Path {
        &self.config_dir
    }

    /// Get the configuration file path.
    pub fn config_path(&self) -> &Utf8Path {
        &self.config_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ImputationMethod;
    use tempfile::TempDir;

    fn create_test_config_manager() -> (ConfigManager, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let config_path = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
        let manager = ConfigManager::new(&config_path).unwrap();
        (manager, temp_dir)
    }

    #[test]
    fn test_create_config_manager() {
        let (manager, _temp_dir) = create_test_config_manager();
        assert!(manager.config_path().ends_with(CONFIG_FILE_NAME));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let (manager, _temp_dir) = create_test_config_manager();
        let config = manager.load_config_with_override(None).unwrap();
        assert_eq!(config, ClientConfig::default());
    }

    #[test]
    fn test_load_save_config() {
        let (manager, _temp_dir) = create_test_config_manager();

        let mut config = ClientConfig::default();
        config.defaults.method = ImputationMethod::Pmm;
        config.defaults.iterations = 25;
        config.service.base_url = "https://impute.example.com".to_string();
        manager.save_config(&config).unwrap();

        let loaded = manager.load_config_with_override(None).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_override_beats_file() {
        let (manager, _temp_dir) = create_test_config_manager();
        fs::write(
            manager.config_path(),
            "service:\n  base_url: http://from-file:5000\n  request_timeout_secs: 30\n",
        )
        .unwrap();

        let loaded = manager
            .load_config_with_override(Some("http://from-env:8080".to_string()))
            .unwrap();
        assert_eq!(loaded.service.base_url, "http://from-env:8080");
        assert_eq!(loaded.service.request_timeout_secs, 30);
        assert_eq!(loaded.service.connect_timeout_secs, 10);
    }

    #[test]
    fn test_invalid_yaml_is_an_error() {
        let (manager, _temp_dir) = create_test_config_manager();
        fs::write(manager.config_path(), "defaults:\n  method: telepathy\n").unwrap();

        assert!(manager.load_config_with_override(None).is_err());
    }
}
