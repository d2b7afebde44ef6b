//! Configuration file loader.

use super::error::{ConfigError, ConfigResult};
use super::types::ControlPlaneConfig;
use super::validation::Validator;
use crate::waf::{Grammar, RuleCollection};
use std::path::Path;
use tracing::{debug, info};

/// Configuration loader with validation support.
#[derive(Debug, Default)]
pub struct ConfigLoader {
    /// Validators to run on loaded configuration.
    validators: Vec<Box<dyn Validator>>,
}

impl ConfigLoader {
    /// Create a new configuration loader.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a validator to the loader.
    #[must_use]
    pub fn with_validator<V: Validator + 'static>(mut self, validator: V) -> Self {
        self.validators.push(Box::new(validator));
        self
    }

    /// Load configuration from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file does not exist
    /// - The file cannot be read
    /// - The TOML is malformed
    /// - Validation fails
    pub fn load<P: AsRef<Path>>(&self, path: P) -> ConfigResult<ControlPlaneConfig> {
        let content = read(path.as_ref())?;
        let config = self.load_str(&content)?;
        info!("Loaded control plane configuration from {}", path.as_ref().display());
        Ok(config)
    }

    /// Load configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The TOML is malformed
    /// - Validation fails
    pub fn load_str(&self, content: &str) -> ConfigResult<ControlPlaneConfig> {
        let config: ControlPlaneConfig = toml::from_str(content)?;
        self.validate(&config)?;
        Ok(config)
    }

    /// Validate a configuration against all registered validators.
    fn validate(&self, config: &ControlPlaneConfig) -> ConfigResult<()> {
        for validator in &self.validators {
            let result = validator.validate(config);
            for warning in result.warnings() {
                debug!("Configuration warning at {}: {}", warning.field, warning.message);
            }
            if !result.is_valid() {
                let errors: Vec<String> =
                    result.errors_only().iter().map(|e| e.to_string()).collect();
                return Err(ConfigError::ValidationError(errors.join("; ")));
            }
        }
        Ok(())
    }

    /// Load configuration or return default if file doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_or_default<P: AsRef<Path>>(&self, path: P) -> ConfigResult<ControlPlaneConfig> {
        let path = path.as_ref();
        if path.exists() {
            self.load(path)
        } else {
            Ok(ControlPlaneConfig::default())
        }
    }

    /// Save configuration to a file.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn save<P: AsRef<Path>>(&self, config: &ControlPlaneConfig, path: P) -> ConfigResult<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(config)?;
        std::fs::write(path, content).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(())
    }

    /// Parse a rule collection document and check it against the grammar
    /// configured in `config.engine`.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed or the collection violates
    /// the grammar or a collection-level constraint.
    pub fn load_collection_str(
        &self,
        config: &ControlPlaneConfig,
        content: &str,
    ) -> ConfigResult<RuleCollection> {
        let collection: RuleCollection = toml::from_str(content)?;
        collection.check(&Grammar::from_config(&config.engine))?;
        debug!(
            "Accepted {} '{}' with {} rule(s)",
            collection.kind.as_str(),
            collection.name,
            collection.rules.len()
        );
        Ok(collection)
    }

    /// Load a rule collection document from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, or for any reason
    /// [`ConfigLoader::load_collection_str`] fails.
    pub fn load_collection<P: AsRef<Path>>(
        &self,
        config: &ControlPlaneConfig,
        path: P,
    ) -> ConfigResult<RuleCollection> {
        let content = read(path.as_ref())?;
        self.load_collection_str(config, &content)
    }
}

fn read(path: &Path) -> ConfigResult<String> {
    if !path.exists() {
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }
    std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })
}
