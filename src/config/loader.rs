//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::AugmentConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Read a TOML file without validating it.
///
/// Callers that layer overrides on top (startup flags) validate afterwards.
pub fn read_config(path: &Path) -> Result<AugmentConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    toml::from_str(&content).map_err(ConfigError::Parse)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<AugmentConfig, ConfigError> {
    let config = read_config(path)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_valid_file() {
        let path = std::env::temp_dir().join("edge_augment_loader_valid.toml");
        fs::write(&path, "[rules]\ntenant_id = \"abc\"\n").unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.rules.tenant_id, "abc");

        fs::remove_file(&path).unwrap_or_default();
    }

    #[test]
    fn test_load_reports_validation() {
        let path = std::env::temp_dir().join("edge_augment_loader_invalid.toml");
        fs::write(&path, "[origin]\naddress = \"nowhere\"\n").unwrap();

        let err = load_config(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref errors) if errors.len() == 2));
        assert!(err.to_string().starts_with("Validation failed: rules.tenant_id must be set, "));

        fs::remove_file(&path).unwrap_or_default();
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_config(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn test_load_bad_toml() {
        let path = std::env::temp_dir().join("edge_augment_loader_bad.toml");
        fs::write(&path, "[rules\n").unwrap();

        assert!(matches!(load_config(&path), Err(ConfigError::Parse(_))));

        fs::remove_file(&path).unwrap_or_default();
    }
}
