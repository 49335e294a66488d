//! Configuration error types.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error when reading `{0}`")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Config file parsing error")]
    Toml(#[from] toml::de::Error),

    #[error("Config validation error: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Error, ErrorKind};

    #[test]
    fn test_config_error_display() {
        let io_err = ConfigError::Io(
            PathBuf::from("docmeta.toml"),
            Error::new(ErrorKind::PermissionDenied, "denied"),
        );
        assert!(io_err.to_string().contains("docmeta.toml"));

        let validation = ConfigError::Validation("`default_author` must not be blank".into());
        assert!(validation.to_string().contains("default_author"));
    }
}
