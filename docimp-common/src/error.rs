//! Common error types for DocImport

use thiserror::Error;

/// Common result type for DocImport operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across DocImport services
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file could not be read or parsed
    #[error("Configuration error: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_message() {
        let err = Error::Config("Parse docimp-ie.toml failed".to_string());
        assert_eq!(
            err.to_string(),
            "Configuration error: Parse docimp-ie.toml failed"
        );
    }
}
