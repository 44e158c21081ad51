//! Error types for configuration decoding

use thiserror::Error;

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors that can occur while preparing or decoding configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The destination could not be turned into a value tree
    #[error("failed to encode destination: {source}")]
    EncodeDestination {
        #[source]
        source: serde_yaml::Error,
    },

    /// The source configuration could not be serialized
    #[error("failed to encode source configuration: {source}")]
    EncodeSource {
        #[source]
        source: serde_yaml::Error,
    },

    /// Serialized YAML could not be parsed back
    #[error("failed to parse YAML: {source}")]
    ParseYaml {
        #[source]
        source: serde_yaml::Error,
    },

    /// The merged tree does not fit the destination type
    #[error("failed to decode configuration: {source}")]
    Decode {
        #[source]
        source: serde_yaml::Error,
    },

    /// Malformed IP prefix
    #[error("invalid prefix '{prefix}': {reason}")]
    InvalidPrefix { prefix: String, reason: String },
}
