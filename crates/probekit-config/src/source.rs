//! Turning an in-memory source configuration into a decoder input

use crate::error::{ConfigError, ConfigResult};
use serde::Serialize;
use serde_yaml::Value;
use std::fmt;
use tracing::trace;

/// Path a source configuration takes before reaching the decoder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceForm {
    /// Converted straight from the in-memory value
    Native,
    /// Serialized to YAML text and parsed back into an untyped tree
    Yaml,
}

impl fmt::Display for SourceForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceForm::Native => write!(f, "native"),
            SourceForm::Yaml => write!(f, "YAML"),
        }
    }
}

/// Produce the value tree the decoder consumes for `source`
pub fn prepare<S: Serialize + ?Sized>(source: &S, form: SourceForm) -> ConfigResult<Value> {
    match form {
        SourceForm::Native => {
            serde_yaml::to_value(source).map_err(|source| ConfigError::EncodeSource { source })
        }
        SourceForm::Yaml => {
            let text = serde_yaml::to_string(source)
                .map_err(|source| ConfigError::EncodeSource { source })?;
            trace!("Source configuration as YAML:\n{}", text);
            serde_yaml::from_str(&text).map_err(|source| ConfigError::ParseYaml { source })
        }
    }
}
