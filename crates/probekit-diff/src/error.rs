//! Error type for value serialization

use std::fmt::Display;
use thiserror::Error;

/// A value could not be turned into a comparable tree
#[derive(Debug, Error)]
#[error("{message}")]
pub struct DiffError {
    message: String,
}

impl DiffError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl serde::ser::Error for DiffError {
    fn custom<T: Display>(msg: T) -> Self {
        Self::new(msg.to_string())
    }
}
