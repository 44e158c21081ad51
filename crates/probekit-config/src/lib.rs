//! Configuration decoding for test harnesses
//!
//! Configuration is decoded onto a value that already holds its defaults:
//! only what the source specifies is overwritten.
//!
//! - [`Decoder`] merges a source value tree over the destination and
//!   decodes the result back into the destination type
//! - [`prepare`] produces the source tree, either straight from the
//!   in-memory value or after a round-trip through YAML text
//! - [`SubnetMap`] maps IP prefixes to values with longest-prefix lookups
//!
//! # Example
//!
//! ```ignore
//! use probekit_config::{prepare, Decoder, SourceForm};
//!
//! let mut config = ServerConfig::default();
//! let source = prepare(&serde_json::json!({"listen": "127.0.0.1:80"}), SourceForm::Yaml)?;
//! Decoder::default().decode_onto(&mut config, source)?;
//! ```

mod decoder;
mod error;
mod merge;
mod shape;
mod source;
mod subnet;

pub use decoder::{decode_onto, Decoder, DecoderOptions};
pub use error::{ConfigError, ConfigResult};
pub use source::{prepare, SourceForm};
pub use subnet::{Prefix, SubnetMap};

// Re-export serde_yaml::Value for convenience
pub use serde_yaml::Value;
