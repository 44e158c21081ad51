//! Decoding configuration onto pre-populated values

use crate::error::{ConfigError, ConfigResult};
use crate::merge::merge;
use crate::shape::Shape;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_yaml::Value;
use tracing::debug;

/// Decoder behavior switches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecoderOptions {
    /// Match source keys ignoring ASCII case, `-` and `_`
    pub normalize_keys: bool,
    /// Convert scalars to the kind already held by the destination
    pub weakly_typed: bool,
}

impl Default for DecoderOptions {
    fn default() -> Self {
        Self {
            normalize_keys: true,
            weakly_typed: true,
        }
    }
}

/// Merge-over-defaults decoder
#[derive(Debug, Clone, Default)]
pub struct Decoder {
    options: DecoderOptions,
}

impl Decoder {
    pub fn new(options: DecoderOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &DecoderOptions {
        &self.options
    }

    /// Decode `source` onto `destination`
    ///
    /// Fields absent from `source` keep the value `destination` already
    /// holds. On error `destination` is left untouched.
    pub fn decode_onto<T>(&self, destination: &mut T, source: Value) -> ConfigResult<()>
    where
        T: Serialize + DeserializeOwned,
    {
        let encode = |source| ConfigError::EncodeDestination { source };
        let mut tree = serde_yaml::to_value(&*destination).map_err(encode)?;
        let shape = Shape::of(&*destination).map_err(encode)?;
        merge(&mut tree, source, &shape, &self.options);
        debug!("Decoding merged configuration onto {}", std::any::type_name::<T>());
        *destination =
            serde_yaml::from_value(tree).map_err(|source| ConfigError::Decode { source })?;
        Ok(())
    }
}

/// Decode `source` onto `destination` with the default options
pub fn decode_onto<T>(destination: &mut T, source: Value) -> ConfigResult<()>
where
    T: Serialize + DeserializeOwned,
{
    Decoder::default().decode_onto(destination, source)
}
