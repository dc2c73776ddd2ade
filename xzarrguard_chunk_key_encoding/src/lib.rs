//! The chunk key encodings of the [`xzarrguard`](https://docs.rs/xzarrguard) crate.
//!
//! A chunk key encoding maps the indices of a chunk in the chunk grid to a key relative to the array root.
//! Two encodings are supported:
//!  - `default`: `c` for a scalar array, otherwise `c` followed by the separated indices (e.g. `c/1/0`), with a `/` separator by default.
//!  - `v2`: `0` for a scalar array, otherwise the separated indices (e.g. `1.0`), with a `.` separator by default.
//!
//! See <https://zarr-specs.readthedocs.io/en/latest/v3/core/index.html#chunk-key-encoding>.
//!
//! ## Licence
//! `xzarrguard_chunk_key_encoding` is licensed under either of
//! - the Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0> or
//! - the MIT license <http://opensource.org/licenses/MIT>, at your option.

use derive_more::Display;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use xzarrguard_metadata::{ConfigurationInvalidError, MetadataV3};

/// A chunk key separator.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Display)]
pub enum ChunkKeySeparator {
    /// The slash '/' character.
    #[display("/")]
    Slash,
    /// The dot '.' character.
    #[display(".")]
    Dot,
}

impl TryFrom<char> for ChunkKeySeparator {
    type Error = char;

    fn try_from(separator: char) -> Result<Self, Self::Error> {
        match separator {
            '/' => Ok(Self::Slash),
            '.' => Ok(Self::Dot),
            _ => Err(separator),
        }
    }
}

impl Serialize for ChunkKeySeparator {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Slash => s.serialize_char('/'),
            Self::Dot => s.serialize_char('.'),
        }
    }
}

impl<'de> Deserialize<'de> for ChunkKeySeparator {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(d)?;
        match value.as_str() {
            Some("/") => Ok(Self::Slash),
            Some(".") => Ok(Self::Dot),
            _ => Err(serde::de::Error::custom(
                "chunk key separator must be a `.` or `/`.",
            )),
        }
    }
}

const fn default_separator_slash() -> ChunkKeySeparator {
    ChunkKeySeparator::Slash
}

const fn default_separator_dot() -> ChunkKeySeparator {
    ChunkKeySeparator::Dot
}

/// Configuration of the `default` chunk key encoding.
#[derive(Serialize, Deserialize, Clone, Copy, Eq, PartialEq, Debug)]
pub struct DefaultChunkKeyEncodingConfiguration {
    /// The chunk key separator, `/` if unset.
    #[serde(default = "default_separator_slash")]
    pub separator: ChunkKeySeparator,
}

/// Configuration of the `v2` chunk key encoding.
#[derive(Serialize, Deserialize, Clone, Copy, Eq, PartialEq, Debug)]
pub struct V2ChunkKeyEncodingConfiguration {
    /// The chunk key separator, `.` if unset.
    #[serde(default = "default_separator_dot")]
    pub separator: ChunkKeySeparator,
}

/// A chunk key encoding.
///
/// This is a closed set: metadata naming any other encoding fails conversion with [`ChunkKeyEncodingError::Unsupported`].
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum ChunkKeyEncoding {
    /// The `default` chunk key encoding.
    Default(ChunkKeySeparator),
    /// The `v2` chunk key encoding.
    V2(ChunkKeySeparator),
}

impl Default for ChunkKeyEncoding {
    fn default() -> Self {
        Self::Default(ChunkKeySeparator::Slash)
    }
}

/// A chunk key encoding error.
#[derive(Debug, Clone, Error)]
pub enum ChunkKeyEncodingError {
    /// The chunk key encoding is not supported.
    #[error("Unsupported chunk_key_encoding '{0}'")]
    Unsupported(String),
    /// The chunk key encoding configuration is invalid.
    #[error(transparent)]
    InvalidConfiguration(#[from] ConfigurationInvalidError),
}

impl ChunkKeyEncoding {
    /// The name of the `default` chunk key encoding.
    pub const DEFAULT_NAME: &'static str = "default";

    /// The name of the `v2` chunk key encoding.
    pub const V2_NAME: &'static str = "v2";

    /// Returns the name of the encoding.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Default(_) => Self::DEFAULT_NAME,
            Self::V2(_) => Self::V2_NAME,
        }
    }

    /// Returns the separator of the encoding.
    #[must_use]
    pub const fn separator(&self) -> ChunkKeySeparator {
        match self {
            Self::Default(separator) | Self::V2(separator) => *separator,
        }
    }

    /// Encode chunk grid indices into a key relative to the array root.
    #[must_use]
    pub fn encode(&self, chunk_grid_indices: &[u64]) -> String {
        match self {
            Self::Default(separator) => std::iter::once("c".to_string())
                .chain(chunk_grid_indices.iter().map(u64::to_string))
                .join(&separator.to_string()),
            Self::V2(_) if chunk_grid_indices.is_empty() => "0".to_string(),
            Self::V2(separator) => chunk_grid_indices.iter().join(&separator.to_string()),
        }
    }

    /// Convert to metadata.
    #[must_use]
    pub fn to_metadata(&self) -> MetadataV3 {
        let mut configuration = serde_json::Map::new();
        configuration.insert(
            "separator".to_string(),
            serde_json::Value::String(self.separator().to_string()),
        );
        MetadataV3::new_with_configuration(self.name(), configuration)
    }
}

impl TryFrom<&MetadataV3> for ChunkKeyEncoding {
    type Error = ChunkKeyEncodingError;

    fn try_from(metadata: &MetadataV3) -> Result<Self, Self::Error> {
        match metadata.name() {
            Self::DEFAULT_NAME => {
                let configuration: DefaultChunkKeyEncodingConfiguration =
                    metadata.to_configuration()?;
                Ok(Self::Default(configuration.separator))
            }
            Self::V2_NAME => {
                let configuration: V2ChunkKeyEncodingConfiguration =
                    metadata.to_configuration()?;
                Ok(Self::V2(configuration.separator))
            }
            name => Err(ChunkKeyEncodingError::Unsupported(name.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata(json: &str) -> MetadataV3 {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn slash_nd() {
        let encoding = ChunkKeyEncoding::Default(ChunkKeySeparator::Slash);
        assert_eq!(encoding.encode(&[1, 23, 45]), "c/1/23/45");
    }

    #[test]
    fn dot_nd() {
        let encoding = ChunkKeyEncoding::Default(ChunkKeySeparator::Dot);
        assert_eq!(encoding.encode(&[1, 23, 45]), "c.1.23.45");
        let encoding = ChunkKeyEncoding::V2(ChunkKeySeparator::Dot);
        assert_eq!(encoding.encode(&[1, 23, 45]), "1.23.45");
    }

    #[test]
    fn slash_scalar() {
        assert_eq!(ChunkKeyEncoding::default().encode(&[]), "c");
        let encoding = ChunkKeyEncoding::V2(ChunkKeySeparator::Slash);
        assert_eq!(encoding.encode(&[]), "0");
        assert_eq!(encoding.encode(&[2, 0]), "2/0");
    }

    #[test]
    fn from_metadata_defaults() {
        assert_eq!(
            ChunkKeyEncoding::try_from(&metadata(r#""default""#)).unwrap(),
            ChunkKeyEncoding::Default(ChunkKeySeparator::Slash)
        );
        assert_eq!(
            ChunkKeyEncoding::try_from(&metadata(r#"{"name":"v2"}"#)).unwrap(),
            ChunkKeyEncoding::V2(ChunkKeySeparator::Dot)
        );
        assert_eq!(
            ChunkKeyEncoding::try_from(&metadata(
                r#"{"name":"v2","configuration":{"separator":"/"}}"#
            ))
            .unwrap(),
            ChunkKeyEncoding::V2(ChunkKeySeparator::Slash)
        );
        assert_eq!(
            ChunkKeyEncoding::try_from(&metadata(
                r#"{"name":"default","configuration":{"separator":"."}}"#
            ))
            .unwrap(),
            ChunkKeyEncoding::Default(ChunkKeySeparator::Dot)
        );
    }

    #[test]
    fn from_metadata_errors() {
        let err = ChunkKeyEncoding::try_from(&metadata(r#""custom""#)).unwrap_err();
        assert!(matches!(err, ChunkKeyEncodingError::Unsupported(_)));
        assert_eq!(err.to_string(), "Unsupported chunk_key_encoding 'custom'");

        let err = ChunkKeyEncoding::try_from(&metadata(
            r#"{"name":"default","configuration":{"separator":"-"}}"#,
        ))
        .unwrap_err();
        assert!(matches!(err, ChunkKeyEncodingError::InvalidConfiguration(_)));
    }

    #[test]
    fn to_metadata() {
        let encoding = ChunkKeyEncoding::V2(ChunkKeySeparator::Dot);
        assert_eq!(
            serde_json::to_string(&encoding.to_metadata()).unwrap(),
            r#"{"name":"v2","configuration":{"separator":"."}}"#
        );
        assert_eq!(
            ChunkKeyEncoding::try_from(&encoding.to_metadata()).unwrap(),
            encoding
        );
    }

    #[test]
    fn separator_try_from_char() {
        assert_eq!(ChunkKeySeparator::try_from('/'), Ok(ChunkKeySeparator::Slash));
        assert_eq!(ChunkKeySeparator::try_from('.'), Ok(ChunkKeySeparator::Dot));
        assert_eq!(ChunkKeySeparator::try_from('-'), Err('-'));
    }
}
