//! Chunk addressing.
//!
//! A [`ChunkAddressing`] enumerates the expected chunks of an array, tests coordinates for bounds, and maps chunk grid indices to store keys.

use std::{
    cmp::Ordering,
    fmt,
    hash::{Hash, Hasher},
};

use serde::{
    de::{self, Unexpected, Visitor},
    Deserialize, Deserializer, Serialize,
};
use thiserror::Error;
use xzarrguard_chunk_grid::{
    indices_inbounds, ArrayIndices, ArrayShape, ChunkIndices, IncompatibleDimensionalityError,
};
use xzarrguard_chunk_key_encoding::{ChunkKeyEncoding, ChunkKeyEncodingError};
use xzarrguard_storage::{StoreKey, StoreKeyError};

use crate::layout::ArraySpec;

/// A reference to a chunk of an array: its chunk grid coordinate and its key relative to the array root.
///
/// Equality, hashing, and ordering consider the coordinate only.
/// Coordinates are signed so that negative coordinates read from a manifest can be represented and classified as out of bounds.
/// A deserialised coordinate component may be a float with an integral value, such as `1.0`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChunkRef {
    #[serde(deserialize_with = "deserialize_coord")]
    coord: Vec<i64>,
    key: String,
}

impl ChunkRef {
    /// Create a new chunk reference.
    #[must_use]
    pub fn new(coord: Vec<i64>, key: impl Into<String>) -> Self {
        Self {
            coord,
            key: key.into(),
        }
    }

    /// The chunk grid coordinate.
    #[must_use]
    pub fn coord(&self) -> &[i64] {
        &self.coord
    }

    /// The chunk key relative to the array root.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The coordinate as chunk grid indices, or [`None`] if any component is negative.
    #[must_use]
    pub fn indices(&self) -> Option<ArrayIndices> {
        coord_to_indices(&self.coord)
    }
}

impl PartialEq for ChunkRef {
    fn eq(&self, other: &Self) -> bool {
        self.coord == other.coord
    }
}

impl Eq for ChunkRef {}

impl Hash for ChunkRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.coord.hash(state);
    }
}

impl PartialOrd for ChunkRef {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ChunkRef {
    fn cmp(&self, other: &Self) -> Ordering {
        self.coord.cmp(&other.coord)
    }
}

/// A chunk coordinate read from JSON.
///
/// Components are integers, or floats with an integral value in the range of [`i64`].
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub(crate) struct Coord(#[serde(deserialize_with = "deserialize_coord")] pub(crate) Vec<i64>);

struct CoordComponent(i64);

impl<'de> Deserialize<'de> for CoordComponent {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(CoordComponentVisitor)
    }
}

struct CoordComponentVisitor;

impl Visitor<'_> for CoordComponentVisitor {
    type Value = CoordComponent;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("an integral chunk coordinate")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        Ok(CoordComponent(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        i64::try_from(v)
            .map(CoordComponent)
            .map_err(|_| E::invalid_value(Unexpected::Unsigned(v), &self))
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
        // [-2^63, 2^63) is exactly the range of i64
        let in_range = (i64::MIN as f64..-(i64::MIN as f64)).contains(&v);
        if in_range && v.fract() == 0.0 {
            Ok(CoordComponent(v as i64))
        } else {
            Err(E::invalid_value(Unexpected::Float(v), &self))
        }
    }
}

fn deserialize_coord<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<i64>, D::Error> {
    let components = Vec::<CoordComponent>::deserialize(deserializer)?;
    Ok(components.into_iter().map(|c| c.0).collect())
}

/// Convert a signed chunk coordinate to chunk grid indices, or [`None`] if any component is negative.
#[must_use]
pub fn coord_to_indices(coord: &[i64]) -> Option<ArrayIndices> {
    coord.iter().map(|&c| u64::try_from(c).ok()).collect()
}

/// Convert chunk grid indices to a signed chunk coordinate.
///
/// Indices beyond [`i64::MAX`] saturate.
#[must_use]
pub fn indices_to_coord(indices: &[u64]) -> Vec<i64> {
    indices
        .iter()
        .map(|&i| i64::try_from(i).unwrap_or(i64::MAX))
        .collect()
}

/// A chunk addressing error.
#[derive(Debug, Clone, Error)]
pub enum ChunkAddressError {
    /// The array shape and chunk shape have different ranks.
    #[error("shape and chunk_shape rank mismatch for array '{name}': {source}")]
    RankMismatch {
        /// The array name.
        name: String,
        /// The dimensionality error.
        source: IncompatibleDimensionalityError,
    },
    /// The chunk key encoding of the array is unsupported or invalid.
    #[error("{source} for array '{name}'")]
    UnsupportedEncoding {
        /// The array name.
        name: String,
        /// The chunk key encoding error.
        source: ChunkKeyEncodingError,
    },
    /// An encoded chunk key is not a valid store key.
    #[error(transparent)]
    InvalidStoreKey(#[from] StoreKeyError),
}

/// Chunk addressing for an array.
#[derive(Clone, Debug)]
pub struct ChunkAddressing<'a> {
    spec: &'a ArraySpec,
    grid_shape: ArrayShape,
    encoding: ChunkKeyEncoding,
}

impl<'a> ChunkAddressing<'a> {
    /// Create the chunk addressing for an array.
    ///
    /// # Errors
    /// Returns [`ChunkAddressError`] if the array shape and chunk shape ranks differ, or the chunk key encoding is unsupported.
    pub fn new(spec: &'a ArraySpec) -> Result<Self, ChunkAddressError> {
        let grid_shape = spec.chunk_grid().grid_shape(spec.shape()).map_err(|source| {
            ChunkAddressError::RankMismatch {
                name: spec.name().to_string(),
                source,
            }
        })?;
        let encoding =
            spec.chunk_key_encoding()
                .map_err(|source| ChunkAddressError::UnsupportedEncoding {
                    name: spec.name().to_string(),
                    source,
                })?;
        Ok(Self {
            spec,
            grid_shape,
            encoding,
        })
    }

    /// The array spec.
    #[must_use]
    pub fn spec(&self) -> &ArraySpec {
        self.spec
    }

    /// The number of chunks along each dimension.
    #[must_use]
    pub fn grid_shape(&self) -> &[u64] {
        &self.grid_shape
    }

    /// The chunk key encoding.
    #[must_use]
    pub fn encoding(&self) -> ChunkKeyEncoding {
        self.encoding
    }

    /// The indices of every chunk in the grid, in C order.
    ///
    /// A rank 0 array has exactly one chunk with empty indices.
    /// Any zero-length dimension yields no chunks.
    #[must_use]
    pub fn expected_chunk_indices(&self) -> ChunkIndices {
        ChunkIndices::new(self.grid_shape.clone())
    }

    /// Returns true if `coord` has the rank of the grid and every component is within `[0, grid_shape[i])`.
    #[must_use]
    pub fn contains(&self, coord: &[i64]) -> bool {
        coord_to_indices(coord).is_some_and(|indices| indices_inbounds(&indices, &self.grid_shape))
    }

    /// The key of a chunk relative to the array root.
    #[must_use]
    pub fn chunk_key(&self, chunk_indices: &[u64]) -> String {
        self.encoding.encode(chunk_indices)
    }

    /// The store key of a chunk.
    ///
    /// # Errors
    /// Returns [`ChunkAddressError::InvalidStoreKey`] if the encoded key is not a valid store key.
    pub fn chunk_store_key(&self, chunk_indices: &[u64]) -> Result<StoreKey, ChunkAddressError> {
        Ok(self.spec.path().key(&self.chunk_key(chunk_indices))?)
    }

    /// The [`ChunkRef`] of a chunk.
    #[must_use]
    pub fn chunk_ref(&self, chunk_indices: &[u64]) -> ChunkRef {
        ChunkRef::new(indices_to_coord(chunk_indices), self.chunk_key(chunk_indices))
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::HashSet, num::NonZeroU64};

    use xzarrguard_chunk_key_encoding::ChunkKeySeparator;
    use xzarrguard_metadata::MetadataV3;
    use xzarrguard_storage::StorePrefix;

    use super::*;

    fn spec(shape: &[u64], chunk_shape: &[u64], encoding: ChunkKeyEncoding) -> ArraySpec {
        ArraySpec::new(
            "var",
            StorePrefix::new("var/").unwrap(),
            shape.to_vec(),
            chunk_shape
                .iter()
                .map(|&s| NonZeroU64::new(s).unwrap())
                .collect(),
            encoding.to_metadata(),
        )
    }

    #[test]
    fn chunk_ref_identity_is_coord() {
        let a = ChunkRef::new(vec![0, 1], "c/0/1");
        let b = ChunkRef::new(vec![0, 1], "0.1");
        assert_eq!(a, b);
        assert_eq!(HashSet::from([a.clone(), b]).len(), 1);
        assert!(a < ChunkRef::new(vec![1, 0], "c/1/0"));
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            r#"{"coord":[0,1],"key":"c/0/1"}"#
        );
    }

    #[test]
    fn chunk_ref_integral_float_coord() {
        let chunk_ref: ChunkRef =
            serde_json::from_str(r#"{"coord": [0.0, 1.0, -2.0], "key": "c/0/1/-2"}"#).unwrap();
        assert_eq!(chunk_ref.coord(), &[0, 1, -2]);
        assert_eq!(
            serde_json::to_string(&chunk_ref).unwrap(),
            r#"{"coord":[0,1,-2],"key":"c/0/1/-2"}"#
        );

        for coord in ["[0.5]", "[true]", r#"["0"]"#, "[1e300]", "[9223372036854775808]"] {
            let json = format!(r#"{{"coord": {coord}, "key": "c/0"}}"#);
            assert!(serde_json::from_str::<ChunkRef>(&json).is_err(), "{coord}");
        }
    }

    #[test]
    fn coord_components() {
        let coords: Vec<Coord> = serde_json::from_str("[[0, 1.0], [-3.0], []]").unwrap();
        assert_eq!(
            coords,
            vec![Coord(vec![0, 1]), Coord(vec![-3]), Coord(vec![])]
        );
        let err = serde_json::from_str::<Coord>("[0.5]").unwrap_err();
        assert!(err
            .to_string()
            .contains("expected an integral chunk coordinate"));
    }

    #[test]
    fn chunk_addressing_default() {
        let spec = spec(&[5, 4], &[2, 2], ChunkKeyEncoding::default());
        let addressing = ChunkAddressing::new(&spec).unwrap();
        assert_eq!(addressing.grid_shape(), &[3, 2]);
        assert_eq!(addressing.expected_chunk_indices().len(), 6);
        assert_eq!(addressing.chunk_key(&[2, 1]), "c/2/1");
        assert_eq!(
            addressing.chunk_store_key(&[2, 1]).unwrap().as_str(),
            "var/c/2/1"
        );
        assert!(addressing.contains(&[2, 1]));
        assert!(!addressing.contains(&[3, 0]));
        assert!(!addressing.contains(&[-1, 0]));
        assert!(!addressing.contains(&[0]));
        assert_eq!(addressing.chunk_ref(&[1, 0]), ChunkRef::new(vec![1, 0], "c/1/0"));
    }

    #[test]
    fn chunk_addressing_v2() {
        let spec = spec(&[4, 4], &[2, 2], ChunkKeyEncoding::V2(ChunkKeySeparator::Dot));
        let addressing = ChunkAddressing::new(&spec).unwrap();
        assert_eq!(addressing.chunk_key(&[1, 0]), "1.0");
        assert_eq!(addressing.chunk_ref(&[1, 0]).key(), "1.0");
    }

    #[test]
    fn chunk_addressing_rank_0() {
        let spec = spec(&[], &[], ChunkKeyEncoding::default());
        let addressing = ChunkAddressing::new(&spec).unwrap();
        let indices: Vec<_> = addressing
            .expected_chunk_indices()
            .iter()
            .map(|indices| indices.to_vec())
            .collect();
        assert_eq!(indices, vec![Vec::<u64>::new()]);
        assert_eq!(addressing.chunk_key(&[]), "c");
        assert!(addressing.contains(&[]));

        let spec = ArraySpec::new(
            "var",
            StorePrefix::root(),
            vec![],
            vec![],
            ChunkKeyEncoding::V2(ChunkKeySeparator::Dot).to_metadata(),
        );
        let addressing = ChunkAddressing::new(&spec).unwrap();
        assert_eq!(addressing.chunk_key(&[]), "0");
        assert_eq!(addressing.chunk_store_key(&[]).unwrap().as_str(), "0");
    }

    #[test]
    fn chunk_addressing_zero_extent() {
        let spec = spec(&[0, 4], &[2, 2], ChunkKeyEncoding::default());
        let addressing = ChunkAddressing::new(&spec).unwrap();
        assert!(addressing.expected_chunk_indices().is_empty());
    }

    #[test]
    fn chunk_addressing_errors() {
        let spec = spec(&[4, 4], &[2], ChunkKeyEncoding::default());
        assert!(matches!(
            ChunkAddressing::new(&spec),
            Err(ChunkAddressError::RankMismatch { .. })
        ));

        let spec = ArraySpec::new(
            "var",
            StorePrefix::root(),
            vec![4],
            vec![NonZeroU64::new(2).unwrap()],
            MetadataV3::new("custom"),
        );
        let err = ChunkAddressing::new(&spec).unwrap_err();
        assert!(matches!(err, ChunkAddressError::UnsupportedEncoding { .. }));
        assert!(err.to_string().contains("Unsupported chunk_key_encoding 'custom'"));
    }
}
