use derive_more::Display;
use xzarrguard_metadata::MetadataV3;
use zarrs::array::{data_type, ElementOwned, FillValue};

use super::DatasetError;

/// A data type of a dataset array.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Display)]
pub enum DataType {
    /// `bool`
    #[display("bool")]
    Bool,
    /// `int8`
    #[display("int8")]
    Int8,
    /// `int16`
    #[display("int16")]
    Int16,
    /// `int32`
    #[display("int32")]
    Int32,
    /// `int64`
    #[display("int64")]
    Int64,
    /// `uint8`
    #[display("uint8")]
    UInt8,
    /// `uint16`
    #[display("uint16")]
    UInt16,
    /// `uint32`
    #[display("uint32")]
    UInt32,
    /// `uint64`
    #[display("uint64")]
    UInt64,
    /// `float32`
    #[display("float32")]
    Float32,
    /// `float64`
    #[display("float64")]
    Float64,
}

const DATA_TYPES: [DataType; 11] = [
    DataType::Bool,
    DataType::Int8,
    DataType::Int16,
    DataType::Int32,
    DataType::Int64,
    DataType::UInt8,
    DataType::UInt16,
    DataType::UInt32,
    DataType::UInt64,
    DataType::Float32,
    DataType::Float64,
];

impl DataType {
    /// The `zarrs` data type.
    #[must_use]
    pub fn to_zarrs(&self) -> zarrs::array::DataType {
        match self {
            Self::Bool => data_type::bool(),
            Self::Int8 => data_type::int8(),
            Self::Int16 => data_type::int16(),
            Self::Int32 => data_type::int32(),
            Self::Int64 => data_type::int64(),
            Self::UInt8 => data_type::uint8(),
            Self::UInt16 => data_type::uint16(),
            Self::UInt32 => data_type::uint32(),
            Self::UInt64 => data_type::uint64(),
            Self::Float32 => data_type::float32(),
            Self::Float64 => data_type::float64(),
        }
    }

    /// The default fill value: zero, or `false`.
    #[must_use]
    pub fn default_fill_value(&self) -> FillValue {
        match self {
            Self::Bool => FillValue::from(false),
            Self::Int8 => FillValue::from(0i8),
            Self::Int16 => FillValue::from(0i16),
            Self::Int32 => FillValue::from(0i32),
            Self::Int64 => FillValue::from(0i64),
            Self::UInt8 => FillValue::from(0u8),
            Self::UInt16 => FillValue::from(0u16),
            Self::UInt32 => FillValue::from(0u32),
            Self::UInt64 => FillValue::from(0u64),
            Self::Float32 => FillValue::from(0.0f32),
            Self::Float64 => FillValue::from(0.0f64),
        }
    }

    /// Convert to metadata.
    #[must_use]
    pub fn to_metadata(&self) -> MetadataV3 {
        MetadataV3::new(&self.to_string())
    }
}

impl TryFrom<&MetadataV3> for DataType {
    type Error = DatasetError;

    fn try_from(metadata: &MetadataV3) -> Result<Self, Self::Error> {
        DATA_TYPES
            .into_iter()
            .find(|data_type| data_type.to_string() == metadata.name())
            .ok_or_else(|| DatasetError::UnsupportedDataType(metadata.name().to_string()))
    }
}

/// An element type of a dataset array.
pub trait Element: ElementOwned + Into<FillValue> + Copy + Send + Sync + 'static {
    /// The data type of the element.
    const DATA_TYPE: DataType;
}

macro_rules! impl_element {
    ($t:ty, $data_type:ident) => {
        impl Element for $t {
            const DATA_TYPE: DataType = DataType::$data_type;
        }
    };
}

impl_element!(bool, Bool);
impl_element!(i8, Int8);
impl_element!(i16, Int16);
impl_element!(i32, Int32);
impl_element!(i64, Int64);
impl_element!(u8, UInt8);
impl_element!(u16, UInt16);
impl_element!(u32, UInt32);
impl_element!(u64, UInt64);
impl_element!(f32, Float32);
impl_element!(f64, Float64);
