//! Common type definitions for VexaDB

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Primary key type for documents
pub type PrimaryKey = u64;

/// Scalar and vector data types carried on the wire and in the catalog.
///
/// Vector element widths follow the canonical layout: fp32 is 4 bytes,
/// fp16 is an IEEE-754 half, int4 packs two values per byte (little nibble
/// first), binary32/binary64 pack `dimension / 32` u32 or `dimension / 64`
/// u64 words.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[repr(i32)]
pub enum DataType {
    #[default]
    Undefined = 0,
    Binary = 1,
    String = 2,
    Bool = 3,
    Int32 = 4,
    Int64 = 5,
    Uint32 = 6,
    Uint64 = 7,
    Float = 8,
    Double = 9,

    VectorBinary32 = 20,
    VectorBinary64 = 21,
    VectorFp16 = 22,
    VectorFp32 = 23,
    VectorFp64 = 24,
    VectorInt4 = 25,
    VectorInt8 = 26,
    VectorInt16 = 27,
}

impl DataType {
    pub fn from_i32(value: i32) -> DataType {
        match value {
            1 => DataType::Binary,
            2 => DataType::String,
            3 => DataType::Bool,
            4 => DataType::Int32,
            5 => DataType::Int64,
            6 => DataType::Uint32,
            7 => DataType::Uint64,
            8 => DataType::Float,
            9 => DataType::Double,
            20 => DataType::VectorBinary32,
            21 => DataType::VectorBinary64,
            22 => DataType::VectorFp16,
            23 => DataType::VectorFp32,
            24 => DataType::VectorFp64,
            25 => DataType::VectorInt4,
            26 => DataType::VectorInt8,
            27 => DataType::VectorInt16,
            _ => DataType::Undefined,
        }
    }

    pub fn as_str_name(&self) -> &'static str {
        match self {
            DataType::Undefined => "UNDEFINED",
            DataType::Binary => "BINARY",
            DataType::String => "STRING",
            DataType::Bool => "BOOL",
            DataType::Int32 => "INT32",
            DataType::Int64 => "INT64",
            DataType::Uint32 => "UINT32",
            DataType::Uint64 => "UINT64",
            DataType::Float => "FLOAT",
            DataType::Double => "DOUBLE",
            DataType::VectorBinary32 => "VECTOR_BINARY32",
            DataType::VectorBinary64 => "VECTOR_BINARY64",
            DataType::VectorFp16 => "VECTOR_FP16",
            DataType::VectorFp32 => "VECTOR_FP32",
            DataType::VectorFp64 => "VECTOR_FP64",
            DataType::VectorInt4 => "VECTOR_INT4",
            DataType::VectorInt8 => "VECTOR_INT8",
            DataType::VectorInt16 => "VECTOR_INT16",
        }
    }

    pub fn from_str_name(name: &str) -> Option<DataType> {
        match name {
            "UNDEFINED" => Some(DataType::Undefined),
            "BINARY" => Some(DataType::Binary),
            "STRING" => Some(DataType::String),
            "BOOL" => Some(DataType::Bool),
            "INT32" => Some(DataType::Int32),
            "INT64" => Some(DataType::Int64),
            "UINT32" => Some(DataType::Uint32),
            "UINT64" => Some(DataType::Uint64),
            "FLOAT" => Some(DataType::Float),
            "DOUBLE" => Some(DataType::Double),
            "VECTOR_BINARY32" => Some(DataType::VectorBinary32),
            "VECTOR_BINARY64" => Some(DataType::VectorBinary64),
            "VECTOR_FP16" => Some(DataType::VectorFp16),
            "VECTOR_FP32" => Some(DataType::VectorFp32),
            "VECTOR_FP64" => Some(DataType::VectorFp64),
            "VECTOR_INT4" => Some(DataType::VectorInt4),
            "VECTOR_INT8" => Some(DataType::VectorInt8),
            "VECTOR_INT16" => Some(DataType::VectorInt16),
            _ => None,
        }
    }

    /// Whether this type describes a vector column.
    pub fn is_vector(&self) -> bool {
        matches!(
            self,
            DataType::VectorBinary32
                | DataType::VectorBinary64
                | DataType::VectorFp16
                | DataType::VectorFp32
                | DataType::VectorFp64
                | DataType::VectorInt4
                | DataType::VectorInt16
                | DataType::VectorInt8
        )
    }

    /// Expected serialized byte length of a vector of `dimension` elements.
    ///
    /// Binary types require the dimension to be a multiple of the word
    /// width; int4 requires an even dimension.
    pub fn vector_byte_len(&self, dimension: u32) -> Result<usize> {
        let dim = dimension as usize;
        match self {
            DataType::VectorFp32 => Ok(dim * 4),
            DataType::VectorFp16 => Ok(dim * 2),
            DataType::VectorFp64 => Ok(dim * 8),
            DataType::VectorInt16 => Ok(dim * 2),
            DataType::VectorInt8 => Ok(dim),
            DataType::VectorInt4 => {
                if dim % 2 != 0 {
                    return Err(Error::MismatchedDimension);
                }
                Ok(dim / 2)
            }
            DataType::VectorBinary32 => {
                if dim % 32 != 0 {
                    return Err(Error::MismatchedDimension);
                }
                Ok(dim / 32 * 4)
            }
            DataType::VectorBinary64 => {
                if dim % 64 != 0 {
                    return Err(Error::MismatchedDimension);
                }
                Ok(dim / 64 * 8)
            }
            _ => Err(Error::InvalidDataType),
        }
    }
}

/// Index structure types; a single graph-ANN variant today.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[repr(i32)]
pub enum IndexType {
    #[default]
    Undefined = 0,
    VectorGraph = 1,
}

impl IndexType {
    pub fn from_i32(value: i32) -> IndexType {
        match value {
            1 => IndexType::VectorGraph,
            _ => IndexType::Undefined,
        }
    }

    pub fn as_str_name(&self) -> &'static str {
        match self {
            IndexType::Undefined => "UNDEFINED",
            IndexType::VectorGraph => "VECTOR_GRAPH",
        }
    }

    pub fn from_str_name(name: &str) -> Option<IndexType> {
        match name {
            "UNDEFINED" => Some(IndexType::Undefined),
            "VECTOR_GRAPH" => Some(IndexType::VectorGraph),
            _ => None,
        }
    }
}

/// Row operation kinds
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[repr(i32)]
pub enum OperationType {
    #[default]
    Insert = 0,
    Update = 1,
    Delete = 2,
}

impl OperationType {
    pub fn from_i32(value: i32) -> OperationType {
        match value {
            1 => OperationType::Update,
            2 => OperationType::Delete,
            _ => OperationType::Insert,
        }
    }

    pub fn as_str_name(&self) -> &'static str {
        match self {
            OperationType::Insert => "INSERT",
            OperationType::Update => "UPDATE",
            OperationType::Delete => "DELETE",
        }
    }

    pub fn from_str_name(name: &str) -> Option<OperationType> {
        match name {
            "INSERT" => Some(OperationType::Insert),
            "UPDATE" => Some(OperationType::Update),
            "DELETE" => Some(OperationType::Delete),
            _ => None,
        }
    }
}

/// Collection lifecycle status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[repr(i32)]
pub enum CollectionStatus {
    #[default]
    Initialized = 0,
    Serving = 1,
    Dropped = 2,
}

impl CollectionStatus {
    pub fn from_i32(value: i32) -> CollectionStatus {
        match value {
            1 => CollectionStatus::Serving,
            2 => CollectionStatus::Dropped,
            _ => CollectionStatus::Initialized,
        }
    }

    pub fn as_str_name(&self) -> &'static str {
        match self {
            CollectionStatus::Initialized => "INITIALIZED",
            CollectionStatus::Serving => "SERVING",
            CollectionStatus::Dropped => "DROPPED",
        }
    }

    pub fn from_str_name(name: &str) -> Option<CollectionStatus> {
        match name {
            "INITIALIZED" => Some(CollectionStatus::Initialized),
            "SERVING" => Some(CollectionStatus::Serving),
            "DROPPED" => Some(CollectionStatus::Dropped),
            _ => None,
        }
    }
}
