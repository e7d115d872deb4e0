//! Typed tensors and their protobuf descriptors.
//!
//! The wire messages follow the field numbering of the Caffe2
//! `TensorProto`/`TensorProtos` messages so that stores written here carry
//! the same record layout.

use crate::{Error, Result};

/// Element type tag carried by every [`TensorProto`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum DataType {
    /// Not set
    Undefined = 0,
    /// 32-bit IEEE float
    Float = 1,
    /// 32-bit signed integer
    Int32 = 2,
}

/// One serialized tensor: shape, element type and raw data.
#[derive(Clone, PartialEq, prost::Message)]
pub struct TensorProto {
    /// Dimension sizes; empty for a scalar
    #[prost(int64, repeated, tag = "1")]
    pub dims: Vec<i64>,
    /// Element type
    #[prost(enumeration = "DataType", tag = "2")]
    pub data_type: i32,
    /// Little-endian f32 payload
    #[prost(float, repeated, tag = "3")]
    pub float_data: Vec<f32>,
    /// i32 payload
    #[prost(int32, repeated, tag = "4")]
    pub int32_data: Vec<i32>,
    /// Optional tensor name
    #[prost(string, tag = "7")]
    pub name: String,
}

/// Ordered list of tensors; the value stored under each key.
#[derive(Clone, PartialEq, prost::Message)]
pub struct TensorProtos {
    /// Tensors in record order
    #[prost(message, repeated, tag = "1")]
    pub protos: Vec<TensorProto>,
}

/// In-memory tensor, tagged by element type.
#[derive(Debug, Clone, PartialEq)]
pub enum Tensor {
    /// f32 tensor
    Float32 {
        /// Shape
        dims: Vec<usize>,
        /// Row-major elements
        data: Vec<f32>,
    },
    /// i32 tensor
    Int32 {
        /// Shape
        dims: Vec<usize>,
        /// Row-major elements
        data: Vec<i32>,
    },
}

impl Tensor {
    /// 1-D float tensor over `data`.
    #[must_use]
    pub fn vector(data: Vec<f32>) -> Self {
        Self::Float32 {
            dims: vec![data.len()],
            data,
        }
    }

    /// Scalar integer tensor.
    #[must_use]
    pub fn scalar(value: i32) -> Self {
        Self::Int32 {
            dims: Vec::new(),
            data: vec![value],
        }
    }

    /// Element type tag.
    #[must_use]
    pub const fn data_type(&self) -> DataType {
        match self {
            Self::Float32 { .. } => DataType::Float,
            Self::Int32 { .. } => DataType::Int32,
        }
    }

    /// Shape.
    #[must_use]
    pub fn dims(&self) -> &[usize] {
        match self {
            Self::Float32 { dims, .. } | Self::Int32 { dims, .. } => dims,
        }
    }

    /// Number of stored elements.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Float32 { data, .. } => data.len(),
            Self::Int32 { data, .. } => data.len(),
        }
    }

    /// Check if the tensor holds no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Convert to the wire descriptor.
    #[must_use]
    pub fn to_proto(&self) -> TensorProto {
        let dims = self
            .dims()
            .iter()
            .map(|&d| i64::try_from(d).unwrap_or(i64::MAX))
            .collect();
        match self {
            Self::Float32 { data, .. } => TensorProto {
                dims,
                data_type: DataType::Float as i32,
                float_data: data.clone(),
                ..TensorProto::default()
            },
            Self::Int32 { data, .. } => TensorProto {
                dims,
                data_type: DataType::Int32 as i32,
                int32_data: data.clone(),
                ..TensorProto::default()
            },
        }
    }

    /// Rebuild a tensor from its wire descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CorruptRecord`] for an unsupported type tag, a
    /// negative dimension, or an element count that disagrees with the shape.
    pub fn from_proto(proto: TensorProto) -> Result<Self> {
        let dims = proto
            .dims
            .iter()
            .map(|&d| {
                usize::try_from(d)
                    .map_err(|_| Error::CorruptRecord(format!("negative dimension {d}")))
            })
            .collect::<Result<Vec<usize>>>()?;
        let expected = element_count(&dims)?;

        let tensor = match DataType::try_from(proto.data_type) {
            Ok(DataType::Float) => Self::Float32 {
                dims,
                data: proto.float_data,
            },
            Ok(DataType::Int32) => Self::Int32 {
                dims,
                data: proto.int32_data,
            },
            _ => {
                return Err(Error::CorruptRecord(format!(
                    "unsupported data type tag {}",
                    proto.data_type
                )))
            }
        };

        if tensor.len() != expected {
            return Err(Error::CorruptRecord(format!(
                "shape {:?} needs {expected} elements, found {}",
                tensor.dims(),
                tensor.len()
            )));
        }
        Ok(tensor)
    }
}

fn element_count(dims: &[usize]) -> Result<usize> {
    dims.iter()
        .try_fold(1usize, |acc, &d| acc.checked_mul(d))
        .ok_or_else(|| Error::CorruptRecord(format!("shape {dims:?} overflows")))
}
