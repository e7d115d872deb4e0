//! Example record codec
//!
//! One [`Example`] is stored as a [`TensorProtos`] message holding exactly
//! two tensors, always in this order:
//!
//! ```text
//! TensorProtos
//!   ├── [0] FLOAT  dims=[N]  features
//!   └── [1] INT32  dims=[]   label   ([1] also accepted on decode)
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use tensorkv::data::Example;
//! use tensorkv::record::{decode_example, encode_example};
//!
//! let example = Example::new(vec![5.1, 3.5, 1.4, 0.2], 0);
//! let bytes = encode_example(&example);
//! assert_eq!(decode_example(&bytes)?, example);
//! # Ok::<(), tensorkv::Error>(())
//! ```

mod tensor;

pub use tensor::{DataType, Tensor, TensorProto, TensorProtos};

use crate::data::Example;
use crate::{Error, Result};
use prost::Message;

/// Serialize an example as a features tensor followed by a label tensor.
#[must_use]
pub fn encode_example(example: &Example) -> Vec<u8> {
    let protos = TensorProtos {
        protos: vec![
            Tensor::vector(example.features.clone()).to_proto(),
            Tensor::scalar(example.label).to_proto(),
        ],
    };
    protos.encode_to_vec()
}

/// Decode bytes written by [`encode_example`].
///
/// # Errors
///
/// Returns [`Error::CorruptRecord`] if the bytes are truncated or malformed,
/// or do not hold exactly a 1-D float tensor followed by a single-element
/// integer tensor.
pub fn decode_example(bytes: &[u8]) -> Result<Example> {
    let message = TensorProtos::decode(bytes)?;
    if message.protos.len() != 2 {
        return Err(Error::CorruptRecord(format!(
            "expected 2 tensors, found {}",
            message.protos.len()
        )));
    }

    let mut protos = message.protos.into_iter();
    let (Some(features), Some(label)) = (protos.next(), protos.next()) else {
        return Err(Error::CorruptRecord("missing tensor".to_string()));
    };

    let features = match Tensor::from_proto(features)? {
        Tensor::Float32 { dims, data } if dims.len() == 1 => data,
        other => {
            return Err(Error::CorruptRecord(format!(
                "features must be a 1-D float tensor, found {:?} with dims {:?}",
                other.data_type(),
                other.dims()
            )))
        }
    };

    let label = match Tensor::from_proto(label)? {
        Tensor::Int32 { dims, data } if dims.iter().product::<usize>() == 1 && dims.len() <= 1 => {
            data[0]
        }
        other => {
            return Err(Error::CorruptRecord(format!(
                "label must be a scalar int32 tensor, found {:?} with dims {:?}",
                other.data_type(),
                other.dims()
            )))
        }
    };

    Ok(Example::new(features, label))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let example = Example::new(vec![6.3, 3.3, 6.0, 2.5], 2);
        assert_eq!(decode_example(&encode_example(&example)).unwrap(), example);
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let example = Example::new(vec![1.0, 2.0], 1);
        assert_eq!(encode_example(&example), encode_example(&example));
    }

    #[test]
    fn test_nan_bits_preserved() {
        let nan = f32::from_bits(0x7fc0_1234);
        let decoded = decode_example(&encode_example(&Example::new(vec![nan], 0))).unwrap();
        assert_eq!(decoded.features[0].to_bits(), nan.to_bits());
    }

    #[test]
    fn test_tensor_order() {
        let bytes = encode_example(&Example::new(vec![1.0], 7));
        let message = TensorProtos::decode(bytes.as_slice()).unwrap();
        assert_eq!(message.protos[0].data_type, DataType::Float as i32);
        assert_eq!(message.protos[1].data_type, DataType::Int32 as i32);
        assert_eq!(message.protos[1].int32_data, vec![7]);
    }

    #[test]
    fn test_label_shape_one_accepted() {
        let message = TensorProtos {
            protos: vec![
                Tensor::vector(vec![0.5]).to_proto(),
                Tensor::Int32 {
                    dims: vec![1],
                    data: vec![3],
                }
                .to_proto(),
            ],
        };
        let example = decode_example(&message.encode_to_vec()).unwrap();
        assert_eq!(example.label, 3);
    }

    #[test]
    fn test_swapped_tensors_rejected() {
        let message = TensorProtos {
            protos: vec![
                Tensor::scalar(1).to_proto(),
                Tensor::vector(vec![1.0]).to_proto(),
            ],
        };
        assert!(matches!(
            decode_example(&message.encode_to_vec()),
            Err(Error::CorruptRecord(_))
        ));
    }

    #[test]
    fn test_truncated_buffer_rejected() {
        let bytes = encode_example(&Example::new(vec![5.1, 3.5, 1.4, 0.2], 0));
        for cut in 0..bytes.len() {
            assert!(
                decode_example(&bytes[..cut]).is_err(),
                "truncation at {cut} decoded"
            );
        }
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(decode_example(&[0xff, 0xff, 0xff, 0xff]).is_err());
    }
}
