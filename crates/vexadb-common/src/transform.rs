//! Vector transcoding between wire forms and index storage forms.
//!
//! Vectors arrive either as JSON text (a flat array, or a matrix for batch
//! queries) or as raw little-endian bytes of the declared source type. The
//! output is always raw bytes in the destination type. The only supported
//! conversion besides identity is FP32 -> FP16.

use half::f16;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::types::DataType;

/// Check whether a source type can be transcoded to a destination type.
pub fn support_transform(src: DataType, dst: DataType) -> Result<()> {
    if src == dst || (src == DataType::VectorFp32 && dst == DataType::VectorFp16) {
        Ok(())
    } else {
        Err(Error::MismatchedDataType)
    }
}

/// Transcode raw little-endian bytes from `src` into `dst`.
pub fn transform_bytes(src: DataType, data: &[u8], dst: DataType) -> Result<Vec<u8>> {
    if src == dst {
        return Ok(data.to_vec());
    }
    if src == DataType::VectorFp32 && dst == DataType::VectorFp16 {
        if data.is_empty() || data.len() % 4 != 0 {
            return Err(Error::InvalidFeature);
        }
        let mut out = Vec::with_capacity(data.len() / 2);
        for chunk in data.chunks_exact(4) {
            let v = f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
            out.extend_from_slice(&f16::from_f32(v).to_le_bytes());
        }
        return Ok(out);
    }
    Err(Error::MismatchedDataType)
}

/// Parse a flat JSON array of `src`-typed elements into `dst`-typed bytes.
pub fn transform_json(src: DataType, text: &str, dst: DataType) -> Result<Vec<u8>> {
    support_transform(src, dst)?;
    let value: Value = serde_json::from_str(text).map_err(|_| Error::InvalidVectorFormat)?;
    let elements = value.as_array().ok_or(Error::InvalidVectorFormat)?;
    if elements.iter().any(Value::is_array) {
        return Err(Error::InvalidVectorFormat);
    }
    pack_elements(dst, elements)
}

/// Parse JSON vector text that may be a flat array or a matrix of rows.
///
/// Returns the packed bytes together with the row count (1 for flat input).
/// Matrix rows must all have the same length.
pub fn transform_json_matrix(src: DataType, text: &str, dst: DataType) -> Result<(Vec<u8>, u32)> {
    support_transform(src, dst)?;
    let value: Value = serde_json::from_str(text).map_err(|_| Error::InvalidVectorFormat)?;
    let elements = value.as_array().ok_or(Error::InvalidVectorFormat)?;

    if !elements.iter().any(Value::is_array) {
        return Ok((pack_elements(dst, elements)?, 1));
    }

    let mut out = Vec::new();
    let mut row_len = None;
    for row in elements {
        let row = row.as_array().ok_or(Error::InvalidVectorFormat)?;
        match row_len {
            None => row_len = Some(row.len()),
            Some(len) if len != row.len() => return Err(Error::InvalidVectorFormat),
            _ => {}
        }
        out.extend_from_slice(&pack_elements(dst, row)?);
    }
    Ok((out, elements.len() as u32))
}

/// Validate the byte length of a transcoded vector against its dimension.
pub fn validate_vector_bytes(dst: DataType, dimension: u32, bytes: &[u8]) -> Result<()> {
    let expected = dst.vector_byte_len(dimension)?;
    if bytes.len() != expected {
        return Err(Error::MismatchedDimension);
    }
    Ok(())
}

/// Decode stored vector bytes into f32 elements for distance computation.
///
/// Binary vector types have no numeric element form and are rejected.
pub fn decode_to_f32(dt: DataType, dimension: u32, bytes: &[u8]) -> Result<Vec<f32>> {
    validate_vector_bytes(dt, dimension, bytes)?;
    let dim = dimension as usize;
    let mut out = Vec::with_capacity(dim);
    match dt {
        DataType::VectorFp32 => {
            for chunk in bytes.chunks_exact(4) {
                out.push(f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]));
            }
        }
        DataType::VectorFp16 => {
            for chunk in bytes.chunks_exact(2) {
                out.push(f16::from_le_bytes([chunk[0], chunk[1]]).to_f32());
            }
        }
        DataType::VectorFp64 => {
            for chunk in bytes.chunks_exact(8) {
                let mut raw = [0u8; 8];
                raw.copy_from_slice(chunk);
                out.push(f64::from_le_bytes(raw) as f32);
            }
        }
        DataType::VectorInt16 => {
            for chunk in bytes.chunks_exact(2) {
                out.push(i16::from_le_bytes([chunk[0], chunk[1]]) as f32);
            }
        }
        DataType::VectorInt8 => {
            for b in bytes {
                out.push(*b as i8 as f32);
            }
        }
        DataType::VectorInt4 => {
            for b in bytes {
                out.push(unpack_nibble(*b & 0xF));
                out.push(unpack_nibble(*b >> 4));
            }
        }
        _ => return Err(Error::InvalidDataType),
    }
    Ok(out)
}

fn unpack_nibble(nibble: u8) -> f32 {
    // sign-extend a 4-bit two's-complement value
    let v = if nibble & 0x8 != 0 {
        (nibble as i8) | !0xF
    } else {
        nibble as i8
    };
    v as f32
}

fn pack_elements(dst: DataType, elements: &[Value]) -> Result<Vec<u8>> {
    match dst {
        DataType::VectorFp32 => {
            let mut out = Vec::with_capacity(elements.len() * 4);
            for v in elements {
                out.extend_from_slice(&(as_f64(v)? as f32).to_le_bytes());
            }
            Ok(out)
        }
        DataType::VectorFp16 => {
            let mut out = Vec::with_capacity(elements.len() * 2);
            for v in elements {
                out.extend_from_slice(&f16::from_f64(as_f64(v)?).to_le_bytes());
            }
            Ok(out)
        }
        DataType::VectorFp64 => {
            let mut out = Vec::with_capacity(elements.len() * 8);
            for v in elements {
                out.extend_from_slice(&as_f64(v)?.to_le_bytes());
            }
            Ok(out)
        }
        DataType::VectorInt16 => {
            let mut out = Vec::with_capacity(elements.len() * 2);
            for v in elements {
                out.extend_from_slice(&(as_i64(v)? as i16).to_le_bytes());
            }
            Ok(out)
        }
        DataType::VectorInt8 => {
            let mut out = Vec::with_capacity(elements.len());
            for v in elements {
                out.push(as_i64(v)? as i8 as u8);
            }
            Ok(out)
        }
        DataType::VectorInt4 => {
            if elements.len() % 2 != 0 {
                return Err(Error::MismatchedDimension);
            }
            let mut out = Vec::with_capacity(elements.len() / 2);
            for pair in elements.chunks_exact(2) {
                let low = as_i64(&pair[0])? as u8 & 0xF;
                let high = (as_i64(&pair[1])? as u8 & 0xF) << 4;
                out.push(high | low);
            }
            Ok(out)
        }
        DataType::VectorBinary32 => {
            let mut out = Vec::with_capacity(elements.len() * 4);
            for v in elements {
                out.extend_from_slice(&(as_u64(v)? as u32).to_le_bytes());
            }
            Ok(out)
        }
        DataType::VectorBinary64 => {
            let mut out = Vec::with_capacity(elements.len() * 8);
            for v in elements {
                out.extend_from_slice(&as_u64(v)?.to_le_bytes());
            }
            Ok(out)
        }
        _ => Err(Error::InvalidDataType),
    }
}

fn as_f64(value: &Value) -> Result<f64> {
    value.as_f64().ok_or(Error::InvalidVectorFormat)
}

fn as_i64(value: &Value) -> Result<i64> {
    value.as_i64().ok_or(Error::InvalidVectorFormat)
}

fn as_u64(value: &Value) -> Result<u64> {
    value.as_u64().ok_or(Error::InvalidVectorFormat)
}
