//! Binary array header.
//!
//! Layout (all big-endian int32):
//! - number of dimensions
//! - flags: 1 if any element is NULL, otherwise 0
//! - element type OID
//! - per dimension: length, lower bound

use bytes::{Buf, BufMut, BytesMut};
use tracing::debug;

use super::{ArrayDimension, MAX_DIMENSIONS};
use crate::error::{CodecError, Result};
use crate::pg::types::Oid;

/// Header of a binary-format array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayHeader {
    pub contains_null: bool,
    pub element_oid: Oid,
    pub dimensions: Vec<ArrayDimension>,
}

impl ArrayHeader {
    /// Size of the fixed part preceding the dimension records.
    pub const FIXED_LEN: usize = 12;

    /// Size of one dimension record.
    pub const DIMENSION_LEN: usize = 8;

    /// Decode a header from the start of `src`.
    ///
    /// Returns the header and the number of bytes consumed.
    pub fn decode_binary(src: &[u8]) -> Result<(Self, usize)> {
        let mut rd = src;

        if rd.remaining() < Self::FIXED_LEN {
            debug!(len = src.len(), "array header too short");
            return Err(CodecError::truncated(Self::FIXED_LEN, rd.remaining()));
        }

        let ndim = rd.get_i32();
        let flags = rd.get_i32();
        let element_oid = Oid::from_i32(rd.get_i32());

        let ndim = usize::try_from(ndim).map_err(|_| {
            CodecError::DecodeError(format!("negative array dimension count {}", ndim))
        })?;
        if ndim > MAX_DIMENSIONS {
            debug!(ndim, "array header exceeds dimension limit");
            return Err(CodecError::DecodeError(format!(
                "array has {} dimensions, maximum is {}",
                ndim, MAX_DIMENSIONS
            )));
        }

        let contains_null = match flags {
            0 => false,
            1 => true,
            other => {
                return Err(CodecError::DecodeError(format!(
                    "invalid array flags {}",
                    other
                )))
            }
        };

        let needed = ndim * Self::DIMENSION_LEN;
        if rd.remaining() < needed {
            debug!(ndim, remaining = rd.remaining(), "array header too short for dimensions");
            return Err(CodecError::truncated(needed, rd.remaining()));
        }

        let mut dimensions = Vec::with_capacity(ndim);
        for _ in 0..ndim {
            let length = rd.get_i32();
            let lower_bound = rd.get_i32();
            if length < 0 {
                return Err(CodecError::DecodeError(format!(
                    "negative array dimension length {}",
                    length
                )));
            }
            let dim = ArrayDimension {
                length,
                lower_bound,
            };
            if !dim.in_range() {
                debug!(length, lower_bound, "array dimension upper bound out of range");
                return Err(CodecError::DecodeError(format!(
                    "array dimension [{}:{}] exceeds the subscript range",
                    lower_bound,
                    dim.upper_bound()
                )));
            }
            dimensions.push(dim);
        }

        let consumed = src.len() - rd.remaining();
        Ok((
            ArrayHeader {
                contains_null,
                element_oid,
                dimensions,
            },
            consumed,
        ))
    }

    /// Append the header to `buf`.
    pub fn encode_binary(&self, buf: &mut BytesMut) {
        buf.put_i32(self.dimensions.len() as i32);
        buf.put_i32(if self.contains_null { 1 } else { 0 });
        buf.put_i32(self.element_oid.as_i32());

        for dim in &self.dimensions {
            buf.put_i32(dim.length);
            buf.put_i32(dim.lower_bound);
        }
    }
}
