//! Binary format of arrays: header followed by one length-prefixed record per
//! element, length -1 marking NULL.

use bytes::{Buf, BufMut, BytesMut};
use tracing::debug;

use super::{check_shape, element_count, ArrayDimension, ArrayHeader};
use crate::error::{CodecError, Result};
use crate::pg::registry::TypeRegistry;
use crate::pg::transcoder::{IsNull, Transcoder};
use crate::pg::types::{Oid, Status};

/// Decode the elements of a binary array, creating each with `new_element`.
pub fn decode_binary_elements<E: Transcoder>(
    ci: &TypeRegistry,
    src: &[u8],
    new_element: fn() -> E,
) -> Result<(Vec<E>, Vec<ArrayDimension>)> {
    let (header, consumed) = ArrayHeader::decode_binary(src)?;
    let mut rd = &src[consumed..];

    if header.dimensions.is_empty() {
        if rd.has_remaining() {
            return Err(trailing_bytes(rd.remaining()));
        }
        return Ok((Vec::new(), Vec::new()));
    }

    let count = element_count(&header.dimensions)?;
    if count == 0 {
        // a zero-length dimension is the empty array, same as `{}`
        if rd.has_remaining() {
            return Err(trailing_bytes(rd.remaining()));
        }
        return Ok((Vec::new(), Vec::new()));
    }

    // every element carries at least its length word
    let minimum = count.checked_mul(4).ok_or_else(|| {
        CodecError::DecodeError("array element count overflows".to_string())
    })?;
    if rd.remaining() < minimum {
        debug!(count, remaining = rd.remaining(), "array body shorter than its element count");
        return Err(CodecError::truncated(minimum, rd.remaining()));
    }

    let mut elements = Vec::with_capacity(count);
    for index in 0..count {
        if rd.remaining() < 4 {
            return Err(CodecError::truncated(4, rd.remaining()));
        }
        let len = rd.get_i32();

        let mut elem = new_element();
        match len {
            -1 => elem.decode_binary(ci, None)?,
            len if len < -1 => {
                debug!(index, len, "invalid array element length");
                return Err(CodecError::DecodeError(format!(
                    "invalid length {} for array element {}",
                    len, index
                )));
            }
            len => {
                let len = len as usize;
                if rd.remaining() < len {
                    debug!(index, len, remaining = rd.remaining(), "array element truncated");
                    return Err(CodecError::truncated(len, rd.remaining()));
                }
                elem.decode_binary(ci, Some(&rd[..len]))?;
                rd.advance(len);
            }
        }
        elements.push(elem);
    }

    if rd.has_remaining() {
        return Err(trailing_bytes(rd.remaining()));
    }

    Ok((elements, header.dimensions))
}

/// Append a binary array: header, then each element's length and payload.
pub fn encode_binary_elements<E: Transcoder>(
    ci: &TypeRegistry,
    buf: &mut BytesMut,
    dimensions: &[ArrayDimension],
    element_oid: Oid,
    elements: &[E],
) -> Result<()> {
    check_shape(dimensions, elements.len())?;

    let header = ArrayHeader {
        contains_null: elements.iter().any(|e| e.status() == Status::Null),
        element_oid,
        // no elements means zero dimensions on the wire
        dimensions: if elements.is_empty() {
            Vec::new()
        } else {
            dimensions.to_vec()
        },
    };
    header.encode_binary(buf);

    for elem in elements {
        let len_pos = buf.len();
        buf.put_i32(-1);

        match elem.encode_binary(ci, buf)? {
            IsNull::Yes => buf.truncate(len_pos + 4),
            IsNull::No => {
                let payload = buf.len() - len_pos - 4;
                let len = i32::try_from(payload).map_err(|_| {
                    CodecError::ConversionError(format!(
                        "array element of {} bytes exceeds the wire limit",
                        payload
                    ))
                })?;
                buf[len_pos..len_pos + 4].copy_from_slice(&len.to_be_bytes());
            }
        }
    }
    Ok(())
}

fn trailing_bytes(remaining: usize) -> CodecError {
    debug!(remaining, "trailing bytes after binary array");
    CodecError::DecodeError(format!("{} trailing bytes after array", remaining))
}
