//! Scalar element types.
//!
//! Each type keeps its payload next to a [`Status`](crate::pg::types::Status). `Default` yields an
//! `Undefined` value, which is what arrays manufacture before decoding into it.

mod boolean;
mod bytea;
mod float;
mod int;
mod json;
mod text;
mod timestamptz;
mod uuid;
mod xid8;

pub use self::boolean::Bool;
pub use self::bytea::Bytea;
pub use self::float::{Float4, Float8};
pub use self::int::{Int2, Int4, Int8};
pub use self::json::Json;
pub use self::text::{Bpchar, Ltree, Text, Varchar};
pub use self::timestamptz::{InfinityModifier, Timestamptz};
pub use self::uuid::Uuid;
pub use self::xid8::Xid8;

use crate::error::{CodecError, Result};
use crate::pg::types::HostValue;

/// Fixed-width binary payload, or a `DecodeError` naming the type.
pub(crate) fn fixed<const N: usize>(src: &[u8], target: &str) -> Result<[u8; N]> {
    <[u8; N]>::try_from(src).map_err(|_| {
        CodecError::DecodeError(format!(
            "invalid length for {}: {}, expected {}",
            target,
            src.len(),
            N
        ))
    })
}

/// Unwrap a derived host value for a retry, or fail the conversion.
pub(crate) fn unwrap_for_retry(src: &HostValue, target: &str) -> Result<HostValue> {
    src.unwrap_derived()
        .ok_or_else(|| crate::pg::transcoder::cannot_convert(src, target))
}
