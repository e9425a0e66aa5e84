//! Multi-dimensional PostgreSQL arrays.
//!
//! Architecture:
//! - `header`: binary array header (dimensions, null flag, element OID)
//! - `text`: brace-literal parser and encoder
//! - `binary`: length-prefixed element stream
//! - `generic`: the array container shared by every element type
//!
//! Elements are always held flattened in row-major order (last dimension
//! varies fastest) next to the dimension list that gives them shape.

pub mod binary;
pub mod generic;
pub mod header;
pub mod text;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::scalar::{
    Bool, Bpchar, Bytea, Float4, Float8, Int2, Int4, Int8, Json, Text, Timestamptz, Uuid,
    Varchar, Xid8,
};
use super::transcoder::BoxedTranscoder;
use crate::error::{CodecError, Result};

pub use generic::GenericArray;
pub use header::ArrayHeader;
pub use text::{parse_text_array, UntypedTextArray};

/// Maximum number of dimensions of any array (PostgreSQL's `MAXDIM`).
pub const MAX_DIMENSIONS: usize = 6;

/// Per-dimension scratch storage.
pub(crate) type DimVec<T> = SmallVec<[T; MAX_DIMENSIONS]>;

/// One axis of an array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArrayDimension {
    /// Number of elements along this axis.
    pub length: i32,
    /// Index of the first element, conventionally 1.
    pub lower_bound: i32,
}

impl ArrayDimension {
    pub fn new(length: i32, lower_bound: i32) -> Self {
        Self {
            length,
            lower_bound,
        }
    }

    /// Index of the last element.
    #[inline]
    pub fn upper_bound(&self) -> i64 {
        i64::from(self.lower_bound) + i64::from(self.length) - 1
    }

    /// Whether the last index still fits in an `int4` subscript.
    #[inline]
    pub fn in_range(&self) -> bool {
        self.upper_bound() <= i64::from(i32::MAX)
    }
}

/// Total number of elements described by `dimensions`.
///
/// Zero dimensions is the empty array.
pub fn element_count(dimensions: &[ArrayDimension]) -> Result<usize> {
    if dimensions.is_empty() {
        return Ok(0);
    }

    let mut count: usize = 1;
    for dim in dimensions {
        let length = usize::try_from(dim.length).map_err(|_| {
            CodecError::DecodeError(format!("negative array dimension length {}", dim.length))
        })?;
        count = count.checked_mul(length).ok_or_else(|| {
            CodecError::DecodeError("array element count overflows".to_string())
        })?;
    }
    Ok(count)
}

/// Fail unless `len` elements exactly fill `dimensions` and the dimensions
/// are representable on the wire.
pub(crate) fn check_shape(dimensions: &[ArrayDimension], len: usize) -> Result<()> {
    if dimensions.len() > MAX_DIMENSIONS {
        return Err(CodecError::MalformedArrayError(format!(
            "array has {} dimensions, maximum is {}",
            dimensions.len(),
            MAX_DIMENSIONS
        )));
    }
    if let Some(dim) = dimensions.iter().find(|d| !d.in_range()) {
        return Err(CodecError::MalformedArrayError(format!(
            "upper bound {} of dimension {:?} exceeds {}",
            dim.upper_bound(),
            dim,
            i32::MAX
        )));
    }

    let expected = element_count(dimensions)?;
    if expected != len {
        return Err(CodecError::MalformedArrayError(format!(
            "{} elements do not fill dimensions {:?} ({} expected)",
            len, dimensions, expected
        )));
    }
    Ok(())
}

/// Boundary moduli: the number of flattened elements spanned by one step of
/// each dimension.
///
/// Lengths `[3, 5, 2]` give `[30, 10, 2]`. A sub-array opens before element `i`
/// for every modulus `m` with `i % m == 0` and closes after it for every `m`
/// with `(i + 1) % m == 0`. Callers must not pass an empty array.
pub(crate) fn dim_elem_counts(dimensions: &[ArrayDimension]) -> DimVec<usize> {
    let mut counts: DimVec<usize> = SmallVec::from_elem(0, dimensions.len());
    let mut acc: usize = 1;
    for (i, dim) in dimensions.iter().enumerate().rev() {
        acc *= dim.length.max(0) as usize;
        counts[i] = acc;
    }
    counts
}

// ============================================================================
// Concrete array types
// ============================================================================

pub type BoolArray = GenericArray<Bool>;
pub type Int2Array = GenericArray<Int2>;
pub type Int4Array = GenericArray<Int4>;
pub type Int8Array = GenericArray<Int8>;
pub type Float4Array = GenericArray<Float4>;
pub type Float8Array = GenericArray<Float8>;
pub type TextArray = GenericArray<Text>;
pub type VarcharArray = GenericArray<Varchar>;
pub type BpcharArray = GenericArray<Bpchar>;
pub type ByteaArray = GenericArray<Bytea>;
pub type JsonArray = GenericArray<Json>;
pub type UuidArray = GenericArray<Uuid>;
pub type TimestamptzArray = GenericArray<Timestamptz>;
pub type Xid8Array = GenericArray<Xid8>;

/// Array over an element type chosen at runtime.
pub type DynArray = GenericArray<BoxedTranscoder>;

#[cfg(test)]
mod tests {
    use super::*;

    fn dims(lengths: &[i32]) -> Vec<ArrayDimension> {
        lengths.iter().map(|&l| ArrayDimension::new(l, 1)).collect()
    }

    #[test]
    fn test_element_count() {
        assert_eq!(element_count(&[]).unwrap(), 0);
        assert_eq!(element_count(&dims(&[4])).unwrap(), 4);
        assert_eq!(element_count(&dims(&[3, 5, 2])).unwrap(), 30);
        assert_eq!(element_count(&dims(&[2, 0])).unwrap(), 0);
        assert!(element_count(&dims(&[-1])).is_err());
    }

    #[test]
    fn test_dim_elem_counts() {
        assert_eq!(dim_elem_counts(&dims(&[4])).as_slice(), &[4]);
        assert_eq!(dim_elem_counts(&dims(&[3, 5, 2])).as_slice(), &[30, 10, 2]);
    }

    #[test]
    fn test_check_shape() {
        assert!(check_shape(&dims(&[2, 2]), 4).is_ok());
        assert!(check_shape(&[], 0).is_ok());
        assert!(matches!(
            check_shape(&dims(&[2, 2]), 3),
            Err(CodecError::MalformedArrayError(_))
        ));
    }

    #[test]
    fn test_check_shape_limits() {
        assert!(check_shape(&dims(&[1; MAX_DIMENSIONS]), 1).is_ok());
        assert!(matches!(
            check_shape(&dims(&[1; MAX_DIMENSIONS + 1]), 1),
            Err(CodecError::MalformedArrayError(_))
        ));

        assert!(check_shape(&[ArrayDimension::new(1, i32::MAX)], 1).is_ok());
        assert!(matches!(
            check_shape(&[ArrayDimension::new(2, i32::MAX)], 2),
            Err(CodecError::MalformedArrayError(_))
        ));
    }

    #[test]
    fn test_upper_bound() {
        assert_eq!(ArrayDimension::new(2, 4).upper_bound(), 5);
        assert_eq!(ArrayDimension::new(0, 1).upper_bound(), 0);
        assert!(ArrayDimension::new(1, i32::MAX).in_range());
        assert!(!ArrayDimension::new(2, i32::MAX).in_range());
    }
}
