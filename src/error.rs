//! Error types for pgcodec.
//!
//! Every codec operation is a local transformation, so none of these are
//! transient: callers should discard the destination value on any error.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// `set` was given a host value the target type cannot represent.
    #[error("cannot convert {0}")]
    ConversionError(String),

    /// The generic array container was given something other than a list.
    #[error("type error: {0}")]
    TypeError(String),

    #[error("unable to assign {0}")]
    AssignmentError(String),

    /// A NULL value was assigned into a destination that cannot hold absence.
    #[error("cannot assign NULL {0}")]
    NullAssignmentError(String),

    #[error("decode error: {0}")]
    DecodeError(String),

    #[error("malformed array literal: {0}")]
    MalformedArrayError(String),

    #[error("truncated input: needed {needed} bytes, {remaining} remaining")]
    TruncatedInputError { needed: usize, remaining: usize },

    #[error("cannot encode status undefined")]
    UndefinedValueError,

    #[error("unable to find oid for type name {0}")]
    UnknownTypeError(String),
}

impl CodecError {
    pub(crate) fn truncated(needed: usize, remaining: usize) -> Self {
        CodecError::TruncatedInputError { needed, remaining }
    }
}

pub type Result<T> = std::result::Result<T, CodecError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncated_message() {
        let err = CodecError::truncated(12, 3);
        assert_eq!(
            err.to_string(),
            "truncated input: needed 12 bytes, 3 remaining"
        );
    }

    #[test]
    fn test_unknown_type_message() {
        let err = CodecError::UnknownTypeError("ltree".to_string());
        assert_eq!(err.to_string(), "unable to find oid for type name ltree");
    }
}
