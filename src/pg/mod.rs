//! PostgreSQL value codecs.
//!
//! This module converts between host values and the two PostgreSQL wire
//! formats:
//! - Text format, as used by the simple query protocol and `COPY`
//! - Binary format, as used by extended-protocol parameters and results
//!
//! Architecture:
//! - `types`: OIDs, the tri-state `Status` and the dynamic `HostValue`
//! - `transcoder`: the `Transcoder` protocol every value implements
//! - `registry`: type name to OID resolution for binary arrays
//! - `scalar`: element types (`int4`, `text`, `timestamptz`, ...)
//! - `array`: multi-dimensional arrays over any element type

pub mod array;
pub mod registry;
pub mod scalar;
pub mod transcoder;
pub mod types;

#[cfg(test)]
mod tests;

// Public API re-exports for library consumers
pub use array::{ArrayDimension, ArrayHeader, GenericArray};
pub use registry::TypeRegistry;
pub use transcoder::{ArrayElement, BoxedTranscoder, IsNull, Transcoder};
pub use types::{HostValue, Oid, Status, Underlying};
