//! pgcodec - PostgreSQL text and binary value codecs.
//!
//! Every value implements [`Transcoder`]: it can be set from a [`HostValue`],
//! read back, assigned into a caller-owned destination, and decoded from or
//! encoded to either wire format. Arrays of any dimensionality are built from
//! the same protocol by [`GenericArray`].
//!
//! ```
//! use pgcodec::{HostValue, Int4Array, Transcoder, TypeRegistry};
//!
//! let ci = TypeRegistry::global();
//! let mut arr = Int4Array::default();
//! arr.decode_text(ci, Some(b"{{1,2},{3,NULL}}")).unwrap();
//! assert_eq!(arr.dimensions().len(), 2);
//! assert_eq!(arr.to_text().unwrap().as_deref(), Some("{{1,2},{3,NULL}}"));
//! ```

pub mod config;
mod error;
pub mod pg;

pub use config::CodecConfig;
pub use error::{CodecError, Result};
pub use pg::array::{
    element_count, parse_text_array, ArrayDimension, ArrayHeader, BoolArray, BpcharArray,
    ByteaArray, DynArray, Float4Array, Float8Array, GenericArray, Int2Array, Int4Array,
    Int8Array, JsonArray, TextArray, TimestamptzArray, UntypedTextArray, UuidArray,
    VarcharArray, Xid8Array, MAX_DIMENSIONS,
};
pub use pg::scalar::{
    Bool, Bpchar, Bytea, Float4, Float8, InfinityModifier, Int2, Int4, Int8, Json, Ltree, Text,
    Timestamptz, Uuid, Varchar, Xid8,
};
pub use pg::{
    ArrayElement, BoxedTranscoder, HostValue, IsNull, Oid, Status, Transcoder, TypeRegistry,
    Underlying,
};
