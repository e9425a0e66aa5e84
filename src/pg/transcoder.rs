//! The element protocol.
//!
//! Every transcodable value, scalar or array, implements [`Transcoder`]. Arrays
//! are built on top of it: they manufacture fresh elements from a factory and
//! ask each one to decode, encode, convert or report its own status.

use std::any::Any;
use std::fmt;

use bytes::BytesMut;

use super::registry::TypeRegistry;
use super::types::{HostValue, Status, Underlying};
use crate::error::{CodecError, Result};

/// Whether an encoder produced a payload.
///
/// `Yes` tells the caller to write the wire NULL marker; nothing has been
/// appended to the buffer in that case.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IsNull {
    Yes,
    No,
}

/// Conversion between host values and the PostgreSQL wire formats.
pub trait Transcoder: fmt::Debug {
    fn status(&self) -> Status;

    /// Convert a host value into this value. `HostValue::Null` always succeeds
    /// and yields `Status::Null`.
    fn set(&mut self, src: HostValue) -> Result<()>;

    /// Present values yield their host form, `Null` yields `HostValue::Null`
    /// and an undefined value yields `HostValue::Status(Status::Undefined)`.
    fn get(&self) -> HostValue;

    /// Copy into a caller-owned destination.
    fn assign_to(&self, dst: &mut dyn Any) -> Result<()>;

    /// Decode the text format. `None` is SQL NULL.
    fn decode_text(&mut self, ci: &TypeRegistry, src: Option<&[u8]>) -> Result<()>;

    /// Decode the binary format. `None` is SQL NULL.
    fn decode_binary(&mut self, ci: &TypeRegistry, src: Option<&[u8]>) -> Result<()>;

    /// Append the text format to `buf`.
    fn encode_text(&self, ci: &TypeRegistry, buf: &mut BytesMut) -> Result<IsNull>;

    /// Append the binary format to `buf`.
    fn encode_binary(&self, ci: &TypeRegistry, buf: &mut BytesMut) -> Result<IsNull>;

    /// JSON form of this value. NULL renders as `null`.
    fn to_json(&self) -> Result<serde_json::Value> {
        match self.status() {
            Status::Undefined => Err(CodecError::UndefinedValueError),
            _ => Ok(self.get().to_json()),
        }
    }

    /// Encode the text format into a fresh buffer.
    fn text_bytes(&self, ci: &TypeRegistry) -> Result<Option<BytesMut>> {
        let mut buf = BytesMut::new();
        match self.encode_text(ci, &mut buf)? {
            IsNull::Yes => Ok(None),
            IsNull::No => Ok(Some(buf)),
        }
    }

    /// Encode the binary format into a fresh buffer.
    fn binary_bytes(&self, ci: &TypeRegistry) -> Result<Option<BytesMut>> {
        let mut buf = BytesMut::new();
        match self.encode_binary(ci, &mut buf)? {
            IsNull::Yes => Ok(None),
            IsNull::No => Ok(Some(buf)),
        }
    }

    /// Text format as a string, for drivers that bind parameters as text.
    fn to_text(&self) -> Result<Option<String>> {
        match self.text_bytes(TypeRegistry::global())? {
            None => Ok(None),
            Some(buf) => String::from_utf8(buf.to_vec())
                .map(Some)
                .map_err(|e| CodecError::DecodeError(format!("invalid UTF-8 in text format: {}", e))),
        }
    }

    /// Decode a text column as received from a driver.
    fn scan_text(&mut self, src: Option<&[u8]>) -> Result<()> {
        self.decode_text(TypeRegistry::global(), src)
    }
}

/// An element type usable in the concrete array aliases.
pub trait ArrayElement: Transcoder + Default {
    /// Registry name of the type, e.g. `int4`.
    const TYPE_NAME: &'static str;
}

/// Element type for arrays whose element type is only known at runtime.
pub type BoxedTranscoder = Box<dyn Transcoder + Send + Sync>;

impl Transcoder for BoxedTranscoder {
    fn status(&self) -> Status {
        (**self).status()
    }

    fn set(&mut self, src: HostValue) -> Result<()> {
        (**self).set(src)
    }

    fn get(&self) -> HostValue {
        (**self).get()
    }

    fn assign_to(&self, dst: &mut dyn Any) -> Result<()> {
        (**self).assign_to(dst)
    }

    fn decode_text(&mut self, ci: &TypeRegistry, src: Option<&[u8]>) -> Result<()> {
        (**self).decode_text(ci, src)
    }

    fn decode_binary(&mut self, ci: &TypeRegistry, src: Option<&[u8]>) -> Result<()> {
        (**self).decode_binary(ci, src)
    }

    fn encode_text(&self, ci: &TypeRegistry, buf: &mut BytesMut) -> Result<IsNull> {
        (**self).encode_text(ci, buf)
    }

    fn encode_binary(&self, ci: &TypeRegistry, buf: &mut BytesMut) -> Result<IsNull> {
        (**self).encode_binary(ci, buf)
    }

    fn to_json(&self) -> Result<serde_json::Value> {
        (**self).to_json()
    }
}

impl<T: Transcoder + Send + Sync> Underlying for T {
    fn underlying(&self) -> HostValue {
        self.get()
    }
}

/// Shared encoder gate: `Ok(true)` when the payload must be written.
#[inline]
pub(crate) fn should_encode(status: Status) -> Result<bool> {
    match status {
        Status::Present => Ok(true),
        Status::Null => Ok(false),
        Status::Undefined => Err(CodecError::UndefinedValueError),
    }
}

/// Standard conversion failure for `set`.
pub(crate) fn cannot_convert(src: &HostValue, target: &str) -> CodecError {
    CodecError::ConversionError(format!("{} to {}", src.type_name(), target))
}

/// Borrow the text form of a wire payload.
pub(crate) fn utf8<'a>(src: &'a [u8], target: &str) -> Result<&'a str> {
    std::str::from_utf8(src)
        .map_err(|e| CodecError::DecodeError(format!("invalid UTF-8 in {}: {}", target, e)))
}

// ============================================================================
// Assignment rules
// ============================================================================

/// Ordered destination rules for `assign_to`.
///
/// Each rule names one destination type. The first rule whose type matches the
/// destination runs, and its outcome is final; later rules are skipped.
pub struct AssignRules<'a> {
    dst: &'a mut dyn Any,
    source: &'static str,
    outcome: Option<Result<()>>,
}

impl<'a> AssignRules<'a> {
    /// Start a rule list. `source` names the value being assigned in errors.
    pub fn new(dst: &'a mut dyn Any, source: &'static str) -> Self {
        Self {
            dst,
            source,
            outcome: None,
        }
    }

    /// Destination `T` receives the converted value.
    pub fn rule<T: 'static>(mut self, convert: impl FnOnce() -> Result<T>) -> Self {
        if self.outcome.is_none() {
            if let Some(slot) = self.dst.downcast_mut::<T>() {
                self.outcome = Some(convert().map(|v| *slot = v));
            }
        }
        self
    }

    /// Destination `Option<T>` receives `None`.
    pub fn null<T: 'static>(self) -> Self {
        self.rule::<Option<T>>(|| Ok(None))
    }

    /// Destination `T` cannot represent NULL.
    pub fn reject_null<T: 'static>(mut self) -> Self {
        if self.outcome.is_none() && self.dst.is::<T>() {
            self.outcome = Some(Err(CodecError::NullAssignmentError(format!(
                "{} to {}",
                self.source,
                std::any::type_name::<T>()
            ))));
        }
        self
    }

    /// A `HostValue` destination accepts anything.
    pub fn host(self, value: impl FnOnce() -> HostValue) -> Self {
        self.rule::<HostValue>(|| Ok(value()))
    }

    pub fn finish(self) -> Result<()> {
        let source = self.source;
        self.outcome.unwrap_or_else(|| {
            Err(CodecError::AssignmentError(format!(
                "{} to unsupported destination",
                source
            )))
        })
    }
}

/// Failure for `assign_to` on a value that was never set.
pub(crate) fn assign_undefined(source: &str) -> CodecError {
    CodecError::AssignmentError(format!("undefined {}", source))
}
