//! `xid8`: 64-bit transaction ID.
//!
//! Not a general number type, so `set` and `assign_to` only deal in `u64`
//! (and non-negative `i64` on input).

use std::any::Any;

use bytes::{BufMut, BytesMut};

use super::{fixed, unwrap_for_retry};
use crate::error::{CodecError, Result};
use crate::pg::registry::TypeRegistry;
use crate::pg::transcoder::{
    assign_undefined, cannot_convert, should_encode, utf8, ArrayElement, AssignRules, IsNull,
    Transcoder,
};
use crate::pg::types::{HostValue, Status};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Xid8 {
    value: u64,
    status: Status,
}

impl Xid8 {
    pub fn new(value: u64) -> Self {
        Self {
            value,
            status: Status::Present,
        }
    }

    pub fn null() -> Self {
        Self {
            value: 0,
            status: Status::Null,
        }
    }

    pub fn value(&self) -> Option<u64> {
        (self.status == Status::Present).then_some(self.value)
    }
}

impl Default for Xid8 {
    fn default() -> Self {
        Self {
            value: 0,
            status: Status::Undefined,
        }
    }
}

impl ArrayElement for Xid8 {
    const TYPE_NAME: &'static str = "xid8";
}

impl Transcoder for Xid8 {
    fn status(&self) -> Status {
        self.status
    }

    fn set(&mut self, src: HostValue) -> Result<()> {
        match src {
            HostValue::Null => *self = Self::null(),
            HostValue::U64(v) => *self = Self::new(v),
            HostValue::I64(v) => {
                let v = u64::try_from(v).map_err(|_| {
                    CodecError::ConversionError(format!("{} is less than minimum value for xid8", v))
                })?;
                *self = Self::new(v);
            }
            src @ HostValue::Derived(_) => return self.set(unwrap_for_retry(&src, "xid8")?),
            other => return Err(cannot_convert(&other, "xid8")),
        }
        Ok(())
    }

    fn get(&self) -> HostValue {
        match self.status {
            Status::Present => HostValue::U64(self.value),
            Status::Null => HostValue::Null,
            Status::Undefined => HostValue::Status(Status::Undefined),
        }
    }

    fn assign_to(&self, dst: &mut dyn Any) -> Result<()> {
        let rules = AssignRules::new(dst, "xid8");
        let v = self.value;
        match self.status {
            Status::Present => rules
                .rule::<u64>(|| Ok(v))
                .rule::<Option<u64>>(|| Ok(Some(v)))
                .host(|| self.get())
                .finish(),
            Status::Null => rules
                .null::<u64>()
                .reject_null::<u64>()
                .host(|| HostValue::Null)
                .finish(),
            Status::Undefined => Err(assign_undefined("xid8")),
        }
    }

    fn decode_text(&mut self, _ci: &TypeRegistry, src: Option<&[u8]>) -> Result<()> {
        let Some(src) = src else {
            *self = Self::null();
            return Ok(());
        };
        let text = utf8(src, "xid8")?;
        let v = text
            .parse::<u64>()
            .map_err(|e| CodecError::DecodeError(format!("invalid xid8 {:?}: {}", text, e)))?;
        *self = Self::new(v);
        Ok(())
    }

    fn decode_binary(&mut self, _ci: &TypeRegistry, src: Option<&[u8]>) -> Result<()> {
        let Some(src) = src else {
            *self = Self::null();
            return Ok(());
        };
        *self = Self::new(u64::from_be_bytes(fixed(src, "xid8")?));
        Ok(())
    }

    fn encode_text(&self, _ci: &TypeRegistry, buf: &mut BytesMut) -> Result<IsNull> {
        if !should_encode(self.status)? {
            return Ok(IsNull::Yes);
        }
        buf.put_slice(self.value.to_string().as_bytes());
        Ok(IsNull::No)
    }

    fn encode_binary(&self, _ci: &TypeRegistry, buf: &mut BytesMut) -> Result<IsNull> {
        if !should_encode(self.status)? {
            return Ok(IsNull::Yes);
        }
        buf.put_u64(self.value);
        Ok(IsNull::No)
    }
}
