//! `bool`: text `t`/`f`, binary one byte.

use std::any::Any;

use bytes::{BufMut, BytesMut};

use super::unwrap_for_retry;
use crate::error::{CodecError, Result};
use crate::pg::registry::TypeRegistry;
use crate::pg::transcoder::{
    assign_undefined, cannot_convert, should_encode, ArrayElement, AssignRules, IsNull, Transcoder,
};
use crate::pg::types::{HostValue, Status};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Bool {
    value: bool,
    status: Status,
}

impl Bool {
    pub fn new(value: bool) -> Self {
        Self {
            value,
            status: Status::Present,
        }
    }

    pub fn null() -> Self {
        Self {
            value: false,
            status: Status::Null,
        }
    }

    pub fn value(&self) -> Option<bool> {
        (self.status == Status::Present).then_some(self.value)
    }
}

impl Default for Bool {
    fn default() -> Self {
        Self {
            value: false,
            status: Status::Undefined,
        }
    }
}

impl ArrayElement for Bool {
    const TYPE_NAME: &'static str = "bool";
}

impl Transcoder for Bool {
    fn status(&self) -> Status {
        self.status
    }

    fn set(&mut self, src: HostValue) -> Result<()> {
        match &src {
            HostValue::Null => *self = Self::null(),
            HostValue::Bool(v) => *self = Self::new(*v),
            HostValue::String(s) => {
                let v = match s.to_ascii_lowercase().as_str() {
                    "t" | "true" => true,
                    "f" | "false" => false,
                    _ => return Err(cannot_convert(&src, "bool")),
                };
                *self = Self::new(v);
            }
            HostValue::Derived(_) => return self.set(unwrap_for_retry(&src, "bool")?),
            other => return Err(cannot_convert(other, "bool")),
        }
        Ok(())
    }

    fn get(&self) -> HostValue {
        match self.status {
            Status::Present => HostValue::Bool(self.value),
            Status::Null => HostValue::Null,
            Status::Undefined => HostValue::Status(Status::Undefined),
        }
    }

    fn assign_to(&self, dst: &mut dyn Any) -> Result<()> {
        let rules = AssignRules::new(dst, "bool");
        let v = self.value;
        match self.status {
            Status::Present => rules
                .rule::<bool>(|| Ok(v))
                .rule::<Option<bool>>(|| Ok(Some(v)))
                .host(|| self.get())
                .finish(),
            Status::Null => rules
                .null::<bool>()
                .reject_null::<bool>()
                .host(|| HostValue::Null)
                .finish(),
            Status::Undefined => Err(assign_undefined("bool")),
        }
    }

    fn decode_text(&mut self, _ci: &TypeRegistry, src: Option<&[u8]>) -> Result<()> {
        *self = match src {
            None => Self::null(),
            Some(b"t") => Self::new(true),
            Some(b"f") => Self::new(false),
            Some(other) => {
                return Err(CodecError::DecodeError(format!(
                    "invalid bool {:?}",
                    String::from_utf8_lossy(other)
                )))
            }
        };
        Ok(())
    }

    fn decode_binary(&mut self, _ci: &TypeRegistry, src: Option<&[u8]>) -> Result<()> {
        *self = match src {
            None => Self::null(),
            Some([0]) => Self::new(false),
            Some([1]) => Self::new(true),
            Some(other) => {
                return Err(CodecError::DecodeError(format!(
                    "invalid bool payload of {} bytes",
                    other.len()
                )))
            }
        };
        Ok(())
    }

    fn encode_text(&self, _ci: &TypeRegistry, buf: &mut BytesMut) -> Result<IsNull> {
        if !should_encode(self.status)? {
            return Ok(IsNull::Yes);
        }
        buf.put_u8(if self.value { b't' } else { b'f' });
        Ok(IsNull::No)
    }

    fn encode_binary(&self, _ci: &TypeRegistry, buf: &mut BytesMut) -> Result<IsNull> {
        if !should_encode(self.status)? {
            return Ok(IsNull::Yes);
        }
        buf.put_u8(self.value as u8);
        Ok(IsNull::No)
    }
}
