//! `json`. Both wire formats carry the JSON document as UTF-8 text.

use std::any::Any;

use bytes::{BufMut, BytesMut};
use serde_json::Value;

use super::unwrap_for_retry;
use crate::error::{CodecError, Result};
use crate::pg::registry::TypeRegistry;
use crate::pg::transcoder::{
    assign_undefined, should_encode, ArrayElement, AssignRules, IsNull, Transcoder,
};
use crate::pg::types::{HostValue, Status};

fn parse(src: &[u8]) -> Result<Value> {
    serde_json::from_slice(src).map_err(|e| CodecError::DecodeError(format!("invalid json: {}", e)))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Json {
    value: Value,
    status: Status,
}

impl Json {
    pub fn new(value: Value) -> Self {
        Self {
            value,
            status: Status::Present,
        }
    }

    pub fn null() -> Self {
        Self {
            value: Value::Null,
            status: Status::Null,
        }
    }

    pub fn value(&self) -> Option<&Value> {
        (self.status == Status::Present).then_some(&self.value)
    }
}

impl Default for Json {
    fn default() -> Self {
        Self {
            value: Value::Null,
            status: Status::Undefined,
        }
    }
}

impl ArrayElement for Json {
    const TYPE_NAME: &'static str = "json";
}

impl Transcoder for Json {
    fn status(&self) -> Status {
        self.status
    }

    /// Strings and bytes are taken as JSON text; any other host value is
    /// converted to the document it renders as.
    fn set(&mut self, src: HostValue) -> Result<()> {
        match src {
            HostValue::Null => *self = Self::null(),
            HostValue::Json(v) => *self = Self::new(v),
            HostValue::String(s) => {
                *self = Self::new(parse(s.as_bytes()).map_err(|_| {
                    CodecError::ConversionError("string to json: not a JSON document".to_string())
                })?)
            }
            HostValue::Bytes(b) => {
                *self = Self::new(parse(&b).map_err(|_| {
                    CodecError::ConversionError("bytes to json: not a JSON document".to_string())
                })?)
            }
            src @ HostValue::Derived(_) => return self.set(unwrap_for_retry(&src, "json")?),
            other => *self = Self::new(other.to_json()),
        }
        Ok(())
    }

    fn get(&self) -> HostValue {
        match self.status {
            Status::Present => HostValue::Json(self.value.clone()),
            Status::Null => HostValue::Null,
            Status::Undefined => HostValue::Status(Status::Undefined),
        }
    }

    fn assign_to(&self, dst: &mut dyn Any) -> Result<()> {
        let rules = AssignRules::new(dst, "json");
        match self.status {
            Status::Present => rules
                .rule::<Value>(|| Ok(self.value.clone()))
                .rule::<Option<Value>>(|| Ok(Some(self.value.clone())))
                .rule::<String>(|| Ok(self.value.to_string()))
                .rule::<Option<String>>(|| Ok(Some(self.value.to_string())))
                .rule::<Vec<u8>>(|| Ok(self.value.to_string().into_bytes()))
                .host(|| self.get())
                .finish(),
            Status::Null => rules
                .null::<Value>()
                .null::<String>()
                .rule::<Value>(|| Ok(Value::Null))
                .reject_null::<String>()
                .host(|| HostValue::Null)
                .finish(),
            Status::Undefined => Err(assign_undefined("json")),
        }
    }

    fn decode_text(&mut self, _ci: &TypeRegistry, src: Option<&[u8]>) -> Result<()> {
        *self = match src {
            None => Self::null(),
            Some(src) => Self::new(parse(src)?),
        };
        Ok(())
    }

    fn decode_binary(&mut self, ci: &TypeRegistry, src: Option<&[u8]>) -> Result<()> {
        self.decode_text(ci, src)
    }

    fn encode_text(&self, _ci: &TypeRegistry, buf: &mut BytesMut) -> Result<IsNull> {
        if !should_encode(self.status)? {
            return Ok(IsNull::Yes);
        }
        buf.put_slice(self.value.to_string().as_bytes());
        Ok(IsNull::No)
    }

    fn encode_binary(&self, ci: &TypeRegistry, buf: &mut BytesMut) -> Result<IsNull> {
        self.encode_text(ci, buf)
    }

    fn to_json(&self) -> Result<Value> {
        match self.status {
            Status::Present => Ok(self.value.clone()),
            Status::Null => Ok(Value::Null),
            Status::Undefined => Err(CodecError::UndefinedValueError),
        }
    }
}
