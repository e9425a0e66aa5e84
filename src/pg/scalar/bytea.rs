//! `bytea`. Text format is hex (`\x0a1b`); binary is the raw bytes.

use std::any::Any;

use bytes::{BufMut, BytesMut};

use super::unwrap_for_retry;
use crate::error::{CodecError, Result};
use crate::pg::registry::TypeRegistry;
use crate::pg::transcoder::{
    assign_undefined, cannot_convert, should_encode, ArrayElement, AssignRules, IsNull, Transcoder,
};
use crate::pg::types::{HostValue, Status};

const HEX_DIGITS: &[u8; 16] = b"0123456789abcdef";

fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

fn decode_hex(src: &[u8]) -> Result<Vec<u8>> {
    let Some(digits) = src.strip_prefix(b"\\x") else {
        return Err(CodecError::DecodeError(
            "bytea text must use the hex format".to_string(),
        ));
    };
    if digits.len() % 2 != 0 {
        return Err(CodecError::DecodeError(format!(
            "odd number of hex digits in bytea: {}",
            digits.len()
        )));
    }

    digits
        .chunks_exact(2)
        .map(|pair| match (hex_value(pair[0]), hex_value(pair[1])) {
            (Some(hi), Some(lo)) => Ok((hi << 4) | lo),
            _ => Err(CodecError::DecodeError(format!(
                "invalid hex digits {:?} in bytea",
                String::from_utf8_lossy(pair)
            ))),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Bytea {
    value: Vec<u8>,
    status: Status,
}

impl Bytea {
    pub fn new(value: impl Into<Vec<u8>>) -> Self {
        Self {
            value: value.into(),
            status: Status::Present,
        }
    }

    pub fn null() -> Self {
        Self {
            value: Vec::new(),
            status: Status::Null,
        }
    }

    pub fn value(&self) -> Option<&[u8]> {
        (self.status == Status::Present).then_some(self.value.as_slice())
    }
}

impl Default for Bytea {
    fn default() -> Self {
        Self {
            value: Vec::new(),
            status: Status::Undefined,
        }
    }
}

impl ArrayElement for Bytea {
    const TYPE_NAME: &'static str = "bytea";
}

impl Transcoder for Bytea {
    fn status(&self) -> Status {
        self.status
    }

    fn set(&mut self, src: HostValue) -> Result<()> {
        match src {
            HostValue::Null => *self = Self::null(),
            HostValue::Bytes(b) => *self = Self::new(b),
            src @ HostValue::Derived(_) => return self.set(unwrap_for_retry(&src, "bytea")?),
            other => return Err(cannot_convert(&other, "bytea")),
        }
        Ok(())
    }

    fn get(&self) -> HostValue {
        match self.status {
            Status::Present => HostValue::Bytes(self.value.clone()),
            Status::Null => HostValue::Null,
            Status::Undefined => HostValue::Status(Status::Undefined),
        }
    }

    fn assign_to(&self, dst: &mut dyn Any) -> Result<()> {
        let rules = AssignRules::new(dst, "bytea");
        match self.status {
            Status::Present => rules
                .rule::<Vec<u8>>(|| Ok(self.value.clone()))
                .rule::<Option<Vec<u8>>>(|| Ok(Some(self.value.clone())))
                .host(|| self.get())
                .finish(),
            // an empty vector stands in for NULL
            Status::Null => rules
                .null::<Vec<u8>>()
                .rule::<Vec<u8>>(|| Ok(Vec::new()))
                .host(|| HostValue::Null)
                .finish(),
            Status::Undefined => Err(assign_undefined("bytea")),
        }
    }

    fn decode_text(&mut self, _ci: &TypeRegistry, src: Option<&[u8]>) -> Result<()> {
        *self = match src {
            None => Self::null(),
            Some(src) => Self::new(decode_hex(src)?),
        };
        Ok(())
    }

    fn decode_binary(&mut self, _ci: &TypeRegistry, src: Option<&[u8]>) -> Result<()> {
        *self = match src {
            None => Self::null(),
            Some(src) => Self::new(src),
        };
        Ok(())
    }

    fn encode_text(&self, _ci: &TypeRegistry, buf: &mut BytesMut) -> Result<IsNull> {
        if !should_encode(self.status)? {
            return Ok(IsNull::Yes);
        }

        buf.reserve(2 + self.value.len() * 2);
        buf.put_slice(b"\\x");
        for &b in &self.value {
            buf.put_u8(HEX_DIGITS[usize::from(b >> 4)]);
            buf.put_u8(HEX_DIGITS[usize::from(b & 0x0f)]);
        }
        Ok(IsNull::No)
    }

    fn encode_binary(&self, _ci: &TypeRegistry, buf: &mut BytesMut) -> Result<IsNull> {
        if !should_encode(self.status)? {
            return Ok(IsNull::Yes);
        }
        buf.put_slice(&self.value);
        Ok(IsNull::No)
    }
}
