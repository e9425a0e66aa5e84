//! `uuid`: hyphenated text, 16 raw bytes in binary.

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
pub struct Uuid {
    value: uuid::Uuid,
    status: Status,
}

impl Uuid {
    pub fn new(value: uuid::Uuid) -> Self {
        Self {
            value,
            status: Status::Present,
        }
    }

    pub fn null() -> Self {
        Self {
            value: uuid::Uuid::nil(),
            status: Status::Null,
        }
    }

    pub fn value(&self) -> Option<uuid::Uuid> {
        (self.status == Status::Present).then_some(self.value)
    }
}

impl Default for Uuid {
    fn default() -> Self {
        Self {
            value: uuid::Uuid::nil(),
            status: Status::Undefined,
        }
    }
}

impl ArrayElement for Uuid {
    const TYPE_NAME: &'static str = "uuid";
}

impl Transcoder for Uuid {
    fn status(&self) -> Status {
        self.status
    }

    fn set(&mut self, src: HostValue) -> Result<()> {
        match &src {
            HostValue::Null => *self = Self::null(),
            HostValue::Uuid(u) => *self = Self::new(*u),
            HostValue::String(s) => {
                let u = uuid::Uuid::parse_str(s).map_err(|_| cannot_convert(&src, "uuid"))?;
                *self = Self::new(u);
            }
            HostValue::Bytes(b) => {
                let u = uuid::Uuid::from_slice(b).map_err(|_| cannot_convert(&src, "uuid"))?;
                *self = Self::new(u);
            }
            HostValue::Derived(_) => return self.set(unwrap_for_retry(&src, "uuid")?),
            other => return Err(cannot_convert(other, "uuid")),
        }
        Ok(())
    }

    fn get(&self) -> HostValue {
        match self.status {
            Status::Present => HostValue::Uuid(self.value),
            Status::Null => HostValue::Null,
            Status::Undefined => HostValue::Status(Status::Undefined),
        }
    }

    fn assign_to(&self, dst: &mut dyn Any) -> Result<()> {
        let rules = AssignRules::new(dst, "uuid");
        let v = self.value;
        match self.status {
            Status::Present => rules
                .rule::<uuid::Uuid>(|| Ok(v))
                .rule::<Option<uuid::Uuid>>(|| Ok(Some(v)))
                .rule::<[u8; 16]>(|| Ok(*v.as_bytes()))
                .rule::<String>(|| Ok(v.hyphenated().to_string()))
                .rule::<Option<String>>(|| Ok(Some(v.hyphenated().to_string())))
                .host(|| self.get())
                .finish(),
            Status::Null => rules
                .null::<uuid::Uuid>()
                .null::<String>()
                .reject_null::<uuid::Uuid>()
                .reject_null::<[u8; 16]>()
                .reject_null::<String>()
                .host(|| HostValue::Null)
                .finish(),
            Status::Undefined => Err(assign_undefined("uuid")),
        }
    }

    fn decode_text(&mut self, _ci: &TypeRegistry, src: Option<&[u8]>) -> Result<()> {
        let Some(src) = src else {
            *self = Self::null();
            return Ok(());
        };
        let text = utf8(src, "uuid")?;
        let u = uuid::Uuid::parse_str(text)
            .map_err(|e| CodecError::DecodeError(format!("invalid uuid {:?}: {}", text, e)))?;
        *self = Self::new(u);
        Ok(())
    }

    fn decode_binary(&mut self, _ci: &TypeRegistry, src: Option<&[u8]>) -> Result<()> {
        let Some(src) = src else {
            *self = Self::null();
            return Ok(());
        };
        *self = Self::new(uuid::Uuid::from_bytes(fixed(src, "uuid")?));
        Ok(())
    }

    fn encode_text(&self, _ci: &TypeRegistry, buf: &mut BytesMut) -> Result<IsNull> {
        if !should_encode(self.status)? {
            return Ok(IsNull::Yes);
        }
        let mut scratch = uuid::Uuid::encode_buffer();
        buf.put_slice(self.value.hyphenated().encode_lower(&mut scratch).as_bytes());
        Ok(IsNull::No)
    }

    fn encode_binary(&self, _ci: &TypeRegistry, buf: &mut BytesMut) -> Result<IsNull> {
        if !should_encode(self.status)? {
            return Ok(IsNull::Yes);
        }
        buf.put_slice(self.value.as_bytes());
        Ok(IsNull::No)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "a0eebc99-9c0b-4ef8-bb6d-6bb9bd380a11";

    #[test]
    fn test_text_and_binary() {
        let ci = TypeRegistry::new();
        let mut v = Uuid::default();
        v.decode_text(&ci, Some(SAMPLE.to_uppercase().as_bytes())).unwrap();

        let mut buf = BytesMut::new();
        v.encode_text(&ci, &mut buf).unwrap();
        assert_eq!(&buf[..], SAMPLE.as_bytes());

        buf.clear();
        v.encode_binary(&ci, &mut buf).unwrap();
        assert_eq!(buf.len(), 16);

        let mut back = Uuid::default();
        back.decode_binary(&ci, Some(&buf)).unwrap();
        assert_eq!(back, v);

        assert!(back.decode_binary(&ci, Some(&buf[..15])).is_err());
    }

    #[test]
    fn test_set_and_assign() {
        let mut v = Uuid::default();
        v.set(HostValue::from(SAMPLE)).unwrap();

        let mut s = String::new();
        v.assign_to(&mut s).unwrap();
        assert_eq!(s, SAMPLE);

        assert!(v.set(HostValue::from("not-a-uuid")).is_err());
        assert!(v.set(HostValue::Bytes(vec![1, 2, 3])).is_err());
    }
}
