//! Character types: `text`, `varchar`, `bpchar` and the `ltree` extension.

use std::any::Any;

use bytes::{BufMut, BytesMut};

use super::unwrap_for_retry;
use crate::error::{CodecError, Result};
use crate::pg::registry::TypeRegistry;
use crate::pg::transcoder::{
    assign_undefined, cannot_convert, should_encode, utf8, ArrayElement, AssignRules, IsNull,
    Transcoder,
};
use crate::pg::types::{HostValue, Status};

/// `text`. The text and binary formats are both the raw UTF-8 bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Text {
    value: String,
    status: Status,
}

impl Text {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            status: Status::Present,
        }
    }

    pub fn null() -> Self {
        Self {
            value: String::new(),
            status: Status::Null,
        }
    }

    pub fn value(&self) -> Option<&str> {
        (self.status == Status::Present).then_some(self.value.as_str())
    }

    fn set_as(&mut self, src: HostValue, target: &str) -> Result<()> {
        match src {
            HostValue::Null => *self = Self::null(),
            HostValue::String(s) => *self = Self::new(s),
            HostValue::Bytes(b) => match String::from_utf8(b) {
                Ok(s) => *self = Self::new(s),
                Err(e) => {
                    return Err(CodecError::ConversionError(format!(
                        "non UTF-8 bytes to {}: {}",
                        target,
                        e.utf8_error()
                    )))
                }
            },
            src @ HostValue::Derived(_) => return self.set_as(unwrap_for_retry(&src, target)?, target),
            other => return Err(cannot_convert(&other, target)),
        }
        Ok(())
    }

    fn assign_as(&self, dst: &mut dyn Any, source: &'static str) -> Result<()> {
        let rules = AssignRules::new(dst, source);
        match self.status {
            Status::Present => rules
                .rule::<String>(|| Ok(self.value.clone()))
                .rule::<Option<String>>(|| Ok(Some(self.value.clone())))
                .rule::<Vec<u8>>(|| Ok(self.value.clone().into_bytes()))
                .rule::<Option<Vec<u8>>>(|| Ok(Some(self.value.clone().into_bytes())))
                .host(|| self.get())
                .finish(),
            Status::Null => rules
                .null::<String>()
                .null::<Vec<u8>>()
                .reject_null::<String>()
                .rule::<Vec<u8>>(|| Ok(Vec::new()))
                .host(|| HostValue::Null)
                .finish(),
            Status::Undefined => Err(assign_undefined(source)),
        }
    }

    fn decode_as(&mut self, src: Option<&[u8]>, target: &str) -> Result<()> {
        *self = match src {
            None => Self::null(),
            Some(src) => Self::new(utf8(src, target)?),
        };
        Ok(())
    }

    fn encode_raw(&self, buf: &mut BytesMut) -> Result<IsNull> {
        if !should_encode(self.status)? {
            return Ok(IsNull::Yes);
        }
        buf.put_slice(self.value.as_bytes());
        Ok(IsNull::No)
    }
}

impl Default for Text {
    fn default() -> Self {
        Self {
            value: String::new(),
            status: Status::Undefined,
        }
    }
}

impl ArrayElement for Text {
    const TYPE_NAME: &'static str = "text";
}

impl Transcoder for Text {
    fn status(&self) -> Status {
        self.status
    }

    fn set(&mut self, src: HostValue) -> Result<()> {
        self.set_as(src, "text")
    }

    fn get(&self) -> HostValue {
        match self.status {
            Status::Present => HostValue::String(self.value.clone()),
            Status::Null => HostValue::Null,
            Status::Undefined => HostValue::Status(Status::Undefined),
        }
    }

    fn assign_to(&self, dst: &mut dyn Any) -> Result<()> {
        self.assign_as(dst, "text")
    }

    fn decode_text(&mut self, _ci: &TypeRegistry, src: Option<&[u8]>) -> Result<()> {
        self.decode_as(src, "text")
    }

    fn decode_binary(&mut self, _ci: &TypeRegistry, src: Option<&[u8]>) -> Result<()> {
        self.decode_as(src, "text")
    }

    fn encode_text(&self, _ci: &TypeRegistry, buf: &mut BytesMut) -> Result<IsNull> {
        self.encode_raw(buf)
    }

    fn encode_binary(&self, _ci: &TypeRegistry, buf: &mut BytesMut) -> Result<IsNull> {
        self.encode_raw(buf)
    }
}

/// Character types that share the `text` wire formats under another name.
macro_rules! text_alias {
    ($(#[$meta:meta])* $name:ident, $type_name:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
        pub struct $name(Text);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(Text::new(value))
            }

            pub fn null() -> Self {
                Self(Text::null())
            }

            pub fn value(&self) -> Option<&str> {
                self.0.value()
            }
        }

        impl ArrayElement for $name {
            const TYPE_NAME: &'static str = $type_name;
        }

        impl Transcoder for $name {
            fn status(&self) -> Status {
                self.0.status
            }

            fn set(&mut self, src: HostValue) -> Result<()> {
                self.0.set_as(src, $type_name)
            }

            fn get(&self) -> HostValue {
                self.0.get()
            }

            fn assign_to(&self, dst: &mut dyn Any) -> Result<()> {
                self.0.assign_as(dst, $type_name)
            }

            fn decode_text(&mut self, _ci: &TypeRegistry, src: Option<&[u8]>) -> Result<()> {
                self.0.decode_as(src, $type_name)
            }

            fn decode_binary(&mut self, _ci: &TypeRegistry, src: Option<&[u8]>) -> Result<()> {
                self.0.decode_as(src, $type_name)
            }

            fn encode_text(&self, _ci: &TypeRegistry, buf: &mut BytesMut) -> Result<IsNull> {
                self.0.encode_raw(buf)
            }

            fn encode_binary(&self, _ci: &TypeRegistry, buf: &mut BytesMut) -> Result<IsNull> {
                self.0.encode_raw(buf)
            }
        }
    };
}

text_alias!(
    /// `varchar`. Length limits are enforced by the server, not here.
    Varchar, "varchar"
);
text_alias!(
    /// `bpchar` (`char(n)`). Padding is preserved as received.
    Bpchar, "bpchar"
);

/// Version byte prefixed to the binary form of `ltree`.
const LTREE_BINARY_VERSION: u8 = 1;

/// `ltree` label path. Text form as `text`; binary form carries a version byte.
///
/// `ltree` is an extension type, so its OID must be registered before a binary
/// `ltree[]` can be encoded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Ltree(Text);

impl Ltree {
    pub fn new(value: impl Into<String>) -> Self {
        Self(Text::new(value))
    }

    pub fn null() -> Self {
        Self(Text::null())
    }

    pub fn value(&self) -> Option<&str> {
        self.0.value()
    }
}

impl ArrayElement for Ltree {
    const TYPE_NAME: &'static str = "ltree";
}

impl Transcoder for Ltree {
    fn status(&self) -> Status {
        self.0.status
    }

    fn set(&mut self, src: HostValue) -> Result<()> {
        self.0.set_as(src, "ltree")
    }

    fn get(&self) -> HostValue {
        self.0.get()
    }

    fn assign_to(&self, dst: &mut dyn Any) -> Result<()> {
        self.0.assign_as(dst, "ltree")
    }

    fn decode_text(&mut self, _ci: &TypeRegistry, src: Option<&[u8]>) -> Result<()> {
        self.0.decode_as(src, "ltree")
    }

    fn decode_binary(&mut self, _ci: &TypeRegistry, src: Option<&[u8]>) -> Result<()> {
        match src {
            None => self.0.decode_as(None, "ltree"),
            Some([LTREE_BINARY_VERSION, rest @ ..]) => self.0.decode_as(Some(rest), "ltree"),
            Some([version, ..]) => Err(CodecError::DecodeError(format!(
                "unsupported ltree binary version {}",
                version
            ))),
            Some([]) => Err(CodecError::DecodeError(
                "ltree binary payload is missing its version byte".to_string(),
            )),
        }
    }

    fn encode_text(&self, _ci: &TypeRegistry, buf: &mut BytesMut) -> Result<IsNull> {
        self.0.encode_raw(buf)
    }

    fn encode_binary(&self, _ci: &TypeRegistry, buf: &mut BytesMut) -> Result<IsNull> {
        if !should_encode(self.0.status)? {
            return Ok(IsNull::Yes);
        }
        buf.put_u8(LTREE_BINARY_VERSION);
        buf.put_slice(self.0.value.as_bytes());
        Ok(IsNull::No)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_set_and_assign() {
        let mut v = Text::default();
        v.set(HostValue::Bytes(b"abc".to_vec())).unwrap();
        assert_eq!(v.value(), Some("abc"));

        let mut s = String::new();
        v.assign_to(&mut s).unwrap();
        assert_eq!(s, "abc");

        assert!(v.set(HostValue::Bytes(vec![0xff])).is_err());
        assert!(v.set(HostValue::I32(1)).is_err());
    }

    #[test]
    fn test_null_assign() {
        let v = Text::null();
        let mut opt = Some("x".to_string());
        v.assign_to(&mut opt).unwrap();
        assert_eq!(opt, None);

        let mut plain = String::new();
        assert!(matches!(
            v.assign_to(&mut plain),
            Err(CodecError::NullAssignmentError(_))
        ));
    }

    #[test]
    fn test_alias_keeps_own_name() {
        let mut v = Varchar::default();
        let err = v.set(HostValue::Bool(true)).unwrap_err();
        assert_eq!(err, CodecError::ConversionError("bool to varchar".to_string()));
        assert_eq!(Bpchar::TYPE_NAME, "bpchar");
    }

    #[test]
    fn test_decode_invalid_utf8() {
        let ci = TypeRegistry::new();
        let mut v = Text::default();
        assert!(matches!(
            v.decode_text(&ci, Some(&[0xc3, 0x28])),
            Err(CodecError::DecodeError(_))
        ));
    }

    #[test]
    fn test_ltree_binary_version() {
        let ci = TypeRegistry::new();
        let mut buf = BytesMut::new();
        Ltree::new("Top.Science").encode_binary(&ci, &mut buf).unwrap();
        assert_eq!(&buf[..], b"\x01Top.Science");

        let mut v = Ltree::default();
        v.decode_binary(&ci, Some(&buf)).unwrap();
        assert_eq!(v.value(), Some("Top.Science"));

        assert!(v.decode_binary(&ci, Some(b"\x02a")).is_err());
        assert!(v.decode_binary(&ci, Some(b"")).is_err());

        let mut text = BytesMut::new();
        v.encode_text(&ci, &mut text).unwrap();
        assert_eq!(&text[..], b"Top.Science");
    }
}
