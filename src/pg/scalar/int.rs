//! `int2`, `int4` and `int8`.

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

/// Integer view of a numeric host value. Floats qualify only when integral.
fn host_integer(src: &HostValue) -> Option<i128> {
    match *src {
        HostValue::I16(v) => Some(v.into()),
        HostValue::I32(v) => Some(v.into()),
        HostValue::I64(v) => Some(v.into()),
        HostValue::U16(v) => Some(v.into()),
        HostValue::U32(v) => Some(v.into()),
        HostValue::U64(v) => Some(v.into()),
        HostValue::F32(v) if v.is_finite() && v.fract() == 0.0 => Some(v as i128),
        HostValue::F64(v) if v.is_finite() && v.fract() == 0.0 => Some(v as i128),
        _ => None,
    }
}

fn narrow<T: TryFrom<i128>>(v: i128, target: &str) -> Result<T> {
    T::try_from(v).map_err(|_| CodecError::ConversionError(format!("{} to {}", v, target)))
}

fn assign_integer(rules: AssignRules<'_>, v: i128) -> AssignRules<'_> {
    rules
        .rule::<i16>(|| narrow(v, "i16"))
        .rule::<i32>(|| narrow(v, "i32"))
        .rule::<i64>(|| narrow(v, "i64"))
        .rule::<u16>(|| narrow(v, "u16"))
        .rule::<u32>(|| narrow(v, "u32"))
        .rule::<u64>(|| narrow(v, "u64"))
        .rule::<Option<i16>>(|| narrow(v, "i16").map(Some))
        .rule::<Option<i32>>(|| narrow(v, "i32").map(Some))
        .rule::<Option<i64>>(|| narrow(v, "i64").map(Some))
        .rule::<Option<u16>>(|| narrow(v, "u16").map(Some))
        .rule::<Option<u32>>(|| narrow(v, "u32").map(Some))
        .rule::<Option<u64>>(|| narrow(v, "u64").map(Some))
}

fn assign_null(rules: AssignRules<'_>) -> AssignRules<'_> {
    rules
        .null::<i16>()
        .null::<i32>()
        .null::<i64>()
        .null::<u16>()
        .null::<u32>()
        .null::<u64>()
        .reject_null::<i16>()
        .reject_null::<i32>()
        .reject_null::<i64>()
        .reject_null::<u16>()
        .reject_null::<u32>()
        .reject_null::<u64>()
}

macro_rules! int_type {
    ($(#[$meta:meta])* $name:ident, $ty:ty, $variant:ident, $type_name:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name {
            value: $ty,
            status: Status,
        }

        impl $name {
            pub fn new(value: $ty) -> Self {
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

            /// The value, if present.
            pub fn value(&self) -> Option<$ty> {
                (self.status == Status::Present).then_some(self.value)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self {
                    value: 0,
                    status: Status::Undefined,
                }
            }
        }

        impl ArrayElement for $name {
            const TYPE_NAME: &'static str = $type_name;
        }

        impl Transcoder for $name {
            fn status(&self) -> Status {
                self.status
            }

            fn set(&mut self, src: HostValue) -> Result<()> {
                match &src {
                    HostValue::Null => *self = Self::null(),
                    HostValue::String(s) => {
                        let v = s.parse::<$ty>().map_err(|_| cannot_convert(&src, $type_name))?;
                        *self = Self::new(v);
                    }
                    HostValue::Derived(_) => return self.set(unwrap_for_retry(&src, $type_name)?),
                    other => match host_integer(other) {
                        Some(v) => *self = Self::new(narrow(v, $type_name)?),
                        None => return Err(cannot_convert(other, $type_name)),
                    },
                }
                Ok(())
            }

            fn get(&self) -> HostValue {
                match self.status {
                    Status::Present => HostValue::$variant(self.value),
                    Status::Null => HostValue::Null,
                    Status::Undefined => HostValue::Status(Status::Undefined),
                }
            }

            fn assign_to(&self, dst: &mut dyn Any) -> Result<()> {
                let rules = AssignRules::new(dst, $type_name);
                match self.status {
                    Status::Present => assign_integer(rules, i128::from(self.value))
                        .host(|| self.get())
                        .finish(),
                    Status::Null => assign_null(rules).host(|| HostValue::Null).finish(),
                    Status::Undefined => Err(assign_undefined($type_name)),
                }
            }

            fn decode_text(&mut self, _ci: &TypeRegistry, src: Option<&[u8]>) -> Result<()> {
                let Some(src) = src else {
                    *self = Self::null();
                    return Ok(());
                };
                let text = utf8(src, $type_name)?;
                let v = text.parse::<$ty>().map_err(|e| {
                    CodecError::DecodeError(format!("invalid {} {:?}: {}", $type_name, text, e))
                })?;
                *self = Self::new(v);
                Ok(())
            }

            fn decode_binary(&mut self, _ci: &TypeRegistry, src: Option<&[u8]>) -> Result<()> {
                let Some(src) = src else {
                    *self = Self::null();
                    return Ok(());
                };
                *self = Self::new(<$ty>::from_be_bytes(fixed(src, $type_name)?));
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
                buf.put_slice(&self.value.to_be_bytes());
                Ok(IsNull::No)
            }
        }
    };
}

int_type!(
    /// `int2`: 16-bit signed integer.
    Int2, i16, I16, "int2"
);
int_type!(
    /// `int4`: 32-bit signed integer.
    Int4, i32, I32, "int4"
);
int_type!(
    /// `int8`: 64-bit signed integer.
    Int8, i64, I64, "int8"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_numeric_conversions() {
        let mut v = Int2::default();
        v.set(HostValue::I64(300)).unwrap();
        assert_eq!(v, Int2::new(300));

        v.set(HostValue::F64(12.0)).unwrap();
        assert_eq!(v.value(), Some(12));

        v.set(HostValue::from("-7")).unwrap();
        assert_eq!(v.value(), Some(-7));

        assert!(matches!(
            v.set(HostValue::I32(40_000)),
            Err(CodecError::ConversionError(_))
        ));
        assert!(matches!(
            v.set(HostValue::F64(1.5)),
            Err(CodecError::ConversionError(_))
        ));
        assert!(matches!(
            v.set(HostValue::Bool(true)),
            Err(CodecError::ConversionError(_))
        ));
    }

    #[test]
    fn test_get_reports_status() {
        assert_eq!(Int4::new(5).get(), HostValue::I32(5));
        assert_eq!(Int4::null().get(), HostValue::Null);
        assert_eq!(
            Int4::default().get(),
            HostValue::Status(Status::Undefined)
        );
    }

    #[test]
    fn test_text_and_binary() {
        let ci = TypeRegistry::new();
        let mut v = Int8::default();
        v.decode_text(&ci, Some(b"-9223372036854775808")).unwrap();
        assert_eq!(v.value(), Some(i64::MIN));

        let mut buf = BytesMut::new();
        v.encode_binary(&ci, &mut buf).unwrap();
        assert_eq!(&buf[..], &i64::MIN.to_be_bytes());

        let mut back = Int8::default();
        back.decode_binary(&ci, Some(&buf)).unwrap();
        assert_eq!(back, v);

        assert!(v.decode_text(&ci, Some(b"12a")).is_err());
        assert!(v.decode_binary(&ci, Some(&[0, 1])).is_err());
    }

    #[test]
    fn test_assign() {
        let v = Int4::new(70_000);
        let mut wide: i64 = 0;
        v.assign_to(&mut wide).unwrap();
        assert_eq!(wide, 70_000);

        let mut narrow_dst: i16 = 0;
        assert!(v.assign_to(&mut narrow_dst).is_err());

        let mut opt: Option<i32> = None;
        v.assign_to(&mut opt).unwrap();
        assert_eq!(opt, Some(70_000));

        let mut text = String::new();
        assert!(matches!(
            v.assign_to(&mut text),
            Err(CodecError::AssignmentError(_))
        ));
    }

    #[test]
    fn test_encode_undefined_fails() {
        let ci = TypeRegistry::new();
        let mut buf = BytesMut::new();
        assert_eq!(
            Int2::default().encode_text(&ci, &mut buf),
            Err(CodecError::UndefinedValueError)
        );
    }
}
