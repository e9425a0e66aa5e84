//! `float4` and `float8`.
//!
//! The binary format is the IEEE 754 bit pattern. Whether `NaN` and the
//! infinities are valid in the text format depends on
//! [`config::nan_infinity_aware`](crate::config::nan_infinity_aware).

use std::any::Any;

use bytes::{BufMut, BytesMut};

use super::{fixed, unwrap_for_retry};
use crate::config;
use crate::error::{CodecError, Result};
use crate::pg::registry::TypeRegistry;
use crate::pg::transcoder::{
    assign_undefined, cannot_convert, should_encode, utf8, ArrayElement, AssignRules, IsNull,
    Transcoder,
};
use crate::pg::types::{HostValue, Status};

macro_rules! float_type {
    ($(#[$meta:meta])* $name:ident, $ty:ty, $bits:ty, $variant:ident, $type_name:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq)]
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
                    value: 0.0,
                    status: Status::Null,
                }
            }

            pub fn value(&self) -> Option<$ty> {
                (self.status == Status::Present).then_some(self.value)
            }

            fn parse_text(text: &str) -> Result<$ty> {
                if config::nan_infinity_aware() {
                    match text {
                        "NaN" => return Ok(<$ty>::NAN),
                        "Infinity" => return Ok(<$ty>::INFINITY),
                        "-Infinity" => return Ok(<$ty>::NEG_INFINITY),
                        _ => {}
                    }
                }

                let v = text.parse::<$ty>().map_err(|e| {
                    CodecError::DecodeError(format!("invalid {} {:?}: {}", $type_name, text, e))
                })?;
                if !v.is_finite() {
                    return Err(CodecError::DecodeError(format!(
                        "non-finite {} {:?}",
                        $type_name, text
                    )));
                }
                Ok(v)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self {
                    value: 0.0,
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
                let v = match &src {
                    HostValue::Null => {
                        *self = Self::null();
                        return Ok(());
                    }
                    HostValue::F32(v) => *v as $ty,
                    HostValue::F64(v) => *v as $ty,
                    HostValue::String(s) => {
                        Self::parse_text(s).map_err(|_| cannot_convert(&src, $type_name))?
                    }
                    HostValue::Derived(_) => return self.set(unwrap_for_retry(&src, $type_name)?),
                    other => {
                        let n: i128 = match *other {
                            HostValue::I16(n) => n.into(),
                            HostValue::I32(n) => n.into(),
                            HostValue::I64(n) => n.into(),
                            HostValue::U16(n) => n.into(),
                            HostValue::U32(n) => n.into(),
                            HostValue::U64(n) => n.into(),
                            _ => return Err(cannot_convert(other, $type_name)),
                        };
                        // integers must survive the round trip exactly
                        let f = n as $ty;
                        if f as i128 != n {
                            return Err(CodecError::ConversionError(format!(
                                "{} to {} without loss",
                                n, $type_name
                            )));
                        }
                        f
                    }
                };
                *self = Self::new(v);
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
                let v = self.value;
                match self.status {
                    Status::Present => rules
                        .rule::<f32>(|| Ok(v as f32))
                        .rule::<f64>(|| Ok(v as f64))
                        .rule::<Option<f32>>(|| Ok(Some(v as f32)))
                        .rule::<Option<f64>>(|| Ok(Some(v as f64)))
                        .host(|| self.get())
                        .finish(),
                    Status::Null => rules
                        .null::<f32>()
                        .null::<f64>()
                        .reject_null::<f32>()
                        .reject_null::<f64>()
                        .host(|| HostValue::Null)
                        .finish(),
                    Status::Undefined => Err(assign_undefined($type_name)),
                }
            }

            fn decode_text(&mut self, _ci: &TypeRegistry, src: Option<&[u8]>) -> Result<()> {
                let Some(src) = src else {
                    *self = Self::null();
                    return Ok(());
                };
                *self = Self::new(Self::parse_text(utf8(src, $type_name)?)?);
                Ok(())
            }

            fn decode_binary(&mut self, _ci: &TypeRegistry, src: Option<&[u8]>) -> Result<()> {
                let Some(src) = src else {
                    *self = Self::null();
                    return Ok(());
                };
                let bits = <$bits>::from_be_bytes(fixed(src, $type_name)?);
                *self = Self::new(<$ty>::from_bits(bits));
                Ok(())
            }

            fn encode_text(&self, _ci: &TypeRegistry, buf: &mut BytesMut) -> Result<IsNull> {
                if !should_encode(self.status)? {
                    return Ok(IsNull::Yes);
                }

                let v = self.value;
                if v.is_finite() {
                    buf.put_slice(v.to_string().as_bytes());
                } else if config::nan_infinity_aware() {
                    let spelled: &[u8] = if v.is_nan() {
                        b"NaN"
                    } else if v > 0.0 {
                        b"Infinity"
                    } else {
                        b"-Infinity"
                    };
                    buf.put_slice(spelled);
                } else {
                    return Err(CodecError::ConversionError(format!(
                        "non-finite {} {} to text",
                        $type_name, v
                    )));
                }
                Ok(IsNull::No)
            }

            fn encode_binary(&self, _ci: &TypeRegistry, buf: &mut BytesMut) -> Result<IsNull> {
                if !should_encode(self.status)? {
                    return Ok(IsNull::Yes);
                }
                buf.put_slice(&self.value.to_bits().to_be_bytes());
                Ok(IsNull::No)
            }
        }
    };
}

float_type!(
    /// `float4`: single precision.
    Float4, f32, u32, F32, "float4"
);
float_type!(
    /// `float8`: double precision.
    Float8, f64, u64, F64, "float8"
);
