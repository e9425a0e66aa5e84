//! `timestamptz`.
//!
//! Binary format is microseconds since 2000-01-01 00:00:00 UTC, with
//! `i64::MAX` and `i64::MIN` standing for `infinity` and `-infinity`.
//! Text is always produced in UTC (`2024-01-02 03:04:05.123456+00`).

use std::any::Any;

use bytes::{BufMut, BytesMut};
use chrono::{DateTime, Timelike, Utc};

use super::{fixed, unwrap_for_retry};
use crate::error::{CodecError, Result};
use crate::pg::registry::TypeRegistry;
use crate::pg::transcoder::{
    assign_undefined, cannot_convert, should_encode, utf8, ArrayElement, AssignRules, IsNull,
    Transcoder,
};
use crate::pg::types::{HostValue, Status};

/// Microseconds between the Unix epoch and the PostgreSQL epoch.
const PG_EPOCH_OFFSET_MICROS: i64 = 946_684_800_000_000;

const INFINITY_MICROS: i64 = i64::MAX;
const NEG_INFINITY_MICROS: i64 = i64::MIN;

const TEXT_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f%#z";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InfinityModifier {
    Finite,
    Infinity,
    NegativeInfinity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Timestamptz {
    value: DateTime<Utc>,
    infinity: InfinityModifier,
    status: Status,
}

fn truncate_to_micros(t: DateTime<Utc>) -> DateTime<Utc> {
    let nanos = t.nanosecond();
    t.with_nanosecond(nanos - nanos % 1_000).unwrap_or(t)
}

impl Timestamptz {
    /// A finite timestamp. Precision beyond microseconds is dropped.
    pub fn new(value: DateTime<Utc>) -> Self {
        Self {
            value: truncate_to_micros(value),
            infinity: InfinityModifier::Finite,
            status: Status::Present,
        }
    }

    pub fn infinity() -> Self {
        Self {
            infinity: InfinityModifier::Infinity,
            ..Self::new(DateTime::<Utc>::UNIX_EPOCH)
        }
    }

    pub fn negative_infinity() -> Self {
        Self {
            infinity: InfinityModifier::NegativeInfinity,
            ..Self::new(DateTime::<Utc>::UNIX_EPOCH)
        }
    }

    pub fn null() -> Self {
        Self {
            status: Status::Null,
            ..Self::default()
        }
    }

    /// The timestamp, if present and finite.
    pub fn value(&self) -> Option<DateTime<Utc>> {
        (self.status == Status::Present && self.infinity == InfinityModifier::Finite)
            .then_some(self.value)
    }

    pub fn infinity_modifier(&self) -> InfinityModifier {
        self.infinity
    }

    fn parse_text(text: &str) -> Result<Self> {
        match text {
            "infinity" => Ok(Self::infinity()),
            "-infinity" => Ok(Self::negative_infinity()),
            _ => DateTime::parse_from_str(text, TEXT_FORMAT)
                .or_else(|_| DateTime::parse_from_rfc3339(text))
                .map(|t| Self::new(t.with_timezone(&Utc)))
                .map_err(|e| {
                    CodecError::DecodeError(format!("invalid timestamptz {:?}: {}", text, e))
                }),
        }
    }
}

impl Default for Timestamptz {
    fn default() -> Self {
        Self {
            value: DateTime::<Utc>::UNIX_EPOCH,
            infinity: InfinityModifier::Finite,
            status: Status::Undefined,
        }
    }
}

impl ArrayElement for Timestamptz {
    const TYPE_NAME: &'static str = "timestamptz";
}

impl Transcoder for Timestamptz {
    fn status(&self) -> Status {
        self.status
    }

    fn set(&mut self, src: HostValue) -> Result<()> {
        match &src {
            HostValue::Null => *self = Self::null(),
            HostValue::Timestamp(t) => *self = Self::new(*t),
            HostValue::String(s) => {
                *self = Self::parse_text(s).map_err(|_| cannot_convert(&src, "timestamptz"))?
            }
            HostValue::Derived(_) => return self.set(unwrap_for_retry(&src, "timestamptz")?),
            other => return Err(cannot_convert(other, "timestamptz")),
        }
        Ok(())
    }

    fn get(&self) -> HostValue {
        match (self.status, self.infinity) {
            (Status::Present, InfinityModifier::Finite) => HostValue::Timestamp(self.value),
            (Status::Present, InfinityModifier::Infinity) => HostValue::from("infinity"),
            (Status::Present, InfinityModifier::NegativeInfinity) => HostValue::from("-infinity"),
            (Status::Null, _) => HostValue::Null,
            (Status::Undefined, _) => HostValue::Status(Status::Undefined),
        }
    }

    fn assign_to(&self, dst: &mut dyn Any) -> Result<()> {
        let rules = AssignRules::new(dst, "timestamptz");
        let finite = || {
            self.value().ok_or_else(|| {
                CodecError::AssignmentError("infinite timestamptz to DateTime<Utc>".to_string())
            })
        };
        match self.status {
            Status::Present => rules
                .rule::<DateTime<Utc>>(finite)
                .rule::<Option<DateTime<Utc>>>(|| finite().map(Some))
                .host(|| self.get())
                .finish(),
            Status::Null => rules
                .null::<DateTime<Utc>>()
                .reject_null::<DateTime<Utc>>()
                .host(|| HostValue::Null)
                .finish(),
            Status::Undefined => Err(assign_undefined("timestamptz")),
        }
    }

    fn decode_text(&mut self, _ci: &TypeRegistry, src: Option<&[u8]>) -> Result<()> {
        *self = match src {
            None => Self::null(),
            Some(src) => Self::parse_text(utf8(src, "timestamptz")?)?,
        };
        Ok(())
    }

    fn decode_binary(&mut self, _ci: &TypeRegistry, src: Option<&[u8]>) -> Result<()> {
        let Some(src) = src else {
            *self = Self::null();
            return Ok(());
        };

        *self = match i64::from_be_bytes(fixed(src, "timestamptz")?) {
            INFINITY_MICROS => Self::infinity(),
            NEG_INFINITY_MICROS => Self::negative_infinity(),
            micros => micros
                .checked_add(PG_EPOCH_OFFSET_MICROS)
                .and_then(DateTime::<Utc>::from_timestamp_micros)
                .map(Self::new)
                .ok_or_else(|| {
                    CodecError::DecodeError(format!("timestamptz {} out of range", micros))
                })?,
        };
        Ok(())
    }

    fn encode_text(&self, _ci: &TypeRegistry, buf: &mut BytesMut) -> Result<IsNull> {
        if !should_encode(self.status)? {
            return Ok(IsNull::Yes);
        }

        match self.infinity {
            InfinityModifier::Finite => buf.put_slice(
                self.value
                    .format("%Y-%m-%d %H:%M:%S%.f+00")
                    .to_string()
                    .as_bytes(),
            ),
            InfinityModifier::Infinity => buf.put_slice(b"infinity"),
            InfinityModifier::NegativeInfinity => buf.put_slice(b"-infinity"),
        }
        Ok(IsNull::No)
    }

    fn encode_binary(&self, _ci: &TypeRegistry, buf: &mut BytesMut) -> Result<IsNull> {
        if !should_encode(self.status)? {
            return Ok(IsNull::Yes);
        }

        let micros = match self.infinity {
            InfinityModifier::Finite => self
                .value
                .timestamp_micros()
                .checked_sub(PG_EPOCH_OFFSET_MICROS)
                .ok_or_else(|| {
                    CodecError::ConversionError(format!("timestamptz {} out of range", self.value))
                })?,
            InfinityModifier::Infinity => INFINITY_MICROS,
            InfinityModifier::NegativeInfinity => NEG_INFINITY_MICROS,
        };
        buf.put_i64(micros);
        Ok(IsNull::No)
    }
}
