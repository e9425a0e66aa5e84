//! PostgreSQL type identifiers and the host-side value model.
//!
//! Reference: https://www.postgresql.org/docs/current/datatype.html

use std::fmt;
use std::sync::Arc;

use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Type OIDs
// ============================================================================

/// PostgreSQL type object identifiers (OIDs).
///
/// These are the built-in type OIDs from PostgreSQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Oid(pub i32);

impl Oid {
    // Boolean types
    pub const BOOL: Oid = Oid(16);

    // Binary data
    pub const BYTEA: Oid = Oid(17);

    // Character types
    pub const CHAR: Oid = Oid(18);
    pub const NAME: Oid = Oid(19);

    // Integer types
    pub const INT8: Oid = Oid(20);
    pub const INT2: Oid = Oid(21);
    pub const INT4: Oid = Oid(23);

    // Text types
    pub const TEXT: Oid = Oid(25);

    // JSON
    pub const JSON: Oid = Oid(114);

    // Floating point types
    pub const FLOAT4: Oid = Oid(700);
    pub const FLOAT8: Oid = Oid(701);

    // String types
    pub const BPCHAR: Oid = Oid(1042);
    pub const VARCHAR: Oid = Oid(1043);

    // Date/time types
    pub const TIMESTAMPTZ: Oid = Oid(1184);

    // UUID
    pub const UUID: Oid = Oid(2950);

    // 64-bit transaction id
    pub const XID8: Oid = Oid(5069);

    // Array types
    pub const JSON_ARRAY: Oid = Oid(199);
    pub const XID8_ARRAY: Oid = Oid(271);
    pub const BOOL_ARRAY: Oid = Oid(1000);
    pub const BYTEA_ARRAY: Oid = Oid(1001);
    pub const INT2_ARRAY: Oid = Oid(1005);
    pub const INT4_ARRAY: Oid = Oid(1007);
    pub const TEXT_ARRAY: Oid = Oid(1009);
    pub const BPCHAR_ARRAY: Oid = Oid(1014);
    pub const VARCHAR_ARRAY: Oid = Oid(1015);
    pub const INT8_ARRAY: Oid = Oid(1016);
    pub const FLOAT4_ARRAY: Oid = Oid(1021);
    pub const FLOAT8_ARRAY: Oid = Oid(1022);
    pub const TIMESTAMPTZ_ARRAY: Oid = Oid(1185);
    pub const UUID_ARRAY: Oid = Oid(2951);

    /// Create from raw i32 value
    #[inline]
    pub fn from_i32(oid: i32) -> Self {
        Oid(oid)
    }

    /// Get the raw i32 value
    #[inline]
    pub fn as_i32(self) -> i32 {
        self.0
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Status
// ============================================================================

/// Validity tag carried by every value.
///
/// No `Default` impl; each value type picks its own initial status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    /// Never set. Encoding a value in this state is an error.
    Undefined,
    /// SQL NULL.
    Null,
    /// The payload is meaningful.
    Present,
}

// ============================================================================
// Host values
// ============================================================================

/// The "get underlying value" capability.
///
/// Layered types expose the value they wrap so `set` can unwrap them one level
/// at a time.
pub trait Underlying: fmt::Debug + Send + Sync {
    fn underlying(&self) -> HostValue;
}

/// Limit on nested derived layers unwrapped by `set`.
pub const MAX_DERIVED_DEPTH: usize = 32;

/// A dynamically typed host value.
///
/// `set` accepts one of these and `get` produces one. `Null` is the absent
/// sentinel.
#[derive(Debug, Clone)]
pub enum HostValue {
    Null,
    /// Returned by `get` on an undefined value.
    Status(Status),
    Bool(bool),
    I16(i16),
    I32(i32),
    I64(i64),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    String(String),
    Bytes(Vec<u8>),
    Timestamp(DateTime<Utc>),
    Uuid(uuid::Uuid),
    Json(serde_json::Value),
    List(Vec<HostValue>),
    Derived(Arc<dyn Underlying>),
}

impl HostValue {
    /// Wrap a layered value.
    pub fn derived<T: Underlying + 'static>(value: T) -> Self {
        HostValue::Derived(Arc::new(value))
    }

    /// Build a list from anything convertible into host values.
    pub fn list<T: Into<HostValue>>(items: impl IntoIterator<Item = T>) -> Self {
        HostValue::List(items.into_iter().map(Into::into).collect())
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, HostValue::Null)
    }

    /// Short name of the variant, used in conversion errors.
    pub fn type_name(&self) -> &'static str {
        match self {
            HostValue::Null => "null",
            HostValue::Status(_) => "status",
            HostValue::Bool(_) => "bool",
            HostValue::I16(_) => "i16",
            HostValue::I32(_) => "i32",
            HostValue::I64(_) => "i64",
            HostValue::U16(_) => "u16",
            HostValue::U32(_) => "u32",
            HostValue::U64(_) => "u64",
            HostValue::F32(_) => "f32",
            HostValue::F64(_) => "f64",
            HostValue::String(_) => "string",
            HostValue::Bytes(_) => "bytes",
            HostValue::Timestamp(_) => "timestamp",
            HostValue::Uuid(_) => "uuid",
            HostValue::Json(_) => "json",
            HostValue::List(_) => "list",
            HostValue::Derived(_) => "derived",
        }
    }

    /// Unwrap derived layers down to a plain value.
    ///
    /// Each layer is unwrapped one level at a time. Returns `None` for plain
    /// values and for chains deeper than [`MAX_DERIVED_DEPTH`].
    pub fn unwrap_derived(&self) -> Option<HostValue> {
        let HostValue::Derived(inner) = self else {
            return None;
        };
        let mut value = inner.underlying();
        for _ in 1..MAX_DERIVED_DEPTH {
            match value {
                HostValue::Derived(next) => value = next.underlying(),
                plain => return Some(plain),
            }
        }
        None
    }

    /// Render as JSON. Non-finite floats become `null`.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value;

        match self {
            HostValue::Null | HostValue::Status(_) => Value::Null,
            HostValue::Bool(v) => Value::Bool(*v),
            HostValue::I16(v) => Value::from(*v),
            HostValue::I32(v) => Value::from(*v),
            HostValue::I64(v) => Value::from(*v),
            HostValue::U16(v) => Value::from(*v),
            HostValue::U32(v) => Value::from(*v),
            HostValue::U64(v) => Value::from(*v),
            HostValue::F32(v) => serde_json::Number::from_f64(f64::from(*v))
                .map(Value::Number)
                .unwrap_or(Value::Null),
            HostValue::F64(v) => serde_json::Number::from_f64(*v)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            HostValue::String(s) => Value::String(s.clone()),
            HostValue::Bytes(b) => {
                Value::String(base64::engine::general_purpose::STANDARD.encode(b))
            }
            HostValue::Timestamp(t) => Value::String(t.to_rfc3339()),
            HostValue::Uuid(u) => Value::String(u.hyphenated().to_string()),
            HostValue::Json(v) => v.clone(),
            HostValue::List(items) => Value::Array(items.iter().map(HostValue::to_json).collect()),
            HostValue::Derived(_) => self
                .unwrap_derived()
                .map(|plain| plain.to_json())
                .unwrap_or(Value::Null),
        }
    }
}

impl PartialEq for HostValue {
    fn eq(&self, other: &Self) -> bool {
        use HostValue::*;

        match (self, other) {
            (Null, Null) => true,
            (Status(a), Status(b)) => a == b,
            (Bool(a), Bool(b)) => a == b,
            (I16(a), I16(b)) => a == b,
            (I32(a), I32(b)) => a == b,
            (I64(a), I64(b)) => a == b,
            (U16(a), U16(b)) => a == b,
            (U32(a), U32(b)) => a == b,
            (U64(a), U64(b)) => a == b,
            (F32(a), F32(b)) => a == b,
            (F64(a), F64(b)) => a == b,
            (String(a), String(b)) => a == b,
            (Bytes(a), Bytes(b)) => a == b,
            (Timestamp(a), Timestamp(b)) => a == b,
            (Uuid(a), Uuid(b)) => a == b,
            (Json(a), Json(b)) => a == b,
            (List(a), List(b)) => a == b,
            (Derived(a), Derived(b)) => {
                Arc::ptr_eq(a, b)
                    || matches!(
                        (self.unwrap_derived(), other.unwrap_derived()),
                        (Some(x), Some(y)) if x == y
                    )
            }
            _ => false,
        }
    }
}

macro_rules! host_value_from {
    ($($ty:ty => $variant:ident),+ $(,)?) => {
        $(
            impl From<$ty> for HostValue {
                fn from(v: $ty) -> Self {
                    HostValue::$variant(v)
                }
            }
        )+
    };
}

host_value_from! {
    bool => Bool,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    f32 => F32,
    f64 => F64,
    String => String,
    Vec<u8> => Bytes,
    DateTime<Utc> => Timestamp,
    uuid::Uuid => Uuid,
    serde_json::Value => Json,
}

impl From<&str> for HostValue {
    fn from(v: &str) -> Self {
        HostValue::String(v.to_string())
    }
}

impl<T: Into<HostValue>> From<Option<T>> for HostValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(HostValue::Null)
    }
}
