//! The array container shared by every element type.

use std::any::Any;
use std::borrow::Cow;

use bytes::BytesMut;
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use serde_json::Value;
use tracing::trace;

use super::binary::{decode_binary_elements, encode_binary_elements};
use super::text::{encode_text_elements, parse_text_array};
use super::{check_shape, dim_elem_counts, ArrayDimension};
use crate::error::{CodecError, Result};
use crate::pg::registry::TypeRegistry;
use crate::pg::transcoder::{should_encode, utf8, ArrayElement, IsNull, Transcoder};
use crate::pg::types::{HostValue, Oid, Status};

/// A PostgreSQL array of `E`.
///
/// Elements are stored flattened in row-major order. The container is either
/// `Null` or `Present`; it never reports `Undefined`.
#[derive(Debug, Clone)]
pub struct GenericArray<E> {
    elements: Vec<E>,
    dimensions: Vec<ArrayDimension>,
    type_name: Cow<'static, str>,
    element_oid: Option<Oid>,
    new_element: fn() -> E,
    status: Status,
}

impl<E: Transcoder> GenericArray<E> {
    /// Create a NULL array.
    ///
    /// `type_name` is the element type's registry name. `element_oid`, when
    /// given, is used for binary encoding instead of a registry lookup.
    /// `new_element` manufactures a fresh element for each decoded item.
    pub fn new(
        type_name: impl Into<Cow<'static, str>>,
        element_oid: Option<Oid>,
        new_element: fn() -> E,
    ) -> Self {
        Self {
            elements: Vec::new(),
            dimensions: Vec::new(),
            type_name: type_name.into(),
            element_oid,
            new_element,
            status: Status::Null,
        }
    }

    /// A fresh NULL array bound to the same element type.
    pub fn new_value(&self) -> Self {
        Self::new(self.type_name.clone(), self.element_oid, self.new_element)
    }

    #[inline]
    pub fn elements(&self) -> &[E] {
        &self.elements
    }

    #[inline]
    pub fn dimensions(&self) -> &[ArrayDimension] {
        &self.dimensions
    }

    #[inline]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    #[inline]
    pub fn element_oid(&self) -> Option<Oid> {
        self.element_oid
    }

    /// True for a present array without elements.
    pub fn is_empty(&self) -> bool {
        self.status == Status::Present && self.elements.is_empty()
    }

    pub fn set_null(&mut self) {
        self.elements.clear();
        self.dimensions.clear();
        self.status = Status::Null;
    }

    /// Replace the contents with already-typed elements.
    ///
    /// The element count must match the product of the dimension lengths.
    pub fn set_elements(
        &mut self,
        dimensions: Vec<ArrayDimension>,
        elements: Vec<E>,
    ) -> Result<()> {
        check_shape(&dimensions, elements.len())?;
        self.dimensions = if elements.is_empty() {
            Vec::new()
        } else {
            dimensions
        };
        self.elements = elements;
        self.status = Status::Present;
        Ok(())
    }

    /// Builder form of [`set_elements`](Self::set_elements).
    pub fn with_elements(
        mut self,
        dimensions: Vec<ArrayDimension>,
        elements: Vec<E>,
    ) -> Result<Self> {
        self.set_elements(dimensions, elements)?;
        Ok(self)
    }

    /// Resolve the element type OID for binary encoding.
    pub fn resolve_element_oid(&self, ci: &TypeRegistry) -> Result<Oid> {
        self.element_oid
            .or_else(|| ci.oid_for_name(&self.type_name))
            .ok_or_else(|| CodecError::UnknownTypeError(self.type_name.to_string()))
    }

    /// Assign every element into a flat vector.
    ///
    /// A NULL array leaves `dst` empty. Multi-dimensional arrays are flattened.
    /// The first element that cannot be assigned aborts the whole call.
    pub fn assign_to_vec<T: Default + 'static>(&self, dst: &mut Vec<T>) -> Result<()> {
        if self.status == Status::Null {
            dst.clear();
            return Ok(());
        }

        let mut out = Vec::with_capacity(self.elements.len());
        for elem in &self.elements {
            let mut slot = T::default();
            elem.assign_to(&mut slot)?;
            out.push(slot);
        }
        *dst = out;
        Ok(())
    }

    fn assign_to_option_vec<T: Default + 'static>(&self, dst: &mut Option<Vec<T>>) -> Result<()> {
        if self.status == Status::Null {
            *dst = None;
            return Ok(());
        }
        let mut out = Vec::new();
        self.assign_to_vec(&mut out)?;
        *dst = Some(out);
        Ok(())
    }

    /// JSON form: `null`, `[]` for an empty array, otherwise nested arrays
    /// following the dimensions.
    pub fn marshal_json(&self) -> Result<Value> {
        if self.status == Status::Null {
            return Ok(Value::Null);
        }
        if self.elements.is_empty() {
            return Ok(Value::Array(Vec::new()));
        }

        let counts = dim_elem_counts(&self.dimensions);
        let mut stack: Vec<Vec<Value>> = vec![Vec::new()];
        for (i, elem) in self.elements.iter().enumerate() {
            for &m in &counts {
                if i % m == 0 {
                    stack.push(Vec::with_capacity(m.min(64)));
                }
            }

            let value = elem.to_json()?;
            if let Some(level) = stack.last_mut() {
                level.push(value);
            }

            for &m in &counts {
                if (i + 1) % m == 0 {
                    if let Some(done) = stack.pop() {
                        if let Some(parent) = stack.last_mut() {
                            parent.push(Value::Array(done));
                        }
                    }
                }
            }
        }

        Ok(stack
            .pop()
            .and_then(|mut root| root.pop())
            .unwrap_or(Value::Array(Vec::new())))
    }

    fn trace_call(&self, op: &'static str) {
        trace!(
            type_name = %self.type_name,
            count = self.elements.len(),
            dims = ?self.dimensions,
            op,
            "array codec"
        );
    }
}

impl<E: ArrayElement> Default for GenericArray<E> {
    fn default() -> Self {
        Self::new(E::TYPE_NAME, None, E::default)
    }
}

impl<E: PartialEq> PartialEq for GenericArray<E> {
    fn eq(&self, other: &Self) -> bool {
        self.status == other.status
            && self.type_name == other.type_name
            && self.dimensions == other.dimensions
            && self.elements == other.elements
    }
}

impl<E: Transcoder> Serialize for GenericArray<E> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.marshal_json()
            .map_err(serde::ser::Error::custom)?
            .serialize(serializer)
    }
}

/// Try each flat-vector destination shape for the listed element types.
macro_rules! assign_vec_destinations {
    ($array:ident, $dst:ident; $($ty:ty),+ $(,)?) => {
        $(
            if let Some(slot) = $dst.downcast_mut::<Vec<$ty>>() {
                return $array.assign_to_vec(slot);
            }
            if let Some(slot) = $dst.downcast_mut::<Vec<Option<$ty>>>() {
                return $array.assign_to_vec(slot);
            }
            if let Some(slot) = $dst.downcast_mut::<Option<Vec<$ty>>>() {
                return $array.assign_to_option_vec(slot);
            }
            if let Some(slot) = $dst.downcast_mut::<Option<Vec<Option<$ty>>>>() {
                return $array.assign_to_option_vec(slot);
            }
        )+
    };
}

impl<E: Transcoder> Transcoder for GenericArray<E> {
    fn status(&self) -> Status {
        self.status
    }

    fn set(&mut self, src: HostValue) -> Result<()> {
        match src {
            HostValue::Null => {
                self.set_null();
                Ok(())
            }
            HostValue::List(items) => {
                let length = i32::try_from(items.len()).map_err(|_| {
                    CodecError::ConversionError(format!(
                        "list of {} items exceeds the array length limit",
                        items.len()
                    ))
                })?;

                let mut elements = Vec::with_capacity(items.len());
                for item in items {
                    let mut elem = (self.new_element)();
                    elem.set(item)?;
                    elements.push(elem);
                }

                self.dimensions = if length == 0 {
                    Vec::new()
                } else {
                    vec![ArrayDimension::new(length, 1)]
                };
                self.elements = elements;
                self.status = Status::Present;
                Ok(())
            }
            src @ HostValue::Derived(_) => match src.unwrap_derived() {
                Some(inner) => self.set(inner),
                None => Err(CodecError::ConversionError(format!(
                    "derived value to {} array",
                    self.type_name
                ))),
            },
            other => Err(CodecError::TypeError(format!(
                "cannot set non-list {} into {} array",
                other.type_name(),
                self.type_name
            ))),
        }
    }

    fn get(&self) -> HostValue {
        match self.status {
            Status::Present => HostValue::List(self.elements.iter().map(Transcoder::get).collect()),
            Status::Null => HostValue::Null,
            Status::Undefined => HostValue::Status(Status::Undefined),
        }
    }

    fn assign_to(&self, dst: &mut dyn Any) -> Result<()> {
        if let Some(slot) = dst.downcast_mut::<HostValue>() {
            *slot = self.get();
            return Ok(());
        }
        if let Some(slot) = dst.downcast_mut::<Vec<HostValue>>() {
            *slot = match self.status {
                Status::Present => self.elements.iter().map(Transcoder::get).collect(),
                _ => Vec::new(),
            };
            return Ok(());
        }

        assign_vec_destinations!(
            self, dst;
            bool, i16, i32, i64, u16, u32, u64, f32, f64,
            String, Vec<u8>, DateTime<Utc>, uuid::Uuid, Value,
        );

        Err(CodecError::AssignmentError(format!(
            "{} array to unsupported destination",
            self.type_name
        )))
    }

    fn decode_text(&mut self, ci: &TypeRegistry, src: Option<&[u8]>) -> Result<()> {
        let Some(src) = src else {
            self.set_null();
            return Ok(());
        };

        let text = utf8(src, &self.type_name)?;
        let parsed = parse_text_array(text)?;

        let mut elements = Vec::with_capacity(parsed.elements.len());
        for item in &parsed.elements {
            let mut elem = (self.new_element)();
            elem.decode_text(ci, item.as_deref().map(str::as_bytes))?;
            elements.push(elem);
        }

        self.elements = elements;
        self.dimensions = parsed.dimensions;
        self.status = Status::Present;
        self.trace_call("decode_text");
        Ok(())
    }

    fn decode_binary(&mut self, ci: &TypeRegistry, src: Option<&[u8]>) -> Result<()> {
        let Some(src) = src else {
            self.set_null();
            return Ok(());
        };

        let (elements, dimensions) = decode_binary_elements(ci, src, self.new_element)?;
        self.elements = elements;
        self.dimensions = dimensions;
        self.status = Status::Present;
        self.trace_call("decode_binary");
        Ok(())
    }

    fn encode_text(&self, ci: &TypeRegistry, buf: &mut BytesMut) -> Result<IsNull> {
        if !should_encode(self.status)? {
            return Ok(IsNull::Yes);
        }

        encode_text_elements(ci, buf, &self.dimensions, &self.elements)?;
        self.trace_call("encode_text");
        Ok(IsNull::No)
    }

    fn encode_binary(&self, ci: &TypeRegistry, buf: &mut BytesMut) -> Result<IsNull> {
        if !should_encode(self.status)? {
            return Ok(IsNull::Yes);
        }

        let oid = self.resolve_element_oid(ci)?;
        encode_binary_elements(ci, buf, &self.dimensions, oid, &self.elements)?;
        self.trace_call("encode_binary");
        Ok(IsNull::No)
    }

    fn to_json(&self) -> Result<Value> {
        self.marshal_json()
    }
}
