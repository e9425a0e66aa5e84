//! Tests for the array codecs, exercised through concrete element types.

use super::array::*;
use super::registry::TypeRegistry;
use super::scalar::*;
use super::transcoder::{BoxedTranscoder, IsNull, Transcoder};
use super::types::{HostValue, Oid, Status};
use crate::error::CodecError;
use bytes::{BufMut, BytesMut};

fn int4_array(dims: &[(i32, i32)], items: &[Option<i32>]) -> Int4Array {
    let dims = dims
        .iter()
        .map(|&(length, lower_bound)| ArrayDimension::new(length, lower_bound))
        .collect();
    let elems = items
        .iter()
        .map(|v| v.map(Int4::new).unwrap_or_else(Int4::null))
        .collect();
    Int4Array::default().with_elements(dims, elems).unwrap()
}

fn text_of<T: Transcoder>(value: &T) -> String {
    let ci = TypeRegistry::new();
    let buf = value.text_bytes(&ci).unwrap().expect("value is not NULL");
    String::from_utf8(buf.to_vec()).unwrap()
}

// ============================================================================
// Text Format Tests
// ============================================================================

mod text_format {
    use super::*;

    #[test]
    fn test_bare_null_versus_quoted_null() {
        let ci = TypeRegistry::new();
        let mut arr = TextArray::default();
        arr.decode_text(&ci, Some(br#"{NULL,"NULL"}"#)).unwrap();

        assert_eq!(arr.elements().len(), 2);
        assert_eq!(arr.elements()[0].status(), Status::Null);
        assert_eq!(arr.elements()[1].value(), Some("NULL"));

        assert_eq!(text_of(&arr), r#"{NULL,"NULL"}"#);
    }

    #[test]
    fn test_two_dimensional_round_trip() {
        let ci = TypeRegistry::new();
        let mut arr = Int4Array::default();
        arr.decode_text(&ci, Some(b"{{1,2},{3,4}}")).unwrap();

        assert_eq!(
            arr.dimensions(),
            &[ArrayDimension::new(2, 1), ArrayDimension::new(2, 1)]
        );
        assert_eq!(text_of(&arr), "{{1,2},{3,4}}");
    }

    #[test]
    fn test_explicit_bounds_round_trip() {
        let ci = TypeRegistry::new();
        let mut arr = Int4Array::default();
        arr.decode_text(&ci, Some(b"[4:5][2:3]={{1,2},{3,4}}")).unwrap();

        assert_eq!(
            arr.dimensions(),
            &[ArrayDimension::new(2, 4), ArrayDimension::new(2, 2)]
        );
        assert_eq!(text_of(&arr), "[4:5][2:3]={{1,2},{3,4}}");
    }

    #[test]
    fn test_empty_array() {
        let ci = TypeRegistry::new();
        let mut arr = Int4Array::default();
        arr.decode_text(&ci, Some(b"{}")).unwrap();

        assert_eq!(arr.status(), Status::Present);
        assert!(arr.dimensions().is_empty());
        assert!(arr.elements().is_empty());
        assert_eq!(text_of(&arr), "{}");
    }

    #[test]
    fn test_zero_length_dimension_matches_empty_literal() {
        let ci = TypeRegistry::new();
        let arr = int4_array(&[(0, 1)], &[]);
        assert_eq!(text_of(&arr), "{}");

        let mut decoded = Int4Array::default();
        decoded.decode_text(&ci, Some(b"{}")).unwrap();
        assert_eq!(decoded, arr);
    }

    #[test]
    fn test_three_dimensional_encoding() {
        let items: Vec<Option<i32>> = (1..=12).map(Some).collect();
        let arr = int4_array(&[(2, 1), (3, 1), (2, 1)], &items);
        assert_eq!(
            text_of(&arr),
            "{{{1,2},{3,4},{5,6}},{{7,8},{9,10},{11,12}}}"
        );
    }

    #[test]
    fn test_strings_needing_quotes() {
        let mut arr = TextArray::default();
        arr.set(HostValue::list([
            Some("plain"),
            Some(""),
            Some("with space"),
            Some("a,b"),
            Some(r#"q"uote"#),
            Some(r"back\slash"),
            Some("null"),
            None,
        ]))
        .unwrap();

        let text = text_of(&arr);
        assert_eq!(
            text,
            r#"{plain,"","with space","a,b","q\"uote","back\\slash","null",NULL}"#
        );

        let ci = TypeRegistry::new();
        let mut back = TextArray::default();
        back.decode_text(&ci, Some(text.as_bytes())).unwrap();
        assert_eq!(back, arr);
    }

    #[test]
    fn test_element_decode_failure_propagates() {
        let ci = TypeRegistry::new();
        let mut arr = Int4Array::default();
        assert!(matches!(
            arr.decode_text(&ci, Some(b"{1,two}")),
            Err(CodecError::DecodeError(_))
        ));
        assert!(matches!(
            arr.decode_text(&ci, Some(b"{{1,2},{3}}")),
            Err(CodecError::MalformedArrayError(_))
        ));
    }

    #[test]
    fn test_timestamps_are_quoted() {
        let ci = TypeRegistry::new();
        let mut arr = TimestamptzArray::default();
        arr.decode_text(
            &ci,
            Some(br#"{"2024-01-02 03:04:05+00",infinity,NULL}"#),
        )
        .unwrap();

        assert_eq!(
            text_of(&arr),
            r#"{"2024-01-02 03:04:05+00",infinity,NULL}"#
        );
    }

    #[test]
    fn test_bytea_elements() {
        let mut arr = ByteaArray::default();
        arr.set(HostValue::list([vec![0xde_u8, 0xad], vec![]])).unwrap();
        assert_eq!(text_of(&arr), r#"{"\\xdead","\\x"}"#);
    }
}

// ============================================================================
// Binary Format Tests
// ============================================================================

mod binary_format {
    use super::*;

    #[test]
    fn test_null_elements_round_trip() {
        let ci = TypeRegistry::new();
        let arr = int4_array(&[(3, 1)], &[Some(1), None, Some(3)]);

        let buf = arr.binary_bytes(&ci).unwrap().unwrap();
        // flags word says the array contains NULLs
        assert_eq!(&buf[4..8], &1i32.to_be_bytes());
        assert_eq!(&buf[8..12], &Oid::INT4.as_i32().to_be_bytes());

        let mut back = Int4Array::default();
        back.decode_binary(&ci, Some(&buf)).unwrap();
        assert_eq!(back, arr);
    }

    #[test]
    fn test_every_truncation_is_an_error() {
        let ci = TypeRegistry::new();
        let arr = int4_array(&[(2, 0), (2, 1)], &[Some(1), None, Some(3), Some(4)]);
        let buf = arr.binary_bytes(&ci).unwrap().unwrap();

        for cut in 0..buf.len() {
            let mut back = Int4Array::default();
            assert!(
                back.decode_binary(&ci, Some(&buf[..cut])).is_err(),
                "prefix of {} bytes should not decode",
                cut
            );
        }
    }

    #[test]
    fn test_short_header_reports_truncation() {
        let ci = TypeRegistry::new();
        let mut arr = Int4Array::default();
        assert_eq!(
            arr.decode_binary(&ci, Some(&[0, 0, 0, 1])).unwrap_err(),
            CodecError::TruncatedInputError {
                needed: 12,
                remaining: 4
            }
        );
    }

    #[test]
    fn test_empty_array_binary() {
        let ci = TypeRegistry::new();
        let mut arr = TextArray::default();
        arr.set(HostValue::List(vec![])).unwrap();

        let buf = arr.binary_bytes(&ci).unwrap().unwrap();
        assert_eq!(&buf[..], &[0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 25]);

        let mut back = TextArray::default();
        back.decode_binary(&ci, Some(&buf)).unwrap();
        assert!(back.is_empty());
    }

    #[test]
    fn test_wrong_element_width() {
        let ci = TypeRegistry::new();
        let mut buf = BytesMut::new();
        ArrayHeader {
            contains_null: false,
            element_oid: Oid::INT4,
            dimensions: vec![ArrayDimension::new(1, 1)],
        }
        .encode_binary(&mut buf);
        buf.put_i32(2);
        buf.put_i16(7);

        let mut arr = Int4Array::default();
        assert!(matches!(
            arr.decode_binary(&ci, Some(&buf)),
            Err(CodecError::DecodeError(_))
        ));
    }

    #[test]
    fn test_null_array_is_wire_null() {
        let ci = TypeRegistry::new();
        let arr = Int8Array::default();
        assert_eq!(arr.binary_bytes(&ci).unwrap(), None);

        let mut buf = BytesMut::new();
        assert_eq!(arr.encode_binary(&ci, &mut buf).unwrap(), IsNull::Yes);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_bounds_past_int4_are_rejected() {
        let ci = TypeRegistry::new();
        let mut buf = BytesMut::new();
        ArrayHeader {
            contains_null: false,
            element_oid: Oid::INT4,
            dimensions: vec![ArrayDimension::new(2, i32::MAX)],
        }
        .encode_binary(&mut buf);
        for v in [1, 2] {
            buf.put_i32(4);
            buf.put_i32(v);
        }

        let mut arr = Int4Array::default();
        assert!(matches!(
            arr.decode_binary(&ci, Some(&buf)),
            Err(CodecError::DecodeError(_))
        ));
    }
}

// ============================================================================
// Container Tests
// ============================================================================

mod container {
    use super::*;

    #[test]
    fn test_shape_must_fit_the_wire() {
        let seven = vec![ArrayDimension::new(1, 1); MAX_DIMENSIONS + 1];
        assert!(matches!(
            Int4Array::default().with_elements(seven, vec![Int4::new(1)]),
            Err(CodecError::MalformedArrayError(_))
        ));

        let six = vec![ArrayDimension::new(1, 1); MAX_DIMENSIONS];
        let arr = Int4Array::default()
            .with_elements(six, vec![Int4::new(1)])
            .unwrap();
        assert_eq!(text_of(&arr), "{{{{{{1}}}}}}");

        assert!(matches!(
            Int4Array::default().with_elements(
                vec![ArrayDimension::new(2, i32::MAX)],
                vec![Int4::new(1), Int4::new(2)],
            ),
            Err(CodecError::MalformedArrayError(_))
        ));
    }

    #[test]
    fn test_assignment_fails_on_null_element() {
        let arr = {
            let mut arr = Int2Array::default();
            arr.set(HostValue::list([Some(1i16), None, Some(3)])).unwrap();
            arr
        };

        let mut dst: Vec<i16> = Vec::new();
        assert!(matches!(
            arr.assign_to(&mut dst),
            Err(CodecError::NullAssignmentError(_))
        ));
    }

    #[test]
    fn test_set_get_round_trip() {
        let mut arr = Float8Array::default();
        arr.set(HostValue::list([Some(1.5f64), None])).unwrap();
        assert_eq!(arr.get(), HostValue::list([Some(1.5f64), None]));
    }

    #[test]
    fn test_host_value_destination() {
        let arr = int4_array(&[(2, 1)], &[Some(1), None]);
        let mut dst = HostValue::Null;
        arr.assign_to(&mut dst).unwrap();
        assert_eq!(dst, HostValue::list([Some(1i32), None]));
    }

    #[test]
    fn test_nested_list_is_rejected_by_scalar_elements() {
        let mut arr = Int4Array::default();
        let nested = HostValue::List(vec![HostValue::list([1i32, 2])]);
        assert!(matches!(
            arr.set(nested),
            Err(CodecError::ConversionError(_))
        ));
    }

    #[test]
    fn test_string_and_uuid_assignment() {
        let mut arr = UuidArray::default();
        let id = uuid::Uuid::from_u128(0x1234);
        arr.set(HostValue::list([id])).unwrap();

        let mut ids: Vec<uuid::Uuid> = Vec::new();
        arr.assign_to(&mut ids).unwrap();
        assert_eq!(ids, vec![id]);

        let mut texts: Vec<String> = Vec::new();
        arr.assign_to(&mut texts).unwrap();
        assert_eq!(texts, vec![id.hyphenated().to_string()]);
    }
}

// ============================================================================
// Runtime Element Types
// ============================================================================

mod dyn_array {
    use super::*;

    fn new_ltree() -> BoxedTranscoder {
        Box::new(Ltree::default())
    }

    #[test]
    fn test_extension_type_needs_registration() {
        let mut arr = DynArray::new("ltree", None, new_ltree);
        arr.set(HostValue::list(["Top.Science", "Top.Art"])).unwrap();

        let builtin = TypeRegistry::new();
        assert_eq!(
            arr.binary_bytes(&builtin).unwrap_err(),
            CodecError::UnknownTypeError("ltree".to_string())
        );

        let mut ci = TypeRegistry::new();
        ci.register("ltree", Oid(16_385));
        let buf = arr.binary_bytes(&ci).unwrap().unwrap();
        assert_eq!(&buf[8..12], &16_385i32.to_be_bytes());

        let mut back = DynArray::new("ltree", None, new_ltree);
        back.decode_binary(&ci, Some(&buf)).unwrap();
        assert_eq!(back.get(), arr.get());
    }

    #[test]
    fn test_text_through_trait_objects() {
        let ci = TypeRegistry::new();
        let mut arr = DynArray::new("ltree", None, new_ltree);
        arr.decode_text(&ci, Some(b"{a.b,NULL}")).unwrap();
        assert_eq!(arr.elements()[1].status(), Status::Null);
        assert_eq!(text_of(&arr), "{a.b,NULL}");
    }
}

// ============================================================================
// JSON Tests
// ============================================================================

mod json_marshal {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_null_and_empty() {
        assert_eq!(Int4Array::default().to_json().unwrap(), json!(null));

        let empty = int4_array(&[(2, 1), (0, 1)], &[]);
        assert_eq!(empty.to_json().unwrap(), json!([]));
    }

    #[test]
    fn test_nested_dimensions() {
        let items: Vec<Option<i32>> = vec![Some(1), None, Some(3), Some(4), Some(5), Some(6)];
        let arr = int4_array(&[(3, 1), (2, 1)], &items);
        assert_eq!(arr.to_json().unwrap(), json!([[1, null], [3, 4], [5, 6]]));
    }

    #[test]
    fn test_element_renderings() {
        let mut bytes = ByteaArray::default();
        bytes.set(HostValue::list([vec![0xde_u8, 0xad, 0xbe, 0xef]])).unwrap();
        assert_eq!(bytes.to_json().unwrap(), json!(["3q2+7w=="]));

        let ci = TypeRegistry::new();
        let mut docs = JsonArray::default();
        docs.decode_text(&ci, Some(br#"{"{\"a\":1}",NULL}"#)).unwrap();
        assert_eq!(docs.to_json().unwrap(), json!([{"a": 1}, null]));
    }

    #[test]
    fn test_serialize_impl() {
        let arr = int4_array(&[(2, 1)], &[Some(7), Some(8)]);
        assert_eq!(serde_json::to_string(&arr).unwrap(), "[7,8]");
    }
}

// ============================================================================
// Driver Adapter Tests
// ============================================================================

mod adapters {
    use super::*;

    #[test]
    fn test_to_text_and_scan_text() {
        let mut arr = BoolArray::default();
        arr.scan_text(Some(b"{t,f,NULL}")).unwrap();
        assert_eq!(arr.to_text().unwrap().as_deref(), Some("{t,f,NULL}"));

        arr.scan_text(None).unwrap();
        assert_eq!(arr.status(), Status::Null);
        assert_eq!(arr.to_text().unwrap(), None);
    }

    #[test]
    fn test_xid8_array() {
        let mut arr = Xid8Array::default();
        arr.scan_text(Some(b"{1,18446744073709551615}")).unwrap();
        assert_eq!(
            arr.get(),
            HostValue::list([1u64, u64::MAX])
        );
    }
}

// ============================================================================
// Configuration Tests
// ============================================================================

mod config_switch {
    use super::*;
    use crate::config::{self, CodecConfig};

    // The only test that toggles the process-wide switch.
    #[test]
    fn test_nan_infinity_switch() {
        let ci = TypeRegistry::new();
        let previous = config::set(CodecConfig::new());

        let mut arr = Float8Array::default();
        assert!(arr.decode_text(&ci, Some(b"{1.5,NaN}")).is_err());

        let non_finite = {
            let mut a = Float8Array::default();
            a.set(HostValue::list([1.5f64, f64::NAN, f64::INFINITY, f64::NEG_INFINITY]))
                .unwrap();
            a
        };
        assert!(non_finite.text_bytes(&ci).is_err());

        config::set_nan_infinity_aware(true);
        assert!(config::nan_infinity_aware());

        arr.decode_text(&ci, Some(b"{1.5,NaN,Infinity,-Infinity}")).unwrap();
        assert!(arr.elements()[1].value().is_some_and(f64::is_nan));
        assert_eq!(text_of(&non_finite), "{1.5,NaN,Infinity,-Infinity}");

        config::set(previous);
    }
}

// ============================================================================
// Round-Trip Properties
// ============================================================================

mod round_trip {
    use super::*;
    use proptest::prelude::*;

    fn dims_strategy() -> impl Strategy<Value = Vec<ArrayDimension>> {
        prop::collection::vec((1i32..=3, -2i32..=3), 0..=3).prop_map(|pairs| {
            pairs
                .into_iter()
                .map(|(length, lower_bound)| ArrayDimension::new(length, lower_bound))
                .collect()
        })
    }

    fn int4_array_strategy() -> impl Strategy<Value = Int4Array> {
        dims_strategy().prop_flat_map(|dims| {
            let count = element_count(&dims).unwrap();
            prop::collection::vec(proptest::option::of(any::<i32>()), count).prop_map(
                move |items| {
                    let elems = items
                        .into_iter()
                        .map(|v| v.map(Int4::new).unwrap_or_else(Int4::null))
                        .collect();
                    Int4Array::default()
                        .with_elements(dims.clone(), elems)
                        .unwrap()
                },
            )
        })
    }

    fn text_array_strategy() -> impl Strategy<Value = TextArray> {
        let item = proptest::option::of(r#"[a-zA-Z0-9 ,{}"\\\t]{0,8}"#);
        prop::collection::vec(item, 0..6).prop_map(|items| {
            let mut arr = TextArray::default();
            arr.set(HostValue::list(items)).unwrap();
            arr
        })
    }

    proptest! {
        #[test]
        fn int4_text_round_trip(arr in int4_array_strategy()) {
            let ci = TypeRegistry::new();
            let text = arr.text_bytes(&ci).unwrap().unwrap();
            let mut back = Int4Array::default();
            back.decode_text(&ci, Some(&text)).unwrap();
            prop_assert_eq!(back, arr);
        }

        #[test]
        fn int4_binary_round_trip(arr in int4_array_strategy()) {
            let ci = TypeRegistry::new();
            let buf = arr.binary_bytes(&ci).unwrap().unwrap();
            let mut back = Int4Array::default();
            back.decode_binary(&ci, Some(&buf)).unwrap();
            prop_assert_eq!(back, arr);
        }

        #[test]
        fn text_array_text_round_trip(arr in text_array_strategy()) {
            let ci = TypeRegistry::new();
            let text = arr.text_bytes(&ci).unwrap().unwrap();
            let mut back = TextArray::default();
            back.decode_text(&ci, Some(&text)).unwrap();
            prop_assert_eq!(back, arr);
        }
    }
}
