use super::*;
use crate::types::{CustomType, EnumType};
use std::sync::Arc;

#[test]
fn null_matches_only_slots_that_admit_null() {
    let int = TypeRef::Scalar(ScalarKind::I32);
    let text = TypeRef::Scalar(ScalarKind::Text);

    assert!(!Value::Null.matches_type(&int));
    assert!(Value::Null.matches_type(&TypeRef::nullable(int.clone())));
    assert!(Value::Null.matches_type(&text));
    assert!(Value::Null.matches_type(&TypeRef::Object));
}

#[test]
fn scalars_match_their_own_kind_and_nullable_wrapper() {
    let int = TypeRef::Scalar(ScalarKind::I32);

    assert!(Value::I32(4).matches_type(&int));
    assert!(Value::I32(4).matches_type(&TypeRef::nullable(int)));
    assert!(!Value::I64(4).matches_type(&TypeRef::Scalar(ScalarKind::I32)));
    assert!(Value::from("x").matches_type(&TypeRef::Object));
}

#[test]
fn named_values_match_by_path() {
    let color = TypeRef::Enum(Arc::new(EnumType::new("Color", ScalarKind::I32)));
    let money = TypeRef::Custom(Arc::new(CustomType::new("Money", true)));

    assert!(Value::Enum(EnumValue::new("Color", 1)).matches_type(&color));
    assert!(!Value::Enum(EnumValue::new("Shade", 1)).matches_type(&color));
    assert!(Value::Opaque(OpaqueValue::new("Money", 5_u32)).matches_type(&money));
    assert!(!Value::I32(1).matches_type(&color));
}

#[test]
fn options_convert_to_null_or_inner_value() {
    assert_eq!(Value::from(None::<i32>), Value::Null);
    assert_eq!(Value::from(Some(7_i64)), Value::I64(7));
    assert_eq!(Value::from(Some("a")), Value::Text("a".to_string()));
}

#[test]
fn display_quotes_text_and_summarizes_blobs() {
    assert_eq!(Value::from("id").to_string(), "'id'");
    assert_eq!(Value::Blob(vec![0; 3]).to_string(), "<3 bytes>");
    assert_eq!(Value::Null.to_string(), "null");
    assert_eq!(Value::Enum(EnumValue::new("Color", 2)).to_string(), "Color(2)");
}

#[test]
fn numeric_view_covers_numbers_only() {
    assert!(Value::U16(3).as_numeric().is_some());
    assert!(Value::Decimal(rust_decimal::Decimal::ONE).as_numeric().is_some());
    assert!(Value::Bool(true).as_numeric().is_none());
    assert!(Value::from("3").as_numeric().is_none());
}

#[test]
fn casefold_borrows_when_already_folded() {
    assert!(matches!(casefold("name"), Cow::Borrowed("name")));
    assert_eq!(casefold("NaMe"), "name");
    assert_eq!(casefold("ÉCOLE"), "école");
}

#[test]
fn comparer_equality() {
    assert!(KeyComparer::OrdinalIgnoreCase.eq("Key", "kEY"));
    assert!(!KeyComparer::Ordinal.eq("Key", "kEY"));
    assert!(KeyComparer::Ordinal.eq("Key", "Key"));
}

#[test]
fn opaque_values_compare_by_identity() {
    let a = OpaqueValue::new("Money", 1_u8);
    let b = OpaqueValue::new("Money", 1_u8);

    assert_eq!(a, a.clone());
    assert_ne!(a, b);
    assert_eq!(a.downcast_ref::<u8>(), Some(&1));
    assert_eq!(a.downcast_ref::<u16>(), None);
}
