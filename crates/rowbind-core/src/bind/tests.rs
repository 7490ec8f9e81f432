use super::*;
use crate::{
    strategy::{DeclaredNullability, TypeMappingStrategy},
    types::{ParamDescriptor, ScalarKind, TypeDescriptor},
    value::KeyComparer,
};
use std::collections::HashMap;

// ---- fixtures ----------------------------------------------------------

#[derive(Debug, Default)]
struct Overloaded {
    a: i32,
    b: i32,
    c: i32,
    x: i32,
}

fn overloaded() -> TypeRef {
    let p = |name: &str| ParamDescriptor::of::<i32>(name);

    TypeDescriptor::builder::<Overloaded>("tests::Overloaded")
        .constructor(
            "with_defaults",
            vec![
                p("a"),
                p("x").with_default(2_i32),
                p("y").with_default(3_i32),
                p("z").with_default(4_i32),
            ],
            |args| {
                Ok(Overloaded {
                    a: args.take()?,
                    x: args.take()?,
                    ..Overloaded::default()
                })
            },
        )
        .constructor("pair", vec![p("a"), p("b")], |args| {
            Ok(Overloaded {
                a: args.take()?,
                b: args.take()?,
                ..Overloaded::default()
            })
        })
        .constructor("triple", vec![p("a"), p("b"), p("c")], |args| {
            Ok(Overloaded {
                a: args.take()?,
                b: args.take()?,
                c: args.take()?,
                ..Overloaded::default()
            })
        })
        .into_type_ref()
}

#[derive(Debug, Default)]
struct Shadowed {
    property: i64,
    field: i64,
    exact: i64,
}

fn shadowed() -> TypeRef {
    TypeDescriptor::builder::<Shadowed>("tests::Shadowed")
        .value_type()
        .field::<i64, _>("value", |s, v| s.field = v)
        .property::<i64, _>("Value", |s, v| s.property = v)
        .property::<i64, _>("LABEL", |s, v| s.property = v)
        .property::<i64, _>("label", |s, v| s.exact = v)
        .into_type_ref()
}

fn int_schema(names: &[&str]) -> RowSchema {
    RowSchema::new(names.iter().map(|name| (*name, TypeRef::of::<i32>())))
}

fn poco_plan(ty: &TypeRef, schema: &RowSchema) -> Result<MappingPlan, BindError> {
    let TypeMappingStrategy::Poco(strategy) =
        TypeMappingStrategy::resolve(ty, &DeclaredNullability).unwrap()
    else {
        panic!("expected a POCO strategy");
    };
    let converter = ScalarConverter::default();

    Binder::new(&converter).bind_poco(&strategy, ty, schema, "", 0..schema.len())
}

fn constructor_label(plan: &MappingPlan) -> &str {
    match &plan.steps[0] {
        EmitStep::Construct { constructor, .. } => &constructor.label,
        other => panic!("expected a constructor call, found {other:?}"),
    }
}

fn targets(plan: &MappingPlan) -> Vec<String> {
    plan.bindings
        .iter()
        .map(|binding| binding.target.to_string())
        .collect()
}

// ---- poco --------------------------------------------------------------

#[test]
fn constructor_binding_the_most_columns_wins() {
    let ty = overloaded();

    let plan = poco_plan(&ty, &int_schema(&["a"])).unwrap();
    assert_eq!(constructor_label(&plan), "with_defaults");
    let EmitStep::Construct { args, .. } = &plan.steps[0] else {
        unreachable!()
    };
    assert!(matches!(
        args.as_slice(),
        [
            Arg::Binding(0),
            Arg::Const(Value::I32(2)),
            Arg::Const(Value::I32(3)),
            Arg::Const(Value::I32(4)),
        ]
    ));

    let plan = poco_plan(&ty, &int_schema(&["a", "b"])).unwrap();
    assert_eq!(constructor_label(&plan), "pair");

    let plan = poco_plan(&ty, &int_schema(&["A", "b", "C"])).unwrap();
    assert_eq!(constructor_label(&plan), "triple");
    assert_eq!(
        targets(&plan),
        [
            "parameter a of tests::Overloaded.triple",
            "parameter b of tests::Overloaded.triple",
            "parameter c of tests::Overloaded.triple",
        ]
    );
}

#[test]
fn unmatched_parameters_without_defaults_disqualify() {
    let err = poco_plan(&overloaded(), &int_schema(&["b"])).unwrap_err();

    assert_eq!(
        err.to_string(),
        "no public constructor of tests::Overloaded can be satisfied by the columns [0 (i32 b)]"
    );
}

#[test]
fn property_beats_field_of_the_same_name() {
    let plan = poco_plan(&shadowed(), &int_schema(&["value"])).unwrap();

    assert_eq!(targets(&plan), ["property Value of tests::Shadowed"]);
    assert!(matches!(plan.steps[0], EmitStep::DefaultInit { .. }));
    assert!(matches!(
        &plan.steps[1],
        EmitStep::Assign { binding: 0, member } if member.name == "Value"
    ));
}

#[test]
fn exact_case_breaks_member_ties() {
    let plan = poco_plan(&shadowed(), &int_schema(&["label"])).unwrap();
    assert_eq!(targets(&plan), ["property label of tests::Shadowed"]);

    let plan = poco_plan(&shadowed(), &int_schema(&["LABEL"])).unwrap();
    assert_eq!(targets(&plan), ["property LABEL of tests::Shadowed"]);
}

#[test]
fn duplicate_column_names_bind_only_the_first() {
    let plan = poco_plan(&shadowed(), &int_schema(&["value", "VALUE"])).unwrap();

    assert_eq!(plan.bindings.len(), 1);
    assert_eq!(plan.bindings[0].retrieval.column.index, 0);

    let schema = int_schema(&["value", "VALUE"]);
    let unbound = plan.unbound_columns(&schema);
    assert_eq!(unbound.len(), 1);
    assert_eq!(unbound[0].to_string(), "1 (i32 VALUE)");
}

#[test]
fn partial_binding_reports_unused_slots() {
    let plan = poco_plan(&shadowed(), &int_schema(&["value"])).unwrap();
    assert!(plan.is_partial_binding);
    assert!(plan.requires_all_columns);

    let plan = poco_plan(&shadowed(), &int_schema(&["label", "value"])).unwrap();
    assert!(!plan.is_partial_binding);

    // parameters of constructors that were not chosen still count as slots
    let plan = poco_plan(&overloaded(), &int_schema(&["a", "b", "c"])).unwrap();
    assert!(plan.is_partial_binding);
}

#[test]
fn value_type_with_no_matching_columns_has_no_bindings() {
    let err = poco_plan(&shadowed(), &int_schema(&["other"])).unwrap_err();

    assert!(matches!(err, BindError::NoBindings { .. }));
}

#[test]
fn bindings_are_ordered_by_column_index() {
    let ty = TypeDescriptor::builder::<Overloaded>("tests::Mixed")
        .constructor("new", vec![ParamDescriptor::of::<i32>("c")], |args| {
            Ok(Overloaded {
                c: args.take()?,
                ..Overloaded::default()
            })
        })
        .field::<i32, _>("a", |o, v| o.a = v)
        .field::<i32, _>("b", |o, v| o.b = v)
        .into_type_ref();

    let plan = poco_plan(&ty, &int_schema(&["b", "a", "c"])).unwrap();

    let columns = plan
        .bindings
        .iter()
        .map(|binding| binding.retrieval.column.index)
        .collect::<Vec<_>>();
    assert_eq!(columns, [0, 1, 2]);
    assert!(matches!(
        &plan.steps[0],
        EmitStep::Construct { args, .. } if matches!(args.as_slice(), [Arg::Binding(2)])
    ));
    assert!(matches!(plan.steps[1], EmitStep::Assign { binding: 0, .. }));
    assert!(matches!(plan.steps[2], EmitStep::Assign { binding: 1, .. }));
}

// ---- dictionary --------------------------------------------------------

#[test]
fn dictionary_selects_prefixed_columns_in_range() {
    let ty = TypeRef::of::<HashMap<String, i64>>();
    let TypeMappingStrategy::Dictionary(strategy) =
        TypeMappingStrategy::resolve(&ty, &DeclaredNullability).unwrap()
    else {
        panic!("expected a dictionary strategy");
    };
    let schema = int_schema(&["id", "attr_color", "ATTR_size", "attr_weight", "note"]);
    let converter = ScalarConverter::default();

    let plan = Binder::new(&converter).bind_dictionary(&strategy, &ty, &schema, "attr_", 0..3);

    let keys = plan
        .steps
        .iter()
        .filter_map(|step| match step {
            EmitStep::AddEntry { key, .. } => Some(key.as_str()),
            _ => None,
        })
        .collect::<Vec<_>>();
    assert_eq!(keys, ["color", "size"]);
    assert!(matches!(
        &plan.steps[0],
        EmitStep::Construct { args, .. } if matches!(args.as_slice(), [Arg::Const(Value::I32(2))])
    ));
    assert!(!plan.is_partial_binding);
    assert!(!plan.requires_all_columns);
    assert_eq!(plan.unbound_columns(&schema).len(), 3);
    assert_eq!(targets(&plan)[0], "HashMap<string, i64> value");
}

#[test]
fn dictionary_constructor_receives_case_insensitive_comparer() {
    let ty = TypeRef::map_interface(TypeRef::Object);
    let TypeMappingStrategy::Dictionary(strategy) =
        TypeMappingStrategy::resolve(&ty, &DeclaredNullability).unwrap()
    else {
        panic!("expected a dictionary strategy");
    };
    let schema = int_schema(&["a", "b", "c"]);
    let converter = ScalarConverter::default();

    let plan = Binder::new(&converter).bind_dictionary(&strategy, &ty, &schema, "", 0..usize::MAX);

    assert!(matches!(
        &plan.steps[0],
        EmitStep::Construct { args, .. } if matches!(
            args.as_slice(),
            [
                Arg::Const(Value::I32(3)),
                Arg::Const(Value::Comparer(KeyComparer::OrdinalIgnoreCase)),
            ]
        )
    ));
    assert_eq!(plan.steps.len(), 4);
}

// ---- scalar ------------------------------------------------------------

#[test]
fn scalar_requires_exactly_one_column() {
    let converter = ScalarConverter::default();
    let binder = Binder::new(&converter);
    let ty = TypeRef::of::<i64>();

    let plan = binder.bind_scalar(&ty, &int_schema(&["n"])).unwrap();
    assert_eq!(targets(&plan), ["scalar i64"]);
    assert!(matches!(plan.steps[..], [EmitStep::Yield { binding: 0 }]));

    let err = binder.bind_scalar(&ty, &int_schema(&["n", "m"])).unwrap_err();
    assert_eq!(
        err.to_string(),
        "i64 maps from exactly one column, but the result set has 2"
    );
}

// ---- retrieval ---------------------------------------------------------

fn column(ty: TypeRef) -> Column {
    RowSchema::new([("c", ty)])[0].clone()
}

#[test]
fn retrieval_fetches_column_type_when_converting() {
    let converter = ScalarConverter::default();
    let retrieval = ColumnRetrieval::new(
        &column(TypeRef::of::<i32>()),
        TypeRef::of::<Option<i64>>(),
        &converter,
        false,
    );

    assert_eq!(retrieval.fetch_as, TypeRef::of::<i32>());
    assert!(retrieval.conversion.is_some());
    assert!(retrieval.is_safe());
    assert_eq!(retrieval.finish(Value::I32(3)).unwrap(), Value::I64(3));
    assert_eq!(retrieval.finish(Value::Null).unwrap(), Value::Null);
}

#[test]
fn retrieval_fetches_destination_type_without_conversion() {
    let converter = ScalarConverter::default();
    let retrieval = ColumnRetrieval::new(
        &column(TypeRef::of::<String>()),
        TypeRef::of::<i32>(),
        &converter,
        false,
    );

    assert_eq!(retrieval.fetch_as, TypeRef::of::<i32>());
    assert!(retrieval.conversion.is_none());
    assert!(!retrieval.is_safe());
}

#[test]
fn null_into_non_nullable_slots_is_rejected() {
    let converter = ScalarConverter::default();

    let value_slot = ColumnRetrieval::new(
        &column(TypeRef::of::<i32>()),
        TypeRef::of::<i32>(),
        &converter,
        false,
    );
    assert!(!value_slot.is_safe());
    assert!(matches!(
        value_slot.finish(Value::Null),
        Err(ConversionError::NullIntoNonNullable { .. })
    ));

    let reference_slot = ColumnRetrieval::new(
        &column(TypeRef::of::<String>()),
        TypeRef::of::<String>(),
        &converter,
        true,
    );
    assert!(!reference_slot.is_safe());
    assert!(reference_slot.finish(Value::Null).is_err());

    let nullable_reference = ColumnRetrieval::new(
        &column(TypeRef::of::<String>()),
        TypeRef::of::<String>(),
        &converter,
        false,
    );
    assert!(nullable_reference.is_safe());
    assert_eq!(nullable_reference.finish(Value::Null).unwrap(), Value::Null);
}

#[test]
fn checked_conversions_are_not_safe() {
    let converter = ScalarConverter::default();
    let retrieval = ColumnRetrieval::new(
        &column(TypeRef::Scalar(ScalarKind::I64)),
        TypeRef::nullable(TypeRef::Scalar(ScalarKind::I32)),
        &converter,
        false,
    );

    assert!(!retrieval.is_safe());
    assert!(retrieval.finish(Value::I64(i64::MAX)).is_err());
}

#[test]
fn target_display_text() {
    let nested = BindingTarget::Nested {
        outer: Box::new(BindingTarget::Property {
            owner: "Order".into(),
            name: "Customer".into(),
        }),
        inner: Box::new(BindingTarget::Field {
            owner: "Customer".into(),
            name: "id".into(),
        }),
    };

    assert_eq!(
        nested.to_string(),
        "field id of Customer of property Customer of Order"
    );
    assert_eq!(
        BindingTarget::ArrayElement {
            element: "i32".into()
        }
        .to_string(),
        "i32 element"
    );
}
