use proptest::prelude::*;
use rowbind::{
    error::{ErrorClass, MappingError},
    prelude::*,
    types::{EnumType, FromValueError, ScalarKind},
    value::EnumValue,
};
use rust_decimal::Decimal;
use std::{
    collections::HashMap,
    sync::{Arc, OnceLock},
};

// ---- fixtures ----------------------------------------------------------

#[derive(Debug, Default, PartialEq)]
struct Overloaded {
    ctor: &'static str,
    a: i32,
    b: i32,
    c: i32,
    x: i32,
    y: i32,
    z: i32,
}

impl Bindable for Overloaded {
    fn type_ref() -> TypeRef {
        static TYPE: OnceLock<TypeRef> = OnceLock::new();

        let p = |name: &str| ParamDescriptor::of::<i32>(name);
        TYPE.get_or_init(|| {
            TypeDescriptor::builder::<Self>("fixtures::Overloaded")
                .constructor(
                    "with_defaults",
                    vec![
                        p("a"),
                        p("x").with_default(2_i32),
                        p("y").with_default(3_i32),
                        p("z").with_default(4_i32),
                    ],
                    |args| {
                        Ok(Self {
                            ctor: "with_defaults",
                            a: args.take()?,
                            x: args.take()?,
                            y: args.take()?,
                            z: args.take()?,
                            ..Self::default()
                        })
                    },
                )
                .constructor("pair", vec![p("a"), p("b")], |args| {
                    Ok(Self {
                        ctor: "pair",
                        a: args.take()?,
                        b: args.take()?,
                        ..Self::default()
                    })
                })
                .constructor("triple", vec![p("a"), p("b"), p("c")], |args| {
                    Ok(Self {
                        ctor: "triple",
                        a: args.take()?,
                        b: args.take()?,
                        c: args.take()?,
                        ..Self::default()
                    })
                })
                .into_type_ref()
        })
        .clone()
    }

    fn from_value(_: Value) -> Result<Self, FromValueError> {
        Err(FromValueError::not_scalar::<Self>())
    }
}

#[derive(Debug, Default, PartialEq)]
struct Shadowed {
    property: i64,
    field: i64,
}

impl Bindable for Shadowed {
    fn type_ref() -> TypeRef {
        TypeDescriptor::builder::<Self>("fixtures::Shadowed")
            .value_type()
            .field::<i64, _>("value", |s, v| s.field = v)
            .property::<i64, _>("Value", |s, v| s.property = v)
            .into_type_ref()
    }

    fn from_value(_: Value) -> Result<Self, FromValueError> {
        Err(FromValueError::not_scalar::<Self>())
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Status {
    Open = 1,
    Held = 2,
    Closed = 3,
}

impl Bindable for Status {
    fn type_ref() -> TypeRef {
        static TYPE: OnceLock<Arc<EnumType>> = OnceLock::new();

        let ty = TYPE.get_or_init(|| {
            Arc::new(
                EnumType::new("fixtures::Status", ScalarKind::I32)
                    .member("Open", 1)
                    .member("Held", 2)
                    .member("Closed", 3),
            )
        });

        TypeRef::Enum(Arc::clone(ty))
    }

    fn from_value(value: Value) -> Result<Self, FromValueError> {
        match value {
            Value::Enum(EnumValue { raw: 1, .. }) => Ok(Self::Open),
            Value::Enum(EnumValue { raw: 2, .. }) => Ok(Self::Held),
            Value::Enum(EnumValue { raw: 3, .. }) => Ok(Self::Closed),
            other => Err(FromValueError::mismatch::<Self>(&other)),
        }
    }
}

#[derive(Bindable, Debug, PartialEq)]
struct Ticket {
    id: i32,
    status: Status,
}

#[derive(Bindable, Debug, PartialEq)]
struct Point {
    a: i32,
    b: i32,
}

fn int_cursor(names: &[&str], row: &[i32]) -> MemoryCursor {
    let schema = RowSchema::new(names.iter().map(|name| (*name, TypeRef::of::<i32>())));
    let row = row.iter().map(|v| Value::from(*v)).collect();
    let mut cursor = MemoryCursor::new(schema, vec![row]);
    assert!(cursor.advance());

    cursor
}

// ---- constructor preference --------------------------------------------

#[test]
fn single_column_picks_the_defaulted_constructor() {
    let provider = MappingProvider::new();
    let mut cursor = int_cursor(&["a"], &[10]);

    let value = provider.map_row::<_, Overloaded>(&mut cursor).unwrap();

    assert_eq!(
        value,
        Overloaded {
            ctor: "with_defaults",
            a: 10,
            x: 2,
            y: 3,
            z: 4,
            ..Overloaded::default()
        }
    );
}

#[test]
fn two_columns_pick_the_pair_constructor() {
    let provider = MappingProvider::new();
    let mut cursor = int_cursor(&["a", "b"], &[10, 20]);

    let value = provider.map_row::<_, Overloaded>(&mut cursor).unwrap();

    assert_eq!(value.ctor, "pair");
    assert_eq!((value.a, value.b), (10, 20));
}

#[test]
fn three_columns_pick_the_triple_constructor() {
    let provider = MappingProvider::new();
    let mut cursor = int_cursor(&["c", "B", "a"], &[30, 20, 10]);

    let value = provider.map_row::<_, Overloaded>(&mut cursor).unwrap();

    assert_eq!(value.ctor, "triple");
    assert_eq!((value.a, value.b, value.c), (10, 20, 30));
    assert_eq!(cursor.reads(), [0, 1, 2]);
}

// ---- members -----------------------------------------------------------

#[test]
fn property_wins_over_field_of_the_same_name() {
    let provider = MappingProvider::new();
    let mut cursor = int_cursor(&["value"], &[5]);

    let value = provider.map_row::<_, Shadowed>(&mut cursor).unwrap();

    assert_eq!(value, Shadowed { property: 5, field: 0 });
}

// ---- unbound columns ---------------------------------------------------

#[test]
fn unbound_columns_are_reported() {
    let provider = MappingProvider::new();
    let schema = RowSchema::new([
        ("a", TypeRef::of::<i32>()),
        ("b", TypeRef::of::<i32>()),
        ("x", TypeRef::of::<Decimal>()),
    ]);
    let mut cursor = MemoryCursor::new(schema, Vec::new());

    let err = provider.routine::<_, Point>(&cursor).unwrap_err();

    assert!(matches!(err, MappingError::UnboundColumns(_)));
    assert!(
        err.to_string()
            .contains("\nThe following columns were not bound: 2 (decimal x)\n")
    );
    assert!(!cursor.advance());
}

// ---- dictionaries ------------------------------------------------------

#[test]
fn dictionary_with_two_value_types_is_ambiguous() {
    #[derive(Default)]
    struct Both;

    let ty = TypeDescriptor::builder::<Both>("fixtures::Both")
        .constructor("new", Vec::new(), |_| Ok(Both))
        .dictionary::<i32, _>(|_, _, _| Ok(()))
        .dictionary::<Value, _>(|_, _, _| Ok(()))
        .into_type_ref();
    let provider = MappingProvider::new();
    let schema = RowSchema::new([("a", TypeRef::of::<i32>())]);

    let err = provider
        .compile(&schema, &ty, &ColumnSelection::all())
        .unwrap_err();

    assert_eq!(err.class(), ErrorClass::Resolution);
    assert_eq!(
        err.to_string().lines().next(),
        Some(
            "Cannot be mapped to a dictionary because the type implements Map<string, V> for \
             multiple types V (i32, object)"
        )
    );
}

#[test]
fn abstract_dictionary_is_rejected() {
    struct Shape;

    let ty = TypeDescriptor::builder::<Shape>("fixtures::Shape")
        .abstract_type()
        .dictionary::<i32, _>(|_, _, _| Ok(()))
        .into_type_ref();
    let provider = MappingProvider::new();
    let schema = RowSchema::new([("a", TypeRef::of::<i32>())]);

    let err = provider
        .compile(&schema, &ty, &ColumnSelection::all())
        .unwrap_err();

    assert_eq!(
        err.to_string(),
        "An abstract type cannot be mapped to a dictionary\n\
         An abstract type cannot be mapped to a POCO"
    );
}

#[test]
fn map_interfaces_degrade_to_records_keeping_the_value_type() {
    let provider = MappingProvider::new();
    let schema = RowSchema::new([("Left", TypeRef::of::<i32>()), ("Right", TypeRef::of::<i32>())]);
    let mut cursor = MemoryCursor::new(schema.clone(), vec![vec![1_i32.into(), 2_i32.into()]]);
    assert!(cursor.advance());

    let routine = provider
        .compile(
            &schema,
            &TypeRef::map_interface(TypeRef::of::<i64>()),
            &ColumnSelection::all(),
        )
        .unwrap();
    let record = routine.map::<Record>(&mut cursor).unwrap();

    assert_eq!(routine.destination().to_string(), "dyn Map<string, i64>");
    assert_eq!(record.get("left"), Some(&Value::I64(1)));
    assert_eq!(record.get("RIGHT"), Some(&Value::I64(2)));
}

#[test]
fn typed_hash_maps_convert_values() {
    let provider = MappingProvider::new();
    let mut cursor = int_cursor(&["one", "two"], &[1, 2]);

    let map = provider
        .map_row::<_, HashMap<String, Option<i64>>>(&mut cursor)
        .unwrap();

    assert_eq!(map["one"], Some(1));
    assert_eq!(map["two"], Some(2));
}

// ---- enums -------------------------------------------------------------

#[test]
fn defined_enum_values_convert() {
    let provider = MappingProvider::new();
    let mut cursor = int_cursor(&["id", "status"], &[1, 2]);

    let ticket = provider.map_row::<_, Ticket>(&mut cursor).unwrap();

    assert_eq!(
        ticket,
        Ticket {
            id: 1,
            status: Status::Held,
        }
    );
}

#[test]
fn undefined_enum_values_fail_on_their_column() {
    let provider = MappingProvider::new();

    for raw in [0, 4] {
        let mut cursor = int_cursor(&["id", "status"], &[1, raw]);

        let err = provider.map_row::<_, Ticket>(&mut cursor).unwrap_err();

        assert_eq!(err.class(), ErrorClass::Conversion);
        assert_eq!(err.column_index(), Some(1));
    }
}

#[test]
fn enum_scalars_map_from_one_column() {
    let provider = MappingProvider::new();
    let mut cursor = int_cursor(&["status"], &[3]);

    assert_eq!(
        provider.map_row::<_, Status>(&mut cursor).unwrap(),
        Status::Closed
    );
}

// ---- caching -----------------------------------------------------------

#[test]
fn routines_are_reused_across_rows() {
    let provider = MappingProvider::new();
    let schema = RowSchema::new([("a", TypeRef::of::<i32>()), ("b", TypeRef::of::<i32>())]);
    let rows = (0..5)
        .map(|i| vec![Value::from(i), Value::from(i * 10)])
        .collect();
    let mut cursor = MemoryCursor::new(schema, rows);

    let mut points = Vec::new();
    while cursor.advance() {
        points.push(provider.map_row::<_, Point>(&mut cursor).unwrap());
    }

    assert_eq!(points.len(), 5);
    assert_eq!(points[4], Point { a: 4, b: 40 });
    let stats = provider.routine_stats();
    assert_eq!(stats.size, 1);
    assert_eq!(stats.hits, 4);
}

// ---- read order --------------------------------------------------------

#[derive(Debug, Default)]
struct Wide {
    c: i32,
    fields: [i32; 4],
}

fn wide() -> TypeRef {
    let mut builder = TypeDescriptor::builder::<Wide>("fixtures::Wide").constructor(
        "new",
        vec![ParamDescriptor::of::<i32>("c")],
        |args| {
            Ok(Wide {
                c: args.take()?,
                ..Wide::default()
            })
        },
    );
    for (slot, name) in ["a", "b", "d", "e"].into_iter().enumerate() {
        builder = builder.field::<i32, _>(name, move |w, v| w.fields[slot] = v);
    }

    builder.into_type_ref()
}

impl Bindable for Wide {
    fn type_ref() -> TypeRef {
        static TYPE: OnceLock<TypeRef> = OnceLock::new();

        TYPE.get_or_init(wide).clone()
    }

    fn from_value(_: Value) -> Result<Self, FromValueError> {
        Err(FromValueError::not_scalar::<Self>())
    }
}

proptest! {
    #[test]
    fn columns_are_read_once_in_ascending_order(
        names in Just(vec!["a", "b", "c", "d", "e"]).prop_shuffle()
    ) {
        let provider = MappingProvider::new();
        let values = (1..=5).collect::<Vec<i32>>();
        let mut cursor = int_cursor(&names, &values);

        let routine = provider.compile(cursor.schema(), &wide(), &ColumnSelection::all()).unwrap();
        let Ok(instance) = routine.map::<Wide>(&mut cursor) else {
            panic!("mapping failed");
        };

        prop_assert_eq!(cursor.reads(), &[0, 1, 2, 3, 4][..]);
        let position = |name: &str| names.iter().position(|n| *n == name).unwrap();
        prop_assert_eq!(usize::try_from(instance.c).unwrap(), position("c") + 1);
        prop_assert_eq!(usize::try_from(instance.fields[0]).unwrap(), position("a") + 1);
    }
}
