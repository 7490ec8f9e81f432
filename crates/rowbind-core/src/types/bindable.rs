use crate::{
    error::BoxError,
    types::{DictionaryImpl, ParamDescriptor, ScalarKind, TypeDescriptor, TypeRef},
    value::{DateTimeValue, KeyComparer, Value},
};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, TimeDelta};
use rust_decimal::Decimal;
use dashmap::DashMap;
use std::{
    any::{TypeId, type_name},
    collections::{BTreeMap, HashMap, hash_map::Entry},
    sync::OnceLock,
};
use thiserror::Error as ThisError;

///
/// Bindable
///
/// A Rust type that can occupy a binding slot: it names its `TypeRef` and
/// knows how to take ownership of a converted `Value`.
///

pub trait Bindable: Sized + Send + 'static {
    /// Whether the slot admits null (`Option<T>` and `Value`).
    const NULLABLE: bool = false;

    fn type_ref() -> TypeRef;

    fn from_value(value: Value) -> Result<Self, FromValueError>;
}

///
/// FromValueError
///

#[derive(Debug, ThisError)]
pub enum FromValueError {
    #[error("expected a value of type {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    #[error("null cannot be stored in a slot of type {expected}")]
    Null { expected: String },

    #[error("type {path} is not a scalar and cannot be read from a single value")]
    NotScalar { path: String },

    #[error("constructor argument {position} is missing")]
    MissingArgument { position: usize },

    #[error("target instance is not a {expected}")]
    InstanceMismatch { expected: String },
}

impl FromValueError {
    pub fn mismatch<T: Bindable>(found: &Value) -> Self {
        if found.is_null() {
            return Self::Null {
                expected: T::type_ref().to_string(),
            };
        }

        Self::TypeMismatch {
            expected: T::type_ref().to_string(),
            found: found.to_string(),
        }
    }

    pub fn not_scalar<T>() -> Self {
        Self::NotScalar {
            path: type_name::<T>().to_string(),
        }
    }

    pub(crate) fn instance_mismatch(expected: &str) -> Self {
        Self::InstanceMismatch {
            expected: expected.to_string(),
        }
    }
}

///
/// Args
///
/// Positional constructor arguments, consumed in declared parameter order.
///

pub struct Args {
    values: std::vec::IntoIter<Value>,
    position: usize,
}

impl Args {
    pub(crate) fn new(values: Vec<Value>) -> Self {
        Self {
            values: values.into_iter(),
            position: 0,
        }
    }

    /// Take the next argument as `T`.
    pub fn take<T: Bindable>(&mut self) -> Result<T, FromValueError> {
        let position = self.position;
        self.position += 1;

        let value = self
            .values
            .next()
            .ok_or(FromValueError::MissingArgument { position })?;

        T::from_value(value)
    }
}

macro_rules! impl_scalar_bindable {
    ( $( $type:ty => $kind:ident / $variant:ident ),* $(,)? ) => {
        $(
            impl Bindable for $type {
                fn type_ref() -> TypeRef {
                    TypeRef::Scalar(ScalarKind::$kind)
                }

                fn from_value(value: Value) -> Result<Self, FromValueError> {
                    match value {
                        Value::$variant(v) => Ok(v),
                        other => Err(FromValueError::mismatch::<Self>(&other)),
                    }
                }
            }
        )*
    };
}

impl_scalar_bindable! {
    bool                  => Bool / Bool,
    i8                    => I8 / I8,
    u8                    => U8 / U8,
    i16                   => I16 / I16,
    u16                   => U16 / U16,
    i32                   => I32 / I32,
    u32                   => U32 / U32,
    i64                   => I64 / I64,
    u64                   => U64 / U64,
    f32                   => F32 / F32,
    f64                   => F64 / F64,
    Decimal               => Decimal / Decimal,
    String                => Text / Text,
    Vec<u8>               => Blob / Blob,
    DateTimeValue         => DateTime / DateTime,
    NaiveDate             => Date / Date,
    TimeDelta             => TimeSpan / TimeSpan,
    NaiveTime             => TimeOfDay / TimeOfDay,
    DateTime<FixedOffset> => DateTimeOffset / DateTimeOffset,
}

impl<T: Bindable> Bindable for Option<T> {
    const NULLABLE: bool = true;

    fn type_ref() -> TypeRef {
        TypeRef::nullable(T::type_ref())
    }

    fn from_value(value: Value) -> Result<Self, FromValueError> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl Bindable for Value {
    const NULLABLE: bool = true;

    fn type_ref() -> TypeRef {
        TypeRef::Object
    }

    fn from_value(value: Value) -> Result<Self, FromValueError> {
        Ok(value)
    }
}

impl Bindable for KeyComparer {
    fn type_ref() -> TypeRef {
        TypeRef::Comparer
    }

    fn from_value(value: Value) -> Result<Self, FromValueError> {
        match value {
            Value::Comparer(comparer) => Ok(comparer),
            other => Err(FromValueError::mismatch::<Self>(&other)),
        }
    }
}

fn insert_unique<V>(map: &mut HashMap<String, V>, key: String, value: V) -> Result<(), BoxError> {
    match map.entry(key) {
        Entry::Occupied(entry) => {
            Err(format!("an entry with key '{}' has already been added", entry.key()).into())
        }
        Entry::Vacant(entry) => {
            entry.insert(value);
            Ok(())
        }
    }
}

// Statics inside generic functions are shared by every instantiation, so
// generic impls publish their descriptors here keyed by `TypeId`. The build
// runs outside the map lock because nested maps resolve their value type.
fn generic_type_ref<T: 'static>(build: fn() -> TypeRef) -> TypeRef {
    static TYPES: OnceLock<DashMap<TypeId, TypeRef>> = OnceLock::new();

    let types = TYPES.get_or_init(DashMap::new);
    if let Some(ty) = types.get(&TypeId::of::<T>()) {
        return ty.clone();
    }

    let built = build();
    types.entry(TypeId::of::<T>()).or_insert(built).clone()
}

impl<V: Bindable> Bindable for HashMap<String, V> {
    fn type_ref() -> TypeRef {
        generic_type_ref::<Self>(|| {
            let capacity = ParamDescriptor::of::<i32>("capacity");

            TypeDescriptor::builder::<Self>(format!("HashMap<string, {}>", V::type_ref()))
                .constructor("with_capacity", vec![capacity], |args| {
                    let capacity = args.take::<i32>()?;
                    Ok(Self::with_capacity(usize::try_from(capacity)?))
                })
                .constructor("new", Vec::new(), |_| Ok(Self::new()))
                .with_dictionary(DictionaryImpl::new::<Self, V, _>(|map, key, value| {
                    insert_unique(map, key, value)
                }))
                .into_type_ref()
        })
    }

    fn from_value(_: Value) -> Result<Self, FromValueError> {
        Err(FromValueError::not_scalar::<Self>())
    }
}

impl<V: Bindable> Bindable for BTreeMap<String, V> {
    fn type_ref() -> TypeRef {
        generic_type_ref::<Self>(|| {
            TypeDescriptor::builder::<Self>(format!("BTreeMap<string, {}>", V::type_ref()))
                .constructor("new", Vec::new(), |_| Ok(Self::new()))
                .with_dictionary(DictionaryImpl::new::<Self, V, _>(|map, key, value| {
                    if map.contains_key(&key) {
                        return Err(
                            format!("an entry with key '{key}' has already been added").into()
                        );
                    }
                    map.insert(key, value);

                    Ok(())
                }))
                .into_type_ref()
        })
    }

    fn from_value(_: Value) -> Result<Self, FromValueError> {
        Err(FromValueError::not_scalar::<Self>())
    }
}
