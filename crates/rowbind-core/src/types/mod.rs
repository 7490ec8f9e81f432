//! Type identities for binding slots and source columns.
//!
//! `TypeRef` is the hashable identity used in every cache key. Named types
//! (enums, custom scalars, composites) compare by path, so a path must be
//! registered at most once per process.

mod bindable;
mod descriptor;
mod record;
mod scalar;


use crate::{error::BoxError, value::Value};
use std::{
    fmt,
    hash::{Hash, Hasher},
    sync::Arc,
};

// re-exports
pub use bindable::{Args, Bindable, FromValueError};
pub use descriptor::{
    ConstructorDescriptor, DictionaryImpl, Instance, MemberDescriptor, MemberKind, Nullability,
    ParamDescriptor, TypeBuilder, TypeDescriptor,
};
pub use record::Record;
pub use scalar::{NumericClass, NumericFacts, ScalarKind};

///
/// TypeRef
///

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum TypeRef {
    /// Accepts any value without conversion.
    Object,
    Scalar(ScalarKind),
    Nullable(Box<Self>),
    Enum(Arc<EnumType>),
    Custom(Arc<CustomType>),
    /// String key comparer handed to dictionary constructors.
    Comparer,
    /// String-keyed map interface with a typed value slot.
    MapInterface { read_only: bool, value: Box<Self> },
    /// String-keyed map interface without a value type.
    UntypedMap,
    Composite(Arc<TypeDescriptor>),
}

impl TypeRef {
    #[must_use]
    pub fn of<T: Bindable>() -> Self {
        T::type_ref()
    }

    #[must_use]
    pub const fn scalar(kind: ScalarKind) -> Self {
        Self::Scalar(kind)
    }

    /// Wrap a value type in `Nullable`; reference types already admit null.
    #[must_use]
    pub fn nullable(inner: Self) -> Self {
        if inner.is_value_type() && !inner.is_nullable() {
            Self::Nullable(Box::new(inner))
        } else {
            inner
        }
    }

    #[must_use]
    pub fn map_interface(value: Self) -> Self {
        Self::MapInterface {
            read_only: false,
            value: Box::new(value),
        }
    }

    #[must_use]
    pub fn read_only_map_interface(value: Self) -> Self {
        Self::MapInterface {
            read_only: true,
            value: Box::new(value),
        }
    }

    #[must_use]
    pub const fn is_nullable(&self) -> bool {
        matches!(self, Self::Nullable(_))
    }

    #[must_use]
    pub fn nullable_inner(&self) -> Option<&Self> {
        match self {
            Self::Nullable(inner) => Some(inner),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_scalar(&self) -> Option<ScalarKind> {
        match self {
            Self::Scalar(kind) => Some(*kind),
            _ => None,
        }
    }

    #[must_use]
    pub const fn numeric(&self) -> Option<NumericFacts> {
        match self {
            Self::Scalar(kind) => kind.numeric(),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_value_type(&self) -> bool {
        match self {
            Self::Scalar(kind) => kind.is_value_type(),
            Self::Nullable(_) | Self::Enum(_) => true,
            Self::Custom(custom) => custom.value_type,
            Self::Composite(descriptor) => descriptor.is_value_type(),
            Self::Object | Self::Comparer | Self::MapInterface { .. } | Self::UntypedMap => false,
        }
    }

    /// Whether a slot of this type can hold null at all.
    #[must_use]
    pub fn can_be_null(&self) -> bool {
        self.is_nullable() || !self.is_value_type()
    }

    /// Scalar-like destinations bind from exactly one column.
    #[must_use]
    pub fn is_scalar_like(&self) -> bool {
        match self {
            Self::Scalar(_) | Self::Enum(_) | Self::Custom(_) => true,
            Self::Nullable(inner) => inner.is_scalar_like(),
            _ => false,
        }
    }

    #[must_use]
    pub fn as_composite(&self) -> Option<&Arc<TypeDescriptor>> {
        match self {
            Self::Composite(descriptor) => Some(descriptor),
            _ => None,
        }
    }
}

impl From<ScalarKind> for TypeRef {
    fn from(kind: ScalarKind) -> Self {
        Self::Scalar(kind)
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Object => f.write_str("object"),
            Self::Scalar(kind) => f.write_str(kind.label()),
            Self::Nullable(inner) => write!(f, "Nullable<{inner}>"),
            Self::Enum(enum_type) => f.write_str(&enum_type.path),
            Self::Custom(custom) => f.write_str(&custom.path),
            Self::Comparer => f.write_str("StringComparer"),
            Self::MapInterface {
                read_only: false,
                value,
            } => write!(f, "dyn Map<string, {value}>"),
            Self::MapInterface {
                read_only: true,
                value,
            } => write!(f, "dyn ReadOnlyMap<string, {value}>"),
            Self::UntypedMap => f.write_str("dyn Map"),
            Self::Composite(descriptor) => f.write_str(descriptor.path()),
        }
    }
}

///
/// EnumType
///
/// Enum identity plus its defined members. Member values are stored in the
/// widest signed domain; the underlying kind decides how flags are combined.
///

#[derive(Debug)]
pub struct EnumType {
    pub path: String,
    pub underlying: ScalarKind,
    pub flags: bool,
    pub members: Vec<(String, i128)>,
}

impl EnumType {
    #[must_use]
    pub fn new(path: impl Into<String>, underlying: ScalarKind) -> Self {
        debug_assert!(underlying.is_integral(), "enum underlying type must be integral");

        Self {
            path: path.into(),
            underlying,
            flags: false,
            members: Vec::new(),
        }
    }

    #[must_use]
    pub const fn flags(mut self) -> Self {
        self.flags = true;
        self
    }

    #[must_use]
    pub fn member(mut self, name: impl Into<String>, value: i128) -> Self {
        self.members.push((name.into(), value));
        self
    }
}

impl PartialEq for EnumType {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
    }
}

impl Eq for EnumType {}

impl Hash for EnumType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.path.hash(state);
    }
}

///
/// ImplicitConversion
///
/// A user-declared conversion operator between a custom type and another type.
///

pub type ConvertFn = Arc<dyn Fn(Value) -> Result<Value, BoxError> + Send + Sync>;

#[derive(Clone)]
pub struct ImplicitConversion {
    pub from: TypeRef,
    pub to: TypeRef,
    pub apply: ConvertFn,
}

impl fmt::Debug for ImplicitConversion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImplicitConversion")
            .field("from", &self.from)
            .field("to", &self.to)
            .finish_non_exhaustive()
    }
}

///
/// CustomType
///
/// Opaque scalar type known only through its implicit conversions.
///

#[derive(Debug)]
pub struct CustomType {
    pub path: String,
    pub value_type: bool,
    pub conversions: Vec<ImplicitConversion>,
}

impl CustomType {
    #[must_use]
    pub fn new(path: impl Into<String>, value_type: bool) -> Self {
        Self {
            path: path.into(),
            value_type,
            conversions: Vec::new(),
        }
    }

    #[must_use]
    pub fn implicit(
        mut self,
        from: TypeRef,
        to: TypeRef,
        apply: impl Fn(Value) -> Result<Value, BoxError> + Send + Sync + 'static,
    ) -> Self {
        self.conversions.push(ImplicitConversion {
            from,
            to,
            apply: Arc::new(apply),
        });
        self
    }

    #[must_use]
    pub fn find_implicit(&self, from: &TypeRef, to: &TypeRef) -> Option<&ImplicitConversion> {
        self.conversions
            .iter()
            .find(|conversion| &conversion.from == from && &conversion.to == to)
    }
}

impl PartialEq for CustomType {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
    }
}

impl Eq for CustomType {}

impl Hash for CustomType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.path.hash(state);
    }
}
