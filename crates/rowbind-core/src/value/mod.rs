//! Runtime values flowing from a cursor through conversions into binding slots.

#[cfg(test)]
mod tests;

use crate::types::{ScalarKind, TypeRef};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use num_traits::ToPrimitive;
use rust_decimal::Decimal;
use std::{
    any::Any,
    borrow::Cow,
    fmt,
    sync::Arc,
};

///
/// Value
///

#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    I8(i8),
    U8(u8),
    I16(i16),
    U16(u16),
    I32(i32),
    U32(u32),
    I64(i64),
    U64(u64),
    F32(f32),
    F64(f64),
    Decimal(Decimal),
    Text(String),
    Blob(Vec<u8>),
    DateTime(DateTimeValue),
    Date(NaiveDate),
    TimeSpan(TimeDelta),
    TimeOfDay(NaiveTime),
    DateTimeOffset(DateTime<FixedOffset>),
    Enum(EnumValue),
    Comparer(KeyComparer),
    Opaque(OpaqueValue),
}

impl Value {
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub const fn scalar_kind(&self) -> Option<ScalarKind> {
        let kind = match self {
            Self::Bool(_) => ScalarKind::Bool,
            Self::I8(_) => ScalarKind::I8,
            Self::U8(_) => ScalarKind::U8,
            Self::I16(_) => ScalarKind::I16,
            Self::U16(_) => ScalarKind::U16,
            Self::I32(_) => ScalarKind::I32,
            Self::U32(_) => ScalarKind::U32,
            Self::I64(_) => ScalarKind::I64,
            Self::U64(_) => ScalarKind::U64,
            Self::F32(_) => ScalarKind::F32,
            Self::F64(_) => ScalarKind::F64,
            Self::Decimal(_) => ScalarKind::Decimal,
            Self::Text(_) => ScalarKind::Text,
            Self::Blob(_) => ScalarKind::Blob,
            Self::DateTime(_) => ScalarKind::DateTime,
            Self::Date(_) => ScalarKind::Date,
            Self::TimeSpan(_) => ScalarKind::TimeSpan,
            Self::TimeOfDay(_) => ScalarKind::TimeOfDay,
            Self::DateTimeOffset(_) => ScalarKind::DateTimeOffset,
            Self::Null | Self::Enum(_) | Self::Comparer(_) | Self::Opaque(_) => return None,
        };

        Some(kind)
    }

    /// Whether this value can occupy a slot of the given type without conversion.
    #[must_use]
    pub fn matches_type(&self, ty: &TypeRef) -> bool {
        match (self, ty) {
            (_, TypeRef::Object) => true,
            (Self::Null, TypeRef::Nullable(_)) => true,
            (_, TypeRef::Nullable(inner)) => self.matches_type(inner),
            (Self::Null, _) => ty.can_be_null(),
            (Self::Enum(value), TypeRef::Enum(enum_type)) => *value.path == *enum_type.path,
            (Self::Opaque(value), TypeRef::Custom(custom)) => *value.type_path == *custom.path,
            (Self::Comparer(_), TypeRef::Comparer) => true,
            (_, TypeRef::Scalar(kind)) => self.scalar_kind() == Some(*kind),
            _ => false,
        }
    }

    /// Numeric view used by the converter; `None` for non-numeric values.
    #[must_use]
    pub fn as_numeric(&self) -> Option<&dyn ToPrimitive> {
        match self {
            Self::I8(v) => Some(v),
            Self::U8(v) => Some(v),
            Self::I16(v) => Some(v),
            Self::U16(v) => Some(v),
            Self::I32(v) => Some(v),
            Self::U32(v) => Some(v),
            Self::I64(v) => Some(v),
            Self::U64(v) => Some(v),
            Self::F32(v) => Some(v),
            Self::F64(v) => Some(v),
            Self::Decimal(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::I8(v) => write!(f, "{v}"),
            Self::U8(v) => write!(f, "{v}"),
            Self::I16(v) => write!(f, "{v}"),
            Self::U16(v) => write!(f, "{v}"),
            Self::I32(v) => write!(f, "{v}"),
            Self::U32(v) => write!(f, "{v}"),
            Self::I64(v) => write!(f, "{v}"),
            Self::U64(v) => write!(f, "{v}"),
            Self::F32(v) => write!(f, "{v}"),
            Self::F64(v) => write!(f, "{v}"),
            Self::Decimal(v) => write!(f, "{v}"),
            Self::Text(v) => write!(f, "'{v}'"),
            Self::Blob(v) => write!(f, "<{} bytes>", v.len()),
            Self::DateTime(v) => write!(f, "{} ({:?})", v.naive, v.kind),
            Self::Date(v) => write!(f, "{v}"),
            Self::TimeSpan(v) => write!(f, "{v}"),
            Self::TimeOfDay(v) => write!(f, "{v}"),
            Self::DateTimeOffset(v) => write!(f, "{v}"),
            Self::Enum(v) => write!(f, "{}({})", v.path, v.raw),
            Self::Comparer(v) => write!(f, "{v:?}"),
            Self::Opaque(v) => write!(f, "<{}>", v.type_path),
        }
    }
}

macro_rules! impl_from_for {
    ( $( $type:ty => $variant:ident ),* $(,)? ) => {
        $(
            impl From<$type> for Value {
                fn from(v: $type) -> Self {
                    Self::$variant(v.into())
                }
            }
        )*
    };
}

impl_from_for! {
    bool          => Bool,
    i8            => I8,
    u8            => U8,
    i16           => I16,
    u16           => U16,
    i32           => I32,
    u32           => U32,
    i64           => I64,
    u64           => U64,
    f32           => F32,
    f64           => F64,
    Decimal       => Decimal,
    &str          => Text,
    String        => Text,
    Vec<u8>       => Blob,
    DateTimeValue => DateTime,
    NaiveDate     => Date,
    TimeDelta     => TimeSpan,
    NaiveTime     => TimeOfDay,
    DateTime<FixedOffset> => DateTimeOffset,
    EnumValue     => Enum,
    KeyComparer   => Comparer,
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

///
/// DateTimeKind
///
/// Which clock a naive timestamp was recorded against.
///

#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum DateTimeKind {
    #[default]
    Unspecified,
    Utc,
    Local,
}

///
/// DateTimeValue
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct DateTimeValue {
    pub naive: NaiveDateTime,
    pub kind: DateTimeKind,
}

impl DateTimeValue {
    #[must_use]
    pub const fn new(naive: NaiveDateTime, kind: DateTimeKind) -> Self {
        Self { naive, kind }
    }

    #[must_use]
    pub const fn unspecified(naive: NaiveDateTime) -> Self {
        Self::new(naive, DateTimeKind::Unspecified)
    }
}

///
/// EnumValue
///
/// A validated enum value; `raw` is the underlying numeric value.
///

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct EnumValue {
    pub path: Arc<str>,
    pub raw: i128,
}

impl EnumValue {
    #[must_use]
    pub fn new(path: &str, raw: i128) -> Self {
        Self {
            path: Arc::from(path),
            raw,
        }
    }
}

///
/// KeyComparer
///
/// String key comparison handed to dictionary constructors.
///

#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum KeyComparer {
    #[default]
    Ordinal,
    OrdinalIgnoreCase,
}

impl KeyComparer {
    /// Fold a key into the form used for equality under this comparer.
    #[must_use]
    pub fn fold<'a>(self, key: &'a str) -> Cow<'a, str> {
        match self {
            Self::Ordinal => Cow::Borrowed(key),
            Self::OrdinalIgnoreCase => casefold(key),
        }
    }

    #[must_use]
    pub fn eq(self, left: &str, right: &str) -> bool {
        self.fold(left) == self.fold(right)
    }
}

/// Case-insensitive key folding with an ASCII fast path.
#[must_use]
pub fn casefold(s: &str) -> Cow<'_, str> {
    if s.is_ascii() {
        if s.bytes().any(|b| b.is_ascii_uppercase()) {
            return Cow::Owned(s.to_ascii_lowercase());
        }
        return Cow::Borrowed(s);
    }

    Cow::Owned(s.to_lowercase())
}

///
/// OpaqueValue
///
/// Value of a custom scalar type, produced by its implicit conversions.
///

#[derive(Clone)]
pub struct OpaqueValue {
    pub type_path: Arc<str>,
    inner: Arc<dyn Any + Send + Sync>,
}

impl OpaqueValue {
    #[must_use]
    pub fn new<T: Any + Send + Sync>(type_path: &str, inner: T) -> Self {
        Self {
            type_path: Arc::from(type_path),
            inner: Arc::new(inner),
        }
    }

    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref()
    }
}

impl fmt::Debug for OpaqueValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpaqueValue")
            .field("type_path", &self.type_path)
            .finish_non_exhaustive()
    }
}

impl PartialEq for OpaqueValue {
    fn eq(&self, other: &Self) -> bool {
        self.type_path == other.type_path && Arc::ptr_eq(&self.inner, &other.inner)
    }
}
