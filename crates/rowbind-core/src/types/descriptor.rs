//! Explicit type descriptors: the constructors, members and dictionary
//! implementations a destination type exposes to the binder.

use crate::{
    error::BoxError,
    types::{Args, Bindable, FromValueError, TypeRef},
    value::Value,
};
use std::{
    any::{Any, type_name},
    fmt,
    hash::{Hash, Hasher},
    sync::Arc,
};

/// A constructed destination value.
pub type Instance = Box<dyn Any + Send>;

pub(crate) type InvokeFn = Arc<dyn Fn(Args) -> Result<Instance, BoxError> + Send + Sync>;
pub(crate) type SetFn = Arc<dyn Fn(&mut (dyn Any + Send), Value) -> Result<(), BoxError> + Send + Sync>;
pub(crate) type AddFn =
    Arc<dyn Fn(&mut (dyn Any + Send), String, Value) -> Result<(), BoxError> + Send + Sync>;
pub(crate) type DefaultFn = Arc<dyn Fn() -> Instance + Send + Sync>;

///
/// Nullability
///
/// Declared nullability annotation of a slot. Only meaningful for reference
/// types; value types are governed by `TypeRef::can_be_null`.
///

#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum Nullability {
    #[default]
    Unknown,
    Nullable,
    NonNullable,
}

impl Nullability {
    #[must_use]
    pub const fn of<T: Bindable>() -> Self {
        if T::NULLABLE {
            Self::Nullable
        } else {
            Self::NonNullable
        }
    }
}

///
/// ParamDescriptor
///

#[derive(Clone, Debug)]
pub struct ParamDescriptor {
    pub name: Option<String>,
    pub ty: TypeRef,
    pub default: Option<Value>,
    pub by_ref: bool,
    pub nullability: Nullability,
}

impl ParamDescriptor {
    #[must_use]
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: Some(name.into()),
            ty,
            default: None,
            by_ref: false,
            nullability: Nullability::Unknown,
        }
    }

    /// Parameter typed from a `Bindable` Rust type, carrying its nullability.
    #[must_use]
    pub fn of<T: Bindable>(name: impl Into<String>) -> Self {
        Self {
            nullability: Nullability::of::<T>(),
            ..Self::new(name, T::type_ref())
        }
    }

    #[must_use]
    pub fn unnamed(ty: TypeRef) -> Self {
        Self {
            name: None,
            ..Self::new(String::new(), ty)
        }
    }

    #[must_use]
    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    #[must_use]
    pub const fn by_ref(mut self) -> Self {
        self.by_ref = true;
        self
    }

    #[must_use]
    pub const fn with_nullability(mut self, nullability: Nullability) -> Self {
        self.nullability = nullability;
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or("<unnamed>")
    }

    #[must_use]
    pub const fn has_default(&self) -> bool {
        self.default.is_some()
    }
}

///
/// ConstructorDescriptor
///

#[derive(Clone)]
pub struct ConstructorDescriptor {
    pub label: String,
    pub public: bool,
    pub params: Vec<ParamDescriptor>,
    invoke: InvokeFn,
}

impl ConstructorDescriptor {
    pub fn new<T, F>(label: impl Into<String>, params: Vec<ParamDescriptor>, invoke: F) -> Self
    where
        T: Send + 'static,
        F: Fn(&mut Args) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        Self {
            label: label.into(),
            public: true,
            params,
            invoke: Arc::new(move |mut args: Args| {
                invoke(&mut args).map(|value| Box::new(value) as Instance)
            }),
        }
    }

    #[must_use]
    pub const fn non_public(mut self) -> Self {
        self.public = false;
        self
    }

    pub fn invoke(&self, args: Vec<Value>) -> Result<Instance, BoxError> {
        (self.invoke)(Args::new(args))
    }

    /// Signature text used in diagnostics and deterministic tiebreaks.
    #[must_use]
    pub fn signature(&self) -> String {
        let params = self
            .params
            .iter()
            .map(|param| format!("{} {}", param.ty, param.name()))
            .collect::<Vec<_>>()
            .join(", ");

        format!("{}({params})", self.label)
    }
}

impl fmt::Debug for ConstructorDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstructorDescriptor")
            .field("label", &self.label)
            .field("public", &self.public)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

///
/// MemberKind
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum MemberKind {
    Property,
    Field,
}

///
/// MemberDescriptor
///

#[derive(Clone)]
pub struct MemberDescriptor {
    pub name: String,
    pub kind: MemberKind,
    pub ty: TypeRef,
    pub public: bool,
    pub init_only: bool,
    pub indexer: bool,
    pub nullability: Nullability,
    setter: Option<SetFn>,
}

impl MemberDescriptor {
    fn typed<T, V, F>(name: impl Into<String>, kind: MemberKind, set: F) -> Self
    where
        T: Send + 'static,
        V: Bindable,
        F: Fn(&mut T, V) + Send + Sync + 'static,
    {
        let setter: SetFn = Arc::new(move |target: &mut (dyn Any + Send), value: Value| {
            let target = target
                .downcast_mut::<T>()
                .ok_or_else(|| FromValueError::instance_mismatch(type_name::<T>()))?;
            set(target, V::from_value(value)?);

            Ok(())
        });

        Self {
            name: name.into(),
            kind,
            ty: V::type_ref(),
            public: true,
            init_only: false,
            indexer: false,
            nullability: Nullability::of::<V>(),
            setter: Some(setter),
        }
    }

    /// A member with no setter; visible to callers but never bindable.
    #[must_use]
    pub fn read_only(name: impl Into<String>, kind: MemberKind, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            kind,
            ty,
            public: true,
            init_only: false,
            indexer: false,
            nullability: Nullability::Unknown,
            setter: None,
        }
    }

    #[must_use]
    pub const fn non_public(mut self) -> Self {
        self.public = false;
        self
    }

    #[must_use]
    pub const fn init_only(mut self) -> Self {
        self.init_only = true;
        self
    }

    #[must_use]
    pub const fn indexer(mut self) -> Self {
        self.indexer = true;
        self
    }

    #[must_use]
    pub const fn with_nullability(mut self, nullability: Nullability) -> Self {
        self.nullability = nullability;
        self
    }

    #[must_use]
    pub const fn is_writable(&self) -> bool {
        self.public && self.setter.is_some() && !self.init_only && !self.indexer
    }

    pub(crate) fn set(&self, target: &mut (dyn Any + Send), value: Value) -> Result<(), BoxError> {
        match &self.setter {
            Some(setter) => setter(target, value),
            None => Err(format!("member '{}' has no setter", self.name).into()),
        }
    }
}

impl fmt::Debug for MemberDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemberDescriptor")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("ty", &self.ty)
            .field("writable", &self.is_writable())
            .finish_non_exhaustive()
    }
}

///
/// DictionaryImpl
///
/// One string-keyed dictionary implementation exposed by a type.
///

#[derive(Clone)]
pub struct DictionaryImpl {
    pub value: TypeRef,
    pub value_nullability: Nullability,
    add: AddFn,
}

impl DictionaryImpl {
    pub fn new<T, V, F>(add: F) -> Self
    where
        T: Send + 'static,
        V: Bindable,
        F: Fn(&mut T, String, V) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        let add: AddFn = Arc::new(
            move |target: &mut (dyn Any + Send), key: String, value: Value| {
                let target = target
                    .downcast_mut::<T>()
                    .ok_or_else(|| FromValueError::instance_mismatch(type_name::<T>()))?;

                add(target, key, V::from_value(value)?)
            },
        );

        Self {
            value: V::type_ref(),
            value_nullability: Nullability::of::<V>(),
            add,
        }
    }

    /// Untyped implementation storing raw values for a declared value type.
    pub(crate) fn raw<T, F>(value: TypeRef, nullability: Nullability, add: F) -> Self
    where
        T: Send + 'static,
        F: Fn(&mut T, String, Value) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        let add: AddFn = Arc::new(
            move |target: &mut (dyn Any + Send), key: String, value: Value| {
                let target = target
                    .downcast_mut::<T>()
                    .ok_or_else(|| FromValueError::instance_mismatch(type_name::<T>()))?;

                add(target, key, value)
            },
        );

        Self {
            value,
            value_nullability: nullability,
            add,
        }
    }

    pub(crate) fn add(
        &self,
        target: &mut (dyn Any + Send),
        key: String,
        value: Value,
    ) -> Result<(), BoxError> {
        (self.add)(target, key, value)
    }
}

impl fmt::Debug for DictionaryImpl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DictionaryImpl")
            .field("value", &self.value)
            .field("value_nullability", &self.value_nullability)
            .finish_non_exhaustive()
    }
}

///
/// TypeDescriptor
///
/// Everything the strategy resolver and binder know about a destination type.
///

#[derive(Clone)]
pub struct TypeDescriptor {
    path: String,
    is_abstract: bool,
    is_interface: bool,
    constructors: Vec<ConstructorDescriptor>,
    members: Vec<MemberDescriptor>,
    dictionaries: Vec<DictionaryImpl>,
    default_init: Option<DefaultFn>,
}

impl TypeDescriptor {
    #[must_use]
    pub fn builder<T: Send + 'static>(path: impl Into<String>) -> TypeBuilder<T> {
        TypeBuilder::new(path.into())
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub const fn is_abstract(&self) -> bool {
        self.is_abstract
    }

    #[must_use]
    pub const fn is_interface(&self) -> bool {
        self.is_interface
    }

    /// Value types can be default-initialized without a constructor.
    #[must_use]
    pub const fn is_value_type(&self) -> bool {
        self.default_init.is_some()
    }

    #[must_use]
    pub fn constructors(&self) -> &[ConstructorDescriptor] {
        &self.constructors
    }

    #[must_use]
    pub fn members(&self) -> &[MemberDescriptor] {
        &self.members
    }

    #[must_use]
    pub fn dictionaries(&self) -> &[DictionaryImpl] {
        &self.dictionaries
    }

    pub(crate) fn default_init(&self) -> Option<Instance> {
        self.default_init.as_ref().map(|init| init())
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("path", &self.path)
            .field("is_abstract", &self.is_abstract)
            .field("is_interface", &self.is_interface)
            .field("is_value_type", &self.is_value_type())
            .field("constructors", &self.constructors)
            .field("members", &self.members)
            .field("dictionaries", &self.dictionaries)
            .finish()
    }
}

impl PartialEq for TypeDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
    }
}

impl Eq for TypeDescriptor {}

impl Hash for TypeDescriptor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.path.hash(state);
    }
}

///
/// TypeBuilder
///
/// Registration API producing a `TypeDescriptor` from typed closures.
///

pub struct TypeBuilder<T> {
    descriptor: TypeDescriptor,
    _marker: std::marker::PhantomData<fn() -> T>,
}

impl<T: Send + 'static> TypeBuilder<T> {
    fn new(path: String) -> Self {
        Self {
            descriptor: TypeDescriptor {
                path,
                is_abstract: false,
                is_interface: false,
                constructors: Vec::new(),
                members: Vec::new(),
                dictionaries: Vec::new(),
                default_init: None,
            },
            _marker: std::marker::PhantomData,
        }
    }

    #[must_use]
    pub const fn abstract_type(mut self) -> Self {
        self.descriptor.is_abstract = true;
        self
    }

    #[must_use]
    pub const fn interface(mut self) -> Self {
        self.descriptor.is_interface = true;
        self.descriptor.is_abstract = true;
        self
    }

    /// Mark the type as a value type, default-initialized through `Default`.
    #[must_use]
    pub fn value_type(mut self) -> Self
    where
        T: Default,
    {
        self.descriptor.default_init = Some(Arc::new(|| Box::new(T::default()) as Instance));
        self
    }

    #[must_use]
    pub fn constructor<F>(self, label: &str, params: Vec<ParamDescriptor>, invoke: F) -> Self
    where
        F: Fn(&mut Args) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        self.with_constructor(ConstructorDescriptor::new(label, params, invoke))
    }

    #[must_use]
    pub fn with_constructor(mut self, constructor: ConstructorDescriptor) -> Self {
        self.descriptor.constructors.push(constructor);
        self
    }

    #[must_use]
    pub fn property<V, F>(self, name: &str, set: F) -> Self
    where
        V: Bindable,
        F: Fn(&mut T, V) + Send + Sync + 'static,
    {
        self.with_member(MemberDescriptor::typed::<T, V, F>(
            name,
            MemberKind::Property,
            set,
        ))
    }

    #[must_use]
    pub fn field<V, F>(self, name: &str, set: F) -> Self
    where
        V: Bindable,
        F: Fn(&mut T, V) + Send + Sync + 'static,
    {
        self.with_member(MemberDescriptor::typed::<T, V, F>(name, MemberKind::Field, set))
    }

    #[must_use]
    pub fn with_member(mut self, member: MemberDescriptor) -> Self {
        self.descriptor.members.push(member);
        self
    }

    #[must_use]
    pub fn dictionary<V, F>(mut self, add: F) -> Self
    where
        V: Bindable,
        F: Fn(&mut T, String, V) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.descriptor
            .dictionaries
            .push(DictionaryImpl::new::<T, V, F>(add));
        self
    }

    #[must_use]
    pub fn with_dictionary(mut self, dictionary: DictionaryImpl) -> Self {
        self.descriptor.dictionaries.push(dictionary);
        self
    }

    #[must_use]
    pub fn build(self) -> TypeDescriptor {
        self.descriptor
    }

    /// Build straight into a composite `TypeRef`.
    #[must_use]
    pub fn into_type_ref(self) -> TypeRef {
        TypeRef::Composite(Arc::new(self.build()))
    }
}
