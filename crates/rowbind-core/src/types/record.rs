use crate::{
    error::BoxError,
    types::{
        Bindable, DictionaryImpl, FromValueError, Nullability, ParamDescriptor, TypeDescriptor,
        TypeRef,
    },
    value::{KeyComparer, Value},
};
use std::{collections::HashMap, sync::OnceLock};

///
/// Record
///
/// Insertion-ordered string-keyed map of raw values. This is the concrete
/// type that map interfaces resolve to; keys compare through the comparer
/// supplied at construction.
///

#[derive(Clone, Debug, Default)]
pub struct Record {
    comparer: KeyComparer,
    entries: Vec<(String, Value)>,
    index: HashMap<String, usize>,
}

impl Record {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_comparer(comparer: KeyComparer) -> Self {
        Self {
            comparer,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_capacity(capacity: usize, comparer: KeyComparer) -> Self {
        Self {
            comparer,
            entries: Vec::with_capacity(capacity),
            index: HashMap::with_capacity(capacity),
        }
    }

    #[must_use]
    pub const fn comparer(&self) -> KeyComparer {
        self.comparer
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Add an entry; adding a key that is already present is an error.
    pub fn insert(&mut self, key: String, value: Value) -> Result<(), BoxError> {
        let folded = self.comparer.fold(&key).into_owned();
        if self.index.contains_key(&folded) {
            return Err(format!("an entry with key '{key}' has already been added").into());
        }

        self.index.insert(folded, self.entries.len());
        self.entries.push((key, value));

        Ok(())
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        let position = *self.index.get(self.comparer.fold(key).as_ref())?;

        self.entries.get(position).map(|(_, value)| value)
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(self.comparer.fold(key).as_ref())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    /// Descriptor of a `Record` whose slots hold values of `value`.
    #[must_use]
    pub fn descriptor(value: TypeRef) -> TypeDescriptor {
        let capacity = || ParamDescriptor::of::<i32>("capacity");
        let comparer = || ParamDescriptor::of::<KeyComparer>("comparer");

        TypeDescriptor::builder::<Self>(format!("Record<{value}>"))
            .constructor("with_capacity_and_comparer", vec![capacity(), comparer()], |args| {
                let capacity = usize::try_from(args.take::<i32>()?)?;
                Ok(Self::with_capacity(capacity, args.take()?))
            })
            .constructor("with_capacity", vec![capacity()], |args| {
                let capacity = usize::try_from(args.take::<i32>()?)?;
                Ok(Self::with_capacity(capacity, KeyComparer::Ordinal))
            })
            .constructor("with_comparer", vec![comparer()], |args| {
                Ok(Self::with_comparer(args.take()?))
            })
            .constructor("new", Vec::new(), |_| Ok(Self::new()))
            .with_dictionary(DictionaryImpl::raw::<Self, _>(
                value,
                Nullability::Unknown,
                |record, key, value| record.insert(key, value),
            ))
            .build()
    }
}

impl IntoIterator for Record {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl Bindable for Record {
    fn type_ref() -> TypeRef {
        static RECORD: OnceLock<TypeRef> = OnceLock::new();

        RECORD
            .get_or_init(|| TypeRef::Composite(Self::descriptor(TypeRef::Object).into()))
            .clone()
    }

    fn from_value(_: Value) -> Result<Self, FromValueError> {
        Err(FromValueError::not_scalar::<Self>())
    }
}
