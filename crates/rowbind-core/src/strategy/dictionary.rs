use crate::{
    strategy::{
        StrategyError,
        nullability::{NullabilityOracle, Slot, non_nullable_reference},
    },
    types::{
        ConstructorDescriptor, DictionaryImpl, ParamDescriptor, Record, ScalarKind,
        TypeDescriptor, TypeRef,
    },
};
use std::sync::Arc;

///
/// ParamRole
///
/// How the binder fills one dictionary constructor parameter.
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ParamRole {
    /// `capacity: i32`; receives the number of bound columns.
    Capacity,
    /// A slot that accepts a string comparer.
    Comparer,
    /// Any other parameter with a default value.
    Defaulted,
}

impl ParamRole {
    fn classify(param: &ParamDescriptor) -> Option<Self> {
        if param.ty == TypeRef::Scalar(ScalarKind::I32) && param.name.as_deref() == Some("capacity")
        {
            Some(Self::Capacity)
        } else if matches!(param.ty, TypeRef::Comparer | TypeRef::Object) {
            Some(Self::Comparer)
        } else if param.has_default() {
            Some(Self::Defaulted)
        } else {
            None
        }
    }
}

///
/// DictionaryStrategy
///

#[derive(Clone, Debug)]
pub struct DictionaryStrategy {
    /// Concrete type that gets constructed; map interfaces resolve to `Record`.
    pub container: Arc<TypeDescriptor>,
    pub value: TypeRef,
    pub value_non_nullable_ref: bool,
    pub constructor: ConstructorDescriptor,
    pub roles: Vec<ParamRole>,
    pub dictionary: DictionaryImpl,
}

impl DictionaryStrategy {
    pub fn resolve(ty: &TypeRef, oracle: &dyn NullabilityOracle) -> Result<Self, StrategyError> {
        match ty {
            TypeRef::MapInterface { value, .. } => {
                Self::for_concrete(&Arc::new(Record::descriptor((**value).clone())), oracle)
            }
            TypeRef::UntypedMap => {
                Self::for_concrete(&Arc::new(Record::descriptor(TypeRef::Object)), oracle)
            }
            TypeRef::Composite(descriptor) if descriptor.is_interface() => {
                Err(StrategyError::UnsupportedInterface)
            }
            TypeRef::Composite(descriptor) => Self::for_concrete(descriptor, oracle),
            other => Err(StrategyError::ScalarType {
                ty: other.to_string(),
            }),
        }
    }

    fn for_concrete(
        descriptor: &Arc<TypeDescriptor>,
        oracle: &dyn NullabilityOracle,
    ) -> Result<Self, StrategyError> {
        if descriptor.is_abstract() {
            return Err(StrategyError::AbstractType {
                target: "dictionary",
            });
        }

        let dictionary = match descriptor.dictionaries() {
            [] => return Err(StrategyError::NotADictionary),
            [single] => single.clone(),
            many => {
                return Err(StrategyError::AmbiguousDictionary {
                    value_types: many
                        .iter()
                        .map(|dictionary| dictionary.value.to_string())
                        .collect::<Vec<_>>()
                        .join(", "),
                });
            }
        };

        let (constructor, roles) = select_constructor(descriptor.constructors())?;
        let value_non_nullable_ref =
            non_nullable_reference(oracle, Slot::DictionaryValue(&dictionary));

        Ok(Self {
            container: Arc::clone(descriptor),
            value: dictionary.value.clone(),
            value_non_nullable_ref,
            constructor: constructor.clone(),
            roles,
            dictionary,
        })
    }
}

/// Pick the public constructor whose parameters can all be filled, preferring
/// one that takes a comparer, then one that takes a capacity, then the
/// fewest parameters; the signature text breaks any remaining tie.
fn select_constructor(
    constructors: &[ConstructorDescriptor],
) -> Result<(&ConstructorDescriptor, Vec<ParamRole>), StrategyError> {
    let mut conflicting = None;

    let best = constructors
        .iter()
        .filter(|constructor| constructor.public)
        .filter_map(|constructor| {
            let roles = constructor
                .params
                .iter()
                .map(ParamRole::classify)
                .collect::<Option<Vec<_>>>()?;

            let count = |role| roles.iter().filter(|r| **r == role).count();
            if count(ParamRole::Capacity) > 1 || count(ParamRole::Comparer) > 1 {
                conflicting.get_or_insert_with(|| constructor.signature());
                return None;
            }

            Some((constructor, roles))
        })
        .min_by_key(|(constructor, roles)| {
            (
                !roles.contains(&ParamRole::Comparer),
                !roles.contains(&ParamRole::Capacity),
                roles.len(),
                constructor.signature(),
            )
        });

    match (best, conflicting) {
        (Some(best), _) => Ok(best),
        (None, Some(signature)) => Err(StrategyError::ConflictingConstructorParameters { signature }),
        (None, None) => Err(StrategyError::NoDictionaryConstructor),
    }
}
