use crate::{
    strategy::{
        StrategyError,
        nullability::{NullabilityOracle, Slot, non_nullable_reference},
    },
    types::{ConstructorDescriptor, MemberDescriptor, ParamDescriptor, TypeDescriptor, TypeRef},
    value::casefold,
};
use std::{
    collections::{BTreeMap, HashSet},
    sync::Arc,
};

///
/// BindableMember
///
/// One bindable slot of a POCO: a constructor parameter or a writable member.
/// Indices point into the strategy's own constructor and member lists.
///

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum BindableMember {
    Param { constructor: usize, position: usize },
    Member(usize),
}

///
/// PocoStrategy
///

#[derive(Clone, Debug)]
pub struct PocoStrategy {
    pub descriptor: Arc<TypeDescriptor>,
    constructors: Vec<ConstructorDescriptor>,
    members: Vec<MemberDescriptor>,
    name_mapping: BTreeMap<String, Vec<BindableMember>>,
    non_nullable: HashSet<BindableMember>,
}

impl PocoStrategy {
    pub fn resolve(ty: &TypeRef, oracle: &dyn NullabilityOracle) -> Result<Self, StrategyError> {
        let descriptor = match ty {
            TypeRef::Composite(descriptor) => descriptor,
            TypeRef::MapInterface { .. } | TypeRef::UntypedMap => {
                return Err(StrategyError::AbstractType { target: "POCO" });
            }
            other => {
                return Err(StrategyError::ScalarType {
                    ty: other.to_string(),
                });
            }
        };

        if descriptor.is_abstract() {
            return Err(StrategyError::AbstractType { target: "POCO" });
        }

        let constructors = descriptor
            .constructors()
            .iter()
            .filter(|constructor| constructor.public)
            .filter(|constructor| {
                constructor
                    .params
                    .iter()
                    .all(|param| param.name.is_some() && !param.by_ref)
            })
            .cloned()
            .collect::<Vec<_>>();
        if constructors.is_empty() && !descriptor.is_value_type() {
            return Err(StrategyError::NoPocoConstructor);
        }

        let members = descriptor
            .members()
            .iter()
            .filter(|member| member.is_writable())
            .cloned()
            .collect::<Vec<_>>();

        let mut name_mapping = BTreeMap::<String, Vec<BindableMember>>::new();
        for (c, constructor) in constructors.iter().enumerate() {
            for (position, param) in constructor.params.iter().enumerate() {
                name_mapping
                    .entry(casefold(param.name()).into_owned())
                    .or_default()
                    .push(BindableMember::Param {
                        constructor: c,
                        position,
                    });
            }
        }
        for (m, member) in members.iter().enumerate() {
            name_mapping
                .entry(casefold(&member.name).into_owned())
                .or_default()
                .push(BindableMember::Member(m));
        }
        if name_mapping.is_empty() {
            return Err(StrategyError::NoBindableMembers);
        }

        let mut strategy = Self {
            descriptor: Arc::clone(descriptor),
            constructors,
            members,
            name_mapping,
            non_nullable: HashSet::new(),
        };
        strategy.non_nullable = strategy
            .name_mapping
            .values()
            .flatten()
            .copied()
            .filter(|slot| non_nullable_reference(oracle, strategy.slot(*slot)))
            .collect();

        Ok(strategy)
    }

    #[must_use]
    pub fn constructors(&self) -> &[ConstructorDescriptor] {
        &self.constructors
    }

    #[must_use]
    pub fn members(&self) -> &[MemberDescriptor] {
        &self.members
    }

    /// Number of distinct case-insensitive names that can receive a column.
    #[must_use]
    pub fn name_count(&self) -> usize {
        self.name_mapping.len()
    }

    /// Bindable slots sharing `name`, compared case-insensitively.
    #[must_use]
    pub fn lookup(&self, name: &str) -> &[BindableMember] {
        self.name_mapping
            .get(casefold(name).as_ref())
            .map_or(&[][..], Vec::as_slice)
    }

    #[must_use]
    pub fn param(&self, constructor: usize, position: usize) -> &ParamDescriptor {
        &self.constructors[constructor].params[position]
    }

    #[must_use]
    pub fn is_non_nullable_reference(&self, slot: BindableMember) -> bool {
        self.non_nullable.contains(&slot)
    }

    fn slot(&self, slot: BindableMember) -> Slot<'_> {
        match slot {
            BindableMember::Param {
                constructor,
                position,
            } => Slot::Param(self.param(constructor, position)),
            BindableMember::Member(m) => Slot::Member(&self.members[m]),
        }
    }
}
