use crate::types::{DictionaryImpl, MemberDescriptor, Nullability, ParamDescriptor, TypeRef};

///
/// Slot
///
/// A destination slot whose declared nullability is being asked about.
///

#[derive(Clone, Copy, Debug)]
pub enum Slot<'a> {
    Param(&'a ParamDescriptor),
    Member(&'a MemberDescriptor),
    DictionaryValue(&'a DictionaryImpl),
}

impl Slot<'_> {
    #[must_use]
    pub const fn ty(&self) -> &TypeRef {
        match self {
            Self::Param(param) => &param.ty,
            Self::Member(member) => &member.ty,
            Self::DictionaryValue(dictionary) => &dictionary.value,
        }
    }

    #[must_use]
    pub const fn declared(&self) -> Nullability {
        match self {
            Self::Param(param) => param.nullability,
            Self::Member(member) => member.nullability,
            Self::DictionaryValue(dictionary) => dictionary.value_nullability,
        }
    }
}

///
/// NullabilityOracle
///
/// Answers whether a reference-typed slot is declared non-nullable. Anything
/// the oracle cannot determine must answer `false`, which keeps null
/// permitted.
///

pub trait NullabilityOracle: Send + Sync {
    fn is_non_nullable_reference(&self, slot: Slot<'_>) -> bool;
}

///
/// DeclaredNullability
///
/// Default oracle: trusts the nullability recorded on the descriptor.
///

#[derive(Clone, Copy, Debug, Default)]
pub struct DeclaredNullability;

impl NullabilityOracle for DeclaredNullability {
    fn is_non_nullable_reference(&self, slot: Slot<'_>) -> bool {
        slot.ty().can_be_null()
            && !slot.ty().is_nullable()
            && slot.declared() == Nullability::NonNullable
    }
}

///
/// PermissiveNullability
///
/// Oracle that never reports a non-nullable slot.
///

#[derive(Clone, Copy, Debug, Default)]
pub struct PermissiveNullability;

impl NullabilityOracle for PermissiveNullability {
    fn is_non_nullable_reference(&self, _: Slot<'_>) -> bool {
        false
    }
}

/// Ask the oracle, but only about reference-typed slots.
pub(crate) fn non_nullable_reference(oracle: &dyn NullabilityOracle, slot: Slot<'_>) -> bool {
    !slot.ty().is_value_type() && oracle.is_non_nullable_reference(slot)
}
