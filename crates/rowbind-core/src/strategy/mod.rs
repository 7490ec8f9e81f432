//! Strategy resolution: decides how a destination type accepts column values.
//!
//! A composite destination is tried as a dictionary first and as a POCO
//! second. When both are rejected the two diagnostics are reported together.

mod dictionary;
mod nullability;
mod poco;


use crate::{error::UnmappableTypeError, types::TypeRef};
use thiserror::Error as ThisError;

// re-exports
pub use dictionary::{DictionaryStrategy, ParamRole};
pub use nullability::{DeclaredNullability, NullabilityOracle, PermissiveNullability, Slot};
pub use poco::{BindableMember, PocoStrategy};

///
/// StrategyError
///

#[derive(Debug, ThisError)]
pub enum StrategyError {
    #[error(
        "Only interfaces Map<string, V>, ReadOnlyMap<string, V>, and Map can be mapped to dictionaries"
    )]
    UnsupportedInterface,

    #[error("An abstract type cannot be mapped to a {target}")]
    AbstractType { target: &'static str },

    #[error("Concrete types must implement Map<string, V> to be mapped to a dictionary")]
    NotADictionary,

    #[error(
        "Cannot be mapped to a dictionary because the type implements Map<string, V> for multiple types V ({value_types})"
    )]
    AmbiguousDictionary { value_types: String },

    #[error("Constructor {signature} declares more than one capacity or comparer parameter")]
    ConflictingConstructorParameters { signature: String },

    #[error(
        "To be mapped to a dictionary, a type must have a public constructor where each parameter is either (a) a capacity parameter, (b) a comparer parameter, or (c) a parameter with a default value"
    )]
    NoDictionaryConstructor,

    #[error(
        "To be mapped to a POCO, a reference type must have at least one public constructor with no unnamed or by-ref parameters"
    )]
    NoPocoConstructor,

    #[error(
        "To be mapped to a POCO a type must have at least one public constructor with parameters or at least one public writable property or field"
    )]
    NoBindableMembers,

    #[error("{ty} is not a composite type")]
    ScalarType { ty: String },
}

///
/// TypeMappingStrategy
///

#[derive(Clone, Debug)]
pub enum TypeMappingStrategy {
    Dictionary(DictionaryStrategy),
    Poco(PocoStrategy),
}

impl TypeMappingStrategy {
    /// Resolve the strategy for a composite destination.
    pub fn resolve(
        ty: &TypeRef,
        oracle: &dyn NullabilityOracle,
    ) -> Result<Self, UnmappableTypeError> {
        let dictionary = match DictionaryStrategy::resolve(ty, oracle) {
            Ok(strategy) => return Ok(Self::Dictionary(strategy)),
            Err(err) => err,
        };
        let poco = match PocoStrategy::resolve(ty, oracle) {
            Ok(strategy) => return Ok(Self::Poco(strategy)),
            Err(err) => err,
        };

        Err(UnmappableTypeError {
            destination: ty.to_string(),
            dictionary,
            poco,
        })
    }

    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Dictionary(_) => "dictionary",
            Self::Poco(_) => "POCO",
        }
    }
}
