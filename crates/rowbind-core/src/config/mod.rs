//! Provider configuration.

#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

///
/// ConfigError
///

#[derive(Debug, Eq, PartialEq, ThisError)]
pub enum ConfigError {
    #[error("{field} must be greater than zero")]
    ZeroCapacity { field: &'static str },
}

///
/// MappingConfig
///
/// Cache capacities for one `MappingProvider`. Missing fields fall back to
/// their defaults when deserializing.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct MappingConfig {
    pub routine_cache_capacity: usize,
    pub conversion_cache_capacity: usize,
    pub enum_cache_capacity: usize,
}

impl MappingConfig {
    pub const DEFAULT_ROUTINE_CACHE_CAPACITY: usize = 10_000;
    pub const DEFAULT_CONVERSION_CACHE_CAPACITY: usize = 5_000;
    pub const DEFAULT_ENUM_CACHE_CAPACITY: usize = 1_000;

    pub const fn validate(&self) -> Result<(), ConfigError> {
        if self.routine_cache_capacity == 0 {
            return Err(ConfigError::ZeroCapacity {
                field: "routine_cache_capacity",
            });
        }
        if self.conversion_cache_capacity == 0 {
            return Err(ConfigError::ZeroCapacity {
                field: "conversion_cache_capacity",
            });
        }
        if self.enum_cache_capacity == 0 {
            return Err(ConfigError::ZeroCapacity {
                field: "enum_cache_capacity",
            });
        }

        Ok(())
    }
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            routine_cache_capacity: Self::DEFAULT_ROUTINE_CACHE_CAPACITY,
            conversion_cache_capacity: Self::DEFAULT_CONVERSION_CACHE_CAPACITY,
            enum_cache_capacity: Self::DEFAULT_ENUM_CACHE_CAPACITY,
        }
    }
}
