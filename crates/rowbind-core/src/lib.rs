//! Core runtime for rowbind: type descriptors, scalar conversion, strategy
//! resolution, binding, column scheduling and the routine cache.
#![warn(unreachable_pub)]

extern crate self as rowbind;

// public exports are one module level down
pub mod bind;
pub mod cache;
pub mod config;
pub mod convert;
pub mod cursor;
pub mod error;
pub mod obs;
pub mod provider;
pub mod routine;
pub mod schedule;
pub mod schema;
pub mod strategy;
pub mod types;
pub mod value;

///
/// Prelude
///
/// Vocabulary needed to describe destinations and map rows. Errors and
/// internals stay in their modules.
///

pub mod prelude {
    pub use crate::{
        cursor::{MemoryCursor, RowCursor},
        provider::{ColumnSelection, MappingProvider},
        schema::RowSchema,
        types::{Bindable, ParamDescriptor, Record, TypeDescriptor, TypeRef},
        value::Value,
    };
}
