//! ## Crate layout
//! - `core`: descriptors, conversion, strategy resolution, binding,
//!   scheduling, compiled routines and the provider that caches them.
//! - `derive`: `#[derive(Bindable)]`, which builds type descriptors at
//!   compile time.
//!
//! Everything in `core` is also re-exported at the root, so generated code
//! can refer to `::rowbind::types`.

pub use rowbind_core as core;
pub use rowbind_core::{
    bind, cache, config, convert, cursor, error, obs, provider, routine, schedule, schema,
    strategy, types, value,
};
pub use rowbind_derive::Bindable;

/// Workspace version re-export for downstream tooling/tests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

///
/// Prelude
///

pub mod prelude {
    pub use rowbind_core::prelude::*;
    pub use rowbind_derive::Bindable;
}
