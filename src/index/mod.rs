//! Denormalized indexes and the enumeration of candidates for a workload.

#[allow(clippy::module_inception)]
mod index;
pub use index::*;
mod enumerator;
pub use enumerator::*;
