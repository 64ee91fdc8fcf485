//! Entity-relationship model the advisor reasons over.
//!
//! A model is an immutable arena of entities and fields. Foreign keys form a directed graph
//! (child entity to referenced entity) which may contain cycles; traversal always treats the
//! edges as bidirectional and tracks visited entities explicitly.

mod entity;
pub use entity::*;
mod field;
pub use field::*;
mod graph;
pub use graph::*;
mod builder;
pub use builder::*;
