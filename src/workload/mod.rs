//! Statements, their join graphs and the weighted workload they form.

mod statement;
pub use statement::*;
mod query_graph;
pub use query_graph::*;
mod builder;
pub use builder::*;
mod mixes;
pub use mixes::*;
