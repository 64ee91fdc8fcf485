//! ## Background
//!
//! A NoSQL store answers a query efficiently only when some index already holds the query's
//! answer under the key the query binds. There are no joins at query time, so the schema itself
//! has to be designed around the workload: data is denormalized into column families (indexes)
//! that follow the foreign key paths queries traverse. Choosing those indexes by hand does not
//! scale past a handful of queries, and every extra index slows down writes and costs storage.
//!
//! This crate recommends a set of indexes for a workload of weighted queries and writes over an
//! entity-relationship model. The approach follows the NoSE schema advisor [1]: enumerate every
//! index that could help some statement, plan each statement over the candidates with a cost
//! model, then search for a selection that minimizes the weighted workload cost within a storage
//! budget. Like cost based query optimizers [2], planning searches the space of plans and prices
//! each one; unlike them, the plan space here is the index set itself.
//!
//! ## Design
//!
//! ### Model and workload
//!
//! [`model::Model`] is an immutable arena of entities and fields whose foreign keys form a graph.
//! [`workload::Workload`] holds parsed statements and their weights, grouped in named mixes.
//! Both are built once and passed by reference to everything else.
//!
//! ### Enumeration
//!
//! [`index::IndexEnumerator`] derives candidates from every statement: the fields a statement
//! binds with equality become hash fields, range and order by fields become order fields and the
//! remaining needed fields become payload, for every sub-path of the statement's join graph.
//!
//! ### Planning
//!
//! [`planner::Planner`] runs a depth first branch and bound search over lookups of the available
//! indexes along a query's lookup path. A [`cost::CostModel`] prices every lookup and every
//! index write; writes are planned as a support query locating the rows followed by the
//! maintenance of every affected index.
//!
//! ### Search
//!
//! [`search::Search`] seeds a selection with the indexes of the cheapest plans, then merges
//! compatible indexes until a fixed point, the way a heuristic optimizer applies rules until the
//! plan no longer changes. If the selection still exceeds the budget, indexes are dropped as long
//! as every statement keeps a plan.
//!
//! ## Reference
//!
//! 1. Mior, M. J., Salem, K., Aboulnaga, A., and Liu, R. "NoSE: Schema design for NoSQL
//! applications." IEEE Transactions on Knowledge and Data Engineering 29.10 (2017): 2275-2289.
//! 2. Graefe, G., 1995. The cascades framework for query optimization. IEEE Data Eng. Bull., 18(3),
//! pp.19-29.

#[macro_use]
extern crate prettytable;

pub mod config;
pub mod cost;
pub mod error;
pub mod index;
pub mod model;
pub mod planner;
pub mod search;
pub mod workload;
