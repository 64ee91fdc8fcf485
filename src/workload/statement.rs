use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};

use derive_more::From;
use enum_as_inner::EnumAsInner;
use serde::{Deserialize, Serialize};

use crate::model::{EntityId, FieldId, Model};
use crate::workload::QueryGraph;

/// Selectivity assumed for any range predicate.
pub const RANGE_SELECTIVITY: f64 = 0.1;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Operator {
    Eq,
    /// Equality against the given number of values.
    In(u32),
    Lt,
    Le,
    Gt,
    Ge,
}

impl Operator {
    pub fn is_equality(&self) -> bool {
        matches!(self, Operator::Eq | Operator::In(_))
    }

    pub fn is_range(&self) -> bool {
        !self.is_equality()
    }

    /// Number of keys an equality lookup on this predicate issues.
    pub fn key_count(&self) -> f64 {
        match self {
            Operator::In(n) => (*n).max(1) as f64,
            _ => 1.0,
        }
    }
}

impl Display for Operator {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Operator::Eq => write!(f, "="),
            Operator::In(n) => write!(f, "IN[{}]", n),
            Operator::Lt => write!(f, "<"),
            Operator::Le => write!(f, "<="),
            Operator::Gt => write!(f, ">"),
            Operator::Ge => write!(f, ">="),
        }
    }
}

/// A parameterized predicate `field <op> ?`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Condition {
    pub field: FieldId,
    pub operator: Operator,
}

impl Condition {
    pub fn new(field: FieldId, operator: Operator) -> Self {
        Self { field, operator }
    }

    /// Fraction of rows the predicate keeps.
    pub fn selectivity(&self, model: &Model) -> f64 {
        match self.operator {
            Operator::Eq | Operator::In(_) => {
                (self.operator.key_count() / model.field(self.field).cardinality()).min(1.0)
            }
            _ => RANGE_SELECTIVITY,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Query {
    pub(super) label: String,
    /// `path[0]` is the entity returned, the rest are joined through foreign keys.
    pub(super) path: Vec<EntityId>,
    pub(super) select: Vec<FieldId>,
    pub(super) conditions: Vec<Condition>,
    pub(super) order: Vec<FieldId>,
    pub(super) limit: Option<u64>,
    pub(super) graph: QueryGraph,
}

impl Query {
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn entity(&self) -> EntityId {
        self.path[0]
    }

    pub fn path(&self) -> &[EntityId] {
        &self.path
    }

    pub fn select(&self) -> &[FieldId] {
        &self.select
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn order(&self) -> &[FieldId] {
        &self.order
    }

    pub fn limit(&self) -> Option<u64> {
        self.limit
    }

    pub fn graph(&self) -> &QueryGraph {
        &self.graph
    }

    /// The path walked from the parameterized end back to the returned entity.
    pub fn lookup_path(&self) -> Vec<EntityId> {
        self.graph.lookup_order()
    }

    pub fn eq_conditions(&self) -> impl Iterator<Item = &Condition> {
        self.conditions.iter().filter(|c| c.operator.is_equality())
    }

    pub fn range_conditions(&self) -> impl Iterator<Item = &Condition> {
        self.conditions.iter().filter(|c| c.operator.is_range())
    }

    /// Queries without equality predicates are answered by scanning every key.
    pub fn is_scan(&self) -> bool {
        self.eq_conditions().next().is_none()
    }

    /// Every field a plan must fetch or bind.
    pub fn needed_fields(&self) -> BTreeSet<FieldId> {
        self.select
            .iter()
            .chain(self.order.iter())
            .copied()
            .chain(self.conditions.iter().map(|c| c.field))
            .collect()
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Insert {
    pub(super) label: String,
    pub(super) entity: EntityId,
    pub(super) settings: Vec<FieldId>,
}

impl Insert {
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn entity(&self) -> EntityId {
        self.entity
    }

    pub fn settings(&self) -> &[FieldId] {
        &self.settings
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Update {
    pub(super) label: String,
    pub(super) path: Vec<EntityId>,
    pub(super) settings: Vec<FieldId>,
    pub(super) conditions: Vec<Condition>,
    pub(super) graph: QueryGraph,
}

impl Update {
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn entity(&self) -> EntityId {
        self.path[0]
    }

    pub fn path(&self) -> &[EntityId] {
        &self.path
    }

    pub fn settings(&self) -> &[FieldId] {
        &self.settings
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Delete {
    pub(super) label: String,
    pub(super) path: Vec<EntityId>,
    pub(super) conditions: Vec<Condition>,
    pub(super) graph: QueryGraph,
}

impl Delete {
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn entity(&self) -> EntityId {
        self.path[0]
    }

    pub fn path(&self) -> &[EntityId] {
        &self.path
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }
}

/// One statement of a workload.
#[derive(Clone, Debug, Serialize, Deserialize, EnumAsInner, From)]
pub enum Statement {
    Query(Query),
    Insert(Insert),
    Update(Update),
    Delete(Delete),
}

impl Statement {
    pub fn label(&self) -> &str {
        match self {
            Statement::Query(q) => q.label(),
            Statement::Insert(i) => i.label(),
            Statement::Update(u) => u.label(),
            Statement::Delete(d) => d.label(),
        }
    }

    /// The entity returned or written.
    pub fn entity(&self) -> EntityId {
        match self {
            Statement::Query(q) => q.entity(),
            Statement::Insert(i) => i.entity(),
            Statement::Update(u) => u.entity(),
            Statement::Delete(d) => d.entity(),
        }
    }

    pub fn path(&self) -> &[EntityId] {
        match self {
            Statement::Query(q) => q.path(),
            Statement::Insert(i) => std::slice::from_ref(&i.entity),
            Statement::Update(u) => u.path(),
            Statement::Delete(d) => d.path(),
        }
    }

    pub fn conditions(&self) -> &[Condition] {
        match self {
            Statement::Query(q) => q.conditions(),
            Statement::Insert(_) => &[],
            Statement::Update(u) => u.conditions(),
            Statement::Delete(d) => d.conditions(),
        }
    }

    /// Fields whose values the statement writes.
    pub fn settings(&self) -> &[FieldId] {
        match self {
            Statement::Insert(i) => i.settings(),
            Statement::Update(u) => u.settings(),
            Statement::Query(_) | Statement::Delete(_) => &[],
        }
    }

    pub fn is_write(&self) -> bool {
        !matches!(self, Statement::Query(_))
    }

    /// The query locating the rows an update or delete modifies.
    pub fn support_query(&self, model: &Model) -> Option<Query> {
        let (label, path, conditions, graph) = match self {
            Statement::Update(u) => (&u.label, &u.path, &u.conditions, &u.graph),
            Statement::Delete(d) => (&d.label, &d.path, &d.conditions, &d.graph),
            Statement::Query(_) | Statement::Insert(_) => return None,
        };

        Some(Query {
            label: format!("{} (support)", label),
            path: path.clone(),
            select: vec![model.id_field(path[0])],
            conditions: conditions.clone(),
            order: vec![],
            limit: None,
            graph: graph.clone(),
        })
    }
}
