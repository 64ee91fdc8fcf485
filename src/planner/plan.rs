use enum_as_inner::EnumAsInner;
use enumset::EnumSetType;
use itertools::Itertools;
use prettytable::Table;
use serde::{Deserialize, Serialize};

use crate::index::IndexRef;
use crate::model::{FieldId, Model};

/// Looks up entries of one index by hash key, optionally narrowed by a range on the first order
/// field.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IndexLookupStep {
    pub index: IndexRef,
    /// Rows feeding the lookup keys, `None` for the first lookup of a plan.
    pub parent_cardinality: Option<f64>,
    pub cardinality: f64,
    /// Bytes read per returned entry.
    pub fetched_size: usize,
    /// Equality predicates answered by the hash key.
    pub eq_fields: Vec<FieldId>,
    /// Range predicate answered by the first order field.
    pub range_field: Option<FieldId>,
    pub cost: f64,
}

/// Evaluates predicates in memory on fetched rows.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FilterStep {
    pub eq_fields: Vec<FieldId>,
    pub range_fields: Vec<FieldId>,
    pub cardinality: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SortStep {
    pub fields: Vec<FieldId>,
    pub cardinality: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LimitStep {
    pub limit: u64,
    pub cardinality: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, EnumAsInner)]
pub enum PlanStep {
    IndexLookup(IndexLookupStep),
    Filter(FilterStep),
    Sort(SortStep),
    Limit(LimitStep),
}

impl PlanStep {
    /// Estimated rows after the step.
    pub fn cardinality(&self) -> f64 {
        match self {
            PlanStep::IndexLookup(step) => step.cardinality,
            PlanStep::Filter(step) => step.cardinality,
            PlanStep::Sort(step) => step.cardinality,
            PlanStep::Limit(step) => step.cardinality,
        }
    }

    /// Only lookups cost anything, the other steps run in memory.
    pub fn cost(&self) -> f64 {
        match self {
            PlanStep::IndexLookup(step) => step.cost,
            _ => 0.0,
        }
    }

    fn describe(&self, model: &Model) -> (&'static str, String) {
        let names = |fields: &[FieldId]| fields.iter().map(|f| model.field_name(*f)).join(", ");
        match self {
            PlanStep::IndexLookup(step) => ("IndexLookup", step.index.display(model).to_string()),
            PlanStep::Filter(step) => (
                "Filter",
                format!("eq [{}] range [{}]", names(&step.eq_fields), names(&step.range_fields)),
            ),
            PlanStep::Sort(step) => ("Sort", names(&step.fields)),
            PlanStep::Limit(step) => ("Limit", step.limit.to_string()),
        }
    }
}

/// An executable sequence of steps answering one query. Each step consumes the rows of the step
/// before it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QueryPlan {
    label: String,
    steps: Vec<PlanStep>,
    cost: f64,
}

impl QueryPlan {
    pub fn new<S: Into<String>>(label: S, steps: Vec<PlanStep>) -> Self {
        let cost = steps.iter().map(PlanStep::cost).sum();
        Self {
            label: label.into(),
            steps,
            cost,
        }
    }

    /// Label of the planned query.
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn steps(&self) -> &[PlanStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn cost(&self) -> f64 {
        self.cost
    }

    /// Estimated rows returned.
    pub fn cardinality(&self) -> f64 {
        self.steps.last().map(PlanStep::cardinality).unwrap_or(0.0)
    }

    /// Indexes looked up, in step order.
    pub fn indexes(&self) -> impl Iterator<Item = &IndexRef> {
        self.steps
            .iter()
            .filter_map(|step| step.as_index_lookup().map(|lookup| &lookup.index))
    }

    pub fn to_table(&self, model: &Model) -> Table {
        let mut table = Table::new();
        table.set_titles(row!["Step", "Detail", "Cardinality", "Cost"]);
        for step in &self.steps {
            let (name, detail) = step.describe(model);
            table.add_row(row![
                name,
                detail,
                format!("{:.2}", step.cardinality()),
                format!("{:.2}", step.cost())
            ]);
        }
        table
    }
}

/// Kind of write an index receives.
#[derive(EnumSetType, Debug, Serialize, Deserialize)]
pub enum WriteOp {
    Delete,
    Insert,
}

/// Writes entries into, or removes entries from, one index.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IndexWriteStep {
    pub index: IndexRef,
    /// Entries written.
    pub cardinality: f64,
    pub cost: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, EnumAsInner)]
pub enum UpdateStep {
    Insert(IndexWriteStep),
    Delete(IndexWriteStep),
}

impl UpdateStep {
    pub fn write(&self) -> &IndexWriteStep {
        match self {
            UpdateStep::Insert(step) | UpdateStep::Delete(step) => step,
        }
    }
}

/// Maintenance of every affected index for an insert, update or delete, preceded by the plan
/// locating the modified rows.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UpdatePlan {
    label: String,
    support: Option<QueryPlan>,
    steps: Vec<UpdateStep>,
    cost: f64,
}

impl UpdatePlan {
    pub fn new<S: Into<String>>(label: S, support: Option<QueryPlan>, steps: Vec<UpdateStep>) -> Self {
        let cost = support.as_ref().map(QueryPlan::cost).unwrap_or(0.0)
            + steps.iter().map(|step| step.write().cost).sum::<f64>();
        Self {
            label: label.into(),
            support,
            steps,
            cost,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn support(&self) -> Option<&QueryPlan> {
        self.support.as_ref()
    }

    pub fn steps(&self) -> &[UpdateStep] {
        &self.steps
    }

    pub fn cost(&self) -> f64 {
        self.cost
    }

    /// Indexes maintained by the statement.
    pub fn updated_indexes(&self) -> impl Iterator<Item = &IndexRef> {
        self.steps.iter().map(|step| &step.write().index).dedup()
    }

    pub fn to_table(&self, model: &Model) -> Table {
        let mut table = match &self.support {
            Some(support) => support.to_table(model),
            None => {
                let mut table = Table::new();
                table.set_titles(row!["Step", "Detail", "Cardinality", "Cost"]);
                table
            }
        };
        for step in &self.steps {
            let name = match step {
                UpdateStep::Insert(_) => "Insert",
                UpdateStep::Delete(_) => "Delete",
            };
            let write = step.write();
            table.add_row(row![
                name,
                write.index.display(model),
                format!("{:.2}", write.cardinality),
                format!("{:.2}", write.cost)
            ]);
        }
        table
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, EnumAsInner)]
pub enum StatementPlan {
    Query(QueryPlan),
    Update(UpdatePlan),
}

impl StatementPlan {
    pub fn label(&self) -> &str {
        match self {
            StatementPlan::Query(plan) => plan.label(),
            StatementPlan::Update(plan) => plan.label(),
        }
    }

    pub fn cost(&self) -> f64 {
        match self {
            StatementPlan::Query(plan) => plan.cost(),
            StatementPlan::Update(plan) => plan.cost(),
        }
    }

    /// Indexes read to answer the statement.
    pub fn query_indexes(&self) -> Vec<&IndexRef> {
        match self {
            StatementPlan::Query(plan) => plan.indexes().collect(),
            StatementPlan::Update(plan) => plan
                .support()
                .map(|support| support.indexes().collect())
                .unwrap_or_default(),
        }
    }

    pub fn to_table(&self, model: &Model) -> Table {
        match self {
            StatementPlan::Query(plan) => plan.to_table(model),
            StatementPlan::Update(plan) => plan.to_table(model),
        }
    }
}
