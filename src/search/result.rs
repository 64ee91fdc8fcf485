use prettytable::Table;
use serde::{Deserialize, Serialize};

use crate::index::{index_table, IndexRef};
use crate::model::Model;
use crate::planner::StatementPlan;

/// Indexes chosen for a workload and the plans they give every statement.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    indexes: Vec<IndexRef>,
    /// One plan per statement, in workload order.
    plans: Vec<StatementPlan>,
    /// Weighted cost of the workload.
    total_cost: f64,
    /// Bytes of all selected indexes.
    total_size: f64,
}

impl Selection {
    pub(crate) fn new(
        indexes: Vec<IndexRef>,
        plans: Vec<StatementPlan>,
        total_cost: f64,
        total_size: f64,
    ) -> Self {
        Self {
            indexes,
            plans,
            total_cost,
            total_size,
        }
    }

    pub fn indexes(&self) -> &[IndexRef] {
        &self.indexes
    }

    pub fn plans(&self) -> &[StatementPlan] {
        &self.plans
    }

    pub fn plan(&self, label: &str) -> Option<&StatementPlan> {
        self.plans.iter().find(|plan| plan.label() == label)
    }

    pub fn total_cost(&self) -> f64 {
        self.total_cost
    }

    pub fn total_size(&self) -> f64 {
        self.total_size
    }

    pub fn to_table(&self, model: &Model) -> Table {
        index_table(&self.indexes, model)
    }
}
