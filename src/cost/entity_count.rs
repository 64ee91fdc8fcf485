use serde::{Deserialize, Serialize};

use crate::cost::CostModel;
use crate::planner::{IndexLookupStep, IndexWriteStep};

/// Counts rows touched.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityCountCost;

impl CostModel for EntityCountCost {
    fn index_lookup_cost(&self, step: &IndexLookupStep) -> f64 {
        step.cardinality
    }

    fn insert_cost(&self, step: &IndexWriteStep) -> f64 {
        step.cardinality
    }

    fn delete_cost(&self, step: &IndexWriteStep) -> f64 {
        step.cardinality
    }
}
