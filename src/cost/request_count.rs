use serde::{Deserialize, Serialize};

use crate::cost::CostModel;
use crate::planner::{IndexLookupStep, IndexWriteStep};

/// Counts round trips to the store.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestCountCost;

impl CostModel for RequestCountCost {
    /// One request starts a plan, every later lookup issues one request per parent row.
    fn index_lookup_cost(&self, step: &IndexLookupStep) -> f64 {
        step.parent_cardinality.unwrap_or(1.0)
    }

    fn insert_cost(&self, step: &IndexWriteStep) -> f64 {
        step.cardinality
    }

    fn delete_cost(&self, step: &IndexWriteStep) -> f64 {
        step.cardinality
    }
}
