use serde::{Deserialize, Serialize};

use crate::cost::CostModel;
use crate::planner::{IndexLookupStep, IndexWriteStep};

/// Counts bytes moved.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldSizeCost;

impl CostModel for FieldSizeCost {
    fn index_lookup_cost(&self, step: &IndexLookupStep) -> f64 {
        step.cardinality * step.fetched_size as f64
    }

    fn insert_cost(&self, step: &IndexWriteStep) -> f64 {
        step.cardinality * step.index.entry_size() as f64
    }

    fn delete_cost(&self, step: &IndexWriteStep) -> f64 {
        step.cardinality * step.index.entry_size() as f64
    }
}
