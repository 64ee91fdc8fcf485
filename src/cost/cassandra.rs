use serde::{Deserialize, Serialize};

use crate::cost::CostModel;
use crate::planner::{IndexLookupStep, IndexWriteStep};

/// Linear model of a wide column store: a fixed price per request, per row and per byte.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CassandraCost {
    pub request_cost: f64,
    pub row_cost: f64,
    pub byte_cost: f64,
}

impl Default for CassandraCost {
    fn default() -> Self {
        Self {
            request_cost: 1.0,
            row_cost: 0.01,
            byte_cost: 0.0001,
        }
    }
}

impl CassandraCost {
    fn write_cost(&self, step: &IndexWriteStep) -> f64 {
        step.cardinality * (self.request_cost + self.byte_cost * step.index.entry_size() as f64)
    }
}

impl CostModel for CassandraCost {
    fn index_lookup_cost(&self, step: &IndexLookupStep) -> f64 {
        let requests = step.parent_cardinality.unwrap_or(1.0);
        self.request_cost * requests
            + self.row_cost * step.cardinality
            + self.byte_cost * step.cardinality * step.fetched_size as f64
    }

    fn insert_cost(&self, step: &IndexWriteStep) -> f64 {
        self.write_cost(step)
    }

    fn delete_cost(&self, step: &IndexWriteStep) -> f64 {
        self.write_cost(step)
    }
}
