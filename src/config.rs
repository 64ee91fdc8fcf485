//! Configuration of an advisor run.
//!
//! The core never reads files: collaborators deserialize [`AdvisorConfig`] from whatever format
//! they like and pass it explicitly.

use serde::{Deserialize, Serialize};

use crate::cost::CassandraCost;
use crate::workload::DEFAULT_MIX;

#[derive(
    Copy,
    Clone,
    Debug,
    Eq,
    PartialEq,
    Default,
    Serialize,
    Deserialize,
    strum_macros::Display,
    strum_macros::EnumString,
    strum_macros::EnumIter,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CostModelKind {
    #[default]
    RequestCount,
    EntityCount,
    FieldSize,
    Cassandra,
}

/// Decides whether a merged index set replaces the current one.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergePolicy {
    /// Relative cost increase tolerated for a merge that does not grow the index set.
    pub cost_tolerance: f64,
    /// Cost reduction required per byte the merge adds.
    pub min_cost_reduction_per_byte: f64,
}

impl Default for MergePolicy {
    fn default() -> Self {
        Self {
            cost_tolerance: 0.0,
            min_cost_reduction_per_byte: 0.0,
        }
    }
}

impl MergePolicy {
    pub fn accepts(&self, old_cost: f64, old_size: f64, new_cost: f64, new_size: f64) -> bool {
        if new_size <= old_size {
            new_cost <= old_cost * (1.0 + self.cost_tolerance)
        } else {
            new_cost < old_cost
                && old_cost - new_cost >= self.min_cost_reduction_per_byte * (new_size - old_size)
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvisorConfig {
    pub cost_model: CostModelKind,
    /// Coefficients used when `cost_model` is `cassandra`.
    pub cassandra: CassandraCost,
    /// Storage budget in bytes, unbounded when absent.
    pub max_space: Option<f64>,
    pub merge_policy: MergePolicy,
    /// Max number of merge rounds.
    pub max_merge_iterations: usize,
    /// Workload mix whose weights are optimized.
    pub mix: String,
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            cost_model: CostModelKind::default(),
            cassandra: CassandraCost::default(),
            max_space: None,
            merge_policy: MergePolicy::default(),
            max_merge_iterations: 1000,
            mix: DEFAULT_MIX.to_string(),
        }
    }
}

impl AdvisorConfig {
    pub fn max_space(&self) -> f64 {
        self.max_space.unwrap_or(f64::INFINITY)
    }
}
