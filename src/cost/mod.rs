//! Cost models.
//!
//! A cost model maps a plan step and its estimated cardinality to a non-negative scalar. Costs
//! only rank plans against each other; they are not execution time estimates. Filter, sort and
//! limit steps run in memory and cost nothing, so a model only prices index lookups and index
//! writes.

use enum_as_inner::EnumAsInner;
use enum_dispatch::enum_dispatch;
use serde::{Deserialize, Serialize};

use crate::config::{AdvisorConfig, CostModelKind};
use crate::planner::{IndexLookupStep, IndexWriteStep};

mod request_count;
pub use request_count::*;
mod entity_count;
pub use entity_count::*;
mod field_size;
pub use field_size::*;
mod cassandra;
pub use cassandra::*;

#[enum_dispatch]
pub trait CostModel {
    fn index_lookup_cost(&self, step: &IndexLookupStep) -> f64;

    fn insert_cost(&self, step: &IndexWriteStep) -> f64;

    fn delete_cost(&self, step: &IndexWriteStep) -> f64;
}

#[enum_dispatch(CostModel)]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, EnumAsInner)]
pub enum CostModelImpl {
    RequestCount(RequestCountCost),
    EntityCount(EntityCountCost),
    FieldSize(FieldSizeCost),
    Cassandra(CassandraCost),
}

impl CostModelImpl {
    pub fn from_config(config: &AdvisorConfig) -> Self {
        match config.cost_model {
            CostModelKind::RequestCount => RequestCountCost.into(),
            CostModelKind::EntityCount => EntityCountCost.into(),
            CostModelKind::FieldSize => FieldSizeCost.into(),
            CostModelKind::Cassandra => config.cassandra.clone().into(),
        }
    }
}

impl Default for CostModelImpl {
    fn default() -> Self {
        RequestCountCost.into()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::config::{AdvisorConfig, CostModelKind};
    use crate::cost::{CassandraCost, CostModel, CostModelImpl, EntityCountCost, FieldSizeCost};
    use crate::index::Index;
    use crate::model::{FieldType, ModelBuilder};
    use crate::planner::{IndexLookupStep, IndexWriteStep};

    fn steps() -> (IndexLookupStep, IndexWriteStep) {
        let model = ModelBuilder::new()
            .entity("items", 100.0)
            .id("id")
            .field("name", FieldType::String)
            .build()
            .unwrap();
        let index = Arc::new(Index::simple(&model, model.find_entity("items").unwrap()).unwrap());
        let lookup = IndexLookupStep {
            index: index.clone(),
            parent_cardinality: Some(4.0),
            cardinality: 8.0,
            fetched_size: 10,
            eq_fields: vec![],
            range_field: None,
            cost: 0.0,
        };
        let write = IndexWriteStep {
            index,
            cardinality: 2.0,
            cost: 0.0,
        };
        (lookup, write)
    }

    #[test]
    fn test_from_config() {
        let mut config = AdvisorConfig::default();
        assert_eq!(CostModelImpl::from_config(&config), CostModelImpl::default());

        config.cost_model = CostModelKind::Cassandra;
        config.cassandra.request_cost = 2.0;
        let model = CostModelImpl::from_config(&config);
        assert_eq!(model.as_cassandra().map(|c| c.request_cost), Some(2.0));
    }

    #[test]
    fn test_costs() {
        let (mut lookup, write) = steps();
        // id (16) and name (10)
        assert_eq!(write.index.entry_size(), 26);

        let request_count = CostModelImpl::default();
        assert_eq!(request_count.index_lookup_cost(&lookup), 4.0);
        assert_eq!(request_count.insert_cost(&write), 2.0);

        let entity_count: CostModelImpl = EntityCountCost.into();
        assert_eq!(entity_count.index_lookup_cost(&lookup), 8.0);
        assert_eq!(entity_count.delete_cost(&write), 2.0);

        let field_size: CostModelImpl = FieldSizeCost.into();
        assert_eq!(field_size.index_lookup_cost(&lookup), 80.0);
        assert_eq!(field_size.insert_cost(&write), 52.0);

        let cassandra = CassandraCost {
            request_cost: 1.0,
            row_cost: 0.5,
            byte_cost: 0.25,
        };
        assert_eq!(cassandra.index_lookup_cost(&lookup), 4.0 + 4.0 + 20.0);
        assert_eq!(cassandra.insert_cost(&write), 2.0 * (1.0 + 6.5));

        lookup.parent_cardinality = None;
        assert_eq!(request_count.index_lookup_cost(&lookup), 1.0);
    }
}
