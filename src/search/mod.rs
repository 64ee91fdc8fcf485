//! Index selection.
//!
//! Candidates rarely fit a storage budget, and many of them differ only slightly. The overlap
//! search merges structurally compatible indexes so one wider index serves several statements,
//! and drops indexes when the budget demands it, never leaving a statement without a plan.

mod rules;
pub use rules::*;
mod overlap;
pub use overlap::*;
mod result;
pub use result::*;

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::config::AdvisorConfig;
    use crate::cost::CostModelImpl;
    use crate::error::AdvisorError;
    use crate::index::{Index, IndexEnumerator, IndexRef};
    use crate::model::{FieldType, ModelBuilder};
use crate::planner::Planner;
    use crate::search::Search;
    use crate::workload::{QueryBuilder, Workload};

    fn items_workload() -> Workload {
        let model = ModelBuilder::new()
            .entity("items", 1000.0)
            .id("id")
            .field("category", FieldType::String)
            .with_cardinality(20.0)
            .field("price", FieldType::Float)
            .field("name", FieldType::String)
            .build()
            .unwrap();
        let names = QueryBuilder::new("names", "items")
            .select("name")
            .eq("category")
            .build(&model)
            .unwrap();
        let prices = QueryBuilder::new("prices", "items")
            .select("price")
            .eq("category")
            .build(&model)
            .unwrap();

        let mut workload = Workload::new(model);
        workload.add_statement(names, 1.0).unwrap();
        workload.add_statement(prices, 1.0).unwrap();
        workload
    }

    #[test]
    fn test_merges_payloads() {
        let workload = items_workload();
        let model = workload.model();
        let candidates = IndexEnumerator::new(&workload).indexes_for_workload();
        let cost_model = CostModelImpl::default();
        let config = AdvisorConfig::default();

        let selection = Search::new(&workload, &cost_model, &config)
            .search(&candidates)
            .unwrap();
        assert_eq!(selection.indexes().len(), 1);
        let merged = &selection.indexes()[0];
        assert!(merged.extra().contains(&model.find_field("items.name").unwrap()));
        assert!(merged.extra().contains(&model.find_field("items.price").unwrap()));

        // Merging must not make the queries dearer than the indexes it replaced.
        let f = |name: &str| model.find_field(name).unwrap();
        let items = model.find_entity("items").unwrap();
        let unmerged: Vec<IndexRef> = ["items.name", "items.price"]
            .into_iter()
            .map(|payload| {
                Arc::new(Index::new(model, [f("items.category")], [], [f(payload)], [items]).unwrap())
            })
            .collect();
        let planner = Planner::new(&workload, &unmerged, &cost_model);
        let unmerged_cost: f64 = workload
            .statements()
            .iter()
            .map(|statement| planner.min_plan(statement.as_query().unwrap()).unwrap().cost())
            .sum();
        assert!(selection.total_cost() <= unmerged_cost);
        assert_eq!(selection.total_size(), 1000.0 * 44.0);
        assert_eq!(selection.plans().len(), 2);
        assert!(selection.plan("prices").is_some());
    }

    #[test]
    fn test_merge_brings_selection_within_budget() {
        let workload = items_workload();
        let candidates = IndexEnumerator::new(&workload).indexes_for_workload();
        let cost_model = CostModelImpl::default();
        let config = AdvisorConfig::default();

        let selection = Search::new(&workload, &cost_model, &config)
            .search_overlap(&candidates, 50000.0)
            .unwrap();
        assert!(selection.total_size() <= 50000.0);
        assert_eq!(selection.indexes().len(), 1);
    }

    #[test]
    fn test_no_space() {
        let workload = items_workload();
        let candidates = IndexEnumerator::new(&workload).indexes_for_workload();
        let cost_model = CostModelImpl::default();
        let config = AdvisorConfig::default();

        let result = Search::new(&workload, &cost_model, &config).search_overlap(&candidates, 0.0);
        assert_eq!(
            result,
            Err(AdvisorError::CapacityInfeasible {
                max_space: 0.0,
                required: 44000.0,
                statement: "names".to_string(),
            })
        );
    }

    #[test]
    fn test_unanswerable_statement() {
        let workload = items_workload();
        let cost_model = CostModelImpl::default();
        let config = AdvisorConfig::default();

        let result = Search::new(&workload, &cost_model, &config).search(&[]);
        assert_eq!(
            result,
            Err(AdvisorError::NoPlan {
                statement: "names".to_string()
            })
        );
    }

    #[test]
    fn test_empty_workload() {
        let workload = Workload::new(ModelBuilder::new().build().unwrap());
        let cost_model = CostModelImpl::default();
        let config = AdvisorConfig::default();

        let selection = Search::new(&workload, &cost_model, &config).search(&[]).unwrap();
        assert!(selection.indexes().is_empty());
        assert_eq!(selection.total_cost(), 0.0);
    }

    #[test]
    fn test_unknown_mix() {
        let workload = items_workload();
        let cost_model = CostModelImpl::default();
        let config = AdvisorConfig {
            mix: "peak".to_string(),
            ..AdvisorConfig::default()
        };

        let result = Search::new(&workload, &cost_model, &config).search(&[]);
        assert_eq!(result, Err(AdvisorError::UnknownMix("peak".to_string())));
    }
}
