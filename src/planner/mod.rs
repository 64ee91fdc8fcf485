//! Cost based planning of statements over a candidate index set.
//!
//! A [`QueryPlan`] is a chain of steps where each step consumes the rows of the previous one:
//! index lookups fetch entries, filters evaluate predicates the lookups could not, and a sort and
//! a limit finish the result when needed. An [`UpdatePlan`] prices the maintenance of every index
//! a write touches, after the plan that finds the rows it modifies.

mod plan;
pub use plan::*;
pub(crate) mod state;
mod query_planner;
pub use query_planner::*;

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use enumset::EnumSet;

    use crate::cost::{CostModel, CostModelImpl, RequestCountCost};
    use crate::error::AdvisorError;
    use crate::index::{Index, IndexEnumerator, IndexRef};
    use crate::model::{FieldType, ModelBuilder};
    use crate::planner::{
        write_ops, IndexLookupStep, PlanStep, Planner, QueryPlan, StatementPlan, UpdateStep,
        WriteOp,
    };
    use crate::workload::{
        DeleteBuilder, InsertBuilder, Operator, QueryBuilder, Statement, UpdateBuilder, Workload,
    };

    fn region_workload() -> Workload {
        let model = ModelBuilder::new()
            .entity("regions", 10.0)
            .id("id")
            .field("name", FieldType::String)
            .entity("users", 1000.0)
            .id("id")
            .foreign_key("region_id", "regions")
            .build()
            .unwrap();
        let query = QueryBuilder::new("region_of_user", "regions")
            .select("name")
            .eq("users.id")
            .build(&model)
            .unwrap();
        let mut workload = Workload::new(model);
        workload.add_statement(query, 1.0).unwrap();
        workload
    }

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
        let query = QueryBuilder::new("cheapest", "items")
            .select("name")
            .eq("category")
            .condition("price", Operator::Lt)
            .order_by("price")
            .limit(5)
            .build(&model)
            .unwrap();
        let mut workload = Workload::new(model);
        workload.add_statement(query, 1.0).unwrap();
        workload
    }

    fn query(workload: &Workload, label: &str) -> crate::workload::Query {
        workload
            .statement_by_label(label)
            .and_then(Statement::as_query)
            .cloned()
            .unwrap()
    }

    #[test]
    fn test_single_lookup_across_foreign_key() {
        let workload = region_workload();
        let model = workload.model();
        let candidates = IndexEnumerator::new(&workload).indexes_for_workload();
        let cost_model = CostModelImpl::default();
        let planner = Planner::new(&workload, &candidates, &cost_model);

        let plan = planner.min_plan(&query(&workload, "region_of_user")).unwrap();
        assert_eq!(plan.len(), 1);
        let lookup = plan.steps()[0].as_index_lookup().unwrap();
        assert_eq!(
            lookup.index.display(model).to_string(),
            "[users.id][regions.id][regions.name] users -> regions"
        );
        assert_eq!(plan.cardinality(), 1.0);
        assert_eq!(plan.cost(), 1.0);
    }

    #[test]
    fn test_min_plan_is_cheapest() {
        for workload in [region_workload(), items_workload()] {
            let candidates = IndexEnumerator::new(&workload).indexes_for_workload();
            let cost_model = CostModelImpl::default();
            let planner = Planner::new(&workload, &candidates, &cost_model);
            let query = workload.statements()[0].as_query().unwrap();

            let plans = planner.find_plans_for_query(query);
            let best = planner.min_plan(query).unwrap();
            assert!(!plans.is_empty());
            assert!(plans.contains(&best));
            assert!(plans.iter().all(|plan| best.cost() <= plan.cost()));
        }
    }

    #[test]
    fn test_ordered_index_avoids_sort() {
        let workload = items_workload();
        let candidates = IndexEnumerator::new(&workload).indexes_for_workload();
        let cost_model = CostModelImpl::default();
        let planner = Planner::new(&workload, &candidates, &cost_model);
        let query = query(&workload, "cheapest");

        let best = planner.min_plan(&query).unwrap();
        assert_eq!(best.len(), 2);
        assert!(best.steps()[0].as_index_lookup().unwrap().range_field.is_some());
        assert_eq!(best.steps()[1].as_limit().unwrap().limit, 5);
        assert_eq!(best.cardinality(), 5.0);

        let plans = planner.find_plans_for_query(&query);
        assert!(plans
            .iter()
            .any(|plan| plan.steps().iter().any(|step| step.as_sort().is_some())));
    }

    #[test]
    fn test_scan_sorts_across_partitions() {
        let mut workload = items_workload();
        let model = workload.model();
        let scan = QueryBuilder::new("priciest", "items")
            .select("name")
            .condition("price", Operator::Gt)
            .order_by("price")
            .build(model)
            .unwrap();
        let items = model.find_entity("items").unwrap();
        let simple = Arc::new(Index::simple(model, items).unwrap());
        workload.add_statement(scan, 1.0).unwrap();

        let mut candidates = IndexEnumerator::new(&workload).indexes_for_workload();
        candidates.push(simple);
        let cost_model = CostModelImpl::default();
        let planner = Planner::new(&workload, &candidates, &cost_model);
        let query = query(&workload, "priciest");

        let has_sort = |plan: &QueryPlan| plan.steps().iter().any(|step| step.as_sort().is_some());
        assert!(has_sort(&planner.min_plan(&query).unwrap()));
        let plans = planner.find_plans_for_query(&query);
        assert!(!plans.is_empty());
        assert!(plans.iter().all(has_sort));
    }

    #[test]
    fn test_multi_key_lookup_sorts() {
        let mut workload = items_workload();
        let in_categories = QueryBuilder::new("in_categories", "items")
            .select("name")
            .condition("category", Operator::In(3))
            .order_by("price")
            .build(workload.model())
            .unwrap();
        workload.add_statement(in_categories, 1.0).unwrap();
        let indexes = items_indexes(&workload);
        let cost_model = CostModelImpl::default();
        let planner = Planner::new(&workload, &indexes, &cost_model);
        let query = query(&workload, "in_categories");

        let best = planner.min_plan(&query).unwrap();
        assert_eq!(best.steps()[0].as_index_lookup().unwrap().cardinality, 150.0);
        assert!(best.steps().iter().any(|step| step.as_sort().is_some()));
        let plans = planner.find_plans_for_query(&query);
        assert!(!plans.is_empty());
        assert!(plans
            .iter()
            .all(|plan| plan.steps().iter().any(|step| step.as_sort().is_some())));
    }

    #[test]
    fn test_no_plan() {
        let workload = items_workload();
        let cost_model = CostModelImpl::default();
        let planner = Planner::new(&workload, &[], &cost_model);
        let query = query(&workload, "cheapest");

        assert!(planner.find_plans_for_query(&query).is_empty());
        assert_eq!(
            planner.min_plan(&query),
            Err(AdvisorError::NoPlan {
                statement: "cheapest".to_string()
            })
        );
    }

    #[test]
    fn test_request_count_grows_with_lookups() {
        let workload = region_workload();
        let candidates = IndexEnumerator::new(&workload).indexes_for_workload();
        let cost_model = CostModelImpl::default();
        let planner = Planner::new(&workload, &candidates, &cost_model);
        let plan = planner.min_plan(&query(&workload, "region_of_user")).unwrap();

        for cardinality in [0.5, 1.0, 3.0, 250.0] {
            let mut extra = IndexLookupStep {
                index: candidates[0].clone(),
                parent_cardinality: None,
                cardinality,
                fetched_size: 0,
                eq_fields: vec![],
                range_field: None,
                cost: 0.0,
            };
            extra.cost = RequestCountCost.index_lookup_cost(&extra);

            // The former first lookup now runs once per row of the extra one.
            let mut steps = plan.steps().to_vec();
            let first = steps[0].as_index_lookup_mut().unwrap();
            first.parent_cardinality = Some(cardinality);
            first.cost = RequestCountCost.index_lookup_cost(first);
            steps.insert(0, PlanStep::IndexLookup(extra));

            let longer = QueryPlan::new(plan.label(), steps);
            assert!(longer.cost() >= plan.cost(), "{} < {}", longer.cost(), plan.cost());
        }
    }

    fn items_indexes(workload: &Workload) -> Vec<IndexRef> {
        let model = workload.model();
        let f = |name: &str| model.find_field(name).unwrap();
        let items = model.find_entity("items").unwrap();
        let by_category = Index::new(
            model,
            [f("items.category")],
            [f("items.price")],
            [f("items.name")],
            [items],
        )
        .unwrap();
        vec![
            Arc::new(Index::simple(model, items).unwrap()),
            Arc::new(by_category),
        ]
    }

    #[test]
    fn test_update_rewrites_affected_indexes() {
        let mut workload = items_workload();
        let update = UpdateBuilder::new("reprice", "items")
            .set("price")
            .eq("id")
            .build(workload.model())
            .unwrap();
        workload.add_statement(update, 1.0).unwrap();
        let indexes = items_indexes(&workload);
        let cost_model = CostModelImpl::default();
        let planner = Planner::new(&workload, &indexes, &cost_model);
        let statement = workload.statement_by_label("reprice").unwrap();

        let model = workload.model();
        assert_eq!(write_ops(model, statement, &indexes[0]), EnumSet::only(WriteOp::Insert));
        assert_eq!(write_ops(model, statement, &indexes[1]), WriteOp::Delete | WriteOp::Insert);

        let plan = planner.plan_update(statement).unwrap();
        assert_eq!(plan.support().unwrap().len(), 1);
        assert_eq!(plan.steps().len(), 3);
        assert_eq!(plan.updated_indexes().count(), 2);
        assert_eq!(plan.cost(), 4.0);
    }

    #[test]
    fn test_foreign_key_update_moves_joined_entries() {
        let mut workload = region_workload();
        let model = workload.model();
        let f = |name: &str| model.find_field(name).unwrap();
        let users = model.find_entity("users").unwrap();
        let regions = model.find_entity("regions").unwrap();
        let region_id = f("users.region_id");
        let joined: IndexRef = Arc::new(
            Index::new(
                model,
                [f("users.id")],
                [],
                [f("regions.name")],
                [users, regions],
            )
            .unwrap(),
        );
        let indexes = vec![Arc::new(Index::simple(model, users).unwrap()), joined.clone()];
        let update = UpdateBuilder::new("move_user", "users")
            .set("region_id")
            .eq("id")
            .build(model)
            .unwrap();
        workload.add_statement(update, 1.0).unwrap();
        let statement = workload.statement_by_label("move_user").unwrap();
        let model = workload.model();

        assert!(!joined.contains_field(region_id));
        assert_eq!(write_ops(model, statement, &joined), WriteOp::Delete | WriteOp::Insert);
        assert_eq!(write_ops(model, statement, &indexes[0]), EnumSet::only(WriteOp::Insert));

        let cost_model = CostModelImpl::default();
        let planner = Planner::new(&workload, &indexes, &cost_model);
        let plan = planner.plan_update(statement).unwrap();
        let joined_ops: Vec<&UpdateStep> = plan
            .steps()
            .iter()
            .filter(|step| step.write().index == joined)
            .collect();
        assert_eq!(joined_ops.len(), 2);
        assert!(joined_ops.iter().any(|step| step.as_delete().is_some()));
        assert!(joined_ops.iter().any(|step| step.as_insert().is_some()));
        assert_eq!(plan.updated_indexes().count(), 2);
    }

    #[test]
    fn test_insert_has_no_support_plan() {
        let mut workload = items_workload();
        let insert = InsertBuilder::new("add", "items").build(workload.model()).unwrap();
        workload.add_statement(insert, 1.0).unwrap();
        let indexes = items_indexes(&workload);
        let cost_model = CostModelImpl::default();
        let planner = Planner::new(&workload, &indexes, &cost_model);

        let plan = planner
            .plan_statement(workload.statement_by_label("add").unwrap())
            .unwrap();
        let plan = plan.as_update().unwrap();
        assert!(plan.support().is_none());
        assert!(plan.steps().iter().all(|step| matches!(step, UpdateStep::Insert(_))));
        assert_eq!(plan.cost(), 2.0);
    }

    #[test]
    fn test_unlocatable_delete() {
        let mut workload = items_workload();
        let delete = DeleteBuilder::new("purge", "items")
            .eq("name")
            .build(workload.model())
            .unwrap();
        workload.add_statement(delete, 1.0).unwrap();
        let indexes = items_indexes(&workload);
        let cost_model = CostModelImpl::default();
        let planner = Planner::new(&workload, &indexes, &cost_model);

        let result = planner.plan_statement(workload.statement_by_label("purge").unwrap());
        assert_eq!(
            result.map(|plan| matches!(plan, StatementPlan::Update(_))),
            Err(AdvisorError::NoPlan {
                statement: "purge".to_string()
            })
        );
    }
}
