mod common;

use nosql_advisor::config::AdvisorConfig;
use nosql_advisor::cost::CostModelImpl;
use nosql_advisor::error::AdvisorError;
use nosql_advisor::index::IndexEnumerator;
use nosql_advisor::planner::Planner;
use nosql_advisor::search::{Search, Selection};
use nosql_advisor::workload::Workload;
use proptest::prelude::*;

fn select(workload: &Workload, config: &AdvisorConfig, max_space: f64) -> Result<Selection, AdvisorError> {
    let candidates = IndexEnumerator::new(workload).indexes_for_workload();
    let cost_model = CostModelImpl::from_config(config);
    Search::new(workload, &cost_model, config).search_overlap(&candidates, max_space)
}

fn assert_answerable(workload: &Workload, config: &AdvisorConfig, selection: &Selection) {
    let cost_model = CostModelImpl::from_config(config);
    let planner = Planner::new(workload, selection.indexes(), &cost_model);
    for statement in workload.statements() {
        assert!(
            planner.plan_statement(statement).is_ok(),
            "`{}` lost its plan",
            statement.label()
        );
    }
}

#[test]
fn test_unbounded_selection() -> anyhow::Result<()> {
    let workload = common::default_blog_workload()?;
    let config = AdvisorConfig::default();

    let selection = select(&workload, &config, f64::INFINITY)?;
    assert!(!selection.indexes().is_empty());
    assert_eq!(selection.plans().len(), common::STATEMENTS);
    assert_answerable(&workload, &config, &selection);

    let size: f64 = selection.indexes().iter().map(|index| index.size()).sum();
    assert_eq!(selection.total_size(), size);
    Ok(())
}

#[test]
fn test_no_space_is_infeasible() -> anyhow::Result<()> {
    let workload = common::default_blog_workload()?;
    let config = AdvisorConfig::default();

    match select(&workload, &config, 0.0) {
        Err(AdvisorError::CapacityInfeasible {
            max_space,
            required,
            statement,
        }) => {
            assert_eq!(max_space, 0.0);
            assert!(required > 0.0);
            assert!(workload.statement_by_label(&statement).is_some());
        }
        other => panic!("expected capacity infeasibility, got {:?}", other),
    }
    Ok(())
}

#[test]
fn test_selection_serializes() -> anyhow::Result<()> {
    let workload = common::default_blog_workload()?;
    let config = AdvisorConfig::default();
    let selection = select(&workload, &config, f64::INFINITY)?;

    let json = serde_json::to_value(&selection)?;
    let index = &json["indexes"][0];
    for attribute in ["hash_fields", "order_fields", "extra", "path", "entries", "size"] {
        assert!(!index[attribute].is_null(), "index misses `{}`", attribute);
    }
    assert_eq!(
        json["plans"].as_array().map(Vec::len),
        Some(common::STATEMENTS)
    );

    assert_eq!(json["plans"][0]["Query"]["label"], "user_posts");
    Ok(())
}

#[test]
fn test_config_from_json() -> anyhow::Result<()> {
    let config: AdvisorConfig =
        serde_json::from_str(r#"{"cost_model": "field_size", "max_space": 1e9}"#)?;
    assert_eq!(config.max_space(), 1e9);
    assert_eq!(config.max_merge_iterations, AdvisorConfig::default().max_merge_iterations);

    let workload = common::default_blog_workload()?;
    let selection = select(&workload, &config, config.max_space())?;
    assert!(selection.total_size() <= 1e9);
    assert_answerable(&workload, &config, &selection);
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn test_search_invariants(
        users in 100.0f64..5000.0,
        posts_per_user in 1.0f64..20.0,
        weights in prop::collection::vec(0.0f64..10.0, common::STATEMENTS),
        budget_share in 0.0f64..1.5,
    ) {
        let workload = common::blog_workload(users, users * posts_per_user, &weights).unwrap();
        let config = AdvisorConfig::default();

        let unbounded = select(&workload, &config, f64::INFINITY).unwrap();
        prop_assert_eq!(&select(&workload, &config, f64::INFINITY).unwrap(), &unbounded);
        assert_answerable(&workload, &config, &unbounded);

        let max_space = unbounded.total_size() * budget_share;
        match select(&workload, &config, max_space) {
            Ok(selection) => {
                prop_assert!(selection.total_size() <= max_space);
                assert_answerable(&workload, &config, &selection);
            }
            Err(AdvisorError::CapacityInfeasible { .. }) => {}
            Err(e) => prop_assert!(false, "unexpected error {}", e),
        }
    }
}
