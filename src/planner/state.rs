use std::collections::BTreeSet;

use crate::cost::{CostModel, CostModelImpl};
use crate::index::IndexRef;
use crate::model::{EntityId, FieldId, Model};
use crate::planner::{FilterStep, IndexLookupStep, LimitStep, PlanStep, QueryPlan, SortStep};
use crate::workload::{Condition, Query, RANGE_SELECTIVITY};

/// Progress of one partial plan.
///
/// A state knows how far along the query's lookup path the steps so far reached, which fields
/// they fetched and which predicates remain to be applied.
#[derive(Clone, Debug)]
pub(crate) struct QueryState<'q> {
    query: &'q Query,
    lookup_path: &'q [EntityId],
    /// Position of the current entity on `lookup_path`.
    position: usize,
    fetched: BTreeSet<FieldId>,
    unaddressed: Vec<Condition>,
    cardinality: f64,
    order_satisfied: bool,
    /// Positions of the indexes used, in the planner's index list.
    used: Vec<usize>,
    steps: Vec<PlanStep>,
    cost: f64,
}

impl<'q> QueryState<'q> {
    pub(crate) fn new(query: &'q Query, lookup_path: &'q [EntityId], model: &Model) -> Self {
        Self {
            query,
            lookup_path,
            position: 0,
            fetched: BTreeSet::new(),
            unaddressed: query.conditions().to_vec(),
            cardinality: model.entity(query.entity()).count(),
            order_satisfied: query.order().is_empty(),
            used: vec![],
            steps: vec![],
            cost: 0.0,
        }
    }

    pub(crate) fn cost(&self) -> f64 {
        self.cost
    }

    pub(crate) fn step_count(&self) -> usize {
        self.steps.len()
    }

    pub(crate) fn lookup_count(&self) -> usize {
        self.used.len()
    }

    fn remaining(&self) -> &'q [EntityId] {
        &self.lookup_path[self.position..]
    }

    fn is_first(&self) -> bool {
        self.used.is_empty()
    }

    /// Every field needed has been fetched at the root entity and every predicate applied.
    pub(crate) fn is_answered(&self) -> bool {
        self.position + 1 == self.lookup_path.len()
            && self.unaddressed.is_empty()
            && self.query.select().iter().all(|f| self.fetched.contains(f))
            && self.query.order().iter().all(|f| self.fetched.contains(f))
    }

    fn is_eq_field(&self, field: FieldId) -> bool {
        self.query.eq_conditions().any(|c| c.field == field)
    }

    /// Whether `index` can extend this state.
    pub(crate) fn can_apply(&self, position: usize, index: &IndexRef, model: &Model) -> bool {
        let remaining = self.remaining();
        let path = index.path();
        if path.len() > remaining.len() || path != &remaining[..path.len()] {
            return false;
        }
        if self.used.contains(&position) {
            return false;
        }

        let hash = index.hash_fields();
        let bound = if self.is_first() {
            if self.query.is_scan() {
                hash.len() == 1 && hash.contains(&model.id_field(remaining[0]))
            } else {
                hash.iter().all(|f| self.is_eq_field(*f))
            }
        } else {
            hash.iter().all(|f| self.fetched.contains(f) || self.is_eq_field(*f))
                && hash.iter().any(|f| self.fetched.contains(f))
        };
        if !bound {
            return false;
        }

        path.len() > 1
            || index
                .all_fields()
                .any(|f| !self.fetched.contains(&f) && self.is_needed(f))
    }

    fn is_needed(&self, field: FieldId) -> bool {
        self.query.select().contains(&field)
            || self.query.order().contains(&field)
            || self.unaddressed.iter().any(|c| c.field == field)
    }

    /// Successor state after looking up `index`, followed by a filter of every predicate the
    /// lookup made checkable.
    pub(crate) fn apply(
        &self,
        position: usize,
        index: &IndexRef,
        model: &Model,
        cost_model: &CostModelImpl,
    ) -> QueryState<'q> {
        let mut next = self.clone();
        let first = self.is_first();
        let hash = index.hash_fields();

        let (bound_eq, rest): (Vec<Condition>, Vec<Condition>) = next
            .unaddressed
            .iter()
            .partition(|c| c.operator.is_equality() && hash.contains(&c.field));
        next.unaddressed = rest;

        let range_field = index.order_fields().first().copied().filter(|field| {
            next.unaddressed
                .iter()
                .any(|c| c.operator.is_range() && c.field == *field)
        });
        if let Some(field) = range_field {
            next.unaddressed
                .retain(|c| !(c.operator.is_range() && c.field == field));
        }

        let keys = if first && self.query.is_scan() {
            index.hash_count()
        } else {
            let base = if first { 1.0 } else { self.cardinality };
            bound_eq
                .iter()
                .map(|c| c.operator.key_count())
                .fold(base, |keys, n| keys * n)
        };
        let range_selectivity = if range_field.is_some() {
            RANGE_SELECTIVITY
        } else {
            1.0
        };
        next.cardinality = keys * index.per_hash_count() * range_selectivity;

        if first {
            // Order fields only sort entries within one hash key.
            next.order_satisfied = self.query.order().is_empty()
                || (keys == 1.0 && index.order_fields().starts_with(self.query.order()));
        } else if index.per_hash_count() > 1.0 {
            next.order_satisfied = self.query.order().is_empty();
        }

        next.fetched.extend(index.all_fields());
        next.position += index.path().len() - 1;
        next.used.push(position);

        let lookup_position = next.steps.len();
        next.steps.push(PlanStep::IndexLookup(IndexLookupStep {
            index: index.clone(),
            parent_cardinality: if first { None } else { Some(self.cardinality) },
            cardinality: next.cardinality,
            fetched_size: 0,
            eq_fields: bound_eq.iter().map(|c| c.field).collect(),
            range_field,
            cost: 0.0,
        }));

        next.filter(model);

        let fetched_size = if next.is_answered() {
            index
                .all_fields()
                .filter(|f| self.query.select().contains(f))
                .map(|f| model.field(f).size())
                .sum()
        } else {
            index.entry_size()
        };
        if let PlanStep::IndexLookup(step) = &mut next.steps[lookup_position] {
            step.fetched_size = fetched_size;
            step.cost = cost_model.index_lookup_cost(step);
            next.cost += step.cost;
        }

        next
    }

    /// Applies every predicate whose field has been fetched.
    fn filter(&mut self, model: &Model) {
        let (checkable, rest): (Vec<Condition>, Vec<Condition>) = self
            .unaddressed
            .iter()
            .partition(|c| self.fetched.contains(&c.field));
        if checkable.is_empty() {
            return;
        }
        self.unaddressed = rest;

        let selectivity: f64 = checkable.iter().map(|c| c.selectivity(model)).product();
        self.cardinality *= selectivity;
        self.steps.push(PlanStep::Filter(FilterStep {
            eq_fields: checkable
                .iter()
                .filter(|c| c.operator.is_equality())
                .map(|c| c.field)
                .collect(),
            range_fields: checkable
                .iter()
                .filter(|c| c.operator.is_range())
                .map(|c| c.field)
                .collect(),
            cardinality: self.cardinality,
        }));
    }

    /// Completes an answered state with the in-memory sort and limit the query still needs.
    pub(crate) fn finish(mut self) -> QueryPlan {
        if !self.order_satisfied {
            self.steps.push(PlanStep::Sort(SortStep {
                fields: self.query.order().to_vec(),
                cardinality: self.cardinality,
            }));
        }
        if let Some(limit) = self.query.limit() {
            self.cardinality = self.cardinality.min(limit as f64);
            self.steps.push(PlanStep::Limit(LimitStep {
                limit,
                cardinality: self.cardinality,
            }));
        }

        QueryPlan::new(self.query.label(), self.steps)
    }
}
