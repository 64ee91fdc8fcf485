use enumset::EnumSet;
use log::{debug, trace};

use crate::cost::{CostModel, CostModelImpl};
use crate::error::{AdvisorError, AdvisorResult};
use crate::index::{Index, IndexRef};
use crate::model::{FieldId, Model};
use crate::planner::state::QueryState;
use crate::planner::{IndexWriteStep, QueryPlan, StatementPlan, UpdatePlan, UpdateStep, WriteOp};
use crate::workload::{Query, Statement, Workload};

/// Bookkeeping of one depth first plan search.
struct PlanSearch {
    /// Abandon states that cannot beat the best plan found.
    prune: bool,
    best: Option<QueryPlan>,
    /// Every complete plan, kept only when not pruning.
    plans: Vec<QueryPlan>,
    explored: usize,
    pruned: usize,
}

impl PlanSearch {
    fn new(prune: bool) -> Self {
        Self {
            prune,
            best: None,
            plans: vec![],
            explored: 0,
            pruned: 0,
        }
    }

    /// Finishing a state only appends free steps, so a state no cheaper than the best plan with
    /// at least as many steps can never win the tie break.
    fn is_dominated(&self, state: &QueryState) -> bool {
        match &self.best {
            Some(best) if self.prune => {
                state.cost() > best.cost()
                    || (state.cost() == best.cost() && state.step_count() >= best.len())
            }
            _ => false,
        }
    }

    fn offer(&mut self, plan: QueryPlan) {
        let better = match &self.best {
            Some(best) => {
                plan.cost() < best.cost() || (plan.cost() == best.cost() && plan.len() < best.len())
            }
            None => true,
        };
        if !self.prune {
            self.plans.push(plan.clone());
        }
        if better {
            self.best = Some(plan);
        }
    }
}

/// Plans statements against a fixed set of indexes.
///
/// Query planning is a depth first search over the order in which indexes are looked up. Each
/// lookup must continue along the query's lookup path from where the previous one stopped, so
/// the search depth is bounded by the query graph. [`Planner::min_plan`] prunes branches that
/// cannot beat the best plan found so far; ties go to the plan with fewer steps, then to the
/// plan found first. Indexes are tried in the order given, which keeps planning deterministic.
pub struct Planner<'a> {
    workload: &'a Workload,
    indexes: &'a [IndexRef],
    cost_model: &'a CostModelImpl,
}

impl<'a> Planner<'a> {
    pub fn new(workload: &'a Workload, indexes: &'a [IndexRef], cost_model: &'a CostModelImpl) -> Self {
        Self {
            workload,
            indexes,
            cost_model,
        }
    }

    pub fn indexes(&self) -> &[IndexRef] {
        self.indexes
    }

    /// Every plan answering the query, in discovery order. Empty when the query is unanswerable.
    pub fn find_plans_for_query(&self, query: &Query) -> Vec<QueryPlan> {
        self.search(query, false).plans
    }

    /// The cheapest plan answering the query.
    pub fn min_plan(&self, query: &Query) -> AdvisorResult<QueryPlan> {
        self.search(query, true)
            .best
            .ok_or_else(|| AdvisorError::no_plan(query.label()))
    }

    fn search(&self, query: &Query, prune: bool) -> PlanSearch {
        let model = self.workload.model();
        let lookup_path = query.lookup_path();
        let max_lookups = 2 * query.graph().diameter() + 2;
        let mut search = PlanSearch::new(prune);

        self.expand(QueryState::new(query, &lookup_path, model), max_lookups, &mut search);

        debug!(
            "Planned query `{}`: explored {} states, pruned {}, best cost {:?}",
            query.label(),
            search.explored,
            search.pruned,
            search.best.as_ref().map(QueryPlan::cost)
        );
        search
    }

    fn expand(&self, state: QueryState, max_lookups: usize, search: &mut PlanSearch) {
        search.explored += 1;
        if state.is_answered() {
            search.offer(state.finish());
            return;
        }
        if state.lookup_count() >= max_lookups {
            return;
        }

        let model = self.workload.model();
        for (position, index) in self.indexes.iter().enumerate() {
            if !state.can_apply(position, index, model) {
                continue;
            }
            let next = state.apply(position, index, model, self.cost_model);
            if search.is_dominated(&next) {
                trace!("Pruned state of cost {} after {}", next.cost(), index.display(model));
                search.pruned += 1;
                continue;
            }
            self.expand(next, max_lookups, search);
        }
    }

    /// Plans any statement: queries through [`Planner::min_plan`], writes through
    /// [`Planner::plan_update`].
    pub fn plan_statement(&self, statement: &Statement) -> AdvisorResult<StatementPlan> {
        match statement {
            Statement::Query(query) => self.min_plan(query).map(StatementPlan::Query),
            _ => self.plan_update(statement).map(StatementPlan::Update),
        }
    }

    /// Plans the maintenance of every index an insert, update or delete affects, after the
    /// cheapest plan locating the modified rows.
    pub fn plan_update(&self, statement: &Statement) -> AdvisorResult<UpdatePlan> {
        let model = self.workload.model();
        let support = statement
            .support_query(model)
            .map(|query| self.min_plan(&query))
            .transpose()
            .map_err(|_| AdvisorError::no_plan(statement.label()))?;
        let rows = support.as_ref().map(QueryPlan::cardinality).unwrap_or(1.0);
        let entity_count = model.entity(statement.entity()).count();

        let mut steps = vec![];
        for index in self.indexes {
            let ops = write_ops(model, statement, index);
            if ops.is_empty() {
                continue;
            }
            let written = rows * index.entries() / entity_count;
            for op in ops {
                let mut step = IndexWriteStep {
                    index: index.clone(),
                    cardinality: written,
                    cost: 0.0,
                };
                steps.push(match op {
                    WriteOp::Delete => {
                        step.cost = self.cost_model.delete_cost(&step);
                        UpdateStep::Delete(step)
                    }
                    WriteOp::Insert => {
                        step.cost = self.cost_model.insert_cost(&step);
                        UpdateStep::Insert(step)
                    }
                });
            }
        }

        Ok(UpdatePlan::new(statement.label(), support, steps))
    }
}

/// The writes `statement` makes to `index`: none when unaffected, an overwrite when only
/// payload changes, a delete and an insert when key fields change or rows come and go.
///
/// Setting a foreign key moves every entry whose path joins across that relationship, even when
/// the index stores no field of the updated entity.
pub fn write_ops(model: &Model, statement: &Statement, index: &Index) -> EnumSet<WriteOp> {
    match statement {
        Statement::Query(_) => EnumSet::empty(),
        Statement::Insert(insert) if index.path().contains(&insert.entity()) => {
            EnumSet::only(WriteOp::Insert)
        }
        Statement::Delete(delete) if index.path().contains(&delete.entity()) => {
            EnumSet::only(WriteOp::Delete)
        }
        Statement::Update(update) => {
            let settings = update.settings();
            let rejoins = |field: FieldId| {
                model.field(field).target().is_some()
                    && index
                        .path()
                        .windows(2)
                        .any(|hop| model.relationship(hop[0], hop[1]).map(|r| r.field) == Some(field))
            };
            if settings
                .iter()
                .any(|f| index.is_key_field(*f) || rejoins(*f))
            {
                WriteOp::Delete | WriteOp::Insert
            } else if settings.iter().any(|f| index.contains_field(*f)) {
                EnumSet::only(WriteOp::Insert)
            } else {
                EnumSet::empty()
            }
        }
        _ => EnumSet::empty(),
    }
}
