use std::collections::HashSet;
use std::sync::Arc;

use itertools::Itertools;
use log::{debug, info, warn};
use rayon::prelude::*;

use crate::config::AdvisorConfig;
use crate::cost::CostModelImpl;
use crate::error::{AdvisorError, AdvisorResult};
use crate::index::IndexRef;
use crate::planner::{Planner, StatementPlan};
use crate::search::{MergeRule, MergeRuleImpl, Selection};
use crate::workload::Workload;

/// Plans of the whole workload over one index set.
struct Evaluation {
    indexes: Vec<IndexRef>,
    plans: Vec<StatementPlan>,
    /// Weighted cost of all plans.
    cost: f64,
    size: f64,
}

impl Evaluation {
    /// Indexes some query or support plan reads, in set order.
    fn used_indexes(&self) -> Vec<IndexRef> {
        let used: HashSet<&IndexRef> = self
            .plans
            .iter()
            .flat_map(StatementPlan::query_indexes)
            .collect();
        self.indexes
            .iter()
            .filter(|index| used.contains(index))
            .cloned()
            .collect()
    }

    fn into_selection(self) -> Selection {
        Selection::new(self.indexes, self.plans, self.cost, self.size)
    }
}

/// Selects indexes for a workload under a storage budget.
///
/// The search starts from the indexes the cheapest plans use when every candidate is available,
/// then repeatedly merges pairs of compatible indexes while the [`crate::config::MergePolicy`]
/// accepts the result. Every proposal is evaluated by planning the whole workload again. If the
/// selection still exceeds the budget, indexes are dropped one at a time as long as every
/// statement keeps a plan.
///
/// The search is deterministic: proposals are enumerated in selection order and ties are broken
/// by that order, while parallel evaluation only changes how fast results arrive.
pub struct Search<'a> {
    workload: &'a Workload,
    cost_model: &'a CostModelImpl,
    config: &'a AdvisorConfig,
    rules: Vec<MergeRuleImpl>,
}

impl<'a> Search<'a> {
    pub fn new(workload: &'a Workload, cost_model: &'a CostModelImpl, config: &'a AdvisorConfig) -> Self {
        Self {
            workload,
            cost_model,
            config,
            rules: MergeRuleImpl::all(),
        }
    }

    /// Replaces the merge rules tried in each round.
    pub fn with_rules(mut self, rules: Vec<MergeRuleImpl>) -> Self {
        self.rules = rules;
        self
    }

    /// [`Search::search_overlap`] within the configured budget.
    pub fn search(&self, candidates: &[IndexRef]) -> AdvisorResult<Selection> {
        self.search_overlap(candidates, self.config.max_space())
    }

    /// # Return
    ///
    /// The selected indexes with the plan of every statement. Fails with
    /// [`AdvisorError::NoPlan`] when the candidates cannot answer some statement, and with
    /// [`AdvisorError::CapacityInfeasible`] when no selection within `max_space` answers them
    /// all.
    pub fn search_overlap(&self, candidates: &[IndexRef], max_space: f64) -> AdvisorResult<Selection> {
        let weights = self.workload.weights(&self.config.mix)?;
        if self.workload.is_empty() {
            info!("Empty workload, nothing to select");
            return Ok(Selection::default());
        }

        let seed = self.evaluate(candidates.to_vec(), weights)?;
        let mut current = self.prune(seed, weights);
        info!(
            "Seeded selection with {} of {} candidates: cost {:.2}, size {:.0}",
            current.indexes.len(),
            candidates.len(),
            current.cost,
            current.size
        );

        current = self.merge(current, weights, max_space);
        if current.size > max_space {
            current = self.repair(current, weights, max_space)?;
        }

        info!(
            "Selected {} indexes: cost {:.2}, size {:.0}",
            current.indexes.len(),
            current.cost,
            current.size
        );
        Ok(current.into_selection())
    }

    fn evaluate(&self, indexes: Vec<IndexRef>, weights: &[f64]) -> AdvisorResult<Evaluation> {
        let planner = Planner::new(self.workload, &indexes, self.cost_model);
        let results: Vec<AdvisorResult<StatementPlan>> = self
            .workload
            .statements()
            .par_iter()
            .map(|statement| planner.plan_statement(statement))
            .collect();
        // Sequential collection reports the first failing statement.
        let plans = results.into_iter().collect::<AdvisorResult<Vec<_>>>()?;

        let cost = plans
            .iter()
            .enumerate()
            .map(|(i, plan)| weights.get(i).copied().unwrap_or(0.0) * plan.cost())
            .sum();
        let size = indexes.iter().map(|index| index.size()).sum();
        Ok(Evaluation {
            indexes,
            plans,
            cost,
            size,
        })
    }

    /// Removes indexes no plan reads, they only add maintenance cost.
    fn prune(&self, mut evaluation: Evaluation, weights: &[f64]) -> Evaluation {
        loop {
            let used = evaluation.used_indexes();
            if used.len() == evaluation.indexes.len() {
                return evaluation;
            }
            match self.evaluate(used, weights) {
                Ok(next) => evaluation = next,
                Err(e) => {
                    warn!("Keeping unused indexes: {}", e);
                    return evaluation;
                }
            }
        }
    }

    /// Index sets obtained by applying one rule to one pair, in pair order then rule order.
    fn merge_proposals(&self, indexes: &[IndexRef]) -> Vec<(String, Vec<IndexRef>)> {
        let model = self.workload.model();
        let mut proposals = vec![];
        for (i, j) in (0..indexes.len()).tuple_combinations() {
            for rule in &self.rules {
                let merged = match rule.merge(model, &indexes[i], &indexes[j]) {
                    Some(merged) => Arc::new(merged),
                    None => continue,
                };
                let merged_set = indexes
                    .iter()
                    .enumerate()
                    .filter(|(k, _)| *k != j)
                    .map(|(k, index)| if k == i { merged.clone() } else { index.clone() })
                    .unique()
                    .collect();
                proposals.push((
                    format!(
                        "{} of {} and {}",
                        rule,
                        indexes[i].display(model),
                        indexes[j].display(model)
                    ),
                    merged_set,
                ));
            }
        }
        proposals
    }

    fn merge(&self, mut current: Evaluation, weights: &[f64], max_space: f64) -> Evaluation {
        let policy = &self.config.merge_policy;
        for round in 0..self.config.max_merge_iterations {
            // The merge loop stops when no proposal is accepted
            let proposals = self.merge_proposals(&current.indexes);
            let evaluated: Vec<Option<(String, Evaluation)>> = proposals
                .into_par_iter()
                .map(|(description, indexes)| {
                    self.evaluate(indexes, weights)
                        .ok()
                        .map(|evaluation| (description, evaluation))
                })
                .collect();

            let fits = |e: &Evaluation| {
                e.size <= max_space || (current.size > max_space && e.size < current.size)
            };
            let best = evaluated
                .into_iter()
                .flatten()
                .filter(|(_, e)| fits(e) && policy.accepts(current.cost, current.size, e.cost, e.size))
                .min_by(|(_, a), (_, b)| a.cost.total_cmp(&b.cost).then(a.size.total_cmp(&b.size)));

            match best {
                Some((description, merged)) => {
                    debug!(
                        "Merge round {}: applied {}, cost {:.2} -> {:.2}, size {:.0} -> {:.0}",
                        round, description, current.cost, merged.cost, current.size, merged.size
                    );
                    current = self.prune(merged, weights);
                }
                None => {
                    debug!("Reached fixed point after {} merge rounds", round);
                    break;
                }
            }
        }
        current
    }

    /// Drops the index whose removal raises the cost least until the selection fits.
    fn repair(&self, mut current: Evaluation, weights: &[f64], max_space: f64) -> AdvisorResult<Evaluation> {
        while current.size > max_space {
            let attempts: Vec<AdvisorResult<Evaluation>> = (0..current.indexes.len())
                .into_par_iter()
                .map(|dropped| {
                    let remaining = current
                        .indexes
                        .iter()
                        .enumerate()
                        .filter(|(k, _)| *k != dropped)
                        .map(|(_, index)| index.clone())
                        .collect();
                    self.evaluate(remaining, weights)
                })
                .collect();

            let mut blocker = None;
            let mut best: Option<Evaluation> = None;
            for attempt in attempts {
                match attempt {
                    Ok(e) => {
                        if best.as_ref().map_or(true, |b| e.cost < b.cost) {
                            best = Some(e);
                        }
                    }
                    Err(AdvisorError::NoPlan { statement }) => {
                        blocker.get_or_insert(statement);
                    }
                    Err(e) => return Err(e),
                }
            }

            match best {
                Some(next) => {
                    debug!(
                        "Dropped an index to fit {:.0} bytes: cost {:.2} -> {:.2}, size {:.0} -> {:.0}",
                        max_space, current.cost, next.cost, current.size, next.size
                    );
                    current = self.prune(next, weights);
                }
                None => {
                    return Err(AdvisorError::CapacityInfeasible {
                        max_space,
                        required: current.size,
                        statement: blocker.unwrap_or_default(),
                    })
                }
            }
        }
        Ok(current)
    }
}
