use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use itertools::Itertools;
use log::{debug, warn};

use crate::index::{Index, IndexRef};
use crate::model::{EntityId, FieldId};
use crate::workload::{Query, Statement, Workload};

/// Derives candidate indexes from a workload.
///
/// Enumeration is a pure function of the workload: every call returns the same candidates in
/// the same order, deduplicated across statements in discovery order.
pub struct IndexEnumerator<'a> {
    workload: &'a Workload,
}

impl<'a> IndexEnumerator<'a> {
    pub fn new(workload: &'a Workload) -> Self {
        Self { workload }
    }

    pub fn indexes_for_workload(&self) -> Vec<IndexRef> {
        let mut seen = HashSet::new();
        let mut candidates = vec![];
        for statement in self.workload.statements() {
            for index in self.indexes_for_statement(statement) {
                if !seen.contains(&index) {
                    seen.insert(index.clone());
                    candidates.push(Arc::new(index));
                }
            }
        }

        debug!(
            "Enumerated {} candidate indexes for {} statements",
            candidates.len(),
            self.workload.len()
        );
        candidates
    }

    pub fn indexes_for_statement(&self, statement: &Statement) -> Vec<Index> {
        let model = self.workload.model();
        let mut indexes = match statement {
            Statement::Query(query) => self.indexes_for_query(query),
            _ => statement
                .support_query(model)
                .map(|query| self.indexes_for_query(&query))
                .unwrap_or_default(),
        };

        if statement.is_write() {
            match Index::simple(model, statement.entity()) {
                Ok(index) => indexes.push(index),
                Err(e) => warn!("Skipping ID index of `{}`: {}", statement.label(), e),
            }
        }

        debug!(
            "Statement `{}` yields {} candidate indexes",
            statement.label(),
            indexes.len()
        );
        indexes
    }

    pub fn indexes_for_query(&self, query: &Query) -> Vec<Index> {
        let model = self.workload.model();
        let lookup_start = query.lookup_path()[0];
        let eq_fields: Vec<FieldId> = query.eq_conditions().map(|c| c.field).unique().collect();
        let range_fields: Vec<FieldId> = query
            .range_conditions()
            .map(|c| c.field)
            .unique()
            .collect();
        let needed = query.needed_fields();

        let mut indexes = vec![];
        for path in query.graph().lookup_paths() {
            let on_path = |field: &FieldId| path.contains(&model.field_entity(*field));
            let path_eq: Vec<FieldId> = eq_fields.iter().copied().filter(on_path).collect();
            let first_lookup = path[0] == lookup_start;

            let hash_variants: Vec<BTreeSet<FieldId>> = if first_lookup {
                if path_eq.is_empty() {
                    if !query.is_scan() {
                        // A first lookup must bind a predicate.
                        continue;
                    }
                    vec![BTreeSet::from([model.id_field(path[0])])]
                } else {
                    path_eq
                        .iter()
                        .copied()
                        .powerset()
                        .filter(|subset| !subset.is_empty())
                        .map(|subset| subset.into_iter().collect())
                        .collect()
                }
            } else {
                // Later lookups join on the ID reached so far.
                let join_key = model.id_field(path[0]);
                path_eq
                    .iter()
                    .copied()
                    .filter(|f| *f != join_key)
                    .powerset()
                    .map(|subset| subset.into_iter().chain([join_key]).collect())
                    .collect()
            };

            let order_variants = self.order_variants(query, &path, &range_fields, first_lookup);

            for hash in &hash_variants {
                for order in &order_variants {
                    let order: Vec<FieldId> =
                        order.iter().copied().filter(|f| !hash.contains(f)).collect();
                    let full_extra: BTreeSet<FieldId> = needed
                        .iter()
                        .copied()
                        .filter(|f| on_path(f) && !hash.contains(f) && !order.contains(f))
                        .collect();

                    let mut extra_variants = vec![full_extra];
                    if !extra_variants[0].is_empty() {
                        extra_variants.push(BTreeSet::new());
                    }

                    for extra in extra_variants {
                        match Index::new(
                            model,
                            hash.iter().copied(),
                            order.iter().copied(),
                            extra,
                            path.iter().copied(),
                        ) {
                            Ok(index) => {
                                if !indexes.contains(&index) {
                                    indexes.push(index)
                                }
                            }
                            Err(e) => warn!(
                                "Skipping candidate for query `{}`: {}",
                                query.label(),
                                e
                            ),
                        }
                    }
                }
            }
        }

        indexes
    }

    /// Order field sequences worth trying on a path: at most one range field first, then the
    /// query's ordering when it lies on the path and the index can start the plan.
    fn order_variants(
        &self,
        query: &Query,
        path: &[EntityId],
        range_fields: &[FieldId],
        first_lookup: bool,
    ) -> Vec<Vec<FieldId>> {
        let model = self.workload.model();
        let on_path = |field: &FieldId| path.contains(&model.field_entity(*field));
        let order_by: Vec<FieldId> = if first_lookup && query.order().iter().all(on_path) {
            query.order().to_vec()
        } else {
            vec![]
        };

        let ranges = std::iter::once(None).chain(
            range_fields
                .iter()
                .copied()
                .filter(on_path)
                .map(Some),
        );

        let mut variants = vec![];
        for range in ranges {
            let prefix: Vec<FieldId> = range.into_iter().collect();
            variants.push(prefix.clone());
            if !order_by.is_empty() {
                variants.push(
                    prefix
                        .into_iter()
                        .chain(order_by.iter().copied())
                        .unique()
                        .collect(),
                );
            }
        }
        variants
    }
}
