use std::collections::BTreeSet;

use enum_dispatch::enum_dispatch;

use crate::index::Index;
use crate::model::{FieldId, Model};

/// Combines two indexes into one serving the statements of both.
#[enum_dispatch]
pub trait MergeRule {
    /// # Return
    ///
    /// The merged index, or `None` when the rule does not match the pair.
    fn merge(&self, model: &Model, a: &Index, b: &Index) -> Option<Index>;
}

#[enum_dispatch(MergeRule)]
#[derive(Clone, Debug, strum_macros::Display)]
pub enum MergeRuleImpl {
    MergeExtras(MergeExtras),
    MergeOrderPrefix(MergeOrderPrefix),
}

impl MergeRuleImpl {
    pub fn all() -> Vec<MergeRuleImpl> {
        vec![MergeExtras.into(), MergeOrderPrefix.into()]
    }
}

/// Same path, hash and order fields: carry the union of both payloads.
#[derive(Clone, Debug)]
pub struct MergeExtras;

impl MergeRule for MergeExtras {
    fn merge(&self, model: &Model, a: &Index, b: &Index) -> Option<Index> {
        if a.path() != b.path()
            || a.hash_fields() != b.hash_fields()
            || a.order_fields() != b.order_fields()
            || a.extra() == b.extra()
        {
            return None;
        }

        Index::new(
            model,
            a.hash_fields().iter().copied(),
            a.order_fields().iter().copied(),
            a.extra().union(b.extra()).copied(),
            a.path().iter().copied(),
        )
        .ok()
    }
}

/// Same path and hash fields, the order of one a strict prefix of the other's: keep the longer
/// order and the union of both payloads.
#[derive(Clone, Debug)]
pub struct MergeOrderPrefix;

impl MergeRule for MergeOrderPrefix {
    fn merge(&self, model: &Model, a: &Index, b: &Index) -> Option<Index> {
        if a.path() != b.path() || a.hash_fields() != b.hash_fields() {
            return None;
        }
        let (a_order, b_order) = (declared_order(model, a), declared_order(model, b));
        let (short, long) = if a_order.len() < b_order.len() {
            (a_order, b_order)
        } else {
            (b_order, a_order)
        };
        if short.len() == long.len() || !long.starts_with(short) {
            return None;
        }

        let extra: BTreeSet<FieldId> = a
            .all_fields()
            .chain(b.all_fields())
            .filter(|f| !a.hash_fields().contains(f) && !long.contains(f))
            .collect();
        Index::new(
            model,
            a.hash_fields().iter().copied(),
            long.iter().copied(),
            extra,
            a.path().iter().copied(),
        )
        .ok()
    }
}

/// Order fields without the IDs appended to keep entries unique.
fn declared_order<'a>(model: &Model, index: &'a Index) -> &'a [FieldId] {
    let order = index.order_fields();
    let implicit = order
        .iter()
        .rev()
        .take_while(|f| model.field(**f).is_id())
        .count();
    &order[..order.len() - implicit]
}
