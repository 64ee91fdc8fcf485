use std::collections::{BTreeSet, HashSet};
use std::fmt::{Display, Formatter};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use itertools::Itertools;
use prettytable::Table;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::error::{AdvisorError, AdvisorResult};
use crate::model::{EntityId, FieldId, Model};

pub type IndexRef = Arc<Index>;

pub type IndexPath = SmallVec<[EntityId; 4]>;

/// A materialized, denormalized index.
///
/// Entries are keyed by the hash fields (equality only), sorted by the order fields and carry the
/// extra fields as payload. The path is the foreign key route the index spans in lookup order:
/// `path[0]` is the entity whose rows the hash key starts from.
///
/// Derived sizes are estimates computed from the model at construction.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Index {
    hash_fields: BTreeSet<FieldId>,
    order_fields: Vec<FieldId>,
    extra: BTreeSet<FieldId>,
    path: IndexPath,
    entries: f64,
    hash_count: f64,
    entry_size: usize,
    size: f64,
}

/// The `eq` should ignore derived sizes.
impl PartialEq for Index {
    fn eq(&self, other: &Self) -> bool {
        self.hash_fields == other.hash_fields
            && self.order_fields == other.order_fields
            && self.extra == other.extra
            && self.path == other.path
    }
}

impl Eq for Index {}

impl Hash for Index {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.hash_fields.hash(state);
        self.order_fields.hash(state);
        self.extra.hash(state);
        self.path.hash(state);
    }
}

impl Index {
    /// Builds an index, appending the ID of every path entity that is not yet a key field to the
    /// order fields so entries stay unique.
    ///
    /// # Errors
    ///
    /// [`AdvisorError::InvalidIndex`] when the path is empty, repeats an entity or is not joined
    /// by foreign keys, when there is no hash field, when the field groups overlap, or when a
    /// field lies outside the path.
    pub fn new<H, O, E, P>(model: &Model, hash: H, order: O, extra: E, path: P) -> AdvisorResult<Self>
    where
        H: IntoIterator<Item = FieldId>,
        O: IntoIterator<Item = FieldId>,
        E: IntoIterator<Item = FieldId>,
        P: IntoIterator<Item = EntityId>,
    {
        let hash_fields: BTreeSet<FieldId> = hash.into_iter().collect();
        let mut order_fields: Vec<FieldId> = order.into_iter().collect();
        let mut extra: BTreeSet<FieldId> = extra.into_iter().collect();
        let path: IndexPath = path.into_iter().collect();

        if path.is_empty() {
            return Err(AdvisorError::InvalidIndex("empty path".to_string()));
        }
        if path.iter().collect::<HashSet<_>>().len() != path.len() {
            return Err(AdvisorError::InvalidIndex(
                "path repeats an entity".to_string(),
            ));
        }
        if !model.is_connected_path(&path) {
            return Err(AdvisorError::InvalidIndex(format!(
                "path {} is not joined by foreign keys",
                path.iter().map(|e| model.entity_name(*e)).join(".")
            )));
        }
        if hash_fields.is_empty() {
            return Err(AdvisorError::InvalidIndex("no hash fields".to_string()));
        }
        if order_fields.iter().unique().count() != order_fields.len() {
            return Err(AdvisorError::InvalidIndex(
                "order fields repeat a field".to_string(),
            ));
        }
        if let Some(field) = order_fields
            .iter()
            .find(|f| hash_fields.contains(*f) || extra.contains(*f))
            .or_else(|| hash_fields.intersection(&extra).next())
        {
            return Err(AdvisorError::InvalidIndex(format!(
                "`{}` appears in more than one field group",
                model.field_name(*field)
            )));
        }
        if let Some(field) = hash_fields
            .iter()
            .chain(order_fields.iter())
            .chain(extra.iter())
            .find(|f| !path.contains(&model.field_entity(**f)))
        {
            return Err(AdvisorError::InvalidIndex(format!(
                "`{}` is not on the index path",
                model.field_name(*field)
            )));
        }

        for entity in &path {
            let id = model.id_field(*entity);
            if !hash_fields.contains(&id) && !order_fields.contains(&id) {
                extra.remove(&id);
                order_fields.push(id);
            }
        }

        let entries = model.path_entries(&path);
        let hash_count = hash_fields
            .iter()
            .map(|f| model.field(*f).cardinality())
            .product::<f64>()
            .min(entries)
            .max(1.0);
        let entry_size = hash_fields
            .iter()
            .chain(order_fields.iter())
            .chain(extra.iter())
            .map(|f| model.field(*f).size())
            .sum::<usize>();

        Ok(Self {
            hash_fields,
            order_fields,
            extra,
            path,
            entries,
            hash_count,
            entry_size,
            size: entry_size as f64 * entries,
        })
    }

    /// The index any stored entity needs: keyed by its ID, carrying every other field.
    pub fn simple(model: &Model, entity: EntityId) -> AdvisorResult<Self> {
        let id = model.id_field(entity);
        Self::new(
            model,
            [id],
            [],
            model.entity(entity).fields().iter().copied().filter(|f| *f != id),
            [entity],
        )
    }

    pub fn hash_fields(&self) -> &BTreeSet<FieldId> {
        &self.hash_fields
    }

    pub fn order_fields(&self) -> &[FieldId] {
        &self.order_fields
    }

    pub fn extra(&self) -> &BTreeSet<FieldId> {
        &self.extra
    }

    pub fn path(&self) -> &[EntityId] {
        &self.path
    }

    /// Hash fields, then order fields, then extra fields.
    pub fn all_fields(&self) -> impl Iterator<Item = FieldId> + '_ {
        self.hash_fields
            .iter()
            .chain(self.order_fields.iter())
            .chain(self.extra.iter())
            .copied()
    }

    pub fn contains_field(&self, field: FieldId) -> bool {
        self.hash_fields.contains(&field)
            || self.order_fields.contains(&field)
            || self.extra.contains(&field)
    }

    pub fn is_key_field(&self, field: FieldId) -> bool {
        self.hash_fields.contains(&field) || self.order_fields.contains(&field)
    }

    /// Number of entries stored.
    pub fn entries(&self) -> f64 {
        self.entries
    }

    /// Number of distinct hash keys.
    pub fn hash_count(&self) -> f64 {
        self.hash_count
    }

    /// Entries returned by one hash key.
    pub fn per_hash_count(&self) -> f64 {
        self.entries / self.hash_count
    }

    /// Bytes of one entry.
    pub fn entry_size(&self) -> usize {
        self.entry_size
    }

    /// Bytes of the whole index.
    pub fn size(&self) -> f64 {
        self.size
    }

    /// Wraps the index for display with field and entity names.
    pub fn display<'a>(&'a self, model: &'a Model) -> IndexDisplay<'a> {
        IndexDisplay { index: self, model }
    }
}

pub struct IndexDisplay<'a> {
    index: &'a Index,
    model: &'a Model,
}

impl Display for IndexDisplay<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}][{}][{}] {}",
            field_names(self.model, self.index.hash_fields.iter()),
            field_names(self.model, self.index.order_fields.iter()),
            field_names(self.model, self.index.extra.iter()),
            self.index
                .path
                .iter()
                .map(|e| self.model.entity_name(*e))
                .join(" -> ")
        )
    }
}

fn field_names<'a>(model: &Model, fields: impl Iterator<Item = &'a FieldId>) -> String {
    fields.map(|field| model.field_name(*field)).join(", ")
}

impl Model {
    /// The ID keyed index of every entity.
    pub fn simple_indexes(&self) -> AdvisorResult<Vec<IndexRef>> {
        self.entities()
            .map(|e| Index::simple(self, e.id()).map(Arc::new))
            .collect()
    }
}

/// Renders an index set with its sizes.
pub fn index_table(indexes: &[IndexRef], model: &Model) -> Table {
    let mut table = Table::new();
    table.set_titles(row!["Index", "Entries", "Entry size", "Size"]);
    for index in indexes {
        table.add_row(row![
            index.display(model),
            format!("{:.0}", index.entries()),
            index.entry_size(),
            format!("{:.0}", index.size())
        ]);
    }
    table
}
