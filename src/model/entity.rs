use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};

use crate::model::FieldId;

/// Position of an entity in the model's entity arena. It is also the entity's node index in the
/// foreign key graph.
#[derive(
    Copy, Clone, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Display, From, Into, Serialize, Deserialize,
)]
#[display(fmt = "e{}", _0)]
pub struct EntityId(u32);

impl EntityId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub(super) id: EntityId,
    pub(super) name: String,
    pub(super) count: f64,
    /// Fields in declaration order.
    pub(super) fields: Vec<FieldId>,
    pub(super) id_field: FieldId,
}

impl Entity {
    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Estimated number of rows.
    pub fn count(&self) -> f64 {
        self.count
    }

    pub fn fields(&self) -> &[FieldId] {
        &self.fields
    }

    /// The immutable primary key.
    pub fn id_field(&self) -> FieldId {
        self.id_field
    }
}
