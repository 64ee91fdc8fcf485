use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};

use crate::model::EntityId;

/// Position of a field in the model's field arena.
#[derive(
    Copy, Clone, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Display, From, Into, Serialize, Deserialize,
)]
#[display(fmt = "f{}", _0)]
pub struct FieldId(u32);

impl FieldId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(
    Copy,
    Clone,
    Debug,
    Hash,
    Eq,
    PartialEq,
    Serialize,
    Deserialize,
    strum_macros::Display,
    strum_macros::EnumString,
    strum_macros::EnumIter,
)]
#[strum(serialize_all = "snake_case")]
pub enum FieldType {
    Id,
    String,
    Integer,
    Float,
    Date,
    Boolean,
    ForeignKey,
}

impl FieldType {
    /// Bytes one value occupies when no explicit size is declared.
    pub fn default_size(&self) -> usize {
        match self {
            FieldType::Id | FieldType::ForeignKey => 16,
            FieldType::Integer | FieldType::Float | FieldType::Date => 8,
            FieldType::Boolean => 1,
            FieldType::String => 10,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub(super) id: FieldId,
    pub(super) entity: EntityId,
    pub(super) name: String,
    pub(super) full_name: String,
    pub(super) field_type: FieldType,
    pub(super) size: usize,
    pub(super) cardinality: f64,
    /// Referenced entity of a foreign key.
    pub(super) target: Option<EntityId>,
}

impl Field {
    pub fn id(&self) -> FieldId {
        self.id
    }

    pub fn entity(&self) -> EntityId {
        self.entity
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `entity.field`
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Estimated number of distinct values.
    pub fn cardinality(&self) -> f64 {
        self.cardinality
    }

    pub fn target(&self) -> Option<EntityId> {
        self.target
    }

    pub fn is_id(&self) -> bool {
        self.field_type == FieldType::Id
    }
}
