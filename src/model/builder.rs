use std::collections::HashMap;

use crate::error::{AdvisorError, AdvisorResult};
use crate::model::{Entity, EntityId, Field, FieldId, FieldType, Model};

struct PendingField {
    name: String,
    field_type: FieldType,
    size: Option<usize>,
    cardinality: Option<f64>,
    target: Option<String>,
}

struct PendingEntity {
    name: String,
    count: f64,
    fields: Vec<PendingField>,
}

/// Chained builder of a [`Model`].
///
/// Fields attach to the most recently declared entity, `with_size` and `with_cardinality` to the
/// most recently declared field. Foreign keys may reference entities declared later. Mistakes are
/// collected and reported by [`ModelBuilder::build`].
///
/// ```
/// use nosql_advisor::model::{FieldType, ModelBuilder};
///
/// let model = ModelBuilder::new()
///     .entity("regions", 10.0)
///     .id("id")
///     .field("name", FieldType::String)
///     .with_size(20)
///     .entity("users", 1000.0)
///     .id("id")
///     .foreign_key("region_id", "regions")
///     .build()
///     .unwrap();
/// assert!(model.find_field("users.region_id").is_some());
/// ```
#[derive(Default)]
pub struct ModelBuilder {
    entities: Vec<PendingEntity>,
    errors: Vec<String>,
}

impl ModelBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entity<S: Into<String>>(mut self, name: S, count: f64) -> Self {
        self.entities.push(PendingEntity {
            name: name.into(),
            count,
            fields: vec![],
        });
        self
    }

    pub fn id<S: Into<String>>(self, name: S) -> Self {
        self.push_field(name.into(), FieldType::Id, None)
    }

    pub fn field<S: Into<String>>(self, name: S, field_type: FieldType) -> Self {
        if field_type == FieldType::ForeignKey {
            let mut this = self;
            this.errors.push(format!(
                "foreign key `{}` must be declared with `foreign_key`",
                name.into()
            ));
            return this;
        }
        self.push_field(name.into(), field_type, None)
    }

    pub fn foreign_key<S: Into<String>, T: Into<String>>(self, name: S, target: T) -> Self {
        self.push_field(name.into(), FieldType::ForeignKey, Some(target.into()))
    }

    pub fn with_size(mut self, size: usize) -> Self {
        match self.last_field() {
            Some(field) => field.size = Some(size),
            None => self.errors.push("size given before any field".to_string()),
        }
        self
    }

    pub fn with_cardinality(mut self, cardinality: f64) -> Self {
        match self.last_field() {
            Some(field) => field.cardinality = Some(cardinality),
            None => self.errors.push("cardinality given before any field".to_string()),
        }
        self
    }

    fn last_field(&mut self) -> Option<&mut PendingField> {
        self.entities.last_mut().and_then(|e| e.fields.last_mut())
    }

    fn push_field(mut self, name: String, field_type: FieldType, target: Option<String>) -> Self {
        match self.entities.last_mut() {
            Some(entity) => entity.fields.push(PendingField {
                name,
                field_type,
                size: None,
                cardinality: None,
                target,
            }),
            None => self
                .errors
                .push(format!("field `{}` declared outside an entity", name)),
        }
        self
    }

    pub fn build(self) -> AdvisorResult<Model> {
        if let Some(error) = self.errors.into_iter().next() {
            return Err(AdvisorError::InvalidModel(error));
        }

        let mut entity_names = HashMap::new();
        for (idx, entity) in self.entities.iter().enumerate() {
            if !(entity.count.is_finite() && entity.count > 0.0) {
                return Err(AdvisorError::InvalidModel(format!(
                    "entity `{}` must have a positive count",
                    entity.name
                )));
            }
            if entity_names
                .insert(entity.name.clone(), EntityId::from(idx as u32))
                .is_some()
            {
                return Err(AdvisorError::InvalidModel(format!(
                    "duplicate entity `{}`",
                    entity.name
                )));
            }
        }

        let mut model = Model {
            entities: Vec::with_capacity(self.entities.len()),
            fields: vec![],
            entity_names,
            field_names: HashMap::new(),
            graph: Default::default(),
        };
        for idx in 0..self.entities.len() {
            model.graph.add_node(EntityId::from(idx as u32));
        }

        for (idx, pending) in self.entities.iter().enumerate() {
            let entity_id = EntityId::from(idx as u32);
            let mut field_ids = Vec::with_capacity(pending.fields.len());
            let mut id_field = None;

            for field in &pending.fields {
                let field_id = FieldId::from(model.fields.len() as u32);
                let full_name = format!("{}.{}", pending.name, field.name);
                if model.field_names.insert(full_name.clone(), field_id).is_some() {
                    return Err(AdvisorError::InvalidModel(format!(
                        "duplicate field `{}`",
                        full_name
                    )));
                }

                let target = match &field.target {
                    Some(name) => Some(model.find_entity(name).ok_or_else(|| {
                        AdvisorError::InvalidModel(format!(
                            "foreign key `{}` references unknown entity `{}`",
                            full_name, name
                        ))
                    })?),
                    None => None,
                };

                if field.field_type == FieldType::Id {
                    if id_field.is_some() {
                        return Err(AdvisorError::InvalidModel(format!(
                            "entity `{}` declares more than one ID",
                            pending.name
                        )));
                    }
                    id_field = Some(field_id);
                }

                let cardinality = match (field.field_type, target) {
                    (FieldType::Id, _) => pending.count,
                    (FieldType::ForeignKey, Some(target)) => {
                        self.entities[target.index()].count.min(pending.count)
                    }
                    (FieldType::Boolean, _) => field.cardinality.unwrap_or(2.0),
                    _ => field.cardinality.unwrap_or(pending.count),
                };

                if let Some(target) = target {
                    model.graph.add_edge(
                        petgraph::graph::NodeIndex::new(idx),
                        petgraph::graph::NodeIndex::new(target.index()),
                        field_id,
                    );
                }

                model.fields.push(Field {
                    id: field_id,
                    entity: entity_id,
                    name: field.name.clone(),
                    full_name,
                    field_type: field.field_type,
                    size: field.size.unwrap_or_else(|| field.field_type.default_size()),
                    cardinality: cardinality.clamp(1.0, pending.count.max(1.0)),
                    target,
                });
                field_ids.push(field_id);
            }

            let id_field = id_field.ok_or_else(|| {
                AdvisorError::InvalidModel(format!("entity `{}` has no ID field", pending.name))
            })?;
            model.entities.push(Entity {
                id: entity_id,
                name: pending.name.clone(),
                count: pending.count,
                fields: field_ids,
                id_field,
            });
        }

        Ok(model)
    }
}
