use std::collections::BTreeSet;

use crate::error::{AdvisorError, AdvisorResult};
use crate::model::{EntityId, FieldId, Model};
use crate::workload::{Condition, Delete, Insert, Operator, Query, QueryGraph, Update};

/// Clauses shared by every statement builder, kept as names until `build` resolves them.
struct Clauses {
    label: String,
    entity: String,
    path: Option<Vec<String>>,
    conditions: Vec<(String, Operator)>,
}

/// Statement clauses resolved against a model.
struct Resolved {
    path: Vec<EntityId>,
    graph: QueryGraph,
    conditions: Vec<Condition>,
}

impl Clauses {
    fn new(label: String, entity: String) -> Self {
        Self {
            label,
            entity,
            path: None,
            conditions: vec![],
        }
    }

    fn error<R: Into<String>>(&self, reason: R) -> AdvisorError {
        AdvisorError::invalid_statement(self.label.clone(), reason)
    }

    fn entity(&self, model: &Model, name: &str) -> AdvisorResult<EntityId> {
        model
            .find_entity(name)
            .ok_or_else(|| self.error(format!("unknown entity `{}`", name)))
    }

    /// Resolves `entity.field`, or a bare field name of the base entity.
    fn field(&self, model: &Model, name: &str) -> AdvisorResult<FieldId> {
        let full_name = if name.contains('.') {
            name.to_string()
        } else {
            format!("{}.{}", self.entity, name)
        };
        model
            .find_field(&full_name)
            .ok_or_else(|| self.error(format!("unknown field `{}`", full_name)))
    }

    /// Resolves field names; `entity.*` expands to every field of the entity.
    fn fields(&self, model: &Model, names: &[String]) -> AdvisorResult<Vec<FieldId>> {
        let mut fields = vec![];
        for name in names {
            if let Some(entity) = name.strip_suffix(".*") {
                let entity = self.entity(model, entity)?;
                fields.extend(model.entity(entity).fields().iter().copied());
            } else {
                fields.push(self.field(model, name)?);
            }
        }
        let mut seen = BTreeSet::new();
        fields.retain(|f| seen.insert(*f));
        Ok(fields)
    }

    /// Resolves the statement path and conditions. `referenced` are the other fields the
    /// statement mentions; without an explicit path the shortest path from the base entity to the
    /// farthest referenced entity is used.
    fn resolve(&self, model: &Model, referenced: &[FieldId]) -> AdvisorResult<Resolved> {
        let base = self.entity(model, &self.entity)?;
        let conditions = self
            .conditions
            .iter()
            .map(|(name, op)| Ok(Condition::new(self.field(model, name)?, *op)))
            .collect::<AdvisorResult<Vec<_>>>()?;

        let touched: Vec<EntityId> = referenced
            .iter()
            .copied()
            .chain(conditions.iter().map(|c| c.field))
            .map(|f| model.field_entity(f))
            .collect();

        let path = match &self.path {
            Some(names) => names
                .iter()
                .map(|name| self.entity(model, name))
                .collect::<AdvisorResult<Vec<_>>>()?,
            None => {
                let mut longest = vec![base];
                for entity in &touched {
                    let path = model
                        .find_path(base, *entity, model.entity_count())
                        .ok_or_else(|| {
                            self.error(format!(
                                "`{}` is not reachable from `{}`",
                                model.entity_name(*entity),
                                self.entity
                            ))
                        })?;
                    if path.len() > longest.len() {
                        longest = path;
                    }
                }
                longest
            }
        };

        if path.first() != Some(&base) {
            return Err(self.error(format!("path must start at `{}`", self.entity)));
        }
        let graph = QueryGraph::from_path(model, &path).map_err(|reason| self.error(reason))?;
        if let Some(stray) = touched.iter().find(|e| !graph.contains(**e)) {
            return Err(self.error(format!(
                "`{}` is not on the statement path",
                model.entity_name(*stray)
            )));
        }

        Ok(Resolved {
            path,
            graph,
            conditions,
        })
    }
}

macro_rules! clause_methods {
    () => {
        /// Entities joined from the base entity, the base entity first.
        pub fn path<I, S>(mut self, path: I) -> Self
        where
            I: IntoIterator<Item = S>,
            S: Into<String>,
        {
            self.clauses.path = Some(path.into_iter().map(Into::into).collect());
            self
        }

        pub fn condition<S: Into<String>>(mut self, field: S, operator: Operator) -> Self {
            self.clauses.conditions.push((field.into(), operator));
            self
        }

        pub fn eq<S: Into<String>>(self, field: S) -> Self {
            self.condition(field, Operator::Eq)
        }
    };
}

/// Builds a [`Query`].
///
/// ```
/// use nosql_advisor::model::{FieldType, ModelBuilder};
/// use nosql_advisor::workload::QueryBuilder;
///
/// let model = ModelBuilder::new()
///     .entity("regions", 10.0).id("id").field("name", FieldType::String)
///     .entity("users", 1000.0).id("id").foreign_key("region_id", "regions")
///     .build()
///     .unwrap();
/// let query = QueryBuilder::new("region_of_user", "regions")
///     .select("name")
///     .eq("users.id")
///     .build(&model)
///     .unwrap();
/// assert_eq!(query.path().len(), 2);
/// ```
pub struct QueryBuilder {
    clauses: Clauses,
    select: Vec<String>,
    order: Vec<String>,
    limit: Option<u64>,
}

impl QueryBuilder {
    pub fn new<L: Into<String>, E: Into<String>>(label: L, entity: E) -> Self {
        Self {
            clauses: Clauses::new(label.into(), entity.into()),
            select: vec![],
            order: vec![],
            limit: None,
        }
    }

    clause_methods!();

    pub fn select<S: Into<String>>(mut self, field: S) -> Self {
        self.select.push(field.into());
        self
    }

    pub fn order_by<S: Into<String>>(mut self, field: S) -> Self {
        self.order.push(field.into());
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn build(self, model: &Model) -> AdvisorResult<Query> {
        let clauses = &self.clauses;
        let select = clauses.fields(model, &self.select)?;
        if select.is_empty() {
            return Err(clauses.error("query selects no fields"));
        }
        let order = clauses.fields(model, &self.order)?;
        let referenced: Vec<FieldId> = select.iter().chain(order.iter()).copied().collect();
        let resolved = clauses.resolve(model, &referenced)?;

        Ok(Query {
            label: clauses.label.clone(),
            path: resolved.path,
            select,
            conditions: resolved.conditions,
            order,
            limit: self.limit,
            graph: resolved.graph,
        })
    }
}

/// Builds an [`Insert`]. Without explicit settings every field of the entity is written.
pub struct InsertBuilder {
    clauses: Clauses,
    settings: Vec<String>,
}

impl InsertBuilder {
    pub fn new<L: Into<String>, E: Into<String>>(label: L, entity: E) -> Self {
        Self {
            clauses: Clauses::new(label.into(), entity.into()),
            settings: vec![],
        }
    }

    pub fn set<S: Into<String>>(mut self, field: S) -> Self {
        self.settings.push(field.into());
        self
    }

    pub fn build(self, model: &Model) -> AdvisorResult<Insert> {
        let clauses = &self.clauses;
        let entity = clauses.entity(model, &clauses.entity)?;
        let mut settings = clauses.fields(model, &self.settings)?;
        if settings.is_empty() {
            settings = model.entity(entity).fields().to_vec();
        }
        if settings.iter().any(|f| model.field_entity(*f) != entity) {
            return Err(clauses.error("insert sets fields of another entity"));
        }
        if !settings.contains(&model.id_field(entity)) {
            settings.insert(0, model.id_field(entity));
        }

        Ok(Insert {
            label: clauses.label.clone(),
            entity,
            settings,
        })
    }
}

pub struct UpdateBuilder {
    clauses: Clauses,
    settings: Vec<String>,
}

impl UpdateBuilder {
    pub fn new<L: Into<String>, E: Into<String>>(label: L, entity: E) -> Self {
        Self {
            clauses: Clauses::new(label.into(), entity.into()),
            settings: vec![],
        }
    }

    clause_methods!();

    pub fn set<S: Into<String>>(mut self, field: S) -> Self {
        self.settings.push(field.into());
        self
    }

    pub fn build(self, model: &Model) -> AdvisorResult<Update> {
        let clauses = &self.clauses;
        let settings = clauses.fields(model, &self.settings)?;
        if settings.is_empty() {
            return Err(clauses.error("update sets no fields"));
        }
        let resolved = clauses.resolve(model, &[])?;
        let entity = resolved.path[0];
        if settings.iter().any(|f| model.field_entity(*f) != entity) {
            return Err(clauses.error("update sets fields of another entity"));
        }
        if settings.iter().any(|f| model.field(*f).is_id()) {
            return Err(clauses.error("ID fields are immutable"));
        }

        Ok(Update {
            label: clauses.label.clone(),
            path: resolved.path,
            settings,
            conditions: resolved.conditions,
            graph: resolved.graph,
        })
    }
}

pub struct DeleteBuilder {
    clauses: Clauses,
}

impl DeleteBuilder {
    pub fn new<L: Into<String>, E: Into<String>>(label: L, entity: E) -> Self {
        Self {
            clauses: Clauses::new(label.into(), entity.into()),
        }
    }

    clause_methods!();

    pub fn build(self, model: &Model) -> AdvisorResult<Delete> {
        let resolved = self.clauses.resolve(model, &[])?;

        Ok(Delete {
            label: self.clauses.label.clone(),
            path: resolved.path,
            conditions: resolved.conditions,
            graph: resolved.graph,
        })
    }
}
