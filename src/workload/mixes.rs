use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{AdvisorError, AdvisorResult};
use crate::model::Model;
use crate::workload::Statement;

pub const DEFAULT_MIX: &str = "default";

/// A model and the statements run against it, weighted by relative frequency.
///
/// Weights are grouped in named mixes so one workload can describe several usage patterns.
/// Statements missing from a mix weigh nothing in it but still have to be answerable.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Workload {
    model: Model,
    statements: Vec<Statement>,
    /// Weight of every statement, by statement position.
    mixes: BTreeMap<String, Vec<f64>>,
}

impl Workload {
    pub fn new(model: Model) -> Self {
        Self {
            model,
            statements: vec![],
            mixes: BTreeMap::from([(DEFAULT_MIX.to_string(), vec![])]),
        }
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    pub fn statement_by_label(&self, label: &str) -> Option<&Statement> {
        self.statements.iter().find(|s| s.label() == label)
    }

    pub fn mixes(&self) -> impl Iterator<Item = &str> {
        self.mixes.keys().map(String::as_str)
    }

    /// Adds a statement weighted in the default mix.
    pub fn add_statement<S: Into<Statement>>(&mut self, statement: S, weight: f64) -> AdvisorResult<()> {
        self.add_statement_with_weights(statement, &[(DEFAULT_MIX, weight)])
    }

    /// Adds a statement with a weight per named mix.
    pub fn add_statement_with_weights<S: Into<Statement>>(
        &mut self,
        statement: S,
        weights: &[(&str, f64)],
    ) -> AdvisorResult<()> {
        let statement = statement.into();
        if self.statement_by_label(statement.label()).is_some() {
            return Err(AdvisorError::invalid_statement(
                statement.label(),
                "duplicate label",
            ));
        }
        if let Some((mix, weight)) = weights
            .iter()
            .find(|(_, w)| !(w.is_finite() && *w >= 0.0))
        {
            return Err(AdvisorError::invalid_statement(
                statement.label(),
                format!("invalid weight {} in mix `{}`", weight, mix),
            ));
        }

        let position = self.statements.len();
        for (mix, weight) in weights {
            let mix = self
                .mixes
                .entry(mix.to_string())
                .or_insert_with(|| vec![0.0; position]);
            mix.push(*weight);
        }
        self.statements.push(statement);
        for mix in self.mixes.values_mut() {
            mix.resize(self.statements.len(), 0.0);
        }

        Ok(())
    }

    /// Weight of every statement in `mix`, by statement position.
    pub fn weights(&self, mix: &str) -> AdvisorResult<&[f64]> {
        self.mixes
            .get(mix)
            .map(Vec::as_slice)
            .ok_or_else(|| AdvisorError::UnknownMix(mix.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use crate::error::AdvisorError;
    use crate::model::{FieldType, ModelBuilder};
    use crate::workload::{QueryBuilder, Workload, DEFAULT_MIX};

    #[test]
    fn test_mix_weights() {
        let model = ModelBuilder::new()
            .entity("users", 10.0)
            .id("id")
            .field("name", FieldType::String)
            .build()
            .unwrap();
        let q1 = QueryBuilder::new("q1", "users").select("name").eq("id").build(&model).unwrap();
        let q2 = QueryBuilder::new("q2", "users").select("id").eq("name").build(&model).unwrap();

        let mut workload = Workload::new(model);
        workload.add_statement(q1.clone(), 2.0).unwrap();
        workload
            .add_statement_with_weights(q2, &[("browsing", 5.0), (DEFAULT_MIX, 1.0)])
            .unwrap();

        assert_eq!(workload.weights(DEFAULT_MIX).unwrap(), &[2.0, 1.0]);
        assert_eq!(workload.weights("browsing").unwrap(), &[0.0, 5.0]);
        assert_eq!(workload.mixes().collect::<Vec<_>>(), vec!["browsing", DEFAULT_MIX]);
        assert!(matches!(workload.weights("bidding"), Err(AdvisorError::UnknownMix(_))));

        assert!(workload.add_statement(q1, 1.0).is_err());
        assert_eq!(workload.len(), 2);
        assert!(workload.statement_by_label("q2").is_some());
    }

    #[test]
    fn test_negative_weight_rejected() {
        let model = ModelBuilder::new().entity("users", 10.0).id("id").build().unwrap();
        let q = QueryBuilder::new("q", "users").select("id").eq("id").build(&model).unwrap();
        let mut workload = Workload::new(model);
        assert!(workload.add_statement(q, -1.0).is_err());
        assert!(workload.is_empty());
    }
}
