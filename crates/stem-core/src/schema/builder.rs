use super::{ModelSchema, Relationship, RelationshipKind, Schema};
use crate::{Error, Result};
use indexmap::IndexMap;
use std::sync::Arc;

/// Assembles a [`Schema`] from model descriptions and relationships.
///
/// Relationship endpoints are given as `(model, column)` pairs and are
/// validated when [`build`](Builder::build) runs.
#[derive(Debug, Default)]
pub struct Builder {
    models: IndexMap<String, ModelSchema>,
    relationships: Vec<Relationship>,
}

impl Builder {
    pub fn model(mut self, model: ModelSchema) -> Self {
        self.models.insert(model.name.clone(), model);
        self
    }

    /// Declares a one-directional one-to-one relationship.
    pub fn one_to_one(mut self, name: &str, source: (&str, &str), target: (&str, &str)) -> Self {
        self.relationships
            .push(relationship(name, RelationshipKind::OneToOne, source, target));
        self
    }

    /// Declares a one-to-many relationship named `name` on the source model,
    /// and its reverse one-to-one named `reverse` on the target model.
    pub fn one_to_many(
        mut self,
        name: &str,
        source: (&str, &str),
        target: (&str, &str),
        reverse: &str,
    ) -> Self {
        self.relationships
            .push(relationship(name, RelationshipKind::OneToMany, source, target));
        self.relationships
            .push(relationship(reverse, RelationshipKind::OneToOne, target, source));
        self
    }

    /// Declares a many-to-many relationship through an intersection model,
    /// in both directions.
    ///
    /// `through` is `(model, column matching source, column matching target)`.
    pub fn many_to_many(
        mut self,
        name: &str,
        source: (&str, &str),
        through: (&str, &str, &str),
        target: (&str, &str),
        reverse: &str,
    ) -> Self {
        let (through_model, through_source, through_target) = through;

        self.relationships.push(relationship(
            name,
            RelationshipKind::ManyToMany {
                through_model: through_model.to_string(),
                through_source_column: through_source.to_string(),
                through_target_column: through_target.to_string(),
            },
            source,
            target,
        ));
        self.relationships.push(relationship(
            reverse,
            RelationshipKind::ManyToMany {
                through_model: through_model.to_string(),
                through_source_column: through_target.to_string(),
                through_target_column: through_source.to_string(),
            },
            target,
            source,
        ));
        self
    }

    pub fn build(mut self) -> Result<Schema> {
        for model in self.models.values() {
            if model.unique_identifier_column().is_none() {
                return Err(Error::invalid_schema(format!(
                    "model `{}` has no unique identifier column",
                    model.name
                )));
            }
        }

        for relationship in std::mem::take(&mut self.relationships) {
            self.verify_endpoint(&relationship.target_model, &relationship.target_column)?;
            self.verify_endpoint(&relationship.source_model, &relationship.source_column)?;

            if let RelationshipKind::ManyToMany {
                through_model,
                through_source_column,
                through_target_column,
            } = &relationship.kind
            {
                self.verify_endpoint(through_model, through_source_column)?;
                self.verify_endpoint(through_model, through_target_column)?;
            }

            let Some(source) = self.models.get_mut(&relationship.source_model) else {
                continue;
            };

            if source.columns.contains_key(&relationship.name)
                || source.relationships.contains_key(&relationship.name)
            {
                return Err(Error::invalid_schema(format!(
                    "`{}` is declared twice on model `{}`",
                    relationship.name, source.name
                )));
            }

            source
                .relationships
                .insert(relationship.name.clone(), relationship);
        }

        Ok(Schema {
            models: self
                .models
                .into_iter()
                .map(|(name, model)| (name, Arc::new(model)))
                .collect(),
        })
    }

    fn verify_endpoint(&self, model: &str, column: &str) -> Result<()> {
        let Some(schema) = self.models.get(model) else {
            return Err(Error::invalid_schema(format!("unknown model `{model}`")));
        };

        if schema.get_column(column).is_none() {
            return Err(Error::invalid_schema(format!(
                "model `{model}` has no column `{column}`"
            )));
        }

        Ok(())
    }
}

fn relationship(
    name: &str,
    kind: RelationshipKind,
    source: (&str, &str),
    target: (&str, &str),
) -> Relationship {
    Relationship {
        name: name.to_string(),
        kind,
        source_model: source.0.to_string(),
        source_column: source.1.to_string(),
        target_model: target.0.to_string(),
        target_column: target.1.to_string(),
    }
}
