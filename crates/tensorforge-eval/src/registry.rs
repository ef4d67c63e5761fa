//! The set of loaded models.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::ModelError;
use crate::evaluator::FunctionEvaluator;
use crate::model::Model;

/// Immutable collection of models, built once and shared by reference.
#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    models: BTreeMap<String, Arc<Model>>,
}

impl ModelRegistry {
    pub fn new<I>(models: I) -> Result<Self, ModelError>
    where
        I: IntoIterator,
        I::Item: Into<Arc<Model>>,
    {
        let mut registry = BTreeMap::new();
        for model in models {
            let model: Arc<Model> = model.into();
            let name = model.name().to_string();
            if registry.insert(name.clone(), model).is_some() {
                return Err(ModelError::DuplicateModel(name));
            }
        }
        Ok(Self { models: registry })
    }

    /// Models ordered by name.
    pub fn models(&self) -> impl Iterator<Item = &Arc<Model>> {
        self.models.values()
    }

    pub fn model(&self, name: &str) -> Result<&Arc<Model>, ModelError> {
        self.models
            .get(name)
            .ok_or_else(|| ModelError::UnknownModel(name.to_string()))
    }

    /// Evaluator of `function` in `model`; see [`Model::evaluator_of`].
    pub fn evaluator_of(&self, model: &str, function: &str) -> Result<FunctionEvaluator<'_>, ModelError> {
        self.model(model)?.evaluator_of(function)
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}
