use super::{BeanType, Field, FieldId, Model, ModelId};
use indexmap::IndexMap;

#[derive(Debug, Default)]
pub struct Schema {
    pub models: IndexMap<ModelId, Model>,

    /// Registered non-persistable value types, keyed by fully-qualified name
    pub beans: IndexMap<String, BeanType>,
}

impl Schema {
    /// Get a field by ID
    pub fn field(&self, id: FieldId) -> &Field {
        self.model(id.model)
            .fields
            .get(id.index)
            .expect("invalid field ID")
    }

    pub fn models(&self) -> impl Iterator<Item = &Model> {
        self.models.values()
    }

    /// Get a model by ID
    pub fn model(&self, id: impl Into<ModelId>) -> &Model {
        self.models.get(&id.into()).expect("invalid model ID")
    }

    pub fn model_by_name(&self, name: &str) -> Option<&Model> {
        self.models().find(|model| model.name == name)
    }

    pub fn bean(&self, name: &str) -> Option<&BeanType> {
        self.beans.get(name)
    }
}
