use super::{Model, ModelId, Schema};

#[derive(Debug, Clone)]
pub struct Embedded {
    /// The embedded model being referenced
    pub target: ModelId,

    /// Name of the field on the embedded model that refers back to the
    /// enclosing object. That field is never stored.
    pub owner_field: Option<String>,

    /// Set when the field holds many embedded objects. Schema verification
    /// rejects these.
    pub container: Option<Container>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Container {
    Collection,
    Array,
    Map,
}

impl Embedded {
    pub fn new(target: ModelId) -> Embedded {
        Embedded {
            target,
            owner_field: None,
            container: None,
        }
    }

    pub fn target<'a>(&self, schema: &'a Schema) -> &'a Model {
        schema.model(self.target)
    }

    pub fn is_multi_valued(&self) -> bool {
        self.container.is_some()
    }
}
