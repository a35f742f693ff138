mod member;
pub use member::{Member, Role};

mod model;
pub use model::Model;

mod path;
pub use path::FieldPath;

use super::app::ModelId;
use indexmap::IndexMap;

/// Defines the correspondence between app-level fields and document columns.
///
/// The mapping is constructed while the schema is built and remains
/// immutable afterwards. Both marshalling directions resolve column names
/// exclusively through it.
#[derive(Debug, Clone, Default)]
pub struct Mapping {
    /// Per-root-model mappings indexed by model identifier.
    pub models: IndexMap<ModelId, Model>,
}

impl Mapping {
    /// Returns the mapping for the specified model.
    ///
    /// # Panics
    ///
    /// Panics if the model ID does not exist in the mapping.
    pub fn model(&self, id: impl Into<ModelId>) -> &Model {
        self.models.get(&id.into()).expect("invalid model ID")
    }
}
