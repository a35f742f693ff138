pub mod app;

mod builder;
pub use builder::{Builder, FieldBuilder, ModelBuilder};

pub mod db;

pub mod mapping;
use mapping::Mapping;

mod verify;

use crate::Result;
use app::{Field, FieldId, Model, ModelId};
use db::Table;

/// Class metadata together with the document layout derived from it.
#[derive(Debug)]
pub struct Schema {
    /// Application-level schema
    pub app: app::Schema,

    /// Document-level schema
    pub db: db::Schema,

    /// Maps the app-level schema to document columns
    pub mapping: Mapping,
}

impl Schema {
    pub fn builder() -> Builder {
        Builder::default()
    }

    pub fn model(&self, id: impl Into<ModelId>) -> &Model {
        self.app.model(id)
    }

    pub fn field(&self, id: FieldId) -> &Field {
        self.app.field(id)
    }

    pub fn mapping_for(&self, id: impl Into<ModelId>) -> &mapping::Model {
        self.mapping.model(id)
    }

    pub fn table_for(&self, id: impl Into<ModelId>) -> &Table {
        self.db.table(id)
    }

    /// Returns the root model with the given fully-qualified type name.
    pub fn model_by_name(&self, name: &str) -> Option<&Model> {
        self.app.model_by_name(name)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        self.verify()
    }
}
