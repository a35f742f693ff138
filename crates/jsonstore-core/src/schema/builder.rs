mod mapping;
mod model;
pub use model::{FieldBuilder, ModelBuilder};

use super::{app, db, Mapping, Schema};
use crate::{Converters, Error, Result};
use indexmap::IndexMap;

/// Assembles class metadata and derives the document mapping from it.
#[derive(Debug, Default)]
pub struct Builder {
    /// Model identifiers, reserved by name before the models are defined
    names: IndexMap<String, app::ModelId>,

    models: IndexMap<app::ModelId, app::Model>,

    beans: IndexMap<String, app::BeanType>,

    /// If set, prefix all table names with this string
    table_name_prefix: Option<String>,
}

impl Builder {
    /// Reserves the identifier of the model named `name`. Calling this again
    /// with the same name returns the same identifier, so relation and
    /// embedded targets can be referenced before they are defined.
    pub fn model(&mut self, name: &str) -> app::ModelId {
        if let Some(id) = self.names.get(name) {
            return *id;
        }

        let id = app::ModelId(self.names.len());
        self.names.insert(name.to_string(), id);
        id
    }

    /// Defines a root model, stored as its own document.
    pub fn root(&mut self, name: &str, f: impl FnOnce(&mut ModelBuilder)) -> app::ModelId {
        self.define(name, true, f)
    }

    /// Defines an embedded model, only ever stored inside an owner.
    pub fn embedded(&mut self, name: &str, f: impl FnOnce(&mut ModelBuilder)) -> app::ModelId {
        self.define(name, false, f)
    }

    /// Registers a non-persistable value type.
    pub fn bean(&mut self, bean: app::BeanType) -> &mut Self {
        self.beans.insert(bean.name.clone(), bean);
        self
    }

    pub fn table_name_prefix(&mut self, prefix: &str) -> &mut Self {
        self.table_name_prefix = Some(prefix.to_string());
        self
    }

    fn define(
        &mut self,
        name: &str,
        root: bool,
        f: impl FnOnce(&mut ModelBuilder),
    ) -> app::ModelId {
        let id = self.model(name);
        let mut builder = ModelBuilder::new(id, name, root);
        f(&mut builder);
        self.models.insert(id, builder.into_model());
        id
    }

    /// Builds the schema, resolving converter-backed columns against
    /// `converters`.
    pub fn build(self, converters: &Converters) -> Result<Schema> {
        let mut app = app::Schema {
            models: IndexMap::new(),
            beans: self.beans,
        };

        for (name, id) in &self.names {
            let Some(model) = self.models.get(id) else {
                return Err(Error::invalid_schema(format!(
                    "model `{name}` is referenced but never defined"
                )));
            };
            app.models.insert(*id, model.clone());
        }

        for model in app.models.values_mut() {
            model::resolve_version(model)?;
        }

        let mut db = db::Schema::default();
        let mut mapping = Mapping::default();

        for model in app.models() {
            if !model.is_root() {
                continue;
            }

            let (table, model_mapping) = mapping::build(
                &app,
                converters,
                model,
                self.table_name_prefix.as_deref(),
            )?;
            db.tables.insert(model.id, table);
            mapping.models.insert(model.id, model_mapping);
        }

        let schema = Schema { app, db, mapping };
        schema.validate()?;
        Ok(schema)
    }
}
