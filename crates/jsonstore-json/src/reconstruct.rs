//! Rebuilding non-persistable values from nested documents.
//!
//! Handlers are registered by fully-qualified type name. A document whose
//! type has no handler is rebuilt as a [`Bean`] of a registered
//! [`BeanType`](jsonstore_core::schema::app::BeanType), field by field. That
//! bean path is a legacy escape hatch: prefer registering a handler.
//!
//! Reconstruction never fails the read. Errors are logged and the value
//! falls back to its default.

use crate::{codec, Document};
use indexmap::IndexMap;
use jsonstore_core::{
    schema::{app, db::CLASS_KEY},
    Bean, Error, Result, Type, Value,
};
use serde_json::Value as Json;
use std::{fmt, sync::Arc};

/// Type name of the user principal value.
pub const USER_TYPE: &str = "com.google.appengine.api.users.User";

/// Type name of the hierarchical key value.
pub const KEY_TYPE: &str = "com.google.appengine.api.datastore.Key";

pub trait Reconstructor: Send + Sync + 'static {
    /// Rebuilds a value from `doc`. `table` is the registry the handler was
    /// found in, for values containing further nested values.
    fn reconstruct(&self, doc: &Document, table: &Reconstructors, schema: &app::Schema)
        -> Result<Value>;
}

/// Plugin table of reconstruction handlers, keyed by type name.
#[derive(Clone, Default)]
pub struct Reconstructors {
    handlers: IndexMap<String, Arc<dyn Reconstructor>>,
}

impl Reconstructors {
    /// A table holding the user principal and hierarchical key handlers.
    pub fn new() -> Reconstructors {
        let mut table = Reconstructors::default();
        table.register(USER_TYPE, UserPrincipal);
        table.register(KEY_TYPE, HierarchicalKey);
        table
    }

    pub fn register(&mut self, type_name: &str, handler: impl Reconstructor) -> &mut Self {
        self.handlers.insert(type_name.to_string(), Arc::new(handler));
        self
    }

    /// Rebuilds the value stored in `doc`. The type is taken from the class
    /// key, or from `expected` when the document carries none.
    pub fn reconstruct(&self, doc: &Document, expected: Option<&Type>, schema: &app::Schema) -> Value {
        let type_name = doc.class().or(match expected {
            Some(Type::Bean(name)) => Some(name.as_str()),
            _ => None,
        });

        let Some(type_name) = type_name else {
            tracing::warn!(keys = ?doc.keys().collect::<Vec<_>>(), "nested document carries no type name; skipping");
            return Value::Null;
        };

        let result = match self.handlers.get(type_name) {
            Some(handler) => handler.reconstruct(doc, self, schema),
            None => self.reconstruct_bean(type_name, doc, schema),
        };

        match result {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(type_name, error = %err, "failed to reconstruct value; using default");
                Value::Null
            }
        }
    }

    fn reconstruct_bean(&self, type_name: &str, doc: &Document, schema: &app::Schema) -> Result<Value> {
        let Some(bean_type) = schema.bean(type_name) else {
            return Err(Error::unsupported_feature(format!(
                "`{type_name}` is neither a registered bean nor has a reconstruction handler"
            )));
        };

        let mut bean = Bean::new(type_name);
        for field in &bean_type.fields {
            bean.fields.insert(field.name.clone(), Value::zero(&field.ty));
        }

        for (key, json) in doc.as_map() {
            if key == CLASS_KEY {
                continue;
            }

            let Some(field) = bean_type.field_by_name(key) else {
                tracing::warn!(type_name, field = %key, "bean type has no such field; skipping");
                continue;
            };

            match codec::decode_value(json, &field.ty, key, self, schema) {
                Ok(value) => {
                    bean.fields.insert(key.clone(), value);
                }
                Err(err) => {
                    tracing::warn!(type_name, field = %key, error = %err, "failed to set bean field; leaving default");
                }
            }
        }

        Ok(Value::Bean(bean))
    }
}

impl fmt::Debug for Reconstructors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.handlers.keys()).finish()
    }
}

/// Two string fields: `email` and `authDomain`.
struct UserPrincipal;

impl Reconstructor for UserPrincipal {
    fn reconstruct(&self, doc: &Document, _: &Reconstructors, _: &app::Schema) -> Result<Value> {
        let text = |key: &str| {
            doc.value(key)
                .and_then(Json::as_str)
                .map(Value::from)
                .unwrap_or_default()
        };

        Ok(Value::Bean(
            Bean::new(USER_TYPE)
                .with("email", text("email"))
                .with("authDomain", text("authDomain")),
        ))
    }
}

/// A `kind` plus either a named `appId` or a numeric `id`, under an optional
/// `parent` key rebuilt recursively.
struct HierarchicalKey;

impl Reconstructor for HierarchicalKey {
    fn reconstruct(&self, doc: &Document, table: &Reconstructors, schema: &app::Schema) -> Result<Value> {
        let parent = match doc.value("parent") {
            Some(Json::Object(map)) => {
                let parent = Document::from(map.clone());
                self.reconstruct(&parent, table, schema)?
            }
            Some(json) => return Err(crate::document::mismatch("parent", "object", json)),
            None => Value::Null,
        };

        let kind = doc.get_str("kind")?;
        let mut key = Bean::new(KEY_TYPE).with("kind", kind);

        key = if doc.has("appId") {
            key.with("name", doc.get_str("appId")?)
        } else {
            key.with("id", doc.get_i64("id")?)
        };

        Ok(Value::Bean(key.with("parent", parent)))
    }
}
