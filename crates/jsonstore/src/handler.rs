use crate::{session::Session, store::Shared, Document, Result};
use jsonstore_core::{
    err,
    schema::app::{IdentityKind, Model, ModelId, ModelRoot, Version},
    Error, Identity, ObjectRef, Type, Value,
};
use jsonstore_json::{Context, FetchFields, StoreFields};
use serde_json::Value as Json;
use std::time::{SystemTime, UNIX_EPOCH};

/// Runs the persistence operations of one session against the backend.
///
/// Every operation builds one document and hands it to the backend whole.
pub(crate) struct Handler<'a> {
    shared: &'a Shared,
    session: &'a Session,
}

impl<'a> Handler<'a> {
    pub(crate) fn new(shared: &'a Shared, session: &'a Session) -> Handler<'a> {
        Handler { shared, session }
    }

    fn cx(&self) -> Context<'a> {
        Context {
            schema: &self.shared.schema,
            converters: &self.shared.converters,
            reconstructors: &self.shared.reconstructors,
            identities: &self.shared.identities,
            orchestrator: self.session,
        }
    }

    pub(crate) fn insert(&self, object: &ObjectRef) -> Result<()> {
        let model = self.shared.schema.model(object.model_id());
        let root = root(model)?;

        let identity = match &root.identity {
            IdentityKind::Datastore => object
                .identity()
                .unwrap_or_else(|| Identity::Datastore(uuid::Uuid::new_v4().to_string())),
            IdentityKind::Application(_) => self.key_identity(model, object)?,
        };
        object.set_identity(identity.clone());

        let url = self.url(model, &identity);
        tracing::debug!(model = %model.name, %url, "inserting object");

        let mut doc = Document::for_class(&model.name);
        if let (Identity::Datastore(key), Some(column)) = (
            &identity,
            &self.shared.schema.table_for(model.id).datastore_id,
        ) {
            doc.put(&column.name, key.as_str());
        }

        // Registered before the fields are written; a cycle of references
        // leads back to this object
        self.session.register(&identity, object)?;

        if let Some(version) = &root.version {
            let initial = version.strategy.initial(now_millis());
            self.write_version(model, version, object, initial, &mut doc)?;
        }

        StoreFields::new(self.cx(), object, &mut doc).store(&model.all_field_indices())?;

        let sent = if self.shared.config.kind().is_cloud() {
            tracing::debug!(body = %doc, "PUT");
            self.shared.backend.put(&url, &doc)
        } else {
            tracing::debug!(body = %doc, "POST");
            self.shared.backend.post(&url, &doc)
        };
        sent.map_err(|e| e.context(err!("inserting `{}` at {url}", model.name)))?;

        object.clear_dirty();
        Ok(())
    }

    pub(crate) fn update(&self, object: &ObjectRef, fields: &[usize]) -> Result<()> {
        let model = self.shared.schema.model(object.model_id());
        let root = root(model)?;
        let identity = self.identity(model, object)?;
        let url = self.url(model, &identity);

        let mut fields = fields.to_vec();
        let mut doc = Document::for_class(&model.name);

        if let Some(version) = &root.version {
            let next = version.strategy.next(object.version(), now_millis());
            self.write_version(model, version, object, next, &mut doc)?;

            if let Some(field) = version.field {
                if !fields.contains(&field.index) {
                    fields.push(field.index);
                }
            }
        }

        tracing::debug!(
            model = %model.name,
            %url,
            fields = ?field_names(model, &fields),
            "updating object"
        );

        let primary_key: Vec<_> = model.primary_key_fields().map(|field| field.id.index).collect();
        let mut store = StoreFields::new(self.cx(), object, &mut doc);
        store.store(&fields)?;
        store.store(&primary_key)?;

        tracing::debug!(body = %doc, "PUT");
        self.shared
            .backend
            .put(&url, &doc)
            .map_err(|e| e.context(err!("updating `{}` at {url}", model.name)))?;

        object.clear_dirty();
        Ok(())
    }

    pub(crate) fn fetch(&self, object: &ObjectRef, fields: &[usize]) -> Result<()> {
        let model = self.shared.schema.model(object.model_id());
        let identity = self.identity(model, object)?;
        let url = self.url(model, &identity);

        tracing::debug!(
            model = %model.name,
            %url,
            fields = ?field_names(model, fields),
            "fetching object"
        );

        let Some(doc) = self.shared.backend.get(&url)? else {
            return Err(Error::record_not_found(format!("`{}` at {url}", model.name)));
        };
        tracing::debug!(body = %doc, "GET");

        self.read_version(model, object, &doc);
        FetchFields::new(self.cx(), object, &doc).fetch(fields)
    }

    /// Loads the object stored under `identity` into a new registered
    /// object. `Ok(None)` if nothing is stored there.
    pub(crate) fn load(&self, model: ModelId, identity: &Identity) -> Result<Option<ObjectRef>> {
        let model = self.shared.schema.model(model);
        let url = self.url(model, identity);

        tracing::debug!(model = %model.name, %url, "loading object");
        let Some(doc) = self.shared.backend.get(&url)? else {
            return Ok(None);
        };
        tracing::debug!(body = %doc, "GET");

        let object = ObjectRef::new(model);
        object.set_identity(identity.clone());
        self.session.register(identity, &object)?;

        self.hydrate(model, &object, &doc)?;
        Ok(Some(object))
    }

    pub(crate) fn delete(&self, object: &ObjectRef) -> Result<()> {
        let model = self.shared.schema.model(object.model_id());
        let identity = self.identity(model, object)?;
        let url = self.url(model, &identity);

        tracing::debug!(model = %model.name, %url, "DELETE");
        if !self.shared.backend.delete(&url)? {
            return Err(Error::record_not_found(format!("`{}` at {url}", model.name)));
        }
        Ok(())
    }

    pub(crate) fn locate(&self, object: &ObjectRef) -> Result<()> {
        if !self.exists(object)? {
            let model = self.shared.schema.model(object.model_id());
            return Err(Error::record_not_found(format!(
                "`{}` with identity {}",
                model.name,
                self.identity(model, object)?.key_text()
            )));
        }
        Ok(())
    }

    pub(crate) fn exists(&self, object: &ObjectRef) -> Result<bool> {
        let model = self.shared.schema.model(object.model_id());
        let identity = self.identity(model, object)?;
        let url = self.url(model, &identity);

        tracing::debug!(model = %model.name, %url, "HEAD");
        self.shared.backend.head(&url)
    }

    /// Loads every stored object of `model`. Objects already live in the
    /// session keep their in-memory state.
    pub(crate) fn objects_of_type(&self, model: ModelId) -> Result<Vec<ObjectRef>> {
        let model = self.shared.schema.model(model);
        root(model)?;

        let path = if self.shared.config.kind().is_cloud() {
            format!("?prefix={}", model.url_path().trim_end_matches('/'))
        } else {
            model.url_path()
        };
        let url = self.shared.config.url_for(&path);

        tracing::debug!(model = %model.name, %url, "listing objects");
        let docs = self.shared.backend.list(&url)?;

        let mut objects = Vec::with_capacity(docs.len());
        for doc in &docs {
            // Prefix listings also match models whose path extends this one
            if doc.class().is_some_and(|class| class != model.name) {
                tracing::debug!(model = %model.name, class = ?doc.class(), "skipping listed document");
                continue;
            }

            let identity = self.identity_in(model, doc)?;

            let object = match self.session.lookup(model.id, &identity)? {
                Some(object) => object,
                None => {
                    let object = ObjectRef::new(model);
                    object.set_identity(identity.clone());
                    self.session.register(&identity, &object)?;
                    self.hydrate(model, &object, doc)?;
                    object
                }
            };

            objects.push(object);
        }

        Ok(objects)
    }

    /// Reads the version and every field of a freshly loaded object.
    fn hydrate(&self, model: &Model, object: &ObjectRef, doc: &Document) -> Result<()> {
        self.read_version(model, object, doc);
        FetchFields::new(self.cx(), object, doc).fetch(&model.all_field_indices())
    }

    /// The identity a listed document was stored under.
    fn identity_in(&self, model: &Model, doc: &Document) -> Result<Identity> {
        match &root(model)?.identity {
            IdentityKind::Datastore => {
                let table = self.shared.schema.table_for(model.id);
                let Some(column) = &table.datastore_id else {
                    return Err(Error::invalid_schema(format!(
                        "`{}` has no surrogate identity column",
                        model.name
                    )));
                };

                match doc.value(&column.name) {
                    Some(Json::String(key)) => Ok(Identity::Datastore(key.clone())),
                    Some(json) => Ok(Identity::Datastore(json.to_string())),
                    None => Err(Error::malformed_document(
                        &column.name,
                        "missing surrogate identity",
                    )),
                }
            }
            IdentityKind::Application(fields) => {
                let probe = ObjectRef::new(model);
                let indices: Vec<_> = fields.iter().map(|field| field.index).collect();
                FetchFields::new(self.cx(), &probe, doc).fetch(&indices)?;
                self.key_identity(model, &probe)
            }
        }
    }

    /// The object's identity, or the one its primary key fields describe.
    fn identity(&self, model: &Model, object: &ObjectRef) -> Result<Identity> {
        if let Some(identity) = object.identity() {
            return Ok(identity);
        }

        match &root(model)?.identity {
            IdentityKind::Application(_) => self.key_identity(model, object),
            IdentityKind::Datastore => Err(Error::record_not_found(format!(
                "`{}` object was never persisted",
                model.name
            ))),
        }
    }

    fn key_identity(&self, model: &Model, object: &ObjectRef) -> Result<Identity> {
        let mut values = vec![];

        for field in model.primary_key_fields() {
            let value = object.get(field.id.index);
            if value.is_null() {
                return Err(err!(
                    "primary key field `{}` is not set",
                    field.full_name(&self.shared.schema.app)
                ));
            }
            values.push(value);
        }

        Ok(Identity::Application(values))
    }

    /// Sets the object's version, and its version field if it has one, and
    /// writes the version column.
    fn write_version(
        &self,
        model: &Model,
        version: &Version,
        object: &ObjectRef,
        value: i64,
        doc: &mut Document,
    ) -> Result<()> {
        object.set_version(value);
        tracing::debug!(model = %model.name, version = value, "object versioned");

        let column = match version.field {
            Some(field) => {
                let stored = match &model.field(field).ty.expect_primitive().ty {
                    Type::I32 => Value::I32(
                        i32::try_from(value)
                            .map_err(|_| Error::type_conversion(Value::I64(value), "i32"))?,
                    ),
                    _ => Value::I64(value),
                };
                object.set(field.index, stored);

                let mapping = self.shared.schema.mapping_for(model.id);
                mapping.columns_for(field)?.column_name().to_string()
            }
            None => self.surrogate_version_column(model)?,
        };

        doc.put(column, value);
        Ok(())
    }

    fn read_version(&self, model: &Model, object: &ObjectRef, doc: &Document) {
        let Some(version) = model.version() else {
            return;
        };

        let column = match version.field {
            Some(field) => self
                .shared
                .schema
                .mapping_for(model.id)
                .columns_for(field)
                .map(|member| member.column_name().to_string()),
            None => self.surrogate_version_column(model),
        };

        if let Some(value) = column
            .ok()
            .and_then(|column| doc.value(&column).and_then(Json::as_i64))
        {
            object.set_version(value);
        }
    }

    fn surrogate_version_column(&self, model: &Model) -> Result<String> {
        match &self.shared.schema.table_for(model.id).version {
            Some(column) => Ok(column.name.clone()),
            None => Err(Error::invalid_schema(format!(
                "`{}` has no version column",
                model.name
            ))),
        }
    }

    /// `<model url or type name>/<key>` under the endpoint.
    fn url(&self, model: &Model, identity: &Identity) -> String {
        let path = format!("{}{}", model.url_path(), identity.key_text());
        self.shared.config.url_for(&path)
    }
}

fn root(model: &Model) -> Result<&ModelRoot> {
    model.as_root().ok_or_else(|| {
        Error::unsupported_feature(format!(
            "`{}` is embedded; it is stored with its owner",
            model.name
        ))
    })
}

fn field_names<'m>(model: &'m Model, fields: &[usize]) -> Vec<&'m str> {
    fields
        .iter()
        .filter_map(|index| model.fields.get(*index))
        .map(|field| field.name.app_name.as_str())
        .collect()
}

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or_default()
}
