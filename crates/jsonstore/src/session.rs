use crate::{handler::Handler, store::Shared, Store};
use jsonstore_core::{
    err,
    schema::app::{FieldId, ModelId},
    Error, Identity, ObjectRef, Orchestrator, Result,
};
use jsonstore_json::IdentityCodec;
use indexmap::IndexMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// A unit of work over a [`Store`].
///
/// The session keeps an identity map: within one session, an identity always
/// resolves to the same [`ObjectRef`]. It is also the orchestrator the
/// marshaller calls back into for relation and embedded fields.
pub struct Session {
    store: Store,

    /// Live objects keyed by model and plain identity string
    objects: Mutex<IndexMap<(ModelId, String), ObjectRef>>,
}

impl Session {
    pub(crate) fn new(store: Store) -> Session {
        Session {
            store,
            objects: Mutex::new(IndexMap::new()),
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Allocates a transient object of `model` with every field at its default.
    pub fn new_object(&self, model: ModelId) -> ObjectRef {
        ObjectRef::new(self.store.schema().model(model))
    }

    /// Writes a new object. Related objects that are not yet persistent are
    /// inserted too.
    pub fn insert(&self, object: &ObjectRef) -> Result<()> {
        self.handler().insert(object)
    }

    /// Writes the object's dirty fields.
    pub fn update(&self, object: &ObjectRef) -> Result<()> {
        let fields = object.dirty_fields();
        self.handler().update(object, &fields)
    }

    /// Reloads the given fields from the store.
    pub fn fetch(&self, object: &ObjectRef, fields: &[usize]) -> Result<()> {
        self.handler().fetch(object, fields)
    }

    pub fn delete(&self, object: &ObjectRef) -> Result<()> {
        self.handler().delete(object)?;

        let model = self.store.schema().model(object.model_id());
        if let Some(identity) = object.identity() {
            let key = (model.id, self.key(model.id, &identity)?);
            self.objects().shift_remove(&key);
        }
        Ok(())
    }

    /// Checks that the object still exists in the store.
    pub fn locate(&self, object: &ObjectRef) -> Result<()> {
        self.handler().locate(object)
    }

    /// Returns the object with the given identity, loading it if needed.
    pub fn get(&self, model: ModelId, identity: &Identity) -> Result<ObjectRef> {
        match self.find(model, identity)? {
            Some(object) => Ok(object),
            None => Err(Error::record_not_found(format!(
                "`{}` with identity {}",
                self.store.schema().model(model).name,
                identity.key_text()
            ))),
        }
    }

    /// Loads every stored object of `model`.
    pub fn all(&self, model: ModelId) -> Result<Vec<ObjectRef>> {
        self.handler().objects_of_type(model)
    }

    /// Returns the live object registered under `identity`, if any.
    pub(crate) fn lookup(&self, model: ModelId, identity: &Identity) -> Result<Option<ObjectRef>> {
        let key = (model, self.key(model, identity)?);
        Ok(self.objects().get(&key).cloned())
    }

    pub(crate) fn register(&self, identity: &Identity, object: &ObjectRef) -> Result<()> {
        let model = object.model_id();
        let key = (model, self.key(model, identity)?);
        self.objects().insert(key, object.clone());
        Ok(())
    }

    fn key(&self, model: ModelId, identity: &Identity) -> Result<String> {
        IdentityCodec::default().externalize(self.store.schema().model(model), identity)
    }

    fn handler(&self) -> Handler<'_> {
        Handler::new(&self.store.shared, self)
    }

    pub(crate) fn shared(&self) -> &Shared {
        &self.store.shared
    }

    /// The lock is never held while marshalling; loading an object can
    /// re-enter the session.
    fn objects(&self) -> MutexGuard<'_, IndexMap<(ModelId, String), ObjectRef>> {
        self.objects.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Orchestrator for Session {
    fn persist(&self, value: &ObjectRef, owner: &ObjectRef, field: FieldId) -> Result<ObjectRef> {
        let model = value.model_id();

        if let Some(identity) = value.identity() {
            if let Some(managed) = self.lookup(model, &identity)? {
                return Ok(managed);
            }

            // Persistent, but loaded outside this session
            if self.handler().exists(value)? {
                self.register(&identity, value)?;
                return Ok(value.clone());
            }
        }

        tracing::debug!(
            owner = ?owner,
            field = %self.shared().schema.field(field).full_name(&self.shared().schema.app),
            "inserting object reachable from field"
        );
        self.handler().insert(value)?;
        Ok(value.clone())
    }

    fn identity(&self, object: &ObjectRef) -> Result<Identity> {
        object.identity().ok_or_else(|| {
            err!(
                "object of `{}` has no identity; it was never persisted",
                self.shared().schema.model(object.model_id()).name
            )
        })
    }

    fn find(&self, model: ModelId, identity: &Identity) -> Result<Option<ObjectRef>> {
        if let Some(object) = self.lookup(model, identity)? {
            return Ok(Some(object));
        }

        self.handler().load(model, identity)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("objects", &self.objects().len())
            .finish()
    }
}
