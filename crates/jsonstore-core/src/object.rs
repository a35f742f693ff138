//! Runtime object state: field values, load and dirty flags, identity,
//! version and, for embedded objects, the link to the owner.

mod visitor;
pub use visitor::{FieldConsumer, FieldSupplier};

use crate::schema::app::{Accessor, FieldId, Model, ModelId};
use crate::{Error, Identity, Result, Value};
use by_address::ByAddress;
use std::{
    fmt,
    sync::{Arc, Mutex, MutexGuard, PoisonError, Weak},
};

/// Shared handle to a runtime object. Two handles are equal only when they
/// point at the same object.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ObjectRef(ByAddress<Arc<Mutex<Object>>>);

#[derive(Debug)]
pub struct Object {
    model: ModelId,
    fields: Vec<Value>,
    loaded: Vec<bool>,
    dirty: Vec<bool>,
    identity: Option<Identity>,
    version: Option<i64>,
    owner: Option<Owner>,
}

#[derive(Debug)]
struct Owner {
    object: Weak<Mutex<Object>>,
    field: FieldId,
}

macro_rules! provide_typed {
    ($consumer:ident, $index:ident, $value:ident, $method:ident, $variant:ident, $zero:expr, $ty:literal) => {
        match $value {
            Value::$variant(v) => $consumer.$method($index, v),
            Value::Null => $consumer.$method($index, $zero),
            value => Err(Error::type_conversion(value, $ty)),
        }
    };
}

impl ObjectRef {
    /// Allocates an object of `model` with every field at its default.
    pub fn new(model: &Model) -> ObjectRef {
        let fields = model
            .fields
            .iter()
            .map(|field| {
                if field.optional {
                    Value::none()
                } else {
                    match (field.accessor(), &field.ty) {
                        (Accessor::Object | Accessor::String, _) => Value::Null,
                        (_, ty) => ty
                            .as_primitive()
                            .map(|primitive| Value::zero(&primitive.ty))
                            .unwrap_or_default(),
                    }
                }
            })
            .collect::<Vec<_>>();

        let len = fields.len();
        ObjectRef(ByAddress(Arc::new(Mutex::new(Object {
            model: model.id,
            fields,
            loaded: vec![false; len],
            dirty: vec![false; len],
            identity: None,
            version: None,
            owner: None,
        }))))
    }

    fn lock(&self) -> MutexGuard<'_, Object> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn model_id(&self) -> ModelId {
        self.lock().model
    }

    /// Returns a copy of the field's current value.
    pub fn get(&self, index: usize) -> Value {
        self.lock().fields.get(index).cloned().unwrap_or_default()
    }

    /// Replaces the field's value and marks it loaded. The field is not
    /// marked dirty.
    pub fn set(&self, index: usize, value: impl Into<Value>) {
        let mut object = self.lock();
        if let Some(slot) = object.fields.get_mut(index) {
            *slot = value.into();
            object.loaded[index] = true;
        }
    }

    /// Replaces the field's value and marks it dirty.
    pub fn update(&self, index: usize, value: impl Into<Value>) {
        self.set(index, value);
        self.mark_dirty(index);
    }

    pub fn is_loaded(&self, index: usize) -> bool {
        self.lock().loaded.get(index).copied().unwrap_or(false)
    }

    pub fn mark_dirty(&self, index: usize) {
        if let Some(dirty) = self.lock().dirty.get_mut(index) {
            *dirty = true;
        }
    }

    pub fn is_dirty(&self, index: usize) -> bool {
        self.lock().dirty.get(index).copied().unwrap_or(false)
    }

    /// Indices of the dirty fields, in declaration order.
    pub fn dirty_fields(&self) -> Vec<usize> {
        self.lock()
            .dirty
            .iter()
            .enumerate()
            .filter_map(|(index, dirty)| dirty.then_some(index))
            .collect()
    }

    pub fn clear_dirty(&self) {
        self.lock().dirty.iter_mut().for_each(|dirty| *dirty = false);
    }

    pub fn identity(&self) -> Option<Identity> {
        self.lock().identity.clone()
    }

    pub fn set_identity(&self, identity: Identity) {
        self.lock().identity = Some(identity);
    }

    pub fn version(&self) -> Option<i64> {
        self.lock().version
    }

    pub fn set_version(&self, version: i64) {
        self.lock().version = Some(version);
    }

    /// The object owning this embedded object, and the owner's field that
    /// holds it.
    pub fn owner(&self) -> Option<(ObjectRef, FieldId)> {
        let object = self.lock();
        let owner = object.owner.as_ref()?;
        let strong = owner.object.upgrade()?;
        Some((ObjectRef(ByAddress(strong)), owner.field))
    }

    pub fn set_owner(&self, owner: &ObjectRef, field: FieldId) {
        self.lock().owner = Some(Owner {
            object: Arc::downgrade(&owner.0),
            field,
        });
    }

    /// Hands the requested fields to `consumer`, one call per field, using
    /// the typed accessor matching each field's declared type.
    pub fn provide_fields(
        &self,
        model: &Model,
        fields: &[usize],
        consumer: &mut dyn FieldConsumer,
    ) -> Result<()> {
        for &index in fields {
            let Some(field) = model.fields.get(index) else {
                bail!("field index {index} out of range for `{}`", model.name);
            };

            // The lock is released before the consumer runs; it may need to
            // reach this object again.
            let value = self.get(index);

            let stored = match field.accessor() {
                Accessor::Bool => provide_typed!(consumer, index, value, store_bool, Bool, false, "bool"),
                Accessor::I8 => provide_typed!(consumer, index, value, store_i8, I8, 0, "i8"),
                Accessor::I16 => provide_typed!(consumer, index, value, store_i16, I16, 0, "i16"),
                Accessor::I32 => provide_typed!(consumer, index, value, store_i32, I32, 0, "i32"),
                Accessor::I64 => provide_typed!(consumer, index, value, store_i64, I64, 0, "i64"),
                Accessor::F32 => provide_typed!(consumer, index, value, store_f32, F32, 0.0, "f32"),
                Accessor::F64 => provide_typed!(consumer, index, value, store_f64, F64, 0.0, "f64"),
                Accessor::Char => provide_typed!(consumer, index, value, store_char, Char, '\0', "char"),
                Accessor::String => match value {
                    Value::String(v) => consumer.store_string(index, Some(&v)),
                    Value::Null => consumer.store_string(index, None),
                    value => Err(Error::type_conversion(value, "string")),
                },
                Accessor::Object => consumer.store_object(index, &value),
            };

            stored.map_err(|err| {
                err.context(err!("storing `{}::{}`", model.name, field.name.app_name))
            })?;
        }

        Ok(())
    }

    /// Fetches the requested fields from `supplier`, one call per field, and
    /// stores the results in this object.
    pub fn replace_fields(
        &self,
        model: &Model,
        fields: &[usize],
        supplier: &mut dyn FieldSupplier,
    ) -> Result<()> {
        for &index in fields {
            let Some(field) = model.fields.get(index) else {
                bail!("field index {index} out of range for `{}`", model.name);
            };

            let value = match field.accessor() {
                Accessor::Bool => supplier.fetch_bool(index).map(Value::Bool),
                Accessor::I8 => supplier.fetch_i8(index).map(Value::I8),
                Accessor::I16 => supplier.fetch_i16(index).map(Value::I16),
                Accessor::I32 => supplier.fetch_i32(index).map(Value::I32),
                Accessor::I64 => supplier.fetch_i64(index).map(Value::I64),
                Accessor::F32 => supplier.fetch_f32(index).map(Value::F32),
                Accessor::F64 => supplier.fetch_f64(index).map(Value::F64),
                Accessor::Char => supplier.fetch_char(index).map(Value::Char),
                Accessor::String => supplier.fetch_string(index).map(Value::from),
                Accessor::Object => supplier.fetch_object(index),
            };

            let value = value.map_err(|err| {
                err.context(err!("fetching `{}::{}`", model.name, field.name.app_name))
            })?;
            self.set(index, value);
        }

        Ok(())
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Objects can reference each other in cycles, so only the header is
        // printed.
        match self.0.try_lock() {
            Ok(object) => f
                .debug_tuple("ObjectRef")
                .field(&object.model)
                .field(&object.identity)
                .finish(),
            Err(_) => f.debug_tuple("ObjectRef").field(&"<locked>").finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{schema::app::Relation, schema::Schema, Converters, Type};

    fn schema() -> Schema {
        let mut builder = Schema::builder();
        let person = builder.model("Person");
        let address = builder.model("Address");
        builder.root("Person", |m| {
            m.key("id", Type::String);
            m.field("age", Type::I32);
            m.field("nick", Type::String).optional();
            m.embedded("home", address).owner("person");
        });
        builder.embedded("Address", |m| {
            m.field("street", Type::String).nullable();
            m.relation("person", Relation::One(person));
        });
        builder.build(&Converters::new()).unwrap()
    }

    #[test]
    fn new_object_defaults() {
        let schema = schema();
        let person = ObjectRef::new(schema.model(ModelId(0)));

        assert_eq!(person.get(0), Value::Null);
        assert_eq!(person.get(1), Value::I32(0));
        assert_eq!(person.get(2), Value::none());
        assert!(!person.is_loaded(1));
    }

    #[test]
    fn handles_compare_by_address() {
        let schema = schema();
        let a = ObjectRef::new(schema.model(ModelId(0)));
        let b = ObjectRef::new(schema.model(ModelId(0)));

        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }

    #[test]
    fn owner_link_is_weak() {
        let schema = schema();
        let address = ObjectRef::new(schema.model(ModelId(1)));

        {
            let person = ObjectRef::new(schema.model(ModelId(0)));
            address.set_owner(&person, ModelId(0).field(3));
            let (owner, field) = address.owner().unwrap();
            assert_eq!(owner, person);
            assert_eq!(field, ModelId(0).field(3));
        }

        assert!(address.owner().is_none());
    }

    #[test]
    fn update_marks_dirty() {
        let schema = schema();
        let person = ObjectRef::new(schema.model(ModelId(0)));

        person.set(1, 30);
        assert!(person.dirty_fields().is_empty());

        person.update(1, 31);
        assert_eq!(person.dirty_fields(), vec![1]);

        person.clear_dirty();
        assert!(!person.is_dirty(1));
    }
}
