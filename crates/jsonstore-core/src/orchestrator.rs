use crate::schema::app::{FieldId, Model, ModelId};
use crate::{Identity, ObjectRef, Result};

/// The persistence runtime the marshaller calls back into for relation and
/// embedded fields.
pub trait Orchestrator {
    /// Persists `value`, reached through `owner.field`, if it is not yet
    /// persistent, and returns the managed object.
    fn persist(&self, value: &ObjectRef, owner: &ObjectRef, field: FieldId) -> Result<ObjectRef>;

    /// Returns the identity of a managed object.
    fn identity(&self, object: &ObjectRef) -> Result<Identity>;

    /// Looks up the live object with the given identity. `Ok(None)` means the
    /// object no longer exists.
    fn find(&self, model: ModelId, identity: &Identity) -> Result<Option<ObjectRef>>;

    /// Records that field `field` of `owner` changed in memory and must be
    /// written on the next update.
    fn mark_dirty(&self, owner: &ObjectRef, field: usize) {
        owner.mark_dirty(field);
    }

    /// Returns the managed handle for an embedded object held by
    /// `owner.field`, linking it to its owner.
    fn embedded(&self, value: &ObjectRef, owner: &ObjectRef, field: FieldId) -> Result<ObjectRef> {
        value.set_owner(owner, field);
        Ok(value.clone())
    }

    /// Allocates an embedded object of `model` for `owner.field`.
    fn new_embedded(&self, model: &Model, owner: &ObjectRef, field: FieldId) -> ObjectRef {
        let object = ObjectRef::new(model);
        object.set_owner(owner, field);
        object
    }
}
