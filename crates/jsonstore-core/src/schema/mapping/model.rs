use super::{FieldPath, Member};
use crate::{schema::app::{FieldId, ModelId}, Result};
use indexmap::IndexMap;

/// Column mapping of one root model, including every embedded path reachable
/// from it.
#[derive(Debug, Clone)]
pub struct Model {
    /// Root model being mapped
    pub id: ModelId,

    pub members: IndexMap<FieldPath, Member>,
}

impl Model {
    /// Columns of a field of the root model.
    pub fn columns_for(&self, field: FieldId) -> Result<&Member> {
        self.columns_for_embedded(&FieldPath::from_field(field))
    }

    /// Columns of the field at the end of an embedding path.
    pub fn columns_for_embedded(&self, path: &FieldPath) -> Result<&Member> {
        self.members.get(path).ok_or_else(|| {
            crate::Error::invalid_schema(format!(
                "no column mapping for {path:?} in model {:?}",
                self.id
            ))
        })
    }
}
