use crate::schema::app::FieldId;
use std::fmt;

/// Ownership path from a root model's field down through embedded fields.
///
/// Paths are immutable. Descending into an embedded object yields a new,
/// longer path.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct FieldPath {
    fields: Vec<FieldId>,
}

impl FieldPath {
    /// The empty path, naming the root object itself.
    pub fn root() -> FieldPath {
        FieldPath::default()
    }

    pub fn from_field(field: FieldId) -> FieldPath {
        FieldPath {
            fields: vec![field],
        }
    }

    /// Returns a new path extended by `field`.
    pub fn join(&self, field: FieldId) -> FieldPath {
        let mut fields = self.fields.clone();
        fields.push(field);
        FieldPath { fields }
    }

    pub fn last(&self) -> Option<FieldId> {
        self.fields.last().copied()
    }
}

impl From<FieldId> for FieldPath {
    fn from(value: FieldId) -> Self {
        FieldPath::from_field(value)
    }
}

impl fmt::Debug for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FieldPath(")?;
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                f.write_str(" > ")?;
            }
            write!(f, "{}/{}", field.model.0, field.index)?;
        }
        f.write_str(")")
    }
}
