use crate::schema::db::Column;

/// How one field, at one embedding path, maps to document columns.
#[derive(Debug, Clone)]
pub struct Member {
    /// Columns in declaration order. Empty for owner back-references and
    /// flattened embedded fields.
    pub columns: Vec<Column>,

    /// Name of the type converter applied to the field
    pub converter: Option<String>,

    pub role: Role,
}

/// Marshalling role of a field, resolved once when the mapping is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Read from and written to its own columns
    Normal,

    /// Resolves to the enclosing object and is never stored
    OwnerBackReference,

    /// Holds an embedded object, stored flat or as a sub-document
    Embedded { nested: bool },
}

impl Member {
    /// Name of the first column. Members without columns report an empty
    /// name.
    pub fn column_name(&self) -> &str {
        self.columns
            .first()
            .map(|column| column.name.as_str())
            .unwrap_or("")
    }

    pub fn is_numeric(&self) -> bool {
        self.columns
            .first()
            .map(|column| column.is_numeric())
            .unwrap_or(false)
    }
}
