use super::{Column, DATASTORE_ID_COLUMN, VERSION_COLUMN};
use crate::schema::app::ModelId;

/// The document layout of one root model.
#[derive(Debug, Clone)]
pub struct Table {
    /// Model stored in this table
    pub model: ModelId,

    /// Table name. Informational, documents are addressed by URL path.
    pub name: String,

    /// Top-level columns of the document, in field order
    pub columns: Vec<Column>,

    /// Surrogate key column, present under datastore identity
    pub datastore_id: Option<Column>,

    /// Surrogate version column, present when versioned without a field
    pub version: Option<Column>,
}

impl Table {
    pub fn column_by_name(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|column| column.name == name)
    }

    pub(crate) fn datastore_id_column() -> Column {
        let mut column = Column::new(DATASTORE_ID_COLUMN, super::Type::Text);
        column.nullable = false;
        column
    }

    pub(crate) fn version_column() -> Column {
        let mut column = Column::new(VERSION_COLUMN, super::Type::Integer);
        column.nullable = false;
        column
    }
}
