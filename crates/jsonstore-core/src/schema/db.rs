//! Document-level schema

mod column;
pub use column::Column;

mod table;
pub use table::Table;

mod ty;
pub use ty::Type;

use super::app::ModelId;
use indexmap::IndexMap;

/// Column name of the surrogate key under datastore identity.
pub const DATASTORE_ID_COLUMN: &str = "_id";

/// Column name of a version that is not held by any field.
pub const VERSION_COLUMN: &str = "_version";

/// Reserved document key carrying the originating type name.
pub const CLASS_KEY: &str = "class";

#[derive(Debug, Default)]
pub struct Schema {
    /// One table per root model
    pub tables: IndexMap<ModelId, Table>,
}

impl Schema {
    pub fn table(&self, id: impl Into<ModelId>) -> &Table {
        self.tables.get(&id.into()).expect("invalid table ID")
    }
}
