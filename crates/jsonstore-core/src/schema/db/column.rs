use super::Type;

/// A named storage slot within a document.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    /// The key of the column in the document
    pub name: String,

    /// The storage type of the column
    pub storage_ty: Type,

    /// Whether or not the column may hold null
    pub nullable: bool,
}

impl Column {
    pub fn new(name: impl Into<String>, storage_ty: Type) -> Column {
        Column {
            name: name.into(),
            storage_ty,
            nullable: true,
        }
    }

    pub fn is_numeric(&self) -> bool {
        self.storage_ty.is_numeric()
    }
}
