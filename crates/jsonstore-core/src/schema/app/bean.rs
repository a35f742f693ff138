use crate::Type;

/// Shape of a non-persistable value type that may be rebuilt field by field
/// from a stored document.
#[derive(Debug, Clone)]
pub struct BeanType {
    /// Fully-qualified type name, matched against the document's class key
    pub name: String,

    pub fields: Vec<BeanField>,
}

#[derive(Debug, Clone)]
pub struct BeanField {
    pub name: String,
    pub ty: Type,
}

impl BeanType {
    pub fn new(name: impl Into<String>) -> BeanType {
        BeanType {
            name: name.into(),
            fields: vec![],
        }
    }

    pub fn field(mut self, name: impl Into<String>, ty: impl Into<Type>) -> BeanType {
        self.fields.push(BeanField {
            name: name.into(),
            ty: ty.into(),
        });
        self
    }

    pub fn field_by_name(&self, name: &str) -> Option<&BeanField> {
        self.fields.iter().find(|field| field.name == name)
    }
}
