use super::{Field, FieldId, FieldTy, Version};
use std::fmt;

#[derive(Debug, Clone)]
pub struct Model {
    /// Uniquely identifies the model within the schema
    pub id: ModelId,

    /// Fully-qualified type name. Written to every document under the class
    /// key.
    pub name: String,

    /// Fields contained by the model
    pub fields: Vec<Field>,

    /// Distinguishes root models (stored as documents) from embedded models
    pub kind: ModelKind,

    /// Per-model endpoint path. Defaults to the type name.
    pub url: Option<String>,
}

#[derive(Debug, Clone)]
pub enum ModelKind {
    /// Stored as its own document and addressable by identity
    Root(ModelRoot),

    /// Only ever stored inside an owning object's document
    Embedded,
}

#[derive(Debug, Clone)]
pub struct ModelRoot {
    pub identity: IdentityKind,

    pub version: Option<Version>,

    /// If the schema specifies a table to map the model to, this is set.
    pub table_name: Option<String>,
}

#[derive(Debug, Clone)]
pub enum IdentityKind {
    /// Backend-assigned surrogate key
    Datastore,

    /// Application-assigned key made of these fields
    Application(Vec<FieldId>),
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct ModelId(pub usize);

impl Model {
    /// Returns true if this is a root model
    pub fn is_root(&self) -> bool {
        matches!(self.kind, ModelKind::Root(_))
    }

    /// Returns true if this is an embedded model
    pub fn is_embedded(&self) -> bool {
        matches!(self.kind, ModelKind::Embedded)
    }

    pub fn as_root(&self) -> Option<&ModelRoot> {
        match &self.kind {
            ModelKind::Root(root) => Some(root),
            ModelKind::Embedded => None,
        }
    }

    #[track_caller]
    pub fn expect_root(&self) -> &ModelRoot {
        match &self.kind {
            ModelKind::Root(root) => root,
            ModelKind::Embedded => panic!("expected root model, but `{}` is embedded", self.name),
        }
    }

    pub fn field(&self, field: impl Into<FieldId>) -> &Field {
        let field_id = field.into();
        assert_eq!(self.id, field_id.model);
        &self.fields[field_id.index]
    }

    pub fn field_by_name(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|field| field.name.app_name == name)
    }

    /// Primary key fields under application identity. Empty otherwise.
    pub fn primary_key_fields(&self) -> impl Iterator<Item = &Field> + '_ {
        let ids: &[FieldId] = match &self.kind {
            ModelKind::Root(ModelRoot {
                identity: IdentityKind::Application(fields),
                ..
            }) => fields,
            _ => &[],
        };
        ids.iter().map(|id| self.field(*id))
    }

    pub fn uses_datastore_identity(&self) -> bool {
        matches!(
            self.kind,
            ModelKind::Root(ModelRoot {
                identity: IdentityKind::Datastore,
                ..
            })
        )
    }

    pub fn version(&self) -> Option<&Version> {
        self.as_root().and_then(|root| root.version.as_ref())
    }

    /// Indices of every field, in declaration order.
    pub fn all_field_indices(&self) -> Vec<usize> {
        (0..self.fields.len()).collect()
    }

    pub fn embedded_fields(&self) -> impl Iterator<Item = &Field> + '_ {
        self.fields
            .iter()
            .filter(|field| matches!(field.ty, FieldTy::Embedded(_)))
    }

    /// Path under the endpoint where documents of this model live, always
    /// ending in `/`.
    pub fn url_path(&self) -> String {
        let mut path = self.url.clone().unwrap_or_else(|| self.name.clone());
        if !path.ends_with('/') {
            path.push('/');
        }
        path
    }
}

impl ModelId {
    /// Create a `FieldId` representing the current model's field at index
    /// `index`.
    pub const fn field(self, index: usize) -> FieldId {
        FieldId { model: self, index }
    }

    pub(crate) const fn placeholder() -> Self {
        Self(usize::MAX)
    }
}

impl From<&Self> for ModelId {
    fn from(src: &Self) -> Self {
        *src
    }
}

impl From<&Model> for ModelId {
    fn from(value: &Model) -> Self {
        value.id
    }
}

impl fmt::Debug for ModelId {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "ModelId({})", self.0)
    }
}
