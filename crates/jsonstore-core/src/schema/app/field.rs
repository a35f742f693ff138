use super::{Embedded, Model, ModelId, Relation, RelationClass, Schema};
use crate::{schema::db, Type};
use std::fmt;

#[derive(Debug, Clone)]
pub struct Field {
    /// Uniquely identifies the field within the containing model.
    pub id: FieldId,

    /// The field name
    pub name: FieldName,

    /// Primitive, embedded or relation
    pub ty: FieldTy,

    /// Whether the field is stored, kept in memory only, or ignored.
    pub persistence: Persistence,

    /// True if the field can hold null.
    pub nullable: bool,

    /// True if the field is declared as an optional wrapper around its type.
    pub optional: bool,

    /// True if the field is part of the primary key
    pub primary_key: bool,

    /// Name of the type converter registered for this field, if any.
    pub converter: Option<String>,

    /// Overrides the storage type derived from the field type.
    pub storage_ty: Option<db::Type>,

    /// Ordering applied to a multi-valued relation after it is read.
    pub order_by: Option<OrderBy>,

    /// Embedded fields only: store the embedded object as a sub-document
    /// instead of flattening it into the owner's document.
    pub nested: bool,
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldId {
    pub model: ModelId,
    pub index: usize,
}

#[derive(Debug, Clone)]
pub struct FieldName {
    pub app_name: String,
    pub storage_name: Option<String>,
}

#[derive(Debug, Clone)]
pub enum FieldTy {
    Primitive(FieldPrimitive),
    Embedded(Embedded),
    Relation(Relation),
}

#[derive(Debug, Clone)]
pub struct FieldPrimitive {
    /// The field's declared type
    pub ty: Type,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Persistence {
    /// Stored in the document
    #[default]
    Persistent,

    /// Managed in memory but never stored
    Transactional,

    /// Ignored by persistence
    NotPersistent,
}

/// Ordering clause of a multi-valued relation, by fields of the related
/// model.
#[derive(Debug, Clone)]
pub struct OrderBy {
    pub items: Vec<OrderByItem>,
}

#[derive(Debug, Clone)]
pub struct OrderByItem {
    pub field: String,
    pub descending: bool,
}

/// The typed accessor used to hand a field's value between an object and a
/// field visitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accessor {
    Bool,
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
    Char,
    String,
    Object,
}

impl Field {
    /// Gets the id.
    pub fn id(&self) -> FieldId {
        self.id
    }

    /// Gets the type.
    pub fn ty(&self) -> &FieldTy {
        &self.ty
    }

    /// Returns true if the field's value is written to and read from the
    /// document.
    pub fn is_storable(&self) -> bool {
        self.persistence == Persistence::Persistent
    }

    pub fn is_relation(&self) -> bool {
        self.ty.is_relation()
    }

    pub fn relation_class(&self) -> RelationClass {
        match &self.ty {
            FieldTy::Relation(relation) => relation.class(),
            _ => RelationClass::None,
        }
    }

    /// Returns a fully qualified name for the field.
    pub fn full_name(&self, schema: &Schema) -> String {
        let model = schema.model(self.id.model);
        format!("{}::{}", model.name, self.name.app_name)
    }

    /// Declared type, for diagnostics.
    pub fn declared_ty(&self, schema: &Schema) -> String {
        let ty = match &self.ty {
            FieldTy::Primitive(primitive) => primitive.ty.to_string(),
            FieldTy::Embedded(embedded) => embedded.target(schema).name.clone(),
            FieldTy::Relation(Relation::One(target)) => schema.model(*target).name.clone(),
            FieldTy::Relation(Relation::Collection(target)) => {
                format!("collection<{}>", schema.model(*target).name)
            }
            FieldTy::Relation(Relation::Array(target)) => {
                format!("array<{}>", schema.model(*target).name)
            }
            FieldTy::Relation(Relation::Map { .. }) => "map".to_string(),
        };

        if self.optional {
            format!("optional<{ty}>")
        } else {
            ty
        }
    }

    /// Selects the typed accessor from the field's static type. Non-nullable
    /// primitives without a converter use their own accessor, strings use the
    /// string accessor, everything else travels as an object.
    pub fn accessor(&self) -> Accessor {
        let FieldTy::Primitive(primitive) = &self.ty else {
            return Accessor::Object;
        };

        if self.optional || self.converter.is_some() {
            return Accessor::Object;
        }

        if primitive.ty == Type::String {
            return Accessor::String;
        }

        if self.nullable {
            return Accessor::Object;
        }

        match primitive.ty {
            Type::Bool => Accessor::Bool,
            Type::I8 => Accessor::I8,
            Type::I16 => Accessor::I16,
            Type::I32 => Accessor::I32,
            Type::I64 => Accessor::I64,
            Type::F32 => Accessor::F32,
            Type::F64 => Accessor::F64,
            Type::Char => Accessor::Char,
            _ => Accessor::Object,
        }
    }
}

impl FieldId {
    pub(crate) fn placeholder() -> FieldId {
        FieldId {
            model: ModelId::placeholder(),
            index: usize::MAX,
        }
    }
}

impl From<&Self> for FieldId {
    fn from(val: &Self) -> Self {
        *val
    }
}

impl From<&Field> for FieldId {
    fn from(val: &Field) -> Self {
        val.id
    }
}

impl fmt::Debug for FieldId {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "FieldId({}/{})", self.model.0, self.index)
    }
}

impl FieldName {
    pub fn new(app_name: impl Into<String>) -> FieldName {
        FieldName {
            app_name: app_name.into(),
            storage_name: None,
        }
    }

    pub fn storage_name(&self) -> &str {
        self.storage_name.as_ref().unwrap_or(&self.app_name)
    }
}

impl FieldTy {
    pub fn is_primitive(&self) -> bool {
        matches!(self, Self::Primitive(..))
    }

    pub fn as_primitive(&self) -> Option<&FieldPrimitive> {
        match self {
            Self::Primitive(primitive) => Some(primitive),
            _ => None,
        }
    }

    #[track_caller]
    pub fn expect_primitive(&self) -> &FieldPrimitive {
        match self {
            Self::Primitive(primitive) => primitive,
            _ => panic!("expected primitive, but was {self:?}"),
        }
    }

    pub fn is_embedded(&self) -> bool {
        matches!(self, Self::Embedded(..))
    }

    pub fn as_embedded(&self) -> Option<&Embedded> {
        match self {
            Self::Embedded(embedded) => Some(embedded),
            _ => None,
        }
    }

    #[track_caller]
    pub fn expect_embedded(&self) -> &Embedded {
        match self {
            Self::Embedded(embedded) => embedded,
            _ => panic!("expected embedded, but was {self:?}"),
        }
    }

    pub fn is_relation(&self) -> bool {
        matches!(self, Self::Relation(..))
    }

    pub fn as_relation(&self) -> Option<&Relation> {
        match self {
            Self::Relation(relation) => Some(relation),
            _ => None,
        }
    }
}

impl From<Type> for FieldTy {
    fn from(ty: Type) -> Self {
        FieldTy::Primitive(FieldPrimitive { ty })
    }
}

impl From<Embedded> for FieldTy {
    fn from(value: Embedded) -> Self {
        FieldTy::Embedded(value)
    }
}

impl From<Relation> for FieldTy {
    fn from(value: Relation) -> Self {
        FieldTy::Relation(value)
    }
}

impl OrderBy {
    /// Resolves the ordering fields against the related model. Returns
    /// `None` when the clause only names primary key fields, which already
    /// match the stored order.
    pub fn resolve<'a>(&self, target: &'a Model) -> Option<Vec<(&'a Field, bool)>> {
        let resolved: Vec<_> = self
            .items
            .iter()
            .filter_map(|item| {
                target
                    .field_by_name(&item.field)
                    .map(|field| (field, item.descending))
            })
            .collect();

        if resolved.iter().all(|(field, _)| field.primary_key) {
            None
        } else {
            Some(resolved)
        }
    }
}
