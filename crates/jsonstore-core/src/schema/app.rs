//! Application-level schema

mod bean;
pub use bean::{BeanField, BeanType};

mod embedded;
pub use embedded::{Container, Embedded};

mod field;
pub use field::{
    Accessor, Field, FieldId, FieldName, FieldPrimitive, FieldTy, OrderBy, OrderByItem,
    Persistence,
};

mod model;
pub use model::{IdentityKind, Model, ModelId, ModelKind, ModelRoot};

mod relation;
pub use relation::{MapSide, Relation, RelationClass};

mod schema;
pub use schema::Schema;

mod version;
pub use version::{Version, VersionStrategy};
