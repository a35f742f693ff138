#[macro_use]
mod error;
pub use error::Error;

pub mod convert;
pub use convert::{Converters, StorageKind, TypeConverter};

mod identity;
pub use identity::Identity;

pub mod object;
pub use object::{FieldConsumer, FieldSupplier, Object, ObjectRef};

mod orchestrator;
pub use orchestrator::Orchestrator;

pub mod schema;
pub use schema::Schema;

mod ty;
pub use ty::{Type, TypeEnum};

mod value;
pub use value::{Bean, Value, ValueEnum};

/// A Result type alias that uses jsonstore's [`Error`] type.
pub type Result<T> = core::result::Result<T, Error>;
