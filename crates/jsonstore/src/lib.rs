mod backend;
pub use backend::{Backend, Memory};

mod config;
pub use config::{Config, Credentials, StoreKind};

mod handler;

mod session;
pub use session::Session;

mod store;
pub use store::{Builder, Store};

pub use jsonstore_core::{
    schema, Bean, Converters, Error, Identity, ObjectRef, Result, StorageKind, Type,
    TypeConverter, TypeEnum, Value, ValueEnum,
};
pub use jsonstore_json::{Document, IdentityFormat, Reconstructor, Reconstructors};
