mod codec;

mod context;
pub use context::Context;

mod document;
pub use document::Document;

mod fetch;
pub use fetch::FetchFields;

pub mod identity;
pub use identity::{IdentityCodec, IdentityFormat};

pub mod reconstruct;
pub use reconstruct::{Reconstructor, Reconstructors};

mod store;
pub use store::StoreFields;

pub use jsonstore_core::{Error, Result};
