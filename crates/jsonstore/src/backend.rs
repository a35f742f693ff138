mod memory;
pub use memory::Memory;

use crate::{Document, Result};
use std::fmt::Debug;

/// Moves whole documents to and from a store.
///
/// Every call addresses a full URL built by
/// [`Config::url_for`](crate::Config::url_for). Request signing, retries and
/// timeouts belong to implementations.
pub trait Backend: Debug + Send + Sync + 'static {
    /// Creates a document.
    fn post(&self, url: &str, doc: &Document) -> Result<()>;

    /// Creates a document or writes `doc`'s entries over an existing one.
    fn put(&self, url: &str, doc: &Document) -> Result<()>;

    /// Reads a document. `Ok(None)` means nothing is stored at `url`.
    fn get(&self, url: &str) -> Result<Option<Document>>;

    /// Returns `true` if a document is stored at `url`.
    fn head(&self, url: &str) -> Result<bool>;

    /// Removes a document. Returns `false` if nothing was stored at `url`.
    fn delete(&self, url: &str) -> Result<bool>;

    /// Reads every document under a model's path. A missing path lists
    /// nothing.
    fn list(&self, url: &str) -> Result<Vec<Document>>;
}

impl<B: Backend + ?Sized> Backend for std::sync::Arc<B> {
    fn post(&self, url: &str, doc: &Document) -> Result<()> {
        (**self).post(url, doc)
    }

    fn put(&self, url: &str, doc: &Document) -> Result<()> {
        (**self).put(url, doc)
    }

    fn get(&self, url: &str) -> Result<Option<Document>> {
        (**self).get(url)
    }

    fn head(&self, url: &str) -> Result<bool> {
        (**self).head(url)
    }

    fn delete(&self, url: &str) -> Result<bool> {
        (**self).delete(url)
    }

    fn list(&self, url: &str) -> Result<Vec<Document>> {
        (**self).list(url)
    }
}
