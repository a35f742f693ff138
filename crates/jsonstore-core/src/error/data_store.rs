use super::Error;

/// Error raised by the storage layer or the document library.
///
/// This is the generic data-store exception fatal marshalling failures
/// surface as. It wraps:
/// - transport failures reported by a backend
/// - JSON parse and print failures
/// - any other error a collaborator hands back while a document is being
///   written or read
#[derive(Debug)]
pub(super) struct DataStoreError {
    pub(super) inner: Box<dyn std::error::Error + Send + Sync>,
}

impl std::error::Error for DataStoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.inner.as_ref())
    }
}

impl core::fmt::Display for DataStoreError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        f.write_str("data store failure: ")?;
        core::fmt::Display::fmt(&self.inner, f)?;
        let mut source = self.inner.source();
        while let Some(err) = source {
            write!(f, ": {}", err)?;
            source = err.source();
        }
        Ok(())
    }
}

impl Error {
    /// Wraps an error raised by the storage layer.
    pub fn data_store(err: impl std::error::Error + Send + Sync + 'static) -> Error {
        Error::from(super::ErrorKind::DataStore(DataStoreError {
            inner: Box::new(err),
        }))
    }

    /// Returns `true` if this error, or any error it wraps, came from the
    /// storage layer.
    pub fn is_data_store(&self) -> bool {
        self.any_kind(|kind| matches!(kind, super::ErrorKind::DataStore(_)))
    }
}
