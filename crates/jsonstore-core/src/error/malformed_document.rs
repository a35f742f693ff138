use super::Error;

/// Error when a document does not have the shape its mapping expects.
#[derive(Debug)]
pub(super) struct MalformedDocument {
    key: Box<str>,
    message: Box<str>,
}

impl std::error::Error for MalformedDocument {}

impl core::fmt::Display for MalformedDocument {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(
            f,
            "malformed document at key `{}`: {}",
            self.key, self.message
        )
    }
}

impl Error {
    /// Creates a malformed document error for the value stored under `key`.
    pub fn malformed_document(key: impl Into<String>, message: impl Into<String>) -> Error {
        Error::from(super::ErrorKind::MalformedDocument(MalformedDocument {
            key: key.into().into(),
            message: message.into().into(),
        }))
    }

    /// Returns `true` if this error is a malformed document error.
    pub fn is_malformed_document(&self) -> bool {
        self.any_kind(|kind| matches!(kind, super::ErrorKind::MalformedDocument(_)))
    }
}
