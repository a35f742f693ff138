use super::FieldId;

/// Optimistic versioning of a root model.
#[derive(Debug, Clone)]
pub struct Version {
    pub strategy: VersionStrategy,

    /// The field holding the version. When `None`, the version lives in a
    /// surrogate column of the document.
    pub field: Option<FieldId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionStrategy {
    /// Starts at 1 and increments on each update
    Number,

    /// Milliseconds since the Unix epoch at the time of the write
    DateTime,
}

impl VersionStrategy {
    /// The version of a newly inserted object.
    pub fn initial(self, now_millis: i64) -> i64 {
        match self {
            VersionStrategy::Number => 1,
            VersionStrategy::DateTime => now_millis,
        }
    }

    pub fn next(self, current: Option<i64>, now_millis: i64) -> i64 {
        match self {
            VersionStrategy::Number => current.map(|v| v + 1).unwrap_or(1),
            VersionStrategy::DateTime => now_millis,
        }
    }
}
