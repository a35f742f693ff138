//! Type converters: bidirectional functions between a field's native type
//! and one or more storage-primitive values.

use crate::{Result, Type, Value};
use indexmap::IndexMap;
use std::{fmt, sync::Arc};

/// Primitive kind of a converter's storage-side column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    Bool,
    Int,
    Long,
    Double,
    String,

    /// Any JSON value, passed through untyped
    Object,
}

pub trait TypeConverter: Send + Sync + 'static {
    /// Unique name under which the converter is registered.
    fn name(&self) -> &str;

    /// Key of the member type this converter handles. See [`Type::key`].
    fn member_type(&self) -> &str;

    /// One entry per destination column.
    fn column_types(&self) -> &[StorageKind];

    /// Storage kind of a single-column converter.
    fn datastore_type(&self) -> StorageKind {
        self.column_types()
            .first()
            .copied()
            .unwrap_or(StorageKind::Object)
    }

    /// Converts a non-null member value to one value per column.
    fn to_datastore(&self, value: &Value) -> Result<Vec<Value>>;

    /// Converts the column values, in declaration order, back to the member
    /// type.
    fn to_member(&self, columns: Vec<Value>) -> Result<Value>;
}

/// Registry of type converters, injected into the schema builder and the
/// marshaller.
#[derive(Clone, Default)]
pub struct Converters {
    converters: IndexMap<String, Arc<dyn TypeConverter>>,
}

impl Converters {
    /// A registry holding the built-in converters.
    pub fn new() -> Converters {
        let mut converters = Converters::default();
        converters.register(UuidString);
        converters.register(CharString);
        converters
    }

    pub fn register(&mut self, converter: impl TypeConverter) -> &mut Self {
        self.converters
            .insert(converter.name().to_string(), Arc::new(converter));
        self
    }

    /// Looks up a converter by its registered name.
    pub fn get(&self, name: &str) -> Option<&dyn TypeConverter> {
        self.converters.get(name).map(|converter| &**converter)
    }

    /// Finds a single-column converter from `ty` to the storage kind `kind`.
    pub fn find(&self, ty: &Type, kind: StorageKind) -> Option<&dyn TypeConverter> {
        self.converters
            .values()
            .find(|converter| {
                converter.member_type() == ty.key() && converter.column_types() == [kind]
            })
            .map(|converter| &**converter)
    }

    /// Finds the fallback converter for a type that has no native document
    /// representation. A numeric column prefers a long-producing converter,
    /// anything else prefers a string-producing one, with long as the last
    /// resort.
    pub fn fallback(&self, ty: &Type, numeric: bool) -> Option<&dyn TypeConverter> {
        if numeric {
            self.find(ty, StorageKind::Long)
        } else {
            self.find(ty, StorageKind::String)
                .or_else(|| self.find(ty, StorageKind::Long))
        }
    }
}

impl fmt::Debug for Converters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.converters.keys()).finish()
    }
}

/// Stores a uuid as its hyphenated string.
#[derive(Debug)]
struct UuidString;

impl TypeConverter for UuidString {
    fn name(&self) -> &str {
        "uuid-string"
    }

    fn member_type(&self) -> &str {
        "uuid"
    }

    fn column_types(&self) -> &[StorageKind] {
        &[StorageKind::String]
    }

    fn to_datastore(&self, value: &Value) -> Result<Vec<Value>> {
        match value {
            Value::Uuid(uuid) => Ok(vec![Value::String(uuid.to_string())]),
            value => Err(crate::Error::type_conversion(value.clone(), "uuid")),
        }
    }

    fn to_member(&self, columns: Vec<Value>) -> Result<Value> {
        match columns.into_iter().next() {
            Some(Value::String(text)) => Ok(Value::Uuid(text.parse()?)),
            Some(Value::Null) | None => Ok(Value::Null),
            Some(value) => Err(crate::Error::type_conversion(value, "uuid")),
        }
    }
}

/// Stores a char as a one-character string.
#[derive(Debug)]
struct CharString;

impl TypeConverter for CharString {
    fn name(&self) -> &str {
        "char-string"
    }

    fn member_type(&self) -> &str {
        "char"
    }

    fn column_types(&self) -> &[StorageKind] {
        &[StorageKind::String]
    }

    fn to_datastore(&self, value: &Value) -> Result<Vec<Value>> {
        match value {
            Value::Char(ch) => Ok(vec![Value::String(ch.to_string())]),
            value => Err(crate::Error::type_conversion(value.clone(), "char")),
        }
    }

    fn to_member(&self, columns: Vec<Value>) -> Result<Value> {
        match columns.into_iter().next() {
            Some(Value::String(text)) => match text.chars().next() {
                Some(ch) => Ok(Value::Char(ch)),
                None => Ok(Value::Null),
            },
            Some(Value::Null) | None => Ok(Value::Null),
            Some(value) => Err(crate::Error::type_conversion(value, "char")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct UuidLong;

    impl TypeConverter for UuidLong {
        fn name(&self) -> &str {
            "uuid-long"
        }

        fn member_type(&self) -> &str {
            "uuid"
        }

        fn column_types(&self) -> &[StorageKind] {
            &[StorageKind::Long]
        }

        fn to_datastore(&self, value: &Value) -> Result<Vec<Value>> {
            match value {
                Value::Uuid(uuid) => Ok(vec![Value::I64(uuid.as_u64_pair().1 as i64)]),
                _ => bail!("not a uuid"),
            }
        }

        fn to_member(&self, _columns: Vec<Value>) -> Result<Value> {
            bail!("lossy")
        }
    }

    #[test]
    fn fallback_prefers_long_for_numeric_columns() {
        let mut converters = Converters::new();
        converters.register(UuidLong);

        assert_eq!(
            converters.fallback(&Type::Uuid, true).map(|c| c.name()),
            Some("uuid-long")
        );
        assert_eq!(
            converters.fallback(&Type::Uuid, false).map(|c| c.name()),
            Some("uuid-string")
        );
    }

    #[test]
    fn fallback_to_long_without_string_converter() {
        let mut converters = Converters::default();
        converters.register(UuidLong);

        assert_eq!(
            converters.fallback(&Type::Uuid, false).map(|c| c.name()),
            Some("uuid-long")
        );
        assert!(converters.fallback(&Type::Char, false).is_none());
    }

    #[test]
    fn builtin_round_trips() {
        let converters = Converters::new();
        let uuid = uuid::Uuid::new_v4();
        let conv = converters.get("uuid-string").unwrap();

        let columns = conv.to_datastore(&Value::Uuid(uuid)).unwrap();
        assert_eq!(columns, vec![Value::String(uuid.to_string())]);
        assert_eq!(conv.to_member(columns).unwrap(), Value::Uuid(uuid));

        let conv = converters.get("char-string").unwrap();
        assert_eq!(
            conv.to_member(vec![Value::from("x")]).unwrap(),
            Value::Char('x')
        );
    }
}
