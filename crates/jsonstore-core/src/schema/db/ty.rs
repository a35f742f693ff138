use crate::{convert::StorageKind, Type as AppType};

/// Storage type of a document column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Type {
    Boolean,
    Integer,
    Double,

    /// Arbitrary-precision number
    Numeric,

    Text,

    /// A nested document or list
    Document,
}

impl Type {
    /// Returns `true` for column types declared to hold numbers. Drives the
    /// ordinal-versus-name choice for enums and the long-versus-string choice
    /// for converter fallbacks.
    pub fn is_numeric(self) -> bool {
        matches!(self, Type::Integer | Type::Double | Type::Numeric)
    }

    /// Default storage type for an app-level type.
    pub fn from_app(ty: &AppType) -> Type {
        match ty {
            AppType::Bool => Type::Boolean,
            AppType::I8 | AppType::I16 | AppType::I32 | AppType::I64 => Type::Integer,
            AppType::F32 | AppType::F64 => Type::Double,
            AppType::BigDecimal | AppType::BigInt => Type::Numeric,
            AppType::Char | AppType::String | AppType::Uuid | AppType::Enum(_) => Type::Text,
            AppType::List(_) | AppType::Array(_) | AppType::Map(..) | AppType::Bean(_) => {
                Type::Document
            }
        }
    }

    pub fn from_storage_kind(kind: StorageKind) -> Type {
        match kind {
            StorageKind::Bool => Type::Boolean,
            StorageKind::Int | StorageKind::Long => Type::Integer,
            StorageKind::Double => Type::Double,
            StorageKind::String => Type::Text,
            StorageKind::Object => Type::Document,
        }
    }
}
