use crate::{ObjectRef, Type};
use bigdecimal::{num_bigint::BigInt, BigDecimal};
use indexmap::IndexMap;
use std::{cmp::Ordering, fmt};
use uuid::Uuid;

/// The in-memory value of a field.
#[derive(Debug, Default, Clone, PartialEq)]
pub enum Value {
    /// Null value
    #[default]
    Null,

    /// Boolean value
    Bool(bool),

    /// Signed 8-bit integer
    I8(i8),

    /// Signed 16-bit integer
    I16(i16),

    /// Signed 32-bit integer
    I32(i32),

    /// Signed 64-bit integer
    I64(i64),

    F32(f32),

    F64(f64),

    Char(char),

    /// String value
    String(String),

    Uuid(Uuid),

    BigDecimal(BigDecimal),

    BigInt(BigInt),

    /// Value of an enumerated type
    Enum(ValueEnum),

    /// A list or array of values of the same type
    List(Vec<Value>),

    /// Key-value entries, in insertion order
    Map(Vec<(Value, Value)>),

    /// Instance of a non-persistable value type
    Bean(Bean),

    /// A persistent or embedded object
    Object(ObjectRef),

    /// An optional-wrapped value. `None` is the absent state.
    Optional(Option<Box<Value>>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValueEnum {
    /// Position of the variant in the enum declaration
    pub ordinal: usize,

    pub name: String,
}

/// Instance of a non-persistable value type, reconstructed field by field.
#[derive(Debug, Clone, PartialEq)]
pub struct Bean {
    /// Fully-qualified name of the value type
    pub type_name: String,

    pub fields: IndexMap<String, Value>,
}

impl Value {
    pub const fn null() -> Self {
        Self::Null
    }

    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns `true` for `Null` and for an absent optional.
    pub fn is_none(&self) -> bool {
        matches!(self, Self::Null | Self::Optional(None))
    }

    pub fn some(value: impl Into<Value>) -> Self {
        Self::Optional(Some(Box::new(value.into())))
    }

    pub const fn none() -> Self {
        Self::Optional(None)
    }

    /// The zero value of a primitive type, used when a stored column is
    /// null. Everything else defaults to `Null`.
    pub fn zero(ty: &Type) -> Self {
        match ty {
            Type::Bool => Self::Bool(false),
            Type::I8 => Self::I8(0),
            Type::I16 => Self::I16(0),
            Type::I32 => Self::I32(0),
            Type::I64 => Self::I64(0),
            Type::F32 => Self::F32(0.0),
            Type::F64 => Self::F64(0.0),
            Type::Char => Self::Char('\0'),
            _ => Self::Null,
        }
    }

    /// Strips one level of optional wrapping. An absent optional becomes
    /// `Null`.
    pub fn unwrap_optional(&self) -> &Value {
        match self {
            Self::Optional(Some(inner)) => inner,
            Self::Optional(None) => &Value::Null,
            value => value,
        }
    }

    /// Wraps the value in an optional, mapping `Null` to absent.
    pub fn into_optional(self) -> Value {
        match self {
            Self::Null => Self::Optional(None),
            value @ Self::Optional(_) => value,
            value => Self::Optional(Some(Box::new(value))),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Widens any integer variant to `i64`.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Self::I8(v) => Some(v.into()),
            Self::I16(v) => Some(v.into()),
            Self::I32(v) => Some(v.into()),
            Self::I64(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Self::F32(v) => Some(v.into()),
            Self::F64(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Self::Object(object) => Some(object),
            _ => None,
        }
    }

    #[track_caller]
    pub fn expect_object(&self) -> &ObjectRef {
        match self {
            Self::Object(object) => object,
            _ => panic!("expected Value::Object; actual={self:#?}"),
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_bean(&self) -> Option<&Bean> {
        match self {
            Self::Bean(bean) => Some(bean),
            _ => None,
        }
    }

    /// Name of the variant, used in diagnostics.
    pub fn variant_name(&self) -> &'static str {
        match self {
            Self::Null => "Null",
            Self::Bool(_) => "Bool",
            Self::I8(_) => "I8",
            Self::I16(_) => "I16",
            Self::I32(_) => "I32",
            Self::I64(_) => "I64",
            Self::F32(_) => "F32",
            Self::F64(_) => "F64",
            Self::Char(_) => "Char",
            Self::String(_) => "String",
            Self::Uuid(_) => "Uuid",
            Self::BigDecimal(_) => "BigDecimal",
            Self::BigInt(_) => "BigInt",
            Self::Enum(_) => "Enum",
            Self::List(_) => "List",
            Self::Map(_) => "Map",
            Self::Bean(_) => "Bean",
            Self::Object(_) => "Object",
            Self::Optional(_) => "Optional",
        }
    }

    /// Orders two scalar values of the same kind. Nulls sort first, values
    /// of different kinds compare equal.
    pub fn cmp_scalar(&self, other: &Value) -> Ordering {
        match (self.unwrap_optional(), other.unwrap_optional()) {
            (Self::Null, Self::Null) => Ordering::Equal,
            (Self::Null, _) => Ordering::Less,
            (_, Self::Null) => Ordering::Greater,
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            (Self::String(a), Self::String(b)) => a.cmp(b),
            (Self::Char(a), Self::Char(b)) => a.cmp(b),
            (Self::Uuid(a), Self::Uuid(b)) => a.cmp(b),
            (Self::BigDecimal(a), Self::BigDecimal(b)) => a.cmp(b),
            (Self::BigInt(a), Self::BigInt(b)) => a.cmp(b),
            (Self::Enum(a), Self::Enum(b)) => a.ordinal.cmp(&b.ordinal),
            (a, b) => match (a.as_i64(), b.as_i64()) {
                (Some(a), Some(b)) => a.cmp(&b),
                _ => match (a.as_f64(), b.as_f64()) {
                    (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
                    _ => Ordering::Equal,
                },
            },
        }
    }
}

impl ValueEnum {
    pub fn new(ordinal: usize, name: impl Into<String>) -> ValueEnum {
        ValueEnum {
            ordinal,
            name: name.into(),
        }
    }
}

impl Bean {
    pub fn new(type_name: impl Into<String>) -> Bean {
        Bean {
            type_name: type_name.into(),
            fields: IndexMap::new(),
        }
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Bean {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> &Value {
        self.fields.get(name).unwrap_or(&Value::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(v) => fmt::Display::fmt(v, f),
            Self::I8(v) => fmt::Display::fmt(v, f),
            Self::I16(v) => fmt::Display::fmt(v, f),
            Self::I32(v) => fmt::Display::fmt(v, f),
            Self::I64(v) => fmt::Display::fmt(v, f),
            Self::F32(v) => fmt::Display::fmt(v, f),
            Self::F64(v) => fmt::Display::fmt(v, f),
            Self::Char(v) => fmt::Display::fmt(v, f),
            Self::String(v) => fmt::Display::fmt(v, f),
            Self::Uuid(v) => fmt::Display::fmt(v, f),
            Self::BigDecimal(v) => fmt::Display::fmt(v, f),
            Self::BigInt(v) => fmt::Display::fmt(v, f),
            Self::Enum(v) => f.write_str(&v.name),
            Self::Optional(Some(v)) => fmt::Display::fmt(v, f),
            Self::Optional(None) => f.write_str("null"),
            value => write!(f, "<{}>", value.variant_name()),
        }
    }
}

macro_rules! impl_from {
    ($($ty:ty => $variant:ident,)*) => {
        $(
            impl From<$ty> for Value {
                fn from(src: $ty) -> Value {
                    Value::$variant(src)
                }
            }
        )*
    };
}

impl_from! {
    bool => Bool,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    f32 => F32,
    f64 => F64,
    char => Char,
    String => String,
    Uuid => Uuid,
    BigDecimal => BigDecimal,
    BigInt => BigInt,
    ValueEnum => Enum,
    Vec<Value> => List,
    Bean => Bean,
    ObjectRef => Object,
}

impl From<&str> for Value {
    fn from(src: &str) -> Value {
        Value::String(src.to_string())
    }
}

impl From<&String> for Value {
    fn from(src: &String) -> Value {
        Value::String(src.clone())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => value.into(),
            None => Value::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optional_wrapping() {
        assert_eq!(Value::Null.into_optional(), Value::none());
        assert_eq!(Value::from("a").into_optional(), Value::some("a"));
        assert_eq!(Value::some(3_i32).unwrap_optional(), &Value::I32(3));
        assert!(Value::none().is_none());
    }

    #[test]
    fn zero_values() {
        assert_eq!(Value::zero(&Type::Bool), Value::Bool(false));
        assert_eq!(Value::zero(&Type::I16), Value::I16(0));
        assert_eq!(Value::zero(&Type::F64), Value::F64(0.0));
        assert_eq!(Value::zero(&Type::String), Value::Null);
    }

    #[test]
    fn scalar_ordering() {
        assert_eq!(Value::from("a").cmp_scalar(&"b".into()), Ordering::Less);
        assert_eq!(Value::I32(4).cmp_scalar(&Value::I64(2)), Ordering::Greater);
        assert_eq!(Value::Null.cmp_scalar(&Value::I32(1)), Ordering::Less);
    }
}
