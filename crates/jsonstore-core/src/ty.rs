use std::fmt;

/// The declared type of a non-relation field, collection element or map
/// side.
#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    Bool,
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
    Char,
    String,
    Uuid,

    /// Arbitrary-precision decimal
    BigDecimal,

    /// Arbitrary-precision integer
    BigInt,

    Enum(TypeEnum),

    /// Ordered collection of non-persistable elements
    List(Box<Type>),

    /// Fixed-length array of non-persistable elements
    Array(Box<Type>),

    /// Key-value mapping of non-persistable keys and values
    Map(Box<Type>, Box<Type>),

    /// Non-persistable value type, referenced by its fully-qualified name
    Bean(String),
}

/// An enumeration with ordered variant names. A variant's ordinal is its
/// position in `variants`.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeEnum {
    pub name: String,
    pub variants: Vec<String>,
}

impl Type {
    pub fn list(elem: impl Into<Type>) -> Type {
        Type::List(Box::new(elem.into()))
    }

    pub fn array(elem: impl Into<Type>) -> Type {
        Type::Array(Box::new(elem.into()))
    }

    pub fn map(key: impl Into<Type>, value: impl Into<Type>) -> Type {
        Type::Map(Box::new(key.into()), Box::new(value.into()))
    }

    pub fn bean(name: impl Into<String>) -> Type {
        Type::Bean(name.into())
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Type::I8
                | Type::I16
                | Type::I32
                | Type::I64
                | Type::F32
                | Type::F64
                | Type::BigDecimal
                | Type::BigInt
        )
    }

    pub fn is_enum(&self) -> bool {
        matches!(self, Type::Enum(_))
    }

    pub fn as_enum(&self) -> Option<&TypeEnum> {
        match self {
            Type::Enum(ty) => Some(ty),
            _ => None,
        }
    }

    /// Element type of a list or array.
    pub fn elem(&self) -> Option<&Type> {
        match self {
            Type::List(elem) | Type::Array(elem) => Some(elem),
            _ => None,
        }
    }

    /// Name used to key type converters registered for this type.
    pub fn key(&self) -> &str {
        match self {
            Type::Bool => "bool",
            Type::I8 => "i8",
            Type::I16 => "i16",
            Type::I32 => "i32",
            Type::I64 => "i64",
            Type::F32 => "f32",
            Type::F64 => "f64",
            Type::Char => "char",
            Type::String => "string",
            Type::Uuid => "uuid",
            Type::BigDecimal => "bigdecimal",
            Type::BigInt => "bigint",
            Type::Enum(ty) => &ty.name,
            Type::List(_) => "list",
            Type::Array(_) => "array",
            Type::Map(..) => "map",
            Type::Bean(name) => name,
        }
    }
}

impl TypeEnum {
    pub fn new<I, S>(name: impl Into<String>, variants: I) -> TypeEnum
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        TypeEnum {
            name: name.into(),
            variants: variants.into_iter().map(Into::into).collect(),
        }
    }

    pub fn ordinal_of(&self, name: &str) -> Option<usize> {
        self.variants.iter().position(|variant| variant == name)
    }
}

impl From<TypeEnum> for Type {
    fn from(value: TypeEnum) -> Self {
        Type::Enum(value)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::List(elem) => write!(f, "list<{elem}>"),
            Type::Array(elem) => write!(f, "array<{elem}>"),
            Type::Map(key, value) => write!(f, "map<{key}, {value}>"),
            ty => f.write_str(ty.key()),
        }
    }
}
