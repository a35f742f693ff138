//! Conversions between field values and JSON values.

use crate::document::{kind, mismatch};
use crate::{Document, Reconstructors};
use bigdecimal::{num_bigint::BigInt, BigDecimal};
use jsonstore_core::{
    schema::{app, db::CLASS_KEY},
    Error, Result, StorageKind, Type, TypeEnum, Value, ValueEnum,
};
use serde_json::{Map, Number, Value as Json};

/// Encodes an enum as its ordinal on numeric columns and as its name
/// otherwise.
pub(crate) fn encode_enum(value: &ValueEnum, numeric: bool) -> Json {
    if numeric {
        Json::from(value.ordinal as u64)
    } else {
        Json::String(value.name.clone())
    }
}

/// Resolves an enum constant from an ordinal or a name.
pub(crate) fn decode_enum(json: &Json, ty: &TypeEnum, key: &str) -> Result<Value> {
    let ordinal = match json {
        Json::Number(n) => n
            .as_u64()
            .and_then(|ordinal| usize::try_from(ordinal).ok())
            .filter(|ordinal| *ordinal < ty.variants.len()),
        Json::String(name) => ty.ordinal_of(name),
        json => return Err(mismatch(key, "enum ordinal or name", json)),
    };

    let Some(ordinal) = ordinal else {
        return Err(Error::malformed_document(
            key,
            format!("`{json}` is not a constant of {}", ty.name),
        ));
    };

    Ok(Value::Enum(ValueEnum::new(ordinal, &ty.variants[ordinal])))
}

/// Encodes a value that has a native JSON form. Values without one (uuids
/// and chars) are written as their text, beans as a document stamped with
/// their type name.
pub(crate) fn encode_native(value: &Value) -> Result<Json> {
    Ok(match value {
        Value::Null | Value::Optional(None) => Json::Null,
        Value::Bool(v) => Json::Bool(*v),
        Value::I8(v) => Json::from(*v),
        Value::I16(v) => Json::from(*v),
        Value::I32(v) => Json::from(*v),
        Value::I64(v) => Json::from(*v),
        Value::F32(v) => number(&v.to_string(), value)?,
        Value::F64(v) => match Number::from_f64(*v) {
            Some(n) => Json::Number(n),
            None => return Err(Error::type_conversion(value.clone(), "JSON number")),
        },
        Value::Char(v) => Json::String(v.to_string()),
        Value::String(v) => Json::String(v.clone()),
        Value::Uuid(v) => Json::String(v.to_string()),
        Value::BigDecimal(v) => number(&v.to_string(), value)?,
        Value::BigInt(v) => number(&v.to_string(), value)?,
        Value::Enum(v) => Json::String(v.name.clone()),
        Value::List(items) => Json::Array(items.iter().map(encode_native).collect::<Result<_>>()?),
        Value::Map(entries) => {
            let mut map = Map::new();
            for (key, value) in entries {
                map.insert(key_text(key), encode_native(value)?);
            }
            Json::Object(map)
        }
        Value::Bean(bean) => {
            let mut map = Map::new();
            map.insert(CLASS_KEY.to_string(), Json::String(bean.type_name.clone()));
            for (name, value) in &bean.fields {
                map.insert(name.clone(), encode_native(value)?);
            }
            Json::Object(map)
        }
        Value::Optional(Some(value)) => encode_native(value)?,
        Value::Object(_) => {
            return Err(Error::type_conversion(value.clone(), "embeddable JSON value"))
        }
    })
}

fn number(text: &str, value: &Value) -> Result<Json> {
    text.parse::<Number>()
        .map(Json::Number)
        .map_err(|_| Error::type_conversion(value.clone(), "JSON number"))
}

/// Text of a map key. Documents only have string keys.
pub(crate) fn key_text(key: &Value) -> String {
    match key {
        Value::String(text) => text.clone(),
        key => key.to_string(),
    }
}

/// Decodes a JSON scalar into `ty`, converting between numbers, strings and
/// booleans where the conversion is lossless.
pub(crate) fn decode_scalar(json: &Json, ty: &Type, key: &str) -> Result<Value> {
    let value = match (ty, json) {
        (_, Json::Null) => Value::Null,
        (Type::Bool, Json::Bool(v)) => Value::Bool(*v),
        (Type::Bool, Json::String(v)) => Value::Bool(v.parse().map_err(|_| mismatch(key, "boolean", json))?),
        (Type::I8, _) => Value::I8(integer(json, key)?.try_into().map_err(|_| out_of_range(json, "i8"))?),
        (Type::I16, _) => Value::I16(integer(json, key)?.try_into().map_err(|_| out_of_range(json, "i16"))?),
        (Type::I32, _) => Value::I32(integer(json, key)?.try_into().map_err(|_| out_of_range(json, "i32"))?),
        (Type::I64, _) => Value::I64(integer(json, key)?),
        (Type::F32, _) => Value::F32(float(json, key)? as f32),
        (Type::F64, _) => Value::F64(float(json, key)?),
        (Type::Char, Json::String(v)) => match v.chars().next() {
            Some(ch) => Value::Char(ch),
            None => Value::Null,
        },
        (Type::String, Json::String(v)) => Value::String(v.clone()),
        (Type::String, Json::Number(v)) => Value::String(v.to_string()),
        (Type::String, Json::Bool(v)) => Value::String(v.to_string()),
        (Type::Uuid, Json::String(v)) => Value::Uuid(v.parse()?),
        (Type::BigDecimal, Json::Number(v)) => Value::BigDecimal(v.to_string().parse::<BigDecimal>()?),
        (Type::BigDecimal, Json::String(v)) => Value::BigDecimal(v.parse::<BigDecimal>()?),
        (Type::BigInt, Json::Number(v)) => Value::BigInt(big_int(&v.to_string(), json)?),
        (Type::BigInt, Json::String(v)) => Value::BigInt(big_int(v, json)?),
        (Type::Enum(ty), json) => decode_enum(json, ty, key)?,
        (ty, json) => return Err(mismatch(key, &ty.to_string(), json)),
    };

    Ok(value)
}

fn integer(json: &Json, key: &str) -> Result<i64> {
    match json {
        Json::Number(n) => n.as_i64().ok_or_else(|| out_of_range(json, "i64")),
        Json::String(text) => Ok(text.trim().parse::<i64>()?),
        json => Err(mismatch(key, "integer", json)),
    }
}

fn float(json: &Json, key: &str) -> Result<f64> {
    match json {
        Json::Number(n) => n.as_f64().ok_or_else(|| mismatch(key, "number", json)),
        Json::String(text) => Ok(text.trim().parse::<f64>()?),
        json => Err(mismatch(key, "number", json)),
    }
}

fn big_int(text: &str, json: &Json) -> Result<BigInt> {
    text.trim()
        .parse::<BigInt>()
        .map_err(|_| out_of_range(json, "bigint"))
}

fn out_of_range(json: &Json, ty: &str) -> Error {
    Error::type_conversion(Value::String(json.to_string()), ty)
}

/// Reads a converter column typed by its declared storage kind.
pub(crate) fn decode_kind(json: &Json, kind: StorageKind, key: &str) -> Result<Value> {
    match kind {
        StorageKind::Bool => decode_scalar(json, &Type::Bool, key),
        StorageKind::Int => decode_scalar(json, &Type::I32, key),
        StorageKind::Long => decode_scalar(json, &Type::I64, key),
        StorageKind::Double => decode_scalar(json, &Type::F64, key),
        StorageKind::String => decode_scalar(json, &Type::String, key),
        StorageKind::Object => Ok(untyped(json)),
    }
}

/// Converts a JSON value without type information.
pub(crate) fn untyped(json: &Json) -> Value {
    match json {
        Json::Null => Value::Null,
        Json::Bool(v) => Value::Bool(*v),
        Json::Number(n) => match n.as_i64() {
            Some(v) => Value::I64(v),
            None => n
                .to_string()
                .parse::<BigDecimal>()
                .map(Value::BigDecimal)
                .unwrap_or_else(|_| Value::F64(n.as_f64().unwrap_or_default())),
        },
        Json::String(v) => Value::String(v.clone()),
        Json::Array(items) => Value::List(items.iter().map(untyped).collect()),
        Json::Object(map) => Value::Map(
            map.iter()
                .map(|(key, value)| (Value::String(key.clone()), untyped(value)))
                .collect(),
        ),
    }
}

/// Decodes a JSON value of any non-relation type. Nested documents found
/// where a collection element, map value or bean is expected go through
/// the reconstruction table.
pub(crate) fn decode_value(
    json: &Json,
    ty: &Type,
    key: &str,
    reconstructors: &Reconstructors,
    schema: &app::Schema,
) -> Result<Value> {
    match (ty, json) {
        (_, Json::Null) => Ok(Value::Null),
        (Type::List(elem) | Type::Array(elem), Json::Array(items)) => items
            .iter()
            .map(|item| decode_element(item, elem, key, reconstructors, schema))
            .collect::<Result<Vec<_>>>()
            .map(Value::List),
        (Type::Map(key_ty, value_ty), Json::Object(map)) => map
            .iter()
            .map(|(entry_key, entry)| {
                Ok((
                    decode_scalar(&Json::String(entry_key.clone()), key_ty, key)?,
                    decode_element(entry, value_ty, key, reconstructors, schema)?,
                ))
            })
            .collect::<Result<Vec<_>>>()
            .map(Value::Map),
        (Type::Bean(_), Json::Object(map)) => {
            let doc = Document::from(map.clone());
            Ok(reconstructors.reconstruct(&doc, Some(ty), schema))
        }
        (Type::List(_) | Type::Array(_) | Type::Map(..) | Type::Bean(_), json) => Err(
            Error::malformed_document(key, format!("expected {ty}, found {}", kind(json))),
        ),
        (ty, json) => decode_scalar(json, ty, key),
    }
}

fn decode_element(
    json: &Json,
    ty: &Type,
    key: &str,
    reconstructors: &Reconstructors,
    schema: &app::Schema,
) -> Result<Value> {
    match json {
        Json::Object(map) if !matches!(ty, Type::Map(..)) => {
            let doc = Document::from(map.clone());
            Ok(reconstructors.reconstruct(&doc, Some(ty), schema))
        }
        json => decode_value(json, ty, key, reconstructors, schema),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn color() -> TypeEnum {
        TypeEnum::new("Color", ["Red", "Green", "Blue"])
    }

    #[test]
    fn enum_by_ordinal_and_name() {
        let green = ValueEnum::new(1, "Green");

        assert_eq!(encode_enum(&green, true), json!(1));
        assert_eq!(encode_enum(&green, false), json!("Green"));
        assert_eq!(decode_enum(&json!(1), &color(), "c").unwrap(), Value::Enum(green.clone()));
        assert_eq!(decode_enum(&json!("Green"), &color(), "c").unwrap(), Value::Enum(green));
    }

    #[test]
    fn unknown_enum_constant() {
        let err = decode_enum(&json!("Purple"), &color(), "c").unwrap_err();
        assert!(err.is_malformed_document());

        let err = decode_enum(&json!(7), &color(), "c").unwrap_err();
        assert!(err.is_malformed_document());
    }

    #[test]
    fn big_numbers_keep_precision() {
        let value: BigDecimal = "12345678901234567890.000000000123".parse().unwrap();
        let json = encode_native(&Value::BigDecimal(value.clone())).unwrap();

        assert_eq!(json.to_string(), "12345678901234567890.000000000123");
        assert_eq!(
            decode_scalar(&json, &Type::BigDecimal, "n").unwrap(),
            Value::BigDecimal(value)
        );
    }

    #[test]
    fn integers_out_of_range() {
        let err = decode_scalar(&json!(300), &Type::I8, "n").unwrap_err();
        assert!(err.is_type_conversion());
        assert_eq!(decode_scalar(&json!("42"), &Type::I32, "n").unwrap(), Value::I32(42));
    }

    #[test]
    fn beans_are_stamped_with_their_type() {
        let bean = jsonstore_core::Bean::new("geo.Point").with("x", 1).with("y", 2);
        assert_eq!(
            encode_native(&Value::Bean(bean)).unwrap(),
            json!({ "class": "geo.Point", "x": 1, "y": 2 })
        );
    }

    #[test]
    fn list_of_scalars() {
        let schema = app::Schema::default();
        let value = decode_value(
            &json!([1, 2, 3]),
            &Type::list(Type::I16),
            "n",
            &Reconstructors::default(),
            &schema,
        )
        .unwrap();

        assert_eq!(value, Value::List(vec![Value::I16(1), Value::I16(2), Value::I16(3)]));
    }
}
