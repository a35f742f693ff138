//! Externalized string form of persistent identities.
//!
//! Two forms exist:
//!
//! * plain: the key alone, for example `"7"`. Composite application keys use
//!   their JSON array text, for example `[7,"eu"]`.
//! * qualified: the key prefixed by the fully-qualified type name and `:`,
//!   for example `"com.acme.Person:7"`.
//!
//! Both are accepted when resolving, whichever form the codec writes.

use crate::codec;
use jsonstore_core::{
    schema::app::{Model, ModelId, Schema},
    Error, Identity, Result, Value,
};
use serde_json::Value as Json;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdentityFormat {
    /// The key alone
    #[default]
    Plain,

    /// `<type name>:<key>`
    Qualified,
}

#[derive(Debug, Clone, Default)]
pub struct IdentityCodec {
    format: IdentityFormat,
}

impl IdentityCodec {
    pub fn new(format: IdentityFormat) -> IdentityCodec {
        IdentityCodec { format }
    }

    /// Converts the identity of an object of `model` to its string form.
    pub fn externalize(&self, model: &Model, identity: &Identity) -> Result<String> {
        let key = match identity {
            Identity::Datastore(key) => key.clone(),
            Identity::Application(values) => match &values[..] {
                [Value::String(key)] => key.clone(),
                [value] => value.to_string(),
                values => {
                    let items = values
                        .iter()
                        .map(codec::encode_native)
                        .collect::<Result<Vec<_>>>()?;
                    Json::Array(items).to_string()
                }
            },
        };

        Ok(match self.format {
            IdentityFormat::Plain => key,
            IdentityFormat::Qualified => format!("{}:{key}", model.name),
        })
    }

    /// Resolves an identity string referencing an object of `target`.
    ///
    /// The qualified form is detected by a `:` whose prefix names a model of
    /// the schema. Anything else is read as a plain key.
    pub fn resolve(&self, schema: &Schema, target: &Model, text: &str) -> Result<(ModelId, Identity)> {
        let (model, key) = match text.split_once(':') {
            Some((prefix, key)) if !prefix.is_empty() => match schema.model_by_name(prefix) {
                Some(model) => (model, key),
                None => (target, text),
            },
            _ => (target, text),
        };

        let identity = if model.uses_datastore_identity() {
            Identity::Datastore(key.to_string())
        } else {
            Identity::Application(parse_key(model, key)?)
        };

        Ok((model.id, identity))
    }
}

fn parse_key(model: &Model, key: &str) -> Result<Vec<Value>> {
    let fields: Vec<_> = model.primary_key_fields().collect();

    let parts = match &fields[..] {
        [] => {
            return Err(Error::invalid_schema(format!(
                "`{}` has no identity to resolve",
                model.name
            )))
        }
        [_] => vec![Json::String(key.to_string())],
        fields => match serde_json::from_str::<Json>(key) {
            Ok(Json::Array(items)) if items.len() == fields.len() => items,
            _ => {
                return Err(Error::malformed_document(
                    key,
                    format!(
                        "expected a composite key of {} values for `{}`",
                        fields.len(),
                        model.name
                    ),
                ))
            }
        },
    };

    fields
        .iter()
        .zip(&parts)
        .map(|(field, part)| {
            let ty = &field.ty.expect_primitive().ty;
            codec::decode_scalar(part, ty, &field.name.app_name)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonstore_core::{Converters, Type};
    use pretty_assertions::assert_eq;

    fn schema() -> jsonstore_core::Schema {
        let mut builder = jsonstore_core::Schema::builder();
        builder.root("com.acme.Person", |m| {
            m.key("id", Type::I64);
        });
        builder.root("com.acme.Shard", |m| {
            m.key("id", Type::I32);
            m.key("region", Type::String);
        });
        builder.root("com.acme.Note", |_| {});
        builder.build(&Converters::new()).unwrap()
    }

    #[test]
    fn plain_keys() {
        let schema = schema();
        let person = schema.model(ModelId(0));
        let codec = IdentityCodec::default();

        let text = codec
            .externalize(person, &Identity::Application(vec![Value::I64(7)]))
            .unwrap();
        assert_eq!(text, "7");

        let (model, identity) = codec.resolve(&schema.app, person, &text).unwrap();
        assert_eq!(model, person.id);
        assert_eq!(identity, Identity::Application(vec![Value::I64(7)]));
    }

    #[test]
    fn qualified_keys_resolve_with_either_codec() {
        let schema = schema();
        let person = schema.model(ModelId(0));
        let qualified = IdentityCodec::new(IdentityFormat::Qualified);

        let text = qualified
            .externalize(person, &Identity::Application(vec![Value::I64(9)]))
            .unwrap();
        assert_eq!(text, "com.acme.Person:9");

        let (_, identity) = IdentityCodec::default()
            .resolve(&schema.app, person, &text)
            .unwrap();
        assert_eq!(identity, Identity::Application(vec![Value::I64(9)]));
    }

    #[test]
    fn colon_without_model_prefix_is_a_plain_key() {
        let schema = schema();
        let note = schema.model(ModelId(2));

        let (_, identity) = IdentityCodec::default()
            .resolve(&schema.app, note, "urn:abc")
            .unwrap();
        assert_eq!(identity, Identity::Datastore("urn:abc".to_string()));
    }

    #[test]
    fn composite_keys() {
        let schema = schema();
        let shard = schema.model(ModelId(1));
        let codec = IdentityCodec::default();
        let identity = Identity::Application(vec![Value::I32(3), Value::from("eu")]);

        let text = codec.externalize(shard, &identity).unwrap();
        assert_eq!(text, r#"[3,"eu"]"#);
        assert_eq!(codec.resolve(&schema.app, shard, &text).unwrap().1, identity);

        let err = codec.resolve(&schema.app, shard, "3").unwrap_err();
        assert!(err.is_malformed_document());
    }
}
