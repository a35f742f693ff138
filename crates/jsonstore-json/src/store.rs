use crate::{codec, Context, Document};
use jsonstore_core::{
    schema::{
        app::{Field, FieldTy, MapSide, Model, ModelId, Relation},
        mapping::{FieldPath, Member, Role},
    },
    Error, FieldConsumer, ObjectRef, Result, Type, Value,
};
use serde_json::{Map, Value as Json};

/// Writes an object's fields into a document.
///
/// One instance serves one object for one operation. Embedded objects are
/// written by child instances sharing the context and, for the flat layout,
/// the document.
pub struct StoreFields<'a> {
    cx: Context<'a>,

    /// Object whose fields are written
    object: &'a ObjectRef,

    /// Model of `object`
    model: &'a Model,

    /// Root model whose mapping names the columns
    root: ModelId,

    /// Embedding path of `object`. Empty for the root object.
    path: FieldPath,

    doc: &'a mut Document,
}

impl<'a> StoreFields<'a> {
    /// Creates a serializer for a root object.
    pub fn new(cx: Context<'a>, object: &'a ObjectRef, doc: &'a mut Document) -> StoreFields<'a> {
        let model = cx.schema.model(object.model_id());
        StoreFields {
            cx,
            object,
            model,
            root: model.id,
            path: FieldPath::root(),
            doc,
        }
    }

    /// Writes the given fields, in order.
    pub fn store(&mut self, fields: &[usize]) -> Result<()> {
        let object = self.object;
        let model = self.model;
        object.provide_fields(model, fields, self)
    }

    fn field(&self, index: usize) -> &'a Field {
        &self.model.fields[index]
    }

    fn member(&self, field: &Field) -> Result<&'a Member> {
        self.cx
            .schema
            .mapping_for(self.root)
            .columns_for_embedded(&self.path.join(field.id))
    }

    /// Writes a natively typed primitive under the field's column.
    fn put(&mut self, index: usize, json: Json) -> Result<()> {
        let field = self.field(index);
        if !field.is_storable() {
            return Ok(());
        }

        let member = self.member(field)?;
        self.doc.put(member.column_name(), json);
        Ok(())
    }

    fn store_field(&mut self, field: &'a Field, value: &Value) -> Result<()> {
        let member = self.member(field)?;

        match member.role {
            Role::OwnerBackReference => return self.repair_owner(field, value),
            Role::Embedded { nested } => return self.store_embedded(field, member, value, nested),
            Role::Normal => {}
        }

        let value = value.unwrap_optional();

        if let Some(converter) = &member.converter {
            return self.store_converted(field, member, converter, value);
        }

        match &field.ty {
            FieldTy::Primitive(primitive) => {
                let json = self.encode(field, member, &primitive.ty, value)?;
                self.doc.put(member.column_name(), json);
                Ok(())
            }
            FieldTy::Relation(relation) => self.store_relation(field, member, relation, value),
            FieldTy::Embedded(_) => Err(Error::invalid_schema(format!(
                "embedded field `{}` is not mapped as embedded",
                field.full_name(&self.cx.schema.app)
            ))),
        }
    }

    fn store_converted(
        &mut self,
        field: &Field,
        member: &Member,
        converter: &str,
        value: &Value,
    ) -> Result<()> {
        let Some(converter) = self.cx.converters.get(converter) else {
            return Err(Error::invalid_schema(format!(
                "converter `{converter}` of `{}` is not registered",
                field.full_name(&self.cx.schema.app)
            )));
        };

        // A null value is written once, under the first column
        if value.is_null() {
            self.doc.put_null(member.column_name());
            return Ok(());
        }

        let values = converter.to_datastore(value)?;
        if values.len() != member.columns.len() {
            return Err(Error::type_conversion(
                Value::List(values),
                format!("{} columns of `{}`", member.columns.len(), field.full_name(&self.cx.schema.app)),
            ));
        }

        for (column, value) in member.columns.iter().zip(&values) {
            self.doc.put(&column.name, codec::encode_native(value)?);
        }

        Ok(())
    }

    /// Encodes a non-relation value, dispatching on the declared type.
    fn encode(&self, field: &Field, member: &Member, ty: &Type, value: &Value) -> Result<Json> {
        let numeric = member.is_numeric();

        match (ty, value) {
            (_, Value::Null) => Ok(Json::Null),
            (_, Value::Enum(value)) => Ok(codec::encode_enum(value, numeric)),
            (
                Type::Bool
                | Type::I8
                | Type::I16
                | Type::I32
                | Type::I64
                | Type::F32
                | Type::F64
                | Type::String
                | Type::BigDecimal
                | Type::BigInt
                | Type::List(_)
                | Type::Array(_)
                | Type::Map(..),
                value,
            ) => codec::encode_native(value),
            (ty, value) => {
                if let Some(converter) = self.cx.converters.fallback(ty, numeric) {
                    let stored = converter.to_datastore(value)?;
                    return codec::encode_native(stored.first().unwrap_or(&Value::Null));
                }

                if let Value::Bean(bean) = value {
                    tracing::debug!(
                        field = %field.full_name(&self.cx.schema.app),
                        type_name = %bean.type_name,
                        "no converter for value type; storing a lossy nested document"
                    );
                    return codec::encode_native(value);
                }

                Err(Error::unsupported_feature(format!(
                    "field `{}` of type {} has no document representation",
                    field.full_name(&self.cx.schema.app),
                    field.declared_ty(&self.cx.schema.app),
                )))
            }
        }
    }

    fn store_relation(
        &mut self,
        field: &Field,
        member: &Member,
        relation: &Relation,
        value: &Value,
    ) -> Result<()> {
        let json = match (relation, value) {
            (_, Value::Null) => Json::Null,
            (Relation::One(_), Value::Object(related)) => self.reference(field, related)?,
            (Relation::Collection(_) | Relation::Array(_), Value::List(items)) => Json::Array(
                items
                    .iter()
                    .map(|item| self.element(field, item))
                    .collect::<Result<_>>()?,
            ),
            (Relation::Map { key, value: value_side }, Value::Map(entries)) => {
                let mut map = Map::new();
                for (entry_key, entry_value) in entries {
                    let entry_key = match self.side(field, key, entry_key)? {
                        Json::String(text) => text,
                        json => json.to_string(),
                    };
                    map.insert(entry_key, self.side(field, value_side, entry_value)?);
                }
                Json::Object(map)
            }
            (_, value) => {
                return Err(Error::type_conversion(
                    value.clone(),
                    field.declared_ty(&self.cx.schema.app),
                ))
            }
        };

        self.doc.put(member.column_name(), json);
        Ok(())
    }

    /// Encodes one element of a multi-valued relation: persistent objects
    /// become identity strings, plain values are written natively.
    fn side(&self, field: &Field, side: &MapSide, value: &Value) -> Result<Json> {
        match (side, value.unwrap_optional()) {
            (MapSide::Value(_), value) if !matches!(value, Value::Object(_)) => {
                codec::encode_native(value)
            }
            _ => self.element(field, value),
        }
    }

    fn element(&self, field: &Field, value: &Value) -> Result<Json> {
        match value.unwrap_optional() {
            Value::Object(related) => self.reference(field, related),
            Value::Null => Ok(Json::Null),
            value => Err(Error::type_conversion(value.clone(), "persistent object")),
        }
    }

    /// Persists a related object through the orchestrator and returns its
    /// externalized identity.
    fn reference(&self, field: &Field, related: &ObjectRef) -> Result<Json> {
        let managed = self.cx.orchestrator.persist(related, self.object, field.id)?;
        let identity = self.cx.orchestrator.identity(&managed)?;
        let model = self.cx.schema.model(managed.model_id());
        let text = self.cx.identities.externalize(model, &identity)?;
        Ok(Json::String(text))
    }

    fn store_embedded(
        &mut self,
        field: &Field,
        member: &Member,
        value: &Value,
        nested: bool,
    ) -> Result<()> {
        let embedded = field.ty.expect_embedded();
        let target = self.cx.schema.model(embedded.target);
        let path = self.path.join(field.id);

        let embedded_object = match value.unwrap_optional() {
            Value::Object(object) => object,
            Value::Null if nested => {
                self.doc.put_null(member.column_name());
                return Ok(());
            }
            Value::Null => {
                self.store_flat_nulls(target, &path)?;
                return Ok(());
            }
            value => {
                return Err(Error::type_conversion(
                    value.clone(),
                    field.declared_ty(&self.cx.schema.app),
                ))
            }
        };

        let managed = self
            .cx
            .orchestrator
            .embedded(embedded_object, self.object, field.id)?;
        let fields = target.all_field_indices();

        if nested {
            tracing::warn!(
                field = %field.full_name(&self.cx.schema.app),
                "field is embedded as a nested document; this layout is experimental"
            );

            let mut sub = Document::new();
            StoreFields {
                cx: self.cx,
                object: &managed,
                model: target,
                root: self.root,
                path,
                doc: &mut sub,
            }
            .store(&fields)?;
            self.doc.put(member.column_name(), sub);
        } else {
            StoreFields {
                cx: self.cx,
                object: &managed,
                model: target,
                root: self.root,
                path,
                doc: &mut *self.doc,
            }
            .store(&fields)?;
        }

        Ok(())
    }

    /// Writes null to every column of a flat embedded object that is absent.
    fn store_flat_nulls(&mut self, model: &Model, path: &FieldPath) -> Result<()> {
        let mapping = self.cx.schema.mapping_for(self.root);

        for field in &model.fields {
            if !field.is_storable() {
                continue;
            }

            let path = path.join(field.id);
            let member = mapping.columns_for_embedded(&path)?;

            match member.role {
                Role::Embedded { nested: false } => {
                    let target = self.cx.schema.model(field.ty.expect_embedded().target);
                    self.store_flat_nulls(target, &path)?;
                }
                Role::OwnerBackReference => {}
                Role::Normal | Role::Embedded { nested: true } => {
                    for column in &member.columns {
                        self.doc.put_null(&column.name);
                    }
                }
            }
        }

        Ok(())
    }

    /// The owner back-reference is never stored. The in-memory value is
    /// repaired when it does not point at the enclosing object.
    fn repair_owner(&mut self, field: &Field, value: &Value) -> Result<()> {
        let Some((owner, _)) = self.object.owner() else {
            return Ok(());
        };

        let expected = Value::Object(owner);
        if value.unwrap_optional() != &expected {
            let expected = if field.optional {
                expected.into_optional()
            } else {
                expected
            };
            self.object.set(field.id.index, expected);
        }

        Ok(())
    }
}

impl FieldConsumer for StoreFields<'_> {
    fn store_bool(&mut self, field: usize, value: bool) -> Result<()> {
        self.put(field, Json::Bool(value))
    }

    fn store_i8(&mut self, field: usize, value: i8) -> Result<()> {
        self.put(field, Json::from(value))
    }

    fn store_i16(&mut self, field: usize, value: i16) -> Result<()> {
        self.put(field, Json::from(value))
    }

    fn store_i32(&mut self, field: usize, value: i32) -> Result<()> {
        self.put(field, Json::from(value))
    }

    fn store_i64(&mut self, field: usize, value: i64) -> Result<()> {
        self.put(field, Json::from(value))
    }

    fn store_f32(&mut self, field: usize, value: f32) -> Result<()> {
        let json = codec::encode_native(&Value::F32(value))?;
        self.put(field, json)
    }

    fn store_f64(&mut self, field: usize, value: f64) -> Result<()> {
        let json = codec::encode_native(&Value::F64(value))?;
        self.put(field, json)
    }

    fn store_char(&mut self, field: usize, value: char) -> Result<()> {
        self.put(field, Json::String(value.to_string()))
    }

    fn store_string(&mut self, field: usize, value: Option<&str>) -> Result<()> {
        // A null string is written as an explicit null, never omitted
        self.put(field, value.map(Json::from).unwrap_or(Json::Null))
    }

    fn store_object(&mut self, field: usize, value: &Value) -> Result<()> {
        let field = self.field(field);
        if !field.is_storable() {
            return Ok(());
        }

        self.store_field(field, value)
    }
}
