use crate::{codec, document::mismatch, Context, Document};
use jsonstore_core::{
    schema::{
        app::{Field, FieldTy, MapSide, Model, ModelId, Relation},
        mapping::{FieldPath, Member, Role},
    },
    Error, FieldSupplier, ObjectRef, Result, Type, Value,
};
use serde_json::Value as Json;
use std::cmp::Ordering;

/// Reads an object's fields from a document.
///
/// Mirrors [`StoreFields`](crate::StoreFields). Primitive columns that are
/// null read as the type's zero value. References to objects that no longer
/// exist read as null, and dangling elements are dropped from multi-valued
/// relations with the owning field marked dirty.
pub struct FetchFields<'a> {
    cx: Context<'a>,

    /// Object receiving the fields
    object: &'a ObjectRef,

    /// Model of `object`
    model: &'a Model,

    /// Root model whose mapping names the columns
    root: ModelId,

    /// Embedding path of `object`. Empty for the root object.
    path: FieldPath,

    doc: &'a Document,
}

macro_rules! fetch_typed {
    ($self:ident, $field:ident, $ty:ident, $variant:ident, $name:literal) => {
        match $self.primitive($field, &Type::$ty)? {
            Value::$variant(v) => Ok(v),
            value => Err(Error::type_conversion(value, $name)),
        }
    };
}

/// Outcome of resolving one identity string.
enum Resolved {
    Found(ObjectRef),
    Dangling,
}

impl<'a> FetchFields<'a> {
    /// Creates a deserializer for a root object.
    pub fn new(cx: Context<'a>, object: &'a ObjectRef, doc: &'a Document) -> FetchFields<'a> {
        let model = cx.schema.model(object.model_id());
        FetchFields {
            cx,
            object,
            model,
            root: model.id,
            path: FieldPath::root(),
            doc,
        }
    }

    /// Reads the given fields, in order, into the object.
    pub fn fetch(&mut self, fields: &[usize]) -> Result<()> {
        let object = self.object;
        let model = self.model;
        object.replace_fields(model, fields, self)
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

    /// Reads a primitive column. Non-persistent fields keep their current
    /// value and null columns read as zero.
    fn primitive(&self, index: usize, ty: &Type) -> Result<Value> {
        let field = self.field(index);
        if !field.is_storable() {
            return Ok(self.object.get(index));
        }

        let member = self.member(field)?;
        let key = member.column_name();
        match self.doc.value(key) {
            Some(Json::Null) | None => Ok(Value::zero(ty)),
            Some(json) => codec::decode_scalar(json, ty, key),
        }
    }

    fn fetch_field(&self, field: &Field) -> Result<Value> {
        let member = self.member(field)?;

        let value = match member.role {
            Role::OwnerBackReference => self.owner_value(),
            Role::Embedded { nested } => self.fetch_embedded(field, member, nested)?,
            Role::Normal => match (&member.converter, &field.ty) {
                (Some(converter), _) => self.fetch_converted(field, member, converter)?,
                (None, FieldTy::Primitive(primitive)) => {
                    self.fetch_value(field, member, &primitive.ty)?
                }
                (None, FieldTy::Relation(relation)) => self.fetch_relation(field, member, relation)?,
                (None, FieldTy::Embedded(_)) => {
                    return Err(Error::invalid_schema(format!(
                        "embedded field `{}` is not mapped as embedded",
                        field.full_name(&self.cx.schema.app)
                    )))
                }
            },
        };

        Ok(if field.optional {
            value.into_optional()
        } else {
            value
        })
    }

    fn owner_value(&self) -> Value {
        match self.object.owner() {
            Some((owner, _)) => Value::Object(owner),
            None => Value::Null,
        }
    }

    fn fetch_converted(&self, field: &Field, member: &Member, converter: &str) -> Result<Value> {
        let Some(converter) = self.cx.converters.get(converter) else {
            return Err(Error::invalid_schema(format!(
                "converter `{converter}` of `{}` is not registered",
                field.full_name(&self.cx.schema.app)
            )));
        };

        let kinds = converter.column_types();

        if member.columns.len() > 1 {
            if member.columns.iter().all(|column| self.doc.is_null(&column.name)) {
                return Ok(Value::Null);
            }

            let values = member
                .columns
                .iter()
                .zip(kinds)
                .map(|(column, kind)| match self.doc.value(&column.name) {
                    Some(json) => codec::decode_kind(json, *kind, &column.name),
                    None => Ok(Value::Null),
                })
                .collect::<Result<Vec<_>>>()?;
            return converter.to_member(values);
        }

        let key = member.column_name();
        match self.doc.value(key) {
            Some(json) => {
                let value = codec::decode_kind(json, converter.datastore_type(), key)?;
                converter.to_member(vec![value])
            }
            None => Ok(Value::Null),
        }
    }

    /// Decodes a non-relation value, dispatching on the declared type.
    fn fetch_value(&self, field: &Field, member: &Member, ty: &Type) -> Result<Value> {
        let key = member.column_name();
        let Some(json) = self.doc.value(key) else {
            return Ok(Value::Null);
        };

        match ty {
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
            | Type::Enum(_) => codec::decode_scalar(json, ty, key),
            Type::List(_) | Type::Array(_) | Type::Map(..) => {
                codec::decode_value(json, ty, key, self.cx.reconstructors, &self.cx.schema.app)
            }
            Type::Char | Type::Uuid | Type::Bean(_) => {
                if let Some(converter) = self.cx.converters.fallback(ty, member.is_numeric()) {
                    let value = codec::decode_kind(json, converter.datastore_type(), key)?;
                    return converter.to_member(vec![value]);
                }

                match json {
                    Json::Object(map) => Ok(self.cx.reconstructors.reconstruct(
                        &Document::from(map.clone()),
                        Some(ty),
                        &self.cx.schema.app,
                    )),
                    json if !matches!(ty, Type::Bean(_)) => codec::decode_scalar(json, ty, key),
                    _ => Err(Error::unsupported_feature(format!(
                        "field `{}` of type {} has no document representation",
                        field.full_name(&self.cx.schema.app),
                        field.declared_ty(&self.cx.schema.app),
                    ))),
                }
            }
        }
    }

    fn fetch_relation(&self, field: &Field, member: &Member, relation: &Relation) -> Result<Value> {
        let key = member.column_name();
        let Some(json) = self.doc.value(key) else {
            return Ok(Value::Null);
        };

        match relation {
            Relation::One(target) => match self.resolve(field, *target, json, key)? {
                Resolved::Found(object) => Ok(Value::Object(object)),
                Resolved::Dangling => Ok(Value::Null),
            },
            Relation::Collection(target) | Relation::Array(target) => {
                let Json::Array(items) = json else {
                    return Err(mismatch(key, "list of identities", json));
                };

                let mut elements = Vec::with_capacity(items.len());
                let mut dropped = false;

                for item in items {
                    // A stored null element stays in place
                    if item.is_null() {
                        elements.push(Value::Null);
                        continue;
                    }

                    match self.resolve(field, *target, item, key)? {
                        Resolved::Found(object) => elements.push(Value::Object(object)),
                        Resolved::Dangling => dropped = true,
                    }
                }

                if dropped {
                    self.cx.orchestrator.mark_dirty(self.object, field.id.index);
                }

                self.apply_ordering(field, *target, &mut elements);
                Ok(Value::List(elements))
            }
            Relation::Map { key: key_side, value: value_side } => {
                let Json::Object(map) = json else {
                    return Err(mismatch(key, "object", json));
                };

                let mut entries = Vec::with_capacity(map.len());
                let mut dropped = false;

                for (entry_key, entry_value) in map {
                    let entry_key = self.side(field, key_side, &Json::String(entry_key.clone()), key)?;
                    let entry_value = self.side(field, value_side, entry_value, key)?;

                    match (entry_key, entry_value) {
                        (Some(entry_key), Some(entry_value)) => entries.push((entry_key, entry_value)),
                        _ => dropped = true,
                    }
                }

                if dropped {
                    self.cx.orchestrator.mark_dirty(self.object, field.id.index);
                }

                Ok(Value::Map(entries))
            }
        }
    }

    /// Decodes one side of a map entry. `None` means a dangling reference.
    fn side(&self, field: &Field, side: &MapSide, json: &Json, key: &str) -> Result<Option<Value>> {
        match side {
            MapSide::Model(_) if json.is_null() => Ok(Some(Value::Null)),
            MapSide::Model(target) => Ok(match self.resolve(field, *target, json, key)? {
                Resolved::Found(object) => Some(Value::Object(object)),
                Resolved::Dangling => None,
            }),
            MapSide::Value(ty) => codec::decode_value(
                json,
                ty,
                key,
                self.cx.reconstructors,
                &self.cx.schema.app,
            )
            .map(Some),
        }
    }

    /// Resolves an identity string to a live object.
    fn resolve(&self, field: &Field, target: ModelId, json: &Json, key: &str) -> Result<Resolved> {
        let Json::String(text) = json else {
            return Err(mismatch(key, "identity string", json));
        };

        let target = self.cx.schema.model(target);
        let (model, identity) = self
            .cx
            .identities
            .resolve(&self.cx.schema.app, target, text)?;

        match self.cx.orchestrator.find(model, &identity) {
            Ok(Some(object)) => Ok(Resolved::Found(object)),
            Ok(None) => {
                tracing::warn!(
                    field = %field.full_name(&self.cx.schema.app),
                    identity = %text,
                    "field references an object that no longer exists"
                );
                Ok(Resolved::Dangling)
            }
            Err(err) if err.is_record_not_found() => {
                tracing::warn!(
                    field = %field.full_name(&self.cx.schema.app),
                    identity = %text,
                    "field references an object that no longer exists"
                );
                Ok(Resolved::Dangling)
            }
            Err(err) => Err(err),
        }
    }

    /// Reorders a collection to match the field's ordering clause, unless the
    /// clause only names primary key fields. Null elements sort first.
    fn apply_ordering(&self, field: &Field, target: ModelId, elements: &mut [Value]) {
        let Some(order_by) = &field.order_by else {
            return;
        };
        let Some(items) = order_by.resolve(self.cx.schema.model(target)) else {
            return;
        };

        elements.sort_by(|a, b| {
            let (a, b) = match (a.as_object(), b.as_object()) {
                (Some(a), Some(b)) => (a, b),
                (None, Some(_)) => return Ordering::Less,
                (Some(_), None) => return Ordering::Greater,
                (None, None) => return Ordering::Equal,
            };

            items
                .iter()
                .map(|(field, descending)| {
                    let ordering = a.get(field.id.index).cmp_scalar(&b.get(field.id.index));
                    if *descending {
                        ordering.reverse()
                    } else {
                        ordering
                    }
                })
                .find(|ordering| *ordering != Ordering::Equal)
                .unwrap_or(Ordering::Equal)
        });
    }

    fn fetch_embedded(&self, field: &Field, member: &Member, nested: bool) -> Result<Value> {
        let embedded = field.ty.expect_embedded();
        let target = self.cx.schema.model(embedded.target);
        let path = self.path.join(field.id);
        let fields = target.all_field_indices();

        if nested {
            tracing::warn!(
                field = %field.full_name(&self.cx.schema.app),
                "field is embedded as a nested document; this layout is experimental"
            );

            let key = member.column_name();
            if self.doc.is_null(key) {
                return Ok(Value::Null);
            }

            let sub = self.doc.get_document(key)?;
            let object = self.cx.orchestrator.new_embedded(target, self.object, field.id);
            FetchFields {
                cx: self.cx,
                object: &object,
                model: target,
                root: self.root,
                path,
                doc: &sub,
            }
            .fetch(&fields)?;
            return Ok(Value::Object(object));
        }

        if field.nullable && self.flat_is_null(target, &path)? {
            return Ok(Value::Null);
        }

        let object = self.cx.orchestrator.new_embedded(target, self.object, field.id);
        FetchFields {
            cx: self.cx,
            object: &object,
            model: target,
            root: self.root,
            path,
            doc: self.doc,
        }
        .fetch(&fields)?;
        Ok(Value::Object(object))
    }

    /// Returns `true` if every column of a flat embedded object is null.
    fn flat_is_null(&self, model: &Model, path: &FieldPath) -> Result<bool> {
        let mapping = self.cx.schema.mapping_for(self.root);

        for field in &model.fields {
            if !field.is_storable() {
                continue;
            }

            let path = path.join(field.id);
            let member = mapping.columns_for_embedded(&path)?;

            let is_null = match member.role {
                Role::Embedded { nested: false } => {
                    let target = self.cx.schema.model(field.ty.expect_embedded().target);
                    self.flat_is_null(target, &path)?
                }
                Role::OwnerBackReference => true,
                Role::Normal | Role::Embedded { nested: true } => member
                    .columns
                    .iter()
                    .all(|column| self.doc.is_null(&column.name)),
            };

            if !is_null {
                return Ok(false);
            }
        }

        Ok(true)
    }
}

impl FieldSupplier for FetchFields<'_> {
    fn fetch_bool(&mut self, field: usize) -> Result<bool> {
        fetch_typed!(self, field, Bool, Bool, "bool")
    }

    fn fetch_i8(&mut self, field: usize) -> Result<i8> {
        fetch_typed!(self, field, I8, I8, "i8")
    }

    fn fetch_i16(&mut self, field: usize) -> Result<i16> {
        fetch_typed!(self, field, I16, I16, "i16")
    }

    fn fetch_i32(&mut self, field: usize) -> Result<i32> {
        fetch_typed!(self, field, I32, I32, "i32")
    }

    fn fetch_i64(&mut self, field: usize) -> Result<i64> {
        fetch_typed!(self, field, I64, I64, "i64")
    }

    fn fetch_f32(&mut self, field: usize) -> Result<f32> {
        fetch_typed!(self, field, F32, F32, "f32")
    }

    fn fetch_f64(&mut self, field: usize) -> Result<f64> {
        fetch_typed!(self, field, F64, F64, "f64")
    }

    fn fetch_char(&mut self, field: usize) -> Result<char> {
        fetch_typed!(self, field, Char, Char, "char")
    }

    fn fetch_string(&mut self, index: usize) -> Result<Option<String>> {
        let field = self.field(index);
        if !field.is_storable() {
            return Ok(self.object.get(index).as_str().map(str::to_string));
        }

        let member = self.member(field)?;
        let key = member.column_name();
        match self.doc.value(key) {
            Some(json) => match codec::decode_scalar(json, &Type::String, key)? {
                Value::String(text) => Ok(Some(text)),
                Value::Null => Ok(None),
                value => Err(Error::type_conversion(value, "string")),
            },
            None => Ok(None),
        }
    }

    fn fetch_object(&mut self, index: usize) -> Result<Value> {
        let field = self.field(index);
        if !field.is_storable() {
            return Ok(self.object.get(index));
        }

        self.fetch_field(field)
    }
}
