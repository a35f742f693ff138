use crate::schema::{app::*, db};
use crate::{Error, Result, Type};

/// Collects the fields and options of one model.
#[derive(Debug)]
pub struct ModelBuilder {
    model: Model,

    /// Version strategy and the name of the field holding it
    version: Option<(VersionStrategy, Option<String>)>,
}

/// Chained options for a field being added to a [`ModelBuilder`].
#[derive(Debug)]
pub struct FieldBuilder<'a> {
    field: &'a mut Field,
}

impl ModelBuilder {
    pub(super) fn new(id: ModelId, name: &str, root: bool) -> ModelBuilder {
        let kind = if root {
            ModelKind::Root(ModelRoot {
                identity: IdentityKind::Datastore,
                version: None,
                table_name: None,
            })
        } else {
            ModelKind::Embedded
        };

        ModelBuilder {
            model: Model {
                id,
                name: name.to_string(),
                fields: vec![],
                kind,
                url: None,
            },
            version: None,
        }
    }

    /// Adds a field.
    pub fn field(&mut self, name: &str, ty: impl Into<FieldTy>) -> FieldBuilder<'_> {
        let id = self.model.id.field(self.model.fields.len());
        self.model.fields.push(Field {
            id,
            name: FieldName::new(name),
            ty: ty.into(),
            persistence: Persistence::Persistent,
            nullable: false,
            optional: false,
            primary_key: false,
            converter: None,
            storage_ty: None,
            order_by: None,
            nested: false,
        });

        FieldBuilder {
            field: &mut self.model.fields[id.index],
        }
    }

    /// Adds a primary key field. The model then uses application identity.
    pub fn key(&mut self, name: &str, ty: Type) -> FieldBuilder<'_> {
        let index = self.model.fields.len();
        let id = self.model.id.field(index);

        if let ModelKind::Root(root) = &mut self.model.kind {
            match &mut root.identity {
                IdentityKind::Application(fields) => fields.push(id),
                identity => *identity = IdentityKind::Application(vec![id]),
            }
        }

        let builder = self.field(name, ty);
        builder.field.primary_key = true;
        builder
    }

    /// Adds an embedded field holding one object of the `target` model.
    pub fn embedded(&mut self, name: &str, target: ModelId) -> FieldBuilder<'_> {
        let builder = self.field(name, Embedded::new(target));
        builder.field.nullable = true;
        builder
    }

    /// Adds a relation field.
    pub fn relation(&mut self, name: &str, relation: Relation) -> FieldBuilder<'_> {
        let builder = self.field(name, relation);
        builder.field.nullable = true;
        builder
    }

    /// Versions the model through a surrogate column.
    pub fn version(&mut self, strategy: VersionStrategy) -> &mut Self {
        self.version = Some((strategy, None));
        self
    }

    /// Versions the model through the named field.
    pub fn version_field(&mut self, name: &str, strategy: VersionStrategy) -> &mut Self {
        self.version = Some((strategy, Some(name.to_string())));
        self
    }

    pub fn url(&mut self, url: &str) -> &mut Self {
        self.model.url = Some(url.to_string());
        self
    }

    pub fn table_name(&mut self, name: &str) -> &mut Self {
        if let ModelKind::Root(root) = &mut self.model.kind {
            root.table_name = Some(name.to_string());
        }
        self
    }

    pub(super) fn into_model(self) -> Model {
        let mut model = self.model;

        if let Some((strategy, name)) = self.version {
            // An unknown name keeps the placeholder and fails `resolve_version`
            let field = name.map(|name| {
                model
                    .field_by_name(&name)
                    .map(|field| field.id)
                    .unwrap_or_else(FieldId::placeholder)
            });

            if let ModelKind::Root(root) = &mut model.kind {
                root.version = Some(Version { strategy, field });
            }
        }

        model
    }
}

/// Checks that a field-backed version names an integral field of the model.
pub(super) fn resolve_version(model: &Model) -> Result<()> {
    let Some(Version {
        field: Some(field), ..
    }) = model.version()
    else {
        return Ok(());
    };

    if *field == FieldId::placeholder() {
        return Err(Error::invalid_schema(format!(
            "version field of `{}` does not exist",
            model.name
        )));
    }

    let field = model.field(*field);
    match &field.ty {
        FieldTy::Primitive(FieldPrimitive {
            ty: Type::I32 | Type::I64,
        }) => Ok(()),
        _ => Err(Error::invalid_schema(format!(
            "version field `{}::{}` must be an i32 or i64",
            model.name, field.name.app_name
        ))),
    }
}

impl FieldBuilder<'_> {
    pub fn nullable(self) -> Self {
        self.field.nullable = true;
        self
    }

    /// Declares the field as an optional wrapper around its type.
    pub fn optional(self) -> Self {
        self.field.optional = true;
        self.field.nullable = true;
        self
    }

    pub fn converter(self, name: &str) -> Self {
        self.field.converter = Some(name.to_string());
        self
    }

    /// Overrides the storage type of the field's column.
    pub fn storage(self, ty: db::Type) -> Self {
        self.field.storage_ty = Some(ty);
        self
    }

    pub fn storage_name(self, name: &str) -> Self {
        self.field.name.storage_name = Some(name.to_string());
        self
    }

    pub fn persistence(self, persistence: Persistence) -> Self {
        self.field.persistence = persistence;
        self
    }

    /// Adds an ordering clause to a multi-valued relation.
    pub fn order_by(self, field: &str, descending: bool) -> Self {
        self.field
            .order_by
            .get_or_insert_with(|| OrderBy { items: vec![] })
            .items
            .push(OrderByItem {
                field: field.to_string(),
                descending,
            });
        self
    }

    /// Stores an embedded field as a sub-document.
    pub fn nested(self) -> Self {
        self.field.nested = true;
        self
    }

    /// Names the field of the embedded model that refers back to the owner.
    pub fn owner(self, field: &str) -> Self {
        if let FieldTy::Embedded(embedded) = &mut self.field.ty {
            embedded.owner_field = Some(field.to_string());
        }
        self
    }

    /// Makes an embedded field hold many embedded objects.
    pub fn container(self, container: Container) -> Self {
        if let FieldTy::Embedded(embedded) = &mut self.field.ty {
            embedded.container = Some(container);
        }
        self
    }
}
