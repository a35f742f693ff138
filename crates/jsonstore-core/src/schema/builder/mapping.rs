use crate::schema::{
    app::{self, FieldTy, ModelId},
    db::{self, Column, Table},
    mapping::{self, FieldPath, Member, Role},
};
use crate::{Converters, Error, Result};
use indexmap::IndexMap;
use std::collections::HashSet;

/// Used to track state while one root model is mapped
struct BuildMapping<'a> {
    app: &'a app::Schema,

    converters: &'a Converters,

    /// Members mapped so far, keyed by embedding path
    members: IndexMap<FieldPath, Member>,

    /// Columns of each document, keyed by the path of the field holding it.
    /// The root document has the root path.
    documents: IndexMap<FieldPath, Vec<Column>>,

    /// Models currently being mapped, innermost last
    stack: Vec<ModelId>,
}

pub(super) fn build(
    app: &app::Schema,
    converters: &Converters,
    model: &app::Model,
    table_name_prefix: Option<&str>,
) -> Result<(Table, mapping::Model)> {
    let mut cx = BuildMapping {
        app,
        converters,
        members: IndexMap::new(),
        documents: IndexMap::new(),
        stack: vec![model.id],
    };

    let root_path = FieldPath::root();
    cx.documents.insert(root_path.clone(), vec![]);
    cx.map_model(model, &root_path, "", None, &root_path)?;

    let mut documents = cx.documents;
    let columns = documents.shift_remove(&root_path).unwrap_or_default();

    let root = model.expect_root();
    let mut name = root.table_name.clone().unwrap_or_else(|| model.name.clone());
    if let Some(prefix) = table_name_prefix {
        name.insert_str(0, prefix);
    }

    let table = Table {
        model: model.id,
        name,
        columns,
        datastore_id: model
            .uses_datastore_identity()
            .then(Table::datastore_id_column),
        version: root
            .version
            .as_ref()
            .filter(|version| version.field.is_none())
            .map(|_| Table::version_column()),
    };

    verify_unique_columns(model, &table)?;
    for (path, columns) in &documents {
        verify_unique_nested_columns(app, model, path, columns)?;
    }

    Ok((
        table,
        mapping::Model {
            id: model.id,
            members: cx.members,
        },
    ))
}

impl BuildMapping<'_> {
    fn map_model(
        &mut self,
        model: &app::Model,
        path: &FieldPath,
        prefix: &str,
        owner_field: Option<&str>,
        document: &FieldPath,
    ) -> Result<()> {
        for field in &model.fields {
            let path = path.join(field.id);
            let name = column_name(prefix, field.name.storage_name());

            if owner_field == Some(field.name.app_name.as_str()) {
                self.members.insert(
                    path,
                    Member {
                        columns: vec![],
                        converter: None,
                        role: Role::OwnerBackReference,
                    },
                );
                continue;
            }

            let FieldTy::Embedded(embedded) = &field.ty else {
                let columns = self.columns_for(field, &name)?;
                self.add_columns(document, &columns);
                self.members.insert(
                    path,
                    Member {
                        columns,
                        converter: field.converter.clone(),
                        role: Role::Normal,
                    },
                );
                continue;
            };

            if self.stack.contains(&embedded.target) {
                return Err(Error::invalid_schema(format!(
                    "embedded field `{}::{}` embeds its own owner",
                    model.name, field.name.app_name
                )));
            }

            let target = self.app.model(embedded.target);
            if !target.is_embedded() {
                return Err(Error::invalid_schema(format!(
                    "`{}::{}` embeds `{}`, which is not an embedded model",
                    model.name, field.name.app_name, target.name
                )));
            }

            // Nested objects restart column naming inside their sub-document
            let (columns, child_prefix, child_document) = if field.nested {
                (
                    vec![Column::new(&name, db::Type::Document)],
                    String::new(),
                    path.clone(),
                )
            } else {
                (vec![], name, document.clone())
            };

            self.add_columns(document, &columns);

            self.members.insert(
                path.clone(),
                Member {
                    columns,
                    converter: None,
                    role: Role::Embedded {
                        nested: field.nested,
                    },
                },
            );

            if embedded.is_multi_valued() {
                continue;
            }

            self.stack.push(target.id);
            self.map_model(
                target,
                &path,
                &child_prefix,
                embedded.owner_field.as_deref(),
                &child_document,
            )?;
            self.stack.pop();
        }

        Ok(())
    }

    fn add_columns(&mut self, document: &FieldPath, columns: &[Column]) {
        self.documents
            .entry(document.clone())
            .or_default()
            .extend(columns.iter().cloned());
    }

    fn columns_for(&self, field: &app::Field, name: &str) -> Result<Vec<Column>> {
        let nullable = field.nullable || field.optional;

        if let Some(converter_name) = &field.converter {
            let Some(converter) = self.converters.get(converter_name) else {
                return Err(Error::invalid_schema(format!(
                    "field `{name}` names unregistered converter `{converter_name}`"
                )));
            };

            let kinds = converter.column_types();
            if kinds.len() > 1 {
                return Ok(kinds
                    .iter()
                    .enumerate()
                    .map(|(i, kind)| Column {
                        name: format!("{name}_{i}"),
                        storage_ty: db::Type::from_storage_kind(*kind),
                        nullable,
                    })
                    .collect());
            }

            let storage_ty = field
                .storage_ty
                .unwrap_or_else(|| db::Type::from_storage_kind(converter.datastore_type()));
            return Ok(vec![Column {
                name: name.to_string(),
                storage_ty,
                nullable,
            }]);
        }

        let storage_ty = match &field.ty {
            FieldTy::Primitive(primitive) => db::Type::from_app(&primitive.ty),
            FieldTy::Relation(app::Relation::One(_)) => db::Type::Text,
            FieldTy::Relation(_) | FieldTy::Embedded(_) => db::Type::Document,
        };

        Ok(vec![Column {
            name: name.to_string(),
            storage_ty: field.storage_ty.unwrap_or(storage_ty),
            nullable,
        }])
    }
}

fn column_name(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}_{name}")
    }
}

fn verify_unique_columns(model: &app::Model, table: &Table) -> Result<()> {
    let mut seen = HashSet::new();
    seen.insert(db::CLASS_KEY);

    let surrogates = table.datastore_id.iter().chain(table.version.iter());

    for column in table.columns.iter().chain(surrogates) {
        if !seen.insert(column.name.as_str()) {
            return Err(Error::invalid_schema(format!(
                "column `{}` of `{}` is mapped more than once",
                column.name, model.name
            )));
        }
    }

    Ok(())
}

/// Nested sub-documents carry no class key or surrogate columns.
fn verify_unique_nested_columns(
    app: &app::Schema,
    model: &app::Model,
    path: &FieldPath,
    columns: &[Column],
) -> Result<()> {
    let mut seen = HashSet::new();

    for column in columns {
        if !seen.insert(column.name.as_str()) {
            let holder = path
                .last()
                .map(|field| app.field(field).full_name(app))
                .unwrap_or_else(|| model.name.clone());

            return Err(Error::invalid_schema(format!(
                "column `{}` of `{}` is mapped more than once in the nested document of `{holder}`",
                column.name, model.name
            )));
        }
    }

    Ok(())
}
