use jsonstore_core::schema::app::{Container, ModelId, Relation, VersionStrategy};
use jsonstore_core::schema::db;
use jsonstore_core::schema::mapping::{FieldPath, Role};
use jsonstore_core::{Converters, Result, Schema, StorageKind, Type, TypeConverter, Value};
use pretty_assertions::assert_eq;

struct PointColumns;

impl TypeConverter for PointColumns {
    fn name(&self) -> &str {
        "point-columns"
    }

    fn member_type(&self) -> &str {
        "geo.Point"
    }

    fn column_types(&self) -> &[StorageKind] {
        &[StorageKind::Double, StorageKind::Double]
    }

    fn to_datastore(&self, _value: &Value) -> Result<Vec<Value>> {
        Ok(vec![Value::F64(0.0), Value::F64(0.0)])
    }

    fn to_member(&self, _columns: Vec<Value>) -> Result<Value> {
        Ok(Value::Null)
    }
}

fn column_names(schema: &Schema, model: ModelId) -> Vec<String> {
    schema
        .table_for(model)
        .columns
        .iter()
        .map(|column| column.name.clone())
        .collect()
}

#[test]
fn sibling_embedded_fields_get_disjoint_columns() {
    let mut builder = Schema::builder();
    let address = builder.model("Address");
    let person = builder.root("Person", |m| {
        m.key("id", Type::String);
        m.embedded("home", address);
        m.embedded("work", address);
    });
    builder.embedded("Address", |m| {
        m.field("street", Type::String).nullable();
        m.field("zip", Type::I32);
    });

    let schema = builder.build(&Converters::new()).unwrap();

    assert_eq!(
        column_names(&schema, person),
        ["id", "home_street", "home_zip", "work_street", "work_zip"]
    );

    let mapping = schema.mapping_for(person);
    let home = person.field(1);
    let street = address.field(0);
    let member = mapping
        .columns_for_embedded(&FieldPath::from_field(home).join(street))
        .unwrap();
    assert_eq!(member.column_name(), "home_street");
    assert_eq!(
        mapping.columns_for(home).unwrap().role,
        Role::Embedded { nested: false }
    );
}

#[test]
fn nested_embedding_restarts_column_names() {
    let mut builder = Schema::builder();
    let address = builder.model("Address");
    let geo = builder.model("Geo");
    let person = builder.root("Person", |m| {
        m.key("id", Type::String);
        m.embedded("home", address).nested();
    });
    builder.embedded("Address", |m| {
        m.field("street", Type::String).nullable();
        m.embedded("geo", geo);
    });
    builder.embedded("Geo", |m| {
        m.field("lat", Type::F64);
    });

    let schema = builder.build(&Converters::new()).unwrap();
    let mapping = schema.mapping_for(person);

    assert_eq!(column_names(&schema, person), ["id", "home"]);

    let lat = FieldPath::from_field(person.field(1))
        .join(address.field(1))
        .join(geo.field(0));
    assert_eq!(mapping.columns_for_embedded(&lat).unwrap().column_name(), "geo_lat");
}

#[test]
fn owner_back_reference_has_no_columns() {
    let mut builder = Schema::builder();
    let person = builder.model("Person");
    let address = builder.model("Address");
    builder.root("Person", |m| {
        m.key("id", Type::String);
        m.embedded("home", address).owner("person");
    });
    builder.embedded("Address", |m| {
        m.field("street", Type::String).nullable();
        m.relation("person", Relation::One(person));
    });

    let schema = builder.build(&Converters::new()).unwrap();
    let path = FieldPath::from_field(person.field(1)).join(address.field(1));
    let member = schema.mapping_for(person).columns_for_embedded(&path).unwrap();

    assert_eq!(member.role, Role::OwnerBackReference);
    assert!(member.columns.is_empty());
    assert_eq!(column_names(&schema, person), ["id", "home_street"]);
}

#[test]
fn multi_column_converter_numbers_its_columns() {
    let mut converters = Converters::new();
    converters.register(PointColumns);

    let mut builder = Schema::builder();
    let place = builder.root("Place", |m| {
        m.field("location", Type::bean("geo.Point"))
            .nullable()
            .converter("point-columns");
    });

    let schema = builder.build(&converters).unwrap();
    let table = schema.table_for(place);

    assert_eq!(column_names(&schema, place), ["location_0", "location_1"]);
    assert_eq!(table.columns[0].storage_ty, db::Type::Double);
    assert_eq!(table.datastore_id.as_ref().unwrap().name, "_id");
}

#[test]
fn surrogate_version_column() {
    let mut builder = Schema::builder();
    let account = builder.root("Account", |m| {
        m.key("id", Type::I64);
        m.version(VersionStrategy::Number);
    });

    let schema = builder.build(&Converters::new()).unwrap();
    let table = schema.table_for(account);

    assert!(table.datastore_id.is_none());
    assert_eq!(table.version.as_ref().unwrap().name, "_version");
}

#[test]
fn version_field_must_exist() {
    let mut builder = Schema::builder();
    builder.root("Account", |m| {
        m.key("id", Type::I64);
        m.version_field("revision", VersionStrategy::Number);
    });

    let err = builder.build(&Converters::new()).unwrap_err();
    assert!(err.is_invalid_schema());
}

#[test]
fn embedded_collections_are_rejected() {
    let mut builder = Schema::builder();
    let address = builder.model("Address");
    builder.root("Person", |m| {
        m.key("id", Type::String);
        m.embedded("addresses", address)
            .container(Container::Collection);
    });
    builder.embedded("Address", |m| {
        m.field("street", Type::String).nullable();
    });

    let err = builder.build(&Converters::new()).unwrap_err();
    assert!(err.is_unsupported_feature());
    assert!(err.to_string().contains("Person::addresses"));
}

#[test]
fn unknown_converter_is_rejected() {
    let mut builder = Schema::builder();
    builder.root("Person", |m| {
        m.key("id", Type::String);
        m.field("tag", Type::String).converter("missing");
    });

    let err = builder.build(&Converters::new()).unwrap_err();
    assert!(err.is_invalid_schema());
}

#[test]
fn undefined_model_is_rejected() {
    let mut builder = Schema::builder();
    let ghost = builder.model("Ghost");
    builder.root("Person", |m| {
        m.key("id", Type::String);
        m.relation("ghost", Relation::One(ghost));
    });

    let err = builder.build(&Converters::new()).unwrap_err();
    assert_eq!(
        err.to_string(),
        "invalid schema: model `Ghost` is referenced but never defined"
    );
}

#[test]
fn self_embedding_is_rejected() {
    let mut builder = Schema::builder();
    let node = builder.model("Node");
    builder.root("Tree", |m| {
        m.embedded("root", node);
    });
    builder.embedded("Node", |m| {
        m.embedded("child", node);
    });

    let err = builder.build(&Converters::new()).unwrap_err();
    assert!(err.is_invalid_schema());
}

#[test]
fn nested_document_columns_must_be_unique() {
    let mut builder = Schema::builder();
    let address = builder.model("Address");
    let geo = builder.model("Geo");
    builder.root("Person", |m| {
        m.key("id", Type::String);
        m.embedded("home", address).nested();
    });
    builder.embedded("Address", |m| {
        m.field("geo_lat", Type::F64);
        m.embedded("geo", geo);
    });
    builder.embedded("Geo", |m| {
        m.field("lat", Type::F64);
    });

    let err = builder.build(&Converters::new()).unwrap_err();
    assert!(err.is_invalid_schema());
    assert!(err.to_string().contains("`geo_lat`"));
    assert!(err.to_string().contains("Person::home"));
}

#[test]
fn nested_document_may_reuse_root_column_names() {
    let mut builder = Schema::builder();
    let address = builder.model("Address");
    builder.root("Person", |m| {
        m.key("id", Type::String);
        m.field("street", Type::String).nullable();
        m.embedded("home", address).nested();
    });
    builder.embedded("Address", |m| {
        m.field("street", Type::String).nullable();
    });

    builder.build(&Converters::new()).unwrap();
}
