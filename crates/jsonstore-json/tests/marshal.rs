use jsonstore_core::schema::app::{FieldId, Model, ModelId, Relation};
use jsonstore_core::{
    Bean, Converters, Error, Identity, ObjectRef, Orchestrator, Result, Schema, StorageKind, Type,
    TypeConverter, TypeEnum, Value, ValueEnum,
};
use jsonstore_core::schema::db;
use jsonstore_json::{Context, Document, FetchFields, IdentityCodec, Reconstructors, StoreFields};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::cell::RefCell;

/// Objects that currently exist, looked up by identity.
#[derive(Default)]
struct Objects {
    live: RefCell<Vec<ObjectRef>>,
    persisted: RefCell<Vec<ObjectRef>>,
}

impl Objects {
    fn insert(&self, object: &ObjectRef) {
        self.live.borrow_mut().push(object.clone());
    }

    fn delete(&self, object: &ObjectRef) {
        self.live.borrow_mut().retain(|live| live != object);
    }
}

impl Orchestrator for Objects {
    fn persist(&self, value: &ObjectRef, _owner: &ObjectRef, _field: FieldId) -> Result<ObjectRef> {
        self.persisted.borrow_mut().push(value.clone());
        Ok(value.clone())
    }

    fn identity(&self, object: &ObjectRef) -> Result<Identity> {
        object
            .identity()
            .ok_or_else(|| Error::record_not_found("object has no identity"))
    }

    fn find(&self, model: ModelId, identity: &Identity) -> Result<Option<ObjectRef>> {
        Ok(self
            .live
            .borrow()
            .iter()
            .find(|object| object.model_id() == model && object.identity().as_ref() == Some(identity))
            .cloned())
    }
}

struct Fixture {
    schema: Schema,
    converters: Converters,
    reconstructors: Reconstructors,
    identities: IdentityCodec,
    objects: Objects,
}

impl Fixture {
    fn new(schema: Schema, converters: Converters) -> Fixture {
        Fixture {
            schema,
            converters,
            reconstructors: Reconstructors::new(),
            identities: IdentityCodec::default(),
            objects: Objects::default(),
        }
    }

    fn cx(&self) -> Context<'_> {
        Context {
            schema: &self.schema,
            converters: &self.converters,
            reconstructors: &self.reconstructors,
            identities: &self.identities,
            orchestrator: &self.objects,
        }
    }

    fn model(&self, id: ModelId) -> &Model {
        self.schema.model(id)
    }

    /// Allocates an object with a single string key.
    fn object(&self, model: ModelId, key: &str) -> ObjectRef {
        let object = ObjectRef::new(self.model(model));
        object.set(0, key);
        object.set_identity(Identity::Application(vec![Value::from(key)]));
        object
    }

    fn store(&self, object: &ObjectRef) -> Document {
        let model = self.model(object.model_id());
        let mut doc = Document::for_class(&model.name);
        StoreFields::new(self.cx(), object, &mut doc)
            .store(&model.all_field_indices())
            .unwrap();
        doc
    }

    fn fetch(&self, model: ModelId, doc: &Document) -> Result<ObjectRef> {
        let model = self.model(model);
        let object = ObjectRef::new(model);
        FetchFields::new(self.cx(), &object, doc).fetch(&model.all_field_indices())?;
        Ok(object)
    }
}

fn doc(json: serde_json::Value) -> Document {
    Document::from_json("test", json).unwrap()
}

fn people() -> (Fixture, ModelId) {
    let mut builder = Schema::builder();
    let person = builder.model("Person");
    builder.root("Person", |m| {
        m.key("id", Type::String);
        m.field("name", Type::String).nullable();
        m.field("active", Type::Bool);
    });

    let schema = builder.build(&Converters::new()).unwrap();
    (Fixture::new(schema, Converters::new()), person)
}

#[test]
fn insert_then_fetch() {
    let (fx, person) = people();

    let alice = fx.object(person, "42");
    alice.set(1, "Alice");
    alice.set(2, true);

    let doc = fx.store(&alice);
    assert_eq!(
        doc.clone().into_json(),
        json!({ "class": "Person", "id": "42", "name": "Alice", "active": true })
    );

    let fetched = fx.fetch(person, &doc).unwrap();
    assert_eq!(fetched.get(0), Value::from("42"));
    assert_eq!(fetched.get(1), Value::from("Alice"));
    assert_eq!(fetched.get(2), Value::Bool(true));
}

#[test]
fn null_string_is_written_as_null() {
    let (fx, person) = people();

    let doc = fx.store(&fx.object(person, "1"));

    assert_eq!(doc.get("name"), Some(&serde_json::Value::Null));
}

#[test]
fn null_columns_read_as_zero() {
    let mut builder = Schema::builder();
    let counter = builder.root("Counter", |m| {
        m.key("id", Type::String);
        m.field("hits", Type::I32);
        m.field("ratio", Type::F64);
        m.field("enabled", Type::Bool);
        m.field("label", Type::String).nullable();
    });
    let fx = Fixture::new(builder.build(&Converters::new()).unwrap(), Converters::new());

    let counter = fx
        .fetch(counter, &doc(json!({ "id": "c", "hits": null, "ratio": null })))
        .unwrap();

    assert_eq!(counter.get(1), Value::I32(0));
    assert_eq!(counter.get(2), Value::F64(0.0));
    assert_eq!(counter.get(3), Value::Bool(false));
    assert_eq!(counter.get(4), Value::Null);
}

#[test]
fn collection_drops_deleted_elements() {
    let mut builder = Schema::builder();
    let person = builder.model("Person");
    builder.root("Person", |m| {
        m.key("id", Type::String);
        m.relation("friends", Relation::Collection(person));
    });
    let fx = Fixture::new(builder.build(&Converters::new()).unwrap(), Converters::new());

    let seven = fx.object(person, "7");
    let nine = fx.object(person, "9");
    fx.objects.insert(&seven);
    fx.objects.insert(&nine);

    let owner = fx.object(person, "1");
    owner.set(1, Value::List(vec![Value::Object(seven.clone()), Value::Object(nine.clone())]));

    let doc = fx.store(&owner);
    assert_eq!(doc.get("friends"), Some(&json!(["7", "9"])));
    assert_eq!(fx.objects.persisted.borrow().len(), 2);

    fx.objects.delete(&nine);

    let fetched = fx.fetch(person, &doc).unwrap();
    assert_eq!(fetched.get(1), Value::List(vec![Value::Object(seven)]));
    assert!(fetched.is_dirty(1));
    assert!(!fetched.is_dirty(0));
}

#[test]
fn collection_follows_order_by() {
    let mut builder = Schema::builder();
    let person = builder.model("Person");
    builder.root("Person", |m| {
        m.key("id", Type::String);
        m.field("age", Type::I32);
        m.relation("friends", Relation::Collection(person))
            .order_by("age", true);
    });
    let fx = Fixture::new(builder.build(&Converters::new()).unwrap(), Converters::new());

    let young = fx.object(person, "7");
    young.set(1, 20);
    let old = fx.object(person, "9");
    old.set(1, 60);
    fx.objects.insert(&young);
    fx.objects.insert(&old);

    let fetched = fx
        .fetch(person, &doc(json!({ "id": "1", "age": 30, "friends": ["7", "9"] })))
        .unwrap();

    assert_eq!(
        fetched.get(2),
        Value::List(vec![Value::Object(old), Value::Object(young)])
    );
    assert!(!fetched.is_dirty(2));
}

#[test]
fn null_collection_elements_are_kept() {
    let mut builder = Schema::builder();
    let person = builder.model("Person");
    builder.root("Person", |m| {
        m.key("id", Type::String);
        m.relation("friends", Relation::Collection(person));
    });
    let fx = Fixture::new(builder.build(&Converters::new()).unwrap(), Converters::new());

    let seven = fx.object(person, "7");
    fx.objects.insert(&seven);

    let owner = fx.object(person, "1");
    owner.set(1, Value::List(vec![Value::Object(seven.clone()), Value::Null]));

    let doc = fx.store(&owner);
    assert_eq!(doc.get("friends"), Some(&json!(["7", null])));

    let fetched = fx.fetch(person, &doc).unwrap();
    assert_eq!(
        fetched.get(1),
        Value::List(vec![Value::Object(seven), Value::Null])
    );
    assert!(!fetched.is_dirty(1));
}

#[test]
fn array_drops_deleted_elements() {
    let mut builder = Schema::builder();
    let person = builder.model("Person");
    builder.root("Person", |m| {
        m.key("id", Type::String);
        m.relation("friends", Relation::Array(person));
    });
    let fx = Fixture::new(builder.build(&Converters::new()).unwrap(), Converters::new());

    let seven = fx.object(person, "7");
    let nine = fx.object(person, "9");
    let eight = fx.object(person, "8");
    for object in [&seven, &nine, &eight] {
        fx.objects.insert(object);
    }

    let owner = fx.object(person, "1");
    owner.set(
        1,
        Value::List(vec![
            Value::Object(seven.clone()),
            Value::Object(nine.clone()),
            Value::Object(eight.clone()),
        ]),
    );

    let doc = fx.store(&owner);
    assert_eq!(doc.get("friends"), Some(&json!(["7", "9", "8"])));

    fx.objects.delete(&nine);

    let fetched = fx.fetch(person, &doc).unwrap();
    assert_eq!(
        fetched.get(1),
        Value::List(vec![Value::Object(seven), Value::Object(eight)])
    );
    assert!(fetched.is_dirty(1));
}

#[test]
fn map_relation_drops_deleted_values() {
    let mut builder = Schema::builder();
    let person = builder.model("Person");
    builder.root("Person", |m| {
        m.key("id", Type::String);
        m.relation(
            "byName",
            Relation::Map {
                key: Type::String.into(),
                value: person.into(),
            },
        );
    });
    let fx = Fixture::new(builder.build(&Converters::new()).unwrap(), Converters::new());

    let seven = fx.object(person, "7");
    let nine = fx.object(person, "9");
    fx.objects.insert(&seven);
    fx.objects.insert(&nine);

    let owner = fx.object(person, "1");
    owner.set(
        1,
        Value::Map(vec![
            (Value::from("x"), Value::Object(seven.clone())),
            (Value::from("y"), Value::Object(nine.clone())),
            (Value::from("z"), Value::Null),
        ]),
    );

    let doc = fx.store(&owner);
    assert_eq!(
        doc.get("byName"),
        Some(&json!({ "x": "7", "y": "9", "z": null }))
    );

    let fetched = fx.fetch(person, &doc).unwrap();
    assert!(!fetched.is_dirty(1));

    fx.objects.delete(&nine);

    let fetched = fx.fetch(person, &doc).unwrap();
    assert_eq!(
        fetched.get(1),
        Value::Map(vec![
            (Value::from("x"), Value::Object(seven)),
            (Value::from("z"), Value::Null),
        ])
    );
    assert!(fetched.is_dirty(1));
}

#[test]
fn dangling_single_relation_reads_as_null() {
    let mut builder = Schema::builder();
    let person = builder.model("Person");
    builder.root("Person", |m| {
        m.key("id", Type::String);
        m.relation("best", Relation::One(person));
        m.relation("rival", Relation::One(person)).optional();
        m.relation("mentor", Relation::One(person));
    });
    let fx = Fixture::new(builder.build(&Converters::new()).unwrap(), Converters::new());

    let mentor = fx.object(person, "5");
    fx.objects.insert(&mentor);

    let fetched = fx
        .fetch(
            person,
            &doc(json!({ "id": "1", "best": "404", "rival": "405", "mentor": "5" })),
        )
        .unwrap();

    assert_eq!(fetched.get(1), Value::Null);
    assert_eq!(fetched.get(2), Value::none());
    assert_eq!(fetched.get(3), Value::Object(mentor));
}

#[test]
fn qualified_identities_are_resolved() {
    let mut builder = Schema::builder();
    let person = builder.model("com.acme.Person");
    builder.root("com.acme.Person", |m| {
        m.key("id", Type::String);
        m.relation("best", Relation::One(person));
    });
    let fx = Fixture::new(builder.build(&Converters::new()).unwrap(), Converters::new());

    let best = fx.object(person, "7");
    fx.objects.insert(&best);

    let fetched = fx
        .fetch(person, &doc(json!({ "id": "1", "best": "com.acme.Person:7" })))
        .unwrap();

    assert_eq!(fetched.get(1), Value::Object(best));
}

#[test]
fn enum_by_column_kind() {
    let color = TypeEnum::new("Color", ["Red", "Green", "Blue"]);

    let mut builder = Schema::builder();
    let paint = builder.root("Paint", |m| {
        m.key("id", Type::String);
        m.field("color", Type::Enum(color.clone()))
            .storage(db::Type::Integer);
        m.field("shade", Type::Enum(color.clone()));
    });
    let fx = Fixture::new(builder.build(&Converters::new()).unwrap(), Converters::new());

    let green = Value::Enum(ValueEnum::new(1, "Green"));
    let object = fx.object(paint, "p");
    object.set(1, green.clone());
    object.set(2, green.clone());

    let doc = fx.store(&object);
    assert_eq!(
        doc.clone().into_json(),
        json!({ "class": "Paint", "id": "p", "color": 1, "shade": "Green" })
    );

    let fetched = fx.fetch(paint, &doc).unwrap();
    assert_eq!(fetched.get(1), green);
    assert_eq!(fetched.get(2), green);
}

fn addresses(nested: bool) -> (Fixture, ModelId, ModelId) {
    let mut builder = Schema::builder();
    let address = builder.model("Address");
    let person = builder.root("Person", |m| {
        m.key("id", Type::String);
        let home = m.embedded("home", address);
        if nested {
            home.nested();
        }
        m.embedded("work", address);
    });
    builder.embedded("Address", |m| {
        m.field("street", Type::String).nullable();
        m.field("zip", Type::I32);
    });

    let schema = builder.build(&Converters::new()).unwrap();
    (Fixture::new(schema, Converters::new()), person, address)
}

fn address(fx: &Fixture, model: ModelId, street: &str, zip: i32) -> ObjectRef {
    let object = ObjectRef::new(fx.model(model));
    object.set(0, street);
    object.set(1, zip);
    object
}

#[test]
fn flat_embedded_round_trip() {
    let (fx, person, address_model) = addresses(false);

    let owner = fx.object(person, "1");
    owner.set(1, Value::Object(address(&fx, address_model, "Main St", 1000)));
    owner.set(2, Value::Object(address(&fx, address_model, "Dock Rd", 2000)));

    let doc = fx.store(&owner);
    assert_eq!(
        doc.clone().into_json(),
        json!({
            "class": "Person",
            "id": "1",
            "home_street": "Main St",
            "home_zip": 1000,
            "work_street": "Dock Rd",
            "work_zip": 2000,
        })
    );

    let fetched = fx.fetch(person, &doc).unwrap();
    let home = fetched.get(1).expect_object().clone();
    let work = fetched.get(2).expect_object().clone();

    assert_eq!(home.get(0), Value::from("Main St"));
    assert_eq!(work.get(1), Value::I32(2000));
    assert_eq!(home.owner().map(|(owner, _)| owner), Some(fetched.clone()));
}

#[test]
fn absent_flat_embedded_object() {
    let (fx, person, _) = addresses(false);

    let owner = fx.object(person, "1");
    let doc = fx.store(&owner);
    assert_eq!(
        doc.clone().into_json(),
        json!({
            "class": "Person",
            "id": "1",
            "home_street": null,
            "home_zip": null,
            "work_street": null,
            "work_zip": null,
        })
    );

    let fetched = fx.fetch(person, &doc).unwrap();
    assert_eq!(fetched.get(1), Value::Null);
    assert_eq!(fetched.get(2), Value::Null);
}

#[test]
fn nested_embedded_round_trip() {
    let (fx, person, address_model) = addresses(true);

    let owner = fx.object(person, "1");
    owner.set(1, Value::Object(address(&fx, address_model, "Main St", 1000)));

    let doc = fx.store(&owner);
    assert_eq!(
        doc.get("home"),
        Some(&json!({ "street": "Main St", "zip": 1000 }))
    );

    let fetched = fx.fetch(person, &doc).unwrap();
    let home = fetched.get(1).expect_object().clone();
    assert_eq!(home.get(0), Value::from("Main St"));
    assert_eq!(home.get(1), Value::I32(1000));
}

#[test]
fn owner_back_reference() {
    let mut builder = Schema::builder();
    let person = builder.model("Person");
    let address = builder.model("Address");
    builder.root("Person", |m| {
        m.key("id", Type::String);
        m.embedded("home", address).owner("resident");
    });
    builder.embedded("Address", |m| {
        m.field("street", Type::String).nullable();
        m.relation("resident", Relation::One(person));
    });
    let fx = Fixture::new(builder.build(&Converters::new()).unwrap(), Converters::new());

    let owner = fx.object(person, "1");
    let home = ObjectRef::new(fx.model(address));
    home.set(0, "Main St");
    owner.set(1, Value::Object(home.clone()));

    let doc = fx.store(&owner);
    assert_eq!(
        doc.clone().into_json(),
        json!({ "class": "Person", "id": "1", "home_street": "Main St" })
    );
    // Repaired in memory, never written
    assert_eq!(home.get(1), Value::Object(owner.clone()));

    let fetched = fx.fetch(person, &doc).unwrap();
    let home = fetched.get(1).expect_object().clone();
    assert_eq!(home.get(1), Value::Object(fetched.clone()));
}

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

    fn to_datastore(&self, value: &Value) -> Result<Vec<Value>> {
        let point = value
            .as_bean()
            .ok_or_else(|| Error::type_conversion(value.clone(), "geo.Point"))?;
        Ok(vec![point.get("x").clone(), point.get("y").clone()])
    }

    fn to_member(&self, columns: Vec<Value>) -> Result<Value> {
        let mut columns = columns.into_iter();
        Ok(Value::Bean(
            Bean::new("geo.Point")
                .with("x", columns.next().unwrap_or_default())
                .with("y", columns.next().unwrap_or_default()),
        ))
    }
}

#[test]
fn multi_column_converter_round_trip() {
    let mut converters = Converters::new();
    converters.register(PointColumns);

    let mut builder = Schema::builder();
    let place = builder.root("Place", |m| {
        m.field("name", Type::String).nullable();
        m.field("location", Type::bean("geo.Point"))
            .nullable()
            .converter("point-columns");
    });
    let fx = Fixture::new(builder.build(&converters).unwrap(), converters);

    let point = Value::Bean(Bean::new("geo.Point").with("x", 1.5).with("y", -2.25));
    let object = ObjectRef::new(fx.model(place));
    object.set(0, "Harbor");
    object.set(1, point.clone());

    let doc = fx.store(&object);
    assert_eq!(
        doc.clone().into_json(),
        json!({ "class": "Place", "name": "Harbor", "location_0": 1.5, "location_1": -2.25 })
    );

    let fetched = fx.fetch(place, &doc).unwrap();
    assert_eq!(fetched.get(1), point);

    // A null value is written once and read back as null
    object.set(1, Value::Null);
    let doc = fx.store(&object);
    assert_eq!(doc.get("location_0"), Some(&serde_json::Value::Null));
    assert_eq!(fx.fetch(place, &doc).unwrap().get(1), Value::Null);
}

#[test]
fn uuid_goes_through_the_string_converter() {
    let mut builder = Schema::builder();
    let token = builder.root("Token", |m| {
        m.key("id", Type::String);
        m.field("secret", Type::Uuid).nullable();
    });
    let fx = Fixture::new(builder.build(&Converters::new()).unwrap(), Converters::new());

    let secret = uuid::Uuid::new_v4();
    let object = fx.object(token, "t");
    object.set(1, Value::Uuid(secret));

    let doc = fx.store(&object);
    assert_eq!(doc.get("secret"), Some(&json!(secret.to_string())));
    assert_eq!(fx.fetch(token, &doc).unwrap().get(1), Value::Uuid(secret));
}

#[test]
fn registered_value_types_are_reconstructed() {
    let user = "com.google.appengine.api.users.User";

    let mut builder = Schema::builder();
    let account = builder.root("Account", |m| {
        m.key("id", Type::String);
        m.field("user", Type::bean(user)).nullable();
    });
    let fx = Fixture::new(builder.build(&Converters::new()).unwrap(), Converters::new());

    let principal = Value::Bean(
        Bean::new(user)
            .with("email", "a@example.com")
            .with("authDomain", "example.com"),
    );
    let object = fx.object(account, "a");
    object.set(1, principal.clone());

    let doc = fx.store(&object);
    assert_eq!(
        doc.get("user"),
        Some(&json!({ "class": user, "email": "a@example.com", "authDomain": "example.com" }))
    );
    assert_eq!(fx.fetch(account, &doc).unwrap().get(1), principal);
}

#[test]
fn unknown_value_types_read_as_null() {
    let mut builder = Schema::builder();
    let account = builder.root("Account", |m| {
        m.key("id", Type::String);
        m.field("extra", Type::bean("com.acme.Unknown")).nullable();
    });
    let fx = Fixture::new(builder.build(&Converters::new()).unwrap(), Converters::new());

    let fetched = fx
        .fetch(account, &doc(json!({ "id": "a", "extra": { "class": "com.acme.Unknown", "n": 1 } })))
        .unwrap();

    assert_eq!(fetched.get(1), Value::Null);
}

#[test]
fn malformed_relation_is_fatal() {
    let mut builder = Schema::builder();
    let person = builder.model("Person");
    builder.root("Person", |m| {
        m.key("id", Type::String);
        m.relation("friends", Relation::Collection(person));
    });
    let fx = Fixture::new(builder.build(&Converters::new()).unwrap(), Converters::new());

    let err = fx
        .fetch(person, &doc(json!({ "id": "1", "friends": "7" })))
        .unwrap_err();

    assert!(err.is_malformed_document());
    assert!(err.to_string().contains("Person::friends"));
}

#[test]
fn transient_fields_are_left_alone() {
    use jsonstore_core::schema::app::Persistence;

    let mut builder = Schema::builder();
    let session = builder.root("Session", |m| {
        m.key("id", Type::String);
        m.field("scratch", Type::I64)
            .persistence(Persistence::Transactional);
    });
    let fx = Fixture::new(builder.build(&Converters::new()).unwrap(), Converters::new());

    let object = fx.object(session, "s");
    object.set(1, 99i64);

    let doc = fx.store(&object);
    assert!(!doc.has("scratch"));

    let model = fx.model(session);
    FetchFields::new(fx.cx(), &object, &doc)
        .fetch(&model.all_field_indices())
        .unwrap();
    assert_eq!(object.get(1), Value::I64(99));
}
