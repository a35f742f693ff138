use jsonstore_core::{schema::db::CLASS_KEY, Error, Result};
use serde_json::{Map, Value as Json};
use std::fmt;

/// A JSON object document: an ordered mapping from keys to JSON values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    map: Map<String, Json>,
}

impl Document {
    pub fn new() -> Document {
        Document::default()
    }

    /// Creates a document stamped with the originating type name.
    pub fn for_class(name: &str) -> Document {
        let mut doc = Document::new();
        doc.put(CLASS_KEY, name);
        doc
    }

    /// Parses document text returned by a backend.
    pub fn parse(text: &str) -> Result<Document> {
        let json: Json = serde_json::from_str(text).map_err(Error::data_store)?;
        Document::from_json("<root>", json)
    }

    /// Wraps a JSON value that must be an object.
    pub fn from_json(key: &str, json: Json) -> Result<Document> {
        match json {
            Json::Object(map) => Ok(Document { map }),
            json => Err(Error::malformed_document(
                key,
                format!("expected object, found {}", kind(&json)),
            )),
        }
    }

    pub fn into_json(self) -> Json {
        Json::Object(self.map)
    }

    pub fn as_map(&self) -> &Map<String, Json> {
        &self.map
    }

    pub fn put(&mut self, key: impl Into<String>, value: impl Into<Json>) {
        self.map.insert(key.into(), value.into());
    }

    pub fn put_null(&mut self, key: impl Into<String>) {
        self.map.insert(key.into(), Json::Null);
    }

    /// Overwrites this document's entries with those of `other`. Keys only
    /// present here are kept.
    pub fn merge(&mut self, other: Document) {
        self.map.extend(other.map);
    }

    pub fn get(&self, key: &str) -> Option<&Json> {
        self.map.get(key)
    }

    pub fn has(&self, key: &str) -> bool {
        self.map.contains_key(key)
    }

    /// Returns `true` if the key is absent or holds null.
    pub fn is_null(&self, key: &str) -> bool {
        matches!(self.map.get(key), None | Some(Json::Null))
    }

    /// Returns the value at `key`, treating null as absent.
    pub fn value(&self, key: &str) -> Option<&Json> {
        self.map.get(key).filter(|json| !json.is_null())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.map.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// The originating type name stamped under the class key.
    pub fn class(&self) -> Option<&str> {
        self.map.get(CLASS_KEY).and_then(Json::as_str)
    }

    pub fn get_bool(&self, key: &str) -> Result<bool> {
        self.typed(key, "boolean", Json::as_bool)
    }

    pub fn get_i64(&self, key: &str) -> Result<i64> {
        self.typed(key, "integer", Json::as_i64)
    }

    pub fn get_f64(&self, key: &str) -> Result<f64> {
        self.typed(key, "number", Json::as_f64)
    }

    pub fn get_str(&self, key: &str) -> Result<&str> {
        self.typed(key, "string", Json::as_str)
    }

    pub fn get_list(&self, key: &str) -> Result<&Vec<Json>> {
        self.typed(key, "list", Json::as_array)
    }

    pub fn get_document(&self, key: &str) -> Result<Document> {
        let json = self.typed(key, "object", |json| json.is_object().then_some(json))?;
        Document::from_json(key, json.clone())
    }

    fn typed<'a, T>(
        &'a self,
        key: &str,
        expected: &str,
        f: impl FnOnce(&'a Json) -> Option<T>,
    ) -> Result<T> {
        let Some(json) = self.map.get(key) else {
            return Err(Error::malformed_document(key, "missing key"));
        };
        f(json).ok_or_else(|| mismatch(key, expected, json))
    }
}

/// Describes a JSON value's kind for diagnostics.
pub(crate) fn kind(json: &Json) -> &'static str {
    match json {
        Json::Null => "null",
        Json::Bool(_) => "boolean",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "list",
        Json::Object(_) => "object",
    }
}

pub(crate) fn mismatch(key: &str, expected: &str, json: &Json) -> Error {
    Error::malformed_document(key, format!("expected {expected}, found {}", kind(json)))
}

impl From<Document> for Json {
    fn from(value: Document) -> Self {
        value.into_json()
    }
}

impl From<Map<String, Json>> for Document {
    fn from(map: Map<String, Json>) -> Self {
        Document { map }
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(&self.map) {
            Ok(text) => f.write_str(&text),
            Err(_) => Err(fmt::Error),
        }
    }
}
