use super::Backend;
use crate::{Document, Result};
use indexmap::IndexMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Keeps documents in memory, keyed by URL.
///
/// Listing a URL that contains `?prefix=` returns every document whose URL
/// starts with the base joined to the prefix, the way cloud stores list a
/// bucket. Any other URL lists the documents directly below it.
#[derive(Debug, Default)]
pub struct Memory {
    documents: Mutex<IndexMap<String, Document>>,
}

impl Memory {
    pub fn new() -> Memory {
        Memory::default()
    }

    /// Number of stored documents.
    pub fn len(&self) -> usize {
        self.documents().len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents().is_empty()
    }

    /// Returns a copy of the document stored at `url`.
    pub fn document(&self, url: &str) -> Option<Document> {
        self.documents().get(url).cloned()
    }

    /// Stores a document as-is, bypassing the persistence handler.
    pub fn insert(&self, url: impl Into<String>, doc: Document) {
        self.documents().insert(url.into(), doc);
    }

    fn documents(&self) -> MutexGuard<'_, IndexMap<String, Document>> {
        self.documents.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Backend for Memory {
    fn post(&self, url: &str, doc: &Document) -> Result<()> {
        let mut documents = self.documents();
        if documents.contains_key(url) {
            jsonstore_core::bail!("POST {url}: a document already exists");
        }

        documents.insert(url.to_string(), doc.clone());
        Ok(())
    }

    fn put(&self, url: &str, doc: &Document) -> Result<()> {
        self.documents()
            .entry(url.to_string())
            .or_default()
            .merge(doc.clone());
        Ok(())
    }

    fn get(&self, url: &str) -> Result<Option<Document>> {
        Ok(self.document(url))
    }

    fn head(&self, url: &str) -> Result<bool> {
        Ok(self.documents().contains_key(url))
    }

    fn delete(&self, url: &str) -> Result<bool> {
        Ok(self.documents().shift_remove(url).is_some())
    }

    fn list(&self, url: &str) -> Result<Vec<Document>> {
        let documents = self.documents();

        let matches: Vec<_> = match url.split_once("?prefix=") {
            Some((base, prefix)) => {
                let prefix = format!("{base}{prefix}");
                documents
                    .iter()
                    .filter(|(key, _)| key.starts_with(&prefix))
                    .map(|(_, doc)| doc.clone())
                    .collect()
            }
            None => documents
                .iter()
                .filter(|(key, _)| {
                    key.strip_prefix(url)
                        .is_some_and(|rest| !rest.is_empty() && !rest.contains('/'))
                })
                .map(|(_, doc)| doc.clone())
                .collect(),
        };

        Ok(matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn doc(name: &str) -> Document {
        let mut doc = Document::for_class("Person");
        doc.put("name", name);
        doc
    }

    #[test]
    fn post_refuses_to_overwrite() {
        let memory = Memory::new();
        memory.post("http://h/Person/1", &doc("a")).unwrap();
        assert!(memory.post("http://h/Person/1", &doc("b")).is_err());
    }

    #[test]
    fn put_merges_into_the_stored_document() {
        let memory = Memory::new();
        let mut stored = doc("a");
        stored.put("age", 3);
        memory.insert("http://h/Person/1", stored);

        memory.put("http://h/Person/1", &doc("b")).unwrap();

        let merged = memory.document("http://h/Person/1").unwrap();
        assert_eq!(merged.get_str("name").unwrap(), "b");
        assert_eq!(merged.get_i64("age").unwrap(), 3);
    }

    #[test]
    fn list_direct_children() {
        let memory = Memory::new();
        memory.insert("http://h/Person/1", doc("a"));
        memory.insert("http://h/Person/2", doc("b"));
        memory.insert("http://h/Person/2/avatar", doc("c"));
        memory.insert("http://h/Pet/1", doc("d"));

        let names: Vec<_> = memory
            .list("http://h/Person/")
            .unwrap()
            .iter()
            .map(|doc| doc.get_str("name").unwrap().to_string())
            .collect();
        assert_eq!(names, ["a", "b"]);

        assert_eq!(memory.list("http://h/photos/?prefix=Photo").unwrap().len(), 0);
    }

    #[test]
    fn delete_reports_missing_documents() {
        let memory = Memory::new();
        memory.insert("http://h/Person/1", doc("a"));

        assert!(memory.delete("http://h/Person/1").unwrap());
        assert!(!memory.delete("http://h/Person/1").unwrap());
        assert!(!memory.head("http://h/Person/1").unwrap());
    }
}
