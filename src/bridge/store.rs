//! JSON document tables.
//!
//! A table is one JSON object on disk mapping a document key to the document.
//! Every mutation rewrites the file through a temporary sibling and a rename,
//! and only touches memory once the write went through.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::common::error::StoreError;

/// A value stored in a [`DocumentTable`] under its own key.
pub trait Document: Serialize + DeserializeOwned + Clone {
    fn key(&self) -> String;
}

/// Keyed collection of documents, optionally backed by a file.
#[derive(Debug)]
pub struct DocumentTable<T> {
    path: Option<PathBuf>,
    documents: BTreeMap<String, T>,
}

impl<T: Document> DocumentTable<T> {
    /// Open a table file, starting empty when it does not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();

        let documents = match fs::read_to_string(&path) {
            Ok(content) if content.trim().is_empty() => BTreeMap::new(),
            Ok(content) => serde_json::from_str(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => {
                return Err(StoreError::Io {
                    path: path.display().to_string(),
                    source,
                })
            }
        };

        debug!(
            documents = documents.len(),
            "Opened document table {}",
            path.display()
        );

        Ok(Self {
            path: Some(path),
            documents,
        })
    }

    /// A table that is never written anywhere.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            documents: BTreeMap::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&T> {
        self.documents.get(key)
    }

    pub fn all(&self) -> impl Iterator<Item = &T> {
        self.documents.values()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Insert or replace a document. On a failed write the table is left as it was.
    pub fn upsert(&mut self, document: T) -> Result<(), StoreError> {
        let key = document.key();
        let previous = self.documents.insert(key.clone(), document);

        if let Err(e) = self.flush() {
            match previous {
                Some(previous) => self.documents.insert(key, previous),
                None => self.documents.remove(&key),
            };
            return Err(e);
        }
        Ok(())
    }

    /// Remove a document, returning it. Removing an unknown key is a no-op.
    pub fn remove(&mut self, key: &str) -> Result<Option<T>, StoreError> {
        let Some(previous) = self.documents.remove(key) else {
            return Ok(None);
        };

        if let Err(e) = self.flush() {
            self.documents.insert(key.to_string(), previous);
            return Err(e);
        }
        Ok(Some(previous))
    }

    /// Drop every document the predicate rejects, returning the dropped ones.
    pub fn retain<F>(&mut self, mut keep: F) -> Result<Vec<T>, StoreError>
    where
        F: FnMut(&T) -> bool,
    {
        let dropped_keys: Vec<String> = self
            .documents
            .iter()
            .filter(|(_, doc)| !keep(doc))
            .map(|(key, _)| key.clone())
            .collect();
        if dropped_keys.is_empty() {
            return Ok(Vec::new());
        }

        let dropped: Vec<(String, T)> = dropped_keys
            .into_iter()
            .filter_map(|key| self.documents.remove(&key).map(|doc| (key, doc)))
            .collect();

        if let Err(e) = self.flush() {
            self.documents.extend(dropped);
            return Err(e);
        }
        Ok(dropped.into_iter().map(|(_, doc)| doc).collect())
    }

    fn flush(&self) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let content = serde_json::to_string_pretty(&self.documents)?;
        write_atomically(path, content.as_bytes())
    }
}

fn write_atomically(path: &Path, content: &[u8]) -> Result<(), StoreError> {
    let io_error = |source| StoreError::Io {
        path: path.display().to_string(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_error)?;
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, content).map_err(io_error)?;
    fs::rename(&tmp, path).map_err(io_error)
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Note {
        id: String,
        body: String,
    }

    impl Document for Note {
        fn key(&self) -> String {
            self.id.clone()
        }
    }

    fn note(id: &str, body: &str) -> Note {
        Note {
            id: id.to_string(),
            body: body.to_string(),
        }
    }

    #[test]
    fn test_upsert_persists_and_reopens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("notes.json");

        let mut table = DocumentTable::<Note>::open(&path).unwrap();
        assert!(table.is_empty());
        table.upsert(note("a", "first")).unwrap();
        table.upsert(note("a", "second")).unwrap();
        table.upsert(note("b", "other")).unwrap();

        let reopened = DocumentTable::<Note>::open(&path).unwrap();
        assert_eq!(reopened.len(), 2);
        assert_eq!(reopened.get("a").unwrap().body, "second");
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_file_is_object_keyed_by_document_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.json");

        let mut table = DocumentTable::<Note>::open(&path).unwrap();
        table.upsert(note("k1", "v")).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["k1"]["body"], "v");
    }

    #[test]
    fn test_remove_and_retain() {
        let mut table = DocumentTable::<Note>::in_memory();
        table.upsert(note("a", "keep")).unwrap();
        table.upsert(note("b", "drop")).unwrap();
        table.upsert(note("c", "drop")).unwrap();

        assert!(table.remove("missing").unwrap().is_none());
        assert_eq!(table.remove("a").unwrap(), Some(note("a", "keep")));

        let dropped = table.retain(|n| n.body != "drop").unwrap();
        assert_eq!(dropped.len(), 2);
        assert!(table.is_empty());
    }

    #[test]
    fn test_failed_write_rolls_back() {
        let dir = tempfile::tempdir().unwrap();
        // A directory squatting on the temp file name makes every write fail.
        let path = dir.path().join("blocked");
        let mut table = DocumentTable::<Note> {
            path: Some(path),
            documents: BTreeMap::new(),
        };
        fs::create_dir_all(dir.path().join("blocked.tmp")).unwrap();

        assert!(table.upsert(note("a", "x")).is_err());
        assert!(table.get("a").is_none());
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.json");
        fs::write(&path, "not json").unwrap();

        assert!(matches!(
            DocumentTable::<Note>::open(&path),
            Err(StoreError::Serialization(_))
        ));
    }
}
