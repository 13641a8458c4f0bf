//! Whole-document persistence for the snapshot cache and the history ledger.
//!
//! Every write reads the full document, modifies it and writes it back; there
//! are no partial updates. A document that is missing or cannot be parsed
//! reads as empty instead of failing.

pub mod json;

use std::sync::Mutex;

use anyhow::Result;

pub use json::JsonFileStore;

/// Backend that can read and replace one document.
pub trait DocumentStore<T>: Send + Sync {
    /// Read the current document. Missing or corrupt data reads as `T::default()`.
    fn load(&self) -> T;

    fn save(&self, doc: &T) -> Result<()>;
}

/// Volatile backend, for tests and one-shot runs.
#[derive(Debug, Default)]
pub struct MemoryStore<T> {
    doc: Mutex<T>,
}

impl<T> MemoryStore<T> {
    pub fn new(doc: T) -> Self {
        Self {
            doc: Mutex::new(doc),
        }
    }
}

impl<T: Clone + Send> DocumentStore<T> for MemoryStore<T> {
    fn load(&self) -> T {
        self.doc.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn save(&self, doc: &T) -> Result<()> {
        *self.doc.lock().unwrap_or_else(|e| e.into_inner()) = doc.clone();
        Ok(())
    }
}

/// A document plus the lock that serializes its read-modify-write cycles.
///
/// The lock is only ever held for synchronous work, never across an await.
pub struct Document<T> {
    backend: Box<dyn DocumentStore<T>>,
    write_lock: Mutex<()>,
}

impl<T> Document<T> {
    pub fn new(backend: impl DocumentStore<T> + 'static) -> Self {
        Self {
            backend: Box::new(backend),
            write_lock: Mutex::new(()),
        }
    }

    pub fn read(&self) -> T {
        self.backend.load()
    }

    /// Apply `f` to a freshly loaded copy and persist the result.
    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> Result<R> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut doc = self.backend.load();
        let result = f(&mut doc);
        self.backend.save(&doc)?;
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_memory_document_update() {
        let doc: Document<BTreeMap<String, u64>> = Document::new(MemoryStore::default());
        assert!(doc.read().is_empty());

        let previous = doc
            .update(|map| map.insert("a".to_string(), 1))
            .expect("update");
        assert_eq!(previous, None);

        let previous = doc
            .update(|map| map.insert("a".to_string(), 2))
            .expect("update");
        assert_eq!(previous, Some(1));
        assert_eq!(doc.read().get("a"), Some(&2));
    }
}
