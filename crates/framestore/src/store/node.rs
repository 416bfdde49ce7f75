use std::io::{Cursor, Read};

use rustc_hash::FxHashMap;
use serde_json::Value;
use uuid::Uuid;

use crate::error::StoreError;
use crate::limits::MAX_BLOB_SIZE;
use crate::store::{AttributeStore, BlobStore};

/// An attribute/blob container with a one-way draft -> stored lifecycle.
#[derive(Debug, Clone)]
pub struct Node {
    uuid: Uuid,
    kind: String,
    attributes: FxHashMap<String, Value>,
    blobs: FxHashMap<String, Vec<u8>>,
    stored: bool,
}

impl Node {
    /// Creates a draft node of the given kind.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            kind: kind.into(),
            attributes: FxHashMap::default(),
            blobs: FxHashMap::default(),
            stored: false,
        }
    }

    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    /// Record kind, used to pick the record type when loading.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn is_stored(&self) -> bool {
        self.stored
    }

    /// Marks the node as stored. Irreversible.
    pub(crate) fn freeze(&mut self) {
        self.stored = true;
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        if self.stored {
            return Err(StoreError::Immutable { uuid: self.uuid });
        }
        Ok(())
    }
}

impl AttributeStore for Node {
    fn set_attribute(&mut self, key: &str, value: Value) -> Result<(), StoreError> {
        self.check_writable()?;
        self.attributes.insert(key.to_string(), value);
        Ok(())
    }

    fn get_attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    fn clear_attributes(&mut self) -> Result<(), StoreError> {
        self.check_writable()?;
        self.attributes.clear();
        Ok(())
    }

    fn attributes(&self) -> Vec<(&str, &Value)> {
        let mut out: Vec<_> = self.attributes.iter().map(|(k, v)| (k.as_str(), v)).collect();
        out.sort_by_key(|(k, _)| *k);
        out
    }
}

impl BlobStore for Node {
    fn put_blob(&mut self, source: &mut dyn Read, name: &str) -> Result<(), StoreError> {
        self.check_writable()?;
        let mut bytes = Vec::new();
        source
            .take(MAX_BLOB_SIZE as u64 + 1)
            .read_to_end(&mut bytes)
            .map_err(|e| StoreError::Io(e.to_string()))?;
        if bytes.len() > MAX_BLOB_SIZE {
            return Err(StoreError::Io(format!(
                "blob `{name}` exceeds {MAX_BLOB_SIZE} bytes"
            )));
        }
        self.blobs.insert(name.to_string(), bytes);
        Ok(())
    }

    fn open_blob(&self, name: &str) -> Result<Box<dyn Read + '_>, StoreError> {
        let bytes = self.blobs.get(name).ok_or_else(|| StoreError::BlobNotFound {
            name: name.to_string(),
        })?;
        Ok(Box::new(Cursor::new(bytes.as_slice())))
    }

    fn blob_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.blobs.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
