//! Node storage.
//!
//! A [`Node`] carries JSON attributes and named blobs. It is writable while
//! it is a draft and frozen once a [`Repository`] stores it. Frame records
//! wrap a node and implement [`Storable`] to run their last checks before
//! the freeze.

pub mod filter;
pub mod node;
pub mod repository;

pub use filter::Filter;
pub use node::Node;
pub use repository::{Query, Repository};

use std::io::Read;

use serde_json::Value;

use crate::error::{FrameError, StoreError};

/// Key/value attributes of a node.
pub trait AttributeStore {
    /// Sets an attribute. Refused once the node is stored.
    fn set_attribute(&mut self, key: &str, value: Value) -> Result<(), StoreError>;

    fn get_attribute(&self, key: &str) -> Option<&Value>;

    /// Removes every attribute. Refused once the node is stored.
    fn clear_attributes(&mut self) -> Result<(), StoreError>;

    /// All attributes, sorted by key.
    fn attributes(&self) -> Vec<(&str, &Value)>;
}

/// Named binary files of a node.
pub trait BlobStore {
    /// Streams `source` into the blob `name`, replacing any previous blob of
    /// that name. Refused once the node is stored.
    fn put_blob(&mut self, source: &mut dyn Read, name: &str) -> Result<(), StoreError>;

    fn open_blob(&self, name: &str) -> Result<Box<dyn Read + '_>, StoreError>;

    /// Blob names, sorted.
    fn blob_names(&self) -> Vec<&str>;
}

/// A record backed by a node.
pub trait Storable {
    fn node(&self) -> &Node;

    fn node_mut(&mut self) -> &mut Node;

    /// Runs right before the node is frozen. An error aborts the store.
    fn before_store(&mut self) -> Result<(), FrameError> {
        Ok(())
    }
}
