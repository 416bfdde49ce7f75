//! Frame records: tables persisted on store nodes.
//!
//! - [`TextFrameRecord`]: JSON document attributes
//! - [`BinaryFrameRecord`]: a columnar blob plus a queryable attribute mirror
//!
//! [`FrameRecord`] picks the right wrapper for a loaded node, and
//! [`list_records`] summarizes every stored frame in a repository.

pub mod binary;
pub mod staging;
pub mod text;

pub use binary::BinaryFrameRecord;
pub use text::TextFrameRecord;

use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::codec::text::{COLUMNS_KEY, INDEX_KEY};
use crate::error::FrameError;
use crate::model::Table;
use crate::store::{AttributeStore, Node, Repository};

/// Node kind of text frame records.
pub const TEXT_KIND: &str = "dataframe.frame";

/// Node kind of binary frame records.
pub const BINARY_KIND: &str = "dataframe.binary";

/// Blob name used when none is given.
pub const DEFAULT_FILENAME: &str = "dataframe.bin";

pub const DATA_HASH_KEY: &str = "data_hash";
pub const FILENAME_KEY: &str = "filename";

/// A frame record of either kind.
#[derive(Debug, Clone)]
pub enum FrameRecord {
    Text(TextFrameRecord),
    Binary(BinaryFrameRecord),
}

impl FrameRecord {
    /// Wraps a node according to its kind.
    pub fn from_node(node: Node) -> Result<Self, FrameError> {
        match node.kind() {
            TEXT_KIND => Ok(FrameRecord::Text(TextFrameRecord::from_node(node)?)),
            BINARY_KIND => Ok(FrameRecord::Binary(BinaryFrameRecord::from_node(node)?)),
            other => Err(FrameError::TypeMismatch(format!(
                "node {} holds `{other}`, not a frame",
                node.uuid()
            ))),
        }
    }

    /// Loads a stored record.
    pub fn load(repository: &Repository, uuid: Uuid) -> Result<Self, FrameError> {
        Self::from_node(repository.load(uuid)?)
    }

    /// Returns an owned copy of the table.
    pub fn table(&mut self) -> Result<Table, FrameError> {
        match self {
            FrameRecord::Text(record) => record.table(),
            FrameRecord::Binary(record) => Ok(record.table()?.into_owned()),
        }
    }

    pub fn node(&self) -> &Node {
        match self {
            FrameRecord::Text(record) => record.node(),
            FrameRecord::Binary(record) => record.node(),
        }
    }
}

/// One line of a repository listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordSummary {
    pub uuid: Uuid,
    pub kind: String,
    /// Column labels as stored in the `columns` attribute.
    pub columns: Vec<String>,
    pub rows: usize,
}

impl RecordSummary {
    fn from_node(node: &Node) -> Self {
        let columns = list(node, COLUMNS_KEY)
            .iter()
            .map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect();
        Self {
            uuid: node.uuid(),
            kind: node.kind().to_string(),
            columns,
            rows: list(node, INDEX_KEY).len(),
        }
    }
}

fn list<'a>(node: &'a Node, key: &str) -> &'a [Value] {
    node.get_attribute(key)
        .and_then(Value::as_array)
        .map_or(&[], Vec::as_slice)
}

/// Summarizes every stored frame record, in store order.
pub fn list_records(repository: &Repository) -> Vec<RecordSummary> {
    repository
        .query()
        .kind(TEXT_KIND)
        .kind(BINARY_KIND)
        .all()
        .into_iter()
        .map(RecordSummary::from_node)
        .collect()
}
