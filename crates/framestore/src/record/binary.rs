use std::borrow::Cow;

use serde_json::Value;

use crate::codec::text::{COLUMNS_KEY, INDEX_KEY, index_json};
use crate::codec::{BinaryCodec, Codec, EncodedTable, data_hash, decode_table, unflatten};
use crate::config::CodecConfig;
use crate::error::FrameError;
use crate::model::{Index, Table};
use crate::record::staging::{blob_name, stage_in, stage_out};
use crate::record::{BINARY_KIND, DATA_HASH_KEY, DEFAULT_FILENAME, FILENAME_KEY};
use crate::store::{AttributeStore, Node, Storable};
use crate::validate;

/// The in-memory copy of the blob.
#[derive(Debug, Clone)]
enum Cache {
    /// Not read yet; the blob is the source of truth.
    Unloaded,
    /// Decoded, or set by the writer. May hold edits the blob lacks.
    Loaded(Table),
}

/// A table stored as a columnar blob, with `columns`, `index` and
/// `data_hash` mirrored into attributes for queries.
///
/// While the record is a draft, [`table_mut`](Self::table_mut) hands out the
/// cached table for in-place edits; [`Storable::before_store`] re-encodes the
/// blob when those edits changed the data hash. Once stored, reads return
/// independent copies.
#[derive(Debug, Clone)]
pub struct BinaryFrameRecord {
    node: Node,
    codec: BinaryCodec,
    filename: String,
    cache: Cache,
}

impl BinaryFrameRecord {
    /// Creates a draft record with the process-wide codec configuration.
    ///
    /// `filename` defaults to [`DEFAULT_FILENAME`]; only its final path
    /// component is kept.
    pub fn new<'t>(
        table: impl Into<Option<&'t Table>>,
        filename: Option<&str>,
    ) -> Result<Self, FrameError> {
        Self::with_config(table, filename, CodecConfig::global().clone())
    }

    pub fn with_config<'t>(
        table: impl Into<Option<&'t Table>>,
        filename: Option<&str>,
        config: CodecConfig,
    ) -> Result<Self, FrameError> {
        let table = validate::ensure_table(table.into())?;
        let mut record = Self {
            node: Node::new(BINARY_KIND),
            codec: BinaryCodec::new(config),
            filename: blob_name(filename.unwrap_or(DEFAULT_FILENAME))?,
            cache: Cache::Unloaded,
        };
        record.set_table(table.clone())?;
        Ok(record)
    }

    /// Wraps a node written by a binary frame record. The blob is not read
    /// until the table is first accessed.
    pub fn from_node(node: Node) -> Result<Self, FrameError> {
        Self::from_node_with_config(node, CodecConfig::global().clone())
    }

    pub fn from_node_with_config(node: Node, config: CodecConfig) -> Result<Self, FrameError> {
        if node.kind() != BINARY_KIND {
            return Err(FrameError::TypeMismatch(format!(
                "node {} holds `{}`, not a binary frame",
                node.uuid(),
                node.kind()
            )));
        }
        let filename = match node.get_attribute(FILENAME_KEY) {
            Some(Value::String(name)) => name.clone(),
            Some(other) => {
                return Err(FrameError::Deserialization(format!(
                    "`{FILENAME_KEY}` must be a string, got {other}"
                )));
            }
            None => DEFAULT_FILENAME.to_string(),
        };
        Ok(Self {
            node,
            codec: BinaryCodec::new(config),
            filename,
            cache: Cache::Unloaded,
        })
    }

    /// Returns the table, reading the blob on first access.
    ///
    /// Drafts lend the cached table; stored records return a deep copy so
    /// callers can never alter what was persisted.
    pub fn table(&mut self) -> Result<Cow<'_, Table>, FrameError> {
        let stored = self.node.is_stored();
        let table = self.load()?;
        Ok(if stored {
            Cow::Owned(table.clone())
        } else {
            Cow::Borrowed(table)
        })
    }

    /// Returns the live cached table for in-place edits. Drafts only.
    pub fn table_mut(&mut self) -> Result<&mut Table, FrameError> {
        if self.node.is_stored() {
            return Err(FrameError::ModificationNotAllowed);
        }
        self.load()
    }

    /// Validates and encodes `table`, then replaces blob, mirror and cache.
    ///
    /// Nothing is written unless every check passes.
    pub fn set_table(&mut self, table: Table) -> Result<(), FrameError> {
        if self.node.is_stored() {
            return Err(FrameError::ModificationNotAllowed);
        }
        let encoded = self.codec.encode(&table)?;
        self.write(encoded)?;
        self.cache = Cache::Loaded(table);
        Ok(())
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// The data hash mirrored at the last encode.
    pub fn data_hash(&self) -> Option<&str> {
        self.node.get_attribute(DATA_HASH_KEY).and_then(Value::as_str)
    }

    pub fn config(&self) -> &CodecConfig {
        &self.codec.config
    }

    pub fn node(&self) -> &Node {
        &self.node
    }

    pub fn into_node(self) -> Node {
        self.node
    }

    fn load(&mut self) -> Result<&mut Table, FrameError> {
        if let Cache::Unloaded = self.cache {
            let bytes = stage_in(&self.node, &self.filename)?;
            let mirror = self.columns_mirror()?;
            let table = decode_table(&bytes, &mirror)?;
            log::debug!(
                "loaded {}x{} table from node {}",
                table.num_rows(),
                table.num_columns(),
                self.node.uuid()
            );
            self.cache = Cache::Loaded(table);
        }
        match &mut self.cache {
            Cache::Loaded(table) => Ok(table),
            Cache::Unloaded => Err(FrameError::Deserialization(
                "table cache was not populated".to_string(),
            )),
        }
    }

    fn columns_mirror(&self) -> Result<Index, FrameError> {
        let keys = match self.node.get_attribute(COLUMNS_KEY) {
            None => Vec::new(),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| {
                    item.as_str().map(str::to_string).ok_or_else(|| {
                        FrameError::Deserialization(format!(
                            "`{COLUMNS_KEY}` entries must be strings, got {item}"
                        ))
                    })
                })
                .collect::<Result<Vec<_>, _>>()?,
            Some(other) => {
                return Err(FrameError::Deserialization(format!(
                    "`{COLUMNS_KEY}` must be a list, got {other}"
                )));
            }
        };
        Ok(unflatten(&keys, true, &self.codec.config.separator))
    }

    fn write(&mut self, encoded: EncodedTable) -> Result<(), FrameError> {
        stage_out(&mut self.node, &self.filename, &encoded.blob)?;
        let columns = encoded.columns.into_iter().map(Value::String).collect();
        self.node.set_attribute(COLUMNS_KEY, Value::Array(columns))?;
        self.node.set_attribute(INDEX_KEY, index_json(&encoded.index))?;
        self.node.set_attribute(DATA_HASH_KEY, Value::String(encoded.data_hash))?;
        self.node.set_attribute(FILENAME_KEY, Value::String(self.filename.clone()))?;
        Ok(())
    }
}

impl Storable for BinaryFrameRecord {
    fn node(&self) -> &Node {
        &self.node
    }

    fn node_mut(&mut self) -> &mut Node {
        &mut self.node
    }

    /// Re-encodes the blob when the cached table was edited in place.
    fn before_store(&mut self) -> Result<(), FrameError> {
        let Cache::Loaded(table) = &self.cache else {
            return Ok(());
        };
        let hash = data_hash(table);
        if self.data_hash() == Some(hash.as_str()) {
            return Ok(());
        }
        log::warn!(
            "table of node {} changed in place since its last encode; re-encoding `{}`",
            self.node.uuid(),
            self.filename
        );
        let encoded = self.codec.encode(table)?;
        self.write(encoded)
    }
}
