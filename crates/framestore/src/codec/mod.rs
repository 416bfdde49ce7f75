//! Table encoding/decoding.
//!
//! Two codecs share the [`Codec`] trait:
//! - [`TextCodec`]: JSON documents whose top-level keys become attributes
//! - [`BinaryCodec`]: versioned columnar blobs with an attribute mirror

pub mod binary;
pub mod column;
pub mod flatten;
pub mod hash;
pub mod primitives;
pub mod text;

#[cfg(test)]
mod proptest_tests;

pub use binary::{decode_table, decompress, encode_blob, encode_table, EncodedTable};
pub use flatten::{flatten, unflatten, DEFAULT_SEPARATOR};
pub use hash::data_hash;
pub use primitives::{Reader, Writer, zigzag_decode, zigzag_encode};
pub use text::{Document, Layout};

use crate::config::CodecConfig;
use crate::error::FrameError;
use crate::model::Table;
use crate::validate;

/// A table serialization.
pub trait Codec {
    /// The serialized form.
    type Encoded;

    /// Encodes a table, rejecting tables this codec cannot hold exactly.
    fn encode(&self, table: &Table) -> Result<Self::Encoded, FrameError>;

    /// Decodes a serialized table.
    fn decode(&self, encoded: Self::Encoded) -> Result<Table, FrameError>;
}

/// JSON document codec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextCodec {
    pub layout: Layout,
    pub separator: String,
}

impl TextCodec {
    pub fn new(layout: Layout) -> Self {
        Self {
            layout,
            separator: DEFAULT_SEPARATOR.to_string(),
        }
    }

    fn config(&self) -> CodecConfig {
        CodecConfig::default().with_separator(self.separator.clone())
    }
}

impl Default for TextCodec {
    fn default() -> Self {
        Self::new(Layout::default())
    }
}

impl Codec for TextCodec {
    type Encoded = Document;

    /// Encodes through the fidelity guard: the returned document is known to
    /// decode back to `table`.
    fn encode(&self, table: &Table) -> Result<Document, FrameError> {
        validate::check_text(table, self.layout, &self.config())
    }

    fn decode(&self, encoded: Document) -> Result<Table, FrameError> {
        text::decode(encoded, &self.separator)
    }
}

/// Columnar blob codec.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BinaryCodec {
    pub config: CodecConfig,
}

impl BinaryCodec {
    pub fn new(config: CodecConfig) -> Self {
        Self { config }
    }
}

impl Codec for BinaryCodec {
    type Encoded = EncodedTable;

    fn encode(&self, table: &Table) -> Result<EncodedTable, FrameError> {
        validate::check_structure(table, &self.config.separator)?;
        validate::check_binary(table, &self.config)?;
        Ok(encode_table(table, &self.config)?)
    }

    fn decode(&self, encoded: EncodedTable) -> Result<Table, FrameError> {
        let mirror = unflatten(&encoded.columns, true, &self.config.separator);
        Ok(decode_table(&encoded.blob, &mirror)?)
    }
}
