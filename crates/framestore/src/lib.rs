//! framestore: immutable, queryable storage records for labeled tables.
//!
//! A table (typed columns with flat or multi-level row and column labels) is
//! persisted on a store node in one of two ways:
//! - **Text**: a JSON document whose top-level keys become node attributes
//! - **Binary**: a versioned columnar blob, with the column labels, row
//!   labels and a data hash mirrored into attributes for queries
//!
//! Both paths run a fidelity guard first, so a record is only written when
//! it will read back exactly as given.
//!
//! # Quick Start
//!
//! ```rust
//! use framestore::model::TableBuilder;
//! use framestore::store::{Filter, Repository};
//! use framestore::{BinaryFrameRecord, FrameRecord};
//!
//! let table = TableBuilder::new()
//!     .float64("A", [1.0, 2.0, 3.0])
//!     .text("F", ["foo", "foo", "foo"])
//!     .build()
//!     .unwrap();
//!
//! let mut repository = Repository::new();
//! let mut record = BinaryFrameRecord::new(&table, None).unwrap();
//! let uuid = repository.store(&mut record).unwrap();
//!
//! let hit = repository
//!     .query()
//!     .filter(Filter::contains("columns", ["A"]))
//!     .one()
//!     .unwrap();
//! assert_eq!(hit.uuid(), uuid);
//!
//! let mut loaded = FrameRecord::load(&repository, uuid).unwrap();
//! assert_eq!(loaded.table().unwrap(), table);
//! ```
//!
//! # Modules
//!
//! - [`model`]: Table, Index, Label, Column and the table builder
//! - [`codec`]: JSON and binary encodings, label flattening, data hash
//! - [`validate`]: The fidelity guard
//! - [`store`]: Nodes, the in-memory repository and attribute queries
//! - [`record`]: Text and binary frame records
//! - [`config`]: Codec configuration
//! - [`error`]: Error types
//! - [`limits`]: Format constants and decoding limits
//!
//! # Wire Format
//!
//! Blobs are either uncompressed (`FRM1` magic + version + body) or
//! compressed (`FRM1Z` magic + uncompressed size + zstd frame). The decoder
//! detects both.

pub mod codec;
pub mod config;
pub mod error;
pub mod limits;
pub mod model;
pub mod record;
pub mod store;
pub mod util;
pub mod validate;

// Re-export commonly used types at crate root
pub use codec::{BinaryCodec, Codec, Document, Layout, TextCodec};
pub use config::CodecConfig;
pub use error::{DecodeError, EncodeError, FrameError, StoreError, TableError};
pub use model::{Cell, Column, ColumnData, DType, Index, Label, Table, TableBuilder, TimeUnit};
pub use record::{
    BinaryFrameRecord, FrameRecord, RecordSummary, TextFrameRecord, list_records,
};
pub use store::{Filter, Node, Repository};
pub use validate::{check_binary, check_structure, check_text, ensure_table};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
