//! Error types for table encoding/decoding, validation and record storage.

use thiserror::Error;
use uuid::Uuid;

use crate::model::{DType, TimeUnit};

/// Error codes for binary decoding failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// E001: Invalid magic/version
    InvalidMagicOrVersion,
    /// E002: Index out of bounds
    IndexOutOfBounds,
    /// E004: Invalid UTF-8 encoding
    InvalidUtf8,
    /// E005: Malformed varint/length/tag/encoding
    MalformedEncoding,
}

impl ErrorCode {
    /// Returns the error code string (e.g., "E001").
    pub fn code(&self) -> &'static str {
        match self {
            ErrorCode::InvalidMagicOrVersion => "E001",
            ErrorCode::IndexOutOfBounds => "E002",
            ErrorCode::InvalidUtf8 => "E004",
            ErrorCode::MalformedEncoding => "E005",
        }
    }
}

/// Error during binary blob decoding.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    // === E001: Invalid magic/version ===
    #[error("[E001] invalid magic bytes: expected FRM1 or FRM1Z, found {found:?}")]
    InvalidMagic { found: [u8; 4] },

    #[error("[E001] unsupported version: {version}")]
    UnsupportedVersion { version: u8 },

    // === E002: Index out of bounds ===
    #[error("[E002] {dict} index {index} out of bounds (size: {size})")]
    IndexOutOfBounds {
        dict: &'static str,
        index: usize,
        size: usize,
    },

    // === E004: Invalid UTF-8 ===
    #[error("[E004] invalid UTF-8 in {field}")]
    InvalidUtf8 { field: &'static str },

    // === E005: Malformed encoding ===
    #[error("[E005] unexpected end of input while reading {context}")]
    UnexpectedEof { context: &'static str },

    #[error("[E005] varint exceeds maximum length (10 bytes)")]
    VarintTooLong,

    #[error("[E005] varint overflow (value exceeds u64)")]
    VarintOverflow,

    #[error("[E005] {field} length {len} exceeds maximum {max}")]
    LengthExceedsLimit {
        field: &'static str,
        len: usize,
        max: usize,
    },

    #[error("[E005] invalid dtype tag: {tag}")]
    InvalidDType { tag: u8 },

    #[error("[E005] invalid time unit: {unit}")]
    InvalidTimeUnit { unit: u8 },

    #[error("[E005] invalid label tag: {tag}")]
    InvalidLabelTag { tag: u8 },

    #[error("[E005] invalid bool value: {value} (expected 0x00 or 0x01)")]
    InvalidBool { value: u8 },

    #[error("[E005] label nesting exceeds maximum depth {max}")]
    LabelTooDeep { max: usize },

    #[error("[E005] {count} trailing bytes after table body")]
    TrailingBytes { count: usize },

    #[error("[E005] decoded table is inconsistent: {0}")]
    InconsistentTable(TableError),

    #[error("[E005] malformed encoding: {context}")]
    MalformedEncoding { context: &'static str },

    // === Compression errors ===
    #[error("[E005] zstd decompression failed: {0}")]
    DecompressionFailed(String),

    #[error("[E005] decompressed size {actual} doesn't match declared {declared}")]
    UncompressedSizeMismatch { declared: usize, actual: usize },
}

impl DecodeError {
    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            DecodeError::InvalidMagic { .. } | DecodeError::UnsupportedVersion { .. } => {
                ErrorCode::InvalidMagicOrVersion
            }
            DecodeError::IndexOutOfBounds { .. } => ErrorCode::IndexOutOfBounds,
            DecodeError::InvalidUtf8 { .. } => ErrorCode::InvalidUtf8,
            _ => ErrorCode::MalformedEncoding,
        }
    }
}

/// Error during encoding (binary blob or text document).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EncodeError {
    #[error("{field} length {len} exceeds maximum {max}")]
    LengthExceedsLimit {
        field: &'static str,
        len: usize,
        max: usize,
    },

    #[error("cannot write format version {version}")]
    UnsupportedVersion { version: u8 },

    #[error("column `{column}` stores {unit:?} timestamps but format version {version} only holds nanoseconds")]
    TimestampPrecision {
        column: String,
        unit: TimeUnit,
        version: u8,
    },

    #[error("column `{column}` has dtype {dtype} which has no text encoding")]
    UnsupportedCell { column: String, dtype: DType },

    #[error("field name `{name}` is used by both the row index and a column")]
    DuplicateField { name: String },

    #[error("row index mixes flat labels and tuples of different widths")]
    RaggedIndex,

    #[error("zstd compression failed: {0}")]
    CompressionFailed(String),
}

/// Error raised when a table's shape or cell types are violated.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TableError {
    #[error("column `{column}` has {actual} rows but the index has {expected}")]
    LengthMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },

    #[error("column key `{key}` appears more than once")]
    DuplicateColumn { key: String },

    #[error("column `{column}` has category code {code} but only {size} categories")]
    CategoryCodeOutOfRange {
        column: String,
        code: u32,
        size: usize,
    },

    #[error("expected {expected} labels, got {actual}")]
    LabelCountMismatch { expected: usize, actual: usize },

    #[error("row {row} out of bounds ({len} rows)")]
    RowOutOfBounds { row: usize, len: usize },

    #[error("column `{column}` not found")]
    ColumnNotFound { column: String },

    #[error("cannot store {cell} in a {dtype} column")]
    CellTypeMismatch { dtype: DType, cell: String },

    #[error("category `{value}` is not part of the column's vocabulary")]
    UnknownCategory { value: String },
}

/// Error raised by the attribute/blob store collaborators.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    #[error("node {uuid} is stored and can no longer be modified")]
    Immutable { uuid: Uuid },

    #[error("node {uuid} was already stored")]
    AlreadyStored { uuid: Uuid },

    #[error("node {uuid} not found")]
    NodeNotFound { uuid: Uuid },

    #[error("blob `{name}` not found")]
    BlobNotFound { name: String },

    #[error("expected exactly one result, found {count}")]
    NotExactlyOne { count: usize },

    #[error("blob I/O failed: {0}")]
    Io(String),
}

/// Top-level error for frame records and the fidelity guard.
#[derive(Debug, Error)]
pub enum FrameError {
    /// The input is absent or does not hold a consistent table.
    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    /// The table cannot round-trip through the text encoding.
    #[error("the table `{table}` is not JSON-serializable and therefore cannot be stored: {reason}")]
    Serialization { table: String, reason: String },

    /// A temporal column is stored at a precision the active format cannot hold.
    #[error("{0}")]
    Precision(String),

    #[error("cannot update the table on a stored record")]
    ModificationNotAllowed,

    #[error("malformed document: {0}")]
    Deserialization(String),

    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Table(#[from] TableError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("staging I/O failed: {0}")]
    Io(#[from] std::io::Error),
}
