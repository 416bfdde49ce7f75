//! Format constants and decoding limits.
//!
//! Every count and length read from a blob is checked against these bounds
//! before anything is allocated.

/// Magic bytes for an uncompressed blob.
pub const MAGIC_UNCOMPRESSED: &[u8] = b"FRM1";

/// Magic bytes for a zstd-compressed blob.
pub const MAGIC_COMPRESSED: &[u8] = b"FRM1Z";

/// Blob format version written by default.
pub const FORMAT_VERSION: u8 = 2;

/// Oldest blob format version this crate reads and writes.
pub const MIN_FORMAT_VERSION: u8 = 1;

/// First format version that records a unit next to timestamp columns.
/// Older versions hold nanosecond timestamps only.
pub const UNIT_TAGGED_VERSION: u8 = 2;

/// Maximum bytes in a LEB128 varint.
pub const MAX_VARINT_BYTES: usize = 10;

/// Maximum length of a single string cell or label in bytes.
pub const MAX_STRING_LEN: usize = 16 * 1024 * 1024;

/// Maximum number of rows in a table.
pub const MAX_ROWS: usize = 1 << 28;

/// Maximum number of column groups in a table.
pub const MAX_COLUMNS: usize = 1 << 16;

/// Maximum number of entries in a categorical vocabulary.
pub const MAX_CATEGORIES: usize = 1 << 20;

/// Maximum number of components in a multi-level label.
pub const MAX_LABEL_WIDTH: usize = 64;

/// Maximum nesting depth of tuple labels.
pub const MAX_LABEL_DEPTH: usize = 4;

/// Maximum size of a decompressed blob.
pub const MAX_BLOB_SIZE: usize = 1 << 30;
