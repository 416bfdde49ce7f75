//! Binary blob encoding/decoding.
//!
//! Blob layout (uncompressed):
//!
//! ```text
//! magic "FRM1" | version: u8 | rows: varint | row labels
//! | groups: varint | group*
//!
//! group = label | dtype tag: u8 | [time unit: u8] | payload
//! label = 0x00 zigzag-varint | 0x01 string | 0x02 varint width, label*
//! ```
//!
//! The time unit byte is present for timestamp groups from
//! [`UNIT_TAGGED_VERSION`] on; older blobs hold nanoseconds only. Zero-row
//! tables keep one group per column with an empty payload. Blobs written
//! without any groups for a table that had columns are rebuilt from the
//! `columns` attribute mirror.
//!
//! Compressed blobs are `"FRM1Z" | uncompressed size: varint | zstd frame`,
//! where the frame holds a complete uncompressed blob.

use std::io::Read;

use crate::codec::column::{decode_column_data, encode_column_data};
use crate::codec::flatten::flatten;
use crate::codec::hash::data_hash;
use crate::codec::primitives::{Reader, Writer};
use crate::config::CodecConfig;
use crate::error::{DecodeError, EncodeError};
use crate::limits::{
    FORMAT_VERSION, MAGIC_COMPRESSED, MAGIC_UNCOMPRESSED, MAX_BLOB_SIZE, MAX_CATEGORIES,
    MAX_COLUMNS, MAX_LABEL_DEPTH, MAX_LABEL_WIDTH, MAX_ROWS, MAX_STRING_LEN, MIN_FORMAT_VERSION,
    UNIT_TAGGED_VERSION,
};
use crate::model::{Column, ColumnData, DType, Index, Label, Table, TimeUnit};

const LABEL_INT: u8 = 0;
const LABEL_STR: u8 = 1;
const LABEL_TUPLE: u8 = 2;

/// Output of [`encode_table`]: the blob plus its queryable attribute mirror.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedTable {
    pub blob: Vec<u8>,
    /// Flattened column keys.
    pub columns: Vec<String>,
    /// Raw row labels, never flattened.
    pub index: Index,
    /// Hex SHA-256 over row labels and cells.
    pub data_hash: String,
}

// =============================================================================
// DECODING
// =============================================================================

/// Decompresses a `FRM1Z` blob into the uncompressed blob it wraps.
pub fn decompress(input: &[u8]) -> Result<Vec<u8>, DecodeError> {
    if input.len() < MAGIC_COMPRESSED.len() {
        return Err(DecodeError::UnexpectedEof { context: "magic" });
    }
    if &input[..MAGIC_COMPRESSED.len()] != MAGIC_COMPRESSED {
        return Err(invalid_magic(input));
    }
    decompress_zstd(&input[MAGIC_COMPRESSED.len()..])
}

fn decompress_zstd(compressed: &[u8]) -> Result<Vec<u8>, DecodeError> {
    let mut reader = Reader::new(compressed);
    let declared_size = reader.read_len(MAX_BLOB_SIZE, "uncompressed_size")?;

    let decoder = zstd::Decoder::new(reader.remaining())
        .map_err(|e| DecodeError::DecompressionFailed(e.to_string()))?;

    // Read one byte past the declared size so an oversized frame is caught
    // without inflating it completely.
    let mut decompressed = Vec::with_capacity(declared_size);
    decoder
        .take(declared_size as u64 + 1)
        .read_to_end(&mut decompressed)
        .map_err(|e| DecodeError::DecompressionFailed(e.to_string()))?;

    if decompressed.len() != declared_size {
        return Err(DecodeError::UncompressedSizeMismatch {
            declared: declared_size,
            actual: decompressed.len(),
        });
    }
    Ok(decompressed)
}

fn invalid_magic(input: &[u8]) -> DecodeError {
    let mut found = [0u8; 4];
    let n = input.len().min(4);
    found[..n].copy_from_slice(&input[..n]);
    DecodeError::InvalidMagic { found }
}

/// Reads the magic and version of an uncompressed blob.
pub fn read_header(reader: &mut Reader<'_>) -> Result<u8, DecodeError> {
    let magic = reader.read_bytes(MAGIC_UNCOMPRESSED.len(), "magic")?;
    if magic != MAGIC_UNCOMPRESSED {
        return Err(invalid_magic(magic));
    }
    let version = reader.read_byte("version")?;
    if !(MIN_FORMAT_VERSION..=FORMAT_VERSION).contains(&version) {
        return Err(DecodeError::UnsupportedVersion { version });
    }
    Ok(version)
}

/// Decodes a table from a compressed or uncompressed blob.
///
/// `columns_mirror` supplies the column labels of zero-row blobs that carry
/// no column groups; those columns come back as empty string columns.
pub fn decode_table(input: &[u8], columns_mirror: &Index) -> Result<Table, DecodeError> {
    if input.len() > MAX_BLOB_SIZE {
        return Err(DecodeError::LengthExceedsLimit {
            field: "blob",
            len: input.len(),
            max: MAX_BLOB_SIZE,
        });
    }
    if input.starts_with(MAGIC_COMPRESSED) {
        let decompressed = decompress(input)?;
        return decode_uncompressed(&decompressed, columns_mirror);
    }
    decode_uncompressed(input, columns_mirror)
}

fn decode_uncompressed(input: &[u8], columns_mirror: &Index) -> Result<Table, DecodeError> {
    let mut reader = Reader::new(input);
    let version = read_header(&mut reader)?;

    let rows = reader.read_len(MAX_ROWS, "rows")?;
    let mut labels = Vec::with_capacity(rows.min(reader.remaining_len()));
    for _ in 0..rows {
        labels.push(decode_label(&mut reader, 0)?);
    }
    let index = Index::new(labels);

    let groups = reader.read_len(MAX_COLUMNS, "column groups")?;
    let mut columns = Vec::with_capacity(groups.min(reader.remaining_len()));
    for _ in 0..groups {
        columns.push(decode_group(&mut reader, version, rows)?);
    }

    if !reader.is_empty() {
        return Err(DecodeError::TrailingBytes {
            count: reader.remaining_len(),
        });
    }

    if groups == 0 && !columns_mirror.is_empty() {
        if rows > 0 {
            return Err(DecodeError::MalformedEncoding {
                context: "blob with rows has no column groups",
            });
        }
        log::debug!(
            "rebuilding {} empty columns from the attribute mirror",
            columns_mirror.len()
        );
        columns = columns_mirror
            .iter()
            .map(|label| Column::new(label.clone(), ColumnData::empty(DType::Text)))
            .collect();
    }

    Table::new(index, columns).map_err(DecodeError::InconsistentTable)
}

fn decode_group(reader: &mut Reader<'_>, version: u8, rows: usize) -> Result<Column, DecodeError> {
    let label = decode_label(reader, 0)?;
    let tag = reader.read_byte("dtype")?;
    let timestamp_tag = DType::Timestamp(TimeUnit::Nanosecond).tag();
    let unit = if tag == timestamp_tag && version >= UNIT_TAGGED_VERSION {
        let unit = reader.read_byte("time unit")?;
        TimeUnit::from_u8(unit).ok_or(DecodeError::InvalidTimeUnit { unit })?
    } else {
        TimeUnit::Nanosecond
    };
    let dtype = DType::from_tag(tag, unit).ok_or(DecodeError::InvalidDType { tag })?;
    let data = decode_column_data(reader, dtype, rows)?;
    Ok(Column::new(label, data))
}

fn decode_label(reader: &mut Reader<'_>, depth: usize) -> Result<Label, DecodeError> {
    match reader.read_byte("label tag")? {
        LABEL_INT => Ok(Label::Int(reader.read_signed_varint("int label")?)),
        LABEL_STR => Ok(Label::Str(reader.read_string(MAX_STRING_LEN, "label")?)),
        LABEL_TUPLE => {
            if depth >= MAX_LABEL_DEPTH {
                return Err(DecodeError::LabelTooDeep {
                    max: MAX_LABEL_DEPTH,
                });
            }
            let width = reader.read_len(MAX_LABEL_WIDTH, "label width")?;
            let mut parts = Vec::with_capacity(width);
            for _ in 0..width {
                parts.push(decode_label(reader, depth + 1)?);
            }
            Ok(Label::Tuple(parts))
        }
        tag => Err(DecodeError::InvalidLabelTag { tag }),
    }
}

// =============================================================================
// ENCODING
// =============================================================================

/// Encodes a table and derives its attribute mirror.
pub fn encode_table(table: &Table, config: &CodecConfig) -> Result<EncodedTable, EncodeError> {
    let blob = encode_blob(table, config)?;
    let (columns, _) = flatten(&table.columns(), &config.separator);
    Ok(EncodedTable {
        blob,
        columns,
        index: table.index().clone(),
        data_hash: data_hash(table),
    })
}

/// Encodes a table to a blob, compressed when `config.compression_level`
/// is set.
pub fn encode_blob(table: &Table, config: &CodecConfig) -> Result<Vec<u8>, EncodeError> {
    let version = config.format_version;
    if !(MIN_FORMAT_VERSION..=FORMAT_VERSION).contains(&version) {
        return Err(EncodeError::UnsupportedVersion { version });
    }
    check_limits(table, version)?;

    let mut writer = Writer::with_capacity(64 + table.num_rows() * (table.num_columns() + 1) * 8);
    writer.write_bytes(MAGIC_UNCOMPRESSED);
    writer.write_byte(version);

    writer.write_varint(table.num_rows() as u64);
    for label in table.index() {
        write_label(&mut writer, label);
    }

    writer.write_varint(table.num_columns() as u64);
    for column in table.iter_columns() {
        write_label(&mut writer, &column.label);
        let dtype = column.dtype();
        writer.write_byte(dtype.tag());
        if let DType::Timestamp(unit) = dtype {
            if version >= UNIT_TAGGED_VERSION {
                writer.write_byte(unit as u8);
            }
        }
        encode_column_data(&mut writer, &column.data);
    }

    let uncompressed = writer.into_bytes();
    match config.compression_level {
        None => Ok(uncompressed),
        Some(level) => {
            let compressed = zstd::encode_all(uncompressed.as_slice(), level)
                .map_err(|e| EncodeError::CompressionFailed(e.to_string()))?;
            let mut writer = Writer::with_capacity(MAGIC_COMPRESSED.len() + 10 + compressed.len());
            writer.write_bytes(MAGIC_COMPRESSED);
            writer.write_varint(uncompressed.len() as u64);
            writer.write_bytes(&compressed);
            Ok(writer.into_bytes())
        }
    }
}

/// Writes a label. Limits are enforced separately by [`check_label`].
pub(crate) fn write_label(writer: &mut Writer, label: &Label) {
    match label {
        Label::Int(v) => {
            writer.write_byte(LABEL_INT);
            writer.write_signed_varint(*v);
        }
        Label::Str(s) => {
            writer.write_byte(LABEL_STR);
            writer.write_string(s);
        }
        Label::Tuple(parts) => {
            writer.write_byte(LABEL_TUPLE);
            writer.write_varint(parts.len() as u64);
            for part in parts {
                write_label(writer, part);
            }
        }
    }
}

fn check_len(field: &'static str, len: usize, max: usize) -> Result<(), EncodeError> {
    if len > max {
        return Err(EncodeError::LengthExceedsLimit { field, len, max });
    }
    Ok(())
}

fn check_label(label: &Label, depth: usize) -> Result<(), EncodeError> {
    match label {
        Label::Int(_) => Ok(()),
        Label::Str(s) => check_len("label", s.len(), MAX_STRING_LEN),
        Label::Tuple(parts) => {
            check_len("label depth", depth + 1, MAX_LABEL_DEPTH)?;
            check_len("label width", parts.len(), MAX_LABEL_WIDTH)?;
            parts.iter().try_for_each(|p| check_label(p, depth + 1))
        }
    }
}

/// Rejects tables the decoder would refuse.
fn check_limits(table: &Table, version: u8) -> Result<(), EncodeError> {
    check_len("rows", table.num_rows(), MAX_ROWS)?;
    check_len("column groups", table.num_columns(), MAX_COLUMNS)?;
    table.index().iter().try_for_each(|l| check_label(l, 0))?;

    for column in table.iter_columns() {
        check_label(&column.label, 0)?;
        match &column.data {
            ColumnData::Text(values) => values
                .iter()
                .try_for_each(|v| check_len("string cell", v.len(), MAX_STRING_LEN))?,
            ColumnData::Categorical { categories, .. } => {
                check_len("categories", categories.len(), MAX_CATEGORIES)?;
                categories
                    .iter()
                    .try_for_each(|c| check_len("category", c.len(), MAX_STRING_LEN))?;
            }
            ColumnData::Timestamp { unit, .. }
                if version < UNIT_TAGGED_VERSION && *unit != TimeUnit::Nanosecond =>
            {
                return Err(EncodeError::TimestampPrecision {
                    column: column.label.to_string(),
                    unit: *unit,
                    version,
                });
            }
            _ => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::model::TableBuilder;

    fn make_test_table() -> Table {
        TableBuilder::new()
            .index_tuples([["AA", "one"], ["AA", "two"], ["BB", "one"]])
            .int64(("One", "X"), [1, -2, i64::MAX])
            .float32(("One", "Y"), [0.5, f32::NAN, -1.0])
            .timestamp("when", TimeUnit::Millisecond, [0, 1_710_513_000_123, -1])
            .categorical("split", ["train", "test", "train"])
            .complex128("z", [(1.0, 2.0), (0.0, -1.0), (f64::NAN, 0.0)])
            .build()
            .unwrap()
    }

    #[test]
    fn test_table_roundtrip() {
        let table = make_test_table();
        let encoded = encode_table(&table, &CodecConfig::default()).unwrap();
        let decoded = decode_table(&encoded.blob, &Index::default()).unwrap();
        assert_eq!(decoded, table);
    }

    #[test]
    fn test_attribute_mirror() {
        let table = make_test_table();
        let encoded = encode_table(&table, &CodecConfig::default()).unwrap();
        assert_eq!(encoded.columns, ["One___X", "One___Y", "when", "split", "z"]);
        assert_eq!(&encoded.index, table.index());
        assert_eq!(encoded.data_hash, data_hash(&table));
    }

    #[test]
    fn test_compressed_roundtrip() {
        let table = make_test_table();
        let config = CodecConfig::default().with_compression(3);
        let blob = encode_blob(&table, &config).unwrap();
        assert_eq!(&blob[0..5], MAGIC_COMPRESSED);
        assert_eq!(decode_table(&blob, &Index::default()).unwrap(), table);

        let inner = decompress(&blob).unwrap();
        assert_eq!(&inner[0..4], MAGIC_UNCOMPRESSED);
    }

    #[test]
    fn test_empty_table_keeps_groups() {
        let table = Table::new(
            Index::default(),
            vec![
                Column::new(0i64, ColumnData::Int64(vec![])),
                Column::new("a___b", ColumnData::Float64(vec![])),
                Column::new("when", ColumnData::empty(DType::Timestamp(TimeUnit::Second))),
                Column::new("split", ColumnData::categorical(Vec::<String>::new())),
            ],
        )
        .unwrap();
        let encoded = encode_table(&table, &CodecConfig::default()).unwrap();
        assert_eq!(encoded.columns, ["0", "a___b", "when", "split"]);

        // The mirror is ignored once the blob carries its own groups.
        let mirror = Index::new(vec!["X".into()]);
        let decoded = decode_table(&encoded.blob, &mirror).unwrap();
        assert_eq!(decoded, table);
        assert_eq!(decoded.columns().labels()[0], Label::Int(0));
        assert_eq!(
            decoded.dtypes(),
            [
                DType::Int64,
                DType::Float64,
                DType::Timestamp(TimeUnit::Second),
                DType::Categorical
            ]
        );
    }

    #[test]
    fn test_groupless_empty_blob_uses_mirror() {
        let mut writer = Writer::new();
        writer.write_bytes(MAGIC_UNCOMPRESSED);
        writer.write_byte(FORMAT_VERSION);
        writer.write_varint(0);
        writer.write_varint(0);

        let mirror = Index::new(vec!["A".into(), "B".into()]);
        let decoded = decode_table(writer.as_bytes(), &mirror).unwrap();
        assert_eq!(decoded, Table::empty(["A", "B"], DType::Text).unwrap());
    }

    #[test]
    fn test_rows_without_groups_rejected() {
        let mut writer = Writer::new();
        writer.write_bytes(MAGIC_UNCOMPRESSED);
        writer.write_byte(FORMAT_VERSION);
        writer.write_varint(1);
        write_label(&mut writer, &Label::Int(0));
        writer.write_varint(0);

        let mirror = Index::new(vec!["A".into()]);
        let result = decode_table(writer.as_bytes(), &mirror);
        assert!(matches!(result, Err(DecodeError::MalformedEncoding { .. })));
    }

    #[test]
    fn test_version_one_timestamps() {
        let table = TableBuilder::new()
            .timestamp("t", TimeUnit::Nanosecond, [1, 2])
            .build()
            .unwrap();
        let v1 = CodecConfig::for_format_version(1);
        let blob = encode_blob(&table, &v1).unwrap();
        assert_eq!(blob[4], 1);
        assert_eq!(decode_table(&blob, &Index::default()).unwrap(), table);

        let coarse = TableBuilder::new()
            .timestamp("t", TimeUnit::Second, [1])
            .build()
            .unwrap();
        assert!(matches!(
            encode_blob(&coarse, &v1),
            Err(EncodeError::TimestampPrecision { version: 1, .. })
        ));
    }

    #[test]
    fn test_invalid_magic() {
        let result = decode_table(b"XXXX\x02", &Index::default());
        let err = result.unwrap_err();
        assert!(matches!(err, DecodeError::InvalidMagic { .. }));
        assert_eq!(err.code(), ErrorCode::InvalidMagicOrVersion);
    }

    #[test]
    fn test_unsupported_version() {
        let mut data = MAGIC_UNCOMPRESSED.to_vec();
        data.push(99);
        data.extend_from_slice(&[0u8; 16]);
        let result = decode_table(&data, &Index::default());
        assert!(matches!(result, Err(DecodeError::UnsupportedVersion { version: 99 })));
        assert!(matches!(
            encode_blob(&make_test_table(), &CodecConfig::for_format_version(0)),
            Err(EncodeError::UnsupportedVersion { version: 0 })
        ));
    }

    #[test]
    fn test_trailing_bytes() {
        let mut blob = encode_blob(&make_test_table(), &CodecConfig::default()).unwrap();
        blob.push(0);
        assert!(matches!(
            decode_table(&blob, &Index::default()),
            Err(DecodeError::TrailingBytes { count: 1 })
        ));
    }

    #[test]
    fn test_truncated_blob() {
        let blob = encode_blob(&make_test_table(), &CodecConfig::default()).unwrap();
        for cut in [3, 5, blob.len() / 2, blob.len() - 1] {
            assert!(decode_table(&blob[..cut], &Index::default()).is_err(), "cut at {cut}");
        }
    }

    #[test]
    fn test_invalid_dtype_tag() {
        let mut writer = Writer::new();
        writer.write_bytes(MAGIC_UNCOMPRESSED);
        writer.write_byte(FORMAT_VERSION);
        writer.write_varint(0);
        writer.write_varint(1);
        write_label(&mut writer, &Label::from("A"));
        writer.write_byte(42);
        assert!(matches!(
            decode_table(writer.as_bytes(), &Index::default()),
            Err(DecodeError::InvalidDType { tag: 42 })
        ));
    }

    #[test]
    fn test_label_depth_limit() {
        let mut label = Label::from("leaf");
        for _ in 0..=MAX_LABEL_DEPTH {
            label = Label::Tuple(vec![label]);
        }
        let table = Table::new(Index::new(vec![label.clone()]), vec![]).unwrap();
        assert!(matches!(
            encode_blob(&table, &CodecConfig::default()),
            Err(EncodeError::LengthExceedsLimit { field: "label depth", .. })
        ));

        let mut writer = Writer::new();
        writer.write_bytes(MAGIC_UNCOMPRESSED);
        writer.write_byte(FORMAT_VERSION);
        writer.write_varint(1);
        write_label(&mut writer, &label);
        writer.write_varint(0);
        assert!(matches!(
            decode_table(writer.as_bytes(), &Index::default()),
            Err(DecodeError::LabelTooDeep { .. })
        ));
    }

    #[test]
    fn test_size_mismatch() {
        let blob = encode_blob(&make_test_table(), &CodecConfig::default()).unwrap();
        let compressed = zstd::encode_all(blob.as_slice(), 3).unwrap();
        let mut writer = Writer::new();
        writer.write_bytes(MAGIC_COMPRESSED);
        writer.write_varint(blob.len() as u64 + 7);
        writer.write_bytes(&compressed);
        assert!(matches!(
            decode_table(writer.as_bytes(), &Index::default()),
            Err(DecodeError::UncompressedSizeMismatch { .. })
        ));
    }
}
