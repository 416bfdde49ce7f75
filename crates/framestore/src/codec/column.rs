//! Per-dtype column payload encoding.
//!
//! A payload holds exactly `rows` cells; the row count and dtype are written
//! by the enclosing column group, not here.
//!
//! | dtype        | payload                                           |
//! |--------------|---------------------------------------------------|
//! | bool         | one byte per cell                                 |
//! | int32, int64 | signed varint per cell                            |
//! | float32/64   | little-endian IEEE 754 per cell                   |
//! | string       | length-prefixed UTF-8 per cell                    |
//! | datetime64   | signed varint ticks per cell                      |
//! | category     | varint vocabulary size, strings, varint code/cell |
//! | complex128   | two little-endian f64 per cell                    |

use crate::codec::primitives::{Reader, Writer};
use crate::error::DecodeError;
use crate::limits::{MAX_CATEGORIES, MAX_STRING_LEN};
use crate::model::{ColumnData, DType};

/// Encodes the cells of a column.
pub fn encode_column_data(writer: &mut Writer, data: &ColumnData) {
    match data {
        ColumnData::Bool(values) => values.iter().for_each(|v| writer.write_bool(*v)),
        ColumnData::Int32(values) => values
            .iter()
            .for_each(|v| writer.write_signed_varint(i64::from(*v))),
        ColumnData::Int64(values) => values.iter().for_each(|v| writer.write_signed_varint(*v)),
        ColumnData::Float32(values) => values.iter().for_each(|v| writer.write_f32(*v)),
        ColumnData::Float64(values) => values.iter().for_each(|v| writer.write_f64(*v)),
        ColumnData::Text(values) => values.iter().for_each(|v| writer.write_string(v)),
        ColumnData::Timestamp { values, .. } => {
            values.iter().for_each(|v| writer.write_signed_varint(*v))
        }
        ColumnData::Categorical { categories, codes } => {
            writer.write_varint(categories.len() as u64);
            categories.iter().for_each(|c| writer.write_string(c));
            codes.iter().for_each(|c| writer.write_varint(u64::from(*c)));
        }
        ColumnData::Complex128(values) => values.iter().for_each(|(re, im)| {
            writer.write_f64(*re);
            writer.write_f64(*im);
        }),
    }
}

/// Decodes `rows` cells of the given dtype.
pub fn decode_column_data(
    reader: &mut Reader<'_>,
    dtype: DType,
    rows: usize,
) -> Result<ColumnData, DecodeError> {
    // Every cell takes at least one byte, so the remaining input bounds the
    // allocation even when `rows` is corrupt.
    let capacity = rows.min(reader.remaining_len());

    let data = match dtype {
        DType::Bool => ColumnData::Bool(read_cells(reader, rows, capacity, |r| {
            r.read_bool("bool cell")
        })?),
        DType::Int32 => ColumnData::Int32(read_cells(reader, rows, capacity, |r| {
            let v = r.read_signed_varint("int32 cell")?;
            i32::try_from(v).map_err(|_| DecodeError::MalformedEncoding {
                context: "int32 cell out of range",
            })
        })?),
        DType::Int64 => ColumnData::Int64(read_cells(reader, rows, capacity, |r| {
            r.read_signed_varint("int64 cell")
        })?),
        DType::Float32 => ColumnData::Float32(read_cells(reader, rows, capacity, |r| {
            r.read_f32("float32 cell")
        })?),
        DType::Float64 => ColumnData::Float64(read_cells(reader, rows, capacity, |r| {
            r.read_f64("float64 cell")
        })?),
        DType::Text => ColumnData::Text(read_cells(reader, rows, capacity, |r| {
            r.read_string(MAX_STRING_LEN, "string cell")
        })?),
        DType::Timestamp(unit) => ColumnData::Timestamp {
            unit,
            values: read_cells(reader, rows, capacity, |r| r.read_signed_varint("datetime cell"))?,
        },
        DType::Categorical => {
            let count = reader.read_len(MAX_CATEGORIES, "categories")?;
            let vocabulary_capacity = count.min(reader.remaining_len());
            let categories = read_cells(reader, count, vocabulary_capacity, |r| {
                r.read_string(MAX_STRING_LEN, "category")
            })?;
            let codes = read_cells(reader, rows, capacity, |r| {
                let code = r.read_varint("category code")?;
                if code >= count as u64 {
                    return Err(DecodeError::IndexOutOfBounds {
                        dict: "categories",
                        index: usize::try_from(code).unwrap_or(usize::MAX),
                        size: count,
                    });
                }
                Ok(code as u32)
            })?;
            ColumnData::Categorical { categories, codes }
        }
        DType::Complex128 => ColumnData::Complex128(read_cells(reader, rows, capacity, |r| {
            Ok((r.read_f64("complex cell")?, r.read_f64("complex cell")?))
        })?),
    };
    Ok(data)
}

fn read_cells<'a, T>(
    reader: &mut Reader<'a>,
    rows: usize,
    capacity: usize,
    mut read: impl FnMut(&mut Reader<'a>) -> Result<T, DecodeError>,
) -> Result<Vec<T>, DecodeError> {
    let mut out = Vec::with_capacity(capacity);
    for _ in 0..rows {
        out.push(read(reader)?);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TimeUnit;

    fn roundtrip(data: &ColumnData) -> ColumnData {
        let mut writer = Writer::new();
        encode_column_data(&mut writer, data);
        let mut reader = Reader::new(writer.as_bytes());
        let decoded = decode_column_data(&mut reader, data.dtype(), data.len()).unwrap();
        assert!(reader.is_empty());
        decoded
    }

    #[test]
    fn test_payloads_roundtrip() {
        let columns = [
            ColumnData::Bool(vec![true, false]),
            ColumnData::Int32(vec![i32::MIN, 0, i32::MAX]),
            ColumnData::Int64(vec![i64::MIN, -1, i64::MAX]),
            ColumnData::Float32(vec![1.5, f32::NAN]),
            ColumnData::Float64(vec![f64::NEG_INFINITY, f64::NAN, 0.1]),
            ColumnData::Text(vec![String::new(), "\u{1F600}".into()]),
            ColumnData::Timestamp {
                unit: TimeUnit::Microsecond,
                values: vec![-5, 1_710_513_000_123_456],
            },
            ColumnData::categorical(["b", "a", "b"]),
            ColumnData::Complex128(vec![(1.0, -2.0)]),
        ];
        for data in &columns {
            assert_eq!(&roundtrip(data), data);
        }
    }

    #[test]
    fn test_category_code_out_of_bounds() {
        let mut writer = Writer::new();
        writer.write_varint(1);
        writer.write_string("only");
        writer.write_varint(3);

        let mut reader = Reader::new(writer.as_bytes());
        let result = decode_column_data(&mut reader, DType::Categorical, 1);
        assert!(matches!(
            result,
            Err(DecodeError::IndexOutOfBounds { dict: "categories", index: 3, size: 1 })
        ));
    }

    #[test]
    fn test_truncated_payload() {
        let mut writer = Writer::new();
        writer.write_f64(1.0);
        let mut reader = Reader::new(writer.as_bytes());
        let result = decode_column_data(&mut reader, DType::Float64, 2);
        assert!(matches!(result, Err(DecodeError::UnexpectedEof { .. })));
    }

    #[test]
    fn test_int32_out_of_range() {
        let mut writer = Writer::new();
        writer.write_signed_varint(i64::from(i32::MAX) + 1);
        let mut reader = Reader::new(writer.as_bytes());
        let result = decode_column_data(&mut reader, DType::Int32, 1);
        assert!(matches!(result, Err(DecodeError::MalformedEncoding { .. })));
    }
}
