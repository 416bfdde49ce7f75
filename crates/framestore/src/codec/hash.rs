//! Content digest used to detect in-place edits.
//!
//! ```text
//! data_hash = hex(SHA-256("framestore:data-hash:" || rows || row labels
//!                         || (dtype tag || unit || payload)*))
//! ```
//!
//! Column labels are excluded, so renaming a column in place does not
//! change the digest. This is a change detector, not an integrity check of
//! the stored blob.

use sha2::{Digest, Sha256};

use crate::codec::binary::write_label;
use crate::codec::column::encode_column_data;
use crate::codec::primitives::Writer;
use crate::model::{DType, Table};

/// Domain separator prefix for the data hash.
const DATA_HASH_PREFIX: &[u8] = b"framestore:data-hash:";

/// Computes the hex-encoded data hash of a table.
pub fn data_hash(table: &Table) -> String {
    let mut hasher = Sha256::new();
    hasher.update(DATA_HASH_PREFIX);

    let mut writer = Writer::new();
    writer.write_varint(table.num_rows() as u64);
    for label in table.index() {
        write_label(&mut writer, label);
    }
    hasher.update(writer.as_bytes());

    for column in table.iter_columns() {
        let mut writer = Writer::new();
        let dtype = column.dtype();
        writer.write_byte(dtype.tag());
        if let DType::Timestamp(unit) = dtype {
            writer.write_byte(unit as u8);
        }
        encode_column_data(&mut writer, &column.data);
        hasher.update(writer.as_bytes());
    }

    format_hex(&hasher.finalize())
}

fn format_hex(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        s.push_str(&format!("{byte:02x}"));
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Cell, Label, TableBuilder};

    fn table() -> Table {
        TableBuilder::new()
            .int64("A", [1, 2])
            .text("B", ["x", "y"])
            .build()
            .unwrap()
    }

    #[test]
    fn test_hash_format() {
        let hash = data_hash(&table());
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_eq!(hash, data_hash(&table()));
    }

    #[test]
    fn test_hash_tracks_cells_and_index() {
        let base = data_hash(&table());

        let mut edited = table();
        edited.set(0, &Label::from("A"), Cell::Int(10)).unwrap();
        assert_ne!(data_hash(&edited), base);

        let mut reindexed = table();
        reindexed
            .set_index(crate::model::Index::new(vec!["r0".into(), "r1".into()]))
            .unwrap();
        assert_ne!(data_hash(&reindexed), base);
    }

    #[test]
    fn test_hash_ignores_column_labels() {
        let mut renamed = table();
        renamed.rename_columns(vec!["C".into(), "D".into()]).unwrap();
        assert_eq!(data_hash(&renamed), data_hash(&table()));
    }
}
