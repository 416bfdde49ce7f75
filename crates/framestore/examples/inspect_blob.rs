//! Simple decoder to inspect framestore blobs.

use std::fs;

use framestore::codec::binary::read_header;
use framestore::codec::{Reader, decode_table, decompress};
use framestore::limits::MAGIC_COMPRESSED;
use framestore::model::Index;

fn main() {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "dataframe.bin".to_string());

    println!("Reading: {}", path);

    let data = fs::read(&path).expect("Failed to read file");
    println!("File size: {} bytes", data.len());

    let compressed = data.starts_with(MAGIC_COMPRESSED);
    let raw = if compressed {
        decompress(&data).expect("Failed to decompress")
    } else {
        data.clone()
    };
    let version = read_header(&mut Reader::new(&raw)).expect("Failed to read header");

    println!("\n=== Blob Info ===");
    println!("Format version: {}", version);
    if compressed {
        println!(
            "Compressed: {} -> {} bytes ({:.1}%)",
            data.len(),
            raw.len(),
            data.len() as f64 / raw.len() as f64 * 100.0
        );
    } else {
        println!("Compressed: no");
    }

    // Group-less zero-row blobs need the attribute mirror for their labels.
    let table = decode_table(&data, &Index::default()).expect("Failed to decode");

    println!("\n=== Columns ({}) ===", table.num_columns());
    for column in table.iter_columns() {
        println!("  {} : {}", column.label, column.dtype());
    }

    println!("\n=== Rows ({}) ===", table.num_rows());
    if table.index().is_multilevel() {
        println!("Index levels: {}", table.index().nlevels());
    }

    println!("\n=== First 20 Rows (detail) ===");
    for row in 0..table.num_rows().min(20) {
        let label = table.index().get(row).map(ToString::to_string).unwrap_or_default();
        let cells: Vec<String> = table
            .iter_columns()
            .map(|column| column.data.display_cell(row))
            .collect();
        println!("[{}] {}", label, cells.join(", "));
    }
    if table.num_rows() > 20 {
        println!("... and {} more rows", table.num_rows() - 20);
    }
}
