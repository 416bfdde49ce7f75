//! Benchmark for framestore codecs using city data.
//!
//! Encodes one table through every text layout and through the binary codec
//! (uncompressed and zstd), then reports sizes and timings. Without a data
//! file a synthetic table of 150k rows is generated.

use std::fs;
use std::path::Path;
use std::time::Instant;

use framestore::codec::{BinaryCodec, Codec, TextCodec};
use framestore::limits::FORMAT_VERSION;
use framestore::{CodecConfig, Layout, Table, TableBuilder};
use serde::Deserialize;

const SYNTHETIC_ROWS: usize = 150_000;

const COUNTRIES: [&str; 8] = ["US", "DE", "FR", "BR", "IN", "JP", "NG", "AU"];
const TIMEZONES: [&str; 6] = [
    "America/New_York",
    "Europe/Berlin",
    "Europe/Paris",
    "America/Sao_Paulo",
    "Asia/Kolkata",
    "Asia/Tokyo",
];

// =============================================================================
// JSON DATA STRUCTURES
// =============================================================================

#[derive(Debug, Deserialize)]
struct City {
    id: u32,
    name: String,
    country_code: String,
    latitude: String,
    longitude: String,
    population: Option<i64>,
    timezone: Option<String>,
}

fn synthetic_cities(count: usize) -> Vec<City> {
    (0..count)
        .map(|i| City {
            id: i as u32,
            name: format!("City {i}"),
            country_code: COUNTRIES[i % COUNTRIES.len()].to_string(),
            latitude: format!("{:.6}", (i % 180) as f64 - 90.0 + 0.123_456),
            longitude: format!("{:.6}", (i % 360) as f64 - 180.0 + 0.654_321),
            population: (i % 7 != 0).then_some((i as i64 * 7_919) % 5_000_000),
            timezone: Some(TIMEZONES[i % TIMEZONES.len()].to_string()),
        })
        .collect()
}

fn cities_to_table(cities: &[City]) -> Table {
    TableBuilder::new()
        .int64("id", cities.iter().map(|c| i64::from(c.id)))
        .text("name", cities.iter().map(|c| c.name.as_str()))
        .categorical("country", cities.iter().map(|c| c.country_code.as_str()))
        .float64("latitude", cities.iter().map(|c| c.latitude.parse().unwrap_or(f64::NAN)))
        .float64("longitude", cities.iter().map(|c| c.longitude.parse().unwrap_or(f64::NAN)))
        .int64("population", cities.iter().map(|c| c.population.unwrap_or(-1)))
        .categorical(
            "timezone",
            cities.iter().map(|c| c.timezone.as_deref().unwrap_or("")),
        )
        .build()
        .expect("Failed to build table")
}

fn main() {
    let data_path = std::env::args().nth(1);

    let cities = match &data_path {
        Some(path) if Path::new(path).exists() => {
            println!("Loading cities from: {}", path);
            let json_data = fs::read_to_string(path).expect("Failed to read cities file");
            let parse_start = Instant::now();
            let cities: Vec<City> = serde_json::from_str(&json_data).expect("Failed to parse JSON");
            println!("Loaded {} cities in {:?}", cities.len(), parse_start.elapsed());
            cities
        }
        _ => {
            println!("No data file given, generating {} synthetic cities", SYNTHETIC_ROWS);
            synthetic_cities(SYNTHETIC_ROWS)
        }
    };

    let convert_start = Instant::now();
    let table = cities_to_table(&cities);
    println!(
        "Built {}x{} table in {:?}",
        table.num_rows(),
        table.num_columns(),
        convert_start.elapsed()
    );

    // Text layouts
    println!("\n=== Text Layouts ===");
    let mut json_size = 0;
    for layout in Layout::ALL {
        let codec = TextCodec::new(layout);
        let encode_start = Instant::now();
        match codec.encode(&table) {
            Ok(document) => {
                let encode_time = encode_start.elapsed();
                let bytes = serde_json::to_vec(&document).expect("Failed to serialize document");
                if layout == Layout::Table {
                    json_size = bytes.len();
                }
                let decode_start = Instant::now();
                let decoded = codec.decode(document).expect("Failed to decode document");
                let decode_time = decode_start.elapsed();
                assert_eq!(decoded.num_rows(), table.num_rows());
                println!(
                    "{:>8}: {} bytes, encode {:?}, decode {:?}",
                    layout,
                    bytes.len(),
                    encode_time,
                    decode_time
                );
            }
            // Inferring layouts cannot hold categorical columns exactly.
            Err(e) => println!("{:>8}: rejected ({})", layout, e),
        }
    }

    // Binary, uncompressed
    let config = CodecConfig::for_format_version(FORMAT_VERSION);
    let codec = BinaryCodec::new(config.clone());
    let encode_start = Instant::now();
    let encoded = codec.encode(&table).expect("Failed to encode");
    let encode_time = encode_start.elapsed();
    let uncompressed_len = encoded.blob.len();

    println!(
        "\nBinary uncompressed: {} bytes in {:?}",
        uncompressed_len, encode_time
    );
    println!(
        "  Throughput: {:.2} MB/s",
        (uncompressed_len as f64 / 1_000_000.0) / encode_time.as_secs_f64()
    );

    // Binary, compressed
    let compressed_codec = BinaryCodec::new(config.with_compression(3));
    let compress_start = Instant::now();
    let compressed = compressed_codec.encode(&table).expect("Failed to compress");
    let compress_time = compress_start.elapsed();
    let compressed_len = compressed.blob.len();

    println!(
        "\nBinary compressed (level 3): {} bytes in {:?}",
        compressed_len, compress_time
    );
    println!(
        "  Compression ratio: {:.1}x",
        uncompressed_len as f64 / compressed_len as f64
    );
    assert_eq!(encoded.data_hash, compressed.data_hash);

    // Decoding
    const DECODE_ITERS: u32 = 10;

    let uncompressed_blob = encoded.blob.clone();
    let compressed_blob = compressed.blob.clone();

    for _ in 0..3 {
        let _ = codec.decode(encoded.clone()).expect("Failed to decode");
    }
    let decode_start = Instant::now();
    for _ in 0..DECODE_ITERS {
        let decoded = codec.decode(encoded.clone()).expect("Failed to decode");
        assert_eq!(decoded.num_rows(), table.num_rows());
    }
    let decode_time = decode_start.elapsed() / DECODE_ITERS;

    println!(
        "\nDecode (uncompressed): {:?} (avg of {} iterations)",
        decode_time, DECODE_ITERS
    );
    println!(
        "  Throughput: {:.2} MB/s",
        (uncompressed_len as f64 / 1_000_000.0) / decode_time.as_secs_f64()
    );

    let decode_compressed_start = Instant::now();
    for _ in 0..DECODE_ITERS {
        let decoded = compressed_codec
            .decode(compressed.clone())
            .expect("Failed to decode compressed");
        assert_eq!(decoded.num_rows(), table.num_rows());
    }
    let decode_compressed_time = decode_compressed_start.elapsed() / DECODE_ITERS;

    println!(
        "\nDecode (compressed): {:?} (avg of {} iterations)",
        decode_compressed_time, DECODE_ITERS
    );
    println!(
        "  Throughput: {:.2} MB/s (uncompressed equivalent)",
        (uncompressed_len as f64 / 1_000_000.0) / decode_compressed_time.as_secs_f64()
    );

    // Write output files
    let (parent, stem) = match &data_path {
        Some(path) => {
            let input_path = Path::new(path);
            (
                input_path.parent().unwrap_or(Path::new(".")).to_path_buf(),
                input_path.file_stem().unwrap_or_default().to_string_lossy().into_owned(),
            )
        }
        None => (Path::new(".").to_path_buf(), "cities".to_string()),
    };
    let output_uncompressed = parent.join(format!("{}.frm", stem));
    let output_compressed = parent.join(format!("{}.frmz", stem));

    fs::write(&output_uncompressed, &uncompressed_blob).expect("Failed to write .frm file");
    fs::write(&output_compressed, &compressed_blob).expect("Failed to write .frmz file");

    println!("\n=== Output Files ===");
    println!("Uncompressed: {}", output_uncompressed.display());
    println!("Compressed:   {}", output_compressed.display());

    // Summary
    println!("\n=== Summary ===");
    println!("Rows: {}", table.num_rows());
    println!("Data hash: {}", encoded.data_hash);
    println!(
        "JSON (table layout): {} bytes ({:.1} MB)",
        json_size,
        json_size as f64 / 1_000_000.0
    );
    println!(
        "Binary uncompressed: {} bytes ({:.1} MB)",
        uncompressed_len,
        uncompressed_len as f64 / 1_000_000.0
    );
    println!(
        "Binary compressed: {} bytes ({:.1} MB)",
        compressed_len,
        compressed_len as f64 / 1_000_000.0
    );
    if json_size > 0 {
        println!(
            "Size vs JSON: {:.1}% (uncompressed), {:.1}% (compressed)",
            100.0 * uncompressed_len as f64 / json_size as f64,
            100.0 * compressed_len as f64 / json_size as f64
        );
    }
}
