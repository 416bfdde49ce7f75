//! Property-based tests for codec round-trips.

#![allow(clippy::expect_used, clippy::float_cmp)]

use proptest::prelude::*;

use crate::codec::text::{self, Layout};
use crate::codec::{BinaryCodec, Codec, DEFAULT_SEPARATOR, TextCodec};
use crate::config::CodecConfig;
use crate::model::{Column, ColumnData, Index, Label, Table, TimeUnit};

fn arb_unit() -> impl Strategy<Value = TimeUnit> {
    prop_oneof![
        Just(TimeUnit::Second),
        Just(TimeUnit::Millisecond),
        Just(TimeUnit::Microsecond),
        Just(TimeUnit::Nanosecond),
    ]
}

/// Timestamps between 1906 and 2096, in any unit.
fn arb_timestamps(rows: usize) -> impl Strategy<Value = ColumnData> {
    arb_unit().prop_flat_map(move |unit| {
        let per_second = unit.ticks_per_second();
        prop::collection::vec(
            (-2_000_000_000i64..4_000_000_000, 0..per_second)
                .prop_map(move |(secs, frac)| secs * per_second + frac),
            rows,
        )
        .prop_map(move |values| ColumnData::Timestamp { unit, values })
    })
}

fn arb_categorical(rows: usize) -> impl Strategy<Value = ColumnData> {
    prop::collection::vec(prop::sample::select(vec!["test", "train", "valid"]), rows)
        .prop_map(ColumnData::categorical)
}

/// Any column the binary codec can hold.
fn arb_column_data(rows: usize) -> impl Strategy<Value = ColumnData> {
    prop_oneof![
        prop::collection::vec(any::<bool>(), rows).prop_map(ColumnData::Bool),
        prop::collection::vec(any::<i32>(), rows).prop_map(ColumnData::Int32),
        prop::collection::vec(any::<i64>(), rows).prop_map(ColumnData::Int64),
        prop::collection::vec(any::<f32>(), rows).prop_map(ColumnData::Float32),
        prop::collection::vec(any::<f64>(), rows).prop_map(ColumnData::Float64),
        prop::collection::vec(".{0,12}", rows).prop_map(ColumnData::Text),
        arb_timestamps(rows),
        arb_categorical(rows),
        prop::collection::vec((any::<f64>(), any::<f64>()), rows).prop_map(ColumnData::Complex128),
    ]
}

/// Columns whose every cell has an exact JSON form under the `table` layout.
fn arb_json_column_data(rows: usize) -> impl Strategy<Value = ColumnData> {
    let finite64 = prop_oneof![
        9 => any::<f64>().prop_filter("finite", |f| f.is_finite()),
        1 => Just(f64::NAN),
    ];
    prop_oneof![
        prop::collection::vec(any::<bool>(), rows).prop_map(ColumnData::Bool),
        prop::collection::vec(any::<i32>(), rows).prop_map(ColumnData::Int32),
        prop::collection::vec(any::<i64>(), rows).prop_map(ColumnData::Int64),
        prop::collection::vec(
            any::<f32>().prop_filter("finite", |f| f.is_finite()),
            rows
        )
        .prop_map(ColumnData::Float32),
        prop::collection::vec(finite64, rows).prop_map(ColumnData::Float64),
        prop::collection::vec(".{0,12}", rows).prop_map(ColumnData::Text),
        arb_timestamps(rows),
        arb_categorical(rows),
    ]
}

/// Columns whose dtype survives inference in every layout.
fn arb_inferable_column_data(rows: usize) -> impl Strategy<Value = ColumnData> {
    prop_oneof![
        prop::collection::vec(any::<bool>(), rows).prop_map(ColumnData::Bool),
        prop::collection::vec(any::<i64>(), rows).prop_map(ColumnData::Int64),
        prop::collection::vec(
            any::<f64>().prop_filter("finite", |f| f.is_finite()),
            rows
        )
        .prop_map(ColumnData::Float64),
        prop::collection::vec("[a-z ]{0,8}", rows).prop_map(ColumnData::Text),
    ]
}

fn arb_index(rows: usize) -> impl Strategy<Value = Index> {
    prop_oneof![
        Just(Index::range(rows)),
        Just(Index::new((0..rows).map(|r| Label::Str(format!("row{r}"))).collect())),
        Just(Index::from_tuples((0..rows).map(|r| [format!("g{}", r % 2), format!("r{r}")]))),
    ]
}

fn assemble(index: Index, data: Vec<ColumnData>) -> Table {
    let columns = data
        .into_iter()
        .enumerate()
        .map(|(i, data)| Column::new(format!("c{i}"), data))
        .collect();
    Table::new(index, columns).expect("generated table is consistent")
}

fn arb_table<S, F>(rows: std::ops::Range<usize>, column: F) -> impl Strategy<Value = Table>
where
    S: Strategy<Value = ColumnData>,
    F: Fn(usize) -> S + Clone + 'static,
{
    rows.prop_flat_map(move |rows| {
        (
            arb_index(rows),
            prop::collection::vec(column.clone()(rows), 0..5),
        )
            .prop_map(|(index, data)| assemble(index, data))
    })
}

proptest! {
    #[test]
    fn binary_roundtrip(table in arb_table(1..12, arb_column_data)) {
        let codec = BinaryCodec::default();
        let encoded = codec.encode(&table).expect("encode");
        let decoded = codec.decode(encoded).expect("decode");
        prop_assert_eq!(decoded, table);
    }

    #[test]
    fn binary_compressed_roundtrip(table in arb_table(1..12, arb_column_data)) {
        let codec = BinaryCodec::new(CodecConfig::default().with_compression(3));
        let encoded = codec.encode(&table).expect("encode");
        prop_assert!(encoded.blob.starts_with(crate::limits::MAGIC_COMPRESSED));
        let decoded = codec.decode(encoded).expect("decode");
        prop_assert_eq!(decoded, table);
    }

    #[test]
    fn text_table_layout_roundtrip(table in arb_table(0..12, arb_json_column_data)) {
        let codec = TextCodec::default();
        let doc = codec.encode(&table).expect("table layout holds every JSON dtype");
        let decoded = codec.decode(doc).expect("decode");
        prop_assert_eq!(decoded, table);
    }

    #[test]
    fn text_every_layout_roundtrip(table in arb_table(1..8, arb_inferable_column_data)) {
        for layout in Layout::ALL {
            let doc = text::encode(&table, layout, DEFAULT_SEPARATOR).expect("encode");
            let decoded = text::decode(doc, DEFAULT_SEPARATOR).expect("decode");
            prop_assert_eq!(&decoded, &table, "layout {}", layout);
        }
    }

    #[test]
    fn binary_decode_never_panics(bytes in prop::collection::vec(any::<u8>(), 0..256)) {
        let _ = crate::codec::decode_table(&bytes, &Index::default());
    }
}
