//! Record lifecycle: round trips through the repository, immutability and
//! reconciliation of in-place edits.

use framestore::model::{
    Cell, Column, ColumnData, DType, Index, Label, Table, TableBuilder, TimeUnit,
};
use framestore::store::{AttributeStore, BlobStore, Repository};
use framestore::{
    BinaryFrameRecord, CodecConfig, FrameError, FrameRecord, Layout, TextFrameRecord,
};
use serde_json::json;

/// 2013-01-02T00:00:00 in nanoseconds.
const JAN_2_2013_NS: i64 = 1_357_084_800_000_000_000;

fn mixed_table() -> Table {
    TableBuilder::new()
        .float64("A", [1.0; 4])
        .timestamp("B", TimeUnit::Nanosecond, [JAN_2_2013_NS; 4])
        .float32("C", [1.0; 4])
        .int32("D", [3; 4])
        .categorical("E", ["test", "train", "test", "train"])
        .text("F", ["foo"; 4])
        .build()
        .unwrap()
}

fn multiindex_columns_table() -> Table {
    TableBuilder::new()
        .float64(("One", "X"), [1.1; 3])
        .float64(("One", "Y"), [1.2; 3])
        .float64(("Two", "X"), [1.11; 3])
        .float64(("Two", "Y"), [1.22; 3])
        .build()
        .unwrap()
}

fn multiindex_index_table() -> Table {
    TableBuilder::new()
        .index_tuples([
            ["AA", "one"],
            ["AA", "six"],
            ["BB", "one"],
            ["BB", "two"],
            ["BB", "six"],
        ])
        .int64("MyData", [11, 22, 33, 44, 55])
        .build()
        .unwrap()
}

fn binary_config() -> CodecConfig {
    CodecConfig::for_format_version(2)
}

fn store_text(repository: &mut Repository, table: &Table) -> Table {
    let mut record = TextFrameRecord::new(table, Layout::Table).unwrap();
    let uuid = repository.store(&mut record).unwrap();
    FrameRecord::load(repository, uuid).unwrap().table().unwrap()
}

fn store_binary(repository: &mut Repository, table: &Table, config: CodecConfig) -> Table {
    let mut record = BinaryFrameRecord::with_config(table, None, config.clone()).unwrap();
    let uuid = repository.store(&mut record).unwrap();
    let node = repository.load(uuid).unwrap();
    let mut loaded = BinaryFrameRecord::from_node_with_config(node, config).unwrap();
    loaded.table().unwrap().into_owned()
}

#[test]
fn test_mixed_dtypes_roundtrip() {
    let mut repository = Repository::new();
    let table = mixed_table();
    assert_eq!(store_text(&mut repository, &table), table);
    assert_eq!(store_binary(&mut repository, &table, binary_config()), table);
    assert_eq!(
        store_binary(&mut repository, &table, binary_config().with_compression(3)),
        table
    );
}

#[test]
fn test_multiindex_columns_roundtrip() {
    let mut repository = Repository::new();
    let table = multiindex_columns_table();

    let mut text = TextFrameRecord::new(&table, Layout::Table).unwrap();
    assert_eq!(text.node().get_attribute("_multiindex"), Some(&json!(true)));
    assert_eq!(
        text.node().get_attribute("columns"),
        Some(&json!(["One___X", "One___Y", "Two___X", "Two___Y"]))
    );
    repository.store(&mut text).unwrap();
    assert_eq!(text.table().unwrap(), table);

    assert_eq!(store_binary(&mut repository, &table, binary_config()), table);
}

#[test]
fn test_multiindex_index_roundtrip() {
    let mut repository = Repository::new();
    let table = multiindex_index_table();
    assert_eq!(store_text(&mut repository, &table), table);

    let record = BinaryFrameRecord::with_config(&table, None, binary_config()).unwrap();
    // Row labels are mirrored raw, never flattened.
    assert_eq!(
        record.node().get_attribute("index").unwrap()[0],
        json!(["AA", "one"])
    );
    assert_eq!(store_binary(&mut repository, &table, binary_config()), table);
}

#[test]
fn test_empty_table() {
    let mut repository = Repository::new();
    let table = Table::empty(["A", "B"], DType::Text).unwrap();
    assert_eq!(store_text(&mut repository, &table), table);

    let loaded = store_binary(&mut repository, &table, binary_config());
    assert!(loaded.is_empty());
    assert_eq!(loaded.columns(), Index::new(vec!["A".into(), "B".into()]));
    assert_eq!(loaded, table);
}

#[test]
fn test_empty_binary_table_keeps_labels_and_dtypes() {
    let mut repository = Repository::new();
    let table = Table::new(
        Index::default(),
        vec![
            Column::new(0i64, ColumnData::Int64(vec![])),
            Column::new("a___b", ColumnData::Float64(vec![])),
        ],
    )
    .unwrap();

    for config in [binary_config(), binary_config().with_compression(3)] {
        let loaded = store_binary(&mut repository, &table, config);
        assert_eq!(loaded, table);
        assert_eq!(loaded.columns().labels(), [Label::Int(0), Label::from("a___b")]);
        assert_eq!(loaded.dtypes(), [DType::Int64, DType::Float64]);
    }
}

#[test]
fn test_stored_records_are_immutable() {
    let mut repository = Repository::new();
    let table = mixed_table();

    let mut text = TextFrameRecord::new(&table, Layout::Table).unwrap();
    repository.store(&mut text).unwrap();
    let replacement = TableBuilder::new().int64("Z", [1]).build().unwrap();
    assert!(matches!(
        text.set_table(&replacement),
        Err(FrameError::ModificationNotAllowed)
    ));
    assert_eq!(text.table().unwrap(), table);

    let mut binary = BinaryFrameRecord::with_config(&table, None, binary_config()).unwrap();
    repository.store(&mut binary).unwrap();
    assert!(matches!(
        binary.set_table(replacement),
        Err(FrameError::ModificationNotAllowed)
    ));
    assert!(matches!(binary.table_mut(), Err(FrameError::ModificationNotAllowed)));

    // Edits to a copy never reach the record.
    let mut copy = binary.table().unwrap().into_owned();
    copy.set(0, &Label::from("A"), Cell::Float(99.0)).unwrap();
    assert_eq!(binary.table().unwrap().as_ref(), &table);
}

#[test]
fn test_in_place_edit_reconciled_on_store() {
    let mut repository = Repository::new();
    let mut record = BinaryFrameRecord::with_config(&mixed_table(), None, binary_config()).unwrap();
    let hash_before = record.data_hash().unwrap().to_string();

    record
        .table_mut()
        .unwrap()
        .set(2, &Label::from("D"), Cell::Int(-7))
        .unwrap();
    let uuid = repository.store(&mut record).unwrap();
    assert_ne!(record.data_hash().unwrap(), hash_before);

    let mut loaded = FrameRecord::load(&repository, uuid).unwrap();
    let table = loaded.table().unwrap();
    assert_eq!(table.get(2, &Label::from("D")), Some(Cell::Int(-7)));
}

#[test]
fn test_rejection_leaves_no_partial_state() {
    let complex = TableBuilder::new()
        .complex128("z", [(1.0, 2.0), (3.0, 4.0)])
        .build()
        .unwrap();
    let result = TextFrameRecord::new(&complex, Layout::Table);
    assert!(matches!(result, Err(FrameError::Serialization { .. })));

    let table = mixed_table();
    let mut record = TextFrameRecord::new(&table, Layout::Table).unwrap();
    let before: Vec<(String, serde_json::Value)> = record
        .node()
        .attributes()
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect();
    assert!(record.set_table(&complex).is_err());
    let after: Vec<(String, serde_json::Value)> = record
        .node()
        .attributes()
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect();
    assert_eq!(before, after);
    assert_eq!(record.table().unwrap(), table);
}

#[test]
fn test_stray_category_code_never_reaches_storage() {
    let mut table = mixed_table();
    if let Some(column) = table.column_mut(&Label::from("E")) {
        column.data = ColumnData::Categorical {
            categories: vec!["a".into()],
            codes: vec![0, 0, 0, 5],
        };
    }
    let result = BinaryFrameRecord::with_config(&table, None, binary_config());
    assert!(matches!(result, Err(FrameError::TypeMismatch(_))));

    // The same corruption made through the live handle fails the store.
    let mut repository = Repository::new();
    let mut record = BinaryFrameRecord::with_config(&mixed_table(), None, binary_config()).unwrap();
    if let Some(column) = record.table_mut().unwrap().column_mut(&Label::from("E")) {
        column.data = ColumnData::Categorical {
            categories: vec!["a".into()],
            codes: vec![5; 4],
        };
    }
    assert!(matches!(
        repository.store(&mut record),
        Err(FrameError::TypeMismatch(_))
    ));
    assert!(repository.is_empty());
}

#[test]
fn test_precision_enforced_for_legacy_format() {
    let table = TableBuilder::new()
        .timestamp("when", TimeUnit::Millisecond, [0, 1_000])
        .build()
        .unwrap();
    let result = BinaryFrameRecord::with_config(&table, None, CodecConfig::for_format_version(1));
    match result {
        Err(FrameError::Precision(message)) => {
            assert!(message.contains("`when`"), "{message}");
            assert!(message.contains("datetime64[ns]"), "{message}");
        }
        other => panic!("expected a precision error, got {other:?}"),
    }

    let record = BinaryFrameRecord::with_config(&table, Some("when.bin"), binary_config()).unwrap();
    assert_eq!(record.node().blob_names(), ["when.bin"]);
}

#[test]
fn test_complex_cells_only_fit_binary_records() {
    let mut repository = Repository::new();
    let table = TableBuilder::new()
        .complex128("z", [(1.0, -1.0), (f64::NAN, 0.5)])
        .build()
        .unwrap();
    assert_eq!(store_binary(&mut repository, &table, binary_config()), table);
}
