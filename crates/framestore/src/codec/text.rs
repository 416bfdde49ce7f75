//! JSON document encoding/decoding.
//!
//! A table is written as a JSON object whose cell payload sits under
//! `data`, next to the sidecar fields:
//!
//! - `_orient`: the [`Layout`] string
//! - `_multiindex`: whether column labels were flattened
//! - `columns`: column labels (flattened keys when `_multiindex` is set)
//! - `index`: raw row labels, tuples as JSON arrays
//!
//! Every top-level key becomes one attribute of the stored record, so the
//! sidecars are directly queryable.
//!
//! Cells are written as JSON booleans, numbers, strings (text, categories
//! and RFC 3339 timestamps) or `null` for NaN. Complex cells have no JSON
//! form and are rejected. Only the `table` layout carries a schema; the other
//! layouts infer column dtypes on decode (bool, int64, float64 or string).

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use crate::codec::flatten::{flatten, unflatten_key};
use crate::error::{EncodeError, FrameError};
use crate::model::{Column, ColumnData, DType, Index, Label, Table, TimeUnit};
use crate::util::datetime::{format_timestamp_rfc3339, parse_timestamp_rfc3339};

/// A JSON document; each top-level entry is one record attribute.
pub type Document = Map<String, Value>;

pub const ORIENT_KEY: &str = "_orient";
pub const MULTIINDEX_KEY: &str = "_multiindex";
pub const COLUMNS_KEY: &str = "columns";
pub const INDEX_KEY: &str = "index";
pub const DATA_KEY: &str = "data";
pub const SCHEMA_KEY: &str = "schema";

const TABLE_SCHEMA_VERSION: &str = "1.0";
const FLAT_INDEX_FIELD: &str = "index";

static NULL: Value = Value::Null;

/// How rows and columns are nested under `data`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    /// `columns`, `index` and `data: [[cell]]`.
    Split,
    /// `data: [{col: cell}]`.
    Records,
    /// `data: {row: {col: cell}}`.
    Index,
    /// `data: {col: {row: cell}}`.
    Columns,
    /// `data: [[cell]]`.
    Values,
    /// `schema` plus `data: [{field: cell}]`; the only layout that keeps
    /// every dtype.
    #[default]
    Table,
}

impl Layout {
    pub const ALL: [Layout; 6] = [
        Layout::Split,
        Layout::Records,
        Layout::Index,
        Layout::Columns,
        Layout::Values,
        Layout::Table,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Layout::Split => "split",
            Layout::Records => "records",
            Layout::Index => "index",
            Layout::Columns => "columns",
            Layout::Values => "values",
            Layout::Table => "table",
        }
    }

    pub fn parse(s: &str) -> Option<Layout> {
        Layout::ALL.into_iter().find(|l| l.as_str() == s)
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

// =============================================================================
// ENCODING
// =============================================================================

/// Encodes a table as a document in the given layout.
///
/// This is the raw encoder; callers storing a table go through
/// [`crate::validate::check_text`], which also proves the document decodes
/// back to the same table.
pub fn encode(table: &Table, layout: Layout, separator: &str) -> Result<Document, EncodeError> {
    let (keys, multilevel) = flatten(&table.columns(), separator);
    let cells = table
        .iter_columns()
        .map(column_to_json)
        .collect::<Result<Vec<_>, _>>()?;
    let rows = table.num_rows();

    let mut doc = Document::new();
    match layout {
        Layout::Split => {
            doc.insert(COLUMNS_KEY.into(), columns_json(table, &keys, multilevel));
            doc.insert(INDEX_KEY.into(), index_json(table.index()));
            doc.insert(DATA_KEY.into(), row_arrays(&cells, rows));
        }
        Layout::Values => {
            doc.insert(DATA_KEY.into(), row_arrays(&cells, rows));
        }
        Layout::Records => {
            let records = (0..rows)
                .map(|row| Value::Object(record(&keys, &cells, row)))
                .collect();
            doc.insert(DATA_KEY.into(), Value::Array(records));
        }
        Layout::Index => {
            let by_row = table
                .index()
                .iter()
                .enumerate()
                .map(|(row, label)| {
                    (label.flat_key(separator), Value::Object(record(&keys, &cells, row)))
                })
                .collect();
            doc.insert(DATA_KEY.into(), Value::Object(by_row));
        }
        Layout::Columns => {
            let by_column = keys
                .iter()
                .zip(&cells)
                .map(|(key, column)| {
                    let entries = table
                        .index()
                        .iter()
                        .zip(column)
                        .map(|(label, cell)| (label.flat_key(separator), cell.clone()))
                        .collect();
                    (key.clone(), Value::Object(entries))
                })
                .collect();
            doc.insert(DATA_KEY.into(), Value::Object(by_column));
        }
        Layout::Table => {
            let (schema, data) = table_payload(table, &keys, &cells)?;
            doc.insert(SCHEMA_KEY.into(), schema);
            doc.insert(DATA_KEY.into(), data);
        }
    }

    doc.insert(ORIENT_KEY.into(), Value::String(layout.as_str().into()));
    doc.insert(MULTIINDEX_KEY.into(), Value::Bool(multilevel));
    if !doc.contains_key(COLUMNS_KEY) {
        doc.insert(COLUMNS_KEY.into(), columns_json(table, &keys, multilevel));
    }
    if !doc.contains_key(INDEX_KEY) {
        doc.insert(INDEX_KEY.into(), index_json(table.index()));
    }
    Ok(doc)
}

fn float_json(value: f64) -> Value {
    Number::from_f64(value).map_or(Value::Null, Value::Number)
}

fn column_to_json(column: &Column) -> Result<Vec<Value>, EncodeError> {
    let cells = match &column.data {
        ColumnData::Bool(v) => v.iter().map(|b| Value::Bool(*b)).collect(),
        ColumnData::Int32(v) => v.iter().map(|x| Value::from(i64::from(*x))).collect(),
        ColumnData::Int64(v) => v.iter().map(|x| Value::from(*x)).collect(),
        ColumnData::Float32(v) => v.iter().map(|x| float_json(f64::from(*x))).collect(),
        ColumnData::Float64(v) => v.iter().map(|x| float_json(*x)).collect(),
        ColumnData::Text(v) => v.iter().map(|s| Value::String(s.clone())).collect(),
        ColumnData::Timestamp { unit, values } => values
            .iter()
            .map(|t| Value::String(format_timestamp_rfc3339(*t, *unit)))
            .collect(),
        ColumnData::Categorical { categories, codes } => codes
            .iter()
            .map(|c| {
                categories
                    .get(*c as usize)
                    .map_or(Value::Null, |s| Value::String(s.clone()))
            })
            .collect(),
        ColumnData::Complex128(_) => {
            return Err(EncodeError::UnsupportedCell {
                column: column.label.to_string(),
                dtype: column.dtype(),
            });
        }
    };
    Ok(cells)
}

/// Converts a label to JSON: integers, strings, tuples as arrays.
pub fn label_to_json(label: &Label) -> Value {
    match label {
        Label::Int(v) => Value::from(*v),
        Label::Str(s) => Value::String(s.clone()),
        Label::Tuple(parts) => Value::Array(parts.iter().map(label_to_json).collect()),
    }
}

/// Raw row labels as a JSON list.
pub fn index_json(index: &Index) -> Value {
    Value::Array(index.iter().map(label_to_json).collect())
}

fn columns_json(table: &Table, keys: &[String], multilevel: bool) -> Value {
    if multilevel {
        Value::Array(keys.iter().cloned().map(Value::String).collect())
    } else {
        index_json(&table.columns())
    }
}

fn row_arrays(cells: &[Vec<Value>], rows: usize) -> Value {
    Value::Array(
        (0..rows)
            .map(|row| Value::Array(cells.iter().map(|column| column[row].clone()).collect()))
            .collect(),
    )
}

fn record(keys: &[String], cells: &[Vec<Value>], row: usize) -> Map<String, Value> {
    keys.iter()
        .zip(cells)
        .map(|(key, column)| (key.clone(), column[row].clone()))
        .collect()
}

fn json_type(dtype: DType) -> &'static str {
    match dtype {
        DType::Bool => "boolean",
        DType::Int32 | DType::Int64 => "integer",
        DType::Float32 | DType::Float64 => "number",
        DType::Text | DType::Categorical => "string",
        DType::Timestamp(_) => "datetime",
        DType::Complex128 => "any",
    }
}

/// Names of the row-label fields of the `table` layout.
fn index_field_names(index: &Index) -> Result<Vec<String>, EncodeError> {
    if !index.is_multilevel() {
        return Ok(vec![FLAT_INDEX_FIELD.to_string()]);
    }
    let width = index.nlevels();
    if index.iter().any(|l| !l.is_tuple() || l.width() != width) {
        return Err(EncodeError::RaggedIndex);
    }
    Ok((0..width).map(|level| format!("level_{level}")).collect())
}

fn index_level_type(labels: impl Iterator<Item = Label>) -> &'static str {
    let mut kind = None;
    for label in labels {
        let this = match label {
            Label::Int(_) => "integer",
            Label::Str(_) => "string",
            Label::Tuple(_) => return "any",
        };
        match kind {
            None => kind = Some(this),
            Some(k) if k != this => return "any",
            Some(_) => {}
        }
    }
    kind.unwrap_or("integer")
}

fn index_level(label: &Label, level: usize, multilevel: bool) -> Label {
    match label {
        Label::Tuple(parts) if multilevel => parts.get(level).cloned().unwrap_or(Label::Int(0)),
        other => other.clone(),
    }
}

fn table_payload(
    table: &Table,
    keys: &[String],
    cells: &[Vec<Value>],
) -> Result<(Value, Value), EncodeError> {
    let index = table.index();
    let multilevel = index.is_multilevel();
    let index_fields = index_field_names(index)?;
    if let Some(name) = index_fields.iter().find(|name| keys.contains(name)) {
        return Err(EncodeError::DuplicateField { name: name.clone() });
    }

    let mut fields = Vec::with_capacity(index_fields.len() + keys.len());
    for (level, name) in index_fields.iter().enumerate() {
        let kind = index_level_type(index.iter().map(|l| index_level(l, level, multilevel)));
        let mut field = Map::new();
        field.insert("name".into(), Value::String(name.clone()));
        field.insert("type".into(), Value::String(kind.into()));
        fields.push(Value::Object(field));
    }
    for (key, column) in keys.iter().zip(table.iter_columns()) {
        let dtype = column.dtype();
        let mut field = Map::new();
        field.insert("name".into(), Value::String(key.clone()));
        field.insert("type".into(), Value::String(json_type(dtype).into()));
        field.insert("dtype".into(), Value::String(dtype.to_string()));
        if let ColumnData::Categorical { categories, .. } = &column.data {
            let mut constraints = Map::new();
            constraints.insert(
                "enum".into(),
                Value::Array(categories.iter().cloned().map(Value::String).collect()),
            );
            field.insert("constraints".into(), Value::Object(constraints));
            field.insert("ordered".into(), Value::Bool(false));
        }
        fields.push(Value::Object(field));
    }

    let mut schema = Map::new();
    schema.insert("fields".into(), Value::Array(fields));
    schema.insert(
        "primaryKey".into(),
        Value::Array(index_fields.iter().cloned().map(Value::String).collect()),
    );
    schema.insert("version".into(), Value::String(TABLE_SCHEMA_VERSION.into()));

    let data = index
        .iter()
        .enumerate()
        .map(|(row, label)| {
            let mut entry = Map::new();
            for (level, name) in index_fields.iter().enumerate() {
                entry.insert(name.clone(), label_to_json(&index_level(label, level, multilevel)));
            }
            entry.extend(record(keys, cells, row));
            Value::Object(entry)
        })
        .collect();

    Ok((Value::Object(schema), Value::Array(data)))
}

// =============================================================================
// DECODING
// =============================================================================

fn malformed(message: impl Into<String>) -> FrameError {
    FrameError::Deserialization(message.into())
}

/// Decodes a document produced by [`encode`].
///
/// Missing `_orient` and `_multiindex` default to `table` and `false`.
/// Column labels come from the `columns` sidecar when present; row labels
/// come from the payload for `split` and `table`, from the `index` sidecar
/// otherwise.
pub fn decode(mut doc: Document, separator: &str) -> Result<Table, FrameError> {
    let layout = match doc.remove(ORIENT_KEY) {
        None => Layout::Table,
        Some(Value::String(s)) => {
            Layout::parse(&s).ok_or_else(|| malformed(format!("unknown layout `{s}`")))?
        }
        Some(other) => {
            return Err(malformed(format!(
                "`{ORIENT_KEY}` must be a string, got {other}"
            )));
        }
    };
    let multilevel = match doc.remove(MULTIINDEX_KEY) {
        None => false,
        Some(Value::Bool(b)) => b,
        Some(other) => {
            return Err(malformed(format!("`{MULTIINDEX_KEY}` must be a boolean, got {other}")));
        }
    };
    let columns = doc
        .remove(COLUMNS_KEY)
        .map(|v| column_labels(v, multilevel, separator))
        .transpose()?;
    let index = doc.remove(INDEX_KEY).map(row_labels).transpose()?;
    let data = doc
        .remove(DATA_KEY)
        .ok_or_else(|| malformed(format!("layout `{layout}` requires `{DATA_KEY}`")))?;

    log::debug!("decoding `{layout}` document (multiindex: {multilevel})");
    let keys = Keys {
        multilevel,
        separator,
    };
    match layout {
        Layout::Split | Layout::Values => decode_rows(data, columns, index),
        Layout::Records => decode_records(data, columns, index, keys),
        Layout::Index => decode_by_row(data, columns, index, keys),
        Layout::Columns => decode_by_column(data, columns, index, keys),
        Layout::Table => {
            let schema = doc
                .remove(SCHEMA_KEY)
                .ok_or_else(|| malformed(format!("layout `table` requires `{SCHEMA_KEY}`")))?;
            decode_table_layout(schema, data, columns, keys)
        }
    }
}

/// How flattened keys map back to labels.
#[derive(Clone, Copy)]
struct Keys<'a> {
    multilevel: bool,
    separator: &'a str,
}

impl Keys<'_> {
    fn label(&self, key: &str) -> Label {
        if self.multilevel {
            unflatten_key(key, self.separator)
        } else {
            Label::Str(key.to_string())
        }
    }

    fn key(&self, label: &Label) -> String {
        label.flat_key(self.separator)
    }
}

/// Converts JSON back to a label: integers, strings, arrays as tuples.
pub fn label_from_json(value: &Value) -> Result<Label, FrameError> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .map(Label::Int)
            .ok_or_else(|| malformed(format!("label {n} is not an integer"))),
        Value::String(s) => Ok(Label::Str(s.clone())),
        Value::Array(parts) => parts
            .iter()
            .map(label_from_json)
            .collect::<Result<Vec<_>, _>>()
            .map(Label::Tuple),
        other => Err(malformed(format!("unsupported label {other}"))),
    }
}

fn into_array(value: Value, what: &str) -> Result<Vec<Value>, FrameError> {
    match value {
        Value::Array(items) => Ok(items),
        other => Err(malformed(format!("`{what}` must be a list, got {}", type_name(&other)))),
    }
}

fn into_object(value: Value, what: &str) -> Result<Map<String, Value>, FrameError> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(malformed(format!("`{what}` must be an object, got {}", type_name(&other)))),
    }
}

fn as_object<'v>(value: &'v Value, what: &str) -> Result<&'v Map<String, Value>, FrameError> {
    value
        .as_object()
        .ok_or_else(|| malformed(format!("`{what}` must be an object, got {}", type_name(value))))
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}

fn column_labels(
    value: Value,
    multilevel: bool,
    separator: &str,
) -> Result<Vec<Label>, FrameError> {
    into_array(value, COLUMNS_KEY)?
        .iter()
        .map(|item| match item {
            Value::String(s) if multilevel => Ok(unflatten_key(s, separator)),
            other => label_from_json(other),
        })
        .collect()
}

fn row_labels(value: Value) -> Result<Vec<Label>, FrameError> {
    into_array(value, INDEX_KEY)?.iter().map(label_from_json).collect()
}

fn range_labels(len: usize) -> Vec<Label> {
    Index::range(len).into_labels()
}

fn check_row_count(labels: &[Label], rows: usize) -> Result<(), FrameError> {
    if labels.len() != rows {
        return Err(malformed(format!(
            "`{INDEX_KEY}` has {} labels but `{DATA_KEY}` has {rows} rows",
            labels.len()
        )));
    }
    Ok(())
}

fn assemble(index: Vec<Label>, columns: Vec<Column>) -> Result<Table, FrameError> {
    Table::new(Index::new(index), columns).map_err(|e| malformed(e.to_string()))
}

fn inferred_column(label: Label, values: &[&Value]) -> Result<Column, FrameError> {
    let dtype = infer_dtype(&label, values)?;
    let data = column_from_json(&label, values, dtype, None)?;
    Ok(Column::new(label, data))
}

/// `split` and `values`: rows as arrays.
fn decode_rows(
    data: Value,
    columns: Option<Vec<Label>>,
    index: Option<Vec<Label>>,
) -> Result<Table, FrameError> {
    let rows = into_array(data, DATA_KEY)?
        .into_iter()
        .map(|row| into_array(row, "data row"))
        .collect::<Result<Vec<_>, _>>()?;

    let width = match (&columns, rows.first()) {
        (Some(labels), _) => labels.len(),
        (None, Some(first)) => first.len(),
        (None, None) => 0,
    };
    if let Some(row) = rows.iter().position(|r| r.len() != width) {
        return Err(malformed(format!(
            "row {row} has {} cells, expected {width}",
            rows[row].len()
        )));
    }

    let labels = columns.unwrap_or_else(|| range_labels(width));
    let index = index.unwrap_or_else(|| range_labels(rows.len()));
    check_row_count(&index, rows.len())?;

    let columns = labels
        .into_iter()
        .enumerate()
        .map(|(c, label)| {
            let values: Vec<&Value> = rows.iter().map(|r| &r[c]).collect();
            inferred_column(label, &values)
        })
        .collect::<Result<Vec<_>, _>>()?;
    assemble(index, columns)
}

/// Column labels and their lookup keys, from the sidecar or from the keys of
/// the first object.
fn column_keys(
    columns: Option<Vec<Label>>,
    first: Option<&Map<String, Value>>,
    keys: Keys<'_>,
) -> Vec<(Label, String)> {
    match columns {
        Some(labels) => labels
            .into_iter()
            .map(|label| {
                let key = keys.key(&label);
                (label, key)
            })
            .collect(),
        None => first
            .map(|obj| obj.keys().map(|k| (keys.label(k), k.clone())).collect())
            .unwrap_or_default(),
    }
}

fn columns_from_records(
    records: &[&Map<String, Value>],
    labels: Vec<(Label, String)>,
) -> Result<Vec<Column>, FrameError> {
    labels
        .into_iter()
        .map(|(label, key)| {
            let values: Vec<&Value> = records
                .iter()
                .map(|r| r.get(&key).unwrap_or(&NULL))
                .collect();
            inferred_column(label, &values)
        })
        .collect()
}

/// `records`: a list of row objects.
fn decode_records(
    data: Value,
    columns: Option<Vec<Label>>,
    index: Option<Vec<Label>>,
    keys: Keys<'_>,
) -> Result<Table, FrameError> {
    let rows = into_array(data, DATA_KEY)?;
    let records = rows
        .iter()
        .map(|r| as_object(r, "data row"))
        .collect::<Result<Vec<_>, _>>()?;
    let index = index.unwrap_or_else(|| range_labels(records.len()));
    check_row_count(&index, records.len())?;

    let labels = column_keys(columns, records.first().copied(), keys);
    let columns = columns_from_records(&records, labels)?;
    assemble(index, columns)
}

/// `index`: row key -> row object.
fn decode_by_row(
    data: Value,
    columns: Option<Vec<Label>>,
    index: Option<Vec<Label>>,
    keys: Keys<'_>,
) -> Result<Table, FrameError> {
    let by_row = into_object(data, DATA_KEY)?;
    let index = index.unwrap_or_else(|| by_row.keys().map(|k| Label::Str(k.clone())).collect());

    let records = index
        .iter()
        .map(|label| {
            let key = keys.key(label);
            let row = by_row
                .get(&key)
                .ok_or_else(|| malformed(format!("row `{key}` missing from `{DATA_KEY}`")))?;
            as_object(row, "data row")
        })
        .collect::<Result<Vec<_>, _>>()?;

    let labels = column_keys(columns, records.first().copied(), keys);
    let columns = columns_from_records(&records, labels)?;
    assemble(index, columns)
}

/// `columns`: column key -> (row key -> cell).
fn decode_by_column(
    data: Value,
    columns: Option<Vec<Label>>,
    index: Option<Vec<Label>>,
    keys: Keys<'_>,
) -> Result<Table, FrameError> {
    let by_column = into_object(data, DATA_KEY)?;
    let labels = column_keys(columns, Some(&by_column), keys);
    let index = match index {
        Some(index) => index,
        None => match by_column.values().next() {
            Some(first) => as_object(first, "data column")?
                .keys()
                .map(|k| Label::Str(k.clone()))
                .collect(),
            None => Vec::new(),
        },
    };
    let row_keys: Vec<String> = index.iter().map(|l| keys.key(l)).collect();

    let columns = labels
        .into_iter()
        .map(|(label, key)| {
            let column = by_column
                .get(&key)
                .ok_or_else(|| malformed(format!("column `{key}` missing from `{DATA_KEY}`")))?;
            let column = as_object(column, "data column")?;
            let values: Vec<&Value> = row_keys
                .iter()
                .map(|k| column.get(k).unwrap_or(&NULL))
                .collect();
            inferred_column(label, &values)
        })
        .collect::<Result<Vec<_>, _>>()?;
    assemble(index, columns)
}

struct FieldSchema {
    name: String,
    dtype: Option<DType>,
    categories: Option<Vec<String>>,
}

fn parse_field(value: &Value) -> Result<FieldSchema, FrameError> {
    let field = as_object(value, "schema field")?;
    let name = field
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| malformed("schema field without a `name`"))?
        .to_string();

    let dtype = match field.get("dtype").and_then(Value::as_str) {
        Some(s) => Some(DType::parse(s).ok_or_else(|| {
            malformed(format!("field `{name}` has unknown dtype `{s}`"))
        })?),
        None => match field.get("type").and_then(Value::as_str) {
            Some("boolean") => Some(DType::Bool),
            Some("integer") => Some(DType::Int64),
            Some("number") => Some(DType::Float64),
            Some("string") => Some(DType::Text),
            Some("datetime") => Some(DType::Timestamp(TimeUnit::Nanosecond)),
            _ => None,
        },
    };

    let categories = field
        .get("constraints")
        .and_then(|c| c.get("enum"))
        .map(|values| {
            values
                .as_array()
                .ok_or_else(|| malformed(format!("field `{name}` has a non-list `enum`")))?
                .iter()
                .map(|v| {
                    v.as_str().map(str::to_string).ok_or_else(|| {
                        malformed(format!("field `{name}` has a non-string category"))
                    })
                })
                .collect::<Result<Vec<_>, _>>()
        })
        .transpose()?;

    Ok(FieldSchema {
        name,
        dtype,
        categories,
    })
}

/// `table`: schema plus a list of row objects.
fn decode_table_layout(
    schema: Value,
    data: Value,
    columns: Option<Vec<Label>>,
    keys: Keys<'_>,
) -> Result<Table, FrameError> {
    let schema = into_object(schema, SCHEMA_KEY)?;
    let fields = schema
        .get("fields")
        .and_then(Value::as_array)
        .ok_or_else(|| malformed("`schema` requires a `fields` list"))?
        .iter()
        .map(parse_field)
        .collect::<Result<Vec<_>, _>>()?;

    let primary_key: Vec<String> = match schema.get("primaryKey") {
        Some(Value::Array(names)) => names
            .iter()
            .map(|n| {
                n.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| malformed("`primaryKey` entries must be strings"))
            })
            .collect::<Result<_, _>>()?,
        Some(Value::String(name)) => vec![name.clone()],
        Some(_) => return Err(malformed("`primaryKey` must be a list of field names")),
        None if fields.iter().any(|f| f.name == FLAT_INDEX_FIELD) => {
            vec![FLAT_INDEX_FIELD.to_string()]
        }
        None => Vec::new(),
    };
    let multilevel_index =
        primary_key.len() > 1 || primary_key.first().is_some_and(|n| n == "level_0");

    let rows = into_array(data, DATA_KEY)?;
    let records = rows
        .iter()
        .map(|r| as_object(r, "data row"))
        .collect::<Result<Vec<_>, _>>()?;

    let index = if primary_key.is_empty() {
        range_labels(records.len())
    } else {
        records
            .iter()
            .map(|record| {
                let parts = primary_key
                    .iter()
                    .map(|name| label_from_json(record.get(name).unwrap_or(&NULL)))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(if multilevel_index {
                    Label::Tuple(parts)
                } else {
                    parts.into_iter().next().unwrap_or(Label::Int(0))
                })
            })
            .collect::<Result<Vec<_>, FrameError>>()?
    };

    let value_fields: Vec<FieldSchema> = fields
        .into_iter()
        .filter(|f| !primary_key.contains(&f.name))
        .collect();
    let labels = match columns {
        Some(labels) if labels.len() == value_fields.len() => labels,
        Some(labels) => {
            return Err(malformed(format!(
                "`{COLUMNS_KEY}` has {} labels but the schema has {} value fields",
                labels.len(),
                value_fields.len()
            )));
        }
        None => value_fields.iter().map(|f| keys.label(&f.name)).collect(),
    };

    let columns = value_fields
        .into_iter()
        .zip(labels)
        .map(|(field, label)| {
            let values: Vec<&Value> = records
                .iter()
                .map(|r| r.get(&field.name).unwrap_or(&NULL))
                .collect();
            let dtype = match field.dtype {
                Some(dtype) => dtype,
                None => infer_dtype(&label, &values)?,
            };
            let data = column_from_json(&label, &values, dtype, field.categories)?;
            Ok(Column::new(label, data))
        })
        .collect::<Result<Vec<_>, FrameError>>()?;
    assemble(index, columns)
}

fn infer_dtype(label: &Label, values: &[&Value]) -> Result<DType, FrameError> {
    if values.is_empty() || values.iter().all(|v| v.is_string()) {
        Ok(DType::Text)
    } else if values.iter().all(|v| v.is_boolean()) {
        Ok(DType::Bool)
    } else if values.iter().all(|v| v.is_i64()) {
        Ok(DType::Int64)
    } else if values.iter().all(|v| v.is_number() || v.is_null()) {
        Ok(DType::Float64)
    } else {
        Err(malformed(format!("column `{label}` mixes incompatible JSON types")))
    }
}

fn column_from_json(
    label: &Label,
    values: &[&Value],
    dtype: DType,
    categories: Option<Vec<String>>,
) -> Result<ColumnData, FrameError> {
    let bad = |v: &Value| malformed(format!("column `{label}` ({dtype}) cannot hold {v}"));

    let float = |v: &&Value| match v {
        Value::Null => Ok(f64::NAN),
        other => other.as_f64().ok_or_else(|| bad(other)),
    };
    let int = |v: &&Value| v.as_i64().ok_or_else(|| bad(v));
    let text = |v: &&Value| v.as_str().map(str::to_string).ok_or_else(|| bad(v));

    let data = match dtype {
        DType::Bool => ColumnData::Bool(
            values
                .iter()
                .map(|v| v.as_bool().ok_or_else(|| bad(v)))
                .collect::<Result<_, _>>()?,
        ),
        DType::Int32 => ColumnData::Int32(
            values
                .iter()
                .map(|v| int(v).and_then(|x| i32::try_from(x).map_err(|_| bad(v))))
                .collect::<Result<_, _>>()?,
        ),
        DType::Int64 => ColumnData::Int64(values.iter().map(int).collect::<Result<_, _>>()?),
        DType::Float32 => ColumnData::Float32(
            values
                .iter()
                .map(|v| float(v).map(|x| x as f32))
                .collect::<Result<_, _>>()?,
        ),
        DType::Float64 => ColumnData::Float64(values.iter().map(float).collect::<Result<_, _>>()?),
        DType::Text => ColumnData::Text(values.iter().map(text).collect::<Result<_, _>>()?),
        DType::Timestamp(unit) => ColumnData::Timestamp {
            unit,
            values: values
                .iter()
                .map(|v| {
                    let s = v.as_str().ok_or_else(|| bad(v))?;
                    parse_timestamp_rfc3339(s, unit)
                        .map_err(|e| malformed(format!("column `{label}`: {e}")))
                })
                .collect::<Result<_, _>>()?,
        },
        DType::Categorical => {
            let cells = values.iter().map(text).collect::<Result<Vec<_>, _>>()?;
            match categories {
                None => ColumnData::categorical(cells),
                Some(categories) => {
                    let codes = cells
                        .iter()
                        .map(|cell| {
                            categories
                                .iter()
                                .position(|c| c == cell)
                                .map(|p| p as u32)
                                .ok_or_else(|| {
                                    malformed(format!(
                                        "column `{label}` has `{cell}` outside its categories"
                                    ))
                                })
                        })
                        .collect::<Result<_, _>>()?;
                    ColumnData::Categorical { categories, codes }
                }
            }
        }
        DType::Complex128 => {
            return Err(malformed(format!("column `{label}`: complex128 has no JSON form")));
        }
    };
    Ok(data)
}
