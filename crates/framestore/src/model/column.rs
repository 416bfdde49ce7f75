//! Column dtypes, typed cell storage and scalar cells.

use std::fmt;

use rustc_hash::FxHashMap;

use crate::error::TableError;
use crate::model::Label;
use crate::util::datetime::format_timestamp_rfc3339;

/// Precision of a timestamp column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TimeUnit {
    Second = 0,
    Millisecond = 1,
    Microsecond = 2,
    Nanosecond = 3,
}

impl TimeUnit {
    /// Creates a TimeUnit from its wire representation.
    pub fn from_u8(v: u8) -> Option<TimeUnit> {
        match v {
            0 => Some(TimeUnit::Second),
            1 => Some(TimeUnit::Millisecond),
            2 => Some(TimeUnit::Microsecond),
            3 => Some(TimeUnit::Nanosecond),
            _ => None,
        }
    }

    /// Ticks of this unit in one second.
    pub fn ticks_per_second(self) -> i64 {
        match self {
            TimeUnit::Second => 1,
            TimeUnit::Millisecond => 1_000,
            TimeUnit::Microsecond => 1_000_000,
            TimeUnit::Nanosecond => 1_000_000_000,
        }
    }

    /// Number of fractional-second digits this unit resolves.
    pub fn fraction_digits(self) -> usize {
        match self {
            TimeUnit::Second => 0,
            TimeUnit::Millisecond => 3,
            TimeUnit::Microsecond => 6,
            TimeUnit::Nanosecond => 9,
        }
    }

    pub fn suffix(self) -> &'static str {
        match self {
            TimeUnit::Second => "s",
            TimeUnit::Millisecond => "ms",
            TimeUnit::Microsecond => "us",
            TimeUnit::Nanosecond => "ns",
        }
    }

    pub fn from_suffix(s: &str) -> Option<TimeUnit> {
        match s {
            "s" => Some(TimeUnit::Second),
            "ms" => Some(TimeUnit::Millisecond),
            "us" => Some(TimeUnit::Microsecond),
            "ns" => Some(TimeUnit::Nanosecond),
            _ => None,
        }
    }
}

/// Declared type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DType {
    Bool,
    Int32,
    Int64,
    Float32,
    Float64,
    Text,
    Timestamp(TimeUnit),
    /// Strings drawn from a fixed vocabulary.
    Categorical,
    Complex128,
}

impl DType {
    /// Wire tag of this dtype. Timestamps carry their unit separately.
    pub fn tag(self) -> u8 {
        match self {
            DType::Bool => 1,
            DType::Int32 => 2,
            DType::Int64 => 3,
            DType::Float32 => 4,
            DType::Float64 => 5,
            DType::Text => 6,
            DType::Timestamp(_) => 7,
            DType::Categorical => 8,
            DType::Complex128 => 9,
        }
    }

    /// Creates a DType from its wire tag and the timestamp unit (if any).
    pub fn from_tag(tag: u8, unit: TimeUnit) -> Option<DType> {
        match tag {
            1 => Some(DType::Bool),
            2 => Some(DType::Int32),
            3 => Some(DType::Int64),
            4 => Some(DType::Float32),
            5 => Some(DType::Float64),
            6 => Some(DType::Text),
            7 => Some(DType::Timestamp(unit)),
            8 => Some(DType::Categorical),
            9 => Some(DType::Complex128),
            _ => None,
        }
    }

    /// Parses a dtype name as produced by `Display`.
    pub fn parse(name: &str) -> Option<DType> {
        match name {
            "bool" => Some(DType::Bool),
            "int32" => Some(DType::Int32),
            "int64" => Some(DType::Int64),
            "float32" => Some(DType::Float32),
            "float64" => Some(DType::Float64),
            "string" => Some(DType::Text),
            "category" => Some(DType::Categorical),
            "complex128" => Some(DType::Complex128),
            other => other
                .strip_prefix("datetime64[")
                .and_then(|rest| rest.strip_suffix(']'))
                .and_then(TimeUnit::from_suffix)
                .map(DType::Timestamp),
        }
    }

    pub fn is_temporal(self) -> bool {
        matches!(self, DType::Timestamp(_))
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DType::Bool => f.write_str("bool"),
            DType::Int32 => f.write_str("int32"),
            DType::Int64 => f.write_str("int64"),
            DType::Float32 => f.write_str("float32"),
            DType::Float64 => f.write_str("float64"),
            DType::Text => f.write_str("string"),
            DType::Timestamp(unit) => write!(f, "datetime64[{}]", unit.suffix()),
            DType::Categorical => f.write_str("category"),
            DType::Complex128 => f.write_str("complex128"),
        }
    }
}

/// A scalar cell value.
///
/// Timestamps are ticks in the unit of the column they belong to.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Timestamp(i64),
    Category(String),
    Complex(f64, f64),
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Bool(b) => write!(f, "{b}"),
            Cell::Int(v) => write!(f, "{v}"),
            Cell::Float(v) => write!(f, "{v}"),
            Cell::Text(s) | Cell::Category(s) => f.write_str(s),
            Cell::Timestamp(t) => write!(f, "{t}"),
            Cell::Complex(re, im) => write!(f, "{re}{im:+}j"),
        }
    }
}

/// Typed storage for the cells of one column.
#[derive(Debug, Clone)]
pub enum ColumnData {
    Bool(Vec<bool>),
    Int32(Vec<i32>),
    Int64(Vec<i64>),
    Float32(Vec<f32>),
    Float64(Vec<f64>),
    Text(Vec<String>),
    Timestamp { unit: TimeUnit, values: Vec<i64> },
    Categorical { categories: Vec<String>, codes: Vec<u32> },
    Complex128(Vec<(f64, f64)>),
}

impl ColumnData {
    /// Creates an empty column of the given dtype.
    pub fn empty(dtype: DType) -> ColumnData {
        match dtype {
            DType::Bool => ColumnData::Bool(Vec::new()),
            DType::Int32 => ColumnData::Int32(Vec::new()),
            DType::Int64 => ColumnData::Int64(Vec::new()),
            DType::Float32 => ColumnData::Float32(Vec::new()),
            DType::Float64 => ColumnData::Float64(Vec::new()),
            DType::Text => ColumnData::Text(Vec::new()),
            DType::Timestamp(unit) => ColumnData::Timestamp {
                unit,
                values: Vec::new(),
            },
            DType::Categorical => ColumnData::Categorical {
                categories: Vec::new(),
                codes: Vec::new(),
            },
            DType::Complex128 => ColumnData::Complex128(Vec::new()),
        }
    }

    /// Builds a categorical column whose vocabulary is the sorted set of `values`.
    pub fn categorical<I, S>(values: I) -> ColumnData
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values: Vec<String> = values.into_iter().map(Into::into).collect();
        let mut categories = values.clone();
        categories.sort();
        categories.dedup();
        let lookup: FxHashMap<&str, u32> = categories
            .iter()
            .enumerate()
            .map(|(i, c)| (c.as_str(), i as u32))
            .collect();
        let codes = values.iter().map(|v| lookup[v.as_str()]).collect();
        ColumnData::Categorical { categories, codes }
    }

    /// Returns the dtype of this column.
    pub fn dtype(&self) -> DType {
        match self {
            ColumnData::Bool(_) => DType::Bool,
            ColumnData::Int32(_) => DType::Int32,
            ColumnData::Int64(_) => DType::Int64,
            ColumnData::Float32(_) => DType::Float32,
            ColumnData::Float64(_) => DType::Float64,
            ColumnData::Text(_) => DType::Text,
            ColumnData::Timestamp { unit, .. } => DType::Timestamp(*unit),
            ColumnData::Categorical { .. } => DType::Categorical,
            ColumnData::Complex128(_) => DType::Complex128,
        }
    }

    /// Number of cells.
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Bool(v) => v.len(),
            ColumnData::Int32(v) => v.len(),
            ColumnData::Int64(v) => v.len(),
            ColumnData::Float32(v) => v.len(),
            ColumnData::Float64(v) => v.len(),
            ColumnData::Text(v) => v.len(),
            ColumnData::Timestamp { values, .. } => values.len(),
            ColumnData::Categorical { codes, .. } => codes.len(),
            ColumnData::Complex128(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the cell at `row`.
    pub fn get(&self, row: usize) -> Option<Cell> {
        match self {
            ColumnData::Bool(v) => v.get(row).map(|b| Cell::Bool(*b)),
            ColumnData::Int32(v) => v.get(row).map(|x| Cell::Int(i64::from(*x))),
            ColumnData::Int64(v) => v.get(row).map(|x| Cell::Int(*x)),
            ColumnData::Float32(v) => v.get(row).map(|x| Cell::Float(f64::from(*x))),
            ColumnData::Float64(v) => v.get(row).map(|x| Cell::Float(*x)),
            ColumnData::Text(v) => v.get(row).map(|s| Cell::Text(s.clone())),
            ColumnData::Timestamp { values, .. } => values.get(row).map(|t| Cell::Timestamp(*t)),
            ColumnData::Categorical { categories, codes } => codes
                .get(row)
                .and_then(|c| categories.get(*c as usize))
                .map(|s| Cell::Category(s.clone())),
            ColumnData::Complex128(v) => v.get(row).map(|(re, im)| Cell::Complex(*re, *im)),
        }
    }

    /// Overwrites the cell at `row`.
    ///
    /// Integers are accepted by float columns; everything else must match
    /// the column's dtype. Categorical values must already be in the
    /// vocabulary.
    pub fn set(&mut self, row: usize, cell: Cell) -> Result<(), TableError> {
        let len = self.len();
        if row >= len {
            return Err(TableError::RowOutOfBounds { row, len });
        }
        let dtype = self.dtype();
        let mismatch = |cell: &Cell| TableError::CellTypeMismatch {
            dtype,
            cell: format!("{cell:?}"),
        };
        match (self, cell) {
            (ColumnData::Bool(v), Cell::Bool(b)) => v[row] = b,
            (ColumnData::Int32(v), Cell::Int(x)) => {
                v[row] = i32::try_from(x).map_err(|_| mismatch(&Cell::Int(x)))?;
            }
            (ColumnData::Int64(v), Cell::Int(x)) => v[row] = x,
            (ColumnData::Float32(v), Cell::Float(x)) => v[row] = x as f32,
            (ColumnData::Float32(v), Cell::Int(x)) => v[row] = x as f32,
            (ColumnData::Float64(v), Cell::Float(x)) => v[row] = x,
            (ColumnData::Float64(v), Cell::Int(x)) => v[row] = x as f64,
            (ColumnData::Text(v), Cell::Text(s)) => v[row] = s,
            (ColumnData::Timestamp { values, .. }, Cell::Timestamp(t)) => values[row] = t,
            (ColumnData::Categorical { categories, codes }, Cell::Category(s) | Cell::Text(s)) => {
                let code = categories
                    .iter()
                    .position(|c| *c == s)
                    .ok_or(TableError::UnknownCategory { value: s })?;
                codes[row] = code as u32;
            }
            (ColumnData::Complex128(v), Cell::Complex(re, im)) => v[row] = (re, im),
            (_, cell) => return Err(mismatch(&cell)),
        }
        Ok(())
    }

    /// Renders the cell at `row` for display and CSV export.
    pub fn display_cell(&self, row: usize) -> String {
        match self {
            ColumnData::Timestamp { unit, values } => values
                .get(row)
                .map(|t| format_timestamp_rfc3339(*t, *unit))
                .unwrap_or_default(),
            other => other.get(row).map(|c| c.to_string()).unwrap_or_default(),
        }
    }
}

/// Float equality that treats NaN as equal to NaN (missing values).
fn float_eq(a: f64, b: f64) -> bool {
    a == b || (a.is_nan() && b.is_nan())
}

impl PartialEq for ColumnData {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ColumnData::Bool(a), ColumnData::Bool(b)) => a == b,
            (ColumnData::Int32(a), ColumnData::Int32(b)) => a == b,
            (ColumnData::Int64(a), ColumnData::Int64(b)) => a == b,
            (ColumnData::Float32(a), ColumnData::Float32(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .zip(b)
                        .all(|(x, y)| float_eq(f64::from(*x), f64::from(*y)))
            }
            (ColumnData::Float64(a), ColumnData::Float64(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| float_eq(*x, *y))
            }
            (ColumnData::Text(a), ColumnData::Text(b)) => a == b,
            (
                ColumnData::Timestamp { unit: ua, values: a },
                ColumnData::Timestamp { unit: ub, values: b },
            ) => ua == ub && a == b,
            (
                ColumnData::Categorical { categories: ca, codes: a },
                ColumnData::Categorical { categories: cb, codes: b },
            ) => ca == cb && a == b,
            (ColumnData::Complex128(a), ColumnData::Complex128(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .zip(b)
                        .all(|(x, y)| float_eq(x.0, y.0) && float_eq(x.1, y.1))
            }
            _ => false,
        }
    }
}

/// A labeled column.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub label: Label,
    pub data: ColumnData,
}

impl Column {
    pub fn new(label: impl Into<Label>, data: ColumnData) -> Self {
        Self {
            label: label.into(),
            data,
        }
    }

    pub fn dtype(&self) -> DType {
        self.data.dtype()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
