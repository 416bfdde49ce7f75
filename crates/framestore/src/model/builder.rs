//! Builder API for ergonomic Table construction.
//!
//! # Example
//!
//! ```rust
//! use framestore::model::TableBuilder;
//!
//! let table = TableBuilder::new()
//!     .float64("A", [1.0, 2.0, 3.0])
//!     .text("B", ["x", "y", "z"])
//!     .categorical("split", ["train", "test", "train"])
//!     .build()
//!     .unwrap();
//! assert_eq!(table.num_rows(), 3);
//! ```

use crate::error::TableError;
use crate::model::{Column, ColumnData, Index, Label, Table, TimeUnit};

/// Builder for constructing a Table column by column.
#[derive(Debug, Clone, Default)]
pub struct TableBuilder {
    index: Option<Index>,
    columns: Vec<Column>,
}

impl TableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the row index. Defaults to `0..n` where `n` is the length of the
    /// first column.
    pub fn index(mut self, index: Index) -> Self {
        self.index = Some(index);
        self
    }

    /// Sets a multi-level row index from tuples of components.
    pub fn index_tuples<I, T, L>(self, tuples: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: IntoIterator<Item = L>,
        L: Into<Label>,
    {
        self.index(Index::from_tuples(tuples))
    }

    /// Adds a column with pre-built storage.
    pub fn column(mut self, label: impl Into<Label>, data: ColumnData) -> Self {
        self.columns.push(Column::new(label, data));
        self
    }

    pub fn bool(self, label: impl Into<Label>, values: impl IntoIterator<Item = bool>) -> Self {
        self.column(label, ColumnData::Bool(values.into_iter().collect()))
    }

    pub fn int32(self, label: impl Into<Label>, values: impl IntoIterator<Item = i32>) -> Self {
        self.column(label, ColumnData::Int32(values.into_iter().collect()))
    }

    pub fn int64(self, label: impl Into<Label>, values: impl IntoIterator<Item = i64>) -> Self {
        self.column(label, ColumnData::Int64(values.into_iter().collect()))
    }

    pub fn float32(self, label: impl Into<Label>, values: impl IntoIterator<Item = f32>) -> Self {
        self.column(label, ColumnData::Float32(values.into_iter().collect()))
    }

    pub fn float64(self, label: impl Into<Label>, values: impl IntoIterator<Item = f64>) -> Self {
        self.column(label, ColumnData::Float64(values.into_iter().collect()))
    }

    pub fn text<I, S>(self, label: impl Into<Label>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.column(label, ColumnData::Text(values.into_iter().map(Into::into).collect()))
    }

    /// Adds a timestamp column holding ticks of `unit` since the Unix epoch.
    pub fn timestamp(
        self,
        label: impl Into<Label>,
        unit: TimeUnit,
        values: impl IntoIterator<Item = i64>,
    ) -> Self {
        self.column(
            label,
            ColumnData::Timestamp {
                unit,
                values: values.into_iter().collect(),
            },
        )
    }

    pub fn categorical<I, S>(self, label: impl Into<Label>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.column(label, ColumnData::categorical(values))
    }

    pub fn complex128(
        self,
        label: impl Into<Label>,
        values: impl IntoIterator<Item = (f64, f64)>,
    ) -> Self {
        self.column(label, ColumnData::Complex128(values.into_iter().collect()))
    }

    /// Builds the table, checking its shape.
    pub fn build(self) -> Result<Table, TableError> {
        let index = match self.index {
            Some(index) => index,
            None => Index::range(self.columns.first().map_or(0, Column::len)),
        };
        Table::new(index, self.columns)
    }
}
