//! The labeled two-dimensional table.

use std::fmt;
use std::io::Write;

use rustc_hash::FxHashSet;

use crate::codec::flatten::DEFAULT_SEPARATOR;
use crate::error::TableError;
use crate::model::{Cell, Column, ColumnData, DType, Index, Label};

/// Maximum number of rows rendered by `Display`.
const DISPLAY_ROWS: usize = 10;

/// An ordered collection of typed columns sharing one row index.
///
/// Invariants (checked by [`Table::new`] and [`Table::check_shape`]):
/// - every column has exactly `index.len()` cells
/// - flattened column keys are unique
/// - categorical codes index into their column's categories
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    index: Index,
    columns: Vec<Column>,
}

impl Table {
    /// Creates a table, checking the shape invariants.
    pub fn new(index: Index, columns: Vec<Column>) -> Result<Self, TableError> {
        let table = Self { index, columns };
        table.check_shape()?;
        Ok(table)
    }

    /// Creates a zero-row table with the given column labels.
    pub fn empty<I, L>(labels: I, dtype: DType) -> Result<Self, TableError>
    where
        I: IntoIterator<Item = L>,
        L: Into<Label>,
    {
        let columns = labels
            .into_iter()
            .map(|label| Column::new(label, ColumnData::empty(dtype)))
            .collect();
        Self::new(Index::default(), columns)
    }

    /// Verifies the shape invariants, flattening column keys with the
    /// default separator.
    ///
    /// Columns handed out by [`Table::column_mut`] can be resized in place,
    /// so callers persisting a table re-check before encoding.
    pub fn check_shape(&self) -> Result<(), TableError> {
        self.check_shape_with(DEFAULT_SEPARATOR)
    }

    /// Verifies the shape invariants for keys flattened with `separator`.
    pub fn check_shape_with(&self, separator: &str) -> Result<(), TableError> {
        let expected = self.index.len();
        let mut seen = FxHashSet::default();
        for column in &self.columns {
            if column.len() != expected {
                return Err(TableError::LengthMismatch {
                    column: column.label.to_string(),
                    expected,
                    actual: column.len(),
                });
            }
            if let ColumnData::Categorical { categories, codes } = &column.data {
                if let Some(&code) = codes.iter().find(|&&c| c as usize >= categories.len()) {
                    return Err(TableError::CategoryCodeOutOfRange {
                        column: column.label.to_string(),
                        code,
                        size: categories.len(),
                    });
                }
            }
            let key = column.label.flat_key(separator);
            if !seen.insert(key.clone()) {
                return Err(TableError::DuplicateColumn { key });
            }
        }
        Ok(())
    }

    /// Returns the row index.
    pub fn index(&self) -> &Index {
        &self.index
    }

    /// Returns the column labels as an index.
    pub fn columns(&self) -> Index {
        self.columns.iter().map(|c| c.label.clone()).collect()
    }

    /// Iterates over the columns in order.
    pub fn iter_columns(&self) -> std::slice::Iter<'_, Column> {
        self.columns.iter()
    }

    pub fn column(&self, label: &Label) -> Option<&Column> {
        self.columns.iter().find(|c| c.label == *label)
    }

    /// Returns a mutable handle on a column for in-place edits.
    pub fn column_mut(&mut self, label: &Label) -> Option<&mut Column> {
        self.columns.iter_mut().find(|c| c.label == *label)
    }

    pub fn num_rows(&self) -> usize {
        self.index.len()
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// Returns true when the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn dtypes(&self) -> Vec<DType> {
        self.columns.iter().map(Column::dtype).collect()
    }

    /// Returns the cell at (`row`, `column`).
    pub fn get(&self, row: usize, column: &Label) -> Option<Cell> {
        self.column(column)?.data.get(row)
    }

    /// Overwrites the cell at (`row`, `column`).
    pub fn set(&mut self, row: usize, column: &Label, cell: Cell) -> Result<(), TableError> {
        let col = self
            .column_mut(column)
            .ok_or_else(|| TableError::ColumnNotFound {
                column: column.to_string(),
            })?;
        col.data.set(row, cell)
    }

    /// Replaces the row index. The new index must have the same length.
    pub fn set_index(&mut self, index: Index) -> Result<(), TableError> {
        if index.len() != self.index.len() {
            return Err(TableError::LabelCountMismatch {
                expected: self.index.len(),
                actual: index.len(),
            });
        }
        self.index = index;
        Ok(())
    }

    /// Replaces all column labels at once.
    pub fn rename_columns(&mut self, labels: Vec<Label>) -> Result<(), TableError> {
        if labels.len() != self.columns.len() {
            return Err(TableError::LabelCountMismatch {
                expected: self.columns.len(),
                actual: labels.len(),
            });
        }
        let previous: Vec<Label> = self
            .columns
            .iter_mut()
            .zip(labels)
            .map(|(col, label)| std::mem::replace(&mut col.label, label))
            .collect();
        if let Err(e) = self.check_shape() {
            for (col, label) in self.columns.iter_mut().zip(previous) {
                col.label = label;
            }
            return Err(e);
        }
        Ok(())
    }

    /// Writes the table as CSV: a leading row-label column, then one column
    /// per flattened column key.
    pub fn to_csv<W: Write>(&self, out: W) -> Result<(), csv::Error> {
        let mut writer = csv::Writer::from_writer(out);

        let mut header = vec![String::new()];
        header.extend(self.columns.iter().map(|c| c.label.flat_key(DEFAULT_SEPARATOR)));
        writer.write_record(&header)?;

        for (row, label) in self.index.iter().enumerate() {
            let mut record = Vec::with_capacity(self.columns.len() + 1);
            record.push(label.to_string());
            record.extend(self.columns.iter().map(|c| c.data.display_cell(row)));
            writer.write_record(&record)?;
        }

        writer.flush()?;
        Ok(())
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let labels: Vec<String> = self.columns.iter().map(|c| c.label.to_string()).collect();
        writeln!(f, "\t{}", labels.join("\t"))?;
        for (row, label) in self.index.iter().enumerate().take(DISPLAY_ROWS) {
            let cells: Vec<String> = self
                .columns
                .iter()
                .map(|c| c.data.display_cell(row))
                .collect();
            writeln!(f, "{label}\t{}", cells.join("\t"))?;
        }
        if self.num_rows() > DISPLAY_ROWS {
            writeln!(f, "...")?;
        }
        write!(f, "[{} rows x {} columns]", self.num_rows(), self.num_columns())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TimeUnit;

    fn sample() -> Table {
        Table::new(
            Index::range(2),
            vec![
                Column::new("A", ColumnData::Float64(vec![1.0, 2.5])),
                Column::new("B", ColumnData::Text(vec!["x".into(), "y,z".into()])),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_shape_checked() {
        let result = Table::new(
            Index::range(3),
            vec![Column::new("A", ColumnData::Int64(vec![1, 2]))],
        );
        assert!(matches!(
            result,
            Err(TableError::LengthMismatch {
                expected: 3,
                actual: 2,
                ..
            })
        ));

        let result = Table::new(
            Index::range(1),
            vec![
                Column::new("A", ColumnData::Int64(vec![1])),
                Column::new("A", ColumnData::Int64(vec![2])),
            ],
        );
        assert!(matches!(result, Err(TableError::DuplicateColumn { .. })));
    }

    #[test]
    fn test_flattened_keys_must_be_unique() {
        let result = Table::new(
            Index::range(1),
            vec![
                Column::new(("One", "X"), ColumnData::Int64(vec![1])),
                Column::new("One___X", ColumnData::Int64(vec![2])),
            ],
        );
        assert!(matches!(result, Err(TableError::DuplicateColumn { .. })));
    }

    #[test]
    fn test_category_codes_checked() {
        let result = Table::new(
            Index::range(1),
            vec![Column::new(
                "E",
                ColumnData::Categorical {
                    categories: vec!["a".into()],
                    codes: vec![5],
                },
            )],
        );
        assert!(matches!(
            result,
            Err(TableError::CategoryCodeOutOfRange { code: 5, size: 1, .. })
        ));
    }

    #[test]
    fn test_flattened_keys_use_given_separator() {
        let table = Table::new(
            Index::range(1),
            vec![
                Column::new(("a", "b"), ColumnData::Int64(vec![1])),
                Column::new("a|b", ColumnData::Int64(vec![2])),
            ],
        )
        .unwrap();
        assert!(matches!(
            table.check_shape_with("|"),
            Err(TableError::DuplicateColumn { key }) if key == "a|b"
        ));
    }

    #[test]
    fn test_get_set() {
        let mut table = sample();
        let a = Label::from("A");
        assert_eq!(table.get(1, &a), Some(Cell::Float(2.5)));
        table.set(1, &a, Cell::Float(9.0)).unwrap();
        assert_eq!(table.get(1, &a), Some(Cell::Float(9.0)));
        let missing = table.set(0, &Label::from("Z"), Cell::Int(1));
        assert!(matches!(missing, Err(TableError::ColumnNotFound { .. })));
    }

    #[test]
    fn test_rename_rolls_back_on_duplicate() {
        let mut table = sample();
        let result = table.rename_columns(vec!["C".into(), "C".into()]);
        assert!(result.is_err());
        assert_eq!(table.columns(), Index::new(vec!["A".into(), "B".into()]));

        table.rename_columns(vec!["C".into(), "D".into()]).unwrap();
        assert_eq!(table.columns(), Index::new(vec!["C".into(), "D".into()]));
    }

    #[test]
    fn test_to_csv() {
        let mut table = sample();
        table.columns.push(Column::new(
            "T",
            ColumnData::Timestamp {
                unit: TimeUnit::Second,
                values: vec![0, 86_400],
            },
        ));
        let mut out = Vec::new();
        table.to_csv(&mut out).unwrap();
        let csv = String::from_utf8(out).unwrap();
        assert_eq!(
            csv,
            ",A,B,T\n0,1,x,1970-01-01T00:00:00\n1,2.5,\"y,z\",1970-01-02T00:00:00\n"
        );
    }

    #[test]
    fn test_to_csv_quotes_and_flattens() {
        let table = Table::new(
            Index::from_tuples([["g", "r0"], ["g", "r1"]]),
            vec![Column::new(
                ("One", "X"),
                ColumnData::Text(vec!["say \"hi\"".into(), "two\nlines".into()]),
            )],
        )
        .unwrap();
        let mut out = Vec::new();
        table.to_csv(&mut out).unwrap();
        let csv = String::from_utf8(out).unwrap();
        assert_eq!(
            csv,
            ",One___X\n\"(g, r0)\",\"say \"\"hi\"\"\"\n\"(g, r1)\",\"two\nlines\"\n"
        );
    }

    #[test]
    fn test_display_summary() {
        let rendered = sample().to_string();
        assert!(rendered.ends_with("[2 rows x 2 columns]"));
    }
}
