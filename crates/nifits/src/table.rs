//! In-memory binary table representation.
//!
//! Columns are strongly typed and hold their data contiguously across rows.
//! A column cell may be a scalar or a fixed multi-dimensional array; the
//! cell shape is stored row-major (slowest axis first), matching `ndarray`.

use ndarray::{ArrayD, IxDyn};
use num_complex::Complex64;

use crate::error::{Error, Result};

/// Typed storage for one table column, flattened across all rows.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Int(Vec<i64>),
    Float(Vec<f64>),
    Complex(Vec<Complex64>),
    /// Fixed-width text. `width` is preserved from the source file so that
    /// re-serialization keeps the original field width.
    Text { width: usize, values: Vec<String> },
}

impl ColumnData {
    /// Number of stored elements (rows times cell length; rows for text).
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Int(v) => v.len(),
            ColumnData::Float(v) => v.len(),
            ColumnData::Complex(v) => v.len(),
            ColumnData::Text { values, .. } => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A named table column with an optional multi-dimensional cell shape.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    /// Shape of a single cell, row-major. Empty means scalar cells.
    pub cell_shape: Vec<usize>,
    pub data: ColumnData,
}

impl Column {
    pub fn scalar(name: &str, data: ColumnData) -> Self {
        Column {
            name: name.to_string(),
            cell_shape: Vec::new(),
            data,
        }
    }

    pub fn array(name: &str, cell_shape: Vec<usize>, data: ColumnData) -> Self {
        Column {
            name: name.to_string(),
            cell_shape,
            data,
        }
    }

    /// Number of elements in one cell.
    pub fn cell_len(&self) -> usize {
        self.cell_shape.iter().product::<usize>().max(1)
    }

    /// Number of rows represented by the stored data.
    pub fn nrows(&self) -> usize {
        match &self.data {
            ColumnData::Text { values, .. } => values.len(),
            _ => self.data.len() / self.cell_len(),
        }
    }
}

/// One cell's worth of values, used when appending rows.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Int(i64),
    Float(f64),
    Text(String),
    Ints(Vec<i64>),
    Floats(Vec<f64>),
    Complexes(Vec<Complex64>),
}

/// A binary table: ordered columns sharing a common row count.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
    nrows: usize,
}

impl Table {
    pub fn new() -> Self {
        Table {
            columns: Vec::new(),
            nrows: 0,
        }
    }

    pub fn nrows(&self) -> usize {
        self.nrows
    }

    pub fn ncols(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Append a column. All columns must agree on the row count; the first
    /// column fixes it.
    pub fn push_column(&mut self, column: Column) -> Result<()> {
        let rows = column.nrows();
        if self.columns.is_empty() {
            self.nrows = rows;
        } else if rows != self.nrows {
            return Err(Error::Structural(format!(
                "column {} has {} rows, table has {}",
                column.name, rows, self.nrows
            )));
        }
        self.columns.push(column);
        Ok(())
    }

    /// Append one row, supplying one [`CellValue`] per column in order.
    pub fn add_row(&mut self, cells: Vec<CellValue>) -> Result<()> {
        if cells.len() != self.columns.len() {
            return Err(Error::Structural(format!(
                "row has {} cells, table has {} columns",
                cells.len(),
                self.columns.len()
            )));
        }
        for (column, cell) in self.columns.iter_mut().zip(cells) {
            let cell_len = column.cell_len();
            match (&mut column.data, cell) {
                (ColumnData::Int(v), CellValue::Int(x)) if cell_len == 1 => v.push(x),
                (ColumnData::Float(v), CellValue::Float(x)) if cell_len == 1 => v.push(x),
                (ColumnData::Text { values, .. }, CellValue::Text(s)) => values.push(s),
                (ColumnData::Int(v), CellValue::Ints(xs)) if xs.len() == cell_len => {
                    v.extend_from_slice(&xs)
                }
                (ColumnData::Float(v), CellValue::Floats(xs)) if xs.len() == cell_len => {
                    v.extend_from_slice(&xs)
                }
                (ColumnData::Complex(v), CellValue::Complexes(xs)) if xs.len() == cell_len => {
                    v.extend_from_slice(&xs)
                }
                _ => {
                    return Err(Error::Structural(format!(
                        "cell value does not match column {}",
                        column.name
                    )))
                }
            }
        }
        self.nrows += 1;
        Ok(())
    }

    /// Scalar f64 column by name; Int columns are widened.
    pub fn f64_column(&self, name: &str) -> Result<Vec<f64>> {
        let col = self
            .column(name)
            .ok_or_else(|| Error::MissingColumn(name.to_string()))?;
        match &col.data {
            ColumnData::Float(v) => Ok(v.clone()),
            ColumnData::Int(v) => Ok(v.iter().map(|&x| x as f64).collect()),
            _ => Err(Error::MissingColumn(name.to_string())),
        }
    }

    /// Scalar i64 column by name.
    pub fn i64_column(&self, name: &str) -> Result<Vec<i64>> {
        let col = self
            .column(name)
            .ok_or_else(|| Error::MissingColumn(name.to_string()))?;
        match &col.data {
            ColumnData::Int(v) => Ok(v.clone()),
            _ => Err(Error::MissingColumn(name.to_string())),
        }
    }

    /// Text column by name.
    pub fn text_column(&self, name: &str) -> Result<Vec<String>> {
        let col = self
            .column(name)
            .ok_or_else(|| Error::MissingColumn(name.to_string()))?;
        match &col.data {
            ColumnData::Text { values, .. } => Ok(values.clone()),
            _ => Err(Error::MissingColumn(name.to_string())),
        }
    }

    /// Full f64 column as an array shaped `[nrows] + cell_shape`.
    pub fn array_column_f64(&self, name: &str) -> Result<ArrayD<f64>> {
        let col = self
            .column(name)
            .ok_or_else(|| Error::MissingColumn(name.to_string()))?;
        let values = match &col.data {
            ColumnData::Float(v) => v.clone(),
            ColumnData::Int(v) => v.iter().map(|&x| x as f64).collect(),
            _ => return Err(Error::MissingColumn(name.to_string())),
        };
        let mut shape = vec![col.nrows()];
        shape.extend_from_slice(&col.cell_shape);
        ArrayD::from_shape_vec(IxDyn(&shape), values)
            .map_err(|e| Error::Structural(format!("column {name}: {e}")))
    }

    /// Full complex column as an array shaped `[nrows] + cell_shape`.
    pub fn array_column_complex(&self, name: &str) -> Result<ArrayD<Complex64>> {
        let col = self
            .column(name)
            .ok_or_else(|| Error::MissingColumn(name.to_string()))?;
        let values = match &col.data {
            ColumnData::Complex(v) => v.clone(),
            _ => return Err(Error::MissingColumn(name.to_string())),
        };
        let mut shape = vec![col.nrows()];
        shape.extend_from_slice(&col.cell_shape);
        ArrayD::from_shape_vec(IxDyn(&shape), values)
            .map_err(|e| Error::Structural(format!("column {name}: {e}")))
    }
}
