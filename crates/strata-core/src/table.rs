use crate::error::{Error, Result};
use crate::value::{Column, Value};

/// Flat, column-oriented table with a fixed row count.
///
/// Column order is insertion order. Inserting a name that already exists
/// replaces its values in place, keeping the original position.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FlatTable {
    rows: usize,
    names: Vec<String>,
    columns: Vec<Column>,
}

impl FlatTable {
    pub fn new(rows: usize) -> Self {
        Self {
            rows,
            names: Vec::new(),
            columns: Vec::new(),
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn column_names(&self) -> &[String] {
        &self.names
    }

    pub fn column(&self, name: &str) -> Option<&[Value]> {
        self.position(name).map(|idx| self.columns[idx].as_slice())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Insert a column, replacing the values of an existing column with the
    /// same name.
    pub fn insert(&mut self, name: impl Into<String>, values: Column) -> Result<()> {
        let name = name.into();
        if values.len() != self.rows {
            return Err(Error::ColumnLength {
                column: name,
                len: values.len(),
                rows: self.rows,
            });
        }
        match self.position(&name) {
            Some(idx) => self.columns[idx] = values,
            None => {
                self.names.push(name);
                self.columns.push(values);
            }
        }
        Ok(())
    }

    /// Values of one row, in column order.
    pub fn row(&self, index: usize) -> Option<Vec<&Value>> {
        if index >= self.rows {
            return None;
        }
        Some(self.columns.iter().map(|column| &column[index]).collect())
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = Vec<&Value>> + '_ {
        (0..self.rows).filter_map(|index| self.row(index))
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|candidate| candidate == name)
    }
}
