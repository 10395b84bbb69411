//! Column accessor registry
//!
//! An ordered map from column id to a function extracting that column's
//! [`CellValue`] from a record.

use std::fmt;

use crate::error::{Result, TableError};

use super::CellValue;

/// Extracts one column's value from a record. Fallible accessors model
/// malformed records; the evaluators contain such faults per record.
pub type Accessor<T> = Box<dyn Fn(&T) -> Result<CellValue>>;

/// A registered column
pub struct Column<T> {
    id: String,
    accessor: Accessor<T>,
}

impl<T> Column<T> {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Read this column from a record
    pub fn read(&self, record: &T) -> Result<CellValue> {
        (self.accessor)(record)
    }
}

/// Ordered set of column accessors for records of type `T`
///
/// Registration order is the default display order.
pub struct Columns<T> {
    columns: Vec<Column<T>>,
}

impl<T> Columns<T> {
    pub fn new() -> Self {
        Self { columns: Vec::new() }
    }

    /// Register an infallible accessor
    ///
    /// Registering an id twice replaces the accessor but keeps the original
    /// position.
    pub fn column<V, F>(self, id: impl Into<String>, accessor: F) -> Self
    where
        V: Into<CellValue>,
        F: Fn(&T) -> V + 'static,
    {
        self.try_column(id, move |record| Ok(accessor(record).into()))
    }

    /// Register a fallible accessor
    pub fn try_column<F>(mut self, id: impl Into<String>, accessor: F) -> Self
    where
        F: Fn(&T) -> Result<CellValue> + 'static,
    {
        let id = id.into();
        let accessor: Accessor<T> = Box::new(accessor);
        match self.columns.iter_mut().find(|c| c.id == id) {
            Some(existing) => existing.accessor = accessor,
            None => self.columns.push(Column { id, accessor }),
        }
        self
    }

    /// Check whether a column id is registered
    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn get(&self, id: &str) -> Option<&Column<T>> {
        self.columns.iter().find(|c| c.id == id)
    }

    /// Column ids in registration order
    pub fn ids(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.id.clone()).collect()
    }

    /// Read a column from a record
    ///
    /// Returns `Err(FieldAccess)` for an unregistered column as well as for
    /// an accessor fault; use [`Columns::contains`] to tell them apart.
    pub fn value(&self, record: &T, id: &str) -> Result<CellValue> {
        match self.get(id) {
            Some(column) => column.read(record),
            None => Err(TableError::field(id, "unknown column")),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Column<T>> {
        self.columns.iter()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl<T> Default for Columns<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Columns<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.columns.iter().map(|c| &c.id)).finish()
    }
}
