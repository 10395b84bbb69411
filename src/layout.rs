//! Column Manager
//!
//! Column visibility and display order, independent of filtering and
//! sorting. `column_order` decides the sequence; `hidden_columns` is a mask
//! applied on top of it.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Visibility and order of a table's columns
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ColumnLayout {
    pub hidden_columns: Vec<String>,
    pub column_order: Vec<String>,
}

impl ColumnLayout {
    /// All columns visible, in the given order
    pub fn new<I, S>(column_order: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            hidden_columns: Vec::new(),
            column_order: column_order.into_iter().map(Into::into).collect(),
        }
    }

    pub fn with_hidden<I, S>(mut self, hidden: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for column in hidden {
            let column = column.into();
            if !self.hidden_columns.contains(&column) {
                self.hidden_columns.push(column);
            }
        }
        self
    }

    /// Ordered columns minus the hidden ones
    pub fn visible_columns(&self) -> Vec<String> {
        self.column_order
            .iter()
            .filter(|c| !self.hidden_columns.contains(c))
            .cloned()
            .collect()
    }
}

/// True when `order` holds each of `known` exactly once and nothing else
pub fn is_permutation_of(order: &[String], known: &[String]) -> bool {
    if order.len() != known.len() {
        return false;
    }
    let seen: HashSet<&str> = order.iter().map(String::as_str).collect();
    seen.len() == order.len() && known.iter().all(|k| seen.contains(k.as_str()))
}

/// True when `columns` has no duplicates
pub fn is_unique(columns: &[String]) -> bool {
    let seen: HashSet<&str> = columns.iter().map(String::as_str).collect();
    seen.len() == columns.len()
}

/// Tracks the current layout and the caller's defaults
#[derive(Debug, Clone)]
pub struct ColumnManager {
    layout: ColumnLayout,
    defaults: ColumnLayout,
}

impl ColumnManager {
    pub fn new(defaults: ColumnLayout) -> Self {
        Self {
            layout: defaults.clone(),
            defaults,
        }
    }

    /// Start from a previously stored layout
    pub fn with_layout(defaults: ColumnLayout, layout: ColumnLayout) -> Self {
        Self { layout, defaults }
    }

    /// Flip one column between hidden and shown
    ///
    /// Columns outside the default order are refused.
    pub fn toggle_column_visibility(&mut self, column: &str) -> bool {
        if !self.is_known(column) {
            warn!(column, "Cannot toggle unknown column");
            return false;
        }
        match self.layout.hidden_columns.iter().position(|c| c == column) {
            Some(index) => {
                self.layout.hidden_columns.remove(index);
            }
            None => self.layout.hidden_columns.push(column.to_string()),
        }
        true
    }

    /// Replace the display order
    ///
    /// The new order must be a permutation of the known columns.
    pub fn handle_column_reorder(&mut self, new_order: Vec<String>) -> bool {
        if !is_permutation_of(&new_order, &self.defaults.column_order) {
            warn!(?new_order, "Column reorder is not a permutation of known columns; ignored");
            return false;
        }
        self.layout.column_order = new_order;
        true
    }

    /// Restore the caller-supplied defaults
    pub fn reset_columns(&mut self) {
        self.layout = self.defaults.clone();
    }

    pub fn visible_columns(&self) -> Vec<String> {
        self.layout.visible_columns()
    }

    pub fn is_column_visible(&self, column: &str) -> bool {
        self.layout.column_order.iter().any(|c| c == column)
            && !self.layout.hidden_columns.iter().any(|c| c == column)
    }

    pub fn hidden_columns(&self) -> &[String] {
        &self.layout.hidden_columns
    }

    pub fn column_order(&self) -> &[String] {
        &self.layout.column_order
    }

    pub fn layout(&self) -> &ColumnLayout {
        &self.layout
    }

    pub fn defaults(&self) -> &ColumnLayout {
        &self.defaults
    }

    fn is_known(&self, column: &str) -> bool {
        self.defaults.column_order.iter().any(|c| c == column)
    }
}
