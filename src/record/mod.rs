//! Record Module
//!
//! How the engine sees caller-defined records.
//!
//! ## Responsibilities
//! - Stable string identity for every record (`TableRecord`)
//! - Column accessor registry mapping a column id to a typed cell value
//! - Cell value model shared by filtering (string coercion) and sorting
//!   (type dispatch)
//!
//! Records are never inspected by reflection: only the columns registered in
//! a [`Columns`] map are visible to filters, search and sorting.

mod columns;
mod json;
mod value;

use std::borrow::Cow;

pub use columns::{Accessor, Column, Columns};
pub use json::json_columns;
pub use value::{parse_date, CellValue};

/// A record the engine can track by identifier
pub trait TableRecord {
    /// Stable identifier used for selection
    fn record_id(&self) -> Cow<'_, str>;
}

impl<R: TableRecord + ?Sized> TableRecord for &R {
    fn record_id(&self) -> Cow<'_, str> {
        (**self).record_id()
    }
}
