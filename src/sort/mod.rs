//! Sort Module
//!
//! Single-key, type-aware sorting.
//!
//! ## Type Dispatch (per compared pair, first match wins)
//! 1. `Null` sorts before any defined value (ascending)
//! 2. number vs number: numeric
//! 3. date vs date: timestamp
//! 4. text vs text, both date-like: timestamp
//! 5. text vs text: locale-style collation
//! 6. anything else: stringify both sides, then collate
//!
//! `Desc` reverses the comparison, so nulls end up last.

mod comparator;
mod config;

pub use comparator::{locale_compare, SortComparator};
pub use config::{SortConfig, SortDirection};
