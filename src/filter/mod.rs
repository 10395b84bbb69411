//! Filter Module
//!
//! Free-text search plus AND-combined column conditions.
//!
//! ## Pipeline Order
//! ```text
//! records ──► search (OR across fields) ──► conditions (AND) ──► sort
//! ```
//! Search always runs before the column conditions; both run before
//! sorting.

mod condition;
mod evaluator;
mod search;

pub use condition::{FilterCondition, FilterPatch, Operator};
pub use evaluator::FilterEvaluator;
pub use search::{is_safe_search_term, DEFAULT_MAX_SEARCH_LENGTH};
