//! # tablekit
//!
//! A generic in-memory table engine with:
//! - Free-text search across columns
//! - AND-combined column filters with per-type operators
//! - Type-aware single-key sorting (numbers, dates, text)
//! - Column visibility and ordering
//! - Row selection bound to the filtered view
//! - Persisted view configuration with version invalidation and debounced writes
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     TableEngine (façade)                    │
//! │          records + columns + config → view + mutators       │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!     ┌─────────────────┼──────────────────┬─────────────────┐
//!     │                 │                  │                 │
//!     ▼                 ▼                  ▼                 ▼
//! ┌─────────┐     ┌───────────┐     ┌────────────┐    ┌─────────────┐
//! │ Filter  │ ──► │   Sort    │     │ Selection  │    │   Column    │
//! │Evaluator│     │Comparator │     │  Tracker   │    │   Manager   │
//! └─────────┘     └───────────┘     └────────────┘    └─────────────┘
//!                       │
//!                       ▼
//!              ┌─────────────────┐
//!              │   ConfigStore   │  validated reads, debounced writes
//!              └────────┬────────┘
//!                       ▼
//!              ┌─────────────────┐
//!              │ StorageBackend  │  memory / file
//!              └─────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod record;
pub mod filter;
pub mod sort;
pub mod selection;
pub mod layout;
pub mod store;
pub mod engine;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{TableError, Result};
pub use config::EngineConfig;
pub use engine::{EngineState, TableEngine, TableEngineBuilder};
pub use filter::{FilterCondition, FilterPatch, Operator};
pub use layout::ColumnLayout;
pub use record::{CellValue, Columns, TableRecord};
pub use sort::{SortConfig, SortDirection};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of tablekit
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
