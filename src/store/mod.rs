//! Store Module
//!
//! Durable key/value persistence for table view configuration.
//!
//! ## Responsibilities
//! - Pluggable backends (`MemoryStorage`, `FileStorage`)
//! - Validated reads that fall back to caller defaults, never failing
//! - Debounced, coalescing writes with flush-on-close
//! - Schema-version invalidation of a whole namespace
//!
//! ## Storage Layout (one namespace per table instance)
//! ```text
//! {namespace}-config-version   "1.0"
//! {namespace}-custom-filters   [FilterCondition, ...]
//! {namespace}-hidden-columns   ["col", ...]
//! {namespace}-column-order     ["col", ...]
//! {namespace}-sort-config      {"field": "col", "direction": "asc"}
//! ```

mod backend;
mod config_store;
mod file;
mod persisted;
mod scheduler;

pub use backend::{MemoryStorage, StorageBackend};
pub use config_store::{ConfigStore, Hydration, VersionCheck};
pub use file::{FileStorage, FILE_HEADER_SIZE, FILE_MAGIC};
pub use persisted::{ConfigKey, ConfigSchema, PersistedConfig, DEFAULT_CONFIG_VERSION};
pub use scheduler::{FlushReport, PersistEntry, PersistScheduler, DEFAULT_PERSIST_DELAY};
