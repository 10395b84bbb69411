//! Engine Module
//!
//! The table engine that composes filtering, sorting, selection, column
//! layout and persisted configuration into one stateful unit.
//!
//! ## Responsibilities
//! - Hydrate filter/sort/column state from the config store on build
//! - Recompute the visible set synchronously on every relevant mutation
//! - Schedule a debounced persist for every persisted-state mutation
//! - Flush pending writes on close/drop
//!
//! ## Lifecycle
//! ```text
//! Uninitialized ──► Hydrating ──► Ready ◄──┐
//!                                   │      │ setter: recompute + schedule persist
//!                                   └──────┘
//! ```

use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::error::{Result, TableError};
use crate::filter::{FilterCondition, FilterEvaluator, FilterPatch};
use crate::layout::{is_unique, ColumnLayout, ColumnManager};
use crate::record::{Columns, TableRecord};
use crate::selection::SelectionTracker;
use crate::sort::{SortComparator, SortConfig, SortDirection};
use crate::store::{ConfigKey, ConfigSchema, ConfigStore, FlushReport, Hydration, MemoryStorage, PersistedConfig, StorageBackend};

/// Engine lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Uninitialized,
    Hydrating,
    Ready,
}

/// The table engine
///
/// ## Ownership Model
/// - Single owner: every mutator takes `&mut self` and recomputes in place
/// - The only other thread is the config store's persist worker, which
///   sees serialized snapshots, never engine state
pub struct TableEngine<T> {
    /// Engine configuration
    config: EngineConfig,

    /// Column accessors
    columns: Columns<T>,

    /// Source records, in caller order
    records: Vec<T>,

    /// Persistence (validated reads, debounced writes)
    store: ConfigStore,

    state: EngineState,
    hydration: Hydration,

    // -------------------------------------------------------------------------
    // View State
    // -------------------------------------------------------------------------
    search_term: String,
    custom_filters: Vec<FilterCondition>,
    sort_config: SortConfig,
    columns_layout: ColumnManager,
    selection: SelectionTracker,

    /// Indices into `records` after search → filters → sort
    view: Vec<usize>,
}

impl<T: TableRecord> TableEngine<T> {
    /// Start building an engine over the given columns
    pub fn builder(columns: Columns<T>) -> TableEngineBuilder<T> {
        TableEngineBuilder {
            config: EngineConfig::default(),
            columns,
            records: Vec::new(),
            backend: None,
        }
    }

    // =========================================================================
    // Records
    // =========================================================================

    /// Replace the source records
    ///
    /// Re-runs the pipeline and prunes selected ids that no longer exist.
    pub fn set_records(&mut self, records: Vec<T>) {
        self.records = records;
        self.recompute();
    }

    pub fn records(&self) -> &[T] {
        &self.records
    }

    /// The visible set: search → custom filters → sort
    pub fn view(&self) -> Vec<&T> {
        self.view.iter().map(|&i| &self.records[i]).collect()
    }

    /// Ids of the visible set, in view order
    pub fn view_ids(&self) -> Vec<String> {
        self.view.iter().map(|&i| self.records[i].record_id().into_owned()).collect()
    }

    pub fn visible_count(&self) -> usize {
        self.view.len()
    }

    pub fn total_count(&self) -> usize {
        self.records.len()
    }

    // =========================================================================
    // Search & Filters
    // =========================================================================

    /// Set the free-text search term (not persisted)
    pub fn set_search_term(&mut self, term: impl Into<String>) {
        self.search_term = term.into();
        self.recompute();
    }

    pub fn search_term(&self) -> &str {
        &self.search_term
    }

    /// Add a filter condition; refused if its id is already in use
    pub fn add_custom_filter(&mut self, condition: FilterCondition) -> bool {
        if self.custom_filters.iter().any(|f| f.id == condition.id) {
            warn!(filter_id = %condition.id, "Filter id already exists; not added");
            return false;
        }
        self.custom_filters.push(condition);
        self.recompute();
        self.persist(&[ConfigKey::CustomFilters]);
        true
    }

    /// Patch an existing filter condition
    pub fn update_custom_filter(&mut self, id: &str, patch: FilterPatch) -> bool {
        let Some(condition) = self.custom_filters.iter_mut().find(|f| f.id == id) else {
            warn!(filter_id = id, "No filter with this id; update ignored");
            return false;
        };
        condition.apply_patch(patch);
        self.recompute();
        self.persist(&[ConfigKey::CustomFilters]);
        true
    }

    /// Remove a filter condition
    pub fn remove_custom_filter(&mut self, id: &str) -> bool {
        let before = self.custom_filters.len();
        self.custom_filters.retain(|f| f.id != id);
        if self.custom_filters.len() == before {
            warn!(filter_id = id, "No filter with this id; remove ignored");
            return false;
        }
        self.recompute();
        self.persist(&[ConfigKey::CustomFilters]);
        true
    }

    /// Drop every custom filter and the search term
    pub fn clear_all_filters(&mut self) {
        self.custom_filters.clear();
        self.search_term.clear();
        self.recompute();
        self.persist(&[ConfigKey::CustomFilters]);
    }

    pub fn custom_filters(&self) -> &[FilterCondition] {
        &self.custom_filters
    }

    /// Number of conditions that currently affect results
    pub fn active_filter_count(&self) -> usize {
        self.custom_filters.iter().filter(|f| f.is_active()).count()
    }

    /// True when a search term or an active condition is narrowing the view
    pub fn has_active_filters(&self) -> bool {
        !self.search_term.trim().is_empty() || self.active_filter_count() > 0
    }

    // =========================================================================
    // Sorting
    // =========================================================================

    /// Header-click sort toggle
    ///
    /// A new field starts ascending; the current field flips direction.
    /// Repeated clicks never return to unsorted.
    pub fn handle_column_sort(&mut self, field: &str) {
        if !self.columns.contains(field) {
            warn!(field, "Cannot sort by unknown column");
            return;
        }
        let direction = match self.sort_config.active_field() {
            Some(current) if current == field => self.sort_config.direction.reversed(),
            _ => SortDirection::Asc,
        };
        self.sort_config = SortConfig::new(field, direction);
        self.recompute();
        self.persist(&[ConfigKey::SortConfig]);
    }

    /// Set the sort directly; a config without a field restores input order
    pub fn set_sort_config(&mut self, sort_config: SortConfig) {
        if let Some(field) = sort_config.active_field() {
            if !self.columns.contains(field) {
                warn!(field, "Cannot sort by unknown column");
                return;
            }
        }
        self.sort_config = sort_config;
        self.recompute();
        self.persist(&[ConfigKey::SortConfig]);
    }

    pub fn sort_config(&self) -> &SortConfig {
        &self.sort_config
    }

    // =========================================================================
    // Columns
    // =========================================================================

    pub fn toggle_column_visibility(&mut self, column: &str) -> bool {
        let changed = self.columns_layout.toggle_column_visibility(column);
        if changed {
            self.persist(&[ConfigKey::HiddenColumns]);
        }
        changed
    }

    pub fn handle_column_reorder(&mut self, new_order: Vec<String>) -> bool {
        let changed = self.columns_layout.handle_column_reorder(new_order);
        if changed {
            self.persist(&[ConfigKey::ColumnOrder]);
        }
        changed
    }

    /// Restore the configured default layout
    pub fn reset_columns(&mut self) {
        self.columns_layout.reset_columns();
        self.persist(&[ConfigKey::HiddenColumns, ConfigKey::ColumnOrder]);
    }

    pub fn visible_columns(&self) -> Vec<String> {
        self.columns_layout.visible_columns()
    }

    pub fn is_column_visible(&self, column: &str) -> bool {
        self.columns_layout.is_column_visible(column)
    }

    pub fn hidden_columns(&self) -> &[String] {
        self.columns_layout.hidden_columns()
    }

    pub fn column_order(&self) -> &[String] {
        self.columns_layout.column_order()
    }

    // =========================================================================
    // Selection
    // =========================================================================

    pub fn select_item(&mut self, id: &str, selected: Option<bool>) -> bool {
        self.selection.select_item(id, selected)
    }

    /// Select exactly the visible set, clear, or toggle
    pub fn select_all(&mut self, selected: Option<bool>) -> bool {
        let visible = self.view_ids();
        self.selection.select_all(&visible, selected)
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear_selection();
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.selection.is_selected(id)
    }

    pub fn selected_ids(&self) -> Vec<String> {
        self.selection.selected_ids()
    }

    /// Selected source records, in source order
    pub fn selected_items(&self) -> Vec<&T> {
        self.selection.selected_items(&self.records)
    }

    pub fn is_all_selected(&self) -> bool {
        self.selection.is_all_selected(&self.view_ids())
    }

    pub fn is_indeterminate(&self) -> bool {
        self.selection.is_indeterminate(&self.view_ids())
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    pub fn state(&self) -> EngineState {
        self.state
    }

    /// How the persisted config was obtained at build time
    pub fn hydration(&self) -> &Hydration {
        &self.hydration
    }

    /// Snapshot of everything that gets persisted
    pub fn persisted_config(&self) -> PersistedConfig {
        let layout = self.columns_layout.layout();
        PersistedConfig {
            config_version: self.config.config_version.clone(),
            custom_filters: self.custom_filters.clone(),
            hidden_columns: layout.hidden_columns.clone(),
            column_order: layout.column_order.clone(),
            sort_config: self.sort_config.clone(),
        }
    }

    /// Write pending config now
    pub fn flush(&self) -> FlushReport {
        self.store.flush()
    }

    /// Number of config keys waiting for the debounce window
    pub fn pending_writes(&self) -> usize {
        self.store.pending_len()
    }

    /// Tear down: cancel the debounce timer and flush synchronously
    pub fn close(self) -> Result<FlushReport> {
        debug!(namespace = %self.config.namespace, "Closing table engine");
        self.store.close()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn columns(&self) -> &Columns<T> {
        &self.columns
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Run search → filters → sort and prune the selection
    fn recompute(&mut self) {
        let mut evaluator = FilterEvaluator::new(&self.columns).max_search_length(self.config.max_search_length);
        if let Some(fields) = self.config.search_fields.as_deref() {
            evaluator = evaluator.search_fields(fields);
        }
        let mut view = evaluator.matching_indices(&self.records, &self.search_term, &self.custom_filters);

        SortComparator::new(&self.columns).sort_indices(&self.records, &mut view, &self.sort_config);

        self.view = view;
        self.selection.prune(self.records.iter().map(|r| r.record_id()));
    }

    fn persist(&self, keys: &[ConfigKey]) {
        self.store.persist_config(&self.config.namespace, &self.persisted_config(), keys);
    }
}

/// Builder for TableEngine
pub struct TableEngineBuilder<T> {
    config: EngineConfig,
    columns: Columns<T>,
    records: Vec<T>,
    backend: Option<Arc<dyn StorageBackend>>,
}

impl<T: TableRecord> TableEngineBuilder<T> {
    /// Set the engine configuration
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the initial records
    pub fn records(mut self, records: Vec<T>) -> Self {
        self.records = records;
        self
    }

    /// Set the storage backend (defaults to a fresh `MemoryStorage`)
    pub fn storage(mut self, backend: Arc<dyn StorageBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Validate the configuration, hydrate persisted state and compute the
    /// first view
    pub fn build(self) -> Result<TableEngine<T>> {
        let Self {
            config,
            columns,
            records,
            backend,
        } = self;

        if config.namespace.trim().is_empty() {
            return Err(TableError::Config("namespace must not be empty".to_string()));
        }

        let column_ids = columns.ids();
        let default_layout = match &config.default_layout {
            Some(layout) => {
                validate_layout(layout, &column_ids)?;
                layout.clone()
            }
            None => ColumnLayout::new(column_ids.iter().cloned()),
        };
        if let Some(fields) = &config.search_fields {
            for field in fields.iter().filter(|f| !columns.contains(f)) {
                warn!(field = %field, "Search field is not a registered column; it will be skipped");
            }
        }

        let mut state = EngineState::Uninitialized;
        let backend = backend.unwrap_or_else(|| Arc::new(MemoryStorage::new()));
        let store = ConfigStore::new(backend, config.persist_delay)?;

        debug!(namespace = %config.namespace, from = ?state, "Hydrating table config");
        state = EngineState::Hydrating;

        let defaults = PersistedConfig::new(config.config_version.clone(), default_layout.clone());
        let (persisted, hydration) = store.hydrate(ConfigSchema {
            namespace: &config.namespace,
            columns: &column_ids,
            defaults: &defaults,
        });

        let selection = SelectionTracker::new(config.selection);
        let mut engine = TableEngine {
            columns_layout: ColumnManager::with_layout(default_layout, persisted.layout()),
            custom_filters: persisted.custom_filters,
            sort_config: persisted.sort_config,
            search_term: String::new(),
            selection,
            view: Vec::new(),
            config,
            columns,
            records,
            store,
            state,
            hydration,
        };
        engine.recompute();
        engine.state = EngineState::Ready;

        debug!(
            namespace = %engine.config.namespace,
            from = ?EngineState::Hydrating,
            hydration = ?engine.hydration,
            visible = engine.view.len(),
            "Table engine ready"
        );
        Ok(engine)
    }
}

/// Default layouts must order registered columns, each once, and hide only
/// ordered columns
fn validate_layout(layout: &ColumnLayout, column_ids: &[String]) -> Result<()> {
    if !is_unique(&layout.column_order) {
        return Err(TableError::Config("default column order has duplicates".to_string()));
    }
    if let Some(unknown) = layout.column_order.iter().find(|c| !column_ids.contains(c)) {
        return Err(TableError::Config(format!("default column order names unknown column '{}'", unknown)));
    }
    if let Some(stray) = layout.hidden_columns.iter().find(|c| !layout.column_order.contains(c)) {
        return Err(TableError::Config(format!("hidden column '{}' is not in the column order", stray)));
    }
    Ok(())
}
