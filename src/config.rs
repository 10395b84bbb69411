//! Configuration for tablekit
//!
//! Centralized engine configuration with sensible defaults.

use std::time::Duration;

use crate::filter::DEFAULT_MAX_SEARCH_LENGTH;
use crate::layout::ColumnLayout;
use crate::selection::SelectionOptions;
use crate::store::{DEFAULT_CONFIG_VERSION, DEFAULT_PERSIST_DELAY};

/// Main configuration for a table engine instance
#[derive(Debug, Clone)]
pub struct EngineConfig {
    // -------------------------------------------------------------------------
    // Persistence Configuration
    // -------------------------------------------------------------------------
    /// Storage key prefix isolating this table's persisted config
    /// Keys:
    ///   {namespace}-config-version
    ///   {namespace}-custom-filters
    ///   {namespace}-hidden-columns
    ///   {namespace}-column-order
    ///   {namespace}-sort-config
    pub namespace: String,

    /// Expected config version; a different stored version resets to defaults
    pub config_version: String,

    /// Debounce window for persisting; zero writes through immediately
    pub persist_delay: Duration,

    // -------------------------------------------------------------------------
    // Column Configuration
    // -------------------------------------------------------------------------
    /// Default visibility/order; `None` shows every column in registration order
    pub default_layout: Option<ColumnLayout>,

    // -------------------------------------------------------------------------
    // Search Configuration
    // -------------------------------------------------------------------------
    /// Columns searched by the free-text term; `None` searches all text cells
    pub search_fields: Option<Vec<String>>,

    /// Longest accepted search term, in characters
    pub max_search_length: usize,

    // -------------------------------------------------------------------------
    // Selection Configuration
    // -------------------------------------------------------------------------
    pub selection: SelectionOptions,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            namespace: "table".to_string(),
            config_version: DEFAULT_CONFIG_VERSION.to_string(),
            persist_delay: DEFAULT_PERSIST_DELAY,
            default_layout: None,
            search_fields: None,
            max_search_length: DEFAULT_MAX_SEARCH_LENGTH,
            selection: SelectionOptions::default(),
        }
    }
}

impl EngineConfig {
    /// Create a new config builder
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }
}

/// Builder for EngineConfig
#[derive(Default)]
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    /// Set the storage namespace
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.config.namespace = namespace.into();
        self
    }

    /// Set the expected config version
    pub fn config_version(mut self, version: impl Into<String>) -> Self {
        self.config.config_version = version.into();
        self
    }

    /// Set the persist debounce window
    pub fn persist_delay(mut self, delay: Duration) -> Self {
        self.config.persist_delay = delay;
        self
    }

    /// Set the persist debounce window (in milliseconds)
    pub fn persist_delay_ms(self, ms: u64) -> Self {
        self.persist_delay(Duration::from_millis(ms))
    }

    /// Set the default column layout
    pub fn default_layout(mut self, layout: ColumnLayout) -> Self {
        self.config.default_layout = Some(layout);
        self
    }

    /// Restrict free-text search to these columns
    pub fn search_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.search_fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// Set the maximum search term length
    pub fn max_search_length(mut self, max: usize) -> Self {
        self.config.max_search_length = max;
        self
    }

    /// Allow or forbid selecting more than one record
    pub fn multi_select(mut self, enabled: bool) -> Self {
        self.config.selection.multi_select = enabled;
        self
    }

    /// Cap the number of selected records
    pub fn max_selection(mut self, max: usize) -> Self {
        self.config.selection.max_selection = Some(max);
        self
    }

    pub fn build(self) -> EngineConfig {
        self.config
    }
}
