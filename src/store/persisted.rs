//! Persisted view configuration

use serde::{Deserialize, Serialize};

use crate::filter::FilterCondition;
use crate::layout::ColumnLayout;
use crate::sort::SortConfig;

/// Config version used when the caller does not pick one
pub const DEFAULT_CONFIG_VERSION: &str = "1.0";

/// The namespaced keys one table instance owns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ConfigKey {
    ConfigVersion,
    CustomFilters,
    HiddenColumns,
    ColumnOrder,
    SortConfig,
}

impl ConfigKey {
    /// Every key, version first
    pub const ALL: [ConfigKey; 5] = [
        ConfigKey::ConfigVersion,
        ConfigKey::CustomFilters,
        ConfigKey::HiddenColumns,
        ConfigKey::ColumnOrder,
        ConfigKey::SortConfig,
    ];

    pub fn suffix(self) -> &'static str {
        match self {
            ConfigKey::ConfigVersion => "config-version",
            ConfigKey::CustomFilters => "custom-filters",
            ConfigKey::HiddenColumns => "hidden-columns",
            ConfigKey::ColumnOrder => "column-order",
            ConfigKey::SortConfig => "sort-config",
        }
    }

    /// Full storage key: `{namespace}-{suffix}`
    pub fn key(self, namespace: &str) -> String {
        format!("{}-{}", namespace, self.suffix())
    }
}

/// Everything persisted for one table instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedConfig {
    pub config_version: String,
    pub custom_filters: Vec<FilterCondition>,
    pub hidden_columns: Vec<String>,
    pub column_order: Vec<String>,
    pub sort_config: SortConfig,
}

impl PersistedConfig {
    /// Defaults for a version: no filters, the given layout, unsorted
    pub fn new(config_version: impl Into<String>, layout: ColumnLayout) -> Self {
        Self {
            config_version: config_version.into(),
            custom_filters: Vec::new(),
            hidden_columns: layout.hidden_columns,
            column_order: layout.column_order,
            sort_config: SortConfig::default(),
        }
    }

    pub fn layout(&self) -> ColumnLayout {
        ColumnLayout {
            hidden_columns: self.hidden_columns.clone(),
            column_order: self.column_order.clone(),
        }
    }
}

/// What a namespace is validated against on load
#[derive(Debug, Clone, Copy)]
pub struct ConfigSchema<'a> {
    pub namespace: &'a str,

    /// Registered column ids (valid sort fields)
    pub columns: &'a [String],

    /// Fallback values; `defaults.config_version` is the expected version
    pub defaults: &'a PersistedConfig,
}
