//! Config Store
//!
//! Validated reads plus debounced writes over a [`StorageBackend`].
//!
//! Reads never fail: a missing, unreadable, unparseable or invalid value
//! yields the caller's default and a warning. Write failures are logged by
//! the scheduler and stay pending for the next write; they never touch
//! in-memory state.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, error, warn};

use crate::error::Result;
use crate::filter::FilterCondition;
use crate::layout::{is_permutation_of, is_unique};
use crate::sort::SortConfig;

use super::{ConfigKey, ConfigSchema, FlushReport, PersistEntry, PersistScheduler, PersistedConfig, StorageBackend};

/// Result of comparing a namespace's stored version with the expected one
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionCheck {
    /// Stored version equals the expected version
    Current,
    /// Nothing stored yet
    Missing,
    /// Stored under another version
    Mismatch { found: String },
    /// The version key could not be read or parsed
    Unreadable,
}

/// Where a hydrated config came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Hydration {
    /// Read from storage (individual keys may still have fallen back)
    Stored,
    /// Defaults, because of the given version check outcome
    Defaults(VersionCheck),
}

/// Namespaced config persistence
pub struct ConfigStore {
    backend: Arc<dyn StorageBackend>,
    scheduler: PersistScheduler,
}

impl ConfigStore {
    /// Create a store writing through `backend` after `persist_delay`
    pub fn new(backend: Arc<dyn StorageBackend>, persist_delay: Duration) -> Result<Self> {
        let scheduler = PersistScheduler::new(Arc::clone(&backend), persist_delay)?;
        Ok(Self { backend, scheduler })
    }

    /// Read and validate one key, falling back to `default`
    pub fn load_config<T>(&self, key: &str, default: T, validator: Option<&dyn Fn(&T) -> bool>) -> T
    where
        T: DeserializeOwned,
    {
        let raw = match self.backend.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return default,
            Err(e) => {
                warn!(key, error = %e, "Config storage unavailable; using default");
                return default;
            }
        };

        let value: T = match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(e) => {
                warn!(key, error = %e, "Stored config is not parseable; using default");
                return default;
            }
        };

        match validator {
            Some(is_valid) if !is_valid(&value) => {
                warn!(key, "Stored config failed validation; using default");
                default
            }
            _ => value,
        }
    }

    /// Compare a namespace's stored version against `expected`
    pub fn check_version(&self, namespace: &str, expected: &str) -> VersionCheck {
        let key = ConfigKey::ConfigVersion.key(namespace);
        let raw = match self.backend.get(&key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return VersionCheck::Missing,
            Err(e) => {
                warn!(key = %key, error = %e, "Cannot read config version");
                return VersionCheck::Unreadable;
            }
        };

        match serde_json::from_str::<String>(&raw) {
            Ok(found) if found == expected => VersionCheck::Current,
            Ok(found) => VersionCheck::Mismatch { found },
            Err(e) => {
                warn!(key = %key, error = %e, "Stored config version is not parseable");
                VersionCheck::Unreadable
            }
        }
    }

    /// Load a namespace's full config
    ///
    /// Unless the stored version is current, every key is treated as absent:
    /// the defaults are returned and immediately scheduled for persisting
    /// under the expected version.
    pub fn hydrate(&self, schema: ConfigSchema<'_>) -> (PersistedConfig, Hydration) {
        let defaults = schema.defaults;
        let check = self.check_version(schema.namespace, &defaults.config_version);

        if check != VersionCheck::Current {
            if let VersionCheck::Mismatch { found } = &check {
                warn!(
                    namespace = schema.namespace,
                    found = %found,
                    expected = %defaults.config_version,
                    "Config version mismatch; discarding stored config"
                );
            } else {
                debug!(namespace = schema.namespace, ?check, "No usable stored config; using defaults");
            }
            self.persist_config(schema.namespace, defaults, &ConfigKey::ALL);
            return (defaults.clone(), Hydration::Defaults(check));
        }

        let ns = schema.namespace;
        let known_order = &defaults.column_order;

        let custom_filters = self.load_config(
            &ConfigKey::CustomFilters.key(ns),
            defaults.custom_filters.clone(),
            Some(&|filters: &Vec<FilterCondition>| {
                let ids: Vec<String> = filters.iter().map(|f| f.id.clone()).collect();
                ids.iter().all(|id| !id.is_empty()) && is_unique(&ids)
            }),
        );
        let hidden_columns = self.load_config(
            &ConfigKey::HiddenColumns.key(ns),
            defaults.hidden_columns.clone(),
            Some(&|hidden: &Vec<String>| is_unique(hidden) && hidden.iter().all(|c| known_order.contains(c))),
        );
        let column_order = self.load_config(
            &ConfigKey::ColumnOrder.key(ns),
            defaults.column_order.clone(),
            Some(&|order: &Vec<String>| is_permutation_of(order, known_order)),
        );
        let sort_config = self.load_config(
            &ConfigKey::SortConfig.key(ns),
            defaults.sort_config.clone(),
            Some(&|sort: &SortConfig| sort.active_field().map_or(true, |f| schema.columns.iter().any(|c| c == f))),
        );

        debug!(namespace = ns, filters = custom_filters.len(), "Hydrated stored config");
        let config = PersistedConfig {
            config_version: defaults.config_version.clone(),
            custom_filters,
            hidden_columns,
            column_order,
            sort_config,
        };
        (config, Hydration::Stored)
    }

    /// Schedule the given keys of `config` (plus its version) for writing
    pub fn persist_config(&self, namespace: &str, config: &PersistedConfig, keys: &[ConfigKey]) {
        let mut entries = Vec::with_capacity(keys.len() + 1);
        let mut push = |key: ConfigKey, entry: Result<PersistEntry>| match entry {
            Ok(entry) => entries.push(entry),
            Err(e) => error!(key = key.suffix(), error = %e, "Cannot serialize config value"),
        };

        push(
            ConfigKey::ConfigVersion,
            PersistEntry::json(ConfigKey::ConfigVersion.key(namespace), &config.config_version),
        );
        for &key in keys {
            let full_key = key.key(namespace);
            let entry = match key {
                ConfigKey::ConfigVersion => continue,
                ConfigKey::CustomFilters => PersistEntry::json(full_key, &config.custom_filters),
                ConfigKey::HiddenColumns => PersistEntry::json(full_key, &config.hidden_columns),
                ConfigKey::ColumnOrder => PersistEntry::json(full_key, &config.column_order),
                ConfigKey::SortConfig => PersistEntry::json(full_key, &config.sort_config),
            };
            push(key, entry);
        }

        self.persist(entries);
    }

    /// Schedule raw entries
    pub fn persist<I>(&self, entries: I)
    where
        I: IntoIterator<Item = PersistEntry>,
    {
        self.scheduler.schedule(entries);
    }

    /// Schedule one serializable value
    pub fn persist_value<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let entry = PersistEntry::json(key, value)?;
        self.scheduler.schedule([entry]);
        Ok(())
    }

    /// Write pending entries now
    pub fn flush(&self) -> FlushReport {
        self.scheduler.flush()
    }

    pub fn pending_len(&self) -> usize {
        self.scheduler.pending_len()
    }

    /// Remove every stored key of a namespace; returns how many were removed
    pub fn remove_namespace(&self, namespace: &str) -> Result<usize> {
        let mut removed = 0;
        for key in ConfigKey::ALL {
            let full_key = key.key(namespace);
            if self.backend.get(&full_key).ok().flatten().is_some() {
                removed += 1;
            }
            self.backend.remove(&full_key)?;
        }
        Ok(removed)
    }

    /// Stop the scheduler, flushing what is pending
    pub fn close(self) -> Result<FlushReport> {
        self.scheduler.close()
    }
}
