//! Selection Tracker
//!
//! The set of selected record identifiers.
//!
//! ## Rules
//! - Selection survives filter changes; ids that leave the *source*
//!   collection are pruned on the next recompute
//! - "Select all" always resolves against the ids passed in, which is the
//!   filtered view when driven by the table engine
//! - `max_selection` refuses, never truncates

use std::collections::BTreeSet;

use tracing::{debug, warn};

use crate::record::TableRecord;

/// Selection behaviour
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionOptions {
    /// When false, selecting an id replaces the whole selection
    pub multi_select: bool,

    /// Upper bound on the number of selected ids
    pub max_selection: Option<usize>,
}

impl Default for SelectionOptions {
    fn default() -> Self {
        Self {
            multi_select: true,
            max_selection: None,
        }
    }
}

/// Tracks selected record ids
#[derive(Debug, Clone, Default)]
pub struct SelectionTracker {
    selected: BTreeSet<String>,
    options: SelectionOptions,
}

impl SelectionTracker {
    pub fn new(options: SelectionOptions) -> Self {
        Self {
            selected: BTreeSet::new(),
            options,
        }
    }

    pub fn options(&self) -> SelectionOptions {
        self.options
    }

    /// Select, deselect or toggle (`None`) one id
    ///
    /// Returns false when the change was refused or changed nothing.
    pub fn select_item(&mut self, id: &str, selected: Option<bool>) -> bool {
        let currently = self.selected.contains(id);
        let target = selected.unwrap_or(!currently);

        if !target {
            return self.selected.remove(id);
        }
        if currently {
            return false;
        }

        if !self.options.multi_select {
            self.selected.clear();
            self.selected.insert(id.to_string());
            return true;
        }

        if let Some(max) = self.options.max_selection {
            if self.selected.len() >= max {
                warn!(id, max, "Selection limit reached; ignoring select");
                return false;
            }
        }

        self.selected.insert(id.to_string())
    }

    /// Select exactly `visible`, clear (`Some(false)`), or toggle (`None`)
    ///
    /// Selecting is all-or-nothing: if `visible` exceeds `max_selection`, or
    /// holds several ids while multi-select is off, the call is refused and
    /// the existing selection is kept.
    pub fn select_all<S: AsRef<str>>(&mut self, visible: &[S], selected: Option<bool>) -> bool {
        let target = selected.unwrap_or_else(|| !self.is_all_selected(visible));

        if !target {
            let changed = !self.selected.is_empty();
            self.selected.clear();
            return changed;
        }

        if let Some(max) = self.options.max_selection {
            if visible.len() > max {
                warn!(requested = visible.len(), max, "Select-all exceeds selection limit; refused");
                return false;
            }
        }
        if !self.options.multi_select && visible.len() > 1 {
            warn!(requested = visible.len(), "Select-all needs multi-select; refused");
            return false;
        }

        self.selected = visible.iter().map(|id| id.as_ref().to_string()).collect();
        true
    }

    pub fn clear_selection(&mut self) {
        self.selected.clear();
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.selected.contains(id)
    }

    /// Selected ids in ascending order
    pub fn selected_ids(&self) -> Vec<String> {
        self.selected.iter().cloned().collect()
    }

    /// Selected records, in `records` order
    pub fn selected_items<'a, R: TableRecord>(&self, records: &'a [R]) -> Vec<&'a R> {
        records
            .iter()
            .filter(|r| self.selected.contains(&*r.record_id()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// Non-empty view with every id selected
    pub fn is_all_selected<S: AsRef<str>>(&self, visible: &[S]) -> bool {
        !visible.is_empty() && visible.iter().all(|id| self.selected.contains(id.as_ref()))
    }

    /// Some, but not all, of the view is selected
    pub fn is_indeterminate<S: AsRef<str>>(&self, visible: &[S]) -> bool {
        let hits = visible.iter().filter(|id| self.selected.contains(id.as_ref())).count();
        hits > 0 && hits < visible.len()
    }

    /// Drop ids that are not in `source_ids`; returns how many were dropped
    pub fn prune<I, S>(&mut self, source_ids: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if self.selected.is_empty() {
            return 0;
        }
        let live: BTreeSet<String> = source_ids.into_iter().map(|id| id.as_ref().to_string()).collect();
        let before = self.selected.len();
        self.selected.retain(|id| live.contains(id));

        let pruned = before - self.selected.len();
        if pruned > 0 {
            debug!(pruned, "Pruned selection ids missing from source");
        }
        pruned
    }
}
