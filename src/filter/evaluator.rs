//! Filter evaluator
//!
//! Applies a search term and a set of column conditions to records through
//! a [`Columns`] accessor map.

use tracing::{error, warn};

use crate::error::Result;
use crate::record::{CellValue, Column, Columns};

use super::search::{is_safe_search_term, DEFAULT_MAX_SEARCH_LENGTH};
use super::{FilterCondition, Operator};

/// Evaluates search and custom filters against records of type `T`
pub struct FilterEvaluator<'c, T> {
    columns: &'c Columns<T>,

    /// Explicit searchable columns; `None` searches every text cell
    search_fields: Option<&'c [String]>,

    max_search_length: usize,
}

/// A condition resolved against the column map, ready to run per record
struct CompiledCondition<'c, T> {
    column: &'c Column<T>,
    operator: Operator,
    needle: String,
}

/// Everything one `apply` call needs, computed once up front
struct FilterPlan<'c, T> {
    search: Option<String>,
    conditions: Vec<CompiledCondition<'c, T>>,
}

impl<T> FilterPlan<'_, T> {
    fn is_identity(&self) -> bool {
        self.search.is_none() && self.conditions.is_empty()
    }
}

impl<'c, T> FilterEvaluator<'c, T> {
    pub fn new(columns: &'c Columns<T>) -> Self {
        Self {
            columns,
            search_fields: None,
            max_search_length: DEFAULT_MAX_SEARCH_LENGTH,
        }
    }

    /// Restrict search to the given columns
    pub fn search_fields(mut self, fields: &'c [String]) -> Self {
        self.search_fields = Some(fields);
        self
    }

    pub fn max_search_length(mut self, max: usize) -> Self {
        self.max_search_length = max;
        self
    }

    /// Filter records, keeping input order
    pub fn apply<'a, I>(&self, records: I, search_term: &str, conditions: &[FilterCondition]) -> Vec<&'a T>
    where
        I: IntoIterator<Item = &'a T>,
        T: 'a,
    {
        let plan = self.plan(search_term, conditions);
        records
            .into_iter()
            .enumerate()
            .filter(|(position, record)| plan.is_identity() || self.keep(&plan, record, *position))
            .map(|(_, record)| record)
            .collect()
    }

    /// Filter a record slice, returning the indices of the survivors
    pub fn matching_indices(&self, records: &[T], search_term: &str, conditions: &[FilterCondition]) -> Vec<usize> {
        let plan = self.plan(search_term, conditions);
        if plan.is_identity() {
            return (0..records.len()).collect();
        }
        records
            .iter()
            .enumerate()
            .filter(|(position, record)| self.keep(&plan, record, *position))
            .map(|(position, _)| position)
            .collect()
    }

    /// Check one record against a search term
    ///
    /// Blank or unsafe terms match everything.
    pub fn matches_search(&self, record: &T, search_term: &str) -> Result<bool> {
        match self.normalize_search(search_term) {
            Some(needle) => self.search_record(record, &needle),
            None => Ok(true),
        }
    }

    /// Check one record against every active condition
    pub fn matches_conditions(&self, record: &T, conditions: &[FilterCondition]) -> Result<bool> {
        let compiled = self.compile_conditions(conditions);
        Self::conditions_hold(&compiled, record)
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn plan(&self, search_term: &str, conditions: &[FilterCondition]) -> FilterPlan<'c, T> {
        FilterPlan {
            search: self.normalize_search(search_term),
            conditions: self.compile_conditions(conditions),
        }
    }

    /// Per-record predicate. Accessor faults exclude the record.
    fn keep(&self, plan: &FilterPlan<'c, T>, record: &T, position: usize) -> bool {
        let outcome = match &plan.search {
            Some(needle) => self.search_record(record, needle),
            None => Ok(true),
        }
        .and_then(|hit| if hit { Self::conditions_hold(&plan.conditions, record) } else { Ok(false) });

        match outcome {
            Ok(keep) => keep,
            Err(e) => {
                error!(position, error = %e, "Excluding record: filter evaluation failed");
                false
            }
        }
    }

    fn normalize_search(&self, search_term: &str) -> Option<String> {
        let trimmed = search_term.trim();
        if trimmed.is_empty() {
            return None;
        }
        if !is_safe_search_term(trimmed, self.max_search_length) {
            warn!(length = trimmed.chars().count(), "Ignoring search term that failed validation");
            return None;
        }
        Some(trimmed.to_lowercase())
    }

    /// OR across searchable fields
    fn search_record(&self, record: &T, needle: &str) -> Result<bool> {
        match self.search_fields {
            Some(fields) => {
                for field in fields {
                    // Unregistered search fields are skipped
                    let Some(column) = self.columns.get(field) else {
                        continue;
                    };
                    let value = column.read(record)?;
                    if !value.is_null() && value.to_string().to_lowercase().contains(needle) {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            None => {
                for column in self.columns.iter() {
                    if let CellValue::Text(text) = column.read(record)? {
                        if text.to_lowercase().contains(needle) {
                            return Ok(true);
                        }
                    }
                }
                Ok(false)
            }
        }
    }

    /// Resolve active conditions against the column map
    ///
    /// Unknown columns and unknown operators fail open: they are logged once
    /// here and dropped, which is the same as always matching.
    fn compile_conditions(&self, conditions: &[FilterCondition]) -> Vec<CompiledCondition<'c, T>> {
        let columns: &'c Columns<T> = self.columns;
        conditions
            .iter()
            .filter(|c| c.is_active())
            .filter_map(|condition| {
                let Some(column) = columns.get(&condition.column) else {
                    warn!(
                        filter_id = %condition.id,
                        column = %condition.column,
                        "Filter references unknown column; treating as match-all"
                    );
                    return None;
                };
                if condition.operator.is_unknown() {
                    warn!(
                        filter_id = %condition.id,
                        operator = %condition.operator,
                        "Filter uses unknown operator; treating as match-all"
                    );
                    return None;
                }
                Some(CompiledCondition {
                    column,
                    operator: condition.operator.clone(),
                    needle: condition.value.to_lowercase(),
                })
            })
            .collect()
    }

    /// AND across conditions
    fn conditions_hold(conditions: &[CompiledCondition<'c, T>], record: &T) -> Result<bool> {
        for condition in conditions {
            let cell = condition.column.read(record)?;
            if !evaluate(&condition.operator, &cell, &condition.needle) {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

/// Apply one operator to a cell. `needle` is already lower-cased.
fn evaluate(operator: &Operator, cell: &CellValue, needle: &str) -> bool {
    let haystack = cell.to_string().to_lowercase();
    match operator {
        Operator::Contains => haystack.contains(needle),
        Operator::Equals => haystack == needle,
        Operator::NotEquals => haystack != needle,
        Operator::StartsWith => haystack.starts_with(needle),
        Operator::EndsWith => haystack.ends_with(needle),
        Operator::IsEmpty => haystack.trim().is_empty(),
        Operator::IsNotEmpty => !haystack.trim().is_empty(),
        Operator::Unknown(_) => true,
    }
}
