//! Sort comparator
//!
//! Sorting never mutates its input: every entry point returns a new order.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use tracing::{error, warn};

use crate::error::Result;
use crate::record::{CellValue, Columns};

use super::{SortConfig, SortDirection};

/// A record's sort key, with dates parsed once
///
/// `value` is `None` when the accessor faulted; such a key compares equal
/// to everything.
#[derive(Clone)]
struct SortKey {
    value: Option<CellValue>,
    date: Option<DateTime<Utc>>,
}

impl SortKey {
    fn read(value: Result<CellValue>, field: &str) -> Self {
        match value {
            Ok(value) => Self {
                date: value.as_date(),
                value: Some(value),
            },
            Err(e) => {
                error!(field, error = %e, "Sort key unreadable; comparing record as equal");
                Self { value: None, date: None }
            }
        }
    }

    #[cfg(test)]
    fn new(value: CellValue) -> Self {
        Self::read(Ok(value), "test")
    }
}

/// Type-aware comparator over records of type `T`
pub struct SortComparator<'c, T> {
    columns: &'c Columns<T>,
}

impl<'c, T> SortComparator<'c, T> {
    pub fn new(columns: &'c Columns<T>) -> Self {
        Self { columns }
    }

    /// Compare two records under `config`
    ///
    /// An accessor fault on either side compares as equal, exactly as it
    /// does inside [`apply`](Self::apply).
    pub fn compare(&self, a: &T, b: &T, config: &SortConfig) -> Ordering {
        let Some(field) = config.active_field() else {
            return Ordering::Equal;
        };
        let Some(column) = self.columns.get(field) else {
            warn!(field, "Sort field is not a known column; treating as equal");
            return Ordering::Equal;
        };

        let ka = SortKey::read(column.read(a), field);
        let kb = SortKey::read(column.read(b), field);
        directed(compare_keys(&ka, &kb), config.direction)
    }

    /// Return records sorted by `config`; input order when unsorted
    pub fn apply<'a, I>(&self, records: I, config: &SortConfig) -> Vec<&'a T>
    where
        I: IntoIterator<Item = &'a T>,
        T: 'a,
    {
        let records: Vec<&'a T> = records.into_iter().collect();
        let mut order: Vec<usize> = (0..records.len()).collect();
        self.sort_positions(&mut order, |i| records[i], config);
        order.into_iter().map(|i| records[i]).collect()
    }

    /// Sort a list of indices into `records` by `config`
    pub fn sort_indices(&self, records: &[T], indices: &mut [usize], config: &SortConfig) {
        self.sort_positions(indices, |i| &records[i], config);
    }

    fn sort_positions<'r, F>(&self, positions: &mut [usize], record_at: F, config: &SortConfig)
    where
        F: Fn(usize) -> &'r T,
        T: 'r,
    {
        let Some(field) = config.active_field() else {
            return;
        };
        let Some(column) = self.columns.get(field) else {
            warn!(field, "Sort field is not a known column; keeping input order");
            return;
        };

        // Extract every key once
        let mut keys: Vec<(usize, SortKey)> = positions
            .iter()
            .map(|&position| (position, SortKey::read(column.read(record_at(position)), field)))
            .collect();

        let direction = config.direction;
        stable_sort_by(&mut keys, |(_, a), (_, b)| directed(compare_keys(a, b), direction));

        for (slot, (position, _)) in positions.iter_mut().zip(keys) {
            *slot = position;
        }
    }
}

fn directed(ordering: Ordering, direction: SortDirection) -> Ordering {
    match direction {
        SortDirection::Asc => ordering,
        SortDirection::Desc => ordering.reverse(),
    }
}

/// Ascending comparison of two keys
fn compare_keys(a: &SortKey, b: &SortKey) -> Ordering {
    let (Some(va), Some(vb)) = (&a.value, &b.value) else {
        return Ordering::Equal;
    };
    match (va, vb) {
        (CellValue::Null, CellValue::Null) => Ordering::Equal,
        (CellValue::Null, _) => Ordering::Less,
        (_, CellValue::Null) => Ordering::Greater,
        (CellValue::Number(x), CellValue::Number(y)) => x.partial_cmp(y).unwrap_or(Ordering::Equal),
        _ => match (a.date, b.date) {
            (Some(dx), Some(dy)) => dx.cmp(&dy),
            _ => match (va, vb) {
                (CellValue::Text(x), CellValue::Text(y)) => locale_compare(x, y),
                (x, y) => locale_compare(&x.to_string(), &y.to_string()),
            },
        },
    }
}

/// Case-insensitive collation with lowercase-first tie-breaking
///
/// `"apple" < "Banana" < "banana2"`, and `"a" < "A"` when the letters
/// otherwise match.
pub fn locale_compare(a: &str, b: &str) -> Ordering {
    a.chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase))
        .then_with(|| a.chars().map(char::is_uppercase).cmp(b.chars().map(char::is_uppercase)))
        .then_with(|| a.cmp(b))
}

/// Bottom-up merge sort
///
/// Stable, and tolerant of comparators that are not a total order (mixed
/// cell types), on which `slice::sort_by` may panic.
fn stable_sort_by<E: Clone, F>(items: &mut [E], mut compare: F)
where
    F: FnMut(&E, &E) -> Ordering,
{
    let len = items.len();
    if len < 2 {
        return;
    }

    let mut buffer = items.to_vec();
    let mut width = 1;
    while width < len {
        let mut start = 0;
        while start < len {
            let mid = (start + width).min(len);
            let end = (start + 2 * width).min(len);
            let (mut i, mut j, mut k) = (start, mid, start);

            while i < mid && j < end {
                // Right side wins only when strictly smaller
                if compare(&items[j], &items[i]) == Ordering::Less {
                    buffer[k] = items[j].clone();
                    j += 1;
                } else {
                    buffer[k] = items[i].clone();
                    i += 1;
                }
                k += 1;
            }
            while i < mid {
                buffer[k] = items[i].clone();
                i += 1;
                k += 1;
            }
            while j < end {
                buffer[k] = items[j].clone();
                j += 1;
                k += 1;
            }
            start += 2 * width;
        }
        items.clone_from_slice(&buffer);
        width *= 2;
    }
}
