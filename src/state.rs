use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::debug;

use crate::data::filter::{filter, filter_options, FilterSpec};
use crate::data::model::{CellValue, Table};
use crate::error::{Result, SurveyError};

// ---------------------------------------------------------------------------
// Filter selection state
// ---------------------------------------------------------------------------

/// The user's current selections for a fixed set of filter dimensions.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    /// Every option each dimension offers.
    options: BTreeMap<String, BTreeSet<CellValue>>,
    /// Per-column selections.
    selected: FilterSpec,
}

impl Selection {
    /// All options of every dimension selected.
    pub fn all(table: &Table, columns: &[&str]) -> Self {
        let options: BTreeMap<String, BTreeSet<CellValue>> = columns
            .iter()
            .map(|col| (col.to_string(), filter_options(table, col)))
            .collect();
        Self {
            selected: options.clone(),
            options,
        }
    }

    /// Options offered for `column`, nulls never included.
    pub fn options(&self, column: &str) -> Option<&BTreeSet<CellValue>> {
        self.options.get(column)
    }

    /// The selections as a filter spec.
    pub fn spec(&self) -> &FilterSpec {
        &self.selected
    }

    /// Apply the current selections to `table`.
    pub fn apply(&self, table: &Table) -> Table {
        filter(table, &self.selected)
    }

    /// Toggle a single value in a column's selection.
    pub fn toggle(&mut self, column: &str, value: &CellValue) {
        let selected = self.selected.entry(column.to_string()).or_default();
        if selected.contains(value) {
            selected.remove(value);
        } else {
            selected.insert(value.clone());
        }
    }

    /// Select all values in a column.
    pub fn select_all(&mut self, column: &str) {
        if let Some(all_vals) = self.options.get(column) {
            self.selected.insert(column.to_string(), all_vals.clone());
        }
    }

    /// Deselect all values in a column.
    pub fn select_none(&mut self, column: &str) {
        self.selected.insert(column.to_string(), BTreeSet::new());
    }

    /// Replace the selections of the columns named in `overrides`.
    ///
    /// Fails when a column is not one of the selection's dimensions.
    pub fn restrict(&mut self, overrides: FilterSpec) -> Result<()> {
        for (column, values) in overrides {
            if !self.options.contains_key(&column) {
                let known: Vec<&str> = self.options.keys().map(String::as_str).collect();
                return Err(SurveyError::InvalidFilter(format!(
                    "unknown filter column '{column}' (expected one of: {})",
                    known.join(", ")
                )));
            }
            self.selected.insert(column, values);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Load memoization
// ---------------------------------------------------------------------------

struct CacheEntry {
    fingerprint: u64,
    table: Arc<Table>,
}

/// Memoizes loaded tables by path and content fingerprint.
///
/// Only the load step is cached; filters and aggregates are always
/// recomputed by the caller.
#[derive(Default)]
pub struct LoadCache {
    entries: HashMap<PathBuf, CacheEntry>,
}

impl LoadCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached table for `path`, loading it with `load` when the
    /// file is new or its contents changed.
    pub fn get_or_load<F>(&mut self, path: &Path, load: F) -> Result<Arc<Table>>
    where
        F: FnOnce(&Path) -> Result<Table>,
    {
        let fingerprint = fingerprint(path)?;
        if let Some(entry) = self.entries.get(path) {
            if entry.fingerprint == fingerprint {
                debug!("Cache hit for {}", path.display());
                return Ok(Arc::clone(&entry.table));
            }
        }

        let table = Arc::new(load(path)?);
        self.entries.insert(
            path.to_path_buf(),
            CacheEntry {
                fingerprint,
                table: Arc::clone(&table),
            },
        );
        Ok(table)
    }

    /// Drop the cached table for `path`, forcing the next call to reload.
    pub fn invalidate(&mut self, path: &Path) {
        self.entries.remove(path);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn fingerprint(path: &Path) -> Result<u64> {
    let bytes = std::fs::read(path).map_err(|err| SurveyError::SourceUnavailable {
        path: path.to_path_buf(),
        reason: err.to_string(),
    })?;
    let mut hasher = DefaultHasher::new();
    bytes.hash(&mut hasher);
    Ok(hasher.finish())
}
