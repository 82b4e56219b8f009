use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Serialize;

// ---------------------------------------------------------------------------
// CellValue – a single cell in a survey table
// ---------------------------------------------------------------------------

/// A dynamically-typed cell value mirroring common Pandas dtypes.
/// Using `BTreeMap` / `BTreeSet` downstream so `CellValue` must be `Ord`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    /// ISO-8601 date string kept as text for simplicity.
    Date(String),
    /// Multi-valued field, e.g. the qualities a respondent selected.
    List(Vec<CellValue>),
    Null,
}

static NULL: CellValue = CellValue::Null;

// -- Manual Eq/Ord so we can put CellValue in BTreeSet --

impl Eq for CellValue {}

impl PartialOrd for CellValue {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CellValue {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use CellValue::*;
        fn discriminant(v: &CellValue) -> u8 {
            match v {
                Null => 0,
                Bool(_) => 1,
                Integer(_) => 2,
                Float(_) => 3,
                String(_) => 4,
                Date(_) => 5,
                List(_) => 6,
            }
        }
        let da = discriminant(self);
        let db = discriminant(other);
        if da != db {
            return da.cmp(&db);
        }
        match (self, other) {
            (Null, Null) => std::cmp::Ordering::Equal,
            (Bool(a), Bool(b)) => a.cmp(b),
            (Integer(a), Integer(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (String(a), String(b)) | (Date(a), Date(b)) => a.cmp(b),
            (List(a), List(b)) => a.cmp(b),
            _ => std::cmp::Ordering::Equal,
        }
    }
}

impl std::hash::Hash for CellValue {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            CellValue::String(s) | CellValue::Date(s) => s.hash(state),
            CellValue::Integer(i) => i.hash(state),
            CellValue::Float(f) => f.to_bits().hash(state),
            CellValue::Bool(b) => b.hash(state),
            CellValue::List(items) => items.hash(state),
            CellValue::Null => {}
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::String(s) => write!(f, "{s}"),
            CellValue::Integer(i) => write!(f, "{i}"),
            CellValue::Float(v) => write!(f, "{v}"),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::Date(d) => write!(f, "{d}"),
            CellValue::List(items) => {
                let parts: Vec<String> = items.iter().map(|v| v.to_string()).collect();
                write!(f, "[{}]", parts.join(", "))
            }
            CellValue::Null => write!(f, "<null>"),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::String(s.to_string())
    }
}

impl CellValue {
    /// Try to interpret the value as an `f64` for numeric aggregation.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Float(v) if v.is_finite() => Some(*v),
            CellValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Text content of string-like cells.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            CellValue::String(s) | CellValue::Date(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Short dtype name, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            CellValue::String(_) => "string",
            CellValue::Integer(_) => "integer",
            CellValue::Float(_) => "float",
            CellValue::Bool(_) => "bool",
            CellValue::Date(_) => "date",
            CellValue::List(_) => "list",
            CellValue::Null => "null",
        }
    }
}

// ---------------------------------------------------------------------------
// Record – one row of the DataFrame
// ---------------------------------------------------------------------------

/// A single survey response (one row of the source table).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Record {
    /// Dynamic columns: column_name → value.
    pub fields: BTreeMap<String, CellValue>,
}

impl Record {
    pub fn new(fields: BTreeMap<String, CellValue>) -> Self {
        Record { fields }
    }

    /// Value of `column`; a missing column reads as null.
    pub fn get(&self, column: &str) -> &CellValue {
        self.fields.get(column).unwrap_or(&NULL)
    }

    pub fn set(&mut self, column: &str, value: CellValue) {
        self.fields.insert(column.to_string(), value);
    }
}

impl<K: Into<String>, V: Into<CellValue>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Record {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl From<i64> for CellValue {
    fn from(i: i64) -> Self {
        CellValue::Integer(i)
    }
}

impl From<f64> for CellValue {
    fn from(v: f64) -> Self {
        CellValue::Float(v)
    }
}

impl From<Vec<&str>> for CellValue {
    fn from(items: Vec<&str>) -> Self {
        CellValue::List(items.into_iter().map(CellValue::from).collect())
    }
}

// ---------------------------------------------------------------------------
// Table – a loaded survey dataset
// ---------------------------------------------------------------------------

/// An ordered set of records sharing one column set, with pre-computed
/// filter options.
#[derive(Debug, Clone, Default)]
pub struct Table {
    /// All records, in source order.
    pub rows: Vec<Record>,
    /// Column names in source order.
    pub column_names: Vec<String>,
    /// For each column the sorted set of non-null unique values.
    pub unique_values: BTreeMap<String, BTreeSet<CellValue>>,
}

impl Table {
    /// Build column indices from the loaded records.
    ///
    /// `column_names` fixes the column order; any column that only shows up
    /// inside the records is appended in first-seen order.
    pub fn from_records(mut column_names: Vec<String>, rows: Vec<Record>) -> Self {
        let mut unique_values: BTreeMap<String, BTreeSet<CellValue>> = BTreeMap::new();

        for row in &rows {
            for (col, val) in &row.fields {
                if !column_names.iter().any(|c| c == col) {
                    column_names.push(col.clone());
                }
                // Lists are not filter options; their elements become
                // options once the column is expanded.
                if val.is_null() || matches!(val, CellValue::List(_)) {
                    continue;
                }
                unique_values
                    .entry(col.clone())
                    .or_default()
                    .insert(val.clone());
            }
        }
        Table {
            rows,
            column_names,
            unique_values,
        }
    }

    /// A table with the same columns holding only the given rows.
    pub fn select(&self, indices: &[usize]) -> Table {
        let rows = indices.iter().map(|&i| self.rows[i].clone()).collect();
        Table::from_records(self.column_names.clone(), rows)
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.column_names.iter().any(|c| c == column)
    }

    /// Iterate over the values of one column, in row order.
    pub fn column<'a>(&'a self, column: &'a str) -> impl Iterator<Item = &'a CellValue> + 'a {
        self.rows.iter().map(move |r| r.get(column))
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
