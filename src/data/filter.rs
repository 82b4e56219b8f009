use std::collections::{BTreeMap, BTreeSet};

use log::debug;

use super::model::{CellValue, Table};

// ---------------------------------------------------------------------------
// Filter predicate: which values are allowed per column
// ---------------------------------------------------------------------------

/// Per-column constraints: maps column_name → set of allowed values.
/// Columns absent from the map impose no constraint.
pub type FilterSpec = BTreeMap<String, BTreeSet<CellValue>>;

/// Distinct non-null values of `column`, i.e. the options a filter offers.
pub fn filter_options(table: &Table, column: &str) -> BTreeSet<CellValue> {
    table.unique_values.get(column).cloned().unwrap_or_default()
}

/// Initialise a [`FilterSpec`] with every option of every named column
/// selected.
pub fn init_filter_spec(table: &Table, columns: &[&str]) -> FilterSpec {
    columns
        .iter()
        .map(|col| (col.to_string(), filter_options(table, col)))
        .collect()
}

/// Whether a single cell passes a column's allowed set.
/// Null cells never pass.
fn allows(allowed: &BTreeSet<CellValue>, value: &CellValue) -> bool {
    !value.is_null() && allowed.contains(value)
}

/// Return indices of rows that pass all constraints.
///
/// A row passes a column constraint when:
/// * The column is not present in `spec` → passes (no constraint)
/// * The allowed set for that column is empty → nothing selected → fails
/// * The row's value for that column is non-null and in the allowed set → passes
pub fn filtered_indices(table: &Table, spec: &FilterSpec) -> Vec<usize> {
    table
        .rows
        .iter()
        .enumerate()
        .filter(|(_, row)| {
            spec.iter()
                .all(|(col, allowed)| allows(allowed, row.get(col)))
        })
        .map(|(i, _)| i)
        .collect()
}

/// The subset of `table` matching every constraint of `spec`.
///
/// An empty result is a normal outcome, not an error.
pub fn filter(table: &Table, spec: &FilterSpec) -> Table {
    if spec.is_empty() {
        return table.clone();
    }
    let indices = filtered_indices(table, spec);
    debug!("Filter kept {} of {} rows", indices.len(), table.len());
    table.select(&indices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::Record;

    fn workplace_table() -> Table {
        // 100 rows, 40 of them "Office"; every tenth row has no sex.
        let rows = (0..100)
            .map(|i| {
                let place = if i % 5 < 2 { "Office" } else { "Site" };
                let sex = if i % 10 == 9 {
                    CellValue::Null
                } else if i % 2 == 0 {
                    CellValue::from("F")
                } else {
                    CellValue::from("M")
                };
                Record::from_iter([
                    ("work_place", CellValue::from(place)),
                    ("sex", sex),
                    ("score", CellValue::Integer(i)),
                ])
            })
            .collect();
        Table::from_records(vec!["work_place".into(), "sex".into(), "score".into()], rows)
    }

    fn spec(entries: &[(&str, Vec<&str>)]) -> FilterSpec {
        entries
            .iter()
            .map(|(col, vals)| {
                (
                    col.to_string(),
                    vals.iter().map(|v| CellValue::from(*v)).collect(),
                )
            })
            .collect()
    }

    #[test]
    fn test_empty_spec_is_identity() {
        let table = workplace_table();
        let out = filter(&table, &FilterSpec::new());
        assert_eq!(out.rows, table.rows);
        assert_eq!(filtered_indices(&table, &FilterSpec::new()).len(), 100);
    }

    #[test]
    fn test_single_dimension() {
        let table = workplace_table();
        let out = filter(&table, &spec(&[("work_place", vec!["Office"])]));
        assert_eq!(out.len(), 40);
        assert!(out.column("work_place").all(|v| v == &CellValue::from("Office")));
    }

    #[test]
    fn test_or_within_and_across_dimensions() {
        let table = workplace_table();
        let both = filter(&table, &spec(&[("work_place", vec!["Office", "Site"])]));
        assert_eq!(both.len(), 100);

        let narrowed = filter(
            &table,
            &spec(&[("work_place", vec!["Office"]), ("sex", vec!["F"])]),
        );
        let expected = (0..100)
            .filter(|i| i % 5 < 2 && i % 10 != 9 && i % 2 == 0)
            .count();
        assert_eq!(narrowed.len(), expected);
    }

    #[test]
    fn test_nulls_never_match() {
        let table = workplace_table();
        let mut all = init_filter_spec(&table, &["sex"]);
        all.get_mut("sex").unwrap().insert(CellValue::Null);
        let out = filter(&table, &all);
        assert_eq!(out.len(), 90);
        assert!(!filter_options(&table, "sex").contains(&CellValue::Null));
    }

    #[test]
    fn test_empty_allowed_set_matches_nothing() {
        let table = workplace_table();
        let out = filter(&table, &spec(&[("work_place", vec![])]));
        assert!(out.is_empty());
    }

    #[test]
    fn test_no_match_returns_empty_table() {
        let table = workplace_table();
        let out = filter(&table, &spec(&[("work_place", vec!["Remote"])]));
        assert!(out.is_empty());
        assert_eq!(out.column_names, table.column_names);
    }

    #[test]
    fn test_filter_is_subset_and_idempotent() {
        let table = workplace_table();
        let s = spec(&[("work_place", vec!["Site"]), ("sex", vec!["M"])]);
        let indices = filtered_indices(&table, &s);
        assert!(indices.windows(2).all(|w| w[0] < w[1]));
        assert!(indices.iter().all(|&i| i < table.len()));

        let once = filter(&table, &s);
        let twice = filter(&once, &s);
        assert_eq!(once.rows, twice.rows);
    }

    #[test]
    fn test_constraint_on_absent_column_matches_nothing() {
        let table = workplace_table();
        let out = filter(&table, &spec(&[("country", vec!["Italia"])]));
        assert!(out.is_empty());
    }
}
