//! Aggregate views over a filtered table.
//!
//! Every function here is a pure function of its input table; nothing is
//! cached between calls.

use std::collections::HashMap;

use log::debug;
use serde::Serialize;

use super::model::{CellValue, Table};
use crate::error::{Result, SurveyError};

// ── Result types ──────────────────────────────────────────────────────────────

/// Mean score of one numeric column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnMean {
    pub column: String,
    pub mean: f64,
}

/// Occurrences of one value in a column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValueCount {
    pub value: CellValue,
    pub count: usize,
}

/// Cell of a long-format comparison table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AggregateValue {
    Mean(f64),
    Count(usize),
}

/// One `(group, dimension, value)` triple of a long-format table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LongRow {
    pub group: CellValue,
    pub dimension: CellValue,
    pub value: AggregateValue,
}

/// What to compute inside each partition of [`group_aggregate`].
#[derive(Debug, Clone, PartialEq)]
pub enum Metric {
    /// Mean of each numeric column; one triple per column.
    Mean { columns: Vec<String> },
    /// Occurrence count of each value of `column`, keeping the `n` most
    /// frequent; one triple per kept value.
    TopCounts { column: String, n: usize },
}

// ── Means ─────────────────────────────────────────────────────────────────────

/// Mean of the non-null numeric values of one column, if any.
fn column_mean<'a>(values: impl Iterator<Item = &'a CellValue>) -> Option<f64> {
    let (sum, n) = values
        .filter_map(CellValue::as_f64)
        .fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

/// Arithmetic mean of each named column, ignoring nulls, sorted ascending by
/// mean (ties keep the order of `columns`).
///
/// Fails with [`SurveyError::UndefinedAggregate`] for the first column that
/// has no numeric values.
pub fn mean_by_column(table: &Table, columns: &[String]) -> Result<Vec<ColumnMean>> {
    let mut means = columns
        .iter()
        .map(|col| {
            column_mean(table.column(col))
                .map(|mean| ColumnMean {
                    column: col.clone(),
                    mean,
                })
                .ok_or_else(|| SurveyError::UndefinedAggregate {
                    column: col.clone(),
                })
        })
        .collect::<Result<Vec<_>>>()?;
    means.sort_by(|a, b| a.mean.total_cmp(&b.mean));
    Ok(means)
}

// ── Frequencies ───────────────────────────────────────────────────────────────

/// Count non-null values, most frequent first; ties keep first-seen order.
fn count_values<'a>(values: impl Iterator<Item = &'a CellValue>) -> Vec<ValueCount> {
    let mut counts: Vec<ValueCount> = Vec::new();
    let mut index: HashMap<&CellValue, usize> = HashMap::new();

    for value in values.filter(|v| !v.is_null()) {
        match index.get(value) {
            Some(&i) => counts[i].count += 1,
            None => {
                index.insert(value, counts.len());
                counts.push(ValueCount {
                    value: value.clone(),
                    count: 1,
                });
            }
        }
    }

    // Stable sort: equal counts stay in first-seen order.
    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts
}

/// Frequency ranking of `column`, sorted descending by count with ties in
/// first-seen order.
pub fn value_counts(table: &Table, column: &str) -> Result<Vec<ValueCount>> {
    let counts = count_values(table.column(column));
    if counts.is_empty() {
        return Err(SurveyError::EmptyDomain {
            column: column.to_string(),
        });
    }
    Ok(counts)
}

/// The most frequent value of `column` (head of [`value_counts`]).
pub fn top_value(table: &Table, column: &str) -> Result<ValueCount> {
    let mut counts = value_counts(table, column)?;
    Ok(counts.swap_remove(0))
}

/// Number of distinct non-null values in `column`.
///
/// On an expanded table this counts originating records through their id,
/// whereas `table.len()` counts expanded rows.
pub fn distinct_count(table: &Table, column: &str) -> usize {
    count_values(table.column(column)).len()
}

// ── Group-wise aggregation ────────────────────────────────────────────────────

/// Row indices per non-null value of `group_column`, groups in first-seen
/// order.
fn partition(table: &Table, group_column: &str) -> Vec<(CellValue, Vec<usize>)> {
    let mut groups: Vec<(CellValue, Vec<usize>)> = Vec::new();
    let mut index: HashMap<&CellValue, usize> = HashMap::new();

    for (i, row) in table.rows.iter().enumerate() {
        let key = row.get(group_column);
        if key.is_null() {
            continue;
        }
        match index.get(key) {
            Some(&g) => groups[g].1.push(i),
            None => {
                index.insert(key, groups.len());
                groups.push((key.clone(), vec![i]));
            }
        }
    }
    groups
}

/// Partition `table` by `group_column`, apply `metric` to each partition and
/// return the result in long format.
///
/// Rows with a null group are left out. Under [`Metric::Mean`] a column with
/// no numeric values inside a partition yields no triple for that partition.
pub fn group_aggregate(table: &Table, group_column: &str, metric: &Metric) -> Vec<LongRow> {
    let mut long = Vec::new();

    for (group, indices) in partition(table, group_column) {
        let members = || indices.iter().map(|&i| &table.rows[i]);
        match metric {
            Metric::Mean { columns } => {
                for col in columns {
                    match column_mean(members().map(|r| r.get(col))) {
                        Some(mean) => long.push(LongRow {
                            group: group.clone(),
                            dimension: CellValue::String(col.clone()),
                            value: AggregateValue::Mean(mean),
                        }),
                        None => debug!("No values for '{col}' in group {group}"),
                    }
                }
            }
            Metric::TopCounts { column, n } => {
                let counts = count_values(members().map(|r| r.get(column)));
                long.extend(counts.into_iter().take(*n).map(|vc| LongRow {
                    group: group.clone(),
                    dimension: vc.value,
                    value: AggregateValue::Count(vc.count),
                }));
            }
        }
    }
    long
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::Record;

    fn single_column(name: &str, values: Vec<CellValue>) -> Table {
        let rows = values
            .into_iter()
            .map(|v| Record::from_iter([(name, v)]))
            .collect();
        Table::from_records(vec![name.to_string()], rows)
    }

    fn strings(values: &[&str]) -> Vec<CellValue> {
        values.iter().map(|v| CellValue::from(*v)).collect()
    }

    // ── mean_by_column ────────────────────────────────────────────────────────

    #[test]
    fn test_mean_of_simple_column() {
        let table = single_column("score", vec![10i64.into(), 20i64.into(), 30i64.into()]);
        let means = mean_by_column(&table, &["score".to_string()]).unwrap();
        assert_eq!(means, vec![ColumnMean { column: "score".into(), mean: 20.0 }]);
    }

    #[test]
    fn test_mean_ignores_nulls() {
        let table = single_column(
            "score",
            vec![10i64.into(), CellValue::Null, 25.0f64.into(), CellValue::Null],
        );
        let means = mean_by_column(&table, &["score".to_string()]).unwrap();
        assert!((means[0].mean - 17.5).abs() < 1e-9);
    }

    #[test]
    fn test_mean_of_all_null_column_is_undefined() {
        let table = single_column("score", vec![CellValue::Null, CellValue::Null]);
        let err = mean_by_column(&table, &["score".to_string()]).unwrap_err();
        assert!(matches!(err, SurveyError::UndefinedAggregate { column } if column == "score"));
    }

    #[test]
    fn test_means_sorted_ascending() {
        let rows = vec![
            Record::from_iter([("a", 90i64), ("b", 10i64), ("c", 50i64)]),
            Record::from_iter([("a", 70i64), ("b", 30i64), ("c", 50i64)]),
        ];
        let table = Table::from_records(vec!["a".into(), "b".into(), "c".into()], rows);
        let cols = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let order: Vec<String> = mean_by_column(&table, &cols)
            .unwrap()
            .into_iter()
            .map(|m| m.column)
            .collect();
        assert_eq!(order, vec!["b", "c", "a"]);
    }

    // ── value_counts ──────────────────────────────────────────────────────────

    #[test]
    fn test_value_counts_descending() {
        let table = single_column("q", strings(&["a", "b", "a", "c", "a", "b"]));
        let counts: Vec<(String, usize)> = value_counts(&table, "q")
            .unwrap()
            .into_iter()
            .map(|vc| (vc.value.to_string(), vc.count))
            .collect();
        assert_eq!(
            counts,
            vec![("a".into(), 3), ("b".into(), 2), ("c".into(), 1)]
        );
    }

    #[test]
    fn test_value_counts_ties_keep_first_seen_order() {
        let table = single_column("q", strings(&["z", "y", "x", "y", "z", "x"]));
        let order: Vec<String> = value_counts(&table, "q")
            .unwrap()
            .into_iter()
            .map(|vc| vc.value.to_string())
            .collect();
        assert_eq!(order, vec!["z", "y", "x"]);
    }

    #[test]
    fn test_value_counts_all_null_is_empty_domain() {
        let table = single_column("q", vec![CellValue::Null]);
        assert!(matches!(
            value_counts(&table, "q"),
            Err(SurveyError::EmptyDomain { .. })
        ));
        assert!(matches!(top_value(&table, "q"), Err(SurveyError::EmptyDomain { .. })));
    }

    #[test]
    fn test_top_value_is_head() {
        let table = single_column("q", strings(&["b", "a", "a"]));
        let top = top_value(&table, "q").unwrap();
        assert_eq!(top, ValueCount { value: CellValue::from("a"), count: 2 });
    }

    #[test]
    fn test_distinct_count_skips_nulls() {
        let table = single_column(
            "id",
            vec![1i64.into(), 1i64.into(), 2i64.into(), CellValue::Null],
        );
        assert_eq!(distinct_count(&table, "id"), 2);
    }

    // ── group_aggregate ───────────────────────────────────────────────────────

    #[test]
    fn test_group_mean_long_format() {
        let rows = vec![
            Record::from_iter([("wp", CellValue::from("Office")), ("a", 10i64.into()), ("b", 1i64.into())]),
            Record::from_iter([("wp", CellValue::from("Site")), ("a", 40i64.into()), ("b", CellValue::Null)]),
            Record::from_iter([("wp", CellValue::from("Office")), ("a", 30i64.into()), ("b", 3i64.into())]),
            Record::from_iter([("wp", CellValue::Null), ("a", 99i64.into()), ("b", 99i64.into())]),
        ];
        let table = Table::from_records(vec!["wp".into(), "a".into(), "b".into()], rows);
        let metric = Metric::Mean { columns: vec!["a".into(), "b".into()] };
        let long = group_aggregate(&table, "wp", &metric);

        assert_eq!(
            long,
            vec![
                LongRow { group: "Office".into(), dimension: "a".into(), value: AggregateValue::Mean(20.0) },
                LongRow { group: "Office".into(), dimension: "b".into(), value: AggregateValue::Mean(2.0) },
                LongRow { group: "Site".into(), dimension: "a".into(), value: AggregateValue::Mean(40.0) },
            ]
        );
    }

    #[test]
    fn test_group_top_n_breaks_ties_by_first_seen() {
        let mut rows = Vec::new();
        // Office: "e" x3, then six qualities seen once each; rank 2..5 are ties.
        for q in ["e", "e", "e", "f", "b", "a", "d", "c", "g"] {
            rows.push(Record::from_iter([("wp", "Office"), ("q", q)]));
        }
        rows.push(Record::from_iter([("wp", "Site"), ("q", "a")]));
        let table = Table::from_records(vec!["wp".into(), "q".into()], rows);
        let metric = Metric::TopCounts { column: "q".into(), n: 5 };

        let first = group_aggregate(&table, "wp", &metric);
        let office: Vec<(String, AggregateValue)> = first
            .iter()
            .filter(|r| r.group == CellValue::from("Office"))
            .map(|r| (r.dimension.to_string(), r.value))
            .collect();
        assert_eq!(
            office,
            vec![
                ("e".to_string(), AggregateValue::Count(3)),
                ("f".to_string(), AggregateValue::Count(1)),
                ("b".to_string(), AggregateValue::Count(1)),
                ("a".to_string(), AggregateValue::Count(1)),
                ("d".to_string(), AggregateValue::Count(1)),
            ]
        );
        assert_eq!(first.len(), 6);

        for _ in 0..5 {
            assert_eq!(group_aggregate(&table, "wp", &metric), first);
        }
    }

    #[test]
    fn test_group_top_n_is_configurable() {
        let rows = ["a", "b", "c"]
            .into_iter()
            .map(|q| Record::from_iter([("wp", "Office"), ("q", q)]))
            .collect();
        let table = Table::from_records(vec!["wp".into(), "q".into()], rows);
        let long = group_aggregate(&table, "wp", &Metric::TopCounts { column: "q".into(), n: 2 });
        assert_eq!(long.len(), 2);
    }

    #[test]
    fn test_group_aggregate_empty_table() {
        let table = Table::default();
        let metric = Metric::Mean { columns: vec!["a".into()] };
        assert!(group_aggregate(&table, "wp", &metric).is_empty());
    }
}
