//! Derived fields of the competency survey: age and age bracket.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use log::info;
use serde::Serialize;

use super::model::{CellValue, Table};
use super::schema::{AGE, AGE_GROUP, BIRTH_DATE};

/// Date layouts accepted for `birth_date`, tried in order.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d.%m.%Y", "%Y%m%d"];
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
];

// ── AgeGroup ──────────────────────────────────────────────────────────────────

/// Fixed age brackets, half-open on the right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum AgeGroup {
    #[serde(rename = "Meno di 30")]
    Under30,
    #[serde(rename = "30-40")]
    From30To40,
    #[serde(rename = "41-50")]
    From40To50,
    #[serde(rename = "51-60")]
    From50To60,
    #[serde(rename = "Più di 60")]
    Over60,
}

impl AgeGroup {
    /// All brackets in display order.
    pub const ALL: [AgeGroup; 5] = [
        AgeGroup::Under30,
        AgeGroup::From30To40,
        AgeGroup::From40To50,
        AgeGroup::From50To60,
        AgeGroup::Over60,
    ];

    /// Bracket containing `age`; ages outside `[0, 100)` have none.
    pub fn from_age(age: i32) -> Option<AgeGroup> {
        match age {
            0..=29 => Some(AgeGroup::Under30),
            30..=39 => Some(AgeGroup::From30To40),
            40..=49 => Some(AgeGroup::From40To50),
            50..=59 => Some(AgeGroup::From50To60),
            60..=99 => Some(AgeGroup::Over60),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AgeGroup::Under30 => "Meno di 30",
            AgeGroup::From30To40 => "30-40",
            AgeGroup::From40To50 => "41-50",
            AgeGroup::From50To60 => "51-60",
            AgeGroup::Over60 => "Più di 60",
        }
    }
}

impl std::fmt::Display for AgeGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// ── Age ───────────────────────────────────────────────────────────────────────

/// Parse a date-like string; `None` for anything unparseable.
pub fn parse_birth_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Some(date);
        }
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive())
}

/// Whole years elapsed between `birth` and `today`.
pub fn age_on(birth: NaiveDate, today: NaiveDate) -> i32 {
    let years = today.year() - birth.year();
    if (today.month(), today.day()) < (birth.month(), birth.day()) {
        years - 1
    } else {
        years
    }
}

/// Age in whole years from a raw `birth_date` string.
pub fn derive_age(birth_date: &str, today: NaiveDate) -> Option<i32> {
    parse_birth_date(birth_date).map(|birth| age_on(birth, today))
}

/// Age from a `birth_date` cell of any type; non-text cells have no age.
/// Age from a `birth_date` cell. Compact `YYYYMMDD` dates typed as integers
/// by the CSV reader are accepted too.
pub fn derive_age_from_cell(cell: &CellValue, today: NaiveDate) -> Option<i32> {
    match cell {
        CellValue::Integer(n) if (10_000_000..100_000_000).contains(n) => {
            derive_age(&n.to_string(), today)
        }
        other => other.as_str().and_then(|s| derive_age(s, today)),
    }
}

pub fn derive_age_group(age: Option<i32>) -> Option<AgeGroup> {
    age.and_then(AgeGroup::from_age)
}

// ── Table-level derivation ────────────────────────────────────────────────────

/// A table with `age` and `age_group` appended to every record.
#[derive(Debug, Clone)]
pub struct DerivedTable {
    pub table: Table,
    /// Records without an age bracket (bad date or age outside `[0, 100)`).
    pub excluded_from_age_analysis: usize,
}

/// Recompute `age` and `age_group` for every record against `today`.
///
/// Existing `age`/`age_group` values are overwritten; nothing is carried over
/// from a previous derivation.
pub fn derive_features(table: &Table, today: NaiveDate) -> DerivedTable {
    let mut excluded = 0;
    let rows = table
        .rows
        .iter()
        .map(|record| {
            let age = derive_age_from_cell(record.get(BIRTH_DATE), today);
            let group = derive_age_group(age);
            if group.is_none() {
                excluded += 1;
            }
            let mut record = record.clone();
            record.set(AGE, age.map_or(CellValue::Null, |a| CellValue::Integer(a as i64)));
            record.set(
                AGE_GROUP,
                group.map_or(CellValue::Null, |g| CellValue::String(g.label().to_string())),
            );
            record
        })
        .collect();

    let mut column_names: Vec<String> = table
        .column_names
        .iter()
        .filter(|c| c.as_str() != AGE && c.as_str() != AGE_GROUP)
        .cloned()
        .collect();
    column_names.push(AGE.to_string());
    column_names.push(AGE_GROUP.to_string());

    if excluded > 0 {
        info!(
            "{excluded} of {} records excluded from age analysis",
            table.len()
        );
    }

    DerivedTable {
        table: Table::from_records(column_names, rows),
        excluded_from_age_analysis: excluded,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::Record;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_age_before_and_after_birthday() {
        let today = date(2024, 6, 1);
        assert_eq!(derive_age("1990-05-01", today), Some(34));
        assert_eq!(derive_age("1990-06-01", today), Some(34));
        assert_eq!(derive_age("1990-06-02", today), Some(33));
    }

    #[test]
    fn test_unparseable_dates_have_no_age() {
        let today = date(2024, 6, 1);
        assert_eq!(derive_age("invalid", today), None);
        assert_eq!(derive_age("", today), None);
        assert_eq!(derive_age("1990-13-45", today), None);
    }

    #[test]
    fn test_alternative_date_layouts() {
        let today = date(2024, 6, 1);
        assert_eq!(derive_age("1985/01/01", today), Some(39));
        assert_eq!(derive_age("1985-01-01 00:00:00", today), Some(39));
        assert_eq!(derive_age("1985-01-01T08:30:00+02:00", today), Some(39));
    }

    #[test]
    fn test_compact_integer_birth_date() {
        let today = date(2024, 6, 1);
        assert_eq!(derive_age_from_cell(&CellValue::Integer(19900501), today), Some(34));
        assert_eq!(derive_age_from_cell(&CellValue::Integer(1990), today), None);
        assert_eq!(
            derive_age_from_cell(&CellValue::Date("1985-01-01".into()), today),
            Some(39)
        );
    }

    #[test]
    fn test_age_group_bins() {
        assert_eq!(AgeGroup::from_age(0), Some(AgeGroup::Under30));
        assert_eq!(AgeGroup::from_age(29), Some(AgeGroup::Under30));
        assert_eq!(AgeGroup::from_age(30), Some(AgeGroup::From30To40));
        assert_eq!(AgeGroup::from_age(40).map(AgeGroup::label), Some("41-50"));
        assert_eq!(AgeGroup::from_age(59).map(AgeGroup::label), Some("51-60"));
        assert_eq!(AgeGroup::from_age(99).map(AgeGroup::label), Some("Più di 60"));
        assert_eq!(AgeGroup::from_age(100), None);
        assert_eq!(AgeGroup::from_age(-1), None);
        assert_eq!(derive_age_group(None), None);
    }

    #[test]
    fn test_group_is_null_iff_date_bad_or_age_out_of_range() {
        let today = date(2024, 6, 1);
        for (raw, expect_group) in [
            ("1990-05-01", true),
            ("invalid", false),
            ("1900-01-01", false),
            ("2030-01-01", false),
            ("2024-06-01", true),
        ] {
            let group = derive_age_group(derive_age(raw, today));
            assert_eq!(group.is_some(), expect_group, "birth_date {raw}");
        }
    }

    #[test]
    fn test_derive_features_three_respondents() {
        let rows = ["1990-05-01", "1985-01-01", "invalid"]
            .into_iter()
            .map(|d| Record::from_iter([("birth_date", d)]))
            .collect();
        let table = Table::from_records(vec!["birth_date".into()], rows);

        let derived = derive_features(&table, date(2024, 6, 1));
        let ages: Vec<&CellValue> = derived.table.column(AGE).collect();
        assert_eq!(
            ages,
            vec![&CellValue::Integer(34), &CellValue::Integer(39), &CellValue::Null]
        );
        let groups: Vec<&CellValue> = derived.table.column(AGE_GROUP).collect();
        assert_eq!(
            groups,
            vec![&CellValue::from("30-40"), &CellValue::from("30-40"), &CellValue::Null]
        );
        assert_eq!(derived.excluded_from_age_analysis, 1);
        assert_eq!(
            derived.table.column_names,
            vec!["birth_date".to_string(), AGE.to_string(), AGE_GROUP.to_string()]
        );
    }

    #[test]
    fn test_derive_features_recomputes_existing_columns() {
        let rows = vec![Record::from_iter([
            ("birth_date", CellValue::from("2000-01-01")),
            ("age", CellValue::Integer(99)),
        ])];
        let table = Table::from_records(vec!["birth_date".into(), "age".into()], rows);
        let derived = derive_features(&table, date(2024, 6, 1));
        assert_eq!(derived.table.rows[0].get(AGE), &CellValue::Integer(24));
        assert_eq!(derived.table.column_names.len(), 3);
    }
}
