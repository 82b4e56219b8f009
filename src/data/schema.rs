//! Column vocabulary of the two survey datasets.

/// Fixed demographic columns of the competency survey, as found in the source.
pub const RESPONSE_COLUMNS: [&str; 6] = [
    "group",
    "language",
    "birth_date",
    "sex",
    "country",
    "work_place",
];

/// Derived by the feature deriver, never present in the source.
pub const AGE: &str = "age";
pub const AGE_GROUP: &str = "age_group";
pub const BIRTH_DATE: &str = "birth_date";
pub const WORK_PLACE: &str = "work_place";

/// Dimensions offered as filters on the competency dashboard.
pub const RESPONSE_FILTER_COLUMNS: [&str; 6] =
    ["group", "language", AGE_GROUP, "sex", "country", WORK_PLACE];

/// Fixed columns of the qualities survey.
pub const QUALITY_COLUMNS: [&str; 5] = ["id", "mainWorkplace", "country", "gender", QUALITIES];

pub const PARTICIPANT_ID: &str = "id";
pub const MAIN_WORKPLACE: &str = "mainWorkplace";
pub const QUALITIES: &str = "qualities";

/// Dimensions offered as filters on the qualities dashboard.
pub const QUALITY_FILTER_COLUMNS: [&str; 3] = [MAIN_WORKPLACE, "country", "gender"];

/// Whether `column` is part of the demographic set (fixed or derived).
pub fn is_demographic(column: &str) -> bool {
    RESPONSE_COLUMNS.contains(&column) || column == AGE || column == AGE_GROUP
}

/// Competency columns are every column outside the demographic set,
/// kept in source order.
pub fn competency_columns<S: AsRef<str>>(column_names: &[S]) -> Vec<String> {
    column_names
        .iter()
        .map(|c| c.as_ref())
        .filter(|c| !is_demographic(c))
        .map(str::to_string)
        .collect()
}
