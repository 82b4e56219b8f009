use std::path::PathBuf;

use chrono::{Local, NaiveDate};
use clap::{Parser, ValueEnum};
use serde::Serialize;

use crate::data::filter::FilterSpec;
use crate::data::loader::guess_cell_type;
use crate::error::{Result, SurveyError};

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Filtered aggregate views over leadership survey data
#[derive(Parser, Debug, Clone)]
#[command(
    name = "leadership-survey",
    about = "Filtered aggregate views over leadership survey data",
    version
)]
pub struct Settings {
    /// Competency responses (.csv, .json or .parquet)
    #[arg(long, env = "SURVEY_RESPONSES", default_value = "reporte_para_dashboard.csv")]
    pub responses: PathBuf,

    /// Quality selections (.json or .parquet)
    #[arg(long, env = "SURVEY_QUALITIES", default_value = "qualities_survey.json")]
    pub qualities: PathBuf,

    /// Which dashboard to compute
    #[arg(long, value_enum, default_value_t = ViewKind::Competencies)]
    pub view: ViewKind,

    /// Restrict a column to a value, e.g. `work_place=Ufficio` (repeatable;
    /// repeated columns are OR-ed)
    #[arg(long = "filter", value_name = "COLUMN=VALUE")]
    pub filters: Vec<String>,

    /// Qualities kept per workplace in the comparison
    #[arg(long, default_value = "5", value_parser = clap::value_parser!(u32).range(1..))]
    pub top_n: u32,

    /// Length of the overall quality ranking
    #[arg(long, default_value = "15", value_parser = clap::value_parser!(u32).range(1..))]
    pub top_overall: u32,

    /// Date ages are computed against (defaults to today)
    #[arg(long, value_name = "YYYY-MM-DD")]
    pub reference_date: Option<NaiveDate>,

    /// Logging level
    #[arg(long, default_value = "info", value_parser = ["trace", "debug", "info", "warn", "error"])]
    pub log_level: String,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewKind {
    Competencies,
    Qualities,
}

impl Settings {
    pub fn reference_date(&self) -> NaiveDate {
        self.reference_date
            .unwrap_or_else(|| Local::now().date_naive())
    }

    pub fn report_config(&self) -> ReportConfig {
        ReportConfig {
            top_n_per_group: self.top_n as usize,
            top_overall: self.top_overall as usize,
        }
    }

    /// Parse the `--filter` arguments into per-column allowed sets.
    pub fn filter_overrides(&self) -> Result<FilterSpec> {
        parse_filters(&self.filters)
    }
}

/// Parse `column=value` pairs; values are typed like CSV cells so that
/// `group=2` matches an integer column.
pub fn parse_filters<I, S>(args: I) -> Result<FilterSpec>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut spec = FilterSpec::new();
    for arg in args {
        let arg = arg.as_ref();
        let (column, value) = arg
            .split_once('=')
            .ok_or_else(|| SurveyError::InvalidFilter(format!("expected COLUMN=VALUE, got '{arg}'")))?;
        let column = column.trim();
        if column.is_empty() {
            return Err(SurveyError::InvalidFilter(format!("empty column name in '{arg}'")));
        }
        let value = guess_cell_type(value);
        if value.is_null() {
            return Err(SurveyError::InvalidFilter(format!(
                "'{arg}' selects a null value, which never matches"
            )));
        }
        spec.entry(column.to_string()).or_default().insert(value);
    }
    Ok(spec)
}

// ── ReportConfig ───────────────────────────────────────────────────────────────

/// Tunables of the report builders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReportConfig {
    /// N of the per-workplace top-N quality comparison.
    pub top_n_per_group: usize,
    /// Length of the overall quality ranking.
    pub top_overall: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            top_n_per_group: 5,
            top_overall: 15,
        }
    }
}
