//! Prepared survey tables: loaded, derived or expanded, ready to filter.

use chrono::NaiveDate;

use super::derive::derive_features;
use super::expand::expand;
use super::filter::{init_filter_spec, FilterSpec};
use super::model::Table;
use super::schema::{
    competency_columns, PARTICIPANT_ID, QUALITIES, QUALITY_FILTER_COLUMNS,
    RESPONSE_FILTER_COLUMNS,
};
use crate::error::Result;

// ---------------------------------------------------------------------------
// Competency survey (pipeline A)
// ---------------------------------------------------------------------------

/// Competency responses with `age` / `age_group` derived.
#[derive(Debug, Clone)]
pub struct CompetencySurvey {
    pub table: Table,
    /// Score columns, fixed at preparation time.
    competencies: Vec<String>,
    /// Records with no age bracket; they drop out as soon as the age
    /// dimension is constrained.
    pub excluded_from_age_analysis: usize,
}

impl CompetencySurvey {
    pub fn prepare(raw: &Table, today: NaiveDate) -> Self {
        let derived = derive_features(raw, today);
        let competencies = competency_columns(&derived.table.column_names);
        CompetencySurvey {
            table: derived.table,
            competencies,
            excluded_from_age_analysis: derived.excluded_from_age_analysis,
        }
    }

    pub fn competencies(&self) -> &[String] {
        &self.competencies
    }

    /// Every filter dimension with all of its options selected.
    pub fn default_filter(&self) -> FilterSpec {
        init_filter_spec(&self.table, &RESPONSE_FILTER_COLUMNS)
    }
}

// ---------------------------------------------------------------------------
// Quality survey (pipeline B)
// ---------------------------------------------------------------------------

/// Quality selections, one row per (respondent, quality).
#[derive(Debug, Clone)]
pub struct QualitySurvey {
    /// Expanded rows; `id` refers back to the respondent.
    pub table: Table,
    /// Respondents in the source, before expansion.
    pub respondents: usize,
}

impl QualitySurvey {
    pub fn prepare(raw: &Table) -> Result<Self> {
        Ok(QualitySurvey {
            table: expand(raw, QUALITIES)?,
            respondents: raw.len(),
        })
    }

    pub fn default_filter(&self) -> FilterSpec {
        init_filter_spec(&self.table, &QUALITY_FILTER_COLUMNS)
    }

    /// Column that identifies the originating respondent of a row.
    pub fn id_column(&self) -> &'static str {
        PARTICIPANT_ID
    }
}
