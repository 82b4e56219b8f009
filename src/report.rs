//! The structured payloads handed to the presentation layer.
//!
//! Each builder filters the prepared survey afresh and aggregates the result;
//! an empty filter result is reported as [`View::Empty`].

use log::{info, warn};
use serde::Serialize;

use crate::config::ReportConfig;
use crate::data::aggregate::{
    distinct_count, group_aggregate, mean_by_column, top_value, value_counts, ColumnMean,
    LongRow, Metric, ValueCount,
};
use crate::data::filter::{filter, FilterSpec};
use crate::data::schema::{MAIN_WORKPLACE, QUALITIES, WORK_PLACE};
use crate::data::survey::{CompetencySurvey, QualitySurvey};
use crate::error::Result;

/// Outcome of one query: nothing matched, or the computed report.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum View<T> {
    /// No row satisfies the filters.
    Empty,
    Ready(T),
}

impl<T> View<T> {
    pub fn ready(self) -> Option<T> {
        match self {
            View::Ready(report) => Some(report),
            View::Empty => None,
        }
    }
}

/// Turn a recoverable aggregate error into a missing value.
fn placeholder<T>(result: Result<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err) if err.is_recoverable() => {
            warn!("{err}");
            Ok(None)
        }
        Err(err) => Err(err),
    }
}

// ── Competency dashboard ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompetencyReport {
    /// Filtered responses.
    pub total_responses: usize,
    /// Responses of the whole survey lacking an age bracket.
    pub excluded_from_age_analysis: usize,
    /// Mean per competency, ascending.
    ///
    /// `None` as soon as one competency has no scores among the filtered
    /// responses: the chart is withheld rather than drawn with a missing bar.
    /// The per-workplace `comparison` still carries every defined mean.
    pub average_scores: Option<Vec<ColumnMean>>,
    /// Responses per work place, most frequent first.
    pub workplace_distribution: Vec<ValueCount>,
    /// Mean per (work place, competency).
    pub comparison: Vec<LongRow>,
}

pub fn competency_report(
    survey: &CompetencySurvey,
    spec: &FilterSpec,
) -> Result<View<CompetencyReport>> {
    let filtered = filter(&survey.table, spec);
    if filtered.is_empty() {
        info!("No responses match the selected filters");
        return Ok(View::Empty);
    }

    let competencies = survey.competencies().to_vec();
    let report = CompetencyReport {
        total_responses: filtered.len(),
        excluded_from_age_analysis: survey.excluded_from_age_analysis,
        average_scores: placeholder(mean_by_column(&filtered, &competencies))?,
        workplace_distribution: placeholder(value_counts(&filtered, WORK_PLACE))?
            .unwrap_or_default(),
        comparison: group_aggregate(
            &filtered,
            WORK_PLACE,
            &Metric::Mean {
                columns: competencies,
            },
        ),
    };
    Ok(View::Ready(report))
}

// ── Quality dashboard ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityReport {
    /// Distinct respondents among the filtered rows.
    pub total_participants: usize,
    /// Filtered (respondent, quality) rows.
    pub total_selections: usize,
    pub top_quality: Option<ValueCount>,
    /// The `top_overall` most selected qualities, ascending for a
    /// horizontal bar chart.
    pub top_qualities: Vec<ValueCount>,
    /// Top-N qualities per main workplace.
    pub comparison: Vec<LongRow>,
}

pub fn quality_report(
    survey: &QualitySurvey,
    spec: &FilterSpec,
    config: &ReportConfig,
) -> Result<View<QualityReport>> {
    let filtered = filter(&survey.table, spec);
    if filtered.is_empty() {
        info!("No quality selections match the selected filters");
        return Ok(View::Empty);
    }

    let mut top_qualities: Vec<ValueCount> = placeholder(value_counts(&filtered, QUALITIES))?
        .unwrap_or_default()
        .into_iter()
        .take(config.top_overall)
        .collect();
    top_qualities.reverse();

    let report = QualityReport {
        total_participants: distinct_count(&filtered, survey.id_column()),
        total_selections: filtered.len(),
        top_quality: placeholder(top_value(&filtered, QUALITIES))?,
        top_qualities,
        comparison: group_aggregate(
            &filtered,
            MAIN_WORKPLACE,
            &Metric::TopCounts {
                column: QUALITIES.to_string(),
                n: config.top_n_per_group,
            },
        ),
    };
    Ok(View::Ready(report))
}
