use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use leadership_survey::config::{Settings, ViewKind};
use leadership_survey::data::loader::{load_qualities, load_responses};
use leadership_survey::data::schema::{QUALITY_FILTER_COLUMNS, RESPONSE_FILTER_COLUMNS};
use leadership_survey::data::survey::{CompetencySurvey, QualitySurvey};
use leadership_survey::report::{competency_report, quality_report};
use leadership_survey::state::{LoadCache, Selection};

fn main() -> Result<()> {
    let settings = Settings::parse();

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(settings.log_level.as_str()),
    )
    .init();

    info!("leadership-survey v{} starting", env!("CARGO_PKG_VERSION"));

    let mut cache = LoadCache::new();
    let overrides = settings.filter_overrides()?;

    let json = match settings.view {
        ViewKind::Competencies => {
            let raw = cache.get_or_load(&settings.responses, load_responses)?;
            let survey = CompetencySurvey::prepare(&raw, settings.reference_date());
            info!(
                "{} competencies, {} responses without age group",
                survey.competencies().len(),
                survey.excluded_from_age_analysis
            );

            let mut selection = Selection::all(&survey.table, &RESPONSE_FILTER_COLUMNS);
            selection.restrict(overrides)?;
            let view = competency_report(&survey, selection.spec())?;
            serde_json::to_string_pretty(&view)
        }
        ViewKind::Qualities => {
            let raw = cache.get_or_load(&settings.qualities, load_qualities)?;
            let survey = QualitySurvey::prepare(&raw)?;
            info!(
                "{} respondents, {} quality selections",
                survey.respondents,
                survey.table.len()
            );

            let mut selection = Selection::all(&survey.table, &QUALITY_FILTER_COLUMNS);
            selection.restrict(overrides)?;
            let view = quality_report(&survey, selection.spec(), &settings.report_config())?;
            serde_json::to_string_pretty(&view)
        }
    }
    .context("serializing report")?;

    println!("{json}");
    Ok(())
}
