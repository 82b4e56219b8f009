//! Data preparation and aggregation core for the leadership survey
//! dashboards.
//!
//! Two pipelines share one shape: load a table, derive (competencies) or
//! expand (qualities) it, filter it by a [`data::filter::FilterSpec`] and
//! aggregate the result into the structures in [`report`].

pub mod config;
pub mod data;
pub mod error;
pub mod report;
pub mod state;

pub use error::{Result, SurveyError};
