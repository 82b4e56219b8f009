use log::debug;

use super::model::{CellValue, Table};
use crate::error::{Result, SurveyError};

/// One output row per element of `list_column`, other fields copied.
///
/// Elements keep their list order. Rows whose list is empty or null produce
/// nothing. Any other cell type in `list_column` is an error.
pub fn expand(table: &Table, list_column: &str) -> Result<Table> {
    if !table.has_column(list_column) {
        return Err(SurveyError::InvalidListColumn {
            column: list_column.to_string(),
            found: "missing column".to_string(),
        });
    }

    let mut rows = Vec::new();
    let mut dropped = 0usize;

    for record in &table.rows {
        match record.get(list_column) {
            CellValue::List(items) => {
                if items.is_empty() {
                    dropped += 1;
                }
                for item in items {
                    let mut row = record.clone();
                    row.set(list_column, item.clone());
                    rows.push(row);
                }
            }
            CellValue::Null => dropped += 1,
            other => {
                return Err(SurveyError::InvalidListColumn {
                    column: list_column.to_string(),
                    found: other.type_name().to_string(),
                })
            }
        }
    }

    debug!(
        "Expanded '{list_column}': {} records -> {} rows ({dropped} without elements)",
        table.len(),
        rows.len()
    );

    Ok(Table::from_records(table.column_names.clone(), rows))
}
