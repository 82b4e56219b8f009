use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, bail};
use arrow::array::{Array, ArrayRef, AsArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Date32Type, Float32Type, Float64Type, Int32Type, Int64Type};
use log::info;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{CellValue, Record, Table};
use super::schema::{QUALITY_COLUMNS, RESPONSE_COLUMNS};
use crate::error::{Result, SurveyError};

/// Tokens pandas reads as missing; they must never become a category.
const NULL_TOKENS: &[&str] = &["", "NA", "N/A", "n/a", "nan", "NaN", "null", "NULL", "None"];

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Load a survey table from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – header row, one response per line
/// * `.json`    – `[{ "id": 1, "qualities": ["..."], ...fields }, ...]`
/// * `.parquet` – scalar columns plus optional list-of-string columns
pub fn load_table(path: &Path) -> Result<Table> {
    let table = read_table(path).map_err(|err| SurveyError::SourceUnavailable {
        path: path.to_path_buf(),
        reason: format!("{err:#}"),
    })?;
    info!(
        "Loaded {} rows x {} columns from {}",
        table.len(),
        table.column_names.len(),
        path.display()
    );
    Ok(table)
}

/// Load the competency survey and check its fixed demographic columns.
pub fn load_responses(path: &Path) -> Result<Table> {
    let table = load_table(path)?;
    require_columns(&table, path, &RESPONSE_COLUMNS)?;
    Ok(table)
}

/// Load the qualities survey and check its fixed columns.
pub fn load_qualities(path: &Path) -> Result<Table> {
    let table = load_table(path)?;
    require_columns(&table, path, &QUALITY_COLUMNS)?;
    Ok(table)
}

/// Fail with [`SurveyError::SchemaMismatch`] listing every absent column.
pub fn require_columns(table: &Table, path: &Path, required: &[&str]) -> Result<()> {
    let missing: Vec<String> = required
        .iter()
        .filter(|col| !table.has_column(col))
        .map(|col| col.to_string())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(SurveyError::SchemaMismatch {
            path: path.to_path_buf(),
            missing,
        })
    }
}

fn read_table(path: &Path) -> anyhow::Result<Table> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "parquet" | "pq" => load_parquet(path),
        "json" => load_json(path),
        "csv" => load_csv(path),
        other => bail!("Unsupported file extension: .{other}"),
    }
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented, the default `df.to_json(orient='records')`):
///
/// ```json
/// [
///   {
///     "id": 17,
///     "mainWorkplace": "Cantiere",
///     "country": "Italia",
///     "gender": "F",
///     "qualities": ["ascolto", "coerenza"]
///   },
///   ...
/// ]
/// ```
fn load_json(path: &Path) -> anyhow::Result<Table> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;

    let records = root
        .as_array()
        .context("Expected top-level JSON array")?;

    let mut rows = Vec::with_capacity(records.len());

    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;

        let fields: BTreeMap<String, CellValue> = obj
            .iter()
            .map(|(key, val)| (key.clone(), json_to_cell(val)))
            .collect();

        rows.push(Record::new(fields));
    }

    Ok(Table::from_records(Vec::new(), rows))
}

fn json_to_cell(val: &JsonValue) -> CellValue {
    match val {
        JsonValue::String(s) => guess_text(s),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                CellValue::Integer(i)
            } else if let Some(f) = n.as_f64() {
                CellValue::Float(f)
            } else {
                CellValue::String(n.to_string())
            }
        }
        JsonValue::Bool(b) => CellValue::Bool(*b),
        JsonValue::Array(items) => CellValue::List(items.iter().map(json_to_cell).collect()),
        JsonValue::Null => CellValue::Null,
        other => CellValue::String(other.to_string()),
    }
}

/// Strings from JSON keep their text; only blanks and null tokens change.
fn guess_text(s: &str) -> CellValue {
    if NULL_TOKENS.contains(&s.trim()) {
        CellValue::Null
    } else {
        CellValue::String(s.to_string())
    }
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: header row with column names, one response per line.
/// Every column is typed per cell; blanks and null tokens become null.
fn load_csv(path: &Path) -> anyhow::Result<Table> {
    let mut reader = csv::Reader::from_path(path).context("opening CSV")?;
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();

    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;

        let mut fields = BTreeMap::new();
        for (col_idx, value) in record.iter().enumerate() {
            let col_name = headers
                .get(col_idx)
                .with_context(|| format!("CSV row {row_no}: more fields than headers"))?;
            fields.insert(col_name.clone(), guess_cell_type(value));
        }

        rows.push(Record::new(fields));
    }

    Ok(Table::from_records(headers, rows))
}

/// Type a raw text cell the way `pandas.read_csv` would.
pub fn guess_cell_type(s: &str) -> CellValue {
    let s = s.trim();
    if NULL_TOKENS.contains(&s) {
        return CellValue::Null;
    }
    if let Ok(i) = s.parse::<i64>() {
        return CellValue::Integer(i);
    }
    if let Ok(f) = s.parse::<f64>() {
        return CellValue::Float(f);
    }
    match s {
        "true" | "True" | "TRUE" => CellValue::Bool(true),
        "false" | "False" | "FALSE" => CellValue::Bool(false),
        _ => CellValue::String(s.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file containing survey data.
///
/// Scalar columns map to the matching [`CellValue`] variant; List or
/// LargeList columns become [`CellValue::List`]. Dictionary-encoded
/// (categorical) columns are decoded to their values and timestamps are
/// truncated to dates. Any other Arrow type is rejected.
///
/// Works with files written by both **Pandas** (`df.to_parquet()`) and
/// **Polars** (`df.write_parquet()`).
fn load_parquet(path: &Path) -> anyhow::Result<Table> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .context("reading parquet metadata")?;
    let column_names: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let reader = builder.build().context("building parquet reader")?;

    let mut rows = Vec::new();

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let schema = batch.schema();
        let columns = batch
            .columns()
            .iter()
            .zip(schema.fields())
            .map(|(col, field)| {
                normalize_column(col).with_context(|| format!("column '{}'", field.name()))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        for row in 0..batch.num_rows() {
            let mut fields = BTreeMap::new();
            for (col, field) in columns.iter().zip(schema.fields()) {
                let value = extract_cell(col, row)
                    .with_context(|| format!("column '{}'", field.name()))?;
                fields.insert(field.name().clone(), value);
            }
            rows.push(Record::new(fields));
        }
    }

    Ok(Table::from_records(column_names, rows))
}

// -- Parquet / Arrow helpers --

/// Cast encodings without a direct cell mapping to one that has it:
/// dictionaries to their value type, timestamps and `Date64` to `Date32`.
fn normalize_column(col: &ArrayRef) -> anyhow::Result<ArrayRef> {
    let target = match col.data_type() {
        DataType::Dictionary(_, values) => values.as_ref().clone(),
        DataType::Timestamp(_, _) | DataType::Date64 => DataType::Date32,
        _ => return Ok(Arc::clone(col)),
    };
    let converted = cast(col.as_ref(), &target)
        .with_context(|| format!("converting {} to {target}", col.data_type()))?;
    normalize_column(&converted)
}

/// Extract a single cell from an Arrow column at a given row.
fn extract_cell(col: &ArrayRef, row: usize) -> anyhow::Result<CellValue> {
    if col.is_null(row) {
        return Ok(CellValue::Null);
    }
    let cell = match col.data_type() {
        DataType::Utf8 => guess_text(col.as_string::<i32>().value(row)),
        DataType::LargeUtf8 => guess_text(col.as_string::<i64>().value(row)),
        DataType::Int32 => CellValue::Integer(col.as_primitive::<Int32Type>().value(row) as i64),
        DataType::Int64 => CellValue::Integer(col.as_primitive::<Int64Type>().value(row)),
        DataType::Float32 => CellValue::Float(col.as_primitive::<Float32Type>().value(row) as f64),
        DataType::Float64 => CellValue::Float(col.as_primitive::<Float64Type>().value(row)),
        DataType::Boolean => CellValue::Bool(col.as_boolean().value(row)),
        DataType::Date32 => match col.as_primitive::<Date32Type>().value_as_date(row) {
            Some(date) => CellValue::Date(date.format("%Y-%m-%d").to_string()),
            None => CellValue::Null,
        },
        DataType::List(_) => list_cell(&col.as_list::<i32>().value(row))?,
        DataType::LargeList(_) => list_cell(&col.as_list::<i64>().value(row))?,
        other => bail!("unsupported Arrow type {other}"),
    };
    Ok(cell)
}

fn list_cell(values: &ArrayRef) -> anyhow::Result<CellValue> {
    let values = normalize_column(values)?;
    let items = (0..values.len())
        .map(|j| extract_cell(&values, j))
        .collect::<anyhow::Result<Vec<_>>>()?;
    Ok(CellValue::List(items))
}
