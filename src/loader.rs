//! Delimited-file loading and writing for [`Table`]s.
//!
//! Column types are inferred from every present value: a column is numeric
//! when all values parse as numbers, temporal when all parse as dates, and
//! text otherwise. A column with no present values loads as numeric.

use std::path::Path;

use anyhow::{Context, Result, bail};
use encoding_rs::Encoding;
use log::{debug, info};

use crate::{
    data::{ColumnType, is_missing_token, parse_naive_date, parse_number},
    frame::{Column, Table},
    io_utils,
};

pub fn load_table(path: &Path, delimiter: u8, encoding: &'static Encoding) -> Result<Table> {
    if !io_utils::is_dash(path) && !path.exists() {
        bail!("Input file not found: {path:?}");
    }
    info!(
        "Loading '{}' with delimiter '{}'",
        path.display(),
        io_utils::printable_delimiter(delimiter)
    );
    let mut reader = io_utils::open_csv_reader_from_path(path, delimiter)?;
    let headers = io_utils::reader_headers(&mut reader, encoding)
        .with_context(|| format!("Reading headers from {path:?}"))?;

    let mut cells: Vec<Vec<Option<String>>> = vec![Vec::new(); headers.len()];
    for (row_idx, record) in reader.byte_records().enumerate() {
        let record = record.with_context(|| format!("Reading row {}", row_idx + 2))?;
        let decoded = io_utils::decode_record(&record, encoding)
            .with_context(|| format!("Decoding row {}", row_idx + 2))?;
        for (column, value) in cells.iter_mut().zip(decoded) {
            column.push((!is_missing_token(&value)).then(|| value.trim().to_string()));
        }
    }

    let columns = headers
        .iter()
        .zip(cells)
        .map(|(name, values)| build_column(name, values))
        .collect::<Result<Vec<_>>>()?;
    let table = Table::from_columns(columns)?;
    info!(
        "Loaded {} rows and {} columns",
        table.row_count(),
        table.column_count()
    );
    debug!("Columns: {:?}", table.column_names());
    Ok(table)
}

pub fn infer_type(values: &[Option<String>]) -> ColumnType {
    let present = || values.iter().flatten();
    if present().all(|v| parse_number(v).is_ok()) {
        ColumnType::Numeric
    } else if present().all(|v| parse_naive_date(v).is_ok()) {
        ColumnType::Temporal
    } else {
        ColumnType::Text
    }
}

fn build_column(name: &str, values: Vec<Option<String>>) -> Result<Column> {
    let ty = infer_type(&values);
    debug!("Column '{name}' inferred as {ty}");
    Column::text(name, values)
        .coerce(ty)
        .with_context(|| format!("Converting column '{name}' to {ty}"))
}

/// Writes `table` as a delimited file (stdout when `path` is `None` or `-`).
pub fn write_table(table: &Table, path: Option<&Path>, delimiter: u8) -> Result<()> {
    let mut writer = io_utils::open_csv_writer(path, delimiter)?;
    writer
        .write_record(table.column_names())
        .context("Writing output headers")?;
    for (idx, row) in table.to_string_rows().iter().enumerate() {
        writer
            .write_record(row)
            .with_context(|| format!("Writing output row {}", idx + 2))?;
    }
    writer.flush().context("Flushing output writer")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owned(values: &[Option<&str>]) -> Vec<Option<String>> {
        values.iter().map(|v| v.map(str::to_string)).collect()
    }

    #[test]
    fn infers_numeric_temporal_and_text() {
        assert_eq!(
            infer_type(&owned(&[Some("1"), None, Some("2.5")])),
            ColumnType::Numeric
        );
        assert_eq!(
            infer_type(&owned(&[Some("2024-01-01"), Some("2024-02-01")])),
            ColumnType::Temporal
        );
        assert_eq!(
            infer_type(&owned(&[Some("1"), Some("Africa")])),
            ColumnType::Text
        );
        assert_eq!(infer_type(&owned(&[None, None])), ColumnType::Numeric);
    }
}
