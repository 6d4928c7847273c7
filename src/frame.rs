//! In-memory column-major table.
//!
//! A [`Table`] is an ordered list of named [`Column`]s whose values are
//! aligned by row position. Row order is meaningful: interpolation and
//! forward fill walk rows in order, and no operation here re-sorts rows
//! unless its name says so ([`Table::sort_by_numeric`]).
//!
//! Missing cells are `None`. Numeric constructors map `NaN` to `None`, so a
//! numeric column never carries `NaN` downstream.

use std::cmp::Ordering;

use anyhow::{Result, anyhow};
use chrono::NaiveDate;
use serde::{Serialize, Serializer};

use crate::{
    data::{ColumnType, Value, format_number, parse_naive_date, parse_number},
    error::{EngineError, EngineResult},
};

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Numeric(Vec<Option<f64>>),
    Text(Vec<Option<String>>),
    Temporal(Vec<Option<NaiveDate>>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    data: ColumnData,
}

fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

impl Column {
    pub fn numeric(name: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        Self {
            name: name.into(),
            data: ColumnData::Numeric(values.into_iter().map(finite).collect()),
        }
    }

    /// Builds a numeric column from raw floats; `NaN` becomes missing.
    pub fn from_f64s(name: impl Into<String>, values: impl IntoIterator<Item = f64>) -> Self {
        Self {
            name: name.into(),
            data: ColumnData::Numeric(values.into_iter().map(|v| finite(Some(v))).collect()),
        }
    }

    pub fn text<S: Into<String>>(name: impl Into<String>, values: Vec<Option<S>>) -> Self {
        Self {
            name: name.into(),
            data: ColumnData::Text(values.into_iter().map(|v| v.map(Into::into)).collect()),
        }
    }

    pub fn temporal(name: impl Into<String>, values: Vec<Option<NaiveDate>>) -> Self {
        Self {
            name: name.into(),
            data: ColumnData::Temporal(values),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn data(&self) -> &ColumnData {
        &self.data
    }

    pub(crate) fn data_mut(&mut self) -> &mut ColumnData {
        &mut self.data
    }

    pub fn column_type(&self) -> ColumnType {
        match self.data {
            ColumnData::Numeric(_) => ColumnType::Numeric,
            ColumnData::Text(_) => ColumnType::Text,
            ColumnData::Temporal(_) => ColumnType::Temporal,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self.data, ColumnData::Numeric(_))
    }

    pub fn len(&self) -> usize {
        match &self.data {
            ColumnData::Numeric(values) => values.len(),
            ColumnData::Text(values) => values.len(),
            ColumnData::Temporal(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_missing(&self, row: usize) -> bool {
        match &self.data {
            ColumnData::Numeric(values) => values.get(row).is_none_or(Option::is_none),
            ColumnData::Text(values) => values.get(row).is_none_or(Option::is_none),
            ColumnData::Temporal(values) => values.get(row).is_none_or(Option::is_none),
        }
    }

    pub fn missing_count(&self) -> usize {
        (0..self.len()).filter(|row| self.is_missing(*row)).count()
    }

    pub fn get(&self, row: usize) -> Option<Value> {
        match &self.data {
            ColumnData::Numeric(values) => values.get(row).copied().flatten().map(Value::Number),
            ColumnData::Text(values) => values.get(row).cloned().flatten().map(Value::Text),
            ColumnData::Temporal(values) => values.get(row).copied().flatten().map(Value::Date),
        }
    }

    pub fn as_numeric(&self) -> Option<&[Option<f64>]> {
        match &self.data {
            ColumnData::Numeric(values) => Some(values),
            _ => None,
        }
    }

    pub fn as_numeric_mut(&mut self) -> Option<&mut Vec<Option<f64>>> {
        match &mut self.data {
            ColumnData::Numeric(values) => Some(values),
            _ => None,
        }
    }

    pub fn take(&self, rows: &[usize]) -> Column {
        fn pick<T: Clone>(values: &[Option<T>], rows: &[usize]) -> Vec<Option<T>> {
            rows.iter()
                .map(|row| values.get(*row).cloned().flatten())
                .collect()
        }
        let data = match &self.data {
            ColumnData::Numeric(values) => ColumnData::Numeric(pick(values, rows)),
            ColumnData::Text(values) => ColumnData::Text(pick(values, rows)),
            ColumnData::Temporal(values) => ColumnData::Temporal(pick(values, rows)),
        };
        Column {
            name: self.name.clone(),
            data,
        }
    }

    fn retain(&mut self, keep: &[bool]) {
        fn apply<T>(values: &mut Vec<Option<T>>, keep: &[bool]) {
            let mut idx = 0;
            values.retain(|_| {
                let kept = keep.get(idx).copied().unwrap_or(true);
                idx += 1;
                kept
            });
        }
        match &mut self.data {
            ColumnData::Numeric(values) => apply(values, keep),
            ColumnData::Text(values) => apply(values, keep),
            ColumnData::Temporal(values) => apply(values, keep),
        }
    }

    /// Converts the column to `target`. Any present value that cannot be
    /// converted fails the whole conversion.
    pub fn coerce(&self, target: ColumnType) -> Result<Column> {
        let data = match (&self.data, target) {
            (data, target) if self.column_type() == target => data.clone(),
            (ColumnData::Numeric(values), ColumnType::Text) => ColumnData::Text(
                values.iter().map(|v| v.map(format_number)).collect(),
            ),
            (ColumnData::Temporal(values), ColumnType::Text) => ColumnData::Text(
                values
                    .iter()
                    .map(|v| v.map(|d| d.format("%Y-%m-%d").to_string()))
                    .collect(),
            ),
            (ColumnData::Text(values), ColumnType::Numeric) => ColumnData::Numeric(
                values
                    .iter()
                    .map(|v| v.as_deref().map(parse_number).transpose())
                    .collect::<Result<Vec<_>>>()?,
            ),
            (ColumnData::Text(values), ColumnType::Temporal) => ColumnData::Temporal(
                values
                    .iter()
                    .map(|v| v.as_deref().map(|s| parse_naive_date(s.trim())).transpose())
                    .collect::<Result<Vec<_>>>()?,
            ),
            (_, target) => {
                return Err(anyhow!(
                    "Cannot convert {} column '{}' to {target}",
                    self.column_type(),
                    self.name
                ));
            }
        };
        Ok(Column {
            name: self.name.clone(),
            data,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
    row_count: usize,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_columns(columns: Vec<Column>) -> EngineResult<Self> {
        let mut table = Table::new();
        for column in columns {
            table.add_column(column)?;
        }
        Ok(table)
    }

    /// Appends `column`, or replaces the existing column with the same name
    /// in place.
    pub fn add_column(&mut self, column: Column) -> EngineResult<()> {
        if self.columns.is_empty() {
            self.row_count = column.len();
        } else if column.len() != self.row_count {
            return Err(EngineError::LengthMismatch {
                column: column.name().to_string(),
                expected: self.row_count,
                actual: column.len(),
            });
        }
        match self.column_index(column.name()) {
            Some(idx) => self.columns[idx] = column,
            None => self.columns.push(column),
        }
        Ok(())
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub(crate) fn columns_mut(&mut self) -> &mut [Column] {
        &mut self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(Column::name).collect()
    }

    pub fn numeric_column_names(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| c.is_numeric())
            .map(|c| c.name().to_string())
            .collect()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name() == name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name() == name)
    }

    pub(crate) fn column_mut(&mut self, name: &str) -> Option<&mut Column> {
        self.columns.iter_mut().find(|c| c.name() == name)
    }

    pub fn numeric(&self, name: &str) -> EngineResult<&[Option<f64>]> {
        let column = self
            .column(name)
            .ok_or_else(|| EngineError::ColumnNotFound(name.to_string()))?;
        column
            .as_numeric()
            .ok_or_else(|| EngineError::NotNumeric(name.to_string()))
    }

    pub fn row(&self, row: usize) -> Vec<Option<Value>> {
        self.columns.iter().map(|c| c.get(row)).collect()
    }

    /// New table holding `rows` in the given order.
    pub fn take_rows(&self, rows: &[usize]) -> Table {
        Table {
            columns: self.columns.iter().map(|c| c.take(rows)).collect(),
            row_count: rows.len(),
        }
    }

    /// Keeps rows whose flag is `true`; returns how many were removed.
    pub fn retain_rows(&mut self, keep: &[bool]) -> usize {
        let before = self.row_count;
        for column in &mut self.columns {
            column.retain(keep);
        }
        self.row_count = (0..before)
            .filter(|row| keep.get(*row).copied().unwrap_or(true))
            .count();
        before - self.row_count
    }

    /// Stable sort by a numeric column; missing values go last either way.
    pub fn sort_by_numeric(&self, name: &str, descending: bool) -> EngineResult<Table> {
        let values = self.numeric(name)?;
        let mut order: Vec<usize> = (0..self.row_count).collect();
        order.sort_by(|a, b| match (values[*a], values[*b]) {
            (Some(x), Some(y)) if descending => y.total_cmp(&x),
            (Some(x), Some(y)) => x.total_cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        });
        Ok(self.take_rows(&order))
    }

    pub fn to_string_rows(&self) -> Vec<Vec<String>> {
        (0..self.row_count)
            .map(|row| {
                self.columns
                    .iter()
                    .map(|c| c.get(row).map(|v| v.as_display()).unwrap_or_default())
                    .collect()
            })
            .collect()
    }
}

#[derive(Serialize)]
struct TableRecords<'a> {
    columns: Vec<&'a str>,
    rows: Vec<Vec<Option<Value>>>,
}

impl Serialize for Table {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        TableRecords {
            columns: self.column_names(),
            rows: (0..self.row_count).map(|row| self.row(row)).collect(),
        }
        .serialize(serializer)
    }
}
