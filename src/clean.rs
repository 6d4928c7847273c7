//! Table-cleaning transforms.
//!
//! [`Cleaner`] takes its own copy of the loaded table and mutates that copy
//! across successive calls; the caller's table is never touched. Every
//! transform that changes data appends a [`CleaningAction`] to the
//! [`CleaningReport`].
//!
//! The transforms are independent and can be applied in any order, but name
//! normalization has to run before any lookup that assumes canonical names.

use std::{collections::HashSet, fmt, str::FromStr};

use chrono::NaiveDate;
use log::{debug, info, warn};
use serde::Serialize;

use crate::{
    columns::normalize_column_name,
    data::ColumnType,
    error::{EngineError, EngineResult},
    frame::{ColumnData, Table},
    impute,
    report::{CleaningAction, CleaningReport},
    stats::ColumnStats,
};

pub const DEFAULT_OUTLIER_THRESHOLD: f64 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImputationStrategy {
    Drop,
    Mean,
    Median,
    #[default]
    Interpolate,
    ForwardFill,
}

impl ImputationStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImputationStrategy::Drop => "drop",
            ImputationStrategy::Mean => "mean",
            ImputationStrategy::Median => "median",
            ImputationStrategy::Interpolate => "interpolate",
            ImputationStrategy::ForwardFill => "forward_fill",
        }
    }

    fn supports(&self, column_type: ColumnType) -> bool {
        column_type == ColumnType::Numeric
            || matches!(
                self,
                ImputationStrategy::Drop | ImputationStrategy::ForwardFill
            )
    }
}

impl fmt::Display for ImputationStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImputationStrategy {
    type Err = EngineError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "drop" => Ok(ImputationStrategy::Drop),
            "mean" => Ok(ImputationStrategy::Mean),
            "median" => Ok(ImputationStrategy::Median),
            "interpolate" => Ok(ImputationStrategy::Interpolate),
            "forward_fill" | "ffill" => Ok(ImputationStrategy::ForwardFill),
            _ => Err(EngineError::UnknownStrategy(value.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutlierMethod {
    #[default]
    Iqr,
    ZScore,
}

impl OutlierMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutlierMethod::Iqr => "iqr",
            OutlierMethod::ZScore => "zscore",
        }
    }

    /// Clamping bounds for a column, or `None` when fewer than two values
    /// are present or `threshold` is negative or not finite.
    pub fn bounds(&self, stats: &ColumnStats, threshold: f64) -> Option<(f64, f64)> {
        if stats.count() < 2 || !is_valid_threshold(threshold) {
            return None;
        }
        match self {
            OutlierMethod::Iqr => {
                let q1 = stats.quantile(0.25)?;
                let q3 = stats.quantile(0.75)?;
                let iqr = q3 - q1;
                Some((q1 - threshold * iqr, q3 + threshold * iqr))
            }
            OutlierMethod::ZScore => {
                let mean = stats.mean()?;
                let std = stats.std_dev()?;
                Some((mean - threshold * std, mean + threshold * std))
            }
        }
    }
}

fn is_valid_threshold(threshold: f64) -> bool {
    threshold.is_finite() && threshold >= 0.0
}

impl fmt::Display for OutlierMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutlierMethod {
    type Err = EngineError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "iqr" => Ok(OutlierMethod::Iqr),
            "zscore" => Ok(OutlierMethod::ZScore),
            _ => Err(EngineError::UnknownOutlierMethod(value.to_string())),
        }
    }
}

/// Missing-value totals over the columns an imputation pass processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ImputationSummary {
    pub missing_before: usize,
    pub missing_after: usize,
}

impl ImputationSummary {
    pub fn is_resolved(&self) -> bool {
        self.missing_after == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum CellKey {
    Missing,
    Number(u64),
    Text(String),
    Date(NaiveDate),
}

fn number_key(value: f64) -> CellKey {
    // -0.0 and 0.0 are the same value
    CellKey::Number(if value == 0.0 { 0 } else { value.to_bits() })
}

fn cell_key(data: &ColumnData, row: usize) -> CellKey {
    match data {
        ColumnData::Numeric(values) => values[row].map_or(CellKey::Missing, number_key),
        ColumnData::Text(values) => values[row]
            .clone()
            .map_or(CellKey::Missing, CellKey::Text),
        ColumnData::Temporal(values) => values[row].map_or(CellKey::Missing, CellKey::Date),
    }
}

#[derive(Debug, Clone)]
pub struct Cleaner {
    raw: Table,
    table: Table,
    report: CleaningReport,
}

impl Cleaner {
    pub fn new(table: &Table) -> Self {
        Self {
            raw: table.clone(),
            table: table.clone(),
            report: CleaningReport::new(),
        }
    }

    /// The table as it was handed in.
    pub fn raw(&self) -> &Table {
        &self.raw
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn report(&self) -> &CleaningReport {
        &self.report
    }

    pub fn into_parts(self) -> (Table, CleaningReport) {
        (self.table, self.report)
    }

    /// Rewrites every column name to its canonical form.
    ///
    /// Names that collide after normalization get a numeric suffix (`_2`,
    /// `_3`, ...) in column order so every column stays addressable.
    pub fn normalize_column_names(&mut self) -> usize {
        let mut renamed = 0;
        let mut taken = HashSet::new();
        for column in self.table.columns_mut() {
            let base = normalize_column_name(column.name());
            let mut normalized = base.clone();
            let mut suffix = 2;
            while taken.contains(&normalized) {
                normalized = format!("{base}_{suffix}");
                suffix += 1;
            }
            if normalized != base {
                warn!(
                    "Column '{}' normalizes to '{base}', which is already taken; using '{normalized}'",
                    column.name()
                );
            }
            taken.insert(normalized.clone());
            if normalized != column.name() {
                debug!("Renaming column '{}' to '{normalized}'", column.name());
                column.set_name(normalized);
                renamed += 1;
            }
        }
        info!("Normalized column names");
        if renamed > 0 {
            self.report
                .record(CleaningAction::NormalizedNames { renamed });
        }
        renamed
    }

    /// Drops rows equal to an earlier row across `subset` (all columns when
    /// `None`), keeping the first occurrence.
    pub fn remove_duplicates(&mut self, subset: Option<&[String]>) -> EngineResult<usize> {
        let indices = match subset {
            Some(names) => names
                .iter()
                .map(|name| {
                    self.table
                        .column_index(name)
                        .ok_or_else(|| EngineError::ColumnNotFound(name.clone()))
                })
                .collect::<EngineResult<Vec<_>>>()?,
            None => (0..self.table.column_count()).collect(),
        };

        let mut seen = HashSet::new();
        let keep: Vec<bool> = (0..self.table.row_count())
            .map(|row| {
                let key: Vec<CellKey> = indices
                    .iter()
                    .map(|idx| cell_key(self.table.columns()[*idx].data(), row))
                    .collect();
                seen.insert(key)
            })
            .collect();
        let removed = self.table.retain_rows(&keep);
        if removed > 0 {
            info!("Removed {removed} duplicate rows");
            self.report
                .record(CleaningAction::RemovedDuplicates { rows: removed });
        }
        Ok(removed)
    }

    /// Fills or drops missing values column by column.
    ///
    /// `columns` defaults to every numeric column. Columns without missing
    /// values are skipped. Values that the strategy cannot resolve (leading
    /// gaps for forward fill, edge gaps for interpolation) stay missing and
    /// show up as the residual count in the report and the summary.
    pub fn handle_missing_values(
        &mut self,
        strategy: ImputationStrategy,
        columns: Option<&[String]>,
    ) -> EngineResult<ImputationSummary> {
        info!("Handling missing values using strategy: {strategy}");
        let columns = match columns {
            Some(names) => {
                for name in names {
                    if self.table.column(name).is_none() {
                        return Err(EngineError::ColumnNotFound(name.clone()));
                    }
                }
                names.to_vec()
            }
            None => self.table.numeric_column_names(),
        };
        let missing_before = self.missing_in(&columns);

        for name in &columns {
            let Some(column) = self.table.column(name) else {
                continue;
            };
            let missing = column.missing_count();
            if missing == 0 {
                continue;
            }
            if !strategy.supports(column.column_type()) {
                warn!(
                    "Skipping {} column '{name}': {strategy} needs numeric values",
                    column.column_type()
                );
                continue;
            }
            if strategy == ImputationStrategy::Drop {
                let keep: Vec<bool> = (0..self.table.row_count())
                    .map(|row| !column.is_missing(row))
                    .collect();
                let rows = self.table.retain_rows(&keep);
                self.report.record(CleaningAction::DroppedMissing {
                    column: name.clone(),
                    rows,
                });
                continue;
            }

            let filled = self.fill_column(name, strategy);
            let residual = missing - filled;
            self.report.record(CleaningAction::Imputed {
                column: name.clone(),
                strategy,
                filled,
                residual,
            });
        }

        let missing_after = self.missing_in(&columns);
        info!("Missing values reduced from {missing_before} to {missing_after}");
        if missing_after > 0 {
            warn!("{missing_after} missing value(s) remain after {strategy}");
        }
        Ok(ImputationSummary {
            missing_before,
            missing_after,
        })
    }

    fn fill_column(&mut self, name: &str, strategy: ImputationStrategy) -> usize {
        let Some(column) = self.table.column_mut(name) else {
            return 0;
        };
        if strategy == ImputationStrategy::ForwardFill {
            return match column.data_mut() {
                ColumnData::Numeric(values) => impute::forward_fill(values),
                ColumnData::Text(values) => impute::forward_fill(values),
                ColumnData::Temporal(values) => impute::forward_fill(values),
            };
        }
        let Some(values) = column.as_numeric_mut() else {
            return 0;
        };
        let stats = ColumnStats::from_optional(values);
        match strategy {
            ImputationStrategy::Mean => stats
                .mean()
                .map_or(0, |mean| impute::fill_constant(values, mean)),
            ImputationStrategy::Median => stats
                .median()
                .map_or(0, |median| impute::fill_constant(values, median)),
            ImputationStrategy::Interpolate => impute::interpolate_linear(values),
            ImputationStrategy::Drop | ImputationStrategy::ForwardFill => 0,
        }
    }

    fn missing_in(&self, columns: &[String]) -> usize {
        columns
            .iter()
            .filter_map(|name| self.table.column(name))
            .map(|column| column.missing_count())
            .sum()
    }

    /// Clamps values outside the method's bounds to the nearer bound.
    ///
    /// Returns the number of values capped across all processed columns.
    /// A negative or non-finite `threshold` is rejected before any column
    /// is touched.
    pub fn handle_outliers(
        &mut self,
        columns: Option<&[String]>,
        method: OutlierMethod,
        threshold: f64,
    ) -> EngineResult<usize> {
        if !is_valid_threshold(threshold) {
            return Err(EngineError::InvalidThreshold(threshold.to_string()));
        }
        let columns = match columns {
            Some(names) => {
                for name in names {
                    self.table.numeric(name)?;
                }
                names.to_vec()
            }
            None => self.table.numeric_column_names(),
        };

        let mut capped = 0;
        for name in &columns {
            let Some(values) = self
                .table
                .column_mut(name)
                .and_then(|column| column.as_numeric_mut())
            else {
                continue;
            };
            let stats = ColumnStats::from_optional(values);
            let Some((lower, upper)) = method.bounds(&stats, threshold) else {
                debug!("Skipping outlier check for '{name}': fewer than two values");
                continue;
            };
            for value in values.iter_mut().flatten() {
                if *value < lower {
                    *value = lower;
                    capped += 1;
                } else if *value > upper {
                    *value = upper;
                    capped += 1;
                }
            }
        }

        if capped > 0 {
            info!("Capped {capped} outlier values");
            self.report.record(CleaningAction::CappedOutliers {
                method,
                values: capped,
            });
        }
        Ok(capped)
    }

    /// Removes rows whose value in any listed column falls outside
    /// `[0, 100]`. Missing values are kept; unknown columns are skipped.
    pub fn filter_valid_percentages(&mut self, columns: &[String]) -> usize {
        let mut total = 0;
        for name in columns {
            let Some(column) = self.table.column(name) else {
                debug!("Percentage column '{name}' not present; skipping");
                continue;
            };
            let Some(values) = column.as_numeric() else {
                warn!("Percentage column '{name}' is not numeric; skipping");
                continue;
            };
            let keep: Vec<bool> = values
                .iter()
                .map(|v| v.is_none_or(|v| (0.0..=100.0).contains(&v)))
                .collect();
            let removed = self.table.retain_rows(&keep);
            if removed > 0 {
                warn!("Removed {removed} rows with invalid percentages in '{name}'");
                self.report.record(CleaningAction::RemovedInvalidPercentages {
                    column: name.clone(),
                    rows: removed,
                });
                total += removed;
            }
        }
        total
    }

    /// Converts columns to the requested types.
    ///
    /// A failed conversion leaves the column unchanged and is logged as a
    /// warning. Returns how many columns were converted.
    pub fn convert_data_types(&mut self, mapping: &[(String, ColumnType)]) -> usize {
        let mut converted = 0;
        for (name, target) in mapping {
            let Some(column) = self.table.column(name) else {
                continue;
            };
            if column.column_type() == *target {
                continue;
            }
            match column.coerce(*target) {
                Ok(replacement) => {
                    if let Some(slot) = self.table.column_mut(name) {
                        *slot = replacement;
                    }
                    info!("Converted '{name}' to {target}");
                    self.report.record(CleaningAction::ConvertedType {
                        column: name.clone(),
                        target: *target,
                    });
                    converted += 1;
                }
                Err(err) => warn!("Could not convert '{name}' to {target}: {err}"),
            }
        }
        converted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Column;

    fn names(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn strategies_parse_from_names() {
        assert_eq!(
            "forward_fill".parse::<ImputationStrategy>().unwrap(),
            ImputationStrategy::ForwardFill
        );
        assert_eq!(
            "Interpolate".parse::<ImputationStrategy>().unwrap(),
            ImputationStrategy::Interpolate
        );
        assert!("bfill".parse::<ImputationStrategy>().is_err());
        assert_eq!("z-score".parse::<OutlierMethod>().unwrap(), OutlierMethod::ZScore);
    }

    #[test]
    fn cleaner_never_mutates_the_input_table() {
        let table = Table::from_columns(vec![Column::numeric(
            "Access %",
            vec![Some(1.0), None, Some(3.0)],
        )])
        .unwrap();
        let mut cleaner = Cleaner::new(&table);
        cleaner.normalize_column_names();
        cleaner
            .handle_missing_values(ImputationStrategy::Mean, None)
            .unwrap();
        assert_eq!(table.column_names(), vec!["Access %"]);
        assert_eq!(table.numeric("Access %").unwrap()[1], None);
        assert_eq!(cleaner.raw(), &table);
        assert_eq!(cleaner.table().numeric("access_").unwrap()[1], Some(2.0));
    }

    #[test]
    fn drop_processes_columns_independently() {
        let table = Table::from_columns(vec![
            Column::numeric("a", vec![None, Some(1.0), None, Some(2.0)]),
            Column::numeric("b", vec![None, None, Some(5.0), Some(6.0)]),
        ])
        .unwrap();
        let mut cleaner = Cleaner::new(&table);
        let summary = cleaner
            .handle_missing_values(ImputationStrategy::Drop, None)
            .unwrap();
        assert_eq!(cleaner.table().row_count(), 1);
        assert_eq!(summary.missing_before, 4);
        assert_eq!(summary.missing_after, 0);
        assert_eq!(
            cleaner.report().actions(),
            &[
                CleaningAction::DroppedMissing {
                    column: "a".to_string(),
                    rows: 2
                },
                CleaningAction::DroppedMissing {
                    column: "b".to_string(),
                    rows: 1
                },
            ]
        );
    }

    #[test]
    fn forward_fill_reports_leading_gap_as_residual() {
        let table = Table::from_columns(vec![Column::numeric(
            "x",
            vec![None, Some(4.0), None],
        )])
        .unwrap();
        let mut cleaner = Cleaner::new(&table);
        let summary = cleaner
            .handle_missing_values(ImputationStrategy::ForwardFill, None)
            .unwrap();
        assert_eq!(summary.missing_after, 1);
        assert!(!summary.is_resolved());
        assert_eq!(cleaner.table().numeric("x").unwrap(), &[None, Some(4.0), Some(4.0)]);
        assert_eq!(cleaner.report().residual_missing(), 1);
    }

    #[test]
    fn text_columns_only_accept_drop_and_forward_fill() {
        let table = Table::from_columns(vec![Column::text(
            "region",
            vec![Some("north"), None],
        )])
        .unwrap();
        let mut cleaner = Cleaner::new(&table);
        let columns = names(&["region"]);
        cleaner
            .handle_missing_values(ImputationStrategy::Mean, Some(&columns))
            .unwrap();
        assert!(cleaner.report().is_empty());
        cleaner
            .handle_missing_values(ImputationStrategy::ForwardFill, Some(&columns))
            .unwrap();
        assert_eq!(cleaner.table().column("region").unwrap().missing_count(), 0);
    }

    #[test]
    fn unknown_columns_are_caller_errors() {
        let table = Table::from_columns(vec![Column::from_f64s("x", [1.0])]).unwrap();
        let mut cleaner = Cleaner::new(&table);
        let missing = names(&["y"]);
        assert_eq!(
            cleaner.remove_duplicates(Some(&missing)),
            Err(EngineError::ColumnNotFound("y".to_string()))
        );
        assert_eq!(
            cleaner.handle_missing_values(ImputationStrategy::Mean, Some(&missing)),
            Err(EngineError::ColumnNotFound("y".to_string()))
        );
        assert_eq!(
            cleaner.handle_outliers(Some(&missing), OutlierMethod::Iqr, 1.5),
            Err(EngineError::ColumnNotFound("y".to_string()))
        );
    }

    #[test]
    fn outliers_skip_columns_with_fewer_than_two_values() {
        let table = Table::from_columns(vec![Column::numeric("x", vec![Some(7.0), None])])
            .unwrap();
        let mut cleaner = Cleaner::new(&table);
        assert_eq!(
            cleaner
                .handle_outliers(None, OutlierMethod::Iqr, DEFAULT_OUTLIER_THRESHOLD)
                .unwrap(),
            0
        );
        assert!(cleaner.report().is_empty());
    }

    #[test]
    fn zscore_caps_to_mean_plus_threshold_std() {
        let table =
            Table::from_columns(vec![Column::from_f64s("x", [0.0, 0.0, 0.0, 0.0, 10.0])])
                .unwrap();
        let mut cleaner = Cleaner::new(&table);
        let capped = cleaner
            .handle_outliers(None, OutlierMethod::ZScore, 1.0)
            .unwrap();
        assert_eq!(capped, 1);
        let upper = 2.0 + 20.0_f64.sqrt();
        let values = cleaner.table().numeric("x").unwrap();
        assert!((values[4].unwrap() - upper).abs() < 1e-9);
    }

    #[test]
    fn invalid_outlier_thresholds_are_rejected() {
        let table = Table::from_columns(vec![Column::from_f64s(
            "x",
            [10.0, 12.0, 11.0, 13.0, 100.0],
        )])
        .unwrap();
        let mut cleaner = Cleaner::new(&table);
        for threshold in [-1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                cleaner.handle_outliers(None, OutlierMethod::Iqr, threshold),
                Err(EngineError::InvalidThreshold(_))
            ));
        }
        assert_eq!(cleaner.table(), &table);
        assert!(cleaner.report().is_empty());
        let stats = ColumnStats::from_optional(table.numeric("x").unwrap());
        assert_eq!(OutlierMethod::ZScore.bounds(&stats, -1.0), None);
    }

    #[test]
    fn colliding_names_get_numeric_suffixes() {
        let table = Table::from_columns(vec![
            Column::numeric("A B", vec![Some(1.0), Some(2.0), Some(3.0)]),
            Column::numeric("a_b", vec![Some(1.0), None, Some(3.0)]),
            Column::numeric(" A_B ", vec![None, Some(5.0), Some(6.0)]),
        ])
        .unwrap();
        let mut cleaner = Cleaner::new(&table);
        assert_eq!(cleaner.normalize_column_names(), 3);
        assert_eq!(cleaner.table().column_names(), vec!["a_b", "a_b_2", "a_b_3"]);

        let summary = cleaner
            .handle_missing_values(ImputationStrategy::Interpolate, None)
            .unwrap();
        assert_eq!(summary.missing_before, 2);
        assert_eq!(summary.missing_after, 1);
        assert_eq!(
            cleaner.table().numeric("a_b_2").unwrap(),
            &[Some(1.0), Some(2.0), Some(3.0)]
        );
        assert_eq!(cleaner.table().numeric("a_b_3").unwrap()[0], None);
    }

    #[test]
    fn percentage_filter_keeps_missing_and_skips_unknown_columns() {
        let table = Table::from_columns(vec![Column::numeric(
            "share",
            vec![Some(-1.0), None, Some(50.0), Some(100.5)],
        )])
        .unwrap();
        let mut cleaner = Cleaner::new(&table);
        let removed = cleaner.filter_valid_percentages(&names(&["share", "absent"]));
        assert_eq!(removed, 2);
        assert_eq!(cleaner.table().numeric("share").unwrap(), &[None, Some(50.0)]);
    }

    #[test]
    fn failed_conversion_leaves_column_unchanged() {
        let table = Table::from_columns(vec![
            Column::text("year", vec![Some("2020"), Some("2021")]),
            Column::text("label", vec![Some("x"), Some("y")]),
        ])
        .unwrap();
        let mut cleaner = Cleaner::new(&table);
        let converted = cleaner.convert_data_types(&[
            ("year".to_string(), ColumnType::Numeric),
            ("label".to_string(), ColumnType::Numeric),
            ("missing".to_string(), ColumnType::Numeric),
        ]);
        assert_eq!(converted, 1);
        assert!(cleaner.table().column("year").unwrap().is_numeric());
        assert_eq!(
            cleaner.table().column("label").unwrap().column_type(),
            ColumnType::Text
        );
    }
}
