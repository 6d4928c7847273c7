//! Read-only inequality queries over a cleaned table.
//!
//! Every query resolves the columns it needs on its own (see
//! [`resolve_first`]) and returns its own value; nothing is accumulated
//! here. Callers assemble an [`AnalysisResults`](crate::results::AnalysisResults)
//! from the values they want to keep.
//!
//! A column that cannot be resolved is not an error: the query logs a
//! warning and returns `None` (or an empty mapping).

use std::collections::BTreeMap;

use itertools::Itertools;
use log::{info, warn};
use serde::Serialize;

use crate::{
    columns::resolve_first,
    error::EngineResult,
    frame::{Column, Table},
    stats::{ColumnStats, DescriptiveStats, DisparityStats},
};

pub const GAP_COLUMN: &str = "rural_urban_gap";
pub const SCORE_COLUMN: &str = "digital_access_score";
pub const INDEX_COLUMN: &str = "inequality_index";

#[derive(Debug, Clone, PartialEq)]
pub struct RuralUrbanGap {
    pub table: Table,
    pub rural_column: String,
    pub urban_column: String,
    pub threshold: f64,
}

impl RuralUrbanGap {
    /// Rows whose gap exceeds the significance threshold, still sorted by
    /// descending gap.
    pub fn significant(&self) -> Table {
        let Ok(gaps) = self.table.numeric(GAP_COLUMN) else {
            return Table::new();
        };
        let rows = gaps
            .iter()
            .positions(|gap| gap.is_some_and(|g| g > self.threshold))
            .collect_vec();
        self.table.take_rows(&rows)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InequalityIndex {
    /// Input rows with score and index columns appended.
    pub table: Table,
    pub normalized_columns: Vec<String>,
    /// Requested columns left out because they had no spread (or no values).
    pub excluded_columns: Vec<String>,
    /// Rows without a single normalizable value; their scores are missing.
    pub unscored_rows: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TopBottom {
    pub column: String,
    pub top: Table,
    pub bottom: Table,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub total_regions: usize,
    pub indicators: BTreeMap<String, DescriptiveStats>,
}

pub struct Analyzer<'a> {
    table: &'a Table,
}

impl<'a> Analyzer<'a> {
    pub fn new(table: &'a Table) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &Table {
        self.table
    }

    /// Rows whose access value is strictly below `threshold`, ascending.
    pub fn underserved_regions(&self, access_column: &str, threshold: f64) -> Option<Table> {
        info!("Identifying regions with access below {threshold}%");
        let column = resolve_first(self.table, access_column)?;
        let values = self.numeric_or_warn(&column)?;
        let rows = values
            .iter()
            .positions(|v| v.is_some_and(|v| v < threshold))
            .collect_vec();
        let underserved = self
            .table
            .take_rows(&rows)
            .sort_by_numeric(&column, false)
            .ok()?;
        info!("Found {} underserved regions", underserved.row_count());
        Some(underserved)
    }

    /// Appends `urban - rural` as the gap column and sorts by it, largest
    /// gap first.
    pub fn rural_urban_gap(
        &self,
        rural_column: &str,
        urban_column: &str,
        threshold: f64,
    ) -> Option<RuralUrbanGap> {
        let (Some(rural), Some(urban)) = (
            resolve_first(self.table, rural_column),
            resolve_first(self.table, urban_column),
        ) else {
            warn!("Rural/Urban columns not found");
            return None;
        };
        let rural_values = self.numeric_or_warn(&rural)?;
        let urban_values = self.numeric_or_warn(&urban)?;
        let gaps = rural_values
            .iter()
            .zip(urban_values)
            .map(|(r, u)| Some((*u)? - (*r)?))
            .collect_vec();

        let mut table = self.table.clone();
        table.add_column(Column::numeric(GAP_COLUMN, gaps)).ok()?;
        let table = table.sort_by_numeric(GAP_COLUMN, true).ok()?;
        let gap = RuralUrbanGap {
            table,
            rural_column: rural,
            urban_column: urban,
            threshold,
        };
        info!(
            "Calculated rural-urban gap for {} regions ({} above {threshold})",
            gap.table.row_count(),
            gap.significant().row_count()
        );
        Some(gap)
    }

    /// Composite index from min-max normalized indicators.
    ///
    /// `columns` defaults to every numeric column; unknown and non-numeric
    /// names are skipped. Columns without spread are excluded rather than
    /// divided by zero.
    pub fn inequality_index(
        &self,
        columns: Option<&[String]>,
    ) -> EngineResult<InequalityIndex> {
        let requested = match columns {
            Some(names) => names.to_vec(),
            None => self.table.numeric_column_names(),
        };

        let mut normalized: Vec<Vec<Option<f64>>> = Vec::new();
        let mut normalized_columns = Vec::new();
        let mut excluded_columns = Vec::new();
        for name in requested {
            let Ok(values) = self.table.numeric(&name) else {
                warn!("Skipping '{name}' in inequality index: not a numeric column");
                continue;
            };
            let stats = ColumnStats::from_optional(values);
            match (stats.min(), stats.max()) {
                (Some(min), Some(max)) if max > min => {
                    let span = max - min;
                    normalized.push(values.iter().map(|v| v.map(|v| (v - min) / span)).collect());
                    normalized_columns.push(name);
                }
                _ => excluded_columns.push(name),
            }
        }

        let mut scores = Vec::with_capacity(self.table.row_count());
        let mut unscored_rows = Vec::new();
        for row in 0..self.table.row_count() {
            let present = normalized.iter().filter_map(|col| col[row]).collect_vec();
            if present.is_empty() {
                unscored_rows.push(row);
                scores.push(None);
            } else {
                let mean = present.iter().sum::<f64>() / present.len() as f64;
                scores.push(Some((mean * 100.0).clamp(0.0, 100.0)));
            }
        }
        let index = scores.iter().map(|s| s.map(|s| 100.0 - s)).collect_vec();

        let mut table = self.table.clone();
        table.add_column(Column::numeric(SCORE_COLUMN, scores))?;
        table.add_column(Column::numeric(INDEX_COLUMN, index))?;

        if !excluded_columns.is_empty() {
            info!(
                "Excluded zero-variance column(s) from inequality index: {}",
                excluded_columns.join(", ")
            );
        }
        if !unscored_rows.is_empty() {
            warn!(
                "{} row(s) have no normalizable indicator; their scores are undefined",
                unscored_rows.len()
            );
        }
        info!("Computed composite inequality index");
        Ok(InequalityIndex {
            table,
            normalized_columns,
            excluded_columns,
            unscored_rows,
        })
    }

    /// Whole-table distribution of each indicator.
    ///
    /// The region column has to exist even though the statistics are not
    /// grouped by it; without it the result is empty.
    pub fn regional_disparities(
        &self,
        region_column: &str,
        indicators: Option<&[String]>,
    ) -> BTreeMap<String, DisparityStats> {
        let mut disparities = BTreeMap::new();
        if resolve_first(self.table, region_column).is_none() {
            warn!("Region column '{region_column}' not found");
            return disparities;
        }
        let indicators = match indicators {
            Some(names) => names.to_vec(),
            None => self.table.numeric_column_names(),
        };
        for name in &indicators {
            if let Ok(values) = self.table.numeric(name) {
                disparities.insert(name.clone(), ColumnStats::from_optional(values).disparity());
            }
        }
        info!(
            "Analyzed regional disparities for {} indicators",
            indicators.len()
        );
        disparities
    }

    /// The `n` largest and `n` smallest rows by `column`; ties keep row order.
    pub fn top_bottom(&self, column: &str, n: usize) -> Option<TopBottom> {
        let resolved = resolve_first(self.table, column)?;
        let values = self.numeric_or_warn(&resolved)?;
        let present = values.iter().positions(Option::is_some).collect_vec();
        let present_table = self.table.take_rows(&present);
        let top = present_table.sort_by_numeric(&resolved, true).ok()?;
        let bottom = present_table.sort_by_numeric(&resolved, false).ok()?;
        let head = |table: &Table| table.take_rows(&(0..n.min(table.row_count())).collect_vec());
        Some(TopBottom {
            top: head(&top),
            bottom: head(&bottom),
            column: resolved,
        })
    }

    pub fn summary_statistics(&self) -> Summary {
        let indicators = self
            .table
            .columns()
            .iter()
            .filter_map(|column| {
                let values = column.as_numeric()?;
                Some((
                    column.name().to_string(),
                    ColumnStats::from_optional(values).describe(),
                ))
            })
            .collect();
        info!("Calculated summary statistics");
        Summary {
            total_regions: self.table.row_count(),
            indicators,
        }
    }

    fn numeric_or_warn(&self, name: &str) -> Option<&'a [Option<f64>]> {
        match self.table.numeric(name) {
            Ok(values) => Some(values),
            Err(err) => {
                warn!("{err}");
                None
            }
        }
    }
}
