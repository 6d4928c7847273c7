//! Append-only audit trail of cleaning actions.

use std::fmt;

use serde::Serialize;

use crate::{
    clean::{ImputationStrategy, OutlierMethod},
    data::ColumnType,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum CleaningAction {
    NormalizedNames {
        renamed: usize,
    },
    RemovedDuplicates {
        rows: usize,
    },
    Imputed {
        column: String,
        strategy: ImputationStrategy,
        filled: usize,
        residual: usize,
    },
    DroppedMissing {
        column: String,
        rows: usize,
    },
    CappedOutliers {
        method: OutlierMethod,
        values: usize,
    },
    RemovedInvalidPercentages {
        column: String,
        rows: usize,
    },
    ConvertedType {
        column: String,
        target: ColumnType,
    },
}

impl fmt::Display for CleaningAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CleaningAction::NormalizedNames { renamed } => {
                write!(f, "Normalized column names ({renamed} renamed)")
            }
            CleaningAction::RemovedDuplicates { rows } => {
                write!(f, "Removed {rows} duplicate rows")
            }
            CleaningAction::Imputed {
                column,
                strategy,
                filled,
                residual,
            } => {
                write!(
                    f,
                    "Filled {filled} missing values in '{column}' using {strategy}"
                )?;
                if *residual > 0 {
                    write!(f, " ({residual} still missing)")?;
                }
                Ok(())
            }
            CleaningAction::DroppedMissing { column, rows } => {
                write!(f, "Dropped {rows} rows with missing '{column}'")
            }
            CleaningAction::CappedOutliers { method, values } => {
                write!(f, "Capped {values} outliers using {method} method")
            }
            CleaningAction::RemovedInvalidPercentages { column, rows } => {
                write!(f, "Removed {rows} invalid percentage values in '{column}'")
            }
            CleaningAction::ConvertedType { column, target } => {
                write!(f, "Converted '{column}' to {target}")
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct CleaningReport {
    actions: Vec<CleaningAction>,
}

impl CleaningReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, action: CleaningAction) {
        self.actions.push(action);
    }

    pub fn actions(&self) -> &[CleaningAction] {
        &self.actions
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Human-readable lines in the order the actions happened.
    pub fn lines(&self) -> Vec<String> {
        self.actions.iter().map(ToString::to_string).collect()
    }

    /// Values still missing after imputation, summed over the entries.
    pub fn residual_missing(&self) -> usize {
        self.actions
            .iter()
            .map(|action| match action {
                CleaningAction::Imputed { residual, .. } => *residual,
                _ => 0,
            })
            .sum()
    }
}
