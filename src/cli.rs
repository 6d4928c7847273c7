use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::{
    clean::{ImputationStrategy, OutlierMethod},
    data::ColumnType,
};

#[derive(Debug, Parser)]
#[command(author, version, about = "Clean and analyze regional ICT indicator tables", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Normalize, deduplicate and impute a CSV file, writing the cleaned table
    Clean(CleanArgs),
    /// Clean a CSV file and compute inequality statistics
    Analyze(AnalyzeArgs),
    /// Show the regions with the highest and lowest values of an indicator
    Top(TopArgs),
}

#[derive(Debug, Clone, Args)]
pub struct InputArgs {
    /// Input CSV file ('-' for stdin)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Clone, Default, Args)]
pub struct CleaningArgs {
    /// YAML settings file with thresholds and defaults
    #[arg(long = "config")]
    pub config: Option<PathBuf>,
    /// Missing value strategy: drop, mean, median, interpolate, forward_fill
    #[arg(long, value_parser = parse_strategy)]
    pub strategy: Option<ImputationStrategy>,
    /// Clamp outliers in numeric columns
    #[arg(long = "cap-outliers")]
    pub cap_outliers: bool,
    /// Outlier bounds method: iqr or zscore
    #[arg(long = "outlier-method", value_parser = parse_outlier_method)]
    pub outlier_method: Option<OutlierMethod>,
    /// IQR multiplier (or z-score limit) for outlier bounds
    #[arg(long = "outlier-threshold")]
    pub outlier_threshold: Option<f64>,
    /// Columns whose values must lie within 0-100; other rows are removed
    #[arg(long = "percent-columns", value_delimiter = ',')]
    pub percent_columns: Vec<String>,
    /// Columns that define a duplicate row (defaults to all columns)
    #[arg(long = "dedupe-columns", value_delimiter = ',')]
    pub dedupe_columns: Vec<String>,
    /// Type conversions of the form `column:type` (numeric, text, temporal)
    #[arg(long = "convert", value_parser = parse_conversion, action = clap::ArgAction::Append)]
    pub conversions: Vec<(String, ColumnType)>,
}

#[derive(Debug, Args)]
pub struct CleanArgs {
    #[command(flatten)]
    pub input: InputArgs,
    #[command(flatten)]
    pub cleaning: CleaningArgs,
    /// Output CSV file (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Delimiter to use for output (defaults to input delimiter)
    #[arg(long = "output-delimiter", value_parser = parse_delimiter)]
    pub output_delimiter: Option<u8>,
}

#[derive(Debug, Args)]
pub struct AnalyzeArgs {
    #[command(flatten)]
    pub input: InputArgs,
    #[command(flatten)]
    pub cleaning: CleaningArgs,
    /// Analyze the table as loaded, without the cleaning steps
    #[arg(long = "skip-cleaning")]
    pub skip_cleaning: bool,
    /// Write all results as JSON to this path ('-' for stdout)
    #[arg(long = "json")]
    pub json: Option<PathBuf>,
    /// Access percentage below which a region is underserved
    #[arg(long = "low-access-threshold")]
    pub low_access_threshold: Option<f64>,
    /// Rural-urban gap above which the divide is significant
    #[arg(long = "gap-threshold")]
    pub gap_threshold: Option<f64>,
    /// Indicator name used for underserved detection
    #[arg(long = "access-column")]
    pub access_column: Option<String>,
    /// Indicator names for rural and urban access
    #[arg(long = "rural-column")]
    pub rural_column: Option<String>,
    #[arg(long = "urban-column")]
    pub urban_column: Option<String>,
    /// Column that must identify regions for the disparity breakdown
    #[arg(long = "region-column")]
    pub region_column: Option<String>,
    /// Indicators for the inequality index and disparities (defaults to all numeric)
    #[arg(short = 'C', long = "indicators", value_delimiter = ',')]
    pub indicators: Vec<String>,
    /// Maximum rows printed per result table
    #[arg(long, default_value_t = 10)]
    pub rows: usize,
}

#[derive(Debug, Args)]
pub struct TopArgs {
    #[command(flatten)]
    pub input: InputArgs,
    #[command(flatten)]
    pub cleaning: CleaningArgs,
    /// Indicator to rank by (case-insensitive substring of a column name)
    #[arg(short = 'C', long = "column")]
    pub column: String,
    /// Number of regions to show at each end
    #[arg(short = 'n', long = "count", default_value_t = 10)]
    pub count: usize,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}

pub fn parse_strategy(value: &str) -> Result<ImputationStrategy, String> {
    value.parse().map_err(|err: crate::error::EngineError| err.to_string())
}

pub fn parse_outlier_method(value: &str) -> Result<OutlierMethod, String> {
    value.parse().map_err(|err: crate::error::EngineError| err.to_string())
}

pub fn parse_conversion(value: &str) -> Result<(String, ColumnType), String> {
    let (column, ty) = value
        .rsplit_once(':')
        .ok_or_else(|| format!("Conversion '{value}' must look like column:type"))?;
    let column = column.trim();
    if column.is_empty() {
        return Err(format!("Conversion '{value}' is missing a column name"));
    }
    let ty = ty.parse::<ColumnType>().map_err(|err| err.to_string())?;
    Ok((column.to_string(), ty))
}
