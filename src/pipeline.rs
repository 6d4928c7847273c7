//! Orchestration behind the CLI commands: load, clean, analyze, write.
//!
//! [`clean_table`] and [`analyze_table`] are the library entry points; the
//! `execute_*` functions add file handling and terminal output around them.

use std::{io::Write, path::Path};

use anyhow::{Context, Result, anyhow};
use log::{info, warn};

use crate::{
    analysis::Analyzer,
    clean::{Cleaner, ImputationStrategy, OutlierMethod},
    cli::{AnalyzeArgs, CleanArgs, CleaningArgs, InputArgs, TopArgs},
    columns::{normalize_column_name, resolve_first},
    config::Settings,
    data::ColumnType,
    error::EngineResult,
    frame::Table,
    io_utils, loader, render,
    report::CleaningReport,
    results::{AnalysisResults, ResultKey},
};

/// Which cleaning steps run, and with what parameters.
///
/// Column names here are matched after name normalization, so they may be
/// given in their original spelling.
#[derive(Debug, Clone, PartialEq)]
pub struct CleaningPlan {
    pub strategy: ImputationStrategy,
    pub cap_outliers: bool,
    pub outlier_method: OutlierMethod,
    pub outlier_threshold: f64,
    pub percent_columns: Vec<String>,
    pub dedupe_columns: Option<Vec<String>>,
    pub conversions: Vec<(String, ColumnType)>,
}

impl Default for CleaningPlan {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

impl CleaningPlan {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            strategy: settings.imputation_strategy,
            cap_outliers: false,
            outlier_method: settings.outlier_method,
            outlier_threshold: settings.outlier_threshold,
            percent_columns: Vec::new(),
            dedupe_columns: None,
            conversions: Vec::new(),
        }
    }

    fn from_args(settings: &Settings, args: &CleaningArgs) -> Self {
        Self {
            strategy: args.strategy.unwrap_or(settings.imputation_strategy),
            cap_outliers: args.cap_outliers,
            outlier_method: args.outlier_method.unwrap_or(settings.outlier_method),
            outlier_threshold: args.outlier_threshold.unwrap_or(settings.outlier_threshold),
            percent_columns: args.percent_columns.clone(),
            dedupe_columns: (!args.dedupe_columns.is_empty()).then(|| args.dedupe_columns.clone()),
            conversions: args.conversions.clone(),
        }
    }
}

/// Runs normalize → convert → dedupe → impute → cap → validate on a copy of
/// `table` and returns the cleaned table with its report.
pub fn clean_table(table: &Table, plan: &CleaningPlan) -> EngineResult<(Table, CleaningReport)> {
    let mut cleaner = Cleaner::new(table);
    cleaner.normalize_column_names();

    if !plan.conversions.is_empty() {
        let conversions: Vec<(String, ColumnType)> = plan
            .conversions
            .iter()
            .map(|(name, ty)| (normalize_column_name(name), *ty))
            .collect();
        cleaner.convert_data_types(&conversions);
    }

    let subset = plan.dedupe_columns.as_deref().map(normalize_all);
    cleaner.remove_duplicates(subset.as_deref())?;

    let imputation = cleaner.handle_missing_values(plan.strategy, None)?;
    if !imputation.is_resolved() {
        warn!(
            "{} of {} missing value(s) could not be filled",
            imputation.missing_after, imputation.missing_before
        );
    }

    if plan.cap_outliers {
        cleaner.handle_outliers(None, plan.outlier_method, plan.outlier_threshold)?;
    }
    if !plan.percent_columns.is_empty() {
        cleaner.filter_valid_percentages(&normalize_all(&plan.percent_columns));
    }

    for line in cleaner.report().lines() {
        info!("Cleaning: {line}");
    }
    Ok(cleaner.into_parts())
}

/// Runs every analysis query the settings describe and collects the ones
/// that produced a result. The summary and the inequality index are always
/// present.
pub fn analyze_table(
    table: &Table,
    settings: &Settings,
    indicators: Option<&[String]>,
) -> EngineResult<AnalysisResults> {
    let analyzer = Analyzer::new(table);
    let mut results = AnalysisResults::new();
    results.insert_summary(analyzer.summary_statistics());

    if let Some(underserved) =
        analyzer.underserved_regions(&settings.access_column, settings.low_access_threshold)
    {
        results.insert_underserved_regions(underserved);
    }
    if let Some(gap) = analyzer.rural_urban_gap(
        &settings.rural_column,
        &settings.urban_column,
        settings.rural_urban_gap_threshold,
    ) {
        results.insert_rural_urban_gap(gap.table);
    }

    let index = analyzer.inequality_index(indicators)?;
    if index.normalized_columns.is_empty() {
        warn!("No indicator had any spread; every inequality score is undefined");
    }
    results.insert_inequality_index(index.table);

    let disparities = analyzer.regional_disparities(&settings.region_column, indicators);
    if !disparities.is_empty() {
        results.insert_regional_disparities(disparities);
    }
    Ok(results)
}

pub fn execute_clean(args: &CleanArgs) -> Result<()> {
    let settings = Settings::load_or_default(args.cleaning.config.as_deref())?;
    let delimiter = io_utils::resolve_delimiter(&args.input.input, args.input.delimiter);
    let table = load_input(&args.input, delimiter)?;
    let plan = CleaningPlan::from_args(&settings, &args.cleaning);
    let (cleaned, report) = clean_table(&table, &plan)
        .with_context(|| format!("Cleaning {:?}", args.input.input))?;

    let output_delimiter = args.output_delimiter.unwrap_or(delimiter);
    loader::write_table(&cleaned, args.output.as_deref(), output_delimiter)?;
    info!(
        "Cleaned {} row(s) into {} row(s) with {} report entr{}",
        table.row_count(),
        cleaned.row_count(),
        report.len(),
        if report.len() == 1 { "y" } else { "ies" }
    );
    Ok(())
}

pub fn execute_analyze(args: &AnalyzeArgs) -> Result<()> {
    let mut settings = Settings::load_or_default(args.cleaning.config.as_deref())?;
    apply_overrides(&mut settings, args);
    settings.validate()?;

    let delimiter = io_utils::resolve_delimiter(&args.input.input, args.input.delimiter);
    let loaded = load_input(&args.input, delimiter)?;
    let table = if args.skip_cleaning {
        loaded
    } else {
        let plan = CleaningPlan::from_args(&settings, &args.cleaning);
        clean_table(&loaded, &plan)
            .with_context(|| format!("Cleaning {:?}", args.input.input))?
            .0
    };

    let indicators = resolve_indicators(&table, &args.indicators);
    let results = analyze_table(&table, &settings, indicators.as_deref())
        .with_context(|| format!("Analyzing {:?}", args.input.input))?;

    let json_to_stdout = args.json.as_deref().is_some_and(io_utils::is_dash);
    if !json_to_stdout {
        print_results(&results, &settings, args.rows);
    }
    if let Some(path) = &args.json {
        write_json(&results, path)?;
        if !json_to_stdout {
            info!("Analysis results written to {path:?}");
        }
    }
    info!("Analysis produced {} result(s)", results.len());
    Ok(())
}

pub fn execute_top(args: &TopArgs) -> Result<()> {
    let settings = Settings::load_or_default(args.cleaning.config.as_deref())?;
    let delimiter = io_utils::resolve_delimiter(&args.input.input, args.input.delimiter);
    let loaded = load_input(&args.input, delimiter)?;
    let plan = CleaningPlan::from_args(&settings, &args.cleaning);
    let (table, _) = clean_table(&loaded, &plan)
        .with_context(|| format!("Cleaning {:?}", args.input.input))?;

    let picked = Analyzer::new(&table)
        .top_bottom(&args.column, args.count)
        .ok_or_else(|| anyhow!("No numeric column matches '{}'", args.column))?;
    println!("Top {} by {}", picked.top.row_count(), picked.column);
    print!("{}", render::render_table(&picked.top, None));
    println!();
    println!("Bottom {} by {}", picked.bottom.row_count(), picked.column);
    print!("{}", render::render_table(&picked.bottom, None));
    Ok(())
}

fn load_input(input: &InputArgs, delimiter: u8) -> Result<Table> {
    let encoding = io_utils::resolve_encoding(input.input_encoding.as_deref())?;
    loader::load_table(&input.input, delimiter, encoding)
        .with_context(|| format!("Loading {:?}", input.input))
}

fn apply_overrides(settings: &mut Settings, args: &AnalyzeArgs) {
    if let Some(strategy) = args.cleaning.strategy {
        settings.imputation_strategy = strategy;
    }
    if let Some(method) = args.cleaning.outlier_method {
        settings.outlier_method = method;
    }
    if let Some(threshold) = args.cleaning.outlier_threshold {
        settings.outlier_threshold = threshold;
    }
    if let Some(threshold) = args.low_access_threshold {
        settings.low_access_threshold = threshold;
    }
    if let Some(threshold) = args.gap_threshold {
        settings.rural_urban_gap_threshold = threshold;
    }
    if let Some(column) = &args.access_column {
        settings.access_column = column.clone();
    }
    if let Some(column) = &args.rural_column {
        settings.rural_column = column.clone();
    }
    if let Some(column) = &args.urban_column {
        settings.urban_column = column.clone();
    }
    if let Some(column) = &args.region_column {
        settings.region_column = column.clone();
    }
}

fn resolve_indicators(table: &Table, requested: &[String]) -> Option<Vec<String>> {
    if requested.is_empty() {
        return None;
    }
    Some(
        requested
            .iter()
            .filter_map(|name| resolve_first(table, name))
            .collect(),
    )
}

fn normalize_all(names: &[String]) -> Vec<String> {
    names.iter().map(|name| normalize_column_name(name)).collect()
}

fn print_results(results: &AnalysisResults, settings: &Settings, limit: usize) {
    if let Some(summary) = results.summary() {
        println!("Summary statistics");
        print!("{}", render::render_summary(summary));
    }
    let sections = [
        (
            ResultKey::UnderservedRegions,
            format!(
                "Underserved regions (access below {}%)",
                settings.low_access_threshold
            ),
        ),
        (
            ResultKey::RuralUrbanGap,
            format!(
                "Rural-urban gap (significant above {})",
                settings.rural_urban_gap_threshold
            ),
        ),
        (ResultKey::InequalityIndex, "Inequality index".to_string()),
    ];
    for (key, title) in sections {
        println!();
        println!("{title}");
        match results.table(key) {
            Some(table) => print!("{}", render::render_table(table, Some(limit))),
            None => println!("(not available)"),
        }
    }
    if let Some(disparities) = results.disparities() {
        println!();
        println!("Regional disparities");
        print!("{}", render::render_disparities(disparities));
    }
}

fn write_json(results: &AnalysisResults, path: &Path) -> Result<()> {
    let mut writer = io_utils::open_writer(Some(path))?;
    serde_json::to_writer_pretty(&mut writer, results)
        .with_context(|| format!("Writing analysis results to {path:?}"))?;
    writeln!(writer)?;
    writer.flush().context("Flushing JSON output")?;
    Ok(())
}
