mod common;

use common::{fixture_path, indicator_table, text_values};
use digital_divide::{
    clean::{Cleaner, ImputationStrategy, OutlierMethod},
    data::ColumnType,
    error::EngineError,
    frame::{Column, Table},
    loader,
    pipeline::{CleaningPlan, clean_table},
    report::CleaningAction,
};
use encoding_rs::UTF_8;

fn approx(actual: Option<f64>, expected: f64) {
    let actual = actual.expect("value present");
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected}, got {actual}"
    );
}

#[test]
fn interpolation_fills_interior_gap() {
    let table = indicator_table("access", &[Some(10.0), None, Some(30.0)]);
    let mut cleaner = Cleaner::new(&table);
    let summary = cleaner
        .handle_missing_values(ImputationStrategy::Interpolate, None)
        .unwrap();
    assert_eq!(summary.missing_before, 1);
    assert!(summary.is_resolved());
    assert_eq!(
        cleaner.table().numeric("access").unwrap(),
        &[Some(10.0), Some(20.0), Some(30.0)]
    );
    // the caller's table is untouched
    assert_eq!(table.numeric("access").unwrap()[1], None);
    assert_eq!(cleaner.raw(), &table);
}

#[test]
fn iqr_capping_clamps_only_the_outlier() {
    let table = indicator_table(
        "access",
        &[Some(10.0), Some(12.0), Some(11.0), Some(13.0), Some(100.0)],
    );
    let mut cleaner = Cleaner::new(&table);
    let capped = cleaner
        .handle_outliers(None, OutlierMethod::Iqr, 1.5)
        .unwrap();
    assert_eq!(capped, 1);
    assert_eq!(
        cleaner.table().numeric("access").unwrap(),
        &[Some(10.0), Some(12.0), Some(11.0), Some(13.0), Some(16.0)]
    );
    assert_eq!(
        cleaner.report().actions(),
        &[CleaningAction::CappedOutliers {
            method: OutlierMethod::Iqr,
            values: 1
        }]
    );
}

#[test]
fn duplicate_pair_is_removed_and_order_kept() {
    let table = Table::from_columns(vec![
        Column::text(
            "region",
            vec![Some("a"), Some("b"), Some("c"), Some("b"), Some("d")],
        ),
        Column::numeric(
            "access",
            vec![Some(1.0), Some(2.0), Some(3.0), Some(2.0), Some(4.0)],
        ),
    ])
    .unwrap();
    let mut cleaner = Cleaner::new(&table);
    assert_eq!(cleaner.remove_duplicates(None).unwrap(), 1);
    assert_eq!(cleaner.table().row_count(), 4);
    assert_eq!(text_values(cleaner.table(), "region"), vec!["a", "b", "c", "d"]);
}

#[test]
fn dedupe_subset_must_name_existing_columns() {
    let table = indicator_table("access", &[Some(1.0)]);
    let mut cleaner = Cleaner::new(&table);
    let err = cleaner
        .remove_duplicates(Some(["country".to_string()].as_slice()))
        .unwrap_err();
    assert_eq!(err, EngineError::ColumnNotFound("country".to_string()));
}

#[test]
fn drop_strategy_removes_rows_with_missing_values() {
    let table = indicator_table("access", &[Some(1.0), None, Some(3.0)]);
    let mut cleaner = Cleaner::new(&table);
    cleaner
        .handle_missing_values(ImputationStrategy::Drop, None)
        .unwrap();
    assert_eq!(text_values(cleaner.table(), "region"), vec!["region-0", "region-2"]);
}

#[test]
fn mean_and_median_fill_with_column_statistics() {
    let values = [Some(1.0), None, Some(2.0), Some(9.0)];
    let table = indicator_table("access", &values);

    let mut mean = Cleaner::new(&table);
    mean.handle_missing_values(ImputationStrategy::Mean, None)
        .unwrap();
    assert_eq!(mean.table().numeric("access").unwrap()[1], Some(4.0));

    let mut median = Cleaner::new(&table);
    median
        .handle_missing_values(ImputationStrategy::Median, None)
        .unwrap();
    assert_eq!(median.table().numeric("access").unwrap()[1], Some(2.0));
}

#[test]
fn cleaning_steps_are_total_on_empty_tables() {
    let table = indicator_table("access", &[]);
    let mut cleaner = Cleaner::new(&table);
    assert_eq!(cleaner.remove_duplicates(None).unwrap(), 0);
    assert!(
        cleaner
            .handle_missing_values(ImputationStrategy::Interpolate, None)
            .unwrap()
            .is_resolved()
    );
    assert_eq!(
        cleaner
            .handle_outliers(None, OutlierMethod::ZScore, 3.0)
            .unwrap(),
        0
    );
    assert!(cleaner.report().is_empty());
}

#[test]
fn fixture_cleans_end_to_end() {
    let table = loader::load_table(&fixture_path("regional_ict.csv"), b',', UTF_8).unwrap();
    assert_eq!(table.row_count(), 9);
    assert_eq!(
        table.column("Region").unwrap().column_type(),
        ColumnType::Text
    );

    let (cleaned, report) = clean_table(&table, &CleaningPlan::default()).unwrap();
    assert_eq!(
        cleaned.column_names(),
        vec![
            "region",
            "year",
            "internet_access_percentage",
            "rural_internet_access",
            "urban_internet_access",
            "mobile_subscriptions_per_100",
        ]
    );
    assert_eq!(cleaned.row_count(), 8);

    let rural = cleaned.numeric("rural_internet_access").unwrap();
    approx(rural[6], 47.1);
    let urban = cleaned.numeric("urban_internet_access").unwrap();
    approx(urban[6], 73.4);

    // the trailing access value has no right-hand neighbour
    let access = cleaned.numeric("internet_access_percentage").unwrap();
    assert_eq!(access[7], None);
    assert_eq!(report.residual_missing(), 1);
}
