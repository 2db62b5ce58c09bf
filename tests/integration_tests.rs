use chrono::NaiveDate;
use energy_sales_report::analyzers::{aggregate_batch, consolidate, enrich_batch, run_pipeline};
use energy_sales_report::output::{ALL_DATA_FILE, COMPARISON_FILE, SUMMARY_FILE, write_report};
use energy_sales_report::source::{bucket_by_week, load_assets, load_transactions, read_transactions};
use energy_sales_report::synthetic::{SampleConfig, generate};
use pretty_assertions::assert_eq;
use std::fs;

const TRANSACTIONS_CSV: &str = "\
date,portfolio_id,asset_type,MWh,price
2023-01-01 00:00:00,1,solar,100,50
2023-01-02 00:00:00,1,solar,150,55
2023-01-03 00:00:00,2,wind,200,45
2023-01-04 00:00:00,2,wind,300,40
2023-01-05 00:00:00,1,solar,50,52
2023-01-08 00:00:00,1,solar,80,60
2023-01-09 00:00:00,2,wind,100,30
2023-01-10 00:00:00,3,gas,20,90
";

const ASSETS_CSV: &str = "\
portfolio_id,asset_id,geography,ISO,operational_date,timezone
1,Asset_01,West,CAISO,2014-01-01,US/Pacific
1,Asset_02,West,CAISO,2016-07-01,US/Pacific
2,Asset_03,South,ERCOT,2019-01-01,US/Central
";

fn as_of() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
}

#[test]
fn test_first_week_matches_reference_scenario() {
    let weekly = bucket_by_week(read_transactions(TRANSACTIONS_CSV.as_bytes()).unwrap());
    assert_eq!(weekly[0].0, "2023-01");

    let rows = aggregate_batch(&weekly[0].1).unwrap();
    assert_eq!(rows.len(), 2);

    assert_eq!(rows[0].mwh, 300.0);
    assert_eq!(rows[0].sales_amount, 16350.0);
    assert_eq!(rows[0].transaction_count, 3);
    assert!((rows[0].price - 52.333333).abs() < 1e-3);

    assert_eq!(rows[1].mwh, 500.0);
    assert_eq!(rows[1].sales_amount, 21000.0);
    assert_eq!(rows[1].transaction_count, 2);
    assert_eq!(rows[1].price, 42.5);
}

#[test]
fn test_enrichment_never_drops_rows() {
    let weekly = bucket_by_week(read_transactions(TRANSACTIONS_CSV.as_bytes()).unwrap());
    let assets = energy_sales_report::source::read_assets(ASSETS_CSV.as_bytes()).unwrap();

    for (_, transactions) in &weekly {
        let aggregated = aggregate_batch(transactions).unwrap();
        let enriched = enrich_batch(&aggregated, &assets, as_of()).unwrap();
        assert_eq!(enriched.len(), aggregated.len());
    }
}

#[test]
fn test_two_week_report_from_files() {
    let dir = tempfile::tempdir().unwrap();
    let tx_path = dir.path().join("transactions.csv");
    let asset_path = dir.path().join("assets.csv");
    fs::write(&tx_path, TRANSACTIONS_CSV).unwrap();
    fs::write(&asset_path, ASSETS_CSV).unwrap();

    let weekly = bucket_by_week(load_transactions(&tx_path).unwrap());
    let assets = load_assets(&asset_path).unwrap();
    let report = run_pipeline(&weekly, &assets, as_of()).unwrap();

    assert_eq!(report.comparison.weeks, vec!["2023-01".to_string(), "2023-02".to_string()]);
    assert_eq!(report.all_data.len(), 5);

    let keys: Vec<(&str, &str)> = report
        .summary
        .iter()
        .map(|r| (r.portfolio_id.as_str(), r.asset_type.as_str()))
        .collect();
    assert_eq!(keys, vec![("1", "solar"), ("2", "wind"), ("3", "gas")]);

    let solar = &report.summary[0];
    assert_eq!(solar.mwh, 380.0);
    assert_eq!(solar.sales_amount, 16350.0 + 4800.0);
    assert_eq!(solar.transaction_count, 4);
    assert_eq!(solar.avg_weekly_revenue, Some((16350.0 + 4800.0) / 2.0));
    assert_eq!(solar.asset_count, Some(2));
    assert_eq!(solar.primary_geography.as_deref(), Some("West"));
    assert_eq!(solar.portfolio_age_years, Some(10.0));

    let wind = &report.summary[1];
    assert_eq!(wind.price, (42.5 + 30.0) / 2.0);
    assert_eq!(wind.avg_revenue_per_mwh, Some(24000.0 / 600.0));

    // Portfolio 3 has no assets and only sold in the second week.
    let gas = &report.summary[2];
    assert_eq!(gas.asset_count, None);
    assert_eq!(gas.portfolio_age_years, None);
    assert_eq!(gas.avg_weekly_revenue, Some(900.0));
    assert!(report.comparison.cell("3", "gas", "2023-01").is_none());
    assert!(report.comparison.cell("3", "gas", "2023-02").is_some());

    let out = dir.path().join("reports");
    write_report(&out, &report, false).unwrap();
    let summary_csv = fs::read_to_string(out.join(SUMMARY_FILE)).unwrap();
    assert_eq!(summary_csv.lines().count(), 4);
    assert!(out.join(COMPARISON_FILE).exists());
    assert!(out.join(ALL_DATA_FILE).exists());
}

#[test]
fn test_consolidate_matches_pipeline() {
    let weekly = bucket_by_week(read_transactions(TRANSACTIONS_CSV.as_bytes()).unwrap());
    let assets = energy_sales_report::source::read_assets(ASSETS_CSV.as_bytes()).unwrap();

    let enriched: Vec<_> = weekly
        .iter()
        .map(|(week, txs)| {
            let aggregated = aggregate_batch(txs).unwrap();
            (week.clone(), enrich_batch(&aggregated, &assets, as_of()).unwrap())
        })
        .collect();

    let by_hand = consolidate(&enriched).unwrap();
    let by_pipeline = run_pipeline(&weekly, &assets, as_of()).unwrap();
    assert_eq!(by_hand, by_pipeline);
}

#[test]
fn test_synthetic_run_is_deterministic() {
    let as_of = as_of();
    let sample = generate(&SampleConfig::new(11, as_of));
    let weekly = bucket_by_week(sample.transactions.clone());

    let first = run_pipeline(&weekly, &sample.assets, as_of).unwrap();
    let second = run_pipeline(&weekly, &sample.assets, as_of).unwrap();

    assert_eq!(first, second);
    assert_eq!(first.comparison.weeks.len(), 4);

    let total: usize = first.summary.iter().map(|r| r.transaction_count).sum();
    assert_eq!(total, sample.transactions.len());
    for row in &first.summary {
        if let Some(age) = row.portfolio_age_years {
            assert!(age >= 0.0);
        }
    }
}
