use approx::assert_relative_eq;
use chrono::NaiveDate;
use energy_dashboard::config::DashboardConfig;
use energy_dashboard::filter::{filter_by_date_range, filter_by_years, DateRange, View};
use energy_dashboard::kpi::{compute_kpis, KpiValue, Unavailable};
use energy_dashboard::loader::load_table;
use energy_dashboard::output::export_snapshot;
use energy_dashboard::preprocess::preprocess;
use energy_dashboard::types::Field;
use energy_dashboard::{Dashboard, DashboardError, DashboardRequest, ParseError};
use std::collections::BTreeSet;
use std::io::Write;
use tempfile::{tempdir, NamedTempFile};

fn csv_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

const TWO_ROWS: &str = "\
utc_timestamp,DE_solar_generation_actual,DE_wind_generation_actual,DE_load_actual_entsoe_transparency,DE_solar_capacity,DE_wind_capacity,DE_wind_offshore_capacity
2020-01-01T00:00:00Z,10,20,100,50,100,20
2020-01-01T00:15:00Z,20,10,90,,,
";

const MULTI_YEAR: &str = "\
utc_timestamp,DE_solar_generation_actual,DE_wind_generation_actual,DE_wind_onshore_generation_actual,DE_wind_offshore_generation_actual,DE_load_actual_entsoe_transparency,DE_load_forecast_entsoe_transparency,DE_solar_capacity,DE_wind_capacity,DE_wind_onshore_capacity,DE_wind_offshore_capacity,DE_solar_profile,DE_wind_profile,DE_wind_onshore_profile,DE_wind_offshore_profile
2019-06-01T12:15:00Z,300,200,150,50,1000,980,1000,2000,1600,400,0.3,0.1,0.09,0.12
2019-06-01T12:00:00Z,200,100,80,20,1000,1010,1000,2000,1600,400,0.2,0.05,0.05,0.05
2020-06-01T12:00:00Z,400,300,200,100,1100,1100,1200,2200,1700,500,0.33,0.14,0.12,0.2
2021-01-01T00:00:00Z,0,500,400,100,1200,1140,1300,2300,1750,550,0,0.22,0.23,0.18
";

#[test]
fn two_row_fixture_renewable_share() {
    let file = csv_file(TWO_ROWS);
    let (table, _) = load_table(file.path()).unwrap();
    let prepared = preprocess(&table);
    let kpis = compute_kpis(&View::all(&prepared));

    let share = kpis.renewable_share.value().unwrap();
    assert_relative_eq!(share, 60.0 / 190.0 * 100.0, epsilon = 1e-9);
    assert_eq!(format!("{}", kpis.renewable_share), "31.6%");

    // no forecast column: only that KPI degrades
    assert_eq!(
        kpis.load_forecast_accuracy,
        KpiValue::Unavailable(Unavailable::MissingColumn(Field::LoadForecast))
    );
    assert_relative_eq!(kpis.solar_utilization.value().unwrap(), 30.0, epsilon = 1e-9);
    assert_relative_eq!(kpis.offshore_wind_share.value().unwrap(), 20.0, epsilon = 1e-9);
}

#[test]
fn loader_sorts_and_filters_compose() {
    let file = csv_file(MULTI_YEAR);
    let (table, report) = load_table(file.path()).unwrap();
    assert_eq!(report.total_rows, 4);
    assert!(report.missing_columns.is_empty());
    assert!(table.rows().windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    assert_eq!(table.rows()[0].get(Field::SolarGeneration), Some(200.0));

    let prepared = preprocess(&table);
    assert_eq!(preprocess(&prepared), prepared);

    let all = filter_by_years(&prepared, &BTreeSet::new());
    assert_eq!(all.len(), prepared.len());

    let d = |y, m, day| NaiveDate::from_ymd_opt(y, m, day).unwrap();
    assert!(filter_by_date_range(&prepared, d(2021, 1, 1), d(2019, 1, 1)).is_empty());
    assert_eq!(filter_by_date_range(&prepared, d(2019, 6, 1), d(2019, 6, 1)).len(), 2);
}

#[test]
fn dashboard_cycle_end_to_end() {
    let file = csv_file(MULTI_YEAR);
    let (table, _) = load_table(file.path()).unwrap();
    let dashboard = Dashboard::new(table, DashboardConfig::default());

    let request = dashboard.default_request();
    assert_eq!(request.selected_years, BTreeSet::from([2020, 2021]));

    let snap = dashboard.render(&request);
    assert_eq!(snap.rows_in_range, 4);
    assert_eq!(snap.rows_in_years, 2);

    // 2019-06-01 .. 2021-01-01 inclusive, gap days filled
    let mix = snap.generation_mix.data.as_ref().unwrap();
    assert_eq!(mix.len(), 581);

    let growth = snap.capacity_growth.data.as_ref().unwrap();
    assert_eq!(growth.len(), 2);

    let seasonal = snap.seasonal_patterns.data.as_ref().unwrap();
    assert_eq!(seasonal.len(), 2);

    let factors = snap.capacity_factors.data.as_ref().unwrap();
    assert_eq!(factors.len(), 1);

    let solar = snap.solar_snapshot.data.as_ref().unwrap().unwrap();
    assert_eq!(solar.generating, 0.0);
    assert_eq!(solar.available, 1300.0);

    for kpi in [
        snap.kpis.renewable_share,
        snap.kpis.solar_utilization,
        snap.kpis.offshore_wind_share,
        snap.kpis.load_forecast_accuracy,
    ] {
        assert!(kpi.is_available());
    }
}

#[test]
fn empty_range_renders_placeholders_and_exports() {
    let file = csv_file(MULTI_YEAR);
    let (table, _) = load_table(file.path()).unwrap();
    let dashboard = Dashboard::new(table, DashboardConfig::default());
    let d = |y, m, day| NaiveDate::from_ymd_opt(y, m, day).unwrap();
    let request = DashboardRequest {
        date_range: Some(DateRange::new(d(2022, 1, 1), d(2022, 12, 31))),
        selected_years: BTreeSet::from([2019]),
    };
    let snap = dashboard.render(&request);
    assert_eq!(snap.rows_in_range, 0);
    assert!(snap.generation_mix.data.as_ref().unwrap().is_empty());
    assert!(!snap.kpis.renewable_share.is_available());

    let dir = tempdir().unwrap();
    let written = export_snapshot(&snap, dir.path()).unwrap();
    assert!(written.iter().all(|p| p.exists()));
    let summary = std::fs::read_to_string(dir.path().join("summary.json")).unwrap();
    let json: serde_json::Value = serde_json::from_str(&summary).unwrap();
    assert_eq!(json["rows_in_range"], 0);
    assert_eq!(json["kpis"]["renewable_share"]["status"], "unavailable");
}

#[test]
fn fatal_errors() {
    assert!(matches!(
        load_table("no/such/file.csv"),
        Err(DashboardError::DataUnavailable { .. })
    ));

    let file = csv_file("utc_timestamp,DE_solar_generation_actual\n2020-13-01T00:00:00Z,1\n");
    assert!(matches!(
        load_table(file.path()),
        Err(DashboardError::Parse(ParseError::InvalidTimestamp { .. }))
    ));
}
