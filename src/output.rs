use crate::aggregate::AggregateTable;
use crate::dashboard::{DashboardSnapshot, Panel};
use crate::error::DashboardResult;
use crate::reports::{
    aggregate_rows, generate_summary, insight_lines, kpi_cards, snapshot_rows, RenderedTable,
};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tabled::{builder::Builder, settings::Style, Table, Tabled};
use tracing::{info, warn};

pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> DashboardResult<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    for r in rows {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_rendered_csv(path: &Path, table: &RenderedTable) -> DashboardResult<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(&table.header)?;
    for row in &table.rows {
        wtr.write_record(row)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> DashboardResult<()> {
    let s = serde_json::to_string_pretty(value)?;
    fs::write(path, s)?;
    Ok(())
}

pub fn preview_table_rows<T>(rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().cloned().take(max_rows).collect();
    if slice.is_empty() {
        println!("(no rows)\n");
        return;
    }
    let table_str = Table::new(slice).with(Style::markdown()).to_string();
    println!("{}\n", table_str);
}

pub fn preview_rendered(table: &RenderedTable, max_rows: usize) {
    if table.rows.is_empty() {
        println!("(no rows)\n");
        return;
    }
    let mut builder = Builder::default();
    builder.push_record(table.header.clone());
    for row in table.rows.iter().take(max_rows) {
        builder.push_record(row.clone());
    }
    let table_str = builder.build().with(Style::markdown()).to_string();
    println!("{}\n", table_str);
    if table.rows.len() > max_rows {
        println!("({} more rows)\n", table.rows.len() - max_rows);
    }
}

fn print_panel_header<T>(panel: &Panel<T>) {
    println!("{}", panel.title);
    if let Some(note) = panel.note {
        println!("({})", note);
    }
    println!();
}

/// Prints an aggregate panel, or a placeholder when its data is unavailable.
pub fn preview_panel(panel: &Panel<AggregateTable>, decimals: usize, max_rows: usize) {
    print_panel_header(panel);
    match &panel.data {
        Ok(table) => preview_rendered(&aggregate_rows(table, decimals), max_rows),
        Err(e) => println!("(unavailable: {})\n", e),
    }
}

/// Prints every KPI card and panel of a snapshot to stdout.
pub fn print_snapshot(snapshot: &DashboardSnapshot, max_rows: usize) {
    println!("KEY PERFORMANCE INDICATORS\n");
    preview_table_rows(&kpi_cards(&snapshot.kpis), 4);

    preview_panel(&snapshot.generation_mix, 1, max_rows);

    println!("Capacity vs Generation Profiles");
    println!("(Latest interval in the selected range, MW)\n");
    preview_table_rows(
        &snapshot_rows(&snapshot.solar_snapshot, &snapshot.wind_snapshot),
        2,
    );

    preview_panel(&snapshot.wind_breakdown, 1, max_rows);
    preview_panel(&snapshot.capacity_growth, 0, max_rows);
    preview_panel(&snapshot.seasonal_patterns, 1, 12);
    preview_panel(&snapshot.capacity_factors, 2, 1);

    println!("Key Insights\n");
    for line in insight_lines() {
        println!("{}", line);
    }
    println!();
}

fn export_panel(
    dir: &Path,
    file: &str,
    panel: &Panel<AggregateTable>,
    written: &mut Vec<PathBuf>,
) -> DashboardResult<()> {
    match &panel.data {
        Ok(table) => {
            let path = dir.join(file);
            write_rendered_csv(&path, &aggregate_rows(table, 3))?;
            written.push(path);
        }
        Err(e) => warn!(panel = panel.title, error = %e, "panel not exported"),
    }
    Ok(())
}

/// Writes each available panel as CSV plus `summary.json` into `dir`.
/// Returns the files written.
pub fn export_snapshot(snapshot: &DashboardSnapshot, dir: &Path) -> DashboardResult<Vec<PathBuf>> {
    fs::create_dir_all(dir)?;
    let mut written = Vec::new();

    let kpi_path = dir.join("kpis.csv");
    write_csv(&kpi_path, &kpi_cards(&snapshot.kpis))?;
    written.push(kpi_path);

    export_panel(dir, "generation_mix_daily.csv", &snapshot.generation_mix, &mut written)?;

    let donut = snapshot_rows(&snapshot.solar_snapshot, &snapshot.wind_snapshot);
    let donut_path = dir.join("capacity_vs_generation.csv");
    write_csv(&donut_path, &donut)?;
    written.push(donut_path);

    export_panel(dir, "wind_breakdown_yearly.csv", &snapshot.wind_breakdown, &mut written)?;
    export_panel(dir, "capacity_growth_yearly.csv", &snapshot.capacity_growth, &mut written)?;
    export_panel(dir, "seasonal_patterns_monthly.csv", &snapshot.seasonal_patterns, &mut written)?;
    export_panel(dir, "capacity_factors.csv", &snapshot.capacity_factors, &mut written)?;

    let summary_path = dir.join("summary.json");
    write_json(&summary_path, &generate_summary(snapshot))?;
    written.push(summary_path);

    info!(files = written.len(), dir = %dir.display(), "dashboard exported");
    Ok(written)
}
