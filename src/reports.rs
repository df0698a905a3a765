use crate::aggregate::{AggregateTable, CapacitySnapshot};
use crate::dashboard::{DashboardRequest, DashboardSnapshot, Panel};
use crate::kpi::{Kpi, KpiSet, KpiValue};
use crate::types::{KpiCardRow, SnapshotRow};
use crate::util::{format_number, format_opt};
use serde::Serialize;

/// Renewable share target the first KPI is compared against.
pub const RENEWABLE_TARGET_PCT: f64 = 25.0;

/// Header plus formatted cells, ready for a table preview or CSV export.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedTable {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

pub fn kpi_cards(kpis: &KpiSet) -> Vec<KpiCardRow> {
    Kpi::ALL
        .iter()
        .map(|&kpi| {
            let value = kpis.get(kpi);
            KpiCardRow {
                label: kpi.label().to_string(),
                value: value.to_string(),
                delta: delta(kpi, value, kpis),
            }
        })
        .collect()
}

fn delta(kpi: Kpi, value: KpiValue, kpis: &KpiSet) -> String {
    let Some(v) = value.value() else {
        return "Data unavailable".to_string();
    };
    match kpi {
        Kpi::RenewableShare => format!("{:+.1}% vs 2025 Target", v - RENEWABLE_TARGET_PCT),
        Kpi::SolarUtilization => kpis
            .solar_capacity_mw
            .map(|c| format!("Capacity: {} MW", format_number(c, 0)))
            .unwrap_or_default(),
        Kpi::OffshoreWindShare => kpis
            .wind_capacity_mw
            .map(|c| format!("Total Wind: {} MW", format_number(c, 0)))
            .unwrap_or_default(),
        Kpi::LoadForecastAccuracy => format!("±{:.1}% Error", 100.0 - v),
    }
}

pub fn aggregate_rows(table: &AggregateTable, decimals: usize) -> RenderedTable {
    let mut header = vec![table.kind().label().to_string()];
    header.extend(table.fields().iter().map(|f| f.label().to_string()));
    let rows = table
        .rows()
        .iter()
        .map(|row| {
            let mut cells = vec![row.key.to_string()];
            cells.extend(row.values.iter().map(|v| format_opt(*v, decimals)));
            cells
        })
        .collect();
    RenderedTable { header, rows }
}

/// Donut data for both technologies. A technology whose columns are missing,
/// or whose latest row is incomplete, is left out.
pub fn snapshot_rows(
    solar: &Panel<Option<CapacitySnapshot>>,
    wind: &Panel<Option<CapacitySnapshot>>,
) -> Vec<SnapshotRow> {
    [("Solar", solar), ("Wind", wind)]
        .into_iter()
        .filter_map(|(name, panel)| {
            let snap = panel.data.as_ref().ok()?.as_ref()?;
            Some(SnapshotRow {
                technology: name.to_string(),
                generating: format_number(snap.generating, 0),
                available: format_number(snap.available, 0),
            })
        })
        .collect()
}

/// Closing notes shown under the panels.
pub const KEY_INSIGHTS: [(&str, &str); 3] = [
    (
        "Renewable Growth",
        "Germany shows consistent growth in renewable capacity, with solar and wind leading the energy transition.",
    ),
    (
        "Seasonal Variation",
        "Strong seasonal patterns observed with solar peaking in summer and wind in winter months.",
    ),
    (
        "Grid Stability",
        "High forecast accuracy indicates robust grid management capabilities.",
    ),
];

pub fn insight_lines() -> Vec<String> {
    KEY_INSIGHTS
        .iter()
        .map(|(title, text)| format!("- {}: {}", title, text))
        .collect()
}

/// Contents of `summary.json`.
#[derive(Debug, Serialize)]
pub struct Summary<'a> {
    pub request: &'a DashboardRequest,
    pub rows_in_range: usize,
    pub rows_in_years: usize,
    pub kpis: &'a KpiSet,
}

pub fn generate_summary(snapshot: &DashboardSnapshot) -> Summary<'_> {
    Summary {
        request: &snapshot.request,
        rows_in_range: snapshot.rows_in_range,
        rows_in_years: snapshot.rows_in_years,
        kpis: &snapshot.kpis,
    }
}
