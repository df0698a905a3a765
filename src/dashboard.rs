//! One render cycle: filter, aggregate and compute KPIs for a request.
//!
//! The observation table is immutable once a [`Dashboard`] owns it, so the
//! preprocessed table is computed on first use and reused by every cycle.
//! Each cycle receives its controls as a [`DashboardRequest`] value; there is
//! no shared session state.

use crate::aggregate::{
    capacity_snapshot, column_means, daily_sum, monthly_mean, yearly_agg, AggregateTable,
    CapacitySnapshot, Reducer,
};
use crate::config::DashboardConfig;
use crate::error::DashboardResult;
use crate::filter::{available_years, DateRange, View};
use crate::kpi::{compute_kpis, KpiSet};
use crate::preprocess::preprocess;
use crate::types::{Field, ObservationTable, PreparedTable};
use once_cell::unsync::OnceCell;
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::{debug, info};

pub const GENERATION_MIX_FIELDS: [Field; 3] =
    [Field::SolarGeneration, Field::WindGeneration, Field::LoadActual];

pub const WIND_BREAKDOWN: [(Field, Reducer); 2] = [
    (Field::WindOnshoreGeneration, Reducer::Mean),
    (Field::WindOffshoreGeneration, Reducer::Mean),
];

pub const CAPACITY_FIELDS: [Field; 4] = [
    Field::SolarCapacity,
    Field::WindCapacity,
    Field::WindOnshoreCapacity,
    Field::WindOffshoreCapacity,
];

pub const PROFILE_FIELDS: [Field; 4] = [
    Field::SolarProfile,
    Field::WindProfile,
    Field::WindOnshoreProfile,
    Field::WindOffshoreProfile,
];

/// Control values for one cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardRequest {
    /// `None` selects the whole table.
    pub date_range: Option<DateRange>,
    /// Empty selects every year.
    pub selected_years: BTreeSet<i32>,
}

/// A chart's data, or the reason it can't be drawn.
#[derive(Debug)]
pub struct Panel<T> {
    pub title: &'static str,
    pub note: Option<&'static str>,
    pub data: DashboardResult<T>,
}

impl<T> Panel<T> {
    fn new(title: &'static str, data: DashboardResult<T>) -> Self {
        Self { title, note: None, data }
    }

    fn with_note(mut self, note: &'static str) -> Self {
        self.note = Some(note);
        self
    }
}

#[derive(Debug)]
pub struct DashboardSnapshot {
    pub request: DashboardRequest,
    pub rows_in_range: usize,
    pub rows_in_years: usize,
    pub kpis: KpiSet,
    pub generation_mix: Panel<AggregateTable>,
    pub solar_snapshot: Panel<Option<CapacitySnapshot>>,
    pub wind_snapshot: Panel<Option<CapacitySnapshot>>,
    pub wind_breakdown: Panel<AggregateTable>,
    pub capacity_growth: Panel<AggregateTable>,
    pub seasonal_patterns: Panel<AggregateTable>,
    pub capacity_factors: Panel<AggregateTable>,
}

pub struct Dashboard {
    table: ObservationTable,
    config: DashboardConfig,
    prepared: OnceCell<PreparedTable>,
}

impl Dashboard {
    pub fn new(table: ObservationTable, config: DashboardConfig) -> Self {
        Self {
            table,
            config,
            prepared: OnceCell::new(),
        }
    }

    pub fn prepared(&self) -> &PreparedTable {
        self.prepared.get_or_init(|| {
            debug!(rows = self.table.len(), "deriving calendar fields");
            preprocess(&self.table)
        })
    }

    pub fn available_years(&self) -> Vec<i32> {
        available_years(self.prepared())
    }

    pub fn full_range(&self) -> Option<DateRange> {
        DateRange::full(self.prepared())
    }

    /// Request built from the configured defaults.
    pub fn default_request(&self) -> DashboardRequest {
        DashboardRequest {
            date_range: self
                .full_range()
                .map(|full| self.config.resolve_date_range(full)),
            selected_years: self.config.resolve_years(&self.available_years()),
        }
    }

    pub fn render(&self, request: &DashboardRequest) -> DashboardSnapshot {
        let all = View::all(self.prepared());
        let in_range = match request.date_range {
            Some(range) => all.filter_by_date_range(range.start, range.end),
            None => all.clone(),
        };
        // yearly panels follow the year selection only, not the date range
        let in_years = all.filter_by_years(&request.selected_years);
        debug!(
            in_range = in_range.len(),
            in_years = in_years.len(),
            "views filtered"
        );

        let snapshot = DashboardSnapshot {
            request: request.clone(),
            rows_in_range: in_range.len(),
            rows_in_years: in_years.len(),
            kpis: compute_kpis(&in_range),
            generation_mix: Panel::new(
                "Energy Generation Mix Over Time",
                daily_sum(&in_range, &GENERATION_MIX_FIELDS),
            )
            .with_note("Daily energy (MWh)"),
            solar_snapshot: Panel::new(
                "Solar: Capacity vs Generation",
                capacity_snapshot(&in_range, Field::SolarGeneration, Field::SolarCapacity),
            ),
            wind_snapshot: Panel::new(
                "Wind: Capacity vs Generation",
                capacity_snapshot(&in_range, Field::WindGeneration, Field::WindCapacity),
            ),
            wind_breakdown: Panel::new(
                "Wind Generation Breakdown",
                yearly_agg(&in_years, &WIND_BREAKDOWN),
            )
            .with_note("Average generation (MW) per year"),
            capacity_growth: Panel::new(
                "Renewable Capacity Growth",
                yearly_agg(&in_years, &CAPACITY_FIELDS.map(|f| (f, Reducer::natural_for(f)))),
            )
            .with_note("Installed capacity (MW), peak per year"),
            seasonal_patterns: Panel::new(
                "Seasonal Patterns",
                monthly_mean(&in_range, &GENERATION_MIX_FIELDS),
            )
            .with_note("Typical month: averages pooled across all selected years"),
            capacity_factors: Panel::new(
                "Capacity Factor Analysis",
                column_means(&in_range, &PROFILE_FIELDS).map(|t| t.scaled(100.0)),
            )
            .with_note("Average capacity factor (%)"),
        };
        info!(
            rows = snapshot.rows_in_range,
            years = ?request.selected_years,
            "dashboard cycle complete"
        );
        snapshot
    }
}
