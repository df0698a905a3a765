//! Summary KPIs over a filtered view.
//!
//! Each KPI is computed on its own and degrades to
//! [`KpiValue::Unavailable`] with a reason. Nothing here returns an error or
//! panics, so one missing column never hides the other KPIs.

use crate::filter::View;
use crate::types::Field;
use crate::util::{max, mean};
use serde::Serialize;
use std::fmt;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Kpi {
    RenewableShare,
    SolarUtilization,
    OffshoreWindShare,
    LoadForecastAccuracy,
}

impl Kpi {
    pub const ALL: [Kpi; 4] = [
        Kpi::RenewableShare,
        Kpi::SolarUtilization,
        Kpi::OffshoreWindShare,
        Kpi::LoadForecastAccuracy,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Kpi::RenewableShare => "Average Renewable Share",
            Kpi::SolarUtilization => "Solar Capacity Utilization",
            Kpi::OffshoreWindShare => "Offshore Wind Share",
            Kpi::LoadForecastAccuracy => "Load Forecast Accuracy",
        }
    }
}

/// Why a KPI could not be computed.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", content = "column", rename_all = "snake_case")]
pub enum Unavailable {
    #[error("missing column '{0}'")]
    MissingColumn(Field),
    #[error("no values in the selected range")]
    NoData,
    #[error("zero denominator in '{0}'")]
    ZeroDenominator(Field),
}

/// A KPI value in percent, or the reason it is unavailable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum KpiValue {
    Available(f64),
    Unavailable(Unavailable),
}

impl KpiValue {
    pub fn value(&self) -> Option<f64> {
        match self {
            KpiValue::Available(v) => Some(*v),
            KpiValue::Unavailable(_) => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, KpiValue::Available(_))
    }
}

impl From<Result<f64, Unavailable>> for KpiValue {
    fn from(r: Result<f64, Unavailable>) -> Self {
        match r {
            Ok(v) => KpiValue::Available(v),
            Err(reason) => KpiValue::Unavailable(reason),
        }
    }
}

impl fmt::Display for KpiValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KpiValue::Available(v) => write!(f, "{:.1}%", v),
            KpiValue::Unavailable(_) => f.write_str("N/A"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KpiSet {
    pub renewable_share: KpiValue,
    pub solar_utilization: KpiValue,
    pub offshore_wind_share: KpiValue,
    pub load_forecast_accuracy: KpiValue,
    /// Peak installed solar capacity in the view (MW), for annotation.
    pub solar_capacity_mw: Option<f64>,
    /// Peak installed wind capacity in the view (MW), for annotation.
    pub wind_capacity_mw: Option<f64>,
}

impl KpiSet {
    pub fn get(&self, kpi: Kpi) -> KpiValue {
        match kpi {
            Kpi::RenewableShare => self.renewable_share,
            Kpi::SolarUtilization => self.solar_utilization,
            Kpi::OffshoreWindShare => self.offshore_wind_share,
            Kpi::LoadForecastAccuracy => self.load_forecast_accuracy,
        }
    }
}

fn values(view: &View<'_>, field: Field) -> Result<Vec<f64>, Unavailable> {
    view.values(field)
        .map_err(|_| Unavailable::MissingColumn(field))
}

fn peak(view: &View<'_>, field: Field) -> Result<f64, Unavailable> {
    max(values(view, field)?).ok_or(Unavailable::NoData)
}

/// (Σ solar + Σ wind) / Σ load × 100.
///
/// Sums of energy over the whole selection rather than a mean of per-row
/// ratios; missing cells are skipped per column.
pub fn renewable_share(view: &View<'_>) -> KpiValue {
    try_renewable_share(view).into()
}

fn try_renewable_share(view: &View<'_>) -> Result<f64, Unavailable> {
    let solar: f64 = values(view, Field::SolarGeneration)?.iter().sum();
    let wind: f64 = values(view, Field::WindGeneration)?.iter().sum();
    let load = values(view, Field::LoadActual)?;
    if load.is_empty() {
        return Err(Unavailable::NoData);
    }
    let load: f64 = load.iter().sum();
    if load == 0.0 {
        return Err(Unavailable::ZeroDenominator(Field::LoadActual));
    }
    Ok((solar + wind) / load * 100.0)
}

/// mean(solar generation) / max(solar capacity) × 100.
pub fn solar_utilization(view: &View<'_>) -> KpiValue {
    try_solar_utilization(view).into()
}

fn try_solar_utilization(view: &View<'_>) -> Result<f64, Unavailable> {
    let capacity = peak(view, Field::SolarCapacity)?;
    let generation = mean(values(view, Field::SolarGeneration)?).ok_or(Unavailable::NoData)?;
    if capacity == 0.0 {
        return Err(Unavailable::ZeroDenominator(Field::SolarCapacity));
    }
    Ok(generation / capacity * 100.0)
}

/// max(offshore capacity) / max(total wind capacity) × 100.
pub fn offshore_wind_share(view: &View<'_>) -> KpiValue {
    try_offshore_wind_share(view).into()
}

fn try_offshore_wind_share(view: &View<'_>) -> Result<f64, Unavailable> {
    let offshore = peak(view, Field::WindOffshoreCapacity)?;
    let total = peak(view, Field::WindCapacity)?;
    if total == 0.0 {
        return Err(Unavailable::ZeroDenominator(Field::WindCapacity));
    }
    Ok(offshore / total * 100.0)
}

/// mean(1 − |actual − forecast| / actual) × 100 over rows carrying both
/// values. A single zero actual makes the KPI unavailable.
pub fn load_forecast_accuracy(view: &View<'_>) -> KpiValue {
    try_load_forecast_accuracy(view).into()
}

fn try_load_forecast_accuracy(view: &View<'_>) -> Result<f64, Unavailable> {
    for field in [Field::LoadActual, Field::LoadForecast] {
        if !view.has_column(field) {
            return Err(Unavailable::MissingColumn(field));
        }
    }
    let mut scores = Vec::with_capacity(view.len());
    for row in view.rows() {
        let (Some(actual), Some(forecast)) =
            (row.get(Field::LoadActual), row.get(Field::LoadForecast))
        else {
            continue;
        };
        if actual == 0.0 {
            return Err(Unavailable::ZeroDenominator(Field::LoadActual));
        }
        scores.push(1.0 - (actual - forecast).abs() / actual);
    }
    mean(scores).map(|m| m * 100.0).ok_or(Unavailable::NoData)
}

pub fn compute_kpis(view: &View<'_>) -> KpiSet {
    let set = KpiSet {
        renewable_share: renewable_share(view),
        solar_utilization: solar_utilization(view),
        offshore_wind_share: offshore_wind_share(view),
        load_forecast_accuracy: load_forecast_accuracy(view),
        solar_capacity_mw: peak(view, Field::SolarCapacity).ok(),
        wind_capacity_mw: peak(view, Field::WindCapacity).ok(),
    };
    for kpi in Kpi::ALL {
        if let KpiValue::Unavailable(reason) = set.get(kpi) {
            warn!(kpi = kpi.label(), %reason, "KPI unavailable");
        }
    }
    set
}
