use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use tabled::Tabled;

/// Name of the timestamp column every input file must carry.
pub const TIMESTAMP_COLUMN: &str = "utc_timestamp";

/// How a field behaves when resampled to a coarser bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Generation or load, already normalized to its interval: additive.
    Energy,
    /// Installed capacity, a step function: take the max.
    Capacity,
    /// Capacity factor in 0..=1: average it.
    Profile,
}

/// The numeric columns of the OPSD German singleindex export we know about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    SolarGeneration,
    WindGeneration,
    WindOnshoreGeneration,
    WindOffshoreGeneration,
    SolarCapacity,
    WindCapacity,
    WindOnshoreCapacity,
    WindOffshoreCapacity,
    LoadActual,
    LoadForecast,
    SolarProfile,
    WindProfile,
    WindOnshoreProfile,
    WindOffshoreProfile,
}

pub const FIELD_COUNT: usize = 14;

impl Field {
    pub const ALL: [Field; FIELD_COUNT] = [
        Field::SolarGeneration,
        Field::WindGeneration,
        Field::WindOnshoreGeneration,
        Field::WindOffshoreGeneration,
        Field::SolarCapacity,
        Field::WindCapacity,
        Field::WindOnshoreCapacity,
        Field::WindOffshoreCapacity,
        Field::LoadActual,
        Field::LoadForecast,
        Field::SolarProfile,
        Field::WindProfile,
        Field::WindOnshoreProfile,
        Field::WindOffshoreProfile,
    ];

    /// Position of the field inside an [`Observation`]'s value array.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn column_name(self) -> &'static str {
        match self {
            Field::SolarGeneration => "DE_solar_generation_actual",
            Field::WindGeneration => "DE_wind_generation_actual",
            Field::WindOnshoreGeneration => "DE_wind_onshore_generation_actual",
            Field::WindOffshoreGeneration => "DE_wind_offshore_generation_actual",
            Field::SolarCapacity => "DE_solar_capacity",
            Field::WindCapacity => "DE_wind_capacity",
            Field::WindOnshoreCapacity => "DE_wind_onshore_capacity",
            Field::WindOffshoreCapacity => "DE_wind_offshore_capacity",
            Field::LoadActual => "DE_load_actual_entsoe_transparency",
            Field::LoadForecast => "DE_load_forecast_entsoe_transparency",
            Field::SolarProfile => "DE_solar_profile",
            Field::WindProfile => "DE_wind_profile",
            Field::WindOnshoreProfile => "DE_wind_onshore_profile",
            Field::WindOffshoreProfile => "DE_wind_offshore_profile",
        }
    }

    pub fn from_column(name: &str) -> Option<Field> {
        let name = name.trim();
        Field::ALL.into_iter().find(|f| f.column_name() == name)
    }

    /// Short human label used as a table header.
    pub fn label(self) -> &'static str {
        match self {
            Field::SolarGeneration => "Solar",
            Field::WindGeneration => "Wind",
            Field::WindOnshoreGeneration => "Onshore Wind",
            Field::WindOffshoreGeneration => "Offshore Wind",
            Field::SolarCapacity => "Solar Capacity",
            Field::WindCapacity => "Total Wind Capacity",
            Field::WindOnshoreCapacity => "Onshore Wind Capacity",
            Field::WindOffshoreCapacity => "Offshore Wind Capacity",
            Field::LoadActual => "Total Load",
            Field::LoadForecast => "Load Forecast",
            Field::SolarProfile => "Solar Profile",
            Field::WindProfile => "Wind Total Profile",
            Field::WindOnshoreProfile => "Wind Onshore Profile",
            Field::WindOffshoreProfile => "Wind Offshore Profile",
        }
    }

    pub fn kind(self) -> FieldKind {
        match self {
            Field::SolarCapacity
            | Field::WindCapacity
            | Field::WindOnshoreCapacity
            | Field::WindOffshoreCapacity => FieldKind::Capacity,
            Field::SolarProfile
            | Field::WindProfile
            | Field::WindOnshoreProfile
            | Field::WindOffshoreProfile => FieldKind::Profile,
            _ => FieldKind::Energy,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column_name())
    }
}

/// One 15-minute interval of the input file.
///
/// Values are `None` where the cell was empty; reductions skip them.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub timestamp: DateTime<Utc>,
    values: [Option<f64>; FIELD_COUNT],
}

impl Observation {
    pub fn new(timestamp: DateTime<Utc>) -> Self {
        Self { timestamp, values: [None; FIELD_COUNT] }
    }

    pub fn with(mut self, field: Field, value: f64) -> Self {
        self.set(field, Some(value));
        self
    }

    pub fn get(&self, field: Field) -> Option<f64> {
        self.values[field.index()]
    }

    pub fn set(&mut self, field: Field, value: Option<f64>) {
        self.values[field.index()] = value;
    }
}

/// The loaded input: observations sorted by timestamp plus the set of known
/// columns that were present in the header.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ObservationTable {
    rows: Vec<Observation>,
    columns: BTreeSet<Field>,
}

impl ObservationTable {
    /// Builds a table, sorting rows by timestamp. The sort is stable so rows
    /// sharing a timestamp keep their input order.
    pub fn new(mut rows: Vec<Observation>, columns: BTreeSet<Field>) -> Self {
        rows.sort_by_key(|r| r.timestamp);
        Self { rows, columns }
    }

    pub fn rows(&self) -> &[Observation] {
        &self.rows
    }

    pub fn columns(&self) -> &BTreeSet<Field> {
        &self.columns
    }

    pub fn has_column(&self, field: Field) -> bool {
        self.columns.contains(&field)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Calendar fields derived from a timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct CalendarFields {
    pub year: i32,
    pub month: u32,
    pub date: NaiveDate,
}

impl CalendarFields {
    pub fn from_timestamp(ts: DateTime<Utc>) -> Self {
        let date = ts.date_naive();
        Self { year: date.year(), month: date.month(), date }
    }
}

/// An observation with its calendar fields. Only constructible from a
/// timestamp, so the two cannot drift apart.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedRow {
    observation: Observation,
    calendar: CalendarFields,
}

impl PreparedRow {
    pub fn new(observation: Observation) -> Self {
        let calendar = CalendarFields::from_timestamp(observation.timestamp);
        Self { observation, calendar }
    }

    pub fn observation(&self) -> &Observation {
        &self.observation
    }

    pub fn calendar(&self) -> CalendarFields {
        self.calendar
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.observation.timestamp
    }

    pub fn get(&self, field: Field) -> Option<f64> {
        self.observation.get(field)
    }
}

/// Preprocessor output: the observation table plus derived calendar fields.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PreparedTable {
    pub(crate) rows: Vec<PreparedRow>,
    pub(crate) columns: BTreeSet<Field>,
}

impl PreparedTable {
    pub fn rows(&self) -> &[PreparedRow] {
        &self.rows
    }

    pub fn columns(&self) -> &BTreeSet<Field> {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct KpiCardRow {
    #[serde(rename = "Metric")]
    #[tabled(rename = "Metric")]
    pub label: String,
    #[serde(rename = "Value")]
    #[tabled(rename = "Value")]
    pub value: String,
    #[serde(rename = "Delta")]
    #[tabled(rename = "Delta")]
    pub delta: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct SnapshotRow {
    #[serde(rename = "Technology")]
    #[tabled(rename = "Technology")]
    pub technology: String,
    #[serde(rename = "Generating")]
    #[tabled(rename = "Generating")]
    pub generating: String,
    #[serde(rename = "AvailableCapacity")]
    #[tabled(rename = "AvailableCapacity")]
    pub available: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn field_columns_round_trip() {
        for f in Field::ALL {
            assert_eq!(Field::from_column(f.column_name()), Some(f));
        }
        assert_eq!(Field::from_column("DE_50hertz_load_actual"), None);
    }

    #[test]
    fn field_index_matches_catalog_position() {
        for (i, f) in Field::ALL.iter().enumerate() {
            assert_eq!(f.index(), i);
        }
    }

    #[test]
    fn table_sorts_rows_by_timestamp() {
        let late = Observation::new(Utc.with_ymd_and_hms(2020, 1, 2, 0, 0, 0).unwrap());
        let early = Observation::new(Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap());
        let table = ObservationTable::new(vec![late.clone(), early.clone()], BTreeSet::new());
        assert_eq!(table.rows(), &[early, late]);
    }

    #[test]
    fn calendar_fields_follow_utc_date() {
        let ts = Utc.with_ymd_and_hms(2019, 12, 31, 23, 45, 0).unwrap();
        let cal = CalendarFields::from_timestamp(ts);
        assert_eq!(cal.year, 2019);
        assert_eq!(cal.month, 12);
        assert_eq!(cal.date, NaiveDate::from_ymd_opt(2019, 12, 31).unwrap());
    }
}
