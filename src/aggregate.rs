//! Bucketed aggregation over a filtered view.
//!
//! Energy fields are summed, capacities take the max and profiles are
//! averaged. `yearly_agg` makes the caller name a reducer per field instead
//! of picking one.

use crate::error::DashboardResult;
use crate::filter::View;
use crate::types::{Field, FieldKind, PreparedRow};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

const MONTH_ABBR: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Reducer {
    Sum,
    Mean,
    Max,
}

impl Reducer {
    /// The physically meaningful reducer for a field.
    pub fn natural_for(field: Field) -> Reducer {
        match field.kind() {
            FieldKind::Energy => Reducer::Sum,
            FieldKind::Capacity => Reducer::Max,
            FieldKind::Profile => Reducer::Mean,
        }
    }

    fn finish(self, acc: &Accumulator) -> Option<f64> {
        match self {
            // a bucket with no values sums to zero, as a resample would
            Reducer::Sum => Some(acc.sum),
            Reducer::Mean if acc.count == 0 => None,
            Reducer::Mean => Some(acc.sum / acc.count as f64),
            Reducer::Max => acc.max,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Accumulator {
    sum: f64,
    count: usize,
    max: Option<f64>,
}

impl Accumulator {
    fn push(&mut self, v: f64) {
        self.sum += v;
        self.count += 1;
        self.max = Some(self.max.map_or(v, |m| m.max(v)));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BucketKind {
    Day,
    Month,
    Year,
    Total,
}

impl BucketKind {
    pub fn label(self) -> &'static str {
        match self {
            BucketKind::Day => "Date",
            BucketKind::Month => "Month",
            BucketKind::Year => "Year",
            BucketKind::Total => "Period",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum BucketKey {
    Day(NaiveDate),
    Month(u32),
    Year(i32),
    Total,
}

impl fmt::Display for BucketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BucketKey::Day(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            BucketKey::Month(m) => {
                let name = MONTH_ABBR.get((*m as usize).wrapping_sub(1)).copied();
                f.write_str(name.unwrap_or("?"))
            }
            BucketKey::Year(y) => write!(f, "{}", y),
            BucketKey::Total => f.write_str("All"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateRow {
    pub key: BucketKey,
    pub values: Vec<Option<f64>>,
}

/// Rows keyed by bucket, one value per field in `fields` order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateTable {
    kind: BucketKind,
    fields: Vec<Field>,
    rows: Vec<AggregateRow>,
}

impl AggregateTable {
    pub fn kind(&self) -> BucketKind {
        self.kind
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn rows(&self) -> &[AggregateRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// All bucket values of one field, `None` if the field isn't in the table.
    pub fn column(&self, field: Field) -> Option<Vec<Option<f64>>> {
        let idx = self.fields.iter().position(|f| *f == field)?;
        Some(self.rows.iter().map(|r| r.values[idx]).collect())
    }

    pub fn value(&self, key: BucketKey, field: Field) -> Option<f64> {
        let idx = self.fields.iter().position(|f| *f == field)?;
        self.rows.iter().find(|r| r.key == key)?.values[idx]
    }

    /// Multiplies every value by `factor` (fractions to percent).
    pub fn scaled(mut self, factor: f64) -> Self {
        for row in &mut self.rows {
            for v in row.values.iter_mut().flatten() {
                *v *= factor;
            }
        }
        self
    }
}

fn aggregate<K>(
    view: &View<'_>,
    plan: &[(Field, Reducer)],
    kind: BucketKind,
    key_of: K,
) -> DashboardResult<AggregateTable>
where
    K: Fn(&PreparedRow) -> BucketKey,
{
    for (field, _) in plan {
        view.require(*field)?;
    }

    let mut buckets: BTreeMap<BucketKey, Vec<Accumulator>> = BTreeMap::new();
    for &row in view.rows() {
        let accs = buckets
            .entry(key_of(row))
            .or_insert_with(|| vec![Accumulator::default(); plan.len()]);
        for (acc, (field, _)) in accs.iter_mut().zip(plan) {
            if let Some(v) = row.get(*field) {
                acc.push(v);
            }
        }
    }

    let rows = buckets
        .into_iter()
        .map(|(key, accs)| AggregateRow {
            key,
            values: accs
                .iter()
                .zip(plan)
                .map(|(acc, (_, reducer))| reducer.finish(acc))
                .collect(),
        })
        .collect();

    Ok(AggregateTable {
        kind,
        fields: plan.iter().map(|(f, _)| *f).collect(),
        rows,
    })
}

/// Sums each field per calendar day. Days between the first and last day of
/// the view that have no rows appear with zero sums.
pub fn daily_sum(view: &View<'_>, fields: &[Field]) -> DashboardResult<AggregateTable> {
    let plan: Vec<(Field, Reducer)> = fields.iter().map(|f| (*f, Reducer::Sum)).collect();
    let mut table = aggregate(view, &plan, BucketKind::Day, |r| {
        BucketKey::Day(r.calendar().date)
    })?;

    let (Some(first), Some(last)) = (view.rows().first(), view.rows().last()) else {
        return Ok(table);
    };
    let mut filled = Vec::with_capacity(table.rows.len());
    let mut existing = table.rows.into_iter().peekable();
    let mut day = first.calendar().date;
    let last = last.calendar().date;
    while day <= last {
        match existing.peek() {
            Some(row) if row.key == BucketKey::Day(day) => {
                filled.extend(existing.next());
            }
            _ => filled.push(AggregateRow {
                key: BucketKey::Day(day),
                values: vec![Some(0.0); fields.len()],
            }),
        }
        match day.succ_opt() {
            Some(next) => day = next,
            None => break,
        }
    }
    table.rows = filled;
    Ok(table)
}

/// Averages each field per month-of-year, pooling all years in the view.
/// The result is a "typical month" profile, not any single calendar month.
pub fn monthly_mean(view: &View<'_>, fields: &[Field]) -> DashboardResult<AggregateTable> {
    let plan: Vec<(Field, Reducer)> = fields.iter().map(|f| (*f, Reducer::Mean)).collect();
    aggregate(view, &plan, BucketKind::Month, |r| {
        BucketKey::Month(r.calendar().month)
    })
}

pub fn yearly_agg(view: &View<'_>, plan: &[(Field, Reducer)]) -> DashboardResult<AggregateTable> {
    aggregate(view, plan, BucketKind::Year, |r| BucketKey::Year(r.calendar().year))
}

/// One-row table with the mean of each field over the whole view.
pub fn column_means(view: &View<'_>, fields: &[Field]) -> DashboardResult<AggregateTable> {
    let plan: Vec<(Field, Reducer)> = fields.iter().map(|f| (*f, Reducer::Mean)).collect();
    aggregate(view, &plan, BucketKind::Total, |_| BucketKey::Total)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CapacitySnapshot {
    pub timestamp: DateTime<Utc>,
    pub generating: f64,
    /// Installed capacity not currently generating, never negative.
    pub available: f64,
}

/// Generation against installed capacity at the latest row of the view.
/// `Ok(None)` when the view is empty or the latest row lacks either value.
pub fn capacity_snapshot(
    view: &View<'_>,
    generation: Field,
    capacity: Field,
) -> DashboardResult<Option<CapacitySnapshot>> {
    view.require(generation)?;
    view.require(capacity)?;
    let Some(latest) = view.last() else {
        return Ok(None);
    };
    Ok(match (latest.get(generation), latest.get(capacity)) {
        (Some(generating), Some(cap)) => Some(CapacitySnapshot {
            timestamp: latest.timestamp(),
            generating,
            available: (cap - generating).max(0.0),
        }),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DashboardError;
    use crate::preprocess::preprocess;
    use crate::types::{Observation, ObservationTable, PreparedTable};
    use chrono::TimeZone;

    fn table(rows: Vec<Observation>, fields: &[Field]) -> PreparedTable {
        preprocess(&ObservationTable::new(rows, fields.iter().copied().collect()))
    }

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> Observation {
        Observation::new(Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap())
    }

    fn day(y: i32, m: u32, d: u32) -> BucketKey {
        BucketKey::Day(NaiveDate::from_ymd_opt(y, m, d).unwrap())
    }

    #[test]
    fn daily_sum_of_one_day() {
        let rows = [1.0, 2.0, 3.0, 4.0]
            .iter()
            .enumerate()
            .map(|(i, v)| at(2020, 5, 1, 12, i as u32 * 15).with(Field::SolarGeneration, *v))
            .collect();
        let t = table(rows, &[Field::SolarGeneration]);
        let agg = daily_sum(&View::all(&t), &[Field::SolarGeneration]).unwrap();
        assert_eq!(agg.len(), 1);
        assert_eq!(agg.value(day(2020, 5, 1), Field::SolarGeneration), Some(10.0));
    }

    #[test]
    fn daily_sum_fills_gap_days_with_zero() {
        let rows = vec![
            at(2020, 5, 1, 0, 0).with(Field::LoadActual, 5.0),
            at(2020, 5, 3, 0, 0).with(Field::LoadActual, 7.0),
        ];
        let t = table(rows, &[Field::LoadActual]);
        let agg = daily_sum(&View::all(&t), &[Field::LoadActual]).unwrap();
        assert_eq!(
            agg.column(Field::LoadActual).unwrap(),
            vec![Some(5.0), Some(0.0), Some(7.0)]
        );
        assert_eq!(agg.rows()[1].key, day(2020, 5, 2));
    }

    #[test]
    fn yearly_max_for_capacity() {
        let rows = [100.0, 100.0, 150.0, 150.0]
            .iter()
            .enumerate()
            .map(|(i, v)| at(2019, 1 + i as u32 * 3, 1, 0, 0).with(Field::SolarCapacity, *v))
            .collect();
        let t = table(rows, &[Field::SolarCapacity]);
        let view = View::all(&t);
        let max = yearly_agg(&view, &[(Field::SolarCapacity, Reducer::Max)]).unwrap();
        assert_eq!(max.value(BucketKey::Year(2019), Field::SolarCapacity), Some(150.0));
        let mean = yearly_agg(&view, &[(Field::SolarCapacity, Reducer::Mean)]).unwrap();
        assert_eq!(mean.value(BucketKey::Year(2019), Field::SolarCapacity), Some(125.0));
    }

    #[test]
    fn yearly_mixes_reducers_per_field() {
        let rows = vec![
            at(2019, 1, 1, 0, 0)
                .with(Field::WindOnshoreGeneration, 10.0)
                .with(Field::WindCapacity, 50.0),
            at(2019, 6, 1, 0, 0)
                .with(Field::WindOnshoreGeneration, 30.0)
                .with(Field::WindCapacity, 60.0),
            at(2020, 1, 1, 0, 0)
                .with(Field::WindOnshoreGeneration, 5.0)
                .with(Field::WindCapacity, 70.0),
        ];
        let t = table(rows, &[Field::WindOnshoreGeneration, Field::WindCapacity]);
        let agg = yearly_agg(
            &View::all(&t),
            &[
                (Field::WindOnshoreGeneration, Reducer::Mean),
                (Field::WindCapacity, Reducer::Max),
            ],
        )
        .unwrap();
        assert_eq!(agg.len(), 2);
        assert_eq!(agg.value(BucketKey::Year(2019), Field::WindOnshoreGeneration), Some(20.0));
        assert_eq!(agg.value(BucketKey::Year(2019), Field::WindCapacity), Some(60.0));
        assert_eq!(agg.value(BucketKey::Year(2020), Field::WindCapacity), Some(70.0));
    }

    #[test]
    fn monthly_mean_pools_years() {
        let rows = vec![
            at(2019, 7, 1, 0, 0).with(Field::SolarGeneration, 10.0),
            at(2020, 7, 1, 0, 0).with(Field::SolarGeneration, 20.0),
            at(2020, 1, 1, 0, 0).with(Field::SolarGeneration, 2.0),
        ];
        let t = table(rows, &[Field::SolarGeneration]);
        let agg = monthly_mean(&View::all(&t), &[Field::SolarGeneration]).unwrap();
        assert_eq!(agg.rows()[0].key, BucketKey::Month(1));
        assert_eq!(agg.value(BucketKey::Month(7), Field::SolarGeneration), Some(15.0));
        assert_eq!(BucketKey::Month(7).to_string(), "Jul");
    }

    #[test]
    fn mean_skips_missing_values() {
        let rows = vec![
            at(2020, 1, 1, 0, 0).with(Field::SolarProfile, 0.2),
            at(2020, 1, 1, 0, 15),
            at(2020, 1, 1, 0, 30).with(Field::SolarProfile, 0.4),
        ];
        let t = table(rows, &[Field::SolarProfile]);
        let agg = column_means(&View::all(&t), &[Field::SolarProfile]).unwrap();
        let v = agg.value(BucketKey::Total, Field::SolarProfile).unwrap();
        assert!((v - 0.3).abs() < 1e-12);
        let pct = agg.scaled(100.0);
        let v = pct.value(BucketKey::Total, Field::SolarProfile).unwrap();
        assert!((v - 30.0).abs() < 1e-9);
    }

    #[test]
    fn empty_view_gives_empty_tables() {
        let t = table(Vec::new(), &[Field::SolarGeneration, Field::SolarCapacity]);
        let view = View::all(&t);
        assert!(daily_sum(&view, &[Field::SolarGeneration]).unwrap().is_empty());
        assert!(monthly_mean(&view, &[Field::SolarGeneration]).unwrap().is_empty());
        assert!(yearly_agg(&view, &[(Field::SolarCapacity, Reducer::Max)])
            .unwrap()
            .is_empty());
        assert!(column_means(&view, &[Field::SolarGeneration]).unwrap().is_empty());
        assert_eq!(
            capacity_snapshot(&view, Field::SolarGeneration, Field::SolarCapacity).unwrap(),
            None
        );
    }

    #[test]
    fn missing_column_propagates() {
        let t = table(
            vec![at(2020, 1, 1, 0, 0).with(Field::SolarGeneration, 1.0)],
            &[Field::SolarGeneration],
        );
        let err = daily_sum(&View::all(&t), &[Field::SolarGeneration, Field::LoadActual])
            .unwrap_err();
        assert!(matches!(err, DashboardError::MissingColumn(Field::LoadActual)));
    }

    #[test]
    fn snapshot_uses_latest_row_and_clamps() {
        let rows = vec![
            at(2020, 1, 1, 0, 0)
                .with(Field::SolarGeneration, 10.0)
                .with(Field::SolarCapacity, 50.0),
            at(2020, 1, 1, 0, 15)
                .with(Field::SolarGeneration, 60.0)
                .with(Field::SolarCapacity, 50.0),
        ];
        let t = table(rows, &[Field::SolarGeneration, Field::SolarCapacity]);
        let snap = capacity_snapshot(&View::all(&t), Field::SolarGeneration, Field::SolarCapacity)
            .unwrap()
            .unwrap();
        assert_eq!(snap.generating, 60.0);
        assert_eq!(snap.available, 0.0);
    }

    #[test]
    fn natural_reducers() {
        assert_eq!(Reducer::natural_for(Field::LoadActual), Reducer::Sum);
        assert_eq!(Reducer::natural_for(Field::WindOffshoreCapacity), Reducer::Max);
        assert_eq!(Reducer::natural_for(Field::WindProfile), Reducer::Mean);
    }
}
