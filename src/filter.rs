use crate::error::{DashboardError, DashboardResult};
use crate::types::{Field, PreparedRow, PreparedTable};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Inclusive calendar-date range. `start > end` is allowed and selects
/// nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// First to last date present in the table, `None` when it is empty.
    pub fn full(table: &PreparedTable) -> Option<Self> {
        let first = table.rows().first()?.calendar().date;
        let last = table.rows().last()?.calendar().date;
        Some(Self::new(first, last))
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn is_empty(&self) -> bool {
        self.start > self.end
    }

    /// Restricts the range to `bounds`, as the date picker does.
    pub fn clamp(self, bounds: DateRange) -> Self {
        Self::new(self.start.max(bounds.start), self.end.min(bounds.end))
    }
}

/// A read-only selection of prepared rows. Filtering always produces a new
/// view; the underlying table is never touched.
#[derive(Debug, Clone)]
pub struct View<'a> {
    rows: Vec<&'a PreparedRow>,
    columns: &'a BTreeSet<Field>,
}

impl<'a> View<'a> {
    pub fn all(table: &'a PreparedTable) -> Self {
        Self {
            rows: table.rows().iter().collect(),
            columns: table.columns(),
        }
    }

    pub fn rows(&self) -> &[&'a PreparedRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, field: Field) -> bool {
        self.columns.contains(&field)
    }

    pub fn require(&self, field: Field) -> DashboardResult<()> {
        if self.has_column(field) {
            Ok(())
        } else {
            Err(DashboardError::MissingColumn(field))
        }
    }

    /// Present values of one column, skipping empty cells.
    pub fn values(&self, field: Field) -> DashboardResult<Vec<f64>> {
        self.require(field)?;
        Ok(self.rows.iter().filter_map(|r| r.get(field)).collect())
    }

    pub fn last(&self) -> Option<&'a PreparedRow> {
        self.rows.last().copied()
    }

    pub fn filter_by_date_range(&self, start: NaiveDate, end: NaiveDate) -> View<'a> {
        let range = DateRange::new(start, end);
        self.select(|r| range.contains(r.calendar().date))
    }

    pub fn filter_by_years(&self, years: &BTreeSet<i32>) -> View<'a> {
        if years.is_empty() {
            return self.clone();
        }
        self.select(|r| years.contains(&r.calendar().year))
    }

    fn select<F>(&self, keep: F) -> View<'a>
    where
        F: Fn(&PreparedRow) -> bool,
    {
        View {
            rows: self.rows.iter().copied().filter(|r| keep(*r)).collect(),
            columns: self.columns,
        }
    }
}

/// Rows whose date lies in `[start, end]`. An inverted range is empty.
pub fn filter_by_date_range(table: &PreparedTable, start: NaiveDate, end: NaiveDate) -> View<'_> {
    View::all(table).filter_by_date_range(start, end)
}

/// Rows whose year is in `years`. An empty selection means the whole table.
pub fn filter_by_years<'a>(table: &'a PreparedTable, years: &BTreeSet<i32>) -> View<'a> {
    View::all(table).filter_by_years(years)
}

/// Sorted distinct years, for the year selector.
pub fn available_years(table: &PreparedTable) -> Vec<i32> {
    let years: BTreeSet<i32> = table.rows().iter().map(|r| r.calendar().year).collect();
    years.into_iter().collect()
}
