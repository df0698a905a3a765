use crate::error::{DashboardError, DashboardResult};
use crate::filter::DateRange;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Which years the year selector starts with.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum YearSelection {
    /// The `n` latest years present in the data.
    MostRecent(usize),
    /// A fixed list; years absent from the data are dropped.
    Explicit(Vec<i32>),
    /// No selection, i.e. every year.
    All,
}

impl Default for YearSelection {
    fn default() -> Self {
        YearSelection::MostRecent(2)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub default_years: YearSelection,
    /// Initial date range; the full data span when unset.
    pub date_range_default: Option<DateRange>,
    /// Where CSV and JSON exports are written.
    pub output_dir: PathBuf,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            default_years: YearSelection::default(),
            date_range_default: None,
            output_dir: PathBuf::from("."),
        }
    }
}

impl DashboardConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> DashboardResult<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> DashboardResult<Self> {
        let config: DashboardConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> DashboardResult<()> {
        if self.default_years == YearSelection::MostRecent(0) {
            return Err(DashboardError::Config(
                "default_years.most_recent must be at least 1; use \"all\" for no selection"
                    .to_string(),
            ));
        }
        Ok(())
    }

    /// Initial year selection given the sorted years present in the data.
    pub fn resolve_years(&self, available: &[i32]) -> BTreeSet<i32> {
        match &self.default_years {
            YearSelection::MostRecent(n) => available.iter().rev().take(*n).copied().collect(),
            YearSelection::Explicit(years) => {
                let (kept, dropped): (Vec<i32>, Vec<i32>) =
                    years.iter().copied().partition(|y| available.contains(y));
                if !dropped.is_empty() {
                    warn!(?dropped, "configured years not present in data");
                }
                kept.into_iter().collect()
            }
            YearSelection::All => BTreeSet::new(),
        }
    }

    /// Initial date range, clamped to the data span `full`.
    pub fn resolve_date_range(&self, full: DateRange) -> DateRange {
        self.date_range_default
            .map(|r| r.clamp(full))
            .unwrap_or(full)
    }
}
