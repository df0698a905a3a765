//! Aggregation and KPI pipeline behind the German energy dashboard.
//!
//! Loader → Preprocessor → Filter → {Aggregator, KPI Calculator} →
//! presentation. See [`dashboard::Dashboard`] for one full cycle.

pub mod aggregate;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod filter;
pub mod kpi;
pub mod loader;
pub mod output;
pub mod preprocess;
pub mod reports;
pub mod types;
pub mod util;

pub use dashboard::{Dashboard, DashboardRequest, DashboardSnapshot};
pub use error::{DashboardError, DashboardResult, ParseError};
