//! Calendar-field derivation.
//!
//! Derived fields are a pure function of each row's timestamp, so running
//! the preprocessor over its own output reproduces it exactly.

use crate::types::{ObservationTable, PreparedRow, PreparedTable};

pub trait Preprocess {
    fn preprocess(&self) -> PreparedTable;
}

impl Preprocess for ObservationTable {
    fn preprocess(&self) -> PreparedTable {
        PreparedTable {
            rows: self.rows().iter().cloned().map(PreparedRow::new).collect(),
            columns: self.columns().clone(),
        }
    }
}

impl Preprocess for PreparedTable {
    fn preprocess(&self) -> PreparedTable {
        PreparedTable {
            rows: self
                .rows()
                .iter()
                .map(|r| PreparedRow::new(r.observation().clone()))
                .collect(),
            columns: self.columns().clone(),
        }
    }
}

pub fn preprocess<T: Preprocess + ?Sized>(table: &T) -> PreparedTable {
    table.preprocess()
}
