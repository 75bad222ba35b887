use std::collections::HashMap;

use crate::consts::LABELS_TO_IGNORE;

pub mod housing;

/// One row of the dataset, holding only the cells that parsed as numbers
pub type Record = HashMap<String, f64>;

pub struct HousingData {
    pub columns: Vec<String>,
    pub records: Vec<Record>,
}

impl HousingData {
    /// Columns the user may train a model on, in header order
    pub fn available_features(&self) -> Vec<&str> {
        self.columns
            .iter()
            .map(String::as_str)
            .filter(|column| !LABELS_TO_IGNORE.contains(column))
            .collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|column| column == name)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
