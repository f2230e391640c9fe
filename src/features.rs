//! One-hot encoding of flight records onto the fixed classifier schema.
//!
//! Each categorical field expands to `<field>_<value>` columns; only the
//! columns in [`FEATURE_COLUMNS`] are kept. Unseen categories are dropped
//! and allowlisted columns that never show up stay zero.

use std::collections::HashMap;

use crate::types::FlightRecord;

pub const N_FEATURES: usize = 10;

/// Authoritative column order the classifier is trained on.
pub const FEATURE_COLUMNS: [&str; N_FEATURES] = [
    "OPERA_Latin American Wings",
    "MES_7",
    "MES_10",
    "OPERA_Grupo LATAM",
    "MES_12",
    "TIPOVUELO_I",
    "MES_4",
    "MES_11",
    "OPERA_Sky Airline",
    "OPERA_Copa Air",
];

pub type FeatureRow = [f32; N_FEATURES];

/// Column name -> position, built once.
#[derive(Debug, Clone)]
pub struct FeatureSchema {
    index: HashMap<String, usize>,
}

impl Default for FeatureSchema {
    fn default() -> Self {
        Self::new()
    }
}

impl FeatureSchema {
    pub fn new() -> Self {
        let index = FEATURE_COLUMNS
            .iter()
            .enumerate()
            .map(|(i, name)| (name.to_string(), i))
            .collect();
        Self { index }
    }

    pub fn position(&self, column: &str) -> Option<usize> {
        self.index.get(column).copied()
    }

    /// Dummy column names a record lights up, before projection.
    pub fn dummies(record: &FlightRecord) -> [String; 3] {
        [
            format!("OPERA_{}", record.opera),
            format!("TIPOVUELO_{}", record.tipo_vuelo),
            format!("MES_{}", record.mes),
        ]
    }

    pub fn encode_row(&self, record: &FlightRecord) -> FeatureRow {
        let mut row = [0.0; N_FEATURES];
        for name in Self::dummies(record) {
            if let Some(i) = self.position(&name) {
                row[i] = 1.0;
            }
        }
        row
    }

    pub fn encode(&self, records: &[FlightRecord]) -> FeatureMatrix {
        FeatureMatrix {
            rows: records.iter().map(|r| self.encode_row(r)).collect(),
        }
    }
}

/// Encoded batch; always exactly [`N_FEATURES`] columns wide.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureMatrix {
    rows: Vec<FeatureRow>,
}

impl FeatureMatrix {
    pub fn from_rows(rows: Vec<FeatureRow>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[FeatureRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn columns(&self) -> &'static [&'static str; N_FEATURES] {
        &FEATURE_COLUMNS
    }

    pub fn column(&self, name: &str) -> Option<Vec<f32>> {
        let i = FEATURE_COLUMNS.iter().position(|c| *c == name)?;
        Some(self.rows.iter().map(|r| r[i]).collect())
    }

    pub fn nonzero(&self) -> usize {
        self.rows
            .iter()
            .flat_map(|r| r.iter())
            .filter(|x| **x != 0.0)
            .count()
    }
}
