use serde::{Deserialize, Serialize};

use crate::error::PredictError;

/// Delay label: 1 when the flight left more than 15 minutes late.
pub type Label = u8;

pub const FLIGHT_TYPES: [&str; 2] = ["N", "I"];

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct FlightRecord {
    #[serde(rename = "OPERA")]
    pub opera: String,
    #[serde(rename = "TIPOVUELO")]
    pub tipo_vuelo: String,
    #[serde(rename = "MES")]
    pub mes: i64,
    // training-only fields, used to derive the label
    #[serde(rename = "Fecha-I", default, skip_serializing_if = "Option::is_none")]
    pub fecha_i: Option<String>,
    #[serde(rename = "Fecha-O", default, skip_serializing_if = "Option::is_none")]
    pub fecha_o: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay: Option<Label>,
}

impl FlightRecord {
    pub fn new(opera: impl Into<String>, tipo_vuelo: impl Into<String>, mes: i64) -> Self {
        Self {
            opera: opera.into(),
            tipo_vuelo: tipo_vuelo.into(),
            mes,
            fecha_i: None,
            fecha_o: None,
            delay: None,
        }
    }

    /// Attach scheduled/actual departure timestamps.
    pub fn with_times(mut self, fecha_i: impl Into<String>, fecha_o: impl Into<String>) -> Self {
        self.fecha_i = Some(fecha_i.into());
        self.fecha_o = Some(fecha_o.into());
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if !(1..=12).contains(&self.mes) {
            return Err(format!("MES must be between 1 and 12 (got {})", self.mes));
        }
        if !FLIGHT_TYPES.contains(&self.tipo_vuelo.as_str()) {
            return Err(format!(
                "TIPOVUELO must be 'N' or 'I' (got '{}')",
                self.tipo_vuelo
            ));
        }
        if self.opera.trim().is_empty() {
            return Err("OPERA must not be empty".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    // a missing key is treated like an empty batch
    #[serde(default)]
    pub flights: Vec<FlightRecord>,
}

impl PredictRequest {
    /// Checks every record before anything reaches the model.
    pub fn validate(&self) -> Result<(), PredictError> {
        if self.flights.is_empty() {
            return Err(PredictError::Validation(
                "flight list must not be empty".to_string(),
            ));
        }
        for (i, flight) in self.flights.iter().enumerate() {
            flight
                .validate()
                .map_err(|e| PredictError::Validation(format!("flight {}: {}", i + 1, e)))?;
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct PredictResponse {
    pub predict: Vec<Label>,
}
