//! Flight delay classifier served over HTTP.

pub mod api;
pub mod config;
pub mod error;
pub mod features;
pub mod model;
pub mod types;

pub use api::{router, AppState};
pub use config::{AppConfig, ClassifierConfig};
pub use error::{ModelError, PredictError};
pub use features::{FeatureMatrix, FeatureSchema, FEATURE_COLUMNS, N_FEATURES};
pub use model::{ClassifierState, DelayModel, TARGET_COLUMN};
pub use types::{FlightRecord, Label, PredictRequest, PredictResponse};
