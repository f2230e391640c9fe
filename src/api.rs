use axum::{
    extract::{rejection::JsonRejection, State},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::error::PredictError;
use crate::model::DelayModel;
use crate::types::{Label, PredictRequest, PredictResponse};

pub const SERVICE_TITLE: &str = "Flight Delay Prediction API";

// ---------- Server state ----------

#[derive(Clone)]
pub struct AppState {
    pub model: Arc<DelayModel>,
    pub log_pred: bool,
}

impl AppState {
    pub fn new(model: DelayModel) -> Self {
        Self {
            model: Arc::new(model),
            log_pred: false,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/predict", post(predict))
        .route("/health", get(health))
        .with_state(state)
}

// ---------- Handlers ----------

async fn predict(
    State(state): State<AppState>,
    payload: Result<Json<PredictRequest>, JsonRejection>,
) -> Result<Json<PredictResponse>, PredictError> {
    let Json(payload) = payload.map_err(|rejection| {
        warn!("rejected request body: {}", rejection.body_text());
        PredictError::Malformed(rejection.body_text())
    })?;
    info!("predict request with {} flights", payload.flights.len());

    let model = Arc::clone(&state.model);
    let log_pred = state.log_pred;
    let labels = tokio::task::spawn_blocking(move || predict_batch(&model, &payload, log_pred))
        .await
        .map_err(|e| {
            error!("prediction task failed: {}", e);
            PredictError::Internal(e.to_string())
        })??;

    Ok(Json(PredictResponse { predict: labels }))
}

/// Validates the whole batch, then encodes and classifies it. Nothing is
/// encoded when any flight fails validation.
pub fn predict_batch(
    model: &DelayModel,
    request: &PredictRequest,
    log_pred: bool,
) -> Result<Vec<Label>, PredictError> {
    if let Err(e) = request.validate() {
        warn!("validation failed: {}", e);
        return Err(e);
    }

    let features = model.encode(&request.flights);
    if log_pred {
        info!(
            "encoded rows={} cols={} nonzero={} trained={} threshold={}",
            features.len(),
            features.columns().len(),
            features.nonzero(),
            model.is_trained(),
            model.config().threshold
        );
    }
    let labels = model.predict(&features);

    let n = request.flights.len();
    if labels.len() != n {
        error!("classifier returned {} labels for {} flights", labels.len(), n);
        return Err(PredictError::Internal(format!(
            "expected {} labels, got {}",
            n,
            labels.len()
        )));
    }
    Ok(labels)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "OK" }))
}
