//! Threat forecast handler

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use chrono::Utc;
use uuid::Uuid;

use crate::{AppState, AppError, AppResult};
use crate::forecast::SeasonalModel;
use crate::models::{ForecastResult, PredictRequest};
use crate::pipeline;

/// Forecast per-type totals over the requested horizon.
///
/// Malformed bodies are not rejected at the transport level: the rejection
/// text is returned as an `{"error": ...}` body like every other failure.
pub async fn predict(
    State(state): State<AppState>,
    payload: Result<Json<PredictRequest>, JsonRejection>,
) -> AppResult<Json<Vec<ForecastResult>>> {
    let Json(request) = payload.map_err(|rejection| AppError::Unclassified(rejection.body_text()))?;

    let span = tracing::info_span!(
        "predict",
        request_id = %Uuid::new_v4(),
        records = request.data.len(),
        horizon = request.forecast_days,
    );
    let model = SeasonalModel::new(state.config.forecast.clone());

    // Model fitting is CPU-bound; keep it off the async workers
    let results = tokio::task::spawn_blocking(move || {
        let _entered = span.enter();
        let results = pipeline::predict(&request, &model, Utc::now().date_naive())?;
        tracing::info!(types = results.len(), "Prediction complete");
        Ok::<_, AppError>(results)
    })
    .await??;

    Ok(Json(results))
}
