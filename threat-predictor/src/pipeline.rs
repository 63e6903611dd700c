//! Forecast pipeline: validate, group, forecast, aggregate

use std::collections::HashMap;

use chrono::NaiveDate;
use validator::Validate;

use crate::error::{AppError, AppResult, EMPTY_TYPE_MESSAGE, INVALID_REQUEST_MESSAGE};
use crate::forecast::{self, DegradeReason, ForecastOutcome, Forecaster};
use crate::models::{ForecastResult, PredictRequest, ThreatRecord, ThreatSeries};

/// Reject empty data, a horizon below one day, and records without a type
pub fn validate(request: &PredictRequest) -> AppResult<()> {
    request
        .validate()
        .map_err(|_| AppError::InvalidRequest(INVALID_REQUEST_MESSAGE.to_string()))?;

    request
        .data
        .iter()
        .try_for_each(|record| record.validate())
        .map_err(|_| AppError::InvalidRequest(EMPTY_TYPE_MESSAGE.to_string()))
}

/// Group records by type (first-appearance order) and build one series per group
pub fn build_series(records: &[ThreatRecord], today: NaiveDate) -> Vec<ThreatSeries> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<(&str, Vec<&ThreatRecord>)> = Vec::new();

    for record in records {
        let slot = *index.entry(record.threat_type.as_str()).or_insert_with(|| {
            groups.push((record.threat_type.as_str(), Vec::new()));
            groups.len() - 1
        });
        groups[slot].1.push(record);
    }

    groups
        .into_iter()
        .map(|(threat_type, members)| {
            let series = ThreatSeries::from_records(threat_type, &members, today);
            if series.synthetic_dates {
                tracing::debug!(
                    threat_type,
                    points = series.len(),
                    "Unparseable date in group, using synthetic daily dates"
                );
            }
            series
        })
        .collect()
}

/// Sort descending by forecast; ties keep collection order
pub fn aggregate(mut results: Vec<ForecastResult>) -> Vec<ForecastResult> {
    results.sort_by(|a, b| b.forecast.cmp(&a.forecast));
    results
}

/// Run the whole pipeline for one request
pub fn predict<F: Forecaster + ?Sized>(
    request: &PredictRequest,
    forecaster: &F,
    today: NaiveDate,
) -> AppResult<Vec<ForecastResult>> {
    validate(request)?;

    let horizon = request.forecast_days;
    let mut degraded = 0usize;
    let results: Vec<ForecastResult> = build_series(&request.data, today)
        .iter()
        .map(|series| {
            let outcome = forecast::forecast_series(forecaster, series, horizon);
            log_outcome(series, &outcome);
            if outcome.is_degraded() {
                degraded += 1;
            }

            ForecastResult {
                threat_type: series.threat_type.clone(),
                forecast: outcome.value(),
            }
        })
        .collect();

    tracing::debug!(series = results.len(), degraded, "Forecasts computed");
    Ok(aggregate(results))
}

fn log_outcome(series: &ThreatSeries, outcome: &ForecastOutcome) {
    let threat_type = series.threat_type.as_str();
    match outcome {
        ForecastOutcome::Modeled { value } => {
            tracing::debug!(threat_type, points = series.len(), forecast = value, "Model forecast");
        }
        ForecastOutcome::Degraded { value, reason: DegradeReason::SparseData { points } } => {
            tracing::debug!(threat_type, points, forecast = value, "Sparse series, mean forecast");
        }
        ForecastOutcome::Degraded { value, reason: DegradeReason::ModelFailure(err) } => {
            tracing::warn!(
                threat_type,
                points = series.len(),
                forecast = value,
                error = %err,
                "Model failed, mean forecast"
            );
        }
    }
}
