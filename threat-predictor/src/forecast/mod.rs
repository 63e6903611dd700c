//! Per-series forecasting
//!
//! Rules, in order:
//! 1. fewer than two points: `floor(mean(counts) * horizon)`
//! 2. otherwise: sum of model predictions over the horizon, truncated
//! 3. model failure of any kind: same mean formula as rule 1
//!
//! Which rule produced the number is returned as a [`ForecastOutcome`] so that
//! callers can log degraded forecasts without ever failing on them.

pub mod model;

use std::panic::{self, AssertUnwindSafe};

use crate::error::panic_message;
use crate::models::ThreatSeries;

pub use model::{ModelError, SeasonalModel};

/// Minimum number of points before the statistical model is attempted
pub const MIN_MODEL_POINTS: usize = 2;

/// Statistical backend that predicts the summed count over a horizon
pub trait Forecaster {
    fn forecast_total(&self, series: &ThreatSeries, horizon_days: i64) -> Result<f64, ModelError>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum DegradeReason {
    /// Too few points to fit a model
    SparseData { points: usize },
    /// The model was attempted and failed
    ModelFailure(ModelError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ForecastOutcome {
    Modeled { value: u64 },
    Degraded { value: u64, reason: DegradeReason },
}

impl ForecastOutcome {
    pub fn value(&self) -> u64 {
        match self {
            ForecastOutcome::Modeled { value } | ForecastOutcome::Degraded { value, .. } => *value,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, ForecastOutcome::Degraded { .. })
    }
}

/// Forecast one series. Never fails; model errors and panics degrade to the mean formula.
pub fn forecast_series<F: Forecaster + ?Sized>(
    forecaster: &F,
    series: &ThreatSeries,
    horizon_days: i64,
) -> ForecastOutcome {
    let counts = series.counts();

    if series.len() < MIN_MODEL_POINTS {
        return ForecastOutcome::Degraded {
            value: mean_forecast(&counts, horizon_days),
            reason: DegradeReason::SparseData { points: series.len() },
        };
    }

    let attempt = panic::catch_unwind(AssertUnwindSafe(|| {
        forecaster.forecast_total(series, horizon_days)
    }))
    .unwrap_or_else(|err| Err(ModelError::Panicked(panic_message(err.as_ref()))));

    match attempt {
        Ok(total) => ForecastOutcome::Modeled { value: to_count(total) },
        Err(err) => ForecastOutcome::Degraded {
            value: mean_forecast(&counts, horizon_days),
            reason: DegradeReason::ModelFailure(err),
        },
    }
}

/// `floor(mean(counts) * horizon)`, 0 for an empty slice
pub fn mean_forecast(counts: &[u64], horizon_days: i64) -> u64 {
    if counts.is_empty() {
        return 0;
    }
    let mean = counts.iter().map(|&c| c as f64).sum::<f64>() / counts.len() as f64;
    to_count(mean * horizon_days as f64)
}

/// Truncate toward zero and clamp into `u64`; negative and non-finite become 0
pub fn to_count(value: f64) -> u64 {
    if value.is_finite() && value > 0.0 {
        // `as` saturates at u64::MAX
        value.trunc() as u64
    } else {
        0
    }
}
