//! Seasonal additive regression model
//!
//! `y(t) = trend(t) + seasonality(t)`, fitted as a MAP estimate under
//! Gaussian priors (ridge regression with per-column penalties):
//!
//! - trend: intercept + slope + piecewise-linear changepoint terms
//! - seasonality: Fourier series for daily, weekly and yearly periods
//!
//! Observations are scaled to `[0, 1]` by their absolute maximum and time to
//! `[0, 1]` by the history span, so the prior scales are unit-free.

use std::f64::consts::PI;

use chrono::{Duration, NaiveDate};
use nalgebra::{DMatrix, DVector};
use thiserror::Error;

use crate::config::ForecastConfig;
use crate::models::ThreatSeries;
use super::Forecaster;

/// Minimum history span (days) before weekly seasonality is fitted
const WEEKLY_MIN_SPAN_DAYS: i64 = 14;
/// Minimum history span (days) before yearly seasonality is fitted
const YEARLY_MIN_SPAN_DAYS: i64 = 730;

/// Prior scale of the intercept and base slope
const TREND_PRIOR_SCALE: f64 = 5.0;
/// Initial noise scale for the alternating MAP solve
const INITIAL_SIGMA: f64 = 0.5;
/// Noise variance floor, keeps the system well conditioned on exact fits
const MIN_SIGMA_SQ: f64 = 1e-4;
const NOISE_ITERATIONS: usize = 4;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("insufficient data: need at least {required} points, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    #[error("degenerate timeline: all observations share one date")]
    DegenerateTimeline,

    #[error("normal equations are not positive definite")]
    SingularSystem,

    #[error("model produced a non-finite value")]
    NonFinite,

    #[error("forecast horizon of {0} days is out of range")]
    HorizonOutOfRange(i64),

    #[error("model panicked: {0}")]
    Panicked(String),
}

/// One Fourier seasonal component
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Seasonality {
    /// Period in days
    pub period: f64,
    pub fourier_order: usize,
}

impl Seasonality {
    pub const DAILY: Seasonality = Seasonality { period: 1.0, fourier_order: 4 };
    pub const WEEKLY: Seasonality = Seasonality { period: 7.0, fourier_order: 3 };
    pub const YEARLY: Seasonality = Seasonality { period: 365.25, fourier_order: 10 };

    fn width(&self) -> usize {
        2 * self.fourier_order
    }

    /// Whole days after which every term repeats. Periods are whole or quarter days.
    fn cycle_days(&self) -> i64 {
        let quarters = ((self.period * 4.0).round() as i64).max(1);
        let shared = match quarters % 4 {
            0 => 4,
            2 => 2,
            _ => 1,
        };
        quarters / shared
    }
}

/// Unfitted model; holds only configuration and is cheap to build per request
#[derive(Debug, Clone, Default)]
pub struct SeasonalModel {
    config: ForecastConfig,
}

/// Design-matrix layout and fitted coefficients
#[derive(Debug, Clone)]
pub struct FittedModel {
    start: NaiveDate,
    last: NaiveDate,
    span_days: f64,
    y_scale: f64,
    changepoints: Vec<f64>,
    seasonalities: Vec<Seasonality>,
    beta: DVector<f64>,
}

impl SeasonalModel {
    pub fn new(config: ForecastConfig) -> Self {
        Self { config }
    }

    /// Seasonal components that apply to a history of `span_days`
    pub fn seasonalities_for(&self, span_days: i64) -> Vec<Seasonality> {
        let mut out = Vec::with_capacity(3);
        if self.config.daily_seasonality {
            out.push(Seasonality::DAILY);
        }
        if span_days >= WEEKLY_MIN_SPAN_DAYS {
            out.push(Seasonality::WEEKLY);
        }
        if span_days >= YEARLY_MIN_SPAN_DAYS {
            out.push(Seasonality::YEARLY);
        }
        out
    }

    pub fn fit(&self, series: &ThreatSeries) -> Result<FittedModel, ModelError> {
        let n = series.len();
        if n < 2 {
            return Err(ModelError::InsufficientData { required: 2, actual: n });
        }

        let (start, last) = match (series.first_date(), series.last_date()) {
            (Some(s), Some(l)) => (s, l),
            _ => return Err(ModelError::InsufficientData { required: 2, actual: n }),
        };

        let span = series.span_days();
        if span <= 0 {
            return Err(ModelError::DegenerateTimeline);
        }
        let span_days = span as f64;

        let y_max = series.points.iter().map(|p| p.count).max().unwrap_or(0) as f64;
        let y_scale = if y_max > 0.0 { y_max } else { 1.0 };

        let t: Vec<f64> = series
            .points
            .iter()
            .map(|p| (p.date - start).num_days() as f64 / span_days)
            .collect();

        let mut model = FittedModel {
            start,
            last,
            span_days,
            y_scale,
            changepoints: place_changepoints(&t, self.config.n_changepoints, self.config.changepoint_range),
            seasonalities: self.seasonalities_for(span),
            beta: DVector::zeros(0),
        };

        let x = DMatrix::from_fn(n, model.width(), |i, j| model.feature(series.points[i].date, j));
        let y = DVector::from_iterator(n, series.points.iter().map(|p| p.count as f64 / y_scale));
        let inv_prior = model.inverse_prior_variances(&self.config);

        let xtx = x.transpose() * &x;
        let xty = x.transpose() * &y;

        let mut sigma_sq = INITIAL_SIGMA * INITIAL_SIGMA;
        let mut beta = DVector::zeros(model.width());

        for _ in 0..NOISE_ITERATIONS {
            let mut system = xtx.clone();
            for (j, w) in inv_prior.iter().enumerate() {
                system[(j, j)] += sigma_sq * w;
            }

            beta = system
                .cholesky()
                .ok_or(ModelError::SingularSystem)?
                .solve(&xty);

            let residuals = &y - &x * &beta;
            sigma_sq = (residuals.norm_squared() / n as f64).max(MIN_SIGMA_SQ);
        }

        if beta.iter().any(|b| !b.is_finite()) {
            return Err(ModelError::NonFinite);
        }

        model.beta = beta;
        Ok(model)
    }
}

impl Forecaster for SeasonalModel {
    fn forecast_total(&self, series: &ThreatSeries, horizon_days: i64) -> Result<f64, ModelError> {
        self.fit(series)?.predict_total(horizon_days)
    }
}

impl FittedModel {
    fn width(&self) -> usize {
        2 + self.changepoints.len() + self.seasonalities.iter().map(Seasonality::width).sum::<usize>()
    }

    /// Value of column `j` of the design matrix for `date`
    fn feature(&self, date: NaiveDate, j: usize) -> f64 {
        let t = (date - self.start).num_days() as f64 / self.span_days;

        if j == 0 {
            return 1.0;
        }
        if j == 1 {
            return t;
        }

        let mut j = j - 2;
        if let Some(s) = self.changepoints.get(j) {
            return (t - s).max(0.0);
        }
        j -= self.changepoints.len();

        // NaiveDate::default() is the Unix epoch
        let epoch_days = (date - NaiveDate::default()).num_days() as f64;
        for season in &self.seasonalities {
            if j < season.width() {
                let k = (j / 2 + 1) as f64;
                let angle = 2.0 * PI * k * epoch_days / season.period;
                return if j % 2 == 0 { angle.sin() } else { angle.cos() };
            }
            j -= season.width();
        }

        0.0
    }

    fn inverse_prior_variances(&self, config: &ForecastConfig) -> Vec<f64> {
        let inv = |scale: f64| 1.0 / (scale * scale);
        let seasonal_width = self.width() - 2 - self.changepoints.len();

        std::iter::repeat(inv(TREND_PRIOR_SCALE))
            .take(2)
            .chain(std::iter::repeat(inv(config.changepoint_prior_scale)).take(self.changepoints.len()))
            .chain(std::iter::repeat(inv(config.seasonality_prior_scale)).take(seasonal_width))
            .collect()
    }

    /// In-sample or out-of-sample prediction for a single date, in count units
    pub fn predict_on(&self, date: NaiveDate) -> f64 {
        let dot: f64 = (0..self.width()).map(|j| self.feature(date, j) * self.beta[j]).sum();
        dot * self.y_scale
    }

    /// Sum of predictions over the `horizon_days` days after the last observation.
    ///
    /// Every future `t` lies past the last changepoint, so the trend sums as an
    /// arithmetic series. Each seasonal block repeats every `cycle_days`, so it
    /// sums as whole cycles plus a remainder. Cost does not grow with the horizon.
    pub fn predict_total(&self, horizon_days: i64) -> Result<f64, ModelError> {
        if horizon_days < 1 {
            return Err(ModelError::HorizonOutOfRange(horizon_days));
        }

        let out_of_range = ModelError::HorizonOutOfRange(horizon_days);
        Duration::try_days(horizon_days)
            .and_then(|d| self.last.checked_add_signed(d))
            .ok_or(out_of_range)?;

        let total = (self.trend_total(horizon_days) + self.seasonal_total(horizon_days)) * self.y_scale;

        if total.is_finite() {
            Ok(total)
        } else {
            Err(ModelError::NonFinite)
        }
    }

    /// Scaled trend summed over the horizon
    fn trend_total(&self, horizon_days: i64) -> f64 {
        let h = horizon_days as f64;
        let offset = (self.last - self.start).num_days() as f64;
        // sum of t over days last+1 ..= last+h
        let t_sum = (h * offset + h * (h + 1.0) / 2.0) / self.span_days;

        let changepoint_sum: f64 = self
            .changepoints
            .iter()
            .enumerate()
            .map(|(i, s)| self.beta[2 + i] * (t_sum - h * s))
            .sum();

        self.beta[0] * h + self.beta[1] * t_sum + changepoint_sum
    }

    /// Scaled seasonal terms summed over the horizon
    fn seasonal_total(&self, horizon_days: i64) -> f64 {
        let mut first_column = 2 + self.changepoints.len();
        let mut total = 0.0;

        for season in &self.seasonalities {
            let columns = first_column..first_column + season.width();
            let cycle = season.cycle_days();

            let per_day: Vec<f64> = self
                .last
                .iter_days()
                .skip(1)
                .take(cycle as usize)
                .map(|date| columns.clone().map(|j| self.feature(date, j) * self.beta[j]).sum::<f64>())
                .collect();

            let whole_cycles = (horizon_days / cycle) as f64;
            let remainder = (horizon_days % cycle) as usize;
            total += whole_cycles * per_day.iter().sum::<f64>()
                + per_day.iter().take(remainder).sum::<f64>();

            first_column = columns.end;
        }

        total
    }
}

/// Evenly spaced changepoints over the first `range` share of the history.
///
/// `t` is the scaled, sorted time axis. The first observation is never a
/// changepoint; short histories get fewer (possibly zero) changepoints.
fn place_changepoints(t: &[f64], max_changepoints: usize, range: f64) -> Vec<f64> {
    let hist = (t.len() as f64 * range).floor() as usize;
    let count = max_changepoints.min(hist.saturating_sub(1));
    if count == 0 {
        return Vec::new();
    }

    (1..=count)
        .map(|i| {
            let idx = (i as f64 * (hist - 1) as f64 / count as f64).round() as usize;
            t[idx.min(t.len() - 1)]
        })
        .collect()
}
