//! Configuration module

use std::env;
use std::str::FromStr;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Bind address
    pub host: String,

    /// Server port
    pub port: u16,

    /// Environment (development, production)
    pub environment: String,

    /// Log output format ("pretty" or "json")
    pub log_format: String,

    /// Maximum accepted request body in bytes
    pub max_body_bytes: usize,

    /// Forecasting model settings
    pub forecast: ForecastConfig,
}

/// Settings for the seasonal forecasting model
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastConfig {
    /// Force the daily seasonal component on, regardless of series granularity
    pub daily_seasonality: bool,

    /// Upper bound on trend changepoints
    pub n_changepoints: usize,

    /// Share of the history in which changepoints may be placed
    pub changepoint_range: f64,

    /// Prior scale of changepoint slope deltas
    pub changepoint_prior_scale: f64,

    /// Prior scale of Fourier coefficients
    pub seasonality_prior_scale: f64,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            daily_seasonality: true,
            n_changepoints: 25,
            changepoint_range: 0.8,
            changepoint_prior_scale: 0.05,
            seasonality_prior_scale: 10.0,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = ForecastConfig::default();

        Self {
            host: env::var("HOST")
                .unwrap_or_else(|_| "0.0.0.0".to_string()),

            port: parse_var("PORT").unwrap_or(8000),

            environment: env::var("ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string()),

            log_format: env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "pretty".to_string()),

            max_body_bytes: parse_var("MAX_BODY_BYTES").unwrap_or(2 * 1024 * 1024),

            forecast: ForecastConfig {
                daily_seasonality: parse_var("FORECAST_DAILY_SEASONALITY")
                    .unwrap_or(defaults.daily_seasonality),
                n_changepoints: parse_var("FORECAST_CHANGEPOINTS")
                    .unwrap_or(defaults.n_changepoints),
                changepoint_prior_scale: parse_var("FORECAST_CHANGEPOINT_PRIOR_SCALE")
                    .filter(|s: &f64| *s > 0.0)
                    .unwrap_or(defaults.changepoint_prior_scale),
                seasonality_prior_scale: parse_var("FORECAST_SEASONALITY_PRIOR_SCALE")
                    .filter(|s: &f64| *s > 0.0)
                    .unwrap_or(defaults.seasonality_prior_scale),
                ..defaults
            },
        }
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Check if logs should be emitted as JSON
    pub fn json_logs(&self) -> bool {
        self.log_format.eq_ignore_ascii_case("json")
    }
}

fn parse_var<T: FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse().ok())
}
