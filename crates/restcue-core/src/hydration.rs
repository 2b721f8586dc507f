//! Hydration debt accumulator.
//!
//! Debt accrues continuously at `rate_per_hour` ml per hour of wall-clock
//! time. It is kept as a float and only rounded for display, so many short
//! samples never compound rounding error.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::ConfigError;

/// Debt at or above which notifications carry a hydration hint.
pub const HINT_THRESHOLD_ML: f64 = 100.0;

/// Period of the background sampling tick, in milliseconds.
pub const SAMPLE_PERIOD_MS: i64 = 1_000;

const MS_PER_HOUR: f64 = 3_600_000.0;

#[derive(Debug, Clone, Serialize)]
pub struct HydrationAccumulator {
    accumulated_ml: f64,
    rate_per_hour: u32,
    last_sample: DateTime<Utc>,
}

impl HydrationAccumulator {
    /// Start with no debt, measuring from `now`. A zero rate is raised to 1.
    pub fn new(rate_per_hour: u32, now: DateTime<Utc>) -> Self {
        Self {
            accumulated_ml: 0.0,
            rate_per_hour: rate_per_hour.max(1),
            last_sample: now,
        }
    }

    pub fn accumulated_ml(&self) -> f64 {
        self.accumulated_ml
    }

    /// Debt rounded to the nearest millilitre, for display.
    pub fn rounded_ml(&self) -> u64 {
        self.accumulated_ml.round() as u64
    }

    pub fn rate_per_hour(&self) -> u32 {
        self.rate_per_hour
    }

    pub fn last_sample(&self) -> DateTime<Utc> {
        self.last_sample
    }

    /// Accrue debt for the time since the last sample. Returns the amount added.
    ///
    /// A clock that stepped backwards adds nothing and leaves `last_sample`
    /// where it was.
    pub fn sample(&mut self, now: DateTime<Utc>) -> f64 {
        let elapsed_ms = (now - self.last_sample).num_milliseconds();
        if elapsed_ms <= 0 {
            return 0.0;
        }
        let added = elapsed_ms as f64 / MS_PER_HOUR * f64::from(self.rate_per_hour);
        self.accumulated_ml += added;
        self.last_sample = now;
        added
    }

    /// Advisory text when the debt has reached the threshold, else empty.
    pub fn hint(&self) -> String {
        if self.accumulated_ml >= HINT_THRESHOLD_ML {
            format!("Time to hydrate! Drink ~{}ml of water.", self.rounded_ml())
        } else {
            String::new()
        }
    }

    /// Sample up to `now`, then return the hint.
    pub fn hint_at(&mut self, now: DateTime<Utc>) -> String {
        self.sample(now);
        self.hint()
    }

    /// Clear the debt. Does not touch `last_sample`.
    pub fn drink(&mut self) -> f64 {
        std::mem::replace(&mut self.accumulated_ml, 0.0)
    }

    /// Clear the debt and measure from `now`.
    pub fn reset(&mut self, now: DateTime<Utc>) {
        self.accumulated_ml = 0.0;
        self.last_sample = now;
    }

    pub fn set_rate(&mut self, rate_per_hour: u32) -> Result<(), ConfigError> {
        if rate_per_hour == 0 {
            return Err(ConfigError::invalid(
                "hydration.ml_per_hour",
                "rate must be greater than zero",
            ));
        }
        self.rate_per_hour = rate_per_hour;
        Ok(())
    }
}
