use serde::{Deserialize, Serialize};

const SUM_TOLERANCE: f64 = 1e-6;

/// Default weight table for the six sub-scores.
pub const DEFAULT_WEIGHTS: Weights = Weights {
    expertise: 0.30,
    coverage: 0.20,
    language: 0.15,
    trust: 0.15,
    recency: 0.10,
    price_fit: 0.10, // placeholder dimension, reserves its share
};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Weights {
    pub expertise: f64,
    pub coverage: f64,
    pub language: f64,
    pub trust: f64,
    pub recency: f64,
    pub price_fit: f64,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WeightsError {
    #[error("weight `{name}` must be a finite, non-negative number (got {value})")]
    InvalidWeight { name: &'static str, value: f64 },
    #[error("weights must sum to 1.0 (got {0:.6})")]
    InvalidSum(f64),
}

impl Default for Weights {
    fn default() -> Self {
        DEFAULT_WEIGHTS
    }
}

impl Weights {
    pub fn sum(&self) -> f64 {
        self.expertise + self.coverage + self.language + self.trust + self.recency + self.price_fit
    }

    fn entries(&self) -> [(&'static str, f64); 6] {
        [
            ("expertise", self.expertise),
            ("coverage", self.coverage),
            ("language", self.language),
            ("trust", self.trust),
            ("recency", self.recency),
            ("price_fit", self.price_fit),
        ]
    }

    /// Every weight must be finite and non-negative, and the table must sum to 1
    /// so that the weighted total stays within [0, 1].
    pub fn validate(&self) -> Result<(), WeightsError> {
        for (name, value) in self.entries() {
            if !value.is_finite() || value < 0.0 {
                return Err(WeightsError::InvalidWeight { name, value });
            }
        }

        let sum = self.sum();
        if (sum - 1.0).abs() > SUM_TOLERANCE {
            return Err(WeightsError::InvalidSum(sum));
        }

        Ok(())
    }

    /// Applies `HM_WEIGHT_*` overrides on top of the defaults.
    ///
    /// Unparsable values are logged and ignored; the result is not validated here.
    pub fn from_env() -> Self {
        let defaults = DEFAULT_WEIGHTS;
        Self {
            expertise: env_weight("HM_WEIGHT_EXPERTISE", defaults.expertise),
            coverage: env_weight("HM_WEIGHT_COVERAGE", defaults.coverage),
            language: env_weight("HM_WEIGHT_LANGUAGE", defaults.language),
            trust: env_weight("HM_WEIGHT_TRUST", defaults.trust),
            recency: env_weight("HM_WEIGHT_RECENCY", defaults.recency),
            price_fit: env_weight("HM_WEIGHT_PRICE_FIT", defaults.price_fit),
        }
    }
}

fn env_weight(var: &str, default: f64) -> f64 {
    match std::env::var(var) {
        Ok(raw) => match raw.trim().parse::<f64>() {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(
                    var,
                    value = %raw,
                    error = %err,
                    "ignoring unparsable weight override"
                );
                default
            }
        },
        Err(_) => default,
    }
}
