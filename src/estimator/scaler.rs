//! Feature scaling applied before inference.
//!
//! Mirrors the two scalers the training scripts fit:
//! - `standard`: `(x - mean) / scale`
//! - `min_max`:  `x * scale + min` (the form sklearn stores after `fit`)

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeatureScaler {
    Standard { mean: Vec<f64>, scale: Vec<f64> },
    MinMax { min: Vec<f64>, scale: Vec<f64> },
}

impl FeatureScaler {
    /// Check the fitted parameters against the model's feature count.
    pub fn validate(&self, n_features: usize) -> Result<(), String> {
        let (offset, scale, offset_name) = match self {
            Self::Standard { mean, scale } => (mean, scale, "mean"),
            Self::MinMax { min, scale } => (min, scale, "min"),
        };
        if offset.len() != n_features || scale.len() != n_features {
            return Err(format!(
                "scaler expects {n_features} features, has {offset_name}={} scale={}",
                offset.len(),
                scale.len()
            ));
        }
        if offset.iter().chain(scale).any(|v| !v.is_finite()) {
            return Err("scaler parameters must be finite".into());
        }
        if matches!(self, Self::Standard { .. }) && scale.iter().any(|s| *s == 0.0) {
            return Err("standard scaler has a zero scale".into());
        }
        Ok(())
    }

    /// Scale `x` in place.  Assumes [`validate`](Self::validate) passed.
    pub fn transform(&self, x: &mut [f64]) {
        match self {
            Self::Standard { mean, scale } => {
                for ((v, m), s) in x.iter_mut().zip(mean).zip(scale) {
                    *v = (*v - m) / s;
                }
            }
            Self::MinMax { min, scale } => {
                for ((v, m), s) in x.iter_mut().zip(min).zip(scale) {
                    *v = *v * s + m;
                }
            }
        }
    }
}
