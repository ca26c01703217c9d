//! Trained regression model loaded from a JSON artifact.
//!
//! The training pipeline fits a support-vector regressor (RBF kernel by
//! default) over `[soil_moisture, air_temperature, air_humidity]` and
//! exports its fitted parameters:
//!
//! ```json
//! {
//!   "features": ["soil_moisture", "air_temperature", "air_humidity"],
//!   "scaler": { "kind": "standard", "mean": [..], "scale": [..] },
//!   "model": {
//!     "kind": "svr",
//!     "kernel": { "type": "rbf", "gamma": 0.1 },
//!     "support_vectors": [[..], ..],
//!     "dual_coef": [..],
//!     "intercept": 1.5
//!   }
//! }
//! ```
//!
//! SVR decision function: `f(x) = Σ dual_coef[i] · K(sv[i], x) + intercept`.

use std::io;
use std::path::Path;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use super::scaler::FeatureScaler;
use super::{Estimator, FEATURE_NAMES};
use crate::codec::SensorReading;
use crate::error::{EstimationError, ModelLoadError};

const N_FEATURES: usize = FEATURE_NAMES.len();

/// Highest polynomial kernel degree accepted from an artifact.
const MAX_POLY_DEGREE: u32 = 32;

fn default_poly_degree() -> u32 {
    3
}

/// SVR kernel function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Kernel {
    /// `⟨a, b⟩`
    Linear,
    /// `exp(-γ‖a − b‖²)`
    Rbf { gamma: f64 },
    /// `(γ⟨a, b⟩ + coef0)^degree`
    Poly {
        gamma: f64,
        #[serde(default)]
        coef0: f64,
        #[serde(default = "default_poly_degree")]
        degree: u32,
    },
    /// `tanh(γ⟨a, b⟩ + coef0)`
    Sigmoid {
        gamma: f64,
        #[serde(default)]
        coef0: f64,
    },
}

impl Kernel {
    fn eval(&self, a: &[f64], b: &[f64]) -> f64 {
        match self {
            Self::Linear => dot(a, b),
            Self::Rbf { gamma } => {
                let sq: f64 = a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum();
                (-gamma * sq).exp()
            }
            Self::Poly {
                gamma,
                coef0,
                degree,
            } => (gamma * dot(a, b) + coef0).powi(*degree as i32),
            Self::Sigmoid { gamma, coef0 } => (gamma * dot(a, b) + coef0).tanh(),
        }
    }

    fn params_finite(&self) -> bool {
        match self {
            Self::Linear => true,
            Self::Rbf { gamma } => gamma.is_finite(),
            Self::Poly { gamma, coef0, .. } | Self::Sigmoid { gamma, coef0 } => {
                gamma.is_finite() && coef0.is_finite()
            }
        }
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Fitted regressor parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Regressor {
    Svr {
        kernel: Kernel,
        support_vectors: Vec<Vec<f64>>,
        dual_coef: Vec<f64>,
        intercept: f64,
    },
    Linear {
        coefficients: Vec<f64>,
        intercept: f64,
    },
}

impl Regressor {
    fn validate(&self) -> Result<(), String> {
        match self {
            Self::Svr {
                kernel,
                support_vectors,
                dual_coef,
                intercept,
            } => {
                if support_vectors.is_empty() {
                    return Err("svr has no support vectors".into());
                }
                if let Kernel::Poly { degree, .. } = kernel {
                    if *degree > MAX_POLY_DEGREE {
                        return Err(format!(
                            "poly kernel degree {degree} exceeds {MAX_POLY_DEGREE}"
                        ));
                    }
                }
                if support_vectors.len() != dual_coef.len() {
                    return Err(format!(
                        "svr has {} support vectors but {} dual coefficients",
                        support_vectors.len(),
                        dual_coef.len()
                    ));
                }
                if let Some(sv) = support_vectors.iter().find(|sv| sv.len() != N_FEATURES) {
                    return Err(format!(
                        "support vector has {} features, expected {N_FEATURES}",
                        sv.len()
                    ));
                }
                let all_finite = support_vectors.iter().flatten().all(|v| v.is_finite())
                    && dual_coef.iter().all(|v| v.is_finite())
                    && intercept.is_finite()
                    && kernel.params_finite();
                if !all_finite {
                    return Err("svr parameters must be finite".into());
                }
            }
            Self::Linear {
                coefficients,
                intercept,
            } => {
                if coefficients.len() != N_FEATURES {
                    return Err(format!(
                        "linear model has {} coefficients, expected {N_FEATURES}",
                        coefficients.len()
                    ));
                }
                if !(coefficients.iter().all(|v| v.is_finite()) && intercept.is_finite()) {
                    return Err("linear parameters must be finite".into());
                }
            }
        }
        Ok(())
    }

    fn eval(&self, x: &[f64]) -> f64 {
        match self {
            Self::Svr {
                kernel,
                support_vectors,
                dual_coef,
                intercept,
            } => {
                support_vectors
                    .iter()
                    .zip(dual_coef)
                    .map(|(sv, alpha)| alpha * kernel.eval(sv, x))
                    .sum::<f64>()
                    + intercept
            }
            Self::Linear {
                coefficients,
                intercept,
            } => dot(coefficients, x) + intercept,
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::Svr {
                kernel,
                support_vectors,
                ..
            } => format!("svr({kernel:?}, {} support vectors)", support_vectors.len()),
            Self::Linear { .. } => "linear".into(),
        }
    }
}

/// On-disk artifact as written by the training pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    /// Feature names in training order (informational).
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub scaler: Option<FeatureScaler>,
    pub model: Regressor,
}

/// A validated, immutable model ready for inference.
#[derive(Debug, Clone)]
pub struct TrainedModel {
    scaler: Option<FeatureScaler>,
    regressor: Regressor,
}

impl TrainedModel {
    /// Load and validate the artifact at `path`.
    pub fn load(path: &Path) -> Result<Self, ModelLoadError> {
        let text = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => ModelLoadError::Missing(path.to_path_buf()),
            _ => ModelLoadError::Unreadable {
                path: path.to_path_buf(),
                detail: e.to_string(),
            },
        })?;
        let invalid = |detail: String| ModelLoadError::Invalid {
            path: path.to_path_buf(),
            detail,
        };
        let artifact: ModelArtifact =
            serde_json::from_str(&text).map_err(|e| invalid(e.to_string()))?;
        let model = Self::from_artifact(artifact).map_err(invalid)?;
        info!("Model loaded from {}: {}", path.display(), model.describe());
        Ok(model)
    }

    /// Validate an in-memory artifact.
    pub fn from_artifact(artifact: ModelArtifact) -> Result<Self, String> {
        if !artifact.features.is_empty() {
            if artifact.features.len() != N_FEATURES {
                return Err(format!(
                    "artifact lists {} features, expected {N_FEATURES}",
                    artifact.features.len()
                ));
            }
            if artifact.features.iter().zip(FEATURE_NAMES).any(|(a, b)| a != b) {
                warn!(
                    "Model features {:?} differ from wire order {:?}; assuming positional match",
                    artifact.features, FEATURE_NAMES
                );
            }
        }
        if let Some(scaler) = &artifact.scaler {
            scaler.validate(N_FEATURES)?;
        }
        artifact.model.validate()?;
        Ok(Self {
            scaler: artifact.scaler,
            regressor: artifact.model,
        })
    }

    /// Predict from a raw (unscaled) feature vector.
    pub fn predict_features(&self, features: &[f64]) -> Result<f64, EstimationError> {
        if features.len() != N_FEATURES {
            return Err(EstimationError::FeatureShape {
                expected: N_FEATURES,
                found: features.len(),
            });
        }
        let mut x = [0.0; N_FEATURES];
        x.copy_from_slice(features);
        if let Some(scaler) = &self.scaler {
            scaler.transform(&mut x);
        }
        let y = self.regressor.eval(&x);
        if y.is_finite() {
            Ok(y)
        } else {
            Err(EstimationError::NonFinite(y))
        }
    }

    pub fn describe(&self) -> String {
        match &self.scaler {
            Some(FeatureScaler::Standard { .. }) => {
                format!("{} + standard scaler", self.regressor.describe())
            }
            Some(FeatureScaler::MinMax { .. }) => {
                format!("{} + min-max scaler", self.regressor.describe())
            }
            None => self.regressor.describe(),
        }
    }
}

impl Estimator for TrainedModel {
    fn predict(&self, reading: &SensorReading) -> Result<f64, EstimationError> {
        self.predict_features(&reading.features())
    }
}
