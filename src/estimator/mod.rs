//! Water-volume estimator port and the trained-model adapter behind it.
//!
//! The control loop only needs `predict(reading) -> mL`.  How the model
//! was trained, scaled or serialised stays behind [`Estimator`]; the
//! shipped implementation is [`TrainedModel`], loaded once at startup
//! from the JSON artifact written by the training pipeline.

pub mod model;
pub mod scaler;

pub use model::{Kernel, ModelArtifact, Regressor, TrainedModel};
pub use scaler::FeatureScaler;

use crate::codec::SensorReading;
use crate::error::EstimationError;

/// Features every model is trained on, in wire order.
pub const FEATURE_NAMES: [&str; 3] = ["soil_moisture", "air_temperature", "air_humidity"];

/// Read-only inference over one sensor reading.
pub trait Estimator {
    /// Predicted water volume in mL.
    fn predict(&self, reading: &SensorReading) -> Result<f64, EstimationError>;
}

impl<E: Estimator + ?Sized> Estimator for &E {
    fn predict(&self, reading: &SensorReading) -> Result<f64, EstimationError> {
        (**self).predict(reading)
    }
}

impl<E: Estimator + ?Sized> Estimator for Box<E> {
    fn predict(&self, reading: &SensorReading) -> Result<f64, EstimationError> {
        (**self).predict(reading)
    }
}
