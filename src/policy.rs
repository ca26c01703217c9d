//! Actuation policy.
//!
//! Turns a predicted water volume into a pump runtime:
//!
//! 1. Below `min_water_ml` → no command at all (not a zero-second one).
//! 2. Above `max_water_ml` → silently capped.  The cap exists to absorb
//!    model over-prediction, so it is not a fault.
//! 3. Volume ÷ flow rate, **truncated** to whole seconds.  Under-watering
//!    by a fraction of a second is preferred to over-watering.
//!
//! Config validation keeps `min_water_ml >= flow_rate_ml_per_s`, so any
//! dose that clears step 1 runs the pump for at least one second.

use log::debug;

use crate::codec::ActuationCommand;
use crate::config::ControllerConfig;

/// Result of one policy evaluation, kept for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Decision {
    /// Prediction below the minimum dose; nothing is sent.
    Suppressed { predicted_ml: f64 },
    /// A command will be sent.
    Actuate {
        predicted_ml: f64,
        /// Volume after the safety cap.
        effective_ml: f64,
        command: ActuationCommand,
    },
}

impl Decision {
    pub fn command(&self) -> Option<ActuationCommand> {
        match self {
            Self::Suppressed { .. } => None,
            Self::Actuate { command, .. } => Some(*command),
        }
    }

    /// True when the safety cap reduced the volume.
    pub fn was_capped(&self) -> bool {
        match self {
            Self::Suppressed { .. } => false,
            Self::Actuate {
                predicted_ml,
                effective_ml,
                ..
            } => effective_ml < predicted_ml,
        }
    }
}

/// Pump dosing bounds, copied out of the config at startup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActuationPolicy {
    min_ml: f64,
    max_ml: f64,
    flow_rate_ml_per_s: f64,
}

impl ActuationPolicy {
    pub fn new(config: &ControllerConfig) -> Self {
        Self {
            min_ml: config.min_water_ml,
            max_ml: config.max_water_ml,
            flow_rate_ml_per_s: config.flow_rate_ml_per_s,
        }
    }

    pub fn min_ml(&self) -> f64 {
        self.min_ml
    }

    pub fn max_ml(&self) -> f64 {
        self.max_ml
    }

    /// Evaluate a prediction.  NaN is treated as below the minimum.
    pub fn evaluate(&self, predicted_ml: f64) -> Decision {
        if predicted_ml.is_nan() || predicted_ml < self.min_ml {
            debug!(
                "policy: {predicted_ml:.2} mL below minimum {:.2} mL",
                self.min_ml
            );
            return Decision::Suppressed { predicted_ml };
        }

        let effective_ml = predicted_ml.min(self.max_ml);
        // `as` saturates, so an absurd cap cannot wrap around.
        let runtime_seconds = (effective_ml / self.flow_rate_ml_per_s).floor() as u32;

        Decision::Actuate {
            predicted_ml,
            effective_ml,
            command: ActuationCommand { runtime_seconds },
        }
    }

    /// Command to send for `predicted_ml`, if any.
    pub fn decide(&self, predicted_ml: f64) -> Option<ActuationCommand> {
        self.evaluate(predicted_ml).command()
    }

    /// Water delivered by `cmd` at the calibrated flow rate.
    pub fn implied_volume_ml(&self, cmd: &ActuationCommand) -> f64 {
        f64::from(cmd.runtime_seconds) * self.flow_rate_ml_per_s
    }
}

/// Free-function form: `decide(predicted_ml, config)`.
pub fn decide(predicted_ml: f64, config: &ControllerConfig) -> Option<ActuationCommand> {
    ActuationPolicy::new(config).decide(predicted_ml)
}
