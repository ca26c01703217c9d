//! Line protocol codec.
//!
//! Wire format, one ASCII line per frame:
//! ```text
//! board → host   <moisture>,<temperature>,<humidity>\n     e.g. 41.5,26.3,58.0
//! host  → board  PUMP:<seconds>\n                          e.g. PUMP:15
//! ```
//!
//! Syntax only.  Out-of-range values (negative humidity, 300 % moisture)
//! decode successfully; deciding what to do with them belongs downstream.

use crate::error::MalformedFrame;

/// Number of comma-separated fields in a telemetry frame.
pub const TELEMETRY_FIELDS: usize = 3;

/// Literal prefix of every command frame.
pub const COMMAND_PREFIX: &str = "PUMP:";

/// One decoded telemetry frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorReading {
    /// Soil moisture (%).
    pub soil_moisture: f64,
    /// Air temperature (°C).
    pub air_temperature: f64,
    /// Air humidity (%).
    pub air_humidity: f64,
}

impl SensorReading {
    /// Feature vector in the order the model was trained on.
    pub fn features(&self) -> [f64; TELEMETRY_FIELDS] {
        [self.soil_moisture, self.air_temperature, self.air_humidity]
    }
}

/// Run the pump for a whole number of seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActuationCommand {
    pub runtime_seconds: u32,
}

/// Decode one telemetry line (without its terminator).
///
/// Fields are trimmed of ASCII whitespace; a field that is not UTF-8 or
/// does not parse to a finite `f64` is rejected.
pub fn decode_reading(line: &[u8]) -> Result<SensorReading, MalformedFrame> {
    let found = line.split(|&b| b == b',').count();
    if found != TELEMETRY_FIELDS {
        return Err(MalformedFrame::FieldCount { found });
    }

    let mut values = [0.0_f64; TELEMETRY_FIELDS];
    for (index, (slot, raw)) in values
        .iter_mut()
        .zip(line.split(|&b| b == b','))
        .enumerate()
    {
        *slot = parse_field(raw).ok_or(MalformedFrame::NonNumeric { index })?;
    }

    let [soil_moisture, air_temperature, air_humidity] = values;
    Ok(SensorReading {
        soil_moisture,
        air_temperature,
        air_humidity,
    })
}

fn parse_field(raw: &[u8]) -> Option<f64> {
    let text = core::str::from_utf8(raw).ok()?.trim();
    text.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Encode a command as a newline-terminated frame.
pub fn encode_command(cmd: &ActuationCommand) -> String {
    format!("{COMMAND_PREFIX}{}\n", cmd.runtime_seconds)
}
