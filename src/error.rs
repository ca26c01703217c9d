//! Unified error types for the irrigation controller.
//!
//! Each subsystem reports its own error enum; the control loop alone
//! decides whether a fault is per-cycle recoverable or session fatal.
//! The startup-fatal kinds also convert into the top-level [`Error`] so
//! the binary can funnel them through a single `?` chain.

use core::fmt;
use std::io;
use std::path::PathBuf;

// ---------------------------------------------------------------------------
// Top-level controller error
// ---------------------------------------------------------------------------

/// Faults that end the process before or instead of a control session.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Configuration is invalid or could not be loaded.
    Config(ConfigError),
    /// The model artifact is missing or unusable.
    ModelLoad(ModelLoadError),
    /// The transport could not be opened.
    Connection(ConnectionError),
    /// The transport failed while the loop was running.
    Transport(TransportError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "config: {e}"),
            Self::ModelLoad(e) => write!(f, "model: {e}"),
            Self::Connection(e) => write!(f, "connection: {e}"),
            Self::Transport(e) => write!(f, "transport: {e}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// The config file could not be read.
    Unreadable { path: PathBuf, detail: String },
    /// The config file is not valid JSON for [`ControllerConfig`](crate::config::ControllerConfig).
    Malformed { path: PathBuf, detail: String },
    /// An environment override could not be parsed.
    InvalidOverride { var: &'static str, value: String },
    /// A field failed range validation.
    /// The `&'static str` names the field and the violated bound.
    ValidationFailed(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unreadable { path, detail } => {
                write!(f, "cannot read {}: {detail}", path.display())
            }
            Self::Malformed { path, detail } => {
                write!(f, "malformed {}: {detail}", path.display())
            }
            Self::InvalidOverride { var, value } => {
                write!(f, "invalid value {value:?} in ${var}")
            }
            Self::ValidationFailed(msg) => write!(f, "validation failed: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Model artifact errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum ModelLoadError {
    /// No file at the configured path.
    Missing(PathBuf),
    /// The file exists but could not be read.
    Unreadable { path: PathBuf, detail: String },
    /// The artifact parsed but describes an unusable model.
    Invalid { path: PathBuf, detail: String },
}

impl fmt::Display for ModelLoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing(path) => write!(f, "model artifact {} not found", path.display()),
            Self::Unreadable { path, detail } => {
                write!(f, "cannot read model artifact {}: {detail}", path.display())
            }
            Self::Invalid { path, detail } => {
                write!(f, "invalid model artifact {}: {detail}", path.display())
            }
        }
    }
}

impl std::error::Error for ModelLoadError {}

impl From<ModelLoadError> for Error {
    fn from(e: ModelLoadError) -> Self {
        Self::ModelLoad(e)
    }
}

// ---------------------------------------------------------------------------
// Connection errors (transport open)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionError {
    /// The device does not exist.
    NoDevice { address: String },
    /// The process may not open the device.
    PermissionDenied { address: String },
    /// The address or rate is not acceptable to the driver.
    InvalidSettings { address: String, detail: String },
    /// Any other open failure (device busy, driver error, ...).
    Io { address: String, detail: String },
}

impl fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoDevice { address } => write!(f, "{address}: no such device"),
            Self::PermissionDenied { address } => write!(f, "{address}: permission denied"),
            Self::InvalidSettings { address, detail } => {
                write!(f, "{address}: invalid settings ({detail})")
            }
            Self::Io { address, detail } => write!(f, "{address}: {detail}"),
        }
    }
}

impl std::error::Error for ConnectionError {}

impl From<ConnectionError> for Error {
    fn from(e: ConnectionError) -> Self {
        Self::Connection(e)
    }
}

// ---------------------------------------------------------------------------
// Transport errors (running session)
// ---------------------------------------------------------------------------

/// A genuine I/O fault on an open transport.  A read timeout is **not** one
/// of these; absence of data is reported as `Ok(None)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The transport was used after `close()`.
    Closed,
    /// Reading from the peer failed.
    Read { kind: io::ErrorKind, detail: String },
    /// Writing to the peer failed.
    Write { kind: io::ErrorKind, detail: String },
}

impl TransportError {
    pub fn read(e: &io::Error) -> Self {
        Self::Read {
            kind: e.kind(),
            detail: e.to_string(),
        }
    }

    pub fn write(e: &io::Error) -> Self {
        Self::Write {
            kind: e.kind(),
            detail: e.to_string(),
        }
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed => write!(f, "transport closed"),
            Self::Read { detail, .. } => write!(f, "read failed: {detail}"),
            Self::Write { detail, .. } => write!(f, "write failed: {detail}"),
        }
    }
}

impl std::error::Error for TransportError {}

impl From<TransportError> for Error {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}

// ---------------------------------------------------------------------------
// Frame decode errors
// ---------------------------------------------------------------------------

/// Why an inbound telemetry line was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MalformedFrame {
    /// The line did not split into exactly three fields.
    FieldCount { found: usize },
    /// The field at `index` (0-based) is not a finite number.
    NonNumeric { index: usize },
}

impl MalformedFrame {
    /// Short, stable reason string used in diagnostics.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::FieldCount { .. } => "field count mismatch",
            Self::NonNumeric { .. } => "non-numeric field",
        }
    }
}

impl fmt::Display for MalformedFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FieldCount { found } => {
                write!(f, "{} (expected 3, found {found})", self.reason())
            }
            Self::NonNumeric { index } => write!(f, "{} at position {index}", self.reason()),
        }
    }
}

impl std::error::Error for MalformedFrame {}

// ---------------------------------------------------------------------------
// Estimation errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum EstimationError {
    /// The model was fitted on a different number of features.
    FeatureShape { expected: usize, found: usize },
    /// The model produced NaN or an infinity.
    NonFinite(f64),
}

impl fmt::Display for EstimationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FeatureShape { expected, found } => {
                write!(f, "feature shape mismatch: expected {expected}, got {found}")
            }
            Self::NonFinite(v) => write!(f, "non-finite prediction {v}"),
        }
    }
}

impl std::error::Error for EstimationError {}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Controller-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
